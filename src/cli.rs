use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "gramseg",
    version,
    about = "Segment grammar textbook PDFs into idempotent unit/item records"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Extract(ExtractArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(long)]
    pub pdf: PathBuf,

    #[arg(long, default_value = "/tmp/grammar_textbook_import.sql")]
    pub out: PathBuf,

    #[arg(long, default_value = "Dream Textbook")]
    pub source_title: String,

    #[arg(long, default_value = "dream_textbook_pdf")]
    pub source_identifier: String,

    /// JSON file describing books and heuristics; the built-in layout is used when absent.
    #[arg(long)]
    pub books_config: Option<PathBuf>,

    /// Also apply the upserts directly to this SQLite database.
    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long)]
    pub boundaries_report_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long)]
    pub db_path: PathBuf,
}
