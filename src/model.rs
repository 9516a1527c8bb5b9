use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SOURCE_TYPE_GRAMMAR_TEXTBOOK: &str = "grammar_textbook";
pub const SOURCE_NOTES_IMPORTED: &str = "Imported from PDF";

#[derive(Debug, Clone, Serialize)]
pub struct Source {
    pub source_type: String,
    pub title: String,
    pub identifier: String,
    pub notes: Option<String>,
}

impl Source {
    pub fn grammar_textbook(title: &str, identifier: &str) -> Self {
        Self {
            source_type: SOURCE_TYPE_GRAMMAR_TEXTBOOK.to_string(),
            title: title.to_string(),
            identifier: identifier.to_string(),
            notes: Some(SOURCE_NOTES_IMPORTED.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    Book,
    Chapter,
    Section,
}

impl UnitType {
    pub fn as_str(self) -> &'static str {
        match self {
            UnitType::Book => "book",
            UnitType::Chapter => "chapter",
            UnitType::Section => "section",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Content,
}

impl ItemType {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Content => "content",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Unit {
    pub id: String,
    pub parent_id: Option<String>,
    pub unit_type: UnitType,
    pub order_index: Option<u32>,
    pub title: String,
    pub title_ar: Option<String>,
    pub source_identifier: String,
    pub start_page: u32,
    pub end_page: u32,
    pub meta: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub id: String,
    pub unit_id: String,
    pub item_type: ItemType,
    pub title: String,
    pub content: Option<String>,
    pub content_ar: Option<String>,
    pub order_index: u32,
    pub meta: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolVersions {
    pub pdftotext: String,
    pub pdfinfo: String,
    pub pdftohtml: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractPaths {
    pub pdf_path: String,
    pub sql_out_path: Option<String>,
    pub db_path: Option<String>,
    pub boundaries_report_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractCounts {
    pub page_count: usize,
    pub book_count: usize,
    pub units_total: usize,
    pub book_units: usize,
    pub chapter_units: usize,
    pub section_units: usize,
    pub items_total: usize,
    pub empty_items_skipped: usize,
    pub toc_chapter_entries: usize,
    pub toc_section_entries: usize,
    pub unnumbered_sections_skipped: usize,
    pub statements_emitted: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub source_identifier: String,
    pub source_title: String,
    pub source_sha256: String,
    pub tool_versions: ToolVersions,
    pub paths: ExtractPaths,
    pub counts: ExtractCounts,
    pub warnings: Vec<String>,
}
