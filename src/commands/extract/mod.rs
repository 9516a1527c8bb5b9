use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use regex::Regex;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::cli::ExtractArgs;
use crate::model::{
    ExtractCounts, ExtractPaths, ExtractRunManifest, Item, ItemType, Source, ToolVersions, Unit,
    UnitType,
};
use crate::util::{
    now_utc_string, sha256_file, utc_compact_string, write_json_pretty, write_text,
};

const DB_SCHEMA_VERSION: &str = "0.1.0";

mod assemble_units;
mod boundaries;
mod books_config;
mod content_extract;
mod db_setup;
mod identity;
mod page_reader;
mod run;
#[cfg(test)]
mod tests;
mod toc_parse;
mod upsert_emit;

pub use run::run;

use assemble_units::*;
use boundaries::*;
use books_config::*;
use content_extract::*;
use db_setup::*;
use identity::*;
use page_reader::*;
use toc_parse::*;
use upsert_emit::*;
