use super::*;

const UNIT_KEY_TAG: &str = "GRAMUNIT";
const ITEM_KEY_TAG: &str = "GRAMITEM";

/// Collapses whitespace runs, trims, and lowercases ASCII letters. Other
/// scripts pass through untouched so Arabic titles keep their exact form.
pub(super) fn canonicalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_ascii_lowercase()
}

/// SHA-256 hex digest of the canonical form of `composite_key`.
pub(super) fn digest(composite_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonicalize(composite_key).as_bytes());
    format!("{:x}", hasher.finalize())
}

pub(super) fn book_unit_id(book_key: &str) -> String {
    digest(&format!("{UNIT_KEY_TAG}|{book_key}|book"))
}

pub(super) fn chapter_unit_id(book_key: &str, chapter_number: u32) -> String {
    digest(&format!("{UNIT_KEY_TAG}|{book_key}|chapter|{chapter_number:02}"))
}

// Section numbers are dotted and unique within a book, so no chapter qualifier.
pub(super) fn section_unit_id(book_key: &str, section_number: &str) -> String {
    digest(&format!("{UNIT_KEY_TAG}|{book_key}|section|{section_number}"))
}

pub(super) fn item_id(unit_id: &str, sequence: u32) -> String {
    digest(&format!("{ITEM_KEY_TAG}|{unit_id}|{sequence}"))
}
