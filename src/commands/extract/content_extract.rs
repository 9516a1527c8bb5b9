use super::*;

/// Trimmed, non-empty lines of a page minus bare page numbers.
pub(super) fn clean_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.chars().all(|character| character.is_ascii_digit()))
        .collect()
}

/// The first `max_lines` cleaned lines of a page joined with spaces.
pub(super) fn heading_region(text: &str, max_lines: usize) -> String {
    let lines = clean_lines(text);
    lines[..lines.len().min(max_lines)].join(" ")
}

/// Joins the cleaned text of every page in `span`. Returns an empty string
/// when no page produced text; callers skip the item in that case.
pub(super) fn extract_text(reader: &dyn PageReader, span: PageSpan) -> String {
    let mut parts = Vec::<String>::new();

    for page in span.pages() {
        let Some(text) = reader.page_text_1based(page) else {
            continue;
        };
        let lines = clean_lines(text);
        if lines.is_empty() {
            continue;
        }
        parts.push(lines.join("\n"));
    }

    parts.join("\n").trim().to_string()
}
