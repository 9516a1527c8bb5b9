use super::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(super) struct TocChapter {
    pub(super) number: u32,
    pub(super) title: String,
    pub(super) page: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(super) struct TocSection {
    pub(super) chapter_number: u32,
    /// Dotted designator such as `3.2`; `None` for unnumbered entries.
    pub(super) number: Option<String>,
    pub(super) title: String,
    pub(super) page: u32,
}

/// Titles and printed page hints recovered from a table of contents. The
/// pages are not trusted as boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub(super) struct TocEntries {
    pub(super) chapters: Vec<TocChapter>,
    pub(super) sections: Vec<TocSection>,
}

impl TocEntries {
    pub(super) fn chapter_title(&self, number: u32) -> Option<&str> {
        self.chapters
            .iter()
            .find(|chapter| chapter.number == number)
            .map(|chapter| chapter.title.as_str())
    }

    pub(super) fn sections_for(&self, chapter_number: u32) -> impl Iterator<Item = &TocSection> {
        self.sections
            .iter()
            .filter(move |section| section.chapter_number == chapter_number)
    }
}

pub(super) struct TocPatterns {
    terminator: Regex,
    section_start: Regex,
    chapter_entry: Regex,
    section_entry: Regex,
    misc_entry: Regex,
}

impl TocPatterns {
    pub(super) fn new() -> Result<Self> {
        Ok(Self {
            terminator: Regex::new(r"\.{3,}\s*\d+\s*$")
                .context("failed to compile toc dot-leader regex")?,
            section_start: Regex::new(r"^\d+\.\d+")
                .context("failed to compile toc section start regex")?,
            chapter_entry: Regex::new(r"(?i)^Chapter\s+(\d+)\s*[–—-]\s*(.+?)\s*\.{3,}\s*(\d+)\s*$")
                .context("failed to compile toc chapter entry regex")?,
            section_entry: Regex::new(r"^(\d+\.\d+)\s+(.+?)\s*\.{3,}\s*(\d+)\s*$")
                .context("failed to compile toc section entry regex")?,
            misc_entry: Regex::new(r#"^([A-Za-z][A-Za-z\s'"-]+?)\s*\.{3,}\s*(\d+)\s*$"#)
                .context("failed to compile toc misc entry regex")?,
        })
    }

    fn is_terminator(&self, line: &str) -> bool {
        self.terminator.is_match(line)
    }

    fn opens_entry(&self, line: &str) -> bool {
        line.to_ascii_lowercase().starts_with("chapter") || self.section_start.is_match(line)
    }
}

/// Reads the TOC window starting at `toc_page` and returns its non-empty
/// lines from the marker line onward. Empty when no marker is found.
pub(super) fn read_toc_lines(
    reader: &dyn PageReader,
    toc_page: u32,
    heuristics: &HeuristicsConfig,
) -> Vec<String> {
    let page_count = u32::try_from(reader.page_count()).unwrap_or(u32::MAX);
    let last_page = toc_page
        .saturating_add(heuristics.toc_lookahead_pages.max(1) - 1)
        .min(page_count);
    let marker = heuristics.toc_marker.to_uppercase();

    let mut lines = Vec::<String>::new();
    let mut started = false;

    for page in toc_page..=last_page {
        let Some(text) = reader.page_text_1based(page) else {
            continue;
        };
        let page_lines = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<&str>>();

        let from = if started {
            0
        } else {
            match page_lines
                .iter()
                .position(|line| line.to_uppercase().contains(&marker))
            {
                Some(index) => {
                    started = true;
                    index
                }
                None => continue,
            }
        };

        lines.extend(page_lines[from..].iter().map(|line| line.to_string()));
    }

    if !started {
        warn!(toc_page, marker = %heuristics.toc_marker, "table of contents marker not found");
    }

    lines
}

/// Rebuilds logical entries from raw lines: a dot-leader line closes an entry
/// and absorbs the wrapped title lines buffered before it.
pub(super) fn join_toc_entries(lines: &[String], patterns: &TocPatterns) -> Vec<String> {
    let mut entries = Vec::new();
    let mut buffer = Vec::<&str>::new();

    for line in lines {
        let line = line.trim();
        if patterns.is_terminator(line) {
            buffer.push(line);
            entries.push(buffer.join(" "));
            buffer.clear();
            continue;
        }

        if !buffer.is_empty() || patterns.opens_entry(line) {
            buffer.push(line);
        }
    }

    if !buffer.is_empty() {
        debug!(pending = %buffer.join(" "), "dropping unterminated toc entry");
    }

    entries
}

/// Attributes parsed entries to the chapter seen most recently. Sections
/// before the first chapter have no owner and are discarded.
pub(super) struct TocAccumulator<'a> {
    patterns: &'a TocPatterns,
    current_chapter: Option<u32>,
    entries: TocEntries,
    discarded: usize,
}

impl<'a> TocAccumulator<'a> {
    pub(super) fn new(patterns: &'a TocPatterns) -> Self {
        Self {
            patterns,
            current_chapter: None,
            entries: TocEntries::default(),
            discarded: 0,
        }
    }

    pub(super) fn push_entry(&mut self, entry: &str) {
        let entry = entry.trim();

        if let Some(captures) = self.patterns.chapter_entry.captures(entry) {
            let number = captures.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
            let title = captures.get(2).map(|m| m.as_str().trim().to_string());
            let page = captures.get(3).and_then(|m| m.as_str().parse::<u32>().ok());
            if let (Some(number), Some(title), Some(page)) = (number, title, page) {
                self.current_chapter = Some(number);
                self.entries.chapters.push(TocChapter {
                    number,
                    title,
                    page,
                });
                return;
            }
        }

        let Some(chapter_number) = self.current_chapter else {
            self.discarded += 1;
            debug!(entry = %entry, "discarding toc entry before any chapter");
            return;
        };

        if let Some(captures) = self.patterns.section_entry.captures(entry) {
            let number = captures.get(1).map(|m| m.as_str().trim().to_string());
            let title = captures.get(2).map(|m| m.as_str().trim().to_string());
            let page = captures.get(3).and_then(|m| m.as_str().parse::<u32>().ok());
            if let (Some(number), Some(title), Some(page)) = (number, title, page) {
                self.entries.sections.push(TocSection {
                    chapter_number,
                    number: Some(number),
                    title,
                    page,
                });
                return;
            }
        }

        if let Some(captures) = self.patterns.misc_entry.captures(entry) {
            let title = captures.get(1).map(|m| m.as_str().trim().to_string());
            let page = captures.get(2).and_then(|m| m.as_str().parse::<u32>().ok());
            if let (Some(title), Some(page)) = (title, page) {
                self.entries.sections.push(TocSection {
                    chapter_number,
                    number: None,
                    title,
                    page,
                });
                return;
            }
        }

        self.discarded += 1;
        debug!(entry = %entry, "discarding unmatched toc entry");
    }

    pub(super) fn discarded(&self) -> usize {
        self.discarded
    }

    pub(super) fn finish(self) -> TocEntries {
        self.entries
    }
}

pub(super) fn parse_toc_entries(entries: &[String], patterns: &TocPatterns) -> TocEntries {
    let mut accumulator = TocAccumulator::new(patterns);
    for entry in entries {
        accumulator.push_entry(entry);
    }

    if accumulator.discarded() > 0 {
        debug!(discarded = accumulator.discarded(), "toc entries discarded");
    }

    accumulator.finish()
}

pub(super) fn extract_toc(
    reader: &dyn PageReader,
    toc_page: u32,
    heuristics: &HeuristicsConfig,
    patterns: &TocPatterns,
) -> TocEntries {
    let lines = read_toc_lines(reader, toc_page, heuristics);
    let entries = join_toc_entries(&lines, patterns);
    parse_toc_entries(&entries, patterns)
}
