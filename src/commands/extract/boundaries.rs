use std::ops::RangeInclusive;

use super::*;

/// Inclusive 1-based page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(super) struct PageSpan {
    pub(super) start_page: u32,
    pub(super) end_page: u32,
}

impl PageSpan {
    pub(super) fn new(start_page: u32, end_page: u32) -> Self {
        Self {
            start_page,
            end_page,
        }
    }

    pub(super) fn pages(self) -> RangeInclusive<u32> {
        self.start_page..=self.end_page
    }

    pub(super) fn contains_page(self, page: u32) -> bool {
        self.start_page <= page && page <= self.end_page
    }

    #[cfg(test)]
    pub(super) fn contains(self, other: PageSpan) -> bool {
        self.start_page <= other.start_page && other.end_page <= self.end_page
    }

    #[cfg(test)]
    pub(super) fn overlaps(self, other: PageSpan) -> bool {
        self.start_page <= other.end_page && other.start_page <= self.end_page
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(super) struct SectionBoundary {
    pub(super) number: String,
    pub(super) title: String,
    pub(super) span: PageSpan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(super) struct ChapterBoundary {
    pub(super) number: u32,
    pub(super) title: String,
    pub(super) span: PageSpan,
    pub(super) sections: Vec<SectionBoundary>,
}

/// Turns ascending start pages into contiguous spans: each span ends on the
/// page before the next start, the last one on `outer_end`.
pub(super) fn close_spans(starts: &[u32], outer_end: u32) -> Vec<PageSpan> {
    starts
        .iter()
        .enumerate()
        .map(|(index, &start_page)| {
            let end_page = starts
                .get(index + 1)
                .map(|next| next.saturating_sub(1))
                .unwrap_or(outer_end);
            PageSpan::new(start_page, end_page.max(start_page))
        })
        .collect()
}

struct HeadingPatterns {
    marker: String,
    chapter_number: Regex,
    chapter_prefix: Regex,
    noise: Option<Regex>,
    first_integer: Regex,
}

impl HeadingPatterns {
    fn new(heuristics: &HeuristicsConfig) -> Result<Self> {
        let marker = heuristics.chapter_marker.trim().to_uppercase();
        if marker.is_empty() {
            bail!("chapter marker must not be empty");
        }
        let escaped = regex::escape(&marker);

        let noise = if heuristics.heading_noise_words.is_empty() {
            None
        } else {
            let alternatives = heuristics
                .heading_noise_words
                .iter()
                .map(|word| regex::escape(word.trim()))
                .collect::<Vec<String>>()
                .join("|");
            Some(
                Regex::new(&format!("(?i){alternatives}"))
                    .context("failed to compile heading noise regex")?,
            )
        };

        Ok(Self {
            chapter_number: Regex::new(&format!(r"{escaped}\s*[^0-9]*(\d+)"))
                .context("failed to compile chapter number regex")?,
            chapter_prefix: Regex::new(&format!(r"(?i){escaped}\s*[^0-9]*\d+\s*[–—-]?\s*"))
                .context("failed to compile chapter prefix regex")?,
            noise,
            first_integer: Regex::new(r"(\d+)").context("failed to compile integer regex")?,
            marker,
        })
    }

    /// Chapter number announced in an uppercased heading region.
    fn chapter_number(&self, head_upper: &str) -> Option<u32> {
        if !head_upper.contains(&self.marker) {
            return None;
        }
        self.chapter_number
            .captures(head_upper)
            .and_then(|captures| captures.get(1))
            .and_then(|value| value.as_str().parse::<u32>().ok())
    }

    /// Title carried on the first marker line, if it is not a banner.
    fn heading_title(&self, lines: &[&str], max_lines: usize) -> Option<String> {
        let line = lines
            .iter()
            .take(max_lines)
            .find(|line| line.to_uppercase().contains(&self.marker))?;

        let title = self.chapter_prefix.replace(line, "").trim().to_string();
        if title.is_empty() {
            return None;
        }
        if self
            .noise
            .as_ref()
            .map(|noise| noise.is_match(&title))
            .unwrap_or(false)
        {
            return None;
        }

        Some(title)
    }

    fn first_integer(&self, text: &str) -> Option<u32> {
        self.first_integer
            .captures(text)
            .and_then(|captures| captures.get(1))
            .and_then(|value| value.as_str().parse::<u32>().ok())
    }
}

/// Compiled heuristics shared by every book of a run.
pub(super) struct SegmentationRules {
    pub(super) heuristics: HeuristicsConfig,
    pub(super) toc: TocPatterns,
    headings: HeadingPatterns,
}

impl SegmentationRules {
    pub(super) fn new(heuristics: HeuristicsConfig) -> Result<Self> {
        Ok(Self {
            toc: TocPatterns::new()?,
            headings: HeadingPatterns::new(&heuristics)?,
            heuristics,
        })
    }
}

/// Headings cross-referenced against the book's printed table of contents.
#[derive(Debug, Clone)]
pub(super) struct TocStrategy {
    pub(super) toc: TocEntries,
}

/// Chapters taken straight from the embedded bookmarks; no section level.
#[derive(Debug, Clone, Copy)]
pub(super) struct OutlineStrategy;

#[derive(Debug, Clone)]
pub(super) enum BoundaryStrategy {
    Toc(TocStrategy),
    Outline(OutlineStrategy),
}

impl BoundaryStrategy {
    pub(super) fn for_book(
        book: &BookPlan,
        reader: &dyn PageReader,
        rules: &SegmentationRules,
    ) -> Self {
        match book.detection {
            Detection::Toc { toc_page } => {
                let toc = extract_toc(reader, toc_page, &rules.heuristics, &rules.toc);
                info!(
                    book = %book.key,
                    toc_page,
                    toc_chapters = toc.chapters.len(),
                    toc_sections = toc.sections.len(),
                    "parsed table of contents"
                );
                BoundaryStrategy::Toc(TocStrategy { toc })
            }
            Detection::Outline => BoundaryStrategy::Outline(OutlineStrategy),
        }
    }

    pub(super) fn name(&self) -> &'static str {
        match self {
            BoundaryStrategy::Toc(_) => "toc",
            BoundaryStrategy::Outline(_) => "outline",
        }
    }

    pub(super) fn toc(&self) -> Option<&TocEntries> {
        match self {
            BoundaryStrategy::Toc(strategy) => Some(&strategy.toc),
            BoundaryStrategy::Outline(_) => None,
        }
    }

    pub(super) fn detect(
        &self,
        reader: &dyn PageReader,
        book: &BookPlan,
        rules: &SegmentationRules,
    ) -> Result<Vec<ChapterBoundary>> {
        match self {
            BoundaryStrategy::Toc(strategy) => strategy.detect(reader, book, rules),
            BoundaryStrategy::Outline(strategy) => strategy.detect(reader, book, rules),
        }
    }
}

impl TocStrategy {
    fn detect(
        &self,
        reader: &dyn PageReader,
        book: &BookPlan,
        rules: &SegmentationRules,
    ) -> Result<Vec<ChapterBoundary>> {
        let mut chapters = self.detect_chapters(reader, book, rules);
        for chapter in &mut chapters {
            chapter.sections = self.detect_sections(reader, chapter, rules)?;
        }
        Ok(chapters)
    }

    fn detect_chapters(
        &self,
        reader: &dyn PageReader,
        book: &BookPlan,
        rules: &SegmentationRules,
    ) -> Vec<ChapterBoundary> {
        struct ChapterDraft {
            number: u32,
            start_page: u32,
            heading_title: Option<String>,
        }

        let heuristics = &rules.heuristics;
        let mut drafts = Vec::<ChapterDraft>::new();
        let mut seen_numbers = HashSet::<u32>::new();

        for page in book.span.pages() {
            let Some(text) = reader.page_text_1based(page) else {
                continue;
            };
            let lines = clean_lines(text);
            let head = lines[..lines.len().min(heuristics.chapter_heading_lines)]
                .join(" ")
                .to_uppercase();
            let Some(number) = rules.headings.chapter_number(&head) else {
                continue;
            };

            let continues_current = drafts
                .last()
                .map(|draft| draft.number == number)
                .unwrap_or(false);
            if !continues_current {
                if !seen_numbers.insert(number) {
                    debug!(
                        book = %book.key,
                        chapter = number,
                        page,
                        "chapter heading repeats an earlier chapter; page absorbed"
                    );
                    continue;
                }
                drafts.push(ChapterDraft {
                    number,
                    start_page: page,
                    heading_title: None,
                });
            }

            if let Some(draft) = drafts.last_mut() {
                if draft.heading_title.is_none() {
                    draft.heading_title = rules
                        .headings
                        .heading_title(&lines, heuristics.chapter_title_lines);
                }
            }
        }

        let starts = drafts
            .iter()
            .map(|draft| draft.start_page)
            .collect::<Vec<u32>>();
        let spans = close_spans(&starts, book.span.end_page);

        drafts
            .into_iter()
            .zip(spans)
            .map(|(draft, span)| {
                let title = draft
                    .heading_title
                    .or_else(|| self.toc.chapter_title(draft.number).map(str::to_string))
                    .unwrap_or_else(|| format!("Chapter {}", draft.number));
                ChapterBoundary {
                    number: draft.number,
                    title,
                    span,
                    sections: Vec::new(),
                }
            })
            .collect()
    }

    fn detect_sections(
        &self,
        reader: &dyn PageReader,
        chapter: &ChapterBoundary,
        rules: &SegmentationRules,
    ) -> Result<Vec<SectionBoundary>> {
        let max_lines = rules.heuristics.section_heading_lines;
        let mut seen_numbers = HashSet::<&str>::new();
        let mut found = Vec::<(u32, &TocSection)>::new();

        for section in self.toc.sections_for(chapter.number) {
            let Some(number) = section.number.as_deref() else {
                debug!(
                    chapter = chapter.number,
                    title = %section.title,
                    "skipping unnumbered toc section"
                );
                continue;
            };
            if !seen_numbers.insert(number) {
                continue;
            }

            let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(number)))
                .with_context(|| format!("failed to compile section regex for {number}"))?;
            let start_page = chapter.span.pages().find(|&page| {
                reader
                    .page_text_1based(page)
                    .map(|text| pattern.is_match(&heading_region(text, max_lines)))
                    .unwrap_or(false)
            });

            match start_page {
                Some(start_page) => found.push((start_page, section)),
                None => debug!(
                    chapter = chapter.number,
                    section = number,
                    toc_page = section.page,
                    "section heading not found in chapter range"
                ),
            }
        }

        found.sort_by_key(|(start_page, _)| *start_page);
        let before_dedup = found.len();
        found.dedup_by_key(|(start_page, _)| *start_page);
        if found.len() < before_dedup {
            debug!(
                chapter = chapter.number,
                dropped = before_dedup - found.len(),
                "dropped sections sharing a start page"
            );
        }

        let starts = found
            .iter()
            .map(|(start_page, _)| *start_page)
            .collect::<Vec<u32>>();
        let spans = close_spans(&starts, chapter.span.end_page);

        Ok(found
            .into_iter()
            .zip(spans)
            .filter_map(|((_, section), span)| {
                section.number.as_ref().map(|number| SectionBoundary {
                    number: number.clone(),
                    title: section.title.clone(),
                    span,
                })
            })
            .collect())
    }
}

impl OutlineStrategy {
    fn detect(
        &self,
        reader: &dyn PageReader,
        book: &BookPlan,
        rules: &SegmentationRules,
    ) -> Result<Vec<ChapterBoundary>> {
        let outline = reader
            .outline()
            .with_context(|| format!("failed to read document outline for {}", book.key))?;
        let marker = rules.heuristics.chapter_marker.trim().to_lowercase();

        let mut drafts = Vec::<(u32, u32, String)>::new();
        for entry in outline {
            if entry.page == 0 || !book.span.contains_page(entry.page) {
                continue;
            }
            if !entry.title.to_lowercase().starts_with(&marker) {
                continue;
            }
            let Some(number) = rules.headings.first_integer(&entry.title) else {
                continue;
            };

            let mut title = entry.title.clone();
            for suffix in &rules.heuristics.outline_title_suffixes {
                title = title.replace(suffix.as_str(), "");
            }
            drafts.push((entry.page, number, title.trim().to_string()));
        }

        drafts.sort_by_key(|(page, _, _)| *page);
        let mut seen_numbers = HashSet::<u32>::new();
        let mut seen_pages = HashSet::<u32>::new();
        drafts.retain(|(page, number, _)| {
            let keep = !seen_numbers.contains(number) && !seen_pages.contains(page);
            if keep {
                seen_numbers.insert(*number);
                seen_pages.insert(*page);
            }
            keep
        });

        let starts = drafts
            .iter()
            .map(|(page, _, _)| *page)
            .collect::<Vec<u32>>();
        let spans = close_spans(&starts, book.span.end_page);

        Ok(drafts
            .into_iter()
            .zip(spans)
            .map(|((_, number, title), span)| ChapterBoundary {
                number,
                title,
                span,
                sections: Vec::new(),
            })
            .collect())
    }
}
