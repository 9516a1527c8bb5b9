use super::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct BooksConfig {
    pub(super) books: Vec<BookConfig>,
    #[serde(default)]
    pub(super) heuristics: HeuristicsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct BookConfig {
    pub(super) key: String,
    pub(super) title: String,
    pub(super) start_page: u32,
    /// First page of the printed table of contents. Books without one fall
    /// back to the embedded outline.
    #[serde(default)]
    pub(super) toc_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub(super) struct HeuristicsConfig {
    pub(super) toc_marker: String,
    pub(super) toc_lookahead_pages: u32,
    pub(super) chapter_marker: String,
    pub(super) chapter_heading_lines: usize,
    pub(super) chapter_title_lines: usize,
    pub(super) section_heading_lines: usize,
    pub(super) heading_noise_words: Vec<String>,
    pub(super) outline_title_suffixes: Vec<String>,
}

impl Default for HeuristicsConfig {
    fn default() -> Self {
        Self {
            toc_marker: "TABLE OF CONTENTS".to_string(),
            toc_lookahead_pages: 5,
            chapter_marker: "CHAPTER".to_string(),
            chapter_heading_lines: 12,
            chapter_title_lines: 6,
            section_heading_lines: 8,
            heading_noise_words: vec!["VOCABULARY".to_string(), "MEMORIZATION".to_string()],
            outline_title_suffixes: vec!["_Edited".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub(super) enum Detection {
    Toc { toc_page: u32 },
    Outline,
}

/// A configured book with its resolved page range.
#[derive(Debug, Clone, Serialize)]
pub(super) struct BookPlan {
    pub(super) key: String,
    pub(super) title: String,
    pub(super) span: PageSpan,
    pub(super) detection: Detection,
}

impl BooksConfig {
    pub(super) fn builtin() -> Self {
        let book = |key: &str, title: &str, start_page: u32, toc_page: Option<u32>| BookConfig {
            key: key.to_string(),
            title: title.to_string(),
            start_page,
            toc_page,
        };

        Self {
            books: vec![
                book("nahw_textbook", "Nahw Textbook", 7, Some(4)),
                book("sarf_textbook", "Sarf Textbook", 151, Some(150)),
                book("advanced_nahw", "Advanced Nahw Textbook", 304, Some(303)),
                book(
                    "advanced_structures",
                    "Advanced Structures Textbook",
                    360,
                    Some(359),
                ),
                book("balagha", "Balagha", 418, None),
            ],
            heuristics: HeuristicsConfig::default(),
        }
    }

    pub(super) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::builtin());
        };

        let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let config: BooksConfig = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        info!(
            path = %path.display(),
            books = config.books.len(),
            "loaded books config"
        );

        Ok(config)
    }

    /// Chains the configured start pages into inclusive ranges; the last book
    /// runs to the end of the document.
    pub(super) fn plan(&self, page_count: usize) -> Result<Vec<BookPlan>> {
        if self.books.is_empty() {
            bail!("books config lists no books");
        }
        let page_count = u32::try_from(page_count).context("page count does not fit in u32")?;
        if page_count == 0 {
            bail!("document has no pages");
        }

        let mut seen_keys = HashSet::<&str>::new();
        let mut plans = Vec::with_capacity(self.books.len());

        for (index, book) in self.books.iter().enumerate() {
            if book.key.trim().is_empty() {
                bail!("book #{} has an empty key", index + 1);
            }
            if !seen_keys.insert(book.key.as_str()) {
                bail!("duplicate book key in config: {}", book.key);
            }
            if book.start_page == 0 || book.start_page > page_count {
                bail!(
                    "book {} starts at page {} outside the document (1..={})",
                    book.key,
                    book.start_page,
                    page_count
                );
            }

            let end_page = match self.books.get(index + 1) {
                Some(next) if next.start_page <= book.start_page => bail!(
                    "book {} must start after book {} (page {} <= {})",
                    next.key,
                    book.key,
                    next.start_page,
                    book.start_page
                ),
                Some(next) => next.start_page - 1,
                None => page_count,
            };

            let detection = match book.toc_page {
                Some(toc_page) if toc_page == 0 || toc_page > page_count => bail!(
                    "book {} has toc page {} outside the document (1..={})",
                    book.key,
                    toc_page,
                    page_count
                ),
                Some(toc_page) => Detection::Toc { toc_page },
                None => Detection::Outline,
            };

            plans.push(BookPlan {
                key: book.key.clone(),
                title: book.title.clone(),
                span: PageSpan::new(book.start_page, end_page),
                detection,
            });
        }

        Ok(plans)
    }
}
