use super::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(super) struct OutlineEntry {
    pub(super) level: u32,
    pub(super) title: String,
    /// 1-based page the bookmark points at; 0 when the destination is unknown.
    pub(super) page: u32,
}

/// Page-level access to a source document. Indices are 0-based.
pub(super) trait PageReader {
    fn page_count(&self) -> usize;

    fn page_text(&self, index: usize) -> Option<&str>;

    fn outline(&self) -> Result<Vec<OutlineEntry>>;

    fn page_text_1based(&self, page: u32) -> Option<&str> {
        let index = usize::try_from(page).ok()?.checked_sub(1)?;
        self.page_text(index)
    }
}

/// Reads a PDF through poppler-utils. Page text is loaded once on open and
/// held for the lifetime of the reader.
#[derive(Debug)]
pub(super) struct PopplerPageReader {
    pdf_path: PathBuf,
    pages: Vec<String>,
}

impl PopplerPageReader {
    pub(super) fn open(pdf_path: &Path) -> Result<Self> {
        if !pdf_path.is_file() {
            bail!("PDF not found: {}", pdf_path.display());
        }

        let page_count = read_page_count_with_pdfinfo(pdf_path)?;
        let mut pages = extract_pages_with_pdftotext(pdf_path)?;
        if pages.len() > page_count {
            warn!(
                path = %pdf_path.display(),
                pdfinfo_pages = page_count,
                pdftotext_pages = pages.len(),
                "pdftotext produced more pages than pdfinfo reported"
            );
        }
        pages.resize(page_count.max(pages.len()), String::new());

        info!(path = %pdf_path.display(), pages = pages.len(), "opened source document");

        Ok(Self {
            pdf_path: pdf_path.to_path_buf(),
            pages,
        })
    }
}

impl PageReader for PopplerPageReader {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, index: usize) -> Option<&str> {
        self.pages
            .get(index)
            .map(String::as_str)
            .filter(|text| !text.trim().is_empty())
    }

    fn outline(&self) -> Result<Vec<OutlineEntry>> {
        extract_outline_with_pdftohtml(&self.pdf_path)
    }
}

#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub(super) struct MemoryPageReader {
    pub(super) pages: Vec<String>,
    pub(super) outline: Vec<OutlineEntry>,
}

#[cfg(test)]
impl MemoryPageReader {
    pub(super) fn new(pages: Vec<String>) -> Self {
        Self {
            pages,
            outline: Vec::new(),
        }
    }

    pub(super) fn with_outline(mut self, outline: Vec<OutlineEntry>) -> Self {
        self.outline = outline;
        self
    }
}

#[cfg(test)]
impl PageReader for MemoryPageReader {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, index: usize) -> Option<&str> {
        self.pages
            .get(index)
            .map(String::as_str)
            .filter(|text| !text.trim().is_empty())
    }

    fn outline(&self) -> Result<Vec<OutlineEntry>> {
        Ok(self.outline.clone())
    }
}

fn read_page_count_with_pdfinfo(pdf_path: &Path) -> Result<usize> {
    let output = Command::new("pdfinfo")
        .arg(pdf_path)
        .output()
        .with_context(|| format!("failed to execute pdfinfo for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdfinfo returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_pdfinfo_page_count(&stdout)
        .with_context(|| format!("pdfinfo reported no page count for {}", pdf_path.display()))
}

pub(super) fn parse_pdfinfo_page_count(stdout: &str) -> Option<usize> {
    stdout.lines().find_map(|line| {
        line.strip_prefix("Pages:")
            .and_then(|value| value.trim().parse::<usize>().ok())
    })
}

fn extract_pages_with_pdftotext(pdf_path: &Path) -> Result<Vec<String>> {
    let output = Command::new("pdftotext")
        .arg("-enc")
        .arg("UTF-8")
        .arg(pdf_path)
        .arg("-")
        .output()
        .with_context(|| format!("failed to execute pdftotext for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftotext returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    Ok(split_pdftotext_pages(&String::from_utf8_lossy(
        &output.stdout,
    )))
}

pub(super) fn split_pdftotext_pages(raw: &str) -> Vec<String> {
    let mut pages: Vec<String> = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect();

    // pdftotext terminates every page with a form feed, leaving one empty tail.
    if pages.last().map(|page| page.is_empty()).unwrap_or(false) {
        pages.pop();
    }

    pages
}

fn extract_outline_with_pdftohtml(pdf_path: &Path) -> Result<Vec<OutlineEntry>> {
    let output = Command::new("pdftohtml")
        .arg("-xml")
        .arg("-i")
        .arg("-f")
        .arg("1")
        .arg("-l")
        .arg("1")
        .arg(pdf_path)
        .arg("-stdout")
        .output()
        .with_context(|| format!("failed to execute pdftohtml for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftohtml returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    parse_outline_xml(&String::from_utf8_lossy(&output.stdout))
}

pub(super) fn parse_outline_xml(xml: &str) -> Result<Vec<OutlineEntry>> {
    let token_regex = Regex::new(r#"(?s)<outline>|</outline>|<item page="(\d+)">(.*?)</item>"#)
        .context("failed to compile outline token regex")?;

    let mut depth = 0u32;
    let mut entries = Vec::new();

    for captures in token_regex.captures_iter(xml) {
        let token = captures.get(0).map(|value| value.as_str()).unwrap_or("");
        if token == "<outline>" {
            depth += 1;
            continue;
        }
        if token == "</outline>" {
            depth = depth.saturating_sub(1);
            continue;
        }

        let page = captures
            .get(1)
            .and_then(|value| value.as_str().parse::<u32>().ok())
            .unwrap_or(0);
        let title = normalize_outline_label(captures.get(2).map(|value| value.as_str()).unwrap_or(""));
        if title.is_empty() {
            continue;
        }

        entries.push(OutlineEntry {
            level: depth.max(1),
            title,
            page,
        });
    }

    Ok(entries)
}

fn normalize_outline_label(raw_label: &str) -> String {
    raw_label
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .replace('\u{00a0}', " ")
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

pub(super) fn collect_tool_versions() -> Result<ToolVersions> {
    Ok(ToolVersions {
        pdftotext: command_version("pdftotext", &["-v"])?,
        pdfinfo: command_version("pdfinfo", &["-v"])?,
        pdftohtml: command_version_optional("pdftohtml", &["-v"]),
    })
}

fn command_version_optional(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    first_version_line(&output.stdout, &output.stderr)
}

fn command_version(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("failed to run {} {}", program, args.join(" ")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{} {} failed: {}", program, args.join(" "), stderr.trim());
    }

    Ok(first_version_line(&output.stdout, &output.stderr).unwrap_or_else(|| "unknown".to_string()))
}

// poppler prints its version banner on stderr.
fn first_version_line(stdout: &[u8], stderr: &[u8]) -> Option<String> {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    let source = if stdout.trim().is_empty() {
        stderr.trim()
    } else {
        stdout.trim()
    };

    source
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
}
