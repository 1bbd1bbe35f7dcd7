//! PdfConverter: text-layer PDFs, optionally split into one note per date.
//!
//! Text comes from a [`PdfTextExtractor`]; the default one shells out to
//! `pdfinfo` and `pdftotext` (poppler-utils).

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;
use tokio::process::Command;
use tracing::{debug, trace, warn};

use noteport_core::defaults::{
    EXTRACTION_CMD_TIMEOUT_SECS, FALLBACK_NOTE_TITLE, IMPORT_TEMP_SUBDIR, PDF_TITLE_MAX_CHARS,
};
use noteport_core::{
    ConversionResult, ConvertedDocument, Document, Error, FormatConverter, ImportFormat,
    ImportOptions, PdfText, PdfTextExtractor, Result, SourceFile,
};

use crate::adapters::command::{run_cmd_with_timeout, write_tool_input};
use crate::date_sections;
use crate::encoding;

pub const TEXT_ONLY_WARNING: &str = "PDF import is text only; formatting is not preserved.";
pub const NO_TEXT_WARNING: &str =
    "No text layer was found; scanned pages need OCR before they can be imported.";

static BLANK_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t\r]*\n").unwrap());
static PAGE_BREAK_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-- \d+ of \d+ --$").unwrap());

// =============================================================================
// CONVERTER
// =============================================================================

/// Converter for `.pdf` files.
pub struct PdfConverter {
    extractor: Arc<dyn PdfTextExtractor>,
}

impl PdfConverter {
    pub fn new(extractor: Arc<dyn PdfTextExtractor>) -> Self {
        Self { extractor }
    }
}

/// First non-empty line, truncated, else the filename stem.
pub fn base_title(text: &str, stem: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !PAGE_BREAK_ONLY.is_match(line))
        .map(|line| line.chars().take(PDF_TITLE_MAX_CHARS).collect::<String>())
        .or_else(|| {
            let stem = stem.trim();
            (!stem.is_empty()).then(|| stem.to_string())
        })
        .unwrap_or_else(|| FALLBACK_NOTE_TITLE.to_string())
}

/// One paragraph per blank-line-delimited block, without page-break markers.
pub fn text_to_document(text: &str) -> Document {
    let normalized = text.replace("\r\n", "\n");
    Document::from_paragraphs(
        BLANK_LINE
            .split(&normalized)
            .map(str::trim)
            .filter(|block| !PAGE_BREAK_ONLY.is_match(block)),
    )
}

#[async_trait]
impl FormatConverter for PdfConverter {
    fn format(&self) -> ImportFormat {
        ImportFormat::Pdf
    }

    async fn convert(&self, file: &SourceFile, options: &ImportOptions) -> Result<ConversionResult> {
        let extracted = self.extractor.extract(&file.content).await?;
        let text = encoding::resolve(extracted.text.as_bytes());
        let base = base_title(&text, file.stem());

        let documents = if options.split_by_date {
            let sections = date_sections::segment(&text);
            debug!(
                file_name = %file.original_name,
                section_count = sections.len(),
                "Split PDF text by date"
            );
            sections
                .iter()
                .map(|section| {
                    let title = if date_sections::is_fallback(section) {
                        base.clone()
                    } else {
                        format!("{} - {}", base, section.title)
                    };
                    trace!(title = %title, start = section.start_index, "PDF section");
                    ConvertedDocument::new(title, text_to_document(&section.content))
                })
                .collect()
        } else {
            vec![ConvertedDocument::new(base, text_to_document(&text))]
        };

        let mut warnings = vec![TEXT_ONLY_WARNING.to_string()];
        if text.trim().is_empty() {
            warnings.push(NO_TEXT_WARNING.to_string());
        }

        let mut info = serde_json::Map::new();
        info.insert("pages".into(), JsonValue::from(extracted.page_count));
        info.insert("textLength".into(), JsonValue::from(text.chars().count()));

        Ok(ConversionResult {
            documents,
            warnings,
            info,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        self.extractor.health_check().await
    }

    fn name(&self) -> &str {
        "pdf"
    }
}

// =============================================================================
// POPPLER EXTRACTOR
// =============================================================================

/// Extracts text with `pdftotext` (poppler-utils), page count with `pdfinfo`.
///
/// Page boundaries (form feeds in `pdftotext` output) become
/// `-- N of M --` marker lines.
pub struct PopplerPdfExtractor {
    timeout_secs: u64,
    /// Where the PDF is written for the tools to read.
    temp_dir: PathBuf,
}

impl PopplerPdfExtractor {
    pub fn new(timeout_secs: u64, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            timeout_secs,
            temp_dir: temp_dir.into(),
        }
    }
}

impl Default for PopplerPdfExtractor {
    fn default() -> Self {
        Self::new(
            EXTRACTION_CMD_TIMEOUT_SECS,
            std::env::temp_dir().join(IMPORT_TEMP_SUBDIR),
        )
    }
}

/// Page count from `pdfinfo` output, if reported.
fn parse_page_count(pdfinfo: &str) -> Option<usize> {
    pdfinfo.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        (key.trim() == "Pages")
            .then(|| value.trim().parse().ok())
            .flatten()
    })
}

/// Replace form-feed page separators with numbered marker lines.
pub fn mark_page_breaks(raw: &str, page_count: Option<usize>) -> (String, usize) {
    let mut pages: Vec<&str> = raw.split('\x0C').collect();
    // pdftotext terminates every page, so the last piece is normally empty.
    if pages.len() > 1 && pages.last().map_or(false, |p| p.trim().is_empty()) {
        pages.pop();
    }
    let total = page_count.unwrap_or(pages.len()).max(pages.len());

    let mut text = String::with_capacity(raw.len() + pages.len() * 16);
    for (i, page) in pages.iter().enumerate() {
        text.push_str(page.trim_end_matches('\n'));
        text.push_str(&format!("\n\n-- {} of {} --\n\n", i + 1, total));
    }
    (text, total)
}

#[async_trait]
impl PdfTextExtractor for PopplerPdfExtractor {
    async fn extract(&self, data: &[u8]) -> Result<PdfText> {
        if data.is_empty() {
            return Err(Error::Conversion(
                "Cannot extract text from empty PDF data".to_string(),
            ));
        }
        if data.len() < 4 || &data[0..4] != b"%PDF" {
            return Err(Error::Conversion(
                "File is not a valid PDF (missing %PDF header)".to_string(),
            ));
        }

        let tmpfile = write_tool_input(&self.temp_dir, ".pdf", data)?;
        let path = tmpfile.path().to_path_buf();

        let page_count =
            match run_cmd_with_timeout(Command::new("pdfinfo").arg(&path), self.timeout_secs).await
            {
                Ok(out) => parse_page_count(&String::from_utf8_lossy(&out)),
                Err(e) => {
                    warn!(error = %e, "pdfinfo failed, continuing without page count");
                    None
                }
            };

        let stdout = run_cmd_with_timeout(
            Command::new("pdftotext")
                .arg("-enc")
                .arg("UTF-8")
                .arg(&path)
                .arg("-"),
            self.timeout_secs,
        )
        .await?;

        let raw = encoding::resolve(&stdout);
        let (text, page_count) = mark_page_breaks(&raw, page_count);
        debug!(page_count, text_len = text.len(), "Extracted PDF text");
        Ok(PdfText { text, page_count })
    }

    async fn health_check(&self) -> Result<bool> {
        match Command::new("pdftotext").arg("-v").output().await {
            // Exits 0 or 99 depending on the poppler version.
            Ok(output) => Ok(output.status.success() || output.status.code() == Some(99)),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "poppler"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedText(&'static str, usize);

    #[async_trait]
    impl PdfTextExtractor for FixedText {
        async fn extract(&self, _data: &[u8]) -> Result<PdfText> {
            Ok(PdfText {
                text: self.0.to_string(),
                page_count: self.1,
            })
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn converter(text: &'static str) -> PdfConverter {
        PdfConverter::new(Arc::new(FixedText(text, 2)))
    }

    fn pdf_file() -> SourceFile {
        SourceFile::new("diary.pdf", b"%PDF-1.4".to_vec())
    }

    #[test]
    fn test_base_title_rules() {
        assert_eq!(base_title("\n  My Diary  \nbody", "x"), "My Diary");
        assert_eq!(base_title("   \n", "stem"), "stem");
        assert_eq!(base_title("", ""), FALLBACK_NOTE_TITLE);
        let long = "a".repeat(300);
        assert_eq!(base_title(&long, "x").chars().count(), PDF_TITLE_MAX_CHARS);
    }

    #[test]
    fn test_text_to_document_skips_markers() {
        let doc = text_to_document("first block\nline two\n\n-- 1 of 2 --\n\nsecond");
        assert_eq!(doc.content.len(), 2);
        assert_eq!(doc.plain_text(), "first block\nline two\nsecond");
    }

    #[test]
    fn test_mark_page_breaks() {
        let (text, total) = mark_page_breaks("page one\n\x0Cpage two\n\x0C", Some(2));
        assert_eq!(total, 2);
        assert_eq!(
            text,
            "page one\n\n-- 1 of 2 --\n\npage two\n\n-- 2 of 2 --\n\n"
        );
    }

    #[test]
    fn test_mark_page_breaks_without_pdfinfo() {
        let (_, total) = mark_page_breaks("a\x0Cb\x0Cc\x0C", None);
        assert_eq!(total, 3);
    }

    #[test]
    fn test_parse_page_count() {
        let out = "Title:          Report\nPages:          42\nPage size:      612 x 792 pts";
        assert_eq!(parse_page_count(out), Some(42));
        assert_eq!(parse_page_count("Producer: x"), None);
    }

    #[tokio::test]
    async fn test_single_document_with_info() {
        let result = converter("Diary\n\nfirst day\n\nsecond day")
            .convert(&pdf_file(), &ImportOptions::default())
            .await
            .unwrap();
        assert_eq!(result.documents.len(), 1);
        assert_eq!(result.documents[0].title, "Diary");
        assert_eq!(result.documents[0].document.content.len(), 3);
        assert_eq!(result.warnings, vec![TEXT_ONLY_WARNING.to_string()]);
        assert_eq!(result.info["pages"], 2);
        assert_eq!(result.info["textLength"], 28);
    }

    #[tokio::test]
    async fn test_split_by_date_titles() {
        let opts = ImportOptions::default().with_split_by_date(true);
        let result = converter("Diary\n2025年1月1日\nentry A\n2025年1月2日\nentry B")
            .convert(&pdf_file(), &opts)
            .await
            .unwrap();
        assert_eq!(
            result.titles(),
            vec!["Diary - 2025年1月1日", "Diary - 2025年1月2日"]
        );
        assert_eq!(
            result.documents[1].document.plain_text(),
            "2025年1月2日\nentry B"
        );
    }

    #[tokio::test]
    async fn test_split_without_dates_uses_base_title() {
        let opts = ImportOptions::default().with_split_by_date(true);
        let result = converter("Notes\nno dates here")
            .convert(&pdf_file(), &opts)
            .await
            .unwrap();
        assert_eq!(result.titles(), vec!["Notes"]);
    }

    #[tokio::test]
    async fn test_empty_text_warns() {
        let result = converter("  ")
            .convert(&pdf_file(), &ImportOptions::default())
            .await
            .unwrap();
        assert_eq!(result.documents[0].title, "diary");
        assert!(result.warnings.contains(&NO_TEXT_WARNING.to_string()));
    }

    #[tokio::test]
    async fn test_poppler_rejects_empty_and_non_pdf() {
        let extractor = PopplerPdfExtractor::default();
        let err = extractor.extract(b"").await.unwrap_err();
        assert!(err.to_string().contains("empty"));
        let err = extractor.extract(b"not a pdf at all").await.unwrap_err();
        assert!(err.to_string().contains("not a valid PDF"));
    }

    #[tokio::test]
    async fn test_poppler_uses_configured_temp_dir() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("imports");
        let extractor = PopplerPdfExtractor::new(5, &dir);
        // Truncated PDF: the tools fail or find no text, either way the
        // input file lives in `dir` and is gone afterwards.
        let _ = extractor.extract(b"%PDF-1.4 truncated").await;
        assert!(dir.is_dir());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_poppler_health_check() {
        assert!(PopplerPdfExtractor::default().health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_poppler_extraction() {
        let pdf_bytes = b"%PDF-1.0
1 0 obj
<< /Type /Catalog /Pages 2 0 R >>
endobj

2 0 obj
<< /Type /Pages /Kids [3 0 R] /Count 1 >>
endobj

3 0 obj
<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792]
   /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>
endobj

4 0 obj
<< /Length 44 >>
stream
BT /F1 12 Tf 100 700 Td (Hello World) Tj ET
endstream
endobj

5 0 obj
<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>
endobj

xref
0 6
0000000000 65535 f
0000000009 00000 n
0000000058 00000 n
0000000115 00000 n
0000000266 00000 n
0000000360 00000 n

trailer
<< /Size 6 /Root 1 0 R >>
startxref
434
%%EOF";

        let extractor = PopplerPdfExtractor::default();
        if !extractor.health_check().await.unwrap_or(false) {
            eprintln!("Skipping test_poppler_extraction: pdftotext not installed");
            return;
        }
        let extracted = extractor.extract(pdf_bytes).await.unwrap();
        assert!(extracted.text.contains("Hello World"), "{}", extracted.text);
        assert!(extracted.text.contains("-- 1 of 1 --"));
        assert_eq!(extracted.page_count, 1);
    }
}
