//! Data types shared across the import pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults;
use crate::document::Document;

// =============================================================================
// IMPORT FORMAT
// =============================================================================

/// Supported source formats. Selected purely by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportFormat {
    /// Exported notebook HTML (`.html`, `.htm`)
    Html,
    /// MHTML web archive (`.mht`, `.mhtml`)
    Mht,
    /// Word-processor document (`.docx`)
    Docx,
    /// PDF text (`.pdf`)
    Pdf,
    /// ZIP-based notebook package (`.onepkg`)
    Onepkg,
}

/// Name and colour of a tag attached on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagSpec {
    pub name: &'static str,
    pub color: &'static str,
}

impl TagSpec {
    pub const ONENOTE: TagSpec = TagSpec {
        name: defaults::ONENOTE_TAG_NAME,
        color: defaults::ONENOTE_TAG_COLOR,
    };
    pub const DOCX: TagSpec = TagSpec {
        name: defaults::DOCX_TAG_NAME,
        color: defaults::DOCX_TAG_COLOR,
    };
    pub const PDF: TagSpec = TagSpec {
        name: defaults::PDF_TAG_NAME,
        color: defaults::PDF_TAG_COLOR,
    };
}

impl ImportFormat {
    pub const ALL: [ImportFormat; 5] = [
        ImportFormat::Html,
        ImportFormat::Mht,
        ImportFormat::Docx,
        ImportFormat::Pdf,
        ImportFormat::Onepkg,
    ];

    /// Resolve a format from a bare extension (case-insensitive, no dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "html" | "htm" => Some(Self::Html),
            "mht" | "mhtml" => Some(Self::Mht),
            "docx" => Some(Self::Docx),
            "pdf" => Some(Self::Pdf),
            "onepkg" => Some(Self::Onepkg),
            _ => None,
        }
    }

    /// Resolve a format from a filename's final extension.
    pub fn from_filename(filename: &str) -> Option<Self> {
        Self::from_extension(&extension_of(filename))
    }

    /// Extensions accepted for this format.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Html => &["html", "htm"],
            Self::Mht => &["mht", "mhtml"],
            Self::Docx => &["docx"],
            Self::Pdf => &["pdf"],
            Self::Onepkg => &["onepkg"],
        }
    }

    /// Multipart field carrying the file on the single-file endpoint.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Html => "htmlFile",
            Self::Mht => "mhtFile",
            Self::Docx => "docxFile",
            Self::Pdf => "pdfFile",
            Self::Onepkg => "onepkgFile",
        }
    }

    /// Upload limit for the single-file endpoint.
    pub fn max_bytes(&self) -> usize {
        match self {
            Self::Html => defaults::MAX_HTML_BYTES,
            Self::Mht => defaults::MAX_MHT_BYTES,
            Self::Docx => defaults::MAX_DOCX_BYTES,
            Self::Pdf => defaults::MAX_PDF_BYTES,
            Self::Onepkg => defaults::MAX_ONEPKG_BYTES,
        }
    }

    /// Tag attached by the single-file endpoint when tagging is requested.
    pub fn import_tag(&self) -> TagSpec {
        match self {
            Self::Html | Self::Mht | Self::Onepkg => TagSpec::ONENOTE,
            Self::Docx => TagSpec::DOCX,
            Self::Pdf => TagSpec::PDF,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Mht => "mht",
            Self::Docx => "docx",
            Self::Pdf => "pdf",
            Self::Onepkg => "onepkg",
        }
    }
}

impl std::fmt::Display for ImportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ImportFormat {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim_start_matches('.');
        Self::from_extension(trimmed).ok_or_else(|| format!("Invalid import format: {}", s))
    }
}

/// Lowercased final extension of a filename, without the dot. Empty when the
/// name has none.
pub fn extension_of(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    match name.rfind('.') {
        Some(pos) if pos + 1 < name.len() => name[pos + 1..].to_lowercase(),
        _ => String::new(),
    }
}

// =============================================================================
// SOURCE FILE
// =============================================================================

/// An uploaded file held in memory for conversion. Never persisted.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub original_name: String,
    /// Lowercased extension without the dot.
    pub extension: String,
    pub content: Vec<u8>,
    pub size_bytes: usize,
}

impl SourceFile {
    pub fn new(original_name: impl Into<String>, content: Vec<u8>) -> Self {
        let original_name = original_name.into();
        let extension = extension_of(&original_name);
        let size_bytes = content.len();
        Self {
            original_name,
            extension,
            content,
            size_bytes,
        }
    }

    pub fn format(&self) -> Option<ImportFormat> {
        ImportFormat::from_extension(&self.extension)
    }

    /// Filename without directory components and without the final extension.
    pub fn stem(&self) -> &str {
        let name = self
            .original_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.original_name);
        match name.rfind('.') {
            Some(pos) if pos > 0 => &name[..pos],
            _ => name,
        }
    }
}

// =============================================================================
// OPTIONS AND METADATA
// =============================================================================

/// Options shared by every file of a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportOptions {
    /// Attach the format's import tag to every created note.
    pub add_import_tag: bool,
    /// Split PDF text into one note per detected date.
    pub split_by_date: bool,
}

impl ImportOptions {
    pub fn with_import_tag(mut self, enabled: bool) -> Self {
        self.add_import_tag = enabled;
        self
    }

    pub fn with_split_by_date(mut self, enabled: bool) -> Self {
        self.split_by_date = enabled;
        self
    }
}

/// Authorship and timestamp hints recovered from document markup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl ImportMetadata {
    pub fn is_empty(&self) -> bool {
        self.created_at.is_none() && self.updated_at.is_none() && self.author.is_none()
    }
}

/// A span of text attributed to one detected date heading.
///
/// `start_index` and `end_index` are byte offsets into the segmented text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateSection {
    pub title: String,
    pub content: String,
    pub start_index: usize,
    pub end_index: usize,
}

// =============================================================================
// CONVERSION RESULTS
// =============================================================================

/// One document produced by a converter, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedDocument {
    pub title: String,
    pub document: Document,
    pub metadata: ImportMetadata,
    pub pinned: bool,
}

impl ConvertedDocument {
    pub fn new(title: impl Into<String>, document: Document) -> Self {
        Self {
            title: title.into(),
            document,
            metadata: ImportMetadata::default(),
            pinned: false,
        }
    }

    pub fn with_metadata(mut self, metadata: ImportMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn pinned(mut self) -> Self {
        self.pinned = true;
        self
    }
}

/// Output of [`crate::FormatConverter::convert`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionResult {
    pub documents: Vec<ConvertedDocument>,
    /// Non-fatal notes for the user.
    pub warnings: Vec<String>,
    /// Format-specific extra fields (page counts, section counts).
    pub info: serde_json::Map<String, serde_json::Value>,
}

impl ConversionResult {
    /// Result holding one document, as every converter but PDF produces.
    pub fn single(document: ConvertedDocument) -> Self {
        Self {
            documents: vec![document],
            ..Default::default()
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn with_info(mut self, info: serde_json::Map<String, serde_json::Value>) -> Self {
        self.info = info;
        self
    }

    pub fn titles(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.title.clone()).collect()
    }
}

/// Raw text and page count from a PDF extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfText {
    pub text: String,
    pub page_count: usize,
}

/// HTML produced from a word-processor document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfficeHtml {
    pub html: String,
    pub warnings: Vec<String>,
}

// =============================================================================
// PERSISTENCE REQUESTS
// =============================================================================

/// Request passed to [`crate::NoteRepository::create_note`].
#[derive(Debug, Clone, PartialEq)]
pub struct CreateNoteRequest {
    pub title: String,
    pub document: Document,
    pub folder_id: Option<Uuid>,
    /// Store default (now) when absent.
    pub created_at: Option<DateTime<Utc>>,
    /// Store default (now) when absent.
    pub updated_at: Option<DateTime<Utc>>,
    pub pinned: bool,
}

impl CreateNoteRequest {
    pub fn from_converted(doc: ConvertedDocument, folder_id: Option<Uuid>) -> Self {
        Self {
            title: doc.title,
            document: doc.document,
            folder_id,
            created_at: doc.metadata.created_at,
            updated_at: doc.metadata.updated_at,
            pinned: doc.pinned,
        }
    }
}

// =============================================================================
// OUTCOMES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Success,
    Error,
}

/// Result of importing one file. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub source_file_name: String,
    pub status: ImportStatus,
    pub produced_titles: Vec<String>,
    pub produced_document_ids: Vec<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ImportOutcome {
    pub fn success(
        source_file_name: impl Into<String>,
        produced_titles: Vec<String>,
        produced_document_ids: Vec<Uuid>,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            source_file_name: source_file_name.into(),
            status: ImportStatus::Success,
            produced_titles,
            produced_document_ids,
            error_message: None,
            warnings,
        }
    }

    pub fn failure(source_file_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source_file_name: source_file_name.into(),
            status: ImportStatus::Error,
            produced_titles: Vec::new(),
            produced_document_ids: Vec::new(),
            error_message: Some(message.into()),
            warnings: Vec::new(),
        }
    }

    /// A failure after some notes were already persisted. The ids stay on
    /// the outcome so the batch totals match the store.
    pub fn failure_with_ids(
        source_file_name: impl Into<String>,
        message: impl Into<String>,
        produced_titles: Vec<String>,
        produced_document_ids: Vec<Uuid>,
    ) -> Self {
        Self {
            produced_titles,
            produced_document_ids,
            ..Self::failure(source_file_name, message)
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ImportStatus::Success
    }
}

/// Aggregate of every outcome in a batch, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total_files: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub total_documents_created: usize,
    pub outcomes: Vec<ImportOutcome>,
}

impl BatchReport {
    pub fn from_outcomes(outcomes: Vec<ImportOutcome>) -> Self {
        let success_count = outcomes.iter().filter(|o| o.is_success()).count();
        let total_documents_created = outcomes
            .iter()
            .map(|o| o.produced_document_ids.len())
            .sum();
        Self {
            total_files: outcomes.len(),
            success_count,
            error_count: outcomes.len() - success_count,
            total_documents_created,
            outcomes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension_case_insensitive() {
        assert_eq!(ImportFormat::from_extension("HTML"), Some(ImportFormat::Html));
        assert_eq!(ImportFormat::from_extension("htm"), Some(ImportFormat::Html));
        assert_eq!(ImportFormat::from_extension("MhTmL"), Some(ImportFormat::Mht));
        assert_eq!(ImportFormat::from_extension("onepkg"), Some(ImportFormat::Onepkg));
        assert_eq!(ImportFormat::from_extension("one"), None);
        assert_eq!(ImportFormat::from_extension(""), None);
    }

    #[test]
    fn test_format_from_filename() {
        assert_eq!(
            ImportFormat::from_filename("notes/Meeting.PDF"),
            Some(ImportFormat::Pdf)
        );
        assert_eq!(ImportFormat::from_filename("archive.tar.docx"), Some(ImportFormat::Docx));
        assert_eq!(ImportFormat::from_filename("README"), None);
    }

    #[test]
    fn test_format_display_from_str_roundtrip() {
        for format in ImportFormat::ALL {
            let parsed: ImportFormat = format.to_string().parse().unwrap();
            assert_eq!(parsed, format);
        }
        assert_eq!(".pdf".parse::<ImportFormat>(), Ok(ImportFormat::Pdf));
        assert!("exe".parse::<ImportFormat>().is_err());
    }

    #[test]
    fn test_format_field_names() {
        assert_eq!(ImportFormat::Html.field_name(), "htmlFile");
        assert_eq!(ImportFormat::Onepkg.field_name(), "onepkgFile");
    }

    #[test]
    fn test_format_import_tags() {
        assert_eq!(ImportFormat::Mht.import_tag(), TagSpec::ONENOTE);
        assert_eq!(ImportFormat::Docx.import_tag().color, "#2B5797");
        assert_eq!(ImportFormat::Pdf.import_tag().name, "PDF Import");
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("a.b.HTM"), "htm");
        assert_eq!(extension_of("dir.v2/file"), "");
        assert_eq!(extension_of("trailing."), "");
    }

    #[test]
    fn test_source_file_stem_and_extension() {
        let file = SourceFile::new("C:\\Users\\me\\Journal 2024.pdf", vec![1, 2, 3]);
        assert_eq!(file.extension, "pdf");
        assert_eq!(file.stem(), "Journal 2024");
        assert_eq!(file.size_bytes, 3);
        assert_eq!(file.format(), Some(ImportFormat::Pdf));

        let hidden = SourceFile::new(".profile", Vec::new());
        assert_eq!(hidden.stem(), ".profile");
    }

    #[test]
    fn test_import_options_deserialize_partial() {
        let opts: ImportOptions = serde_json::from_str(r#"{"splitByDate": true}"#).unwrap();
        assert!(opts.split_by_date);
        assert!(!opts.add_import_tag);
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = ImportOutcome::failure("bad.docx", "corrupt archive");
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["sourceFileName"], "bad.docx");
        assert_eq!(value["status"], "error");
        assert_eq!(value["errorMessage"], "corrupt archive");
        assert!(value.get("warnings").is_none());
    }

    #[test]
    fn test_batch_report_counts() {
        let report = BatchReport::from_outcomes(vec![
            ImportOutcome::success(
                "a.pdf",
                vec!["A".into(), "B".into()],
                vec![Uuid::new_v4(), Uuid::new_v4()],
                Vec::new(),
            ),
            ImportOutcome::failure("b.docx", "boom"),
            ImportOutcome::success("c.html", vec!["C".into()], vec![Uuid::new_v4()], Vec::new()),
        ]);
        assert_eq!(report.total_files, 3);
        assert_eq!(report.success_count, 2);
        assert_eq!(report.error_count, 1);
        assert_eq!(report.total_documents_created, 3);
        assert_eq!(report.outcomes[1].source_file_name, "b.docx");
    }

    #[test]
    fn test_partial_failure_counts_persisted_notes() {
        let kept = Uuid::new_v4();
        let report = BatchReport::from_outcomes(vec![ImportOutcome::failure_with_ids(
            "journal.pdf",
            "write rejected",
            vec!["Day 1".into()],
            vec![kept],
        )]);
        assert_eq!(report.error_count, 1);
        assert_eq!(report.total_documents_created, 1);
        assert_eq!(report.outcomes[0].produced_document_ids, vec![kept]);
        assert_eq!(
            report.outcomes[0].error_message.as_deref(),
            Some("write rejected")
        );
    }

    #[test]
    fn test_single_conversion_result() {
        let result = ConversionResult::single(ConvertedDocument::new("Memo", Document::default()))
            .with_warnings(vec!["1 embedded image(s) were not imported.".into()]);
        assert_eq!(result.titles(), vec!["Memo"]);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.info.is_empty());
    }

    #[test]
    fn test_create_note_request_from_converted() {
        let created = Utc::now();
        let doc = ConvertedDocument::new("Guide", Document::default())
            .with_metadata(ImportMetadata {
                created_at: Some(created),
                ..Default::default()
            })
            .pinned();
        let req = CreateNoteRequest::from_converted(doc, None);
        assert_eq!(req.title, "Guide");
        assert!(req.pinned);
        assert_eq!(req.created_at, Some(created));
        assert_eq!(req.updated_at, None);
    }
}
