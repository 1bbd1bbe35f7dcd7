//! Batch orchestration: dispatch, persistence, tagging, and per-file outcomes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use noteport_core::defaults::{EXTRACTION_CMD_TIMEOUT_SECS, IMPORT_TEMP_SUBDIR};
use noteport_core::{
    BatchReport, CreateNoteRequest, Error, ImportFormat, ImportOptions, ImportOutcome,
    NoteRepository, OfficeHtmlConverter, Result, TagRepository, TagSpec,
};

use crate::adapters::{
    DocxConverter, HtmlConverter, MhtmlConverter, OnepkgConverter, OoxmlHtmlConverter,
    PandocHtmlConverter, PdfConverter, PopplerPdfExtractor,
};
use crate::registry::ConverterRegistry;
use crate::staging::StagedFile;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Which collaborator turns `.docx` bytes into HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocxBackend {
    /// In-process OOXML reader.
    #[default]
    Builtin,
    /// External `pandoc` binary.
    Pandoc,
}

impl std::str::FromStr for DocxBackend {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "builtin" | "ooxml" => Ok(Self::Builtin),
            "pandoc" => Ok(Self::Pandoc),
            other => Err(format!("Invalid DOCX converter: {}", other)),
        }
    }
}

/// Configuration for the import pipeline.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Maximum number of files converted at once within a batch.
    pub max_concurrent: usize,
    /// Directory for staged uploads.
    pub temp_dir: PathBuf,
    /// Timeout for each external tool invocation.
    pub cmd_timeout_secs: u64,
    pub docx_backend: DocxBackend,
}

fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_concurrent: available_cores(),
            temp_dir: std::env::temp_dir().join(IMPORT_TEMP_SUBDIR),
            cmd_timeout_secs: EXTRACTION_CMD_TIMEOUT_SECS,
            docx_backend: DocxBackend::Builtin,
        }
    }
}

impl ImportConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `IMPORT_MAX_CONCURRENT` | CPU cores | Files converted in parallel per batch |
    /// | `IMPORT_TEMP_DIR` | `$TMPDIR/noteport-imports` | Staging directory for uploads |
    /// | `EXTRACTION_CMD_TIMEOUT_SECS` | `120` | Timeout per external tool call |
    /// | `DOCX_CONVERTER` | `builtin` | `builtin` or `pandoc` |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_concurrent = std::env::var("IMPORT_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.max_concurrent)
            .max(1);

        let temp_dir = std::env::var("IMPORT_TEMP_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.temp_dir);

        let cmd_timeout_secs = std::env::var("EXTRACTION_CMD_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.cmd_timeout_secs);

        let docx_backend = match std::env::var("DOCX_CONVERTER") {
            Ok(v) => v.parse::<DocxBackend>().unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to builtin DOCX converter");
                DocxBackend::Builtin
            }),
            Err(_) => defaults.docx_backend,
        };

        Self {
            max_concurrent,
            temp_dir,
            cmd_timeout_secs,
            docx_backend,
        }
    }

    /// Set maximum concurrent conversions.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    pub fn with_cmd_timeout(mut self, secs: u64) -> Self {
        self.cmd_timeout_secs = secs;
        self
    }

    pub fn with_docx_backend(mut self, backend: DocxBackend) -> Self {
        self.docx_backend = backend;
        self
    }

    /// Registry with one converter per supported format.
    pub fn build_registry(&self) -> ConverterRegistry {
        let office: Arc<dyn OfficeHtmlConverter> = match self.docx_backend {
            DocxBackend::Builtin => Arc::new(OoxmlHtmlConverter),
            DocxBackend::Pandoc => Arc::new(PandocHtmlConverter::new(
                self.cmd_timeout_secs,
                &self.temp_dir,
            )),
        };

        let mut registry = ConverterRegistry::new();
        registry.register(Arc::new(HtmlConverter));
        registry.register(Arc::new(MhtmlConverter));
        registry.register(Arc::new(DocxConverter::new(office)));
        registry.register(Arc::new(PdfConverter::new(Arc::new(
            PopplerPdfExtractor::new(self.cmd_timeout_secs, &self.temp_dir),
        ))));
        registry.register(Arc::new(OnepkgConverter));
        registry
    }
}

// =============================================================================
// SHARED TAG
// =============================================================================

/// Import tag resolved at most once per request, on first use.
pub struct SharedTag {
    spec: TagSpec,
    id: OnceCell<Uuid>,
}

impl SharedTag {
    pub fn new(spec: TagSpec) -> Self {
        Self {
            spec,
            id: OnceCell::new(),
        }
    }

    /// Tag id, calling get-or-create only for the first caller. Concurrent
    /// callers wait for that single initialization.
    pub async fn id(&self, tags: &dyn TagRepository) -> Result<Uuid> {
        self.id
            .get_or_try_init(|| tags.get_or_create(self.spec.name, self.spec.color))
            .await
            .copied()
    }
}

// =============================================================================
// IMPORTER
// =============================================================================

/// Notes created from one uploaded file.
#[derive(Debug, Clone, Default)]
pub struct ImportedFile {
    pub note_ids: Vec<Uuid>,
    pub titles: Vec<String>,
    pub warnings: Vec<String>,
    /// Format-specific extras (page or section counts).
    pub info: serde_json::Map<String, serde_json::Value>,
}

/// A failed file import, with whatever notes were persisted before the
/// failure.
struct PartialImport {
    error: Error,
    titles: Vec<String>,
    note_ids: Vec<Uuid>,
}

impl From<Error> for PartialImport {
    fn from(error: Error) -> Self {
        Self {
            error,
            titles: Vec::new(),
            note_ids: Vec::new(),
        }
    }
}

/// Resolve the format of an upload from its name.
pub fn resolve_format(file_name: &str) -> Result<ImportFormat> {
    ImportFormat::from_filename(file_name)
        .ok_or_else(|| Error::UnsupportedFormat(format!("'{}' has no supported extension", file_name)))
}

/// Converts staged uploads and persists the resulting notes.
#[derive(Clone)]
pub struct BatchImporter {
    registry: Arc<ConverterRegistry>,
    notes: Arc<dyn NoteRepository>,
    tags: Arc<dyn TagRepository>,
    config: ImportConfig,
}

impl BatchImporter {
    pub fn new(
        registry: Arc<ConverterRegistry>,
        notes: Arc<dyn NoteRepository>,
        tags: Arc<dyn TagRepository>,
        config: ImportConfig,
    ) -> Self {
        Self {
            registry,
            notes,
            tags,
            config,
        }
    }

    pub fn registry(&self) -> &ConverterRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Import a single upload, tagging with the format's own tag.
    ///
    /// Errors are returned to the caller; the staged file is released either
    /// way.
    #[instrument(skip_all, fields(file_name = %staged.original_name()))]
    pub async fn import_file(
        &self,
        mut staged: StagedFile,
        options: &ImportOptions,
        folder_id: Option<Uuid>,
    ) -> Result<ImportedFile> {
        let result = match resolve_format(staged.original_name()) {
            Ok(format) => {
                let tag = options
                    .add_import_tag
                    .then(|| SharedTag::new(format.import_tag()));
                self.convert_and_persist(format, &mut staged, options, folder_id, tag.as_ref())
                    .await
            }
            Err(e) => Err(e.into()),
        };
        staged.release();
        result.map_err(|partial| partial.error)
    }

    /// Import one file of a batch. Never fails: errors become an `error`
    /// outcome.
    pub async fn import_one(
        &self,
        mut staged: StagedFile,
        options: &ImportOptions,
        folder_id: Option<Uuid>,
        tag: Option<&SharedTag>,
    ) -> ImportOutcome {
        let name = staged.original_name().to_string();
        let result = match resolve_format(&name) {
            Ok(format) => {
                self.convert_and_persist(format, &mut staged, options, folder_id, tag)
                    .await
            }
            Err(e) => Err(e.into()),
        };
        staged.release();

        match result {
            Ok(imported) => ImportOutcome::success(
                name,
                imported.titles,
                imported.note_ids,
                imported.warnings,
            ),
            Err(partial) => {
                warn!(
                    file_name = %name,
                    error = %partial.error,
                    document_count = partial.note_ids.len(),
                    "File import failed"
                );
                ImportOutcome::failure_with_ids(
                    name,
                    partial.error.to_string(),
                    partial.titles,
                    partial.note_ids,
                )
            }
        }
    }

    /// Import every file, converting up to `max_concurrent` at once.
    ///
    /// Outcomes are reported in input order. With `add_import_tag` every
    /// created note gets the same tag, created once for the whole batch.
    pub async fn run(
        &self,
        files: Vec<StagedFile>,
        options: ImportOptions,
        folder_id: Option<Uuid>,
    ) -> BatchReport {
        let start = Instant::now();
        let file_count = files.len();
        let tag = options
            .add_import_tag
            .then(|| Arc::new(SharedTag::new(TagSpec::ONENOTE)));
        let options = Arc::new(options);

        let outcomes: Vec<ImportOutcome> = stream::iter(files)
            .map(|staged| {
                let importer = self.clone();
                let options = Arc::clone(&options);
                let tag = tag.clone();
                let name = staged.original_name().to_string();
                async move {
                    let task = tokio::spawn(async move {
                        importer
                            .import_one(staged, &options, folder_id, tag.as_deref())
                            .await
                    });
                    match task.await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            warn!(file_name = %name, error = %e, "Import task aborted");
                            ImportOutcome::failure(name, format!("Import task failed: {}", e))
                        }
                    }
                }
            })
            .buffered(self.config.max_concurrent.max(1))
            .collect()
            .await;

        let report = BatchReport::from_outcomes(outcomes);
        info!(
            file_count,
            success_count = report.success_count,
            error_count = report.error_count,
            document_count = report.total_documents_created,
            duration_ms = start.elapsed().as_millis() as u64,
            "Batch import completed"
        );
        report
    }

    async fn convert_and_persist(
        &self,
        format: ImportFormat,
        staged: &mut StagedFile,
        options: &ImportOptions,
        folder_id: Option<Uuid>,
        tag: Option<&SharedTag>,
    ) -> std::result::Result<ImportedFile, PartialImport> {
        let start = Instant::now();
        let source = staged.read_source().await?;
        let result = self.registry.convert(format, &source, options).await?;
        drop(source);

        let mut titles = Vec::with_capacity(result.documents.len());
        let mut note_ids = Vec::with_capacity(result.documents.len());
        for document in result.documents {
            let title = document.title.clone();
            let created = self
                .notes
                .create_note(CreateNoteRequest::from_converted(document, folder_id))
                .await;
            let note_id = match created {
                Ok(id) => id,
                Err(error) => {
                    return Err(PartialImport {
                        error,
                        titles,
                        note_ids,
                    })
                }
            };
            // The note exists from here on; a tagging failure still reports it.
            titles.push(title);
            note_ids.push(note_id);
            if let Some(tag) = tag {
                let attached = match tag.id(self.tags.as_ref()).await {
                    Ok(tag_id) => self.tags.attach(note_id, tag_id).await,
                    Err(e) => Err(e),
                };
                if let Err(error) = attached {
                    return Err(PartialImport {
                        error,
                        titles,
                        note_ids,
                    });
                }
            }
        }

        debug!(
            file_name = %staged.original_name(),
            format = %format,
            document_count = note_ids.len(),
            warning_count = result.warnings.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Imported file"
        );
        Ok(ImportedFile {
            note_ids,
            titles,
            warnings: result.warnings,
            info: result.info,
        })
    }
}
