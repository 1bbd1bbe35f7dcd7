//! Import HTTP handlers.
//!
//! Every endpoint takes `multipart/form-data`. File parts are checked for an
//! accepted extension before any of their bytes are read, then streamed to a
//! [`StagedFile`] chunk by chunk so the size limit is enforced without
//! buffering the whole upload in memory.
//!
//! # Multipart Fields
//! - `htmlFile` / `mhtFile` / `docxFile` / `pdfFile` / `onepkgFile`: the file
//!   for the single-file endpoints
//! - `files`: repeated file field for the batch endpoint
//! - `folderId`: target folder UUID (optional)
//! - `options`: JSON `{"addImportTag": bool, "splitByDate": bool}` (optional)
//! - `addImportTag`: `true`/`false`, overrides `options.addImportTag` (optional)

use std::collections::BTreeMap;
use std::time::Instant;

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use noteport_core::{defaults, BatchReport, ImportFormat, ImportOptions, ImportOutcome};
use noteport_import::{ImportedFile, StagedFile};

use crate::{ApiError, AppState};

/// Multipart field carrying the files of a batch request.
pub const BATCH_FIELD: &str = "files";

const MB: usize = 1024 * 1024;

// =============================================================================
// RESPONSES
// =============================================================================

/// Success envelope shared by every import endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Result of a single-file import.
///
/// When one upload produced several notes (a date-split PDF) `noteId` and
/// `title` describe the first one and `noteIds` lists all of them.
/// Converter info such as `sectionsCount` is flattened into the object.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportNoteData {
    pub note_id: Uuid,
    pub title: String,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_ids: Option<Vec<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes_created: Option<usize>,
    #[serde(flatten)]
    pub info: serde_json::Map<String, serde_json::Value>,
}

impl TryFrom<ImportedFile> for ImportNoteData {
    type Error = ApiError;

    fn try_from(imported: ImportedFile) -> Result<Self, ApiError> {
        let note_id = *imported
            .note_ids
            .first()
            .ok_or_else(|| ApiError::Internal("Conversion produced no notes".to_string()))?;
        let title = imported.titles.first().cloned().unwrap_or_default();
        let count = imported.note_ids.len();
        let split = count > 1;
        Ok(Self {
            note_id,
            title,
            warnings: imported.warnings,
            note_ids: split.then_some(imported.note_ids),
            notes_created: split.then_some(count),
            info: imported.info,
        })
    }
}

/// Result of a batch import. Partial success is still a success response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchImportData {
    pub total_files: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub total_notes_created: usize,
    pub notes: Vec<ImportOutcome>,
}

impl From<BatchReport> for BatchImportData {
    fn from(report: BatchReport) -> Self {
        Self {
            total_files: report.total_files,
            success_count: report.success_count,
            error_count: report.error_count,
            total_notes_created: report.total_documents_created,
            notes: report.outcomes,
        }
    }
}

/// Converter availability.
#[derive(Debug, Serialize)]
pub struct ImportHealthData {
    pub healthy: bool,
    pub converters: BTreeMap<&'static str, bool>,
}

type Created = (StatusCode, Json<ApiResponse<ImportNoteData>>);

// =============================================================================
// FORM PARSING
// =============================================================================

/// Limits applied while reading a request's file parts.
struct UploadRules<'a> {
    field: &'a str,
    accepted: &'a [ImportFormat],
    max_file_bytes: usize,
    max_files: usize,
    /// Reject the request on a disallowed extension. Otherwise the part is
    /// staged empty, unread, and fails later as its own outcome.
    reject_unsupported: bool,
}

#[derive(Default)]
struct ImportForm {
    files: Vec<StagedFile>,
    folder_id: Option<String>,
    options: Option<String>,
    add_import_tag: Option<String>,
}

impl ImportForm {
    fn folder_id(&self) -> Result<Option<Uuid>, ApiError> {
        parse_folder_id(self.folder_id.as_deref())
    }

    fn options(&self) -> Result<ImportOptions, ApiError> {
        let mut options = match self.options.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => serde_json::from_str::<ImportOptions>(raw)
                .map_err(|e| ApiError::BadRequest(format!("Invalid options: {}", e)))?,
            _ => ImportOptions::default(),
        };
        if let Some(raw) = self.add_import_tag.as_deref() {
            options.add_import_tag = parse_flag(raw)?;
        }
        Ok(options)
    }
}

fn multipart_error(e: MultipartError) -> ApiError {
    ApiError::BadRequest(format!("Multipart error: {}", e))
}

/// Parse an optional folder id. Blank values mean "no folder".
pub fn parse_folder_id(raw: Option<&str>) -> Result<Option<Uuid>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => Uuid::parse_str(value)
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("Invalid folderId format: {}", value))),
    }
}

fn parse_flag(raw: &str) -> Result<bool, ApiError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" => Ok(true),
        "false" | "0" | "off" | "" => Ok(false),
        other => Err(ApiError::BadRequest(format!(
            "Invalid addImportTag value: {}",
            other
        ))),
    }
}

/// Check an upload's filename against the formats an endpoint accepts.
pub fn check_extension(
    file_name: Option<&str>,
    accepted: &[ImportFormat],
) -> Result<ImportFormat, ApiError> {
    let name = file_name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Uploaded file has no filename".to_string()))?;
    match ImportFormat::from_filename(name) {
        Some(format) if accepted.contains(&format) => Ok(format),
        _ => {
            let allowed: Vec<String> = accepted
                .iter()
                .flat_map(|f| f.extensions())
                .map(|ext| format!(".{}", ext))
                .collect();
            Err(ApiError::BadRequest(format!(
                "Unsupported file type: '{}'. Accepted extensions: {}",
                name,
                allowed.join(", ")
            )))
        }
    }
}

async fn read_text(field: Field<'_>) -> Result<String, ApiError> {
    field.text().await.map_err(multipart_error)
}

async fn stage_field(
    mut field: Field<'_>,
    state: &AppState,
    rules: &UploadRules<'_>,
) -> Result<StagedFile, ApiError> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let checked = check_extension(Some(&file_name), rules.accepted);

    let mut staged = match checked {
        Ok(_) => StagedFile::create(&state.importer.config().temp_dir, &file_name)?,
        Err(e) if rules.reject_unsupported => return Err(e),
        Err(e) => {
            debug!(file_name = %file_name, error = %e, "Skipping unsupported upload");
            return Ok(StagedFile::create(
                &state.importer.config().temp_dir,
                &file_name,
            )?);
        }
    };
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if staged.size_bytes() + chunk.len() > rules.max_file_bytes {
            return Err(ApiError::BadRequest(format!(
                "File '{}' exceeds the maximum size of {} MB",
                staged.original_name(),
                rules.max_file_bytes / MB
            )));
        }
        staged.write_chunk(&chunk)?;
    }
    debug!(
        file_name = %staged.original_name(),
        size_bytes = staged.size_bytes(),
        "Upload staged"
    );
    Ok(staged)
}

/// Read every part of the form. Staged files already written are removed
/// when an error drops the partially built form.
async fn read_form(
    multipart: &mut Multipart,
    state: &AppState,
    rules: &UploadRules<'_>,
) -> Result<ImportForm, ApiError> {
    let mut form = ImportForm::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "folderId" => form.folder_id = Some(read_text(field).await?),
            "options" => form.options = Some(read_text(field).await?),
            "addImportTag" => form.add_import_tag = Some(read_text(field).await?),
            n if n == rules.field => {
                if form.files.len() >= rules.max_files {
                    return Err(ApiError::BadRequest(format!(
                        "Too many files: at most {} per request",
                        rules.max_files
                    )));
                }
                form.files.push(stage_field(field, state, rules).await?);
            }
            _ => {} // ignore unknown fields
        }
    }
    Ok(form)
}

// =============================================================================
// HANDLERS
// =============================================================================

async fn import_single(
    state: AppState,
    format: ImportFormat,
    mut multipart: Multipart,
) -> Result<Created, ApiError> {
    let start = Instant::now();
    let rules = UploadRules {
        field: format.field_name(),
        accepted: std::slice::from_ref(&format),
        max_file_bytes: format.max_bytes(),
        max_files: 1,
        reject_unsupported: true,
    };
    let mut form = read_form(&mut multipart, &state, &rules).await?;
    let folder_id = form.folder_id()?;
    let options = form.options()?;
    let staged = form
        .files
        .pop()
        .ok_or_else(|| ApiError::BadRequest(format!("Missing file field '{}'", rules.field)))?;

    if let Some(id) = folder_id {
        if !state.folders.exists(id).await? {
            return Err(ApiError::NotFound(format!("Folder {} not found", id)));
        }
    }

    let imported = state.importer.import_file(staged, &options, folder_id).await?;
    let data = ImportNoteData::try_from(imported)?;
    info!(
        format = %format,
        note_id = %data.note_id,
        document_count = data.notes_created.unwrap_or(1),
        duration_ms = start.elapsed().as_millis() as u64,
        "File imported"
    );
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(data))))
}

/// Import an exported notebook HTML page (`.html`, `.htm`).
///
/// # Returns
/// - 201 Created with `{noteId, title, warnings}`
/// - 400 Bad Request for a bad extension, oversized file, or bad `folderId`
/// - 404 Not Found if the folder does not exist
/// - 500 if conversion fails
pub async fn import_onenote(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Created, ApiError> {
    import_single(state, ImportFormat::Html, multipart).await
}

/// Import an MHTML web archive (`.mht`, `.mhtml`).
pub async fn import_mht(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Created, ApiError> {
    import_single(state, ImportFormat::Mht, multipart).await
}

/// Import a word-processor document (`.docx`).
pub async fn import_docx(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Created, ApiError> {
    import_single(state, ImportFormat::Docx, multipart).await
}

/// Import a PDF. With `options.splitByDate` one note is created per date
/// heading and the response also lists `noteIds`.
pub async fn import_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Created, ApiError> {
    import_single(state, ImportFormat::Pdf, multipart).await
}

/// Import a notebook package (`.onepkg`) as a pinned re-export guide note.
pub async fn import_onepkg(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Created, ApiError> {
    import_single(state, ImportFormat::Onepkg, multipart).await
}

/// Import up to `MAX_BATCH_FILES` files of any supported format.
///
/// Files are converted concurrently; one failing file never fails the
/// request. Each outcome is reported in upload order.
///
/// # Returns
/// - 200 OK with the batch report, including partial success
/// - 400 Bad Request for no files, too many files, an oversized file, or a
///   bad `folderId`
///
/// A file with an unsupported extension is never read; it is reported as an
/// `error` outcome like any other failing file.
pub async fn import_batch(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<BatchImportData>>, ApiError> {
    let rules = UploadRules {
        field: BATCH_FIELD,
        accepted: &ImportFormat::ALL,
        max_file_bytes: defaults::MAX_BATCH_FILE_BYTES,
        max_files: state.config.max_batch_files,
        reject_unsupported: false,
    };
    let form = read_form(&mut multipart, &state, &rules).await?;
    let folder_id = form.folder_id()?;
    let options = form.options()?;
    if form.files.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "No files uploaded in field '{}'",
            BATCH_FIELD
        )));
    }

    let report = state.importer.run(form.files, options, folder_id).await;
    Ok(Json(ApiResponse::ok(report.into())))
}

/// Report which converters have their external tools available.
pub async fn import_health(State(state): State<AppState>) -> Json<ApiResponse<ImportHealthData>> {
    let results = state.importer.registry().health_check_all().await;
    let converters: BTreeMap<&'static str, bool> = results
        .into_iter()
        .map(|(format, ok)| (format.as_str(), ok))
        .collect();
    let healthy = converters.values().all(|ok| *ok);
    Json(ApiResponse::ok(ImportHealthData {
        healthy,
        converters,
    }))
}
