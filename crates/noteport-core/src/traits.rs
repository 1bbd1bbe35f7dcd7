//! Core traits for noteport.
//!
//! The persistence layer is an external collaborator reached only through the
//! repository traits below. Format conversion and its external tools sit
//! behind the converter traits.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    ConversionResult, CreateNoteRequest, ImportFormat, ImportOptions, OfficeHtml, PdfText, Result,
    SourceFile,
};

// =============================================================================
// NOTE REPOSITORY TRAITS
// =============================================================================

/// Repository for note creation.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Persist a note and return its id.
    ///
    /// Fails with `NotFound` when `folder_id` names an unknown folder.
    async fn create_note(&self, req: CreateNoteRequest) -> Result<Uuid>;
}

// =============================================================================
// TAG REPOSITORY TRAITS
// =============================================================================

/// Repository for tag operations.
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Return the id of the tag called `name`, creating it with `color` if it
    /// does not exist. Must be idempotent.
    async fn get_or_create(&self, name: &str, color: &str) -> Result<Uuid>;

    /// Attach a tag to a note.
    async fn attach(&self, note_id: Uuid, tag_id: Uuid) -> Result<()>;
}

// =============================================================================
// FOLDER REPOSITORY TRAITS
// =============================================================================

/// Repository for folder lookups.
#[async_trait]
pub trait FolderRepository: Send + Sync {
    /// Check whether a folder exists.
    async fn exists(&self, folder_id: Uuid) -> Result<bool>;
}

// =============================================================================
// CONVERTER TRAITS
// =============================================================================

/// Converter from one source format to normalized documents.
///
/// Converters are registered in a `ConverterRegistry` and dispatched by the
/// file's extension. They never write persisted state.
#[async_trait]
pub trait FormatConverter: Send + Sync {
    /// The format this converter handles.
    fn format(&self) -> ImportFormat;

    /// Convert a source file into one or more documents.
    async fn convert(&self, file: &SourceFile, options: &ImportOptions)
        -> Result<ConversionResult>;

    /// Check if the converter's external dependencies are available.
    async fn health_check(&self) -> Result<bool>;

    /// Human-readable name of this converter.
    fn name(&self) -> &str;
}

/// External text extraction for PDF files.
#[async_trait]
pub trait PdfTextExtractor: Send + Sync {
    async fn extract(&self, data: &[u8]) -> Result<PdfText>;

    async fn health_check(&self) -> Result<bool>;

    fn name(&self) -> &str;
}

/// External conversion of word-processor documents to HTML.
#[async_trait]
pub trait OfficeHtmlConverter: Send + Sync {
    async fn to_html(&self, data: &[u8]) -> Result<OfficeHtml>;

    async fn health_check(&self) -> Result<bool>;

    fn name(&self) -> &str;
}
