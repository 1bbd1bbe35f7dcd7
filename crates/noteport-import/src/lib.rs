//! # noteport-import
//!
//! Multi-format note import for noteport.
//!
//! This crate provides:
//! - Text decoding helpers (legacy encodings, quoted-printable, Office markup cleanup)
//! - HTML to normalized document conversion and markup metadata extraction
//! - Date-based splitting of unstructured text
//! - One converter per supported format, dispatched through a registry
//! - Batch orchestration with per-file failure isolation
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use noteport_import::{BatchImporter, ImportConfig, StagedFile};
//! use noteport_db::Database;
//!
//! let config = ImportConfig::from_env();
//! let db = Database::in_memory();
//! let importer = BatchImporter::new(
//!     Arc::new(config.build_registry()),
//!     Arc::new(db.notes.clone()),
//!     Arc::new(db.tags.clone()),
//!     config.clone(),
//! );
//!
//! let staged = StagedFile::from_bytes(&config.temp_dir, "page.html", b"<h1>Hi</h1>")?;
//! let report = importer.run(vec![staged], Default::default(), None).await;
//! assert_eq!(report.success_count, 1);
//! ```

pub mod adapters;
pub mod batch;
pub mod date_sections;
pub mod encoding;
pub mod html_document;
pub mod markup;
pub mod metadata;
pub mod quoted_printable;
pub mod registry;
pub mod staging;

// Re-export core types
pub use noteport_core::*;

pub use adapters::{
    DocxConverter, HtmlConverter, MhtmlConverter, OnepkgConverter, OoxmlHtmlConverter,
    PandocHtmlConverter, PdfConverter, PopplerPdfExtractor,
};
pub use batch::{
    resolve_format, BatchImporter, DocxBackend, ImportConfig, ImportedFile, SharedTag,
};
pub use registry::ConverterRegistry;
pub use staging::StagedFile;
