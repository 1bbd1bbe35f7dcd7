//! HTTP handler modules for noteport-api.

pub mod import;

pub use import::{
    import_batch, import_docx, import_health, import_mht, import_onenote, import_onepkg,
    import_pdf,
};
