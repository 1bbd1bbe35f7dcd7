//! Centralized default constants for noteport.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers. Organized by domain area.

// =============================================================================
// UPLOAD LIMITS
// =============================================================================

const MB: usize = 1024 * 1024;

/// Maximum size of an exported HTML page.
pub const MAX_HTML_BYTES: usize = 10 * MB;

/// Maximum size of an MHTML archive.
pub const MAX_MHT_BYTES: usize = 20 * MB;

/// Maximum size of a DOCX document.
pub const MAX_DOCX_BYTES: usize = 20 * MB;

/// Maximum inflated size of any one part inside a DOCX container.
pub const MAX_DOCX_PART_BYTES: usize = 10 * MAX_DOCX_BYTES;

/// Maximum size of a PDF.
pub const MAX_PDF_BYTES: usize = 30 * MB;

/// Maximum size of a notebook package.
pub const MAX_ONEPKG_BYTES: usize = 100 * MB;

/// Maximum size of any single file inside a batch upload.
pub const MAX_BATCH_FILE_BYTES: usize = 100 * MB;

/// Maximum number of files accepted by one batch request.
pub const MAX_BATCH_FILES: usize = 50;

// =============================================================================
// IMPORT PIPELINE
// =============================================================================

/// Timeout for external extraction commands (pdftotext, pdfinfo, pandoc).
pub const EXTRACTION_CMD_TIMEOUT_SECS: u64 = 120;

/// Subdirectory of the system temp dir used for staged uploads.
pub const IMPORT_TEMP_SUBDIR: &str = "noteport-imports";

/// Start offsets closer than this many characters are the same date mention.
pub const DATE_PROXIMITY_CHARS: usize = 5;

/// Title of the single section returned when no date mention is found.
pub const FALLBACK_SECTION_TITLE: &str = "Full Text";

/// Title used when markup carries neither `<h1>` nor `<title>`.
pub const FALLBACK_NOTE_TITLE: &str = "Untitled Note (Imported)";

/// Maximum characters of the first PDF line used as a title.
pub const PDF_TITLE_MAX_CHARS: usize = 200;

// =============================================================================
// IMPORT TAGS
// =============================================================================

/// Tag attached to notebook imports (HTML, MHT, package) and batch imports.
pub const ONENOTE_TAG_NAME: &str = "OneNote Import";
pub const ONENOTE_TAG_COLOR: &str = "#FF6B35";

/// Tag attached to DOCX imports.
pub const DOCX_TAG_NAME: &str = "DOCX Import";
pub const DOCX_TAG_COLOR: &str = "#2B5797";

/// Tag attached to PDF imports.
pub const PDF_TAG_NAME: &str = "PDF Import";
pub const PDF_TAG_COLOR: &str = "#D32F2F";

// =============================================================================
// SERVER
// =============================================================================

/// Default bind host for the HTTP server.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default bind port for the HTTP server.
pub const SERVER_PORT: u16 = 3000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_limits_ordered() {
        assert!(MAX_HTML_BYTES < MAX_MHT_BYTES);
        assert!(MAX_MHT_BYTES < MAX_PDF_BYTES);
        assert!(MAX_PDF_BYTES < MAX_ONEPKG_BYTES);
        assert_eq!(MAX_ONEPKG_BYTES, MAX_BATCH_FILE_BYTES);
    }

    #[test]
    fn test_date_proximity_is_five() {
        assert_eq!(DATE_PROXIMITY_CHARS, 5);
    }
}
