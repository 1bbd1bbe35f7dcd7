//! MhtmlConverter: single-file web archives (`.mht`, `.mhtml`).

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use noteport_core::{
    ConversionResult, Error, FormatConverter, ImportFormat, ImportOptions, Result, SourceFile,
};

use crate::adapters::html::convert_page;
use crate::encoding;
use crate::html_document::HtmlPage;
use crate::quoted_printable;

/// From the first `<html` to the last `</html>`, across lines.
static HTML_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<html.*</html>").unwrap());

pub const NO_HTML_ERROR: &str = "No HTML content found in MHT file";

/// Locate the embedded HTML document inside decoded archive text.
pub fn find_html_span(text: &str) -> Option<&str> {
    HTML_SPAN.find(text).map(|m| m.as_str())
}

/// Decode the archive and return the embedded HTML.
///
/// The encoding resolver only runs when the decoded bytes are not UTF-8 or
/// hold no `<html>` span as UTF-8.
pub fn extract_html(raw: &[u8]) -> Result<String> {
    let decoded = quoted_printable::decode(raw);
    if let Some(span) = std::str::from_utf8(&decoded).ok().and_then(find_html_span) {
        return Ok(span.to_string());
    }
    let text = encoding::resolve(&decoded);
    find_html_span(&text)
        .map(str::to_string)
        .ok_or_else(|| Error::Conversion(NO_HTML_ERROR.to_string()))
}

/// Converter for MHTML archives exported from notebook apps and browsers.
pub struct MhtmlConverter;

#[async_trait]
impl FormatConverter for MhtmlConverter {
    fn format(&self) -> ImportFormat {
        ImportFormat::Mht
    }

    async fn convert(&self, file: &SourceFile, _options: &ImportOptions) -> Result<ConversionResult> {
        let html = extract_html(&file.content)?;
        let page = HtmlPage::parse(&html);
        let title = page.title_or_first_block();
        debug!(file_name = %file.original_name, title = %title, html_len = html.len(), "Extracted MHT body");

        let mut warnings = Vec::new();
        let document = convert_page(&page, title, &mut warnings);
        Ok(ConversionResult::single(document).with_warnings(warnings))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "mhtml"
    }
}
