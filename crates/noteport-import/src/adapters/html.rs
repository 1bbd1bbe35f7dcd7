//! HtmlConverter: exported notebook HTML pages.

use async_trait::async_trait;
use tracing::debug;

use noteport_core::{
    ConversionResult, ConvertedDocument, Error, FormatConverter, ImportFormat, ImportOptions,
    Result, SourceFile,
};

use crate::encoding;
use crate::html_document::{html_to_document, HtmlPage};
use crate::markup;

/// Warning added when a page produced no blocks at all.
pub const EMPTY_CONTENT_WARNING: &str = "No importable content was found in the file.";

/// Shared title/body pipeline for every markup-based format.
///
/// The body's inner HTML is cleaned of Office noise and converted
/// structurally; `title` picks the title from the parsed page.
pub(crate) fn convert_page(
    page: &HtmlPage,
    title: String,
    warnings: &mut Vec<String>,
) -> ConvertedDocument {
    let cleaned = markup::clean(&page.body_html);
    let document = html_to_document(&cleaned);
    if document.is_empty() {
        warnings.push(EMPTY_CONTENT_WARNING.to_string());
    }
    ConvertedDocument::new(title, document).with_metadata(page.metadata.clone())
}

/// Converter for `.html` / `.htm` notebook exports.
pub struct HtmlConverter;

#[async_trait]
impl FormatConverter for HtmlConverter {
    fn format(&self) -> ImportFormat {
        ImportFormat::Html
    }

    async fn convert(&self, file: &SourceFile, _options: &ImportOptions) -> Result<ConversionResult> {
        if file.content.is_empty() {
            return Err(Error::Conversion(format!(
                "File '{}' is empty",
                file.original_name
            )));
        }

        let html = encoding::resolve(&file.content);
        let page = HtmlPage::parse(&html);
        let title = page.title();
        debug!(file_name = %file.original_name, title = %title, "Parsed HTML page");

        let mut warnings = Vec::new();
        let document = convert_page(&page, title, &mut warnings);
        Ok(ConversionResult::single(document).with_warnings(warnings))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "html"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noteport_core::defaults::FALLBACK_NOTE_TITLE;

    async fn convert(html: &str) -> ConversionResult {
        let file = SourceFile::new("page.html", html.as_bytes().to_vec());
        HtmlConverter
            .convert(&file, &ImportOptions::default())
            .await
            .unwrap()
    }

    #[test]
    fn test_html_format_and_name() {
        assert_eq!(HtmlConverter.format(), ImportFormat::Html);
        assert_eq!(HtmlConverter.name(), "html");
    }

    #[tokio::test]
    async fn test_onenote_page() {
        let result = convert(
            r#"<html><head><title>Notebook</title>
               <meta name="created" content="2023-04-05T10:00:00Z"></head>
               <body><h1>Weekly Plan</h1>
               <p class="MsoNormal" style="mso-line-height-alt:12pt">Monday<o:p></o:p></p>
               </body></html>"#,
        )
        .await;
        assert_eq!(result.documents.len(), 1);
        let doc = &result.documents[0];
        assert_eq!(doc.title, "Weekly Plan");
        assert_eq!(doc.document.plain_text(), "Weekly Plan\nMonday");
        assert!(doc.metadata.created_at.is_some());
        assert!(result.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_title_precedence_levels() {
        let h1 = convert("<title>T</title><h1>H</h1>").await;
        assert_eq!(h1.documents[0].title, "H");
        let title = convert("<title>T</title><p>x</p>").await;
        assert_eq!(title.documents[0].title, "T");
        let fallback = convert("<p>x</p>").await;
        assert_eq!(fallback.documents[0].title, FALLBACK_NOTE_TITLE);
    }

    #[tokio::test]
    async fn test_shift_jis_page() {
        let (bytes, _, _) =
            encoding_rs::SHIFT_JIS.encode("<html><body><h1>日記</h1><p>今日は晴れ</p></body></html>");
        let file = SourceFile::new("diary.htm", bytes.into_owned());
        let result = HtmlConverter
            .convert(&file, &ImportOptions::default())
            .await
            .unwrap();
        assert_eq!(result.documents[0].title, "日記");
        assert!(result.documents[0].document.plain_text().contains("今日は晴れ"));
    }

    #[tokio::test]
    async fn test_empty_body_warns() {
        let result = convert("<html><head><title>T</title></head><body></body></html>").await;
        assert_eq!(result.warnings, vec![EMPTY_CONTENT_WARNING.to_string()]);
    }

    #[tokio::test]
    async fn test_empty_file_is_error() {
        let file = SourceFile::new("empty.html", Vec::new());
        let err = HtmlConverter
            .convert(&file, &ImportOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conversion(_)));
    }
}
