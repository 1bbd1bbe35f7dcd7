//! OnepkgConverter: notebook packages.
//!
//! Section files inside the package use a proprietary binary format, so the
//! converter only lists them and produces a pinned guide note explaining how
//! to re-export each section as HTML.

use std::io::Cursor;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::debug;
use zip::ZipArchive;

use noteport_core::{
    Block, ConversionResult, ConvertedDocument, Document, Error, FormatConverter, ImportFormat,
    ImportOptions, Inline, ListItem, Mark, OrderedListAttrs, Result, SourceFile,
};

use crate::encoding;

pub const CANNOT_IMPORT_WARNING: &str = ".one files cannot be imported directly.";
pub const REEXPORT_WARNING: &str =
    "Export each section from OneNote as a web page (.html) and import those files instead.";

const REEXPORT_STEPS: [&str; 3] = [
    "Open the section in OneNote",
    "Choose File > Export > Web Page (.html)",
    "Import the exported file here",
];

/// Names of the `.one` section entries, in archive order.
pub fn list_sections(data: &[u8]) -> Result<Vec<String>> {
    let archive = ZipArchive::new(Cursor::new(data))
        .map_err(|e| Error::Conversion(format!("Invalid ONEPKG file: {}", e)))?;
    Ok(archive
        .file_names()
        .filter(|name| name.to_lowercase().ends_with(".one"))
        .map(encoding::repair_filename)
        .collect())
}

/// Guide note body: the section list followed by re-export steps.
pub fn guide_document(title: &str, sections: &[String]) -> Document {
    let mut content = vec![
        Block::heading(1, title),
        Block::paragraph("This notebook contains the following sections:"),
    ];
    if !sections.is_empty() {
        content.push(Block::bullet_list(sections.iter().cloned()));
    }
    content.push(Block::Paragraph {
        content: vec![Inline::marked(
            "How to import each section:",
            vec![Mark::Bold],
        )],
    });
    content.push(Block::OrderedList {
        attrs: OrderedListAttrs { start: 1 },
        content: REEXPORT_STEPS
            .iter()
            .map(|step| ListItem {
                content: vec![Block::paragraph(*step)],
            })
            .collect(),
    });
    Document::new(content)
}

/// Converter for `.onepkg` notebook packages.
pub struct OnepkgConverter;

#[async_trait]
impl FormatConverter for OnepkgConverter {
    fn format(&self) -> ImportFormat {
        ImportFormat::Onepkg
    }

    async fn convert(&self, file: &SourceFile, _options: &ImportOptions) -> Result<ConversionResult> {
        let sections = list_sections(&file.content)?;
        debug!(
            file_name = %file.original_name,
            section_count = sections.len(),
            "Listed notebook package sections"
        );

        let title = format!("{} - Import Guide", file.stem());
        let document = guide_document(&title, &sections);

        let mut info = serde_json::Map::new();
        info.insert("sectionsCount".into(), JsonValue::from(sections.len()));

        let warnings = vec![
            format!(
                "The ONEPKG file contains {} section(s) (.one).",
                sections.len()
            ),
            CANNOT_IMPORT_WARNING.to_string(),
            REEXPORT_WARNING.to_string(),
        ];
        Ok(
            ConversionResult::single(ConvertedDocument::new(title, document).pinned())
                .with_warnings(warnings)
                .with_info(info),
        )
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "onepkg"
    }
}
