//! DocxConverter: word-processor documents, via an HTML collaborator.
//!
//! Two [`OfficeHtmlConverter`] implementations are provided:
//! - [`OoxmlHtmlConverter`] reads the OOXML parts directly (zip + quick-xml)
//! - [`PandocHtmlConverter`] shells out to `pandoc -f docx -t html`

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader as XmlReader;
use tokio::process::Command;
use tracing::debug;
use zip::ZipArchive;

use noteport_core::defaults::{
    EXTRACTION_CMD_TIMEOUT_SECS, FALLBACK_NOTE_TITLE, IMPORT_TEMP_SUBDIR, MAX_DOCX_PART_BYTES,
};
use noteport_core::{
    ConversionResult, Error, FormatConverter, ImportFormat, ImportOptions, OfficeHtml,
    OfficeHtmlConverter, Result, SourceFile,
};

use crate::adapters::command::{run_cmd_with_timeout, tool_available, write_tool_input};
use crate::adapters::html::convert_page;
use crate::html_document::HtmlPage;

pub const TABLES_FLATTENED_WARNING: &str = "Tables were flattened into paragraphs.";

// =============================================================================
// CONVERTER
// =============================================================================

/// Converter for `.docx` files.
pub struct DocxConverter {
    html: Arc<dyn OfficeHtmlConverter>,
}

impl DocxConverter {
    pub fn new(html: Arc<dyn OfficeHtmlConverter>) -> Self {
        Self { html }
    }
}

#[async_trait]
impl FormatConverter for DocxConverter {
    fn format(&self) -> ImportFormat {
        ImportFormat::Docx
    }

    async fn convert(&self, file: &SourceFile, _options: &ImportOptions) -> Result<ConversionResult> {
        if file.content.is_empty() {
            return Err(Error::Conversion(format!(
                "File '{}' is empty",
                file.original_name
            )));
        }

        let office = self.html.to_html(&file.content).await?;
        debug!(
            file_name = %file.original_name,
            converter = self.html.name(),
            warning_count = office.warnings.len(),
            "Converted DOCX to HTML"
        );

        let page = HtmlPage::parse(&office.html);
        let stem = file.stem().trim();
        let title = page
            .h1
            .clone()
            .or_else(|| page.title.clone())
            .or_else(|| (!stem.is_empty()).then(|| stem.to_string()))
            .unwrap_or_else(|| FALLBACK_NOTE_TITLE.to_string());

        let mut warnings = office.warnings;
        let document = convert_page(&page, title, &mut warnings);
        Ok(ConversionResult::single(document).with_warnings(warnings))
    }

    async fn health_check(&self) -> Result<bool> {
        self.html.health_check().await
    }

    fn name(&self) -> &str {
        "docx"
    }
}

// =============================================================================
// BUILTIN OOXML READER
// =============================================================================

/// Reads `word/document.xml` and `docProps/core.xml` from the container.
pub struct OoxmlHtmlConverter;

#[async_trait]
impl OfficeHtmlConverter for OoxmlHtmlConverter {
    async fn to_html(&self, data: &[u8]) -> Result<OfficeHtml> {
        ooxml_to_html(data)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "ooxml"
    }
}

fn invalid_docx(detail: impl std::fmt::Display) -> Error {
    Error::Conversion(format!("Invalid DOCX file: {}", detail))
}

/// Convert the raw bytes of a `.docx` container to an HTML page.
pub fn ooxml_to_html(data: &[u8]) -> Result<OfficeHtml> {
    let mut archive = ZipArchive::new(Cursor::new(data)).map_err(invalid_docx)?;
    let document_xml = read_entry(&mut archive, "word/document.xml")?
        .ok_or_else(|| invalid_docx("word/document.xml is missing"))?;
    let numbering = match read_entry(&mut archive, "word/numbering.xml")? {
        Some(xml) => parse_numbering(&xml)?,
        None => Numbering::default(),
    };
    let core = match read_entry(&mut archive, "docProps/core.xml")? {
        Some(xml) => parse_core_properties(&xml)?,
        None => CoreProperties::default(),
    };

    let body = parse_document_body(&document_xml, &numbering)?;

    let mut warnings = Vec::new();
    if body.drawings > 0 {
        warnings.push(format!(
            "{} embedded image(s) were not imported.",
            body.drawings
        ));
    }
    if body.tables > 0 {
        warnings.push(TABLES_FLATTENED_WARNING.to_string());
    }

    let mut html = String::from("<html><head>");
    if let Some(title) = &core.title {
        html.push_str(&format!("<title>{}</title>", escape_html(title)));
    }
    for (name, value) in [
        ("author", &core.creator),
        ("dcterms.created", &core.created),
        ("dcterms.modified", &core.modified),
    ] {
        if let Some(value) = value {
            html.push_str(&format!(
                r#"<meta name="{}" content="{}">"#,
                name,
                escape_html(value)
            ));
        }
    }
    html.push_str("</head><body>");
    html.push_str(&body.html);
    html.push_str("</body></html>");

    Ok(OfficeHtml { html, warnings })
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    read_entry_limited(archive, name, MAX_DOCX_PART_BYTES)
}

/// Inflate one part, refusing to go past `limit` bytes.
fn read_entry_limited<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
    limit: usize,
) -> Result<Option<String>> {
    let entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(invalid_docx(e)),
    };
    if entry.size() > limit as u64 {
        return Err(invalid_docx(format!("{} exceeds {} bytes", name, limit)));
    }
    let mut bytes = Vec::new();
    entry
        .take(limit as u64 + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| invalid_docx(format!("{}: {}", name, e)))?;
    if bytes.len() > limit {
        return Err(invalid_docx(format!("{} exceeds {} bytes", name, limit)));
    }
    let xml = String::from_utf8(bytes).map_err(|e| invalid_docx(format!("{}: {}", name, e)))?;
    Ok(Some(xml))
}

fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|&b| b == b':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

fn attr_value(element: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .with_checks(false)
        .filter_map(|attr| attr.ok())
        .find(|attr| local_name(attr.key.as_ref()) == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

/// `w:b`, `w:i` and friends are on unless `w:val` says otherwise.
fn toggle_on(element: &BytesStart<'_>) -> bool {
    !matches!(
        attr_value(element, b"val").as_deref(),
        Some("0") | Some("false") | Some("off") | Some("none")
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

// --- docProps/core.xml ------------------------------------------------------

#[derive(Debug, Default, PartialEq)]
struct CoreProperties {
    title: Option<String>,
    creator: Option<String>,
    created: Option<String>,
    modified: Option<String>,
}

fn parse_core_properties(xml: &str) -> Result<CoreProperties> {
    let mut reader = XmlReader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut props = CoreProperties::default();
    let mut current: Option<Vec<u8>> = None;

    loop {
        match reader.read_event_into(&mut buf).map_err(invalid_docx)? {
            Event::Start(e) => current = Some(local_name(e.name().as_ref()).to_vec()),
            Event::Text(t) => {
                let text = t.unescape().map_err(invalid_docx)?.trim().to_string();
                let slot = match current.as_deref() {
                    Some(b"title") => Some(&mut props.title),
                    Some(b"creator") => Some(&mut props.creator),
                    Some(b"created") => Some(&mut props.created),
                    Some(b"modified") => Some(&mut props.modified),
                    _ => None,
                };
                if let (Some(slot), false) = (slot, text.is_empty()) {
                    *slot = Some(text);
                }
            }
            Event::End(_) => current = None,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(props)
}

// --- word/numbering.xml -----------------------------------------------------

/// Maps `numId` and level to whether the list is a bullet list.
#[derive(Debug, Default)]
struct Numbering {
    abstract_formats: HashMap<String, HashMap<u8, String>>,
    num_to_abstract: HashMap<String, String>,
}

impl Numbering {
    fn is_bullet(&self, num_id: &str, level: u8) -> bool {
        self.num_to_abstract
            .get(num_id)
            .and_then(|abs| self.abstract_formats.get(abs))
            .and_then(|levels| levels.get(&level))
            .map_or(true, |fmt| fmt == "bullet" || fmt == "none")
    }
}

#[derive(Default)]
struct NumberingReader {
    numbering: Numbering,
    abstract_id: Option<String>,
    level: Option<u8>,
    num_id: Option<String>,
}

impl NumberingReader {
    fn open(&mut self, e: &BytesStart<'_>, is_start: bool) {
        match local_name(e.name().as_ref()) {
            b"abstractNum" if is_start => self.abstract_id = attr_value(e, b"abstractNumId"),
            b"lvl" if is_start => {
                self.level = attr_value(e, b"ilvl").and_then(|v| v.parse().ok())
            }
            b"numFmt" => {
                if let (Some(abs), Some(lvl), Some(fmt)) =
                    (&self.abstract_id, self.level, attr_value(e, b"val"))
                {
                    self.numbering
                        .abstract_formats
                        .entry(abs.clone())
                        .or_default()
                        .insert(lvl, fmt);
                }
            }
            b"num" if is_start => self.num_id = attr_value(e, b"numId"),
            b"abstractNumId" => {
                if let (Some(num), Some(abs)) = (&self.num_id, attr_value(e, b"val")) {
                    self.numbering.num_to_abstract.insert(num.clone(), abs);
                }
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"abstractNum" => self.abstract_id = None,
            b"lvl" => self.level = None,
            b"num" => self.num_id = None,
            _ => {}
        }
    }
}

fn parse_numbering(xml: &str) -> Result<Numbering> {
    let mut reader = XmlReader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut state = NumberingReader::default();

    loop {
        match reader.read_event_into(&mut buf).map_err(invalid_docx)? {
            Event::Start(e) => state.open(&e, true),
            Event::Empty(e) => state.open(&e, false),
            Event::End(e) => state.close(local_name(e.name().as_ref())),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(state.numbering)
}

// --- word/document.xml ------------------------------------------------------

#[derive(Debug, Default)]
struct Paragraph {
    style: Option<String>,
    num_id: Option<String>,
    level: u8,
    html: String,
}

#[derive(Debug, Default, Clone, Copy)]
struct RunProps {
    bold: bool,
    italic: bool,
    strike: bool,
}

/// Open list on the nesting stack.
#[derive(Debug)]
struct OpenList {
    tag: &'static str,
    item_open: bool,
}

fn heading_level(style: Option<&str>) -> Option<u8> {
    let style = style?;
    if style.eq_ignore_ascii_case("title") {
        return Some(1);
    }
    let rest = style
        .strip_prefix("Heading")
        .or_else(|| style.strip_prefix("heading"))?
        .trim();
    rest.parse::<u8>().ok().filter(|n| (1..=6).contains(n))
}

/// Streaming state while walking `word/document.xml`.
struct BodyWriter<'a> {
    numbering: &'a Numbering,
    html: String,
    drawings: usize,
    tables: usize,
    lists: Vec<OpenList>,
    para: Option<Paragraph>,
    run: Option<(RunProps, String)>,
    in_run_props: bool,
    in_text: bool,
    table_depth: usize,
}

impl<'a> BodyWriter<'a> {
    fn new(numbering: &'a Numbering) -> Self {
        Self {
            numbering,
            html: String::new(),
            drawings: 0,
            tables: 0,
            lists: Vec::new(),
            para: None,
            run: None,
            in_run_props: false,
            in_text: false,
            table_depth: 0,
        }
    }

    fn run_props(&mut self) -> Option<&mut RunProps> {
        if !self.in_run_props {
            return None;
        }
        self.run.as_mut().map(|(props, _)| props)
    }

    fn run_text(&mut self) -> Option<&mut String> {
        self.run.as_mut().map(|(_, text)| text)
    }

    fn open(&mut self, e: &BytesStart<'_>, is_empty: bool) {
        match local_name(e.name().as_ref()) {
            b"p" if !is_empty => self.para = Some(Paragraph::default()),
            b"pStyle" => {
                if let Some(p) = self.para.as_mut() {
                    p.style = attr_value(e, b"val");
                }
            }
            b"ilvl" => {
                if let Some(p) = self.para.as_mut() {
                    p.level = attr_value(e, b"val")
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(0);
                }
            }
            b"numId" => {
                if let Some(p) = self.para.as_mut() {
                    p.num_id = attr_value(e, b"val").filter(|v| v != "0");
                }
            }
            b"r" if !is_empty => self.run = Some((RunProps::default(), String::new())),
            b"rPr" if !is_empty => self.in_run_props = self.run.is_some(),
            b"b" => {
                if let Some(props) = self.run_props() {
                    props.bold = toggle_on(e);
                }
            }
            b"i" => {
                if let Some(props) = self.run_props() {
                    props.italic = toggle_on(e);
                }
            }
            b"strike" | b"dstrike" => {
                if let Some(props) = self.run_props() {
                    props.strike = toggle_on(e);
                }
            }
            b"t" if !is_empty => self.in_text = true,
            b"tab" => {
                if let Some(text) = self.run_text() {
                    text.push(' ');
                }
            }
            b"br" | b"cr" => {
                if let Some(text) = self.run_text() {
                    text.push_str("<br>");
                }
            }
            b"drawing" | b"pict" | b"object" => self.drawings += 1,
            b"tbl" if !is_empty => {
                self.table_depth += 1;
                self.tables += 1;
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if !self.in_text {
            return;
        }
        if let Some(run) = self.run_text() {
            run.push_str(&escape_html(text));
        }
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"t" => self.in_text = false,
            b"rPr" => self.in_run_props = false,
            b"r" => {
                if let (Some((props, text)), Some(p)) = (self.run.take(), self.para.as_mut()) {
                    p.html.push_str(&wrap_run(props, &text));
                }
            }
            b"p" => {
                if let Some(p) = self.para.take() {
                    emit_paragraph(
                        p,
                        self.numbering,
                        self.table_depth > 0,
                        &mut self.lists,
                        &mut self.html,
                    );
                }
            }
            b"tbl" => self.table_depth = self.table_depth.saturating_sub(1),
            _ => {}
        }
    }

    fn finish(mut self) -> BodyHtml {
        close_lists(&mut self.lists, 0, &mut self.html);
        BodyHtml {
            html: self.html,
            drawings: self.drawings,
            tables: self.tables,
        }
    }
}

#[derive(Debug, Default)]
struct BodyHtml {
    html: String,
    drawings: usize,
    tables: usize,
}

fn parse_document_body(xml: &str, numbering: &Numbering) -> Result<BodyHtml> {
    let mut reader = XmlReader::from_str(xml);
    reader.trim_text(false);
    let mut buf = Vec::new();
    let mut writer = BodyWriter::new(numbering);

    loop {
        match reader.read_event_into(&mut buf).map_err(invalid_docx)? {
            Event::Start(e) => writer.open(&e, false),
            Event::Empty(e) => writer.open(&e, true),
            Event::Text(t) => writer.text(&t.unescape().map_err(invalid_docx)?),
            Event::End(e) => writer.close(local_name(e.name().as_ref())),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(writer.finish())
}

fn wrap_run(props: RunProps, text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let mut html = text.to_string();
    if props.strike {
        html = format!("<s>{}</s>", html);
    }
    if props.italic {
        html = format!("<em>{}</em>", html);
    }
    if props.bold {
        html = format!("<strong>{}</strong>", html);
    }
    html
}

fn emit_paragraph(
    p: Paragraph,
    numbering: &Numbering,
    in_table: bool,
    lists: &mut Vec<OpenList>,
    out: &mut String,
) {
    if let (Some(num_id), false) = (p.num_id.as_deref(), in_table) {
        let tag = if numbering.is_bullet(num_id, p.level) {
            "ul"
        } else {
            "ol"
        };
        open_list_item(lists, p.level as usize, tag, out);
        out.push_str(&p.html);
        return;
    }

    close_lists(lists, 0, out);
    if p.html.trim().is_empty() {
        return;
    }
    match heading_level(p.style.as_deref()).filter(|_| !in_table) {
        Some(level) => out.push_str(&format!("<h{0}>{1}</h{0}>", level, p.html)),
        None => out.push_str(&format!("<p>{}</p>", p.html)),
    }
}

fn open_list_item(lists: &mut Vec<OpenList>, level: usize, tag: &'static str, out: &mut String) {
    close_lists(lists, level + 1, out);
    if lists.len() == level + 1 {
        if lists.last().map_or(false, |top| top.tag != tag) {
            close_lists(lists, level, out);
        } else if let Some(top) = lists.last_mut().filter(|top| top.item_open) {
            out.push_str("</li>");
            top.item_open = false;
        }
    }
    while lists.len() < level + 1 {
        if let Some(parent) = lists.last_mut() {
            if !parent.item_open {
                out.push_str("<li>");
                parent.item_open = true;
            }
        }
        out.push_str(&format!("<{}>", tag));
        lists.push(OpenList {
            tag,
            item_open: false,
        });
    }
    out.push_str("<li>");
    if let Some(top) = lists.last_mut() {
        top.item_open = true;
    }
}

/// Close open lists until at most `depth` remain.
fn close_lists(lists: &mut Vec<OpenList>, depth: usize, out: &mut String) {
    while lists.len() > depth {
        if let Some(list) = lists.pop() {
            if list.item_open {
                out.push_str("</li>");
            }
            out.push_str(&format!("</{}>", list.tag));
        }
    }
}

// =============================================================================
// PANDOC
// =============================================================================

/// Converts through `pandoc -f docx -t html`.
pub struct PandocHtmlConverter {
    timeout_secs: u64,
    temp_dir: PathBuf,
}

impl PandocHtmlConverter {
    pub fn new(timeout_secs: u64, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            timeout_secs,
            temp_dir: temp_dir.into(),
        }
    }
}

impl Default for PandocHtmlConverter {
    fn default() -> Self {
        Self::new(
            EXTRACTION_CMD_TIMEOUT_SECS,
            std::env::temp_dir().join(IMPORT_TEMP_SUBDIR),
        )
    }
}

#[async_trait]
impl OfficeHtmlConverter for PandocHtmlConverter {
    async fn to_html(&self, data: &[u8]) -> Result<OfficeHtml> {
        let tmpfile = write_tool_input(&self.temp_dir, ".docx", data)?;

        let stdout = run_cmd_with_timeout(
            Command::new("pandoc")
                .arg("-f")
                .arg("docx")
                .arg("-t")
                .arg("html")
                .arg(tmpfile.path()),
            self.timeout_secs,
        )
        .await?;

        let fragment = String::from_utf8_lossy(&stdout);
        Ok(OfficeHtml {
            html: format!("<html><body>{}</body></html>", fragment),
            warnings: Vec::new(),
        })
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(tool_available("pandoc", "--version").await)
    }

    fn name(&self) -> &str {
        "pandoc"
    }
}
