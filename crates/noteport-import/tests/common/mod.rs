//! Fixtures shared by the import integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;
use zip::write::SimpleFileOptions;

use noteport_core::{CreateNoteRequest, Error, NoteRepository, PdfText, PdfTextExtractor, Result};
use noteport_db::Database;
use noteport_import::{BatchImporter, ImportConfig, PdfConverter, StagedFile};

/// PDF extractor returning fixed text, for tests without poppler.
pub struct FakePdfExtractor {
    pub text: String,
    pub pages: usize,
}

#[async_trait]
impl PdfTextExtractor for FakePdfExtractor {
    async fn extract(&self, _data: &[u8]) -> Result<PdfText> {
        Ok(PdfText {
            text: self.text.clone(),
            page_count: self.pages,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Importer over a fresh in-memory store, with PDF text faked.
pub fn importer(temp_dir: &Path, pdf_text: &str) -> (BatchImporter, Database) {
    let db = Database::in_memory();
    let notes = Arc::new(db.notes.clone());
    (importer_with_notes(temp_dir, pdf_text, notes, &db), db)
}

/// Like [`importer`], but notes go through `notes` instead of the store.
pub fn importer_with_notes(
    temp_dir: &Path,
    pdf_text: &str,
    notes: Arc<dyn NoteRepository>,
    db: &Database,
) -> BatchImporter {
    let config = ImportConfig::default()
        .with_temp_dir(temp_dir)
        .with_max_concurrent(4);
    let mut registry = config.build_registry();
    registry.register(Arc::new(PdfConverter::new(Arc::new(FakePdfExtractor {
        text: pdf_text.to_string(),
        pages: 1,
    }))));
    BatchImporter::new(Arc::new(registry), notes, Arc::new(db.tags.clone()), config)
}

/// Note repository that rejects every create after the first `allowed`.
pub struct FailingNotes {
    pub inner: Arc<dyn NoteRepository>,
    pub allowed: usize,
    pub calls: AtomicUsize,
}

#[async_trait]
impl NoteRepository for FailingNotes {
    async fn create_note(&self, req: CreateNoteRequest) -> Result<Uuid> {
        if self.calls.fetch_add(1, Ordering::SeqCst) >= self.allowed {
            return Err(Error::Persistence("write rejected".into()));
        }
        self.inner.create_note(req).await
    }
}

pub fn stage(dir: &Path, name: &str, content: &[u8]) -> StagedFile {
    StagedFile::from_bytes(dir, name, content).unwrap()
}

/// ZIP archive with the given entries.
pub fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut cursor);
        for (name, content) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content).unwrap();
        }
        zip.finish().unwrap();
    }
    cursor.into_inner()
}

/// Minimal `.docx` whose body holds one heading and one paragraph.
pub fn docx(heading: &str, body: &str) -> Vec<u8> {
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>
<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>{}</w:t></w:r></w:p>
<w:p><w:r><w:t>{}</w:t></w:r></w:p>
</w:body></w:document>"#,
        heading, body
    );
    zip_of(&[("word/document.xml", xml.as_bytes())])
}

pub const MHT: &str = "MIME-Version: 1.0\r\n\
Content-Type: text/html; charset=\"utf-8\"\r\n\
Content-Transfer-Encoding: quoted-printable\r\n\
\r\n\
<html><body><p>Archived =E3=83=A1=E3=83=A2</p></body></html>\r\n";
