use std::sync::Arc;

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use crate::*;

fn request(title: &str, folder_id: Option<Uuid>) -> CreateNoteRequest {
    CreateNoteRequest {
        title: title.to_string(),
        document: Document::from_paragraphs(["body"]),
        folder_id,
        created_at: None,
        updated_at: None,
        pinned: false,
    }
}

#[tokio::test]
async fn test_create_note_defaults_timestamps() {
    let db = Database::in_memory();
    let before = Utc::now();
    let id = db.notes.create_note(request("A", None)).await.unwrap();

    let note = db.notes.get(id).await.unwrap();
    assert_eq!(note.title, "A");
    assert!(note.created_at >= before);
    assert_eq!(note.created_at, note.updated_at);
    assert!(!note.pinned);
}

#[tokio::test]
async fn test_create_note_keeps_source_timestamps() {
    let db = Database::in_memory();
    let created = Utc.with_ymd_and_hms(2020, 5, 1, 8, 0, 0).unwrap();
    let mut req = request("Old", None);
    req.created_at = Some(created);
    req.pinned = true;
    let id = db.notes.create_note(req).await.unwrap();

    let note = db.notes.get(id).await.unwrap();
    assert_eq!(note.created_at, created);
    assert!(note.updated_at > created);
    assert!(note.pinned);
}

#[tokio::test]
async fn test_unknown_folder_rejected() {
    let db = Database::in_memory();
    let err = db
        .notes
        .create_note(request("A", Some(Uuid::new_v4())))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(db.notes.count().await, 0);
}

#[tokio::test]
async fn test_known_folder_accepted() {
    let db = Database::in_memory();
    let folder = db.folders.create("Imports").await;
    assert!(db.folders.exists(folder).await.unwrap());
    assert!(!db.folders.exists(Uuid::new_v4()).await.unwrap());

    let id = db.notes.create_note(request("A", Some(folder))).await.unwrap();
    assert_eq!(db.notes.get(id).await.unwrap().folder_id, Some(folder));
}

#[tokio::test]
async fn test_notes_listed_in_creation_order() {
    let db = Database::in_memory();
    for title in ["one", "two", "three"] {
        db.notes.create_note(request(title, None)).await.unwrap();
    }
    let titles: Vec<String> = db.notes.list().await.into_iter().map(|n| n.title).collect();
    assert_eq!(titles, vec!["one", "two", "three"]);
}

#[tokio::test]
async fn test_get_or_create_is_idempotent() {
    let db = Database::in_memory();
    let a = db.tags.get_or_create("PDF Import", "#D32F2F").await.unwrap();
    let b = db.tags.get_or_create("PDF Import", "#000000").await.unwrap();
    assert_eq!(a, b);

    let tags = db.tags.list().await;
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].color, "#D32F2F");
}

#[tokio::test]
async fn test_concurrent_get_or_create_single_tag() {
    let db = Arc::new(Database::in_memory());
    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let db = Arc::clone(&db);
            tokio::spawn(async move { db.tags.get_or_create("OneNote Import", "#FF6B35").await })
        })
        .collect();
    let ids: Vec<Uuid> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();
    assert!(ids.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(db.tags.list().await.len(), 1);
}

#[tokio::test]
async fn test_empty_tag_name_rejected() {
    let db = Database::in_memory();
    let err = db.tags.get_or_create("  ", "#fff").await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn test_attach_tag() {
    let db = Database::in_memory();
    let note = db.notes.create_note(request("A", None)).await.unwrap();
    let tag = db.tags.get_or_create("DOCX Import", "#2B5797").await.unwrap();

    db.tags.attach(note, tag).await.unwrap();
    db.tags.attach(note, tag).await.unwrap();

    let attached = db.tags.get_for_note(note).await;
    assert_eq!(attached.len(), 1);
    assert_eq!(attached[0].name, "DOCX Import");
    assert_eq!(db.tags.find_by_name("DOCX Import").await.unwrap().id, tag);
}

#[tokio::test]
async fn test_attach_unknown_ids() {
    let db = Database::in_memory();
    let note = db.notes.create_note(request("A", None)).await.unwrap();
    let tag = db.tags.get_or_create("t", "#fff").await.unwrap();

    assert!(matches!(
        db.tags.attach(Uuid::new_v4(), tag).await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        db.tags.attach(note, Uuid::new_v4()).await,
        Err(Error::NotFound(_))
    ));
}
