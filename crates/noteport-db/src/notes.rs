//! Note repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use noteport_core::{CreateNoteRequest, Error, NoteRepository, Result};

use crate::store::{SharedState, StoredNote};

/// In-memory note repository.
#[derive(Debug, Clone)]
pub struct MemoryNoteRepository {
    state: SharedState,
}

impl MemoryNoteRepository {
    pub(crate) fn new(state: SharedState) -> Self {
        Self { state }
    }

    pub async fn get(&self, id: Uuid) -> Option<StoredNote> {
        let state = self.state.read().await;
        state.notes.iter().find(|n| n.id == id).cloned()
    }

    /// All notes in creation order.
    pub async fn list(&self) -> Vec<StoredNote> {
        self.state.read().await.notes.clone()
    }

    pub async fn count(&self) -> usize {
        self.state.read().await.notes.len()
    }
}

#[async_trait]
impl NoteRepository for MemoryNoteRepository {
    async fn create_note(&self, req: CreateNoteRequest) -> Result<Uuid> {
        let mut state = self.state.write().await;
        if let Some(folder_id) = req.folder_id {
            if !state.folders.contains_key(&folder_id) {
                return Err(Error::NotFound(format!("Folder {} not found", folder_id)));
            }
        }

        let now = Utc::now();
        let id = Uuid::now_v7();
        state.notes.push(StoredNote {
            id,
            title: req.title,
            document: req.document,
            folder_id: req.folder_id,
            created_at: req.created_at.unwrap_or(now),
            updated_at: req.updated_at.unwrap_or(now),
            pinned: req.pinned,
            tag_ids: Vec::new(),
        });
        debug!(note_id = %id, "Created note");
        Ok(id)
    }
}
