//! Tag repository implementation.

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use noteport_core::{Error, Result, TagRepository};

use crate::store::{SharedState, StoredTag};

/// In-memory tag repository. Tag names are unique.
#[derive(Debug, Clone)]
pub struct MemoryTagRepository {
    state: SharedState,
}

impl MemoryTagRepository {
    pub(crate) fn new(state: SharedState) -> Self {
        Self { state }
    }

    pub async fn list(&self) -> Vec<StoredTag> {
        self.state.read().await.tags.clone()
    }

    pub async fn find_by_name(&self, name: &str) -> Option<StoredTag> {
        let state = self.state.read().await;
        state.tags.iter().find(|t| t.name == name).cloned()
    }

    /// Tags attached to a note, in attach order.
    pub async fn get_for_note(&self, note_id: Uuid) -> Vec<StoredTag> {
        let state = self.state.read().await;
        let Some(note) = state.notes.iter().find(|n| n.id == note_id) else {
            return Vec::new();
        };
        note.tag_ids
            .iter()
            .filter_map(|id| state.tags.iter().find(|t| t.id == *id).cloned())
            .collect()
    }
}

#[async_trait]
impl TagRepository for MemoryTagRepository {
    async fn get_or_create(&self, name: &str, color: &str) -> Result<Uuid> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("Tag name cannot be empty".to_string()));
        }

        let mut state = self.state.write().await;
        if let Some(id) = state.tags_by_name.get(name) {
            return Ok(*id);
        }

        let id = Uuid::now_v7();
        state.tags.push(StoredTag {
            id,
            name: name.to_string(),
            color: color.to_string(),
        });
        state.tags_by_name.insert(name.to_string(), id);
        debug!(tag_id = %id, tag = name, "Created tag");
        Ok(id)
    }

    async fn attach(&self, note_id: Uuid, tag_id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.tags.iter().any(|t| t.id == tag_id) {
            return Err(Error::NotFound(format!("Tag {} not found", tag_id)));
        }
        let note = state
            .notes
            .iter_mut()
            .find(|n| n.id == note_id)
            .ok_or_else(|| Error::NotFound(format!("Note {} not found", note_id)))?;
        if !note.tag_ids.contains(&tag_id) {
            note.tag_ids.push(tag_id);
        }
        Ok(())
    }
}
