//! Folder repository implementation.

use async_trait::async_trait;
use uuid::Uuid;

use noteport_core::{FolderRepository, Result};

use crate::store::{SharedState, StoredFolder};

/// In-memory folder repository.
#[derive(Debug, Clone)]
pub struct MemoryFolderRepository {
    state: SharedState,
}

impl MemoryFolderRepository {
    pub(crate) fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Create a folder and return its id.
    pub async fn create(&self, name: &str) -> Uuid {
        let id = Uuid::now_v7();
        self.state.write().await.folders.insert(
            id,
            StoredFolder {
                id,
                name: name.to_string(),
            },
        );
        id
    }
}

#[async_trait]
impl FolderRepository for MemoryFolderRepository {
    async fn exists(&self, folder_id: Uuid) -> Result<bool> {
        Ok(self.state.read().await.folders.contains_key(&folder_id))
    }
}
