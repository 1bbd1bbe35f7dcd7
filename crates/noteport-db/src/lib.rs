//! # noteport-db
//!
//! In-memory persistence layer for noteport.
//!
//! This crate provides repository implementations for the collaborator
//! traits in `noteport-core`, backed by one shared `tokio::sync::RwLock`.
//! Ids are UUIDv7, so creation order and id order agree.
//!
//! ## Example
//!
//! ```rust,ignore
//! use noteport_db::{Database, NoteRepository, CreateNoteRequest};
//!
//! let db = Database::in_memory();
//! let folder = db.folders.create("Imports").await;
//! let note_id = db.notes.create_note(request).await?;
//! ```

pub mod folders;
pub mod notes;
pub mod store;
pub mod tags;

#[cfg(test)]
mod tests;

// Re-export core types
pub use noteport_core::*;

pub use folders::MemoryFolderRepository;
pub use notes::MemoryNoteRepository;
pub use store::{StoredFolder, StoredNote, StoredTag};
pub use tags::MemoryTagRepository;

/// Combined store context with all repositories over shared state.
#[derive(Debug, Clone)]
pub struct Database {
    /// Note repository.
    pub notes: MemoryNoteRepository,
    /// Tag repository.
    pub tags: MemoryTagRepository,
    /// Folder repository.
    pub folders: MemoryFolderRepository,
}

impl Database {
    /// Create an empty store.
    pub fn in_memory() -> Self {
        let state = store::SharedState::default();
        Self {
            notes: MemoryNoteRepository::new(state.clone()),
            tags: MemoryTagRepository::new(state.clone()),
            folders: MemoryFolderRepository::new(state),
        }
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::in_memory()
    }
}
