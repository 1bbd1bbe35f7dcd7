//! Shared in-memory state behind the repositories.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use noteport_core::Document;

/// A persisted note.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredNote {
    pub id: Uuid,
    pub title: String,
    pub document: Document,
    pub folder_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub pinned: bool,
    pub tag_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredTag {
    pub id: Uuid,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFolder {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Default)]
pub(crate) struct State {
    /// Notes in creation order.
    pub notes: Vec<StoredNote>,
    pub tags: Vec<StoredTag>,
    pub tags_by_name: HashMap<String, Uuid>,
    pub folders: HashMap<Uuid, StoredFolder>,
}

pub(crate) type SharedState = Arc<RwLock<State>>;
