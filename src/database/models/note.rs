//! Note model (stored in the `notes` collection).

use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

/// A single note document, owned by one user.
///
/// Deletion is soft: `deleted_at` is set instead of removing the document,
/// and every read filters deleted notes out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Identifier of the owning user
    pub owner: String,

    /// Note title
    pub title: String,

    /// Note content
    pub content: String,

    pub created_at: DateTime,

    pub updated_at: DateTime,

    /// Soft-delete marker
    #[serde(default)]
    pub deleted_at: Option<DateTime>,
}

impl Note {
    /// Create a new note with fresh timestamps.
    pub fn new(owner: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = DateTime::now();
        Self {
            id: None,
            owner: owner.into(),
            title: title.into(),
            content: content.into(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
