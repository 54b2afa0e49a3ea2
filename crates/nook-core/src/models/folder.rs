//! Folder model

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{timestamp, Note, NoteId};

/// Id of the virtual favourites folder.
pub const FAVOURITES_FOLDER_ID: &str = "favourites";
/// Icon given to custom folders that do not carry one.
pub const DEFAULT_FOLDER_ICON: &str = "FolderOpen";
/// Icon of the virtual favourites folder.
pub const FAVOURITES_ICON: &str = "Star";

/// A unique identifier for a folder
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(String);

impl FolderId {
    /// Create a new unique folder ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// The id of the virtual favourites folder
    #[must_use]
    pub fn favourites() -> Self {
        Self(FAVOURITES_FOLDER_ID.to_string())
    }

    #[must_use]
    pub fn is_favourites(&self) -> bool {
        self.0 == FAVOURITES_FOLDER_ID
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for FolderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FolderId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for FolderId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Whether a folder is user-created and stored, or a computed view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderKind {
    #[default]
    Custom,
    Virtual,
}

/// A folder and the notes it owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    pub icon: String,
    #[serde(rename = "type")]
    pub kind: FolderKind,
    #[serde(default = "Utc::now", deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Vec<Note>,
}

impl Folder {
    /// Create a new, empty custom folder
    #[must_use]
    pub fn custom(name: impl Into<String>) -> Self {
        Self {
            id: FolderId::new(),
            name: name.into(),
            icon: DEFAULT_FOLDER_ICON.to_string(),
            kind: FolderKind::Custom,
            created_at: Utc::now(),
            notes: Vec::new(),
        }
    }

    /// The favourites view descriptor. It never owns notes.
    #[must_use]
    pub fn favourites() -> Self {
        Self {
            id: FolderId::favourites(),
            name: "Favourites".to_string(),
            icon: FAVOURITES_ICON.to_string(),
            kind: FolderKind::Virtual,
            created_at: DateTime::<Utc>::default(),
            notes: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.kind == FolderKind::Virtual || self.id.is_favourites()
    }

    /// Case-insensitive name comparison used for uniqueness checks.
    #[must_use]
    pub fn has_name(&self, name: &str) -> bool {
        self.name.trim().to_lowercase() == name.trim().to_lowercase()
    }

    #[must_use]
    pub fn note(&self, id: &NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| &note.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &NoteId) -> bool {
        self.note(id).is_some()
    }
}
