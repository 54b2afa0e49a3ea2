//! Transient selection state

use serde::{Deserialize, Serialize};

use crate::models::{FolderId, NoteId, TagId};

/// What the user is currently looking at.
///
/// Only `folder` survives a restart (through the local cache); the rest is
/// reset whenever the folder changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub folder: Option<FolderId>,
    pub note: Option<NoteId>,
    pub search_query: String,
    pub tag: Option<TagId>,
}

impl Selection {
    /// Switch folder and reset the note, search and tag filter.
    pub fn focus_folder(&mut self, folder: Option<FolderId>) {
        self.folder = folder;
        self.note = None;
        self.search_query.clear();
        self.tag = None;
    }

    /// Lowercased search needle, or `None` when the query is empty.
    ///
    /// Whitespace is part of the needle.
    pub fn search_needle(&self) -> Option<String> {
        (!self.search_query.is_empty()).then(|| self.search_query.to_lowercase())
    }

    pub fn is_folder(&self, id: &FolderId) -> bool {
        self.folder.as_ref() == Some(id)
    }

    pub fn is_note(&self, id: &NoteId) -> bool {
        self.note.as_ref() == Some(id)
    }
}
