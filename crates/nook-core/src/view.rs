//! Derived views over the store: effective folder, visible notes, counts.
//!
//! Nothing here mutates the store; every function recomputes from scratch.

use crate::models::{Folder, FolderId, Note};
use crate::store::{NoteStore, Selection};

/// The favourites view followed by every physical folder.
pub fn all_folders(store: &NoteStore) -> Vec<Folder> {
    std::iter::once(Folder::favourites())
        .chain(store.folders().iter().cloned())
        .collect()
}

/// The selected folder if it still exists, otherwise the first entry of
/// [`all_folders`].
pub fn effective_folder(store: &NoteStore, selection: &Selection) -> Folder {
    selection
        .folder
        .as_ref()
        .and_then(|id| {
            if id.is_favourites() {
                Some(Folder::favourites())
            } else {
                store.folder(id).cloned()
            }
        })
        .unwrap_or_else(Folder::favourites)
}

/// Notes of the effective folder after tag and search filtering, most
/// recently updated first.
pub fn visible_notes(store: &NoteStore, selection: &Selection) -> Vec<Note> {
    let folder = effective_folder(store, selection);
    let base: Vec<&Note> = if folder.is_virtual() {
        store.notes().filter(|note| note.is_favourite).collect()
    } else {
        store
            .folder(&folder.id)
            .map(|folder| folder.notes.iter().collect())
            .unwrap_or_default()
    };
    let needle = selection.search_needle();

    let mut notes: Vec<Note> = base
        .into_iter()
        .filter(|note| {
            selection
                .tag
                .as_ref()
                .map_or(true, |tag| note.tags.contains(tag))
        })
        .filter(|note| {
            needle
                .as_deref()
                .map_or(true, |needle| note.matches_query(needle))
        })
        .cloned()
        .collect();
    // stable: ties keep folder order
    notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    notes
}

pub fn selected_note(store: &NoteStore, selection: &Selection) -> Option<Note> {
    let id = selection.note.as_ref()?;
    store.find_note(id).map(|(_, note)| note.clone())
}

/// Notes in a folder; for the favourites view, every favourite note.
pub fn note_count(store: &NoteStore, id: &FolderId) -> usize {
    if id.is_favourites() {
        store.notes().filter(|note| note.is_favourite).count()
    } else {
        store.folder(id).map_or(0, |folder| folder.notes.len())
    }
}
