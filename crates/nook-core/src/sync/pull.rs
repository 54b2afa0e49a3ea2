//! Normalization of server folder documents into the local tree.

use std::collections::HashSet;

use chrono::Utc;

use crate::api::RemoteFolder;
use crate::models::{Folder, FolderId, FolderKind, NoteId, DEFAULT_FOLDER_ICON};
use crate::util::normalize_text_option;

/// Turn server folders into physical folders.
///
/// Missing ids fall back to the folder name and missing icons and creation
/// times to defaults. Folders that would collide with the favourites view or
/// with an earlier folder get a fresh id; nameless folders are dropped, as
/// are notes whose id was already seen.
pub fn normalize_folders(remote: Vec<RemoteFolder>) -> Vec<Folder> {
    let mut folder_ids = HashSet::new();
    let mut note_ids: HashSet<NoteId> = HashSet::new();
    let mut folders = Vec::with_capacity(remote.len());

    for raw in remote {
        let Some(name) = normalize_text_option(raw.name) else {
            tracing::warn!("Dropping server folder without a name");
            continue;
        };
        let mut id = normalize_text_option(raw.id).map_or_else(
            || FolderId::from(name.as_str()),
            FolderId::from,
        );
        if id.is_favourites() || folder_ids.contains(&id) {
            tracing::warn!(folder_id = %id, "Reassigning id of conflicting server folder");
            id = FolderId::new();
        }
        folder_ids.insert(id.clone());

        let notes = raw
            .notes
            .unwrap_or_default()
            .into_iter()
            .filter(|note| {
                let fresh = note_ids.insert(note.id.clone());
                if !fresh {
                    tracing::warn!(note_id = %note.id, "Dropping duplicate server note");
                }
                fresh
            })
            .collect();

        folders.push(Folder {
            id,
            name,
            icon: normalize_text_option(raw.icon)
                .unwrap_or_else(|| DEFAULT_FOLDER_ICON.to_string()),
            kind: FolderKind::Custom,
            created_at: raw.created_at.unwrap_or_else(Utc::now),
            notes,
        });
    }

    folders
}
