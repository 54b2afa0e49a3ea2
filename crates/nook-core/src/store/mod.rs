//! In-memory folder/note tree.
//!
//! Every mutation is a single synchronous step. A successful tree mutation
//! publishes exactly one new [`Revision`]; refused operations log a warning
//! and publish nothing. Selection changes never publish a revision.

mod selection;

use std::sync::{Arc, Mutex};

use tokio::sync::watch;

pub use selection::Selection;

use crate::models::{default_tags, Folder, FolderId, Note, NoteId, NotePatch, Tag, TagId};

/// Store shared between the facade and the sync engine.
///
/// The lock is only ever held inside synchronous code.
pub type SharedStore = Arc<Mutex<NoteStore>>;

/// Where a tree change came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// A user mutation; the sync engine pushes these
    #[default]
    Local,
    /// The tree was replaced from the server or the local cache
    Remote,
    /// The tree was wiped on logout
    Cleared,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Revision {
    pub number: u64,
    pub origin: ChangeOrigin,
}

#[derive(Debug)]
pub struct NoteStore {
    folders: Vec<Folder>,
    tags: Vec<Tag>,
    selection: Selection,
    revision: watch::Sender<Revision>,
}

impl Default for NoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteStore {
    pub fn new() -> Self {
        Self {
            folders: Vec::new(),
            tags: default_tags(),
            selection: Selection::default(),
            revision: watch::Sender::new(Revision::default()),
        }
    }

    pub fn shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    /// Physical folders in display order.
    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn revision(&self) -> Revision {
        *self.revision.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Revision> {
        self.revision.subscribe()
    }

    pub fn folder(&self, id: &FolderId) -> Option<&Folder> {
        self.folders.iter().find(|folder| &folder.id == id)
    }

    pub fn tag(&self, id: &TagId) -> Option<&Tag> {
        self.tags.iter().find(|tag| &tag.id == id)
    }

    /// Find a note and the folder that owns it.
    pub fn find_note(&self, id: &NoteId) -> Option<(&Folder, &Note)> {
        self.folders
            .iter()
            .find_map(|folder| folder.note(id).map(|note| (folder, note)))
    }

    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.folders.iter().flat_map(|folder| folder.notes.iter())
    }

    pub fn create_folder(&mut self, name: &str) -> Option<FolderId> {
        let name = name.trim();
        if name.is_empty() {
            tracing::warn!("Refusing to create a folder with a blank name");
            return None;
        }
        if self.name_taken(name, None) {
            tracing::warn!(name, "Refusing to create folder: name already exists");
            return None;
        }

        let folder = Folder::custom(name);
        let id = folder.id.clone();
        self.folders.push(folder);
        self.publish(ChangeOrigin::Local);
        Some(id)
    }

    pub fn delete_folder(&mut self, id: &FolderId) -> bool {
        if id.is_favourites() {
            tracing::warn!("The favourites folder cannot be deleted");
            return false;
        }
        let Some(index) = self.folders.iter().position(|folder| &folder.id == id) else {
            tracing::warn!(folder_id = %id, "Cannot delete unknown folder");
            return false;
        };

        let removed = self.folders.remove(index);
        if self
            .selection
            .note
            .as_ref()
            .is_some_and(|note| removed.contains(note))
        {
            self.selection.note = None;
        }
        if self.selection.is_folder(id) {
            let fallback = self.folders.first().map(|folder| folder.id.clone());
            self.selection.focus_folder(fallback);
        }
        self.publish(ChangeOrigin::Local);
        true
    }

    pub fn rename_folder(&mut self, id: &FolderId, name: &str) -> bool {
        let name = name.trim();
        if id.is_favourites() {
            tracing::warn!("The favourites folder cannot be renamed");
            return false;
        }
        if name.is_empty() {
            tracing::warn!(folder_id = %id, "Refusing to rename folder to a blank name");
            return false;
        }
        if self.name_taken(name, Some(id)) {
            tracing::warn!(name, "Refusing to rename folder: name already exists");
            return false;
        }
        let Some(folder) = self.folder_mut(id) else {
            tracing::warn!(folder_id = %id, "Cannot rename unknown folder");
            return false;
        };

        folder.name = name.to_string();
        self.publish(ChangeOrigin::Local);
        true
    }

    /// Insert an empty note at the head of the selected folder and select it.
    ///
    /// A virtual or stale folder selection falls back to the first physical
    /// folder.
    pub fn create_note(&mut self) -> Option<NoteId> {
        let target = self
            .selection
            .folder
            .as_ref()
            .filter(|id| self.folder(id).is_some())
            .cloned()
            .or_else(|| self.folders.first().map(|folder| folder.id.clone()));
        let Some(target) = target else {
            tracing::warn!("Cannot create a note without a folder");
            return None;
        };

        let note = Note::new();
        let id = note.id.clone();
        if let Some(folder) = self.folder_mut(&target) {
            folder.notes.insert(0, note);
        }
        if !self.selection.is_folder(&target) {
            self.selection.focus_folder(Some(target));
        }
        self.selection.note = Some(id.clone());
        self.publish(ChangeOrigin::Local);
        Some(id)
    }

    pub fn update_note(&mut self, id: &NoteId, patch: NotePatch) -> bool {
        if patch.is_empty() {
            return false;
        }
        self.mutate_note(id, |note| note.apply(patch))
    }

    pub fn delete_note(&mut self, id: &NoteId) -> bool {
        let removed = self.folders.iter_mut().any(|folder| {
            let before = folder.notes.len();
            folder.notes.retain(|note| &note.id != id);
            folder.notes.len() != before
        });
        if !removed {
            tracing::warn!(note_id = %id, "Cannot delete unknown note");
            return false;
        }

        if self.selection.is_note(id) {
            self.selection.note = None;
        }
        self.publish(ChangeOrigin::Local);
        true
    }

    /// Transfer a note to another physical folder, appending it there.
    pub fn move_to_folder(&mut self, note_id: &NoteId, destination: &FolderId) -> bool {
        let Some(destination_index) = self
            .folders
            .iter()
            .position(|folder| &folder.id == destination)
        else {
            tracing::warn!(folder_id = %destination, "Cannot move note to unknown folder");
            return false;
        };
        let Some((source_index, note_index)) =
            self.folders.iter().enumerate().find_map(|(index, folder)| {
                folder
                    .notes
                    .iter()
                    .position(|note| &note.id == note_id)
                    .map(|note_index| (index, note_index))
            })
        else {
            tracing::warn!(note_id = %note_id, "Cannot move unknown note");
            return false;
        };
        if source_index == destination_index {
            return false;
        }

        let mut note = self.folders[source_index].notes.remove(note_index);
        note.touch();
        self.folders[destination_index].notes.push(note);
        self.publish(ChangeOrigin::Local);
        true
    }

    pub fn toggle_favourite(&mut self, id: &NoteId) -> bool {
        self.mutate_note(id, |note| {
            note.is_favourite = !note.is_favourite;
            note.touch();
        })
    }

    pub fn toggle_pin(&mut self, id: &NoteId) -> bool {
        self.mutate_note(id, |note| {
            note.is_pinned = !note.is_pinned;
            note.touch();
        })
    }

    /// Add the tag to the note, or remove it if already present.
    pub fn toggle_note_tag(&mut self, note_id: &NoteId, tag_id: &TagId) -> bool {
        if self.tag(tag_id).is_none() {
            tracing::warn!(tag_id = %tag_id, "Cannot apply unknown tag");
            return false;
        }
        self.mutate_note(note_id, |note| {
            if !note.tags.remove(tag_id) {
                note.tags.insert(tag_id.clone());
            }
            note.touch();
        })
    }

    /// Select a folder (physical or favourites). Returns whether the
    /// selection changed.
    pub fn select_folder(&mut self, id: &FolderId) -> bool {
        if !id.is_favourites() && self.folder(id).is_none() {
            tracing::warn!(folder_id = %id, "Cannot select unknown folder");
            return false;
        }
        if self.selection.is_folder(id) {
            return false;
        }
        self.selection.focus_folder(Some(id.clone()));
        true
    }

    pub fn select_note(&mut self, id: Option<&NoteId>) -> bool {
        if let Some(id) = id {
            if self.find_note(id).is_none() {
                tracing::warn!(note_id = %id, "Cannot select unknown note");
                return false;
            }
        }
        let next = id.cloned();
        if self.selection.note == next {
            return false;
        }
        self.selection.note = next;
        true
    }

    pub fn set_search_query(&mut self, query: &str) {
        query.clone_into(&mut self.selection.search_query);
    }

    /// Filter by the tag, or clear the filter if it is already active.
    pub fn toggle_tag_filter(&mut self, id: &TagId) -> bool {
        if self.tag(id).is_none() {
            tracing::warn!(tag_id = %id, "Cannot filter by unknown tag");
            return false;
        }
        if self.selection.tag.as_ref() == Some(id) {
            self.selection.tag = None;
        } else {
            self.selection.tag = Some(id.clone());
        }
        true
    }

    /// Swap in a whole tree from outside (server or cache) and re-resolve the
    /// selection against it.
    pub fn replace_all(&mut self, folders: Vec<Folder>) {
        self.folders = folders;
        self.resolve_selection();
        self.publish(ChangeOrigin::Remote);
    }

    /// Restore a cached tree together with the cached folder selection.
    pub fn restore(&mut self, folders: Vec<Folder>, selected: Option<FolderId>) {
        self.folders = folders;
        self.selection.focus_folder(selected);
        self.resolve_selection();
        self.publish(ChangeOrigin::Remote);
    }

    /// Drop the tree and selection.
    pub fn clear(&mut self) {
        self.folders.clear();
        self.selection = Selection::default();
        self.publish(ChangeOrigin::Cleared);
    }

    fn resolve_selection(&mut self) {
        let folder_valid = self
            .selection
            .folder
            .as_ref()
            .is_some_and(|id| id.is_favourites() || self.folder(id).is_some());
        if !folder_valid {
            let fallback = self.folders.first().map(|folder| folder.id.clone());
            self.selection.focus_folder(fallback);
        }
        if self
            .selection
            .note
            .as_ref()
            .is_some_and(|id| self.find_note(id).is_none())
        {
            self.selection.note = None;
        }
        if self
            .selection
            .tag
            .as_ref()
            .is_some_and(|id| self.tag(id).is_none())
        {
            self.selection.tag = None;
        }
    }

    fn name_taken(&self, name: &str, except: Option<&FolderId>) -> bool {
        Folder::favourites().has_name(name)
            || self
                .folders
                .iter()
                .any(|folder| Some(&folder.id) != except && folder.has_name(name))
    }

    fn folder_mut(&mut self, id: &FolderId) -> Option<&mut Folder> {
        self.folders.iter_mut().find(|folder| &folder.id == id)
    }

    fn mutate_note(&mut self, id: &NoteId, apply: impl FnOnce(&mut Note)) -> bool {
        let Some(note) = self
            .folders
            .iter_mut()
            .flat_map(|folder| folder.notes.iter_mut())
            .find(|note| &note.id == id)
        else {
            tracing::warn!(note_id = %id, "Cannot update unknown note");
            return false;
        };
        apply(note);
        self.publish(ChangeOrigin::Local);
        true
    }

    fn publish(&self, origin: ChangeOrigin) {
        self.revision.send_modify(|revision| {
            revision.number += 1;
            revision.origin = origin;
        });
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn store_with(names: &[&str]) -> (NoteStore, Vec<FolderId>) {
        let mut store = NoteStore::new();
        let ids = names
            .iter()
            .map(|name| store.create_folder(name).unwrap())
            .collect();
        (store, ids)
    }

    /// Every note is owned by exactly one physical folder.
    fn assert_single_ownership(store: &NoteStore) {
        let mut owners: HashMap<&NoteId, usize> = HashMap::new();
        for folder in store.folders() {
            assert!(!folder.is_virtual());
            for note in &folder.notes {
                *owners.entry(&note.id).or_default() += 1;
            }
        }
        assert!(owners.values().all(|count| *count == 1), "{owners:?}");
    }

    #[test]
    fn create_folder_refuses_duplicates_in_any_case() {
        let (mut store, _) = store_with(&["Work"]);
        let revision = store.revision();

        assert_eq!(store.create_folder("work"), None);
        assert_eq!(store.create_folder("  WORK "), None);
        assert_eq!(store.create_folder("   "), None);
        assert_eq!(store.create_folder("favourites"), None);

        let names: Vec<_> = store.folders().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Work"]);
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn delete_folder_refuses_favourites() {
        let (mut store, _) = store_with(&["Work"]);
        let before = store.revision();
        assert!(!store.delete_folder(&FolderId::favourites()));
        assert!(!store.delete_folder(&FolderId::from("missing")));
        assert_eq!(store.revision(), before);
        assert_eq!(store.folders().len(), 1);
    }

    #[test]
    fn delete_folder_drops_notes_and_falls_back_selection() {
        let (mut store, ids) = store_with(&["Work", "Home"]);
        store.select_folder(&ids[1]);
        let note = store.create_note().unwrap();

        assert!(store.delete_folder(&ids[1]));

        assert!(store.find_note(&note).is_none());
        assert_eq!(store.selection().folder.as_ref(), Some(&ids[0]));
        assert_eq!(store.selection().note, None);
    }

    #[test]
    fn delete_last_folder_leaves_no_selection() {
        let (mut store, ids) = store_with(&["Work"]);
        store.select_folder(&ids[0]);
        assert!(store.delete_folder(&ids[0]));
        assert_eq!(store.selection().folder, None);
    }

    #[test]
    fn rename_folder_validates_name() {
        let (mut store, ids) = store_with(&["Work", "Home"]);
        assert!(!store.rename_folder(&FolderId::favourites(), "Stars"));
        assert!(!store.rename_folder(&ids[0], " "));
        assert!(!store.rename_folder(&ids[0], "home"));
        assert!(!store.rename_folder(&FolderId::from("missing"), "Other"));

        assert!(store.rename_folder(&ids[0], "WORK"));
        assert!(store.rename_folder(&ids[0], " Office "));
        assert_eq!(store.folder(&ids[0]).unwrap().name, "Office");
    }

    #[test]
    fn create_note_needs_a_physical_folder() {
        let mut store = NoteStore::new();
        assert_eq!(store.create_note(), None);
        assert_eq!(store.revision().number, 0);
    }

    #[test]
    fn create_note_falls_back_from_favourites_selection() {
        let (mut store, ids) = store_with(&["Work", "Home"]);
        store.select_folder(&FolderId::favourites());

        let note = store.create_note().unwrap();

        let (owner, _) = store.find_note(&note).unwrap();
        assert_eq!(owner.id, ids[0]);
        assert_eq!(store.selection().folder.as_ref(), Some(&ids[0]));
        assert_eq!(store.selection().note.as_ref(), Some(&note));
    }

    #[test]
    fn create_note_inserts_at_head() {
        let (mut store, ids) = store_with(&["Work"]);
        store.select_folder(&ids[0]);
        let first = store.create_note().unwrap();
        let second = store.create_note().unwrap();

        let order: Vec<_> = store.folders()[0].notes.iter().map(|n| &n.id).collect();
        assert_eq!(order, vec![&second, &first]);
    }

    #[test]
    fn update_note_merges_patch_and_bumps_revision() {
        let (mut store, _) = store_with(&["Work"]);
        let note = store.create_note().unwrap();
        let before = store.revision();

        assert!(store.update_note(&note, NotePatch::default().title("Plan")));
        assert!(!store.update_note(&note, NotePatch::default()));
        assert!(!store.update_note(&NoteId::from("missing"), NotePatch::default().title("x")));

        assert_eq!(store.find_note(&note).unwrap().1.title, "Plan");
        assert_eq!(store.revision().number, before.number + 1);
        assert_eq!(store.revision().origin, ChangeOrigin::Local);
    }

    #[test]
    fn delete_note_deselects() {
        let (mut store, _) = store_with(&["Work"]);
        let note = store.create_note().unwrap();
        assert!(store.delete_note(&note));
        assert!(!store.delete_note(&note));
        assert_eq!(store.selection().note, None);
        assert!(store.folders()[0].notes.is_empty());
    }

    #[test]
    fn move_to_folder_transfers_ownership() {
        let (mut store, ids) = store_with(&["Work", "Home"]);
        let note = store.create_note().unwrap();
        let other = store.create_note().unwrap();
        store.select_folder(&ids[1]);
        let third = store.create_note().unwrap();

        assert!(store.move_to_folder(&note, &ids[1]));
        assert_single_ownership(&store);

        let home: Vec<_> = store.folder(&ids[1]).unwrap().notes.iter().map(|n| &n.id).collect();
        assert_eq!(home, vec![&third, &note]);
        assert_eq!(store.folder(&ids[0]).unwrap().notes[0].id, other);
    }

    #[test]
    fn move_to_folder_with_missing_side_is_a_no_op() {
        let (mut store, ids) = store_with(&["Work", "Home"]);
        let note = store.create_note().unwrap();
        let snapshot = store.folders().to_vec();
        let revision = store.revision();

        assert!(!store.move_to_folder(&NoteId::from("missing"), &ids[1]));
        assert!(!store.move_to_folder(&note, &FolderId::from("missing")));
        assert!(!store.move_to_folder(&note, &FolderId::favourites()));
        assert!(!store.move_to_folder(&note, &ids[0]));

        assert_eq!(store.folders(), snapshot.as_slice());
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn ownership_survives_mixed_sequences() {
        let (mut store, ids) = store_with(&["A", "B", "C"]);
        let mut notes = Vec::new();
        for id in &ids {
            store.select_folder(id);
            notes.push(store.create_note().unwrap());
            notes.push(store.create_note().unwrap());
        }
        store.move_to_folder(&notes[0], &ids[2]);
        store.move_to_folder(&notes[3], &ids[0]);
        store.delete_note(&notes[4]);
        store.move_to_folder(&notes[0], &ids[1]);
        store.delete_folder(&ids[2]);

        assert_single_ownership(&store);
        assert_eq!(store.notes().count(), 4);
    }

    #[test]
    fn toggles_flip_flags_and_tags() {
        let (mut store, _) = store_with(&["Work"]);
        let note = store.create_note().unwrap();
        let tag = TagId::from("tag-1");

        assert!(store.toggle_favourite(&note));
        assert!(store.toggle_pin(&note));
        assert!(store.toggle_note_tag(&note, &tag));
        assert!(!store.toggle_note_tag(&note, &TagId::from("nope")));

        let (_, stored) = store.find_note(&note).unwrap();
        assert!(stored.is_favourite);
        assert!(stored.is_pinned);
        assert!(stored.tags.contains(&tag));

        assert!(store.toggle_note_tag(&note, &tag));
        assert!(store.find_note(&note).unwrap().1.tags.is_empty());
    }

    #[test]
    fn selection_changes_do_not_publish() {
        let (mut store, ids) = store_with(&["Work"]);
        let revision = store.revision();

        assert!(store.select_folder(&FolderId::favourites()));
        assert!(store.select_folder(&ids[0]));
        assert!(!store.select_folder(&FolderId::from("missing")));
        store.set_search_query("milk");
        assert!(store.toggle_tag_filter(&TagId::from("tag-2")));

        assert_eq!(store.revision(), revision);
        assert_eq!(store.selection().tag, Some(TagId::from("tag-2")));
        assert!(store.toggle_tag_filter(&TagId::from("tag-2")));
        assert_eq!(store.selection().tag, None);
    }

    #[test]
    fn replace_all_publishes_remote_and_resolves_selection() {
        let (mut store, ids) = store_with(&["Work"]);
        store.select_folder(&ids[0]);
        let mut receiver = store.subscribe();

        let incoming = Folder::custom("Server");
        let incoming_id = incoming.id.clone();
        store.replace_all(vec![incoming]);

        let revision = *receiver.borrow_and_update();
        assert_eq!(revision.origin, ChangeOrigin::Remote);
        assert_eq!(store.selection().folder, Some(incoming_id));
    }

    #[test]
    fn restore_keeps_valid_cached_selection() {
        let mut store = NoteStore::new();
        let work = Folder::custom("Work");
        let home = Folder::custom("Home");
        let home_id = home.id.clone();

        store.restore(vec![work, home], Some(home_id.clone()));
        assert_eq!(store.selection().folder, Some(home_id));

        store.restore(Vec::new(), Some(FolderId::from("gone")));
        assert_eq!(store.selection().folder, None);
    }

    #[test]
    fn clear_wipes_tree_and_selection() {
        let (mut store, _) = store_with(&["Work"]);
        store.create_note();
        store.clear();

        assert!(store.folders().is_empty());
        assert_eq!(store.selection(), &Selection::default());
        assert_eq!(store.revision().origin, ChangeOrigin::Cleared);
        assert_eq!(store.tags().len(), 4);
    }
}
