//! Data models for Nook

mod folder;
mod note;
mod tag;
pub(crate) mod timestamp;
mod user;

pub use folder::{
    Folder, FolderId, FolderKind, DEFAULT_FOLDER_ICON, FAVOURITES_FOLDER_ID, FAVOURITES_ICON,
};
pub use note::{Note, NoteId, NotePatch};
pub use tag::{default_tags, Tag, TagId};
pub use user::Identity;

use serde::{Deserialize, Deserializer};

/// Decode an explicit `null` the same way as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
