//! Local blob cache used for session continuity.
//!
//! Values are JSON documents stored under fixed keys. The file store keeps
//! one `<key>.json` file per key inside the data directory.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{Folder, FolderId};
use crate::util::lock;
use crate::Result;

/// Key holding the physical folder tree.
pub const FOLDERS_KEY: &str = "folders";
/// Key holding the id of the selected folder.
pub const SELECTED_FOLDER_KEY: &str = "selected-folder";

/// Key-value storage for small JSON blobs.
pub trait BlobStore: Clone + Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Blob store backed by one file per key.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value)?;
        fs::rename(&staging, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

/// In-process blob store, for tests and ephemeral clients.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

/// Typed view over a [`BlobStore`] for the folder tree and selection.
#[derive(Debug, Clone)]
pub struct LocalCache<B: BlobStore> {
    blobs: B,
}

impl<B: BlobStore> LocalCache<B> {
    pub const fn new(blobs: B) -> Self {
        Self { blobs }
    }

    pub const fn blobs(&self) -> &B {
        &self.blobs
    }

    pub fn save_folders(&self, folders: &[Folder]) -> Result<()> {
        self.write(FOLDERS_KEY, &folders)
    }

    pub fn load_folders(&self) -> Result<Option<Vec<Folder>>> {
        self.read(FOLDERS_KEY)
    }

    pub fn save_selected_folder(&self, id: Option<&FolderId>) -> Result<()> {
        match id {
            Some(id) => self.write(SELECTED_FOLDER_KEY, id),
            None => self.blobs.remove(SELECTED_FOLDER_KEY),
        }
    }

    pub fn load_selected_folder(&self) -> Result<Option<FolderId>> {
        self.read(SELECTED_FOLDER_KEY)
    }

    /// Drop the cached tree and selection.
    pub fn clear(&self) -> Result<()> {
        self.blobs.remove(FOLDERS_KEY)?;
        self.blobs.remove(SELECTED_FOLDER_KEY)
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.blobs.set(key, &raw)
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.blobs
            .get(key)?
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(Into::into)
    }
}
