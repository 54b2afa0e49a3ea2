use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] nook_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Not signed in. Run `nook auth login` first.")]
    NotSignedIn,
    #[error("{0}")]
    AuthFailed(String),
    #[error("Note ID cannot be empty")]
    EmptyNoteId,
    #[error("Edited note content cannot be empty")]
    EmptyEditedContent,
    #[error("Note not found for id/prefix: {0}")]
    NoteNotFound(String),
    #[error("{0}")]
    AmbiguousNoteId(String),
    #[error("Folder not found: {0}")]
    FolderNotFound(String),
    #[error("Tag not found: {0}")]
    TagNotFound(String),
    #[error("Create a folder first with `nook folders create <name>`")]
    NoFolders,
    #[error("{0}")]
    Refused(String),
    #[error("Sync failed: {0}")]
    SyncFailed(String),
    #[error("Editor command failed: {0}")]
    EditorFailed(String),
    #[error("Could not determine a data directory; pass --data-dir or set NOOK_DATA_DIR")]
    NoDataDir,
}

impl CliError {
    pub fn refused(message: impl Into<String>) -> Self {
        Self::Refused(message.into())
    }
}
