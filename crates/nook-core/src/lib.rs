//! nook-core - Core library for Nook
//!
//! Folders of notes with a virtual favourites view, kept in a local store,
//! mirrored to a local cache and synced to the backend as a whole tree after
//! a quiet period. Front ends drive everything through
//! [`client::NookClient`].

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod store;
pub mod sync;
mod util;
pub mod view;

pub use client::{AuthOutcome, NookClient};
pub use error::{Error, Result};
pub use models::{Folder, FolderId, Note, NoteId, NotePatch, Tag, TagId};
