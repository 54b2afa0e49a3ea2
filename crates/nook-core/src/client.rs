//! Client facade wiring the store, cache, session and sync engine together.
//!
//! Front ends hold one [`NookClient`] and drive everything through it. Tree
//! mutations require a signed-in session; each one runs under the store
//! lock and is mirrored into the local cache before the call returns.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::api::{HttpRemoteApi, LoginRequest, RegisterRequest, RemoteApi, RemoteUser};
use crate::cache::{BlobStore, FileBlobStore, LocalCache};
use crate::config::ClientConfig;
use crate::models::{Folder, FolderId, Identity, Note, NoteId, NotePatch, TagId};
use crate::session::{Credentials, Session, TokenStore};
use crate::store::{NoteStore, SharedStore};
use crate::sync::{SyncEngine, SyncState};
use crate::util::lock;
use crate::{view, Error, Result};

/// Result of a login or registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Success(Identity),
    Failure { message: String },
}

impl AuthOutcome {
    fn failure(error: impl fmt::Display) -> Self {
        Self::Failure {
            message: error.to_string(),
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

pub struct NookClient<A: RemoteApi, B: BlobStore> {
    api: Arc<A>,
    store: SharedStore,
    session: Session,
    cache: LocalCache<B>,
    tokens: TokenStore<B>,
    sync: SyncEngine<A>,
}

impl NookClient<HttpRemoteApi, FileBlobStore> {
    /// HTTP client persisting its cache and token under `data_dir`.
    pub fn connect(config: &ClientConfig, data_dir: &Path) -> Result<Self> {
        let api = HttpRemoteApi::new(config.api_base_url.clone(), config.request_timeout())?;
        Ok(Self::new(
            api,
            FileBlobStore::new(data_dir),
            config.debounce(),
        ))
    }
}

impl<A: RemoteApi, B: BlobStore> NookClient<A, B> {
    /// Must be called inside a tokio runtime.
    pub fn new(api: A, blobs: B, debounce: std::time::Duration) -> Self {
        let api = Arc::new(api);
        let store = NoteStore::new().shared();
        let session = Session::new();
        let sync = SyncEngine::new(
            Arc::clone(&api),
            Arc::clone(&store),
            session.clone(),
            debounce,
        );
        Self {
            api,
            store,
            session,
            cache: LocalCache::new(blobs.clone()),
            tokens: TokenStore::new(blobs),
            sync,
        }
    }

    /// Restore the persisted session and, with it, the cached tree.
    ///
    /// Returns whether a session was restored. An unreadable token is
    /// discarded along with the cache.
    pub fn start(&self) -> Result<bool> {
        let Some(token) = self.tokens.load()? else {
            self.cache.clear()?;
            return Ok(false);
        };

        match Credentials::from_token(token) {
            Ok(credentials) => {
                self.session.sign_in(credentials);
                let folders = self.cache.load_folders().unwrap_or_else(|error| {
                    tracing::warn!("Ignoring unreadable folder cache: {error}");
                    None
                });
                let selected = self.cache.load_selected_folder().unwrap_or_else(|error| {
                    tracing::warn!("Ignoring unreadable folder selection: {error}");
                    None
                });
                if let Some(folders) = folders {
                    lock(&self.store).restore(folders, selected);
                }
                Ok(true)
            }
            Err(error) => {
                tracing::warn!("Discarding persisted session: {error}");
                self.tokens.clear()?;
                self.cache.clear()?;
                Ok(false)
            }
        }
    }

    pub const fn session(&self) -> &Session {
        &self.session
    }

    pub fn identity(&self) -> Option<Identity> {
        self.session.identity()
    }

    pub const fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Read from the store under its lock.
    pub fn read<T>(&self, read: impl FnOnce(&NoteStore) -> T) -> T {
        read(&lock(&self.store))
    }

    pub async fn login(&self, email: &str, password: &str) -> AuthOutcome {
        let request = match LoginRequest::new(email, password) {
            Ok(request) => request,
            Err(error) => return AuthOutcome::failure(error),
        };
        match self.api.login(&request).await {
            Ok(response) => self.complete_sign_in(response.token, response.user),
            Err(error) => {
                tracing::error!("Login failed: {error}");
                AuthOutcome::failure(error)
            }
        }
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> AuthOutcome {
        let request = match RegisterRequest::new(email, password, display_name) {
            Ok(request) => request,
            Err(error) => return AuthOutcome::failure(error),
        };
        match self.api.register(&request).await {
            Ok(response) => self.complete_sign_in(response.token, response.new_user),
            Err(error) => {
                tracing::error!("Registration failed: {error}");
                AuthOutcome::failure(error)
            }
        }
    }

    fn complete_sign_in(&self, token: String, user: Option<RemoteUser>) -> AuthOutcome {
        let credentials = match Credentials::from_token(token) {
            Ok(credentials) => credentials,
            Err(error) => {
                tracing::error!("Server issued an unreadable token: {error}");
                return AuthOutcome::failure(error);
            }
        };
        if let Err(error) = self.tokens.save(&credentials.token) {
            tracing::warn!("Failed to persist session token: {error}");
        }
        let identity = credentials.identity.clone();
        self.session.sign_in(credentials);
        self.sync.pull(user.unwrap_or_default());
        self.persist_snapshot();
        AuthOutcome::Success(identity)
    }

    /// Sign out and forget everything stored locally for the user.
    pub fn logout(&self) -> Result<()> {
        self.sync.cancel_pending();
        self.session.sign_out();
        lock(&self.store).clear();
        self.cache.clear()?;
        self.tokens.clear()
    }

    /// Re-fetch the user from the server and replace the local tree with it.
    pub async fn refresh_profile(&self) -> Result<usize> {
        let credentials = self.session.credentials().ok_or(Error::NotAuthenticated)?;
        let epoch = self.session.epoch();
        let user = self
            .api
            .get_user(&credentials.token, &credentials.identity.id)
            .await?;
        if self.session.epoch() != epoch {
            tracing::debug!("Session changed while refreshing; ignoring profile");
            return Err(Error::NotAuthenticated);
        }
        let count = self.sync.pull(user);
        self.persist_snapshot();
        Ok(count)
    }

    pub fn create_folder(&self, name: &str) -> Result<Option<FolderId>> {
        self.mutate_tree(|store| store.create_folder(name))
    }

    pub fn delete_folder(&self, id: &FolderId) -> Result<bool> {
        self.mutate_tree(|store| store.delete_folder(id))
    }

    pub fn rename_folder(&self, id: &FolderId, name: &str) -> Result<bool> {
        self.mutate_tree(|store| store.rename_folder(id, name))
    }

    pub fn create_note(&self) -> Result<Option<NoteId>> {
        self.mutate_tree(NoteStore::create_note)
    }

    pub fn update_note(&self, id: &NoteId, patch: NotePatch) -> Result<bool> {
        self.mutate_tree(|store| store.update_note(id, patch))
    }

    pub fn delete_note(&self, id: &NoteId) -> Result<bool> {
        self.mutate_tree(|store| store.delete_note(id))
    }

    pub fn move_to_folder(&self, note: &NoteId, destination: &FolderId) -> Result<bool> {
        self.mutate_tree(|store| store.move_to_folder(note, destination))
    }

    pub fn toggle_favourite(&self, id: &NoteId) -> Result<bool> {
        self.mutate_tree(|store| store.toggle_favourite(id))
    }

    pub fn toggle_pin(&self, id: &NoteId) -> Result<bool> {
        self.mutate_tree(|store| store.toggle_pin(id))
    }

    pub fn toggle_note_tag(&self, note: &NoteId, tag: &TagId) -> Result<bool> {
        self.mutate_tree(|store| store.toggle_note_tag(note, tag))
    }

    pub fn select_folder(&self, id: &FolderId) -> bool {
        self.mutate(|store| store.select_folder(id))
    }

    pub fn select_note(&self, id: Option<&NoteId>) -> bool {
        self.mutate(|store| store.select_note(id))
    }

    pub fn set_search_query(&self, query: &str) {
        self.mutate(|store| store.set_search_query(query));
    }

    pub fn toggle_tag_filter(&self, id: &TagId) -> bool {
        self.mutate(|store| store.toggle_tag_filter(id))
    }

    pub fn all_folders(&self) -> Vec<Folder> {
        self.read(view::all_folders)
    }

    pub fn effective_folder(&self) -> Folder {
        self.read(|store| view::effective_folder(store, store.selection()))
    }

    pub fn visible_notes(&self) -> Vec<Note> {
        self.read(|store| view::visible_notes(store, store.selection()))
    }

    pub fn selected_note(&self) -> Option<Note> {
        self.read(|store| view::selected_note(store, store.selection()))
    }

    pub fn note_count(&self, id: &FolderId) -> usize {
        self.read(|store| view::note_count(store, id))
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync.state()
    }

    pub fn subscribe_sync(&self) -> tokio::sync::watch::Receiver<SyncState> {
        self.sync.subscribe()
    }

    /// Push the current tree without waiting out the debounce window.
    pub async fn push_now(&self) -> SyncState {
        self.sync.push_now().await
    }

    /// Send any outstanding change and wait for the latest push.
    pub async fn flush(&self) {
        self.sync.flush().await;
    }

    fn mutate_tree<T>(&self, apply: impl FnOnce(&mut NoteStore) -> T) -> Result<T> {
        if !self.session.is_authenticated() {
            tracing::warn!("Refusing to modify notes without a session");
            return Err(Error::NotAuthenticated);
        }
        Ok(self.mutate(apply))
    }

    /// Apply a store operation and mirror whatever it changed into the cache.
    fn mutate<T>(&self, apply: impl FnOnce(&mut NoteStore) -> T) -> T {
        let (result, folders, selected) = {
            let mut store = lock(&self.store);
            let revision = store.revision();
            let selected = store.selection().folder.clone();
            let result = apply(&mut store);
            let folders = (store.revision() != revision).then(|| store.folders().to_vec());
            let selected =
                (store.selection().folder != selected).then(|| store.selection().folder.clone());
            (result, folders, selected)
        };
        self.mirror(folders.as_deref(), selected.as_ref().map(Option::as_ref));
        result
    }

    fn persist_snapshot(&self) {
        let (folders, selected) = {
            let store = lock(&self.store);
            (store.folders().to_vec(), store.selection().folder.clone())
        };
        self.mirror(Some(&folders), Some(selected.as_ref()));
    }

    fn mirror(&self, folders: Option<&[Folder]>, selected: Option<Option<&FolderId>>) {
        if let Some(folders) = folders {
            if let Err(error) = self.cache.save_folders(folders) {
                tracing::warn!("Failed to cache folders: {error}");
            }
        }
        if let Some(selected) = selected {
            if let Err(error) = self.cache.save_selected_folder(selected) {
                tracing::warn!("Failed to cache folder selection: {error}");
            }
        }
    }
}
