//! Debounced whole-tree sync with the backend.
//!
//! An observer task watches store revisions. Each local revision replaces
//! the pending push with a new one that fires after the debounce window;
//! remote and cleared revisions cancel it. When the window elapses the push
//! runs in its own task, so cancelling afterwards never aborts a request
//! already on the wire. Pushes are at-most-once: failures are logged and
//! reflected in [`SyncState`], never retried.

mod pull;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub use pull::normalize_folders;

use crate::api::validate::validate_folders;
use crate::api::{RemoteApi, RemoteUser, UpdateDataRequest};
use crate::session::Session;
use crate::store::{ChangeOrigin, Revision, SharedStore};
use crate::util::lock;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SyncState {
    #[default]
    Idle,
    /// A push is scheduled and waiting out the debounce window
    Pending,
    Syncing,
    Synced { at: DateTime<Utc> },
    Error { message: String },
    /// The server rejected the session token
    Unauthorized,
}

pub struct SyncEngine<A: RemoteApi> {
    inner: Arc<Inner<A>>,
    observer: JoinHandle<()>,
}

struct Inner<A: RemoteApi> {
    api: Arc<A>,
    store: SharedStore,
    session: Session,
    debounce: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
    in_flight: Mutex<Option<JoinHandle<()>>>,
    /// Highest revision that needs no push
    settled: AtomicU64,
    state: watch::Sender<SyncState>,
}

impl<A: RemoteApi> SyncEngine<A> {
    /// Start observing the store. Must be called inside a tokio runtime.
    pub fn new(api: Arc<A>, store: SharedStore, session: Session, debounce: Duration) -> Self {
        let revisions = lock(&store).subscribe();
        let settled = lock(&store).revision().number;
        let inner = Arc::new(Inner {
            api,
            store,
            session,
            debounce,
            pending: Mutex::new(None),
            in_flight: Mutex::new(None),
            settled: AtomicU64::new(settled),
            state: watch::Sender::new(SyncState::Idle),
        });
        let observer = tokio::spawn(Arc::clone(&inner).observe(revisions));
        Self { inner, observer }
    }

    pub fn state(&self) -> SyncState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.inner.state.subscribe()
    }

    /// Drop the scheduled push, if it has not fired yet.
    pub fn cancel_pending(&self) {
        self.inner.cancel_pending();
    }

    /// Push the current tree now, bypassing the debounce window.
    pub async fn push_now(&self) -> SyncState {
        self.cancel_pending();
        self.inner.push().await
    }

    /// Fire any outstanding local change immediately and wait for it.
    ///
    /// Only the most recently started push is awaited; an older push still
    /// on the wire keeps running detached.
    pub async fn flush(&self) {
        self.cancel_pending();
        let in_flight = lock(&self.inner.in_flight).take();
        if let Some(handle) = in_flight {
            if let Err(error) = handle.await {
                tracing::error!("Sync push task failed: {error}");
            }
        }
        if self.inner.has_unsynced_changes() {
            self.inner.push().await;
        }
    }

    /// Replace the local tree with the server's copy of the user.
    ///
    /// Returns the number of folders pulled.
    pub fn pull(&self, user: RemoteUser) -> usize {
        self.cancel_pending();
        let folders = normalize_folders(user.folders.unwrap_or_default());
        let count = folders.len();
        let revision = {
            let mut store = lock(&self.inner.store);
            store.replace_all(folders);
            store.revision().number
        };
        self.inner.settle(revision);
        tracing::info!(folders = count, "Pulled folder tree from server");
        count
    }
}

impl<A: RemoteApi> Drop for SyncEngine<A> {
    fn drop(&mut self) {
        self.observer.abort();
        self.inner.cancel_pending();
    }
}

impl<A: RemoteApi> Inner<A> {
    async fn observe(self: Arc<Self>, mut revisions: watch::Receiver<Revision>) {
        while revisions.changed().await.is_ok() {
            let revision = *revisions.borrow_and_update();
            match revision.origin {
                ChangeOrigin::Local => self.schedule_push(),
                ChangeOrigin::Remote | ChangeOrigin::Cleared => {
                    self.cancel_pending();
                    self.settle(revision.number);
                }
            }
        }
    }

    fn schedule_push(self: &Arc<Self>) {
        if !self.session.is_authenticated() {
            tracing::debug!("Not scheduling push without a session");
            return;
        }

        let inner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            if !inner.has_unsynced_changes() {
                inner.publish(SyncState::Idle);
                return;
            }
            let task = Arc::clone(&inner);
            let in_flight = tokio::spawn(async move {
                task.push().await;
            });
            *lock(&inner.in_flight) = Some(in_flight);
        });

        let previous = lock(&self.pending).replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
        self.state.send_replace(SyncState::Pending);
        tracing::debug!(debounce_ms = self.debounce.as_millis(), "Scheduled push");
    }

    fn cancel_pending(&self) {
        let pending = lock(&self.pending).take();
        if let Some(handle) = pending {
            handle.abort();
        }
        self.state.send_if_modified(|state| {
            if *state == SyncState::Pending {
                *state = SyncState::Idle;
                true
            } else {
                false
            }
        });
    }

    fn settle(&self, revision: u64) {
        self.settled.fetch_max(revision, Ordering::SeqCst);
    }

    fn has_unsynced_changes(&self) -> bool {
        let revision = lock(&self.store).revision();
        revision.origin == ChangeOrigin::Local
            && revision.number > self.settled.load(Ordering::SeqCst)
    }

    async fn push(&self) -> SyncState {
        let Some(credentials) = self.session.credentials() else {
            tracing::debug!("Skipping push without a session");
            return self.state.borrow().clone();
        };
        let epoch = self.session.epoch();

        let (revision, folders) = {
            let store = lock(&self.store);
            (store.revision().number, store.folders().to_vec())
        };
        self.settle(revision);

        if let Err(error) = validate_folders(&folders) {
            tracing::error!("Refusing to push invalid tree: {error}");
            return self.publish(SyncState::Error {
                message: error.to_string(),
            });
        }

        self.publish(SyncState::Syncing);
        let request = UpdateDataRequest {
            user_id: credentials.identity.id.clone(),
            folders,
        };
        let result = self.api.update_data(&credentials.token, &request).await;

        if self.session.epoch() != epoch {
            tracing::debug!("Session changed during push; ignoring outcome");
            return self.publish(SyncState::Idle);
        }
        match result {
            Ok(_) => {
                tracing::info!(
                    folders = request.folders.len(),
                    revision,
                    "Pushed folder tree"
                );
                self.publish(SyncState::Synced { at: Utc::now() })
            }
            Err(error) if error.is_unauthorized() => {
                tracing::warn!("Server rejected session token: {error}");
                self.publish(SyncState::Unauthorized)
            }
            Err(error) => {
                tracing::error!("Failed to push folder tree: {error}");
                self.publish(SyncState::Error {
                    message: error.to_string(),
                })
            }
        }
    }

    fn publish(&self, state: SyncState) -> SyncState {
        self.state.send_replace(state.clone());
        state
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use reqwest::StatusCode;

    use super::*;
    use crate::api::fake::{issue_token, FakeApi};
    use crate::models::{FolderId, NoteId, NotePatch};
    use crate::session::Credentials;
    use crate::store::NoteStore;

    const WINDOW: Duration = Duration::from_millis(1_000);

    struct Harness {
        api: Arc<FakeApi>,
        store: SharedStore,
        session: Session,
        engine: SyncEngine<FakeApi>,
    }

    impl Harness {
        fn signed_in() -> Self {
            let harness = Self::anonymous();
            let token = issue_token("user-1", "ada@example.com", "Ada");
            harness
                .session
                .sign_in(Credentials::from_token(token).unwrap());
            harness
        }

        fn anonymous() -> Self {
            let api = Arc::new(FakeApi::default());
            let store = NoteStore::new().shared();
            let session = Session::new();
            let engine =
                SyncEngine::new(Arc::clone(&api), Arc::clone(&store), session.clone(), WINDOW);
            Self {
                api,
                store,
                session,
                engine,
            }
        }

        fn with_note(&self) -> NoteId {
            let mut store = lock(&self.store);
            store.create_folder("Work");
            store.create_note().unwrap()
        }

        async fn settle(&self) {
            tokio::time::sleep(WINDOW * 2).await;
            self.engine.flush().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_updates_pushes_once_with_final_state() {
        let harness = Harness::signed_in();
        let note = harness.with_note();

        for draft in 1..=5 {
            lock(&harness.store).update_note(
                &note,
                NotePatch::default().content(format!("draft {draft}")),
            );
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        harness.settle().await;

        let pushes = harness.api.pushes();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].user_id, "user-1");
        assert_eq!(pushes[0].folders[0].notes[0].content, "draft 5");
        assert!(matches!(harness.engine.state(), SyncState::Synced { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn separated_edits_push_separately() {
        let harness = Harness::signed_in();
        let note = harness.with_note();
        harness.settle().await;

        lock(&harness.store).toggle_favourite(&note);
        harness.settle().await;

        let pushes = harness.api.pushes();
        assert_eq!(pushes.len(), 2);
        assert!(pushes[1].folders[0].notes[0].is_favourite);
    }

    #[tokio::test(start_paused = true)]
    async fn refused_favourites_delete_sends_nothing() {
        let harness = Harness::signed_in();
        harness.with_note();
        harness.settle().await;
        let calls = harness.api.calls();

        assert!(!lock(&harness.store).delete_folder(&FolderId::favourites()));
        harness.settle().await;

        assert_eq!(harness.api.calls(), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn no_push_without_session() {
        let harness = Harness::anonymous();
        harness.with_note();
        harness.settle().await;

        assert_eq!(harness.api.calls(), 0);
        assert_eq!(harness.engine.push_now().await, SyncState::Idle);
        assert_eq!(harness.api.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_state_is_visible_during_window() {
        let harness = Harness::signed_in();
        harness.with_note();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(harness.engine.state(), SyncState::Pending);
        harness.engine.cancel_pending();
        assert_eq!(harness.engine.state(), SyncState::Idle);

        tokio::time::sleep(WINDOW * 2).await;
        assert!(harness.api.pushes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_token_marks_unauthorized() {
        let harness = Harness::signed_in();
        harness.api.fail_pushes_with(StatusCode::UNAUTHORIZED);
        harness.with_note();
        harness.settle().await;

        assert_eq!(harness.engine.state(), SyncState::Unauthorized);
        assert!(harness.session.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn server_failure_is_reported_not_retried() {
        let harness = Harness::signed_in();
        harness.api.fail_pushes_with(StatusCode::INTERNAL_SERVER_ERROR);
        harness.with_note();
        harness.settle().await;
        let calls = harness.api.calls();
        harness.settle().await;

        assert!(matches!(harness.engine.state(), SyncState::Error { .. }));
        assert_eq!(harness.api.calls(), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_note_is_not_sent() {
        let harness = Harness::signed_in();
        let note = harness.with_note();
        lock(&harness.store).update_note(&note, NotePatch::default().content("x".repeat(50_001)));
        harness.settle().await;

        assert_eq!(harness.api.calls(), 0);
        assert!(matches!(harness.engine.state(), SyncState::Error { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn flush_pushes_immediately() {
        let harness = Harness::signed_in();
        harness.with_note();
        harness.engine.flush().await;

        assert_eq!(harness.api.pushes().len(), 1);

        tokio::time::sleep(WINDOW * 2).await;
        assert_eq!(harness.api.pushes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pull_replaces_tree_and_cancels_pending_push() {
        let harness = Harness::signed_in();
        harness.with_note();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let user: RemoteUser = serde_json::from_value(serde_json::json!({
            "id": "user-1",
            "folders": [{ "name": "All notes", "notes": [] }]
        }))
        .unwrap();
        assert_eq!(harness.engine.pull(user), 1);
        harness.settle().await;

        let store = lock(&harness.store);
        assert_eq!(store.folders()[0].name, "All notes");
        assert_eq!(store.selection().folder, Some(FolderId::from("All notes")));
        assert!(harness.api.pushes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn sign_out_discards_pushes_in_the_window() {
        let harness = Harness::signed_in();
        harness.with_note();
        tokio::time::sleep(Duration::from_millis(10)).await;

        harness.session.sign_out();
        harness.settle().await;

        assert!(harness.api.pushes().is_empty());
    }
}
