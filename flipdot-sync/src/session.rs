//! Working-document session with debounced autosave.
//!
//! Edits go straight into the local [`Editor`]. A dirty editor (re)starts a
//! debounce timer; when it fires, the whole document is posted under the name
//! captured when the timer started. The server copy is overwritten wholesale.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use flipdot_core::{AnimationDocument, Editor, ListResponse, SaveResponse, WireDocument};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::StoreClient;
use crate::error::SyncResult;
use crate::SyncConfig;

/// Save indicator for the editing surface.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncStatus {
    /// Nothing to save.
    #[default]
    Idle,
    /// A debounced save is waiting for input to pause.
    Pending {
        /// Target name.
        name: String,
    },
    /// A save request is in flight.
    Saving {
        /// Target name.
        name: String,
    },
    /// The last save succeeded.
    Saved {
        /// Target name.
        name: String,
    },
    /// The last save failed. It is not retried.
    Failed {
        /// Target name.
        name: String,
        /// Error description.
        message: String,
    },
}

struct PendingSave {
    name: String,
    generation: u64,
    handle: JoinHandle<()>,
}

struct Shared {
    client: StoreClient,
    editor: Mutex<Editor>,
    pending: Mutex<Option<PendingSave>>,
    generation: AtomicU64,
    status: watch::Sender<SyncStatus>,
}

impl Shared {
    fn editor(&self) -> MutexGuard<'_, Editor> {
        self.editor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pending(&self) -> MutexGuard<'_, Option<PendingSave>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_status(&self, status: SyncStatus) {
        self.status.send_replace(status);
    }

    /// Snapshot the working document and post it under `name`.
    ///
    /// Returns `Ok(None)` when a different document has been loaded since the
    /// save was scheduled.
    async fn save(&self, name: &str) -> SyncResult<Option<SaveResponse>> {
        let wire = {
            let mut editor = self.editor();
            if editor.document().name() != name {
                debug!(
                    name,
                    current = editor.document().name(),
                    "dropping save for a document that is no longer loaded"
                );
                drop(editor);
                self.set_status(SyncStatus::Idle);
                return Ok(None);
            }
            editor.mark_clean();
            WireDocument::from(editor.document())
        };

        self.set_status(SyncStatus::Saving {
            name: name.to_string(),
        });
        match self.client.save(name, &wire).await {
            Ok(resp) => {
                debug!(name, "animation saved");
                self.set_status(SyncStatus::Saved {
                    name: name.to_string(),
                });
                Ok(Some(resp))
            }
            Err(err) => {
                warn!(name, error = %err, "failed to save animation");
                self.set_status(SyncStatus::Failed {
                    name: name.to_string(),
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }
}

/// Editor-side sync session for one server.
pub struct SyncClient {
    shared: Arc<Shared>,
    debounce: Duration,
}

impl std::fmt::Debug for SyncClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncClient")
            .field("client", &self.shared.client)
            .field("debounce", &self.debounce)
            .field("status", &*self.shared.status.borrow())
            .finish_non_exhaustive()
    }
}

impl SyncClient {
    /// Connect and load the server's active animation.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::SyncError`] if the URL is invalid or the initial
    /// fetch fails.
    pub async fn connect(config: &SyncConfig) -> SyncResult<Self> {
        let client = StoreClient::with_timeout(&config.base_url, config.request_timeout)?;
        let document = client.fetch_document(None).await?;
        info!(
            server = %client.base_url(),
            name = document.name(),
            "connected to flipdot server"
        );
        Ok(Self::new(client, document, config.debounce))
    }

    /// Start a session over an already-fetched document.
    #[must_use]
    pub fn new(client: StoreClient, document: AnimationDocument, debounce: Duration) -> Self {
        let (status, _) = watch::channel(SyncStatus::Idle);
        Self {
            shared: Arc::new(Shared {
                client,
                editor: Mutex::new(Editor::new(document)),
                pending: Mutex::new(None),
                generation: AtomicU64::new(0),
                status,
            }),
            debounce,
        }
    }

    /// The underlying HTTP client.
    #[must_use]
    pub fn client(&self) -> &StoreClient {
        &self.shared.client
    }

    /// Name of the working document.
    #[must_use]
    pub fn name(&self) -> String {
        self.shared.editor().document().name().to_string()
    }

    /// Read the editor.
    pub fn with_editor<R>(&self, f: impl FnOnce(&Editor) -> R) -> R {
        f(&self.shared.editor())
    }

    /// Apply an edit. If it leaves the editor dirty, the debounce restarts.
    ///
    /// Must be called from within a tokio runtime.
    pub fn edit<R>(&self, f: impl FnOnce(&mut Editor) -> R) -> R {
        let (result, dirty, name) = {
            let mut editor = self.shared.editor();
            let result = f(&mut editor);
            (
                result,
                editor.is_dirty(),
                editor.document().name().to_string(),
            )
        };
        if dirty {
            self.schedule(name);
        }
        result
    }

    fn schedule(&self, name: String) {
        let generation = self.shared.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let shared = Arc::clone(&self.shared);
        let delay = self.debounce;
        let target = name.clone();

        // Holding the slot while spawning keeps a zero-length debounce from
        // firing before it is registered.
        let mut slot = self.shared.pending();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut slot = shared.pending();
                match slot.as_ref() {
                    Some(p) if p.generation == generation => {
                        slot.take();
                    }
                    _ => return,
                }
            }
            // Failures are reported on the status channel.
            let _ = shared.save(&target).await;
        });
        if let Some(previous) = slot.replace(PendingSave {
            name: name.clone(),
            generation,
            handle,
        }) {
            previous.handle.abort();
        }
        drop(slot);

        self.shared.set_status(SyncStatus::Pending { name });
    }

    /// Run a pending debounced save now.
    ///
    /// Returns `Ok(None)` if nothing was pending.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::SyncError`] if the save fails.
    pub async fn flush(&self) -> SyncResult<Option<SaveResponse>> {
        let pending = self.shared.pending().take();
        let Some(pending) = pending else {
            return Ok(None);
        };
        pending.handle.abort();
        self.shared.save(&pending.name).await
    }

    /// Save the working document unconditionally without waiting.
    ///
    /// Cancels any pending debounce. The returned handle may be ignored.
    pub fn save_now(&self) -> JoinHandle<SyncResult<Option<SaveResponse>>> {
        if let Some(pending) = self.shared.pending().take() {
            pending.handle.abort();
        }
        let shared = Arc::clone(&self.shared);
        let name = self.name();
        tokio::spawn(async move { shared.save(&name).await })
    }

    /// End the session with a best-effort save of the working document.
    pub fn close(self) -> JoinHandle<SyncResult<Option<SaveResponse>>> {
        info!(name = %self.name(), "closing sync session");
        self.save_now()
    }

    /// Switch to `name`: flush the old document, select, then reload.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::SyncError`] if any step fails. On error the old
    /// document stays loaded.
    pub async fn switch_to(&self, name: &str) -> SyncResult<()> {
        self.flush().await?;
        self.shared.client.select(name).await?;
        let document = self.shared.client.fetch_document(Some(name)).await?;
        info!(name, frames = document.frame_count(), "switched animation");
        self.shared.editor().load(document);
        self.shared.set_status(SyncStatus::Idle);
        Ok(())
    }

    /// Delete `name` on the server and return the new active name.
    ///
    /// A pending save for `name` is cancelled. If `name` is the working
    /// document, the new active animation is loaded.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::SyncError`] if the delete or reload fails.
    pub async fn delete(&self, name: &str) -> SyncResult<String> {
        // Held back while the request is in flight so it cannot recreate
        // `name`; restored if the delete fails.
        let cancelled = {
            let mut slot = self.shared.pending();
            match slot.take() {
                Some(pending) if pending.name == name => {
                    pending.handle.abort();
                    true
                }
                other => {
                    *slot = other;
                    false
                }
            }
        };

        let active = match self.shared.client.delete(name).await {
            Ok(resp) => resp.active,
            Err(err) => {
                if cancelled {
                    self.reschedule_if_dirty();
                }
                return Err(err);
            }
        };
        if self.name() == name {
            let document = self.shared.client.fetch_document(Some(&active)).await?;
            self.shared.editor().load(document);
            self.shared.set_status(SyncStatus::Idle);
        }
        Ok(active)
    }

    fn reschedule_if_dirty(&self) {
        let (dirty, name) = {
            let editor = self.shared.editor();
            (editor.is_dirty(), editor.document().name().to_string())
        };
        if dirty {
            self.schedule(name);
        }
    }

    /// List the server library.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::SyncError`] if the request fails.
    pub async fn list(&self) -> SyncResult<ListResponse> {
        self.shared.client.list().await
    }

    /// Current save status.
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        self.shared.status.borrow().clone()
    }

    /// Watch status changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.shared.status.subscribe()
    }

    /// Whether a debounced save is waiting.
    #[must_use]
    pub fn has_pending_save(&self) -> bool {
        self.shared.pending().is_some()
    }
}

impl Drop for SyncClient {
    /// A pending save is sent right away on the current runtime, without
    /// waiting for the result. Prefer [`SyncClient::close`] to get a handle.
    fn drop(&mut self) {
        let Some(pending) = self.shared.pending().take() else {
            return;
        };
        pending.handle.abort();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let shared = Arc::clone(&self.shared);
                runtime.spawn(async move {
                    // Failures are reported on the status channel.
                    let _ = shared.save(&pending.name).await;
                });
            }
            Err(_) => warn!(
                name = %pending.name,
                "sync session dropped outside a runtime, unsaved edits lost"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SyncError;
    use flipdot_core::{Point, Tool};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn walk() -> AnimationDocument {
        AnimationDocument::new("walk", 8, 4)
    }

    async fn mock_save_ok(server: &MockServer, name: &str) {
        Mock::given(method("POST"))
            .and(path("/state"))
            .and(query_param("name", name))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "name": name })),
            )
            .mount(server)
            .await;
    }

    async fn saves(server: &MockServer) -> Vec<Request> {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.method.as_str() == "POST" && r.url.path() == "/state")
            .collect()
    }

    fn session(server: &MockServer, debounce: Duration) -> SyncClient {
        let client = StoreClient::new(server.uri()).expect("client");
        SyncClient::new(client, walk(), debounce)
    }

    fn dab(editor: &mut Editor, x: i32) {
        editor.pointer_down(Point::new(x, 1));
        editor.pointer_up(Point::new(x, 1));
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn test_edits_coalesce_into_one_save() {
        let server = MockServer::start().await;
        mock_save_ok(&server, "walk").await;
        let sync = session(&server, Duration::from_millis(150));

        for x in 0..5 {
            sync.edit(|e| dab(e, x));
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(sync.has_pending_save());
        assert!(matches!(sync.status(), SyncStatus::Pending { .. }));

        tokio::time::sleep(Duration::from_millis(600)).await;
        let saved = saves(&server).await;
        assert_eq!(saved.len(), 1);

        let body: serde_json::Value = serde_json::from_slice(&saved[0].body).expect("json");
        let bits = body["frames"][0]["bits"].as_str().expect("bits");
        assert_eq!(&bits[8..13], "11111");
        assert_eq!(
            sync.status(),
            SyncStatus::Saved {
                name: "walk".into()
            }
        );
        assert!(!sync.with_editor(Editor::is_dirty));
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn test_clean_edits_do_not_schedule() {
        let server = MockServer::start().await;
        let sync = session(&server, Duration::from_millis(20));

        sync.edit(|e| {
            e.tool = Tool::Line;
            e.pointer_down(Point::new(0, 0));
            e.pointer_move(Point::new(3, 3));
        });
        assert!(!sync.has_pending_save());
        assert_eq!(sync.status(), SyncStatus::Idle);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(saves(&server).await.is_empty());
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn test_failed_save_is_reported_and_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/state"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "ok": false,
                "error": "frame duration out of range"
            })))
            .mount(&server)
            .await;
        let sync = session(&server, Duration::from_millis(30));

        sync.edit(|e| dab(e, 2));
        tokio::time::sleep(Duration::from_millis(300)).await;

        match sync.status() {
            SyncStatus::Failed { name, message } => {
                assert_eq!(name, "walk");
                assert!(message.contains("duration"));
            }
            other => panic!("unexpected status: {other:?}"),
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(saves(&server).await.len(), 1);
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn test_switch_flushes_old_name_first() {
        let server = MockServer::start().await;
        mock_save_ok(&server, "walk").await;
        Mock::given(method("POST"))
            .and(path("/select"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "active": "run" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/state"))
            .and(query_param("name", "run"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "run",
                "w": 2,
                "h": 2,
                "frames": [
                    { "bits": "1000", "durationMs": 80 },
                    { "bits": "0001", "durationMs": 80 }
                ]
            })))
            .mount(&server)
            .await;

        // Long debounce: only the switch can trigger the save.
        let sync = session(&server, Duration::from_secs(30));
        sync.edit(|e| dab(e, 4));
        sync.switch_to("run").await.expect("switch");

        let requests = server.received_requests().await.expect("recording");
        let order: Vec<String> = requests
            .iter()
            .map(|r| format!("{} {}", r.method, r.url.path()))
            .collect();
        assert_eq!(order, vec!["POST /state", "POST /select", "GET /state"]);
        assert_eq!(
            requests[0].url.query_pairs().find(|(k, _)| k == "name"),
            Some(("name".into(), "walk".into()))
        );

        assert_eq!(sync.name(), "run");
        assert_eq!(sync.with_editor(|e| e.document().frame_count()), 2);
        assert!(!sync.has_pending_save());
        assert!(sync.with_editor(|e| e.history().is_empty()));
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn test_timer_for_unloaded_document_is_dropped() {
        let server = MockServer::start().await;
        mock_save_ok(&server, "walk").await;
        mock_save_ok(&server, "other").await;
        let sync = session(&server, Duration::from_millis(100));

        sync.edit(|e| dab(e, 3));
        assert!(sync.has_pending_save());
        sync.edit(|e| e.load(AnimationDocument::new("other", 8, 4)));

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(saves(&server).await.is_empty());
        assert!(!sync.has_pending_save());
        assert_eq!(sync.status(), SyncStatus::Idle);
        assert_eq!(sync.name(), "other");
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn test_dropping_session_sends_pending_save() {
        let server = MockServer::start().await;
        mock_save_ok(&server, "walk").await;
        let sync = session(&server, Duration::from_secs(30));

        sync.edit(|e| dab(e, 6));
        drop(sync);

        tokio::time::sleep(Duration::from_millis(300)).await;
        let saved = saves(&server).await;
        assert_eq!(saved.len(), 1);
        let body: serde_json::Value = serde_json::from_slice(&saved[0].body).expect("json");
        assert_eq!(body["frames"][0]["bits"].as_str().map(|b| &b[14..15]), Some("1"));
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn test_failed_delete_keeps_pending_save() {
        let server = MockServer::start().await;
        mock_save_ok(&server, "walk").await;
        Mock::given(method("POST"))
            .and(path("/delete"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;
        let sync = session(&server, Duration::from_millis(100));

        sync.edit(|e| dab(e, 2));
        let err = sync.delete("walk").await.unwrap_err();
        assert!(matches!(err, SyncError::Rejected { status: 500, .. }));
        assert_eq!(sync.name(), "walk");
        assert!(sync.has_pending_save());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(saves(&server).await.len(), 1);
        assert_eq!(
            sync.status(),
            SyncStatus::Saved {
                name: "walk".into()
            }
        );
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn test_close_saves_without_edits() {
        let server = MockServer::start().await;
        mock_save_ok(&server, "walk").await;
        let sync = session(&server, Duration::from_secs(30));

        let resp = sync.close().await.expect("join").expect("save");
        assert_eq!(resp.map(|r| r.name), Some("walk".to_string()));
        assert_eq!(saves(&server).await.len(), 1);
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn test_delete_working_document_loads_new_active() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/delete"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "ok": true, "active": "default" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/state"))
            .and(query_param("name", "default"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "default",
                "w": 4,
                "h": 2,
                "frames": [{ "bits": "00000000", "durationMs": 100 }]
            })))
            .mount(&server)
            .await;

        let sync = session(&server, Duration::from_secs(30));
        sync.edit(|e| dab(e, 1));
        assert!(sync.has_pending_save());

        let active = sync.delete("walk").await.expect("delete");
        assert_eq!(active, "default");
        assert_eq!(sync.name(), "default");
        assert!(!sync.has_pending_save());
        assert!(saves(&server).await.is_empty());
    }
}
