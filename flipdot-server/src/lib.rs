//! # Flipdot Server Library
//!
//! Shared state, routes and background tasks for the flipdot server.
//! This library is used by both the binary and integration tests.

use std::sync::{Arc, PoisonError, RwLock};

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use flipdot_core::AnimationStore;
use tokio::sync::broadcast;

pub mod config;
pub mod display;
pub mod health;
pub mod metrics;
pub mod persistence;
pub mod routes;
pub mod validation;

pub use config::ServerConfig;
pub use display::{DisplaySink, Scene, TracingSink};

/// Change notification for background tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A document was written.
    Saved(String),
    /// The active animation changed.
    Selected(String),
    /// A document was removed; `active` is the active name afterwards.
    Deleted {
        /// Removed name.
        name: String,
        /// Active name after the delete.
        active: String,
    },
    /// The displayed scene changed.
    SceneChanged(Scene),
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    store: AnimationStore,
    events: broadcast::Sender<StoreEvent>,
    scene: Arc<RwLock<Scene>>,
}

impl AppState {
    /// Wrap a store, starting on the animation scene.
    #[must_use]
    pub fn new(store: AnimationStore) -> Self {
        let (events, _) = broadcast::channel(100);
        Self {
            store,
            events,
            scene: Arc::new(RwLock::new(Scene::default())),
        }
    }

    /// The animation library.
    #[must_use]
    pub fn store(&self) -> &AnimationStore {
        &self.store
    }

    /// Subscribe to store and scene changes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Publish a change.
    pub fn notify(&self, event: StoreEvent) {
        // No receivers is okay
        let _ = self.events.send(event);
    }

    /// The scene currently shown.
    #[must_use]
    pub fn scene(&self) -> Scene {
        *self.scene.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Switch scenes and notify the display task.
    pub fn set_scene(&self, scene: Scene) {
        *self.scene.write().unwrap_or_else(PoisonError::into_inner) = scene;
        self.notify(StoreEvent::SceneChanged(scene));
    }
}

/// Build the API and health routes.
///
/// Tracing, CORS and metrics layers are added by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/health", get(health::readiness))
        .route(
            "/state",
            get(routes::get_state_handler).post(routes::save_state_handler),
        )
        .route("/list", get(routes::list_handler))
        .route("/select", post(routes::select_handler))
        .route("/delete", post(routes::delete_handler))
        .route(
            "/scene",
            get(routes::get_scene_handler).post(routes::set_scene_handler),
        )
        .layer(DefaultBodyLimit::max(validation::MAX_REQUEST_BODY_BYTES))
        .with_state(state)
}
