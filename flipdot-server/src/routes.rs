//! API route handlers.
//!
//! Every rejected request answers 400 with `{ "ok": false, "error": ... }`
//! and leaves the store untouched.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use flipdot_core::{
    ActiveResponse, ErrorResponse, ListResponse, NameRequest, SaveResponse, StoreError,
    WireDocument,
};
use serde::{Deserialize, Serialize};

use crate::validation::{self, ValidationError};
use crate::{metrics, AppState, Scene, StoreEvent};

/// Errors returned by API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Untrusted input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The store refused the operation.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The body was not the expected JSON.
    #[error("invalid request body: {0}")]
    Body(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Body(rejection.body_text())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Store(StoreError::Io(_) | StoreError::Serialization(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.kind(),
            Self::Store(StoreError::Document(_)) => "document",
            Self::Store(_) => "store",
            Self::Body(_) => "body",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::BAD_REQUEST {
            metrics::record_validation_failure(self.kind());
        }
        tracing::debug!(status = status.as_u16(), "Request rejected: {self}");
        let body = ErrorResponse {
            ok: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Query string of `/state`.
#[derive(Debug, Default, Deserialize)]
pub struct NameQuery {
    /// Target animation; absent or empty means the active one.
    pub name: Option<String>,
}

impl NameQuery {
    fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }
}

/// Body and response of `/scene`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SceneBody {
    /// Scene tag.
    pub scene: Scene,
}

/// `GET /state?name=X` - a stored document, or the active one.
#[tracing::instrument(name = "get_state", skip(state))]
pub async fn get_state_handler(
    State(state): State<AppState>,
    Query(query): Query<NameQuery>,
) -> Result<Json<WireDocument>, ApiError> {
    if let Some(name) = query.name() {
        validation::validate_animation_name(name)?;
    }
    metrics::record_store_operation("get", true);
    Ok(Json(state.store().get(query.name())))
}

/// `POST /state?name=X` - create or overwrite a document.
#[tracing::instrument(name = "save_state", skip(state, body))]
pub async fn save_state_handler(
    State(state): State<AppState>,
    Query(query): Query<NameQuery>,
    body: Result<Json<WireDocument>, JsonRejection>,
) -> Result<Json<SaveResponse>, ApiError> {
    let Json(doc) = body?;
    let store = state.store();
    let name = validation::resolve_save_target(query.name(), &doc, &store.active())?;

    let result = store.save(&name, doc);
    metrics::record_store_operation("save", result.is_ok());
    result?;
    metrics::set_animations_stored(store.len());

    tracing::info!(name = %name, "Animation saved");
    state.notify(StoreEvent::Saved(name.clone()));
    Ok(Json(SaveResponse { ok: true, name }))
}

/// `GET /list` - all names and the active one.
#[tracing::instrument(name = "list", skip(state))]
pub async fn list_handler(State(state): State<AppState>) -> Json<ListResponse> {
    metrics::record_store_operation("list", true);
    Json(state.store().list())
}

/// `POST /select {name}` - activate, creating a blank document if unknown.
#[tracing::instrument(name = "select", skip(state, body))]
pub async fn select_handler(
    State(state): State<AppState>,
    body: Result<Json<NameRequest>, JsonRejection>,
) -> Result<Json<ActiveResponse>, ApiError> {
    let Json(NameRequest { name }) = body?;
    validation::validate_animation_name(&name)?;

    let store = state.store();
    if store.select(&name) {
        tracing::info!(name = %name, "Created animation on select");
        metrics::set_animations_stored(store.len());
    }
    metrics::record_store_operation("select", true);
    state.notify(StoreEvent::Selected(name.clone()));
    Ok(Json(ActiveResponse {
        ok: true,
        active: name,
    }))
}

/// `POST /delete {name}` - remove a document.
#[tracing::instrument(name = "delete", skip(state, body))]
pub async fn delete_handler(
    State(state): State<AppState>,
    body: Result<Json<NameRequest>, JsonRejection>,
) -> Result<Json<ActiveResponse>, ApiError> {
    let Json(NameRequest { name }) = body?;
    validation::validate_animation_name(&name)?;

    let store = state.store();
    let result = store.delete(&name);
    metrics::record_store_operation("delete", result.is_ok());
    let active = result?;
    metrics::set_animations_stored(store.len());

    tracing::info!(name = %name, active = %active, "Animation deleted");
    state.notify(StoreEvent::Deleted {
        name,
        active: active.clone(),
    });
    Ok(Json(ActiveResponse { ok: true, active }))
}

/// `GET /scene` - the scene on the display.
pub async fn get_scene_handler(State(state): State<AppState>) -> Json<SceneBody> {
    Json(SceneBody {
        scene: state.scene(),
    })
}

/// `POST /scene {scene}` - switch scenes.
#[tracing::instrument(name = "set_scene", skip(state, body))]
pub async fn set_scene_handler(
    State(state): State<AppState>,
    body: Result<Json<SceneBody>, JsonRejection>,
) -> Result<Json<SceneBody>, ApiError> {
    let Json(SceneBody { scene }) = body?;
    tracing::info!(%scene, "Scene selected");
    state.set_scene(scene);
    Ok(Json(SceneBody { scene }))
}
