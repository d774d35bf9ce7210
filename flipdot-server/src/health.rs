//! Health endpoints for the display host's supervisor and the editor.
//!
//! - `/health/live` - the process answers requests
//! - `/health/ready` - the library is loaded and the active animation exists
//! - `/health` - alias of `/health/ready`

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

/// Health status response.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// Overall status: "healthy" or "unhealthy"
    pub status: &'static str,
    /// Server version
    pub version: &'static str,
    /// Individual component checks
    pub checks: HealthChecks,
}

/// Individual health checks.
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    /// Store accessible and its active name resolves
    pub animation_store: bool,
    /// Changes waiting for the next flush (informational)
    pub unsaved_changes: bool,
}

/// Liveness - is the server running?
///
/// Returns 200 OK if the process is alive.
#[tracing::instrument(name = "liveness")]
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Readiness - is the library loaded with its active animation present?
#[tracing::instrument(name = "readiness", skip(state))]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let store = state.store();
    // Exercises the lock and the active-name invariant
    let store_ok = store.contains(&store.active());

    let status = HealthStatus {
        status: if store_ok { "healthy" } else { "unhealthy" },
        version: env!("CARGO_PKG_VERSION"),
        checks: HealthChecks {
            animation_store: store_ok,
            unsaved_changes: store.is_dirty(),
        },
    };

    let code = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (code, Json(status))
}
