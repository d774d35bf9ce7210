//! # Flipdot Sync
//!
//! Editor-side half of the flipdot library protocol.
//!
//! - [`StoreClient`] speaks the server's HTTP endpoints
//!   (`/state`, `/list`, `/select`, `/delete`).
//! - [`SyncClient`] owns the working document, applies edits immediately and
//!   saves the whole document after a quiet period.
//!
//! Failures are returned as [`SyncError`] and reported on a status channel.
//! Nothing is retried; the next edit triggers the next save.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::time::Duration;

pub mod client;
pub mod error;
pub mod session;

pub use client::StoreClient;
pub use error::{SyncError, SyncResult};
pub use session::{SyncClient, SyncStatus};

/// Quiet period before an edit is saved.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Server base URL, e.g. `http://127.0.0.1:9474`.
    pub base_url: String,
    /// Quiet period before saving.
    pub debounce: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl SyncConfig {
    /// Default timings against `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            debounce: DEFAULT_DEBOUNCE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Override the debounce period.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}
