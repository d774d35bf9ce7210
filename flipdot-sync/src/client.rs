//! HTTP client for the flipdot server's library endpoints.

use std::sync::Arc;
use std::time::Duration;

use flipdot_core::{
    ActiveResponse, AnimationDocument, ErrorResponse, GridLimits, ListResponse, NameRequest,
    SaveResponse, WireDocument,
};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::{SyncError, SyncResult};
use crate::DEFAULT_REQUEST_TIMEOUT;

/// Asynchronous client for one flipdot server.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct StoreClient {
    inner: Arc<InnerClient>,
}

struct InnerClient {
    http: Client,
    base: Url,
}

impl std::fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreClient")
            .field("base", &self.inner.base.as_str())
            .finish_non_exhaustive()
    }
}

impl StoreClient {
    /// Create a client with the default request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidUrl`] if the URL is malformed.
    pub fn new(base_url: impl AsRef<str>) -> SyncResult<Self> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidUrl`] if the URL is malformed or cannot
    /// carry a path. Returns [`SyncError::Http`] if the HTTP client fails to
    /// build.
    pub fn with_timeout(base_url: impl AsRef<str>, timeout: Duration) -> SyncResult<Self> {
        let mut base =
            Url::parse(base_url.as_ref()).map_err(|e| SyncError::InvalidUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(SyncError::InvalidUrl(format!(
                "{base} cannot be used as a base URL"
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = Client::builder()
            .user_agent(concat!("flipdot-sync/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(InnerClient { http, base }),
        })
    }

    /// Server base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base
    }

    /// Fetch a document in wire form. `None` fetches the active animation.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncError`] if the request fails or the server rejects it.
    pub async fn fetch(&self, name: Option<&str>) -> SyncResult<WireDocument> {
        let mut url = self.endpoint("state")?;
        if let Some(name) = name {
            url.query_pairs_mut().append_pair("name", name);
        }
        debug!(%url, "fetching animation");
        let response = self.inner.http.get(url).send().await?;
        decode(response).await
    }

    /// Fetch and decode a document.
    ///
    /// The server's limits are not known here, so the document's own
    /// dimensions are taken as the bound; frame and duration checks still
    /// apply.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Document`] if the payload does not validate.
    pub async fn fetch_document(&self, name: Option<&str>) -> SyncResult<AnimationDocument> {
        let wire = self.fetch(name).await?;
        let resolved = wire
            .name
            .clone()
            .or_else(|| name.map(str::to_string))
            .unwrap_or_default();
        let limits = GridLimits::new(wire.w, wire.h);
        Ok(wire.into_document(resolved, &limits)?)
    }

    /// Save a whole document under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Rejected`] if the server refuses the document.
    pub async fn save(&self, name: &str, document: &WireDocument) -> SyncResult<SaveResponse> {
        let mut url = self.endpoint("state")?;
        url.query_pairs_mut().append_pair("name", name);
        debug!(name, frames = document.frames.len(), "saving animation");
        let response = self.inner.http.post(url).json(document).send().await?;
        decode(response).await
    }

    /// List stored names and the active one.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncError`] if the request fails.
    pub async fn list(&self) -> SyncResult<ListResponse> {
        let url = self.endpoint("list")?;
        let response = self.inner.http.get(url).send().await?;
        decode(response).await
    }

    /// Make `name` active, creating it on the server if needed.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncError`] if the request fails or the name is refused.
    pub async fn select(&self, name: &str) -> SyncResult<ActiveResponse> {
        self.post_name("select", name).await
    }

    /// Delete `name`. The response carries the new active name.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Rejected`] if `name` does not exist.
    pub async fn delete(&self, name: &str) -> SyncResult<ActiveResponse> {
        self.post_name("delete", name).await
    }

    async fn post_name(&self, endpoint: &str, name: &str) -> SyncResult<ActiveResponse> {
        let url = self.endpoint(endpoint)?;
        let body = NameRequest {
            name: name.to_string(),
        };
        let response = self.inner.http.post(url).json(&body).send().await?;
        decode(response).await
    }

    fn endpoint(&self, path: &str) -> SyncResult<Url> {
        self.inner
            .base
            .join(path)
            .map_err(|e| SyncError::InvalidUrl(e.to_string()))
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> SyncResult<T> {
    let status = response.status();
    let body = response.bytes().await?;
    if status.is_success() {
        return Ok(serde_json::from_slice(&body)?);
    }
    let message = serde_json::from_slice::<ErrorResponse>(&body).map_or_else(
        |_| String::from_utf8_lossy(&body).into_owned(),
        |e| e.error,
    );
    Err(SyncError::Rejected {
        status: status.as_u16(),
        message,
    })
}
