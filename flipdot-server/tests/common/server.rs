//! Test server harness for integration tests.
//!
//! Spins up the real router on a random port so tests can drive it with an
//! HTTP client.

use std::net::SocketAddr;
use std::path::Path;

use flipdot_core::{AnimationStore, GridLimits};
use flipdot_server::AppState;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};

/// A test server instance with control handles.
pub struct TestServer {
    addr: SocketAddr,
    state: AppState,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server with an in-memory store on a random available port.
    ///
    /// # Panics
    ///
    /// Panics if no port is available or server fails to bind.
    #[allow(dead_code)]
    pub async fn start() -> Self {
        Self::with_store(AnimationStore::new(GridLimits::default())).await
    }

    /// Start a server backed by a library file.
    #[allow(dead_code)]
    pub async fn with_data_file(path: &Path) -> Self {
        Self::with_store(AnimationStore::open(path, GridLimits::default())).await
    }

    /// Start a server over an existing store.
    pub async fn with_store(store: AnimationStore) -> Self {
        let port = portpicker::pick_unused_port().expect("no available port");
        let addr = SocketAddr::from(([127, 0, 0, 1], port));

        let state = AppState::new(store);
        let app = flipdot_server::router(state.clone())
            .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any));

        let listener = TcpListener::bind(addr).await.expect("failed to bind");
        let actual_addr = listener.local_addr().expect("failed to get local addr");

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("server error");
        });

        // Give the server a moment to start
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

        Self {
            addr: actual_addr,
            state,
            shutdown_tx: Some(shutdown_tx),
            handle,
        }
    }

    /// Get the server's socket address.
    #[allow(dead_code)]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL, e.g. `http://127.0.0.1:1234`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Shared state (for test assertions).
    #[allow(dead_code)]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Gracefully shut down the server.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = tokio::time::timeout(tokio::time::Duration::from_secs(5), self.handle).await;
    }
}
