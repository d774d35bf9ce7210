//! End-to-end tests of the sync session against an in-process server.

use std::net::SocketAddr;
use std::time::Duration;

use flipdot_core::{AnimationStore, GridLimits, Point, Tool};
use flipdot_server::AppState;
use flipdot_sync::{SyncClient, SyncConfig, SyncStatus};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

struct Server {
    url: String,
    state: AppState,
    shutdown_tx: oneshot::Sender<()>,
}

async fn start_server() -> Server {
    let port = portpicker::pick_unused_port().expect("no available port");
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let state = AppState::new(AnimationStore::new(GridLimits::default()));
    let app = flipdot_server::router(state.clone());

    let listener = TcpListener::bind(addr).await.expect("failed to bind");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .expect("server error");
    });

    Server {
        url: format!("http://{addr}"),
        state,
        shutdown_tx,
    }
}

#[tokio::test]
async fn test_debounced_save_reaches_store() {
    let server = start_server().await;
    let config = SyncConfig::new(&server.url).with_debounce(Duration::from_millis(50));
    let sync = SyncClient::connect(&config).await.expect("connect");
    assert_eq!(sync.name(), "default");

    sync.edit(|e| {
        e.tool = Tool::Rect;
        e.pointer_down(Point::new(0, 0));
        e.pointer_move(Point::new(3, 2));
        e.pointer_up(Point::new(3, 2));
    });

    let mut status = sync.subscribe();
    tokio::time::timeout(
        Duration::from_secs(5),
        status.wait_for(|s| matches!(s, SyncStatus::Saved { .. })),
    )
    .await
    .expect("save in time")
    .expect("status channel open");

    let stored = server
        .state
        .store()
        .document("default")
        .expect("stored document");
    let grid = &stored.frames()[0].grid;
    assert!(grid.get(0, 0));
    assert!(grid.get(3, 2));
    assert!(!grid.get(1, 1));

    let _ = server.shutdown_tx.send(());
}

#[tokio::test]
async fn test_switch_and_delete_round_trip() {
    let server = start_server().await;
    let config = SyncConfig::new(&server.url).with_debounce(Duration::from_secs(30));
    let sync = SyncClient::connect(&config).await.expect("connect");

    sync.edit(|e| {
        e.pointer_down(Point::new(5, 5));
        e.pointer_up(Point::new(5, 5));
    });
    sync.switch_to("walk").await.expect("switch");

    // The pending edit landed on the old name before the switch.
    let default = server.state.store().document("default").expect("default");
    assert!(default.frames()[0].grid.get(5, 5));

    let list = sync.list().await.expect("list");
    assert_eq!(list.items, vec!["default", "walk"]);
    assert_eq!(list.active, "walk");
    assert_eq!(sync.name(), "walk");

    let active = sync.delete("walk").await.expect("delete");
    assert_eq!(active, "default");
    assert_eq!(sync.name(), "default");
    assert!(sync.with_editor(|e| e.document().frames()[0].grid.get(5, 5)));

    let _ = server.shutdown_tx.send(());
}

#[tokio::test]
async fn test_rejected_switch_keeps_document() {
    let server = start_server().await;
    let sync = SyncClient::connect(&SyncConfig::new(&server.url))
        .await
        .expect("connect");

    let err = sync.switch_to("../etc").await.unwrap_err();
    assert!(matches!(
        err,
        flipdot_sync::SyncError::Rejected { status: 400, .. }
    ));
    assert_eq!(sync.name(), "default");

    let _ = server.shutdown_tx.send(());
}
