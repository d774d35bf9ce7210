//! Display output.
//!
//! The physical flipdot transport lives behind [`DisplaySink`]. A background
//! task plays the active animation into the sink, or hands it the current
//! non-animation [`Scene`], and restarts whenever the library or scene
//! changes in a way that affects what is on screen.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use flipdot_core::{AnimationDocument, PixelGrid, PlaybackScheduler};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::{metrics, AppState, StoreEvent};

/// What the display is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scene {
    /// The active animation from the library.
    #[default]
    Animation,
    /// Wall clock.
    Clock,
    /// Mood face.
    Mood,
    /// Score tally.
    Tally,
    /// Ski jump results.
    SkiJump,
    /// Queue board.
    WhosNext,
}

impl Scene {
    /// Wire tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Animation => "animation",
            Self::Clock => "clock",
            Self::Mood => "mood",
            Self::Tally => "tally",
            Self::SkiJump => "ski_jump",
            Self::WhosNext => "whos_next",
        }
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reported by a display driver.
#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    /// Writing to the device failed.
    #[error("display I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The device is not connected.
    #[error("display disconnected: {0}")]
    Disconnected(String),
}

/// Hardware boundary for the flipdot panel.
#[async_trait]
pub trait DisplaySink: Send + Sync + 'static {
    /// Show one frame.
    async fn show(&self, frame: &PixelGrid) -> Result<(), DisplayError>;

    /// Render a non-animation scene. Scene rendering is the driver's concern.
    async fn show_scene(&self, scene: Scene) -> Result<(), DisplayError>;
}

/// Sink that only logs what would be displayed.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl DisplaySink for TracingSink {
    async fn show(&self, frame: &PixelGrid) -> Result<(), DisplayError> {
        tracing::trace!(
            width = frame.width(),
            height = frame.height(),
            lit = frame.lit_count(),
            "Display frame"
        );
        Ok(())
    }

    async fn show_scene(&self, scene: Scene) -> Result<(), DisplayError> {
        tracing::info!(%scene, "Display scene");
        Ok(())
    }
}

enum Wake {
    Restart,
    Closed,
}

/// Drive `sink` from the shared state until the event channel closes.
pub fn spawn_display_task(state: AppState, sink: Arc<dyn DisplaySink>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut events = state.subscribe();
        loop {
            let scene = state.scene();
            let wake = match scene {
                Scene::Animation => play_active(&state, sink.as_ref(), &mut events).await,
                Scene::Clock | Scene::Mood | Scene::Tally | Scene::SkiJump | Scene::WhosNext => {
                    if let Err(e) = sink.show_scene(scene).await {
                        tracing::warn!(%scene, "Failed to show scene: {e}");
                    }
                    wait_for_scene_change(&mut events).await
                }
            };
            if matches!(wake, Wake::Closed) {
                tracing::info!("Display task stopped");
                return;
            }
        }
    })
}

async fn play_active(
    state: &AppState,
    sink: &dyn DisplaySink,
    events: &mut broadcast::Receiver<StoreEvent>,
) -> Wake {
    let doc = Arc::new(state.store().active_document());
    let mut player = PlaybackScheduler::new(doc.clone());
    let mut index_rx = player.subscribe();

    tracing::info!(
        name = doc.name(),
        frames = doc.frame_count(),
        "Playing animation"
    );
    show_frame(sink, &doc, 0).await;
    if doc.frame_count() > 1 {
        player.play();
    }

    loop {
        tokio::select! {
            changed = index_rx.changed() => {
                if changed.is_err() {
                    return Wake::Restart;
                }
                let index = *index_rx.borrow_and_update();
                show_frame(sink, &doc, index).await;
            }
            event = events.recv() => match event {
                Ok(event) if affects_animation(&event, doc.name()) => return Wake::Restart,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Display task lagged, restarting");
                    return Wake::Restart;
                }
                Err(RecvError::Closed) => return Wake::Closed,
            }
        }
    }
}

async fn wait_for_scene_change(events: &mut broadcast::Receiver<StoreEvent>) -> Wake {
    loop {
        match events.recv().await {
            Ok(StoreEvent::SceneChanged(_)) | Err(RecvError::Lagged(_)) => return Wake::Restart,
            Ok(_) => {}
            Err(RecvError::Closed) => return Wake::Closed,
        }
    }
}

fn affects_animation(event: &StoreEvent, playing: &str) -> bool {
    match event {
        StoreEvent::Saved(name) => name == playing,
        StoreEvent::Selected(_) | StoreEvent::Deleted { .. } | StoreEvent::SceneChanged(_) => true,
    }
}

async fn show_frame(sink: &dyn DisplaySink, doc: &AnimationDocument, index: usize) {
    let Some(frame) = doc.frame(index) else {
        return;
    };
    match sink.show(&frame.grid).await {
        Ok(()) => metrics::record_frame_displayed(),
        Err(e) => tracing::warn!(index, "Failed to show frame: {e}"),
    }
}
