//! Frame-sequencing playback.
//!
//! Playback is a self-rescheduling chain: each step sleeps for the current
//! frame's own duration, then advances to the next frame and re-reads the
//! frame list. Timing error therefore stays within a frame instead of
//! accumulating against a fixed-rate clock, and edits to durations or frame
//! count made during playback take effect on the next step.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{AnimationDocument, Frame, DEFAULT_FRAME_DURATION_MS};

/// Read access to the frame sequence being played.
pub trait FrameTimeline: Send + Sync + 'static {
    /// Number of frames.
    fn frame_count(&self) -> usize;
    /// Display duration of the frame at `index`.
    fn duration_ms(&self, index: usize) -> Option<u32>;
}

impl FrameTimeline for AnimationDocument {
    fn frame_count(&self) -> usize {
        AnimationDocument::frame_count(self)
    }

    fn duration_ms(&self, index: usize) -> Option<u32> {
        self.frame(index).map(|f| f.duration_ms)
    }
}

impl FrameTimeline for Vec<Frame> {
    fn frame_count(&self) -> usize {
        self.len()
    }

    fn duration_ms(&self, index: usize) -> Option<u32> {
        self.get(index).map(|f| f.duration_ms)
    }
}

impl<T: FrameTimeline> FrameTimeline for RwLock<T> {
    fn frame_count(&self) -> usize {
        self.read()
            .unwrap_or_else(PoisonError::into_inner)
            .frame_count()
    }

    fn duration_ms(&self, index: usize) -> Option<u32> {
        self.read()
            .unwrap_or_else(PoisonError::into_inner)
            .duration_ms(index)
    }
}

/// Loops over a [`FrameTimeline`] on the tokio runtime.
///
/// Index changes are published on a watch channel; subscribe to drive a
/// preview or the display hardware.
pub struct PlaybackScheduler {
    timeline: Arc<dyn FrameTimeline>,
    index: Arc<AtomicUsize>,
    index_tx: watch::Sender<usize>,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for PlaybackScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackScheduler")
            .field("index", &self.index())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl PlaybackScheduler {
    /// A stopped scheduler positioned at frame 0.
    #[must_use]
    pub fn new(timeline: Arc<dyn FrameTimeline>) -> Self {
        let (index_tx, _) = watch::channel(0);
        Self {
            timeline,
            index: Arc::new(AtomicUsize::new(0)),
            index_tx,
            task: None,
        }
    }

    /// Receive every frame index change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.index_tx.subscribe()
    }

    /// Current frame index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index.load(Ordering::Acquire)
    }

    /// Whether a step is scheduled.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Start looping from the current index. No-op if already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn play(&mut self) {
        if self.task.is_some() {
            return;
        }
        let timeline = Arc::clone(&self.timeline);
        let index = Arc::clone(&self.index);
        let index_tx = self.index_tx.clone();
        tracing::debug!(start = self.index(), "Playback started");
        self.task = Some(tokio::spawn(run(timeline, index, index_tx)));
    }

    /// Cancel the pending step. The index stays where it is.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!(index = self.index(), "Playback stopped");
        }
    }

    /// Jump to a frame, clamped to the sequence.
    ///
    /// While running, the pending step is cancelled and the target frame gets
    /// its full duration.
    pub fn seek(&mut self, index: usize) {
        let running = self.task.is_some();
        self.stop();
        let last = self.timeline.frame_count().saturating_sub(1);
        let index = index.min(last);
        self.index.store(index, Ordering::Release);
        self.index_tx.send_replace(index);
        if running {
            self.play();
        }
    }
}

impl Drop for PlaybackScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(
    timeline: Arc<dyn FrameTimeline>,
    index: Arc<AtomicUsize>,
    index_tx: watch::Sender<usize>,
) {
    loop {
        let len = timeline.frame_count();
        if len == 0 {
            return;
        }
        let current = index.load(Ordering::Acquire).min(len - 1);
        let duration = timeline
            .duration_ms(current)
            .unwrap_or(DEFAULT_FRAME_DURATION_MS);
        tokio::time::sleep(Duration::from_millis(u64::from(duration))).await;

        let len = timeline.frame_count();
        if len == 0 {
            return;
        }
        let next = (current + 1) % len;
        index.store(next, Ordering::Release);
        index_tx.send_replace(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PixelGrid;

    fn frames(durations: &[u32]) -> Vec<Frame> {
        durations
            .iter()
            .map(|&duration_ms| Frame {
                duration_ms,
                grid: PixelGrid::new(1, 1),
            })
            .collect()
    }

    async fn wait(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_full_cycle_returns_to_start() {
        let mut player = PlaybackScheduler::new(Arc::new(frames(&[100, 200, 300])));
        player.play();

        wait(150).await;
        assert_eq!(player.index(), 1);
        wait(200).await;
        assert_eq!(player.index(), 2);
        wait(300).await;
        assert_eq!(player.index(), 0);

        player.stop();
        assert!(!player.is_running());
        wait(1000).await;
        assert_eq!(player.index(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_keeps_index() {
        let mut player = PlaybackScheduler::new(Arc::new(frames(&[50, 50, 50, 50])));
        player.play();
        wait(120).await;
        player.stop();
        assert_eq!(player.index(), 2);
        wait(500).await;
        assert_eq!(player.index(), 2);

        player.play();
        wait(60).await;
        assert_eq!(player.index(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_is_idempotent() {
        let mut player = PlaybackScheduler::new(Arc::new(frames(&[100, 100])));
        player.play();
        player.play();
        wait(150).await;
        assert_eq!(player.index(), 1);
        wait(100).await;
        assert_eq!(player.index(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_advances() {
        let mut player = PlaybackScheduler::new(Arc::new(frames(&[10, 10])));
        let mut rx = player.subscribe();
        player.play();
        rx.changed().await.expect("sender alive");
        assert_eq!(*rx.borrow(), 1);
        rx.changed().await.expect("sender alive");
        assert_eq!(*rx.borrow(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shrinking_timeline_wraps() {
        let doc = Arc::new(RwLock::new(frames(&[100, 100, 100])));
        let mut player = PlaybackScheduler::new(doc.clone());
        player.seek(2);
        player.play();
        doc.write().expect("lock").truncate(1);
        wait(150).await;
        assert_eq!(player.index(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_seek_while_playing_jumps() {
        let mut player = PlaybackScheduler::new(Arc::new(frames(&[100; 6])));
        player.play();
        wait(50).await;

        player.seek(4);
        assert_eq!(player.index(), 4);
        assert!(player.is_running());

        // The old pending step must not overwrite the jump.
        wait(60).await;
        assert_eq!(player.index(), 4);
        wait(50).await;
        assert_eq!(player.index(), 5);
    }

    #[test]
    fn test_seek_clamps() {
        let mut player = PlaybackScheduler::new(Arc::new(frames(&[10, 10])));
        player.seek(9);
        assert_eq!(player.index(), 1);
    }
}
