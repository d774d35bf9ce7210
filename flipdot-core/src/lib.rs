//! # Flipdot Core
//!
//! Pixel animation model and drawing engine for monochrome flipdot displays.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 flipdot-core                │
//! ├─────────────────────────────────────────────┤
//! │  Raster          │  Editor                  │
//! │  - PixelGrid     │  - Tools & gestures      │
//! │  - Brush/shapes  │  - Undo/redo history     │
//! │  - Fill/effects  │  - Frame operations      │
//! ├─────────────────────────────────────────────┤
//! │  Playback        │  Library                 │
//! │  - Timeline      │  - Wire format           │
//! │  - Scheduler     │  - AnimationStore        │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod document;
pub mod editor;
pub mod error;
pub mod grid;
pub mod history;
pub mod playback;
pub mod raster;
pub mod store;
pub mod wire;

pub use document::{AnimationDocument, Frame, OnionSkin, TextOverlayConfig};
pub use editor::{Editor, Tool};
pub use error::{DocumentError, DocumentResult};
pub use grid::PixelGrid;
pub use history::HistoryStack;
pub use playback::{FrameTimeline, PlaybackScheduler};
pub use raster::{Brush, BrushShape, GridTransform, Mirror, Point, ShapeTool};
pub use store::{AnimationStore, StoreError, DEFAULT_ANIMATION};
pub use wire::{
    ActiveResponse, ErrorResponse, GridLimits, ListResponse, NameRequest, SaveResponse,
    WireDocument, WireFrame,
};

/// Shortest frame duration accepted, in milliseconds.
pub const MIN_FRAME_DURATION_MS: u32 = 10;

/// Longest frame duration accepted, in milliseconds.
pub const MAX_FRAME_DURATION_MS: u32 = 60_000;

/// Duration given to new frames, in milliseconds.
pub const DEFAULT_FRAME_DURATION_MS: u32 = 100;

/// Most frames a document may hold.
pub const MAX_FRAMES: usize = 1000;

/// Shortest text overlay poll interval, in milliseconds.
pub const MIN_TEXT_INTERVAL_MS: u32 = 1000;

/// Display width in cells.
pub const DEFAULT_WIDTH: usize = 84;

/// Display height in cells.
pub const DEFAULT_HEIGHT: usize = 28;

/// Flipdot core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
