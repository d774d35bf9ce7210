//! Error types for animation operations.

use thiserror::Error;

/// Result type for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Errors that can occur while editing or validating an animation document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// Removing the frame would leave the document without frames.
    #[error("An animation needs at least one frame")]
    LastFrame,

    /// A frame index outside the frame list.
    #[error("Frame index {index} out of range (frame count {len})")]
    FrameOutOfRange {
        /// The requested index.
        index: usize,
        /// The number of frames in the document.
        len: usize,
    },

    /// A frame duration below the playback minimum or above the maximum.
    #[error("Frame duration {0}ms out of range ({min}..={max}ms)", min = crate::MIN_FRAME_DURATION_MS, max = crate::MAX_FRAME_DURATION_MS)]
    InvalidDuration(u32),

    /// Document dimensions are zero or exceed the configured grid.
    #[error("Invalid dimensions {width}x{height} (max {max_width}x{max_height})")]
    InvalidDimensions {
        /// Requested width.
        width: usize,
        /// Requested height.
        height: usize,
        /// Maximum width.
        max_width: usize,
        /// Maximum height.
        max_height: usize,
    },

    /// A document arrived with no frames.
    #[error("Animation has no frames")]
    NoFrames,

    /// Too many frames in a single document.
    #[error("Too many frames: {0} (max {max})", max = crate::MAX_FRAMES)]
    TooManyFrames(usize),

    /// Text overlay refresh interval below the minimum.
    #[error("Text overlay interval {0}ms below minimum {min}ms", min = crate::MIN_TEXT_INTERVAL_MS)]
    InvalidTextInterval(u32),
}
