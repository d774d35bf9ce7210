//! JSON shapes exchanged between editor, server and storage.

use serde::{Deserialize, Serialize};

use crate::document::validate_duration;
use crate::{
    AnimationDocument, DocumentError, DocumentResult, Frame, PixelGrid, TextOverlayConfig,
    MAX_FRAMES, MIN_TEXT_INTERVAL_MS,
};

/// Largest document a server accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLimits {
    /// Display width in cells.
    pub max_width: usize,
    /// Display height in cells.
    pub max_height: usize,
}

impl Default for GridLimits {
    fn default() -> Self {
        Self {
            max_width: crate::DEFAULT_WIDTH,
            max_height: crate::DEFAULT_HEIGHT,
        }
    }
}

impl GridLimits {
    /// Limits for a `width x height` display.
    #[must_use]
    pub const fn new(max_width: usize, max_height: usize) -> Self {
        Self {
            max_width,
            max_height,
        }
    }

    /// Check document dimensions against the limits.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidDimensions`] for zero or oversized dimensions.
    pub fn check(&self, width: usize, height: usize) -> DocumentResult<()> {
        if width == 0 || height == 0 || width > self.max_width || height > self.max_height {
            return Err(DocumentError::InvalidDimensions {
                width,
                height,
                max_width: self.max_width,
                max_height: self.max_height,
            });
        }
        Ok(())
    }
}

/// One serialized frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireFrame {
    /// Row-major `'1'`/`'0'` pixels.
    pub bits: String,
    /// Display time in milliseconds.
    #[serde(rename = "durationMs")]
    pub duration_ms: u32,
}

impl From<&Frame> for WireFrame {
    fn from(frame: &Frame) -> Self {
        Self {
            bits: frame.grid.to_bits(),
            duration_ms: frame.duration_ms,
        }
    }
}

/// Serialized animation document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireDocument {
    /// Document name, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Width in cells.
    pub w: usize,
    /// Height in cells.
    pub h: usize,
    /// Frames in playback order.
    pub frames: Vec<WireFrame>,
    /// Optional text feed overlay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextOverlayConfig>,
}

impl From<&AnimationDocument> for WireDocument {
    fn from(doc: &AnimationDocument) -> Self {
        Self {
            name: Some(doc.name().to_string()),
            w: doc.width(),
            h: doc.height(),
            frames: doc.frames().iter().map(WireFrame::from).collect(),
            text: doc.text_overlay.clone(),
        }
    }
}

impl WireDocument {
    /// Validate and decode into a document named `name`.
    ///
    /// Bit-strings are decoded defensively (padded or truncated); every other
    /// field must be in range.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentError`] describing the first invalid field.
    pub fn into_document(
        self,
        name: impl Into<String>,
        limits: &GridLimits,
    ) -> DocumentResult<AnimationDocument> {
        limits.check(self.w, self.h)?;
        if self.frames.is_empty() {
            return Err(DocumentError::NoFrames);
        }
        if self.frames.len() > MAX_FRAMES {
            return Err(DocumentError::TooManyFrames(self.frames.len()));
        }
        if let Some(text) = &self.text {
            if text.interval_ms < MIN_TEXT_INTERVAL_MS {
                return Err(DocumentError::InvalidTextInterval(text.interval_ms));
            }
        }

        let (w, h) = (self.w, self.h);
        let frames = self
            .frames
            .into_iter()
            .map(|f| {
                validate_duration(f.duration_ms)?;
                Ok(Frame {
                    duration_ms: f.duration_ms,
                    grid: PixelGrid::from_bits(w, h, &f.bits),
                })
            })
            .collect::<DocumentResult<Vec<_>>>()?;

        let mut doc = AnimationDocument::from_frames(name, w, h, frames)?;
        doc.text_overlay = self.text;
        Ok(doc)
    }
}

/// Response to `GET /list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResponse {
    /// All stored names.
    pub items: Vec<String>,
    /// The active name.
    pub active: String,
}

/// Response to `POST /state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResponse {
    /// Always `true` on success.
    pub ok: bool,
    /// The name that was written.
    pub name: String,
}

/// Response to `POST /select` and `POST /delete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveResponse {
    /// Always `true` on success.
    pub ok: bool,
    /// The active name after the operation.
    pub active: String,
}

/// Body of `POST /select` and `POST /delete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRequest {
    /// Target animation name.
    #[serde(default)]
    pub name: String,
}

/// Body of every rejected request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `false`.
    pub ok: bool,
    /// Human-readable reason.
    pub error: String,
}
