//! Animation documents: an ordered list of timed frames.

use serde::{Deserialize, Serialize};

use crate::{DocumentError, DocumentResult, PixelGrid};

/// One still image and how long it stays on screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Display time in milliseconds before playback advances.
    pub duration_ms: u32,
    /// The frame's pixels.
    pub grid: PixelGrid,
}

impl Frame {
    /// A blank frame.
    #[must_use]
    pub fn blank(width: usize, height: usize, duration_ms: u32) -> Self {
        Self {
            duration_ms,
            grid: PixelGrid::new(width, height),
        }
    }
}

/// External text feed composited over the animation by the renderer.
///
/// Stored and round-tripped only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextOverlayConfig {
    /// Whether the overlay is shown.
    pub enable: bool,
    /// JSON endpoint to poll.
    pub url: String,
    /// Dotted path into the JSON response.
    pub field: String,
    /// Poll interval, at least one second.
    pub interval_ms: u32,
}

/// Ghosted neighbors of a frame, for drawing reference only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnionSkin {
    /// OR of the preceding frames.
    pub previous: PixelGrid,
    /// OR of the following frames.
    pub next: PixelGrid,
}

/// A named animation.
///
/// Always holds at least one frame, and every frame matches the document
/// dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationDocument {
    name: String,
    width: usize,
    height: usize,
    frames: Vec<Frame>,
    /// Optional text feed overlay.
    pub text_overlay: Option<TextOverlayConfig>,
    cursor: usize,
}

impl AnimationDocument {
    /// A document with one blank frame of the default duration.
    #[must_use]
    pub fn new(name: impl Into<String>, width: usize, height: usize) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            frames: vec![Frame::blank(width, height, crate::DEFAULT_FRAME_DURATION_MS)],
            text_overlay: None,
            cursor: 0,
        }
    }

    /// Build from existing frames.
    ///
    /// Frames of a different size are cropped or padded to fit.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::NoFrames`] if `frames` is empty.
    pub fn from_frames(
        name: impl Into<String>,
        width: usize,
        height: usize,
        frames: Vec<Frame>,
    ) -> DocumentResult<Self> {
        if frames.is_empty() {
            return Err(DocumentError::NoFrames);
        }
        let frames = frames
            .into_iter()
            .map(|f| fit_frame(f, width, height))
            .collect();
        Ok(Self {
            name: name.into(),
            width,
            height,
            frames,
            text_overlay: None,
            cursor: 0,
        })
    }

    /// Document name (the store key).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the document.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Width in cells.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in cells.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// All frames in playback order.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Number of frames (always at least one).
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Frame at `index`.
    #[must_use]
    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    /// Mutable frame at `index`.
    pub fn frame_mut(&mut self, index: usize) -> Option<&mut Frame> {
        self.frames.get_mut(index)
    }

    /// Index of the frame being edited.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the editing cursor, clamped to the frame list.
    pub fn set_cursor(&mut self, index: usize) {
        self.cursor = index.min(self.frames.len() - 1);
    }

    /// The frame under the cursor.
    #[must_use]
    pub fn current_frame(&self) -> &Frame {
        &self.frames[self.cursor]
    }

    /// Mutable frame under the cursor.
    pub fn current_frame_mut(&mut self) -> &mut Frame {
        &mut self.frames[self.cursor]
    }

    /// Sum of all frame durations.
    #[must_use]
    pub fn total_duration_ms(&self) -> u64 {
        self.frames.iter().map(|f| u64::from(f.duration_ms)).sum()
    }

    fn check_index(&self, index: usize) -> DocumentResult<()> {
        if index < self.frames.len() {
            Ok(())
        } else {
            Err(DocumentError::FrameOutOfRange {
                index,
                len: self.frames.len(),
            })
        }
    }

    /// Insert a blank frame after `after`, inheriting its duration.
    ///
    /// The cursor moves to the new frame, whose index is returned.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::FrameOutOfRange`] for an invalid index.
    pub fn add_frame(&mut self, after: usize) -> DocumentResult<usize> {
        self.check_index(after)?;
        let duration = self.frames[after].duration_ms;
        let at = after + 1;
        self.frames
            .insert(at, Frame::blank(self.width, self.height, duration));
        self.cursor = at;
        tracing::debug!(index = at, "Added frame");
        Ok(at)
    }

    /// Insert a deep copy of `frames[index]` right after it.
    ///
    /// The cursor moves to the copy, whose index is returned.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::FrameOutOfRange`] for an invalid index.
    pub fn duplicate_frame(&mut self, index: usize) -> DocumentResult<usize> {
        self.check_index(index)?;
        let copy = self.frames[index].clone();
        self.frames.insert(index + 1, copy);
        self.cursor = index + 1;
        Ok(index + 1)
    }

    /// Remove the frame at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::LastFrame`] when only one frame remains, or
    /// [`DocumentError::FrameOutOfRange`] for an invalid index.
    pub fn remove_frame(&mut self, index: usize) -> DocumentResult<Frame> {
        if self.frames.len() == 1 {
            return Err(DocumentError::LastFrame);
        }
        self.check_index(index)?;
        let removed = self.frames.remove(index);
        self.cursor = index.min(self.frames.len() - 1);
        tracing::debug!(index, remaining = self.frames.len(), "Removed frame");
        Ok(removed)
    }

    /// Move a frame to a new position. The cursor follows the moved frame.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::FrameOutOfRange`] if either index is invalid.
    pub fn move_frame(&mut self, from: usize, to: usize) -> DocumentResult<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        let frame = self.frames.remove(from);
        self.frames.insert(to, frame);
        self.cursor = to;
        Ok(())
    }

    /// Reverse frame order. The cursor keeps pointing at the same frame.
    pub fn reverse_all(&mut self) {
        self.frames.reverse();
        self.cursor = self.frames.len() - 1 - self.cursor;
    }

    /// Double every frame in place: `[a, b]` becomes `[a, a, b, b]`.
    pub fn duplicate_all(&mut self) {
        let frames = std::mem::take(&mut self.frames);
        self.frames = frames.into_iter().flat_map(|f| [f.clone(), f]).collect();
        self.cursor *= 2;
    }

    /// Set one frame's duration.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidDuration`] or
    /// [`DocumentError::FrameOutOfRange`].
    pub fn set_duration(&mut self, index: usize, duration_ms: u32) -> DocumentResult<()> {
        validate_duration(duration_ms)?;
        self.check_index(index)?;
        self.frames[index].duration_ms = duration_ms;
        Ok(())
    }

    /// Set every frame's duration.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidDuration`].
    pub fn set_all_durations(&mut self, duration_ms: u32) -> DocumentResult<()> {
        validate_duration(duration_ms)?;
        for frame in &mut self.frames {
            frame.duration_ms = duration_ms;
        }
        Ok(())
    }

    /// Turn every cell of one frame off.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::FrameOutOfRange`] for an invalid index.
    pub fn clear_frame(&mut self, index: usize) -> DocumentResult<()> {
        self.check_index(index)?;
        self.frames[index].grid.clear();
        Ok(())
    }

    /// Replace the whole frame list, keeping the cursor in range.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::NoFrames`] if `frames` is empty.
    pub fn replace_frames(&mut self, frames: Vec<Frame>) -> DocumentResult<()> {
        if frames.is_empty() {
            return Err(DocumentError::NoFrames);
        }
        let (w, h) = (self.width, self.height);
        self.frames = frames.into_iter().map(|f| fit_frame(f, w, h)).collect();
        self.cursor = self.cursor.min(self.frames.len() - 1);
        Ok(())
    }

    /// Crop or pad every frame to new dimensions, anchored top-left.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        for frame in &mut self.frames {
            frame.grid = frame.grid.resized(width, height);
        }
    }

    /// OR of up to `prev` frames before and `next` frames after `index`.
    ///
    /// Neighbors do not wrap around the ends of the sequence.
    #[must_use]
    pub fn onion_skin(&self, index: usize, prev: usize, next: usize) -> OnionSkin {
        let mut previous = PixelGrid::new(self.width, self.height);
        let mut following = PixelGrid::new(self.width, self.height);
        let index = index.min(self.frames.len() - 1);

        for frame in &self.frames[index.saturating_sub(prev)..index] {
            previous.union_with(&frame.grid);
        }
        let end = (index + 1 + next).min(self.frames.len());
        for frame in &self.frames[index + 1..end] {
            following.union_with(&frame.grid);
        }
        OnionSkin {
            previous,
            next: following,
        }
    }
}

fn fit_frame(frame: Frame, width: usize, height: usize) -> Frame {
    if frame.grid.width() == width && frame.grid.height() == height {
        frame
    } else {
        Frame {
            duration_ms: frame.duration_ms,
            grid: frame.grid.resized(width, height),
        }
    }
}

/// Check a frame duration against the playback limits.
///
/// # Errors
///
/// Returns [`DocumentError::InvalidDuration`] when out of range.
pub fn validate_duration(duration_ms: u32) -> DocumentResult<()> {
    if (crate::MIN_FRAME_DURATION_MS..=crate::MAX_FRAME_DURATION_MS).contains(&duration_ms) {
        Ok(())
    } else {
        Err(DocumentError::InvalidDuration(duration_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with(bits: &[&str]) -> AnimationDocument {
        let frames = bits
            .iter()
            .enumerate()
            .map(|(i, b)| Frame {
                duration_ms: 100 + u32::try_from(i).expect("small") * 10,
                grid: PixelGrid::from_bits(2, 2, b),
            })
            .collect();
        AnimationDocument::from_frames("test", 2, 2, frames).expect("frames")
    }

    fn bits(doc: &AnimationDocument) -> Vec<String> {
        doc.frames().iter().map(|f| f.grid.to_bits()).collect()
    }

    #[test]
    fn test_new_has_one_blank_frame() {
        let doc = AnimationDocument::new("default", 84, 28);
        assert_eq!(doc.frame_count(), 1);
        assert_eq!(doc.current_frame().grid.lit_count(), 0);
        assert_eq!(doc.current_frame().grid.width(), 84);
    }

    #[test]
    fn test_add_frame_inherits_duration_and_moves_cursor() {
        let mut doc = doc_with(&["1000", "0100"]);
        let at = doc.add_frame(0).expect("add");
        assert_eq!(at, 1);
        assert_eq!(doc.cursor(), 1);
        assert_eq!(doc.frame(1).expect("frame").duration_ms, 100);
        assert_eq!(bits(&doc), vec!["1000", "0000", "0100"]);
    }

    #[test]
    fn test_add_frame_out_of_range() {
        let mut doc = doc_with(&["1000"]);
        assert_eq!(
            doc.add_frame(3),
            Err(DocumentError::FrameOutOfRange { index: 3, len: 1 })
        );
    }

    #[test]
    fn test_duplicate_frame_is_deep_copy() {
        let mut doc = doc_with(&["1000", "0100"]);
        doc.duplicate_frame(0).expect("dup");
        doc.frame_mut(1).expect("frame").grid.set(1, 1, true);
        assert_eq!(bits(&doc), vec!["1000", "1001", "0100"]);
        assert_eq!(doc.frame(1).expect("frame").duration_ms, 100);
    }

    #[test]
    fn test_remove_last_frame_refused() {
        let mut doc = doc_with(&["1000"]);
        assert_eq!(doc.remove_frame(0), Err(DocumentError::LastFrame));
        assert_eq!(doc.frame_count(), 1);
    }

    #[test]
    fn test_remove_clamps_cursor() {
        let mut doc = doc_with(&["1000", "0100", "0010"]);
        doc.set_cursor(2);
        doc.remove_frame(2).expect("remove");
        assert_eq!(doc.cursor(), 1);
        doc.remove_frame(0).expect("remove");
        assert_eq!(doc.cursor(), 0);
        assert_eq!(bits(&doc), vec!["0100"]);
    }

    #[test]
    fn test_reverse_mirrors_cursor() {
        let mut doc = doc_with(&["1000", "0100", "0010"]);
        doc.set_cursor(0);
        doc.reverse_all();
        assert_eq!(doc.cursor(), 2);
        assert_eq!(bits(&doc), vec!["0010", "0100", "1000"]);
    }

    #[test]
    fn test_duplicate_all_doubles_in_place() {
        let mut doc = doc_with(&["1000", "0100"]);
        doc.duplicate_all();
        assert_eq!(bits(&doc), vec!["1000", "1000", "0100", "0100"]);
        let durations: Vec<_> = doc.frames().iter().map(|f| f.duration_ms).collect();
        assert_eq!(durations, vec![100, 100, 110, 110]);
    }

    #[test]
    fn test_move_frame() {
        let mut doc = doc_with(&["1000", "0100", "0010"]);
        doc.move_frame(0, 2).expect("move");
        assert_eq!(bits(&doc), vec!["0100", "0010", "1000"]);
        assert_eq!(doc.cursor(), 2);
    }

    #[test]
    fn test_set_duration_validates() {
        let mut doc = doc_with(&["1000"]);
        assert_eq!(doc.set_duration(0, 9), Err(DocumentError::InvalidDuration(9)));
        doc.set_duration(0, 10).expect("minimum is valid");
        doc.set_all_durations(250).expect("valid");
        assert_eq!(doc.total_duration_ms(), 250);
    }

    #[test]
    fn test_onion_skin_ors_neighbors() {
        let doc = doc_with(&["1000", "0100", "0010", "0001", "1000"]);
        let skin = doc.onion_skin(2, 2, 1);
        assert_eq!(skin.previous.to_bits(), "1100");
        assert_eq!(skin.next.to_bits(), "0001");
    }

    #[test]
    fn test_onion_skin_at_edges() {
        let doc = doc_with(&["1000", "0100"]);
        let skin = doc.onion_skin(0, 3, 3);
        assert_eq!(skin.previous.lit_count(), 0);
        assert_eq!(skin.next.to_bits(), "0100");
    }

    #[test]
    fn test_from_frames_fits_dimensions() {
        let frames = vec![Frame {
            duration_ms: 100,
            grid: PixelGrid::from_bits(3, 1, "111"),
        }];
        let doc = AnimationDocument::from_frames("x", 2, 2, frames).expect("frames");
        assert_eq!(doc.frame(0).expect("frame").grid.to_bits(), "1100");
    }

    #[test]
    fn test_from_frames_requires_frames() {
        assert_eq!(
            AnimationDocument::from_frames("x", 2, 2, Vec::new()),
            Err(DocumentError::NoFrames)
        );
    }

    #[test]
    fn test_resize() {
        let mut doc = doc_with(&["1001"]);
        doc.resize(1, 2);
        assert_eq!(doc.width(), 1);
        assert_eq!(doc.current_frame().grid.to_bits(), "10");
    }
}
