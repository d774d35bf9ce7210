//! Interactive editing session.
//!
//! Routes pointer input through the drawing tools into the frame under the
//! cursor, recording one history snapshot per gesture. Shape tools preview
//! while the pointer is held and only touch the frame on release.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::raster::{self, Brush, GridTransform, Point, ShapeTool};
use crate::{AnimationDocument, DocumentResult, HistoryStack, OnionSkin, PixelGrid};

/// Default spray density (dots per sample = density / 10).
pub const DEFAULT_SPRAY_DENSITY: u32 = 40;

/// The active drawing tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Freehand lit stroke.
    #[default]
    Brush,
    /// Freehand unlit stroke.
    Eraser,
    /// Straight line, previewed until release.
    Line,
    /// Ellipse outline, previewed until release.
    Ellipse,
    /// Rectangle outline, previewed until release.
    Rect,
    /// Flood fill on press.
    Fill,
    /// Random dots around the pointer.
    Spray,
}

impl Tool {
    fn shape(self) -> Option<ShapeTool> {
        match self {
            Self::Line => Some(ShapeTool::Line),
            Self::Ellipse => Some(ShapeTool::Ellipse),
            Self::Rect => Some(ShapeTool::Rect),
            Self::Brush | Self::Eraser | Self::Fill | Self::Spray => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Gesture {
    Stroke {
        last: Point,
        value: bool,
    },
    Spray {
        value: bool,
    },
    Shape {
        tool: ShapeTool,
        start: Point,
        points: Vec<Point>,
    },
}

/// Editing state for one document.
#[derive(Debug)]
pub struct Editor {
    document: AnimationDocument,
    history: HistoryStack,
    /// Current tool.
    pub tool: Tool,
    /// Brush used by freehand and shape tools.
    pub brush: Brush,
    /// Spray density.
    pub spray_density: u32,
    gesture: Option<Gesture>,
    rng: StdRng,
    dirty: bool,
}

impl Editor {
    /// Start editing `document` with an empty history.
    #[must_use]
    pub fn new(document: AnimationDocument) -> Self {
        Self::with_rng(document, StdRng::from_entropy())
    }

    /// Like [`Editor::new`] with a deterministic random source.
    #[must_use]
    pub fn with_seed(document: AnimationDocument, seed: u64) -> Self {
        Self::with_rng(document, StdRng::seed_from_u64(seed))
    }

    fn with_rng(document: AnimationDocument, rng: StdRng) -> Self {
        Self {
            document,
            history: HistoryStack::new(),
            tool: Tool::default(),
            brush: Brush::default(),
            spray_density: DEFAULT_SPRAY_DENSITY,
            gesture: None,
            rng,
            dirty: false,
        }
    }

    /// The document being edited.
    #[must_use]
    pub fn document(&self) -> &AnimationDocument {
        &self.document
    }

    /// Take back the document.
    #[must_use]
    pub fn into_document(self) -> AnimationDocument {
        self.document
    }

    /// Swap in another document, dropping history and any gesture in progress.
    pub fn load(&mut self, document: AnimationDocument) {
        self.document = document;
        self.history.clear();
        self.gesture = None;
        self.dirty = false;
    }

    /// Whether edits happened since the last [`Editor::mark_clean`].
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag after a successful save.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// The history log.
    #[must_use]
    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    fn snapshot(&mut self) {
        self.history.push(self.document.frames());
        self.dirty = true;
    }

    /// Flood fill from `p`. A press off the grid or on a region that already
    /// has `value` records nothing.
    fn fill_at(&mut self, p: Point, value: bool) {
        let grid = &self.document.current_frame().grid;
        let Some(index) = grid.index(p.x, p.y) else {
            return;
        };
        if grid.cells()[index] == value {
            return;
        }
        self.snapshot();
        let changed = raster::fill(self.grid_mut(), index, value);
        tracing::debug!(changed, "Flood fill");
    }

    fn grid_mut(&mut self) -> &mut PixelGrid {
        &mut self.document.current_frame_mut().grid
    }

    /// Pointer pressed at `p`.
    pub fn pointer_down(&mut self, p: Point) {
        let value = self.tool != Tool::Eraser;
        if let Some(tool) = self.tool.shape() {
            self.gesture = Some(Gesture::Shape {
                tool,
                start: p,
                points: raster::shape_points(tool, p, p),
            });
            return;
        }

        match self.tool {
            Tool::Brush | Tool::Eraser => {
                self.snapshot();
                let brush = self.brush;
                brush.stamp(self.grid_mut(), p, value);
                self.gesture = Some(Gesture::Stroke { last: p, value });
            }
            Tool::Spray => {
                self.snapshot();
                self.spray_at(p, value);
                self.gesture = Some(Gesture::Spray { value });
            }
            Tool::Fill => self.fill_at(p, value),
            Tool::Line | Tool::Ellipse | Tool::Rect => {}
        }
    }

    /// Pointer dragged to `p`.
    pub fn pointer_move(&mut self, p: Point) {
        let brush = self.brush;
        match self.gesture.take() {
            Some(Gesture::Stroke { last, value }) => {
                brush.stroke(self.grid_mut(), last, p, value);
                self.gesture = Some(Gesture::Stroke { last: p, value });
            }
            Some(Gesture::Spray { value }) => {
                self.spray_at(p, value);
                self.gesture = Some(Gesture::Spray { value });
            }
            Some(Gesture::Shape { tool, start, .. }) => {
                self.gesture = Some(Gesture::Shape {
                    tool,
                    start,
                    points: raster::shape_points(tool, start, p),
                });
            }
            None => {}
        }
    }

    /// Pointer released at `p`. Shape tools commit here.
    pub fn pointer_up(&mut self, p: Point) {
        match self.gesture.take() {
            Some(Gesture::Shape { tool, start, .. }) => {
                let points = raster::shape_points(tool, start, p);
                self.snapshot();
                let brush = self.brush;
                brush.trace(self.grid_mut(), &points, true);
                tracing::debug!(?tool, cells = points.len(), "Committed shape");
            }
            Some(Gesture::Stroke { last, value }) => {
                let brush = self.brush;
                brush.stroke(self.grid_mut(), last, p, value);
            }
            Some(Gesture::Spray { .. }) | None => {}
        }
    }

    /// Outline cells of the shape being dragged, if any.
    #[must_use]
    pub fn preview_points(&self) -> Option<&[Point]> {
        match &self.gesture {
            Some(Gesture::Shape { points, .. }) => Some(points.as_slice()),
            _ => None,
        }
    }

    /// The current frame with the pending shape drawn over a copy.
    #[must_use]
    pub fn preview_grid(&self) -> PixelGrid {
        let mut grid = self.document.current_frame().grid.clone();
        if let Some(points) = self.preview_points() {
            self.brush.trace(&mut grid, points, true);
        }
        grid
    }

    fn spray_at(&mut self, p: Point, value: bool) {
        let brush = self.brush;
        let density = self.spray_density;
        let grid = &mut self.document.current_frame_mut().grid;
        brush.spray(grid, &mut self.rng, p, density, value);
    }

    /// Replace the current frame with a transformed copy.
    pub fn apply_transform(&mut self, transform: GridTransform) {
        self.snapshot();
        let next = transform.apply(&self.document.current_frame().grid, &mut self.rng);
        *self.grid_mut() = next;
        tracing::debug!(?transform, "Applied transform");
    }

    /// Insert a blank frame after the cursor.
    ///
    /// # Errors
    ///
    /// Propagates [`crate::DocumentError`] from the document.
    pub fn add_frame(&mut self) -> DocumentResult<usize> {
        self.snapshot();
        self.document.add_frame(self.document.cursor())
    }

    /// Duplicate the frame under the cursor.
    ///
    /// # Errors
    ///
    /// Propagates [`crate::DocumentError`] from the document.
    pub fn duplicate_frame(&mut self) -> DocumentResult<usize> {
        self.snapshot();
        self.document.duplicate_frame(self.document.cursor())
    }

    /// Remove the frame under the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DocumentError::LastFrame`] on a single-frame document;
    /// history is left untouched in that case.
    pub fn remove_frame(&mut self) -> DocumentResult<()> {
        if self.document.frame_count() == 1 {
            return Err(crate::DocumentError::LastFrame);
        }
        self.snapshot();
        self.document.remove_frame(self.document.cursor()).map(drop)
    }

    /// Move a frame to a new position.
    ///
    /// # Errors
    ///
    /// Propagates [`crate::DocumentError`] from the document.
    pub fn move_frame(&mut self, from: usize, to: usize) -> DocumentResult<()> {
        self.snapshot();
        self.document.move_frame(from, to)
    }

    /// Reverse the sequence.
    pub fn reverse_all(&mut self) {
        self.snapshot();
        self.document.reverse_all();
    }

    /// Double every frame.
    pub fn duplicate_all(&mut self) {
        self.snapshot();
        self.document.duplicate_all();
    }

    /// Set the duration of the frame under the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DocumentError::InvalidDuration`] when out of range.
    pub fn set_duration(&mut self, duration_ms: u32) -> DocumentResult<()> {
        crate::document::validate_duration(duration_ms)?;
        self.snapshot();
        self.document
            .set_duration(self.document.cursor(), duration_ms)
    }

    /// Move the editing cursor; cancels any gesture in progress.
    pub fn select_frame(&mut self, index: usize) {
        self.gesture = None;
        self.document.set_cursor(index);
    }

    /// Ghosted neighbors of the frame under the cursor.
    #[must_use]
    pub fn onion_skin(&self, prev: usize, next: usize) -> OnionSkin {
        self.document
            .onion_skin(self.document.cursor(), prev, next)
    }

    /// Restore the previous snapshot. Returns `false` at the oldest entry.
    pub fn undo(&mut self) -> bool {
        match self.history.undo(self.document.frames()) {
            Some(frames) => self.install(frames),
            None => false,
        }
    }

    /// Re-apply an undone edit. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(frames) => self.install(frames),
            None => false,
        }
    }

    fn install(&mut self, frames: Vec<crate::Frame>) -> bool {
        self.gesture = None;
        self.dirty = true;
        self.document.replace_frames(frames).is_ok()
    }
}
