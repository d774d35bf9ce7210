//! Drawing algorithms over a [`PixelGrid`].
//!
//! Everything here is a plain function of its inputs. Stamps and strokes
//! mutate the grid they are given; whole-grid transforms return a fresh grid
//! and leave the source untouched, so callers can snapshot history before
//! swapping grids.

use std::collections::{HashSet, VecDeque};
use std::f64::consts::TAU;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::PixelGrid;

/// An integer cell coordinate. May lie outside the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Point {
    /// Create a point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Brush footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrushShape {
    /// Cells with `dx² + dy² <= r²`.
    #[default]
    Circle,
    /// Cells with `max(|dx|, |dy|) <= r`.
    Square,
    /// Isosceles triangle, apex up, spanning the full `2r + 1` rows.
    Triangle,
}

impl BrushShape {
    /// Whether offset `(dx, dy)` from the brush center is painted.
    #[must_use]
    pub fn contains(self, dx: i32, dy: i32, radius: u32) -> bool {
        let r = i64::from(radius);
        let (dx, dy) = (i64::from(dx), i64::from(dy));
        if dx.abs() > r || dy.abs() > r {
            return false;
        }
        if r == 0 {
            return true;
        }
        match self {
            Self::Circle => dx * dx + dy * dy <= r * r,
            Self::Square => dx.abs().max(dy.abs()) <= r,
            Self::Triangle => {
                // floor(y' / 2r * r) == floor(y' / 2) for y' in [0, 2r]
                let y_prime = dy + r;
                dx.abs() <= y_prime / 2
            }
        }
    }
}

/// Which mirror copies accompany every painted cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mirror {
    /// Paint only the primary cell.
    #[default]
    None,
    /// Also paint `x' = width - 1 - x`.
    Horizontal,
    /// Also paint `y' = height - 1 - y`.
    Vertical,
    /// Paint all four quadrants.
    Both,
}

impl Mirror {
    /// The primary cell followed by its mirror images for a `width x height` grid.
    #[must_use]
    pub fn images(self, p: Point, width: usize, height: usize) -> Vec<Point> {
        let mx = dim(width) - 1 - p.x;
        let my = dim(height) - 1 - p.y;
        match self {
            Self::None => vec![p],
            Self::Horizontal => vec![p, Point::new(mx, p.y)],
            Self::Vertical => vec![p, Point::new(p.x, my)],
            Self::Both => vec![p, Point::new(mx, p.y), Point::new(p.x, my), Point::new(mx, my)],
        }
    }
}

fn dim(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// Offsets covered by a brush of the given radius and shape.
pub fn brush_offsets(radius: u32, shape: BrushShape) -> impl Iterator<Item = Point> {
    let r = i32::try_from(radius).unwrap_or(i32::MAX / 2);
    (-r..=r).flat_map(move |dy| {
        (-r..=r).filter_map(move |dx| shape.contains(dx, dy, radius).then_some(Point::new(dx, dy)))
    })
}

/// Stamp a brush centered at `(cx, cy)`, clipping to the grid.
pub fn stamp(grid: &mut PixelGrid, cx: i32, cy: i32, radius: u32, shape: BrushShape, value: bool) {
    for off in brush_offsets(radius, shape) {
        grid.set(cx + off.x, cy + off.y, value);
    }
}

/// Integer path from `from` to `to` (Bresenham), one cell per step, endpoints included.
#[must_use]
pub fn line_path(from: Point, to: Point) -> Vec<Point> {
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (from.x, from.y);
    let mut path = Vec::with_capacity(usize::try_from(dx.max(-dy)).unwrap_or(0) + 1);

    loop {
        path.push(Point::new(x, y));
        if x == to.x && y == to.y {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    path
}

/// Stamp the brush at every cell of the path between `from` and `to`.
pub fn line(
    grid: &mut PixelGrid,
    from: Point,
    to: Point,
    radius: u32,
    shape: BrushShape,
    value: bool,
) {
    for p in line_path(from, to) {
        stamp(grid, p.x, p.y, radius, shape, value);
    }
}

/// Shape tools that draw with preview-then-commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeTool {
    /// Straight line.
    Line,
    /// Ellipse inscribed in the drag rectangle.
    Ellipse,
    /// Rectangle outline.
    Rect,
}

/// Outline cells for a shape dragged from `from` to `to`.
#[must_use]
pub fn shape_points(tool: ShapeTool, from: Point, to: Point) -> Vec<Point> {
    match tool {
        ShapeTool::Line => line_path(from, to),
        ShapeTool::Ellipse => ellipse_points(from, to),
        ShapeTool::Rect => rect_points(from, to),
    }
}

/// Midpoint ellipse centered between the two corners.
fn ellipse_points(from: Point, to: Point) -> Vec<Point> {
    let cx = (from.x + to.x).div_euclid(2);
    let cy = (from.y + to.y).div_euclid(2);
    let rx = (to.x - from.x).abs() / 2;
    let ry = (to.y - from.y).abs() / 2;

    if rx == 0 || ry == 0 {
        return line_path(Point::new(cx - rx, cy - ry), Point::new(cx + rx, cy + ry));
    }

    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut plot = |x: i32, y: i32| {
        for p in [
            Point::new(cx + x, cy + y),
            Point::new(cx - x, cy + y),
            Point::new(cx + x, cy - y),
            Point::new(cx - x, cy - y),
        ] {
            if seen.insert(p) {
                out.push(p);
            }
        }
    };

    let rx2 = f64::from(rx) * f64::from(rx);
    let ry2 = f64::from(ry) * f64::from(ry);
    let (mut x, mut y) = (0_i32, ry);
    let mut px = 0.0;
    let mut py = 2.0 * rx2 * f64::from(y);

    let mut p = ry2 - rx2 * f64::from(ry) + 0.25 * rx2;
    while px < py {
        plot(x, y);
        x += 1;
        px += 2.0 * ry2;
        if p < 0.0 {
            p += ry2 + px;
        } else {
            y -= 1;
            py -= 2.0 * rx2;
            p += ry2 + px - py;
        }
    }

    let xf = f64::from(x) + 0.5;
    let yf = f64::from(y) - 1.0;
    p = ry2 * xf * xf + rx2 * yf * yf - rx2 * ry2;
    while y >= 0 {
        plot(x, y);
        y -= 1;
        py -= 2.0 * rx2;
        if p > 0.0 {
            p += rx2 - py;
        } else {
            x += 1;
            px += 2.0 * ry2;
            p += rx2 - py + px;
        }
    }
    out
}

/// Four edges between the min and max corners.
fn rect_points(from: Point, to: Point) -> Vec<Point> {
    let (x0, x1) = (from.x.min(to.x), from.x.max(to.x));
    let (y0, y1) = (from.y.min(to.y), from.y.max(to.y));
    let mut out = Vec::new();
    for x in x0..=x1 {
        out.push(Point::new(x, y0));
        if y1 != y0 {
            out.push(Point::new(x, y1));
        }
    }
    for y in (y0 + 1)..y1 {
        out.push(Point::new(x0, y));
        if x1 != x0 {
            out.push(Point::new(x1, y));
        }
    }
    out
}

/// Breadth-first 4-connected flood fill from `start_index`.
///
/// Returns the number of cells changed. A no-op when the seed already has
/// `value` or `start_index` is outside the grid.
pub fn fill(grid: &mut PixelGrid, start_index: usize, value: bool) -> usize {
    let Some(&target) = grid.cells().get(start_index) else {
        return 0;
    };
    if target == value {
        return 0;
    }

    let (w, h) = (grid.width(), grid.height());
    let cells = grid.cells_mut();
    let mut queue = VecDeque::new();
    cells[start_index] = value;
    queue.push_back(start_index);
    let mut changed = 1;

    while let Some(i) = queue.pop_front() {
        let (x, y) = (i % w, i / w);
        let neighbors = [
            (x > 0).then(|| i - 1),
            (x + 1 < w).then(|| i + 1),
            (y > 0).then(|| i - w),
            (y + 1 < h).then(|| i + w),
        ];
        for n in neighbors.into_iter().flatten() {
            if cells[n] == target {
                cells[n] = value;
                changed += 1;
                queue.push_back(n);
            }
        }
    }
    changed
}

/// Brush settings shared by freehand tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Brush {
    /// Radius in cells; 0 paints a single cell.
    pub radius: u32,
    /// Footprint shape.
    pub shape: BrushShape,
    /// Mirror copies.
    pub mirror: Mirror,
}

impl Brush {
    /// Paint one cell plus its mirror images.
    pub fn paint_cell(&self, grid: &mut PixelGrid, p: Point, value: bool) {
        for q in self.mirror.images(p, grid.width(), grid.height()) {
            grid.set(q.x, q.y, value);
        }
    }

    /// Stamp at `center`, mirrored.
    pub fn stamp(&self, grid: &mut PixelGrid, center: Point, value: bool) {
        for off in brush_offsets(self.radius, self.shape) {
            self.paint_cell(grid, Point::new(center.x + off.x, center.y + off.y), value);
        }
    }

    /// Gap-free stroke between two pointer samples, mirrored.
    pub fn stroke(&self, grid: &mut PixelGrid, from: Point, to: Point, value: bool) {
        for p in line_path(from, to) {
            self.stamp(grid, p, value);
        }
    }

    /// Stamp the brush along a precomputed outline.
    pub fn trace(&self, grid: &mut PixelGrid, points: &[Point], value: bool) {
        for &p in points {
            self.stamp(grid, p, value);
        }
    }

    /// Scatter `density / 10` random dots within the brush radius.
    pub fn spray<R: Rng + ?Sized>(
        &self,
        grid: &mut PixelGrid,
        rng: &mut R,
        center: Point,
        density: u32,
        value: bool,
    ) {
        let radius = f64::from(self.radius);
        for _ in 0..density / 10 {
            let angle = rng.gen::<f64>() * TAU;
            let dist = rng.gen::<f64>() * radius;
            #[allow(clippy::cast_possible_truncation)]
            let (dx, dy) = (
                (angle.cos() * dist).round() as i32,
                (angle.sin() * dist).round() as i32,
            );
            self.paint_cell(grid, Point::new(center.x + dx, center.y + dy), value);
        }
    }
}

/// Whole-grid operations. Each returns a new grid of the same size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum GridTransform {
    /// Rotate 90° clockwise about the grid center.
    Rotate90,
    /// Mirror left-right.
    FlipHorizontal,
    /// Mirror top-bottom.
    FlipVertical,
    /// Toroidal shift.
    Shift {
        /// Columns to move right (negative moves left).
        dx: i32,
        /// Rows to move down (negative moves up).
        dy: i32,
    },
    /// Keep only the perimeter of lit regions.
    Outline,
    /// Flip each cell with probability `percent / 100`.
    Noise {
        /// Flip probability in percent, clamped to 100.
        percent: u8,
    },
    /// Thin lit areas to a checkerboard.
    Dither,
    /// Swap lit and unlit.
    Invert,
    /// Turn everything off.
    Clear,
}

impl GridTransform {
    /// Apply to `grid`, drawing randomness from `rng` where needed.
    #[must_use]
    pub fn apply<R: Rng + ?Sized>(self, grid: &PixelGrid, rng: &mut R) -> PixelGrid {
        match self {
            Self::Rotate90 => rotate90(grid),
            Self::FlipHorizontal => flip_horizontal(grid),
            Self::FlipVertical => flip_vertical(grid),
            Self::Shift { dx, dy } => shift(grid, dx, dy),
            Self::Outline => outline(grid),
            Self::Noise { percent } => noise(grid, rng, f64::from(percent.min(100)) / 100.0),
            Self::Dither => dither(grid),
            Self::Invert => invert(grid),
            Self::Clear => PixelGrid::new(grid.width(), grid.height()),
        }
    }
}

fn map_cells(grid: &PixelGrid, f: impl Fn(usize, usize) -> bool) -> PixelGrid {
    let (w, h) = (grid.width(), grid.height());
    let mut cells = vec![false; w * h];
    for y in 0..h {
        for x in 0..w {
            cells[y * w + x] = f(x, y);
        }
    }
    PixelGrid::from_cells(w, h, cells)
}

/// Rotate 90° clockwise about the grid center.
///
/// On non-square grids, cells that rotate outside the grid are dropped.
#[must_use]
pub fn rotate90(grid: &PixelGrid) -> PixelGrid {
    #[allow(clippy::cast_precision_loss)]
    let (cx, cy) = (
        (grid.width() as f64 - 1.0) / 2.0,
        (grid.height() as f64 - 1.0) / 2.0,
    );
    map_cells(grid, |x, y| {
        #[allow(clippy::cast_precision_loss)]
        let (dx, dy) = (x as f64 - cx, y as f64 - cy);
        #[allow(clippy::cast_possible_truncation)]
        let (sx, sy) = ((cx + dy).round() as i32, (cy - dx).round() as i32);
        grid.get(sx, sy)
    })
}

/// Mirror left-right.
#[must_use]
pub fn flip_horizontal(grid: &PixelGrid) -> PixelGrid {
    let w = grid.width();
    map_cells(grid, |x, y| grid.cells()[y * w + (w - 1 - x)])
}

/// Mirror top-bottom.
#[must_use]
pub fn flip_vertical(grid: &PixelGrid) -> PixelGrid {
    let (w, h) = (grid.width(), grid.height());
    map_cells(grid, |x, y| grid.cells()[(h - 1 - y) * w + x])
}

/// Shift with wraparound on both axes.
#[must_use]
pub fn shift(grid: &PixelGrid, dx: i32, dy: i32) -> PixelGrid {
    let (w, h) = (dim(grid.width()), dim(grid.height()));
    map_cells(grid, |x, y| {
        let sx = (dim(x) - dx).rem_euclid(w);
        let sy = (dim(y) - dy).rem_euclid(h);
        grid.get(sx, sy)
    })
}

/// A lit cell survives only if one of its 4 neighbors is unlit.
///
/// Cells beyond the edge count as unlit.
#[must_use]
pub fn outline(grid: &PixelGrid) -> PixelGrid {
    map_cells(grid, |x, y| {
        let (x, y) = (dim(x), dim(y));
        grid.get(x, y)
            && (!grid.get(x - 1, y)
                || !grid.get(x + 1, y)
                || !grid.get(x, y - 1)
                || !grid.get(x, y + 1))
    })
}

/// Flip each cell independently with probability `p`.
#[must_use]
pub fn noise<R: Rng + ?Sized>(grid: &PixelGrid, rng: &mut R, p: f64) -> PixelGrid {
    let w = grid.width();
    let p = p.clamp(0.0, 1.0);
    let mut cells = grid.cells().to_vec();
    for cell in &mut cells {
        if rng.gen_bool(p) {
            *cell = !*cell;
        }
    }
    PixelGrid::from_cells(w, grid.height(), cells)
}

/// Keep lit cells only where `x + y` is even.
#[must_use]
pub fn dither(grid: &PixelGrid) -> PixelGrid {
    let w = grid.width();
    map_cells(grid, |x, y| (x + y) % 2 == 0 && grid.cells()[y * w + x])
}

/// Swap lit and unlit cells.
#[must_use]
pub fn invert(grid: &PixelGrid) -> PixelGrid {
    let w = grid.width();
    map_cells(grid, |x, y| !grid.cells()[y * w + x])
}
