//! Fixed-size binary raster.
//!
//! A [`PixelGrid`] stores one `bool` per display cell in row-major order
//! (`index = y * width + x`). Writes outside the grid are clipped silently;
//! drawing tools rely on this instead of bounds-checking every stamp.

use serde::{Deserialize, Serialize};

/// A `width * height` raster of on/off cells.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelGrid {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl PixelGrid {
    /// Create an all-off grid.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width * height],
        }
    }

    /// Build a grid from existing cells.
    ///
    /// `cells` is padded with `false` or truncated to `width * height`.
    #[must_use]
    pub fn from_cells(width: usize, height: usize, mut cells: Vec<bool>) -> Self {
        cells.resize(width * height, false);
        Self {
            width,
            height,
            cells,
        }
    }

    /// Decode a row-major `'1'`/`'0'` bit-string.
    ///
    /// Short strings leave the remaining cells off; excess characters are
    /// ignored. Any character other than `'1'` decodes as off.
    #[must_use]
    pub fn from_bits(width: usize, height: usize, bits: &str) -> Self {
        let mut grid = Self::new(width, height);
        for (cell, ch) in grid.cells.iter_mut().zip(bits.chars()) {
            *cell = ch == '1';
        }
        grid
    }

    /// Encode the grid as a row-major bit-string of length `width * height`.
    #[must_use]
    pub fn to_bits(&self) -> String {
        self.cells
            .iter()
            .map(|&lit| if lit { '1' } else { '0' })
            .collect()
    }

    /// Grid width in cells.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the grid has zero cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Row-major cell storage.
    #[must_use]
    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    /// Mutable row-major cell storage.
    pub fn cells_mut(&mut self) -> &mut [bool] {
        &mut self.cells
    }

    /// Linear index for `(x, y)`, or `None` when out of bounds.
    #[must_use]
    pub fn index(&self, x: i32, y: i32) -> Option<usize> {
        let (x, y) = (usize::try_from(x).ok()?, usize::try_from(y).ok()?);
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    /// `(x, y)` for a linear index.
    #[must_use]
    pub fn coords(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    /// Cell value at `(x, y)`; out-of-bounds reads are off.
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> bool {
        self.index(x, y).is_some_and(|i| self.cells[i])
    }

    /// Set the cell at `(x, y)`; out-of-bounds writes are ignored.
    pub fn set(&mut self, x: i32, y: i32, value: bool) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = value;
        }
    }

    /// Set every cell to `value`.
    pub fn fill_all(&mut self, value: bool) {
        self.cells.fill(value);
    }

    /// Turn every cell off.
    pub fn clear(&mut self) {
        self.fill_all(false);
    }

    /// Number of lit cells.
    #[must_use]
    pub fn lit_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// OR another grid of the same size into this one.
    ///
    /// Grids of a different size are combined over their overlapping area.
    pub fn union_with(&mut self, other: &Self) {
        let w = self.width.min(other.width);
        let h = self.height.min(other.height);
        for y in 0..h {
            for x in 0..w {
                if other.cells[y * other.width + x] {
                    self.cells[y * self.width + x] = true;
                }
            }
        }
    }

    /// Copy into a grid of a new size, anchored at the top-left corner.
    #[must_use]
    pub fn resized(&self, width: usize, height: usize) -> Self {
        let mut out = Self::new(width, height);
        for y in 0..height.min(self.height) {
            for x in 0..width.min(self.width) {
                out.cells[y * width + x] = self.cells[y * self.width + x];
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_grid_is_blank() {
        let grid = PixelGrid::new(84, 28);
        assert_eq!(grid.len(), 84 * 28);
        assert_eq!(grid.lit_count(), 0);
    }

    #[test]
    fn test_set_clips_out_of_bounds() {
        let mut grid = PixelGrid::new(4, 3);
        grid.set(-1, 0, true);
        grid.set(4, 0, true);
        grid.set(0, 3, true);
        grid.set(0, -5, true);
        assert_eq!(grid.lit_count(), 0);

        grid.set(3, 2, true);
        assert!(grid.get(3, 2));
        assert!(grid.cells()[2 * 4 + 3]);
    }

    #[test]
    fn test_bits_row_major() {
        let mut grid = PixelGrid::new(3, 2);
        grid.set(0, 0, true);
        grid.set(2, 1, true);
        assert_eq!(grid.to_bits(), "100001");
    }

    #[test]
    fn test_from_bits_pads_short_input() {
        let grid = PixelGrid::from_bits(2, 2, "11");
        assert_eq!(grid.cells(), &[true, true, false, false]);
    }

    #[test]
    fn test_from_bits_ignores_excess() {
        let grid = PixelGrid::from_bits(2, 1, "0111111");
        assert_eq!(grid.to_bits(), "01");
    }

    #[test]
    fn test_from_bits_non_binary_chars_are_off() {
        let grid = PixelGrid::from_bits(4, 1, "1x?1");
        assert_eq!(grid.to_bits(), "1001");
    }

    #[test]
    fn test_union_with() {
        let mut a = PixelGrid::from_bits(2, 2, "1000");
        let b = PixelGrid::from_bits(2, 2, "0001");
        a.union_with(&b);
        assert_eq!(a.to_bits(), "1001");
    }

    #[test]
    fn test_resized_keeps_top_left() {
        let grid = PixelGrid::from_bits(3, 2, "101010");
        let small = grid.resized(2, 1);
        assert_eq!(small.to_bits(), "10");
        let big = grid.resized(4, 3);
        assert_eq!(big.to_bits(), "101001000000");
    }

    proptest! {
        #[test]
        fn prop_bits_round_trip(
            (w, h, cells) in (1usize..40, 1usize..20)
                .prop_flat_map(|(w, h)| (Just(w), Just(h), proptest::collection::vec(any::<bool>(), w * h)))
        ) {
            let grid = PixelGrid::from_cells(w, h, cells);
            let bits = grid.to_bits();
            prop_assert_eq!(bits.len(), w * h);
            prop_assert_eq!(PixelGrid::from_bits(w, h, &bits), grid);
        }
    }
}
