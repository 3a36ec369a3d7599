//! Dense 2D grids and the iterative box blur shared by every analysis.
//!
//! All grids are row-major with `[row][col]` addressing: row 0 is the
//! northern (topmost) raster row, y grows southward, x grows eastward.
//! Every field derived from a heightmap has the heightmap's dimensions.
use serde::{Deserialize, Serialize};

/// A dense `rows × cols` grid stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T: Copy> Grid<T> {
    /// Create a grid filled with the given value.
    pub fn new(rows: usize, cols: usize, fill: T) -> Self {
        Self { data: vec![fill; rows * cols], rows, cols }
    }

    /// Wrap an existing row-major buffer. `data.len()` must equal
    /// `rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Self {
        assert_eq!(data.len(), rows * cols, "buffer length must match rows * cols");
        Self { data, rows, cols }
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> T {
        self.data[i * self.cols + j]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, val: T) {
        self.data[i * self.cols + j] = val;
    }

    /// Reset every cell to `val`, keeping dimensions.
    pub fn fill_with(&mut self, val: T) {
        self.data.fill(val);
    }
}

impl<T> Grid<T> {
    /// The 0×0 grid: the state of a derived field before its analysis runs.
    pub fn empty() -> Self {
        Self { data: Vec::new(), rows: 0, cols: 0 }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// Bounds check for signed neighbor arithmetic.
    #[inline]
    pub fn in_bounds(&self, i: isize, j: isize) -> bool {
        i >= 0 && j >= 0 && (i as usize) < self.rows && (j as usize) < self.cols
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

/// Iterative box blur: each pass nudges every interior cell toward its 3×3
/// mean by `amount_per_iter`. Borders are never updated; each pass reads
/// the previous pass's output.
pub fn blur(grid: &mut Grid<f32>, iterations: u32, amount_per_iter: f32) {
    if grid.rows() < 3 || grid.cols() < 3 {
        return;
    }
    let rows = grid.rows();
    let cols = grid.cols();
    for _ in 0..iterations {
        let mut next = grid.clone();
        for i in 1..rows - 1 {
            for j in 1..cols - 1 {
                let avg = mean3x3(grid, i, j);
                let v = grid.get(i, j);
                next.set(i, j, v + (avg - v) * amount_per_iter);
            }
        }
        *grid = next;
    }
}

/// Box blur variant that replaces each interior cell with the 3×3 mean.
pub fn blur_avg(grid: &mut Grid<f32>, iterations: u32) {
    if grid.rows() < 3 || grid.cols() < 3 {
        return;
    }
    let rows = grid.rows();
    let cols = grid.cols();
    for _ in 0..iterations {
        let mut next = grid.clone();
        for i in 1..rows - 1 {
            for j in 1..cols - 1 {
                next.set(i, j, mean3x3(grid, i, j));
            }
        }
        *grid = next;
    }
}

/// 3×3 mean centered on an interior cell.
#[inline]
pub(crate) fn mean3x3(grid: &Grid<f32>, i: usize, j: usize) -> f32 {
    (grid.get(i - 1, j - 1) + grid.get(i - 1, j) + grid.get(i - 1, j + 1)
        + grid.get(i, j - 1) + grid.get(i, j) + grid.get(i, j + 1)
        + grid.get(i + 1, j - 1) + grid.get(i + 1, j) + grid.get(i + 1, j + 1))
        / 9.0
}
