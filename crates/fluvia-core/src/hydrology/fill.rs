//! Depression filling.
//!
//! [`fill_sinks_wang_liu`] is the priority-flood of Wang & Liu (2006):
//! spill elevations propagate inward from the boundary through a min-heap,
//! so every interior cell ends with a descent path to an edge. A positive
//! `min_drop` keeps the filled surface drainable (flow routing never meets
//! a flat); `min_drop = 0` leaves filled depressions perfectly flat, which
//! is how standing water is found afterwards.
//!
//! The pinhole fillers and peak flattener are cheap single-pass
//! preprocessors for raw noise, not replacements for the priority flood.
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::grid::{mean3x3, Grid};

#[derive(Clone, Copy, PartialEq)]
enum State {
    Unprocessed,
    Open,
    Closed,
}

/// Min-heap entry keyed on the spill elevation at push time.
struct HeapCell {
    i: usize,
    j: usize,
    elevation: f32,
}

impl PartialEq for HeapCell {
    fn eq(&self, other: &Self) -> bool {
        self.elevation == other.elevation
    }
}
impl Eq for HeapCell {}

impl Ord for HeapCell {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the lowest cell first.
        other.elevation.total_cmp(&self.elevation)
    }
}
impl PartialOrd for HeapCell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Fill depressions of `z`, returning the spill surface.
///
/// Neighbors of the popped (lowest) cell are raised to at least its spill
/// elevation, plus `min_drop` when they would otherwise sit within
/// `min_drop` of it. With `min_drop = 0` the result satisfies
/// `out[c] ≥ z[c]` cellwise and lake floors stay flat.
pub fn fill_sinks_wang_liu(z: &Grid<f32>, min_drop: f32) -> Grid<f32> {
    let rows = z.rows();
    let cols = z.cols();
    let mut spill = z.clone();
    let mut state = Grid::new(rows, cols, State::Unprocessed);
    let mut queue: BinaryHeap<HeapCell> = BinaryHeap::new();

    for i in 0..rows {
        for j in 0..cols {
            if i == 0 || j == 0 || i == rows - 1 || j == cols - 1 {
                queue.push(HeapCell { i, j, elevation: spill.get(i, j) });
            }
        }
    }

    while let Some(cell) = queue.pop() {
        for dy in -1i32..=1 {
            for dx in -1i32..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let ni = cell.i as isize + dy as isize;
                let nj = cell.j as isize + dx as isize;
                if !spill.in_bounds(ni, nj) {
                    continue;
                }
                let (ni, nj) = (ni as usize, nj as usize);
                if state.get(ni, nj) != State::Unprocessed {
                    continue;
                }
                let mut raised = spill.get(ni, nj).max(cell.elevation);
                if raised - cell.elevation < min_drop {
                    raised = cell.elevation + min_drop;
                }
                spill.set(ni, nj, raised);
                queue.push(HeapCell { i: ni, j: nj, elevation: raised });
                state.set(ni, nj, State::Open);
            }
        }
        state.set(cell.i, cell.j, State::Closed);
    }
    spill
}

/// Raise single-cell pits to just above their lowest neighbor.
/// Column 0 is never touched; pits there drain off the west edge anyway.
pub fn fill_pinholes_min(z: &mut Grid<f32>) {
    let rows = z.rows();
    let cols = z.cols();
    let mut out = z.clone();
    for i in 0..rows {
        for j in 1..cols {
            if let Some(lowest) = lowest_neighbor(z, i, j) {
                if lowest > z.get(i, j) {
                    out.set(i, j, lowest + 1e-5);
                }
            }
        }
    }
    *z = out;
}

/// Raise single-cell pits to the mean of their two lowest neighbors.
pub fn fill_pinholes_avg(z: &mut Grid<f32>) {
    let rows = z.rows();
    let cols = z.cols();
    let mut out = z.clone();
    for i in 0..rows {
        for j in 0..cols {
            let mut lowest = f32::INFINITY;
            let mut second = f32::INFINITY;
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let ni = i as isize + dy as isize;
                    let nj = j as isize + dx as isize;
                    if !z.in_bounds(ni, nj) {
                        continue;
                    }
                    let v = z.get(ni as usize, nj as usize);
                    if v < lowest {
                        second = lowest;
                        lowest = v;
                    } else if v < second {
                        second = v;
                    }
                }
            }
            if lowest > z.get(i, j) {
                out.set(i, j, (lowest + second) / 2.0);
            }
        }
    }
    *z = out;
}

/// Flatten single-cell spikes (cells nothing drains through) to their 3×3
/// mean. Needs flow accumulation to tell spikes from ridge lines.
pub fn flatten_peaks(z: &mut Grid<f32>, accumulation: &Grid<u64>) {
    if z.rows() < 3 || z.cols() < 3 {
        return;
    }
    let rows = z.rows();
    let cols = z.cols();
    let mut out = z.clone();
    for i in 1..rows - 1 {
        for j in 1..cols - 1 {
            if accumulation.get(i, j) > 1 {
                continue;
            }
            out.set(i, j, mean3x3(z, i, j));
        }
    }
    *z = out;
}

fn lowest_neighbor(z: &Grid<f32>, i: usize, j: usize) -> Option<f32> {
    let mut lowest = f32::INFINITY;
    for dy in -1i32..=1 {
        for dx in -1i32..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let ni = i as isize + dy as isize;
            let nj = j as isize + dx as isize;
            if z.in_bounds(ni, nj) {
                lowest = lowest.min(z.get(ni as usize, nj as usize));
            }
        }
    }
    lowest.is_finite().then_some(lowest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// 5×5 bowl: rim at 10, centre pit at 1.
    fn bowl() -> Grid<f32> {
        let mut z = Grid::new(5, 5, 10.0f32);
        for i in 1..4 {
            for j in 1..4 {
                z.set(i, j, 4.0);
            }
        }
        z.set(2, 2, 1.0);
        z
    }

    #[test]
    fn zero_drop_fill_never_lowers_cells() {
        let z = bowl();
        let filled = fill_sinks_wang_liu(&z, 0.0);
        for i in 0..5 {
            for j in 0..5 {
                assert!(filled.get(i, j) >= z.get(i, j), "lowered at ({i},{j})");
            }
        }
    }

    #[test]
    fn bowl_fills_to_the_rim() {
        // The lowest boundary cell is 10, so the whole interior floods to 10
        // and the lake floor is flat.
        let filled = fill_sinks_wang_liu(&bowl(), 0.0);
        for i in 1..4 {
            for j in 1..4 {
                assert_relative_eq!(filled.get(i, j), 10.0, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn epsilon_fill_leaves_a_descent_step() {
        // With δ > 0 every interior cell keeps a neighbor roughly δ lower,
        // so flow routing finds a strict descent everywhere. Half-δ slack
        // absorbs f32 rounding at the bowl's magnitude.
        let delta = 1e-5f32;
        let filled = fill_sinks_wang_liu(&bowl(), delta);
        for i in 1..4 {
            for j in 1..4 {
                let here = filled.get(i, j);
                let mut has_step = false;
                for dy in -1i32..=1 {
                    for dx in -1i32..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let ni = (i as isize + dy as isize) as usize;
                        let nj = (j as isize + dx as isize) as usize;
                        if filled.get(ni, nj) <= here - delta * 0.5 {
                            has_step = true;
                        }
                    }
                }
                assert!(has_step, "no descent step at ({i},{j})");
            }
        }
    }

    #[test]
    fn terrain_without_depressions_is_unchanged_by_zero_fill() {
        let mut z = Grid::new(4, 6, 0.0f32);
        for i in 0..4 {
            for j in 0..6 {
                z.set(i, j, (6 - j) as f32);
            }
        }
        let filled = fill_sinks_wang_liu(&z, 0.0);
        assert_eq!(filled, z);
    }

    #[test]
    fn pinhole_min_raises_single_pit() {
        let mut z = Grid::new(3, 3, 5.0f32);
        z.set(1, 1, 0.0);
        fill_pinholes_min(&mut z);
        assert!(z.get(1, 1) > 5.0, "pit must rise above its lowest neighbor");
    }

    #[test]
    fn pinhole_min_leaves_west_column_alone() {
        let mut z = Grid::new(3, 3, 5.0f32);
        z.set(1, 0, 0.0);
        fill_pinholes_min(&mut z);
        assert_eq!(z.get(1, 0), 0.0, "column 0 pits must not be filled");
    }

    #[test]
    fn pinhole_avg_uses_two_lowest_neighbors() {
        let mut z = Grid::new(3, 3, 8.0f32);
        z.set(0, 0, 4.0);
        z.set(0, 1, 6.0);
        z.set(1, 1, 0.0);
        fill_pinholes_avg(&mut z);
        assert_relative_eq!(z.get(1, 1), 5.0, epsilon = 1e-6);
    }

    #[test]
    fn flatten_peaks_only_touches_headwater_spikes() {
        let mut z = Grid::new(5, 5, 1.0f32);
        z.set(1, 1, 50.0);
        z.set(3, 3, 50.0);
        let mut acc = Grid::new(5, 5, 1u64);
        acc.set(3, 3, 4); // flow passes through: a ridge cell, not a spike
        flatten_peaks(&mut z, &acc);
        assert!(z.get(1, 1) < 50.0, "spike must be flattened");
        assert_eq!(z.get(3, 3), 50.0, "drained cell must survive");
    }
}
