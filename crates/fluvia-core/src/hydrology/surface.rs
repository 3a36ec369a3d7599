//! Generalized surface analyses: slope, D8 steepest descent, aspect.
//!
//! These are pure functions over an input grid so they can run on any
//! derived field (USPED applies them to sediment-flux components, not
//! just heightmaps). The stateful wrappers on [`Hydrology`] store the
//! results; callers here get them returned.
//!
//! All of them treat an empty input as an empty output.
//!
//! [`Hydrology`]: super::Hydrology
use rand::Rng;

use crate::d8;
use crate::grid::Grid;

/// Angle convention for slope and aspect outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AngleUnits {
    /// Raw rise/run ratio (slope only; aspect treats this as degrees).
    Percent,
    #[default]
    Degree,
    Radian,
}

/// Steepest-descent slope at every cell.
///
/// Each cell takes the maximum of `(z[i][j] − z[n]) / √(dx²+dy²)` over its
/// in-bounds 8-neighbors, floored at 0 (ascents never contribute). Cell
/// height is assumed to share units with cell spacing, so spacing cancels.
pub fn slope_of(input: &Grid<f32>, units: AngleUnits) -> Grid<f32> {
    if input.is_empty() {
        return Grid::empty();
    }
    let rows = input.rows();
    let cols = input.cols();
    let mut out = Grid::new(rows, cols, 0.0f32);

    for i in 0..rows {
        for j in 0..cols {
            let mut max_slope = 0.0f32;
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let ni = i as isize + dy as isize;
                    let nj = j as isize + dx as isize;
                    if !input.in_bounds(ni, nj) {
                        continue;
                    }
                    let drop = input.get(i, j) - input.get(ni as usize, nj as usize);
                    let distance = ((dx * dx + dy * dy) as f32).sqrt();
                    max_slope = max_slope.max(drop / distance);
                }
            }
            let v = match units {
                AngleUnits::Percent => max_slope,
                AngleUnits::Degree => max_slope.atan().to_degrees(),
                AngleUnits::Radian => max_slope.atan(),
            };
            out.set(i, j, v);
        }
    }
    out
}

/// D8 steepest-descent direction at every cell.
///
/// Border cells start from their outlet sentinel (north row, then west
/// column, then south row, then east column), interior cells from sink.
/// The scan runs dy 1→−1, dx 1→−1 and keeps the first strictly-greatest
/// positive drop, which fixes tie-breaking; a cell with no positive drop
/// keeps its preset value.
pub fn d8_of(input: &Grid<f32>) -> Grid<i32> {
    if input.is_empty() {
        return Grid::empty();
    }
    let rows = input.rows();
    let cols = input.cols();
    let mut out = Grid::new(rows, cols, d8::SINK);

    for i in 0..rows {
        for j in 0..cols {
            let mut direction = if i == 0 {
                d8::OUTLET_NORTH
            } else if j == 0 {
                d8::OUTLET_WEST
            } else if i == rows - 1 {
                d8::OUTLET_SOUTH
            } else if j == cols - 1 {
                d8::OUTLET_EAST
            } else {
                d8::SINK
            };

            let mut max_slope = 0.0f32;
            for dy in (-1i32..=1).rev() {
                for dx in (-1i32..=1).rev() {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let ni = i as isize + dy as isize;
                    let nj = j as isize + dx as isize;
                    if !input.in_bounds(ni, nj) {
                        continue;
                    }
                    let drop = input.get(i, j) - input.get(ni as usize, nj as usize);
                    let distance = ((dx * dx + dy * dy) as f32).sqrt();
                    let current = drop / distance;
                    if current > max_slope {
                        max_slope = current;
                        direction = d8::encode(dx, dy);
                    }
                }
            }
            out.set(i, j, direction);
        }
    }
    out
}

/// Aspect of every cell, decoded from the D8 direction of `input`.
///
/// Sinks and flats draw a fresh uniform angle per cell; outlet sentinels
/// decode to their cardinal angle. `Percent` falls back to degrees.
pub fn aspect_of(input: &Grid<f32>, units: AngleUnits, rng: &mut impl Rng) -> Grid<f32> {
    if input.is_empty() {
        return Grid::empty();
    }
    let directions = d8_of(input);
    let mut out = Grid::new(input.rows(), input.cols(), 0.0f32);

    for i in 0..input.rows() {
        for j in 0..input.cols() {
            let code = directions.get(i, j);
            let angle = match units {
                AngleUnits::Radian => {
                    let a = d8::to_radians(code);
                    if a < 0.0 {
                        rng.gen_range(0.0..2.0 * std::f32::consts::PI)
                    } else {
                        a
                    }
                }
                _ => {
                    let a = d8::to_degrees(code);
                    if a < 0.0 {
                        rng.gen_range(0.0..360.0)
                    } else {
                        a
                    }
                }
            };
            out.set(i, j, angle);
        }
    }
    out
}

/// Aspect averaged over the two steepest descent directions.
///
/// The two directions are circular-mean-averaged:
/// `diff = ((θ₁ − θ₂ + 540) mod 360) − 180`, result `θ₂ + diff/2`.
/// Smooths the eight-angle banding of plain D8 aspect.
pub fn aspect_averaged_of(input: &Grid<f32>, units: AngleUnits) -> Grid<f32> {
    if input.is_empty() {
        return Grid::empty();
    }
    let rows = input.rows();
    let cols = input.cols();
    let mut out = Grid::new(rows, cols, 0.0f32);

    for i in 0..rows {
        for j in 0..cols {
            let (first_dir, first_slope) = steepest_descent(input, i, j, f32::INFINITY);
            let (second_dir, _) = steepest_descent(input, i, j, first_slope);

            let angle1 = d8::to_degrees(d8::encode(first_dir.0, first_dir.1));
            let angle2 = d8::to_degrees(d8::encode(second_dir.0, second_dir.1));

            let diff = ((angle1 - angle2 + 540.0) as i32 % 360 - 180) as f32;
            let angle_out = ((360.0 + angle2 + diff / 2.0) as i32 % 360) as f32;

            let v = match units {
                AngleUnits::Radian => angle_out.to_radians(),
                _ => angle_out,
            };
            out.set(i, j, v);
        }
    }
    out
}

/// Steepest descent direction with slope strictly below `ceiling`.
/// Returns `((-1, -1), 0.0)` when no neighbor qualifies.
fn steepest_descent(input: &Grid<f32>, i: usize, j: usize, ceiling: f32) -> ((i32, i32), f32) {
    let mut best = 0.0f32;
    let mut best_dir = (-1i32, -1i32);
    for dy in -1i32..=1 {
        for dx in -1i32..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let ni = i as isize + dy as isize;
            let nj = j as isize + dx as isize;
            if !input.in_bounds(ni, nj) {
                continue;
            }
            let drop = input.get(i, j) - input.get(ni as usize, nj as usize);
            let distance = ((dx * dx + dy * dy) as f32).sqrt();
            let current = drop / distance;
            if current > best && current < ceiling {
                best = current;
                best_dir = (dx, dy);
            }
        }
    }
    (best_dir, best)
}
