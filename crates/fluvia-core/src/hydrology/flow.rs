//! D8 inflow bitmask and flow accumulation.
//!
//! Accumulation is the memoized recurrence
//! `A(i,j) = 1 + Σ A(n)` over every inbound neighbor n, with the output
//! grid doubling as the memo (0 = not yet computed). The recurrence is
//! evaluated with an explicit worklist stack: every D8 arrow points to a
//! strictly lower cell, so the inflow graph is a DAG and the walk
//! terminates, but its depth can reach the full grid diagonal and native
//! recursion would overflow on large maps.
use crate::d8::{self, INFLOW_BITS};
use crate::grid::Grid;

/// Bitwise-OR of inbound directions per cell: bit k is set iff the
/// neighbor at bit k's offset has an out-direction pointing back here.
/// Sinks encode 0 out and therefore feed nothing.
pub fn sum_flow_directions_in(direction: &Grid<i32>) -> Grid<u8> {
    let rows = direction.rows();
    let cols = direction.cols();
    let mut mask = Grid::new(rows, cols, 0u8);

    for i in 0..rows {
        for j in 0..cols {
            let mut bits = 0u8;
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let ni = i as isize + dy as isize;
                    let nj = j as isize + dx as isize;
                    if !direction.in_bounds(ni, nj) {
                        continue;
                    }
                    if direction.get(ni as usize, nj as usize) == d8::encode(-dx, -dy) {
                        bits |= d8::encode(dx, dy) as u8;
                    }
                }
            }
            mask.set(i, j, bits);
        }
    }
    mask
}

/// Upstream cell count (including the cell itself) for every cell.
///
/// Postcondition: every cell is ≥ 1, and accumulation summed over roots
/// (cells nothing drains out of within the raster) equals rows × cols.
pub fn accumulate(direction_in: &Grid<u8>) -> Grid<u64> {
    let rows = direction_in.rows();
    let cols = direction_in.cols();
    let mut acc = Grid::new(rows, cols, 0u64);
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for i in 0..rows {
        for j in 0..cols {
            if acc.get(i, j) != 0 {
                continue;
            }
            stack.push((i, j));
            while let Some(&(ci, cj)) = stack.last() {
                if acc.get(ci, cj) != 0 {
                    stack.pop();
                    continue;
                }
                let bits = direction_in.get(ci, cj);
                let mut sum = 1u64;
                let mut ready = true;
                for &(bit, dx, dy) in &INFLOW_BITS {
                    if bits & bit == 0 {
                        continue;
                    }
                    // Inbound bits are only ever set for in-bounds neighbors.
                    let ni = (ci as isize + dy as isize) as usize;
                    let nj = (cj as isize + dx as isize) as usize;
                    let upstream = acc.get(ni, nj);
                    if upstream == 0 {
                        ready = false;
                        stack.push((ni, nj));
                    } else {
                        sum += upstream;
                    }
                }
                if ready {
                    acc.set(ci, cj, sum);
                    stack.pop();
                }
            }
        }
    }
    acc
}
