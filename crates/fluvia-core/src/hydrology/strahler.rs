//! Strahler stream ordering and channel identification.
//!
//! Ordering starts from every root (sink or outlet, out-direction ≤ 0) and
//! walks the inbound forest. Each cell has exactly one out-direction, so
//! the inbound graph is a forest and no cell is visited twice; the walk
//! uses an explicit enter/exit stack because chain depth is unbounded.
//!
//! Cells whose accumulation sits below the configured threshold are
//! pruned: they keep order 0 and are not descended into, which skips the
//! vast sheet-flow area off the channel network (the same shortcut SAGA's
//! tools take).
use crate::d8::INFLOW_BITS;
use crate::grid::Grid;

enum Phase {
    Enter,
    Exit,
}

/// Strahler order per cell. 0 = not part of the network (pruned or never
/// reached); headwaters get 1; order increments where two equal-order
/// tributaries meet.
pub fn strahler_orders(
    direction: &Grid<i32>,
    direction_in: &Grid<u8>,
    accumulation: &Grid<u64>,
    threshold: i32,
) -> Grid<i32> {
    let rows = direction.rows();
    let cols = direction.cols();
    let mut orders = Grid::new(rows, cols, 0i32);
    let mut stack: Vec<(usize, usize, Phase)> = Vec::new();

    for i in 0..rows {
        for j in 0..cols {
            if direction.get(i, j) > 0 {
                continue; // only roots start a walk
            }
            stack.push((i, j, Phase::Enter));
            while let Some((ci, cj, phase)) = stack.pop() {
                match phase {
                    Phase::Enter => {
                        if (accumulation.get(ci, cj) as i64) < threshold as i64 {
                            continue; // pruned: order stays 0
                        }
                        stack.push((ci, cj, Phase::Exit));
                        for_each_inbound(direction_in, ci, cj, |ni, nj| {
                            stack.push((ni, nj, Phase::Enter));
                        });
                    }
                    Phase::Exit => {
                        let mut max_in = 0i32;
                        let mut max_count = 0u32;
                        let mut has_inbound = false;
                        for_each_inbound(direction_in, ci, cj, |ni, nj| {
                            has_inbound = true;
                            let o = orders.get(ni, nj);
                            if o > max_in {
                                max_in = o;
                                max_count = 1;
                            } else if o == max_in {
                                max_count += 1;
                            }
                        });
                        let order = if !has_inbound {
                            1 // headwater
                        } else if max_count >= 2 || max_in == 0 {
                            // Two equal-order tributaries meet, or every
                            // inbound chain was pruned (this cell is then
                            // itself a channel head).
                            max_in + 1
                        } else {
                            max_in
                        };
                        orders.set(ci, cj, order);
                    }
                }
            }
        }
    }
    orders
}

/// Channel mask from Strahler order: `order > threshold`.
pub fn channels_by_strahler(orders: &Grid<i32>, threshold: i32) -> Grid<bool> {
    let mut mask = Grid::new(orders.rows(), orders.cols(), false);
    for i in 0..orders.rows() {
        for j in 0..orders.cols() {
            if orders.get(i, j) > threshold {
                mask.set(i, j, true);
            }
        }
    }
    mask
}

/// Channel mask from raw accumulation: `accumulation > threshold`.
/// Messier channels than the Strahler mask, but useful for picking out
/// broad confluences.
pub fn channels_by_flow(accumulation: &Grid<u64>, threshold: f64) -> Grid<bool> {
    let mut mask = Grid::new(accumulation.rows(), accumulation.cols(), false);
    for i in 0..accumulation.rows() {
        for j in 0..accumulation.cols() {
            if accumulation.get(i, j) as f64 > threshold {
                mask.set(i, j, true);
            }
        }
    }
    mask
}

#[inline]
fn for_each_inbound(
    direction_in: &Grid<u8>,
    i: usize,
    j: usize,
    mut f: impl FnMut(usize, usize),
) {
    let bits = direction_in.get(i, j);
    for &(bit, dx, dy) in &INFLOW_BITS {
        if bits & bit != 0 {
            f((i as isize + dy as isize) as usize, (j as isize + dx as isize) as usize);
        }
    }
}
