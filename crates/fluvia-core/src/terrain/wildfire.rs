//! Wildfire cellular automaton.
//!
//! A fire seeds one cell and spreads iteration by iteration to flammable
//! 8-neighbors (grassland, forest, valley). Grassland carries fire much
//! better than forest canopy, forest that ignites burns down to
//! grassland, and every ignited cell records the iteration it caught in;
//! the year's classification pass uses those stamps to suppress regrowth
//! on scorched ground.
use rand::Rng;

use super::{Terrain, TerrainType};
use crate::grid::Grid;

/// Base ignition probability per neighbor per iteration.
const IGNITE_BASE: f32 = 0.1;
/// Ignition multiplier floor (burning forest), raised to 1.2 for grass.
const IGNITE_CARRY: f32 = 0.2;

impl Terrain {
    /// Start a wildfire at a random interior cell. Wet cells (high flow or
    /// standing water), bare mountain, and ground already burned this year
    /// refuse to ignite.
    pub fn rnd_wildfire(&mut self, iterations: usize) {
        let rows = self.rows();
        let cols = self.cols();
        // Keep the seed far enough from the border that spreading never
        // needs a bounds check.
        if cols <= 2 * iterations + 2 || rows <= 2 * iterations + 2 || self.burned.is_empty() {
            return;
        }
        let x = self
            .rng
            .gen_range(iterations as f32..(cols - iterations) as f32) as usize;
        let y = self
            .rng
            .gen_range(iterations as f32..(rows - iterations) as f32) as usize;

        let t = self.terrain_types().get(y, x);
        let wet = !self.hydro().flow_accumulation().is_empty()
            && self.hydro().flow_accumulation().get(y, x) > 10;
        if t == TerrainType::Mountain || t == TerrainType::StandingWater || wet {
            return;
        }
        if self.burned.get(y, x) >= 1 {
            return;
        }
        self.wildfire(x, y, iterations);
    }

    /// Run a wildfire seeded at `(x, y)` for `iterations` spread steps and
    /// fold the burn stamps into the persistent burn grid.
    pub fn wildfire(&mut self, x: usize, y: usize, iterations: usize) {
        let rows = self.rows();
        let cols = self.cols();
        if rows < 3 || cols < 3 || self.terrain_type.is_empty() || self.burned.is_empty() {
            return;
        }

        // Pull the seed inward so the spread radius stays inside the map;
        // maps too small for the radius seed at their centre.
        let x = clamp_inward(x, iterations, cols);
        let y = clamp_inward(y, iterations, rows);

        let mut new_burned = Grid::new(rows, cols, 0i32);
        new_burned.set(y, x, 1);

        for iteration in 1..=iterations {
            self.wildfire_iteration(&mut new_burned, iteration as i32);
        }

        for i in 1..rows - 1 {
            for j in 1..cols - 1 {
                let total = self.burned.get(i, j) + new_burned.get(i, j);
                self.burned.set(i, j, total);
            }
        }
    }

    /// One spread step over the whole grid.
    fn wildfire_iteration(&mut self, new_burned: &mut Grid<i32>, iteration: i32) {
        let rows = self.rows();
        let cols = self.cols();
        for i in 1..rows - 1 {
            for j in 1..cols - 1 {
                if new_burned.get(i, j) < 1 {
                    continue;
                }
                let carry = if self.terrain_type.get(i, j) == TerrainType::Grassland {
                    IGNITE_CARRY + 1.0
                } else {
                    IGNITE_CARRY
                };
                for dy in -1i32..=1 {
                    for dx in -1i32..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let ni = (i as isize + dy as isize) as usize;
                        let nj = (j as isize + dx as isize) as usize;
                        if new_burned.get(ni, nj) > 0 {
                            continue;
                        }
                        if !self.terrain_type.get(ni, nj).is_flammable() {
                            continue;
                        }
                        if self.rng.gen_range(0.0..1.0f32) < IGNITE_BASE * carry {
                            new_burned.set(ni, nj, iteration);
                            if self.terrain_type.get(ni, nj) == TerrainType::Forest {
                                self.terrain_type.set(ni, nj, TerrainType::Grassland);
                            }
                        }
                    }
                }
            }
        }
    }
}

fn clamp_inward(v: usize, radius: usize, extent: usize) -> usize {
    let lo = radius + 1;
    let hi = extent.saturating_sub(radius + 1);
    if hi < lo {
        (extent - 1) / 2
    } else {
        v.clamp(lo, hi)
    }
}
