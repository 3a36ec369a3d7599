//! Resource deposit seeding and overlay.
//!
//! Deposits are stored as index-based point lists, not cells: the
//! heightmap keeps eroding underneath them, and classification re-applies
//! them every year from the lists. Probability branches short-circuit, so
//! within a branch the first roll that fires claims the cell.
use rand::Rng;

use super::{Point, Terrain, TerrainType};

impl Terrain {
    /// Roll deposits for every cell according to its terrain type.
    ///
    /// Ore likes high, steep ground: iron and coal on mountains, plateaus
    /// and scarps, a rare uranium trace. Valleys get bog iron; everything
    /// that is not mountain can carry surface stone.
    pub fn add_rnd_resource_deposits(&mut self) {
        let rows = self.rows();
        let cols = self.cols();
        for i in 0..rows {
            for j in 0..cols {
                let t = self.terrain_type.get(i, j);
                let point = Point { x: j as i32, y: i as i32 };

                if t == TerrainType::Mountain
                    || t == TerrainType::Plateau
                    || self.hydro.slope().get(i, j) > 35.0
                {
                    if self.rng.gen_range(0.0..1.0f32) < 0.01 {
                        self.iron_deposits.push(point);
                    } else if self.rng.gen_range(0.0..1.0f32) < 0.01 {
                        self.coal_deposits.push(point);
                    } else if self.rng.gen_range(0.0..1.0f32) < 0.0007 {
                        self.uranium_deposits.push(point);
                    }
                }

                if t == TerrainType::Valley {
                    if self.rng.gen_range(0.0..1.0f32) < 0.005 {
                        self.bog_iron_deposits.push(point);
                    }
                } else if t != TerrainType::Mountain && self.rng.gen_range(0.0..1.0f32) < 0.01 {
                    self.stone_deposits.push(point);
                }
            }
        }
    }

    /// Stamp stored deposits back onto the classified map. Water wins:
    /// a flooded deposit stays hidden until the lake drains.
    pub(super) fn overlay_resource_deposits(&mut self) {
        let lists: [(&[Point], TerrainType); 5] = [
            (&self.iron_deposits, TerrainType::Iron),
            (&self.coal_deposits, TerrainType::Coal),
            (&self.bog_iron_deposits, TerrainType::BogIron),
            (&self.stone_deposits, TerrainType::Stone),
            (&self.uranium_deposits, TerrainType::Uranium),
        ];
        let mut stamped: Vec<(usize, usize, TerrainType)> = Vec::new();
        for (list, t) in lists {
            for p in list {
                stamped.push((p.y as usize, p.x as usize, t));
            }
        }
        for (i, j, t) in stamped {
            if self.terrain_type.get(i, j) != TerrainType::StandingWater {
                self.terrain_type.set(i, j, t);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::hydrology::{AngleUnits, ErosionParams};
    use crate::noise::FbmParams;
    use crate::terrain::TerrainParams;

    fn terrain(size: usize, seed: u64) -> Terrain {
        let fbm = FbmParams { seed, ..FbmParams::default() };
        let params = TerrainParams { width: size, height: size, ..TerrainParams::default() };
        let mut t = Terrain::new(fbm, params, ErosionParams::default());
        t.set_heightmap(Grid::new(size, size, 10.0));
        t.hydro.calculate_slope(AngleUnits::Degree).unwrap();
        t
    }

    #[test]
    fn mountains_collect_ore_valleys_collect_bog_iron() {
        let mut t = terrain(64, 11);
        for i in 0..64 {
            for j in 0..32 {
                t.terrain_type.set(i, j, TerrainType::Mountain);
            }
        }
        for i in 0..64 {
            for j in 32..64 {
                t.terrain_type.set(i, j, TerrainType::Valley);
            }
        }
        t.add_rnd_resource_deposits();

        assert!(!t.iron_deposits().is_empty() || !t.coal_deposits().is_empty());
        for p in t.iron_deposits() {
            assert!(p.x < 32, "iron must come from the mountain half, got x={}", p.x);
        }
        for p in t.bog_iron_deposits() {
            assert!(p.x >= 32, "bog iron must come from the valley half, got x={}", p.x);
        }
        // Mountains never roll stone; valleys never roll stone either
        // (the stone branch is the valley check's else).
        assert!(t.stone_deposits().is_empty());
    }

    #[test]
    fn grassland_rolls_stone_but_no_ore() {
        let mut t = terrain(64, 12);
        t.add_rnd_resource_deposits();
        assert!(t.iron_deposits().is_empty());
        assert!(t.coal_deposits().is_empty());
        assert!(t.uranium_deposits().is_empty());
        assert!(
            !t.stone_deposits().is_empty(),
            "4096 grassland cells at 1% should yield some stone"
        );
    }

    #[test]
    fn overlay_skips_standing_water() {
        let mut t = terrain(8, 13);
        t.iron_deposits.push(Point { x: 2, y: 3 });
        t.iron_deposits.push(Point { x: 5, y: 5 });
        t.terrain_type.set(5, 5, TerrainType::StandingWater);
        t.overlay_resource_deposits();
        assert_eq!(t.terrain_types().get(3, 2), TerrainType::Iron);
        assert_eq!(t.terrain_types().get(5, 5), TerrainType::StandingWater);
    }

    #[test]
    fn deposits_survive_reclassification() {
        // Deposits are point lists, so a later overlay pass re-stamps them
        // even after the underlying classification changed.
        let mut t = terrain(8, 14);
        t.stone_deposits.push(Point { x: 1, y: 1 });
        t.overlay_resource_deposits();
        assert_eq!(t.terrain_types().get(1, 1), TerrainType::Stone);
        t.terrain_type.set(1, 1, TerrainType::Grassland);
        t.overlay_resource_deposits();
        assert_eq!(t.terrain_types().get(1, 1), TerrainType::Stone);
    }
}
