//! The terrain driver: couples fBm synthesis with the hydrology engine's
//! year loop and classifies the result into discrete terrain types.
//!
//! Where [`Hydrology`](crate::hydrology::Hydrology) is standard GIS
//! analysis, this layer is game-flavored: terrain categories, wildfires,
//! resource deposits, and an aging loop that alternates erosion with
//! reclassification.
mod resources;
pub mod types;
mod wildfire;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::HydrologyError;
use crate::grid::{blur, mean3x3, Grid};
use crate::hydrology::{AngleUnits, ErosionParams, Hydrology};
use crate::noise::{add_long_range_relief, fbm_heightfield, FbmParams};
use crate::d8;
pub use types::TerrainType;

/// Strahler order above which a cell is drawn as a river.
const RIVER_STRAHLER_THRESHOLD: i32 = 3;
/// Random wildfires started per simulated year.
const WILDFIRES_PER_YEAR: usize = 4;
/// Spread iterations per wildfire.
const WILDFIRE_ITERATIONS: usize = 6;
/// Full classification years run by `new_map` after the fast aging phase.
const CLASSIFIED_YEARS: usize = 20;
/// Minimum positive drop used when filling so flow stays routable.
const DRAINABLE_FILL_EPSILON: f32 = 1e-5;

/// An (x, y) cell reference; x is the column, y the row. Stored as i32
/// because deposit lists go straight into the binary save format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Map-level generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainParams {
    /// Columns.
    pub width: usize,
    /// Rows.
    pub height: usize,
    /// Fast aging years run by `new_map` is `age / 5` (minimum 10).
    pub age: u32,
    /// Enable the channel-bank erosion pass.
    pub use_channel_erosion: bool,
    /// Seed resource deposits after generation.
    pub add_resources: bool,
    /// Bounds of the random blur radius applied to USPED output; the
    /// randomization breaks up grid-aligned artifacts.
    pub usped_min_blur: u32,
    pub usped_max_blur: u32,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            width: 500,
            height: 500,
            age: 20,
            use_channel_erosion: false,
            add_resources: false,
            usped_min_blur: 8,
            usped_max_blur: 30,
        }
    }
}

/// Terrain generator state: the hydrology engine plus everything layered
/// on top of it.
pub struct Terrain {
    fbm: FbmParams,
    params: TerrainParams,
    hydro: Hydrology,
    terrain_type: Grid<TerrainType>,
    /// Burn-iteration stamps from this year's wildfires.
    burned: Grid<i32>,
    c_factor: Grid<f32>,
    iron_deposits: Vec<Point>,
    coal_deposits: Vec<Point>,
    bog_iron_deposits: Vec<Point>,
    stone_deposits: Vec<Point>,
    uranium_deposits: Vec<Point>,
    /// Engine-owned generator: every stochastic decision draws from here,
    /// so a fixed seed reproduces a map exactly.
    rng: StdRng,
}

impl Terrain {
    pub fn new(fbm: FbmParams, params: TerrainParams, erosion: ErosionParams) -> Self {
        let rng = StdRng::seed_from_u64(fbm.seed);
        Self {
            fbm,
            params,
            hydro: Hydrology::new(Grid::empty(), erosion),
            terrain_type: Grid::empty(),
            burned: Grid::empty(),
            c_factor: Grid::empty(),
            iron_deposits: Vec::new(),
            coal_deposits: Vec::new(),
            bog_iron_deposits: Vec::new(),
            stone_deposits: Vec::new(),
            uranium_deposits: Vec::new(),
            rng,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn rows(&self) -> usize {
        self.hydro.rows()
    }

    pub fn cols(&self) -> usize {
        self.hydro.cols()
    }

    /// The seed actually used (resolved from 0 by `new_map`).
    pub fn seed(&self) -> u64 {
        self.fbm.seed
    }

    pub fn fbm_params(&self) -> &FbmParams {
        &self.fbm
    }

    pub fn terrain_params(&self) -> &TerrainParams {
        &self.params
    }

    pub fn hydro(&self) -> &Hydrology {
        &self.hydro
    }

    pub fn hydro_mut(&mut self) -> &mut Hydrology {
        &mut self.hydro
    }

    pub fn terrain_types(&self) -> &Grid<TerrainType> {
        &self.terrain_type
    }

    pub fn burned(&self) -> &Grid<i32> {
        &self.burned
    }

    pub fn burned_at(&self, x: usize, y: usize) -> i32 {
        self.burned.get(y, x)
    }

    pub fn iron_deposits(&self) -> &[Point] {
        &self.iron_deposits
    }

    pub fn coal_deposits(&self) -> &[Point] {
        &self.coal_deposits
    }

    pub fn bog_iron_deposits(&self) -> &[Point] {
        &self.bog_iron_deposits
    }

    pub fn stone_deposits(&self) -> &[Point] {
        &self.stone_deposits
    }

    pub fn uranium_deposits(&self) -> &[Point] {
        &self.uranium_deposits
    }

    // ── Setup ────────────────────────────────────────────────────────────

    /// Size the driver-owned grids to the current heightmap. Called by
    /// `new_map`; call it yourself after binding a heightmap manually.
    pub fn setup(&mut self) {
        let rows = self.rows();
        let cols = self.cols();
        self.terrain_type = Grid::new(rows, cols, TerrainType::Grassland);
        self.burned = Grid::new(rows, cols, 0);
        self.c_factor = Grid::new(rows, cols, self.hydro.params().c);
    }

    /// Replace the heightmap (keeping erosion parameters) and re-size the
    /// driver grids. For externally produced heightmaps.
    pub fn set_heightmap(&mut self, z: Grid<f32>) {
        let params = self.hydro.params().clone();
        self.hydro = Hydrology::new(z, params);
        self.setup();
    }

    /// Install deserialized state and regenerate the transient fields the
    /// save format omits (blurred accumulation, channel mask).
    pub(crate) fn replace_loaded_state(
        &mut self,
        hydro: Hydrology,
        terrain_type: Grid<TerrainType>,
        burned: Grid<i32>,
        cover: f32,
        [iron, coal, bog_iron, stone, uranium]: [Vec<Point>; 5],
    ) {
        self.hydro = hydro;
        self.terrain_type = terrain_type;
        self.burned = burned;
        self.c_factor = Grid::new(self.rows(), self.cols(), cover);
        self.iron_deposits = iron;
        self.coal_deposits = coal;
        self.bog_iron_deposits = bog_iron;
        self.stone_deposits = stone;
        self.uranium_deposits = uranium;

        if !self.hydro.flow_accumulation().is_empty() {
            self.hydro.blur_flow_accumulation().ok();
        }
        if !self.hydro.strahler_order().is_empty() {
            self.hydro.identify_channels_by_strahler(RIVER_STRAHLER_THRESHOLD).ok();
        }
    }

    // ── Generation ───────────────────────────────────────────────────────

    /// Generate a fresh map: fBm heightmap, long-range relief, fast aging,
    /// then fully classified years and (optionally) resource seeding.
    pub fn new_map(&mut self) -> Result<(), HydrologyError> {
        let rows = self.params.height;
        let cols = self.params.width;

        if self.fbm.seed == 0 {
            self.fbm.seed = StdRng::from_entropy().gen_range(1..100_000);
        }
        self.rng = StdRng::seed_from_u64(self.fbm.seed);

        let mut z = fbm_heightfield(&self.fbm, rows, cols, &mut self.rng);
        add_long_range_relief(&mut z, self.fbm.offset_x, self.fbm.offset_y, &mut self.rng);
        let erosion = self.hydro.params().clone();
        self.hydro = Hydrology::new(z, erosion);
        self.setup();

        // Fast aging: erosion without channel bookkeeping, at 5× strength.
        if self.params.age < 10 {
            self.params.age = 10;
        }
        for _ in 0..self.params.age / 5 {
            self.process_year_fast()?;
        }
        self.hydro.calculate_strahler_order()?;
        self.hydro.identify_channels_by_strahler(RIVER_STRAHLER_THRESHOLD)?;

        for _ in 0..CLASSIFIED_YEARS {
            self.process_year()?;
            self.calculate_terrain_types()?;
        }

        if self.params.add_resources {
            self.add_rnd_resource_deposits();
        }
        Ok(())
    }

    /// One full simulated year: wildfires, analysis, erosion, height
    /// update, then the fill/Strahler tail that finds rivers and lakes.
    pub fn process_year(&mut self) -> Result<(), HydrologyError> {
        self.burned.fill_with(0);
        for _ in 0..WILDFIRES_PER_YEAR {
            self.rnd_wildfire(WILDFIRE_ITERATIONS);
        }

        self.hydro.calculate_slope(AngleUnits::Degree)?; // USPED needs degrees
        self.hydro.calculate_direction8(false)?;
        self.hydro.calculate_aspect(AngleUnits::Degree, &mut self.rng)?;
        self.hydro.calculate_flow_accumulation()?;
        self.hydro.blur_flow_accumulation()?;

        // Erosion over the raw terrain so deposition settles in basins.
        self.calc_c_factor_from_terrain_types();
        self.hydro.usped(1.0, Some(&self.c_factor), None, None, &mut self.rng)?;
        self.blur_and_offset_usped_erosion();
        self.additional_erosion_deposition();
        self.adjust_heights_via_erosion_deposition();

        self.process_rivers_and_lakes()
    }

    /// Reduced year for aging: no wildfires, no fill/Strahler bookkeeping,
    /// 5× erosion strength (faster at the cost of more noise artifacts).
    pub fn process_year_fast(&mut self) -> Result<(), HydrologyError> {
        self.hydro.calculate_slope(AngleUnits::Degree)?;
        self.hydro.calculate_direction8(false)?;
        self.hydro.calculate_aspect(AngleUnits::Degree, &mut self.rng)?;
        self.hydro.calculate_flow_accumulation()?;

        self.calc_c_factor_from_terrain_types();
        self.hydro.usped(5.0, Some(&self.c_factor), None, None, &mut self.rng)?;
        self.blur_and_offset_usped_erosion();
        self.adjust_heights_via_erosion_deposition();
        Ok(())
    }

    /// Fill sinks and recompute flow so channels and standing water can be
    /// identified: a drainable fill for routing, a zero-drop fill so true
    /// flats surface as sinks for lake classification.
    pub fn process_rivers_and_lakes(&mut self) -> Result<(), HydrologyError> {
        self.hydro.fill_sinks_wang_liu(DRAINABLE_FILL_EPSILON)?;
        self.hydro.calculate_direction8(true)?;
        self.hydro.calculate_flow_accumulation()?;

        self.hydro.fill_sinks_wang_liu(0.0)?;
        self.hydro.calculate_strahler_order()?;
        // One more pass over the zero-drop fill so lake floors read as
        // sinks when terrain types are assigned.
        self.hydro.calculate_direction8(true)?;

        self.hydro.identify_channels_by_strahler(RIVER_STRAHLER_THRESHOLD)
    }

    // ── Erosion post-processing ──────────────────────────────────────────

    /// Taper the USPED field along the border and blur it with a per-year
    /// random radius.
    fn blur_and_offset_usped_erosion(&mut self) {
        let rows = self.rows();
        let cols = self.cols();
        let r = self.hydro.params().r;

        let min = self.params.usped_min_blur as f32;
        let max = self.params.usped_max_blur as f32;
        let radius = if max > min { self.rng.gen_range(min..max) } else { min };
        let iterations = radius as u32;

        let ed = self.hydro.erosion_deposition_mut();
        for i in 0..rows {
            for j in 0..cols {
                if i == 0 || j == 0 || i == rows - 1 || j == cols - 1 {
                    ed.set(i, j, ed.get(i, j) - r * 0.1);
                }
            }
        }
        blur(ed, iterations, 0.36);
    }

    /// Channel-bank erosion: deposition piles up at valley edges and in
    /// sinks, and cells carrying real flow scour the cell they drain into.
    /// Optional; the effect eventually degrades into artifacts of its own.
    fn additional_erosion_deposition(&mut self) {
        if !self.params.use_channel_erosion {
            return;
        }
        let rows = self.rows();
        let cols = self.cols();
        let mut ed = self.hydro.erosion_deposition().clone();
        let slope = self.hydro.slope();
        let z = self.hydro.heightmap();
        let direction = self.hydro.flow_direction();
        let accumulation = self.hydro.flow_accumulation();

        // Deposition amplification at the edges of valleys: depositing
        // cells that sit below their neighborhood mean catch more.
        for i in 1..rows.saturating_sub(1) {
            for j in 1..cols.saturating_sub(1) {
                let here = ed.get(i, j);
                if here < 0.0 {
                    continue;
                }
                let slope_avg = mean3x3(slope, i, j);
                let z_avg = mean3x3(z, i, j);
                if z_avg > z.get(i, j) {
                    let boost = here * ((slope_avg + 1.0) / (slope.get(i, j) + 1.0)) * 0.2;
                    ed.set(i, j, here + boost);
                }
            }
        }

        for i in 0..rows {
            for j in 0..cols {
                if direction.get(i, j) == d8::SINK {
                    let v = ed.get(i, j);
                    ed.set(i, j, v + (v + 10.0) * 0.06);
                }
                let (ii, jj) = (i as isize, j as isize);
                if ii < 4 || jj < 4 || ii > rows as isize - 4 || jj > cols as isize - 4 {
                    continue;
                }
                if ed.get(i, j) < -10.0 {
                    continue;
                }
                if accumulation.get(i, j) < 10 {
                    continue;
                }

                let extra = (ed.get(i, j) + 10.0) * 0.03;
                let code = direction.get(i, j);
                if code > 0 {
                    let (dx, dy) = d8::offset(code);
                    let ni = (ii + dy as isize) as usize;
                    let nj = (jj + dx as isize) as usize;
                    ed.set(ni, nj, ed.get(ni, nj) - extra * 2.0);
                }
            }
        }

        blur(&mut ed, 2, 0.3);
        *self.hydro.erosion_deposition_mut() = ed;
    }

    /// Apply the erosion/deposition field to the heightmap:
    /// `Δ = ed · converter · U(0.75, 1)`, scaled up on higher ground.
    fn adjust_heights_via_erosion_deposition(&mut self) {
        let converter = self.hydro.params().converter;
        let ed = self.hydro.erosion_deposition().clone();
        let rows = self.rows();
        let cols = self.cols();
        for i in 0..rows {
            for j in 0..cols {
                let delta = ed.get(i, j) * converter * self.rng.gen_range(0.75..1.0);
                let z = self.hydro.heightmap().get(i, j);
                self.hydro.heightmap_mut().set(i, j, z + delta * (0.5 + z * 0.005));
            }
        }
    }

    // ── Classification ───────────────────────────────────────────────────

    /// Refresh the per-cell cover factors from the current terrain types.
    fn calc_c_factor_from_terrain_types(&mut self) {
        for i in 0..self.rows() {
            for j in 0..self.cols() {
                self.c_factor.set(i, j, self.terrain_type.get(i, j).cover_factor());
            }
        }
    }

    /// Classify every cell from the current hydrology fields, then overlay
    /// the stored resource deposits.
    ///
    /// The rules form a first-match table: water and rivers first,
    /// standing forests persist, then elevation/slope/flow bands, with a
    /// random chance of new forest on modestly watered ground.
    pub fn calculate_terrain_types(&mut self) -> Result<(), HydrologyError> {
        for (needed, empty) in [
            ("calculate_slope", self.hydro.slope().is_empty()),
            ("calculate_direction8", self.hydro.flow_direction().is_empty()),
            ("calculate_flow_accumulation", self.hydro.flow_accumulation().is_empty()),
            ("blur_flow_accumulation", self.hydro.blurred_flow_accumulation().is_empty()),
            ("identify_channels_by_strahler", self.hydro.is_channel().is_empty()),
        ] {
            if empty {
                return Err(HydrologyError::MissingPrerequisite {
                    needed,
                    before: "calculate_terrain_types",
                });
            }
        }

        for i in 0..self.rows() {
            for j in 0..self.cols() {
                let direction = self.hydro.flow_direction().get(i, j);
                if direction == d8::SINK {
                    self.terrain_type.set(i, j, TerrainType::StandingWater);
                    continue;
                }
                if self.hydro.is_channel().get(i, j) {
                    self.terrain_type.set(i, j, TerrainType::River);
                    continue;
                }
                // Standing forest survives unless water claimed the cell.
                if self.terrain_type.get(i, j) == TerrainType::Forest
                    && self.hydro.blurred_flow_accumulation().get(i, j) > 2.0
                {
                    continue;
                }

                let z = self.hydro.heightmap().get(i, j);
                let slope = self.hydro.slope().get(i, j);
                let flow = self.hydro.flow_accumulation().get(i, j);
                let blurred = self.hydro.blurred_flow_accumulation().get(i, j);
                // Integer division: the bump collapses to zero once a
                // cell drains more than ten others.
                let bump = (10 / flow) as f32;

                let t = if z > 72.0 && direction == d8::SINK {
                    TerrainType::Glacier
                } else if z + bump > 85.0 {
                    TerrainType::Glacier
                } else if z + bump > 72.0 {
                    TerrainType::Mountain
                } else if z > 45.0 && slope < 15.0 {
                    TerrainType::Plateau
                } else if z < 45.0 && slope < 10.0 && blurred > 10.0 {
                    TerrainType::Valley
                } else if flow > 5
                    && self.burned.get(i, j) < 1
                    && self.rng.gen_range(0.0..1.0f32) < 0.25
                {
                    TerrainType::Forest
                } else {
                    TerrainType::Grassland
                };
                self.terrain_type.set(i, j, t);
            }
        }

        self.overlay_resource_deposits();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_terrain(seed: u64, size: usize) -> Terrain {
        let fbm = FbmParams { seed, ..FbmParams::default() };
        let params = TerrainParams {
            width: size,
            height: size,
            age: 10,
            add_resources: true,
            ..TerrainParams::default()
        };
        Terrain::new(fbm, params, ErosionParams::default())
    }

    #[test]
    fn new_map_produces_classified_terrain() {
        let mut t = small_terrain(42, 24);
        t.new_map().unwrap();
        assert_eq!(t.terrain_types().rows(), 24);
        assert_eq!(t.hydro().flow_accumulation().rows(), 24);
        // Every derived field must share the heightmap's shape.
        assert_eq!(t.hydro().slope().cols(), 24);
        assert_eq!(t.burned().rows(), 24);
    }

    #[test]
    fn new_map_same_seed_is_bit_identical() {
        let mut a = small_terrain(42, 16);
        let mut b = small_terrain(42, 16);
        a.new_map().unwrap();
        b.new_map().unwrap();
        assert_eq!(a.hydro().heightmap(), b.hydro().heightmap());
        assert_eq!(a.terrain_types(), b.terrain_types());
        assert_eq!(a.hydro().flow_accumulation(), b.hydro().flow_accumulation());
        assert_eq!(a.iron_deposits(), b.iron_deposits());
    }

    #[test]
    fn new_map_different_seeds_diverge() {
        let mut a = small_terrain(1, 16);
        let mut b = small_terrain(2, 16);
        a.new_map().unwrap();
        b.new_map().unwrap();
        assert_ne!(a.hydro().heightmap(), b.hydro().heightmap());
    }

    #[test]
    fn zero_seed_is_resolved_to_a_real_seed() {
        let mut t = small_terrain(0, 12);
        t.new_map().unwrap();
        assert_ne!(t.seed(), 0);
    }

    #[test]
    fn age_below_ten_is_clamped() {
        let mut t = small_terrain(7, 12);
        t.params.age = 3;
        t.new_map().unwrap();
        assert_eq!(t.terrain_params().age, 10);
    }

    #[test]
    fn sinks_classify_as_standing_water() {
        // A bowl keeps an interior sink even after the year loop's fills;
        // simpler: craft the state by hand and classify once.
        let mut t = small_terrain(5, 8);
        let mut z = Grid::new(8, 8, 30.0f32);
        z.set(4, 4, 1.0);
        t.set_heightmap(z);
        let mut rng = StdRng::seed_from_u64(1);
        t.hydro.calculate_slope(AngleUnits::Degree).unwrap();
        t.hydro.calculate_direction8(false).unwrap();
        t.hydro.calculate_aspect(AngleUnits::Degree, &mut rng).unwrap();
        t.hydro.calculate_flow_accumulation().unwrap();
        t.hydro.blur_flow_accumulation().unwrap();
        t.hydro.calculate_strahler_order().unwrap();
        t.hydro.identify_channels_by_strahler(RIVER_STRAHLER_THRESHOLD).unwrap();
        t.calculate_terrain_types().unwrap();
        assert_eq!(t.terrain_types().get(4, 4), TerrainType::StandingWater);
    }

    #[test]
    fn high_flat_cells_classify_as_glacier_or_mountain() {
        let mut t = small_terrain(5, 8);
        // Gentle east-draining ramp high above the glacier line.
        let mut z = Grid::new(8, 8, 0.0f32);
        for i in 0..8 {
            for j in 0..8 {
                z.set(i, j, 95.0 - j as f32 * 0.5);
            }
        }
        t.set_heightmap(z);
        let mut rng = StdRng::seed_from_u64(2);
        t.hydro.calculate_slope(AngleUnits::Degree).unwrap();
        t.hydro.calculate_direction8(false).unwrap();
        t.hydro.calculate_aspect(AngleUnits::Degree, &mut rng).unwrap();
        t.hydro.calculate_flow_accumulation().unwrap();
        t.hydro.blur_flow_accumulation().unwrap();
        t.hydro.calculate_strahler_order().unwrap();
        t.hydro.identify_channels_by_strahler(RIVER_STRAHLER_THRESHOLD).unwrap();
        t.calculate_terrain_types().unwrap();
        for i in 0..8 {
            for j in 0..8 {
                let tt = t.terrain_types().get(i, j);
                assert!(
                    matches!(tt, TerrainType::Glacier | TerrainType::Mountain),
                    "expected high ground at ({i},{j}), got {tt:?}"
                );
            }
        }
    }

    #[test]
    fn classification_without_channels_is_rejected() {
        let mut t = small_terrain(5, 8);
        t.set_heightmap(Grid::new(8, 8, 10.0));
        assert!(t.calculate_terrain_types().is_err());
    }

    #[test]
    fn cover_factors_track_terrain_types() {
        let mut t = small_terrain(5, 6);
        t.set_heightmap(Grid::new(6, 6, 10.0));
        t.terrain_type.set(0, 0, TerrainType::Forest);
        t.terrain_type.set(0, 1, TerrainType::Plateau);
        t.calc_c_factor_from_terrain_types();
        assert_eq!(t.c_factor.get(0, 0), 0.3);
        assert_eq!(t.c_factor.get(0, 1), 0.7);
        assert_eq!(t.c_factor.get(1, 1), 0.6); // grassland default
    }
}
