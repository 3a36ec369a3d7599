//! Sequential binary persistence for [`Terrain`].
//!
//! Layout, little-endian throughout: each grid is two i32 dimensions
//! (rows, cols) followed by its elements row-major; each deposit list is
//! one i32 length followed by (x, y) i32 pairs. Grids appear in a fixed
//! order; the blurred accumulation and channel mask are transient and are
//! regenerated after load instead of stored.
use std::io::{self, Read, Write};

use crate::grid::Grid;
use crate::hydrology::Hydrology;
use crate::terrain::{Point, Terrain, TerrainType};

/// Fixed-width little-endian element codec.
trait Element: Copy {
    fn write_to<W: Write>(self, w: &mut W) -> io::Result<()>;
    fn read_from<R: Read>(r: &mut R) -> io::Result<Self>;
}

macro_rules! impl_element {
    ($($t:ty),*) => {$(
        impl Element for $t {
            fn write_to<W: Write>(self, w: &mut W) -> io::Result<()> {
                w.write_all(&self.to_le_bytes())
            }
            fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                r.read_exact(&mut buf)?;
                Ok(<$t>::from_le_bytes(buf))
            }
        }
    )*};
}
impl_element!(f32, i32, u8, u64);

fn write_grid<T: Element, W: Write>(grid: &Grid<T>, w: &mut W) -> io::Result<()> {
    (grid.rows() as i32).write_to(w)?;
    (grid.cols() as i32).write_to(w)?;
    for &v in grid.data() {
        v.write_to(w)?;
    }
    Ok(())
}

fn read_grid<T: Element, R: Read>(r: &mut R) -> io::Result<Grid<T>> {
    let rows = i32::read_from(r)?;
    let cols = i32::read_from(r)?;
    if rows < 0 || cols < 0 {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "negative grid dimension"));
    }
    let (rows, cols) = (rows as usize, cols as usize);
    let mut data = Vec::with_capacity(rows * cols);
    for _ in 0..rows * cols {
        data.push(T::read_from(r)?);
    }
    Ok(Grid::from_vec(rows, cols, data))
}

fn write_points<W: Write>(points: &[Point], w: &mut W) -> io::Result<()> {
    (points.len() as i32).write_to(w)?;
    for p in points {
        p.x.write_to(w)?;
        p.y.write_to(w)?;
    }
    Ok(())
}

fn read_points<R: Read>(r: &mut R) -> io::Result<Vec<Point>> {
    let len = i32::read_from(r)?;
    if len < 0 {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "negative vector length"));
    }
    let mut points = Vec::with_capacity(len as usize);
    for _ in 0..len {
        let x = i32::read_from(r)?;
        let y = i32::read_from(r)?;
        points.push(Point { x, y });
    }
    Ok(points)
}

fn write_type_grid<W: Write>(grid: &Grid<TerrainType>, w: &mut W) -> io::Result<()> {
    (grid.rows() as i32).write_to(w)?;
    (grid.cols() as i32).write_to(w)?;
    for &t in grid.data() {
        t.to_index().write_to(w)?;
    }
    Ok(())
}

fn read_type_grid<R: Read>(r: &mut R) -> io::Result<Grid<TerrainType>> {
    let raw: Grid<i32> = read_grid(r)?;
    let data = raw.data().iter().map(|&v| TerrainType::from_index(v)).collect();
    Ok(Grid::from_vec(raw.rows(), raw.cols(), data))
}

impl Terrain {
    /// Serialize every owned grid and deposit list.
    pub fn save<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let hydro = self.hydro();
        write_grid(hydro.heightmap(), out)?;
        write_grid(hydro.heightmap_filled(), out)?;
        write_grid(hydro.flow_accumulation(), out)?;
        write_grid(hydro.flow_direction(), out)?;
        write_grid(hydro.flow_direction_in(), out)?;
        write_grid(hydro.slope(), out)?;
        write_grid(hydro.aspect(), out)?;
        write_grid(hydro.strahler_order(), out)?;
        write_type_grid(self.terrain_types(), out)?;
        write_grid(hydro.erosion_deposition(), out)?;
        write_grid(self.burned(), out)?;

        write_points(self.iron_deposits(), out)?;
        write_points(self.coal_deposits(), out)?;
        write_points(self.bog_iron_deposits(), out)?;
        write_points(self.stone_deposits(), out)?;
        write_points(self.uranium_deposits(), out)
    }

    /// Rebuild state from a [`save`](Self::save) stream, keeping the
    /// current parameters, then regenerate the transient fields (blurred
    /// accumulation, channel mask) that the format does not store.
    pub fn load<R: Read>(&mut self, input: &mut R) -> io::Result<()> {
        let z: Grid<f32> = read_grid(input)?;
        let z_filled: Grid<f32> = read_grid(input)?;
        let flow_accumulation: Grid<u64> = read_grid(input)?;
        let flow_direction: Grid<i32> = read_grid(input)?;
        let flow_direction_in: Grid<u8> = read_grid(input)?;
        let slope: Grid<f32> = read_grid(input)?;
        let aspect: Grid<f32> = read_grid(input)?;
        let strahler_order: Grid<i32> = read_grid(input)?;
        let terrain_type = read_type_grid(input)?;
        let erosion_deposition: Grid<f32> = read_grid(input)?;
        let burned: Grid<i32> = read_grid(input)?;

        let iron = read_points(input)?;
        let coal = read_points(input)?;
        let bog_iron = read_points(input)?;
        let stone = read_points(input)?;
        let uranium = read_points(input)?;

        let params = self.hydro().params().clone();
        let cover = params.c;
        let mut hydro = Hydrology::new(z, params);
        hydro.restore(
            z_filled,
            flow_direction,
            flow_direction_in,
            flow_accumulation,
            slope,
            aspect,
            strahler_order,
            erosion_deposition,
        );
        self.replace_loaded_state(
            hydro,
            terrain_type,
            burned,
            cover,
            [iron, coal, bog_iron, stone, uranium],
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrology::ErosionParams;
    use crate::noise::FbmParams;
    use crate::terrain::TerrainParams;

    fn generated_terrain(seed: u64) -> Terrain {
        let fbm = FbmParams { seed, ..FbmParams::default() };
        let params = TerrainParams {
            width: 16,
            height: 16,
            age: 10,
            add_resources: true,
            ..TerrainParams::default()
        };
        let mut t = Terrain::new(fbm, params, ErosionParams::default());
        t.new_map().unwrap();
        t
    }

    fn fresh_terrain() -> Terrain {
        Terrain::new(
            FbmParams::default(),
            TerrainParams { width: 16, height: 16, ..TerrainParams::default() },
            ErosionParams::default(),
        )
    }

    #[test]
    fn save_load_round_trips_bytewise() {
        let original = generated_terrain(42);
        let mut bytes = Vec::new();
        original.save(&mut bytes).unwrap();

        let mut restored = fresh_terrain();
        restored.load(&mut bytes.as_slice()).unwrap();

        let mut again = Vec::new();
        restored.save(&mut again).unwrap();
        assert_eq!(bytes, again, "second save must be bytewise identical");
    }

    #[test]
    fn load_restores_every_field() {
        let original = generated_terrain(7);
        let mut bytes = Vec::new();
        original.save(&mut bytes).unwrap();

        let mut restored = fresh_terrain();
        restored.load(&mut bytes.as_slice()).unwrap();

        assert_eq!(restored.hydro().heightmap(), original.hydro().heightmap());
        assert_eq!(restored.hydro().heightmap_filled(), original.hydro().heightmap_filled());
        assert_eq!(restored.hydro().flow_accumulation(), original.hydro().flow_accumulation());
        assert_eq!(restored.hydro().flow_direction(), original.hydro().flow_direction());
        assert_eq!(restored.hydro().flow_direction_in(), original.hydro().flow_direction_in());
        assert_eq!(restored.hydro().slope(), original.hydro().slope());
        assert_eq!(restored.hydro().aspect(), original.hydro().aspect());
        assert_eq!(restored.hydro().strahler_order(), original.hydro().strahler_order());
        assert_eq!(restored.hydro().erosion_deposition(), original.hydro().erosion_deposition());
        assert_eq!(restored.terrain_types(), original.terrain_types());
        assert_eq!(restored.burned(), original.burned());
        assert_eq!(restored.iron_deposits(), original.iron_deposits());
        assert_eq!(restored.stone_deposits(), original.stone_deposits());
    }

    #[test]
    fn load_regenerates_transient_fields() {
        let original = generated_terrain(9);
        let mut bytes = Vec::new();
        original.save(&mut bytes).unwrap();

        let mut restored = fresh_terrain();
        restored.load(&mut bytes.as_slice()).unwrap();
        // Neither the blurred accumulation nor the channel mask is in the
        // stream, yet both must be available after load. The channel mask
        // comes straight from the stored Strahler orders and matches; the
        // blurred accumulation is re-derived from the stored (post-fill)
        // accumulation, so only shape and presence are guaranteed.
        assert_eq!(restored.hydro().is_channel(), original.hydro().is_channel());
        let blurred = restored.hydro().blurred_flow_accumulation();
        assert_eq!(blurred.rows(), original.rows());
        assert_eq!(blurred.cols(), original.cols());
    }

    #[test]
    fn truncated_stream_is_an_error_not_a_panic() {
        let original = generated_terrain(3);
        let mut bytes = Vec::new();
        original.save(&mut bytes).unwrap();
        bytes.truncate(bytes.len() / 2);

        let mut restored = fresh_terrain();
        assert!(restored.load(&mut bytes.as_slice()).is_err());
    }

    #[test]
    fn empty_derived_grids_round_trip() {
        // A terrain saved before any analysis has 0×0 derived grids.
        let mut t = fresh_terrain();
        t.set_heightmap(Grid::new(4, 4, 1.0));
        let mut bytes = Vec::new();
        t.save(&mut bytes).unwrap();
        let mut restored = fresh_terrain();
        restored.load(&mut bytes.as_slice()).unwrap();
        assert!(restored.hydro().slope().is_empty());
        assert_eq!(restored.hydro().heightmap(), t.hydro().heightmap());
    }
}
