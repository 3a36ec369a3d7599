//! Procedural terrain generation by geomorphological simulation.
//!
//! Fractal noise builds an initial heightmap; repeated "years" of
//! slope/aspect analysis, D8 flow accumulation, Wang–Liu sink filling,
//! Strahler stream ordering, and USPED erosion/deposition rewrite it into
//! a landscape with rivers, lakes, valleys and mountains, classified into
//! discrete terrain types with wildfires and resource deposits layered on
//! top.
//!
//! Entry points: [`terrain::Terrain`] drives full map generation;
//! [`hydrology::Hydrology`] exposes the underlying analyses for use on
//! arbitrary heightmaps.
pub mod d8;
pub mod error;
pub mod grid;
pub mod hydrology;
pub mod noise;
mod persist;
pub mod terrain;

pub use error::HydrologyError;
pub use grid::Grid;
pub use hydrology::{AngleUnits, ErosionParams, Hydrology, PrevailingRill};
pub use noise::FbmParams;
pub use terrain::{Terrain, TerrainParams, TerrainType};
