//! Terrain categories and their USPED cover factors.
//!
//! Designed with a tile-based city-building or 4X game in mind: broad
//! land classes plus a handful of resources expressed as terrain types.
use serde::{Deserialize, Serialize};

/// Discrete terrain classification of one cell.
///
/// The discriminants are stable: they are what the binary save format
/// stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum TerrainType {
    #[default]
    Grassland = 0,
    Forest = 1,
    Valley = 2,
    Mountain = 3,
    Glacier = 4,
    Plateau = 5,
    StandingWater = 6,
    River = 7,
    Iron = 8,
    Coal = 9,
    Stone = 10,
    BogIron = 11,
    Uranium = 12,
}

impl TerrainType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Grassland => "Grassland",
            Self::Forest => "Forest",
            Self::Valley => "Valley",
            Self::Mountain => "Mountain",
            Self::Glacier => "Glacier",
            Self::Plateau => "Plateau",
            Self::StandingWater => "Standing Water",
            Self::River => "River",
            Self::Iron => "Iron",
            Self::Coal => "Coal",
            Self::Stone => "Stone",
            Self::BogIron => "Bog Iron",
            Self::Uranium => "Uranium",
        }
    }

    /// USPED cover factor for this class. Forest shields the soil, bare
    /// plateau erodes fastest, everything unlisted sits at the neutral 0.5.
    pub fn cover_factor(self) -> f32 {
        match self {
            Self::Grassland => 0.6,
            Self::Forest => 0.3,
            Self::Valley => 0.6,
            Self::Mountain => 0.5,
            Self::Glacier => 0.5,
            Self::Plateau => 0.7,
            Self::StandingWater => 0.4,
            Self::River => 0.5,
            _ => 0.5,
        }
    }

    /// Can a wildfire spread into this cell?
    pub fn is_flammable(self) -> bool {
        matches!(self, Self::Grassland | Self::Forest | Self::Valley)
    }

    pub fn to_index(self) -> i32 {
        self as i32
    }

    /// Inverse of [`to_index`](Self::to_index); unknown values fall back
    /// to Grassland (a truncated save is a user problem, not a panic).
    pub fn from_index(v: i32) -> Self {
        match v {
            1 => Self::Forest,
            2 => Self::Valley,
            3 => Self::Mountain,
            4 => Self::Glacier,
            5 => Self::Plateau,
            6 => Self::StandingWater,
            7 => Self::River,
            8 => Self::Iron,
            9 => Self::Coal,
            10 => Self::Stone,
            11 => Self::BogIron,
            12 => Self::Uranium,
            _ => Self::Grassland,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_round_trip_is_stable() {
        for v in 0..13 {
            assert_eq!(TerrainType::from_index(v).to_index(), v);
        }
        assert_eq!(TerrainType::from_index(99), TerrainType::Grassland);
    }

    #[test]
    fn cover_factors_match_the_classification_table() {
        assert_eq!(TerrainType::Grassland.cover_factor(), 0.6);
        assert_eq!(TerrainType::Forest.cover_factor(), 0.3);
        assert_eq!(TerrainType::Plateau.cover_factor(), 0.7);
        assert_eq!(TerrainType::StandingWater.cover_factor(), 0.4);
        assert_eq!(TerrainType::Uranium.cover_factor(), 0.5);
    }

    #[test]
    fn only_vegetated_land_burns() {
        assert!(TerrainType::Grassland.is_flammable());
        assert!(TerrainType::Forest.is_flammable());
        assert!(TerrainType::Valley.is_flammable());
        assert!(!TerrainType::Mountain.is_flammable());
        assert!(!TerrainType::River.is_flammable());
        assert!(!TerrainType::Iron.is_flammable());
    }
}
