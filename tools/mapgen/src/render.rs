//! Colour mapping and BMP output for the generated maps.
//!
//! Scalar fields go through a [`ColorRamp`] (piecewise-linear gradient
//! between sorted stops, clamped at the ends); terrain types use a fixed
//! palette. The composite map lights the terrain palette with a
//! slope/aspect hillshade blended by alpha.
use std::path::Path;

use anyhow::{Context, Result};
use fluvia_core::terrain::TerrainType;
use fluvia_core::Grid;
use image::{ImageFormat, RgbImage};

/// RGBA colour with f32 channels in 0–255 (alpha drives blending only).
pub type Rgba = [f32; 4];

pub fn rgb(hex: u32) -> Rgba {
    [
        ((hex >> 16) & 0xFF) as f32,
        ((hex >> 8) & 0xFF) as f32,
        (hex & 0xFF) as f32,
        255.0,
    ]
}

pub fn rgba(hex: u32, alpha: f32) -> Rgba {
    let mut c = rgb(hex);
    c[3] = alpha;
    c
}

pub fn gray(v: f32) -> Rgba {
    [v, v, v, 255.0]
}

/// Blend `over` onto `base` using `over`'s alpha.
pub fn blend_alpha(base: Rgba, over: Rgba) -> Rgba {
    let a = over[3] / 255.0;
    [
        base[0] * (1.0 - a) + over[0] * a,
        base[1] * (1.0 - a) + over[1] * a,
        base[2] * (1.0 - a) + over[2] * a,
        255.0,
    ]
}

/// Piecewise-linear colour gradient over value stops.
pub struct ColorRamp {
    stops: Vec<(f32, Rgba)>,
}

impl ColorRamp {
    /// Build a ramp; stops are sorted by value. At least one stop.
    pub fn new(mut stops: Vec<(f32, Rgba)>) -> Self {
        assert!(!stops.is_empty(), "a colour ramp needs at least one stop");
        stops.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { stops }
    }

    /// Sample the gradient; values outside the stop range clamp to the
    /// end colours.
    pub fn sample(&self, v: f32) -> Rgba {
        let first = self.stops[0];
        let last = self.stops[self.stops.len() - 1];
        if v <= first.0 {
            return first.1;
        }
        if v >= last.0 {
            return last.1;
        }
        let mut lo = first;
        for &stop in &self.stops[1..] {
            if v <= stop.0 {
                let span = stop.0 - lo.0;
                let t = if span > 0.0 { (v - lo.0) / span } else { 1.0 };
                return [
                    lo.1[0] + (stop.1[0] - lo.1[0]) * t,
                    lo.1[1] + (stop.1[1] - lo.1[1]) * t,
                    lo.1[2] + (stop.1[2] - lo.1[2]) * t,
                    lo.1[3] + (stop.1[3] - lo.1[3]) * t,
                ];
            }
            lo = stop;
        }
        last.1
    }
}

/// Fixed palette for the terrain-type map.
pub fn terrain_color(t: TerrainType) -> Rgba {
    match t {
        TerrainType::Grassland => rgb(0x6aa961),
        TerrainType::Forest => rgb(0x264d42),
        TerrainType::Valley => rgb(0x337b55),
        TerrainType::Mountain => rgb(0x909294),
        TerrainType::Glacier => rgb(0xeef5ff),
        TerrainType::Plateau => rgb(0x6f5d53),
        TerrainType::StandingWater => rgb(0x3b6dca),
        TerrainType::River => rgb(0x2f5eb5),
        TerrainType::Iron => rgb(0xb3744e),
        TerrainType::Coal => rgb(0x151564),
        TerrainType::Stone => rgb(0x989aa5),
        TerrainType::BogIron => rgb(0x547d83),
        TerrainType::Uranium => rgb(0x51ff4f),
    }
}

/// Hillshade ramp for the composite map: warm highlight on lit slopes,
/// deep blue-black in shadow; alpha carries the blend strength.
pub fn shade_ramp() -> ColorRamp {
    ColorRamp::new(vec![
        (1.0, rgba(0xfff0be, 100.0)),
        (0.0, rgba(0xaca39d, 0.0)),
        (-0.3, rgba(0x3c3939, 90.0)),
        (-1.0, rgba(0x141928, 180.0)),
    ])
}

/// Signed light factor for a cell: slope sets the strength, aspect picks
/// highlight (north-east-facing) or shadow (south-west-facing).
pub fn shade_factor(slope_deg: f32, aspect_deg: f32) -> f32 {
    let mut opacity = ((slope_deg / 15.0).round()) / 2.0;
    if opacity > 1.0 {
        opacity = 1.0;
    }
    let a = aspect_deg;
    if a <= -1.0 {
        0.0
    } else if a <= 0.0 || a > 315.0 {
        opacity * -0.9
    } else if a <= 45.0 {
        opacity * 0.8
    } else if a <= 90.0 {
        opacity * 0.9
    } else if a <= 135.0 {
        opacity
    } else if a <= 180.0 {
        opacity * 0.9
    } else if a <= 225.0 {
        opacity * -0.9
    } else {
        // 225–315: full shadow.
        opacity * -1.0
    }
}

/// Write a colour function over a grid-shaped domain as an uncompressed
/// 24-bit BMP.
pub fn save_bmp(
    path: &Path,
    rows: usize,
    cols: usize,
    color_at: impl Fn(usize, usize) -> Rgba,
) -> Result<()> {
    let img = RgbImage::from_fn(cols as u32, rows as u32, |x, y| {
        let c = color_at(y as usize, x as usize);
        image::Rgb([
            c[0].clamp(0.0, 255.0) as u8,
            c[1].clamp(0.0, 255.0) as u8,
            c[2].clamp(0.0, 255.0) as u8,
        ])
    });
    img.save_with_format(path, ImageFormat::Bmp)
        .with_context(|| format!("writing {}", path.display()))
}

/// Convenience: render a `Grid<f32>` through a ramp.
pub fn save_scalar_bmp(path: &Path, grid: &Grid<f32>, ramp: &ColorRamp) -> Result<()> {
    save_bmp(path, grid.rows(), grid.cols(), |i, j| ramp.sample(grid.get(i, j)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_interpolates_between_stops() {
        let ramp = ColorRamp::new(vec![(0.0, gray(0.0)), (100.0, gray(255.0))]);
        let mid = ramp.sample(50.0);
        assert!((mid[0] - 127.5).abs() < 0.01, "got {}", mid[0]);
    }

    #[test]
    fn ramp_clamps_outside_range() {
        let ramp = ColorRamp::new(vec![(0.0, gray(0.0)), (100.0, gray(255.0))]);
        assert_eq!(ramp.sample(-50.0)[0], 0.0);
        assert_eq!(ramp.sample(500.0)[0], 255.0);
    }

    #[test]
    fn ramp_accepts_unsorted_stops() {
        let ramp = ColorRamp::new(vec![(100.0, gray(255.0)), (0.0, gray(0.0))]);
        assert!(ramp.sample(25.0)[0] < ramp.sample(75.0)[0]);
    }

    #[test]
    fn shade_flips_sign_across_the_light_axis() {
        // North-east faces catch light, south-west faces fall into shadow.
        let lit = shade_factor(30.0, 100.0);
        let dark = shade_factor(30.0, 250.0);
        assert!(lit > 0.0);
        assert!(dark < 0.0);
    }

    #[test]
    fn flat_ground_has_no_shade() {
        assert_eq!(shade_factor(0.0, 100.0), 0.0);
    }

    #[test]
    fn alpha_blend_is_linear_in_alpha() {
        let base = gray(0.0);
        let over = [255.0, 255.0, 255.0, 127.5];
        let out = blend_alpha(base, over);
        assert!((out[0] - 127.5).abs() < 0.01);
    }
}
