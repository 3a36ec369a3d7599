//! Interactive terrain generation driver.
//!
//! Reads `config.ini` from the working directory, generates a map, writes
//! the six diagnostic BMPs (suffixed with the seed), and offers to keep
//! aging the landscape in 100-"year" rounds.
mod config;
mod render;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use fluvia_core::hydrology::PrevailingRill;
use fluvia_core::{ErosionParams, FbmParams, Terrain, TerrainParams};

use config::Config;
use render::{
    blend_alpha, gray, rgb, save_bmp, save_scalar_bmp, shade_factor, shade_ramp, terrain_color,
    ColorRamp,
};

fn main() -> Result<()> {
    let cfg = Config::load(Path::new("config.ini"));

    let fbm = FbmParams {
        seed: cfg.get("seed") as u64,
        octaves: cfg.get("octaves") as u32,
        offset_x: cfg.get("offsetX") as i32,
        offset_y: cfg.get("offsetY") as i32,
        scale: cfg.get("scale"),
        lacunarity: cfg.get("lacunarity"),
        hurst: cfg.get("H"),
        frequency: cfg.get("frequency"),
        amplitude: cfg.get("amplitude"),
        base_height: cfg.get("baseHeight"),
        height_multiplier: cfg.get("heightMultiplier"),
        height_modifier: cfg.get("heightModifier"),
        height_exponent: cfg.get("heightExponent"),
        normalize: cfg.get("normalizeBool") as i32 != 0,
    };
    let terrain_params = TerrainParams {
        width: cfg.get("width") as usize,
        height: cfg.get("height") as usize,
        age: cfg.get("age") as u32,
        use_channel_erosion: cfg.get("channelErosionBool") as i32 != 0,
        add_resources: cfg.get("addResourcesBool") as i32 != 0,
        usped_min_blur: cfg.get("USPEDminBlur") as u32,
        usped_max_blur: cfg.get("USPEDmaxBlur") as u32,
    };
    let erosion = ErosionParams {
        cell_size: cfg.get("cellSize"),
        prevailing_rill: PrevailingRill::from_config(cfg.get("prevailingRill") as i32),
        c: cfg.get("C"),
        k: cfg.get("K"),
        r: cfg.get("R"),
        weight_erosion: cfg.get("weightErosion"),
        converter: cfg.get("converter"),
        blur_flow: cfg.get("preBlurFlowAccumulaionBool") as i32 != 0,
        strahler_threshold: cfg.get("strahlerThreshold") as i32,
    };

    let mut terrain = Terrain::new(fbm, terrain_params, erosion);
    println!("Generating {}x{} map...", terrain.terrain_params().width, terrain.terrain_params().height);
    terrain.new_map()?;
    println!("Generation seed: {}", terrain.seed());

    loop {
        match write_maps(&terrain) {
            Ok(()) => println!("Generation complete. Bitmaps saved."),
            Err(err) => eprintln!("bitmap output failed: {err}"),
        }

        print!("Continue generation for another 100 'years' (iterations)? (Y/N): ");
        io::stdout().flush()?;
        let mut answer = String::new();
        if io::stdin().read_line(&mut answer)? == 0 {
            break; // EOF: behave like N
        }
        let keep_going = matches!(answer.trim_start().chars().next(), Some('y') | Some('Y'));
        if !keep_going {
            println!("Exiting.");
            break;
        }

        for year in 1..=20 {
            terrain.process_year_fast()?;
            terrain.process_rivers_and_lakes()?;
            terrain.calculate_terrain_types()?;
            println!("fast year {year}/20");
        }
        for year in 1..=5 {
            terrain.process_year()?;
            terrain.calculate_terrain_types()?;
            println!("full year {year}/5");
        }
    }
    Ok(())
}

/// Write the six diagnostic maps, each suffixed with the seed.
fn write_maps(terrain: &Terrain) -> Result<()> {
    let suffix = format!("-seed{}.bmp", terrain.seed());
    let out = |stem: &str| PathBuf::from(format!("{stem}{suffix}"));
    let rows = terrain.rows();
    let cols = terrain.cols();
    let hydro = terrain.hydro();

    let types = terrain.terrain_types();
    save_bmp(&out("terrainTypes"), rows, cols, |i, j| terrain_color(types.get(i, j)))?;

    let height_ramp = ColorRamp::new(vec![(0.0, gray(0.0)), (100.0, gray(255.0))]);
    save_scalar_bmp(&out("heightmap"), hydro.heightmap(), &height_ramp)?;
    save_scalar_bmp(&out("heightmapFilled"), hydro.heightmap_filled(), &height_ramp)?;

    // Flow accumulation: hot headwaters fading into dark channels.
    let flow_ramp = ColorRamp::new(vec![
        (128.0, rgb(0x222034)),
        (32.0, rgb(0x3365ff)),
        (8.0, rgb(0xffcb55)),
        (4.0, rgb(0xfb802d)),
        (1.0, rgb(0xf9160e)),
    ]);
    let acc = hydro.flow_accumulation();
    save_bmp(&out("flow"), rows, cols, |i, j| flow_ramp.sample(acc.get(i, j) as f32))?;

    // Erosion (red) through neutral (amber) to deposition (blue).
    let usped_ramp = ColorRamp::new(vec![
        (-10_000.0, gray(0.0)),
        (-2_000.0, rgb(0xf9160e)),
        (0.0, rgb(0xffcb55)),
        (2_000.0, rgb(0x3365ff)),
        (10_000.0, gray(255.0)),
    ]);
    save_scalar_bmp(&out("USPED"), hydro.erosion_deposition(), &usped_ramp)?;

    // Composite: terrain palette lit by slope/aspect hillshade.
    let slope = hydro.slope();
    let aspect = hydro.aspect();
    let shade = shade_ramp();
    save_bmp(&out("terrain"), rows, cols, |i, j| {
        let base = terrain_color(types.get(i, j));
        let light = shade.sample(shade_factor(slope.get(i, j), aspect.get(i, j)));
        blend_alpha(base, light)
    })
}
