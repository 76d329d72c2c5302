//! Referendum Map - Referendum results by region & choropleth viewer
//!
//! Loads ballots, regions and departments, aggregates votes by region and
//! shows the share of Choice A on a map.

mod charts;
mod config;
mod data;
mod geo;
mod gui;
mod logging;
mod pipeline;

use anyhow::{anyhow, Context, Result};
use charts::MapRenderer;
use config::{MapConfig, CONFIG_FILE};
use gui::RegionRow;
use std::path::Path;

fn main() -> Result<()> {
    let config = MapConfig::load_or_default(Path::new(CONFIG_FILE))?;
    logging::init_logging(&config.log_level);

    let output = pipeline::run(&config.loader())?;
    println!("{}", output.results_by_region);

    if !config.needs_render() {
        return Ok(());
    }

    let map = pipeline::build_map(&config, &output.results_by_region)?;
    let rendered = MapRenderer::new(config.image_width, config.image_height)
        .with_style(config.map_style())
        .render(&map)
        .context("Failed to render map")?;

    if let Some(path) = &config.output_png {
        rendered.save_png(path)?;
    }

    if config.show_window {
        let rows = RegionRow::from_map(&map)?;
        let title = config.title.as_deref().unwrap_or("Referendum Map");
        gui::show_map(rows, rendered, title).map_err(|e| anyhow!("Map window failed: {e}"))?;
    }

    Ok(())
}
