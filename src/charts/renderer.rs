//! Static Map Renderer
//! Rasterizes a choropleth into an RGB buffer with plotters.
//!
//! Layout:
//! 1. Optional title centered on top
//! 2. Map: region polygons filled by ratio, larger polygons first so enclaves
//!    stay visible, holes painted with the background
//! 3. Optional legend on the right: vertical color scale with min/max labels

use crate::charts::ChoroplethMap;
use crate::geo::Bounds;
use plotters::prelude::*;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

// Sequential color scale anchors (viridis)
const SCALE: [(u8, u8, u8); 5] = [
    (68, 1, 84),
    (59, 82, 139),
    (33, 145, 140),
    (94, 201, 98),
    (253, 231, 37),
];
const MISSING: RGBColor = RGBColor(200, 200, 200);
const BACKGROUND: RGBColor = WHITE;
const OUTLINE: RGBColor = RGBColor(60, 60, 60);

const LEGEND_WIDTH: u32 = 90;
const MAP_MARGIN: u32 = 10;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Drawing failed: {0}")]
    Draw(String),
    #[error("Map has no region geometry")]
    EmptyMap,
    #[error("Map table error: {0}")]
    Table(#[from] crate::charts::ChoroplethError),
    #[error("Pixel buffer does not match {width}x{height}")]
    Buffer { width: u32, height: u32 },
    #[error("Failed to write image: {0}")]
    Image(#[from] image::ImageError),
}

fn draw_error<E: std::fmt::Display>(err: E) -> RenderError {
    RenderError::Draw(err.to_string())
}

/// Presentation options.
#[derive(Debug, Clone, Default)]
pub struct MapStyle {
    pub title: Option<String>,
    pub show_legend: bool,
}

/// A rendered map as packed RGB pixels.
#[derive(Debug, Clone)]
pub struct RenderedMap {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl RenderedMap {
    #[allow(dead_code)]
    pub fn pixel(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 3) as usize;
        Some((self.rgb[i], self.rgb[i + 1], self.rgb[i + 2]))
    }

    /// Write the map as a PNG file.
    pub fn save_png(&self, path: &Path) -> Result<(), RenderError> {
        let image = image::RgbImage::from_raw(self.width, self.height, self.rgb.clone()).ok_or(
            RenderError::Buffer {
                width: self.width,
                height: self.height,
            },
        )?;
        image.save(path)?;
        info!("Saved map to {}", path.display());
        Ok(())
    }
}

/// Color of `value` on the sequential scale between `min` and `max`.
pub fn scale_color(value: f64, min: f64, max: f64) -> RGBColor {
    let t = if max > min {
        ((value - min) / (max - min)).clamp(0.0, 1.0)
    } else {
        0.5
    };
    let pos = t * (SCALE.len() - 1) as f64;
    let lower = (pos.floor() as usize).min(SCALE.len() - 2);
    let frac = pos - lower as f64;
    let (r0, g0, b0) = SCALE[lower];
    let (r1, g1, b1) = SCALE[lower + 1];
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    RGBColor(mix(r0, r1), mix(g0, g1), mix(b0, b1))
}

/// Renders choropleth maps to pixel buffers.
pub struct MapRenderer {
    width: u32,
    height: u32,
    style: MapStyle,
}

impl MapRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            style: MapStyle::default(),
        }
    }

    pub fn with_style(mut self, style: MapStyle) -> Self {
        self.style = style;
        self
    }

    /// Render `map` into an RGB buffer of the configured size.
    pub fn render(&self, map: &ChoroplethMap) -> Result<RenderedMap, RenderError> {
        let bounds = map.bounds().ok_or(RenderError::EmptyMap)?;
        let range = map.ratio_range()?;
        let ratios = map.ratios()?;

        let mut rgb = vec![0u8; (self.width * self.height * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut rgb, (self.width, self.height))
                .into_drawing_area();
            root.fill(&BACKGROUND).map_err(draw_error)?;

            let root = match &self.style.title {
                Some(title) => root
                    .titled(title, ("sans-serif", 24))
                    .map_err(draw_error)?,
                None => root,
            };

            let (map_area, legend_area) = if self.style.show_legend {
                let (w, _) = root.dim_in_pixel();
                let (map_area, legend_area) = root.split_horizontally(w.saturating_sub(LEGEND_WIDTH));
                (map_area, Some(legend_area))
            } else {
                (root, None)
            };

            let (area_w, area_h) = map_area.dim_in_pixel();
            let (x_range, y_range) = Self::fit_aspect(bounds, area_w, area_h);
            let mut chart = ChartBuilder::on(&map_area)
                .margin(MAP_MARGIN)
                .build_cartesian_2d(x_range, y_range)
                .map_err(draw_error)?;

            // Largest first, so enclaves drawn later stay visible over holes
            let mut polygons: Vec<(f64, RGBColor, &crate::geo::Polygon)> = map
                .shapes
                .iter()
                .zip(&ratios)
                .flat_map(|(shape, ratio)| {
                    let color = match (ratio, range) {
                        (Some(r), Some((lo, hi))) if r.is_finite() => scale_color(*r, lo, hi),
                        _ => MISSING,
                    };
                    shape.polygons.iter().map(move |p| (p.area(), color, p))
                })
                .collect();
            polygons.sort_by(|a, b| b.0.total_cmp(&a.0));

            for (_, color, polygon) in &polygons {
                chart
                    .draw_series(std::iter::once(Polygon::new(
                        polygon.exterior.clone(),
                        color.filled(),
                    )))
                    .map_err(draw_error)?;
                chart
                    .draw_series(
                        polygon
                            .holes
                            .iter()
                            .map(|hole| Polygon::new(hole.clone(), BACKGROUND.filled())),
                    )
                    .map_err(draw_error)?;
            }

            for (_, _, polygon) in &polygons {
                chart
                    .draw_series(
                        std::iter::once(&polygon.exterior)
                            .chain(&polygon.holes)
                            .map(|ring| PathElement::new(ring.clone(), OUTLINE.stroke_width(1))),
                    )
                    .map_err(draw_error)?;
            }

            if let (Some(legend_area), Some((lo, hi))) = (legend_area, range) {
                Self::draw_legend(&legend_area, lo, hi)?;
            }

            map_area.present().map_err(draw_error)?;
        }

        debug!(
            width = self.width,
            height = self.height,
            regions = map.shapes.len(),
            "Rendered choropleth"
        );
        Ok(RenderedMap {
            width: self.width,
            height: self.height,
            rgb,
        })
    }

    /// Widen one axis so a degree of longitude and latitude cover the same
    /// number of pixels once longitude is scaled by cos(latitude).
    fn fit_aspect(
        bounds: Bounds,
        width: u32,
        height: u32,
    ) -> (std::ops::Range<f64>, std::ops::Range<f64>) {
        let mid_lat = ((bounds.min_y + bounds.max_y) / 2.0).to_radians();
        let x_scale = mid_lat.cos().abs().max(0.1);

        let data_w = ((bounds.max_x - bounds.min_x) * x_scale).max(1e-9);
        let data_h = (bounds.max_y - bounds.min_y).max(1e-9);
        let pixel_w = width.saturating_sub(2 * MAP_MARGIN).max(1) as f64;
        let pixel_h = height.saturating_sub(2 * MAP_MARGIN).max(1) as f64;

        let units_per_pixel = (data_w / pixel_w).max(data_h / pixel_h);
        let half_w = units_per_pixel * pixel_w / 2.0 / x_scale;
        let half_h = units_per_pixel * pixel_h / 2.0;
        let cx = (bounds.min_x + bounds.max_x) / 2.0;
        let cy = (bounds.min_y + bounds.max_y) / 2.0;

        ((cx - half_w)..(cx + half_w), (cy - half_h)..(cy + half_h))
    }

    fn draw_legend<DB: DrawingBackend>(
        area: &DrawingArea<DB, plotters::coord::Shift>,
        lo: f64,
        hi: f64,
    ) -> Result<(), RenderError> {
        let (w, h) = area.dim_in_pixel();
        let bar_x = 15i32;
        let bar_w = (w as i32 / 3).max(8);
        let top = (h as i32 / 4).max(20);
        let bottom = (h as i32 * 3 / 4).max(top + 10);
        let steps = (bottom - top).max(1);

        for step in 0..steps {
            let t = 1.0 - step as f64 / steps as f64;
            let color = scale_color(lo + t * (hi - lo), lo, hi);
            area.draw(&Rectangle::new(
                [(bar_x, top + step), (bar_x + bar_w, top + step + 1)],
                color.filled(),
            ))
            .map_err(draw_error)?;
        }
        area.draw(&Rectangle::new(
            [(bar_x, top), (bar_x + bar_w, bottom)],
            OUTLINE.stroke_width(1),
        ))
        .map_err(draw_error)?;

        let font = ("sans-serif", 14);
        area.draw(&Text::new(
            format!("{:.1}%", hi * 100.0),
            (bar_x, top - 18),
            font,
        ))
        .map_err(draw_error)?;
        area.draw(&Text::new(
            format!("{:.1}%", lo * 100.0),
            (bar_x, bottom + 4),
            font,
        ))
        .map_err(draw_error)?;
        Ok(())
    }
}
