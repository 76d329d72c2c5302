//! Map View Widget
//! Central panel showing the rendered choropleth in a pannable, zoomable plot.

use crate::charts::RenderedMap;
use egui::{ColorImage, TextureHandle, TextureOptions};
use egui_plot::{Plot, PlotImage, PlotPoint};

/// Rendered map uploaded as a texture.
pub struct MapView {
    texture: TextureHandle,
    size: [f32; 2],
}

impl MapView {
    pub fn new(ctx: &egui::Context, rendered: &RenderedMap) -> Self {
        let image = ColorImage::from_rgb(
            [rendered.width as usize, rendered.height as usize],
            &rendered.rgb,
        );
        let texture = ctx.load_texture("choropleth", image, TextureOptions::LINEAR);
        Self {
            texture,
            size: [rendered.width as f32, rendered.height as f32],
        }
    }

    /// Draw the map, one plot unit per pixel.
    pub fn show(&self, ui: &mut egui::Ui) {
        let image = PlotImage::new(self.texture.id(), PlotPoint::new(0.0, 0.0), self.size);

        Plot::new("choropleth_plot")
            .data_aspect(1.0)
            .show_axes(false)
            .show_grid(false)
            .show_x(false)
            .show_y(false)
            .show(ui, |plot_ui| {
                plot_ui.image(image);
            });
    }
}
