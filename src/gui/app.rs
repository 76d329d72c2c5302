//! Referendum Map Viewer Application
//! Main window with the region table and the rendered choropleth.

use crate::charts::RenderedMap;
use crate::gui::{ControlPanel, ControlPanelAction, MapView, RegionRow};
use egui::SidePanel;
use tracing::{error, info, warn};

/// Main application window.
pub struct MapViewerApp {
    control_panel: ControlPanel,
    map_view: MapView,
    rendered: RenderedMap,
}

impl MapViewerApp {
    pub fn new(cc: &eframe::CreationContext<'_>, rows: Vec<RegionRow>, rendered: RenderedMap) -> Self {
        Self {
            control_panel: ControlPanel::new(rows),
            map_view: MapView::new(&cc.egui_ctx, &rendered),
            rendered,
        }
    }

    /// Ask for a destination, write the PNG and open it.
    fn handle_export_png(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG Image", &["png"])
            .set_file_name("referendum_map.png")
            .save_file()
        else {
            return;
        };

        match self.rendered.save_png(&path) {
            Ok(()) => {
                self.control_panel
                    .set_status(&format!("Saved {}", path.display()));
                if let Err(e) = open::that(&path) {
                    warn!("Could not open {}: {}", path.display(), e);
                }
            }
            Err(e) => {
                error!("PNG export failed: {}", e);
                self.control_panel.set_status(&format!("Error: {}", e));
            }
        }
    }
}

impl eframe::App for MapViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        SidePanel::left("control_panel")
            .min_width(300.0)
            .max_width(380.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    match self.control_panel.show(ui) {
                        ControlPanelAction::ExportPng => self.handle_export_png(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.map_view.show(ui);
        });
    }
}

/// Open the viewer window and block until it is closed.
pub fn show_map(rows: Vec<RegionRow>, rendered: RenderedMap, title: &str) -> eframe::Result<()> {
    info!("Opening map window");
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1300.0, 950.0])
            .with_min_inner_size([900.0, 600.0])
            .with_title(title),
        ..Default::default()
    };

    eframe::run_native(
        "Referendum Map",
        options,
        Box::new(move |cc| Ok(Box::new(MapViewerApp::new(cc, rows, rendered)))),
    )
}
