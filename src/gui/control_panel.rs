//! Control Panel Widget
//! Left side panel with the per-region results and export controls.

use crate::charts::{ChoroplethError, ChoroplethMap};
use crate::data::schema::{CODE, EXPRESSED, NAME_REG, RATIO};
use egui::{Color32, RichText, ScrollArea};

/// One line of the region table.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionRow {
    pub code: String,
    pub name: Option<String>,
    pub expressed: Option<i64>,
    pub ratio: Option<f64>,
}

impl RegionRow {
    /// Rows of the map table, falling back to the boundary name when the
    /// region has no results.
    pub fn from_map(map: &ChoroplethMap) -> Result<Vec<RegionRow>, ChoroplethError> {
        let codes = map.table.column(CODE)?.str()?;
        let names = map.table.column(NAME_REG)?.str()?;
        let expressed = map.table.column(EXPRESSED)?.i64()?;
        let ratios = map.table.column(RATIO)?.f64()?;

        let rows = (0..map.table.height())
            .map(|i| RegionRow {
                code: codes.get(i).unwrap_or_default().to_string(),
                name: names
                    .get(i)
                    .map(str::to_string)
                    .or_else(|| map.shapes.get(i).and_then(|s| s.name.clone())),
                expressed: expressed.get(i),
                ratio: ratios.get(i),
            })
            .collect();
        Ok(rows)
    }

    pub fn expressed_text(&self) -> String {
        self.expressed
            .map(|e| e.to_string())
            .unwrap_or_else(|| "-".to_string())
    }

    pub fn ratio_text(&self) -> String {
        match self.ratio {
            None => "no data".to_string(),
            Some(r) if !r.is_finite() => "n/a".to_string(),
            Some(r) => format!("{:.1}%", r * 100.0),
        }
    }
}

/// Left side panel with the region table and export button.
pub struct ControlPanel {
    pub rows: Vec<RegionRow>,
    pub status: String,
}

impl ControlPanel {
    pub fn new(rows: Vec<RegionRow>) -> Self {
        Self {
            rows,
            status: "Ready".to_string(),
        }
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("🗺 Referendum Map")
                    .size(22.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
            ui.label(
                RichText::new("Choice A share of expressed ballots")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Results Section =====
        ui.label(RichText::new("📊 Results by Region").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ScrollArea::vertical().max_height(500.0).show(ui, |ui| {
                    egui::Grid::new("region_table")
                        .striped(true)
                        .num_columns(4)
                        .show(ui, |ui| {
                            ui.label(RichText::new("Code").strong());
                            ui.label(RichText::new("Region").strong());
                            ui.label(RichText::new("Expressed").strong());
                            ui.label(RichText::new("Choice A").strong());
                            ui.end_row();

                            for row in &self.rows {
                                ui.label(&row.code);
                                ui.label(row.name.as_deref().unwrap_or("-"));
                                ui.label(row.expressed_text());
                                let color = if row.ratio.is_some_and(f64::is_finite) {
                                    Color32::WHITE
                                } else {
                                    Color32::GRAY
                                };
                                ui.label(RichText::new(row.ratio_text()).color(color));
                                ui.end_row();
                            }
                        });
                });
            });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Action Buttons =====
        ui.vertical_centered(|ui| {
            let button = egui::Button::new(RichText::new("🖼 Export PNG").size(14.0))
                .min_size(egui::vec2(150.0, 30.0));
            if ui.add(button).clicked() {
                action = ControlPanelAction::ExportPng;
            }
        });

        ui.add_space(10.0);

        let status_color = if self.status.contains("Error") {
            Color32::from_rgb(220, 53, 69)
        } else if self.status.contains("Saved") {
            Color32::from_rgb(40, 167, 69)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        action
    }

    pub fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    ExportPng,
}
