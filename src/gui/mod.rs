//! GUI module - Map viewer window

mod app;
mod control_panel;
mod map_view;

pub use app::show_map;
pub use control_panel::{ControlPanel, ControlPanelAction, RegionRow};
pub use map_view::MapView;
