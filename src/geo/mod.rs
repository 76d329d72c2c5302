//! Geo module - region boundaries read from GeoJSON

mod geojson;

pub use geojson::{load_region_shapes, Bounds, Polygon, RegionShape};
