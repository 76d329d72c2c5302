//! Charts module - Choropleth building and rendering

mod choropleth;
mod renderer;

pub use choropleth::{build_choropleth, ChoroplethError, ChoroplethMap};
pub use renderer::{MapRenderer, MapStyle, RenderedMap};
