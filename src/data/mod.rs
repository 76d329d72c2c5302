//! Data module - CSV loading, joins and aggregation

mod loader;
mod processor;
pub mod schema;

pub use loader::{DataLoader, InputTables};
pub use processor::DataProcessor;
