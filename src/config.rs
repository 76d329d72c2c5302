//! Pipeline configuration, read from an optional TOML file.

use crate::charts::MapStyle;
use crate::data::DataLoader;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Looked up in the working directory.
pub const CONFIG_FILE: &str = "referendum_map.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid configuration in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub data_dir: PathBuf,
    pub referendum_file: String,
    pub regions_file: String,
    pub departments_file: String,
    pub geojson_file: String,
    /// Also write the rendered map here.
    pub output_png: Option<PathBuf>,
    pub show_window: bool,
    pub image_width: u32,
    pub image_height: u32,
    pub title: Option<String>,
    pub log_level: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            referendum_file: "referendum.csv".to_string(),
            regions_file: "regions.csv".to_string(),
            departments_file: "departments.csv".to_string(),
            geojson_file: "regions.geojson".to_string(),
            output_png: None,
            show_window: true,
            image_width: 900,
            image_height: 900,
            title: Some("Choice A share of expressed ballots".to_string()),
            log_level: "info".to_string(),
        }
    }
}

impl MapConfig {
    /// Parse a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn loader(&self) -> DataLoader {
        DataLoader::new(&self.data_dir).with_file_names(
            &self.referendum_file,
            &self.regions_file,
            &self.departments_file,
        )
    }

    pub fn geojson_path(&self) -> PathBuf {
        self.data_dir.join(&self.geojson_file)
    }

    /// A raster is only needed for the PNG export or the window.
    pub fn needs_render(&self) -> bool {
        self.output_png.is_some() || self.show_window
    }

    pub fn map_style(&self) -> MapStyle {
        MapStyle {
            title: self.title.clone(),
            show_legend: true,
        }
    }
}
