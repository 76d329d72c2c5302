//! GeoJSON Reader
//! Parses a FeatureCollection of region boundaries into plain polygon rings.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum GeoError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid GeoJSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Feature #{index} has no 'code' property")]
    MissingCode { index: usize },
    #[error("Region '{code}' has no geometry")]
    MissingGeometry { code: String },
    #[error("Region '{code}' has unsupported geometry type '{kind}'")]
    UnsupportedGeometry { code: String, kind: String },
    #[error("Region '{code}' has a position with fewer than 2 coordinates")]
    InvalidPosition { code: String },
}

/// Closed ring of (longitude, latitude) points.
pub type Ring = Vec<(f64, f64)>;

/// One polygon: an outer ring and optional holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub exterior: Ring,
    pub holes: Vec<Ring>,
}

impl Polygon {
    /// Area of the outer ring in squared degrees (shoelace formula).
    pub fn area(&self) -> f64 {
        let ring = &self.exterior;
        if ring.len() < 3 {
            return 0.0;
        }
        let twice: f64 = ring
            .iter()
            .zip(ring.iter().cycle().skip(1))
            .map(|((x1, y1), (x2, y2))| x1 * y2 - x2 * y1)
            .sum();
        twice.abs() / 2.0
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    fn from_point((x, y): (f64, f64)) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn include(&mut self, (x, y): (f64, f64)) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn union(self, other: Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Bounding box of every exterior ring point, `None` when empty.
    pub fn of_points<'a>(points: impl IntoIterator<Item = &'a (f64, f64)>) -> Option<Bounds> {
        let mut points = points.into_iter();
        let mut bounds = Bounds::from_point(*points.next()?);
        for &point in points {
            bounds.include(point);
        }
        Some(bounds)
    }
}

/// Boundary of one region, keyed by its region code.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionShape {
    pub code: String,
    pub name: Option<String>,
    pub polygons: Vec<Polygon>,
}

impl RegionShape {
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::of_points(self.polygons.iter().flat_map(|p| p.exterior.iter()))
    }
}

#[derive(Deserialize)]
struct RawFeatureCollection {
    features: Vec<RawFeature>,
}

#[derive(Deserialize)]
struct RawFeature {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    geometry: Option<RawGeometry>,
}

#[derive(Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

type RawRing = Vec<Vec<f64>>;

/// Read a GeoJSON file of region boundaries.
pub fn load_region_shapes(path: &Path) -> Result<Vec<RegionShape>, GeoError> {
    let content = fs::read_to_string(path).map_err(|source| GeoError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let shapes = parse_region_shapes(&content)?;
    info!(regions = shapes.len(), "Loaded {}", path.display());
    Ok(shapes)
}

/// Parse a GeoJSON FeatureCollection whose features carry a `code` property.
pub fn parse_region_shapes(json: &str) -> Result<Vec<RegionShape>, GeoError> {
    let collection: RawFeatureCollection = serde_json::from_str(json)?;

    collection
        .features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| {
            let properties = feature.properties.unwrap_or_default();
            let code = property_text(&properties, "code").ok_or(GeoError::MissingCode { index })?;
            let name = property_text(&properties, "nom").or_else(|| property_text(&properties, "name"));
            let geometry = feature
                .geometry
                .ok_or_else(|| GeoError::MissingGeometry { code: code.clone() })?;
            let polygons = convert_geometry(&code, geometry)?;
            Ok(RegionShape {
                code,
                name,
                polygons,
            })
        })
        .collect()
}

/// String or numeric property as text.
fn property_text(properties: &Map<String, Value>, key: &str) -> Option<String> {
    match properties.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn convert_geometry(code: &str, geometry: RawGeometry) -> Result<Vec<Polygon>, GeoError> {
    match geometry.kind.as_str() {
        "Polygon" => {
            let rings: Vec<RawRing> = serde_json::from_value(geometry.coordinates)?;
            Ok(vec![convert_polygon(code, rings)?])
        }
        "MultiPolygon" => {
            let polygons: Vec<Vec<RawRing>> = serde_json::from_value(geometry.coordinates)?;
            polygons
                .into_iter()
                .map(|rings| convert_polygon(code, rings))
                .collect()
        }
        other => Err(GeoError::UnsupportedGeometry {
            code: code.to_string(),
            kind: other.to_string(),
        }),
    }
}

fn convert_polygon(code: &str, rings: Vec<RawRing>) -> Result<Polygon, GeoError> {
    let mut rings = rings
        .into_iter()
        .map(|ring| convert_ring(code, ring))
        .collect::<Result<Vec<Ring>, GeoError>>()?
        .into_iter();
    let exterior = rings.next().unwrap_or_default();
    Ok(Polygon {
        exterior,
        holes: rings.collect(),
    })
}

fn convert_ring(code: &str, ring: RawRing) -> Result<Ring, GeoError> {
    ring.into_iter()
        .map(|position| match position.as_slice() {
            // Altitude, if any, is ignored
            [x, y, ..] => Ok((*x, *y)),
            _ => Err(GeoError::InvalidPosition {
                code: code.to_string(),
            }),
        })
        .collect()
}
