//! FIR boundary geometry.
//!
//! Boundaries are read from a GeoJSON feature collection once, when the
//! reference data is loaded. The bounding box and centroid of every feature
//! are derived at that point and never recomputed per cycle.

use std::collections::HashMap;
use std::time::Instant;

use geo::{BoundingRect, Centroid};
use geojson::{FeatureCollection, GeoJson};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// A single geographic coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lng: f64,
}

impl Point {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Axis-aligned bounding box in lat/lng.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundaries {
    pub geometry: geojson::Geometry,
    pub bbox: BoundingBox,
    pub center: Point,
}

impl Boundaries {
    /// Derive bounding box and centroid from a GeoJSON geometry.
    pub fn from_geometry(id: &str, geometry: geojson::Geometry) -> Result<Self, ParseError> {
        let shape = geo::Geometry::<f64>::try_from(geometry.value.clone())?;

        let rect = shape.bounding_rect().ok_or_else(|| ParseError::Boundaries {
            id: id.to_string(),
            reason: "empty geometry".to_string(),
        })?;
        let center = shape.centroid().ok_or_else(|| ParseError::Boundaries {
            id: id.to_string(),
            reason: "geometry has no centroid".to_string(),
        })?;

        Ok(Self {
            geometry,
            bbox: BoundingBox {
                min: Point::new(rect.min().y, rect.min().x),
                max: Point::new(rect.max().y, rect.max().x),
            },
            center: Point::new(center.y(), center.x()),
        })
    }
}

/// Parse a boundaries feature collection into a map keyed by feature id.
///
/// Features without an id or without geometry are skipped with a warning.
pub fn parse_boundaries(text: &str) -> Result<HashMap<String, Boundaries>, ParseError> {
    let started = Instant::now();
    let collection = match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => collection,
        GeoJson::Feature(feature) => FeatureCollection {
            bbox: None,
            features: vec![feature],
            foreign_members: None,
        },
        GeoJson::Geometry(_) => {
            return Err(ParseError::Boundaries {
                id: String::new(),
                reason: "expected a feature collection, got a bare geometry".to_string(),
            })
        }
    };

    let mut bounds = HashMap::with_capacity(collection.features.len());
    for feature in collection.features {
        let id = match feature.property("id").and_then(|value| value.as_str()) {
            Some(id) => id.to_string(),
            None => {
                tracing::warn!("boundaries feature without id, skipping");
                continue;
            }
        };
        let Some(geometry) = feature.geometry else {
            tracing::warn!("boundaries feature {} has no geometry, skipping", id);
            continue;
        };
        let boundaries = Boundaries::from_geometry(&id, geometry)?;
        bounds.insert(id, boundaries);
    }

    tracing::debug!(
        "{} boundaries parsed in {:.3}s",
        bounds.len(),
        started.elapsed().as_secs_f64()
    );
    Ok(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {"id": "SQR"},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [0.0, 2.0], [2.0, 2.0], [2.0, 0.0], [0.0, 0.0]]]
            }
        }]
    }"#;

    #[test]
    fn square_polygon_bbox_and_centroid() {
        let bounds = parse_boundaries(SQUARE).unwrap();
        let square = &bounds["SQR"];
        assert_eq!(square.bbox.min, Point::new(0.0, 0.0));
        assert_eq!(square.bbox.max, Point::new(2.0, 2.0));
        assert!((square.center.lat - 1.0).abs() < 1e-9);
        assert!((square.center.lng - 1.0).abs() < 1e-9);
    }

    #[test]
    fn bbox_uses_lng_as_x() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"id": "RECT"},
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [[[[10.0, 50.0], [14.0, 50.0], [14.0, 52.0], [10.0, 52.0], [10.0, 50.0]]]]
                }
            }]
        }"#;
        let bounds = parse_boundaries(text).unwrap();
        let rect = &bounds["RECT"];
        assert_eq!(rect.bbox.min, Point::new(50.0, 10.0));
        assert_eq!(rect.bbox.max, Point::new(52.0, 14.0));
        assert!((rect.center.lat - 51.0).abs() < 1e-9);
        assert!((rect.center.lng - 12.0).abs() < 1e-9);
    }

    #[test]
    fn features_without_id_are_skipped() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"name": "anonymous"},
                "geometry": {"type": "Point", "coordinates": [1.0, 1.0]}
            }]
        }"#;
        assert!(parse_boundaries(text).unwrap().is_empty());
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(parse_boundaries("{ not geojson").is_err());
    }
}
