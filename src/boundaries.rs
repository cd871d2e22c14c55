//! Country boundary dataset: model and GeoJSON loading.
//!
//! The dataset is a GeoJSON `FeatureCollection` where each feature is one
//! country, identified by its `"ISO3166-1-Alpha-2"` property, with a
//! `Polygon` or `MultiPolygon` geometry in `[lng, lat]` order.
//!
//! Every polygon keeps its interior rings, but classification only consults
//! the outer rings unless [`ClassifyConfig::subtract_holes`](crate::ClassifyConfig)
//! is set.

use log::{debug, info, warn};
use serde::Deserialize;

use crate::error::{CountryMatchError, Result};
use crate::geo_utils::compute_bounds;
use crate::{Bounds, GeoPoint};

/// Public world boundaries dataset with `ISO3166-1-Alpha-2` and `name` properties.
pub const DEFAULT_BOUNDARIES_URL: &str =
    "https://raw.githubusercontent.com/datasets/geo-countries/master/data/countries.geojson";

/// Geometry type of a boundary feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Polygon,
    MultiPolygon,
}

/// One polygon of a country: an outer ring plus any interior rings.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryPolygon {
    pub outer: Vec<GeoPoint>,
    pub holes: Vec<Vec<GeoPoint>>,
}

/// One country's territory.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFeature {
    /// ISO 3166-1 alpha-2 code, verbatim from the source (may be empty or "-99")
    pub country_code: String,
    /// Display name from the source
    pub name: String,
    pub kind: GeometryKind,
    /// Polygons in source order; a Polygon feature has exactly one
    pub polygons: Vec<BoundaryPolygon>,
    /// Bounding box of all outer rings
    pub bounds: Bounds,
}

impl BoundaryFeature {
    /// Build a feature, computing its bounding box from the outer rings.
    pub fn new(
        country_code: impl Into<String>,
        name: impl Into<String>,
        kind: GeometryKind,
        polygons: Vec<BoundaryPolygon>,
    ) -> Self {
        let mut bounds = Bounds::empty();
        for polygon in &polygons {
            bounds.merge(&compute_bounds(&polygon.outer));
        }

        Self {
            country_code: country_code.into(),
            name: name.into(),
            kind,
            polygons,
            bounds,
        }
    }

    /// Single-ring polygon feature without holes.
    pub fn polygon(country_code: impl Into<String>, outer: Vec<GeoPoint>) -> Self {
        let code = country_code.into();
        Self::new(
            code.clone(),
            code,
            GeometryKind::Polygon,
            vec![BoundaryPolygon { outer, holes: Vec::new() }],
        )
    }

    /// The rings consulted for hit-testing, one per polygon.
    pub fn outer_rings(&self) -> impl Iterator<Item = &[GeoPoint]> + '_ {
        self.polygons.iter().map(|p| p.outer.as_slice())
    }
}

/// Ordered, read-only set of country boundaries for a session.
///
/// Order matters: the first containing feature wins classification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundaryCollection {
    features: Vec<BoundaryFeature>,
}

impl BoundaryCollection {
    pub fn new(features: Vec<BoundaryFeature>) -> Self {
        Self { features }
    }

    /// Collection used when boundaries are unavailable.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn features(&self) -> &[BoundaryFeature] {
        &self.features
    }

    pub fn get(&self, index: usize) -> Option<&BoundaryFeature> {
        self.features.get(index)
    }

    /// Display name of the first feature carrying this code.
    pub fn country_name(&self, country_code: &str) -> Option<&str> {
        self.features
            .iter()
            .find(|f| f.country_code == country_code)
            .map(|f| f.name.as_str())
    }
}

// ============================================================================
// GeoJSON parsing
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawFeatureCollection {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    properties: Option<RawProperties>,
    #[serde(default)]
    geometry: Option<RawGeometry>,
}

#[derive(Debug, Default, Deserialize)]
struct RawProperties {
    #[serde(rename = "ISO3166-1-Alpha-2", default)]
    iso_a2: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: serde_json::Value,
}

/// GeoJSON positions may carry altitude; only the first two values matter.
type RawRing = Vec<Vec<f64>>;

fn ring_from_raw(raw: RawRing) -> Vec<GeoPoint> {
    raw.into_iter()
        .filter(|pos| pos.len() >= 2)
        .map(|pos| GeoPoint::new(pos[0], pos[1]))
        .collect()
}

fn polygon_from_raw(rings: Vec<RawRing>) -> Option<BoundaryPolygon> {
    let mut rings = rings.into_iter().map(ring_from_raw);
    let outer = rings.next()?;
    Some(BoundaryPolygon {
        outer,
        holes: rings.collect(),
    })
}

fn feature_from_raw(raw: RawFeature) -> Result<Option<BoundaryFeature>> {
    let props = raw.properties.unwrap_or_default();
    let country_code = props.iso_a2.unwrap_or_default();
    let name = props.name.unwrap_or_default();

    let Some(geometry) = raw.geometry else {
        debug!("[Boundaries] Feature '{}' has no geometry, skipping", country_code);
        return Ok(None);
    };

    let (kind, polygons): (GeometryKind, Vec<BoundaryPolygon>) = match geometry.kind.as_str() {
        "Polygon" => {
            let rings: Vec<RawRing> = serde_json::from_value(geometry.coordinates)?;
            (GeometryKind::Polygon, polygon_from_raw(rings).into_iter().collect())
        }
        "MultiPolygon" => {
            let polys: Vec<Vec<RawRing>> = serde_json::from_value(geometry.coordinates)?;
            (
                GeometryKind::MultiPolygon,
                polys.into_iter().filter_map(polygon_from_raw).collect(),
            )
        }
        other => {
            return Err(CountryMatchError::UnsupportedGeometry {
                country_code,
                geometry_type: other.to_string(),
            });
        }
    };

    Ok(Some(BoundaryFeature::new(country_code, name, kind, polygons)))
}

/// Parse a GeoJSON FeatureCollection of country boundaries.
///
/// Features without geometry, or with a geometry type other than
/// Polygon/MultiPolygon, are skipped with a warning. A document that is not
/// a FeatureCollection is an error.
pub fn parse_boundaries(geojson: &str) -> Result<BoundaryCollection> {
    let raw: RawFeatureCollection = serde_json::from_str(geojson)?;
    collection_from_raw(raw)
}

/// Same as [`parse_boundaries`], from raw bytes (e.g. an HTTP body).
pub fn parse_boundaries_bytes(bytes: &[u8]) -> Result<BoundaryCollection> {
    let raw: RawFeatureCollection = serde_json::from_slice(bytes)?;
    collection_from_raw(raw)
}

/// Parse boundaries, degrading to an empty collection on failure.
///
/// The failure is logged; callers treat an empty collection as
/// "boundaries unavailable".
pub fn parse_boundaries_or_empty(geojson: &str) -> BoundaryCollection {
    match parse_boundaries(geojson) {
        Ok(collection) => collection,
        Err(e) => {
            warn!("[Boundaries] {}; continuing without boundaries", e);
            BoundaryCollection::empty()
        }
    }
}

fn collection_from_raw(raw: RawFeatureCollection) -> Result<BoundaryCollection> {
    if let Some(kind) = raw.kind.as_deref() {
        if kind != "FeatureCollection" {
            return Err(CountryMatchError::InvalidGeoJson {
                message: format!("expected FeatureCollection, got {}", kind),
            });
        }
    }

    let total = raw.features.len();
    let mut features = Vec::with_capacity(total);

    for raw_feature in raw.features {
        match feature_from_raw(raw_feature) {
            Ok(Some(feature)) => features.push(feature),
            Ok(None) => {}
            Err(e) => warn!("[Boundaries] Skipping feature: {}", e),
        }
    }

    info!("[Boundaries] Parsed {}/{} features", features.len(), total);
    Ok(BoundaryCollection::new(features))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "ISO3166-1-Alpha-2": "AA", "name": "Alpha" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [
                        [[0, 0], [4, 0], [4, 4], [0, 4], [0, 0]],
                        [[1, 1], [2, 1], [2, 2], [1, 2], [1, 1]]
                    ]
                }
            },
            {
                "type": "Feature",
                "properties": { "ISO3166-1-Alpha-2": "BB", "name": "Beta" },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[10, 10], [11, 10], [11, 11], [10, 11], [10, 10]]],
                        [[[20, 20, 150.0], [21, 20, 150.0], [21, 21, 150.0], [20, 20, 150.0]]]
                    ]
                }
            },
            {
                "type": "Feature",
                "properties": { "ISO3166-1-Alpha-2": "-99", "name": "Nowhere" },
                "geometry": null
            },
            {
                "type": "Feature",
                "properties": { "ISO3166-1-Alpha-2": "PT", "name": "Point Land" },
                "geometry": { "type": "Point", "coordinates": [5, 5] }
            }
        ]
    }"#;

    #[test]
    fn test_parse_polygon_and_multipolygon() {
        let collection = parse_boundaries(SAMPLE).unwrap();
        assert_eq!(collection.len(), 2);

        let aa = &collection.features()[0];
        assert_eq!(aa.country_code, "AA");
        assert_eq!(aa.name, "Alpha");
        assert_eq!(aa.kind, GeometryKind::Polygon);
        assert_eq!(aa.polygons.len(), 1);
        assert_eq!(aa.polygons[0].outer.len(), 5);
        assert_eq!(aa.polygons[0].holes.len(), 1);
        assert_eq!(aa.bounds.max_lng, 4.0);

        let bb = &collection.features()[1];
        assert_eq!(bb.kind, GeometryKind::MultiPolygon);
        assert_eq!(bb.outer_rings().count(), 2);
        // Altitude is dropped, order stays [lng, lat]
        assert_eq!(bb.polygons[1].outer[1], GeoPoint::new(21.0, 20.0));
        assert_eq!(bb.bounds.min_lng, 10.0);
        assert_eq!(bb.bounds.max_lat, 21.0);
    }

    #[test]
    fn test_country_name_lookup() {
        let collection = parse_boundaries(SAMPLE).unwrap();
        assert_eq!(collection.country_name("BB"), Some("Beta"));
        assert_eq!(collection.country_name("ZZ"), None);
    }

    #[test]
    fn test_missing_properties_default_to_empty() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": { "type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1]]] }
            }]
        }"#;
        let collection = parse_boundaries(json).unwrap();
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.features()[0].country_code, "");
    }

    #[test]
    fn test_invalid_documents() {
        assert!(matches!(
            parse_boundaries("not json"),
            Err(CountryMatchError::InvalidGeoJson { .. })
        ));
        assert!(matches!(
            parse_boundaries(r#"{"type": "Feature", "features": []}"#),
            Err(CountryMatchError::InvalidGeoJson { .. })
        ));
        assert!(parse_boundaries_or_empty("{}").is_empty());
    }

    #[test]
    fn test_parse_bytes() {
        let collection = parse_boundaries_bytes(SAMPLE.as_bytes()).unwrap();
        assert_eq!(collection.len(), 2);
    }
}
