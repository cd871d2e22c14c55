//! # Country Matcher
//!
//! Reverse geocoding of activity start points into visited countries.
//!
//! This library provides:
//! - Point-in-polygon classification against world country boundaries
//! - Nearest-boundary fallback for points just off a simplified coastline
//! - Per-pass caching of classifications on a 0.1° coordinate grid
//! - Aggregation of an activity list into visited countries
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel aggregation with rayon
//! - **`http`** - Enable HTTP client for boundary dataset fetching
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use country_matcher::{
//!     parse_boundaries, aggregate_visited_countries, ActivityLocation,
//! };
//!
//! let geojson = r#"{
//!     "type": "FeatureCollection",
//!     "features": [{
//!         "type": "Feature",
//!         "properties": { "ISO3166-1-Alpha-2": "AA", "name": "Alpha" },
//!         "geometry": {
//!             "type": "Polygon",
//!             "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 1], [0, 0]]]
//!         }
//!     }]
//! }"#;
//!
//! let boundaries = parse_boundaries(geojson).unwrap();
//!
//! let activities = vec![
//!     ActivityLocation::new("1", Some(vec![0.5, 0.5])),
//!     ActivityLocation::new("2", None),
//! ];
//!
//! let visited = aggregate_visited_countries(&activities, Some(&boundaries));
//! assert!(visited.countries.contains("AA"));
//! assert_eq!(visited.activity_countries.get("1").map(String::as_str), Some("AA"));
//! assert!(!visited.activity_countries.contains_key("2"));
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{CountryMatchError, Result};

pub mod geo_utils;

// Boundary dataset model and GeoJSON parsing
pub mod boundaries;
pub use boundaries::{
    BoundaryCollection, BoundaryFeature, BoundaryPolygon, GeometryKind,
    parse_boundaries, parse_boundaries_bytes, parse_boundaries_or_empty,
    DEFAULT_BOUNDARIES_URL,
};

// Point classification (containment + nearest-boundary fallback)
pub mod classifier;
pub use classifier::{Classification, MatchMethod, classify, classify_detailed, classify_with_config};

// R-tree candidate filtering over feature bounding boxes
pub mod index;
pub use index::BoundaryIndex;

// Visited-country aggregation with per-pass cache
pub mod aggregate;
pub use aggregate::{
    ActivityLocation, CacheKey, ClassificationCache, VisitedCountries, MAX_CACHE_DECIMALS,
    aggregate_indexed, aggregate_visited_countries, aggregate_with_cache, aggregate_with_config,
};

#[cfg(feature = "parallel")]
pub use aggregate::{aggregate_indexed_parallel, aggregate_visited_countries_parallel};

// Session-wide boundary holder
pub mod store;
pub use store::BoundaryStore;

// HTTP module for boundary fetching
#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::BoundaryFetcher;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("CountryMatcherRust")
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A geographic coordinate in degrees.
///
/// Stored in GeoJSON order (longitude first). Activity data arrives as
/// `[latitude, longitude]`; use [`GeoPoint::from_lat_lng`] for that.
///
/// # Example
/// ```
/// use country_matcher::GeoPoint;
/// let paris = GeoPoint::from_lat_lng(48.8566, 2.3522);
/// assert_eq!(paris.longitude, 2.3522);
/// assert_eq!(paris, GeoPoint::new(2.3522, 48.8566));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    /// Create a point from GeoJSON-ordered coordinates.
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self { longitude, latitude }
    }

    /// Create a point from activity-ordered coordinates (`[lat, lng]`).
    pub fn from_lat_lng(latitude: f64, longitude: f64) -> Self {
        Self { longitude, latitude }
    }

    /// Both coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Axis-aligned bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// An inverted box that contains nothing and grows with [`Bounds::extend`].
    pub fn empty() -> Self {
        Self {
            min_lat: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
            min_lng: f64::INFINITY,
            max_lng: f64::NEG_INFINITY,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_lat > self.max_lat || self.min_lng > self.max_lng
    }

    /// Grow the box to include a point.
    pub fn extend(&mut self, p: &GeoPoint) {
        self.min_lat = self.min_lat.min(p.latitude);
        self.max_lat = self.max_lat.max(p.latitude);
        self.min_lng = self.min_lng.min(p.longitude);
        self.max_lng = self.max_lng.max(p.longitude);
    }

    /// Grow the box to include another box.
    pub fn merge(&mut self, other: &Bounds) {
        if other.is_empty() {
            return;
        }
        self.min_lat = self.min_lat.min(other.min_lat);
        self.max_lat = self.max_lat.max(other.max_lat);
        self.min_lng = self.min_lng.min(other.min_lng);
        self.max_lng = self.max_lng.max(other.max_lng);
    }

    /// Inclusive containment test.
    pub fn contains(&self, p: &GeoPoint) -> bool {
        p.latitude >= self.min_lat
            && p.latitude <= self.max_lat
            && p.longitude >= self.min_lng
            && p.longitude <= self.max_lng
    }

    /// Squared degree distance from a point to the box (0 inside).
    ///
    /// This is a lower bound on the distance to anything inside the box.
    pub fn distance_sq(&self, p: &GeoPoint) -> f64 {
        if self.is_empty() {
            return f64::INFINITY;
        }
        let dx = (self.min_lng - p.longitude).max(0.0).max(p.longitude - self.max_lng);
        let dy = (self.min_lat - p.latitude).max(0.0).max(p.latitude - self.max_lat);
        dx * dx + dy * dy
    }
}

/// Configuration for country classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ClassifyConfig {
    /// Maximum planar distance (degrees) from a boundary for the fallback match.
    /// Default: 0.1 (~11 km at the equator, less in real terms toward the poles)
    pub fallback_threshold_degrees: f64,

    /// Decimal places coordinates are rounded to for cache keys, capped at
    /// [`MAX_CACHE_DECIMALS`]. Default: 1 (a 0.1° grid cell)
    pub cache_decimals: u32,

    /// Exclude points that fall inside a polygon's interior rings (holes).
    /// Default: false (holes are ignored, enclaves resolve to the enclosing country)
    pub subtract_holes: bool,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            fallback_threshold_degrees: 0.1,
            cache_decimals: 1,
            subtract_holes: false,
        }
    }
}

impl ClassifyConfig {
    /// Squared fallback threshold, the form distances are compared in.
    #[inline]
    pub fn fallback_threshold_sq(&self) -> f64 {
        self.fallback_threshold_degrees * self.fallback_threshold_degrees
    }
}

// ============================================================================
// FFI Exports (only when feature enabled)
// ============================================================================

#[cfg(feature = "ffi")]
mod ffi {
    use super::*;
    use log::info;
    use std::collections::HashMap;

    /// Visited countries in an FFI-friendly shape.
    #[derive(Debug, Clone, uniffi::Record)]
    pub struct FfiVisitedCountries {
        /// Distinct country codes, sorted
        pub countries: Vec<String>,
        /// Activity ID -> country code
        pub activity_countries: HashMap<String, String>,
    }

    impl From<VisitedCountries> for FfiVisitedCountries {
        fn from(visited: VisitedCountries) -> Self {
            Self {
                countries: visited.countries.into_iter().collect(),
                activity_countries: visited.activity_countries,
            }
        }
    }

    /// Parse a GeoJSON boundary document and make it the session dataset.
    /// Returns the number of features loaded (0 if the document was unusable).
    #[uniffi::export]
    pub fn load_boundaries(geojson: String) -> u32 {
        init_logging();
        let collection = parse_boundaries_or_empty(&geojson);
        let count = collection.len() as u32;
        BoundaryStore::global().install(collection);
        info!("[CountryMatcherRust] Loaded {} boundary features", count);
        count
    }

    /// Whether a boundary dataset has been loaded for this session.
    #[uniffi::export]
    pub fn boundaries_loaded() -> bool {
        BoundaryStore::global().is_loaded()
    }

    /// Classify a single coordinate against the session dataset.
    #[uniffi::export]
    pub fn ffi_classify_point(latitude: f64, longitude: f64, config: ClassifyConfig) -> Option<String> {
        init_logging();
        let index = BoundaryStore::global().current()?;
        index
            .classify_detailed(&GeoPoint::from_lat_lng(latitude, longitude), &config)
            .map(|c| c.country_code)
    }

    /// Aggregate visited countries for a list of activities.
    /// Returns empty results while boundaries are unavailable.
    #[uniffi::export]
    pub fn ffi_aggregate_visited_countries(
        activities: Vec<ActivityLocation>,
        config: ClassifyConfig,
    ) -> FfiVisitedCountries {
        init_logging();
        info!("[CountryMatcherRust] aggregate called with {} activities", activities.len());

        let start = std::time::Instant::now();
        let boundaries = BoundaryStore::global().current();

        let visited = aggregate_indexed_parallel(&activities, boundaries.as_deref(), &config);

        info!(
            "[CountryMatcherRust] {} countries across {} activities in {:?}",
            visited.countries.len(),
            visited.activity_countries.len(),
            start.elapsed()
        );

        visited.into()
    }

    /// Get default configuration.
    #[uniffi::export]
    pub fn default_classify_config() -> ClassifyConfig {
        ClassifyConfig::default()
    }

    /// Fetch the boundary dataset over HTTP and install it for this session.
    /// Returns the number of features loaded (0 on failure).
    #[cfg(feature = "http")]
    #[uniffi::export]
    pub fn ffi_fetch_boundaries(url: Option<String>) -> u32 {
        init_logging();
        let url = url.unwrap_or_else(|| DEFAULT_BOUNDARIES_URL.to_string());
        let collection = crate::http::fetch_boundaries_sync(&url);
        let count = collection.len() as u32;
        BoundaryStore::global().install(collection);
        count
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_validation() {
        assert!(GeoPoint::new(2.3522, 48.8566).is_valid());
        assert!(!GeoPoint::new(0.0, 91.0).is_valid());
        assert!(!GeoPoint::new(181.0, 0.0).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
        assert!(GeoPoint::new(181.0, 0.0).is_finite());
    }

    #[test]
    fn test_from_lat_lng_swaps_order() {
        let p = GeoPoint::from_lat_lng(48.8566, 2.3522);
        assert_eq!(p.latitude, 48.8566);
        assert_eq!(p.longitude, 2.3522);
    }

    #[test]
    fn test_bounds_distance() {
        let mut b = Bounds::empty();
        assert!(b.is_empty());
        assert_eq!(b.distance_sq(&GeoPoint::new(0.0, 0.0)), f64::INFINITY);

        b.extend(&GeoPoint::new(0.0, 0.0));
        b.extend(&GeoPoint::new(1.0, 1.0));
        assert!(b.contains(&GeoPoint::new(1.0, 0.5)));
        assert_eq!(b.distance_sq(&GeoPoint::new(0.5, 0.5)), 0.0);
        assert!((b.distance_sq(&GeoPoint::new(4.0, 5.0)) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_default_config() {
        let config = ClassifyConfig::default();
        assert_eq!(config.fallback_threshold_degrees, 0.1);
        assert_eq!(config.cache_decimals, 1);
        assert!(!config.subtract_holes);
        assert!((config.fallback_threshold_sq() - 0.01).abs() < 1e-15);
    }
}
