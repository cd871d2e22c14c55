//! Visited-country aggregation over an activity list.
//!
//! Activities recorded in the same town produce near-identical start points,
//! and classifying each one against every country boundary is the dominant
//! cost. A [`ClassificationCache`] quantizes coordinates onto a 0.1° grid
//! (about 11 km at the equator) and classifies each grid cell once per pass.
//!
//! The cache key is only a lookup key: the first activity to reach a cell is
//! classified at its exact coordinate, and everything else in that cell
//! reuses the result. A cell straddling a border can therefore assign a
//! neighbouring point to the wrong side.
//!
//! The cache belongs to one aggregation pass. Passing a fresh one (or using
//! [`aggregate_visited_countries`], which does) gives a clean recompute.

use std::collections::{BTreeSet, HashMap, HashSet};

use log::{debug, info};
use serde::{Deserialize, Deserializer, Serialize};

use crate::boundaries::BoundaryCollection;
use crate::classifier::classify_with_config;
use crate::index::BoundaryIndex;
use crate::{ClassifyConfig, GeoPoint};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Start location of one activity, as the activity API reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ActivityLocation {
    pub activity_id: String,
    /// `[latitude, longitude]` - note the order is the reverse of GeoJSON
    #[serde(default, deserialize_with = "deserialize_latlng")]
    pub start_latlng: Option<Vec<f64>>,
}

/// Accept any JSON for `start_latlng`; anything other than an array of
/// numbers becomes `None` so one bad record doesn't reject the whole list.
fn deserialize_latlng<'de, D>(deserializer: D) -> Result<Option<Vec<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Array(items) => items.iter().map(|item| item.as_f64()).collect(),
        _ => None,
    }))
}

impl ActivityLocation {
    pub fn new(activity_id: impl Into<String>, start_latlng: Option<Vec<f64>>) -> Self {
        Self {
            activity_id: activity_id.into(),
            start_latlng,
        }
    }

    /// The start point, if it is exactly two finite numbers.
    pub fn start_point(&self) -> Option<GeoPoint> {
        match self.start_latlng.as_deref() {
            Some(&[lat, lng]) if lat.is_finite() && lng.is_finite() => {
                Some(GeoPoint::from_lat_lng(lat, lng))
            }
            _ => None,
        }
    }
}

/// Finest cache precision. Beyond this the scaled coordinate no longer fits
/// an `i64` and every point would collapse onto one key.
pub const MAX_CACHE_DECIMALS: u32 = 9;

/// Grid cell of a coordinate rounded to the cache precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub lat: i64,
    pub lng: i64,
}

impl CacheKey {
    /// Round latitude and longitude independently to `decimals` places
    /// (capped at [`MAX_CACHE_DECIMALS`]).
    pub fn for_point(point: &GeoPoint, decimals: u32) -> Self {
        let scale = 10f64.powi(decimals.min(MAX_CACHE_DECIMALS) as i32);
        Self {
            lat: (point.latitude * scale).round() as i64,
            lng: (point.longitude * scale).round() as i64,
        }
    }
}

/// Per-pass memo of classification results by grid cell.
///
/// A missing entry means "not classified yet"; an entry holding `None` means
/// "classified, no country".
#[derive(Debug, Clone)]
pub struct ClassificationCache {
    decimals: u32,
    entries: HashMap<CacheKey, Option<String>>,
    hits: u32,
    misses: u32,
}

impl Default for ClassificationCache {
    fn default() -> Self {
        Self::new(ClassifyConfig::default().cache_decimals)
    }
}

impl ClassificationCache {
    pub fn new(decimals: u32) -> Self {
        Self {
            decimals,
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn key_for(&self, point: &GeoPoint) -> CacheKey {
        CacheKey::for_point(point, self.decimals)
    }

    /// Stored result for a cell: `None` if not computed yet.
    pub fn get(&self, key: &CacheKey) -> Option<&Option<String>> {
        self.entries.get(key)
    }

    /// Return the cached result for the point's cell, or run `classify` on
    /// the exact point and remember what it returns.
    pub fn get_or_classify<F>(&mut self, point: &GeoPoint, classify: F) -> Option<String>
    where
        F: FnOnce(&GeoPoint) -> Option<String>,
    {
        let key = self.key_for(point);
        if let Some(cached) = self.entries.get(&key) {
            self.hits += 1;
            return cached.clone();
        }

        self.misses += 1;
        let result = classify(point);
        self.entries.insert(key, result.clone());
        result
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u32 {
        self.hits
    }

    /// Number of classifications actually performed.
    pub fn misses(&self) -> u32 {
        self.misses
    }
}

/// Countries visited across an activity list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VisitedCountries {
    /// Distinct country codes
    pub countries: BTreeSet<String>,
    /// Activity ID -> country code, only for classified activities
    pub activity_countries: HashMap<String, String>,
}

impl VisitedCountries {
    pub fn is_empty(&self) -> bool {
        self.countries.is_empty() && self.activity_countries.is_empty()
    }

    /// Number of activities assigned to a country.
    pub fn activity_count(&self, country_code: &str) -> usize {
        self.activity_countries
            .values()
            .filter(|code| *code == country_code)
            .count()
    }

    /// Activity IDs assigned to a country, sorted.
    pub fn activities_in(&self, country_code: &str) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .activity_countries
            .iter()
            .filter(|(_, code)| *code == country_code)
            .map(|(id, _)| id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// (country, activity count), most-visited first, ties by code.
    pub fn country_counts(&self) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for code in self.activity_countries.values() {
            *counts.entry(code.as_str()).or_insert(0) += 1;
        }

        let mut counts: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(code, n)| (code.to_string(), n))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }

    fn record(&mut self, activity_id: &str, country_code: Option<String>) {
        if let Some(code) = country_code.filter(|c| !c.is_empty()) {
            self.countries.insert(code.clone());
            self.activity_countries.insert(activity_id.to_string(), code);
        }
    }
}

/// Aggregate visited countries with the default configuration.
///
/// Returns empty results while `boundaries` is `None` (not loaded yet).
pub fn aggregate_visited_countries(
    activities: &[ActivityLocation],
    boundaries: Option<&BoundaryCollection>,
) -> VisitedCountries {
    aggregate_with_config(activities, boundaries, &ClassifyConfig::default())
}

/// Aggregate with a fresh cache for this pass.
pub fn aggregate_with_config(
    activities: &[ActivityLocation],
    boundaries: Option<&BoundaryCollection>,
    config: &ClassifyConfig,
) -> VisitedCountries {
    let mut cache = ClassificationCache::new(config.cache_decimals);
    aggregate_with_cache(activities, boundaries, config, &mut cache)
}

/// Aggregate using a caller-owned cache.
pub fn aggregate_with_cache(
    activities: &[ActivityLocation],
    boundaries: Option<&BoundaryCollection>,
    config: &ClassifyConfig,
    cache: &mut ClassificationCache,
) -> VisitedCountries {
    let Some(boundaries) = boundaries.filter(|b| !b.is_empty()) else {
        debug!("[CountryMatcher] Boundaries unavailable, skipping aggregation");
        return VisitedCountries::default();
    };

    aggregate_by(activities, cache, |p| classify_with_config(p, boundaries, config))
}

/// Aggregate using a spatial index for classification.
pub fn aggregate_indexed(
    activities: &[ActivityLocation],
    index: Option<&BoundaryIndex>,
    config: &ClassifyConfig,
) -> VisitedCountries {
    let Some(index) = index.filter(|i| !i.is_empty()) else {
        debug!("[CountryMatcher] Boundaries unavailable, skipping aggregation");
        return VisitedCountries::default();
    };

    let mut cache = ClassificationCache::new(config.cache_decimals);
    aggregate_by(activities, &mut cache, |p| {
        index.classify_detailed(p, config).map(|c| c.country_code)
    })
}

fn aggregate_by<F>(
    activities: &[ActivityLocation],
    cache: &mut ClassificationCache,
    classify: F,
) -> VisitedCountries
where
    F: Fn(&GeoPoint) -> Option<String>,
{
    let mut visited = VisitedCountries::default();
    let mut skipped = 0usize;

    for activity in activities {
        let Some(point) = activity.start_point() else {
            skipped += 1;
            continue;
        };

        let code = cache.get_or_classify(&point, &classify);
        visited.record(&activity.activity_id, code);
    }

    info!(
        "[CountryMatcher] {} countries from {} activities ({} without location, {} classified, {} cache hits)",
        visited.countries.len(),
        activities.len(),
        skipped,
        cache.misses(),
        cache.hits()
    );

    visited
}

/// Parallel aggregation: each grid cell is classified once, cells in parallel.
///
/// Produces the same result as [`aggregate_with_config`]: every cell is
/// classified at the exact coordinate of the first activity that falls in it.
#[cfg(feature = "parallel")]
pub fn aggregate_visited_countries_parallel(
    activities: &[ActivityLocation],
    boundaries: Option<&BoundaryCollection>,
    config: &ClassifyConfig,
) -> VisitedCountries {
    let Some(boundaries) = boundaries.filter(|b| !b.is_empty()) else {
        debug!("[CountryMatcher] Boundaries unavailable, skipping aggregation");
        return VisitedCountries::default();
    };

    aggregate_parallel_by(activities, config.cache_decimals, |p| {
        classify_with_config(p, boundaries, config)
    })
}

/// Parallel aggregation using a spatial index for classification.
#[cfg(feature = "parallel")]
pub fn aggregate_indexed_parallel(
    activities: &[ActivityLocation],
    index: Option<&BoundaryIndex>,
    config: &ClassifyConfig,
) -> VisitedCountries {
    let Some(index) = index.filter(|i| !i.is_empty()) else {
        debug!("[CountryMatcher] Boundaries unavailable, skipping aggregation");
        return VisitedCountries::default();
    };

    aggregate_parallel_by(activities, config.cache_decimals, |p| {
        index.classify_detailed(p, config).map(|c| c.country_code)
    })
}

#[cfg(feature = "parallel")]
fn aggregate_parallel_by<F>(
    activities: &[ActivityLocation],
    cache_decimals: u32,
    classify: F,
) -> VisitedCountries
where
    F: Fn(&GeoPoint) -> Option<String> + Sync,
{
    // First point per cell, in activity order
    let mut representatives: Vec<(CacheKey, GeoPoint)> = Vec::new();
    let mut seen: HashSet<CacheKey> = HashSet::new();
    let located: Vec<(&ActivityLocation, CacheKey)> = activities
        .iter()
        .filter_map(|a| {
            let point = a.start_point()?;
            let key = CacheKey::for_point(&point, cache_decimals);
            if seen.insert(key) {
                representatives.push((key, point));
            }
            Some((a, key))
        })
        .collect();

    let results: HashMap<CacheKey, Option<String>> = representatives
        .par_iter()
        .map(|(key, point)| (*key, classify(point)))
        .collect();

    let mut visited = VisitedCountries::default();
    for (activity, key) in located {
        let code = results.get(&key).cloned().flatten();
        visited.record(&activity.activity_id, code);
    }

    info!(
        "[CountryMatcher] {} countries from {} activities ({} cells classified in parallel)",
        visited.countries.len(),
        activities.len(),
        results.len()
    );

    visited
}
