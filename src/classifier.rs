//! Point classification against country boundaries.
//!
//! Two passes over the features, in collection order:
//!
//! 1. **Containment** - ray-casting against every outer ring. The first
//!    feature with a containing ring wins; overlaps are not resolved.
//! 2. **Nearest boundary** - only when nothing contains the point. The
//!    feature whose outer-ring edges come closest (planar distance in
//!    degrees) wins, if that distance is under the fallback threshold.
//!    Equidistant features resolve to the earlier one.
//!
//! Bounding boxes are used to skip features that cannot affect either pass;
//! they never change the outcome.

use serde::Serialize;

use crate::boundaries::{BoundaryCollection, BoundaryFeature, BoundaryPolygon};
use crate::geo_utils::{haversine_distance, nearest_on_ring, point_in_ring};
use crate::{ClassifyConfig, GeoPoint};

/// How a point was matched to a country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum MatchMethod {
    /// The point lies inside one of the country's outer rings
    Contained,
    /// The point lies outside, within the fallback threshold of a boundary
    Nearest,
}

/// A successful classification with match details.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Classification {
    pub country_code: String,
    pub country_name: String,
    pub method: MatchMethod,
    /// Planar distance to the boundary in degrees (0 when contained)
    pub distance_degrees: f64,
    /// Great-circle distance to the nearest boundary point in meters (0 when contained)
    pub distance_meters: f64,
}

/// Classify a point with the default configuration.
///
/// Returns the country code of the containing (or nearest, within 0.1°)
/// feature, or `None`.
///
/// # Example
/// ```
/// use country_matcher::{classify, BoundaryCollection, BoundaryFeature, GeoPoint};
///
/// let square = BoundaryFeature::polygon("AA", vec![
///     GeoPoint::new(0.0, 0.0),
///     GeoPoint::new(1.0, 0.0),
///     GeoPoint::new(1.0, 1.0),
///     GeoPoint::new(0.0, 1.0),
/// ]);
/// let boundaries = BoundaryCollection::new(vec![square]);
///
/// assert_eq!(classify(&GeoPoint::new(0.5, 0.5), &boundaries).as_deref(), Some("AA"));
/// assert_eq!(classify(&GeoPoint::new(30.0, 30.0), &boundaries), None);
/// ```
pub fn classify(point: &GeoPoint, boundaries: &BoundaryCollection) -> Option<String> {
    classify_with_config(point, boundaries, &ClassifyConfig::default())
}

/// Classify a point, returning only the country code.
pub fn classify_with_config(
    point: &GeoPoint,
    boundaries: &BoundaryCollection,
    config: &ClassifyConfig,
) -> Option<String> {
    classify_detailed(point, boundaries, config).map(|c| c.country_code)
}

/// Classify a point, returning match details.
pub fn classify_detailed(
    point: &GeoPoint,
    boundaries: &BoundaryCollection,
    config: &ClassifyConfig,
) -> Option<Classification> {
    resolve(point, boundaries.features(), boundaries.features(), config)
}

/// Run both passes over the given candidate features.
///
/// Candidates must be in collection order; the first containing candidate
/// and the first of any equidistant nearest candidates win.
pub(crate) fn resolve<'a, C, N>(
    point: &GeoPoint,
    containing_candidates: C,
    nearby_candidates: N,
    config: &ClassifyConfig,
) -> Option<Classification>
where
    C: IntoIterator<Item = &'a BoundaryFeature>,
    N: IntoIterator<Item = &'a BoundaryFeature>,
{
    if !point.is_finite() {
        return None;
    }

    if let Some(feature) = find_containing(point, containing_candidates, config) {
        return Some(Classification {
            country_code: feature.country_code.clone(),
            country_name: feature.name.clone(),
            method: MatchMethod::Contained,
            distance_degrees: 0.0,
            distance_meters: 0.0,
        });
    }

    find_nearest(point, nearby_candidates, config).map(|hit| Classification {
        country_code: hit.feature.country_code.clone(),
        country_name: hit.feature.name.clone(),
        method: MatchMethod::Nearest,
        distance_degrees: hit.distance_sq.sqrt(),
        distance_meters: haversine_distance(point, &hit.closest),
    })
}

fn find_containing<'a, I>(
    point: &GeoPoint,
    features: I,
    config: &ClassifyConfig,
) -> Option<&'a BoundaryFeature>
where
    I: IntoIterator<Item = &'a BoundaryFeature>,
{
    features
        .into_iter()
        .find(|feature| feature_contains(point, feature, config.subtract_holes))
}

fn feature_contains(point: &GeoPoint, feature: &BoundaryFeature, subtract_holes: bool) -> bool {
    if !feature.bounds.contains(point) {
        return false;
    }
    feature
        .polygons
        .iter()
        .any(|polygon| polygon_contains(point, polygon, subtract_holes))
}

fn polygon_contains(point: &GeoPoint, polygon: &BoundaryPolygon, subtract_holes: bool) -> bool {
    if !point_in_ring(point, &polygon.outer) {
        return false;
    }
    !subtract_holes || !polygon.holes.iter().any(|hole| point_in_ring(point, hole))
}

struct NearestBoundary<'a> {
    feature: &'a BoundaryFeature,
    distance_sq: f64,
    closest: GeoPoint,
}

fn find_nearest<'a, I>(
    point: &GeoPoint,
    features: I,
    config: &ClassifyConfig,
) -> Option<NearestBoundary<'a>>
where
    I: IntoIterator<Item = &'a BoundaryFeature>,
{
    // Only distances strictly below the cutoff can win: first the threshold,
    // then the best distance found so far.
    let mut cutoff = config.fallback_threshold_sq();
    let mut best: Option<NearestBoundary<'a>> = None;

    for feature in features {
        if feature.bounds.distance_sq(point) >= cutoff {
            continue;
        }

        for ring in feature.outer_rings() {
            if let Some((distance_sq, closest)) = nearest_on_ring(point, ring) {
                if distance_sq < cutoff {
                    cutoff = distance_sq;
                    best = Some(NearestBoundary { feature, distance_sq, closest });
                }
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundaries::GeometryKind;

    fn square(code: &str, min_lng: f64, min_lat: f64, max_lng: f64, max_lat: f64) -> BoundaryFeature {
        BoundaryFeature::polygon(
            code,
            vec![
                GeoPoint::new(min_lng, min_lat),
                GeoPoint::new(max_lng, min_lat),
                GeoPoint::new(max_lng, max_lat),
                GeoPoint::new(min_lng, max_lat),
                GeoPoint::new(min_lng, min_lat),
            ],
        )
    }

    fn two_squares() -> BoundaryCollection {
        BoundaryCollection::new(vec![
            square("AA", 0.0, 0.0, 1.0, 1.0),
            square("BB", 2.0, 2.0, 3.0, 3.0),
        ])
    }

    #[test]
    fn test_centroid_is_contained() {
        let boundaries = two_squares();
        assert_eq!(classify(&GeoPoint::new(0.5, 0.5), &boundaries).as_deref(), Some("AA"));
        assert_eq!(classify(&GeoPoint::new(2.5, 2.5), &boundaries).as_deref(), Some("BB"));

        let detail = classify_detailed(&GeoPoint::new(0.5, 0.5), &boundaries, &ClassifyConfig::default()).unwrap();
        assert_eq!(detail.method, MatchMethod::Contained);
        assert_eq!(detail.distance_degrees, 0.0);
    }

    #[test]
    fn test_far_point_is_unmatched() {
        let boundaries = two_squares();
        assert_eq!(classify(&GeoPoint::new(10.0, 10.0), &boundaries), None);
        assert_eq!(classify(&GeoPoint::new(-30.0, -40.0), &boundaries), None);
    }

    #[test]
    fn test_fallback_within_threshold() {
        let boundaries = two_squares();
        let near = GeoPoint::new(1.05, 0.5);

        let detail = classify_detailed(&near, &boundaries, &ClassifyConfig::default()).unwrap();
        assert_eq!(detail.country_code, "AA");
        assert_eq!(detail.method, MatchMethod::Nearest);
        assert!((detail.distance_degrees - 0.05).abs() < 1e-9);
        // ~5.5km at the equator
        assert!(detail.distance_meters > 5_000.0 && detail.distance_meters < 6_000.0);

        assert_eq!(classify(&GeoPoint::new(1.09, 0.5), &boundaries).as_deref(), Some("AA"));
    }

    #[test]
    fn test_fallback_beyond_threshold() {
        let boundaries = two_squares();
        assert_eq!(classify(&GeoPoint::new(1.2, 0.5), &boundaries), None);
        assert_eq!(classify(&GeoPoint::new(0.5, -0.15), &boundaries), None);
    }

    #[test]
    fn test_custom_threshold() {
        let boundaries = two_squares();
        let config = ClassifyConfig {
            fallback_threshold_degrees: 0.5,
            ..ClassifyConfig::default()
        };
        let p = GeoPoint::new(1.2, 0.5);
        assert_eq!(classify_with_config(&p, &boundaries, &config).as_deref(), Some("AA"));
    }

    #[test]
    fn test_classify_is_idempotent() {
        let boundaries = two_squares();
        for p in [GeoPoint::new(0.5, 0.5), GeoPoint::new(1.05, 0.5), GeoPoint::new(9.0, 9.0)] {
            assert_eq!(classify(&p, &boundaries), classify(&p, &boundaries));
        }
    }

    #[test]
    fn test_first_containing_feature_wins() {
        let a = square("AA", 0.0, 0.0, 2.0, 2.0);
        let b = square("BB", 1.0, 1.0, 3.0, 3.0);
        let p = GeoPoint::new(1.5, 1.5);

        let forward = BoundaryCollection::new(vec![a.clone(), b.clone()]);
        let reverse = BoundaryCollection::new(vec![b, a]);
        assert_eq!(classify(&p, &forward).as_deref(), Some("AA"));
        assert_eq!(classify(&p, &reverse).as_deref(), Some("BB"));
    }

    #[test]
    fn test_nearest_prefers_closer_feature() {
        let boundaries = BoundaryCollection::new(vec![
            square("AA", 0.0, 0.0, 1.0, 1.0),
            square("BB", 1.125, 0.0, 2.0, 1.0),
        ]);
        // 0.09375 from AA, 0.03125 from BB
        let p = GeoPoint::new(1.09375, 0.5);
        assert_eq!(classify(&p, &boundaries).as_deref(), Some("BB"));
    }

    #[test]
    fn test_equidistant_features_resolve_to_first() {
        let a = square("AA", 0.0, 0.0, 1.0, 1.0);
        let b = square("BB", 1.5, 0.0, 2.5, 1.0);
        let config = ClassifyConfig {
            fallback_threshold_degrees: 0.5,
            ..ClassifyConfig::default()
        };
        let p = GeoPoint::new(1.25, 0.5);

        let forward = BoundaryCollection::new(vec![a.clone(), b.clone()]);
        let reverse = BoundaryCollection::new(vec![b, a]);
        assert_eq!(classify_with_config(&p, &forward, &config).as_deref(), Some("AA"));
        assert_eq!(classify_with_config(&p, &reverse, &config).as_deref(), Some("BB"));
    }

    #[test]
    fn test_empty_collection() {
        assert_eq!(classify(&GeoPoint::new(0.0, 0.0), &BoundaryCollection::empty()), None);
    }

    #[test]
    fn test_degenerate_geometry_is_tolerated() {
        let empty_ring = BoundaryFeature::polygon("XX", vec![]);
        let single = BoundaryFeature::polygon("YY", vec![GeoPoint::new(0.5, 0.5)]);
        let no_polygons = BoundaryFeature::new("ZZ", "", GeometryKind::MultiPolygon, vec![]);

        let only_degenerate = BoundaryCollection::new(vec![empty_ring.clone(), single.clone(), no_polygons.clone()]);
        assert_eq!(classify(&GeoPoint::new(0.5, 0.5), &only_degenerate), None);

        let mixed = BoundaryCollection::new(vec![empty_ring, single, no_polygons, square("AA", 0.0, 0.0, 1.0, 1.0)]);
        assert_eq!(classify(&GeoPoint::new(0.25, 0.25), &mixed).as_deref(), Some("AA"));
    }

    #[test]
    fn test_non_finite_point() {
        let boundaries = two_squares();
        assert_eq!(classify(&GeoPoint::new(f64::NAN, 0.5), &boundaries), None);
        assert_eq!(classify(&GeoPoint::new(0.5, f64::INFINITY), &boundaries), None);
    }

    #[test]
    fn test_multipolygon_any_part_matches() {
        let part = |min: f64| BoundaryPolygon {
            outer: vec![
                GeoPoint::new(min, min),
                GeoPoint::new(min + 1.0, min),
                GeoPoint::new(min + 1.0, min + 1.0),
                GeoPoint::new(min, min + 1.0),
            ],
            holes: vec![],
        };
        let islands = BoundaryFeature::new("IS", "Islands", GeometryKind::MultiPolygon, vec![part(0.0), part(5.0)]);
        let boundaries = BoundaryCollection::new(vec![islands]);

        assert_eq!(classify(&GeoPoint::new(5.5, 5.5), &boundaries).as_deref(), Some("IS"));
        // Between the islands, far from both
        assert_eq!(classify(&GeoPoint::new(3.0, 3.0), &boundaries), None);
        // Just off the second island
        assert_eq!(classify(&GeoPoint::new(6.05, 5.5), &boundaries).as_deref(), Some("IS"));
    }

    #[test]
    fn test_holes_ignored_unless_configured() {
        let outer = vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(4.0, 0.0),
            GeoPoint::new(4.0, 4.0),
            GeoPoint::new(0.0, 4.0),
        ];
        let hole = vec![
            GeoPoint::new(1.0, 1.0),
            GeoPoint::new(2.0, 1.0),
            GeoPoint::new(2.0, 2.0),
            GeoPoint::new(1.0, 2.0),
        ];
        let feature = BoundaryFeature::new(
            "AA",
            "Alpha",
            GeometryKind::Polygon,
            vec![BoundaryPolygon { outer, holes: vec![hole] }],
        );
        let boundaries = BoundaryCollection::new(vec![feature]);
        let in_hole = GeoPoint::new(1.5, 1.5);

        assert_eq!(classify(&in_hole, &boundaries).as_deref(), Some("AA"));

        let strict = ClassifyConfig {
            subtract_holes: true,
            ..ClassifyConfig::default()
        };
        assert_eq!(classify_with_config(&in_hole, &boundaries, &strict), None);
        assert_eq!(classify_with_config(&GeoPoint::new(3.0, 3.0), &boundaries, &strict).as_deref(), Some("AA"));
    }

    #[test]
    fn test_paris_in_france() {
        // Coarse hexagon around mainland France, GeoJSON [lng, lat] order
        let france = BoundaryFeature::polygon(
            "FR",
            vec![
                GeoPoint::new(-4.8, 48.4),
                GeoPoint::new(-1.8, 43.4),
                GeoPoint::new(3.2, 42.4),
                GeoPoint::new(7.6, 43.8),
                GeoPoint::new(8.2, 49.0),
                GeoPoint::new(2.5, 51.1),
                GeoPoint::new(-4.8, 48.4),
            ],
        );
        let boundaries = BoundaryCollection::new(vec![france]);

        let paris = GeoPoint::from_lat_lng(48.8566, 2.3522);
        assert_eq!(classify(&paris, &boundaries).as_deref(), Some("FR"));

        // Swapped order lands in the Indian Ocean off Somalia
        let swapped = GeoPoint::new(48.8566, 2.3522);
        assert_eq!(classify(&swapped, &boundaries), None);
    }
}
