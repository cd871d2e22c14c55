//! # Geographic Utilities
//!
//! Planar geometry helpers for testing points against country boundary rings.
//!
//! Boundary matching works in degree space: coordinates are treated as plane
//! (x = longitude, y = latitude) values rather than points on a sphere. This is
//! what the fallback threshold is expressed in, so it must stay planar.
//! Haversine distance is only used for reporting.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`point_in_ring`] | Ray-casting containment test against a closed ring |
//! | [`point_segment_distance_sq`] | Squared degree distance from a point to a segment |
//! | [`nearest_on_ring`] | Closest point on a ring's edges and its squared distance |
//! | [`ring_distance_sq`] | Squared degree distance from a point to a ring |
//! | [`compute_bounds`] | Bounding box of a ring |
//! | [`haversine_distance`] | Great-circle distance between two points |
//!
//! ## Example
//!
//! ```rust
//! use country_matcher::{GeoPoint, geo_utils};
//!
//! let square = vec![
//!     GeoPoint::new(0.0, 0.0),
//!     GeoPoint::new(1.0, 0.0),
//!     GeoPoint::new(1.0, 1.0),
//!     GeoPoint::new(0.0, 1.0),
//! ];
//!
//! assert!(geo_utils::point_in_ring(&GeoPoint::new(0.5, 0.5), &square));
//! assert!(!geo_utils::point_in_ring(&GeoPoint::new(1.5, 0.5), &square));
//!
//! // 0.05 degrees east of the right-hand edge
//! let d2 = geo_utils::ring_distance_sq(&GeoPoint::new(1.05, 0.5), &square);
//! assert!((d2 - 0.0025).abs() < 1e-12);
//! ```
//!
//! ## Algorithm Notes
//!
//! ### Ray casting
//!
//! A horizontal ray is cast from the test point towards +x. An edge counts as a
//! crossing when exactly one of its endpoints lies strictly above the point's
//! latitude and the interpolated crossing longitude is greater than the point's
//! longitude. An odd number of crossings means the point is inside.
//!
//! Rings are treated as cycles: the last vertex connects back to the first,
//! whether or not the source data repeats the first vertex.

use geo::{Distance, Haversine, Point};
use crate::{Bounds, GeoPoint};

// =============================================================================
// Containment
// =============================================================================

/// Test whether a point lies inside a ring using the crossing-number rule.
///
/// Rings with fewer than 3 vertices enclose nothing and always return `false`.
pub fn point_in_ring(point: &GeoPoint, ring: &[GeoPoint]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let x = point.longitude;
    let y = point.latitude;
    let mut inside = false;
    let mut j = n - 1;

    for i in 0..n {
        let (xi, yi) = (ring[i].longitude, ring[i].latitude);
        let (xj, yj) = (ring[j].longitude, ring[j].latitude);

        if (yi > y) != (yj > y) {
            let crossing_x = (xj - xi) * (y - yi) / (yj - yi) + xi;
            if x < crossing_x {
                inside = !inside;
            }
        }
        j = i;
    }

    inside
}

// =============================================================================
// Distance Functions
// =============================================================================

/// Closest point to `p` on the segment `a`-`b`, in degree space.
///
/// The projection parameter is clamped to `[0, 1]`. A zero-length segment
/// collapses to its single endpoint.
#[inline]
pub fn closest_point_on_segment(p: &GeoPoint, a: &GeoPoint, b: &GeoPoint) -> GeoPoint {
    let dx = b.longitude - a.longitude;
    let dy = b.latitude - a.latitude;
    let len_sq = dx * dx + dy * dy;

    if len_sq == 0.0 {
        return *a;
    }

    let t = ((p.longitude - a.longitude) * dx + (p.latitude - a.latitude) * dy) / len_sq;
    let t = t.clamp(0.0, 1.0);

    GeoPoint::new(a.longitude + t * dx, a.latitude + t * dy)
}

/// Squared Euclidean distance (degrees²) from `p` to the segment `a`-`b`.
#[inline]
pub fn point_segment_distance_sq(p: &GeoPoint, a: &GeoPoint, b: &GeoPoint) -> f64 {
    let c = closest_point_on_segment(p, a, b);
    let dx = p.longitude - c.longitude;
    let dy = p.latitude - c.latitude;
    dx * dx + dy * dy
}

/// Find the closest point on any edge of a ring (including the closing edge).
///
/// Returns the squared degree distance and the closest point, or `None` for
/// rings with fewer than 2 vertices.
pub fn nearest_on_ring(point: &GeoPoint, ring: &[GeoPoint]) -> Option<(f64, GeoPoint)> {
    let n = ring.len();
    if n < 2 {
        return None;
    }

    let mut best: Option<(f64, GeoPoint)> = None;
    let mut j = n - 1;

    for i in 0..n {
        let closest = closest_point_on_segment(point, &ring[j], &ring[i]);
        let dx = point.longitude - closest.longitude;
        let dy = point.latitude - closest.latitude;
        let d2 = dx * dx + dy * dy;

        if best.map_or(true, |(b, _)| d2 < b) {
            best = Some((d2, closest));
        }
        j = i;
    }

    best
}

/// Squared degree distance from a point to a ring's boundary.
///
/// Degenerate rings (fewer than 2 vertices) are infinitely far away.
#[inline]
pub fn ring_distance_sq(point: &GeoPoint, ring: &[GeoPoint]) -> f64 {
    nearest_on_ring(point, ring).map_or(f64::INFINITY, |(d2, _)| d2)
}

/// Calculate the great-circle distance between two points using the Haversine formula.
///
/// Returns meters, assuming a spherical Earth with radius 6,371 km.
///
/// ```rust
/// use country_matcher::{GeoPoint, geo_utils};
///
/// let london = GeoPoint::new(-0.1278, 51.5074);
/// let paris = GeoPoint::new(2.3522, 48.8566);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 5000.0);
/// ```
#[inline]
pub fn haversine_distance(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Compute the bounding box of a set of points.
///
/// For empty input the result is inverted (min > max) and reports
/// [`Bounds::is_empty`].
pub fn compute_bounds(points: &[GeoPoint]) -> Bounds {
    let mut bounds = Bounds::empty();
    for p in points {
        bounds.extend(p);
    }
    bounds
}

// =============================================================================
// Unit Tests
// =============================================================================
