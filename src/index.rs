//! R-tree over feature bounding boxes.
//!
//! A full classification scans every feature. With a world dataset and
//! thousands of activities, most of that work is spent on countries nowhere
//! near the point. [`BoundaryIndex`] narrows each pass to features whose
//! bounding box could matter, then runs the same passes over those
//! candidates in collection order, so results are identical to
//! [`classify_detailed`](crate::classify_detailed).

use std::sync::Arc;

use log::debug;
use rstar::{RTree, RTreeObject, AABB};

use crate::boundaries::BoundaryCollection;
use crate::classifier::{resolve, Classification};
use crate::{Bounds, ClassifyConfig, GeoPoint};

/// Bounding box of one feature (used for spatial indexing).
#[derive(Debug, Clone)]
struct FeatureBounds {
    feature_index: usize,
    bounds: Bounds,
}

impl RTreeObject for FeatureBounds {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bounds.min_lng, self.bounds.min_lat],
            [self.bounds.max_lng, self.bounds.max_lat],
        )
    }
}

/// A boundary collection with a spatial index for candidate lookup.
pub struct BoundaryIndex {
    collection: Arc<BoundaryCollection>,
    rtree: RTree<FeatureBounds>,
}

impl BoundaryIndex {
    /// Build the index. Features with no coordinates are left out; they can
    /// never match anyway.
    pub fn new(collection: Arc<BoundaryCollection>) -> Self {
        let entries: Vec<FeatureBounds> = collection
            .features()
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.bounds.is_empty())
            .map(|(feature_index, f)| FeatureBounds {
                feature_index,
                bounds: f.bounds,
            })
            .collect();

        debug!(
            "[BoundaryIndex] Indexed {}/{} features",
            entries.len(),
            collection.len()
        );

        Self {
            collection,
            rtree: RTree::bulk_load(entries),
        }
    }

    pub fn collection(&self) -> &BoundaryCollection {
        &self.collection
    }

    /// Shared handle to the underlying collection.
    pub fn shared_collection(&self) -> Arc<BoundaryCollection> {
        Arc::clone(&self.collection)
    }

    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }

    /// Indices of features whose box intersects `envelope`, in collection order.
    fn candidates(&self, envelope: &AABB<[f64; 2]>) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .rtree
            .locate_in_envelope_intersecting(envelope)
            .map(|entry| entry.feature_index)
            .collect();
        indices.sort_unstable();
        indices
    }

    /// Classify a point with the default configuration.
    pub fn classify(&self, point: &GeoPoint) -> Option<String> {
        self.classify_detailed(point, &ClassifyConfig::default())
            .map(|c| c.country_code)
    }

    /// Classify a point, returning match details.
    pub fn classify_detailed(&self, point: &GeoPoint, config: &ClassifyConfig) -> Option<Classification> {
        if !point.is_finite() {
            return None;
        }

        let x = point.longitude;
        let y = point.latitude;
        let features = self.collection.features();

        let containing = self.candidates(&AABB::from_point([x, y]));

        // Any feature within the threshold has a box within the threshold too.
        let t = config.fallback_threshold_degrees;
        let nearby = self.candidates(&AABB::from_corners([x - t, y - t], [x + t, y + t]));

        resolve(
            point,
            containing.iter().map(|&i| &features[i]),
            nearby.iter().map(|&i| &features[i]),
            config,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundaries::BoundaryFeature;
    use crate::classifier::classify_detailed;

    fn square(code: &str, min_lng: f64, min_lat: f64, size: f64) -> BoundaryFeature {
        BoundaryFeature::polygon(
            code,
            vec![
                GeoPoint::new(min_lng, min_lat),
                GeoPoint::new(min_lng + size, min_lat),
                GeoPoint::new(min_lng + size, min_lat + size),
                GeoPoint::new(min_lng, min_lat + size),
            ],
        )
    }

    fn grid_collection() -> Arc<BoundaryCollection> {
        let mut features = Vec::new();
        for row in 0..6 {
            for col in 0..6 {
                let code = format!("{}{}", (b'A' + row as u8) as char, (b'A' + col as u8) as char);
                features.push(square(&code, col as f64 * 1.05, row as f64 * 1.05, 1.0));
            }
        }
        // Overlapping feature appended last; earlier squares must still win
        features.push(square("ZZ", 0.0, 0.0, 7.0));
        features.push(BoundaryFeature::polygon("XX", vec![]));
        Arc::new(BoundaryCollection::new(features))
    }

    #[test]
    fn test_index_matches_linear_scan() {
        let collection = grid_collection();
        let index = BoundaryIndex::new(Arc::clone(&collection));
        let config = ClassifyConfig::default();

        let mut lng = -1.0;
        while lng < 8.0 {
            let mut lat = -1.0;
            while lat < 8.0 {
                let p = GeoPoint::new(lng, lat);
                assert_eq!(
                    index.classify_detailed(&p, &config),
                    classify_detailed(&p, &collection, &config),
                    "mismatch at {:?}",
                    p
                );
                lat += 0.173;
            }
            lng += 0.131;
        }
    }

    #[test]
    fn test_index_preserves_collection_order() {
        let index = BoundaryIndex::new(grid_collection());
        // Inside both "AA" and the later "ZZ"
        assert_eq!(index.classify(&GeoPoint::new(0.5, 0.5)).as_deref(), Some("AA"));
        // In a gap between squares but inside "ZZ"
        assert_eq!(index.classify(&GeoPoint::new(1.025, 0.5)).as_deref(), Some("ZZ"));
    }

    #[test]
    fn test_index_fallback_and_miss() {
        let index = BoundaryIndex::new(Arc::new(BoundaryCollection::new(vec![square("AA", 0.0, 0.0, 1.0)])));
        assert_eq!(index.classify(&GeoPoint::new(1.05, 0.5)).as_deref(), Some("AA"));
        assert_eq!(index.classify(&GeoPoint::new(1.2, 0.5)), None);
        assert_eq!(index.classify(&GeoPoint::new(f64::NAN, 0.5)), None);
    }

    #[test]
    fn test_empty_index() {
        let index = BoundaryIndex::new(Arc::new(BoundaryCollection::empty()));
        assert!(index.is_empty());
        assert_eq!(index.classify(&GeoPoint::new(0.0, 0.0)), None);
    }
}
