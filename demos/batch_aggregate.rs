//! Aggregate a large synthetic activity list sequentially, with the R-tree
//! index, and in parallel.
//!
//! Run with: cargo run --release --example batch_aggregate --features parallel

use std::sync::Arc;
use std::time::Instant;

use country_matcher::{
    aggregate_indexed, aggregate_visited_countries_parallel, aggregate_with_config,
    ActivityLocation, BoundaryCollection, BoundaryFeature, BoundaryIndex, ClassifyConfig, GeoPoint,
};

/// A 20x20 grid of 1°-wide "countries" with 0.2° gaps between them.
fn synthetic_boundaries() -> BoundaryCollection {
    let mut features = Vec::new();
    for row in 0..20 {
        for col in 0..20 {
            let lng = col as f64 * 1.2;
            let lat = row as f64 * 1.2;
            let code = format!("{}{}", (b'A' + row as u8) as char, (b'A' + col as u8) as char);
            features.push(BoundaryFeature::polygon(
                code,
                vec![
                    GeoPoint::new(lng, lat),
                    GeoPoint::new(lng + 1.0, lat),
                    GeoPoint::new(lng + 1.0, lat + 1.0),
                    GeoPoint::new(lng, lat + 1.0),
                ],
            ));
        }
    }
    BoundaryCollection::new(features)
}

/// Activities clustered around a few "home towns".
fn synthetic_activities(count: usize) -> Vec<ActivityLocation> {
    let towns = [(0.5, 0.5), (5.3, 7.9), (12.1, 3.3), (20.0, 20.0), (11.5, 11.55)];
    (0..count)
        .map(|i| {
            let (lat, lng) = towns[i % towns.len()];
            let jitter = (i % 97) as f64 * 0.0007;
            ActivityLocation::new(format!("activity-{}", i), Some(vec![lat + jitter, lng - jitter]))
        })
        .collect()
}

fn main() {
    let boundaries = Arc::new(synthetic_boundaries());
    let activities = synthetic_activities(20_000);
    let config = ClassifyConfig::default();

    println!("Batch Aggregation\n");
    println!("{} features, {} activities\n", boundaries.len(), activities.len());

    let start = Instant::now();
    let sequential = aggregate_with_config(&activities, Some(&boundaries), &config);
    println!("Sequential: {} countries in {:?}", sequential.countries.len(), start.elapsed());

    let index = BoundaryIndex::new(Arc::clone(&boundaries));
    let start = Instant::now();
    let indexed = aggregate_indexed(&activities, Some(&index), &config);
    println!("Indexed:    {} countries in {:?}", indexed.countries.len(), start.elapsed());

    let start = Instant::now();
    let parallel = aggregate_visited_countries_parallel(&activities, Some(&boundaries), &config);
    println!("Parallel:   {} countries in {:?}", parallel.countries.len(), start.elapsed());

    println!("\nResults identical: {}", sequential == indexed && sequential == parallel);
    for (code, count) in sequential.country_counts() {
        println!("  {}: {}", code, count);
    }
}
