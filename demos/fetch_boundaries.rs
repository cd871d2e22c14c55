//! Fetch the world boundaries dataset and classify a few cities.
//!
//! Run with: cargo run --example fetch_boundaries --features http

use country_matcher::{BoundaryFetcher, BoundaryIndex, GeoPoint};
use std::sync::Arc;
use std::time::Instant;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let fetcher = match BoundaryFetcher::new() {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Failed to create fetcher: {}", e);
            return;
        }
    };

    println!("Fetching {}", fetcher.url());
    let start = Instant::now();
    let boundaries = fetcher.fetch_or_empty().await;
    println!("Loaded {} features in {:?}\n", boundaries.len(), start.elapsed());

    if boundaries.is_empty() {
        println!("Boundaries unavailable, nothing to classify");
        return;
    }

    let index = BoundaryIndex::new(Arc::new(boundaries));
    let cities = [
        ("Paris", 48.8566, 2.3522),
        ("Wellington", -41.2865, 174.7762),
        ("Nairobi", -1.2921, 36.8219),
        ("Reykjavik", 64.1466, -21.9426),
        ("Point Nemo", -48.8767, -123.3933),
    ];

    for (name, lat, lng) in cities {
        let code = index.classify(&GeoPoint::from_lat_lng(lat, lng));
        println!("  {:<12} -> {}", name, code.as_deref().unwrap_or("none"));
    }
}
