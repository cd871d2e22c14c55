//! Classify a handful of activity start points against a tiny boundary set.
//!
//! Run with: cargo run --example classify_countries

use country_matcher::{
    aggregate_visited_countries, classify_detailed, parse_boundaries, ActivityLocation,
    ClassifyConfig, GeoPoint,
};

const BOUNDARIES: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {
            "type": "Feature",
            "properties": { "ISO3166-1-Alpha-2": "FR", "name": "France" },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[-4.8, 48.4], [-1.8, 43.4], [3.2, 42.4], [7.6, 43.8], [8.2, 49.0], [2.5, 51.1], [-4.8, 48.4]]]
            }
        },
        {
            "type": "Feature",
            "properties": { "ISO3166-1-Alpha-2": "GB", "name": "United Kingdom" },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[-5.7, 50.0], [1.8, 51.1], [1.7, 52.9], [-3.0, 58.6], [-6.2, 56.5], [-5.7, 50.0]]]
            }
        }
    ]
}"#;

fn main() {
    let boundaries = match parse_boundaries(BOUNDARIES) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Failed to load boundaries: {}", e);
            return;
        }
    };
    let config = ClassifyConfig::default();

    println!("Country Classification Examples\n");
    println!("Config: fallback_threshold={}°, cache_decimals={}\n",
        config.fallback_threshold_degrees, config.cache_decimals);

    let points = [
        ("Paris", GeoPoint::from_lat_lng(48.8566, 2.3522)),
        ("London", GeoPoint::from_lat_lng(51.5074, -0.1278)),
        ("Just off Dunkirk", GeoPoint::from_lat_lng(51.16, 2.52)),
        ("Mid-Atlantic", GeoPoint::from_lat_lng(45.0, -30.0)),
    ];

    for (label, point) in &points {
        match classify_detailed(point, &boundaries, &config) {
            Some(c) => println!(
                "  {:<18} -> {} ({}) via {:?}, {:.0}m from boundary",
                label, c.country_code, c.country_name, c.method, c.distance_meters
            ),
            None => println!("  {:<18} -> no country", label),
        }
    }

    let activities = vec![
        ActivityLocation::new("morning-run", Some(vec![48.8566, 2.3522])),
        ActivityLocation::new("evening-run", Some(vec![48.8601, 2.3499])),
        ActivityLocation::new("commute", Some(vec![51.5074, -0.1278])),
        ActivityLocation::new("treadmill", None),
    ];

    let visited = aggregate_visited_countries(&activities, Some(&boundaries));

    println!("\nVisited countries:");
    for (code, count) in visited.country_counts() {
        let name = boundaries.country_name(&code).unwrap_or("unknown");
        println!("  {} ({}): {} activities", code, name, count);
    }
}
