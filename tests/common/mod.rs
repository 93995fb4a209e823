// Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::path::Path;

use quadstore::{
    build_index, Coord, GeographicFeature, GeometryKind, IndexArtifact, IndexConfig, MappedHandle, RootExtent,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const NO_TAGS: [(&str, &str); 0] = [];

pub fn point(id: i64, lat: i32, lon: i32) -> GeographicFeature {
    GeographicFeature::point(id, Coord::new(lat, lon), NO_TAGS).unwrap()
}

pub fn world(max_depth: u8) -> IndexConfig {
    IndexConfig::default().with_max_depth(max_depth).with_extent(RootExtent::World)
}

/// Build `features` into `dir/name` and map the result.
pub fn build_and_open(dir: &Path, name: &str, features: &[GeographicFeature], config: &IndexConfig) -> (IndexArtifact, MappedHandle) {
    let artifact = build_index(features, config, &dir.join(name)).unwrap();
    let handle = MappedHandle::open(artifact.path()).unwrap();
    (artifact, handle)
}

/// A reproducible mix of points, short ways and small areas around central Europe.
pub fn random_features(seed: u64, count: usize) -> Vec<GeographicFeature> {
    let mut rng = StdRng::seed_from_u64(seed);
    let amenities = ["cafe", "school", "bench", "pharmacy"];
    let highways = ["residential", "primary", "footway"];

    (0..count)
        .map(|i| {
            let lat = rng.random_range(450_000_000..550_000_000);
            let lon = rng.random_range(50_000_000..150_000_000);
            let id = i as i64 + 1;
            match rng.random_range(0..3) {
                0 => GeographicFeature::point(id, Coord::new(lat, lon), [("amenity", amenities[i % amenities.len()])]).unwrap(),
                1 => {
                    let coords = (0..rng.random_range(2..6))
                        .map(|_| Coord::new(lat + rng.random_range(-200_000..200_000), lon + rng.random_range(-200_000..200_000)))
                        .collect();
                    GeographicFeature::new(id, GeometryKind::Way, coords, [("highway", highways[i % highways.len()]), ("name", "Hauptstraße")]).unwrap()
                }
                _ => {
                    let d = rng.random_range(1_000..50_000);
                    let coords = vec![
                        Coord::new(lat, lon),
                        Coord::new(lat + d, lon),
                        Coord::new(lat + d, lon + d),
                        Coord::new(lat, lon + d),
                        Coord::new(lat, lon),
                    ];
                    GeographicFeature::new(id, GeometryKind::Area, coords, [("building", "yes")]).unwrap()
                }
            }
        })
        .collect()
}
