// Every cell the partitioner produces resolves to exactly the features
// assigned to it, read back from the mapped region.

mod common;

use quadstore::{partition_source, GeographicFeature, IndexConfig, MappedHandle, TileKey, TileLookup};
use quadstore::index::serialize;

use common::{random_features, world};

fn read_tile(handle: &MappedHandle, key: TileKey) -> Vec<GeographicFeature> {
    match handle.resolve(key) {
        TileLookup::Populated(view) => view.features()
            .map(|f| f.unwrap().to_feature().unwrap())
            .collect(),
        TileLookup::Empty => Vec::new(),
    }
}

fn assert_round_trip(features: &[GeographicFeature], config: &IndexConfig) {
    let dir = tempfile::tempdir().unwrap();
    let partition = partition_source(features, config).unwrap();
    let artifact = serialize(&partition, &dir.path().join("tiles.qst")).unwrap();
    let handle = MappedHandle::open(artifact.path()).unwrap();

    assert_eq!(handle.tile_count(), partition.cells().len() as u64);
    assert_eq!(handle.feature_count(), features.len() as u64);

    for cell in partition.cells() {
        let expected: Vec<GeographicFeature> = cell.features().iter()
            .map(|&i| features[i as usize].clone())
            .collect();
        assert_eq!(read_tile(&handle, cell.key()), expected, "tile {}", cell.key());
    }

    let populated: Vec<TileKey> = handle.populated_keys().collect();
    let assigned: Vec<TileKey> = partition.cells().map(|c| c.key()).collect();
    assert_eq!(populated, assigned);
}

#[test]
fn random_mix_world_extent() {
    assert_round_trip(&random_features(7, 400), &world(8));
}

#[test]
fn random_mix_dataset_extent() {
    assert_round_trip(&random_features(11, 250), &IndexConfig::default().with_max_depth(10));
}

#[test]
fn every_feature_is_reachable_at_max_depth() {
    let features = random_features(3, 150);
    let dir = tempfile::tempdir().unwrap();
    let config = world(9);
    let artifact = quadstore::build_index(features.as_slice(), &config, &dir.path().join("t.qst")).unwrap();
    let handle = MappedHandle::open(artifact.path()).unwrap();

    for feature in &features {
        let first = feature.coords()[0];
        let key = handle.grid().locate(first, 9).unwrap();
        assert!(read_tile(&handle, key).contains(feature), "feature {} missing from {key}", feature.id());
    }
}

#[test]
fn tags_survive_through_the_dictionary() {
    let features = random_features(5, 60);
    let dir = tempfile::tempdir().unwrap();
    let artifact = quadstore::build_index(features.as_slice(), &world(0), &dir.path().join("t.qst")).unwrap();
    let handle = MappedHandle::open(artifact.path()).unwrap();

    let root = handle.resolve(TileKey::ROOT).view().unwrap();
    assert_eq!(root.feature_count(), 60);
    for (view, original) in root.features().map(Result::unwrap).zip(&features) {
        assert_eq!(view.id(), original.id());
        let tags: Vec<(&str, &str)> = view.tags().collect();
        let expected: Vec<(&str, &str)> = original.tags().iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(tags, expected);
        assert_eq!(view.bbox(), *original.bbox());
    }
}
