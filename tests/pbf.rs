// Decoding the checked-in OSM PBF extract at tests/data/sample.osm.pbf.
//
// The extract holds two data blocks. The first has a plain node 1
// (amenity=cafe, name=Corner) and dense nodes 10..=14, of which only 14
// (tourism=viewpoint) is tagged. The second has four ways: 100 is a closed
// building ring, 101 references one missing node, 102 references only one
// known node, 103 is a closed highway ring.

use std::path::PathBuf;

use quadstore::decode::{collect, source_for_path};
use quadstore::{build_index, Coord, GeometryKind, IndexConfig, MappedHandle, PbfSource, TileKey};

fn sample() -> PbfSource {
    PbfSource::new(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/sample.osm.pbf"))
}

#[test]
fn tagged_nodes_become_points() {
    let features = collect(&sample()).unwrap();

    let cafe = &features[0];
    assert_eq!((cafe.id(), cafe.kind()), (1, GeometryKind::Point));
    assert_eq!(cafe.coords(), [Coord::new(100_000_000, 200_000_000)]);
    assert_eq!(cafe.tag("amenity"), Some("cafe"));
    assert_eq!(cafe.tag("name"), Some("Corner"));

    let viewpoint = &features[1];
    assert_eq!((viewpoint.id(), viewpoint.kind()), (14, GeometryKind::Point));
    assert_eq!(viewpoint.coords(), [Coord::new(-50_000_000, 35_000_000)]);
    assert_eq!(viewpoint.tags().len(), 1);
}

#[test]
fn ways_resolve_node_positions() {
    let features = collect(&sample()).unwrap();
    let (a, b, c, d) = (Coord::new(0, 0), Coord::new(0, 10_000), Coord::new(10_000, 10_000), Coord::new(10_000, 0));

    let building = &features[2];
    assert_eq!((building.id(), building.kind()), (100, GeometryKind::Area));
    assert_eq!(building.coords(), [a, b, c, d, a]);

    // The missing node is skipped; two resolvable nodes still make a way.
    let service = &features[3];
    assert_eq!((service.id(), service.kind()), (101, GeometryKind::Way));
    assert_eq!(service.coords(), [a, b]);

    // Closed, but highway tags alone do not make an area.
    let ring = &features[4];
    assert_eq!((ring.id(), ring.kind()), (103, GeometryKind::Way));
    assert_eq!(ring.coords(), [a, b, c, a]);
    assert_eq!(ring.tag("highway"), Some("residential"));
}

#[test]
fn untagged_nodes_and_short_ways_are_dropped() {
    let features = collect(&sample()).unwrap();
    let ids: Vec<i64> = features.iter().map(|f| f.id()).collect();
    assert_eq!(ids, [1, 14, 100, 101, 103]);
}

#[test]
fn rescanning_yields_the_same_features() {
    let source = sample();
    assert_eq!(collect(&source).unwrap(), collect(&source).unwrap());

    let boxed = source_for_path(source.path());
    assert_eq!(collect(boxed.as_ref()).unwrap(), collect(&source).unwrap());
}

#[test]
fn builds_an_index_over_the_extract() {
    let dir = tempfile::tempdir().unwrap();
    let config = IndexConfig::default().with_max_depth(6);
    let artifact = build_index(&sample(), &config, &dir.path().join("sample.qst")).unwrap();
    assert_eq!(artifact.feature_count(), 5);

    let handle = MappedHandle::open(artifact.path()).unwrap();
    let root = handle.grid().root();
    assert_eq!(root.min(), Coord::new(-50_000_000, 0));
    assert_eq!(root.max(), Coord::new(100_000_000, 200_000_000));

    let ids: Vec<i64> = handle.resolve(TileKey::ROOT).view().unwrap()
        .features()
        .map(|f| f.unwrap().id())
        .collect();
    assert_eq!(ids, [1, 14, 100, 101, 103]);
}
