// Building from newline-delimited GeoJSON files, plain and gzipped.

mod common;

use std::io::Write;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use quadstore::decode::collect;
use quadstore::{build_index, BuildError, DecodeError, GeoJsonSeqSource, GeometryKind, IndexConfig, MappedHandle, TileKey};

const SAMPLE: &str = concat!(
    r#"{"type":"Feature","id":10,"geometry":{"type":"Point","coordinates":[13.3777,52.5163]},"properties":{"name":"Brandenburger Tor","tourism":"attraction"}}"#, "\n",
    "\n",
    "\u{1e}", r#"{"type":"Feature","id":11,"geometry":{"type":"LineString","coordinates":[[13.37,52.51],[13.38,52.52],[13.39,52.52]]},"properties":{"highway":"primary","lanes":4}}"#, "\n",
    r#"{"type":"Feature","geometry":{"type":"MultiPolygon","coordinates":[[[[13.40,52.50],[13.41,52.50],[13.41,52.51],[13.40,52.50]]],[[[13.42,52.50],[13.43,52.50],[13.43,52.51],[13.42,52.50]]]]},"properties":{"landuse":"grass"}}"#, "\n",
    r#"{"type":"Feature","id":13,"geometry":null,"properties":{"note":"no geometry"}}"#, "\n",
);

fn gzip(path: &Path, text: &str) {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    std::fs::write(path, encoder.finish().unwrap()).unwrap();
}

#[test]
fn decodes_sequence_with_separators_and_multis() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("berlin.geojsonseq");
    std::fs::write(&path, SAMPLE).unwrap();

    let features = collect(&GeoJsonSeqSource::new(&path)).unwrap();
    assert_eq!(features.len(), 4);
    assert_eq!(features[0].id(), 10);
    assert_eq!(features[0].tag("name"), Some("Brandenburger Tor"));
    assert_eq!(features[1].kind(), GeometryKind::Way);
    assert_eq!(features[1].tag("lanes"), Some("4"));
    // Missing id: the 1-based line number of the record.
    assert_eq!(features[2].id(), 4);
    assert_eq!(features[3].id(), 4);
    assert!(features[2..].iter().all(|f| f.kind() == GeometryKind::Area));

    // Restartable: a second scan yields the same sequence.
    assert_eq!(collect(&GeoJsonSeqSource::new(&path)).unwrap(), features);
}

#[test]
fn gzip_input_matches_plain() {
    let dir = tempfile::tempdir().unwrap();
    let plain = dir.path().join("a.geojsonseq");
    let packed = dir.path().join("a.geojsonseq.gz");
    std::fs::write(&plain, SAMPLE).unwrap();
    gzip(&packed, SAMPLE);

    assert_eq!(
        collect(&GeoJsonSeqSource::new(&plain)).unwrap(),
        collect(&GeoJsonSeqSource::new(&packed)).unwrap(),
    );
}

#[test]
fn builds_an_index_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("berlin.geojsonseq");
    std::fs::write(&input, SAMPLE).unwrap();

    let source = quadstore::decode::source_for_path(&input);
    let artifact = build_index(source.as_ref(), &IndexConfig::default().with_max_depth(6), &dir.path().join("berlin.qst")).unwrap();
    assert_eq!(artifact.feature_count(), 4);

    let handle = MappedHandle::open(artifact.path()).unwrap();
    let root = handle.resolve(TileKey::ROOT).view().unwrap();
    let tourism: Vec<&str> = root.features()
        .filter_map(|f| f.unwrap().tag("tourism"))
        .collect();
    assert_eq!(tourism, ["attraction"]);
}

#[test]
fn malformed_line_aborts_build_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bad.geojsonseq");
    let mut text = SAMPLE.to_string();
    text.push_str("{\"type\":\"Feature\",\"geometry\":\n");
    std::fs::write(&input, text).unwrap();

    let output = dir.path().join("bad.qst");
    let err = build_index(&GeoJsonSeqSource::new(&input), &IndexConfig::default(), &output).unwrap_err();
    assert!(matches!(err, BuildError::Decode(DecodeError::Malformed { line: 6, .. })), "{err}");
    assert!(!output.exists());
}

#[test]
fn invalid_coordinate_is_reported_with_record() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("range.geojsonseq");
    std::fs::write(&input, r#"{"type":"Feature","geometry":{"type":"Point","coordinates":[200.0,10.0]}}"#).unwrap();

    let err = collect(&GeoJsonSeqSource::new(&input)).unwrap_err();
    assert!(matches!(err, DecodeError::InvalidFeature { record: 1, .. }));
}

#[test]
fn truncated_gzip_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let full = dir.path().join("full.gz");
    gzip(&full, SAMPLE);
    let mut bytes = std::fs::read(&full).unwrap();
    bytes.truncate(bytes.len() - 4);
    let cut = dir.path().join("cut.geojsonseq.gz");
    std::fs::write(&cut, bytes).unwrap();

    assert!(matches!(collect(&GeoJsonSeqSource::new(&cut)), Err(DecodeError::Io { .. })));
}

#[test]
fn missing_file_is_an_io_error() {
    let source = GeoJsonSeqSource::new("/nonexistent/input.geojsonseq");
    assert!(matches!(collect(&source), Err(DecodeError::Io { .. })));
}
