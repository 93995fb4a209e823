// Many readers over one mapped region see the same answers as one reader.

mod common;

use std::thread;

use quadstore::{MappedHandle, TileKey, TileLookup};

use common::{build_and_open, random_features, world};

fn snapshot(handle: &MappedHandle, keys: &[TileKey]) -> Vec<(TileKey, Vec<i64>)> {
    keys.iter()
        .map(|&key| {
            let ids = match handle.resolve(key) {
                TileLookup::Populated(view) => view.features().map(|f| f.unwrap().id()).collect(),
                TileLookup::Empty => Vec::new(),
            };
            (key, ids)
        })
        .collect()
}

#[test]
fn concurrent_resolves_match_sequential() {
    let dir = tempfile::tempdir().unwrap();
    let (_, handle) = build_and_open(dir.path(), "c.qst", &random_features(99, 500), &world(8));

    // Populated keys plus their neighbours, some of which are empty.
    let mut keys: Vec<TileKey> = handle.populated_keys().collect();
    keys.extend(handle.populated_keys().filter_map(|k| TileKey::new(k.zoom(), k.x() ^ 1, k.y())));
    keys.push(TileKey::new(8, 0, 255).unwrap());

    let expected = snapshot(&handle, &keys);
    assert!(expected.iter().any(|(_, ids)| ids.is_empty()));

    thread::scope(|s| {
        let workers: Vec<_> = (0..8)
            .map(|t| {
                let handle = &handle;
                let keys = &keys;
                s.spawn(move || {
                    let mut rotated = keys.clone();
                    rotated.rotate_left(t * keys.len() / 8);
                    let mut got = snapshot(handle, &rotated);
                    got.rotate_right(t * keys.len() / 8);
                    got
                })
            })
            .collect();
        for worker in workers {
            assert_eq!(worker.join().unwrap(), expected);
        }
    });
}
