// Rendering resolved tiles to PNG through the raster adapter.

mod common;

use quadstore::{
    render_tile, Coord, GeographicFeature, GeometryKind, RasterRenderer, RenderAdapter, RenderConfig, RenderContext,
    TileKey, TileRequest,
};

use common::{build_and_open, point, world};

fn decode(png: &[u8]) -> image::RgbaImage {
    image::load_from_memory(png).unwrap().to_rgba8()
}

#[test]
fn renders_png_of_configured_size() {
    let dir = tempfile::tempdir().unwrap();
    let way = GeographicFeature::new(
        2,
        GeometryKind::Way,
        vec![Coord::new(100_000_000, -100_000_000), Coord::new(-100_000_000, 100_000_000)],
        [("highway", "primary")],
    ).unwrap();
    let (_, handle) = build_and_open(dir.path(), "r.qst", &[point(1, 450_000_000, 900_000_000), way], &world(3));

    let config = RenderConfig { tile_size: 64, ..RenderConfig::default() };
    let background = image::Rgba(config.background);
    let ctx = RenderContext::acquire(config).unwrap();
    let renderer = RasterRenderer::new(&ctx);

    let root = decode(&render_tile(&renderer, &handle, TileKey::ROOT).unwrap());
    assert_eq!(root.dimensions(), (64, 64));
    assert!(root.pixels().any(|p| *p != background));

    // The point at 45N 90E sits at the centre of zoom-1 tile (1, 0).
    let ne = decode(&render_tile(&renderer, &handle, TileKey::new(1, 1, 0).unwrap()).unwrap());
    assert_ne!(*ne.get_pixel(32, 32), background);

    assert_eq!(ctx.rendered(), 2);
}

#[test]
fn empty_and_deep_tiles_are_background() {
    let dir = tempfile::tempdir().unwrap();
    let (_, handle) = build_and_open(dir.path(), "e.qst", &[point(1, 450_000_000, 900_000_000)], &world(2));

    let ctx = RenderContext::acquire(RenderConfig { tile_size: 32, ..RenderConfig::default() }).unwrap();
    let renderer = RasterRenderer::new(&ctx);
    let background = image::Rgba(ctx.config().background);

    for key in [TileKey::new(2, 0, 3).unwrap(), TileKey::new(6, 10, 10).unwrap()] {
        let png = render_tile(&renderer, &handle, key).unwrap();
        let img = decode(&png);
        assert_eq!(img.dimensions(), (32, 32));
        assert!(img.pixels().all(|p| *p == background), "{key}");
    }
}

#[test]
fn adapter_is_usable_as_a_trait_object() {
    let dir = tempfile::tempdir().unwrap();
    let (_, handle) = build_and_open(dir.path(), "t.qst", &[point(1, 0, 0)], &world(1));
    let ctx = RenderContext::acquire(RenderConfig::default()).unwrap();
    let adapters: Vec<Box<dyn RenderAdapter + '_>> = vec![Box::new(RasterRenderer::new(&ctx))];

    for adapter in &adapters {
        let png = render_tile(adapter.as_ref(), &handle, TileKey::ROOT).unwrap();
        assert_eq!(decode(&png).dimensions(), (256, 256));
    }
}

#[test]
fn narrow_root_cells_render_as_background() {
    // A single point as the dataset root: only the north-west chain has a cell.
    let dir = tempfile::tempdir().unwrap();
    let config = quadstore::IndexConfig::default().with_max_depth(2);
    let (_, handle) = build_and_open(dir.path(), "n.qst", &[point(1, 10, 20)], &config);
    let ctx = RenderContext::acquire(RenderConfig { tile_size: 16, ..RenderConfig::default() }).unwrap();
    let renderer = RasterRenderer::new(&ctx);
    let background = image::Rgba(ctx.config().background);

    for key in [TileKey::new(1, 1, 1).unwrap(), TileKey::new(1, 0, 1).unwrap(), TileKey::new(2, 3, 3).unwrap()] {
        assert!(handle.grid().cell_bounds(key).is_none());
        assert!(handle.resolve(key).is_empty());
        let img = decode(&render_tile(&renderer, &handle, key).unwrap());
        assert_eq!(img.dimensions(), (16, 16));
        assert!(img.pixels().all(|p| *p == background), "{key}");
    }

    let request = TileRequest::new(&handle, TileKey::new(2, 3, 3).unwrap()).unwrap();
    assert_eq!(request.bounds, *handle.grid().root());
}

#[test]
fn invalid_tile_size_is_rejected() {
    assert!(RenderContext::acquire(RenderConfig { tile_size: 1, ..RenderConfig::default() }).is_err());
    assert!(RenderContext::acquire(RenderConfig { point_radius: u32::MAX, ..RenderConfig::default() }).is_err());
}
