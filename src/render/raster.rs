use std::io::Cursor;

use geo::{Coord, CoordsIter, Geometry, LineString};
use image::{ImageFormat, Rgba, RgbaImage};
use tilegrid::{BoundingBox, SCALE};

use crate::error::RenderError;
use crate::render::{RenderAdapter, RenderContext, TileRequest};
use crate::store::TileLookup;

const POINT: Rgba<u8> = Rgba([200, 60, 40, 255]);
const WAY: Rgba<u8> = Rgba([90, 90, 90, 255]);
const AREA: Rgba<u8> = Rgba([60, 130, 70, 255]);

/// Projection function: lon/lat degrees -> pixel (x, y).
type Projection = dyn Fn(&Coord<f64>) -> (f64, f64);

/// Software rasterizer: points as filled squares, ways as lines, areas as
/// closed outlines. Output is PNG.
#[derive(Debug, Clone, Copy)]
pub struct RasterRenderer<'ctx> {
    ctx: &'ctx RenderContext,
}

impl<'ctx> RasterRenderer<'ctx> {
    pub fn new(ctx: &'ctx RenderContext) -> Self { Self { ctx } }
}

impl RenderAdapter for RasterRenderer<'_> {
    fn render(&self, request: &TileRequest<'_>) -> Result<Vec<u8>, RenderError> {
        let config = self.ctx.config();
        let size = config.tile_size;
        let mut canvas = RgbaImage::from_pixel(size, size, Rgba(config.background));

        if let TileLookup::Populated(view) = request.lookup {
            let project = projection(&request.bounds, size);
            for feature in view.features() {
                match feature?.to_geometry() {
                    Geometry::Point(p) => {
                        let (x, y) = project(&p.0);
                        draw_square(&mut canvas, x, y, config.point_radius, POINT);
                    }
                    Geometry::LineString(line) => draw_line_string(&mut canvas, &line, &project, WAY),
                    Geometry::Polygon(poly) => draw_line_string(&mut canvas, poly.exterior(), &project, AREA),
                    _ => {}
                }
            }
        }

        self.ctx.record_render();
        let mut buffer = Cursor::new(Vec::new());
        canvas.write_to(&mut buffer, ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }
}

/// Linear map from the cell box onto a `size` × `size` canvas, north up.
fn projection(bounds: &BoundingBox, size: u32) -> Box<Projection> {
    let scale = SCALE as f64;
    // Inclusive integer ranges: a cell spans max - min + 1 units.
    let left = bounds.min().lon as f64 / scale;
    let top = (bounds.max().lat as f64 + 1.0) / scale;
    let width = (bounds.max().lon as f64 - bounds.min().lon as f64 + 1.0) / scale;
    let height = (bounds.max().lat as f64 - bounds.min().lat as f64 + 1.0) / scale;
    let size = size as f64;
    Box::new(move |c: &Coord<f64>| ((c.x - left) / width * size, (top - c.y) / height * size))
}

fn draw_square(canvas: &mut RgbaImage, x: f64, y: f64, radius: u32, color: Rgba<u8>) {
    let (cx, cy, r) = (x.floor() as i64, y.floor() as i64, radius as i64);
    for py in cy - r..=cy + r {
        for px in cx - r..=cx + r {
            put(canvas, px, py, color);
        }
    }
}

fn draw_line_string(canvas: &mut RgbaImage, line: &LineString<f64>, project: &Projection, color: Rgba<u8>) {
    let points: Vec<(f64, f64)> = line.coords_iter().map(|c| project(&c)).collect();
    for pair in points.windows(2) {
        let max = canvas.width() as f64;
        if let Some(((x0, y0), (x1, y1))) = clip(pair[0], pair[1], max) {
            bresenham(canvas, (x0.floor() as i64, y0.floor() as i64), (x1.floor() as i64, y1.floor() as i64), color);
        }
    }
}

/// Liang–Barsky clip of a segment to the square [0, max]².
fn clip(a: (f64, f64), b: (f64, f64), max: f64) -> Option<((f64, f64), (f64, f64))> {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;
    for (p, q) in [(-dx, a.0), (dx, max - a.0), (-dy, a.1), (dy, max - a.1)] {
        if p == 0.0 {
            if q < 0.0 { return None }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > t1 { return None }
            t0 = t0.max(t);
        } else {
            if t < t0 { return None }
            t1 = t1.min(t);
        }
    }
    Some(((a.0 + t0 * dx, a.1 + t0 * dy), (a.0 + t1 * dx, a.1 + t1 * dy)))
}

fn bresenham(canvas: &mut RgbaImage, from: (i64, i64), to: (i64, i64), color: Rgba<u8>) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put(canvas, x, y, color);
        if (x, y) == to { break }
        let e2 = 2 * err;
        if e2 >= dy { err += dy; x += sx; }
        if e2 <= dx { err += dx; y += sy; }
    }
}

/// Set a pixel, ignoring positions off the canvas.
#[inline]
fn put(canvas: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && (x as u64) < canvas.width() as u64 && (y as u64) < canvas.height() as u64 {
        canvas.put_pixel(x as u32, y as u32, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilegrid::Coord as Fixed;

    #[test]
    fn clip_keeps_inside_and_trims_crossing() {
        assert_eq!(clip((1.0, 1.0), (5.0, 5.0), 10.0), Some(((1.0, 1.0), (5.0, 5.0))));
        assert_eq!(clip((-5.0, 5.0), (15.0, 5.0), 10.0), Some(((0.0, 5.0), (10.0, 5.0))));
        assert_eq!(clip((-5.0, -5.0), (-1.0, 20.0), 10.0), None);
    }

    #[test]
    fn bresenham_covers_endpoints() {
        let mut canvas = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0]));
        bresenham(&mut canvas, (0, 0), (7, 3), WAY);
        assert_eq!(*canvas.get_pixel(0, 0), WAY);
        assert_eq!(*canvas.get_pixel(7, 3), WAY);
        assert_eq!(canvas.pixels().filter(|p| **p == WAY).count(), 8);
    }

    #[test]
    fn projection_maps_corners() {
        let bounds = BoundingBox::new(Fixed::new(0, 0), Fixed::new(SCALE - 1, SCALE - 1)).unwrap();
        let project = projection(&bounds, 100);
        let (x, y) = project(&Coord { x: 0.0, y: 1.0 });
        assert!((x - 0.0).abs() < 1e-9 && (y - 0.0).abs() < 1e-9);
        let (x, y) = project(&Coord { x: 0.5, y: 0.5 });
        assert!((x - 50.0).abs() < 1e-6 && (y - 50.0).abs() < 1e-6);
    }
}
