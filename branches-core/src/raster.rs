//! Stroke rasterization into alpha masks, and silhouette edge profiles.
//!
//! The pixel grid is anchored at the bottom-left corner of the shape's
//! bounds, so the bottom rows of two bottom-aligned shapes cover the same
//! world band regardless of their heights.

use glam::Vec2;
use image::{GrayImage, Luma, Rgba, RgbaImage};

use crate::geometry::{Branch, Canvas, Outline, Rect, StrokeKind};

/// Resolution at which one raster pixel equals one world unit.
pub const REFERENCE_RESOLUTION: f32 = 72.0;

/// Pixels per world unit at `resolution`.
#[inline]
pub fn pixels_per_unit(resolution: u32) -> f32 {
    resolution as f32 / REFERENCE_RESOLUTION
}

/// A [`Canvas`] that strokes branches into a [`GrayImage`] whose luma is
/// the coverage.
pub struct RasterCanvas {
    image: GrayImage,
    /// World position of the raster's top-left corner.
    origin: Vec2,
    scale: f32,
    /// Half the stroke width, in pixels.
    half_width: f32,
}

impl RasterCanvas {
    /// Sizes a raster covering `bounds` at `resolution`, stroking with
    /// `stroke_width` world units.
    ///
    /// An empty `bounds` gives a zero-sized raster. A shape that is flat on
    /// one axis still gets one pixel on that axis.
    pub fn new(bounds: Rect, resolution: u32, stroke_width: f32) -> Self {
        let scale = pixels_per_unit(resolution);
        let (width, height) = if bounds.is_empty() {
            (0, 0)
        } else {
            (
                ((bounds.width() * scale).ceil() as u32).max(1),
                ((bounds.height() * scale).ceil() as u32).max(1),
            )
        };
        let origin = if bounds.is_empty() {
            Vec2::ZERO
        } else {
            Vec2::new(bounds.left(), bounds.bottom() - height as f32 / scale)
        };
        Self {
            image: GrayImage::new(width, height),
            origin,
            scale,
            half_width: stroke_width * scale * 0.5,
        }
    }

    pub fn into_image(self) -> GrayImage {
        self.image
    }

    fn to_pixels(&self, p: Vec2) -> Vec2 {
        (p - self.origin) * self.scale
    }

    fn stroke_piece(&mut self, a: Vec2, b: Vec2) {
        let (w, h) = self.image.dimensions();
        if w == 0 || h == 0 {
            return;
        }
        // Anything whose centre is within half a pixel of the stroke edge
        // gets partial coverage.
        let reach = self.half_width + 0.5;
        let lo = a.min(b) - Vec2::splat(reach);
        let hi = a.max(b) + Vec2::splat(reach);
        let x0 = lo.x.floor().max(0.0) as u32;
        let y0 = lo.y.floor().max(0.0) as u32;
        let x1 = (hi.x.ceil().max(0.0) as u32).min(w);
        let y1 = (hi.y.ceil().max(0.0) as u32).min(h);

        for y in y0..y1 {
            for x in x0..x1 {
                let centre = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let coverage = (reach - distance_to_segment(centre, a, b)).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    let alpha = (coverage * 255.0).ceil() as u8;
                    let px = self.image.get_pixel_mut(x, y);
                    px.0[0] = px.0[0].max(alpha);
                }
            }
        }
    }
}

impl Canvas for RasterCanvas {
    fn stroke(&mut self, branch: &Branch, _kind: StrokeKind) {
        let points: Vec<Vec2> = branch
            .flatten()
            .into_iter()
            .map(|p| self.to_pixels(p))
            .collect();
        for w in points.windows(2) {
            self.stroke_piece(w[0], w[1]);
        }
    }
}

fn distance_to_segment(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Draws `shape` into an alpha mask at `resolution`.
pub fn rasterize<S: Outline + ?Sized>(shape: &S, resolution: u32, stroke_width: f32) -> GrayImage {
    let mut canvas = RasterCanvas::new(shape.bounds(), resolution, stroke_width);
    shape.draw(&mut canvas);
    canvas.into_image()
}

/// Per-row distance, in pixels, from each side of a raster to its first
/// covered pixel. `None` marks an empty row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdgeProfile {
    pub left: Vec<Option<f32>>,
    pub right: Vec<Option<f32>>,
}

impl EdgeProfile {
    /// Scans every row of `raster` from both sides.
    ///
    /// `right_excess` is how far, in pixels, the raster's right edge sticks
    /// out past the shape's bounds; it is taken off the right profile so
    /// both sides are measured from the bounds. A raster with no width or
    /// no height yields a zero profile for every row.
    pub fn scan(raster: &GrayImage, right_excess: f32) -> Self {
        let (width, height) = raster.dimensions();
        if width == 0 || height == 0 {
            let zeros = vec![Some(0.0); height as usize];
            return Self {
                left: zeros.clone(),
                right: zeros,
            };
        }

        let mut left = Vec::with_capacity(height as usize);
        let mut right = Vec::with_capacity(height as usize);
        for y in 0..height {
            let covered = |x: u32| raster.get_pixel(x, y).0[0] > 0;
            left.push((0..width).find(|&x| covered(x)).map(|x| x as f32));
            right.push(
                (0..width)
                    .rev()
                    .find(|&x| covered(x))
                    .map(|x| ((width - 1 - x) as f32 - right_excess).max(0.0)),
            );
        }
        Self { left, right }
    }

    pub fn height(&self) -> usize {
        self.left.len()
    }
}

/// Colours the profile pixels of `raster`: left edge red, right edge blue.
pub fn annotate(raster: &GrayImage, edges: &EdgeProfile, right_excess: f32) -> RgbaImage {
    let (width, _) = raster.dimensions();
    let mut out = RgbaImage::from_fn(raster.width(), raster.height(), |x, y| {
        let Luma([a]) = *raster.get_pixel(x, y);
        Rgba([0, 0, 0, a])
    });
    for (y, (l, r)) in edges.left.iter().zip(&edges.right).enumerate() {
        if let Some(l) = l {
            out.put_pixel(*l as u32, y as u32, Rgba([255, 0, 0, 255]));
        }
        if let Some(r) = r {
            let x = (width as f32 - 1.0 - (r + right_excess)).round().max(0.0) as u32;
            if x < width {
                out.put_pixel(x, y as u32, Rgba([0, 0, 255, 255]));
            }
        }
    }
    out
}
