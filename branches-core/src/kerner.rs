//! Raster-based packing of two shapes along the writing direction.
//!
//! Exact curve intersection between two branching shapes at many candidate
//! offsets is slow and fragile. Instead both shapes are rasterized once and
//! the free space between them is read off per-row edge profiles.

use glam::Vec2;
use image::{GrayImage, RgbaImage};
use log::debug;

use crate::{
    config::KernerOptions,
    geometry::{Outline, Shape},
    raster::{EdgeProfile, REFERENCE_RESOLUTION, annotate, pixels_per_unit, rasterize},
};

/// Extra inward push, in raster pixels at resolution 1, compensating for
/// the loose fit of low-resolution rasters.
const UNDERSAMPLING_CORRECTION: f32 = 20.0;

/// Raster and edge profiles of one shape.
#[derive(Debug)]
pub struct KerningInfo {
    pub raster: GrayImage,
    pub edges: EdgeProfile,
    /// Pixels the raster sticks out past the right of the bounds.
    pub right_excess: f32,
}

impl KerningInfo {
    pub fn new<S: Outline + ?Sized>(shape: &S, resolution: u32) -> Self {
        // Thin strokes vanish at low resolution. One world unit is one
        // pixel at the reference resolution, so this keeps every stroke at
        // least a pixel wide.
        let stroke_width = REFERENCE_RESOLUTION / resolution as f32;
        let raster = rasterize(shape, resolution, stroke_width);
        let bounds = shape.bounds();
        let right_excess = if bounds.is_empty() {
            0.0
        } else {
            (raster.width() as f32 - bounds.width() * pixels_per_unit(resolution)).max(0.0)
        };
        let edges = EdgeProfile::scan(&raster, right_excess);
        Self {
            raster,
            edges,
            right_excess,
        }
    }

    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    fn overlay(&self) -> RgbaImage {
        annotate(&self.raster, &self.edges, self.right_excess)
    }
}

/// Result of one measurement.
#[derive(Debug)]
pub struct KernOutcome {
    /// Translation that moves the trailing shape into place.
    pub offset: Vec2,
    /// Smallest free distance between the two silhouettes over all shared
    /// rows, in raster pixels, before correction.
    pub min_gap: f32,
    /// Annotated rasters of the trailing and leading shapes, in debug mode.
    pub overlays: Option<(RgbaImage, RgbaImage)>,
}

#[derive(Clone, Debug, Default)]
pub struct Kerner {
    options: KernerOptions,
}

impl Kerner {
    /// ### Parameters
    /// - `options` - Writing direction, raster resolution, spacing and
    ///   debug mode.
    pub fn new(options: KernerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &KernerOptions {
        &self.options
    }

    /// Moves `trailing` next to `leading`, as close as possible without the
    /// two colliding, then backs off by the configured spacing.
    ///
    /// Only `trailing` moves, and only by translation.
    ///
    /// ### Parameters
    /// - `trailing` - The shape to move. It follows `leading` in the
    ///   writing direction.
    /// - `leading` - The shape already in place.
    ///
    /// ### Returns
    /// The [`KernOutcome`] of [`Kerner::measure`], whose offset has been
    /// applied to `trailing`.
    pub fn kern<A, B>(&self, trailing: &mut A, leading: &B) -> KernOutcome
    where
        A: Shape + ?Sized,
        B: Outline + ?Sized,
    {
        let outcome = self.measure(trailing, leading);
        trailing.translate(outcome.offset);
        outcome
    }

    /// Computes the translation [`Kerner::kern`] would apply, without moving
    /// anything.
    ///
    /// 1. Rasterize both shapes and scan their edge profiles.
    /// 2. Going bottom-up over the rows both shapes have, add the leading
    ///    shape's outer profile to the trailing shape's inner one. The
    ///    smallest sum is how far the shapes can be pushed together.
    /// 3. Bottom-align the trailing bounds flush against the leading bounds,
    ///    then push inward by that distance minus the spacing.
    ///
    /// ### Returns
    /// - `offset` - The translation for `trailing`. Zero when either shape
    ///   has empty bounds.
    /// - `min_gap` - The uncorrected pixel gap from step 2.
    /// - `overlays` - Annotated rasters of both shapes, in debug mode only.
    pub fn measure<A, B>(&self, trailing: &A, leading: &B) -> KernOutcome
    where
        A: Outline + ?Sized,
        B: Outline + ?Sized,
    {
        let KernerOptions {
            writing_mode,
            resolution,
            spacing,
            debug,
        } = self.options;
        let resolution = resolution.max(1);
        let ltr = writing_mode.is_left_to_right();

        let info_a = KerningInfo::new(trailing, resolution);
        let info_b = KerningInfo::new(leading, resolution);

        // Left to right: the leading shape's right edge meets the trailing
        // shape's left edge. Right to left is the mirror image.
        let (outer, inner) = if ltr {
            (&info_b.edges.right, &info_a.edges.left)
        } else {
            (&info_a.edges.right, &info_b.edges.left)
        };
        let min_gap = min_row_gap(outer, inner);

        let mut gap = min_gap;
        if gap > 0.0 {
            gap += UNDERSAMPLING_CORRECTION / resolution as f32;
        }

        let (a, b) = (trailing.bounds(), leading.bounds());
        let offset = if a.is_empty() || b.is_empty() {
            // Nothing to abut against.
            Vec2::ZERO
        } else {
            let flush = if ltr {
                b.bottom_right() - a.bottom_left()
            } else {
                b.bottom_left() - a.bottom_right()
            };
            let kerning = gap / pixels_per_unit(resolution);
            let direction = if ltr { -1.0 } else { 1.0 };
            flush + Vec2::new((kerning - spacing) * direction, 0.0)
        };

        debug!(
            "kerned {}x{} against {}x{} px: gap {min_gap:.1} px, offset {offset}",
            info_a.width(),
            info_a.height(),
            info_b.width(),
            info_b.height()
        );

        KernOutcome {
            offset,
            min_gap,
            overlays: debug.then(|| (info_a.overlay(), info_b.overlay())),
        }
    }
}

/// Smallest `outer + inner` over the rows both profiles have, pairing rows
/// from the bottom. Rows where either side is empty impose no limit; with no
/// comparable row at all the gap is zero.
fn min_row_gap(outer: &[Option<f32>], inner: &[Option<f32>]) -> f32 {
    outer
        .iter()
        .rev()
        .zip(inner.iter().rev())
        .filter_map(|(o, i)| Some((*o)? + (*i)?))
        .reduce(f32::min)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::WritingMode,
        geometry::{Branch, Canvas, Rect},
    };
    use glam::Affine2;

    /// A loose bundle of branches that can be moved.
    #[derive(Clone, Debug)]
    struct Sketch(Vec<Branch>);

    impl Outline for Sketch {
        fn bounds(&self) -> Rect {
            self.0.as_slice().bounds()
        }

        fn draw(&self, canvas: &mut dyn Canvas) {
            self.0.as_slice().draw(canvas)
        }
    }

    impl Shape for Sketch {
        fn transform(&mut self, affine: &Affine2) {
            for b in &mut self.0 {
                b.transform(affine);
            }
        }

        fn anchor(&self) -> Vec2 {
            self.bounds().bottom_left()
        }
    }

    fn bar(x: f32, height: f32) -> Sketch {
        Sketch(vec![Branch::line(Vec2::new(x, 0.0), Vec2::new(x, -height))])
    }

    /// An `L`: a vertical stroke with a foot reaching right along the bottom.
    fn ell() -> Sketch {
        Sketch(vec![
            Branch::line(Vec2::new(0.0, 0.0), Vec2::new(0.0, -100.0)),
            Branch::line(Vec2::new(0.0, 0.0), Vec2::new(60.0, 0.0)),
        ])
    }

    /// A `7`: a bar on top reaching left, over a vertical stroke.
    fn seven() -> Sketch {
        Sketch(vec![
            Branch::line(Vec2::new(60.0, 0.0), Vec2::new(60.0, -100.0)),
            Branch::line(Vec2::new(0.0, -100.0), Vec2::new(60.0, -100.0)),
        ])
    }

    fn options(spacing: f32) -> KernerOptions {
        KernerOptions {
            resolution: 36,
            spacing,
            ..KernerOptions::default()
        }
    }

    #[test]
    fn touching_profiles_abut_with_spacing() {
        let kerner = Kerner::new(options(5.0));
        let leading = bar(0.0, 50.0);
        let mut trailing = bar(200.0, 50.0);

        let outcome = kerner.kern(&mut trailing, &leading);

        assert_eq!(outcome.min_gap, 0.0);
        // Flush at x = 0, then spaced out by 5 units.
        assert!((trailing.bounds().left() - 5.0).abs() < 1e-3);
        assert_eq!(trailing.bounds().bottom(), leading.bounds().bottom());
    }

    #[test]
    fn interlocking_shapes_slide_together() {
        let kerner = Kerner::new(options(0.0));
        let leading = ell();
        let mut trailing = seven();
        trailing.translate(Vec2::new(500.0, 0.0));

        kerner.kern(&mut trailing, &leading);

        // The `7` tucks over the foot of the `L`, so it starts left of the
        // `L`'s right edge.
        assert!(trailing.bounds().left() < leading.bounds().right() - 20.0);

        // The two vertical strokes stay apart.
        let l_stem = leading.0[0].bounds().right();
        let seven_stem = trailing.0[0].bounds().left();
        assert!(seven_stem > l_stem);
    }

    #[test]
    fn kerning_is_translation_only() {
        let kerner = Kerner::new(options(10.0));
        let leading = ell();
        let mut trailing = seven();
        let before = trailing.clone();

        let outcome = kerner.kern(&mut trailing, &leading);

        for (moved, orig) in trailing.0.iter().zip(&before.0) {
            let delta = moved.first_point() - orig.first_point();
            assert!((delta - outcome.offset).length() < 1e-3);
            assert!((moved.last_point() - orig.last_point() - delta).length() < 1e-3);
        }
    }

    #[test]
    fn kerned_shapes_do_not_overlap() {
        let kerner = Kerner::new(KernerOptions::default());
        let leading = ell();
        let mut trailing = seven();
        kerner.kern(&mut trailing, &leading);

        let tolerance = REFERENCE_RESOLUTION / kerner.options().resolution as f32;
        let outcome = kerner.measure(&trailing, &leading);
        // Re-measuring the kerned pair leaves at least the spacing free,
        // up to one raster pixel.
        let free = outcome.min_gap / pixels_per_unit(kerner.options().resolution);
        assert!(free + tolerance >= 0.0);
        for a in &trailing.0 {
            for b in &leading.0 {
                assert!(a.intersections(b, None).is_empty());
            }
        }
    }

    #[test]
    fn right_to_left_places_trailing_on_the_left() {
        let kerner = Kerner::new(KernerOptions {
            writing_mode: WritingMode::RightToLeft,
            ..options(5.0)
        });
        let leading = bar(0.0, 50.0);
        let mut trailing = bar(200.0, 50.0);

        kerner.kern(&mut trailing, &leading);

        assert!((trailing.bounds().right() + 5.0).abs() < 1e-3);
    }

    #[test]
    fn shorter_shape_only_compares_bottom_rows() {
        let kerner = Kerner::new(options(0.0));
        // The leading shape leans right at the top, far above the short
        // trailing bar.
        let leading = Sketch(vec![
            Branch::line(Vec2::new(0.0, 0.0), Vec2::new(0.0, -50.0)),
            Branch::line(Vec2::new(0.0, -50.0), Vec2::new(80.0, -100.0)),
        ]);
        let mut trailing = bar(300.0, 20.0);

        kerner.kern(&mut trailing, &leading);

        assert!(trailing.bounds().left() < 40.0);
    }

    #[test_log::test]
    fn debug_keeps_overlays_without_changing_the_result() {
        let leading = ell();
        let trailing = seven();
        let plain = Kerner::new(options(5.0)).measure(&trailing, &leading);
        let traced = Kerner::new(KernerOptions {
            debug: true,
            ..options(5.0)
        })
        .measure(&trailing, &leading);

        assert!(plain.overlays.is_none());
        assert!(traced.overlays.is_some());
        assert_eq!(plain.offset, traced.offset);
    }

    #[test]
    fn empty_shapes_stay_put() {
        let kerner = Kerner::new(options(5.0));
        let mut trailing = bar(200.0, 50.0);
        let before = trailing.bounds();

        let outcome = kerner.kern(&mut trailing, &Sketch(Vec::new()));

        assert_eq!(outcome.offset, Vec2::ZERO);
        assert_eq!(trailing.bounds(), before);

        let mut nothing = Sketch(Vec::new());
        let outcome = kerner.kern(&mut nothing, &bar(0.0, 50.0));
        assert!(outcome.offset.is_finite());
        assert_eq!(outcome.offset, Vec2::ZERO);
    }

    #[test]
    fn empty_rows_impose_no_limit() {
        assert_eq!(
            min_row_gap(&[Some(3.0), None, Some(5.0)], &[Some(1.0), Some(0.0), Some(2.0)]),
            4.0
        );
        assert_eq!(min_row_gap(&[None], &[Some(1.0)]), 0.0);
        // Rows pair up from the bottom.
        assert_eq!(min_row_gap(&[Some(9.0), Some(2.0)], &[Some(1.0)]), 3.0);
    }
}
