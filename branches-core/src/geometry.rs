//! Vector geometry shared by glyphs, trees and the rasterizer.
//!
//! Coordinates are screen space: `x` grows to the right and `y` grows
//! downward, so "up" is negative `y` and the bottom of a shape is its
//! largest `y`. Angles are radians measured with `atan2(y, x)` in the same
//! space, which makes a positive rotation turn clockwise on screen.
//!
//! The module provides:
//! - [`Curve`] - a single cubic Bézier segment.
//! - [`Branch`] - an open path made of contiguous curves.
//! - [`Rect`] - axis-aligned bounds.
//! - [`Canvas`], [`Outline`] and [`Shape`] - the seams through which
//!   shapes are drawn, measured and moved.

use glam::{Affine2, Vec2};

/// Distance under which two points are considered the same.
pub const POINT_EPSILON: f32 = 1e-2;

/// Maximum |sin| between two tangents that still counts as a touch.
const TOUCH_SINE: f32 = 1e-2;

/// Curve parameter distance from 0 or 1 that counts as a path end.
const END_PARAMETER: f32 = 1e-3;

/// Approximate world length of one flattened piece.
const FLATTEN_STEP: f32 = 4.0;

const MAX_FLATTEN_PIECES: usize = 64;

/// Returns the affine transform rotating by `angle` around `center`.
pub fn rotation_about(center: Vec2, angle: f32) -> Affine2 {
    Affine2::from_translation(center)
        * Affine2::from_angle(angle)
        * Affine2::from_translation(-center)
}

/// Angle of a direction vector.
#[inline]
pub fn angle_of(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Curve {
    pub p0: Vec2,
    pub c0: Vec2,
    pub c1: Vec2,
    pub p1: Vec2,
}

impl Curve {
    pub fn new(p0: Vec2, c0: Vec2, c1: Vec2, p1: Vec2) -> Self {
        Self { p0, c0, c1, p1 }
    }

    /// A straight curve from `a` to `b`.
    pub fn line(a: Vec2, b: Vec2) -> Self {
        let d = b - a;
        Self::new(a, a + d / 3.0, a + d * (2.0 / 3.0), b)
    }

    pub fn point_at(&self, t: f32) -> Vec2 {
        let mt = 1.0 - t;
        self.p0 * (mt * mt * mt)
            + self.c0 * (3.0 * mt * mt * t)
            + self.c1 * (3.0 * mt * t * t)
            + self.p1 * (t * t * t)
    }

    pub fn derivative_at(&self, t: f32) -> Vec2 {
        let mt = 1.0 - t;
        (self.c0 - self.p0) * (3.0 * mt * mt)
            + (self.c1 - self.c0) * (6.0 * mt * t)
            + (self.p1 - self.c1) * (3.0 * t * t)
    }

    /// Unit tangent at `t`.
    ///
    /// Handles that coincide with their anchor make the derivative vanish at
    /// the ends, so this falls back to a nearby parameter and finally to the
    /// chord direction.
    pub fn tangent_at(&self, t: f32) -> Vec2 {
        let d = self.derivative_at(t);
        if d.length_squared() > f32::EPSILON {
            return d.normalize();
        }
        let nudged = if t < 0.5 { t + 1e-3 } else { t - 1e-3 };
        self.derivative_at(nudged)
            .try_normalize()
            .unwrap_or_else(|| (self.p1 - self.p0).normalize_or_zero())
    }

    /// True when both handles lie on the chord.
    pub fn is_straight(&self) -> bool {
        let chord = self.p1 - self.p0;
        let len = chord.length();
        if len <= f32::EPSILON {
            return self.c0.distance(self.p0) <= f32::EPSILON
                && self.c1.distance(self.p1) <= f32::EPSILON;
        }
        let off = |p: Vec2| (p - self.p0).perp_dot(chord).abs() / len;
        off(self.c0) < 1e-3 && off(self.c1) < 1e-3
    }

    /// Splits the curve into straight pieces, as `(parameter, point)` pairs
    /// starting at `t = 0` and ending at `t = 1`.
    pub fn flatten(&self) -> Vec<(f32, Vec2)> {
        let pieces = if self.is_straight() {
            1
        } else {
            let hull = self.p0.distance(self.c0) + self.c0.distance(self.c1) + self.c1.distance(self.p1);
            ((hull / FLATTEN_STEP).ceil() as usize).clamp(2, MAX_FLATTEN_PIECES)
        };
        (0..=pieces)
            .map(|i| {
                let t = i as f32 / pieces as f32;
                (t, self.point_at(t))
            })
            .collect()
    }

    pub fn length(&self) -> f32 {
        self.flatten()
            .windows(2)
            .map(|w| w[0].1.distance(w[1].1))
            .sum()
    }

    /// Exact bounds, using the roots of the derivative on each axis.
    pub fn bounds(&self) -> Rect {
        let mut ts = vec![0.0, 1.0];
        axis_extrema(self.p0.x, self.c0.x, self.c1.x, self.p1.x, &mut ts);
        axis_extrema(self.p0.y, self.c0.y, self.c1.y, self.p1.y, &mut ts);
        Rect::from_points(ts.into_iter().map(|t| self.point_at(t)))
    }

    pub fn transformed(&self, affine: &Affine2) -> Self {
        Self::new(
            affine.transform_point2(self.p0),
            affine.transform_point2(self.c0),
            affine.transform_point2(self.c1),
            affine.transform_point2(self.p1),
        )
    }
}

fn axis_extrema(p0: f32, c0: f32, c1: f32, p1: f32, out: &mut Vec<f32>) {
    let a = -p0 + 3.0 * c0 - 3.0 * c1 + p1;
    let b = 2.0 * (p0 - 2.0 * c0 + c1);
    let c = c0 - p0;
    let mut push = |t: f32| {
        if t > 0.0 && t < 1.0 {
            out.push(t);
        }
    };
    if a.abs() < 1e-9 {
        if b.abs() > 1e-9 {
            push(-c / b);
        }
        return;
    }
    let disc = b * b - 4.0 * a * c;
    if disc >= 0.0 {
        let sq = disc.sqrt();
        push((-b + sq) / (2.0 * a));
        push((-b - sq) / (2.0 * a));
    }
}

/// Axis-aligned bounds. [`Rect::EMPTY`] is the identity for [`Rect::union`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Default for Rect {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Rect {
    pub const EMPTY: Self = Self {
        min: Vec2::INFINITY,
        max: Vec2::NEG_INFINITY,
    };

    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Self {
        points.into_iter().fold(Self::EMPTY, |r, p| Self {
            min: r.min.min(p),
            max: r.max.max(p),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn width(&self) -> f32 {
        (self.max.x - self.min.x).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.max.y - self.min.y).max(0.0)
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn left(&self) -> f32 {
        self.min.x
    }

    pub fn right(&self) -> f32 {
        self.max.x
    }

    pub fn top(&self) -> f32 {
        self.min.y
    }

    pub fn bottom(&self) -> f32 {
        self.max.y
    }

    pub fn bottom_left(&self) -> Vec2 {
        Vec2::new(self.min.x, self.max.y)
    }

    pub fn bottom_right(&self) -> Vec2 {
        self.max
    }

    pub fn translated(&self, delta: Vec2) -> Rect {
        Self {
            min: self.min + delta,
            max: self.max + delta,
        }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }
}

/// A point where two branches meet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intersection {
    pub point: Vec2,
    /// `false` for tangential touches and for contacts at an open end of
    /// either branch.
    pub crossing: bool,
}

/// A straight piece of a flattened branch, remembering where on the
/// branch it came from.
#[derive(Clone, Copy, Debug)]
struct Piece {
    a: Vec2,
    b: Vec2,
    curve: usize,
    t0: f32,
    t1: f32,
}

impl Piece {
    fn parameter(&self, s: f32) -> f32 {
        self.t0 + (self.t1 - self.t0) * s
    }
}

/// An open path of contiguous cubic curves. Always holds at least one curve.
#[derive(Clone, Debug, PartialEq)]
pub struct Branch {
    curves: Vec<Curve>,
}

impl Branch {
    /// Returns `None` when `curves` is empty.
    pub fn from_curves(curves: Vec<Curve>) -> Option<Self> {
        (!curves.is_empty()).then_some(Self { curves })
    }

    pub fn line(a: Vec2, b: Vec2) -> Self {
        Self::from_curve(Curve::line(a, b))
    }

    pub fn from_curve(curve: Curve) -> Self {
        Self {
            curves: vec![curve],
        }
    }

    /// A path through `points` with straight curves. Needs at least two points.
    pub fn polyline(points: &[Vec2]) -> Option<Self> {
        Self::from_curves(points.windows(2).map(|w| Curve::line(w[0], w[1])).collect())
    }

    pub fn curves(&self) -> &[Curve] {
        &self.curves
    }

    fn first_curve(&self) -> &Curve {
        &self.curves[0]
    }

    fn last_curve(&self) -> &Curve {
        &self.curves[self.curves.len() - 1]
    }

    pub fn first_point(&self) -> Vec2 {
        self.first_curve().p0
    }

    pub fn last_point(&self) -> Vec2 {
        self.last_curve().p1
    }

    /// Unit tangent where the path starts.
    pub fn entry_tangent(&self) -> Vec2 {
        self.first_curve().tangent_at(0.0)
    }

    /// Unit tangent where the path ends.
    pub fn exit_tangent(&self) -> Vec2 {
        self.last_curve().tangent_at(1.0)
    }

    pub fn length(&self) -> f32 {
        self.curves.iter().map(Curve::length).sum()
    }

    pub fn bounds(&self) -> Rect {
        self.curves
            .iter()
            .fold(Rect::EMPTY, |r, c| r.union(&c.bounds()))
    }

    pub fn transform(&mut self, affine: &Affine2) {
        for c in &mut self.curves {
            *c = c.transformed(affine);
        }
    }

    /// Prepends a straight curve from `start` to the current first point.
    pub fn extend_start(&mut self, start: Vec2) {
        let first = self.first_point();
        self.curves.insert(0, Curve::line(start, first));
    }

    /// The path as a list of points, for drawing.
    pub fn flatten(&self) -> Vec<Vec2> {
        let mut out = vec![self.first_point()];
        for c in &self.curves {
            out.extend(c.flatten().into_iter().skip(1).map(|(_, p)| p));
        }
        out
    }

    fn pieces(&self) -> Vec<Piece> {
        let mut out = Vec::new();
        for (curve, c) in self.curves.iter().enumerate() {
            for w in c.flatten().windows(2) {
                out.push(Piece {
                    a: w[0].1,
                    b: w[1].1,
                    curve,
                    t0: w[0].0,
                    t1: w[1].0,
                });
            }
        }
        out
    }

    fn is_open_end(&self, curve: usize, t: f32) -> bool {
        (curve == 0 && t <= END_PARAMETER)
            || (curve + 1 == self.curves.len() && t >= 1.0 - END_PARAMETER)
    }

    /// All points where this branch meets `other`, skipping any that lie on
    /// `exclude`.
    ///
    /// Curves are compared as flattened pieces. Hits closer than
    /// [`POINT_EPSILON`] are merged, and a collinear overlap reports both of
    /// its ends.
    pub fn intersections(&self, other: &Branch, exclude: Option<Vec2>) -> Vec<Intersection> {
        let mut out: Vec<Intersection> = Vec::new();
        if !self.bounds().intersects(&other.bounds()) {
            return out;
        }

        let theirs = other.pieces();
        for pa in self.pieces() {
            for pb in &theirs {
                for (sa, sb) in piece_hits(&pa, pb) {
                    let point = pa.a.lerp(pa.b, sa);
                    if exclude.is_some_and(|e| e.distance(point) < POINT_EPSILON) {
                        continue;
                    }
                    if out.iter().any(|i| i.point.distance(point) < POINT_EPSILON) {
                        continue;
                    }
                    let (ta, tb) = (pa.parameter(sa), pb.parameter(sb));
                    let crossing = if self.is_open_end(pa.curve, ta)
                        || other.is_open_end(pb.curve, tb)
                    {
                        false
                    } else {
                        let da = self.curves[pa.curve].tangent_at(ta);
                        let db = other.curves[pb.curve].tangent_at(tb);
                        da.perp_dot(db).abs() > TOUCH_SINE
                    };
                    out.push(Intersection { point, crossing });
                }
            }
        }
        out
    }

    /// True when the branches cross, or meet more than once.
    ///
    /// A single tangential touch is tolerated.
    pub fn crosses(&self, other: &Branch, exclude: Option<Vec2>) -> bool {
        match self.intersections(other, exclude).as_slice() {
            [] => false,
            [only] => only.crossing,
            _ => true,
        }
    }
}

/// Local parameters `(s, u)` where two pieces meet.
fn piece_hits(p: &Piece, q: &Piece) -> Vec<(f32, f32)> {
    const TOL: f32 = 1e-5;
    let r = p.b - p.a;
    let s = q.b - q.a;
    let qp = q.a - p.a;
    let denom = r.perp_dot(s);
    let scale = r.length() * s.length();

    if scale <= f32::EPSILON {
        return Vec::new();
    }

    if denom.abs() > 1e-6 * scale {
        let t = qp.perp_dot(s) / denom;
        let u = qp.perp_dot(r) / denom;
        if (-TOL..=1.0 + TOL).contains(&t) && (-TOL..=1.0 + TOL).contains(&u) {
            return vec![(t.clamp(0.0, 1.0), u.clamp(0.0, 1.0))];
        }
        return Vec::new();
    }

    // Parallel: only collinear overlaps count.
    if qp.perp_dot(r).abs() / r.length() > 1e-4 {
        return Vec::new();
    }
    let rr = r.length_squared();
    let t0 = qp.dot(r) / rr;
    let t1 = (q.b - p.a).dot(r) / rr;
    let lo = t0.min(t1).max(0.0);
    let hi = t0.max(t1).min(1.0);
    if lo > hi + TOL {
        return Vec::new();
    }
    let along = |t: f32| {
        let point = p.a + r * t;
        let u = ((point - q.a).dot(s) / s.length_squared()).clamp(0.0, 1.0);
        (t, u)
    };
    if (hi - lo) * r.length() < POINT_EPSILON {
        vec![along(lo)]
    } else {
        vec![along(lo), along(hi)]
    }
}

/// What a stroke belongs to, so a canvas can style it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrokeKind {
    Glyph,
    Trunk,
}

/// A drawing target. Every shape draws into the canvas it is handed.
pub trait Canvas {
    fn stroke(&mut self, branch: &Branch, kind: StrokeKind);
}

/// Something with bounds that can be drawn.
pub trait Outline {
    fn bounds(&self) -> Rect;
    fn draw(&self, canvas: &mut dyn Canvas);
}

/// An [`Outline`] that can be moved as a whole.
pub trait Shape: Outline {
    fn transform(&mut self, affine: &Affine2);

    /// The point this shape hangs from, usually the bottom of its trunk.
    fn anchor(&self) -> Vec2;

    fn translate(&mut self, delta: Vec2) {
        self.transform(&Affine2::from_translation(delta));
    }

    fn rotate(&mut self, angle: f32, center: Vec2) {
        self.transform(&rotation_about(center, angle));
    }

    fn set_anchor(&mut self, target: Vec2) {
        let delta = target - self.anchor();
        self.translate(delta);
    }
}

impl<T: Outline + ?Sized> Outline for &T {
    fn bounds(&self) -> Rect {
        (**self).bounds()
    }

    fn draw(&self, canvas: &mut dyn Canvas) {
        (**self).draw(canvas)
    }
}

impl<T: Outline> Outline for [T] {
    fn bounds(&self) -> Rect {
        self.iter().fold(Rect::EMPTY, |r, s| r.union(&s.bounds()))
    }

    fn draw(&self, canvas: &mut dyn Canvas) {
        for s in self {
            s.draw(canvas);
        }
    }
}

impl Outline for Branch {
    fn bounds(&self) -> Rect {
        Branch::bounds(self)
    }

    fn draw(&self, canvas: &mut dyn Canvas) {
        canvas.stroke(self, StrokeKind::Glyph);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn approx(a: Vec2, b: Vec2) -> bool {
        a.distance(b) < 1e-3
    }

    #[test]
    fn line_tangent_and_length() {
        let c = Curve::line(Vec2::ZERO, Vec2::new(0.0, -10.0));
        assert!(approx(c.tangent_at(0.0), Vec2::new(0.0, -1.0)));
        assert!((c.length() - 10.0).abs() < 1e-4);
        assert!(c.is_straight());
    }

    #[test]
    fn tangent_falls_back_when_handle_collapses() {
        let c = Curve::new(
            Vec2::ZERO,
            Vec2::ZERO,
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 0.0),
        );
        assert!(approx(c.tangent_at(0.0), Vec2::X));
        assert!(approx(c.tangent_at(1.0), Vec2::X));
    }

    #[test]
    fn curve_bounds_include_extrema() {
        // Symmetric arch peaking at y = -7.5.
        let c = Curve::new(
            Vec2::ZERO,
            Vec2::new(0.0, -10.0),
            Vec2::new(10.0, -10.0),
            Vec2::new(10.0, 0.0),
        );
        let b = c.bounds();
        assert!((b.top() + 7.5).abs() < 1e-3);
        assert!((b.bottom() - 0.0).abs() < 1e-6);
        assert!((b.width() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn rect_union_with_empty_is_identity() {
        let r = Rect::new(Vec2::new(1.0, 2.0), Vec2::new(3.0, 5.0));
        assert_eq!(Rect::EMPTY.union(&r), r);
        assert!(Rect::EMPTY.is_empty());
        assert!(!r.is_empty());
        assert_eq!(r.bottom_left(), Vec2::new(1.0, 5.0));
    }

    #[test]
    fn transversal_lines_cross_once() {
        let a = Branch::line(Vec2::new(-5.0, 0.0), Vec2::new(5.0, 0.0));
        let b = Branch::line(Vec2::new(0.0, -5.0), Vec2::new(0.0, 5.0));
        let hits = a.intersections(&b, None);
        assert_eq!(hits.len(), 1);
        assert!(approx(hits[0].point, Vec2::ZERO));
        assert!(hits[0].crossing);
        assert!(a.crosses(&b, None));
    }

    #[test]
    fn excluded_point_is_ignored() {
        let a = Branch::line(Vec2::new(-5.0, 0.0), Vec2::new(5.0, 0.0));
        let b = Branch::line(Vec2::new(0.0, -5.0), Vec2::new(0.0, 5.0));
        assert!(a.intersections(&b, Some(Vec2::ZERO)).is_empty());
    }

    #[test]
    fn touching_at_an_open_end_is_not_a_crossing() {
        let a = Branch::line(Vec2::new(-5.0, 0.0), Vec2::new(5.0, 0.0));
        let b = Branch::line(Vec2::new(0.0, 0.0), Vec2::new(0.0, 5.0));
        let hits = a.intersections(&b, None);
        assert_eq!(hits.len(), 1);
        assert!(!hits[0].crossing);
        assert!(!a.crosses(&b, None));
    }

    #[test]
    fn tangent_touch_at_an_apex_is_not_a_crossing() {
        // The arch peaks at (20, -30) with a horizontal tangent.
        let arch = Branch::from_curve(Curve::new(
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, -40.0),
            Vec2::new(40.0, -40.0),
            Vec2::new(40.0, 0.0),
        ));
        let lid = Branch::line(Vec2::new(0.0, -30.0), Vec2::new(40.0, -30.0));

        let hits = lid.intersections(&arch, None);
        assert_eq!(hits.len(), 1);
        assert!(approx(hits[0].point, Vec2::new(20.0, -30.0)));
        assert!(!hits[0].crossing);
        assert!(!lid.crosses(&arch, None));
        assert!(!arch.crosses(&lid, None));

        // Lower down the same line cuts through both legs.
        let bar = Branch::line(Vec2::new(0.0, -20.0), Vec2::new(40.0, -20.0));
        assert_eq!(bar.intersections(&arch, None).len(), 2);
        assert!(bar.crosses(&arch, None));
    }

    #[test]
    fn collinear_overlap_reports_two_points() {
        let a = Branch::line(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0));
        let b = Branch::line(Vec2::new(4.0, 0.0), Vec2::new(20.0, 0.0));
        assert_eq!(a.intersections(&b, None).len(), 2);
        assert!(a.crosses(&b, None));
    }

    #[test]
    fn zigzag_crossing_twice_is_rejected() {
        let a = Branch::line(Vec2::new(0.0, 0.0), Vec2::new(30.0, 0.0));
        let b = Branch::polyline(&[
            Vec2::new(5.0, -5.0),
            Vec2::new(10.0, 5.0),
            Vec2::new(15.0, -5.0),
        ])
        .unwrap();
        let hits = a.intersections(&b, None);
        assert_eq!(hits.len(), 2);
        assert!(a.crosses(&b, None));
    }

    #[test]
    fn disjoint_branches_do_not_meet() {
        let a = Branch::line(Vec2::ZERO, Vec2::new(10.0, 0.0));
        let b = Branch::line(Vec2::new(0.0, 5.0), Vec2::new(10.0, 5.0));
        assert!(a.intersections(&b, None).is_empty());
    }

    #[test]
    fn extend_start_prepends_a_straight_piece() {
        let mut trunk = Branch::line(Vec2::ZERO, Vec2::new(0.0, -10.0));
        trunk.extend_start(Vec2::new(0.0, 5.0));
        assert_eq!(trunk.curves().len(), 2);
        assert_eq!(trunk.first_point(), Vec2::new(0.0, 5.0));
        assert!((trunk.length() - 15.0).abs() < 1e-3);
    }

    #[test]
    fn rotation_about_keeps_center_fixed() {
        let center = Vec2::new(3.0, 4.0);
        let affine = rotation_about(center, FRAC_PI_2);
        assert!(approx(affine.transform_point2(center), center));
        // Screen space: +90° turns "right" into "down".
        assert!(approx(
            affine.transform_point2(center + Vec2::X),
            center + Vec2::Y
        ));
    }
}
