//! Glyph shape templates and their placed instances.
//!
//! A [`GlyphShape`] is built once per character and never changes. Growing
//! a word clones it into [`GlyphInstance`]s, which carry their own
//! world-space geometry and pivot.

use glam::{Affine2, Vec2};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::{
    config::GrowingOrder,
    error::{Error, Result},
    geometry::{Branch, Canvas, Outline, Rect, StrokeKind, angle_of, rotation_about},
    types::{BranchIndex, TRUNK},
};

/// Immutable branching template for one character.
#[derive(Clone, Debug)]
pub struct GlyphShape {
    ch: char,
    branches: Vec<Branch>,
    entry_angle: f32,
}

impl GlyphShape {
    /// Builds a shape from its branches; the first branch is the trunk.
    ///
    /// ### Errors
    /// [`Error::InvalidShape`] when `branches` is empty.
    pub fn new(ch: char, branches: Vec<Branch>) -> Result<Self> {
        let Some(trunk) = branches.first() else {
            return Err(Error::invalid_shape(ch, "a glyph needs at least one branch"));
        };
        let entry_angle = angle_of(trunk.entry_tangent());
        Ok(Self {
            ch,
            branches,
            entry_angle,
        })
    }

    pub fn ch(&self) -> char {
        self.ch
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn trunk(&self) -> &Branch {
        &self.branches[TRUNK]
    }

    /// Direction of the trunk where it starts.
    pub fn entry_angle(&self) -> f32 {
        self.entry_angle
    }

    /// A fresh instance whose pivot is the trunk's starting point.
    pub fn instantiate(&self) -> GlyphInstance {
        GlyphInstance {
            ch: self.ch,
            branches: self.branches.clone(),
            pivot: self.trunk().first_point(),
        }
    }

    /// Branch indices in `order`, using the template's own coordinates.
    pub fn sort_branches<R: Rng + ?Sized>(
        &self,
        order: GrowingOrder,
        start_at_trunk: bool,
        rng: &mut R,
    ) -> Vec<BranchIndex> {
        sort_branch_indices(&end_xs(&self.branches), order, start_at_trunk, rng)
    }
}

fn end_xs(branches: &[Branch]) -> Vec<f32> {
    branches.iter().map(|b| b.last_point().x).collect()
}

/// Orders branch indices by their endpoint `x` coordinates.
///
/// Sorting is stable. With `start_at_trunk` the trunk is moved to the front
/// afterwards, keeping the relative order of the rest.
pub fn sort_branch_indices<R: Rng + ?Sized>(
    end_xs: &[f32],
    order: GrowingOrder,
    start_at_trunk: bool,
    rng: &mut R,
) -> Vec<BranchIndex> {
    let mut indices: Vec<BranchIndex> = (0..end_xs.len()).collect();
    match order {
        GrowingOrder::Natural => {}
        GrowingOrder::LeftRight => indices.sort_by(|&a, &b| end_xs[a].total_cmp(&end_xs[b])),
        GrowingOrder::RightLeft => indices.sort_by(|&a, &b| end_xs[b].total_cmp(&end_xs[a])),
        GrowingOrder::Random => indices.shuffle(rng),
    }
    if start_at_trunk && let Some(pos) = indices.iter().position(|&i| i == TRUNK) {
        let trunk = indices.remove(pos);
        indices.insert(0, trunk);
    }
    indices
}

/// A placed copy of a [`GlyphShape`].
#[derive(Clone, Debug)]
pub struct GlyphInstance {
    ch: char,
    branches: Vec<Branch>,
    pivot: Vec2,
}

impl GlyphInstance {
    pub fn ch(&self) -> char {
        self.ch
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn trunk(&self) -> &Branch {
        &self.branches[TRUNK]
    }

    /// World point the instance is positioned and rotated by.
    pub fn pivot(&self) -> Vec2 {
        self.pivot
    }

    /// Moves the instance so its pivot lands on `target`.
    pub fn set_position(&mut self, target: Vec2) {
        let delta = target - self.pivot;
        self.transform(&Affine2::from_translation(delta));
    }

    pub fn rotate(&mut self, angle: f32) {
        self.transform(&rotation_about(self.pivot, angle));
    }

    pub fn transform(&mut self, affine: &Affine2) {
        for b in &mut self.branches {
            b.transform(affine);
        }
        self.pivot = affine.transform_point2(self.pivot);
    }

    /// Places the instance at the end of `branch`.
    ///
    /// The instance is turned so its trunk leaves in the direction the
    /// branch arrives, compensating for the trunk's own entry angle, then
    /// moved so its pivot sits on the branch's last point. No collision
    /// checks happen here.
    pub fn align_at_branch(&mut self, branch: &Branch) {
        let entry = angle_of(self.trunk().entry_tangent());
        let exit = angle_of(branch.exit_tangent());
        self.rotate(exit - entry);
        self.set_position(branch.last_point());
    }

    /// Lengthens the trunk downward by `amount` and re-pivots on its new start.
    pub fn extend_trunk(&mut self, amount: f32) {
        let start = self.trunk().first_point() + Vec2::new(0.0, amount);
        self.branches[TRUNK].extend_start(start);
        self.pivot = start;
    }

    /// True if this instance hangs lower on screen than `other`.
    pub fn is_lower_than(&self, other: &GlyphInstance) -> bool {
        self.bounds().bottom() > other.bounds().bottom()
    }

    /// Branch indices in `order`, using the placed (world) coordinates.
    pub fn sort_branches<R: Rng + ?Sized>(
        &self,
        order: GrowingOrder,
        start_at_trunk: bool,
        rng: &mut R,
    ) -> Vec<BranchIndex> {
        sort_branch_indices(&end_xs(&self.branches), order, start_at_trunk, rng)
    }

    /// True when any branch of `self` crosses any branch of `other`.
    ///
    /// Contacts at this instance's pivot are ignored, since that is where
    /// it joins its parent.
    pub fn crosses(&self, other: &GlyphInstance) -> bool {
        let exclude = Some(self.trunk().first_point());
        self.branches
            .iter()
            .any(|a| other.branches.iter().any(|b| a.crosses(b, exclude)))
    }
}

impl Outline for GlyphInstance {
    fn bounds(&self) -> Rect {
        self.branches
            .iter()
            .fold(Rect::EMPTY, |r, b| r.union(&b.bounds()))
    }

    fn draw(&self, canvas: &mut dyn Canvas) {
        for b in &self.branches {
            canvas.stroke(b, StrokeKind::Glyph);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};
    use std::collections::HashSet;

    /// A glyph whose trunk is straight and vertical, with straight
    /// branches from the trunk's top to each of `tips`.
    pub(crate) fn straight_glyph(ch: char, height: f32, tips: &[Vec2]) -> GlyphShape {
        let top = Vec2::new(0.0, -height);
        let mut branches = vec![Branch::line(Vec2::ZERO, top)];
        branches.extend(tips.iter().map(|&tip| Branch::line(top, tip)));
        GlyphShape::new(ch, branches).unwrap()
    }

    fn approx(a: Vec2, b: Vec2) -> bool {
        a.distance(b) < 1e-3
    }

    #[test]
    fn shape_without_branches_is_invalid() {
        let err = GlyphShape::new('x', Vec::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidShape { ref glyph, .. } if glyph == "x"));
    }

    #[test]
    fn instance_pivot_is_trunk_start() {
        let shape = straight_glyph('a', 10.0, &[]);
        let inst = shape.instantiate();
        assert_eq!(inst.pivot(), Vec2::ZERO);
        assert!((shape.entry_angle() + std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn left_right_with_trunk_first() {
        // Trunk ends at x = 0, the others at 5 and -3.
        let shape = straight_glyph('a', 10.0, &[Vec2::new(5.0, -20.0), Vec2::new(-3.0, -20.0)]);
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(
            shape.sort_branches(GrowingOrder::LeftRight, true, &mut rng),
            vec![0, 2, 1]
        );
        assert_eq!(
            shape.sort_branches(GrowingOrder::LeftRight, false, &mut rng),
            vec![2, 0, 1]
        );
        assert_eq!(
            shape.sort_branches(GrowingOrder::RightLeft, false, &mut rng),
            vec![1, 0, 2]
        );
        assert_eq!(
            shape.sort_branches(GrowingOrder::Natural, false, &mut rng),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn random_order_is_a_permutation_and_varies() {
        let mut rng = StdRng::seed_from_u64(7);
        let xs = [0.0, 1.0, 2.0, 3.0];
        let mut seen = HashSet::new();
        for _ in 0..200 {
            let order = sort_branch_indices(&xs, GrowingOrder::Random, false, &mut rng);
            let mut sorted = order.clone();
            sorted.sort();
            assert_eq!(sorted, vec![0, 1, 2, 3]);
            seen.insert(order);
        }
        assert!(seen.len() > 1);
    }

    #[test]
    fn align_at_branch_points_trunk_along_branch() {
        // Trunk grows straight up; the branch leaves to the right.
        let shape = straight_glyph('a', 10.0, &[]);
        let branch = Branch::line(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0));

        let mut inst = shape.instantiate();
        inst.align_at_branch(&branch);

        assert!(approx(inst.pivot(), Vec2::new(10.0, 0.0)));
        assert!(approx(inst.trunk().first_point(), Vec2::new(10.0, 0.0)));
        assert!(approx(inst.trunk().last_point(), Vec2::new(20.0, 0.0)));
    }

    #[test]
    fn align_compensates_curved_entry() {
        // Trunk leaves its start heading right-up at 45°.
        let trunk = Branch::line(Vec2::ZERO, Vec2::new(10.0, -10.0));
        let shape = GlyphShape::new('c', vec![trunk]).unwrap();
        let up = Branch::line(Vec2::new(0.0, 0.0), Vec2::new(0.0, -10.0));

        let mut inst = shape.instantiate();
        inst.align_at_branch(&up);

        let dir = inst.trunk().entry_tangent();
        assert!(approx(dir, Vec2::new(0.0, -1.0)));
        assert!(approx(inst.pivot(), Vec2::new(0.0, -10.0)));
    }

    #[test]
    fn extend_trunk_moves_pivot_down() {
        let shape = straight_glyph('a', 10.0, &[]);
        let mut inst = shape.instantiate();
        inst.extend_trunk(15.0);
        assert_eq!(inst.pivot(), Vec2::new(0.0, 15.0));
        assert!((inst.bounds().bottom() - 15.0).abs() < 1e-5);
    }

    #[test]
    fn lower_is_larger_bottom() {
        let shape = straight_glyph('a', 10.0, &[]);
        let high = shape.instantiate();
        let mut low = shape.instantiate();
        low.set_position(Vec2::new(0.0, 5.0));
        assert!(low.is_lower_than(&high));
        assert!(!high.is_lower_than(&low));
    }
}
