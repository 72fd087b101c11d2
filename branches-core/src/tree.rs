//! Composite trees: words and nested groups balanced around a shared trunk.
//!
//! Children are first packed side by side with the [`Kerner`], then split
//! into a left group, a right group and one center child. The left group is
//! turned to grow leftward from the trunk and the right group rightward;
//! the center child sits on top of the trunk.

use std::f32::consts::FRAC_PI_2;

use glam::{Affine2, Vec2};
use image::RgbaImage;
use log::debug;

use crate::{
    catalogue::Catalogue,
    config::{CenterPolicy, TreeOptions},
    error::Result,
    geometry::{Branch, Canvas, Outline, Rect, Shape, StrokeKind, rotation_about},
    kerner::{KernOutcome, Kerner},
    word_tree::WordTree,
};

/// Text to grow: a single word, or a group of nested content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentNode {
    Word(String),
    Group(Vec<ContentNode>),
}

impl ContentNode {
    /// Splits `text` into sentences on `.` and newlines, and sentences into
    /// words on whitespace.
    ///
    /// A single sentence becomes a flat group of words; several sentences
    /// become a group of groups.
    pub fn parse(text: &str) -> Self {
        let mut sentences: Vec<ContentNode> = text
            .split(['.', '\n'])
            .map(|s| {
                s.split_whitespace()
                    .map(|w| ContentNode::Word(w.to_owned()))
                    .collect::<Vec<_>>()
            })
            .filter(|words| !words.is_empty())
            .map(ContentNode::Group)
            .collect();

        match sentences.len() {
            1 => sentences.remove(0),
            _ => ContentNode::Group(sentences),
        }
    }
}

/// A grown tree: one word, or a composite of child trees.
#[derive(Debug)]
pub enum Tree {
    Word(WordTree),
    Composite(CompositeTree),
}

impl Tree {
    pub fn is_empty(&self) -> bool {
        match self {
            Tree::Word(t) => t.is_empty(),
            Tree::Composite(t) => t.is_empty(),
        }
    }

    /// Disposes the tree and everything it owns.
    pub fn remove(self) {
        match self {
            Tree::Word(t) => t.remove(),
            Tree::Composite(t) => t.remove(),
        }
    }
}

impl Outline for Tree {
    fn bounds(&self) -> Rect {
        match self {
            Tree::Word(t) => t.bounds(),
            Tree::Composite(t) => t.bounds(),
        }
    }

    fn draw(&self, canvas: &mut dyn Canvas) {
        match self {
            Tree::Word(t) => t.draw(canvas),
            Tree::Composite(t) => t.draw(canvas),
        }
    }
}

impl Shape for Tree {
    fn transform(&mut self, affine: &Affine2) {
        match self {
            Tree::Word(t) => t.transform(affine),
            Tree::Composite(t) => t.transform(affine),
        }
    }

    fn anchor(&self) -> Vec2 {
        match self {
            Tree::Word(t) => t.anchor(),
            Tree::Composite(t) => t.anchor(),
        }
    }
}

/// Grows `content` into a tree.
///
/// Words become [`WordTree`]s and groups become [`CompositeTree`]s of their
/// grown children. Words that grow empty are left out of their group.
///
/// ### Parameters
/// - `content` - The word or group to grow.
/// - `catalogue` - Glyph shapes for every character in `content`.
/// - `options` - Growth, kerning and layout options, shared by every level.
///
/// ### Returns
/// The grown tree, positioned wherever its layout left it. Use
/// [`Shape::set_anchor`] to place it.
///
/// ### Errors
/// The first [`crate::Error::MissingGlyph`] met while growing any word.
pub fn build_tree(content: &ContentNode, catalogue: &Catalogue, options: &TreeOptions) -> Result<Tree> {
    match content {
        ContentNode::Word(word) => {
            let mut tree = WordTree::new(options.word);
            tree.grow(word, catalogue)?;
            Ok(Tree::Word(tree))
        }
        ContentNode::Group(children) => {
            let trees = children
                .iter()
                .map(|child| build_tree(child, catalogue, options))
                .filter(|tree| !matches!(tree, Ok(t) if t.is_empty()))
                .collect::<Result<Vec<_>>>()?;
            let mut composite = CompositeTree::new(*options);
            composite.grow(trees);
            Ok(Tree::Composite(composite))
        }
    }
}

/// Which children went where in the last layout, by index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Distribution {
    pub left: Vec<usize>,
    pub center: Option<usize>,
    pub right: Vec<usize>,
}

#[derive(Debug)]
pub struct CompositeTree {
    options: TreeOptions,
    kerner: Kerner,
    trees: Vec<Tree>,
    trunk: Option<Branch>,
    distribution: Distribution,
    overlays: Vec<(RgbaImage, RgbaImage)>,
}

impl CompositeTree {
    /// An empty composite with no trunk.
    ///
    /// ### Parameters
    /// - `options` - Kerning and layout options. `options.kerner.debug`
    ///   makes every layout keep its overlays.
    pub fn new(options: TreeOptions) -> Self {
        Self {
            options,
            kerner: Kerner::new(options.kerner),
            trees: Vec::new(),
            trunk: None,
            distribution: Distribution::default(),
            overlays: Vec::new(),
        }
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    pub fn trunk(&self) -> Option<&Branch> {
        self.trunk.as_ref()
    }

    pub fn sides(&self) -> &Distribution {
        &self.distribution
    }

    /// Annotated `(trailing, leading)` rasters of every kerning step of the
    /// last layout, in order. Empty unless the kerner runs in debug mode.
    pub fn debug_overlays(&self) -> &[(RgbaImage, RgbaImage)] {
        &self.overlays
    }

    /// Replaces the children with `trees`, packs them and lays them out.
    ///
    /// 1. Each tree is kerned after the ones before it.
    /// 2. The packed trees are divided into left, center and right with the
    ///    configured [`CenterPolicy`].
    /// 3. Each side is repacked, turned a quarter away from the trunk and
    ///    abutted to it; the center tree sits on the trunk top.
    ///
    /// ### Parameters
    /// - `trees` - Already grown children, in writing order. Any previous
    ///   children are removed first.
    pub fn grow(&mut self, trees: Vec<Tree>) {
        self.chop();
        for tree in trees {
            self.add(tree);
        }
        self.layout();
    }

    /// Removes every child tree.
    pub fn chop(&mut self) {
        for tree in self.trees.drain(..) {
            tree.remove();
        }
        self.trunk = None;
        self.distribution = Distribution::default();
        self.overlays.clear();
    }

    /// Disposes the children, then the tree itself.
    pub fn remove(mut self) {
        self.chop();
    }

    /// Kerns `tree` after the children packed so far.
    fn add(&mut self, mut tree: Tree) {
        if !self.trees.is_empty() {
            let outcome = self.kerner.kern(&mut tree, self.trees.as_slice());
            self.keep_overlays(outcome);
        }
        self.trees.push(tree);
    }

    fn keep_overlays(&mut self, outcome: KernOutcome) {
        if let Some(pair) = outcome.overlays {
            self.overlays.push(pair);
        }
    }

    fn layout(&mut self) {
        if self.trees.is_empty() {
            return;
        }
        let distribution = divide(&self.trees, self.options.center_policy);
        debug!(
            "dividing {} trees: left {:?}, center {:?}, right {:?}",
            self.trees.len(),
            distribution.left,
            distribution.center,
            distribution.right
        );

        // Packed bottom-centre, so the layout stays near where the children
        // were packed.
        let packed = self.trees.as_slice().bounds();
        let base = Vec2::new(packed.center().x, packed.bottom());

        // Upright widths become heights once the groups are turned.
        let left_width = self.pack(&distribution.left);
        let right_width = self.pack(&distribution.right);
        let height = left_width.max(right_width);
        self.stretch(&distribution.left, height - left_width);
        self.stretch(&distribution.right, height - right_width);

        let top = base - Vec2::new(0.0, height + self.options.trunk_margin);
        let trunk = Branch::line(base, top);

        self.place_side(&distribution.left, -FRAC_PI_2, top, height, left_width < height);
        self.place_side(&distribution.right, FRAC_PI_2, top, height, right_width < height);

        if let Some(center) = distribution.center {
            self.trees[center].set_anchor(top);
        }

        self.trunk = Some(trunk);
        self.distribution = distribution;
    }

    /// Kerns the trees in `ids` one after another, returning the group width.
    fn pack(&mut self, ids: &[usize]) -> f32 {
        for (k, &id) in ids.iter().enumerate().skip(1) {
            let outcome = {
                let placed: Vec<&Tree> = ids[..k].iter().map(|&j| &self.trees[j]).collect();
                self.kerner.measure(&self.trees[id], placed.as_slice())
            };
            self.trees[id].translate(outcome.offset);
            self.keep_overlays(outcome);
        }
        self.group_bounds(ids).width()
    }

    /// Spreads the trees in `ids` apart along the writing direction so the
    /// group grows by `extra`. Only positions change.
    fn stretch(&mut self, ids: &[usize], extra: f32) {
        if ids.len() < 2 || extra <= 0.0 {
            return;
        }
        let step = extra / (ids.len() - 1) as f32;
        let sign = if self.options.kerner.writing_mode.is_left_to_right() {
            1.0
        } else {
            -1.0
        };
        for (k, &id) in ids.iter().enumerate() {
            self.trees[id].translate(Vec2::new(sign * step * k as f32, 0.0));
        }
    }

    /// Turns the group by `angle` and abuts it to the trunk below `top`.
    ///
    /// The tallest group hangs flush from the top; a shorter one is
    /// centred against it.
    fn place_side(&mut self, ids: &[usize], angle: f32, top: Vec2, height: f32, shorter: bool) {
        if ids.is_empty() {
            return;
        }
        let center = self.group_bounds(ids).center();
        let turn = rotation_about(center, angle);
        for &id in ids {
            self.trees[id].transform(&turn);
        }

        let bounds = self.group_bounds(ids);
        let x = if angle < 0.0 {
            top.x - bounds.right()
        } else {
            top.x - bounds.left()
        };
        let y = if shorter {
            top.y + height * 0.5 - bounds.center().y
        } else {
            top.y - bounds.top()
        };
        for &id in ids {
            self.trees[id].translate(Vec2::new(x, y));
        }
    }

    fn group_bounds(&self, ids: &[usize]) -> Rect {
        ids.iter()
            .fold(Rect::EMPTY, |r, &id| r.union(&self.trees[id].bounds()))
    }
}

impl Outline for CompositeTree {
    fn bounds(&self) -> Rect {
        let children = self.trees.as_slice().bounds();
        match &self.trunk {
            Some(trunk) => children.union(&trunk.bounds()),
            None => children,
        }
    }

    fn draw(&self, canvas: &mut dyn Canvas) {
        if let Some(trunk) = &self.trunk {
            canvas.stroke(trunk, StrokeKind::Trunk);
        }
        self.trees.as_slice().draw(canvas);
    }
}

impl Shape for CompositeTree {
    fn transform(&mut self, affine: &Affine2) {
        if let Some(trunk) = &mut self.trunk {
            trunk.transform(affine);
        }
        for tree in &mut self.trees {
            tree.transform(affine);
        }
    }

    /// The bottom of the trunk, or the origin before anything has grown.
    fn anchor(&self) -> Vec2 {
        self.trunk.as_ref().map_or(Vec2::ZERO, Branch::first_point)
    }
}

/// Splits packed trees into a left group, a center and a right group.
///
/// ### Parameters
/// - `trees` - Packed trees in writing order.
/// - `policy` - How the center is chosen among four or more trees.
///
/// ### Returns
/// A [`Distribution`] of indices into `trees`. Each side lists its trees
/// in writing order, and every index appears exactly once.
pub fn divide(trees: &[Tree], policy: CenterPolicy) -> Distribution {
    let widths: Vec<f32> = trees.iter().map(|t| t.bounds().width()).collect();
    let centers: Vec<f32> = trees.iter().map(|t| t.bounds().center().x).collect();
    let midpoint = trees.bounds().center().x;
    divide_by(&widths, &centers, midpoint, policy)
}

/// [`divide`] over plain measurements: each tree's width and horizontal
/// centre, and the midpoint of all of them.
pub fn divide_by(widths: &[f32], centers: &[f32], midpoint: f32, policy: CenterPolicy) -> Distribution {
    match widths.len() {
        0 => Distribution::default(),
        1 => Distribution {
            center: Some(0),
            ..Distribution::default()
        },
        2 => Distribution {
            left: vec![0],
            center: Some(1),
            right: Vec::new(),
        },
        3 => Distribution {
            left: vec![0],
            center: Some(1),
            right: vec![2],
        },
        _ => match policy {
            CenterPolicy::Lookahead => divide_lookahead(widths, centers, midpoint),
            CenterPolicy::Threshold => divide_threshold(widths, centers),
        },
    }
}

fn span(widths: &[f32], ids: &[usize]) -> f32 {
    ids.iter().map(|&i| widths[i]).sum()
}

/// Splits on the midpoint, then takes the boundary tree whose removal
/// leaves the sides best balanced.
///
/// The boundary trees are the ones nearest the midpoint on each side,
/// whatever the writing direction. On a tie the tree comes from the wider
/// side, then from the left. When a side holds a single tree the two
/// boundary trees are compared by their distance to the midpoint instead.
fn divide_lookahead(widths: &[f32], centers: &[f32], midpoint: f32) -> Distribution {
    let (mut left, mut right): (Vec<usize>, Vec<usize>) =
        (0..widths.len()).partition(|&i| centers[i] < midpoint);
    // Left to right on screen, so the boundaries are `left.last()` and
    // `right.first()`.
    left.sort_by(|&a, &b| centers[a].total_cmp(&centers[b]));
    right.sort_by(|&a, &b| centers[a].total_cmp(&centers[b]));

    let take_left = match (left.last(), right.first()) {
        (None, _) => false,
        (_, None) => true,
        (Some(&l), Some(&r)) if left.len() == 1 || right.len() == 1 => {
            let (dl, dr) = ((midpoint - centers[l]).abs(), (centers[r] - midpoint).abs());
            if dl == dr { left.len() >= right.len() } else { dl < dr }
        }
        (Some(&l), Some(&r)) => {
            let (wl, wr) = (span(widths, &left), span(widths, &right));
            let without_left = ((wl - widths[l]) - wr).abs();
            let without_right = (wl - (wr - widths[r])).abs();
            if without_left == without_right {
                wl >= wr
            } else {
                without_left < without_right
            }
        }
    };

    let center = if take_left { left.pop() } else { Some(right.remove(0)) };
    left.sort_unstable();
    right.sort_unstable();
    Distribution { left, center, right }
}

/// Fills the left side, leftmost tree first, until the accumulated width
/// reaches half of the total, then takes the center from whichever side is
/// wider.
fn divide_threshold(widths: &[f32], centers: &[f32]) -> Distribution {
    let half = widths.iter().sum::<f32>() / 2.0;
    let mut order: Vec<usize> = (0..widths.len()).collect();
    order.sort_by(|&a, &b| centers[a].total_cmp(&centers[b]));

    let (mut left, mut right) = (Vec::new(), Vec::new());
    let mut acc = 0.0;
    for i in order {
        acc += widths[i];
        if acc < half { left.push(i) } else { right.push(i) }
    }

    let center = if span(widths, &left) > span(widths, &right) || right.is_empty() {
        left.pop()
    } else {
        Some(right.remove(0))
    };
    left.sort_unstable();
    right.sort_unstable();
    Distribution { left, center, right }
}
