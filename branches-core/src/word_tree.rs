//! Growth of a single word into a tree of glyph instances.
//!
//! Every character after the first is tried at each branch of the glyph it
//! follows. A candidate that crosses any glyph already in the tree is
//! dropped together with everything that would have grown from it; sibling
//! branches still get their turn. The search is a depth-first walk over an
//! explicit stack of frames, in the same order a recursive formulation
//! would visit.

use glam::{Affine2, Vec2};
use log::{debug, trace, warn};
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    catalogue::Catalogue,
    config::WordOptions,
    error::Result,
    geometry::{Canvas, Outline, Rect, Shape},
    glyph::{GlyphInstance, GlyphShape},
    types::{BranchIndex, InstanceId},
};

const ROOT: InstanceId = 0;

#[derive(Debug)]
pub struct GlyphNode {
    pub instance: GlyphInstance,
    pub parent: Option<InstanceId>,
    /// Branch of the parent this glyph grows from.
    pub branch: Option<BranchIndex>,
    pub children: Vec<InstanceId>,
}

/// Counters from a single [`WordTree::grow`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GrowthReport {
    pub accepted: usize,
    pub rejected: usize,
    /// Growth stopped at [`WordOptions::max_candidates`].
    pub truncated: bool,
}

/// One pending level of the depth-first walk.
struct Frame {
    glyph: InstanceId,
    /// Index of the character to place next.
    depth: usize,
    order: Vec<BranchIndex>,
    next: usize,
}

#[derive(Debug)]
pub struct WordTree {
    options: WordOptions,
    word: String,
    nodes: Vec<GlyphNode>,
    lowest: Option<InstanceId>,
    rng: StdRng,
}

impl WordTree {
    /// Creates an empty tree.
    ///
    /// ### Parameters
    /// - `options` - Growth options. With a `seed`, every growth of the same
    ///   word gives the same tree; without one, the random branch order
    ///   comes from the thread-local generator.
    pub fn new(options: WordOptions) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Self {
            options,
            word: String::new(),
            nodes: Vec::new(),
            lowest: None,
            rng,
        }
    }

    pub fn options(&self) -> &WordOptions {
        &self.options
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn nodes(&self) -> &[GlyphNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn instances(&self) -> impl Iterator<Item = &GlyphInstance> {
        self.nodes.iter().map(|n| &n.instance)
    }

    /// The glyph hanging furthest below the baseline, never the root.
    pub fn lowest(&self) -> Option<InstanceId> {
        self.lowest
    }

    /// Grows `word` using shapes from `catalogue`.
    ///
    /// Every character is looked up before anything changes, so a failed
    /// lookup leaves the tree exactly as it was. A tree that already holds
    /// glyphs is chopped and regrown. An empty word leaves the tree empty.
    ///
    /// ### Parameters
    /// - `word` - Characters to place, first one at the root.
    /// - `catalogue` - Shapes to look the characters up in.
    ///
    /// ### Returns
    /// A [`GrowthReport`] counting accepted and rejected candidates. A
    /// search cut short by [`WordOptions::max_candidates`] still returns
    /// `Ok`, with `truncated` set.
    ///
    /// ### Errors
    /// [`crate::Error::MissingGlyph`] for the first character without a shape.
    pub fn grow(&mut self, word: &str, catalogue: &Catalogue) -> Result<GrowthReport> {
        let shapes = word
            .chars()
            .map(|ch| catalogue.get(ch))
            .collect::<Result<Vec<&GlyphShape>>>()?;

        if !self.nodes.is_empty() {
            self.chop();
        }
        if let Some(seed) = self.options.seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self.word = word.to_owned();

        let mut report = GrowthReport::default();
        let Some((first, rest)) = shapes.split_first() else {
            return Ok(report);
        };

        let root = self.commit(first.instantiate(), None, None);
        report.accepted += 1;

        let mut stack = Vec::new();
        if !rest.is_empty() {
            stack.push(self.frame(root, 0));
        }

        let mut tried = 0;
        while let Some(frame) = stack.last_mut() {
            if frame.next >= frame.order.len() {
                stack.pop();
                continue;
            }
            let branch = frame.order[frame.next];
            frame.next += 1;
            let (parent, depth) = (frame.glyph, frame.depth);

            if tried >= self.options.max_candidates {
                warn!(
                    "growth of {word:?} stopped after {tried} candidates, {} glyphs placed",
                    self.nodes.len()
                );
                report.truncated = true;
                break;
            }
            tried += 1;

            let mut candidate = rest[depth].instantiate();
            candidate.align_at_branch(&self.nodes[parent].instance.branches()[branch]);

            if crosses_any(&candidate, &self.nodes) {
                trace!(
                    "rejected {:?} at branch {branch} of glyph {parent}",
                    candidate.ch()
                );
                report.rejected += 1;
                continue;
            }

            let id = self.commit(candidate, Some(parent), Some(branch));
            report.accepted += 1;
            self.adjust_trunk();

            if depth + 1 < rest.len() {
                stack.push(self.frame(id, depth + 1));
            }
        }

        self.adjust_trunk();
        debug!(
            "grew {word:?}: {} accepted, {} rejected",
            report.accepted, report.rejected
        );
        Ok(report)
    }

    /// Removes every glyph, leaving the tree ready to grow again.
    pub fn chop(&mut self) {
        self.nodes.clear();
        self.lowest = None;
        self.word.clear();
    }

    /// Disposes the tree and all of its glyphs.
    pub fn remove(mut self) {
        self.chop();
    }

    fn frame(&mut self, glyph: InstanceId, depth: usize) -> Frame {
        let order = self.nodes[glyph].instance.sort_branches(
            self.options.growing_order,
            self.options.start_at_trunk,
            &mut self.rng,
        );
        Frame {
            glyph,
            depth,
            order,
            next: 0,
        }
    }

    fn commit(
        &mut self,
        instance: GlyphInstance,
        parent: Option<InstanceId>,
        branch: Option<BranchIndex>,
    ) -> InstanceId {
        let id = self.nodes.len();
        let is_lowest = parent.is_some()
            && self
                .lowest
                .is_none_or(|low| instance.is_lower_than(&self.nodes[low].instance));
        self.nodes.push(GlyphNode {
            instance,
            parent,
            branch,
            children: Vec::with_capacity(4),
        });
        if let Some(p) = parent {
            self.nodes[p].children.push(id);
        }
        if is_lowest {
            self.lowest = Some(id);
        }
        id
    }

    /// Extends the root's trunk until the lowest glyph clears it by
    /// `branch_bottom_distance`.
    fn adjust_trunk(&mut self) {
        let Some(lowest) = self.lowest else {
            return;
        };
        let clearance = self.options.branch_bottom_distance;
        let bottom = self.nodes[lowest].instance.bounds().bottom();
        let root = &mut self.nodes[ROOT].instance;
        let distance = bottom - root.pivot().y;
        if distance > -clearance {
            trace!("extending trunk by {}", distance + clearance);
            root.extend_trunk(distance + clearance);
        }
    }
}

/// Tests `candidate` against every accepted glyph.
fn crosses_any(candidate: &GlyphInstance, accepted: &[GlyphNode]) -> bool {
    let bounds = candidate.bounds();
    accepted
        .iter()
        .filter(|n| n.instance.bounds().intersects(&bounds))
        .any(|n| candidate.crosses(&n.instance))
}

impl Outline for WordTree {
    fn bounds(&self) -> Rect {
        self.nodes
            .iter()
            .fold(Rect::EMPTY, |r, n| r.union(&n.instance.bounds()))
    }

    fn draw(&self, canvas: &mut dyn Canvas) {
        for n in &self.nodes {
            n.instance.draw(canvas);
        }
    }
}

impl Shape for WordTree {
    fn transform(&mut self, affine: &Affine2) {
        for n in &mut self.nodes {
            n.instance.transform(affine);
        }
    }

    /// The start of the root glyph's trunk.
    fn anchor(&self) -> Vec2 {
        self.nodes
            .first()
            .map_or(Vec2::ZERO, |n| n.instance.pivot())
    }
}
