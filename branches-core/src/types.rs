/// Identifier for a placed glyph in a [`crate::word_tree::WordTree`].
///
/// This is an index into the tree's node list, and is only meaningful
/// until the tree is chopped or regrown.
pub type InstanceId = usize;

/// Index of a branch within a glyph. Branch `0` is always the trunk.
pub type BranchIndex = usize;

/// Index of the trunk branch in every glyph.
pub const TRUNK: BranchIndex = 0;
