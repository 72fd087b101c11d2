//! Options for word growth, kerning and composite layout.
//!
//! Every option struct deserializes with `#[serde(default)]`, so a partial
//! JSON document only overrides the fields it names.

use serde::{Deserialize, Serialize};

/// The order in which a glyph's branches are offered to the next character.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GrowingOrder {
    /// Declaration order of the glyph's branches.
    #[default]
    Natural,
    /// Ascending by the branch endpoint's horizontal coordinate.
    LeftRight,
    /// Descending by the branch endpoint's horizontal coordinate.
    RightLeft,
    /// Uniformly shuffled on every sort.
    Random,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WritingMode {
    #[default]
    LeftToRight,
    RightToLeft,
}

impl WritingMode {
    pub fn is_left_to_right(self) -> bool {
        matches!(self, Self::LeftToRight)
    }
}

/// Rule used to pick the center child when a composite tree has four or
/// more children.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CenterPolicy {
    /// Split by position around the horizontal midpoint, then take the
    /// boundary child whose removal leaves the two sides best balanced.
    #[default]
    Lookahead,
    /// Split by accumulated width at the half-width threshold, then take
    /// the boundary child of the wider side.
    Threshold,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordOptions {
    pub growing_order: GrowingOrder,
    /// Offer the trunk first, regardless of `growing_order`.
    pub start_at_trunk: bool,
    /// Minimum clearance between the lowest hanging glyph and the root.
    pub branch_bottom_distance: f32,
    /// Upper bound on candidate placements tried by a single grow call.
    pub max_candidates: usize,
    /// Seed for [`GrowingOrder::Random`]; `None` draws from the OS.
    pub seed: Option<u64>,
}

impl Default for WordOptions {
    fn default() -> Self {
        Self {
            growing_order: GrowingOrder::Natural,
            start_at_trunk: true,
            branch_bottom_distance: 30.0,
            max_candidates: 10_000,
            seed: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernerOptions {
    pub writing_mode: WritingMode,
    /// Rasterization resolution in dots per inch. Higher is more accurate
    /// and slower.
    pub resolution: u32,
    /// Intentional gap left between two kerned shapes, in world units.
    pub spacing: f32,
    /// Keep annotated rasters of every measurement.
    pub debug: bool,
}

impl Default for KernerOptions {
    fn default() -> Self {
        Self {
            writing_mode: WritingMode::LeftToRight,
            resolution: 10,
            spacing: 20.0,
            debug: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeOptions {
    pub word: WordOptions,
    pub kerner: KernerOptions,
    pub center_policy: CenterPolicy,
    /// Extra trunk length below the side groups.
    pub trunk_margin: f32,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            word: WordOptions::default(),
            kerner: KernerOptions::default(),
            center_policy: CenterPolicy::default(),
            trunk_margin: 20.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let opts: TreeOptions = serde_json::from_str(
            r#"{ "word": { "growing_order": "left-right" }, "kerner": { "resolution": 20 } }"#,
        )
        .unwrap();

        assert_eq!(opts.word.growing_order, GrowingOrder::LeftRight);
        assert!(opts.word.start_at_trunk);
        assert_eq!(opts.word.branch_bottom_distance, 30.0);
        assert_eq!(opts.kerner.resolution, 20);
        assert_eq!(opts.kerner.spacing, 20.0);
        assert_eq!(opts.center_policy, CenterPolicy::Lookahead);
    }

    #[test]
    fn enum_names_are_kebab_case() {
        let mode: WritingMode = serde_json::from_str(r#""right-to-left""#).unwrap();
        assert!(!mode.is_left_to_right());

        let order = serde_json::to_string(&GrowingOrder::RightLeft).unwrap();
        assert_eq!(order, r#""right-left""#);
    }
}
