//! Core library for growing glyph trees that spell words and sentences.
//!
//! Main components:
//! - [`geometry`] - curves, branch paths, bounds and the drawing seams.
//! - [`raster`] - stroke rasterization and silhouette edge profiles.
//! - [`glyph`] - glyph shape templates and their placed instances.
//! - [`catalogue`] - the character → glyph shape lookup.
//! - [`word_tree`] - backtracking growth of a single word.
//! - [`kerner`] - raster-based minimal-gap packing of two shapes.
//! - [`tree`] - composite trees balanced around a shared trunk.
//! - [`config`] - options for growth, kerning and layout.
//! - [`error`] - the error taxonomy.
//! - [`types`] - shared type aliases and IDs.

pub mod catalogue;
pub mod config;
pub mod error;
pub mod geometry;
pub mod glyph;
pub mod kerner;
pub mod raster;
pub mod tree;
pub mod types;
pub mod word_tree;

pub use catalogue::Catalogue;
pub use error::{Error, Result};
pub use tree::{ContentNode, Tree, build_tree};
pub use word_tree::WordTree;
