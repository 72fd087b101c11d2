//! The character → glyph shape lookup.
//!
//! Catalogues are normally built by an external loader. A JSON form is also
//! supported:
//!
//! ```json
//! { "glyphs": { "a": [ { "type": "path", "segments": [
//!     { "point": [0, 0] },
//!     { "point": [0, -40], "handle_in": [0, 10] }
//! ] } ] } }
//! ```
//!
//! Handles are relative to their segment's point. Every element of a glyph
//! must be a path with at least two segments; the first path is the trunk.

use std::{collections::HashMap, path::Path};

use glam::Vec2;
use log::debug;
use serde::Deserialize;

use crate::{
    error::{Error, Result},
    geometry::{Branch, Curve},
    glyph::GlyphShape,
};

#[derive(Clone, Debug, Default)]
pub struct Catalogue {
    shapes: HashMap<char, GlyphShape>,
}

impl Catalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `shape`, replacing any shape already stored for its character.
    pub fn insert(&mut self, shape: GlyphShape) -> Option<GlyphShape> {
        self.shapes.insert(shape.ch(), shape)
    }

    /// ### Errors
    /// [`Error::MissingGlyph`] naming `ch` when no shape is stored for it.
    pub fn get(&self, ch: char) -> Result<&GlyphShape> {
        self.shapes.get(&ch).ok_or(Error::MissingGlyph(ch))
    }

    pub fn contains(&self, ch: char) -> bool {
        self.shapes.contains_key(&ch)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Stored characters, sorted.
    pub fn chars(&self) -> Vec<char> {
        let mut chars: Vec<char> = self.shapes.keys().copied().collect();
        chars.sort_unstable();
        chars
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: CatalogueFile = serde_json::from_str(json)?;
        let mut catalogue = Self::new();
        for (name, elements) in file.glyphs {
            let mut chars = name.chars();
            let (Some(ch), None) = (chars.next(), chars.next()) else {
                return Err(Error::invalid_shape(name, "glyph keys must be a single character"));
            };
            catalogue.insert(parse_glyph(ch, &elements)?);
        }
        debug!("parsed catalogue with {} glyphs", catalogue.len());
        Ok(catalogue)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("loading catalogue from {}", path.display());
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }
}

#[derive(Deserialize)]
struct CatalogueFile {
    glyphs: HashMap<String, Vec<ElementDef>>,
}

#[derive(Deserialize)]
struct ElementDef {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    segments: Vec<SegmentDef>,
}

#[derive(Deserialize)]
struct SegmentDef {
    point: [f32; 2],
    #[serde(default)]
    handle_in: Option<[f32; 2]>,
    #[serde(default)]
    handle_out: Option<[f32; 2]>,
}

fn parse_glyph(ch: char, elements: &[ElementDef]) -> Result<GlyphShape> {
    let branches = elements
        .iter()
        .enumerate()
        .map(|(i, el)| {
            if el.kind != "path" {
                return Err(Error::invalid_shape(
                    ch,
                    format!("child {i} is a {:?}, not a path", el.kind),
                ));
            }
            parse_path(&el.segments)
                .ok_or_else(|| Error::invalid_shape(ch, format!("path {i} needs two segments")))
        })
        .collect::<Result<Vec<_>>>()?;
    GlyphShape::new(ch, branches)
}

fn parse_path(segments: &[SegmentDef]) -> Option<Branch> {
    let curves = segments
        .windows(2)
        .map(|w| {
            let p0 = Vec2::from(w[0].point);
            let p1 = Vec2::from(w[1].point);
            let out = w[0].handle_out.map_or(Vec2::ZERO, Vec2::from);
            let into = w[1].handle_in.map_or(Vec2::ZERO, Vec2::from);
            Curve::new(p0, p0 + out, p1 + into, p1)
        })
        .collect();
    Branch::from_curves(curves)
}
