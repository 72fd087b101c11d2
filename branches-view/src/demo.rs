//! A built-in catalogue of procedurally drawn glyphs for `a`-`z`.
//!
//! Each character gets a curved trunk with one to three side branches
//! reaching upward. Shapes are seeded by the character, so the same letter
//! always looks the same.

use std::f32::consts::PI;

use branches_core::{
    Catalogue, Result,
    geometry::{Branch, Curve},
    glyph::GlyphShape,
};
use glam::Vec2;
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Builds the demo catalogue.
pub fn catalogue() -> Result<Catalogue> {
    let mut catalogue = Catalogue::new();
    for ch in 'a'..='z' {
        catalogue.insert(glyph(ch)?);
    }
    Ok(catalogue)
}

fn glyph(ch: char) -> Result<GlyphShape> {
    let mut rng = StdRng::seed_from_u64(u64::from(ch));

    let height = rng.random_range(30.0..50.0);
    let lean = rng.random_range(-8.0..8.0);
    let trunk = Curve::new(
        Vec2::ZERO,
        Vec2::new(0.0, -height / 3.0),
        Vec2::new(lean, -2.0 * height / 3.0),
        Vec2::new(lean, -height),
    );

    let count = rng.random_range(1..=3);
    let mut branches = vec![Branch::from_curve(trunk)];
    for i in 0..count {
        // Fan the branches out between upper-left and upper-right.
        let slot = (i as f32 + 0.5) / count as f32;
        let angle = -PI * (0.85 - 0.7 * slot) + rng.random_range(-0.15..0.15);
        let length = rng.random_range(25.0..45.0);
        let bend = rng.random_range(-0.3..0.3);

        let start = trunk.point_at(rng.random_range(0.6..1.0));
        let dir = Vec2::from_angle(angle);
        let end = start + dir * length;
        let c0 = start + Vec2::from_angle(angle + bend) * (length / 3.0);
        let c1 = end - Vec2::from_angle(angle - bend) * (length / 3.0);
        branches.push(Branch::from_curve(Curve::new(start, c0, c1, end)));
    }

    GlyphShape::new(ch, branches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use branches_core::geometry::Outline;

    #[test]
    fn covers_the_alphabet() {
        let cat = catalogue().unwrap();
        assert_eq!(cat.len(), 26);
        assert_eq!(cat.chars(), ('a'..='z').collect::<Vec<_>>());
    }

    #[test]
    fn glyphs_are_stable_per_character() {
        let a = glyph('q').unwrap();
        let b = glyph('q').unwrap();
        assert_eq!(a.branches(), b.branches());
    }

    #[test]
    fn branches_reach_upward() {
        let cat = catalogue().unwrap();
        for ch in cat.chars() {
            let shape = cat.get(ch).unwrap();
            assert!((2..=4).contains(&shape.branches().len()));
            for b in &shape.branches()[1..] {
                assert!(b.last_point().y < b.first_point().y);
            }
            assert!(shape.branches().bounds().bottom() <= 1e-3);
        }
    }
}
