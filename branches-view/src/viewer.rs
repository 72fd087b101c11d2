//! Interactive viewer that regrows a composite tree as the text changes.
//!
//! This module defines [`Viewer`], which owns the glyph catalogue, the
//! growth options and the current tree, and implements [`eframe::App`] to
//! edit the text and draw the tree through the core [`Canvas`] seam.

use std::time::Instant;

use branches_core::{
    Catalogue, ContentNode, Tree, build_tree,
    config::{CenterPolicy, GrowingOrder, TreeOptions, WritingMode},
    geometry::{Branch, Canvas, Outline, Rect, Shape, StrokeKind},
};
use eframe::App;
use glam::Vec2;

/// Main application state for the viewer.
///
/// The typical per-frame update is:
/// 1. Read the text box and option panel.
/// 2. If anything changed, rebuild the tree with [`Viewer::rebuild`].
/// 3. Draw the tree. In debug mode also draw the bounds of every child tree
///    and show the kerner's annotated rasters in a window.
///
/// ### Fields
/// - `catalogue` - Glyph shapes the text is grown from.
/// - `options` - Word growth, kerning and layout options.
/// - `text` - The text being grown.
/// - `tree` - Tree grown from `text`, anchored at the world origin.
/// - `error` - Message from the last failed rebuild, if any.
///
/// - `dirty` - Whether `text` or `options` changed since the last rebuild.
/// - `zoom` - Zoom factor for world-to-screen coordinate mapping.
/// - `pan` - Screen-space pan offset in pixels.
/// - `last_build_ms` - Wall time of the last rebuild, for display only.
/// - `overlay_textures` - Kerning overlays of the current tree, uploaded on
///   first display and dropped on rebuild.
pub struct Viewer {
    catalogue: Catalogue,
    options: TreeOptions,
    text: String,
    tree: Option<Tree>,
    error: Option<String>,

    dirty: bool,
    zoom: f32,
    pan: egui::Vec2,
    last_build_ms: f64,
    overlay_textures: Option<Vec<(egui::TextureHandle, egui::TextureHandle)>>,
}

impl Viewer {
    /// Creates a viewer over `catalogue` with default options and a short
    /// sample text, built on the first frame.
    pub fn new(catalogue: Catalogue) -> Self {
        Self {
            catalogue,
            options: TreeOptions::default(),
            text: String::from("grow a tree"),
            tree: None,
            error: None,
            dirty: true,
            zoom: 2.0,
            pan: egui::vec2(0.0, 150.0),
            last_build_ms: 0.0,
            overlay_textures: None,
        }
    }

    /// Grows a fresh tree from the current text and options.
    ///
    /// On success the previous tree is removed and replaced. On failure the
    /// previous tree stays on screen and the error is kept for display.
    fn rebuild(&mut self) {
        self.dirty = false;
        self.overlay_textures = None;
        let started = Instant::now();
        let content = ContentNode::parse(&self.text);

        match build_tree(&content, &self.catalogue, &self.options) {
            Ok(mut tree) => {
                tree.set_anchor(Vec2::ZERO);
                if let Some(old) = self.tree.replace(tree) {
                    old.remove();
                }
                self.error = None;
            }
            Err(err) => {
                log::warn!("could not grow {:?}: {err}", self.text);
                self.error = Some(err.to_string());
            }
        }
        self.last_build_ms = started.elapsed().as_secs_f64() * 1000.0;
    }

    /// Converts a world-space position to screen-space.
    ///
    /// World and screen both have y pointing down, so no flip is needed:
    /// world coordinates are scaled by `zoom`, offset by `pan`, and centered
    /// inside `rect`.
    fn world_to_screen(&self, p: Vec2, rect: egui::Rect) -> egui::Pos2 {
        to_screen(p, rect, self.zoom, self.pan)
    }

    /// Converts a screen-space position back to world-space.
    ///
    /// This is the inverse of [`Viewer::world_to_screen`] (up to floating
    /// point rounding).
    fn screen_to_world(&self, p: egui::Pos2, rect: egui::Rect) -> Vec2 {
        let center = rect.center();
        Vec2::new(
            (p.x - center.x - self.pan.x) / self.zoom,
            (p.y - center.y - self.pan.y) / self.zoom,
        )
    }

    /// Helper to draw a labeled `f32` [`egui::DragValue`].
    fn labeled_drag_f32(
        ui: &mut egui::Ui,
        label: &str,
        value: &mut f32,
        range: std::ops::RangeInclusive<f32>,
        speed: f64,
    ) {
        ui.horizontal(|ui| {
            ui.label(label);
            ui.add(egui::DragValue::new(value).range(range).speed(speed));
        });
    }

    /// Draws one selectable label per choice, storing the clicked one.
    fn choice<T: Copy + PartialEq>(ui: &mut egui::Ui, value: &mut T, choices: &[(T, &str)]) {
        ui.horizontal_wrapped(|ui| {
            for &(choice, label) in choices {
                if ui.selectable_label(*value == choice, label).clicked() {
                    *value = choice;
                }
            }
        });
    }

    /// Builds the top panel with the text box and zoom.
    fn ui_top_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let edit = egui::TextEdit::multiline(&mut self.text)
                    .desired_rows(2)
                    .hint_text("Type words; '.' or a new line starts a sentence");
                if ui.add(edit).changed() {
                    self.dirty = true;
                }

                if ui.button("Regrow").clicked() {
                    self.dirty = true;
                }

                if ui.button("Center").clicked() {
                    self.pan = egui::vec2(0.0, 150.0);
                }

                ui.separator();
                ui.add(egui::Slider::new(&mut self.zoom, 0.1..=10.0).text("Zoom"));
            });
        });
    }

    /// Builds the bottom status bar (glyph count, build time, last error).
    fn ui_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(format!("build = {:.1} ms", self.last_build_ms));
                ui.separator();
                ui.label(format!(
                    "glyphs = {}",
                    self.tree.as_ref().map_or(0, glyph_count)
                ));
                if let Some(err) = &self.error {
                    ui.separator();
                    ui.colored_label(egui::Color32::LIGHT_RED, err.as_str());
                }
            });
        });
    }

    /// Builds the right-hand panel for growth, kerning and layout options.
    fn ui_options_panel(&mut self, ctx: &egui::Context) {
        let before = self.options;

        egui::SidePanel::right("options_panel")
            .resizable(true)
            .default_width(220.0)
            .show(ctx, |ui| {
                ui.heading("Options");

                ui.separator();
                ui.label("Words");
                Self::choice(
                    ui,
                    &mut self.options.word.growing_order,
                    &[
                        (GrowingOrder::Natural, "Natural"),
                        (GrowingOrder::LeftRight, "Left → right"),
                        (GrowingOrder::RightLeft, "Right → left"),
                        (GrowingOrder::Random, "Random"),
                    ],
                );
                ui.checkbox(&mut self.options.word.start_at_trunk, "Start at trunk");
                Self::labeled_drag_f32(
                    ui,
                    "branch_bottom_distance:",
                    &mut self.options.word.branch_bottom_distance,
                    0.0..=200.0,
                    0.5,
                );

                ui.separator();
                ui.label("Kerning");
                Self::choice(
                    ui,
                    &mut self.options.kerner.writing_mode,
                    &[
                        (WritingMode::LeftToRight, "LTR"),
                        (WritingMode::RightToLeft, "RTL"),
                    ],
                );
                ui.horizontal(|ui| {
                    ui.label("resolution:");
                    ui.add(
                        egui::DragValue::new(&mut self.options.kerner.resolution)
                            .range(1..=72)
                            .speed(0.2),
                    );
                });
                Self::labeled_drag_f32(
                    ui,
                    "spacing:",
                    &mut self.options.kerner.spacing,
                    -50.0..=200.0,
                    0.5,
                );
                ui.checkbox(&mut self.options.kerner.debug, "Debug overlays");

                ui.separator();
                ui.label("Layout");
                Self::choice(
                    ui,
                    &mut self.options.center_policy,
                    &[
                        (CenterPolicy::Lookahead, "Lookahead"),
                        (CenterPolicy::Threshold, "Threshold"),
                    ],
                );
                Self::labeled_drag_f32(
                    ui,
                    "trunk_margin:",
                    &mut self.options.trunk_margin,
                    0.0..=200.0,
                    0.5,
                );

                ui.separator();
                if ui.button("Reset options to default").clicked() {
                    self.options = TreeOptions::default();
                }
            });

        if self.options != before {
            self.dirty = true;
        }
    }

    /// Shows the annotated `(trailing, leading)` rasters of every kerning
    /// step, one pair per row. Only in debug mode.
    fn ui_overlay_window(&mut self, ctx: &egui::Context) {
        if !self.options.kerner.debug {
            return;
        }
        let Some(tree) = &self.tree else {
            return;
        };
        let textures = self.overlay_textures.get_or_insert_with(|| {
            overlay_images(tree)
                .into_iter()
                .enumerate()
                .map(|(i, (trailing, leading))| {
                    let load = |side: &str, image: egui::ColorImage| {
                        ctx.load_texture(format!("overlay_{i}_{side}"), image, egui::TextureOptions::NEAREST)
                    };
                    (load("trailing", trailing), load("leading", leading))
                })
                .collect()
        });

        egui::Window::new("Kerning overlays")
            .default_width(320.0)
            .show(ctx, |ui| {
                ui.label(format!("{} measurements", textures.len()));
                egui::ScrollArea::vertical().show(ui, |ui| {
                    for (trailing, leading) in textures.iter() {
                        ui.horizontal(|ui| {
                            ui.add(egui::Image::from_texture(trailing));
                            ui.add(egui::Image::from_texture(leading));
                        });
                        ui.separator();
                    }
                });
            });
    }

    /// Builds the central panel where the tree is drawn, with pan and zoom.
    fn ui_central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let response = ui.allocate_response(ui.available_size(), egui::Sense::drag());
            let rect = response.rect;
            let painter = ui.painter_at(rect);

            // Pan with drag.
            if response.dragged() {
                self.pan += response.drag_delta();
            }

            // Zoom around the mouse cursor.
            let scroll = ui.ctx().input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                let pointer_screen = response.hover_pos().unwrap_or(rect.center());
                let world_before = self.screen_to_world(pointer_screen, rect);

                let factor = (1.0 + scroll * 0.001).clamp(0.5, 2.0);
                self.zoom = (self.zoom * factor).clamp(0.1, 10.0);

                let screen_after = self.world_to_screen(world_before, rect);
                self.pan += pointer_screen - screen_after;
            }

            let Some(tree) = &self.tree else {
                return;
            };

            if self.options.kerner.debug {
                let stroke = egui::Stroke::new(1.0, egui::Color32::from_rgb(120, 120, 40));
                for bounds in child_bounds(tree) {
                    let corners = [
                        bounds.min,
                        Vec2::new(bounds.max.x, bounds.min.y),
                        bounds.max,
                        Vec2::new(bounds.min.x, bounds.max.y),
                    ];
                    let points = corners
                        .iter()
                        .map(|&c| self.world_to_screen(c, rect))
                        .collect();
                    painter.add(egui::Shape::closed_line(points, stroke));
                }
            }

            let mut canvas = PainterCanvas {
                painter: &painter,
                rect,
                zoom: self.zoom,
                pan: self.pan,
            };
            tree.draw(&mut canvas);
        });
    }
}

impl App for Viewer {
    /// eframe callback that builds all UI panels for each frame, rebuilding
    /// the tree first when the text or options changed.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ui_top_panel(ctx);
        self.ui_options_panel(ctx);
        if self.dirty {
            self.rebuild();
        }
        self.ui_status_bar(ctx);
        self.ui_central_panel(ctx);
        self.ui_overlay_window(ctx);
    }
}

fn to_screen(p: Vec2, rect: egui::Rect, zoom: f32, pan: egui::Vec2) -> egui::Pos2 {
    let center = rect.center();
    egui::pos2(center.x + p.x * zoom + pan.x, center.y + p.y * zoom + pan.y)
}

/// Strokes branches into an egui painter as polylines.
struct PainterCanvas<'a> {
    painter: &'a egui::Painter,
    rect: egui::Rect,
    zoom: f32,
    pan: egui::Vec2,
}

impl Canvas for PainterCanvas<'_> {
    fn stroke(&mut self, branch: &Branch, kind: StrokeKind) {
        let (width, color) = match kind {
            StrokeKind::Glyph => (1.5, egui::Color32::LIGHT_GREEN),
            StrokeKind::Trunk => (2.5, egui::Color32::from_rgb(170, 130, 90)),
        };
        let points = branch
            .flatten()
            .into_iter()
            .map(|p| to_screen(p, self.rect, self.zoom, self.pan))
            .collect();
        self.painter.add(egui::Shape::line(
            points,
            egui::Stroke::new(width * self.zoom.sqrt(), color),
        ));
    }
}

/// Number of glyph instances in `tree`, across all nested words.
fn glyph_count(tree: &Tree) -> usize {
    match tree {
        Tree::Word(word) => word.len(),
        Tree::Composite(composite) => composite.trees().iter().map(glyph_count).sum(),
    }
}

/// Kerning overlays of every composite in `tree`, innermost first, as egui
/// images. Pairs with an empty raster are left out.
fn overlay_images(tree: &Tree) -> Vec<(egui::ColorImage, egui::ColorImage)> {
    let Tree::Composite(composite) = tree else {
        return Vec::new();
    };
    let mut out: Vec<_> = composite.trees().iter().flat_map(overlay_images).collect();
    for (trailing, leading) in composite.debug_overlays() {
        if [trailing, leading].iter().any(|img| img.width() == 0 || img.height() == 0) {
            continue;
        }
        let to_color = |img: &image::RgbaImage| {
            egui::ColorImage::from_rgba_unmultiplied(
                [img.width() as usize, img.height() as usize],
                img.as_raw(),
            )
        };
        out.push((to_color(trailing), to_color(leading)));
    }
    out
}

/// Bounds of every tree nested below `tree`, outermost first.
fn child_bounds(tree: &Tree) -> Vec<Rect> {
    let mut out = Vec::new();
    let mut stack = vec![tree];
    while let Some(tree) = stack.pop() {
        if let Tree::Composite(composite) = tree {
            for child in composite.trees() {
                out.push(child.bounds());
                stack.push(child);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo;
    use branches_core::config::WordOptions;

    fn test_rect() -> egui::Rect {
        egui::Rect::from_min_size(egui::Pos2::new(0.0, 0.0), egui::vec2(800.0, 600.0))
    }

    fn viewer() -> Viewer {
        let mut viewer = Viewer::new(demo::catalogue().unwrap());
        viewer.options.word = WordOptions {
            seed: Some(3),
            ..WordOptions::default()
        };
        viewer
    }

    #[test]
    fn world_to_screen_and_back_is_roundtrip() {
        let mut viewer = viewer();
        viewer.zoom = 2.0;
        viewer.pan = egui::vec2(15.0, -7.0);
        let rect = test_rect();

        for p in [
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, -5.0),
            Vec2::new(-3.5, 8.25),
        ] {
            let back = viewer.screen_to_world(viewer.world_to_screen(p, rect), rect);
            assert!(
                (back - p).length() < 1e-5,
                "roundtrip mismatch: p={p:?}, back={back:?}"
            );
        }
    }

    #[test]
    fn world_y_down_is_screen_y_down() {
        let viewer = viewer();
        let rect = test_rect();
        let above = viewer.world_to_screen(Vec2::new(0.0, -10.0), rect);
        let below = viewer.world_to_screen(Vec2::new(0.0, 10.0), rect);
        assert!(above.y < below.y);
    }

    #[test]
    fn rebuild_anchors_tree_at_origin() {
        let mut viewer = viewer();
        viewer.text = String::from("one tree. two trees");
        viewer.rebuild();

        assert!(viewer.error.is_none());
        assert!(!viewer.dirty);
        let tree = viewer.tree.as_ref().unwrap();
        assert!(tree.anchor().length() < 1e-3);
        assert!(glyph_count(tree) > 0);
        assert!(glyph_count(tree) <= "onetreetwotrees".len());
        assert_eq!(child_bounds(tree).len(), 2 + 2);
    }

    #[test]
    fn failed_rebuild_keeps_previous_tree() {
        let mut viewer = viewer();
        viewer.text = String::from("tree");
        viewer.rebuild();
        let before = glyph_count(viewer.tree.as_ref().unwrap());

        viewer.text = String::from("Tree!");
        viewer.rebuild();

        assert!(viewer.error.as_deref().unwrap().contains("'T'"));
        assert_eq!(glyph_count(viewer.tree.as_ref().unwrap()), before);
    }

    #[test]
    fn debug_mode_exposes_kerning_overlays() {
        let mut viewer = viewer();
        viewer.text = String::from("one tree. two trees");
        viewer.rebuild();
        assert!(overlay_images(viewer.tree.as_ref().unwrap()).is_empty());

        viewer.options.kerner.debug = true;
        viewer.rebuild();
        let images = overlay_images(viewer.tree.as_ref().unwrap());
        // At least one kerning step per composite: two sentences and the
        // tree holding them.
        assert!(images.len() >= 3);
        for (trailing, leading) in &images {
            assert!(trailing.width() > 0 && trailing.height() > 0);
            assert!(leading.width() > 0 && leading.height() > 0);
        }
        assert!(viewer.overlay_textures.is_none());
    }

    #[test]
    fn empty_text_grows_an_empty_tree() {
        let mut viewer = viewer();
        viewer.text = String::from("  \n ");
        viewer.rebuild();
        let tree = viewer.tree.as_ref().unwrap();
        assert!(tree.is_empty());
        assert_eq!(glyph_count(tree), 0);
    }
}
