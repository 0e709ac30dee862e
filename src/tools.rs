use egui::{Pos2, Rect, Vec2};

use crate::document::{Document, TextLayer, TextProps};
use crate::geometry::ViewTransform;
use crate::text::FontBook;

// ── Tool / Interaction State ────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Tool {
    #[default]
    Move,
    Text,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PointerButton {
    #[default]
    Primary,
    Middle,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum DragState {
    #[default]
    None,
    Panning { last: Pos2 },
    MovingLayer { index: usize, last: Pos2, moved: bool },
}

// ── Hit Testing ─────────────────────────────────────────────────────────────

/// Screen-space box of a layer: measured text width by 1.2 × font size per line.
pub fn layer_screen_rect(layer: &TextLayer, transform: &ViewTransform, fonts: &FontBook) -> Rect {
    let size = fonts.measure(&layer.text, layer.font_size, layer.weight)
        * transform.effective_scale();
    Rect::from_min_size(transform.image_to_screen(layer.pos()), size)
}

/// Topmost visible layer whose box contains `screen_pos`.
pub fn hit_test(
    doc: &Document,
    transform: &ViewTransform,
    fonts: &FontBook,
    screen_pos: Pos2,
) -> Option<usize> {
    doc.layers
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, layer)| layer.visible)
        .find(|(_, layer)| layer_screen_rect(layer, transform, fonts).contains(screen_pos))
        .map(|(i, _)| i)
}

/// Inserts a layer at the image point under `screen_pos`; the new layer becomes active.
pub fn place_text(
    doc: &mut Document,
    transform: &ViewTransform,
    screen_pos: Pos2,
    props: TextProps,
) -> usize {
    let pos = transform.screen_to_image(screen_pos);
    doc.add_text_layer(pos, props)
}

/// Moves a layer by a screen-space pointer delta.
pub fn drag_layer(doc: &mut Document, transform: &ViewTransform, index: usize, delta_screen: Vec2) {
    let delta = transform.screen_delta_to_image(delta_screen);
    if let Some(layer) = doc.layers.get_mut(index) {
        layer.x += delta.x;
        layer.y += delta.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Bitmap;
    use crate::document::Color4;
    use crate::geometry::Viewport;
    use egui::{pos2, vec2};
    use image::RgbaImage;

    fn props(text: &str) -> TextProps {
        TextProps {
            text: text.into(),
            font_size: 10.0,
            weight: 400,
            color: Color4::WHITE,
        }
    }

    fn setup() -> (Document, ViewTransform) {
        let mut doc = Document::default();
        doc.load_bitmap(Bitmap::new(RgbaImage::new(200, 200)));
        // 400x400 viewport: fit scale 2, zoom 1.5 -> 3 screen px per image px.
        let view = Viewport {
            zoom: 1.5,
            pan_x: 10.0,
            pan_y: -20.0,
        };
        let t = ViewTransform::new(vec2(400.0, 400.0), vec2(200.0, 200.0), view);
        (doc, t)
    }

    #[test]
    fn placement_stores_image_coordinates() {
        let (mut doc, t) = setup();
        let screen = t.image_to_screen(pos2(50.0, 60.0));
        let idx = place_text(&mut doc, &t, screen, props("a"));
        let layer = &doc.layers[idx];
        assert!((layer.x - 50.0).abs() < 1e-3 && (layer.y - 60.0).abs() < 1e-3);
        assert_eq!(doc.active_layer(), Some(idx));
    }

    #[test]
    fn topmost_layer_wins_hit_test() {
        let (mut doc, t) = setup();
        let fonts = FontBook::bundled().unwrap();
        doc.add_text_layer(pos2(10.0, 10.0), props("bottom layer"));
        doc.add_text_layer(pos2(12.0, 12.0), props("top"));
        let p = t.image_to_screen(pos2(14.0, 14.0));
        assert_eq!(hit_test(&doc, &t, &fonts, p), Some(1));
        doc.layers[1].visible = false;
        assert_eq!(hit_test(&doc, &t, &fonts, p), Some(0));
        let far = t.image_to_screen(pos2(150.0, 150.0));
        assert_eq!(hit_test(&doc, &t, &fonts, far), None);
    }

    #[test]
    fn hit_box_height_is_one_point_two_font_sizes() {
        let (mut doc, t) = setup();
        let fonts = FontBook::bundled().unwrap();
        doc.add_text_layer(pos2(10.0, 10.0), props("x"));
        // 10px font -> 12 image px tall -> 36 screen px.
        let inside = t.image_to_screen(pos2(10.5, 21.5));
        let below = t.image_to_screen(pos2(10.5, 22.5));
        assert_eq!(hit_test(&doc, &t, &fonts, inside), Some(0));
        assert_eq!(hit_test(&doc, &t, &fonts, below), None);
    }

    #[test]
    fn drag_converts_screen_delta() {
        let (mut doc, t) = setup();
        doc.add_text_layer(pos2(10.0, 10.0), props("x"));
        drag_layer(&mut doc, &t, 0, vec2(30.0, -15.0));
        assert!((doc.layers[0].x - 20.0).abs() < 1e-4);
        assert!((doc.layers[0].y - 5.0).abs() < 1e-4);
    }
}
