use egui::{pos2, Rect, Vec2};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::document::Document;
use crate::filters::apply_chain;
use crate::geometry::ViewTransform;
use crate::text::FontBook;
use crate::tools::layer_screen_rect;

const SELECTION_COLOR: [u8; 4] = [0, 120, 255, 255];
const CROP_STROKE: [u8; 4] = [255, 255, 255, 255];
const CROP_SHADE: [u8; 4] = [0, 0, 0, 128];
const GRID_COLOR: [u8; 4] = [255, 255, 255, 70];

/// Screen-space decorations drawn after the document, unaffected by filters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Overlays {
    pub crop: Option<Rect>,
    pub selection: Option<usize>,
    /// Grid spacing in screen pixels, when the grid is shown.
    pub grid: Option<f32>,
}

// ── Pixel Helpers ───────────────────────────────────────────────────────────

/// Source-over blend of `color` scaled by `coverage` onto one pixel.
pub fn blend_pixel(img: &mut RgbaImage, x: u32, y: u32, color: [u8; 4], coverage: f32) {
    let src_a = (color[3] as f32 / 255.0) * coverage.clamp(0.0, 1.0);
    if src_a <= 0.0 {
        return;
    }
    let dst = img.get_pixel_mut(x, y);
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        return;
    }
    for i in 0..3 {
        let s = color[i] as f32 / 255.0;
        let d = dst[i] as f32 / 255.0;
        let c = (s * src_a + d * dst_a * (1.0 - src_a)) / out_a;
        dst[i] = (c * 255.0).round() as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}

fn draw_line(
    img: &mut RgbaImage,
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
    thickness: f32,
    color: [u8; 4],
) {
    let dx = x1 - x0;
    let dy = y1 - y0;
    let len = (dx * dx + dy * dy).sqrt();
    let steps = len.ceil().max(1.0) as i32;
    let half_t = ((thickness - 1.0) / 2.0).max(0.0).round() as i32;
    let (w, h) = (img.width() as i32, img.height() as i32);

    let mut last = None;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let cx = (x0 + dx * t).floor() as i32;
        let cy = (y0 + dy * t).floor() as i32;
        if last == Some((cx, cy)) {
            continue;
        }
        last = Some((cx, cy));
        for oy in -half_t..=half_t {
            for ox in -half_t..=half_t {
                let px = cx + ox;
                let py = cy + oy;
                if px >= 0 && px < w && py >= 0 && py < h {
                    blend_pixel(img, px as u32, py as u32, color, 1.0);
                }
            }
        }
    }
}

fn stroke_rect(img: &mut RgbaImage, rect: Rect, thickness: f32, color: [u8; 4]) {
    let (l, t, r, b) = (rect.min.x, rect.min.y, rect.max.x, rect.max.y);
    draw_line(img, l, t, r, t, thickness, color);
    draw_line(img, r, t, r, b, thickness, color);
    draw_line(img, r, b, l, b, thickness, color);
    draw_line(img, l, b, l, t, thickness, color);
}

/// Shades everything outside `keep`.
fn shade_outside(img: &mut RgbaImage, keep: Rect, color: [u8; 4]) {
    let (w, h) = img.dimensions();
    for y in 0..h {
        for x in 0..w {
            if !keep.contains(pos2(x as f32 + 0.5, y as f32 + 0.5)) {
                blend_pixel(img, x, y, color, 1.0);
            }
        }
    }
}

fn sample_bilinear(img: &RgbaImage, x: f32, y: f32) -> Rgba<u8> {
    let (w, h) = (img.width() as i32, img.height() as i32);
    let x = x - 0.5;
    let y = y - 0.5;
    let (x0, y0) = (x.floor(), y.floor());
    let (fx, fy) = (x - x0, y - y0);
    let (x0, y0) = (x0 as i32, y0 as i32);
    let at = |xx: i32, yy: i32| {
        img.get_pixel(xx.clamp(0, w - 1) as u32, yy.clamp(0, h - 1) as u32).0
    };
    let (a, b, c, d) = (at(x0, y0), at(x0 + 1, y0), at(x0, y0 + 1), at(x0 + 1, y0 + 1));
    let mut out = [0u8; 4];
    for i in 0..4 {
        let top = a[i] as f32 + (b[i] as f32 - a[i] as f32) * fx;
        let bottom = c[i] as f32 + (d[i] as f32 - c[i] as f32) * fx;
        out[i] = (top + (bottom - top) * fy).round() as u8;
    }
    Rgba(out)
}

// ── Viewport Render ─────────────────────────────────────────────────────────

/// Full repaint of the editing surface at viewport resolution.
///
/// Order: clear, bitmap through the filter chain, visible layers bottom to top,
/// then overlays.
pub fn render_view(
    doc: &Document,
    viewport_size: Vec2,
    fonts: &FontBook,
    overlays: &Overlays,
) -> RgbaImage {
    let width = viewport_size.x.max(1.0).round() as u32;
    let height = viewport_size.y.max(1.0).round() as u32;
    let mut surface = RgbaImage::new(width, height);

    let Some(bitmap) = doc.bitmap() else {
        return surface;
    };
    let transform = ViewTransform::new(viewport_size, bitmap.size(), doc.viewport);
    let source = bitmap.pixels();
    let image_rect = transform.image_rect_on_screen(bitmap.size());

    let row_len = width as usize * 4;
    surface
        .par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            let sy = y as f32 + 0.5;
            if sy < image_rect.min.y || sy >= image_rect.max.y {
                return;
            }
            for x in 0..width as usize {
                let sx = x as f32 + 0.5;
                if sx < image_rect.min.x || sx >= image_rect.max.x {
                    continue;
                }
                let p = transform.screen_to_image(pos2(sx, sy));
                let px = sample_bilinear(source, p.x, p.y);
                row[x * 4..x * 4 + 4].copy_from_slice(&px.0);
            }
        });
    apply_chain(&mut surface, &doc.filters, 1.0);

    let scale = transform.effective_scale();
    for layer in doc.layers.iter().filter(|l| l.visible) {
        fonts.draw(
            &mut surface,
            &layer.text,
            transform.image_to_screen(layer.pos()),
            layer.font_size * scale,
            layer.weight,
            layer.color.to_rgba8(),
        );
    }

    if let Some(spacing) = overlays.grid {
        draw_grid(&mut surface, image_rect, spacing);
    }
    if let Some(index) = overlays.selection {
        if let Some(layer) = doc.layers.get(index) {
            let rect = layer_screen_rect(layer, &transform, fonts).expand(4.0);
            stroke_rect(&mut surface, rect, 1.5, SELECTION_COLOR);
        }
    }
    if let Some(crop) = overlays.crop {
        shade_outside(&mut surface, crop, CROP_SHADE);
        stroke_rect(&mut surface, crop, 1.0, CROP_STROKE);
    }
    surface
}

fn draw_grid(img: &mut RgbaImage, area: Rect, spacing: f32) {
    if spacing < 1.0 {
        return;
    }
    let mut x = area.min.x + spacing;
    while x < area.max.x {
        draw_line(img, x, area.min.y, x, area.max.y, 1.0, GRID_COLOR);
        x += spacing;
    }
    let mut y = area.min.y + spacing;
    while y < area.max.y {
        draw_line(img, area.min.x, y, area.max.x, y, 1.0, GRID_COLOR);
        y += spacing;
    }
}

// ── Native Resolution Render ────────────────────────────────────────────────

/// Composites the document at the bitmap's own resolution, ignoring zoom and pan.
pub fn render_native(doc: &Document, fonts: &FontBook) -> Option<RgbaImage> {
    let bitmap = doc.bitmap()?;
    let mut out = bitmap.pixels().clone();
    apply_chain(&mut out, &doc.filters, 1.0);
    for layer in doc.layers.iter().filter(|l| l.visible) {
        fonts.draw(
            &mut out,
            &layer.text,
            layer.pos(),
            layer.font_size,
            layer.weight,
            layer.color.to_rgba8(),
        );
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Bitmap;
    use crate::filters::FilterParam;
    use egui::vec2;

    fn doc_with(color: [u8; 4], w: u32, h: u32) -> Document {
        let mut doc = Document::default();
        doc.load_bitmap(Bitmap::new(RgbaImage::from_pixel(w, h, Rgba(color))));
        doc
    }

    #[test]
    fn empty_document_renders_clear_surface() {
        let fonts = FontBook::bundled().unwrap();
        let out = render_view(&Document::default(), vec2(10.0, 8.0), &fonts, &Overlays::default());
        assert_eq!(out.dimensions(), (10, 8));
        assert!(out.pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn bitmap_is_letterboxed_into_viewport() {
        // 200x100 image into a 100x100 viewport: scale 0.5, rows 25..75 covered.
        let doc = doc_with([255, 0, 0, 255], 200, 100);
        let fonts = FontBook::bundled().unwrap();
        let out = render_view(&doc, vec2(100.0, 100.0), &fonts, &Overlays::default());
        assert_eq!(out.get_pixel(50, 50).0, [255, 0, 0, 255]);
        assert_eq!(out.get_pixel(50, 10).0[3], 0);
        assert_eq!(out.get_pixel(50, 90).0[3], 0);
    }

    #[test]
    fn filters_apply_to_bitmap_but_not_overlays() {
        let mut doc = doc_with([200, 200, 200, 255], 100, 100);
        doc.set_filter(FilterParam::Brightness, 0.0);
        let overlays = Overlays {
            crop: Some(Rect::from_min_max(pos2(10.0, 10.0), pos2(60.0, 60.0))),
            ..Default::default()
        };
        let fonts = FontBook::bundled().unwrap();
        let out = render_view(&doc, vec2(100.0, 100.0), &fonts, &overlays);
        assert_eq!(out.get_pixel(30, 30).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(10, 30).0, [255, 255, 255, 255]);
    }

    #[test]
    fn native_render_keeps_bitmap_size() {
        let mut doc = doc_with([10, 20, 30, 255], 37, 21);
        doc.viewport.zoom = 4.0;
        let out = render_native(&doc, &FontBook::bundled().unwrap()).unwrap();
        assert_eq!(out.dimensions(), (37, 21));
        assert_eq!(out.get_pixel(0, 0).0, [10, 20, 30, 255]);
    }
}
