use std::path::Path;

use ab_glyph::{point, Font, FontArc, FontVec, GlyphId, PxScale, ScaleFont};
use egui::{vec2, FontDefinitions, FontFamily, Pos2, Vec2};
use font_kit::family_name::FamilyName;
use font_kit::handle::Handle;
use font_kit::properties::{Properties, Weight};
use font_kit::source::SystemSource;
use image::RgbaImage;

use crate::error::EditorError;
use crate::render::blend_pixel;

/// Line box height as a multiple of the font size.
pub const LINE_HEIGHT: f32 = 1.2;

/// CSS weights looked up on the system when no font file is configured.
const WEIGHT_STEPS: [u16; 9] = [100, 200, 300, 400, 500, 600, 700, 800, 900];

/// Requested weight must exceed the face's by this much before strokes are thickened.
const EMBOLDEN_THRESHOLD: u16 = 100;

#[derive(Clone)]
struct Face {
    weight: u16,
    font: FontArc,
}

impl Face {
    fn from_bytes(bytes: Vec<u8>, index: u32, weight: f32) -> Result<Self, EditorError> {
        let font = FontVec::try_from_vec_and_index(bytes, index)
            .map_err(|e| EditorError::Font(e.to_string()))?;
        Ok(Self {
            weight: weight.round().clamp(1.0, 1000.0) as u16,
            font: FontArc::new(font),
        })
    }

    fn from_font_kit(font: &font_kit::font::Font, index: u32) -> Result<Self, EditorError> {
        let data = font
            .copy_font_data()
            .ok_or_else(|| EditorError::Font(format!("{}: no font data", font.full_name())))?;
        Self::from_bytes(data.to_vec(), index, font.properties().weight.0)
    }
}

/// Font faces and glyph rasterization for text layers.
///
/// Holds at least one face. Faces are picked by closest weight; when the closest
/// face is lighter than requested, strokes are thickened by overdraw.
#[derive(Clone)]
pub struct FontBook {
    primary: Face,
    extra: Vec<Face>,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("weights", &self.weights())
            .finish()
    }
}

impl FontBook {
    fn from_faces(mut faces: Vec<Face>) -> Option<Self> {
        faces.sort_by_key(|face| face.weight);
        faces.dedup_by_key(|face| face.weight);
        // Regular (or the closest to it) is the primary face.
        let primary = faces
            .iter()
            .enumerate()
            .min_by_key(|(_, face)| face.weight.abs_diff(400))
            .map(|(i, _)| i)?;
        let primary = faces.remove(primary);
        Some(Self {
            primary,
            extra: faces,
        })
    }

    /// Single face read from a font file.
    pub fn from_path(path: &Path) -> Result<Self, EditorError> {
        let font = font_kit::font::Font::from_path(path, 0)
            .map_err(|e| EditorError::Font(format!("{}: {e}", path.display())))?;
        let face = Face::from_font_kit(&font, 0)?;
        log::info!("using font {} ({})", path.display(), font.full_name());
        Ok(Self {
            primary: face,
            extra: Vec::new(),
        })
    }

    /// Sans-serif faces from the system font source, one per distinct weight.
    pub fn system() -> Result<Self, EditorError> {
        let source = SystemSource::new();
        let mut faces = Vec::new();
        for step in WEIGHT_STEPS {
            let mut props = Properties::new();
            props.weight = Weight(f32::from(step));
            let handle = match source.select_best_match(&[FamilyName::SansSerif], &props) {
                Ok(handle) => handle,
                Err(e) => {
                    log::debug!("no system font for weight {step}: {e}");
                    continue;
                }
            };
            let index = match &handle {
                Handle::Path { font_index, .. } | Handle::Memory { font_index, .. } => *font_index,
            };
            let loaded = handle
                .load()
                .map_err(|e| EditorError::Font(e.to_string()))
                .and_then(|font| {
                    let face = Face::from_font_kit(&font, index)?;
                    Ok((font.full_name(), face))
                });
            match loaded {
                Ok((name, face)) => {
                    if faces.iter().all(|f: &Face| f.weight != face.weight) {
                        log::debug!("system font {name} for weight {}", face.weight);
                        faces.push(face);
                    }
                }
                Err(e) => log::warn!("skipping system font: {e}"),
            }
        }
        Self::from_faces(faces).ok_or_else(|| EditorError::Font("no system font found".into()))
    }

    /// The proportional font egui ships with.
    pub fn bundled() -> Result<Self, EditorError> {
        let defs = FontDefinitions::default();
        let data = defs
            .families
            .get(&FontFamily::Proportional)
            .and_then(|names| names.first())
            .and_then(|name| defs.font_data.get(name))
            .ok_or_else(|| EditorError::Font("no bundled font".into()))?;
        let face = Face::from_bytes(data.font.to_vec(), data.index, 400.0)?;
        Ok(Self {
            primary: face,
            extra: Vec::new(),
        })
    }

    /// Uses `path` when given, otherwise system fonts, otherwise the bundled font.
    pub fn load(path: Option<&Path>) -> Result<Self, EditorError> {
        if let Some(path) = path {
            return Self::from_path(path);
        }
        match Self::system() {
            Ok(book) => {
                log::info!("using system fonts, weights {:?}", book.weights());
                Ok(book)
            }
            Err(e) => {
                log::warn!("{e}; falling back to the bundled font");
                Self::bundled()
            }
        }
    }

    /// Weights of the available faces, lightest first.
    pub fn weights(&self) -> Vec<u16> {
        let mut weights: Vec<u16> = std::iter::once(&self.primary)
            .chain(&self.extra)
            .map(|face| face.weight)
            .collect();
        weights.sort_unstable();
        weights
    }

    fn face(&self, weight: u16) -> &Face {
        self.extra.iter().fold(&self.primary, |best, face| {
            if face.weight.abs_diff(weight) < best.weight.abs_diff(weight) {
                face
            } else {
                best
            }
        })
    }

    fn px_scale(font: &FontArc, size: f32) -> PxScale {
        match font.units_per_em() {
            Some(upem) if upem > 0.0 => PxScale::from(size * font.height_unscaled() / upem),
            _ => PxScale::from(size),
        }
    }

    fn line_width(font: &FontArc, line: &str, size: f32) -> f32 {
        let scaled = font.as_scaled(Self::px_scale(font, size));
        let mut width = 0.0;
        let mut last: Option<GlyphId> = None;
        for ch in line.chars() {
            let id = font.glyph_id(ch);
            if let Some(prev) = last {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            last = Some(id);
        }
        width
    }

    /// Bounding box size of `text` at `size` pixels, one line box per `\n`.
    pub fn measure(&self, text: &str, size: f32, weight: u16) -> Vec2 {
        let face = self.face(weight);
        let extra = Self::embolden(face, size, weight);
        let mut width: f32 = 0.0;
        let mut lines = 0;
        for line in text.split('\n') {
            width = width.max(Self::line_width(&face.font, line, size) + extra);
            lines += 1;
        }
        vec2(width, lines as f32 * size * LINE_HEIGHT)
    }

    fn embolden(face: &Face, size: f32, weight: u16) -> f32 {
        if weight > face.weight + EMBOLDEN_THRESHOLD {
            size * f32::from(weight - face.weight) / 4000.0
        } else {
            0.0
        }
    }

    /// Draws `text` with its top-left corner at `origin` (pixels of `target`).
    pub fn draw(
        &self,
        target: &mut RgbaImage,
        text: &str,
        origin: Pos2,
        size: f32,
        weight: u16,
        color: [u8; 4],
    ) {
        if size <= 0.0 || color[3] == 0 {
            return;
        }
        let face = self.face(weight);
        let font = &face.font;
        let px = Self::px_scale(font, size);
        let scaled = font.as_scaled(px);
        let ascent = scaled.ascent();
        let embolden = Self::embolden(face, size, weight);
        let (w, h) = (target.width() as i32, target.height() as i32);

        for (line_idx, line) in text.split('\n').enumerate() {
            let baseline = origin.y + line_idx as f32 * size * LINE_HEIGHT + ascent;
            let mut cursor = origin.x;
            let mut last: Option<GlyphId> = None;
            for ch in line.chars() {
                let id = font.glyph_id(ch);
                if let Some(prev) = last {
                    cursor += scaled.kern(prev, id);
                }
                last = Some(id);
                let advance = scaled.h_advance(id);
                let mut offset = 0.0;
                loop {
                    let glyph = id.with_scale_and_position(px, point(cursor + offset, baseline));
                    if let Some(outlined) = font.outline_glyph(glyph) {
                        let bounds = outlined.px_bounds();
                        outlined.draw(|gx, gy, coverage| {
                            let x = bounds.min.x as i32 + gx as i32;
                            let y = bounds.min.y as i32 + gy as i32;
                            if x >= 0 && x < w && y >= 0 && y < h {
                                blend_pixel(target, x as u32, y as u32, color, coverage);
                            }
                        });
                    }
                    offset += 0.5;
                    if offset > embolden {
                        break;
                    }
                }
                cursor += advance;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_scale_with_length_and_size() {
        let book = FontBook::bundled().unwrap();
        let short = book.measure("ab", 10.0, 400);
        let long = book.measure("abab", 10.0, 400);
        assert!(short.x > 0.0);
        assert!((long.x - 2.0 * short.x).abs() < 1.0);
        assert!((short.y - 12.0).abs() < 1e-4);

        let bigger = book.measure("ab", 20.0, 400);
        assert!((bigger.x - 2.0 * short.x).abs() < 0.5);
        let two_lines = book.measure("ab\nabab", 10.0, 400);
        assert!((two_lines.x - long.x).abs() < 1e-4);
        assert!((two_lines.y - 24.0).abs() < 1e-4);
    }

    #[test]
    fn drawing_covers_pixels_inside_the_measured_box() {
        let book = FontBook::bundled().unwrap();
        let mut img = RgbaImage::new(64, 32);
        book.draw(&mut img, "Hi", Pos2::new(2.0, 2.0), 20.0, 400, [255, 0, 0, 255]);
        let size = book.measure("Hi", 20.0, 400);
        let mut painted = 0;
        for (x, y, p) in img.enumerate_pixels() {
            if p.0[3] > 0 {
                painted += 1;
                assert!((x as f32) < 2.0 + size.x + 1.0 && (y as f32) < 2.0 + size.y + 1.0);
            }
        }
        assert!(painted > 20);
    }

    #[test]
    fn heavier_weight_thickens_a_lighter_face() {
        let book = FontBook::bundled().unwrap();
        let coverage = |weight| {
            let mut img = RgbaImage::new(80, 40);
            book.draw(&mut img, "Il", Pos2::new(2.0, 2.0), 28.0, weight, [0, 0, 0, 255]);
            img.pixels().map(|p| u32::from(p.0[3])).sum::<u32>()
        };
        assert!(coverage(900) > coverage(400));
    }

    #[test]
    fn closest_face_is_chosen_by_weight() {
        let bundled = FontBook::bundled().unwrap();
        let mut regular = bundled.primary.clone();
        regular.weight = 400;
        let mut bold = bundled.primary.clone();
        bold.weight = 700;
        let book = FontBook::from_faces(vec![bold, regular]).unwrap();
        assert_eq!(book.weights(), vec![400, 700]);
        assert_eq!(book.face(300).weight, 400);
        assert_eq!(book.face(600).weight, 700);
        assert_eq!(book.face(900).weight, 700);
    }

    #[test]
    fn missing_font_file_is_an_error() {
        assert!(FontBook::from_path(Path::new("/definitely/not/a/font.ttf")).is_err());
    }
}
