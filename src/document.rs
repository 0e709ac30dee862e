use egui::Pos2;
use serde::{Deserialize, Serialize};

use crate::bitmap::Bitmap;
use crate::filters::{FilterParam, Filters};
use crate::geometry::Viewport;

// ── Data Model ──────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color4 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color4 {
    pub const WHITE: Color4 = Color4 {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    pub fn to_rgba8(&self) -> [u8; 4] {
        [
            (self.r.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.g.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.b.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.a.clamp(0.0, 1.0) * 255.0).round() as u8,
        ]
    }

    pub fn from_rgb(rgb: [f32; 3]) -> Self {
        Self {
            r: rgb[0],
            g: rgb[1],
            b: rgb[2],
            a: 1.0,
        }
    }

    pub fn rgb(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// Parses `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !matches!(hex.len(), 6 | 8) || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        let a = if hex.len() == 8 { channel(6)? } else { 255 };
        Some(Self {
            r: channel(0)? as f32 / 255.0,
            g: channel(2)? as f32 / 255.0,
            b: channel(4)? as f32 / 255.0,
            a: a as f32 / 255.0,
        })
    }

    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        if a == 255 {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}

/// Text overlay. Position is the top-left anchor in image pixels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextLayer {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub font_size: f32,
    pub weight: u16,
    pub color: Color4,
    #[serde(default = "visible_default")]
    pub visible: bool,
    pub name: String,
}

fn visible_default() -> bool {
    true
}

impl TextLayer {
    pub fn pos(&self) -> Pos2 {
        egui::pos2(self.x, self.y)
    }
}

/// Properties for a new layer; position comes from the placement gesture.
#[derive(Clone, Debug, PartialEq)]
pub struct TextProps {
    pub text: String,
    pub font_size: f32,
    pub weight: u16,
    pub color: Color4,
}

impl From<&crate::config::TextDefaults> for TextProps {
    fn from(d: &crate::config::TextDefaults) -> Self {
        Self {
            text: d.content.clone(),
            font_size: d.font_size,
            weight: d.weight,
            color: d.color,
        }
    }
}

// ── Document ────────────────────────────────────────────────────────────────

/// Working bitmap plus everything drawn on top of it.
#[derive(Clone, Debug, Default)]
pub struct Document {
    bitmap: Option<Bitmap>,
    pub filters: Filters,
    pub layers: Vec<TextLayer>,
    pub viewport: Viewport,
    active_layer: Option<usize>,
}

impl Document {
    pub fn bitmap(&self) -> Option<&Bitmap> {
        self.bitmap.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.bitmap.is_some()
    }

    /// Starts a new document: neutral filters, no layers, identity viewport.
    pub fn load_bitmap(&mut self, bitmap: Bitmap) {
        self.bitmap = Some(bitmap);
        self.filters = Filters::default();
        self.layers.clear();
        self.active_layer = None;
        self.viewport = Viewport::default();
    }

    /// Swaps in a transformed bitmap and re-fits the view. Layers are untouched.
    pub fn replace_bitmap(&mut self, bitmap: Bitmap) {
        self.bitmap = Some(bitmap);
        self.viewport = Viewport::default();
    }

    pub fn set_filter(&mut self, param: FilterParam, value: f32) {
        self.filters.set(param, value);
    }

    /// Appends a layer on top of the stack and makes it active.
    pub fn add_text_layer(&mut self, pos: Pos2, props: TextProps) -> usize {
        let index = self.layers.len();
        self.layers.push(TextLayer {
            x: pos.x,
            y: pos.y,
            text: props.text,
            font_size: props.font_size.max(1.0),
            weight: props.weight,
            color: props.color,
            visible: true,
            name: format!("Text {}", index + 1),
        });
        self.active_layer = Some(index);
        index
    }

    /// Swaps the layers at `index` and `new_index`; the active selection follows the
    /// layer that was at `index`. Out-of-range indices are ignored.
    pub fn move_layer(&mut self, index: usize, new_index: usize) -> bool {
        if index >= self.layers.len() || new_index >= self.layers.len() || index == new_index {
            return false;
        }
        self.layers.swap(index, new_index);
        self.active_layer = match self.active_layer {
            Some(a) if a == index => Some(new_index),
            Some(a) if a == new_index => Some(index),
            other => other,
        };
        true
    }

    /// Moves the active layer `delta` steps towards the top (+) or bottom (-).
    pub fn move_active_layer(&mut self, delta: isize) -> bool {
        let Some(active) = self.active_layer else {
            return false;
        };
        let Some(target) = active.checked_add_signed(delta) else {
            return false;
        };
        self.move_layer(active, target)
    }

    pub fn delete_layer(&mut self, index: usize) -> Option<TextLayer> {
        if index >= self.layers.len() {
            return None;
        }
        let removed = self.layers.remove(index);
        self.active_layer = match self.active_layer {
            _ if self.layers.is_empty() => None,
            Some(a) if a > index => Some(a - 1),
            Some(a) if a >= self.layers.len() => Some(self.layers.len() - 1),
            other => other,
        };
        Some(removed)
    }

    pub fn clear_layers(&mut self) {
        self.layers.clear();
        self.active_layer = None;
    }

    pub fn active_layer(&self) -> Option<usize> {
        self.active_layer
    }

    pub fn active_layer_mut(&mut self) -> Option<&mut TextLayer> {
        self.active_layer.and_then(|i| self.layers.get_mut(i))
    }

    pub fn set_active_layer(&mut self, index: Option<usize>) {
        self.active_layer = index.filter(|&i| i < self.layers.len());
    }

    pub fn set_viewport(&mut self, zoom: f32, pan_x: f32, pan_y: f32, zoom_bounds: (f32, f32)) {
        self.viewport = Viewport {
            zoom: zoom.clamp(zoom_bounds.0, zoom_bounds.1),
            pan_x,
            pan_y,
        };
    }
}
