use image::{imageops, RgbaImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

// ── Parameters ──────────────────────────────────────────────────────────────

/// One adjustable filter parameter. Declaration order is the order the chain applies them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterParam {
    Brightness,
    Contrast,
    Saturation,
    Hue,
    Sepia,
    Grayscale,
    Blur,
}

impl FilterParam {
    pub const ALL: [FilterParam; 7] = [
        FilterParam::Brightness,
        FilterParam::Contrast,
        FilterParam::Saturation,
        FilterParam::Hue,
        FilterParam::Sepia,
        FilterParam::Grayscale,
        FilterParam::Blur,
    ];

    pub fn neutral(self) -> f32 {
        match self {
            FilterParam::Brightness | FilterParam::Contrast | FilterParam::Saturation => 100.0,
            FilterParam::Hue
            | FilterParam::Sepia
            | FilterParam::Grayscale
            | FilterParam::Blur => 0.0,
        }
    }

    pub fn range(self) -> (f32, f32) {
        match self {
            FilterParam::Brightness | FilterParam::Contrast | FilterParam::Saturation => {
                (0.0, 200.0)
            }
            FilterParam::Hue => (-180.0, 180.0),
            FilterParam::Sepia | FilterParam::Grayscale => (0.0, 100.0),
            FilterParam::Blur => (0.0, 20.0),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FilterParam::Brightness => "Brightness",
            FilterParam::Contrast => "Contrast",
            FilterParam::Saturation => "Saturation",
            FilterParam::Hue => "Hue",
            FilterParam::Sepia => "Sepia",
            FilterParam::Grayscale => "Grayscale",
            FilterParam::Blur => "Blur",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            FilterParam::Hue => "°",
            FilterParam::Blur => "px",
            _ => "%",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Filters {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub hue: f32,
    pub sepia: f32,
    pub grayscale: f32,
    pub blur: f32,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            brightness: 100.0,
            contrast: 100.0,
            saturation: 100.0,
            hue: 0.0,
            sepia: 0.0,
            grayscale: 0.0,
            blur: 0.0,
        }
    }
}

impl Filters {
    pub fn get(&self, param: FilterParam) -> f32 {
        match param {
            FilterParam::Brightness => self.brightness,
            FilterParam::Contrast => self.contrast,
            FilterParam::Saturation => self.saturation,
            FilterParam::Hue => self.hue,
            FilterParam::Sepia => self.sepia,
            FilterParam::Grayscale => self.grayscale,
            FilterParam::Blur => self.blur,
        }
    }

    /// Sets a parameter, clamping into its valid range. NaN becomes the neutral value.
    pub fn set(&mut self, param: FilterParam, value: f32) {
        let (lo, hi) = param.range();
        let value = if value.is_nan() {
            param.neutral()
        } else {
            value.clamp(lo, hi)
        };
        let slot = match param {
            FilterParam::Brightness => &mut self.brightness,
            FilterParam::Contrast => &mut self.contrast,
            FilterParam::Saturation => &mut self.saturation,
            FilterParam::Hue => &mut self.hue,
            FilterParam::Sepia => &mut self.sepia,
            FilterParam::Grayscale => &mut self.grayscale,
            FilterParam::Blur => &mut self.blur,
        };
        *slot = value;
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_preset(&mut self, preset: Preset) {
        for &(param, value) in preset.values() {
            self.set(param, value);
        }
    }

    /// Clamps every field, for state that arrived from outside (JSON, history).
    pub fn sanitized(mut self) -> Self {
        for param in FilterParam::ALL {
            self.set(param, self.get(param));
        }
        self
    }
}

// ── Presets ─────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Bw,
    Warm,
    Cool,
    Vivid,
}

impl Preset {
    pub const ALL: [Preset; 4] = [Preset::Bw, Preset::Warm, Preset::Cool, Preset::Vivid];

    pub fn label(self) -> &'static str {
        match self {
            Preset::Bw => "B&W",
            Preset::Warm => "Warm",
            Preset::Cool => "Cool",
            Preset::Vivid => "Vivid",
        }
    }

    fn values(self) -> &'static [(FilterParam, f32)] {
        match self {
            Preset::Bw => &[
                (FilterParam::Grayscale, 100.0),
                (FilterParam::Sepia, 0.0),
                (FilterParam::Saturation, 0.0),
            ],
            Preset::Warm => &[
                (FilterParam::Hue, -10.0),
                (FilterParam::Sepia, 10.0),
                (FilterParam::Brightness, 105.0),
            ],
            Preset::Cool => &[
                (FilterParam::Hue, 12.0),
                (FilterParam::Sepia, 5.0),
                (FilterParam::Brightness, 102.0),
            ],
            Preset::Vivid => &[
                (FilterParam::Contrast, 115.0),
                (FilterParam::Saturation, 140.0),
                (FilterParam::Brightness, 102.0),
            ],
        }
    }
}

// ── Filter Chain ────────────────────────────────────────────────────────────

/// A color stage of the chain, in 0..1 channel units.
#[derive(Clone, Copy, Debug)]
enum Stage {
    Scale(f32),
    Contrast(f32),
    Matrix([[f32; 3]; 3]),
}

impl Stage {
    fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let out = match self {
            Stage::Scale(k) => [rgb[0] * k, rgb[1] * k, rgb[2] * k],
            Stage::Contrast(k) => [
                (rgb[0] - 0.5) * k + 0.5,
                (rgb[1] - 0.5) * k + 0.5,
                (rgb[2] - 0.5) * k + 0.5,
            ],
            Stage::Matrix(m) => [
                m[0][0] * rgb[0] + m[0][1] * rgb[1] + m[0][2] * rgb[2],
                m[1][0] * rgb[0] + m[1][1] * rgb[1] + m[1][2] * rgb[2],
                m[2][0] * rgb[0] + m[2][1] * rgb[1] + m[2][2] * rgb[2],
            ],
        };
        out.map(|c| c.clamp(0.0, 1.0))
    }
}

fn saturate_matrix(s: f32) -> [[f32; 3]; 3] {
    [
        [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
    ]
}

fn hue_rotate_matrix(degrees: f32) -> [[f32; 3]; 3] {
    let (sin, cos) = degrees.to_radians().sin_cos();
    [
        [
            0.213 + cos * 0.787 - sin * 0.213,
            0.715 - cos * 0.715 - sin * 0.715,
            0.072 - cos * 0.072 + sin * 0.928,
        ],
        [
            0.213 - cos * 0.213 + sin * 0.143,
            0.715 + cos * 0.285 + sin * 0.140,
            0.072 - cos * 0.072 - sin * 0.283,
        ],
        [
            0.213 - cos * 0.213 - sin * 0.787,
            0.715 - cos * 0.715 + sin * 0.715,
            0.072 + cos * 0.928 + sin * 0.072,
        ],
    ]
}

fn sepia_matrix(amount: f32) -> [[f32; 3]; 3] {
    let g = 1.0 - amount;
    [
        [0.393 + 0.607 * g, 0.769 - 0.769 * g, 0.189 - 0.189 * g],
        [0.349 - 0.349 * g, 0.686 + 0.314 * g, 0.168 - 0.168 * g],
        [0.272 - 0.272 * g, 0.534 - 0.534 * g, 0.131 + 0.869 * g],
    ]
}

fn grayscale_matrix(amount: f32) -> [[f32; 3]; 3] {
    let g = 1.0 - amount;
    [
        [0.2126 + 0.7874 * g, 0.7152 - 0.7152 * g, 0.0722 - 0.0722 * g],
        [0.2126 - 0.2126 * g, 0.7152 + 0.2848 * g, 0.0722 - 0.0722 * g],
        [0.2126 - 0.2126 * g, 0.7152 - 0.7152 * g, 0.0722 + 0.9278 * g],
    ]
}

fn color_stages(filters: &Filters) -> Vec<Stage> {
    let neutral = Filters::default();
    let mut stages = Vec::new();
    if filters.brightness != neutral.brightness {
        stages.push(Stage::Scale(filters.brightness / 100.0));
    }
    if filters.contrast != neutral.contrast {
        stages.push(Stage::Contrast(filters.contrast / 100.0));
    }
    if filters.saturation != neutral.saturation {
        stages.push(Stage::Matrix(saturate_matrix(filters.saturation / 100.0)));
    }
    if filters.hue != neutral.hue {
        stages.push(Stage::Matrix(hue_rotate_matrix(filters.hue)));
    }
    if filters.sepia != neutral.sepia {
        stages.push(Stage::Matrix(sepia_matrix(filters.sepia / 100.0)));
    }
    if filters.grayscale != neutral.grayscale {
        stages.push(Stage::Matrix(grayscale_matrix(filters.grayscale / 100.0)));
    }
    stages
}

/// Runs the filter chain over `img` in place: brightness, contrast, saturation,
/// hue rotation, sepia, grayscale, then blur. Alpha is left untouched by the color
/// stages. `blur_scale` converts the blur radius into pixels of `img`.
pub fn apply_chain(img: &mut RgbaImage, filters: &Filters, blur_scale: f32) {
    let stages = color_stages(filters);
    if !stages.is_empty() {
        img.par_chunks_mut(4).for_each(|px| {
            if px[3] == 0 {
                return;
            }
            let mut rgb = [
                px[0] as f32 / 255.0,
                px[1] as f32 / 255.0,
                px[2] as f32 / 255.0,
            ];
            for stage in &stages {
                rgb = stage.apply(rgb);
            }
            px[0] = (rgb[0] * 255.0).round() as u8;
            px[1] = (rgb[1] * 255.0).round() as u8;
            px[2] = (rgb[2] * 255.0).round() as u8;
        });
    }

    let sigma = filters.blur * blur_scale;
    if sigma > 0.0 {
        *img = imageops::blur(img, sigma);
    }
}
