use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::document::Color4;
use crate::error::EditorError;

/// Properties given to a freshly placed text layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextDefaults {
    pub content: String,
    pub font_size: f32,
    pub weight: u16,
    pub color: Color4,
}

impl Default for TextDefaults {
    fn default() -> Self {
        Self {
            content: "Text".to_string(),
            font_size: 32.0,
            weight: 600,
            color: Color4::WHITE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Maximum number of undo steps kept.
    pub history_limit: usize,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub text_defaults: TextDefaults,
    /// Grid overlay spacing in screen pixels.
    pub grid_spacing: f32,
    pub export_basename: String,
    pub default_quality: u8,
    pub font_path: Option<PathBuf>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: 20,
            min_zoom: 0.1,
            max_zoom: 8.0,
            text_defaults: TextDefaults::default(),
            grid_spacing: 40.0,
            export_basename: "edit".to_string(),
            default_quality: 92,
            font_path: None,
        }
    }
}

impl EditorConfig {
    pub fn from_file(path: &Path) -> Result<Self, EditorError> {
        let data = std::fs::read_to_string(path)?;
        let config: EditorConfig = serde_json::from_str(&data)?;
        log::info!("loaded editor config from {}", path.display());
        Ok(config.sanitized())
    }

    /// Repairs values that would break the editor (inverted zoom bounds, zero history).
    pub fn sanitized(mut self) -> Self {
        self.history_limit = self.history_limit.max(1);
        if self.min_zoom.is_nan() || self.min_zoom <= 0.0 {
            self.min_zoom = 0.1;
        }
        if self.max_zoom < self.min_zoom {
            self.max_zoom = self.min_zoom;
        }
        self.grid_spacing = self.grid_spacing.max(4.0);
        self.default_quality = self.default_quality.min(100);
        self
    }
}
