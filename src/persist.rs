use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bitmap::OutputFormat;
use crate::document::TextLayer;
use crate::error::EditorError;
use crate::filters::Filters;
use crate::geometry::Viewport;

/// The JSON-serializable part of a document. The bitmap travels separately.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub filters: Filters,
    #[serde(default)]
    pub layers: Vec<TextLayer>,
    #[serde(default, rename = "transform")]
    pub viewport: Viewport,
}

/// What a save backend receives.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveRecord {
    pub title: String,
    pub state: SessionState,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub quality: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Save/load collaborator. Transport and storage are up to the implementation.
pub trait DocumentStore {
    fn save(&mut self, record: &SaveRecord) -> Result<String, EditorError>;
    fn load(&self, id: &str) -> Result<SaveRecord, EditorError>;
}

// ── Sidecar Files ───────────────────────────────────────────────────────────

/// Stores the record as `<image>.<ext>.edit.json` next to the image it belongs to.
#[derive(Clone, Debug)]
pub struct SidecarStore {
    path: PathBuf,
}

pub fn sidecar_path(image_path: &Path) -> PathBuf {
    image_path.with_extension(format!(
        "{}.edit.json",
        image_path
            .extension()
            .unwrap_or_default()
            .to_str()
            .unwrap_or("")
    ))
}

impl SidecarStore {
    pub fn for_image(image_path: &Path) -> Self {
        Self {
            path: sidecar_path(image_path),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

impl DocumentStore for SidecarStore {
    fn save(&mut self, record: &SaveRecord) -> Result<String, EditorError> {
        let data = serde_json::to_string_pretty(record)?;
        std::fs::write(&self.path, data)?;
        log::info!("saved edit state to {}", self.path.display());
        Ok(self.path.display().to_string())
    }

    fn load(&self, id: &str) -> Result<SaveRecord, EditorError> {
        let path = if id.is_empty() { self.path.clone() } else { PathBuf::from(id) };
        let data = std::fs::read_to_string(&path)?;
        let record = serde_json::from_str(&data)?;
        log::info!("loaded edit state from {}", path.display());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Color4;

    fn record() -> SaveRecord {
        let mut state = SessionState::default();
        state.filters.brightness = 120.0;
        state.layers.push(TextLayer {
            x: 10.0,
            y: 20.0,
            text: "Hello".into(),
            font_size: 32.0,
            weight: 600,
            color: Color4::WHITE,
            visible: false,
            name: "Text 1".into(),
        });
        SaveRecord {
            title: "Untitled".into(),
            state,
            width: 800,
            height: 600,
            format: OutputFormat::Jpeg,
            quality: 92,
            id: None,
        }
    }

    #[test]
    fn sidecar_path_keeps_original_extension() {
        assert_eq!(
            sidecar_path(Path::new("/tmp/photo.jpg")),
            PathBuf::from("/tmp/photo.jpg.edit.json")
        );
    }

    #[test]
    fn record_json_uses_mime_and_transform_keys() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["format"], "image/jpeg");
        assert_eq!(json["state"]["transform"]["zoom"], 1.0);
        assert_eq!(json["state"]["layers"][0]["visible"], false);
    }

    #[test]
    fn sidecar_store_round_trips() {
        let dir = std::env::temp_dir().join(format!("photo-edit-persist-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut store = SidecarStore::for_image(&dir.join("a.png"));
        let id = store.save(&record()).unwrap();
        assert_eq!(store.load(&id).unwrap(), record());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let state: SessionState = serde_json::from_str(r#"{ "layers": [] }"#).unwrap();
        assert_eq!(state, SessionState::default());
    }
}
