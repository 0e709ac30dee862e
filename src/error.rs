use thiserror::Error;

/// Failures reported by a [`crate::bitmap::BitmapCodec`].
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode image: {0}")]
    Encode(String),

    #[error("unsupported image format: {0}")]
    Unsupported(String),
}

impl From<image::ImageError> for CodecError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(e) => CodecError::Unsupported(e.to_string()),
            image::ImageError::Encoding(e) => CodecError::Encode(e.to_string()),
            other => CodecError::Decode(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("could not load image: {0}")]
    Load(#[source] CodecError),

    #[error("no image loaded")]
    NotLoaded,

    #[error("a transform is still being applied")]
    BakeInProgress,

    #[error("transform failed: {0}")]
    Bake(#[source] CodecError),

    #[error("export failed: {0}")]
    Export(#[source] CodecError),

    #[error("transform result no longer applies to this document")]
    StaleBake,

    #[error("history snapshot failed: {0}")]
    History(#[source] CodecError),

    #[error("font error: {0}")]
    Font(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
