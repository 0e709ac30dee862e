use crate::bitmap::{BitmapCodec, OutputFormat};
use crate::document::Document;
use crate::error::EditorError;
use crate::render::render_native;
use crate::text::FontBook;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportOptions {
    pub format: OutputFormat,
    /// 0–100, only used by lossy formats.
    pub quality: u8,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Png,
            quality: 92,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ExportedImage {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub format: OutputFormat,
}

/// Renders the document at native resolution and encodes it. Reads the document only.
pub fn export_document<C: BitmapCodec>(
    doc: &Document,
    fonts: &FontBook,
    codec: &C,
    options: ExportOptions,
    basename: &str,
) -> Result<ExportedImage, EditorError> {
    let image = render_native(doc, fonts).ok_or(EditorError::NotLoaded)?;
    let bytes = codec
        .encode(&image, options.format, options.quality.min(100))
        .map_err(EditorError::Export)?;
    log::info!(
        "exported {}x{} {} ({} bytes)",
        image.width(),
        image.height(),
        options.format.mime(),
        bytes.len()
    );
    Ok(ExportedImage {
        bytes,
        filename: format!("{basename}.{}", options.format.extension()),
        format: options.format,
    })
}
