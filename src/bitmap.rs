use std::fmt;
use std::future::Future;
use std::io::Cursor;
use std::sync::{Arc, OnceLock};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::CodecError;

// ── Bitmap Handle ───────────────────────────────────────────────────────────

struct BitmapInner {
    pixels: RgbaImage,
    /// Bytes that decode back to exactly `pixels`; set by the decoder or on first use.
    encoded: OnceLock<Arc<[u8]>>,
}

/// Decoded raster image. Immutable and cheap to clone; editing replaces it wholesale.
#[derive(Clone)]
pub struct Bitmap {
    inner: Arc<BitmapInner>,
}

impl Bitmap {
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            inner: Arc::new(BitmapInner {
                pixels,
                encoded: OnceLock::new(),
            }),
        }
    }

    /// Wraps pixels that were decoded from `encoded`, so snapshots can reuse the bytes.
    pub fn with_source(pixels: RgbaImage, encoded: Arc<[u8]>) -> Self {
        let bitmap = Self::new(pixels);
        let _ = bitmap.inner.encoded.set(encoded);
        bitmap
    }

    pub fn width(&self) -> u32 {
        self.inner.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.inner.pixels.height()
    }

    pub fn size(&self) -> egui::Vec2 {
        egui::vec2(self.width() as f32, self.height() as f32)
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.inner.pixels
    }

    /// Encoded bytes for a history snapshot, encoding losslessly on first request.
    pub fn encoded<C: BitmapCodec>(&self, codec: &C) -> Result<Arc<[u8]>, CodecError> {
        if let Some(bytes) = self.inner.encoded.get() {
            return Ok(bytes.clone());
        }
        let bytes: Arc<[u8]> = codec.encode(&self.inner.pixels, OutputFormat::Png, 100)?.into();
        let _ = self.inner.encoded.set(bytes.clone());
        Ok(bytes)
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

// ── Output Formats ──────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Lossless.
    #[serde(rename = "image/png")]
    Png,
    /// Lossy, honours the quality setting.
    #[serde(rename = "image/jpeg")]
    Jpeg,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn is_lossy(&self) -> bool {
        matches!(self, OutputFormat::Jpeg)
    }
}

// ── Codec Capability ────────────────────────────────────────────────────────

/// Encode/decode capability supplied by the host.
///
/// Decoding is asynchronous: every bitmap produced by a transform goes through an
/// encode and a decode before it can replace the working image.
pub trait BitmapCodec {
    fn encode(
        &self,
        pixels: &RgbaImage,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Vec<u8>, CodecError>;

    fn decode(&self, bytes: Arc<[u8]>) -> impl Future<Output = Result<Bitmap, CodecError>>;
}

/// Codec backed by the `image` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageCodec;

impl ImageCodec {
    fn decode_now(bytes: Arc<[u8]>) -> Result<Bitmap, CodecError> {
        let format = image::guess_format(&bytes)
            .map_err(|e| CodecError::Unsupported(e.to_string()))?;
        let img = image::load_from_memory_with_format(&bytes, format)?;
        Ok(Bitmap::with_source(img.to_rgba8(), bytes))
    }
}

impl BitmapCodec for ImageCodec {
    fn encode(
        &self,
        pixels: &RgbaImage,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Vec<u8>, CodecError> {
        let mut out = Cursor::new(Vec::new());
        match format {
            OutputFormat::Png => {
                pixels.write_to(&mut out, ImageFormat::Png)?;
            }
            OutputFormat::Jpeg => {
                // JPEG has no alpha channel.
                let rgb = DynamicImage::ImageRgba8(pixels.clone()).to_rgb8();
                let mut encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
                encoder.encode_image(&rgb)?;
            }
        }
        Ok(out.into_inner())
    }

    fn decode(&self, bytes: Arc<[u8]>) -> impl Future<Output = Result<Bitmap, CodecError>> {
        async move { Self::decode_now(bytes) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn png_round_trip_keeps_pixels_and_source() {
        let mut img = RgbaImage::new(3, 2);
        img.put_pixel(2, 1, Rgba([10, 20, 30, 255]));
        let bytes: Arc<[u8]> = ImageCodec.encode(&img, OutputFormat::Png, 100).unwrap().into();
        let bitmap = pollster::block_on(ImageCodec.decode(bytes.clone())).unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (3, 2));
        assert_eq!(bitmap.pixels().get_pixel(2, 1), &Rgba([10, 20, 30, 255]));
        assert!(Arc::ptr_eq(&bitmap.encoded(&ImageCodec).unwrap(), &bytes));
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let result = pollster::block_on(ImageCodec.decode(Arc::from(&b"not an image"[..])));
        assert!(result.is_err());
    }

    #[test]
    fn jpeg_quality_changes_size() {
        let img = RgbaImage::from_fn(64, 64, |x, y| Rgba([(x * 4) as u8, (y * 4) as u8, 90, 255]));
        let low = ImageCodec.encode(&img, OutputFormat::Jpeg, 10).unwrap();
        let high = ImageCodec.encode(&img, OutputFormat::Jpeg, 95).unwrap();
        assert!(low.len() < high.len());
    }
}
