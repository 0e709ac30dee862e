//! Shared fixtures for the editing scenario tests.
#![allow(dead_code)]

use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use photo_edit::{
    Bitmap, BitmapCodec, CodecError, EditorConfig, EditorSession, FontBook, ImageCodec,
    OutputFormat,
};

/// Codec whose decode can be switched to fail.
#[derive(Clone, Default)]
pub struct FlakyCodec {
    pub fail_decode: Rc<Cell<bool>>,
}

impl BitmapCodec for FlakyCodec {
    fn encode(
        &self,
        pixels: &RgbaImage,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Vec<u8>, CodecError> {
        ImageCodec.encode(pixels, format, quality)
    }

    fn decode(&self, bytes: Arc<[u8]>) -> impl Future<Output = Result<Bitmap, CodecError>> {
        let fail = self.fail_decode.get();
        async move {
            if fail {
                Err(CodecError::Decode("injected failure".into()))
            } else {
                ImageCodec.decode(bytes).await
            }
        }
    }
}

/// Image with a distinct top-left pixel so orientation changes are visible.
pub fn test_image(width: u32, height: u32) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(width, height, Rgba([40, 80, 120, 255]));
    img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
    img
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    ImageCodec
        .encode(&test_image(width, height), OutputFormat::Png, 100)
        .unwrap()
}

/// The font egui bundles, so text draws the same on every machine.
pub fn fonts() -> FontBook {
    FontBook::bundled().unwrap()
}

/// Session with an image loaded and the viewport matching the image size.
pub fn loaded_session(width: u32, height: u32) -> EditorSession {
    let mut session = EditorSession::with_codec(EditorConfig::default(), ImageCodec, fonts());
    session.set_viewport_size(egui::vec2(width as f32, height as f32));
    pollster::block_on(session.load_bytes(png_bytes(width, height))).unwrap();
    session
}

pub fn flaky_session(width: u32, height: u32) -> (EditorSession<FlakyCodec>, Rc<Cell<bool>>) {
    let codec = FlakyCodec::default();
    let switch = codec.fail_decode.clone();
    let mut session = EditorSession::with_codec(EditorConfig::default(), codec, fonts());
    session.set_viewport_size(egui::vec2(width as f32, height as f32));
    session
        .load_bitmap(Bitmap::new(test_image(width, height)))
        .unwrap();
    (session, switch)
}

pub fn dimensions<C: BitmapCodec>(session: &EditorSession<C>) -> (u32, u32) {
    let bitmap = session.document().bitmap().unwrap();
    (bitmap.width(), bitmap.height())
}
