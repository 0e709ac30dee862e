use std::sync::Arc;

use image::{imageops, RgbaImage};

use crate::crop::ImageRect;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rotation {
    /// +90°
    Clockwise,
    /// -90°
    CounterClockwise,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlipAxis {
    Horizontal,
    Vertical,
}

/// A destructive geometric edit that produces a new working bitmap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BakeOp {
    Rotate(Rotation),
    Flip(FlipAxis),
    Crop(ImageRect),
}

impl BakeOp {
    pub fn output_size(&self, width: u32, height: u32) -> (u32, u32) {
        match self {
            BakeOp::Rotate(_) => (height, width),
            BakeOp::Flip(_) => (width, height),
            BakeOp::Crop(rect) => {
                let x = rect.x.min(width.saturating_sub(1));
                let y = rect.y.min(height.saturating_sub(1));
                (
                    rect.width.clamp(1, width.saturating_sub(x).max(1)),
                    rect.height.clamp(1, height.saturating_sub(y).max(1)),
                )
            }
        }
    }

    /// Text layer coordinates do not survive a crop.
    pub fn clears_layers(&self) -> bool {
        matches!(self, BakeOp::Crop(_))
    }

    pub fn describe(&self) -> String {
        match self {
            BakeOp::Rotate(Rotation::Clockwise) => "rotate 90°".to_string(),
            BakeOp::Rotate(Rotation::CounterClockwise) => "rotate -90°".to_string(),
            BakeOp::Flip(FlipAxis::Horizontal) => "flip horizontal".to_string(),
            BakeOp::Flip(FlipAxis::Vertical) => "flip vertical".to_string(),
            BakeOp::Crop(r) => format!("crop {}x{} at {},{}", r.width, r.height, r.x, r.y),
        }
    }
}

/// Draws `source` through `op` into a new surface of the output size.
pub fn draw_offscreen(source: &RgbaImage, op: BakeOp) -> RgbaImage {
    match op {
        BakeOp::Rotate(Rotation::Clockwise) => imageops::rotate90(source),
        BakeOp::Rotate(Rotation::CounterClockwise) => imageops::rotate270(source),
        BakeOp::Flip(FlipAxis::Horizontal) => imageops::flip_horizontal(source),
        BakeOp::Flip(FlipAxis::Vertical) => imageops::flip_vertical(source),
        BakeOp::Crop(rect) => {
            let (w, h) = op.output_size(source.width(), source.height());
            let x = rect.x.min(source.width().saturating_sub(1));
            let y = rect.y.min(source.height().saturating_sub(1));
            imageops::crop_imm(source, x, y, w, h).to_image()
        }
    }
}

/// A bake whose result is encoded and waiting to be decoded.
#[derive(Clone, Debug)]
pub struct PendingBake {
    pub op: BakeOp,
    pub encoded: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
    /// Identifies the bake this result belongs to.
    pub ticket: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn marked(w: u32, h: u32) -> RgbaImage {
        let mut img = RgbaImage::new(w, h);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img
    }

    #[test]
    fn rotation_swaps_dimensions() {
        for rot in [Rotation::Clockwise, Rotation::CounterClockwise] {
            let out = draw_offscreen(&marked(30, 10), BakeOp::Rotate(rot));
            assert_eq!(out.dimensions(), (10, 30));
        }
    }

    #[test]
    fn clockwise_moves_top_left_to_top_right() {
        let out = draw_offscreen(&marked(4, 2), BakeOp::Rotate(Rotation::Clockwise));
        assert_eq!(out.get_pixel(1, 0).0, [255, 0, 0, 255]);
        let ccw = draw_offscreen(&marked(4, 2), BakeOp::Rotate(Rotation::CounterClockwise));
        assert_eq!(ccw.get_pixel(0, 3).0, [255, 0, 0, 255]);
    }

    #[test]
    fn flips_mirror_the_right_axis() {
        let h = draw_offscreen(&marked(5, 3), BakeOp::Flip(FlipAxis::Horizontal));
        assert_eq!(h.get_pixel(4, 0).0[0], 255);
        let v = draw_offscreen(&marked(5, 3), BakeOp::Flip(FlipAxis::Vertical));
        assert_eq!(v.get_pixel(0, 2).0[0], 255);
    }

    #[test]
    fn crop_is_clamped_to_source() {
        let op = BakeOp::Crop(ImageRect {
            x: 8,
            y: 8,
            width: 50,
            height: 50,
        });
        let out = draw_offscreen(&marked(10, 10), op);
        assert_eq!(out.dimensions(), (2, 2));
    }
}
