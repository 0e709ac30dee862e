use egui::{vec2, Pos2, Rect};
use serde::{Deserialize, Serialize};

use crate::geometry::ViewTransform;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    Free,
    Ratio(u32, u32),
}

impl AspectRatio {
    pub const CHOICES: [AspectRatio; 5] = [
        AspectRatio::Free,
        AspectRatio::Ratio(1, 1),
        AspectRatio::Ratio(4, 3),
        AspectRatio::Ratio(16, 9),
        AspectRatio::Ratio(3, 2),
    ];

    pub fn label(&self) -> String {
        match self {
            AspectRatio::Free => "free".to_string(),
            AspectRatio::Ratio(w, h) => format!("{w}:{h}"),
        }
    }

    fn ratio(&self) -> Option<f32> {
        match self {
            AspectRatio::Free => None,
            AspectRatio::Ratio(w, h) => Some(*w as f32 / *h as f32),
        }
    }
}

/// Image-pixel rectangle handed to the crop bake.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

// ── Gesture Math ────────────────────────────────────────────────────────────

/// Rectangle from an anchor and a raw drag delta: aspect-locked when a ratio is set,
/// then normalized to non-negative width and height.
pub fn selection_rect(anchor: Pos2, dw: f32, dh: f32, aspect: AspectRatio) -> Rect {
    let (mut w, mut h) = (dw, dh);
    if let Some(ratio) = aspect.ratio() {
        let sign = |v: f32| if v < 0.0 { -1.0 } else { 1.0 };
        let h_abs = if h == 0.0 { 1.0 } else { h.abs() };
        if w.abs() / h_abs > ratio {
            h = sign(h) * w.abs() / ratio;
        } else {
            w = sign(w) * h.abs() * ratio;
        }
    }
    let mut min = anchor;
    if w < 0.0 {
        min.x += w;
        w = -w;
    }
    if h < 0.0 {
        min.y += h;
        h = -h;
    }
    Rect::from_min_size(min, vec2(w, h))
}

/// Converts a screen selection to image pixels, clamped to the image and at least 1×1.
pub fn to_image_rect(
    selection: Rect,
    transform: &ViewTransform,
    image_w: u32,
    image_h: u32,
) -> ImageRect {
    let image_w = image_w.max(1);
    let image_h = image_h.max(1);
    let a = transform.screen_to_image(selection.min);
    let b = transform.screen_to_image(selection.max);
    let clamp_x = |v: f32| v.round().clamp(0.0, image_w as f32) as u32;
    let clamp_y = |v: f32| v.round().clamp(0.0, image_h as f32) as u32;
    let x = clamp_x(a.x.min(b.x)).min(image_w - 1);
    let y = clamp_y(a.y.min(b.y)).min(image_h - 1);
    let x2 = clamp_x(a.x.max(b.x));
    let y2 = clamp_y(a.y.max(b.y));
    ImageRect {
        x,
        y,
        width: x2.saturating_sub(x).max(1),
        height: y2.saturating_sub(y).max(1),
    }
}

// ── Crop Tool ───────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum CropState {
    #[default]
    Idle,
    Armed { selection: Option<Rect> },
    Dragging { anchor: Pos2, selection: Rect },
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CropTool {
    pub state: CropState,
    pub aspect: AspectRatio,
}

impl CropTool {
    pub fn is_active(&self) -> bool {
        !matches!(self.state, CropState::Idle)
    }

    /// Enters crop mode, discarding any earlier selection.
    pub fn arm(&mut self) {
        self.state = CropState::Armed { selection: None };
    }

    pub fn cancel(&mut self) {
        self.state = CropState::Idle;
    }

    pub fn toggle(&mut self) {
        if self.is_active() {
            self.cancel();
        } else {
            self.arm();
        }
    }

    pub fn pointer_down(&mut self, pos: Pos2) -> bool {
        if !self.is_active() {
            return false;
        }
        self.state = CropState::Dragging {
            anchor: pos,
            selection: Rect::from_min_size(pos, vec2(0.0, 0.0)),
        };
        true
    }

    pub fn pointer_move(&mut self, pos: Pos2) -> bool {
        let CropState::Dragging { anchor, .. } = self.state else {
            return false;
        };
        let selection = selection_rect(anchor, pos.x - anchor.x, pos.y - anchor.y, self.aspect);
        self.state = CropState::Dragging { anchor, selection };
        true
    }

    pub fn pointer_up(&mut self, pos: Pos2) -> bool {
        if !self.pointer_move(pos) {
            return false;
        }
        if let CropState::Dragging { selection, .. } = self.state {
            self.state = CropState::Armed {
                selection: Some(selection),
            };
        }
        true
    }

    /// The current rectangle, finalized or still being dragged.
    pub fn selection(&self) -> Option<Rect> {
        match self.state {
            CropState::Idle => None,
            CropState::Armed { selection } => selection,
            CropState::Dragging { selection, .. } => Some(selection),
        }
    }

    /// Takes the selection for applying and leaves crop mode.
    pub fn take_selection(&mut self) -> Option<Rect> {
        let selection = self.selection().filter(|r| r.width() > 0.0 || r.height() > 0.0);
        if selection.is_some() {
            self.state = CropState::Idle;
        }
        selection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Viewport;
    use egui::pos2;

    fn assert_ratio(rect: Rect, ratio: f32) {
        assert!(rect.width() >= 0.0 && rect.height() >= 0.0, "{rect:?}");
        assert!((rect.width() / rect.height() - ratio).abs() < 1e-4, "{rect:?}");
    }

    #[test]
    fn aspect_lock_holds_in_every_quadrant() {
        let anchor = pos2(100.0, 100.0);
        for (dw, dh) in [(80.0, 10.0), (-80.0, 10.0), (30.0, -90.0), (-5.0, -70.0), (50.0, 0.0)] {
            assert_ratio(selection_rect(anchor, dw, dh, AspectRatio::Ratio(16, 9)), 16.0 / 9.0);
            assert_ratio(selection_rect(anchor, dw, dh, AspectRatio::Ratio(1, 1)), 1.0);
        }
    }

    #[test]
    fn negative_drag_is_normalized() {
        let r = selection_rect(pos2(50.0, 50.0), -20.0, -30.0, AspectRatio::Free);
        assert_eq!(r, Rect::from_min_max(pos2(30.0, 20.0), pos2(50.0, 50.0)));
    }

    #[test]
    fn drag_is_measured_from_the_anchor() {
        let mut tool = CropTool::default();
        tool.arm();
        tool.pointer_down(pos2(50.0, 50.0));
        tool.pointer_move(pos2(20.0, 20.0));
        tool.pointer_move(pos2(10.0, 10.0));
        tool.pointer_up(pos2(10.0, 10.0));
        assert_eq!(tool.selection(), Some(Rect::from_min_max(pos2(10.0, 10.0), pos2(50.0, 50.0))));
    }

    #[test]
    fn idle_tool_ignores_pointer() {
        let mut tool = CropTool::default();
        assert!(!tool.pointer_down(pos2(1.0, 1.0)));
        assert_eq!(tool.selection(), None);
    }

    #[test]
    fn cancel_discards_selection() {
        let mut tool = CropTool::default();
        tool.arm();
        tool.pointer_down(pos2(0.0, 0.0));
        tool.pointer_up(pos2(10.0, 10.0));
        tool.toggle();
        assert_eq!(tool.state, CropState::Idle);
        assert_eq!(tool.take_selection(), None);
    }

    #[test]
    fn image_rect_is_clamped_and_non_degenerate() {
        let t = ViewTransform::new(vec2(100.0, 100.0), vec2(100.0, 100.0), Viewport::default());
        let wide = Rect::from_two_pos(pos2(-50.0, 90.0), pos2(500.0, 300.0));
        let r = to_image_rect(wide, &t, 100, 100);
        assert_eq!(
            r,
            ImageRect {
                x: 0,
                y: 90,
                width: 100,
                height: 10,
            }
        );
        let point = Rect::from_two_pos(pos2(100.0, 100.0), pos2(100.0, 100.0));
        let dot = to_image_rect(point, &t, 100, 100);
        assert_eq!((dot.x, dot.y, dot.width, dot.height), (99, 99, 1, 1));
    }

    #[test]
    fn aspect_labels() {
        assert_eq!(AspectRatio::Ratio(16, 9).label(), "16:9");
        assert_eq!(AspectRatio::Free.label(), "free");
    }
}
