use egui::{pos2, vec2, Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};

// ── Viewport State ──────────────────────────────────────────────────────────

/// User zoom and pan, applied on top of the automatic fit-to-viewport scale.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub zoom: f32,
    pub pan_x: f32,
    pub pan_y: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

impl Viewport {
    pub fn pan(&self) -> Vec2 {
        vec2(self.pan_x, self.pan_y)
    }

    pub fn zoom_percent(&self) -> i32 {
        (self.zoom * 100.0).round() as i32
    }
}

// ── Fit Transform ───────────────────────────────────────────────────────────

/// Scale and origin that fit an image into the viewport, preserving aspect ratio, centered.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fit {
    pub scale: f32,
    pub origin: Pos2,
}

pub fn fit_scale(viewport_size: Vec2, image_size: Vec2) -> Fit {
    let iw = image_size.x.max(1.0);
    let ih = image_size.y.max(1.0);
    let scale = (viewport_size.x / iw).min(viewport_size.y / ih);
    let origin = pos2(
        (viewport_size.x - iw * scale) / 2.0,
        (viewport_size.y - ih * scale) / 2.0,
    );
    Fit { scale, origin }
}

// ── View Transform ──────────────────────────────────────────────────────────

/// Complete mapping between screen space and image space for one draw.
///
/// Built fresh from the viewport size, image size and [`Viewport`] whenever it is
/// needed; it never caches anything across state changes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub fit: Fit,
    pub view: Viewport,
}

impl ViewTransform {
    pub fn new(viewport_size: Vec2, image_size: Vec2, view: Viewport) -> Self {
        Self {
            fit: fit_scale(viewport_size, image_size),
            view,
        }
    }

    /// Screen pixels per image pixel.
    pub fn effective_scale(&self) -> f32 {
        self.view.zoom * self.fit.scale
    }

    /// Convert screen-space coords to image-space
    pub fn screen_to_image(&self, screen: Pos2) -> Pos2 {
        let rel = screen - self.fit.origin - self.view.pan();
        pos2(
            rel.x / self.view.zoom / self.fit.scale,
            rel.y / self.view.zoom / self.fit.scale,
        )
    }

    /// Convert image-space coords to screen-space
    pub fn image_to_screen(&self, image: Pos2) -> Pos2 {
        self.fit.origin + self.view.pan() + image.to_vec2() * self.effective_scale()
    }

    /// A pointer movement in screen pixels expressed in image pixels. Translation cancels.
    pub fn screen_delta_to_image(&self, delta: Vec2) -> Vec2 {
        delta / self.effective_scale()
    }

    pub fn image_rect_on_screen(&self, image_size: Vec2) -> Rect {
        Rect::from_min_max(
            self.image_to_screen(Pos2::ZERO),
            self.image_to_screen(image_size.to_pos2()),
        )
    }
}

/// Zoom to `new_zoom` keeping the image point under `anchor` fixed on screen.
pub fn zoom_at(view: Viewport, fit: Fit, new_zoom: f32, anchor: Pos2) -> Viewport {
    let world = (anchor - fit.origin - view.pan()) / view.zoom;
    let pan = anchor - fit.origin - world * new_zoom;
    Viewport {
        zoom: new_zoom,
        pan_x: pan.x,
        pan_y: pan.y,
    }
}
