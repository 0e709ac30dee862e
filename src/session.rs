use std::sync::Arc;

use egui::{pos2, vec2, Pos2, Vec2};
use image::RgbaImage;

use crate::bake::{draw_offscreen, BakeOp, FlipAxis, PendingBake, Rotation};
use crate::bitmap::{Bitmap, BitmapCodec, ImageCodec, OutputFormat};
use crate::config::EditorConfig;
use crate::crop::{to_image_rect, AspectRatio, CropTool};
use crate::document::{Color4, Document, TextProps};
use crate::error::{CodecError, EditorError};
use crate::export::{export_document, ExportOptions, ExportedImage};
use crate::filters::{FilterParam, Filters, Preset};
use crate::geometry::{self, ViewTransform, Viewport};
use crate::history::{History, HistoryEntry};
use crate::persist::{SaveRecord, SessionState};
use crate::render::{render_view, Overlays};
use crate::text::FontBook;
use crate::tools::{drag_layer, hit_test, place_text, DragState, PointerButton, Tool};

const WHEEL_ZOOM_IN: f32 = 1.1;
const WHEEL_ZOOM_OUT: f32 = 0.9;

/// A single property change on a text layer.
#[derive(Clone, Debug, PartialEq)]
pub enum LayerEdit {
    Text(String),
    FontSize(f32),
    Weight(u16),
    Color(Color4),
    Visible(bool),
    Rename(String),
}

/// One open image and everything the user does to it.
///
/// Owns the document, its history and the interaction state of the tools. Every
/// operation that finishes a user edit commits a history entry; continuous changes
/// (slider drags, layer drags) are committed once they end.
pub struct EditorSession<C: BitmapCodec = ImageCodec> {
    config: EditorConfig,
    codec: C,
    fonts: FontBook,
    doc: Document,
    original: Option<Bitmap>,
    history: History,
    crop: CropTool,
    tool: Tool,
    drag: DragState,
    text_defaults: TextProps,
    viewport_size: Vec2,
    show_grid: bool,
    pending_bake: Option<u64>,
    bake_ticket: u64,
    needs_redraw: bool,
}

impl EditorSession<ImageCodec> {
    /// Session with the `image`-backed codec and fonts resolved from the config.
    pub fn new(config: EditorConfig) -> Result<Self, EditorError> {
        let fonts = FontBook::load(config.font_path.as_deref())?;
        Ok(Self::with_codec(config, ImageCodec, fonts))
    }
}

impl<C: BitmapCodec> EditorSession<C> {
    pub fn with_codec(config: EditorConfig, codec: C, fonts: FontBook) -> Self {
        let config = config.sanitized();
        Self {
            history: History::new(config.history_limit),
            text_defaults: TextProps::from(&config.text_defaults),
            config,
            codec,
            fonts,
            doc: Document::default(),
            original: None,
            crop: CropTool::default(),
            tool: Tool::default(),
            drag: DragState::default(),
            viewport_size: vec2(800.0, 600.0),
            show_grid: false,
            pending_bake: None,
            bake_ticket: 0,
            needs_redraw: true,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    pub fn crop_tool(&self) -> &CropTool {
        &self.crop
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn is_loaded(&self) -> bool {
        self.doc.is_loaded()
    }

    pub fn is_baking(&self) -> bool {
        self.pending_bake.is_some()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo() || self.has_uncommitted_changes()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo() && !self.has_uncommitted_changes()
    }

    /// Whether filters, layers or pixels changed since the last commit.
    pub fn has_uncommitted_changes(&self) -> bool {
        self.snapshot()
            .is_ok_and(|current| self.history.is_dirty(&current))
    }

    pub fn viewport_size(&self) -> Vec2 {
        self.viewport_size
    }

    pub fn show_grid(&self) -> bool {
        self.show_grid
    }

    pub fn zoom_percent(&self) -> i32 {
        self.doc.viewport.zoom_percent()
    }

    pub fn text_defaults(&self) -> &TextProps {
        &self.text_defaults
    }

    pub fn text_defaults_mut(&mut self) -> &mut TextProps {
        &mut self.text_defaults
    }

    /// Screen/image mapping for the current frame, if an image is loaded.
    pub fn transform(&self) -> Option<ViewTransform> {
        let bitmap = self.doc.bitmap()?;
        Some(ViewTransform::new(self.viewport_size, bitmap.size(), self.doc.viewport))
    }

    fn zoom_bounds(&self) -> (f32, f32) {
        (self.config.min_zoom, self.config.max_zoom)
    }

    fn ensure_loaded(&self) -> Result<(), EditorError> {
        if self.doc.is_loaded() {
            Ok(())
        } else {
            Err(EditorError::NotLoaded)
        }
    }

    fn ensure_idle(&self) -> Result<(), EditorError> {
        if self.pending_bake.is_some() {
            Err(EditorError::BakeInProgress)
        } else {
            Ok(())
        }
    }

    fn touch(&mut self) {
        self.needs_redraw = true;
    }

    // ── Loading ─────────────────────────────────────────────────────────────

    /// Decodes `bytes` and starts a fresh document. On failure nothing changes.
    pub async fn load_bytes(&mut self, bytes: impl Into<Arc<[u8]>>) -> Result<(), EditorError> {
        self.ensure_idle()?;
        let bitmap = self
            .codec
            .decode(bytes.into())
            .await
            .map_err(EditorError::Load)?;
        self.load_bitmap(bitmap)
    }

    pub fn load_bitmap(&mut self, bitmap: Bitmap) -> Result<(), EditorError> {
        self.ensure_idle()?;
        bitmap.encoded(&self.codec).map_err(EditorError::Load)?;
        log::info!("loaded {}x{} image", bitmap.width(), bitmap.height());
        self.original = Some(bitmap.clone());
        self.doc.load_bitmap(bitmap);
        self.crop.cancel();
        self.drag = DragState::None;
        self.tool = Tool::Move;
        let entry = self.snapshot()?;
        self.history.reset(entry);
        self.touch();
        Ok(())
    }

    /// Back to the image as it was loaded: neutral filters, no layers, fitted view.
    pub fn reset(&mut self) -> Result<(), EditorError> {
        self.ensure_idle()?;
        let original = self.original.clone().ok_or(EditorError::NotLoaded)?;
        self.doc.load_bitmap(original);
        self.crop.cancel();
        self.drag = DragState::None;
        self.touch();
        self.commit()?;
        Ok(())
    }

    // ── History ─────────────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        SessionState {
            filters: self.doc.filters,
            layers: self.doc.layers.clone(),
            viewport: self.doc.viewport,
        }
    }

    fn snapshot(&self) -> Result<HistoryEntry, EditorError> {
        let bitmap = self.doc.bitmap().ok_or(EditorError::NotLoaded)?;
        Ok(HistoryEntry {
            bitmap: bitmap.encoded(&self.codec).map_err(EditorError::History)?,
            width: bitmap.width(),
            height: bitmap.height(),
            state: self.state(),
        })
    }

    /// Records the current document as an undo step. Returns whether a step was added.
    ///
    /// `Ok(false)` is expected when nothing changed since the last commit: an identical
    /// state adds no step (it still clears redo), so repeated commits of the same state
    /// do not fill the history.
    pub fn commit(&mut self) -> Result<bool, EditorError> {
        if !self.doc.is_loaded() {
            return Ok(false);
        }
        let entry = self.snapshot()?;
        let added = self.history.commit(entry);
        if added {
            log::debug!("history: {} undo steps", self.history.undo_len());
        }
        Ok(added)
    }

    /// Steps back one entry. Uncommitted changes are committed first, so the
    /// first undo from an edited document returns to the last committed state.
    pub async fn undo(&mut self) -> Result<bool, EditorError> {
        self.ensure_idle()?;
        if !self.doc.is_loaded() {
            return Ok(false);
        }
        let current = self.snapshot()?;
        let Some(target) = self.history.undo_target(&current).cloned() else {
            return Ok(false);
        };
        let bitmap = self.restore_bitmap(&target).await?;
        self.history.undo(current);
        self.apply_entry(target.state, bitmap);
        log::debug!("undo ({} left)", self.history.undo_len());
        Ok(true)
    }

    /// Steps forward one entry. Refused while the document has uncommitted changes.
    pub async fn redo(&mut self) -> Result<bool, EditorError> {
        self.ensure_idle()?;
        if !self.doc.is_loaded() {
            return Ok(false);
        }
        let current = self.snapshot()?;
        let Some(target) = self.history.redo_target(&current).cloned() else {
            return Ok(false);
        };
        let bitmap = self.restore_bitmap(&target).await?;
        self.history.redo(current);
        self.apply_entry(target.state, bitmap);
        log::debug!("redo ({} left)", self.history.redo_len());
        Ok(true)
    }

    /// The bitmap for `entry`, reusing the working one when the pixels are the same.
    async fn restore_bitmap(&self, entry: &HistoryEntry) -> Result<Bitmap, EditorError> {
        if let Some(bitmap) = self.doc.bitmap() {
            let current = bitmap.encoded(&self.codec).map_err(EditorError::History)?;
            if current == entry.bitmap {
                return Ok(bitmap.clone());
            }
        }
        self.codec
            .decode(entry.bitmap.clone())
            .await
            .map_err(EditorError::History)
    }

    fn apply_entry(&mut self, state: SessionState, bitmap: Bitmap) {
        let active = self.doc.active_layer();
        self.doc.replace_bitmap(bitmap);
        self.doc.filters = state.filters.sanitized();
        self.doc.layers = state.layers;
        self.doc.viewport = state.viewport;
        self.doc.set_active_layer(active);
        self.crop.cancel();
        self.drag = DragState::None;
        self.touch();
    }

    // ── Filters ─────────────────────────────────────────────────────────────

    /// Live slider update; commit when the gesture ends.
    pub fn set_filter(&mut self, param: FilterParam, value: f32) {
        if !self.doc.is_loaded() {
            return;
        }
        self.doc.set_filter(param, value);
        self.touch();
    }

    pub fn apply_preset(&mut self, preset: Preset) -> Result<(), EditorError> {
        self.ensure_loaded()?;
        self.doc.filters.apply_preset(preset);
        self.touch();
        self.commit()?;
        Ok(())
    }

    pub fn reset_filters(&mut self) -> Result<(), EditorError> {
        self.ensure_loaded()?;
        self.doc.filters = Filters::default();
        self.touch();
        self.commit()?;
        Ok(())
    }

    // ── Transform Baking ────────────────────────────────────────────────────

    /// Draws the transformed bitmap off-screen and encodes it. The document is not
    /// touched until [`Self::finish_bake`] receives the decoded result.
    pub fn begin_bake(&mut self, op: BakeOp) -> Result<PendingBake, EditorError> {
        self.ensure_idle()?;
        let bitmap = self.doc.bitmap().cloned().ok_or(EditorError::NotLoaded)?;
        self.commit()?;
        let out = draw_offscreen(bitmap.pixels(), op);
        let encoded = self
            .codec
            .encode(&out, OutputFormat::Png, 100)
            .map_err(EditorError::Bake)?;
        self.bake_ticket += 1;
        self.pending_bake = Some(self.bake_ticket);
        log::debug!("{}: {}x{} encoded", op.describe(), out.width(), out.height());
        Ok(PendingBake {
            op,
            encoded: encoded.into(),
            width: out.width(),
            height: out.height(),
            ticket: self.bake_ticket,
        })
    }

    /// Installs the decoded result of `pending`, or reports the failure with the
    /// document left as it was.
    pub fn finish_bake(
        &mut self,
        pending: PendingBake,
        decoded: Result<Bitmap, CodecError>,
    ) -> Result<(), EditorError> {
        if self.pending_bake != Some(pending.ticket) {
            log::warn!("{}: dropping stale result", pending.op.describe());
            return Err(EditorError::StaleBake);
        }
        self.pending_bake = None;
        let bitmap = decoded
            .and_then(|b| {
                if (b.width(), b.height()) == (pending.width, pending.height) {
                    Ok(b)
                } else {
                    Err(CodecError::Decode(format!(
                        "expected {}x{}, got {}x{}",
                        pending.width,
                        pending.height,
                        b.width(),
                        b.height()
                    )))
                }
            })
            .map_err(|e| {
                log::warn!("{} failed: {e}", pending.op.describe());
                EditorError::Bake(e)
            })?;

        self.doc.replace_bitmap(bitmap);
        if pending.op.clears_layers() {
            self.doc.clear_layers();
            self.drag = DragState::None;
        }
        self.touch();
        log::info!("{} applied", pending.op.describe());
        self.commit()?;
        Ok(())
    }

    pub async fn bake(&mut self, op: BakeOp) -> Result<(), EditorError> {
        let pending = self.begin_bake(op)?;
        let decoded = self.codec.decode(pending.encoded.clone()).await;
        self.finish_bake(pending, decoded)
    }

    pub async fn rotate(&mut self, rotation: Rotation) -> Result<(), EditorError> {
        self.bake(BakeOp::Rotate(rotation)).await
    }

    pub async fn flip(&mut self, axis: FlipAxis) -> Result<(), EditorError> {
        self.bake(BakeOp::Flip(axis)).await
    }

    // ── Crop ────────────────────────────────────────────────────────────────

    pub fn toggle_crop(&mut self) {
        if !self.doc.is_loaded() {
            return;
        }
        self.crop.toggle();
        self.drag = DragState::None;
        self.touch();
    }

    pub fn cancel_crop(&mut self) {
        if self.crop.is_active() {
            self.crop.cancel();
            self.touch();
        }
    }

    pub fn set_aspect(&mut self, aspect: AspectRatio) {
        self.crop.aspect = aspect;
    }

    /// Bakes the current crop selection. Returns `false` when there is nothing to apply.
    pub async fn apply_crop(&mut self) -> Result<bool, EditorError> {
        self.ensure_idle()?;
        let transform = self.transform().ok_or(EditorError::NotLoaded)?;
        let Some(selection) = self.crop.take_selection() else {
            return Ok(false);
        };
        let (w, h) = self
            .doc
            .bitmap()
            .map(|b| (b.width(), b.height()))
            .ok_or(EditorError::NotLoaded)?;
        let rect = to_image_rect(selection, &transform, w, h);
        self.touch();
        self.bake(BakeOp::Crop(rect)).await?;
        Ok(true)
    }

    // ── Pointer Input ───────────────────────────────────────────────────────

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
        self.drag = DragState::None;
    }

    pub fn pointer_down(&mut self, pos: Pos2, button: PointerButton) {
        let Some(transform) = self.transform() else {
            return;
        };
        if button == PointerButton::Middle {
            self.drag = DragState::Panning { last: pos };
            return;
        }
        if self.crop.pointer_down(pos) {
            self.touch();
            return;
        }
        if self.tool != Tool::Move {
            return;
        }
        match hit_test(&self.doc, &transform, &self.fonts, pos) {
            Some(index) => {
                self.doc.set_active_layer(Some(index));
                self.drag = DragState::MovingLayer {
                    index,
                    last: pos,
                    moved: false,
                };
            }
            None => {
                self.doc.set_active_layer(None);
                self.drag = DragState::Panning { last: pos };
            }
        }
        self.touch();
    }

    pub fn pointer_move(&mut self, pos: Pos2) {
        match self.drag {
            DragState::Panning { last } => {
                self.pan_by(pos - last);
                self.drag = DragState::Panning { last: pos };
            }
            DragState::MovingLayer { index, last, .. } => {
                if let Some(transform) = self.transform() {
                    drag_layer(&mut self.doc, &transform, index, pos - last);
                }
                self.drag = DragState::MovingLayer {
                    index,
                    last: pos,
                    moved: true,
                };
                self.touch();
            }
            DragState::None => {
                if self.crop.pointer_move(pos) {
                    self.touch();
                }
            }
        }
    }

    /// Ends the current gesture. A moved layer is committed here.
    pub fn pointer_up(&mut self, pos: Pos2) -> Result<(), EditorError> {
        let drag = std::mem::take(&mut self.drag);
        match drag {
            DragState::MovingLayer { moved, .. } => {
                if moved {
                    self.commit()?;
                }
            }
            DragState::Panning { .. } => {}
            DragState::None => {
                if self.crop.pointer_up(pos) {
                    self.touch();
                }
            }
        }
        Ok(())
    }

    /// Click without drag. With the text tool this places a new layer.
    pub fn click(&mut self, pos: Pos2) -> Result<Option<usize>, EditorError> {
        if self.tool != Tool::Text || self.crop.is_active() {
            return Ok(None);
        }
        let Some(transform) = self.transform() else {
            return Ok(None);
        };
        let index = place_text(&mut self.doc, &transform, pos, self.text_defaults.clone());
        log::debug!("placed {}", self.doc.layers[index].name);
        self.touch();
        self.commit()?;
        Ok(Some(index))
    }

    // ── Layers ──────────────────────────────────────────────────────────────

    /// Adds a layer at an image-space position with the current text defaults.
    pub fn add_text_layer(&mut self, pos: Pos2) -> Result<usize, EditorError> {
        self.ensure_loaded()?;
        let index = self.doc.add_text_layer(pos, self.text_defaults.clone());
        self.touch();
        self.commit()?;
        Ok(index)
    }

    pub fn set_active_layer(&mut self, index: Option<usize>) {
        self.doc.set_active_layer(index);
        self.touch();
    }

    /// Applies `edit` without recording history; pair with [`Self::commit`] once the
    /// gesture ends.
    pub fn preview_layer_edit(&mut self, index: usize, edit: LayerEdit) -> bool {
        let Some(layer) = self.doc.layers.get_mut(index) else {
            return false;
        };
        let changed = match edit {
            LayerEdit::Text(text) => replace(&mut layer.text, text),
            LayerEdit::FontSize(size) => replace(&mut layer.font_size, size.max(1.0)),
            LayerEdit::Weight(weight) => replace(&mut layer.weight, weight.clamp(100, 900)),
            LayerEdit::Color(color) => replace(&mut layer.color, color),
            LayerEdit::Visible(visible) => replace(&mut layer.visible, visible),
            LayerEdit::Rename(name) => replace(&mut layer.name, name),
        };
        if changed {
            self.touch();
        }
        changed
    }

    pub fn edit_layer(&mut self, index: usize, edit: LayerEdit) -> Result<bool, EditorError> {
        let changed = self.preview_layer_edit(index, edit);
        if changed {
            self.commit()?;
        }
        Ok(changed)
    }

    pub fn edit_active_layer(&mut self, edit: LayerEdit) -> Result<bool, EditorError> {
        match self.doc.active_layer() {
            Some(index) => self.edit_layer(index, edit),
            None => Ok(false),
        }
    }

    pub fn move_layer(&mut self, index: usize, new_index: usize) -> Result<bool, EditorError> {
        let moved = self.doc.move_layer(index, new_index);
        if moved {
            self.touch();
            self.commit()?;
        }
        Ok(moved)
    }

    /// `delta` > 0 moves towards the top of the stack.
    pub fn move_active_layer(&mut self, delta: isize) -> Result<bool, EditorError> {
        let moved = self.doc.move_active_layer(delta);
        if moved {
            self.touch();
            self.commit()?;
        }
        Ok(moved)
    }

    pub fn delete_layer(&mut self, index: usize) -> Result<bool, EditorError> {
        let Some(removed) = self.doc.delete_layer(index) else {
            return Ok(false);
        };
        log::debug!("deleted {}", removed.name);
        self.drag = DragState::None;
        self.touch();
        self.commit()?;
        Ok(true)
    }

    pub fn delete_active_layer(&mut self) -> Result<bool, EditorError> {
        match self.doc.active_layer() {
            Some(index) => self.delete_layer(index),
            None => Ok(false),
        }
    }

    // ── Viewport ────────────────────────────────────────────────────────────

    pub fn set_viewport_size(&mut self, size: Vec2) {
        let size = vec2(size.x.max(1.0), size.y.max(1.0));
        if size != self.viewport_size {
            self.viewport_size = size;
            self.touch();
        }
    }

    pub fn set_viewport(&mut self, zoom: f32, pan_x: f32, pan_y: f32) {
        let bounds = self.zoom_bounds();
        self.doc.set_viewport(zoom, pan_x, pan_y, bounds);
        self.touch();
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        let v = self.doc.viewport;
        self.set_viewport(v.zoom, v.pan_x + delta.x, v.pan_y + delta.y);
    }

    /// Zooms to `zoom` (clamped) keeping the image point under `anchor` still.
    pub fn zoom_at(&mut self, zoom: f32, anchor: Pos2) {
        let Some(transform) = self.transform() else {
            return;
        };
        let (min, max) = self.zoom_bounds();
        let next =
            geometry::zoom_at(self.doc.viewport, transform.fit, zoom.clamp(min, max), anchor);
        self.set_viewport(next.zoom, next.pan_x, next.pan_y);
    }

    /// One wheel notch; positive `delta_y` is wheel-up and zooms in.
    pub fn zoom_by_wheel(&mut self, delta_y: f32, anchor: Pos2) {
        if delta_y == 0.0 {
            return;
        }
        let factor = if delta_y > 0.0 { WHEEL_ZOOM_IN } else { WHEEL_ZOOM_OUT };
        self.zoom_at(self.doc.viewport.zoom * factor, anchor);
    }

    pub fn fit_to_screen(&mut self) {
        self.doc.viewport = Viewport::default();
        self.touch();
    }

    /// One image pixel per screen pixel, centered on the viewport.
    pub fn actual_pixels(&mut self) {
        let Some(transform) = self.transform() else {
            return;
        };
        let center = pos2(self.viewport_size.x / 2.0, self.viewport_size.y / 2.0);
        self.zoom_at(1.0 / transform.fit.scale.max(f32::EPSILON), center);
    }

    pub fn toggle_grid(&mut self) {
        self.show_grid = !self.show_grid;
        self.touch();
    }

    // ── Output ──────────────────────────────────────────────────────────────

    /// Whether the view changed since the last call.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.needs_redraw)
    }

    pub fn render(&self) -> RgbaImage {
        let overlays = Overlays {
            crop: self.crop.selection(),
            selection: if self.crop.is_active() {
                None
            } else {
                self.doc.active_layer()
            },
            grid: self.show_grid.then_some(self.config.grid_spacing),
        };
        render_view(&self.doc, self.viewport_size, &self.fonts, &overlays)
    }

    pub fn default_export_options(&self) -> ExportOptions {
        ExportOptions {
            format: OutputFormat::Png,
            quality: self.config.default_quality,
        }
    }

    /// Encodes the composited document. Repeated calls give the same bytes.
    pub fn export(&self, options: ExportOptions) -> Result<ExportedImage, EditorError> {
        export_document(
            &self.doc,
            &self.fonts,
            &self.codec,
            options,
            &self.config.export_basename,
        )
    }

    pub fn save_record(
        &self,
        title: &str,
        options: ExportOptions,
    ) -> Result<SaveRecord, EditorError> {
        let bitmap = self.doc.bitmap().ok_or(EditorError::NotLoaded)?;
        Ok(SaveRecord {
            title: title.to_string(),
            state: self.state(),
            width: bitmap.width(),
            height: bitmap.height(),
            format: options.format,
            quality: options.quality.min(100),
            id: None,
        })
    }

    /// Restores saved filters, layers and view onto the loaded bitmap and commits.
    pub fn apply_state(&mut self, state: SessionState) -> Result<(), EditorError> {
        self.ensure_loaded()?;
        self.doc.filters = state.filters.sanitized();
        self.doc.layers = state.layers;
        self.doc.set_active_layer(None);
        let v = state.viewport;
        self.set_viewport(v.zoom, v.pan_x, v.pan_y);
        self.commit()?;
        Ok(())
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use pollster::block_on;

    fn session(w: u32, h: u32) -> EditorSession {
        let mut s = EditorSession::with_codec(
            EditorConfig::default(),
            ImageCodec,
            FontBook::bundled().unwrap(),
        );
        s.set_viewport_size(vec2(w as f32, h as f32));
        s.load_bitmap(Bitmap::new(RgbaImage::from_pixel(w, h, Rgba([90, 90, 90, 255]))))
            .unwrap();
        s
    }

    #[test]
    fn editing_before_load_is_refused() {
        let mut s = EditorSession::with_codec(
            EditorConfig::default(),
            ImageCodec,
            FontBook::bundled().unwrap(),
        );
        assert!(matches!(s.apply_preset(Preset::Bw), Err(EditorError::NotLoaded)));
        assert!(matches!(
            s.begin_bake(BakeOp::Rotate(Rotation::Clockwise)),
            Err(EditorError::NotLoaded)
        ));
        assert!(!s.commit().unwrap());
        s.set_filter(FilterParam::Contrast, 150.0);
        assert!(s.document().filters.is_neutral());
    }

    #[test]
    fn layer_drag_commits_once_on_release() {
        let mut s = session(100, 100);
        s.add_text_layer(pos2(10.0, 10.0)).unwrap();
        let steps = s.history().undo_len();
        s.pointer_down(pos2(12.0, 12.0), PointerButton::Primary);
        s.pointer_move(pos2(20.0, 15.0));
        s.pointer_move(pos2(30.0, 20.0));
        assert_eq!(s.history().undo_len(), steps);
        s.pointer_up(pos2(30.0, 20.0)).unwrap();
        assert_eq!(s.history().undo_len(), steps + 1);
        let layer = &s.document().layers[0];
        assert_eq!((layer.x, layer.y), (28.0, 18.0));
    }

    #[test]
    fn click_on_empty_space_deselects_and_pans() {
        let mut s = session(100, 100);
        s.add_text_layer(pos2(10.0, 10.0)).unwrap();
        s.pointer_down(pos2(90.0, 90.0), PointerButton::Primary);
        assert_eq!(s.document().active_layer(), None);
        s.pointer_move(pos2(80.0, 95.0));
        s.pointer_up(pos2(80.0, 95.0)).unwrap();
        assert_eq!(s.document().viewport.pan(), vec2(-10.0, 5.0));
    }

    #[test]
    fn text_tool_places_at_click() {
        let mut s = session(100, 100);
        s.set_tool(Tool::Text);
        let index = s.click(pos2(40.0, 30.0)).unwrap();
        assert_eq!(index, Some(0));
        let layer = &s.document().layers[0];
        assert_eq!((layer.x, layer.y, layer.font_size), (40.0, 30.0, 32.0));
        assert!(s.can_undo());
    }

    #[test]
    fn layer_edits_commit_only_on_change() {
        let mut s = session(50, 50);
        s.add_text_layer(pos2(0.0, 0.0)).unwrap();
        let steps = s.history().undo_len();
        assert!(!s.edit_active_layer(LayerEdit::Visible(true)).unwrap());
        assert!(s.edit_active_layer(LayerEdit::Text("Hi".into())).unwrap());
        assert_eq!(s.history().undo_len(), steps + 1);
        assert_eq!(s.document().layers[0].text, "Hi");
    }

    #[test]
    fn wheel_zoom_is_clamped() {
        let mut s = session(100, 100);
        for _ in 0..100 {
            s.zoom_by_wheel(1.0, pos2(50.0, 50.0));
        }
        assert_eq!(s.document().viewport.zoom, 8.0);
        s.fit_to_screen();
        s.zoom_by_wheel(-1.0, pos2(0.0, 0.0));
        assert!((s.document().viewport.zoom - 0.9).abs() < 1e-6);
    }

    #[test]
    fn actual_pixels_matches_bitmap_resolution() {
        let mut s = session(400, 200);
        s.set_viewport_size(vec2(100.0, 100.0));
        s.actual_pixels();
        let t = s.transform().unwrap();
        assert!((t.effective_scale() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn reset_returns_to_loaded_image() {
        let mut s = session(60, 40);
        s.apply_preset(Preset::Vivid).unwrap();
        s.add_text_layer(pos2(1.0, 1.0)).unwrap();
        block_on(s.rotate(Rotation::Clockwise)).unwrap();
        s.reset().unwrap();
        let bitmap = s.document().bitmap().unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (60, 40));
        assert!(s.document().filters.is_neutral());
        assert!(s.document().layers.is_empty());
        assert!(block_on(s.undo()).unwrap());
        assert_eq!(s.document().bitmap().unwrap().width(), 40);
    }

    #[test]
    fn stale_bake_result_is_rejected() {
        let mut s = session(10, 10);
        let first = s.begin_bake(BakeOp::Flip(FlipAxis::Vertical)).unwrap();
        let decoded = block_on(ImageCodec.decode(first.encoded.clone()));
        s.finish_bake(first.clone(), decoded).unwrap();
        let again = block_on(ImageCodec.decode(first.encoded.clone()));
        assert!(matches!(s.finish_bake(first, again), Err(EditorError::StaleBake)));
    }
}
