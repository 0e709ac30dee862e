use std::path::{Path, PathBuf};

use clap::Parser;
use eframe::egui;
use flexi_logger::Logger;
use photo_edit::bake::{FlipAxis, Rotation};
use photo_edit::persist::{DocumentStore, SidecarStore};
use photo_edit::{
    AspectRatio, EditorConfig, EditorError, EditorSession, ExportOptions, FilterParam,
    LayerEdit, OutputFormat, PointerButton, Preset, Tool,
};

// ── Command Line ────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(version, about = "Raster photo editor", long_about = None)]
struct Args {
    /// Image to open on start
    #[arg(value_name = "IMAGE")]
    path: Option<PathBuf>,

    /// JSON editor configuration
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// TrueType/OpenType font used for text layers
    #[arg(long, value_name = "FILE")]
    font: Option<PathBuf>,
}

// ── App ─────────────────────────────────────────────────────────────────────

struct EditorApp {
    session: EditorSession,
    image_path: Option<PathBuf>,
    texture: Option<egui::TextureHandle>,
    export: ExportOptions,
    /// A panel control changed the document and the change still needs a commit.
    live_edit: bool,
    status: String,
}

impl EditorApp {
    fn new(session: EditorSession, image_path: Option<PathBuf>) -> Self {
        let export = session.default_export_options();
        let mut app = Self {
            session,
            image_path: None,
            texture: None,
            export,
            live_edit: false,
            status: "Open an image to start".to_string(),
        };
        if let Some(path) = image_path {
            app.open_path(path);
        }
        app
    }

    fn report<T>(&mut self, what: &str, result: Result<T, EditorError>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("{what}: {e}");
                self.status = format!("{what}: {e}");
                None
            }
        }
    }

    fn open_dialog(&mut self) {
        let picked = rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg", "webp", "bmp", "gif"])
            .pick_file();
        if let Some(path) = picked {
            self.open_path(path);
        }
    }

    fn open_path(&mut self, path: PathBuf) {
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.report::<()>("open", Err(e.into()));
                return;
            }
        };
        let loaded = pollster::block_on(self.session.load_bytes(bytes));
        if self.report("open", loaded).is_none() {
            return;
        }
        let store = SidecarStore::for_image(&path);
        if store.exists() {
            if let Some(record) = self.report("restore", store.load("")) {
                self.export = ExportOptions {
                    format: record.format,
                    quality: record.quality,
                };
                let applied = self.session.apply_state(record.state);
                self.report("restore", applied);
            }
        }
        self.status = format!("Opened {}", path.display());
        self.image_path = Some(path);
    }

    fn title(&self) -> String {
        self.image_path
            .as_deref()
            .and_then(Path::file_stem)
            .and_then(|s| s.to_str())
            .unwrap_or("untitled")
            .to_string()
    }

    /// Writes the sidecar state and exports next to the source image.
    fn save_and_export(&mut self) {
        let Some(path) = self.image_path.clone() else {
            return;
        };
        let record = self.session.save_record(&self.title(), self.export);
        if let Some(record) = self.report("save", record) {
            let saved = SidecarStore::for_image(&path).save(&record);
            self.report("save", saved);
        }
        let exported = self.session.export(self.export);
        if let Some(exported) = self.report("export", exported) {
            let out = path.with_file_name(format!("{}-{}", self.title(), exported.filename));
            match std::fs::write(&out, &exported.bytes) {
                Ok(()) => self.status = format!("Exported to {}", out.display()),
                Err(e) => {
                    self.report::<()>("export", Err(e.into()));
                }
            }
        }
    }

    fn export_dialog(&mut self) {
        let exported = self.session.export(self.export);
        let Some(exported) = self.report("export", exported) else {
            return;
        };
        let target = rfd::FileDialog::new()
            .set_file_name(exported.filename.as_str())
            .add_filter(exported.format.extension(), &[exported.format.extension()])
            .save_file();
        if let Some(target) = target {
            match std::fs::write(&target, &exported.bytes) {
                Ok(()) => self.status = format!("Exported to {}", target.display()),
                Err(e) => {
                    self.report::<()>("export", Err(e.into()));
                }
            }
        }
    }

    fn undo(&mut self) {
        // The session commits a pending panel edit itself before stepping back.
        self.live_edit = false;
        let result = pollster::block_on(self.session.undo());
        self.report("undo", result);
    }

    fn redo(&mut self) {
        let result = pollster::block_on(self.session.redo());
        self.report("redo", result);
    }

    fn rotate(&mut self, rotation: Rotation) {
        let result = pollster::block_on(self.session.rotate(rotation));
        self.report("rotate", result);
    }

    fn flip(&mut self, axis: FlipAxis) {
        let result = pollster::block_on(self.session.flip(axis));
        self.report("flip", result);
    }

    fn apply_crop(&mut self) {
        let result = pollster::block_on(self.session.apply_crop());
        self.report("crop", result);
    }

    fn upload_canvas(&mut self, ctx: &egui::Context) {
        let frame = self.session.render();
        let image = egui::ColorImage::from_rgba_unmultiplied(
            [frame.width() as usize, frame.height() as usize],
            frame.as_raw(),
        );
        match &mut self.texture {
            Some(tex) => tex.set(image, egui::TextureOptions::NEAREST),
            None => {
                self.texture =
                    Some(ctx.load_texture("canvas", image, egui::TextureOptions::NEAREST));
            }
        }
    }

    // ── Panels ──────────────────────────────────────────────────────────────

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal_wrapped(|ui| {
            if ui.button("Open…").clicked() {
                self.open_dialog();
            }
            let loaded = self.session.is_loaded();
            let idle = loaded && !self.session.is_baking();
            ui.add_enabled_ui(idle, |ui| {
                if ui.button("Reset").clicked() {
                    let result = self.session.reset();
                    self.report("reset", result);
                }
                ui.separator();
                if ui.button("⟲").on_hover_text("Rotate left").clicked() {
                    self.rotate(Rotation::CounterClockwise);
                }
                if ui.button("⟳").on_hover_text("Rotate right").clicked() {
                    self.rotate(Rotation::Clockwise);
                }
                if ui.button("Flip H").clicked() {
                    self.flip(FlipAxis::Horizontal);
                }
                if ui.button("Flip V").clicked() {
                    self.flip(FlipAxis::Vertical);
                }
                ui.separator();

                let cropping = self.session.crop_tool().is_active();
                if ui.selectable_label(cropping, "Crop").clicked() {
                    self.session.toggle_crop();
                }
                let mut aspect = self.session.crop_tool().aspect;
                egui::ComboBox::from_id_salt("aspect")
                    .selected_text(aspect.label())
                    .show_ui(ui, |ui| {
                        for choice in AspectRatio::CHOICES {
                            ui.selectable_value(&mut aspect, choice, choice.label());
                        }
                    });
                self.session.set_aspect(aspect);
                if cropping {
                    if ui.button("Apply").clicked() {
                        self.apply_crop();
                    }
                    if ui.button("Cancel").clicked() {
                        self.session.cancel_crop();
                    }
                }
            });
            ui.separator();

            ui.add_enabled_ui(loaded, |ui| {
                let mut tool = self.session.tool();
                ui.selectable_value(&mut tool, Tool::Move, "Move");
                ui.selectable_value(&mut tool, Tool::Text, "Text");
                if tool != self.session.tool() {
                    self.session.set_tool(tool);
                }
                ui.separator();
                if ui.selectable_label(self.session.show_grid(), "Grid").clicked() {
                    self.session.toggle_grid();
                }
                if ui.button("Fit").clicked() {
                    self.session.fit_to_screen();
                }
                if ui.button("100%").clicked() {
                    self.session.actual_pixels();
                }
                ui.separator();
                if ui.add_enabled(self.session.can_undo(), egui::Button::new("Undo")).clicked() {
                    self.undo();
                }
                if ui.add_enabled(self.session.can_redo(), egui::Button::new("Redo")).clicked() {
                    self.redo();
                }
                ui.separator();
                ui.label(format!("Zoom: {}%", self.session.zoom_percent()));
            });
        });
    }

    fn side_panel(&mut self, ui: &mut egui::Ui) {
        ui.add_enabled_ui(self.session.is_loaded(), |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                self.filter_controls(ui);
                ui.separator();
                self.text_controls(ui);
                ui.separator();
                self.layer_list(ui);
                ui.separator();
                self.export_controls(ui);
            });
        });
    }

    fn filter_controls(&mut self, ui: &mut egui::Ui) {
        ui.heading("Adjust");
        for param in FilterParam::ALL {
            let mut value = self.session.document().filters.get(param);
            let (min, max) = param.range();
            let slider = egui::Slider::new(&mut value, min..=max)
                .text(param.label())
                .suffix(param.unit());
            if ui.add(slider).changed() {
                self.session.set_filter(param, value);
                self.live_edit = true;
            }
        }
        ui.horizontal_wrapped(|ui| {
            for preset in Preset::ALL {
                if ui.button(preset.label()).clicked() {
                    let result = self.session.apply_preset(preset);
                    self.report("preset", result);
                }
            }
            if ui.button("Clear").clicked() {
                let result = self.session.reset_filters();
                self.report("filters", result);
            }
        });
    }

    fn text_controls(&mut self, ui: &mut egui::Ui) {
        ui.heading("Text");
        let active = self.session.document().active_layer();
        let mut props = match active.and_then(|i| self.session.document().layers.get(i)) {
            Some(layer) => (layer.text.clone(), layer.font_size, layer.weight, layer.color),
            None => {
                let d = self.session.text_defaults();
                (d.text.clone(), d.font_size, d.weight, d.color)
            }
        };
        let mut rgb = props.3.rgb();

        let text_changed = ui.text_edit_multiline(&mut props.0).changed();
        let size_changed = ui
            .add(egui::Slider::new(&mut props.1, 8.0..=200.0).text("Size").suffix("px"))
            .changed();
        let weight_changed = ui
            .add(egui::Slider::new(&mut props.2, 100..=900).step_by(100.0).text("Weight"))
            .changed();
        let color_changed = ui
            .horizontal(|ui| {
                ui.label("Color");
                ui.color_edit_button_rgb(&mut rgb).changed()
            })
            .inner;

        let color = photo_edit::Color4 {
            a: props.3.a,
            ..photo_edit::Color4::from_rgb(rgb)
        };
        match active {
            Some(index) => {
                let mut changed = false;
                if text_changed {
                    changed |= self.session.preview_layer_edit(index, LayerEdit::Text(props.0));
                }
                if size_changed {
                    changed |= self.session.preview_layer_edit(index, LayerEdit::FontSize(props.1));
                }
                if weight_changed {
                    changed |= self.session.preview_layer_edit(index, LayerEdit::Weight(props.2));
                }
                if color_changed {
                    changed |= self.session.preview_layer_edit(index, LayerEdit::Color(color));
                }
                self.live_edit |= changed;
            }
            None => {
                let defaults = self.session.text_defaults_mut();
                defaults.text = props.0;
                defaults.font_size = props.1;
                defaults.weight = props.2;
                defaults.color = color;
            }
        }
    }

    fn layer_list(&mut self, ui: &mut egui::Ui) {
        ui.heading("Layers");
        let active = self.session.document().active_layer();
        let rows: Vec<(usize, String, bool)> = self
            .session
            .document()
            .layers
            .iter()
            .enumerate()
            .rev()
            .map(|(i, l)| (i, l.name.clone(), l.visible))
            .collect();
        if rows.is_empty() {
            ui.weak("Use the Text tool and click the image to add a layer");
        }
        for (index, name, visible) in rows {
            ui.horizontal(|ui| {
                let mut shown = visible;
                if ui.checkbox(&mut shown, "").changed() {
                    let result = self.session.edit_layer(index, LayerEdit::Visible(shown));
                    self.report("layer", result);
                }
                if ui.selectable_label(active == Some(index), name).clicked() {
                    self.session.set_active_layer(Some(index));
                }
            });
        }
        ui.add_enabled_ui(active.is_some(), |ui| {
            ui.horizontal(|ui| {
                if ui.button("Up").clicked() {
                    let result = self.session.move_active_layer(1);
                    self.report("layer", result);
                }
                if ui.button("Down").clicked() {
                    let result = self.session.move_active_layer(-1);
                    self.report("layer", result);
                }
                if ui.button("Delete").clicked() {
                    let result = self.session.delete_active_layer();
                    self.report("layer", result);
                }
            });
        });
    }

    fn export_controls(&mut self, ui: &mut egui::Ui) {
        ui.heading("Export");
        ui.horizontal(|ui| {
            ui.radio_value(&mut self.export.format, OutputFormat::Png, "PNG");
            ui.radio_value(&mut self.export.format, OutputFormat::Jpeg, "JPEG");
        });
        ui.add_enabled(
            self.export.format.is_lossy(),
            egui::Slider::new(&mut self.export.quality, 1..=100).text("Quality"),
        );
        if ui.button("Export…").clicked() {
            self.export_dialog();
        }
    }

    // ── Canvas ──────────────────────────────────────────────────────────────

    fn canvas(&mut self, ui: &mut egui::Ui) {
        let ctx = ui.ctx().clone();
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let canvas_rect = response.rect;
        let origin = canvas_rect.min.to_vec2();
        let local = |p: egui::Pos2| p - origin;

        painter.rect_filled(canvas_rect, 0.0, egui::Color32::from_gray(40));
        self.session.set_viewport_size(canvas_rect.size());

        if self.session.is_loaded() {
            let button = if response.drag_started_by(egui::PointerButton::Middle) {
                Some(PointerButton::Middle)
            } else if response.drag_started_by(egui::PointerButton::Primary) {
                Some(PointerButton::Primary)
            } else {
                None
            };
            if let Some(button) = button {
                if let Some(p) = ctx.input(|i| i.pointer.press_origin()) {
                    self.session.pointer_down(local(p), button);
                }
            }
            if response.dragged() {
                if let Some(p) = response.interact_pointer_pos() {
                    self.session.pointer_move(local(p));
                }
            }
            if response.drag_stopped() {
                let end = response
                    .interact_pointer_pos()
                    .or(ctx.input(|i| i.pointer.latest_pos()));
                if let Some(p) = end {
                    let result = self.session.pointer_up(local(p));
                    self.report("move", result);
                }
            }
            if response.clicked() {
                if let Some(p) = response.interact_pointer_pos() {
                    if self.session.tool() == Tool::Text {
                        let result = self.session.click(local(p));
                        self.report("text", result);
                    } else {
                        self.session.pointer_down(local(p), PointerButton::Primary);
                        let result = self.session.pointer_up(local(p));
                        self.report("select", result);
                    }
                }
            }
            if response.hovered() {
                let scroll = ctx.input(|i| i.raw_scroll_delta.y);
                if let Some(p) = response.hover_pos() {
                    self.session.zoom_by_wheel(scroll, local(p));
                }
            }
        }

        if self.session.take_redraw() || self.texture.is_none() {
            self.upload_canvas(&ctx);
        }
        if let Some(tex) = &self.texture {
            painter.image(
                tex.id(),
                canvas_rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        }
    }

    fn shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() || !self.session.is_loaded() {
            return;
        }
        let (undo, redo, save, delete, escape, enter) = ctx.input(|i| {
            // No undo in the middle of a slider or layer drag.
            let z = i.modifiers.command && i.key_pressed(egui::Key::Z) && !i.pointer.any_down();
            (
                z && !i.modifiers.shift,
                z && i.modifiers.shift,
                i.modifiers.command && i.key_pressed(egui::Key::S),
                i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace),
                i.key_pressed(egui::Key::Escape),
                i.key_pressed(egui::Key::Enter),
            )
        });
        if undo {
            self.undo();
        }
        if redo {
            self.redo();
        }
        if save {
            self.save_and_export();
        }
        if delete {
            let result = self.session.delete_active_layer();
            self.report("delete", result);
        }
        if escape {
            self.session.cancel_crop();
        }
        if enter && self.session.crop_tool().is_active() {
            self.apply_crop();
        }
    }

    /// Commits panel edits once the pointer is released and no text field has focus.
    fn settle_live_edit(&mut self, ctx: &egui::Context) {
        if !self.live_edit {
            return;
        }
        let busy = ctx.input(|i| i.pointer.any_down()) || ctx.wants_keyboard_input();
        if !busy {
            self.live_edit = false;
            let result = self.session.commit();
            self.report("commit", result);
        }
    }
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for EditorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.shortcuts(ctx);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| self.toolbar(ui));
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status);
                if let Some(bitmap) = self.session.document().bitmap() {
                    ui.separator();
                    ui.label(format!("{}×{}", bitmap.width(), bitmap.height()));
                    ui.separator();
                    ui.label(format!(
                        "History {}/{}",
                        self.session.history().undo_len(),
                        self.session.history().limit()
                    ));
                }
            });
        });
        egui::SidePanel::right("properties")
            .default_width(260.0)
            .show(ctx, |ui| self.side_panel(ui));
        egui::CentralPanel::default()
            .frame(egui::Frame::default())
            .show(ctx, |ui| self.canvas(ui));

        self.settle_live_edit(ctx);
    }
}

// ── Main ────────────────────────────────────────────────────────────────────

fn main() -> eframe::Result {
    let args = Args::parse();

    let _logger = match Logger::try_with_env_or_str("info, eframe=warn, egui_glow=warn")
        .and_then(|logger| logger.log_to_stderr().start())
    {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("failed to start logger: {e}");
            None
        }
    };

    let mut config = match &args.config {
        Some(path) => match EditorConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => EditorConfig::default(),
    };
    if args.font.is_some() {
        config.font_path = args.font.clone();
    }
    let session = match EditorSession::new(config) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let title = match args.path.as_deref().and_then(Path::file_name) {
        Some(name) => format!("photo-edit - {}", name.to_string_lossy()),
        None => "photo-edit".to_string(),
    };
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 820.0])
            .with_title(&title),
        ..Default::default()
    };

    eframe::run_native(
        &title,
        options,
        Box::new(move |_cc| Ok(Box::new(EditorApp::new(session, args.path)))),
    )
}
