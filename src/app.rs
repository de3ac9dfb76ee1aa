use std::borrow::Cow;

use anyhow::Context as _;
use eframe::egui::{self, *};
use eframe::App;

use crate::actions::{dispatch, Action, Outcome};
use crate::brush::{Tool, MAX_BRUSH_SIZE, MIN_BRUSH_SIZE};
use crate::canvas::Canvas;
use crate::settings::{Settings, VisibilityPolicy};
use crate::surface::Surface;

/// Shrinks the given size as little as possible to fit the given aspect ratio (width/height)
pub fn shrink_to_aspect_ratio(size: Vec2, aspect_ratio: f32) -> Vec2 {
    Vec2::new(
        size.x.min(size.y * aspect_ratio),
        size.y.min(size.x / aspect_ratio),
    )
}

const PROJECT_FILTER: (&str, &[&str]) = ("Chilito project", &["json"]);

pub struct StudioApp {
    canvas: Canvas,
    settings: Settings,
    render_texture: TextureHandle,
    rendered_revision: u64,
    error: Option<String>,
}

impl StudioApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings: Settings = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, eframe::APP_KEY))
            .unwrap_or_default();
        log::info!("starting with {settings:?}");
        cc.egui_ctx.set_visuals(Visuals::dark());

        let mut canvas = Canvas::with_settings(&settings);
        canvas.add_layer();
        let render_texture = cc.egui_ctx.load_texture("canvas", canvas.render(), TextureOptions::NEAREST);
        Self {
            rendered_revision: canvas.revision(),
            canvas,
            settings,
            render_texture,
            error: None,
        }
    }

    fn run(&mut self, actions: Vec<Action>) {
        for action in actions {
            if let Outcome::Failed(message) = dispatch(&mut self.canvas, action) {
                self.error = Some(message);
            }
        }
    }

    fn copy_active_layer(&self) -> anyhow::Result<()> {
        let layer = self.canvas.active_layer().context("no active layer to copy")?;
        let mut clipboard = arboard::Clipboard::new().context("clipboard is unavailable")?;
        clipboard
            .set_image(arboard::ImageData {
                width: layer.width(),
                height: layer.height(),
                bytes: Cow::Borrowed(layer.pixels().as_raw()),
            })
            .with_context(|| format!("could not copy {} to the clipboard", layer.name()))?;
        log::info!("copied {} to the clipboard", layer.name());
        Ok(())
    }

    pub fn ui_control(&mut self, ui: &mut egui::Ui) -> Vec<Action> {
        let mut actions = Vec::new();
        ui.horizontal(|ui| {
            if ui.button("New Layer").clicked() {
                actions.push(Action::NewLayer);
            }
            ui.separator();
            let tool = self.canvas.tool();
            if ui.selectable_label(tool == Tool::Draw, "Pen").clicked() {
                actions.push(Action::Pen);
            }
            if ui.selectable_label(tool == Tool::Erase, "Eraser").clicked() {
                actions.push(Action::Eraser);
            }
            let mut color = self.canvas.pen().color;
            if color_picker::color_edit_button_srgba(ui, &mut color, color_picker::Alpha::OnlyBlend).changed() {
                actions.push(Action::Color(color));
            }
            ui.label("Size:");
            let mut size = self.canvas.pen().size;
            if ui
                .add(Slider::new(&mut size, MIN_BRUSH_SIZE..=MAX_BRUSH_SIZE).logarithmic(true))
                .changed()
            {
                actions.push(Action::BrushSize(size));
            }
            ui.separator();
            if ui.button("Save Project").clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter(PROJECT_FILTER.0, PROJECT_FILTER.1)
                    .set_file_name("project.json")
                    .save_file()
                {
                    actions.push(Action::Save(path));
                }
            }
            if ui.button("Load Project").clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter(PROJECT_FILTER.0, PROJECT_FILTER.1)
                    .pick_file()
                {
                    actions.push(Action::Load(path));
                }
            }
            if ui.button("Copy Layer").clicked() {
                if let Err(err) = self.copy_active_layer() {
                    log::error!("{err:#}");
                    self.error = Some(format!("{err:#}"));
                }
            }
        });
        actions
    }

    pub fn ui_layers(&mut self, ui: &mut egui::Ui) -> Vec<Action> {
        let mut actions = Vec::new();
        ui.heading("Layers");
        ui.horizontal(|ui| {
            if ui.button("Add").clicked() {
                actions.push(Action::NewLayer);
            }
            if let Some(active) = self.canvas.active_index() {
                if ui.button("Remove").clicked() {
                    actions.push(Action::RemoveLayer(active));
                }
            }
            let mut solo = self.canvas.visibility_policy() == VisibilityPolicy::Solo;
            if ui
                .checkbox(&mut solo, "Solo")
                .on_hover_text("Show only the active layer")
                .changed()
            {
                actions.push(Action::Visibility(if solo {
                    VisibilityPolicy::Solo
                } else {
                    VisibilityPolicy::Independent
                }));
            }
        });
        ui.separator();
        ScrollArea::vertical().show(ui, |ui| {
            // topmost layer first, like most paint programs
            for (i, layer) in self.canvas.layers().iter().enumerate().rev() {
                ui.horizontal(|ui| {
                    let mut visible = layer.is_visible();
                    if ui.checkbox(&mut visible, "").on_hover_text("Visible").changed() {
                        actions.push(Action::ToggleVisibility(i));
                    }
                    let active = self.canvas.active_index() == Some(i);
                    if ui.selectable_label(active, layer.name()).clicked() {
                        actions.push(Action::SelectLayer(i));
                    }
                });
                let mut opacity = layer.opacity();
                if ui
                    .add(Slider::new(&mut opacity, 0.0..=1.0).text("Opacity"))
                    .changed()
                {
                    actions.push(Action::SetOpacity(i, opacity));
                }
                ui.separator();
            }
        });
        actions
    }

    pub fn ui_content(&mut self, ui: &mut Ui) -> egui::Response {
        let response = ui
            .allocate_response(
                shrink_to_aspect_ratio(ui.available_size_before_wrap(), self.canvas.aspect_ratio()),
                Sense::drag(),
            )
            .on_hover_cursor(match self.canvas.tool() {
                Tool::Draw => CursorIcon::Crosshair,
                Tool::Erase => CursorIcon::Cell,
            });
        let clip_rect = ui.clip_rect().intersect(response.rect); // Make sure we don't paint out of bounds
        let painter = ui.painter().with_clip_rect(clip_rect);

        let to_canvas = emath::RectTransform::from_to(
            response.rect,
            Rect::from_min_size(Pos2::ZERO, self.canvas.size()),
        );

        if response.drag_started_by(PointerButton::Primary) {
            let origin = ui.input(|i| i.pointer.press_origin());
            if let Some(pos) = origin.or(response.interact_pointer_pos()) {
                self.canvas.pointer_pressed(to_canvas * pos);
            }
        }
        if let Some(pointer_pos) = response.interact_pointer_pos() {
            self.canvas
                .pointer_moved(to_canvas * pointer_pos, response.dragged_by(PointerButton::Primary));
        }
        if response.drag_stopped() {
            self.canvas.pointer_released();
        }

        if self.canvas.revision() != self.rendered_revision {
            self.render_texture.set(self.canvas.render(), TextureOptions::NEAREST);
            self.rendered_revision = self.canvas.revision();
        }
        painter.rect_filled(response.rect, 0., Color32::from_gray(64));
        Image::from_texture((self.render_texture.id(), self.canvas.size()))
            .paint_at(ui, response.rect);
        response
    }

    fn ui_error(&mut self, ctx: &egui::Context) {
        let Some(message) = &self.error else {
            return;
        };
        let mut dismissed = false;
        Window::new("Error")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(message);
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            self.error = None;
        }
    }
}

impl App for StudioApp {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        self.settings.remember_pen(self.canvas.pen());
        self.settings.visibility = self.canvas.visibility_policy();
        eframe::set_value(storage, eframe::APP_KEY, &self.settings);
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut actions = Vec::new();
        TopBottomPanel::top("toolbar").show(ctx, |ui| {
            actions.extend(self.ui_control(ui));
        });
        SidePanel::right("layers").resizable(true).show(ctx, |ui| {
            actions.extend(self.ui_layers(ui));
        });
        // loaded projects must fit in a single texture
        self.canvas
            .set_max_dimension(ctx.input(|i| i.max_texture_side) as u64);
        self.run(actions);
        CentralPanel::default()
            .frame(Frame::default().fill(Color32::from_gray(43)))
            .show(ctx, |ui| {
                self.ui_content(ui);
            });
        self.ui_error(ctx);
    }
}
