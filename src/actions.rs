use std::path::PathBuf;

use eframe::egui::Color32;

use crate::canvas::Canvas;
use crate::settings::VisibilityPolicy;

/// Everything the toolbar, menus and layer panel can ask of the canvas.
/// Dialogs (color picker, file pickers) only produce the payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    NewLayer,
    Pen,
    Eraser,
    Color(Color32),
    BrushSize(u32),
    SelectLayer(usize),
    RemoveLayer(usize),
    ToggleVisibility(usize),
    SetOpacity(usize, f32),
    Visibility(VisibilityPolicy),
    Save(PathBuf),
    Load(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Done,
    /// Nothing to act on, e.g. a stale layer index.
    Ignored,
    Failed(String),
}

impl Outcome {
    fn applied(applied: bool) -> Self {
        if applied {
            Outcome::Done
        } else {
            Outcome::Ignored
        }
    }
}

/// Runs exactly one canvas operation for `action`.
pub fn dispatch(canvas: &mut Canvas, action: Action) -> Outcome {
    log::debug!("dispatching {action:?}");
    let outcome = match action {
        Action::NewLayer => {
            canvas.add_layer();
            Outcome::Done
        }
        Action::Pen => {
            canvas.enable_pen();
            Outcome::Done
        }
        Action::Eraser => {
            canvas.enable_eraser();
            Outcome::Done
        }
        Action::Color(color) => {
            canvas.set_pen_color(color);
            Outcome::Done
        }
        Action::BrushSize(size) => {
            canvas.set_brush_size(size);
            Outcome::Done
        }
        Action::SelectLayer(index) => Outcome::applied(canvas.select_layer(index)),
        Action::RemoveLayer(index) => Outcome::applied(canvas.remove_layer(index).is_some()),
        Action::ToggleVisibility(index) => match canvas.layer(index).map(|l| l.is_visible()) {
            Some(visible) => Outcome::applied(canvas.set_layer_visible(index, !visible)),
            None => Outcome::Ignored,
        },
        Action::SetOpacity(index, opacity) => Outcome::applied(canvas.set_layer_opacity(index, opacity)),
        Action::Visibility(policy) => {
            canvas.set_visibility_policy(policy);
            Outcome::Done
        }
        Action::Save(path) => match canvas.save(&path) {
            Ok(()) => Outcome::Done,
            Err(err) => Outcome::Failed(format!("Could not save project: {err}")),
        },
        Action::Load(path) => match canvas.load(&path) {
            Ok(()) => Outcome::Done,
            Err(err) => Outcome::Failed(format!("Could not load project: {err}")),
        },
    };
    if let Outcome::Failed(message) = &outcome {
        log::error!("{message}");
    }
    outcome
}
