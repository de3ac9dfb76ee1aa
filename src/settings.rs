use eframe::egui::Color32;
use serde::{Deserialize, Serialize};

use crate::brush::{clamp_brush_size, Pen};

/// How layer visibility reacts to changing the active layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VisibilityPolicy {
    /// Visibility and "active for drawing" are unrelated.
    #[default]
    Independent,
    /// Only the active layer is shown, the previous one is hidden on every switch.
    Solo,
}

/// User preferences, persisted by eframe between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)] // older stored settings get defaults for new fields
pub struct Settings {
    pub canvas_width: usize,
    pub canvas_height: usize,
    pub brush_size: u32,
    pub pen_color: [u8; 4],
    pub visibility: VisibilityPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            canvas_width: 800,
            canvas_height: 600,
            brush_size: 5,
            pen_color: [0, 0, 0, 255],
            visibility: VisibilityPolicy::default(),
        }
    }
}

impl Settings {
    pub fn pen(&self) -> Pen {
        let [r, g, b, a] = self.pen_color;
        Pen::new(Color32::from_rgba_unmultiplied(r, g, b, a), self.brush_size)
    }

    pub fn remember_pen(&mut self, pen: &Pen) {
        self.pen_color = pen.color.to_srgba_unmultiplied();
        self.brush_size = clamp_brush_size(pen.size);
    }
}
