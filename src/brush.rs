use eframe::egui::Color32;
use serde::{Deserialize, Serialize};

pub const MIN_BRUSH_SIZE: u32 = 1;
pub const MAX_BRUSH_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tool {
    #[default]
    Draw,
    Erase,
}

/// Stroke parameters shared by the pen and the eraser.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pen {
    pub color: Color32,
    pub size: u32,
}

impl Pen {
    pub fn new(color: Color32, size: u32) -> Self {
        Self { color, size: clamp_brush_size(size) }
    }

    pub fn width(&self) -> f32 {
        self.size as f32
    }
}

impl Default for Pen {
    fn default() -> Self {
        Self::new(Color32::BLACK, 5)
    }
}

pub fn clamp_brush_size(size: u32) -> u32 {
    size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE)
}
