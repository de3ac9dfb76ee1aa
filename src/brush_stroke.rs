use eframe::egui::Pos2;

/// One continuous pointer drag. Only the last position is kept,
/// the pixels it leaves behind live in the layer buffer.
#[derive(Debug, Default)]
pub struct BrushStroke {
    last_pos: Option<Pos2>,
}

impl BrushStroke {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, pos: Pos2) {
        self.last_pos = Some(pos);
    }

    /// Moves the stroke to `new_pos` and returns the segment the brush needs to cover,
    /// or `None` if no stroke is in progress or the pointer did not move.
    pub fn update_stroke(&mut self, new_pos: Pos2) -> Option<(Pos2, Pos2)> {
        let start = self.last_pos?;
        if start == new_pos {
            return None;
        }
        self.last_pos = Some(new_pos);
        Some((start, new_pos))
    }

    pub fn clear_stroke(&mut self) {
        self.last_pos = None;
    }

    pub fn is_active(&self) -> bool {
        self.last_pos.is_some()
    }
}
