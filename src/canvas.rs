use std::path::Path;

use eframe::egui::{Color32, ColorImage, Pos2};
use image::RgbaImage;

use crate::brush::{clamp_brush_size, Pen, Tool};
use crate::brush_stroke::BrushStroke;
use crate::error::Result;
use crate::layer::{blend_over, Layer};
use crate::project::{self, Project, MAX_DIMENSION};
use crate::settings::{Settings, VisibilityPolicy};
use crate::surface::Surface;

/// Ordered layers (index = z-order) plus the drawing state applied to the active one.
#[derive(Debug)]
pub struct Canvas {
    width: usize,
    height: usize,
    layers: Vec<Layer>,
    active: Option<usize>,
    pen: Pen,
    tool: Tool,
    visibility: VisibilityPolicy,
    stroke: BrushStroke,
    revision: u64,
    max_dimension: u64,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            layers: Vec::new(),
            active: None,
            pen: Pen::default(),
            tool: Tool::Draw,
            visibility: VisibilityPolicy::default(),
            stroke: BrushStroke::new(),
            revision: 0,
            max_dimension: MAX_DIMENSION,
        }
    }

    pub fn with_settings(settings: &Settings) -> Self {
        let mut canvas = Self::new(settings.canvas_width, settings.canvas_height);
        canvas.pen = settings.pen();
        canvas.visibility = settings.visibility;
        canvas
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active_layer(&self) -> Option<&Layer> {
        self.active.and_then(|i| self.layers.get(i))
    }

    pub fn pen(&self) -> &Pen {
        &self.pen
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn visibility_policy(&self) -> VisibilityPolicy {
        self.visibility
    }

    /// Switching to [`VisibilityPolicy::Solo`] hides every layer but the active one.
    pub fn set_visibility_policy(&mut self, policy: VisibilityPolicy) {
        if policy == self.visibility {
            return;
        }
        log::info!("visibility policy {policy:?}");
        self.visibility = policy;
        if policy == VisibilityPolicy::Solo {
            for (i, layer) in self.layers.iter_mut().enumerate() {
                layer.set_visible(Some(i) == self.active);
            }
            self.revision += 1;
        }
    }

    pub fn max_dimension(&self) -> u64 {
        self.max_dimension
    }

    /// Lowers the largest width or height `load` accepts, e.g. to the GPU texture limit.
    pub fn set_max_dimension(&mut self, limit: u64) {
        self.max_dimension = limit.min(MAX_DIMENSION);
    }

    /// Appends a blank layer on top and makes it the active one. Returns its index.
    pub fn add_layer(&mut self) -> usize {
        let index = self.layers.len();
        let name = format!("Layer {}", index + 1);
        log::info!("adding {name} ({}x{})", self.width, self.height);
        self.layers.push(Layer::new(name, index, self.width, self.height));
        self.set_active(Some(index));
        index
    }

    /// Makes `index` the active layer, out of range indices are ignored.
    pub fn select_layer(&mut self, index: usize) -> bool {
        if index >= self.layers.len() {
            log::warn!("ignoring selection of layer {index}, only {} exist", self.layers.len());
            return false;
        }
        self.set_active(Some(index));
        true
    }

    fn set_active(&mut self, index: Option<usize>) {
        if self.visibility == VisibilityPolicy::Solo {
            if let Some(previous) = self.active.and_then(|i| self.layers.get_mut(i)) {
                previous.set_visible(false);
            }
            if let Some(next) = index.and_then(|i| self.layers.get_mut(i)) {
                next.set_visible(true);
            }
        }
        // a stroke never continues on another layer
        self.stroke.clear_stroke();
        self.active = index;
        self.revision += 1;
    }

    /// Removes the layer at `index`. The active layer keeps pointing at the same
    /// layer, or at its neighbour when it is the one removed.
    pub fn remove_layer(&mut self, index: usize) -> Option<Layer> {
        if index >= self.layers.len() {
            return None;
        }
        let removed = self.layers.remove(index);
        log::info!("removed {}", removed.name());
        for (z_order, layer) in self.layers.iter_mut().enumerate().skip(index) {
            layer.set_z_order(z_order);
        }
        match self.active {
            Some(active) if active == index => {
                self.active = None;
                let neighbour = (!self.layers.is_empty()).then(|| index.min(self.layers.len() - 1));
                self.set_active(neighbour);
            }
            Some(active) if active > index => {
                self.active = Some(active - 1);
                self.revision += 1;
            }
            _ => self.revision += 1,
        }
        Some(removed)
    }

    /// Drops every layer.
    pub fn clear(&mut self) {
        log::info!("clearing {} layers", self.layers.len());
        self.layers.clear();
        self.active = None;
        self.stroke.clear_stroke();
        self.revision += 1;
    }

    pub fn set_layer_visible(&mut self, index: usize, visible: bool) -> bool {
        self.with_layer(index, |layer| layer.set_visible(visible))
    }

    pub fn set_layer_opacity(&mut self, index: usize, opacity: f32) -> bool {
        self.with_layer(index, |layer| layer.set_opacity(opacity))
    }

    pub fn rename_layer(&mut self, index: usize, name: impl Into<String>) -> bool {
        let name = name.into();
        self.with_layer(index, |layer| layer.set_name(name))
    }

    fn with_layer(&mut self, index: usize, change: impl FnOnce(&mut Layer)) -> bool {
        match self.layers.get_mut(index) {
            Some(layer) => {
                change(layer);
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    /// Sets the pen color and goes back to drawing.
    pub fn set_pen_color(&mut self, color: Color32) {
        log::debug!("pen color {color:?}");
        self.pen.color = color;
        self.tool = Tool::Draw;
    }

    pub fn set_brush_size(&mut self, size: u32) {
        self.pen.size = clamp_brush_size(size);
        log::debug!("brush size {}", self.pen.size);
    }

    pub fn enable_eraser(&mut self) {
        log::debug!("eraser enabled");
        self.tool = Tool::Erase;
    }

    pub fn enable_pen(&mut self) {
        log::debug!("pen enabled");
        self.tool = Tool::Draw;
    }

    fn clamp_to_bounds(&self, pos: Pos2) -> Pos2 {
        pos.clamp(Pos2::ZERO, Pos2::new(self.width as f32, self.height as f32))
    }

    /// Starts a stroke at `pos`, canvas coordinates.
    pub fn pointer_pressed(&mut self, pos: Pos2) {
        if self.active.is_none() {
            return;
        }
        let pos = self.clamp_to_bounds(pos);
        self.stroke.begin(pos);
    }

    /// Continues the stroke to `pos` on the active layer while the primary button is held.
    pub fn pointer_moved(&mut self, pos: Pos2, primary_held: bool) {
        if !primary_held {
            return;
        }
        let pos = self.clamp_to_bounds(pos);
        let Some(layer) = self.active.and_then(|i| self.layers.get_mut(i)) else {
            return;
        };
        let Some((start, end)) = self.stroke.update_stroke(pos) else {
            return;
        };
        match self.tool {
            Tool::Draw => layer.draw(start, end, self.pen.color, self.pen.width()),
            Tool::Erase => layer.erase(start, end, self.pen.width()),
        }
        self.revision += 1;
    }

    pub fn pointer_released(&mut self) {
        self.stroke.clear_stroke();
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        project::save(self, path)
    }

    /// Replaces size and layers with the project at `path`.
    /// On error the canvas is left untouched.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let project = project::load_limited(path, self.max_dimension)?;
        self.replace_with(project);
        Ok(())
    }

    pub fn replace_with(&mut self, project: Project) {
        self.width = project.width;
        self.height = project.height;
        self.layers = project.layers;
        self.active = None;
        let last = self.layers.len().checked_sub(1);
        self.set_active(last);
    }
}

impl Surface for Canvas {
    fn dims(&self) -> [usize; 2] {
        [self.width, self.height]
    }

    fn revision(&self) -> u64 {
        self.revision
    }

    /// Visible layers composited bottom to top with their opacity.
    fn render(&self) -> ColorImage {
        let mut out = RgbaImage::new(self.width as u32, self.height as u32);
        for layer in self.layers.iter().filter(|l| l.is_visible() && l.opacity() > 0.) {
            for (dst, src) in out.pixels_mut().zip(layer.pixels().pixels()) {
                if src[3] == 0 {
                    continue;
                }
                let alpha = src[3] as f32 / u8::MAX as f32 * layer.opacity();
                blend_over(dst, [src[0], src[1], src[2]], alpha);
            }
        }
        ColorImage::from_rgba_unmultiplied(self.dims(), out.as_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroke(canvas: &mut Canvas, from: (f32, f32), to: (f32, f32)) {
        canvas.pointer_pressed(Pos2::new(from.0, from.1));
        canvas.pointer_moved(Pos2::new(to.0, to.1), true);
        canvas.pointer_released();
    }

    #[test]
    fn add_layer_activates_it_with_next_z_order() {
        let mut canvas = Canvas::new(10, 10);
        assert_eq!(canvas.active_index(), None);
        assert_eq!(canvas.add_layer(), 0);
        assert_eq!(canvas.add_layer(), 1);
        assert_eq!(canvas.active_index(), Some(1));
        assert_eq!(canvas.layers()[1].z_order(), 1);
        assert_eq!(canvas.layers()[1].name(), "Layer 2");
        assert!(canvas.layers()[1].is_blank());
        assert_eq!(canvas.layers()[1].dims(), [10, 10]);
        // independent visibility keeps older layers shown
        assert!(canvas.layers().iter().all(|l| l.is_visible()));
    }

    #[test]
    fn solo_policy_hides_the_previous_active_layer() {
        let mut canvas = Canvas::new(10, 10);
        canvas.set_visibility_policy(VisibilityPolicy::Solo);
        canvas.add_layer();
        canvas.add_layer();
        assert!(!canvas.layers()[0].is_visible());
        assert!(canvas.layers()[1].is_visible());
        canvas.select_layer(0);
        assert!(canvas.layers()[0].is_visible());
        assert!(!canvas.layers()[1].is_visible());
    }

    #[test]
    fn switching_to_solo_keeps_only_the_active_layer_shown() {
        let mut canvas = Canvas::new(10, 10);
        for _ in 0..3 {
            canvas.add_layer();
        }
        canvas.select_layer(1);
        canvas.set_layer_visible(1, false);
        canvas.set_visibility_policy(VisibilityPolicy::Solo);
        assert_eq!(canvas.visibility_policy(), VisibilityPolicy::Solo);
        assert_eq!(canvas.layers().iter().map(|l| l.is_visible()).collect::<Vec<_>>(), vec![false, true, false]);

        canvas.set_visibility_policy(VisibilityPolicy::Independent);
        canvas.select_layer(2);
        assert_eq!(canvas.layers().iter().map(|l| l.is_visible()).collect::<Vec<_>>(), vec![false, true, false]);
    }

    #[test]
    fn out_of_range_selection_is_ignored() {
        let mut canvas = Canvas::new(10, 10);
        assert!(!canvas.select_layer(0));
        canvas.add_layer();
        canvas.add_layer();
        assert!(canvas.select_layer(0));
        assert!(!canvas.select_layer(2));
        assert!(!canvas.select_layer(usize::MAX));
        assert_eq!(canvas.active_index(), Some(0));
    }

    #[test]
    fn tool_state_machine() {
        let mut canvas = Canvas::new(10, 10);
        assert_eq!(canvas.tool(), Tool::Draw);
        canvas.enable_eraser();
        assert_eq!(canvas.tool(), Tool::Erase);
        assert_eq!(canvas.pen().color, Color32::BLACK);
        canvas.set_brush_size(12);
        assert_eq!(canvas.tool(), Tool::Erase);
        canvas.set_pen_color(Color32::RED);
        assert_eq!(canvas.tool(), Tool::Draw);
        canvas.enable_eraser();
        canvas.enable_pen();
        assert_eq!(canvas.tool(), Tool::Draw);
        assert_eq!(canvas.pen().color, Color32::RED);
        assert_eq!(canvas.pen().size, 12);
        canvas.set_brush_size(0);
        assert_eq!(canvas.pen().size, 1);
        canvas.set_brush_size(500);
        assert_eq!(canvas.pen().size, 100);
    }

    #[test]
    fn drag_draws_then_erases_on_active_layer_only() {
        let mut canvas = Canvas::new(40, 40);
        canvas.add_layer();
        canvas.add_layer();
        canvas.set_pen_color(Color32::RED);
        canvas.set_brush_size(4);
        stroke(&mut canvas, (5., 20.), (35., 20.));
        assert!(canvas.layers()[0].is_blank());
        assert_eq!(canvas.layers()[1].pixel(20, 20), Some([255, 0, 0, 255]));

        canvas.enable_eraser();
        canvas.set_brush_size(10);
        stroke(&mut canvas, (0., 20.), (40., 20.));
        assert!(canvas.layers()[1].is_blank());
    }

    #[test]
    fn moves_without_button_or_press_do_nothing() {
        let mut canvas = Canvas::new(20, 20);
        canvas.add_layer();
        canvas.pointer_moved(Pos2::new(10., 10.), true);
        canvas.pointer_pressed(Pos2::new(2., 2.));
        canvas.pointer_moved(Pos2::new(18., 18.), false);
        assert!(canvas.layers()[0].is_blank());

        let mut empty = Canvas::new(20, 20);
        empty.pointer_pressed(Pos2::new(2., 2.));
        empty.pointer_moved(Pos2::new(18., 18.), true);
        assert!(empty.layers().is_empty());
    }

    #[test]
    fn drag_is_clamped_to_canvas() {
        let mut canvas = Canvas::new(20, 20);
        canvas.add_layer();
        stroke(&mut canvas, (-100., 10.5), (500., 10.5));
        let layer = &canvas.layers()[0];
        assert_eq!(layer.pixel(0, 10).map(|p| p[3]), Some(255));
        assert_eq!(layer.pixel(19, 10).map(|p| p[3]), Some(255));
    }

    #[test]
    fn remove_layer_keeps_active_consistent() {
        let mut canvas = Canvas::new(5, 5);
        for _ in 0..3 {
            canvas.add_layer();
        }
        canvas.select_layer(2);
        assert_eq!(canvas.remove_layer(0).map(|l| l.name().to_owned()), Some("Layer 1".to_owned()));
        assert_eq!(canvas.active_index(), Some(1));
        assert_eq!(canvas.active_layer().map(|l| l.name()), Some("Layer 3"));
        canvas.remove_layer(1);
        assert_eq!(canvas.active_index(), Some(0));
        assert!(canvas.remove_layer(5).is_none());
        canvas.remove_layer(0);
        assert_eq!(canvas.active_index(), None);
        assert!(canvas.layers().is_empty());
        canvas.add_layer();
        assert_eq!(canvas.layers()[0].z_order(), 0);
    }

    #[test]
    fn z_order_follows_position_after_removal() {
        let mut canvas = Canvas::new(5, 5);
        for _ in 0..4 {
            canvas.add_layer();
        }
        canvas.remove_layer(1);
        canvas.remove_layer(0);
        assert_eq!(canvas.layers().iter().map(|l| l.z_order()).collect::<Vec<_>>(), vec![0, 1]);
        canvas.add_layer();
        assert_eq!(canvas.layers().iter().map(|l| l.z_order()).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn holding_the_pointer_still_does_not_repaint() {
        let mut canvas = Canvas::new(40, 40);
        canvas.add_layer();
        canvas.set_pen_color(Color32::from_rgba_unmultiplied(255, 0, 0, 64));
        canvas.pointer_pressed(Pos2::new(5., 20.));
        canvas.pointer_moved(Pos2::new(20., 20.), true);
        let after_move = canvas.layers()[0].pixel(20, 20);
        let revision = canvas.revision();
        for _ in 0..10 {
            canvas.pointer_moved(Pos2::new(20., 20.), true);
        }
        assert_eq!(canvas.layers()[0].pixel(20, 20), after_move);
        assert_eq!(canvas.revision(), revision);

        canvas.enable_eraser();
        canvas.pointer_moved(Pos2::new(20., 20.), true);
        assert_eq!(canvas.layers()[0].pixel(20, 20), after_move);
    }

    #[test]
    fn load_refuses_projects_above_the_dimension_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.json");
        let mut wide = Canvas::new(64, 16);
        wide.add_layer();
        wide.save(&path).unwrap();

        let mut canvas = Canvas::new(8, 8);
        canvas.add_layer();
        canvas.set_max_dimension(32);
        assert_eq!(canvas.max_dimension(), 32);
        assert!(matches!(
            canvas.load(&path),
            Err(crate::error::ProjectError::InvalidDimensions { width: 64, height: 16 })
        ));
        assert_eq!((canvas.width(), canvas.height()), (8, 8));
        assert_eq!(canvas.layers().len(), 1);

        canvas.set_max_dimension(u64::MAX);
        assert_eq!(canvas.max_dimension(), MAX_DIMENSION);
        canvas.load(&path).unwrap();
        assert_eq!((canvas.width(), canvas.height()), (64, 16));
    }

    #[test]
    fn clear_drops_everything() {
        let mut canvas = Canvas::new(5, 5);
        canvas.add_layer();
        canvas.add_layer();
        canvas.clear();
        assert!(canvas.layers().is_empty());
        assert_eq!(canvas.active_index(), None);
    }

    #[test]
    fn composite_respects_visibility_opacity_and_order() {
        let mut canvas = Canvas::new(10, 10);
        canvas.add_layer();
        canvas.set_pen_color(Color32::BLUE);
        canvas.set_brush_size(20);
        stroke(&mut canvas, (4., 4.), (6., 6.));
        canvas.add_layer();
        canvas.set_pen_color(Color32::RED);
        stroke(&mut canvas, (4., 4.), (6., 6.));

        let top = canvas.render();
        assert_eq!(top.size, [10, 10]);
        assert_eq!(top[(3, 3)], Color32::RED);

        canvas.set_layer_opacity(1, 0.);
        assert_eq!(canvas.render()[(3, 3)], Color32::BLUE);

        canvas.set_layer_opacity(1, 1.);
        canvas.set_layer_visible(1, false);
        assert_eq!(canvas.render()[(3, 3)], Color32::BLUE);

        canvas.set_layer_visible(0, false);
        assert_eq!(canvas.render()[(3, 3)], Color32::TRANSPARENT);
    }

    #[test]
    fn revision_tracks_changes() {
        let mut canvas = Canvas::new(10, 10);
        let start = canvas.revision();
        canvas.add_layer();
        let after_add = canvas.revision();
        assert!(after_add > start);
        stroke(&mut canvas, (1., 1.), (8., 8.));
        assert!(canvas.revision() > after_add);
        assert!(canvas.rename_layer(0, "Ink"));
        assert_eq!(canvas.layers()[0].name(), "Ink");
        assert!(!canvas.rename_layer(3, "Nope"));
    }
}
