use eframe::egui::{self, ColorImage, Vec2};

/// Anything the UI can turn into a texture.
pub trait Surface {
    fn dims(&self) -> [usize; 2];

    /// Changes whenever the rendered image would change.
    fn revision(&self) -> u64;

    fn render(&self) -> ColorImage;

    fn size(&self) -> egui::Vec2 {
        let [w, h] = self.dims();
        Vec2::new(w as f32, h as f32)
    }

    fn aspect_ratio(&self) -> f32 {
        let [w, h] = self.dims();
        if h == 0 {
            return 1.;
        }
        w as f32 / h as f32
    }
}
