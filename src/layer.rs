use std::fmt;
use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use eframe::egui::{Color32, ColorImage, Pos2};
use image::{ImageFormat, Rgba, RgbaImage};

use crate::error::{ContentError, ProjectError};
use crate::raster::Raster;
use crate::surface::Surface;

/// An offscreen RGBA buffer (straight alpha) with its compositing properties.
#[derive(Clone)]
pub struct Layer {
    name: String,
    z_order: usize,
    visible: bool,
    opacity: f32,
    pixels: RgbaImage,
    revision: u64,
}

impl Layer {
    /// A fully transparent layer.
    pub fn new(name: impl Into<String>, z_order: usize, width: usize, height: usize) -> Self {
        Self::from_pixels(name, z_order, RgbaImage::new(width as u32, height as u32))
    }

    pub fn from_pixels(name: impl Into<String>, z_order: usize, pixels: RgbaImage) -> Self {
        Self {
            name: name.into(),
            z_order,
            visible: true,
            opacity: 1.,
            pixels,
            revision: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.revision += 1;
    }

    pub fn z_order(&self) -> usize {
        self.z_order
    }

    pub(crate) fn set_z_order(&mut self, z_order: usize) {
        self.z_order = z_order;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        if self.visible != visible {
            self.visible = visible;
            self.revision += 1;
        }
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = clamp_opacity(opacity);
        self.revision += 1;
    }

    pub fn width(&self) -> usize {
        self.pixels.width() as usize
    }

    pub fn height(&self) -> usize {
        self.pixels.height() as usize
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Straight-alpha RGBA at `(x, y)`, `None` outside the buffer.
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        self.pixels.get_pixel_checked(x as u32, y as u32).map(|p| p.0)
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.pixels().all(|p| p[3] == 0)
    }

    /// Paints an antialiased round-capped line over the existing pixels.
    pub fn draw(&mut self, start: Pos2, end: Pos2, color: Color32, width: f32) {
        let Some(raster) = Raster::segment(start, end, width, self.dims()) else {
            return;
        };
        let [r, g, b, a] = color.to_srgba_unmultiplied();
        let color_alpha = a as f32 / u8::MAX as f32;
        for ((x, y), coverage) in raster.covered() {
            let alpha = coverage as f32 / u8::MAX as f32 * color_alpha;
            blend_over(self.pixels.get_pixel_mut(x as u32, y as u32), [r, g, b], alpha);
        }
        self.revision += 1;
    }

    /// Clears pixels along a round-capped line instead of painting over them.
    pub fn erase(&mut self, start: Pos2, end: Pos2, width: f32) {
        let Some(raster) = Raster::segment(start, end, width, self.dims()) else {
            return;
        };
        for ((x, y), coverage) in raster.covered() {
            let pixel = self.pixels.get_pixel_mut(x as u32, y as u32);
            let keep = 1. - coverage as f32 / u8::MAX as f32;
            let alpha = (pixel[3] as f32 * keep).round() as u8;
            if alpha == 0 {
                *pixel = Rgba([0; 4]);
            } else {
                pixel[3] = alpha;
            }
        }
        self.revision += 1;
    }

    /// Base64 of a PNG holding the raw buffer.
    pub fn encode_content(&self) -> Result<String, ProjectError> {
        let mut bytes = Vec::new();
        self.pixels.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(BASE64_STANDARD.encode(bytes))
    }

    /// Inverse of [`Layer::encode_content`], the decoded buffer must be exactly `dims`.
    pub fn decode_content(content: &str, dims: [usize; 2]) -> Result<RgbaImage, ContentError> {
        let bytes = BASE64_STANDARD.decode(content.trim())?;
        let pixels = image::load_from_memory_with_format(&bytes, ImageFormat::Png)?.into_rgba8();
        let found = [pixels.width() as usize, pixels.height() as usize];
        if found != dims {
            return Err(ContentError::SizeMismatch { expected: dims, found });
        }
        Ok(pixels)
    }
}

impl Surface for Layer {
    fn dims(&self) -> [usize; 2] {
        [self.width(), self.height()]
    }

    fn revision(&self) -> u64 {
        self.revision
    }

    fn render(&self) -> ColorImage {
        ColorImage::from_rgba_unmultiplied(self.dims(), self.pixels.as_raw())
    }
}

impl PartialEq for Layer {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.z_order == other.z_order
            && self.visible == other.visible
            && self.opacity == other.opacity
            && self.pixels == other.pixels
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("name", &self.name)
            .field("z_order", &self.z_order)
            .field("visible", &self.visible)
            .field("opacity", &self.opacity)
            .field("dims", &self.dims())
            .field("pixels", &"<pixels>")
            .finish()
    }
}

pub fn clamp_opacity(opacity: f32) -> f32 {
    if opacity.is_nan() {
        1.
    } else {
        opacity.clamp(0., 1.)
    }
}

/// Source-over compositing of a straight-alpha color onto a straight-alpha pixel.
pub(crate) fn blend_over(dst: &mut Rgba<u8>, src: [u8; 3], src_alpha: f32) {
    if src_alpha <= 0. {
        return;
    }
    let dst_alpha = dst[3] as f32 / u8::MAX as f32;
    let out_alpha = src_alpha + dst_alpha * (1. - src_alpha);
    for c in 0..3 {
        let val = (src[c] as f32 * src_alpha + dst[c] as f32 * dst_alpha * (1. - src_alpha)) / out_alpha;
        dst[c] = val.round().clamp(0., u8::MAX as f32) as u8;
    }
    dst[3] = (out_alpha * u8::MAX as f32).round() as u8;
}
