//! Project files: the canvas size plus every layer, in z-order, as JSON.
//!
//! ```text
//! { "width": 800, "height": 600,
//!   "layers": [ { "name": "Layer 1", "opacity": 1.0, "visible": true, "content": "<base64 png>" } ] }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::canvas::Canvas;
use crate::error::{ProjectError, Result};
use crate::layer::{clamp_opacity, Layer};

pub const MAX_DIMENSION: u64 = 16384;

#[derive(Debug, Serialize, Deserialize)]
struct ProjectFile {
    width: u64,
    height: u64,
    #[serde(default, deserialize_with = "lenient_layers")]
    layers: Vec<LayerRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LayerRecord {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_name")]
    name: Option<String>,
    #[serde(default = "default_opacity", deserialize_with = "lenient_opacity")]
    opacity: f32,
    #[serde(default = "default_visible", deserialize_with = "lenient_visible")]
    visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

fn default_opacity() -> f32 {
    1.
}

fn default_visible() -> bool {
    true
}

fn lenient_opacity<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f32, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value.as_f64() {
        Some(opacity) => clamp_opacity(opacity as f32),
        None => {
            log::warn!("ignoring non-numeric layer opacity {value}");
            default_opacity()
        }
    })
}

fn lenient_visible<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value.as_bool() {
        Some(visible) => visible,
        None => {
            log::warn!("ignoring non-boolean layer visibility {value}");
            default_visible()
        }
    })
}

fn lenient_name<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(name) => Some(name),
        serde_json::Value::Null => None,
        other => {
            log::warn!("ignoring non-string layer name {other}");
            None
        }
    })
}

fn lenient_layers<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<LayerRecord>, D::Error> {
    Ok(Option::<Vec<LayerRecord>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A fully decoded project, ready to replace the layers of a canvas.
#[derive(Debug, PartialEq)]
pub struct Project {
    pub width: usize,
    pub height: usize,
    pub layers: Vec<Layer>,
}

impl Project {
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_json_limited(json, MAX_DIMENSION)
    }

    /// Like [`Project::from_json`], refusing either side above `max_dimension`
    /// (itself capped at [`MAX_DIMENSION`]).
    pub fn from_json_limited(json: &str, max_dimension: u64) -> Result<Self> {
        let max = max_dimension.min(MAX_DIMENSION);
        let file: ProjectFile = serde_json::from_str(json)?;
        if file.width == 0 || file.height == 0 || file.width > max || file.height > max {
            return Err(ProjectError::InvalidDimensions { width: file.width, height: file.height });
        }
        let dims = [file.width as usize, file.height as usize];
        let mut layers = Vec::with_capacity(file.layers.len());
        for (i, record) in file.layers.into_iter().enumerate() {
            let name = record.name.unwrap_or_else(|| format!("Layer {}", i + 1));
            let mut layer = match record.content {
                Some(content) => {
                    let pixels = Layer::decode_content(&content, dims)
                        .map_err(|source| ProjectError::InvalidContent { layer: i, source })?;
                    Layer::from_pixels(name, i, pixels)
                }
                None => {
                    log::warn!("layer {i} has no content, loading it blank");
                    Layer::new(name, i, dims[0], dims[1])
                }
            };
            layer.set_opacity(record.opacity);
            layer.set_visible(record.visible);
            layers.push(layer);
        }
        Ok(Self { width: dims[0], height: dims[1], layers })
    }

    pub fn to_json(canvas: &Canvas) -> Result<String> {
        let mut layers = Vec::with_capacity(canvas.layers().len());
        for layer in canvas.layers() {
            layers.push(LayerRecord {
                name: Some(layer.name().to_owned()),
                opacity: layer.opacity(),
                visible: layer.is_visible(),
                content: Some(layer.encode_content()?),
            });
        }
        let file = ProjectFile {
            width: canvas.width() as u64,
            height: canvas.height() as u64,
            layers,
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }
}

pub fn save(canvas: &Canvas, path: &Path) -> Result<()> {
    let json = Project::to_json(canvas)?;
    fs::write(path, json).map_err(|source| ProjectError::Io { path: path.to_owned(), source })?;
    log::info!("saved {} layers to {}", canvas.layers().len(), path.display());
    Ok(())
}

pub fn load(path: &Path) -> Result<Project> {
    load_limited(path, MAX_DIMENSION)
}

pub fn load_limited(path: &Path, max_dimension: u64) -> Result<Project> {
    let json = fs::read_to_string(path).map_err(|source| ProjectError::Io { path: path.to_owned(), source })?;
    let project = Project::from_json_limited(&json, max_dimension)?;
    log::info!(
        "loaded {}x{} project with {} layers from {}",
        project.width,
        project.height,
        project.layers.len(),
        path.display()
    );
    Ok(project)
}
