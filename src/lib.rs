#![warn(clippy::all, rust_2018_idioms)]

pub mod actions;
pub mod app;
pub mod brush;
pub mod brush_stroke;
pub mod canvas;
pub mod error;
pub mod layer;
pub mod project;
pub mod raster;
pub mod settings;
pub mod surface;

pub use actions::{dispatch, Action, Outcome};
pub use app::StudioApp;
pub use brush::{Pen, Tool};
pub use canvas::Canvas;
pub use error::{ContentError, ProjectError, Result};
pub use layer::Layer;
pub use project::Project;
pub use settings::{Settings, VisibilityPolicy};
pub use surface::Surface;
