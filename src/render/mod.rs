//! GPU rendering of the layer scene
//!
//! `SceneRenderer` turns a [`crate::compositor::Scene`] into GPU resources and
//! records frames; `RenderDriver` owns the window and repaints continuously.

pub mod atlas;
pub mod driver;
pub mod mesh;
pub mod renderer;

pub use atlas::AtlasTexture;
pub use driver::{window_attributes, DriverError, RenderDriver, RenderHandle, WINDOW_TITLE};
pub use mesh::LayerVertex;
pub use renderer::SceneRenderer;
