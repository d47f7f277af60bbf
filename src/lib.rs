//! Light-Field Viewer Library
//!
//! Loads a texture atlas and a stack of layer meshes, composites them back to
//! front with premultiplied alpha, and renders the result through a parallax
//! camera driven by pointer and wheel input.

pub mod assets;
pub mod camera;
pub mod compositor;
pub mod gpu_context;
pub mod render;
pub mod settings;
pub mod shaders;
pub mod telemetry;

pub use assets::{
    join_ordered, AssetManifest, LayerGeometry, LoadError, LoadedAssets, ResourceFetcher,
    TextureAtlas, NUM_LAYERS,
};
pub use camera::{ParallaxCamera, ViewportInput};
pub use compositor::{Layer, LayerCompositor, LayerMaterial, Scene};
pub use gpu_context::{GpuContext, GpuError, SurfaceContext};
pub use render::{RenderDriver, RenderHandle, SceneRenderer};
pub use settings::{SettingsError, ViewerSettings};
