//! Layer compositing
//!
//! Turns the loaded atlas and meshes into a [`Scene`]: one layer per mesh, in
//! index order, all drawn with the same premultiplied-alpha material.

pub mod blend;
pub mod layer;
pub mod scene;

pub use blend::LAYER_BLEND;
pub use layer::{Layer, LayerMaterial};
pub use scene::{LayerCompositor, Scene};
