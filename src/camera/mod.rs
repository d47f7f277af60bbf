//! Parallax camera and its viewport input adapter

pub mod input;
pub mod parallax;

pub use input::{wheel_delta_y, ViewportInput};
pub use parallax::{apply_pointer, apply_wheel, ParallaxCamera};
