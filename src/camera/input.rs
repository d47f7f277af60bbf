//! Viewport input adapter
//!
//! Owns the one mutable camera and translates window events into calls to the
//! pure camera update functions.

use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{MouseScrollDelta, WindowEvent};

use super::parallax::{apply_pointer, apply_wheel, ParallaxCamera};

/// Pixels scrolled per wheel line, matching browser line-mode deltas
pub const PIXELS_PER_LINE: f32 = 100.0;

/// Convert a winit wheel delta to a DOM-style `deltaY` in CSS pixels.
///
/// Positive means "scroll down" (wheel toward the user), which winit reports
/// as a negative vertical delta.
pub fn wheel_delta_y(delta: MouseScrollDelta, scale_factor: f64) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => -y * PIXELS_PER_LINE,
        MouseScrollDelta::PixelDelta(position) => {
            let scale = if scale_factor > 0.0 { scale_factor } else { 1.0 };
            (-position.y / scale) as f32
        }
    }
}

/// Pointer and wheel state for one viewport
#[derive(Debug, Clone)]
pub struct ViewportInput {
    camera: ParallaxCamera,
    size: PhysicalSize<u32>,
    scale_factor: f64,
}

impl ViewportInput {
    /// Create an adapter for a viewport of `size` physical pixels
    pub fn new(size: PhysicalSize<u32>, scale_factor: f64) -> Self {
        Self {
            camera: ParallaxCamera::default().with_aspect(size.width, size.height),
            size,
            scale_factor,
        }
    }

    /// Current camera
    pub fn camera(&self) -> &ParallaxCamera {
        &self.camera
    }

    /// Current viewport size in physical pixels
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Handle a window event. Returns true if the event updated the camera or viewport.
    pub fn handle_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::CursorMoved { position, .. } => self.on_cursor_moved(*position),
            WindowEvent::MouseWheel { delta, .. } => {
                self.on_wheel(*delta);
                true
            }
            WindowEvent::Resized(size) => {
                self.on_resize(*size);
                true
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.scale_factor = *scale_factor;
                true
            }
            _ => false,
        }
    }

    /// Pointer moved to `position` (physical pixels from the top-left corner)
    pub fn on_cursor_moved(&mut self, position: PhysicalPosition<f64>) -> bool {
        if self.size.width == 0 || self.size.height == 0 {
            return false;
        }
        let x = (position.x / self.size.width as f64) as f32;
        let y = (position.y / self.size.height as f64) as f32;
        self.camera = apply_pointer(self.camera, x, y);
        true
    }

    /// Wheel turned; the scroll is always consumed
    pub fn on_wheel(&mut self, delta: MouseScrollDelta) {
        let delta_y = wheel_delta_y(delta, self.scale_factor);
        self.camera = apply_wheel(self.camera, delta_y);
    }

    /// Viewport resized
    pub fn on_resize(&mut self, size: PhysicalSize<u32>) {
        self.size = size;
        self.camera = self.camera.with_aspect(size.width, size.height);
    }
}
