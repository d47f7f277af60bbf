//! Blend policy for layer compositing
//!
//! Layer fragments are premultiplied by the shader, so every layer is
//! composited with the premultiplied "over" operator:
//! Result = Source × 1 + Dest × (1 - SourceAlpha), for both color and alpha.
//! There is no depth attachment; layers composite in draw order.

/// Premultiplied source-over for a single channel group
const PREMULTIPLIED_OVER: wgpu::BlendComponent = wgpu::BlendComponent {
    src_factor: wgpu::BlendFactor::One,
    dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
    operation: wgpu::BlendOperation::Add,
};

/// Blend state shared by every layer
pub const LAYER_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: PREMULTIPLIED_OVER,
    alpha: PREMULTIPLIED_OVER,
};

/// Layer meshes are visible from both sides
pub const LAYER_CULL_MODE: Option<wgpu::Face> = None;
