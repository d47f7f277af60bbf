//! Vertex format for layer meshes

use bytemuck::{Pod, Zeroable};

use crate::assets::LayerGeometry;

/// Vertex for a layer mesh
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct LayerVertex {
    /// Position in rig space
    pub position: [f32; 3],
    /// Atlas texture coordinates
    pub uv: [f32; 2],
}

impl LayerVertex {
    /// Size of vertex in bytes
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    /// Vertex buffer layout for wgpu
    pub fn buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: Self::SIZE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // position
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // uv
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }

    /// Interleave positions and texture coordinates of a decoded mesh
    pub fn from_geometry(geometry: &LayerGeometry) -> Vec<Self> {
        geometry
            .positions
            .iter()
            .enumerate()
            .map(|(i, position)| Self {
                position: *position,
                uv: geometry.uvs.get(i).copied().unwrap_or([0.0, 0.0]),
            })
            .collect()
    }
}
