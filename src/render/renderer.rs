//! Scene renderer
//!
//! Draws every layer of a [`Scene`] in order within a single render pass,
//! using one pipeline and one bind group (camera, atlas, sampler). The pass
//! renders into a 4x multisampled target that resolves into the frame.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::atlas::AtlasTexture;
use super::mesh::LayerVertex;
use crate::camera::ParallaxCamera;
use crate::compositor::Scene;
use crate::gpu_context::{GpuContext, GpuError};
use crate::shaders::{create_layer_shader, LAYER_FS_ENTRY, LAYER_VS_ENTRY};

/// Samples per pixel of the layer render target
pub const MSAA_SAMPLE_COUNT: u32 = 4;

/// Camera uniform buffer data
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct CameraUniforms {
    view_proj: [[f32; 4]; 4],
}

/// Vertex and index buffers for one layer
struct LayerBuffers {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

/// Multisampled color target, sized to the surface
struct MsaaTarget {
    view: wgpu::TextureView,
    size: (u32, u32),
}

impl MsaaTarget {
    fn new(device: &wgpu::Device, format: wgpu::TextureFormat, size: (u32, u32)) -> Self {
        let texture = device.create_texture(&msaa_descriptor(format, size));
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { view, size }
    }
}

fn msaa_descriptor(
    format: wgpu::TextureFormat,
    (width, height): (u32, u32),
) -> wgpu::TextureDescriptor<'static> {
    wgpu::TextureDescriptor {
        label: Some("Layer MSAA Target"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: MSAA_SAMPLE_COUNT,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    }
}

/// GPU renderer for a built scene
pub struct SceneRenderer {
    pipeline: wgpu::RenderPipeline,
    format: wgpu::TextureFormat,
    msaa: MsaaTarget,
    camera_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    /// Kept alive for the bind group
    _atlas: AtlasTexture,
    /// One entry per scene layer, in draw order; `None` for empty meshes
    layers: Vec<Option<LayerBuffers>>,
}

impl SceneRenderer {
    /// Upload the scene and build the layer pipeline for `gpu.render_format`
    /// at the surface `size` in physical pixels
    pub fn new(gpu: &GpuContext, scene: &Scene, size: (u32, u32)) -> Result<Self, GpuError> {
        let device = &gpu.device;
        let shader = create_layer_shader(device);

        // Bind group layout: [0] camera uniforms, [1] atlas texture, [2] sampler
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Layer Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Layer Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let material = scene.material();
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Layer Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some(LAYER_VS_ENTRY),
                buffers: &[LayerVertex::buffer_layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some(LAYER_FS_ENTRY),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.render_format,
                    blend: Some(material.blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: material.cull_mode(),
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            // Layers composite purely by draw order
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: MSAA_SAMPLE_COUNT,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Layer Camera Buffer"),
            size: std::mem::size_of::<CameraUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let atlas = AtlasTexture::upload(gpu, scene.atlas())?;

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Layer Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(atlas.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(atlas.sampler()),
                },
            ],
        });

        let layers = scene
            .layers()
            .iter()
            .map(|layer| {
                let geometry = layer.geometry();
                if geometry.indices.is_empty() {
                    tracing::warn!(index = layer.index(), "Layer mesh has no triangles");
                    return None;
                }

                let vertices = LayerVertex::from_geometry(geometry);
                let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Layer Vertex Buffer"),
                    contents: bytemuck::cast_slice(&vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                });
                let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Layer Index Buffer"),
                    contents: bytemuck::cast_slice(&geometry.indices),
                    usage: wgpu::BufferUsages::INDEX,
                });

                Some(LayerBuffers {
                    vertex_buffer,
                    index_buffer,
                    index_count: geometry.indices.len() as u32,
                })
            })
            .collect::<Vec<_>>();

        tracing::info!(
            layers = layers.len(),
            format = ?gpu.render_format,
            samples = MSAA_SAMPLE_COUNT,
            "Scene uploaded to GPU"
        );

        Ok(Self {
            pipeline,
            format: gpu.render_format,
            msaa: MsaaTarget::new(device, gpu.render_format, size),
            camera_buffer,
            bind_group,
            _atlas: atlas,
            layers,
        })
    }

    /// Number of layers drawn each frame
    pub fn layer_count(&self) -> usize {
        self.layers.iter().flatten().count()
    }

    /// Recreate the multisampled target for a new surface size
    pub fn resize(&mut self, device: &wgpu::Device, size: (u32, u32)) {
        if size.0 == 0 || size.1 == 0 || size == self.msaa.size {
            return;
        }
        self.msaa = MsaaTarget::new(device, self.format, size);
    }

    /// Size of the multisampled target in physical pixels
    pub fn target_size(&self) -> (u32, u32) {
        self.msaa.size
    }

    /// Record one frame: clear to transparent, draw every layer in order, then
    /// resolve into `target`, which must match the size passed to `resize`
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        queue: &wgpu::Queue,
        target: &wgpu::TextureView,
        camera: &ParallaxCamera,
    ) {
        let uniforms = CameraUniforms {
            view_proj: camera.view_projection_matrix().to_cols_array_2d(),
        };
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&uniforms));

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Layer Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.msaa.view,
                resolve_target: Some(target),
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    // Only the resolved frame is presented
                    store: wgpu::StoreOp::Discard,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);

        for buffers in self.layers.iter().flatten() {
            render_pass.set_vertex_buffer(0, buffers.vertex_buffer.slice(..));
            render_pass.set_index_buffer(buffers.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..buffers.index_count, 0, 0..1);
        }
    }
}
