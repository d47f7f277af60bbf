//! GPU upload of the texture atlas

use crate::assets::TextureAtlas;
use crate::gpu_context::{GpuContext, GpuError};

/// Atlas texels are sampled as stored, with no sRGB decode, so blending stays
/// in the same gamma space as the atlas and the swapchain view
pub const ATLAS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Atlas texture, view and sampler on the GPU
pub struct AtlasTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

impl AtlasTexture {
    /// Upload `atlas` with its own sampling settings
    pub fn upload(gpu: &GpuContext, atlas: &TextureAtlas) -> Result<Self, GpuError> {
        let (width, height) = (atlas.width(), atlas.height());
        let limit = gpu.max_texture_dimension();
        if width > limit || height > limit {
            return Err(GpuError::TextureTooLarge {
                width,
                height,
                limit,
            });
        }

        let texture = gpu.device.create_texture(&atlas_descriptor(width, height));

        gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            atlas.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = gpu.device.create_sampler(&atlas.settings().sampler_descriptor());

        tracing::debug!(width, height, format = ?ATLAS_FORMAT, "Atlas uploaded");

        Ok(Self {
            texture,
            view,
            sampler,
        })
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }
}

/// Single-level atlas texture of the given size
fn atlas_descriptor(width: u32, height: u32) -> wgpu::TextureDescriptor<'static> {
    wgpu::TextureDescriptor {
        label: Some("Atlas Texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: ATLAS_FORMAT,
        usage: wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atlas_format_is_not_srgb() {
        assert_eq!(ATLAS_FORMAT, wgpu::TextureFormat::Rgba8Unorm);
        assert!(!ATLAS_FORMAT.is_srgb());
    }

    #[test]
    fn test_atlas_descriptor_single_level() {
        let descriptor = atlas_descriptor(4096, 2048);
        assert_eq!(descriptor.format, ATLAS_FORMAT);
        assert_eq!(descriptor.mip_level_count, 1);
        assert_eq!(descriptor.sample_count, 1);
        assert_eq!(descriptor.size.width, 4096);
        assert_eq!(descriptor.size.height, 2048);
    }
}
