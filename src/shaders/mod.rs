//! Embedded WGSL shaders

/// The layer shader: camera transform, atlas sampling and premultiplied output
pub const LAYER_SHADER: &str = include_str!("layer.wgsl");

/// Vertex entry point of [`LAYER_SHADER`]
pub const LAYER_VS_ENTRY: &str = "vs_main";

/// Fragment entry point of [`LAYER_SHADER`]
pub const LAYER_FS_ENTRY: &str = "fs_main";

/// Create the layer shader module
pub fn create_layer_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Layer Shader"),
        source: wgpu::ShaderSource::Wgsl(LAYER_SHADER.into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_shader_entry_points() {
        assert!(!LAYER_SHADER.is_empty());
        assert!(LAYER_SHADER.contains(&format!("fn {}", LAYER_VS_ENTRY)));
        assert!(LAYER_SHADER.contains(&format!("fn {}", LAYER_FS_ENTRY)));
    }

    #[test]
    fn test_shader_bindings_match_renderer_layout() {
        assert!(LAYER_SHADER.contains("@group(0) @binding(0) var<uniform> camera"));
        assert!(LAYER_SHADER.contains("@group(0) @binding(1) var atlas_texture"));
        assert!(LAYER_SHADER.contains("@group(0) @binding(2) var atlas_sampler"));
    }

    #[test]
    fn test_shader_flips_v_and_premultiplies() {
        assert!(LAYER_SHADER.contains("1.0 - in.uv.y"));
        assert!(LAYER_SHADER.contains("-in.position.y, -in.position.z"));
        assert!(LAYER_SHADER.contains("texel.rgb * texel.a"));
    }
}
