//! GPU device and window surface acquisition
//!
//! `GpuContext` holds the adapter, device and queue. `SurfaceContext` owns the
//! window surface and its configuration: vsync presentation and a transparent,
//! premultiplied-alpha swapchain where the platform supports one.
//!
//! Frames are drawn through a non-sRGB view of the swapchain (`render_format`)
//! so the premultiplied blend runs on the stored gamma-encoded values.

use std::sync::Arc;

use winit::dpi::PhysicalSize;
use winit::window::Window;

/// GPU initialisation failures
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter found")]
    NoAdapter,
    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
    #[error("atlas of {width}x{height} exceeds the device limit of {limit}")]
    TextureTooLarge { width: u32, height: u32, limit: u32 },
}

/// Shared GPU resources
pub struct GpuContext {
    /// The wgpu instance
    pub instance: wgpu::Instance,
    /// The selected GPU adapter
    pub adapter: wgpu::Adapter,
    /// The GPU device for creating resources
    pub device: wgpu::Device,
    /// The command queue for submitting GPU work
    pub queue: wgpu::Queue,
    /// The preferred surface format (typically sRGB)
    pub surface_format: wgpu::TextureFormat,
    /// Format of the views the scene is rendered into
    pub render_format: wgpu::TextureFormat,
}

impl GpuContext {
    /// Create a GPU context compatible with `window`'s surface.
    pub async fn new(window: Arc<Window>) -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Temporary surface for adapter selection
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        tracing::info!("Using GPU: {}", adapter.get_info().name);
        tracing::info!("Backend: {:?}", adapter.get_info().backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Light-Field Viewer Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format =
            choose_surface_format(&surface_caps.formats).ok_or(GpuError::NoSurfaceFormat)?;

        let render_format = render_format_for(surface_format);

        tracing::info!(
            "Surface format: {:?} (rendering as {:?})",
            surface_format,
            render_format
        );

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            surface_format,
            render_format,
        })
    }

    /// Largest 2D texture dimension the device accepts
    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }
}

/// Window surface and its configuration
pub struct SurfaceContext {
    /// The wgpu surface for the window
    pub surface: wgpu::Surface<'static>,
    /// Surface configuration
    pub config: wgpu::SurfaceConfiguration,
}

impl SurfaceContext {
    /// Create and configure the surface for `window` at its physical inner size.
    pub fn new(gpu: &GpuContext, window: Arc<Window>) -> Result<Self, GpuError> {
        let size = window.inner_size();
        let surface = gpu.instance.create_surface(window)?;
        let surface_caps = surface.get_capabilities(&gpu.adapter);

        let alpha_mode = choose_alpha_mode(&surface_caps.alpha_modes);
        if alpha_mode != wgpu::CompositeAlphaMode::PreMultiplied {
            tracing::warn!(
                "Premultiplied surface alpha unavailable, using {:?}; window will not be transparent",
                alpha_mode
            );
        }

        let config = surface_configuration(gpu.surface_format, alpha_mode, size);
        surface.configure(&gpu.device, &config);

        Ok(Self { surface, config })
    }

    /// Resize the window surface.
    pub fn resize(&mut self, gpu: &GpuContext, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&gpu.device, &self.config);
        }
    }

    /// Re-apply the current configuration after the surface was lost or outdated
    pub fn reconfigure(&self, gpu: &GpuContext) {
        self.surface.configure(&gpu.device, &self.config);
    }

    /// Get the current surface size.
    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }
}

/// Prefer an sRGB swapchain; rendering goes through its non-sRGB view
fn choose_surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .find(|f| f.is_srgb())
        .or_else(|| formats.first())
        .copied()
}

/// Non-sRGB counterpart of `surface_format`; formats without one are returned as is
pub fn render_format_for(surface_format: wgpu::TextureFormat) -> wgpu::TextureFormat {
    surface_format.remove_srgb_suffix()
}

/// Vsync configuration for `format` that also allows views in its render format
fn surface_configuration(
    format: wgpu::TextureFormat,
    alpha_mode: wgpu::CompositeAlphaMode,
    size: PhysicalSize<u32>,
) -> wgpu::SurfaceConfiguration {
    let render_format = render_format_for(format);
    let view_formats = if render_format != format {
        vec![render_format]
    } else {
        vec![]
    };

    wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: size.width.max(1),
        height: size.height.max(1),
        // One frame per display refresh
        present_mode: wgpu::PresentMode::Fifo,
        alpha_mode,
        view_formats,
        desired_maximum_frame_latency: 2,
    }
}

/// Premultiplied composition when supported, otherwise the platform default
fn choose_alpha_mode(modes: &[wgpu::CompositeAlphaMode]) -> wgpu::CompositeAlphaMode {
    if modes.contains(&wgpu::CompositeAlphaMode::PreMultiplied) {
        wgpu::CompositeAlphaMode::PreMultiplied
    } else {
        modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_srgb_format() {
        let formats = [
            wgpu::TextureFormat::Bgra8Unorm,
            wgpu::TextureFormat::Bgra8UnormSrgb,
        ];
        assert_eq!(
            choose_surface_format(&formats),
            Some(wgpu::TextureFormat::Bgra8UnormSrgb)
        );
        assert_eq!(
            choose_surface_format(&[wgpu::TextureFormat::Rgba16Float]),
            Some(wgpu::TextureFormat::Rgba16Float)
        );
        assert_eq!(choose_surface_format(&[]), None);
    }

    #[test]
    fn test_render_format_drops_srgb() {
        assert_eq!(
            render_format_for(wgpu::TextureFormat::Bgra8UnormSrgb),
            wgpu::TextureFormat::Bgra8Unorm
        );
        assert_eq!(
            render_format_for(wgpu::TextureFormat::Rgba8UnormSrgb),
            wgpu::TextureFormat::Rgba8Unorm
        );
        assert_eq!(
            render_format_for(wgpu::TextureFormat::Rgba16Float),
            wgpu::TextureFormat::Rgba16Float
        );
    }

    #[test]
    fn test_surface_configuration_allows_linear_view() {
        let config = surface_configuration(
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::CompositeAlphaMode::PreMultiplied,
            PhysicalSize::new(0, 720),
        );
        assert_eq!(config.format, wgpu::TextureFormat::Bgra8UnormSrgb);
        assert_eq!(config.view_formats, vec![wgpu::TextureFormat::Bgra8Unorm]);
        assert_eq!(config.present_mode, wgpu::PresentMode::Fifo);
        assert_eq!((config.width, config.height), (1, 720));

        let config = surface_configuration(
            wgpu::TextureFormat::Bgra8Unorm,
            wgpu::CompositeAlphaMode::Opaque,
            PhysicalSize::new(1280, 720),
        );
        assert!(config.view_formats.is_empty());
    }

    #[test]
    fn test_prefers_premultiplied_alpha() {
        let modes = [
            wgpu::CompositeAlphaMode::Opaque,
            wgpu::CompositeAlphaMode::PreMultiplied,
        ];
        assert_eq!(choose_alpha_mode(&modes), wgpu::CompositeAlphaMode::PreMultiplied);
        assert_eq!(
            choose_alpha_mode(&[wgpu::CompositeAlphaMode::Opaque]),
            wgpu::CompositeAlphaMode::Opaque
        );
        assert_eq!(choose_alpha_mode(&[]), wgpu::CompositeAlphaMode::Auto);
    }
}
