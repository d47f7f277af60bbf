//! Render driver: window, input routing and the continuous redraw loop
//!
//! Every `RedrawRequested` draws the scene once from the current camera and
//! immediately requests the next redraw; vsync presentation paces the loop to
//! one frame per display refresh.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use super::renderer::SceneRenderer;
use crate::camera::ViewportInput;
use crate::compositor::Scene;
use crate::gpu_context::{GpuContext, GpuError, SurfaceContext};
use crate::settings::ViewerSettings;
use crate::telemetry::FrameCounter;

/// Window title
pub const WINDOW_TITLE: &str = "Light-Field Viewer";

/// Render loop failures
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] EventLoopError),
    #[error("failed to create window: {0}")]
    CreateWindow(#[from] OsError),
    #[error("GPU initialisation failed: {0}")]
    Gpu(#[from] GpuError),
    #[error("GPU ran out of memory while presenting")]
    OutOfMemory,
}

/// Handle for stopping a running render loop from outside the event loop
#[derive(Debug, Clone, Default)]
pub struct RenderHandle {
    token: CancellationToken,
}

impl RenderHandle {
    /// Stop the loop; takes effect at the next frame
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Window attributes for the viewer: transparent, sized in logical pixels
pub fn window_attributes(settings: &ViewerSettings) -> WindowAttributes {
    WindowAttributes::default()
        .with_title(WINDOW_TITLE)
        .with_inner_size(LogicalSize::new(
            settings.window_width,
            settings.window_height,
        ))
        .with_transparent(true)
}

/// Everything that exists once the window does
struct ActiveView {
    window: Arc<Window>,
    gpu: GpuContext,
    surface: SurfaceContext,
    renderer: SceneRenderer,
    input: ViewportInput,
}

enum FrameOutcome {
    Presented,
    Skipped,
    Fatal,
}

/// Owns the scene and drives rendering from winit events
pub struct RenderDriver {
    window_attributes: WindowAttributes,
    scene: Scene,
    view: Option<ActiveView>,
    handle: RenderHandle,
    frames: FrameCounter,
    error: Option<DriverError>,
}

impl RenderDriver {
    /// Prepare a driver for `scene`; the window is created when the event loop resumes
    pub fn attach(window_attributes: WindowAttributes, scene: Scene) -> (Self, RenderHandle) {
        let handle = RenderHandle::default();
        let driver = Self {
            window_attributes,
            scene,
            view: None,
            handle: handle.clone(),
            frames: FrameCounter::new(Duration::from_secs(1)),
            error: None,
        };
        (driver, handle)
    }

    /// Run until the window closes or the handle is cancelled
    pub fn run(mut self, event_loop: EventLoop<()>) -> Result<(), DriverError> {
        event_loop.set_control_flow(ControlFlow::Wait);
        event_loop.run_app(&mut self)?;

        tracing::info!(frames = self.frames.total_frames(), "Render loop stopped");
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn create_view(&self, event_loop: &ActiveEventLoop) -> Result<ActiveView, DriverError> {
        let window = Arc::new(event_loop.create_window(self.window_attributes.clone())?);
        let size = window.inner_size();
        tracing::info!("Window created: {}x{}", size.width, size.height);

        let gpu = pollster::block_on(GpuContext::new(window.clone()))?;
        let surface = SurfaceContext::new(&gpu, window.clone())?;
        let renderer = SceneRenderer::new(&gpu, &self.scene, surface.size())?;
        let input = ViewportInput::new(size, window.scale_factor());

        Ok(ActiveView {
            window,
            gpu,
            surface,
            renderer,
            input,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: DriverError) {
        tracing::error!("{}", error);
        self.error = Some(error);
        self.handle.cancel();
        event_loop.exit();
    }
}

impl ActiveView {
    fn render_frame(&mut self) -> FrameOutcome {
        let frame = match self.surface.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("Surface lost or outdated, reconfiguring");
                self.surface.reconfigure(&self.gpu);
                return FrameOutcome::Skipped;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return FrameOutcome::Fatal,
            Err(e) => {
                tracing::warn!("Failed to acquire frame: {}", e);
                return FrameOutcome::Skipped;
            }
        };

        // The resolve source must match the frame exactly
        let frame_size = (frame.texture.width(), frame.texture.height());
        if frame_size != self.renderer.target_size() {
            self.renderer.resize(&self.gpu.device, frame_size);
        }

        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor {
            format: Some(self.gpu.render_format),
            ..Default::default()
        });
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Layer Frame Encoder"),
            });

        self.renderer
            .render(&mut encoder, &self.gpu.queue, &view, self.input.camera());

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        self.window.pre_present_notify();
        frame.present();

        FrameOutcome::Presented
    }
}

impl ApplicationHandler for RenderDriver {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.view.is_some() {
            return;
        }

        match self.create_view(event_loop) {
            Ok(view) => {
                view.window.request_redraw();
                self.view = Some(view);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(view) = self.view.as_mut() else {
            return;
        };

        // Pointer, wheel and viewport changes go straight to the camera
        view.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Close requested");
                self.handle.cancel();
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                view.surface.resize(&view.gpu, new_size);
                view.renderer.resize(&view.gpu.device, view.surface.size());
            }
            WindowEvent::RedrawRequested => {
                if self.handle.is_cancelled() {
                    event_loop.exit();
                    return;
                }

                match view.render_frame() {
                    FrameOutcome::Presented => {
                        let now = Instant::now();
                        self.frames.record_at(now);
                        if let Some(stats) = self.frames.take_report(now) {
                            tracing::debug!(
                                fps = stats.fps,
                                avg_ms = stats.avg_ms,
                                max_ms = stats.max_ms,
                                "Frame stats"
                            );
                        }
                    }
                    FrameOutcome::Skipped => {}
                    FrameOutcome::Fatal => {
                        self.fail(event_loop, DriverError::OutOfMemory);
                        return;
                    }
                }

                view.window.request_redraw();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.handle.is_cancelled() {
            event_loop.exit();
        }
    }
}
