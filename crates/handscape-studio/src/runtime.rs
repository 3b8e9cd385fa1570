use std::sync::Arc;

use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use handscape_engine::compositor::Compositor;
use handscape_engine::config::CompositorConfig;
use handscape_engine::device::{Gpu, GpuInit, SurfaceErrorAction};
use handscape_engine::hand::FrameQueue;
use handscape_engine::render::{RenderCtx, RenderTarget, Viewport};
use handscape_engine::time::FrameClock;

use crate::scene;
use crate::synthetic::DemoWindows;

/// Window configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "handscape".to_string(),
            initial_size: LogicalSize::new(1600.0, 800.0),
        }
    }
}

/// Entry point for the desktop mirror.
pub struct Runtime;

impl Runtime {
    pub fn run(
        window: RuntimeConfig,
        gpu_init: GpuInit,
        config: CompositorConfig,
        frames: Arc<FrameQueue>,
    ) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState { window, gpu_init, config, frames, entry: None, exit_requested: false };

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        Ok(())
    }
}

#[self_referencing]
struct WindowEntry {
    clock: FrameClock,
    /// Built once the GPU exists.
    compositor: Option<Compositor>,
    last_touches: usize,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct AppState {
    window: RuntimeConfig,
    gpu_init: GpuInit,
    config: CompositorConfig,
    frames: Arc<FrameQueue>,
    entry: Option<WindowEntry>,
    exit_requested: bool,
}

impl AppState {
    fn create_entry(&self, event_loop: &ActiveEventLoop) -> Result<WindowEntry> {
        let attrs = Window::default_attributes()
            .with_title(self.window.title.clone())
            .with_inner_size(self.window.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        let mut entry = WindowEntryTryBuilder {
            clock: FrameClock::default(),
            compositor: None,
            last_touches: 0,
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()?;

        entry.with_mut(|fields| -> Result<()> {
            let gpu = &*fields.gpu;
            let mut compositor =
                Compositor::new(gpu.device(), gpu.queue(), self.config.clone(), Arc::clone(&self.frames))
                    .context("failed to create compositor")?;
            compositor.set_window_source(Some(Box::new(DemoWindows::new())));
            scene::populate(compositor.scene()).context("failed to build demo scene")?;
            *fields.compositor = Some(compositor);
            Ok(())
        })?;

        Ok(entry)
    }

    fn request_exit(&mut self, event_loop: &ActiveEventLoop) {
        self.exit_requested = true;
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(entry) = self.entry.as_mut() else { return };
        let mut fatal = false;

        entry.with_mut(|fields| {
            let Some(compositor) = fields.compositor.as_mut() else { return };
            let ft = fields.clock.tick();
            compositor.update(&ft);

            let touches = compositor.touches().len();
            if touches != *fields.last_touches {
                log::debug!("{touches} hand/window contacts");
                *fields.last_touches = touches;
            }

            let gpu = fields.gpu;
            let mut frame = match gpu.begin_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    fatal = gpu.handle_surface_error(e) == SurfaceErrorAction::Fatal;
                    return;
                }
            };

            let size = gpu.size();
            let ctx = RenderCtx::new(gpu.device(), gpu.queue(), gpu.surface_format(), Some(gpu.depth_format()));
            {
                let mut target = RenderTarget::new(&mut frame.encoder, &frame.view, Some(gpu.depth_view()));
                if let Err(e) = compositor.render(&ctx, &mut target, Viewport::full(size.width, size.height)) {
                    log::error!("frame {} failed: {e}", ft.frame_index);
                }
            }
            gpu.submit(frame);
        });

        if fatal {
            log::error!("surface lost for good; exiting");
            self.request_exit(event_loop);
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }

        match self.create_entry(event_loop) {
            Ok(entry) => {
                entry.with_window(|w| w.request_redraw());
                self.entry = Some(entry);
            }
            Err(e) => {
                log::error!("failed to create window: {e:#}");
                self.request_exit(event_loop);
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Tracker frames arrive continuously, so redraw continuously.
        if let Some(entry) = &self.entry {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        match &event {
            WindowEvent::CloseRequested => {
                self.entry = None;
                self.request_exit(event_loop);
            }

            WindowEvent::KeyboardInput {
                event: KeyEvent { physical_key: PhysicalKey::Code(KeyCode::Escape), state: ElementState::Pressed, .. },
                ..
            } => self.request_exit(event_loop),

            WindowEvent::Resized(new_size) => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.with_gpu_mut(|gpu| gpu.resize(*new_size));
                    entry.with_window(|w| w.request_redraw());
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(entry) = self.entry.as_mut() {
                    let new_size = entry.with_window(|w| w.inner_size());
                    entry.with_gpu_mut(|gpu| gpu.resize(new_size));
                    entry.with_window(|w| w.request_redraw());
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }
}
