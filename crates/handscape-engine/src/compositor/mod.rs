//! Per-frame composition.
//!
//! Each frame the [`Compositor`] pulls tracker frames, updates hand state,
//! camera textures and virtual windows, then draws every eye back to front:
//! camera passthrough, the scene graph, a luma-masked passthrough overlay
//! (bright real-world pixels stay visible over virtual content) and finally
//! the hands.

mod hands;
mod passthrough;
mod windows;

pub use hands::HandLayer;
pub use passthrough::{camera_for_eye, camera_format, distortion_bytes, PassthroughLayer, PassthroughUniforms};
pub use windows::{window_plane, VirtualWindows, WindowHandle, WindowImage, WindowInfo, WindowSource};

use std::rc::Rc;
use std::sync::Arc;

use glam::Vec3;
use log::{debug, warn};

use crate::config::{CameraConfig, CompositorConfig, EyeLayout};
use crate::hand::{FrameQueue, HandTracker, Intersection, PlaneRect};
use crate::primitives::{draw_scene, group_node, SceneNode};
use crate::property::{GeometryProperties, Property};
use crate::render::{Camera, DrawContext, DrawQueue, FlushStats, RenderCtx, RenderState, RenderTarget, Renderer, Viewport};
use crate::resource::{ResourceCache, ShaderLibrary};
use crate::time::FrameTime;

/// A hand bone crossing a window this frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WindowTouch {
    pub window: WindowHandle,
    pub hand: i32,
    pub hit: Intersection,
}

/// Every bone/window crossing, windows in handle order, hands in ID order.
pub fn window_touches(
    tracker: &HandTracker,
    planes: impl IntoIterator<Item = (WindowHandle, PlaneRect)>,
) -> Vec<WindowTouch> {
    let mut touches = Vec::new();
    for (window, plane) in planes {
        for info in tracker.hands() {
            touches.extend(info.intersect_rectangle(&plane).into_iter().map(|hit| WindowTouch {
                window,
                hand: info.id(),
                hit,
            }));
        }
    }
    touches
}

/// Viewports for each eye, left eye first.
pub fn eye_viewports(layout: EyeLayout, full: Viewport) -> Vec<Viewport> {
    match layout {
        EyeLayout::Mono => vec![full],
        EyeLayout::SideBySide => full.split_horizontal().to_vec(),
    }
}

/// Camera for `eye` looking down world -Z. Stereo eyes sit half the
/// interpupillary distance either side of the configured position.
pub fn eye_camera(config: &CameraConfig, eye: usize, eye_count: usize, aspect: f32) -> Camera {
    let camera = Camera::look_at(
        config.eye_position,
        config.eye_position + Vec3::NEG_Z,
        config.fov_y_degrees.to_radians(),
        aspect,
        config.near,
        config.far,
    );
    if eye_count < 2 {
        return camera;
    }
    let side = if eye == 0 { -0.5 } else { 0.5 };
    camera.offset_x(side * config.interpupillary_distance)
}

/// Owns everything drawn on the render thread.
pub struct Compositor {
    config: CompositorConfig,
    resources: ResourceCache,
    renderer: Renderer,
    draws: DrawQueue,
    frames: Arc<FrameQueue>,
    tracker: HandTracker,
    hands: HandLayer,
    scene: Rc<SceneNode>,
    passthrough: PassthroughLayer,
    windows: VirtualWindows,
    window_source: Option<Box<dyn WindowSource>>,
    touches: Vec<WindowTouch>,
}

impl Compositor {
    /// `frames` is the queue a tracker listener feeds.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        config: CompositorConfig,
        frames: Arc<FrameQueue>,
    ) -> crate::Result<Self> {
        let mut library = ShaderLibrary::new();
        for dir in &config.shader_dirs {
            library.add_search_dir(dir.clone());
        }
        let resources = ResourceCache::new(device, queue, library)?;

        let tracker =
            HandTracker::new(config.registration.rotation, config.registration.translation, config.eviction);
        let windows = VirtualWindows::new(config.windows);
        let scene = group_node(GeometryProperties::identity());
        scene.add_child(Rc::clone(windows.node()));

        Ok(Self {
            passthrough: PassthroughLayer::new(config.passthrough),
            config,
            resources,
            renderer: Renderer::new(),
            draws: DrawQueue::new(),
            frames,
            tracker,
            hands: HandLayer::new(),
            scene,
            windows,
            window_source: None,
            touches: Vec::new(),
        })
    }

    #[inline]
    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    #[inline]
    pub fn resources(&self) -> &ResourceCache {
        &self.resources
    }

    /// Root for application content (icons, panels). Virtual windows hang
    /// off it already.
    #[inline]
    pub fn scene(&self) -> &Rc<SceneNode> {
        &self.scene
    }

    #[inline]
    pub fn tracker(&self) -> &HandTracker {
        &self.tracker
    }

    #[inline]
    pub fn hands(&self) -> &HandLayer {
        &self.hands
    }

    #[inline]
    pub fn windows(&self) -> &VirtualWindows {
        &self.windows
    }

    pub fn set_window_source(&mut self, source: Option<Box<dyn WindowSource>>) {
        self.window_source = source;
    }

    /// Hand/window crossings found by the last [`update`](Self::update).
    #[inline]
    pub fn touches(&self) -> &[WindowTouch] {
        &self.touches
    }

    /// Advances hands, camera images and windows by one render frame.
    ///
    /// Texture upload failures are logged; the frame goes on without the
    /// affected image.
    pub fn update(&mut self, time: &FrameTime) {
        let frames = self.frames.drain();
        if frames.len() > 1 {
            debug!("processing {} tracker frames", frames.len());
        }
        self.tracker.update(&frames, time.dt);
        self.hands.sync(&self.tracker, &self.config.hands);

        let (device, queue) = (self.resources.device(), self.resources.queue());
        if let Some(latest) = frames.last() {
            if let Err(e) = self.passthrough.update(device, queue, latest) {
                warn!("camera image upload failed: {e}");
            }
        }
        if let Some(source) = self.window_source.as_deref_mut() {
            if let Err(e) = self.windows.update(source, device, queue) {
                warn!("window capture upload failed: {e}");
            }
        }

        self.touches = window_touches(&self.tracker, self.windows.planes());
    }

    /// Draws every eye into `viewport` of `target` and submits the pass.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        viewport: Viewport,
    ) -> crate::Result<FlushStats> {
        let eyes = eye_viewports(self.config.eye_layout, viewport);
        let eye_count = eyes.len();

        for (eye, view) in eyes.into_iter().enumerate() {
            self.draws.begin_view(Some(view));
            let camera = eye_camera(&self.config.camera, eye, eye_count, view.aspect());
            let mut dc = DrawContext::new(ctx.device, ctx.queue, &self.resources, &mut self.draws, camera);

            if let Err(e) = self.passthrough.draw(&mut dc, eye, false) {
                warn!("passthrough: {e}");
            }
            draw_scene(&self.scene, &mut dc);
            if let Err(e) = self.passthrough.draw(&mut dc, eye, true) {
                warn!("passthrough mask: {e}");
            }
            dc.set_state_override(Some(RenderState::TRANSLUCENT));
            draw_scene(self.hands.node(), &mut dc);
        }

        let stats = self.renderer.flush(ctx, target, &mut self.draws, Some(wgpu::Color::BLACK))?;
        if stats.skipped > 0 {
            debug!("{} draws skipped", stats.skipped);
        }
        Ok(stats)
    }
}
