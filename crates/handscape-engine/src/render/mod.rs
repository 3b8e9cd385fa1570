//! Drawing: render context, fixed-function state, textures, pipelines and
//! the per-frame draw queue.
//!
//! Primitives never touch wgpu passes directly. They submit [`DrawCall`]s
//! through a [`DrawContext`]; the [`Renderer`] turns a frame's queue into one
//! render pass with a shared uniform buffer.

mod ctx;
mod draw_context;
mod draw_queue;
mod pipeline;
mod renderer;
mod state;
mod texture;

pub use ctx::{RenderCtx, RenderTarget, Viewport};
pub use draw_context::{Camera, DrawContext, ObjectUniforms};
pub use draw_queue::{DrawCall, DrawQueue, ViewBatch};
pub use pipeline::{layout_entries, PipelineCache, PipelineError, PipelineKey, ShaderLayout};
pub use renderer::{FlushStats, Renderer};
pub use state::{BlendMode, RenderState};
pub use texture::{validate_pixels, PixelFormat, Texture, TextureError};
