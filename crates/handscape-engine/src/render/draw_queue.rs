use std::rc::Rc;

use super::{RenderState, Viewport};
use crate::mesh::Mesh;
use crate::shader::{Shader, UniformStaging};

/// One recorded draw: program, geometry, staged uniforms and the textures
/// bound by name.
pub struct DrawCall {
    pub shader: Rc<Shader>,
    pub mesh: Rc<Mesh>,
    pub uniforms: UniformStaging,
    pub textures: Vec<(String, wgpu::TextureView)>,
    pub state: RenderState,
}

impl DrawCall {
    pub fn new(shader: Rc<Shader>, mesh: Rc<Mesh>, state: RenderState) -> Self {
        Self { shader, mesh, uniforms: UniformStaging::new(), textures: Vec::new(), state }
    }

    /// Binds `view` to the shader texture named `name`, replacing any earlier
    /// binding of that name.
    pub fn with_texture(mut self, name: impl Into<String>, view: wgpu::TextureView) -> Self {
        self.set_texture(name, view);
        self
    }

    pub fn set_texture(&mut self, name: impl Into<String>, view: wgpu::TextureView) {
        let name = name.into();
        match self.textures.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = view,
            None => self.textures.push((name, view)),
        }
    }

    pub fn texture(&self, name: &str) -> Option<&wgpu::TextureView> {
        self.textures.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

impl std::fmt::Debug for DrawCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawCall")
            .field("shader", &self.shader.label())
            .field("mesh", &self.mesh.label())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Draws that share one viewport, in submission order.
#[derive(Debug, Default)]
pub struct ViewBatch {
    /// `None` covers the whole target.
    pub viewport: Option<Viewport>,
    pub calls: Vec<DrawCall>,
}

/// Per-frame list of draws grouped by viewport.
///
/// Submission order is draw order: the compositor relies on it for layering
/// (passthrough, scene, luma mask, hands).
#[derive(Debug, Default)]
pub struct DrawQueue {
    views: Vec<ViewBatch>,
}

impl DrawQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new batch; subsequent draws land in `viewport`.
    pub fn begin_view(&mut self, viewport: Option<Viewport>) {
        self.views.push(ViewBatch { viewport, calls: Vec::new() });
    }

    pub fn push(&mut self, call: DrawCall) {
        if self.views.is_empty() {
            self.begin_view(None);
        }
        if let Some(view) = self.views.last_mut() {
            view.calls.push(call);
        }
    }

    pub fn views(&self) -> &[ViewBatch] {
        &self.views
    }

    /// Total number of draws across all views.
    pub fn len(&self) -> usize {
        self.views.iter().map(|v| v.calls.len()).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.views.clear();
    }

    pub(crate) fn take_views(&mut self) -> Vec<ViewBatch> {
        std::mem::take(&mut self.views)
    }
}

// ── uniform arena ─────────────────────────────────────────────────────────

/// Packs every staged uniform block of a frame into one buffer image, each
/// block starting at a dynamic-offset aligned position.
#[derive(Debug)]
pub(crate) struct UniformArena {
    bytes: Vec<u8>,
    align: u32,
}

impl UniformArena {
    pub fn new(align: u32) -> Self {
        Self { bytes: Vec::new(), align: align.max(1) }
    }

    /// Appends `data` as a block of `size` bytes (truncated or zero padded)
    /// and returns its offset.
    pub fn push(&mut self, data: Option<&[u8]>, size: u32) -> u32 {
        let align = self.align as usize;
        let start = self.bytes.len().div_ceil(align) * align;
        self.bytes.resize(start, 0);

        let size = size as usize;
        let data = data.unwrap_or(&[]);
        let n = data.len().min(size);
        self.bytes.extend_from_slice(&data[..n]);
        self.bytes.resize(start + size, 0);
        start as u32
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
