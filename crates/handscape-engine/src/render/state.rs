/// How fragment colors combine with the target.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum BlendMode {
    #[default]
    Opaque,
    /// Straight (non-premultiplied) alpha.
    Alpha,
    /// `src.rgb * src.a + dst.rgb`.
    Additive,
}

/// Fixed-function state for one draw.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RenderState {
    pub depth_test: bool,
    pub depth_write: bool,
    pub blend: BlendMode,
    pub cull_back_faces: bool,
}

impl Default for RenderState {
    fn default() -> Self {
        Self::SCENE
    }
}

impl RenderState {
    /// Regular 3D content: depth tested and written, alpha blended so the
    /// inherited alpha mask fades objects.
    pub const SCENE: Self = Self { depth_test: true, depth_write: true, blend: BlendMode::Alpha, cull_back_faces: false };

    /// Full-screen layers drawn behind everything (camera passthrough).
    pub const BACKGROUND: Self = Self { depth_test: false, depth_write: false, blend: BlendMode::Alpha, cull_back_faces: false };

    /// Full-screen layers added on top without touching depth.
    pub const OVERLAY_ADDITIVE: Self =
        Self { depth_test: false, depth_write: false, blend: BlendMode::Additive, cull_back_faces: false };

    /// Translucent geometry that must respect but not occlude the scene
    /// (tracked hands).
    pub const TRANSLUCENT: Self = Self { depth_test: true, depth_write: false, blend: BlendMode::Alpha, cull_back_faces: false };

    pub fn blend_state(self) -> Option<wgpu::BlendState> {
        match self.blend {
            BlendMode::Opaque => None,
            BlendMode::Alpha => Some(wgpu::BlendState::ALPHA_BLENDING),
            BlendMode::Additive => Some(wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::Zero,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            }),
        }
    }

    /// Depth-stencil state for a pass with a `format` attachment.
    pub fn depth_stencil(self, format: wgpu::TextureFormat) -> wgpu::DepthStencilState {
        wgpu::DepthStencilState {
            format,
            depth_write_enabled: self.depth_write,
            depth_compare: if self.depth_test {
                wgpu::CompareFunction::LessEqual
            } else {
                wgpu::CompareFunction::Always
            },
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }
    }

    pub fn cull_mode(self) -> Option<wgpu::Face> {
        self.cull_back_faces.then_some(wgpu::Face::Back)
    }
}
