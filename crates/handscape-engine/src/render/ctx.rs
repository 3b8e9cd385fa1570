/// Sub-rectangle of the render target in physical pixels.
///
/// Stereo rendering draws each eye into its own half of the target.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Whole-target viewport.
    #[inline]
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f32, height as f32)
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    #[inline]
    pub fn aspect(self) -> f32 {
        if self.height > 0.0 { self.width / self.height } else { 1.0 }
    }

    /// Left and right halves for side-by-side stereo.
    pub fn split_horizontal(self) -> [Self; 2] {
        let half = self.width * 0.5;
        [
            Self::new(self.x, self.y, half, self.height),
            Self::new(self.x + half, self.y, half, self.height),
        ]
    }
}

/// Renderer-facing context (device/queue + target formats).
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub surface_format: wgpu::TextureFormat,
    pub depth_format: Option<wgpu::TextureFormat>,
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Self {
        Self { device, queue, surface_format, depth_format }
    }
}

/// Target for drawing (encoder + color view + optional depth-stencil view).
pub struct RenderTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color_view: &'a wgpu::TextureView,
    pub depth_view: Option<&'a wgpu::TextureView>,
}

impl<'a> RenderTarget<'a> {
    #[inline]
    pub fn new(
        encoder: &'a mut wgpu::CommandEncoder,
        color_view: &'a wgpu::TextureView,
        depth_view: Option<&'a wgpu::TextureView>,
    ) -> Self {
        Self { encoder, color_view, depth_view }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_split_halves_width() {
        let [l, r] = Viewport::full(1920, 1080).split_horizontal();
        assert_eq!(l, Viewport::new(0.0, 0.0, 960.0, 1080.0));
        assert_eq!(r, Viewport::new(960.0, 0.0, 960.0, 1080.0));
        assert!((l.aspect() - 960.0 / 1080.0).abs() < 1e-6);
    }
}
