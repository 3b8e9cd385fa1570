use std::rc::Rc;

use half::f16;
use log::{debug, warn};

use crate::config::PassthroughConfig;
use crate::hand::{CameraImage, HandFrame};
use crate::primitives::UnitMesh;
use crate::render::{DrawCall, DrawContext, PixelFormat, RenderState, Texture, TextureError};
use crate::resource::PASSTHROUGH_SHADER;
use crate::shader::ShaderFrontend;
use crate::uniform_block;

uniform_block! {
    /// Uniforms of the camera passthrough shader.
    pub struct PassthroughUniforms {
        color_gain: Vec4 => [f32; 4],
        luma_threshold: Float => f32,
        mask_mode: Float => f32,
        use_distortion: Float => f32,
        alpha: Float => f32,
    }
}

impl PassthroughUniforms {
    pub fn new(config: &PassthroughConfig, mask: bool, distortion: bool) -> Self {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        Self {
            color_gain: config.color_gain.to_array(),
            luma_threshold: config.luma_threshold,
            mask_mode: flag(mask),
            use_distortion: flag(config.use_distortion && distortion),
            alpha: 1.0,
        }
    }
}

/// Texture format for a camera image with `bytes_per_pixel` channels.
pub fn camera_format(bytes_per_pixel: u32) -> Option<PixelFormat> {
    match bytes_per_pixel {
        1 => Some(PixelFormat::R8),
        4 => Some(PixelFormat::Rgba8),
        _ => None,
    }
}

/// Packs an interleaved `(u, v)` lookup map as half floats.
pub fn distortion_bytes(map: &[f32]) -> Vec<u8> {
    let halves: Vec<f16> = map.iter().map(|&x| f16::from_f32(x)).collect();
    bytemuck::cast_slice(&halves).to_vec()
}

/// Camera shown to `eye`: one camera per eye when there are enough, the
/// first camera otherwise.
pub fn camera_for_eye(eye: usize, camera_count: usize) -> Option<usize> {
    match camera_count {
        0 => None,
        n if eye < n => Some(eye),
        _ => Some(0),
    }
}

struct CameraTextures {
    image: Texture,
    distortion: Option<Texture>,
}

/// GPU copies of the tracker's camera images and their distortion maps.
///
/// Textures are reused across frames while each camera keeps its size.
pub struct PassthroughLayer {
    config: PassthroughConfig,
    cameras: Vec<Option<CameraTextures>>,
    frame_id: Option<u64>,
    frontend: Option<ShaderFrontend<PassthroughUniforms>>,
}

impl PassthroughLayer {
    pub fn new(config: PassthroughConfig) -> Self {
        Self { config, cameras: Vec::new(), frame_id: None, frontend: None }
    }

    #[inline]
    pub fn config(&self) -> &PassthroughConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: PassthroughConfig) {
        self.config = config;
    }

    /// Cameras with a texture.
    pub fn camera_count(&self) -> usize {
        self.cameras.iter().flatten().count()
    }

    /// Uploads the images carried by `frame`. A frame already uploaded is
    /// skipped.
    pub fn update(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, frame: &HandFrame) -> Result<(), TextureError> {
        if self.frame_id == Some(frame.id) {
            return Ok(());
        }
        self.frame_id = Some(frame.id);

        self.cameras.resize_with(frame.images.len(), || None);
        for (index, image) in frame.images.iter().enumerate() {
            let Some(format) = camera_format(image.bytes_per_pixel) else {
                warn!("camera {index}: unsupported {} bytes per pixel", image.bytes_per_pixel);
                self.cameras[index] = None;
                continue;
            };
            let slot = &mut self.cameras[index];
            match slot {
                Some(camera) => {
                    camera.image.update(device, queue, image.width, image.height, format, &image.data)?;
                    update_distortion(device, queue, index, &mut camera.distortion, image)?;
                }
                None => {
                    let label = format!("camera {index}");
                    let texture = Texture::from_bytes(device, queue, &label, image.width, image.height, format, &image.data)?;
                    debug!("{label}: {}x{} {format:?}", image.width, image.height);
                    let mut distortion = None;
                    update_distortion(device, queue, index, &mut distortion, image)?;
                    *slot = Some(CameraTextures { image: texture, distortion });
                }
            }
        }
        Ok(())
    }

    /// Queues the camera image for `eye` as a full-viewport layer.
    ///
    /// In mask mode only pixels brighter than the luma threshold are drawn,
    /// added on top of what is already there.
    pub fn draw(&mut self, ctx: &mut DrawContext<'_>, eye: usize, mask: bool) -> crate::Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        let Some(camera) = camera_for_eye(eye, self.cameras.len()).and_then(|i| self.cameras[i].as_ref()) else {
            return Ok(());
        };

        let resources = ctx.resources();
        let shader = resources.shader(PASSTHROUGH_SHADER);
        if self.frontend.as_ref().map(|f| f.shader_id()) != Some(shader.id()) {
            self.frontend = Some(ShaderFrontend::bind(shader.program())?);
        }
        let Some(frontend) = self.frontend.as_ref() else { return Ok(()) };

        let mesh = resources.unit_mesh(UnitMesh::Quad)?;
        let state = if mask { RenderState::OVERLAY_ADDITIVE } else { RenderState::BACKGROUND };
        let mut call = DrawCall::new(Rc::clone(&shader), mesh, state);

        let block = PassthroughUniforms::new(&self.config, mask, camera.distortion.is_some());
        frontend.upload(&shader.bind(), &block, &mut call.uniforms)?;
        call.set_texture("t_camera", camera.image.view().clone());
        if let Some(distortion) = &camera.distortion {
            call.set_texture("t_distortion", distortion.view().clone());
        }

        ctx.push_raw(call);
        Ok(())
    }
}

fn update_distortion(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    index: usize,
    slot: &mut Option<Texture>,
    image: &CameraImage,
) -> Result<(), TextureError> {
    let (w, h) = (image.distortion_width, image.distortion_height);
    if w == 0 || h == 0 || image.distortion.is_empty() {
        *slot = None;
        return Ok(());
    }
    let bytes = distortion_bytes(&image.distortion);
    match slot {
        Some(texture) => {
            texture.update(device, queue, w, h, PixelFormat::Rg16Float, &bytes)?;
        }
        None => {
            let label = format!("camera {index} distortion");
            *slot = Some(Texture::from_bytes(device, queue, &label, w, h, PixelFormat::Rg16Float, &bytes)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::validate_pixels;

    #[test]
    fn distortion_maps_pack_to_rg16() {
        let map = [0.0, 1.0, 0.5, 0.25, 1.0, 0.0];
        let bytes = distortion_bytes(&map);
        // Three texels of two half floats each.
        validate_pixels("map", 3, 1, PixelFormat::Rg16Float, bytes.len()).unwrap();
        let half_at = |i: usize| f16::from_le_bytes([bytes[2 * i], bytes[2 * i + 1]]).to_f32();
        assert_eq!(half_at(2), 0.5);
        assert_eq!(half_at(3), 0.25);
    }

    #[test]
    fn camera_formats() {
        assert_eq!(camera_format(1), Some(PixelFormat::R8));
        assert_eq!(camera_format(4), Some(PixelFormat::Rgba8));
        assert_eq!(camera_format(3), None);
    }

    #[test]
    fn eyes_pick_their_own_camera_when_available() {
        assert_eq!(camera_for_eye(0, 0), None);
        assert_eq!(camera_for_eye(1, 1), Some(0));
        assert_eq!(camera_for_eye(1, 2), Some(1));
    }

    #[test]
    fn distortion_is_only_enabled_with_a_map() {
        let config = PassthroughConfig::default();
        assert_eq!(PassthroughUniforms::new(&config, false, false).use_distortion, 0.0);
        let u = PassthroughUniforms::new(&config, true, true);
        assert_eq!((u.use_distortion, u.mask_mode), (1.0, 1.0));
        assert_eq!(u.luma_threshold, config.luma_threshold);

        let off = PassthroughConfig { use_distortion: false, ..config };
        assert_eq!(PassthroughUniforms::new(&off, false, true).use_distortion, 0.0);
    }
}
