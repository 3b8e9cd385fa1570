use glam::Vec4;

use crate::render::DrawCall;
use crate::shader::{BoundShader, UniformError, UniformMap, UniformValue};

/// Name of the texture a material binds.
pub const DIFFUSE_TEXTURE: &str = "t_diffuse";

/// Named uniform values plus an optional diffuse texture.
///
/// Values the shader does not use are ignored, so one material works with
/// the lit primitive shader and the flat dummy shader alike.
#[derive(Debug, Clone)]
pub struct Material {
    uniforms: UniformMap,
    texture: Option<wgpu::TextureView>,
}

impl Default for Material {
    fn default() -> Self {
        Self::new()
    }
}

impl Material {
    pub fn new() -> Self {
        let mut uniforms = UniformMap::new();
        uniforms.set("diffuse_color", Vec4::ONE);
        uniforms.set("ambient_factor", 0.3f32);
        uniforms.set("texture_mix", 0.0f32);
        Self { uniforms, texture: None }
    }

    /// Unlit material of a single color.
    pub fn flat(color: Vec4) -> Self {
        let mut m = Self::new();
        m.set_color(color);
        m.set_ambient(1.0);
        m
    }

    #[inline]
    pub fn uniforms(&self) -> &UniformMap {
        &self.uniforms
    }

    #[inline]
    pub fn uniforms_mut(&mut self) -> &mut UniformMap {
        &mut self.uniforms
    }

    pub fn set_color(&mut self, color: Vec4) {
        self.uniforms.set("diffuse_color", color);
    }

    pub fn color(&self) -> Vec4 {
        match self.uniforms.get("diffuse_color") {
            Some(UniformValue::Vec4(c)) => Vec4::from_array(*c),
            _ => Vec4::ONE,
        }
    }

    /// Replaces the color's alpha channel.
    pub fn set_opacity(&mut self, opacity: f32) {
        let c = self.color();
        self.set_color(c.truncate().extend(opacity));
    }

    pub fn set_ambient(&mut self, ambient: f32) {
        self.uniforms.set("ambient_factor", ambient);
    }

    /// Samples `view` for the diffuse color from now on.
    pub fn set_texture(&mut self, view: wgpu::TextureView) {
        self.texture = Some(view);
        self.uniforms.set("texture_mix", 1.0f32);
    }

    pub fn clear_texture(&mut self) {
        self.texture = None;
        self.uniforms.set("texture_mix", 0.0f32);
    }

    #[inline]
    pub fn texture(&self) -> Option<&wgpu::TextureView> {
        self.texture.as_ref()
    }

    /// Stages the values and binds the texture on `call`.
    pub fn upload(&self, bound: &BoundShader<'_>, call: &mut DrawCall) -> Result<(), UniformError> {
        self.uniforms.upload(bound, &mut call.uniforms)?;
        if let Some(view) = &self.texture {
            call.set_texture(DIFFUSE_TEXTURE, view.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opacity_replaces_alpha_only() {
        let mut m = Material::flat(Vec4::new(0.2, 0.4, 0.6, 1.0));
        m.set_opacity(0.5);
        assert_eq!(m.color(), Vec4::new(0.2, 0.4, 0.6, 0.5));
    }
}
