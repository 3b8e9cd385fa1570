use bytemuck::{Pod, Zeroable};

use super::MeshError;
use crate::shader::ShaderReflection;

/// One named field of a vertex record.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VertexAttribute {
    pub name: &'static str,
    pub format: wgpu::VertexFormat,
    pub offset: u64,
}

/// A plain-old-data vertex record with named attributes.
///
/// Attributes are matched to shader inputs by name, so one vertex type can
/// feed shaders that consume different subsets of it.
pub trait Vertex: Pod {
    const ATTRIBUTES: &'static [VertexAttribute];

    #[inline]
    fn stride() -> u64 {
        std::mem::size_of::<Self>() as u64
    }
}

/// A vertex buffer layout resolved against one shader's inputs.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct VertexLayout {
    pub stride: u64,
    pub attributes: Vec<wgpu::VertexAttribute>,
}

impl VertexLayout {
    /// Keeps only the attributes the shader consumes, at the shader's
    /// locations. A shader input the vertex type lacks is an error.
    pub fn resolve(
        stride: u64,
        attributes: &[VertexAttribute],
        reflection: &ShaderReflection,
    ) -> Result<Self, MeshError> {
        let mut out = Vec::new();
        for (name, info) in reflection.attributes() {
            let Some(attr) = attributes.iter().find(|a| a.name == name) else {
                return Err(MeshError::MissingAttribute { name: name.to_owned() });
            };
            if info.ty.vertex_format() != Some(attr.format) {
                return Err(MeshError::AttributeFormatMismatch {
                    name: name.to_owned(),
                    vertex: attr.format,
                    shader: info.ty,
                });
            }
            out.push(wgpu::VertexAttribute {
                format: attr.format,
                offset: attr.offset,
                shader_location: info.location,
            });
        }
        out.sort_by_key(|a| a.shader_location);
        Ok(Self { stride, attributes: out })
    }

    pub fn as_wgpu(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &self.attributes,
        }
    }
}

// ── primitive vertex ──────────────────────────────────────────────────────

/// The vertex record every procedural primitive emits.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Default, Pod, Zeroable)]
pub struct PrimitiveVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coord: [f32; 2],
}

impl PrimitiveVertex {
    #[inline]
    pub fn new(position: glam::Vec3, normal: glam::Vec3, tex_coord: glam::Vec2) -> Self {
        Self { position: position.to_array(), normal: normal.to_array(), tex_coord: tex_coord.to_array() }
    }
}

impl Vertex for PrimitiveVertex {
    const ATTRIBUTES: &'static [VertexAttribute] = &[
        VertexAttribute { name: "position", format: wgpu::VertexFormat::Float32x3, offset: 0 },
        VertexAttribute { name: "normal", format: wgpu::VertexFormat::Float32x3, offset: 12 },
        VertexAttribute { name: "tex_coord", format: wgpu::VertexFormat::Float32x2, offset: 24 },
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::ShaderProgram;

    fn reflection(src: &str) -> ShaderReflection {
        ShaderProgram::from_source("vertex-test", src).unwrap().reflection().clone()
    }

    #[test]
    fn unused_vertex_attributes_are_skipped() {
        let r = reflection(
            "@vertex fn vs_main(@location(3) position: vec3<f32>) -> @builtin(position) vec4<f32> {
                return vec4<f32>(position, 1.0);
            }",
        );
        let layout = VertexLayout::resolve(PrimitiveVertex::stride(), PrimitiveVertex::ATTRIBUTES, &r).unwrap();
        assert_eq!(layout.stride, 32);
        assert_eq!(
            layout.attributes,
            [wgpu::VertexAttribute { format: wgpu::VertexFormat::Float32x3, offset: 0, shader_location: 3 }]
        );
    }

    #[test]
    fn shader_inputs_missing_from_the_vertex_are_errors() {
        let r = reflection(
            "@vertex fn vs_main(@location(0) color: vec4<f32>) -> @builtin(position) vec4<f32> {
                return color;
            }",
        );
        let err = VertexLayout::resolve(PrimitiveVertex::stride(), PrimitiveVertex::ATTRIBUTES, &r).unwrap_err();
        assert_eq!(err, MeshError::MissingAttribute { name: "color".into() });
    }

    #[test]
    fn format_mismatch_is_reported() {
        let r = reflection(
            "@vertex fn vs_main(@location(0) normal: vec4<f32>) -> @builtin(position) vec4<f32> {
                return normal;
            }",
        );
        let err = VertexLayout::resolve(PrimitiveVertex::stride(), PrimitiveVertex::ATTRIBUTES, &r).unwrap_err();
        assert!(matches!(err, MeshError::AttributeFormatMismatch { .. }));
    }
}
