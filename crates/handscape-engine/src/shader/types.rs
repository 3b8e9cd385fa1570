use std::fmt;

/// GPU-side type of a uniform or vertex attribute.
///
/// Only host-shareable 32-bit scalar, vector and square matrix types are
/// modelled; reflection skips anything else.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UniformType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Int,
    IVec2,
    IVec3,
    IVec4,
    UInt,
    UVec2,
    UVec3,
    UVec4,
    Mat2,
    Mat3,
    Mat4,
}

impl UniformType {
    /// Number of scalar components (columns × rows for matrices).
    #[inline]
    pub const fn component_count(self) -> u32 {
        match self {
            Self::Float | Self::Int | Self::UInt => 1,
            Self::Vec2 | Self::IVec2 | Self::UVec2 => 2,
            Self::Vec3 | Self::IVec3 | Self::UVec3 => 3,
            Self::Vec4 | Self::IVec4 | Self::UVec4 => 4,
            Self::Mat2 => 4,
            Self::Mat3 => 9,
            Self::Mat4 => 16,
        }
    }

    /// Byte size of one component.
    #[inline]
    pub const fn component_size(self) -> u32 {
        4
    }

    /// Tightly packed host size of one element.
    #[inline]
    pub const fn host_size(self) -> u32 {
        self.component_count() * self.component_size()
    }

    /// `(columns, rows)` for matrix types.
    #[inline]
    pub const fn matrix_dims(self) -> Option<(u32, u32)> {
        match self {
            Self::Mat2 => Some((2, 2)),
            Self::Mat3 => Some((3, 3)),
            Self::Mat4 => Some((4, 4)),
            _ => None,
        }
    }

    /// Column stride inside a uniform buffer (`vec2` columns pack to 8 bytes,
    /// `vec3`/`vec4` columns to 16).
    #[inline]
    pub const fn column_stride(self) -> u32 {
        match self.matrix_dims() {
            Some((_, 2)) => 8,
            Some(_) => 16,
            None => self.host_size(),
        }
    }

    /// Vertex buffer format for attribute inputs; matrices cannot be vertex
    /// attributes here.
    pub fn vertex_format(self) -> Option<wgpu::VertexFormat> {
        use wgpu::VertexFormat as F;
        Some(match self {
            Self::Float => F::Float32,
            Self::Vec2 => F::Float32x2,
            Self::Vec3 => F::Float32x3,
            Self::Vec4 => F::Float32x4,
            Self::Int => F::Sint32,
            Self::IVec2 => F::Sint32x2,
            Self::IVec3 => F::Sint32x3,
            Self::IVec4 => F::Sint32x4,
            Self::UInt => F::Uint32,
            Self::UVec2 => F::Uint32x2,
            Self::UVec3 => F::Uint32x3,
            Self::UVec4 => F::Uint32x4,
            Self::Mat2 | Self::Mat3 | Self::Mat4 => return None,
        })
    }

    pub(crate) fn from_naga(inner: &naga::TypeInner) -> Option<Self> {
        use naga::{ScalarKind as K, TypeInner, VectorSize as V};
        match *inner {
            TypeInner::Scalar(s) if s.width == 4 => match s.kind {
                K::Float => Some(Self::Float),
                K::Sint => Some(Self::Int),
                K::Uint => Some(Self::UInt),
                _ => None,
            },
            TypeInner::Vector { size, scalar } if scalar.width == 4 => match (scalar.kind, size) {
                (K::Float, V::Bi) => Some(Self::Vec2),
                (K::Float, V::Tri) => Some(Self::Vec3),
                (K::Float, V::Quad) => Some(Self::Vec4),
                (K::Sint, V::Bi) => Some(Self::IVec2),
                (K::Sint, V::Tri) => Some(Self::IVec3),
                (K::Sint, V::Quad) => Some(Self::IVec4),
                (K::Uint, V::Bi) => Some(Self::UVec2),
                (K::Uint, V::Tri) => Some(Self::UVec3),
                (K::Uint, V::Quad) => Some(Self::UVec4),
                _ => None,
            },
            TypeInner::Matrix { columns, rows, scalar } if scalar.width == 4 && scalar.kind == K::Float => {
                match (columns, rows) {
                    (V::Bi, V::Bi) => Some(Self::Mat2),
                    (V::Tri, V::Tri) => Some(Self::Mat3),
                    (V::Quad, V::Quad) => Some(Self::Mat4),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

impl fmt::Display for UniformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Float => "f32",
            Self::Vec2 => "vec2<f32>",
            Self::Vec3 => "vec3<f32>",
            Self::Vec4 => "vec4<f32>",
            Self::Int => "i32",
            Self::IVec2 => "vec2<i32>",
            Self::IVec3 => "vec3<i32>",
            Self::IVec4 => "vec4<i32>",
            Self::UInt => "u32",
            Self::UVec2 => "vec2<u32>",
            Self::UVec3 => "vec3<u32>",
            Self::UVec4 => "vec4<u32>",
            Self::Mat2 => "mat2x2<f32>",
            Self::Mat3 => "mat3x3<f32>",
            Self::Mat4 => "mat4x4<f32>",
        })
    }
}

/// Memory order of a host-side matrix.
///
/// WGSL matrices are column-major; `RowMajor` storage is transposed on upload.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum MatrixConvention {
    #[default]
    ColumnMajor,
    RowMajor,
}

/// One statically declared uniform of a [`UniformBlock`](super::UniformBlock).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UniformDecl {
    pub name: &'static str,
    pub ty: UniformType,
    pub array_len: u32,
    pub convention: MatrixConvention,
    /// `size_of` the host field.
    pub storage_size: usize,
}

impl UniformDecl {
    /// Host bytes the GPU type requires.
    #[inline]
    pub const fn expected_storage_size(&self) -> usize {
        (self.array_len * self.ty.host_size()) as usize
    }
}
