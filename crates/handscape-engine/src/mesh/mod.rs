//! Geometry assembly and GPU meshes.
//!
//! [`MeshAssembler`] collects vertex records for one [`DrawMode`]; building it
//! deduplicates byte-identical vertices into a [`MeshData`] (unique vertices
//! plus indices), which a [`Mesh`] uploads as vertex and index buffers.

mod assembler;
mod data;
mod draw_mode;
#[allow(clippy::module_inception)]
mod mesh;
mod vertex;

pub use assembler::MeshAssembler;
pub use data::MeshData;
pub use draw_mode::DrawMode;
pub use mesh::Mesh;
pub use vertex::{PrimitiveVertex, Vertex, VertexAttribute, VertexLayout};

use thiserror::Error;

use crate::shader::UniformType;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MeshError {
    #[error("draw mode mismatch: operation needs {expected:?}, assembler is in {actual:?}")]
    DrawModeMismatch { expected: DrawMode, actual: DrawMode },

    #[error("cannot build a mesh from zero vertices")]
    EmptyVertices,

    #[error("draw mode {0:?} has no GPU topology")]
    UnsupportedDrawMode(DrawMode),

    #[error("mesh is not initialized")]
    Uninitialized,

    #[error("shader input `{name}` has no matching vertex attribute")]
    MissingAttribute { name: String },

    #[error("vertex attribute `{name}` is {vertex:?}, shader expects {shader}")]
    AttributeFormatMismatch { name: String, vertex: wgpu::VertexFormat, shader: UniformType },
}
