//! Crate-level error type.
//!
//! Each layer owns a narrow error enum (`MeshError`, `UniformError`, …) that
//! names the failed precondition. `Error` aggregates them for call sites that
//! cross layers, such as drawing a primitive (mesh upload + uniform upload +
//! pipeline creation in one call).

use thiserror::Error;

use crate::mesh::MeshError;
use crate::primitives::SvgError;
use crate::render::{PipelineError, TextureError};
use crate::resource::ResourceError;
use crate::shader::{ShaderError, UniformError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error(transparent)]
    Uniform(#[from] UniformError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Texture(#[from] TextureError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Svg(#[from] SvgError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
