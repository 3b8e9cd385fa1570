use thiserror::Error;

use super::UniformType;

/// Failure to turn WGSL source into a program.
#[derive(Debug, Error)]
pub enum ShaderError {
    /// Parse or validation failure. `log` carries the full diagnostic with
    /// source excerpts.
    #[error("shader `{label}` failed to compile:\n{log}")]
    Compile { label: String, log: String },

    #[error("shader `{label}` has no {stage} entry point")]
    MissingEntryPoint { label: String, stage: &'static str },
}

/// Mismatch between declared uniforms and what a shader actually exposes.
///
/// These are raised when a frontend or material is bound, never while
/// writing per-frame values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UniformError {
    #[error("uniform `{name}` is not active in shader `{shader}`")]
    Missing { name: String, shader: String },

    #[error("uniform `{name}` type mismatch: declared {expected}, shader has {actual}")]
    TypeMismatch { name: String, expected: UniformType, actual: UniformType },

    #[error("uniform `{name}` array length mismatch: declared {expected}, shader has {actual}")]
    ArrayLengthMismatch { name: String, expected: u32, actual: u32 },

    #[error("uniform `{name}` storage is {actual} bytes, its GPU type needs {expected}")]
    StorageSizeMismatch { name: String, expected: usize, actual: usize },

    #[error("uniforms for shader `{expected}` uploaded while `{bound}` is bound")]
    ShaderNotBound { expected: String, bound: String },
}
