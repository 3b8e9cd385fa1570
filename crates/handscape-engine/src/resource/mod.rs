//! Explicitly owned resource cache.
//!
//! Shaders are looked up by name ([`ShaderLibrary`]) and compiled once.
//! A lookup miss or compile failure is an `Err` from
//! [`ResourceCache::try_shader`]; [`ResourceCache::shader`] turns that into
//! the dummy shader plus a warning.

mod cache;
mod library;

pub use cache::ResourceCache;
pub use library::{ShaderLibrary, DUMMY_SHADER, PASSTHROUGH_SHADER, PRIMITIVE_SHADER};

use thiserror::Error;

use crate::mesh::MeshError;
use crate::render::TextureError;
use crate::shader::ShaderError;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("no shader named `{0}`")]
    ShaderNotFound(String),

    #[error("failed to read `{path}`")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error(transparent)]
    Texture(#[from] TextureError),

    #[error(transparent)]
    Mesh(#[from] MeshError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::ObjectUniforms;
    use crate::shader::{ShaderFrontend, ShaderProgram};

    #[test]
    fn builtin_shaders_validate() {
        for name in [PRIMITIVE_SHADER, PASSTHROUGH_SHADER, DUMMY_SHADER] {
            let src = ShaderLibrary::builtin(name).unwrap();
            let program = ShaderProgram::from_source(name, src).unwrap_or_else(|e| panic!("{e}"));
            assert!(program.reflection().vertex_entry().is_some());
            assert!(program.reflection().fragment_entry().is_some());
        }
    }

    #[test]
    fn object_uniforms_bind_to_primitive_and_dummy_shaders() {
        for name in [PRIMITIVE_SHADER, DUMMY_SHADER] {
            let program = ShaderProgram::from_source(name, ShaderLibrary::builtin(name).unwrap()).unwrap();
            ShaderFrontend::<ObjectUniforms>::bind(&program).unwrap();
        }
    }

    #[test]
    fn primitive_shader_exposes_material_and_texture() {
        let program =
            ShaderProgram::from_source(PRIMITIVE_SHADER, ShaderLibrary::builtin(PRIMITIVE_SHADER).unwrap()).unwrap();
        let r = program.reflection();
        assert!(r.uniform("diffuse_color").is_some());
        assert!(r.uniform("ambient_factor").is_some());
        assert!(r.resource_by_name("t_diffuse").is_some());
        assert_eq!(r.attribute("tex_coord").map(|a| a.location), Some(2));
    }
}
