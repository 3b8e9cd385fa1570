use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::{ResourceError, ShaderLibrary, DUMMY_SHADER};
use crate::mesh::Mesh;
use crate::primitives::UnitMesh;
use crate::render::{ObjectUniforms, Texture, TextureError};
use crate::shader::{Shader, ShaderFrontend, ShaderId, UniformError};

/// Load-or-get-cached store for shaders, textures, shared unit meshes and
/// bound uniform frontends.
///
/// Constructed once at startup and passed by reference to everything that
/// draws. Lives on the render thread.
pub struct ResourceCache {
    device: wgpu::Device,
    queue: wgpu::Queue,
    library: ShaderLibrary,
    dummy: Rc<Shader>,
    shaders: RefCell<HashMap<String, Rc<Shader>>>,
    textures: RefCell<HashMap<PathBuf, Rc<Texture>>>,
    meshes: RefCell<HashMap<UnitMesh, Rc<Mesh>>>,
    frontends: RefCell<HashMap<ShaderId, Rc<ShaderFrontend<ObjectUniforms>>>>,
}

impl ResourceCache {
    /// Fails only if the built-in dummy shader does not compile.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, library: ShaderLibrary) -> Result<Self, ResourceError> {
        let source = library.source(DUMMY_SHADER)?;
        let dummy = Rc::new(Shader::compile(device, DUMMY_SHADER, &source)?);
        Ok(Self {
            device: device.clone(),
            queue: queue.clone(),
            library,
            dummy,
            shaders: RefCell::default(),
            textures: RefCell::default(),
            meshes: RefCell::default(),
            frontends: RefCell::default(),
        })
    }

    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    #[inline]
    pub fn dummy_shader(&self) -> Rc<Shader> {
        Rc::clone(&self.dummy)
    }

    // ── shaders ───────────────────────────────────────────────────────────

    /// The shader named `name`, compiling it on first use.
    pub fn try_shader(&self, name: &str) -> Result<Rc<Shader>, ResourceError> {
        if let Some(shader) = self.shaders.borrow().get(name) {
            return Ok(Rc::clone(shader));
        }
        let source = self.library.source(name)?;
        let shader = Rc::new(Shader::compile(&self.device, name, &source)?);
        self.shaders.borrow_mut().insert(name.to_owned(), Rc::clone(&shader));
        Ok(shader)
    }

    /// Like [`try_shader`](Self::try_shader), falling back to the dummy
    /// shader when loading fails.
    pub fn shader(&self, name: &str) -> Rc<Shader> {
        match self.try_shader(name) {
            Ok(shader) => shader,
            Err(e) => {
                log::warn!("shader `{name}` unavailable, using dummy: {e}");
                self.dummy_shader()
            }
        }
    }

    /// Drops a cached shader so the next lookup recompiles it.
    pub fn forget_shader(&self, name: &str) -> Option<ShaderId> {
        let shader = self.shaders.borrow_mut().remove(name)?;
        self.frontends.borrow_mut().remove(&shader.id());
        Some(shader.id())
    }

    /// The [`ObjectUniforms`] frontend bound to `shader`, bound on first use.
    pub fn object_frontend(&self, shader: &Shader) -> Result<Rc<ShaderFrontend<ObjectUniforms>>, UniformError> {
        if let Some(frontend) = self.frontends.borrow().get(&shader.id()) {
            return Ok(Rc::clone(frontend));
        }
        let frontend = Rc::new(ShaderFrontend::bind(shader.program())?);
        self.frontends.borrow_mut().insert(shader.id(), Rc::clone(&frontend));
        Ok(frontend)
    }

    // ── textures ──────────────────────────────────────────────────────────

    /// Decodes an image file into a texture, cached by path.
    pub fn texture(&self, path: impl AsRef<Path>) -> Result<Rc<Texture>, ResourceError> {
        let path = path.as_ref();
        if let Some(texture) = self.textures.borrow().get(path) {
            return Ok(Rc::clone(texture));
        }
        let image = image::open(path).map_err(|source| TextureError::Decode {
            path: path.display().to_string(),
            source,
        })?;
        let label = path.display().to_string();
        let texture = Rc::new(Texture::from_image(&self.device, &self.queue, &label, &image)?);
        log::debug!("loaded texture `{label}` ({}x{})", texture.width(), texture.height());
        self.textures.borrow_mut().insert(path.to_owned(), Rc::clone(&texture));
        Ok(texture)
    }

    // ── meshes ────────────────────────────────────────────────────────────

    /// The process-wide mesh for a canonical unit shape.
    pub fn unit_mesh(&self, kind: UnitMesh) -> Result<Rc<Mesh>, ResourceError> {
        if let Some(mesh) = self.meshes.borrow().get(&kind) {
            return Ok(Rc::clone(mesh));
        }
        let data = kind.build()?;
        let mesh = Rc::new(Mesh::from_data(&self.device, format!("unit {kind:?}"), &data));
        self.meshes.borrow_mut().insert(kind, Rc::clone(&mesh));
        Ok(mesh)
    }
}
