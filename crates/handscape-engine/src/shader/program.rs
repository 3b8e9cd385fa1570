use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{ShaderError, ShaderReflection};

/// Process-unique program identifier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ShaderId(u64);

impl ShaderId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ShaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A parsed, validated and reflected WGSL program.
///
/// This is the GPU-independent half of a [`Shader`]: everything the uniform
/// binding layer checks against lives here.
#[derive(Debug)]
pub struct ShaderProgram {
    id: ShaderId,
    label: String,
    reflection: ShaderReflection,
}

impl ShaderProgram {
    /// Parses and validates `source`.
    ///
    /// On failure the returned log carries the front-end diagnostic rendered
    /// against the source. Nothing is kept from a failed build.
    pub fn from_source(label: &str, source: &str) -> Result<Self, ShaderError> {
        let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Compile {
            label: label.to_owned(),
            log: e.emit_to_string(source),
        })?;

        let info = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .map_err(|e| ShaderError::Compile {
            label: label.to_owned(),
            log: e.emit_to_string(source),
        })?;

        let reflection = ShaderReflection::from_module(&module, &info);
        Ok(Self { id: ShaderId::next(), label: label.to_owned(), reflection })
    }

    #[inline]
    pub fn id(&self) -> ShaderId {
        self.id
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn reflection(&self) -> &ShaderReflection {
        &self.reflection
    }

    /// Marks this program as the one subsequent uniform uploads target.
    #[inline]
    pub fn bind(&self) -> BoundShader<'_> {
        BoundShader { program: self }
    }
}

/// Proof that a program is the active one for the draw being recorded.
///
/// Uniform uploads take this token and refuse to write into a program other
/// than the bound one.
#[derive(Debug, Copy, Clone)]
pub struct BoundShader<'a> {
    program: &'a ShaderProgram,
}

impl<'a> BoundShader<'a> {
    #[inline]
    pub fn id(&self) -> ShaderId {
        self.program.id
    }

    #[inline]
    pub fn program(&self) -> &'a ShaderProgram {
        self.program
    }
}

/// A compiled shader: reflected program plus its GPU module.
pub struct Shader {
    program: ShaderProgram,
    module: wgpu::ShaderModule,
}

impl Shader {
    /// Compiles `source` for `device`.
    ///
    /// Validation runs before any GPU object is created, so a failure leaves
    /// nothing behind.
    pub fn compile(device: &wgpu::Device, label: &str, source: &str) -> Result<Self, ShaderError> {
        let program = match ShaderProgram::from_source(label, source) {
            Ok(p) => p,
            Err(e) => {
                log::error!("{e}");
                return Err(e);
            }
        };
        if program.reflection().vertex_entry().is_none() {
            return Err(ShaderError::MissingEntryPoint { label: label.to_owned(), stage: "vertex" });
        }

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        log::debug!("compiled shader `{label}` ({})", program.id());
        Ok(Self { program, module })
    }

    #[inline]
    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    #[inline]
    pub fn id(&self) -> ShaderId {
        self.program.id
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.program.label
    }

    #[inline]
    pub fn reflection(&self) -> &ShaderReflection {
        &self.program.reflection
    }

    #[inline]
    pub fn module(&self) -> &wgpu::ShaderModule {
        &self.module
    }

    #[inline]
    pub fn bind(&self) -> BoundShader<'_> {
        self.program.bind()
    }
}

impl fmt::Debug for Shader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shader").field("program", &self.program).finish_non_exhaustive()
    }
}
