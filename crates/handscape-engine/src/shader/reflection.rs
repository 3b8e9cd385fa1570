use std::collections::{BTreeMap, HashMap};

use naga::{AddressSpace, Binding, ShaderStage, TypeInner};

use super::UniformType;

/// Where and how one named uniform lives inside a uniform block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformInfo {
    pub group: u32,
    pub binding: u32,
    /// Byte offset inside the block. This is the uniform's "location".
    pub offset: u32,
    pub ty: UniformType,
    pub array_len: u32,
    /// Distance between consecutive array elements.
    pub stride: u32,
    pub block_size: u32,
}

/// A `var<uniform>` buffer binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    pub name: String,
    pub size: u32,
    pub visibility: wgpu::ShaderStages,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Texture {
        view_dimension: wgpu::TextureViewDimension,
        sample_type: wgpu::TextureSampleType,
    },
    Sampler {
        comparison: bool,
    },
}

/// A texture or sampler binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceInfo {
    pub name: String,
    pub kind: ResourceKind,
    pub visibility: wgpu::ShaderStages,
}

/// A vertex shader input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeInfo {
    pub location: u32,
    pub ty: UniformType,
    pub array_len: u32,
}

/// Everything the engine needs to know about a program's interface,
/// collected once when the program is built.
///
/// Globals that no entry point touches are left out, matching what a GL
/// driver reports as active.
#[derive(Debug, Clone, Default)]
pub struct ShaderReflection {
    uniforms: HashMap<String, UniformInfo>,
    blocks: BTreeMap<(u32, u32), BlockInfo>,
    resources: BTreeMap<(u32, u32), ResourceInfo>,
    attributes: HashMap<String, AttributeInfo>,
    vertex_entry: Option<String>,
    fragment_entry: Option<String>,
}

/// Strips a trailing `[N]` array suffix: `lights[0]` → `lights`.
pub fn base_name(name: &str) -> &str {
    let Some(stripped) = name.strip_suffix(']') else { return name };
    let Some(open) = stripped.rfind('[') else { return name };
    let index = &stripped[open + 1..];
    if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) {
        &name[..open]
    } else {
        name
    }
}

impl ShaderReflection {
    // ── lookups ───────────────────────────────────────────────────────────

    #[inline]
    pub fn uniform(&self, name: &str) -> Option<&UniformInfo> {
        self.uniforms.get(base_name(name))
    }

    #[inline]
    pub fn attribute(&self, name: &str) -> Option<&AttributeInfo> {
        self.attributes.get(base_name(name))
    }

    pub fn uniforms(&self) -> impl Iterator<Item = (&str, &UniformInfo)> {
        self.uniforms.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttributeInfo)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[inline]
    pub fn block(&self, group: u32, binding: u32) -> Option<&BlockInfo> {
        self.blocks.get(&(group, binding))
    }

    /// Uniform blocks ordered by `(group, binding)`.
    pub fn blocks(&self) -> impl Iterator<Item = ((u32, u32), &BlockInfo)> {
        self.blocks.iter().map(|(k, v)| (*k, v))
    }

    /// Textures and samplers ordered by `(group, binding)`.
    pub fn resources(&self) -> impl Iterator<Item = ((u32, u32), &ResourceInfo)> {
        self.resources.iter().map(|(k, v)| (*k, v))
    }

    pub fn resource_by_name(&self, name: &str) -> Option<((u32, u32), &ResourceInfo)> {
        self.resources().find(|(_, r)| r.name == name)
    }

    /// Number of bind groups a pipeline layout needs (highest group + 1).
    pub fn group_count(&self) -> u32 {
        let last = self.blocks.keys().chain(self.resources.keys()).map(|(g, _)| *g).max();
        last.map_or(0, |g| g + 1)
    }

    #[inline]
    pub fn vertex_entry(&self) -> Option<&str> {
        self.vertex_entry.as_deref()
    }

    #[inline]
    pub fn fragment_entry(&self) -> Option<&str> {
        self.fragment_entry.as_deref()
    }

    // ── construction ──────────────────────────────────────────────────────

    pub(crate) fn from_module(module: &naga::Module, info: &naga::valid::ModuleInfo) -> Self {
        let mut out = Self::default();

        for entry in &module.entry_points {
            match entry.stage {
                ShaderStage::Vertex if out.vertex_entry.is_none() => {
                    out.vertex_entry = Some(entry.name.clone());
                    out.reflect_attributes(module, &entry.function);
                }
                ShaderStage::Fragment if out.fragment_entry.is_none() => {
                    out.fragment_entry = Some(entry.name.clone());
                }
                _ => {}
            }
        }

        for (handle, var) in module.global_variables.iter() {
            let Some(rb) = var.binding.as_ref() else { continue };

            let mut visibility = wgpu::ShaderStages::NONE;
            for (index, entry) in module.entry_points.iter().enumerate() {
                if !info.get_entry_point(index)[handle].is_empty() {
                    visibility |= stage_flag(entry.stage);
                }
            }
            if visibility.is_empty() {
                continue;
            }

            let name = var.name.clone().unwrap_or_default();
            let key = (rb.group, rb.binding);
            let inner = &module.types[var.ty].inner;

            match var.space {
                AddressSpace::Uniform => {
                    let size = inner.size(module.to_ctx());
                    out.reflect_block(module, &name, key, var.ty, size);
                    out.blocks.insert(key, BlockInfo { name, size, visibility });
                }
                AddressSpace::Handle => {
                    if let Some(kind) = resource_kind(inner) {
                        out.resources.insert(key, ResourceInfo { name, kind, visibility });
                    } else {
                        log::debug!("shader reflection: skipping unsupported resource `{name}`");
                    }
                }
                _ => {}
            }
        }

        out
    }

    fn reflect_block(
        &mut self,
        module: &naga::Module,
        block_name: &str,
        (group, binding): (u32, u32),
        block_ty: naga::Handle<naga::Type>,
        block_size: u32,
    ) {
        let mut add = |name: &str, offset: u32, ty: naga::Handle<naga::Type>| {
            let Some((ty, array_len, stride)) = uniform_shape(module, ty) else {
                log::debug!("shader reflection: skipping uniform `{name}` with unsupported type");
                return;
            };
            let name = base_name(name).to_owned();
            if self.uniforms.contains_key(&name) {
                log::warn!("shader reflection: uniform `{name}` declared in several blocks; keeping the first");
                return;
            }
            self.uniforms.insert(
                name,
                UniformInfo { group, binding, offset, ty, array_len, stride, block_size },
            );
        };

        match &module.types[block_ty].inner {
            TypeInner::Struct { members, .. } => {
                for member in members {
                    let Some(name) = member.name.as_deref() else { continue };
                    add(name, member.offset, member.ty);
                }
            }
            // A bare `var<uniform> tint: vec4<f32>` is its own single uniform.
            _ => add(block_name, 0, block_ty),
        }
    }

    fn reflect_attributes(&mut self, module: &naga::Module, function: &naga::Function) {
        for arg in &function.arguments {
            match &arg.binding {
                Some(binding) => {
                    if let Some(name) = arg.name.as_deref() {
                        self.add_attribute(module, name, binding, arg.ty);
                    }
                }
                None => {
                    // Struct-typed input: each member carries its own binding.
                    let TypeInner::Struct { members, .. } = &module.types[arg.ty].inner else {
                        continue;
                    };
                    for member in members {
                        if let (Some(name), Some(binding)) = (member.name.as_deref(), member.binding.as_ref()) {
                            self.add_attribute(module, name, binding, member.ty);
                        }
                    }
                }
            }
        }
    }

    fn add_attribute(&mut self, module: &naga::Module, name: &str, binding: &Binding, ty: naga::Handle<naga::Type>) {
        let Binding::Location { location, .. } = *binding else { return };
        let Some(ty) = UniformType::from_naga(&module.types[ty].inner) else {
            log::debug!("shader reflection: skipping attribute `{name}` with unsupported type");
            return;
        };
        self.attributes
            .insert(base_name(name).to_owned(), AttributeInfo { location, ty, array_len: 1 });
    }
}

fn stage_flag(stage: ShaderStage) -> wgpu::ShaderStages {
    match stage {
        ShaderStage::Vertex => wgpu::ShaderStages::VERTEX,
        ShaderStage::Fragment => wgpu::ShaderStages::FRAGMENT,
        ShaderStage::Compute => wgpu::ShaderStages::COMPUTE,
        _ => wgpu::ShaderStages::NONE,
    }
}

/// `(element type, array length, element stride)` of a uniform member.
fn uniform_shape(module: &naga::Module, ty: naga::Handle<naga::Type>) -> Option<(UniformType, u32, u32)> {
    match &module.types[ty].inner {
        TypeInner::Array { base, size: naga::ArraySize::Constant(len), stride } => {
            let elem = UniformType::from_naga(&module.types[*base].inner)?;
            Some((elem, len.get(), *stride))
        }
        inner => {
            let elem = UniformType::from_naga(inner)?;
            Some((elem, 1, inner.size(module.to_ctx())))
        }
    }
}

fn resource_kind(inner: &TypeInner) -> Option<ResourceKind> {
    use naga::{ImageClass, ImageDimension, ScalarKind};
    match *inner {
        TypeInner::Sampler { comparison } => Some(ResourceKind::Sampler { comparison }),
        TypeInner::Image { dim, arrayed, class } => {
            let view_dimension = match (dim, arrayed) {
                (ImageDimension::D1, false) => wgpu::TextureViewDimension::D1,
                (ImageDimension::D2, false) => wgpu::TextureViewDimension::D2,
                (ImageDimension::D2, true) => wgpu::TextureViewDimension::D2Array,
                (ImageDimension::D3, false) => wgpu::TextureViewDimension::D3,
                (ImageDimension::Cube, false) => wgpu::TextureViewDimension::Cube,
                (ImageDimension::Cube, true) => wgpu::TextureViewDimension::CubeArray,
                _ => return None,
            };
            let sample_type = match class {
                ImageClass::Sampled { kind: ScalarKind::Float, .. } => {
                    wgpu::TextureSampleType::Float { filterable: true }
                }
                ImageClass::Sampled { kind: ScalarKind::Sint, .. } => wgpu::TextureSampleType::Sint,
                ImageClass::Sampled { kind: ScalarKind::Uint, .. } => wgpu::TextureSampleType::Uint,
                ImageClass::Depth { .. } => wgpu::TextureSampleType::Depth,
                _ => return None,
            };
            Some(ResourceKind::Texture { view_dimension, sample_type })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_suffixes_are_stripped() {
        assert_eq!(base_name("lights[0]"), "lights");
        assert_eq!(base_name("lights[12]"), "lights");
        assert_eq!(base_name("lights"), "lights");
        assert_eq!(base_name("odd[x]"), "odd[x]");
        assert_eq!(base_name("odd[]"), "odd[]");
    }
}
