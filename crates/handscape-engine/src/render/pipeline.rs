use std::collections::HashMap;
use std::num::NonZeroU64;
use std::rc::Rc;

use thiserror::Error;

use super::RenderState;
use crate::mesh::{MeshError, VertexLayout};
use crate::shader::{ResourceKind, Shader, ShaderId, ShaderReflection};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("shader `{label}` has no {stage} entry point")]
    MissingEntryPoint { label: String, stage: &'static str },

    #[error("shader `{label}` uses {count} bind groups, device allows {max}")]
    TooManyBindGroups { label: String, count: u32, max: u32 },

    #[error(transparent)]
    Layout(#[from] MeshError),
}

/// Everything that distinguishes one render pipeline from another.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub shader: ShaderId,
    pub vertex_layout: VertexLayout,
    pub topology: wgpu::PrimitiveTopology,
    pub state: RenderState,
    pub color_format: wgpu::TextureFormat,
    pub depth_format: Option<wgpu::TextureFormat>,
}

/// Bind group layouts derived from one shader's reflection.
pub struct ShaderLayout {
    pub groups: Vec<wgpu::BindGroupLayout>,
    pipeline_layout: wgpu::PipelineLayout,
}

/// Bind group layout entries per group index, in binding order.
///
/// Uniform blocks use dynamic offsets so every draw of a frame can share one
/// uniform buffer.
pub fn layout_entries(reflection: &ShaderReflection) -> Vec<Vec<wgpu::BindGroupLayoutEntry>> {
    let mut groups: Vec<Vec<wgpu::BindGroupLayoutEntry>> =
        (0..reflection.group_count()).map(|_| Vec::new()).collect();

    for ((group, binding), block) in reflection.blocks() {
        groups[group as usize].push(wgpu::BindGroupLayoutEntry {
            binding,
            visibility: block.visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: NonZeroU64::new(u64::from(block.size)),
            },
            count: None,
        });
    }

    for ((group, binding), resource) in reflection.resources() {
        let ty = match resource.kind {
            ResourceKind::Texture { view_dimension, sample_type } => wgpu::BindingType::Texture {
                sample_type,
                view_dimension,
                multisampled: false,
            },
            ResourceKind::Sampler { comparison: true } => {
                wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison)
            }
            ResourceKind::Sampler { comparison: false } => {
                wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
            }
        };
        groups[group as usize].push(wgpu::BindGroupLayoutEntry {
            binding,
            visibility: resource.visibility,
            ty,
            count: None,
        });
    }

    for entries in &mut groups {
        entries.sort_by_key(|e| e.binding);
    }
    groups
}

/// Render pipelines and bind group layouts, created on first use.
#[derive(Default)]
pub struct PipelineCache {
    layouts: HashMap<ShaderId, Rc<ShaderLayout>>,
    pipelines: HashMap<PipelineKey, Rc<wgpu::RenderPipeline>>,
}

impl PipelineCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Forgets everything built for `shader` (after a hot reload).
    pub fn evict_shader(&mut self, shader: ShaderId) {
        self.layouts.remove(&shader);
        self.pipelines.retain(|key, _| key.shader != shader);
    }

    pub fn layout(&mut self, device: &wgpu::Device, shader: &Shader) -> Result<Rc<ShaderLayout>, PipelineError> {
        if let Some(layout) = self.layouts.get(&shader.id()) {
            return Ok(Rc::clone(layout));
        }

        let reflection = shader.reflection();
        let max = device.limits().max_bind_groups;
        let count = reflection.group_count();
        if count > max {
            return Err(PipelineError::TooManyBindGroups { label: shader.label().to_owned(), count, max });
        }

        let groups: Vec<wgpu::BindGroupLayout> = layout_entries(reflection)
            .iter()
            .enumerate()
            .map(|(i, entries)| {
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(&format!("{} bgl {i}", shader.label())),
                    entries,
                })
            })
            .collect();
        let group_refs: Vec<&wgpu::BindGroupLayout> = groups.iter().collect();

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} pipeline layout", shader.label())),
            bind_group_layouts: &group_refs,
            immediate_size: 0,
        });

        let layout = Rc::new(ShaderLayout { groups, pipeline_layout });
        self.layouts.insert(shader.id(), Rc::clone(&layout));
        Ok(layout)
    }

    pub fn pipeline(
        &mut self,
        device: &wgpu::Device,
        shader: &Shader,
        key: PipelineKey,
    ) -> Result<Rc<wgpu::RenderPipeline>, PipelineError> {
        if let Some(p) = self.pipelines.get(&key) {
            return Ok(Rc::clone(p));
        }

        let reflection = shader.reflection();
        let label = shader.label().to_owned();
        let Some(vs_entry) = reflection.vertex_entry() else {
            return Err(PipelineError::MissingEntryPoint { label, stage: "vertex" });
        };
        let Some(fs_entry) = reflection.fragment_entry() else {
            return Err(PipelineError::MissingEntryPoint { label, stage: "fragment" });
        };

        let layout = self.layout(device, shader)?;
        let strip_index_format = matches!(
            key.topology,
            wgpu::PrimitiveTopology::LineStrip | wgpu::PrimitiveTopology::TriangleStrip
        )
        .then_some(wgpu::IndexFormat::Uint32);

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{label} pipeline")),
            layout: Some(&layout.pipeline_layout),

            vertex: wgpu::VertexState {
                module: shader.module(),
                entry_point: Some(vs_entry),
                compilation_options: Default::default(),
                buffers: &[key.vertex_layout.as_wgpu()],
            },

            fragment: Some(wgpu::FragmentState {
                module: shader.module(),
                entry_point: Some(fs_entry),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: key.color_format,
                    blend: key.state.blend_state(),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: key.topology,
                strip_index_format,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: key.state.cull_mode(),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: key.depth_format.map(|f| key.state.depth_stencil(f)),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("created pipeline for `{label}` ({:?}, {:?})", key.topology, key.state.blend);
        let pipeline = Rc::new(pipeline);
        self.pipelines.insert(key, Rc::clone(&pipeline));
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::ShaderProgram;

    #[test]
    fn layout_entries_follow_reflection() {
        let program = ShaderProgram::from_source(
            "layout-test",
            r#"
struct Object { model: mat4x4<f32>, alpha_mask: f32 }
@group(0) @binding(0) var<uniform> object: Object;
@group(1) @binding(0) var t_color: texture_2d<f32>;
@group(1) @binding(1) var s_color: sampler;

@vertex fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return object.model * vec4<f32>(position, 1.0);
}

@fragment fn fs_main() -> @location(0) vec4<f32> {
    let c = textureSample(t_color, s_color, vec2<f32>(0.5, 0.5));
    return vec4<f32>(c.rgb, c.a * object.alpha_mask);
}
"#,
        )
        .unwrap();

        let groups = layout_entries(program.reflection());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 1);
        assert!(matches!(
            groups[0][0].ty,
            wgpu::BindingType::Buffer { has_dynamic_offset: true, min_binding_size: Some(_), .. }
        ));
        assert_eq!(groups[1].iter().map(|e| e.binding).collect::<Vec<_>>(), [0, 1]);
        assert!(matches!(groups[1][0].ty, wgpu::BindingType::Texture { .. }));
        assert!(matches!(
            groups[1][1].ty,
            wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
        ));
        assert_eq!(groups[1][0].visibility, wgpu::ShaderStages::FRAGMENT);
    }
}
