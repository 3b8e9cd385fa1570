use std::num::NonZeroU64;
use std::rc::Rc;

use super::draw_queue::UniformArena;
use super::pipeline::{PipelineCache, PipelineKey, ShaderLayout};
use super::{DrawCall, DrawQueue, PixelFormat, RenderCtx, RenderTarget, Texture, TextureError, Viewport};
use crate::mesh::Mesh;
use crate::shader::ResourceKind;

/// Counters from one [`Renderer::flush`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub draws: u32,
    pub skipped: u32,
}

struct Fallback {
    white: Texture,
    sampler: wgpu::Sampler,
    comparison_sampler: wgpu::Sampler,
}

struct Prepared {
    pipeline: Rc<wgpu::RenderPipeline>,
    layout: Rc<ShaderLayout>,
    mesh: Rc<Mesh>,
    textures: Vec<(String, wgpu::TextureView)>,
    /// `(group, binding, offset, size)` for each uniform block.
    blocks: Vec<(u32, u32, u32, u32)>,
    /// `(group, binding, kind, name)` for each texture or sampler.
    resources: Vec<(u32, u32, ResourceKind, String)>,
}

/// Persistent GPU state behind the draw queue: pipeline cache, the shared
/// uniform buffer, and fallback bindings.
#[derive(Default)]
pub struct Renderer {
    pipelines: PipelineCache,
    uniform_buffer: Option<wgpu::Buffer>,
    uniform_capacity: u64,
    fallback: Option<Fallback>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn pipelines(&mut self) -> &mut PipelineCache {
        &mut self.pipelines
    }

    /// Records every queued draw into one render pass on `target` and empties
    /// the queue.
    ///
    /// Draws that cannot be prepared (uninitialized mesh, layout mismatch,
    /// missing entry point) are skipped with a warning; the rest still render.
    pub fn flush(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        queue: &mut DrawQueue,
        clear: Option<wgpu::Color>,
    ) -> Result<FlushStats, TextureError> {
        self.ensure_fallback(ctx)?;

        let depth_format = target.depth_view.and(ctx.depth_format);
        let align = ctx.device.limits().min_uniform_buffer_offset_alignment;
        let mut arena = UniformArena::new(align);
        let mut stats = FlushStats::default();

        let mut batches: Vec<(Option<Viewport>, Vec<Prepared>)> = Vec::new();
        for view in queue.take_views() {
            let mut prepared = Vec::with_capacity(view.calls.len());
            for call in view.calls {
                match self.prepare(ctx, call, depth_format, &mut arena) {
                    Some(p) => prepared.push(p),
                    None => stats.skipped += 1,
                }
            }
            batches.push((view.viewport, prepared));
        }

        let buffer = self.ensure_uniform_buffer(ctx, arena.bytes().len() as u64);
        if !arena.is_empty() {
            ctx.queue.write_buffer(&buffer, 0, arena.bytes());
        }
        let Some(fallback) = self.fallback.as_ref() else { return Ok(stats) };

        // Bind groups before the pass so the pass only records.
        let mut recorded = Vec::with_capacity(batches.len());
        for (viewport, prepared) in batches {
            let mut draws = Vec::with_capacity(prepared.len());
            for p in prepared {
                let groups = bind_groups(ctx.device, &p, &buffer, fallback);
                draws.push((p, groups));
            }
            recorded.push((viewport, draws));
        }

        let (color_load, depth_load, stencil_load) = match clear {
            Some(color) => (wgpu::LoadOp::Clear(color), wgpu::LoadOp::Clear(1.0), wgpu::LoadOp::Clear(0)),
            None => (wgpu::LoadOp::Load, wgpu::LoadOp::Load, wgpu::LoadOp::Load),
        };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("handscape draw pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations { load: color_load, store: wgpu::StoreOp::Store },
                depth_slice: None,
            })],
            depth_stencil_attachment: target.depth_view.filter(|_| depth_format.is_some()).map(|view| {
                wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations { load: depth_load, store: wgpu::StoreOp::Store }),
                    stencil_ops: Some(wgpu::Operations { load: stencil_load, store: wgpu::StoreOp::Store }),
                }
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        for (viewport, draws) in &recorded {
            if let Some(v) = viewport.filter(|v| v.is_valid()) {
                rpass.set_viewport(v.x, v.y, v.width, v.height, 0.0, 1.0);
            }
            for (p, groups) in draws {
                rpass.set_pipeline(&p.pipeline);
                for (index, (group, offsets)) in groups.iter().enumerate() {
                    rpass.set_bind_group(index as u32, group, offsets);
                }
                match p.mesh.draw(&mut rpass) {
                    Ok(()) => stats.draws += 1,
                    Err(e) => {
                        log::warn!("draw of `{}` skipped: {e}", p.mesh.label());
                        stats.skipped += 1;
                    }
                }
            }
        }

        Ok(stats)
    }

    fn prepare(
        &mut self,
        ctx: &RenderCtx<'_>,
        call: DrawCall,
        depth_format: Option<wgpu::TextureFormat>,
        arena: &mut UniformArena,
    ) -> Option<Prepared> {
        let shader = &call.shader;
        let reflection = shader.reflection();

        let (Some(topology), Ok(vertex_layout)) = (call.mesh.topology(), call.mesh.vertex_layout(reflection))
        else {
            log::warn!("draw of `{}` with `{}` skipped: mesh not drawable by this shader", call.mesh.label(), shader.label());
            return None;
        };

        let key = PipelineKey {
            shader: shader.id(),
            vertex_layout,
            topology,
            state: call.state,
            color_format: ctx.surface_format,
            depth_format,
        };
        let (pipeline, layout) = match self
            .pipelines
            .pipeline(ctx.device, shader, key)
            .and_then(|p| self.pipelines.layout(ctx.device, shader).map(|l| (p, l)))
        {
            Ok(v) => v,
            Err(e) => {
                log::warn!("draw of `{}` skipped: {e}", call.mesh.label());
                return None;
            }
        };

        let mut resources = Vec::new();
        for ((group, binding), res) in reflection.resources() {
            if let ResourceKind::Texture { view_dimension, .. } = res.kind {
                if call.texture(&res.name).is_none() && view_dimension != wgpu::TextureViewDimension::D2 {
                    log::warn!("draw of `{}` skipped: no texture bound to `{}`", call.mesh.label(), res.name);
                    return None;
                }
            }
            resources.push((group, binding, res.kind, res.name.clone()));
        }

        let blocks = reflection
            .blocks()
            .map(|((group, binding), block)| {
                let offset = arena.push(call.uniforms.block(group, binding), block.size);
                (group, binding, offset, block.size)
            })
            .collect();

        Some(Prepared { pipeline, layout, mesh: call.mesh, textures: call.textures, blocks, resources })
    }

    fn ensure_uniform_buffer(&mut self, ctx: &RenderCtx<'_>, needed: u64) -> wgpu::Buffer {
        if let Some(buffer) = self.uniform_buffer.as_ref().filter(|_| self.uniform_capacity >= needed) {
            return buffer.clone();
        }
        let capacity = needed.max(4096).next_power_of_two();
        let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("handscape uniform arena"),
            size: capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        log::debug!("uniform arena grown to {capacity} bytes");
        self.uniform_capacity = capacity;
        self.uniform_buffer = Some(buffer.clone());
        buffer
    }

    fn ensure_fallback(&mut self, ctx: &RenderCtx<'_>) -> Result<(), TextureError> {
        if self.fallback.is_some() {
            return Ok(());
        }
        let white = Texture::from_bytes(ctx.device, ctx.queue, "handscape white", 1, 1, PixelFormat::Rgba8, &[255; 4])?;
        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("handscape linear sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });
        let comparison_sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("handscape comparison sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });
        self.fallback = Some(Fallback { white, sampler, comparison_sampler });
        Ok(())
    }
}

/// One bind group per layout group plus its dynamic offsets in binding order.
fn bind_groups(
    device: &wgpu::Device,
    p: &Prepared,
    uniforms: &wgpu::Buffer,
    fallback: &Fallback,
) -> Vec<(wgpu::BindGroup, Vec<u32>)> {
    p.layout
        .groups
        .iter()
        .enumerate()
        .map(|(index, layout)| {
            let group = index as u32;
            let mut entries: Vec<wgpu::BindGroupEntry<'_>> = Vec::new();
            let mut offsets = Vec::new();

            for &(g, binding, offset, size) in &p.blocks {
                if g != group {
                    continue;
                }
                entries.push(wgpu::BindGroupEntry {
                    binding,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: uniforms,
                        offset: 0,
                        size: NonZeroU64::new(u64::from(size)),
                    }),
                });
                offsets.push((binding, offset));
            }

            for (g, binding, kind, name) in &p.resources {
                if *g != group {
                    continue;
                }
                let resource = match kind {
                    ResourceKind::Texture { .. } => {
                        let view = p
                            .textures
                            .iter()
                            .find(|(n, _)| n == name)
                            .map_or(fallback.white.view(), |(_, v)| v);
                        wgpu::BindingResource::TextureView(view)
                    }
                    ResourceKind::Sampler { comparison: true } => {
                        wgpu::BindingResource::Sampler(&fallback.comparison_sampler)
                    }
                    ResourceKind::Sampler { comparison: false } => wgpu::BindingResource::Sampler(&fallback.sampler),
                };
                entries.push(wgpu::BindGroupEntry { binding: *binding, resource });
            }

            entries.sort_by_key(|e| e.binding);
            offsets.sort_by_key(|(binding, _)| *binding);

            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("handscape draw bind group"),
                layout,
                entries: &entries,
            });
            (bind_group, offsets.into_iter().map(|(_, o)| o).collect())
        })
        .collect()
}
