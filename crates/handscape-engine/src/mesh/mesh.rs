use wgpu::util::DeviceExt;

use super::{DrawMode, MeshData, MeshError, Vertex, VertexAttribute, VertexLayout};
use crate::shader::ShaderReflection;

struct MeshBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
    vertex_count: u32,
    mode: DrawMode,
    topology: wgpu::PrimitiveTopology,
    stride: u64,
    attributes: &'static [VertexAttribute],
}

/// GPU vertex and index buffers for one piece of geometry.
///
/// A mesh is either fully uploaded or empty. Re-initializing drops the old
/// buffers first, so a failed upload leaves the mesh uninitialized rather
/// than half-replaced.
pub struct Mesh {
    label: String,
    buffers: Option<MeshBuffers>,
}

impl Mesh {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into(), buffers: None }
    }

    /// Builds and uploads a mesh in one go.
    pub fn from_data<V: Vertex>(device: &wgpu::Device, label: impl Into<String>, data: &MeshData<V>) -> Self {
        let mut mesh = Self::new(label);
        mesh.upload(device, data);
        mesh
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.buffers.is_some()
    }

    pub fn mode(&self) -> Option<DrawMode> {
        self.buffers.as_ref().map(|b| b.mode)
    }

    pub fn topology(&self) -> Option<wgpu::PrimitiveTopology> {
        self.buffers.as_ref().map(|b| b.topology)
    }

    pub fn vertex_count(&self) -> u32 {
        self.buffers.as_ref().map_or(0, |b| b.vertex_count)
    }

    pub fn index_count(&self) -> u32 {
        self.buffers.as_ref().map_or(0, |b| b.index_count)
    }

    /// Deduplicates `vertices` and uploads them.
    pub fn initialize<V: Vertex>(&mut self, device: &wgpu::Device, vertices: &[V], mode: DrawMode) -> Result<(), MeshError> {
        self.buffers = None;
        let data = MeshData::deduplicate(vertices, mode)?;
        self.upload(device, &data);
        Ok(())
    }

    /// Uploads already deduplicated contents.
    pub fn upload<V: Vertex>(&mut self, device: &wgpu::Device, data: &MeshData<V>) {
        self.buffers = None;

        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} vbo", self.label)),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} ibo", self.label)),
            contents: bytemuck::cast_slice(&data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        self.buffers = Some(MeshBuffers {
            vertex,
            index,
            index_count: data.index_count(),
            vertex_count: data.vertices.len() as u32,
            mode: data.mode,
            topology: data.topology,
            stride: V::stride(),
            attributes: V::ATTRIBUTES,
        });
    }

    /// Vertex layout feeding `reflection`'s inputs from this mesh.
    pub fn vertex_layout(&self, reflection: &ShaderReflection) -> Result<VertexLayout, MeshError> {
        let b = self.buffers.as_ref().ok_or(MeshError::Uninitialized)?;
        VertexLayout::resolve(b.stride, b.attributes, reflection)
    }

    /// Records the indexed draw. The pipeline must already be set.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) -> Result<(), MeshError> {
        let b = self.buffers.as_ref().ok_or(MeshError::Uninitialized)?;
        pass.set_vertex_buffer(0, b.vertex.slice(..));
        pass.set_index_buffer(b.index.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..b.index_count, 0, 0..1);
        Ok(())
    }
}

impl std::fmt::Debug for Mesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mesh")
            .field("label", &self.label)
            .field("mode", &self.mode())
            .field("indices", &self.index_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_mesh_is_uninitialized() {
        let mesh = Mesh::new("empty");
        assert!(!mesh.is_initialized());
        assert_eq!(mesh.index_count(), 0);
        assert_eq!(
            mesh.vertex_layout(&ShaderReflection::default()).unwrap_err(),
            MeshError::Uninitialized
        );
    }
}
