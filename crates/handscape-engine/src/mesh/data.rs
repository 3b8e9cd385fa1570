use std::collections::HashMap;

use super::{DrawMode, MeshError, Vertex};

/// CPU-side mesh contents ready for upload: unique vertices plus an index
/// list already lowered to a GPU topology.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData<V> {
    pub vertices: Vec<V>,
    pub indices: Vec<u32>,
    pub mode: DrawMode,
    pub topology: wgpu::PrimitiveTopology,
}

impl<V: Vertex> MeshData<V> {
    /// Collapses byte-identical vertices and builds the index list.
    ///
    /// Unique vertices keep first-seen order; the index list has one entry per
    /// input vertex before topology lowering. `LineLoop` gains a closing
    /// index and `TriangleFan` is expanded into a triangle list.
    pub fn deduplicate(vertices: &[V], mode: DrawMode) -> Result<Self, MeshError> {
        if vertices.is_empty() {
            return Err(MeshError::EmptyVertices);
        }
        let Some(topology) = mode.topology() else {
            return Err(MeshError::UnsupportedDrawMode(mode));
        };

        let mut unique: Vec<V> = Vec::new();
        let mut seen: HashMap<&[u8], u32> = HashMap::with_capacity(vertices.len());
        let mut indices: Vec<u32> = Vec::with_capacity(vertices.len());

        for v in vertices {
            let key = bytemuck::bytes_of(v);
            let index = *seen.entry(key).or_insert_with(|| {
                unique.push(*v);
                (unique.len() - 1) as u32
            });
            indices.push(index);
        }

        let indices = lower_indices(indices, mode);
        Ok(Self { vertices: unique, indices, mode, topology })
    }

    /// Expands back into one vertex per index.
    pub fn expand(&self) -> Vec<V> {
        self.indices.iter().filter_map(|&i| self.vertices.get(i as usize).copied()).collect()
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

fn lower_indices(indices: Vec<u32>, mode: DrawMode) -> Vec<u32> {
    match mode {
        DrawMode::LineLoop if indices.len() > 1 => {
            let mut out = indices;
            out.push(out[0]);
            out
        }
        DrawMode::TriangleFan => {
            let Some(&hub) = indices.first() else { return indices };
            indices.windows(2).skip(1).flat_map(|w| [hub, w[0], w[1]]).collect()
        }
        _ => indices,
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec3};

    use super::*;
    use crate::mesh::PrimitiveVertex;

    fn v(x: f32, y: f32) -> PrimitiveVertex {
        PrimitiveVertex::new(Vec3::new(x, y, 0.0), Vec3::Z, Vec2::new(x, y))
    }

    #[test]
    fn duplicates_collapse_in_first_seen_order() {
        let input = [v(0.0, 0.0), v(1.0, 0.0), v(1.0, 1.0), v(0.0, 0.0), v(1.0, 1.0), v(0.0, 1.0)];
        let data = MeshData::deduplicate(&input, DrawMode::Triangles).unwrap();

        assert_eq!(data.vertices, [v(0.0, 0.0), v(1.0, 0.0), v(1.0, 1.0), v(0.0, 1.0)]);
        assert_eq!(data.indices, [0, 1, 2, 0, 2, 3]);
        assert_eq!(data.expand(), input);
    }

    #[test]
    fn unique_count_never_exceeds_input() {
        let input: Vec<_> = (0..50).map(|i| v((i % 7) as f32, (i % 3) as f32)).collect();
        let data = MeshData::deduplicate(&input, DrawMode::Points).unwrap();
        assert!(data.vertices.len() <= input.len());
        assert_eq!(data.indices.len(), input.len());
        assert_eq!(data.expand(), input);
    }

    #[test]
    fn bitwise_distinct_vertices_are_kept() {
        let a = v(0.0, 0.0);
        let mut b = a;
        b.position[0] = -0.0;
        let data = MeshData::deduplicate(&[a, b], DrawMode::Points).unwrap();
        assert_eq!(data.vertices.len(), 2);
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = MeshData::<PrimitiveVertex>::deduplicate(&[], DrawMode::Triangles).unwrap_err();
        assert_eq!(err, MeshError::EmptyVertices);
    }

    #[test]
    fn adjacency_modes_cannot_be_uploaded() {
        let err = MeshData::deduplicate(&[v(0.0, 0.0); 4], DrawMode::LinesAdjacency).unwrap_err();
        assert_eq!(err, MeshError::UnsupportedDrawMode(DrawMode::LinesAdjacency));
    }

    #[test]
    fn line_loop_is_closed() {
        let data = MeshData::deduplicate(&[v(0.0, 0.0), v(1.0, 0.0), v(1.0, 1.0)], DrawMode::LineLoop).unwrap();
        assert_eq!(data.indices, [0, 1, 2, 0]);
        assert_eq!(data.topology, wgpu::PrimitiveTopology::LineStrip);
    }

    #[test]
    fn triangle_fan_is_expanded() {
        let input = [v(0.0, 0.0), v(1.0, 0.0), v(1.0, 1.0), v(0.0, 1.0)];
        let data = MeshData::deduplicate(&input, DrawMode::TriangleFan).unwrap();
        assert_eq!(data.indices, [0, 1, 2, 0, 2, 3]);
        assert_eq!(data.topology, wgpu::PrimitiveTopology::TriangleList);
    }
}
