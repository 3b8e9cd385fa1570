use super::{DrawMode, Mesh, MeshData, MeshError, Vertex};

/// Append-only vertex sequence for one draw mode.
///
/// The typed `push_*` helpers check the mode so a triangle never ends up in
/// a line list. [`MeshAssembler::build`] leaves the contents in place; call
/// [`MeshAssembler::reset`] to reuse the assembler.
#[derive(Debug, Clone)]
pub struct MeshAssembler<V> {
    mode: DrawMode,
    vertices: Vec<V>,
}

impl<V: Vertex> MeshAssembler<V> {
    pub fn new(mode: DrawMode) -> Self {
        Self { mode, vertices: Vec::new() }
    }

    pub fn with_capacity(mode: DrawMode, capacity: usize) -> Self {
        Self { mode, vertices: Vec::with_capacity(capacity) }
    }

    #[inline]
    pub fn mode(&self) -> DrawMode {
        self.mode
    }

    #[inline]
    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Clears the contents and switches to `mode`.
    pub fn reset(&mut self, mode: DrawMode) {
        self.mode = mode;
        self.vertices.clear();
    }

    #[inline]
    fn expect_mode(&self, expected: DrawMode) -> Result<(), MeshError> {
        if self.mode == expected {
            Ok(())
        } else {
            Err(MeshError::DrawModeMismatch { expected, actual: self.mode })
        }
    }

    // ── pushes ────────────────────────────────────────────────────────────

    /// Valid in any mode.
    #[inline]
    pub fn push_vertex(&mut self, v: V) {
        self.vertices.push(v);
    }

    pub fn push_line(&mut self, a: V, b: V) -> Result<(), MeshError> {
        self.expect_mode(DrawMode::Lines)?;
        self.vertices.extend([a, b]);
        Ok(())
    }

    pub fn push_triangle(&mut self, a: V, b: V, c: V) -> Result<(), MeshError> {
        self.expect_mode(DrawMode::Triangles)?;
        self.vertices.extend([a, b, c]);
        Ok(())
    }

    /// Two triangles `(a, b, c)` and `(a, c, d)`.
    pub fn push_quad(&mut self, a: V, b: V, c: V, d: V) -> Result<(), MeshError> {
        self.expect_mode(DrawMode::Triangles)?;
        self.vertices.extend([a, b, c, a, c, d]);
        Ok(())
    }

    pub fn push_line_adjacency(&mut self, before: V, a: V, b: V, after: V) -> Result<(), MeshError> {
        self.expect_mode(DrawMode::LinesAdjacency)?;
        self.vertices.extend([before, a, b, after]);
        Ok(())
    }

    /// Triangle `(a, b, c)` with the opposite vertex of each neighbouring
    /// triangle interleaved: `a, adj_ab, b, adj_bc, c, adj_ca`.
    #[allow(clippy::too_many_arguments)]
    pub fn push_triangle_adjacency(&mut self, a: V, adj_ab: V, b: V, adj_bc: V, c: V, adj_ca: V) -> Result<(), MeshError> {
        self.expect_mode(DrawMode::TrianglesAdjacency)?;
        self.vertices.extend([a, adj_ab, b, adj_bc, c, adj_ca]);
        Ok(())
    }

    // ── output ────────────────────────────────────────────────────────────

    pub fn build(&self) -> Result<MeshData<V>, MeshError> {
        MeshData::deduplicate(&self.vertices, self.mode)
    }

    pub fn initialize_mesh(&self, mesh: &mut Mesh, device: &wgpu::Device) -> Result<(), MeshError> {
        mesh.initialize(device, &self.vertices, self.mode)
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec3};

    use super::*;
    use crate::mesh::PrimitiveVertex;

    fn p(i: u32) -> PrimitiveVertex {
        PrimitiveVertex::new(Vec3::new(i as f32, 0.0, 0.0), Vec3::Z, Vec2::ZERO)
    }

    #[test]
    fn quad_splits_into_two_triangles() {
        let mut asm = MeshAssembler::new(DrawMode::Triangles);
        asm.push_quad(p(0), p(1), p(2), p(3)).unwrap();
        assert_eq!(asm.vertices(), [p(0), p(1), p(2), p(0), p(2), p(3)]);

        let data = asm.build().unwrap();
        assert_eq!(data.vertices.len(), 4);
        assert_eq!(data.indices, [0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn typed_pushes_check_the_mode() {
        let mut asm = MeshAssembler::new(DrawMode::Lines);
        let err = asm.push_triangle(p(0), p(1), p(2)).unwrap_err();
        assert_eq!(err, MeshError::DrawModeMismatch { expected: DrawMode::Triangles, actual: DrawMode::Lines });
        assert!(asm.is_empty());

        asm.push_line(p(0), p(1)).unwrap();
        asm.push_vertex(p(2));
        assert_eq!(asm.len(), 3);
        assert!(asm.push_line_adjacency(p(0), p(1), p(2), p(3)).is_err());
    }

    #[test]
    fn build_keeps_contents_and_reset_clears() {
        let mut asm = MeshAssembler::new(DrawMode::LinesAdjacency);
        asm.push_line_adjacency(p(0), p(1), p(2), p(3)).unwrap();
        assert!(asm.build().is_err());
        assert_eq!(asm.len(), 4);

        asm.reset(DrawMode::TrianglesAdjacency);
        assert!(asm.is_empty());
        asm.push_triangle_adjacency(p(0), p(1), p(2), p(3), p(4), p(5)).unwrap();
        assert_eq!(asm.len(), 6);
    }

    #[test]
    fn empty_assembler_fails_to_build() {
        let asm = MeshAssembler::<PrimitiveVertex>::new(DrawMode::Triangles);
        assert_eq!(asm.build().unwrap_err(), MeshError::EmptyVertices);
    }
}
