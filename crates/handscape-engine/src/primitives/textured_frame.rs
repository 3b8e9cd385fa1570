use glam::{Vec2, Vec3};

use super::cache::MeshCache;
use super::geometry::{finish, triangles};
use super::{Primitive, PrimitiveBase};
use crate::mesh::{MeshData, MeshError, PrimitiveVertex};
use crate::render::DrawContext;

/// Per-edge distances in the XY plane.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct EdgeOffsets {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
}

impl EdgeOffsets {
    pub const fn uniform(d: f32) -> Self {
        Self { left: d, right: d, bottom: d, top: d }
    }
}

/// Grid lines along one axis: outer edge, inner edge, inner edge, outer edge.
///
/// Inner edges that would cross collapse onto their midpoint.
fn axis_edges(min: f32, max: f32, inner: (f32, f32), outer: (f32, f32)) -> [f32; 4] {
    let mut lo = min + inner.0;
    let mut hi = max - inner.1;
    if lo > hi {
        let mid = 0.5 * (lo + hi);
        lo = mid;
        hi = mid;
    }
    [min - outer.0, lo, hi, max + outer.1]
}

/// The 4×4 grid lines of a frame around a basis rectangle of `size`
/// centered on the origin: `(xs, ys)`, each ordered from low to high.
pub fn frame_edges(size: Vec2, inner: EdgeOffsets, outer: EdgeOffsets) -> ([f32; 4], [f32; 4]) {
    let half = size * 0.5;
    let xs = axis_edges(-half.x, half.x, (inner.left, inner.right), (outer.left, outer.right));
    let ys = axis_edges(-half.y, half.y, (inner.bottom, inner.top), (outer.bottom, outer.top));
    (xs, ys)
}

/// A nine-slice frame: corners keep their texture proportions while the
/// edges and center stretch with the basis rectangle.
pub struct TexturedFrame {
    base: PrimitiveBase,
    size: Vec2,
    inner: EdgeOffsets,
    outer: EdgeOffsets,
    /// Texture u at each x grid line.
    tex_u: [f32; 4],
    /// Texture v at each y grid line (v runs downwards).
    tex_v: [f32; 4],
    cache: MeshCache,
}

impl TexturedFrame {
    pub fn new(size: Vec2, inner: EdgeOffsets, outer: EdgeOffsets) -> Self {
        Self {
            base: PrimitiveBase::new(),
            size,
            inner,
            outer,
            tex_u: [0.0, 0.25, 0.75, 1.0],
            tex_v: [1.0, 0.75, 0.25, 0.0],
            cache: MeshCache::new("textured frame"),
        }
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn set_size(&mut self, size: Vec2) {
        self.cache.set(&mut self.size, size);
    }

    #[inline]
    pub fn inner(&self) -> EdgeOffsets {
        self.inner
    }

    pub fn set_inner(&mut self, inner: EdgeOffsets) {
        self.cache.set(&mut self.inner, inner);
    }

    #[inline]
    pub fn outer(&self) -> EdgeOffsets {
        self.outer
    }

    pub fn set_outer(&mut self, outer: EdgeOffsets) {
        self.cache.set(&mut self.outer, outer);
    }

    /// Texture coordinates of the slice lines, left to right and bottom to
    /// top.
    pub fn set_texture_slices(&mut self, u: [f32; 4], v: [f32; 4]) {
        self.cache.set(&mut self.tex_u, u);
        self.cache.set(&mut self.tex_v, v);
    }

    #[inline]
    pub fn cache(&self) -> &MeshCache {
        &self.cache
    }

    pub fn build_mesh(&self) -> Result<Option<MeshData<PrimitiveVertex>>, MeshError> {
        if !(self.size.x > 0.0 && self.size.y > 0.0) {
            return Ok(None);
        }
        let (xs, ys) = frame_edges(self.size, self.inner, self.outer);
        let vertex = |i: usize, j: usize| {
            PrimitiveVertex::new(Vec3::new(xs[i], ys[j], 0.0), Vec3::Z, Vec2::new(self.tex_u[i], self.tex_v[j]))
        };
        let mut asm = triangles();
        for j in 0..3 {
            for i in 0..3 {
                asm.push_quad(vertex(i, j), vertex(i + 1, j), vertex(i + 1, j + 1), vertex(i, j + 1))?;
            }
        }
        finish(&asm)
    }
}

impl Primitive for TexturedFrame {
    fn base(&self) -> &PrimitiveBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PrimitiveBase {
        &mut self.base
    }

    fn draw_contents(&self, ctx: &mut DrawContext<'_>) -> crate::Result<()> {
        super::draw_cached(ctx, &self.base, &self.cache, || self.build_mesh())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_inner_edges_collapse_to_the_midpoint() {
        let inner = EdgeOffsets { left: 8.0, right: 8.0, bottom: 1.0, top: 1.0 };
        let (xs, ys) = frame_edges(Vec2::new(10.0, 10.0), inner, EdgeOffsets::default());
        assert_eq!(xs[1], xs[2]);
        assert_eq!(xs[1], 0.0);
        assert_eq!(ys, [-5.0, -4.0, 4.0, 5.0]);
    }

    #[test]
    fn lopsided_overlap_collapses_between_the_edges() {
        let inner = EdgeOffsets { left: 9.0, right: 3.0, ..EdgeOffsets::default() };
        let (xs, _) = frame_edges(Vec2::new(10.0, 10.0), inner, EdgeOffsets::default());
        // Would-be edges at 4 and 2.
        assert_eq!(xs[1], 3.0);
        assert_eq!(xs[2], 3.0);
    }

    #[test]
    fn outer_offsets_grow_the_frame() {
        let (xs, ys) = frame_edges(Vec2::new(2.0, 4.0), EdgeOffsets::uniform(0.5), EdgeOffsets::uniform(1.0));
        assert_eq!(xs, [-2.0, -0.5, 0.5, 2.0]);
        assert_eq!(ys, [-3.0, -1.5, 1.5, 3.0]);
    }

    #[test]
    fn frame_emits_nine_slices() {
        let frame = TexturedFrame::new(Vec2::new(4.0, 2.0), EdgeOffsets::uniform(0.5), EdgeOffsets::uniform(0.25));
        let data = frame.build_mesh().unwrap().unwrap();
        assert_eq!(data.vertices.len(), 16);
        assert_eq!(data.indices.len(), 9 * 6);
        let corner = data.vertices.iter().find(|v| v.position[0] < -2.0 && v.position[1] > 1.0).unwrap();
        assert_eq!(corner.tex_coord, [0.0, 0.0]);
    }

    #[test]
    fn unchanged_offsets_keep_the_cache() {
        let mut frame = TexturedFrame::new(Vec2::ONE, EdgeOffsets::default(), EdgeOffsets::default());
        frame.cache().mark_clean();
        frame.set_inner(EdgeOffsets::default());
        assert!(!frame.cache().is_dirty());
        frame.set_outer(EdgeOffsets::uniform(0.1));
        assert!(frame.cache().is_dirty());
    }
}
