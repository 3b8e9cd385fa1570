use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Vec2, Vec3};

use super::cache::MeshCache;
use super::geometry::{finish, push_grid, push_sphere_patch, segments_for, triangles};
use super::polygon::{clean_ring, signed_area2};
use super::{Primitive, PrimitiveBase};
use crate::mesh::{MeshData, MeshError, PrimitiveVertex};
use crate::render::DrawContext;

/// Per-vertex joint angles of a counter-clockwise ring: the left turn at
/// each vertex, or zero where the turn is concave (`cross(e_in, e_out).z < 0`).
pub fn joint_turns(ring: &[Vec2]) -> Vec<f32> {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let e_in = ring[i] - ring[(i + n - 1) % n];
            let e_out = ring[(i + 1) % n] - ring[i];
            let cross = e_in.perp_dot(e_out);
            if cross < 0.0 { 0.0 } else { cross.atan2(e_in.dot(e_out)) }
        })
        .collect()
}

/// Outward normal of a counter-clockwise edge.
#[inline]
fn outward(e: Vec2) -> Vec2 {
    Vec2::new(e.y, -e.x).normalize_or_zero()
}

/// A flat polygon in the XY plane with every edge rounded by `radius`:
/// half-cylinders along the edges, sphere wedges at convex corners and flat
/// faces at `z = ±radius`.
pub fn rounded_polygon(points: &[Vec2], radius: f32) -> Result<Option<MeshData<PrimitiveVertex>>, MeshError> {
    let mut ring = clean_ring(points);
    if ring.len() < 3 || radius <= 0.0 {
        return Ok(None);
    }
    let area2 = signed_area2(&ring);
    if area2.abs() <= f32::EPSILON {
        return Ok(None);
    }
    if area2 < 0.0 {
        ring.reverse();
    }

    let n = ring.len();
    let mut asm = triangles();
    let turns = joint_turns(&ring);

    for i in 0..n {
        let (a, b) = (ring[i], ring[(i + 1) % n]);
        let e = b - a;
        let o = outward(e);

        // Edge body: u along the edge, v sweeps -Z → outward → +Z.
        push_grid(&mut asm, 1, segments_for(PI), |u, v| {
            let phi = -FRAC_PI_2 + PI * v;
            let normal = (o * phi.cos()).extend(phi.sin());
            ((a + e * u).extend(0.0) + normal * radius, normal)
        })?;

        // Corner at `b`, sweeping from this edge's normal to the next one's.
        let turn = turns[(i + 1) % n];
        if turn > 0.0 {
            let start = o.y.atan2(o.x);
            push_sphere_patch(&mut asm, b.extend(0.0), radius, (start, start + turn), (-FRAC_PI_2, FRAC_PI_2))?;
        }
    }

    // Caps: fans from the centroid.
    let centroid = ring.iter().copied().sum::<Vec2>() / n as f32;
    let (min, max) = ring.iter().fold((Vec2::MAX, Vec2::MIN), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
    let extent = (max - min).max(Vec2::splat(f32::EPSILON));
    let vertex = |p: Vec2, z: f32, up: bool| {
        let normal = if up { Vec3::Z } else { Vec3::NEG_Z };
        PrimitiveVertex::new(p.extend(z), normal, (p - min) / extent)
    };
    for i in 0..n {
        let (p, q) = (ring[i], ring[(i + 1) % n]);
        asm.push_triangle(vertex(centroid, radius, true), vertex(p, radius, true), vertex(q, radius, true))?;
        asm.push_triangle(vertex(centroid, -radius, false), vertex(q, -radius, false), vertex(p, -radius, false))?;
    }

    finish(&asm)
}

/// Rounded, extruded polygon (hand palms, UI plates).
pub struct RadialPolygonPrim {
    base: PrimitiveBase,
    points: Vec<Vec2>,
    radius: f32,
    cache: MeshCache,
}

impl RadialPolygonPrim {
    pub fn new(points: Vec<Vec2>, radius: f32) -> Self {
        Self { base: PrimitiveBase::new(), points, radius, cache: MeshCache::new("radial polygon") }
    }

    #[inline]
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn set_points(&mut self, points: Vec<Vec2>) {
        self.cache.set(&mut self.points, points);
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.cache.set(&mut self.radius, radius);
    }

    #[inline]
    pub fn cache(&self) -> &MeshCache {
        &self.cache
    }

    pub fn build_mesh(&self) -> Result<Option<MeshData<PrimitiveVertex>>, MeshError> {
        rounded_polygon(&self.points, self.radius)
    }
}

impl Primitive for RadialPolygonPrim {
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

    fn square() -> Vec<Vec2> {
        vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0)]
    }

    #[test]
    fn convex_turns_sum_to_a_full_turn() {
        let turns = joint_turns(&square());
        assert!(turns.iter().all(|t| (t - FRAC_PI_2).abs() < 1e-6));
        assert!((turns.iter().sum::<f32>() - 2.0 * PI).abs() < 1e-5);
    }

    #[test]
    fn concave_corners_get_no_joint() {
        let l_shape = [
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 2.0),
            Vec2::new(0.0, 2.0),
        ];
        let turns = joint_turns(&l_shape);
        assert_eq!(turns[3], 0.0);
        assert_eq!(turns.iter().filter(|t| **t > 0.0).count(), 5);
    }

    #[test]
    fn surface_stays_within_radius_of_the_outline() {
        let radius = 0.25;
        let data = rounded_polygon(&square(), radius).unwrap().unwrap();
        for v in &data.vertices {
            let p = Vec3::from(v.position);
            assert!(p.z.abs() <= radius + 1e-5);
            assert!(p.x >= -radius - 1e-5 && p.x <= 1.0 + radius + 1e-5);
            assert!(p.y >= -radius - 1e-5 && p.y <= 1.0 + radius + 1e-5);
        }
        let top = data.vertices.iter().filter(|v| v.normal == [0.0, 0.0, 1.0]).count();
        assert!(top > 0);
    }

    #[test]
    fn clockwise_input_is_rewound() {
        let mut cw = square();
        cw.reverse();
        let a = rounded_polygon(&square(), 0.1).unwrap().unwrap();
        let b = rounded_polygon(&cw, 0.1).unwrap().unwrap();
        assert_eq!(a.vertices.len(), b.vertices.len());
    }

    #[test]
    fn degenerate_polygons_render_nothing() {
        assert!(rounded_polygon(&square()[..2], 0.1).unwrap().is_none());
        assert!(rounded_polygon(&square(), 0.0).unwrap().is_none());
        let collinear = [Vec2::ZERO, Vec2::X, Vec2::new(2.0, 0.0)];
        assert!(rounded_polygon(&collinear, 0.1).unwrap().is_none());
    }

    #[test]
    fn unchanged_points_keep_the_cache_clean() {
        let mut prim = RadialPolygonPrim::new(square(), 0.1);
        prim.cache().mark_clean();
        prim.set_points(square());
        prim.set_radius(0.1);
        assert!(!prim.cache().is_dirty());
        prim.set_radius(0.2);
        assert!(prim.cache().is_dirty());
    }
}
