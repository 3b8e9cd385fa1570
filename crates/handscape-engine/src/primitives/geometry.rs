//! Procedural tessellation shared by the primitive shapes.
//!
//! Conventions: axial shapes run along +Z, flat shapes lie in the XY plane
//! facing +Z, angles are measured counter-clockwise from +X. Surfaces are
//! emitted as grids of quads whose `∂P/∂u × ∂P/∂v` points outwards, so
//! front faces wind counter-clockwise.

use std::f32::consts::{FRAC_PI_2, TAU};

use glam::{Vec2, Vec3};

use crate::mesh::{DrawMode, MeshAssembler, MeshData, MeshError, PrimitiveVertex};

/// Target angle covered by one tessellation segment, in radians.
pub const SEGMENT_ANGLE: f32 = 0.1;

pub type Triangles = MeshAssembler<PrimitiveVertex>;

/// Segments needed to cover `angle` (never fewer than one).
#[inline]
pub fn segments_for(angle: f32) -> u32 {
    let n = (angle.abs() / SEGMENT_ANGLE).ceil();
    if n.is_finite() && n >= 1.0 { n as u32 } else { 1 }
}

pub fn triangles() -> Triangles {
    MeshAssembler::new(DrawMode::Triangles)
}

/// Builds a deduplicated mesh, or `None` when nothing was emitted.
pub fn finish(asm: &Triangles) -> Result<Option<MeshData<PrimitiveVertex>>, MeshError> {
    if asm.is_empty() {
        return Ok(None);
    }
    asm.build().map(Some)
}

/// Emits an `nu × nv` quad grid. `f(u, v)` returns position and normal for
/// `u, v ∈ [0, 1]`; `(u, v)` doubles as the texture coordinate.
pub fn push_grid<F>(asm: &mut Triangles, nu: u32, nv: u32, f: F) -> Result<(), MeshError>
where
    F: Fn(f32, f32) -> (Vec3, Vec3),
{
    let vertex = |i: u32, j: u32| {
        let (u, v) = (i as f32 / nu as f32, j as f32 / nv as f32);
        let (p, n) = f(u, v);
        PrimitiveVertex::new(p, n, Vec2::new(u, v))
    };
    for j in 0..nv {
        for i in 0..nu {
            asm.push_quad(vertex(i, j), vertex(i + 1, j), vertex(i + 1, j + 1), vertex(i, j + 1))?;
        }
    }
    Ok(())
}

#[inline]
fn sphere_normal(lon: f32, lat: f32) -> Vec3 {
    Vec3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin())
}

// ── surfaces ──────────────────────────────────────────────────────────────

/// Part of a sphere around `center`, longitude around +Z, latitude from
/// the XY plane.
pub fn push_sphere_patch(
    asm: &mut Triangles,
    center: Vec3,
    radius: f32,
    (lon0, lon1): (f32, f32),
    (lat0, lat1): (f32, f32),
) -> Result<(), MeshError> {
    let (nu, nv) = (segments_for(lon1 - lon0), segments_for(lat1 - lat0));
    push_grid(asm, nu, nv, |u, v| {
        let n = sphere_normal(lon0 + (lon1 - lon0) * u, lat0 + (lat1 - lat0) * v);
        (center + radius * n, n)
    })
}

/// Side of a truncated cone along +Z from `z0` (radius `r0`) to `z1`
/// (radius `r1`), over the angle range.
pub fn push_cone_side(
    asm: &mut Triangles,
    (z0, r0): (f32, f32),
    (z1, r1): (f32, f32),
    (a0, a1): (f32, f32),
) -> Result<(), MeshError> {
    let slope = (r0 - r1).atan2(z1 - z0);
    push_grid(asm, segments_for(a1 - a0), 1, |u, v| {
        let a = a0 + (a1 - a0) * u;
        let radial = Vec3::new(a.cos(), a.sin(), 0.0);
        let r = r0 + (r1 - r0) * v;
        let p = radial * r + Vec3::Z * (z0 + (z1 - z0) * v);
        let n = radial * slope.cos() + Vec3::Z * slope.sin();
        (p, n)
    })
}

/// Annulus sector in the plane `z`, facing +Z (`up`) or -Z.
pub fn push_disk(
    asm: &mut Triangles,
    z: f32,
    (inner, outer): (f32, f32),
    (a0, a1): (f32, f32),
    up: bool,
) -> Result<(), MeshError> {
    let n = if up { Vec3::Z } else { Vec3::NEG_Z };
    let at = move |radial: f32, angular: f32| {
        let a = a0 + (a1 - a0) * angular;
        let r = inner + (outer - inner) * radial;
        (Vec3::new(r * a.cos(), r * a.sin(), z), n)
    };
    if up {
        push_grid(asm, 1, segments_for(a1 - a0), at)
    } else {
        push_grid(asm, segments_for(a1 - a0), 1, |u, v| at(v, u))
    }
}

// ── shapes ────────────────────────────────────────────────────────────────

pub fn partial_sphere(
    radius: f32,
    (lon0, lon1): (f32, f32),
    (lat0, lat1): (f32, f32),
) -> Result<Option<MeshData<PrimitiveVertex>>, MeshError> {
    let (lat0, lat1) = (lat0.max(-FRAC_PI_2), lat1.min(FRAC_PI_2));
    if !(radius > 0.0 && lon0 < lon1 && lat0 < lat1) {
        return Ok(None);
    }
    let mut asm = triangles();
    push_sphere_patch(&mut asm, Vec3::ZERO, radius, (lon0, lon1), (lat0, lat1))?;
    finish(&asm)
}

pub fn sphere(radius: f32) -> Result<Option<MeshData<PrimitiveVertex>>, MeshError> {
    partial_sphere(radius, (0.0, TAU), (-FRAC_PI_2, FRAC_PI_2))
}

/// Open cylinder wall of `height` centered on the origin.
pub fn partial_cylinder(radius: f32, height: f32, (a0, a1): (f32, f32)) -> Result<Option<MeshData<PrimitiveVertex>>, MeshError> {
    if !(radius > 0.0 && height > 0.0 && a0 < a1) {
        return Ok(None);
    }
    let mut asm = triangles();
    let h = height * 0.5;
    push_cone_side(&mut asm, (-h, radius), (h, radius), (a0, a1))?;
    finish(&asm)
}

/// Closed cylinder of `height` centered on the origin.
pub fn cylinder(radius: f32, height: f32) -> Result<Option<MeshData<PrimitiveVertex>>, MeshError> {
    if !(radius > 0.0 && height > 0.0) {
        return Ok(None);
    }
    let mut asm = triangles();
    let h = height * 0.5;
    push_cone_side(&mut asm, (-h, radius), (h, radius), (0.0, TAU))?;
    push_disk(&mut asm, h, (0.0, radius), (0.0, TAU), true)?;
    push_disk(&mut asm, -h, (0.0, radius), (0.0, TAU), false)?;
    finish(&asm)
}

pub fn partial_disk(inner: f32, outer: f32, (a0, a1): (f32, f32)) -> Result<Option<MeshData<PrimitiveVertex>>, MeshError> {
    if !(inner >= 0.0 && inner < outer && a0 < a1) {
        return Ok(None);
    }
    let mut asm = triangles();
    push_disk(&mut asm, 0.0, (inner, outer), (a0, a1), true)?;
    finish(&asm)
}

pub fn disk(radius: f32) -> Result<Option<MeshData<PrimitiveVertex>>, MeshError> {
    partial_disk(0.0, radius, (0.0, TAU))
}

/// Axis-aligned box of `size` centered on the origin.
pub fn cuboid(size: Vec3) -> Result<Option<MeshData<PrimitiveVertex>>, MeshError> {
    if !(size.x > 0.0 && size.y > 0.0 && size.z > 0.0) {
        return Ok(None);
    }
    // (normal, tangent, bitangent) with tangent × bitangent = normal.
    const FACES: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::X, Vec3::Y, Vec3::Z),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::Z, Vec3::X),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::Y, Vec3::X),
    ];
    let half = size * 0.5;
    let mut asm = triangles();
    for (n, t, b) in FACES {
        push_grid(&mut asm, 1, 1, |u, v| {
            let p = n + t * (2.0 * u - 1.0) + b * (2.0 * v - 1.0);
            (p * half, n)
        })?;
    }
    finish(&asm)
}

/// Two spheres on the Z axis (`r0` at `-length/2`, `r1` at `+length/2`)
/// joined by their common tangent cone.
///
/// When one sphere swallows the other only the larger one is emitted.
pub fn bicapsule(r0: f32, r1: f32, length: f32) -> Result<Option<MeshData<PrimitiveVertex>>, MeshError> {
    if !(length >= 0.0 && r0 >= 0.0 && r1 >= 0.0 && r0.max(r1) > 0.0) {
        return Ok(None);
    }
    let (z0, z1) = (-length * 0.5, length * 0.5);
    let mut asm = triangles();

    if length <= (r0 - r1).abs() {
        let (center, radius) = if r0 >= r1 { (z0, r0) } else { (z1, r1) };
        push_sphere_patch(&mut asm, Vec3::Z * center, radius, (0.0, TAU), (-FRAC_PI_2, FRAC_PI_2))?;
        return finish(&asm);
    }

    let alpha = ((r0 - r1) / length).asin();
    if r0 > 0.0 {
        push_sphere_patch(&mut asm, Vec3::Z * z0, r0, (0.0, TAU), (-FRAC_PI_2, alpha))?;
    }
    push_grid(&mut asm, segments_for(TAU), 1, |u, v| {
        let n = sphere_normal(TAU * u, alpha);
        let p0 = Vec3::Z * z0 + n * r0;
        let p1 = Vec3::Z * z1 + n * r1;
        (p0.lerp(p1, v), n)
    })?;
    if r1 > 0.0 {
        push_sphere_patch(&mut asm, Vec3::Z * z1, r1, (0.0, TAU), (alpha, FRAC_PI_2))?;
    }
    finish(&asm)
}

/// Cylinder of `length` between two hemispherical caps of `radius`.
pub fn capsule(radius: f32, length: f32) -> Result<Option<MeshData<PrimitiveVertex>>, MeshError> {
    if radius <= 0.0 {
        return Ok(None);
    }
    bicapsule(radius, radius, length)
}

/// `[-0.5, 0.5]²` in the XY plane facing +Z. Texture v runs downwards so
/// image row 0 lands at the top edge.
pub fn quad(size: Vec2) -> Result<Option<MeshData<PrimitiveVertex>>, MeshError> {
    if !(size.x > 0.0 && size.y > 0.0) {
        return Ok(None);
    }
    let corner = |x: f32, y: f32| {
        PrimitiveVertex::new(Vec3::new(x * size.x, y * size.y, 0.0), Vec3::Z, Vec2::new(x + 0.5, 0.5 - y))
    };
    let mut asm = triangles();
    asm.push_quad(corner(-0.5, -0.5), corner(0.5, -0.5), corner(0.5, 0.5), corner(-0.5, 0.5))?;
    finish(&asm)
}

// ── shared unit meshes ────────────────────────────────────────────────────

/// Canonical shapes whose geometry never varies between instances; size
/// comes from the model transform.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UnitMesh {
    /// Radius 1.
    Sphere,
    /// Edge 1, centered.
    Cube,
    /// Radius 1, height 1 along Z, capped.
    Cylinder,
    /// Radius 1 in the XY plane.
    Disk,
    /// `[-0.5, 0.5]²` in the XY plane.
    Quad,
}

impl UnitMesh {
    pub fn build(self) -> Result<MeshData<PrimitiveVertex>, MeshError> {
        let data = match self {
            Self::Sphere => sphere(1.0)?,
            Self::Cube => cuboid(Vec3::ONE)?,
            Self::Cylinder => cylinder(1.0, 1.0)?,
            Self::Disk => disk(1.0)?,
            Self::Quad => quad(Vec2::ONE)?,
        };
        data.ok_or(MeshError::EmptyVertices)
    }
}
