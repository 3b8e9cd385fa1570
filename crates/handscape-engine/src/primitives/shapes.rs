use std::f32::consts::{FRAC_PI_2, TAU};

use glam::{DAffine3, DVec3, Vec2, Vec3};

use super::cache::MeshCache;
use super::geometry::{self, UnitMesh};
use super::{draw_cached, draw_unit, Primitive, PrimitiveBase};
use crate::mesh::{MeshData, MeshError, PrimitiveVertex};
use crate::render::{DrawContext, Texture};

type Built = Result<Option<MeshData<PrimitiveVertex>>, MeshError>;

/// Implements [`Primitive`] for a shape with a `base` field.
macro_rules! primitive {
    ($ty:ty, |$this:ident, $ctx:ident| $body:block) => {
        impl Primitive for $ty {
            fn base(&self) -> &PrimitiveBase {
                &self.base
            }

            fn base_mut(&mut self) -> &mut PrimitiveBase {
                &mut self.base
            }

            fn draw_contents(&self, $ctx: &mut DrawContext<'_>) -> crate::Result<()> {
                let $this = self;
                $body
            }
        }
    };
}

fn scale(x: f32, y: f32, z: f32) -> DAffine3 {
    DAffine3::from_scale(DVec3::new(x as f64, y as f64, z as f64))
}

// ── unit-mesh shapes ──────────────────────────────────────────────────────

pub struct Sphere {
    base: PrimitiveBase,
    radius: f32,
}

impl Sphere {
    pub fn new(radius: f32) -> Self {
        Self { base: PrimitiveBase::new(), radius }
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
    }
}

primitive!(Sphere, |this, ctx| {
    if this.radius <= 0.0 {
        return Ok(());
    }
    let r = this.radius;
    draw_unit(ctx, &this.base, UnitMesh::Sphere, scale(r, r, r))
});

/// Capped cylinder along Z, centered on the origin.
pub struct Cylinder {
    base: PrimitiveBase,
    radius: f32,
    height: f32,
}

impl Cylinder {
    pub fn new(radius: f32, height: f32) -> Self {
        Self { base: PrimitiveBase::new(), radius, height }
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
    }

    pub fn set_height(&mut self, height: f32) {
        self.height = height;
    }
}

primitive!(Cylinder, |this, ctx| {
    if this.radius <= 0.0 || this.height <= 0.0 {
        return Ok(());
    }
    draw_unit(ctx, &this.base, UnitMesh::Cylinder, scale(this.radius, this.radius, this.height))
});

pub struct BoxPrim {
    base: PrimitiveBase,
    size: Vec3,
}

impl BoxPrim {
    pub fn new(size: Vec3) -> Self {
        Self { base: PrimitiveBase::new(), size }
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.size
    }

    pub fn set_size(&mut self, size: Vec3) {
        self.size = size;
    }
}

primitive!(BoxPrim, |this, ctx| {
    if this.size.min_element() <= 0.0 {
        return Ok(());
    }
    draw_unit(ctx, &this.base, UnitMesh::Cube, scale(this.size.x, this.size.y, this.size.z))
});

/// Filled circle in the XY plane.
pub struct Disk {
    base: PrimitiveBase,
    radius: f32,
}

impl Disk {
    pub fn new(radius: f32) -> Self {
        Self { base: PrimitiveBase::new(), radius }
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
    }
}

primitive!(Disk, |this, ctx| {
    if this.radius <= 0.0 {
        return Ok(());
    }
    draw_unit(ctx, &this.base, UnitMesh::Disk, scale(this.radius, this.radius, 1.0))
});

/// Rectangle of `size` in the XY plane, centered on the origin.
pub struct RectanglePrim {
    base: PrimitiveBase,
    size: Vec2,
}

impl RectanglePrim {
    pub fn new(size: Vec2) -> Self {
        Self { base: PrimitiveBase::new(), size }
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn set_size(&mut self, size: Vec2) {
        self.size = size;
    }
}

primitive!(RectanglePrim, |this, ctx| {
    if this.size.min_element() <= 0.0 {
        return Ok(());
    }
    draw_unit(ctx, &this.base, UnitMesh::Quad, scale(this.size.x, this.size.y, 1.0))
});

/// A textured rectangle: virtual windows, icons.
pub struct ImagePrimitive {
    base: PrimitiveBase,
    size: Vec2,
    /// Width over height of the bound image.
    aspect: f32,
}

impl ImagePrimitive {
    pub fn new(size: Vec2) -> Self {
        let mut base = PrimitiveBase::new();
        // Images are shown as-is, unshaded.
        base.material.set_ambient(1.0);
        Self { base, size, aspect: 1.0 }
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn set_size(&mut self, size: Vec2) {
        self.size = size;
    }

    #[inline]
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn set_texture(&mut self, texture: &Texture) {
        self.aspect = texture.aspect();
        self.base.material.set_texture(texture.view().clone());
    }

    /// Resizes to `height`, keeping the image's aspect ratio.
    pub fn fit_height(&mut self, height: f32) {
        self.size = Vec2::new(height * self.aspect, height);
    }

    /// Resizes to `width`, keeping the image's aspect ratio.
    pub fn fit_width(&mut self, width: f32) {
        if self.aspect > 0.0 {
            self.size = Vec2::new(width, width / self.aspect);
        }
    }
}

primitive!(ImagePrimitive, |this, ctx| {
    if this.size.min_element() <= 0.0 || this.base.material.texture().is_none() {
        return Ok(());
    }
    draw_unit(ctx, &this.base, UnitMesh::Quad, scale(this.size.x, this.size.y, 1.0))
});

// ── cached shapes ─────────────────────────────────────────────────────────

/// Annulus sector in the XY plane, `sweep` radians counter-clockwise from
/// `start`.
pub struct PartialDisk {
    base: PrimitiveBase,
    inner: f32,
    outer: f32,
    start: f32,
    sweep: f32,
    cache: MeshCache,
}

impl PartialDisk {
    pub fn new(inner: f32, outer: f32, start: f32, sweep: f32) -> Self {
        Self { base: PrimitiveBase::new(), inner, outer, start, sweep, cache: MeshCache::new("partial disk") }
    }

    /// A full ring.
    pub fn ring(inner: f32, outer: f32) -> Self {
        Self::new(inner, outer, 0.0, TAU)
    }

    pub fn set_radii(&mut self, inner: f32, outer: f32) {
        self.cache.set(&mut self.inner, inner);
        self.cache.set(&mut self.outer, outer);
    }

    pub fn set_angles(&mut self, start: f32, sweep: f32) {
        self.cache.set(&mut self.start, start);
        self.cache.set(&mut self.sweep, sweep);
    }

    #[inline]
    pub fn sweep(&self) -> f32 {
        self.sweep
    }

    #[inline]
    pub fn cache(&self) -> &MeshCache {
        &self.cache
    }

    pub fn build_mesh(&self) -> Built {
        geometry::partial_disk(self.inner, self.outer, (self.start, self.start + self.sweep))
    }
}

primitive!(PartialDisk, |this, ctx| { draw_cached(ctx, &this.base, &this.cache, || this.build_mesh()) });

/// Sphere patch between two longitudes and two latitudes.
pub struct PartialSphere {
    base: PrimitiveBase,
    radius: f32,
    longitude: (f32, f32),
    latitude: (f32, f32),
    cache: MeshCache,
}

impl PartialSphere {
    pub fn new(radius: f32, longitude: (f32, f32), latitude: (f32, f32)) -> Self {
        Self { base: PrimitiveBase::new(), radius, longitude, latitude, cache: MeshCache::new("partial sphere") }
    }

    /// The +Z hemisphere.
    pub fn hemisphere(radius: f32) -> Self {
        Self::new(radius, (0.0, TAU), (0.0, FRAC_PI_2))
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.cache.set(&mut self.radius, radius);
    }

    pub fn set_longitude(&mut self, from: f32, to: f32) {
        self.cache.set(&mut self.longitude, (from, to));
    }

    pub fn set_latitude(&mut self, from: f32, to: f32) {
        self.cache.set(&mut self.latitude, (from, to));
    }

    #[inline]
    pub fn cache(&self) -> &MeshCache {
        &self.cache
    }

    pub fn build_mesh(&self) -> Built {
        geometry::partial_sphere(self.radius, self.longitude, self.latitude)
    }
}

primitive!(PartialSphere, |this, ctx| { draw_cached(ctx, &this.base, &this.cache, || this.build_mesh()) });

/// Open cylinder wall along Z covering an angle range.
pub struct PartialCylinder {
    base: PrimitiveBase,
    radius: f32,
    height: f32,
    angles: (f32, f32),
    cache: MeshCache,
}

impl PartialCylinder {
    pub fn new(radius: f32, height: f32, angles: (f32, f32)) -> Self {
        Self { base: PrimitiveBase::new(), radius, height, angles, cache: MeshCache::new("partial cylinder") }
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.cache.set(&mut self.radius, radius);
    }

    pub fn set_height(&mut self, height: f32) {
        self.cache.set(&mut self.height, height);
    }

    pub fn set_angles(&mut self, from: f32, to: f32) {
        self.cache.set(&mut self.angles, (from, to));
    }

    #[inline]
    pub fn cache(&self) -> &MeshCache {
        &self.cache
    }

    pub fn build_mesh(&self) -> Built {
        geometry::partial_cylinder(self.radius, self.height, self.angles)
    }
}

primitive!(PartialCylinder, |this, ctx| { draw_cached(ctx, &this.base, &this.cache, || this.build_mesh()) });

/// Cylinder of `length` along Z between hemispherical caps.
pub struct CapsulePrim {
    base: PrimitiveBase,
    radius: f32,
    length: f32,
    cache: MeshCache,
}

impl CapsulePrim {
    pub fn new(radius: f32, length: f32) -> Self {
        Self { base: PrimitiveBase::new(), radius, length, cache: MeshCache::new("capsule") }
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.cache.set(&mut self.radius, radius);
    }

    pub fn set_length(&mut self, length: f32) {
        self.cache.set(&mut self.length, length);
    }

    #[inline]
    pub fn cache(&self) -> &MeshCache {
        &self.cache
    }

    pub fn build_mesh(&self) -> Built {
        geometry::capsule(self.radius, self.length)
    }
}

primitive!(CapsulePrim, |this, ctx| { draw_cached(ctx, &this.base, &this.cache, || this.build_mesh()) });

/// Capsule with different end radii (finger bones).
pub struct BiCapsulePrim {
    base: PrimitiveBase,
    radii: (f32, f32),
    length: f32,
    cache: MeshCache,
}

impl BiCapsulePrim {
    pub fn new(r0: f32, r1: f32, length: f32) -> Self {
        Self { base: PrimitiveBase::new(), radii: (r0, r1), length, cache: MeshCache::new("bicapsule") }
    }

    #[inline]
    pub fn radii(&self) -> (f32, f32) {
        self.radii
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn set_radii(&mut self, r0: f32, r1: f32) {
        self.cache.set(&mut self.radii, (r0, r1));
    }

    pub fn set_length(&mut self, length: f32) {
        self.cache.set(&mut self.length, length);
    }

    #[inline]
    pub fn cache(&self) -> &MeshCache {
        &self.cache
    }

    pub fn build_mesh(&self) -> Built {
        geometry::bicapsule(self.radii.0, self.radii.1, self.length)
    }
}

primitive!(BiCapsulePrim, |this, ctx| { draw_cached(ctx, &this.base, &this.cache, || this.build_mesh()) });

/// Arbitrary prebuilt geometry.
pub struct MeshPrimitive {
    base: PrimitiveBase,
    data: Option<MeshData<PrimitiveVertex>>,
    cache: MeshCache,
}

impl MeshPrimitive {
    pub fn new(data: MeshData<PrimitiveVertex>) -> Self {
        Self { base: PrimitiveBase::new(), data: Some(data), cache: MeshCache::new("mesh") }
    }

    pub fn set_data(&mut self, data: Option<MeshData<PrimitiveVertex>>) {
        self.data = data;
        self.cache.mark_dirty();
    }

    #[inline]
    pub fn data(&self) -> Option<&MeshData<PrimitiveVertex>> {
        self.data.as_ref()
    }

    #[inline]
    pub fn cache(&self) -> &MeshCache {
        &self.cache
    }
}

primitive!(MeshPrimitive, |this, ctx| { draw_cached(ctx, &this.base, &this.cache, || Ok(this.data.clone())) });

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_fits_its_aspect() {
        let mut image = ImagePrimitive::new(Vec2::ONE);
        image.aspect = 2.0;
        image.fit_height(0.5);
        assert_eq!(image.size(), Vec2::new(1.0, 0.5));
        image.fit_width(3.0);
        assert_eq!(image.size(), Vec2::new(3.0, 1.5));
    }

    #[test]
    fn partial_disk_only_rebuilds_on_change() {
        let mut disk = PartialDisk::new(0.5, 1.0, 0.0, 1.0);
        assert!(disk.cache().is_dirty());
        disk.cache().mark_clean();
        disk.set_radii(0.5, 1.0);
        disk.set_angles(0.0, 1.0);
        assert!(!disk.cache().is_dirty());
        disk.set_angles(0.0, 2.0);
        assert!(disk.cache().is_dirty());
    }

    #[test]
    fn cached_shapes_tessellate_by_angle() {
        let disk = PartialDisk::new(0.0, 1.0, 0.0, 0.95).build_mesh().unwrap().unwrap();
        // 10 angular segments, one radial ring: 2 × 11 grid vertices.
        assert_eq!(disk.vertices.len(), 22);
        assert_eq!(disk.indices.len(), 10 * 6);
    }

    #[test]
    fn degenerate_cached_shapes_draw_nothing() {
        assert!(PartialDisk::new(1.0, 0.5, 0.0, 1.0).build_mesh().unwrap().is_none());
        assert!(PartialSphere::new(1.0, (0.0, 0.0), (0.0, 1.0)).build_mesh().unwrap().is_none());
        assert!(PartialCylinder::new(0.0, 1.0, (0.0, 1.0)).build_mesh().unwrap().is_none());
        assert!(CapsulePrim::new(0.0, 1.0).build_mesh().unwrap().is_none());
        assert!(BiCapsulePrim::new(0.0, 0.0, 1.0).build_mesh().unwrap().is_none());
    }

    #[test]
    fn hemisphere_stays_above_the_plane() {
        let data = PartialSphere::hemisphere(1.0).build_mesh().unwrap().unwrap();
        assert!(data.vertices.iter().all(|v| v.position[2] >= -1e-6));
    }

    #[test]
    fn mesh_primitive_marks_dirty_on_new_data() {
        let quad = geometry::quad(Vec2::ONE).unwrap().unwrap();
        let mut prim = MeshPrimitive::new(quad);
        prim.cache().mark_clean();
        prim.set_data(None);
        assert!(prim.cache().is_dirty());
        assert!(prim.data().is_none());
    }
}
