use std::rc::Rc;

use glam::{DAffine3, Mat3, Mat4, Vec3};

use super::{DrawCall, DrawQueue, RenderState};
use crate::mesh::Mesh;
use crate::primitives::PrimitiveBase;
use crate::property::{GeometryProperties, Property};
use crate::resource::ResourceCache;
use crate::uniform_block;

uniform_block! {
    /// Per-object uniforms every primitive shader exposes.
    pub struct ObjectUniforms {
        model: Mat4 => [f32; 16],
        view: Mat4 => [f32; 16],
        projection: Mat4 => [f32; 16],
        normal_matrix: Mat3 => [f32; 9],
        light_position: Vec3 => [f32; 3],
        alpha_mask: Float => f32,
    }
}

/// View and projection for one eye plus the scene light.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub view: Mat4,
    pub projection: Mat4,
    /// World-space point light.
    pub light_position: Vec3,
}

impl Default for Camera {
    fn default() -> Self {
        Self { view: Mat4::IDENTITY, projection: Mat4::IDENTITY, light_position: Vec3::new(0.0, 1.0, 1.0) }
    }
}

impl Camera {
    /// Right-handed perspective camera at `eye` looking at `target`.
    pub fn look_at(eye: Vec3, target: Vec3, fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            view: Mat4::look_at_rh(eye, target, Vec3::Y),
            projection: Mat4::perspective_rh(fov_y, aspect.max(f32::EPSILON), near, far),
            light_position: eye + Vec3::Y,
        }
    }

    /// The same camera shifted along its own x axis (stereo eyes).
    pub fn offset_x(self, dx: f32) -> Self {
        Self { view: Mat4::from_translation(Vec3::new(-dx, 0.0, 0.0)) * self.view, ..self }
    }
}

impl ObjectUniforms {
    pub fn new(camera: &Camera, transform: &DAffine3, alpha: f64) -> Self {
        let model = glam::DMat4::from(*transform).as_mat4();
        let linear = Mat3::from_mat4(model);
        let normal = if linear.determinant().abs() > f32::EPSILON {
            linear.inverse().transpose()
        } else {
            Mat3::IDENTITY
        };
        Self {
            model: model.to_cols_array(),
            view: camera.view.to_cols_array(),
            projection: camera.projection.to_cols_array(),
            normal_matrix: normal.to_cols_array(),
            light_position: camera.light_position.to_array(),
            alpha_mask: alpha as f32,
        }
    }
}

/// What a primitive sees while drawing: device access for lazy mesh
/// rebuilds, shared resources, the camera and the node's global geometry
/// properties.
pub struct DrawContext<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    resources: &'a ResourceCache,
    draws: &'a mut DrawQueue,
    camera: Camera,
    properties: GeometryProperties,
    state_override: Option<RenderState>,
}

impl<'a> DrawContext<'a> {
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        resources: &'a ResourceCache,
        draws: &'a mut DrawQueue,
        camera: Camera,
    ) -> Self {
        Self {
            device,
            queue,
            resources,
            draws,
            camera,
            properties: GeometryProperties::identity(),
            state_override: None,
        }
    }

    #[inline]
    pub fn device(&self) -> &'a wgpu::Device {
        self.device
    }

    #[inline]
    pub fn queue(&self) -> &'a wgpu::Queue {
        self.queue
    }

    #[inline]
    pub fn resources(&self) -> &'a ResourceCache {
        self.resources
    }

    #[inline]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    #[inline]
    pub fn properties(&self) -> &GeometryProperties {
        &self.properties
    }

    /// Global properties of the node about to draw.
    pub fn set_properties(&mut self, properties: GeometryProperties) {
        self.properties = properties;
    }

    /// Forces a render state on every following submission (hands are drawn
    /// translucent regardless of their base flags).
    pub fn set_state_override(&mut self, state: Option<RenderState>) {
        self.state_override = state;
    }

    /// Queues `mesh` with `base`'s shader and material at the current global
    /// properties.
    ///
    /// Invisible objects (alpha ≤ 0, invalid properties) and uninitialized
    /// meshes are dropped without error.
    pub fn submit(&mut self, base: &PrimitiveBase, mesh: &Rc<Mesh>) -> crate::Result<()> {
        self.submit_with(base, mesh, DAffine3::IDENTITY)
    }

    /// Like [`submit`](Self::submit) with an extra object-local transform
    /// applied before the node's global transform.
    pub fn submit_with(&mut self, base: &PrimitiveBase, mesh: &Rc<Mesh>, local: DAffine3) -> crate::Result<()> {
        if !self.properties.is_valid() || !mesh.is_initialized() {
            return Ok(());
        }
        let alpha = self.properties.alpha().alpha();
        if alpha <= 0.0 {
            return Ok(());
        }

        let shader = base.shader(self.resources);
        let frontend = self.resources.object_frontend(&shader)?;
        let transform = self.properties.transform().affine() * local;
        let block = ObjectUniforms::new(&self.camera, &transform, alpha);

        let state = self.state_override.unwrap_or(base.state);
        let mut call = DrawCall::new(Rc::clone(&shader), Rc::clone(mesh), state);
        let bound = shader.bind();
        frontend.upload(&bound, &block, &mut call.uniforms)?;
        base.material.upload(&bound, &mut call)?;

        self.draws.push(call);
        Ok(())
    }

    /// Queues a prepared draw untouched.
    pub fn push_raw(&mut self, call: DrawCall) {
        self.draws.push(call);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_uniforms_carry_model_and_alpha() {
        let camera = Camera::default();
        let transform = DAffine3::from_translation(glam::DVec3::new(1.0, 2.0, 3.0));
        let u = ObjectUniforms::new(&camera, &transform, 0.25);
        assert_eq!(&u.model[12..15], &[1.0, 2.0, 3.0]);
        assert_eq!(u.alpha_mask, 0.25);
        assert_eq!(u.normal_matrix, Mat3::IDENTITY.to_cols_array());
    }

    #[test]
    fn degenerate_scale_uses_identity_normals() {
        let transform = DAffine3::from_scale(glam::DVec3::new(1.0, 0.0, 1.0));
        let u = ObjectUniforms::new(&Camera::default(), &transform, 1.0);
        assert_eq!(u.normal_matrix, Mat3::IDENTITY.to_cols_array());
    }

    #[test]
    fn stereo_offset_moves_the_view() {
        let cam = Camera::look_at(Vec3::new(0.0, 0.0, 2.0), Vec3::ZERO, 1.0, 1.0, 0.1, 10.0);
        let right = cam.offset_x(0.03);
        let p = right.view.transform_point3(Vec3::ZERO);
        let q = cam.view.transform_point3(Vec3::ZERO);
        assert!((p.x - (q.x - 0.03)).abs() < 1e-6);
    }
}
