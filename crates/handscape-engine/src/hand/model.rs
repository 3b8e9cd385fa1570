use std::cell::RefCell;
use std::rc::Rc;

use glam::{DAffine3, DQuat, DVec3, Vec2, Vec3, Vec4};

use super::frame::{BONES_PER_FINGER, JOINTS_PER_FINGER};
use super::info::HandInfo;
use crate::primitives::{primitive_node, BiCapsulePrim, Primitive, RadialPolygonPrim, SceneNode};
use crate::property::{AffineTransform, AlphaMask, GeometryProperties, Property};

/// Half thickness of the palm plate.
const PALM_RADIUS: f32 = 0.01;

/// Transform placing a Z-aligned shape of the segment's length between `a`
/// and `b`.
pub fn segment_transform(a: Vec3, b: Vec3) -> DAffine3 {
    let (a, b) = (a.as_dvec3(), b.as_dvec3());
    let center = (a + b) * 0.5;
    let dir = (b - a).normalize_or_zero();
    if dir == DVec3::ZERO {
        return DAffine3::from_translation(center);
    }
    DAffine3::from_rotation_translation(DQuat::from_rotation_arc(DVec3::Z, dir), center)
}

/// Scene geometry for one tracked hand: a bicapsule per bone and a rounded
/// palm plate. The group's alpha follows the hand's confidence.
pub struct HandModel {
    node: Rc<SceneNode>,
    bones: Vec<(Rc<SceneNode>, Rc<RefCell<BiCapsulePrim>>)>,
    palm: (Rc<SceneNode>, Rc<RefCell<RadialPolygonPrim>>),
}

impl HandModel {
    pub fn new(color: Vec4) -> Self {
        let node = SceneNode::with_local(GeometryProperties::identity(), None);

        let bones = (0..5 * BONES_PER_FINGER)
            .map(|_| {
                let mut prim = BiCapsulePrim::new(0.0, 0.0, 0.0);
                prim.base_mut().material.set_color(color);
                let (child, prim) = primitive_node(prim);
                node.add_child(Rc::clone(&child));
                (child, prim)
            })
            .collect();

        let mut palm = RadialPolygonPrim::new(Vec::new(), PALM_RADIUS);
        palm.base_mut().material.set_color(color);
        let (palm_node, palm) = primitive_node(palm);
        node.add_child(Rc::clone(&palm_node));

        Self { node, bones, palm: (palm_node, palm) }
    }

    #[inline]
    pub fn node(&self) -> &Rc<SceneNode> {
        &self.node
    }

    pub fn set_color(&self, color: Vec4) {
        for (_, prim) in &self.bones {
            prim.borrow_mut().base_mut().material.set_color(color);
        }
        self.palm.1.borrow_mut().base_mut().material.set_color(color);
    }

    /// Moves every part to the hand's current pose.
    pub fn sync(&self, info: &HandInfo) {
        self.node.set_local(GeometryProperties::new(
            AffineTransform::identity(),
            AlphaMask::new(info.confidence() as f64),
        ));

        for finger in 0..5 {
            let joints = info.finger_joints(finger);
            for bone in 0..BONES_PER_FINGER {
                let (a, b) = (&joints[bone], &joints[bone + 1]);
                let (node, prim) = &self.bones[finger * BONES_PER_FINGER + bone];
                let mut prim = prim.borrow_mut();
                prim.set_radii(a.radius, b.radius);
                prim.set_length(a.position.distance(b.position));
                node.set_local(GeometryProperties::from_transform(AffineTransform::new(segment_transform(
                    a.position, b.position,
                ))));
            }
        }

        let (palm_node, palm) = &self.palm;
        let (frame, outline) = palm_outline(info);
        palm.borrow_mut().set_points(outline);
        palm_node.set_local(GeometryProperties::from_transform(AffineTransform::new(frame)));
    }
}

/// The palm's local frame (origin at the palm, +Z along the palm normal, +Y
/// toward the fingers) and the knuckle outline in that frame.
fn palm_outline(info: &HandInfo) -> (DAffine3, Vec<Vec2>) {
    let origin = info.palm_position();
    let normal = info.palm_normal().normalize_or(Vec3::NEG_Y);
    let middle_knuckle = info.finger_joints(2)[1].position;
    let forward = (middle_knuckle - origin).reject_from(normal).normalize_or(normal.any_orthonormal_vector());
    let right = forward.cross(normal);

    let frame = DAffine3::from_cols(
        right.as_dvec3(),
        forward.as_dvec3(),
        normal.as_dvec3(),
        origin.as_dvec3(),
    );
    let project = |p: Vec3| {
        let d = p - origin;
        Vec2::new(d.dot(right), d.dot(forward))
    };

    let base = |finger: usize| info.joints()[finger * JOINTS_PER_FINGER].position;
    let knuckle = |finger: usize| info.joints()[finger * JOINTS_PER_FINGER + 1].position;
    let outline = [base(1), knuckle(1), knuckle(2), knuckle(3), knuckle(4), base(4)].map(project).to_vec();
    (frame, outline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::frame::flat_hand;
    use glam::Quat;

    #[test]
    fn segment_transform_spans_the_bone() {
        let (a, b) = (Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 2.0, 0.0));
        let t = segment_transform(a, b);
        let p0 = t.transform_point3(DVec3::new(0.0, 0.0, -1.0)).as_vec3();
        let p1 = t.transform_point3(DVec3::new(0.0, 0.0, 1.0)).as_vec3();
        assert!(p0.distance(a) < 1e-6);
        assert!(p1.distance(b) < 1e-6);
    }

    #[test]
    fn zero_length_segments_only_translate() {
        let t = segment_transform(Vec3::ONE, Vec3::ONE);
        assert_eq!(t, DAffine3::from_translation(DVec3::ONE));
    }

    #[test]
    fn sync_poses_every_bone() {
        let mut info = HandInfo::new(1, 0.0);
        info.update(&flat_hand(1, Vec3::ZERO, 1.0, 1.0), 0.1, Quat::IDENTITY, Vec3::ZERO);
        let model = HandModel::new(Vec4::ONE);
        model.sync(&info);

        assert_eq!(model.node().child_count(), 5 * BONES_PER_FINGER + 1);
        let alpha = model.node().local().alpha().alpha();
        assert!((alpha - info.confidence() as f64).abs() < 1e-6);

        let joints = info.finger_joints(1);
        let prim = model.bones[BONES_PER_FINGER + 1].1.borrow();
        assert_eq!(prim.radii(), (joints[1].radius, joints[2].radius));
        assert!((prim.length() - joints[1].position.distance(joints[2].position)).abs() < 1e-6);

        let palm = model.palm.1.borrow();
        assert_eq!(palm.points().len(), 6);
        // Knuckles lie ahead of the palm center.
        assert!(palm.points()[2].y > 0.0);
    }
}
