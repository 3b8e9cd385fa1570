use std::fmt;

use glam::{DAffine3, DMat3, DQuat, DVec3, Mat4};

use super::{Property, PropertyValue, Side, ValueProperty};

/// 3D affine transform property (`f64` precision).
///
/// Applying on the right post-multiplies: a child's local transform applied
/// on the right of its parent's global transform yields the child's global
/// transform.
pub type AffineTransform = ValueProperty<DAffine3>;

impl PropertyValue for DAffine3 {
    const KIND: &'static str = "affine";

    #[inline]
    fn identity() -> Self {
        DAffine3::IDENTITY
    }

    #[inline]
    fn operate(&self, other: &Self, side: Side) -> Self {
        match side {
            Side::Left => *other * *self,
            Side::Right => *self * *other,
        }
    }

    fn inverse(&self) -> Option<Self> {
        if self.matrix3.determinant().abs() < f64::EPSILON {
            return None;
        }
        Some(DAffine3::inverse(self))
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.matrix3;
        let t = self.translation;
        write!(
            f,
            "[{:.4} {:.4} {:.4} {:.4}; {:.4} {:.4} {:.4} {:.4}; {:.4} {:.4} {:.4} {:.4}]",
            m.x_axis.x, m.y_axis.x, m.z_axis.x, t.x,
            m.x_axis.y, m.y_axis.y, m.z_axis.y, t.y,
            m.x_axis.z, m.y_axis.z, m.z_axis.z, t.z,
        )
    }
}

impl AffineTransform {
    #[inline]
    pub fn new(affine: DAffine3) -> Self {
        Self::from_value(affine)
    }

    #[inline]
    pub fn from_translation(translation: DVec3) -> Self {
        Self::new(DAffine3::from_translation(translation))
    }

    #[inline]
    pub fn from_scale(scale: DVec3) -> Self {
        Self::new(DAffine3::from_scale(scale))
    }

    #[inline]
    pub fn from_rotation(rotation: DQuat) -> Self {
        Self::new(DAffine3::from_quat(rotation))
    }

    #[inline]
    pub fn from_scale_rotation_translation(scale: DVec3, rotation: DQuat, translation: DVec3) -> Self {
        Self::new(DAffine3::from_scale_rotation_translation(scale, rotation, translation))
    }

    /// Linear part plus translation.
    #[inline]
    pub fn from_linear_translation(linear: DMat3, translation: DVec3) -> Self {
        Self::new(DAffine3::from_mat3_translation(linear, translation))
    }

    #[inline]
    pub fn affine(&self) -> DAffine3 {
        *self.value()
    }

    #[inline]
    pub fn translation(&self) -> DVec3 {
        self.value().translation
    }

    #[inline]
    pub fn transform_point(&self, p: DVec3) -> DVec3 {
        self.value().transform_point3(p)
    }

    #[inline]
    pub fn transform_vector(&self, v: DVec3) -> DVec3 {
        self.value().transform_vector3(v)
    }

    /// Single-precision 4×4 matrix for GPU upload.
    #[inline]
    pub fn to_mat4(&self) -> Mat4 {
        glam::DMat4::from(*self.value()).as_mat4()
    }

    /// Tolerance comparison; invalid values are only close to invalid values.
    pub fn abs_diff_eq(&self, other: &Self, max_abs_diff: f64) -> bool {
        match (self.is_valid(), other.is_valid()) {
            (false, false) => true,
            (true, true) => {
                self.apply_type() == other.apply_type()
                    && self.value().abs_diff_eq(*other.value(), max_abs_diff)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn right_apply_post_multiplies() {
        let parent = AffineTransform::from_translation(DVec3::new(10.0, 0.0, 0.0));
        let child = AffineTransform::from_scale(DVec3::splat(2.0));
        let global = parent.applied(&child, Side::Right);
        let p = global.transform_point(DVec3::new(1.0, 0.0, 0.0));
        assert!(p.abs_diff_eq(DVec3::new(12.0, 0.0, 0.0), 1e-12));
    }

    #[test]
    fn left_apply_pre_multiplies() {
        let child = AffineTransform::from_scale(DVec3::splat(2.0));
        let parent = AffineTransform::from_translation(DVec3::new(10.0, 0.0, 0.0));
        let global = child.applied(&parent, Side::Left);
        let p = global.transform_point(DVec3::new(1.0, 0.0, 0.0));
        assert!(p.abs_diff_eq(DVec3::new(12.0, 0.0, 0.0), 1e-12));
    }

    #[test]
    fn invert_round_trips() {
        let t = AffineTransform::from_scale_rotation_translation(
            DVec3::new(1.0, 2.0, 0.5),
            DQuat::from_rotation_y(0.7),
            DVec3::new(3.0, -1.0, 4.0),
        );
        let product = t.applied(&t.inverse(), Side::Right);
        assert!(product.abs_diff_eq(&AffineTransform::identity(), 1e-12));
    }

    #[test]
    fn singular_linear_part_fails_to_invert() {
        let mut t = AffineTransform::from_scale(DVec3::new(1.0, 1.0, 0.0));
        assert!(!t.invert());
        assert!(!t.is_valid());
    }

    #[test]
    fn display_prints_rows() {
        let s = AffineTransform::from_translation(DVec3::new(1.0, 2.0, 3.0)).to_string();
        assert!(s.starts_with("affine([1.0000 0.0000 0.0000 1.0000;"));
    }
}
