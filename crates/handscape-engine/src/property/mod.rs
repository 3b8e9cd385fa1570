//! Composable node properties.
//!
//! A property is a value with an identity, a way to combine with another
//! value of the same type and (sometimes) an inverse. Scene-graph nodes store
//! *local* properties; the *global* property of a node is the fold of the
//! local properties from the root down to the node.
//!
//! Two apply modes exist:
//! - [`ApplyType::Operate`] combines with the accumulated value on a side
//!   (left or right; it matters for affine transforms, not for alpha).
//! - [`ApplyType::Replace`] discards the accumulated value. The result can no
//!   longer be inverted, since the replaced parent value is gone.
//!
//! A property also carries a validity flag. Invalid properties absorb
//! everything they touch: applying or being applied to an invalid property
//! yields an invalid property, and all invalid properties compare equal.

mod affine;
mod alpha;
mod name;
mod node_properties;
mod value;

pub use affine::AffineTransform;
pub use alpha::AlphaMask;
pub use name::NameProperty;
pub use node_properties::{GeometryProperties, NodeProperties};
pub use value::{PropertyValue, ValueProperty};

use std::fmt;

/// How a property combines with the value accumulated so far.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum ApplyType {
    #[default]
    Operate,
    Replace,
}

/// Which side the applied operand is multiplied on.
///
/// `Left`: `result = other · self`. `Right`: `result = self · other`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Side {
    Left,
    Right,
}

/// The algebra scene-graph nodes fold along ancestor chains.
pub trait Property: Clone + PartialEq + fmt::Debug + fmt::Display {
    /// The identity value (valid, `Operate`).
    fn identity() -> Self;

    /// An invalid value. Every invalid value compares equal to every other.
    fn invalid() -> Self;

    fn is_valid(&self) -> bool;

    /// Resets `self` to [`Property::identity`].
    fn set_identity(&mut self) {
        *self = Self::identity();
    }

    /// Combines `other` into `self` according to `other`'s apply type.
    fn apply(&mut self, other: &Self, side: Side);

    /// Inverts in place. Returns `false` (and leaves `self` invalid) when no
    /// inverse exists.
    fn invert(&mut self) -> bool;

    /// Inverts in place like [`Property::invert`], but reports failure only
    /// when the spatial part has no inverse. Components that are never
    /// invertible are still left invalid.
    fn invert_placement(&mut self) -> bool {
        self.invert()
    }

    /// `self` with `other` applied, leaving `self` untouched.
    #[inline]
    fn applied(&self, other: &Self, side: Side) -> Self {
        let mut out = self.clone();
        out.apply(other, side);
        out
    }

    /// The inverse of `self`; invalid when [`Property::invert`] fails.
    #[inline]
    fn inverse(&self) -> Self {
        let mut out = self.clone();
        out.invert();
        out
    }
}

#[cfg(test)]
mod tests {
    use glam::{DQuat, DVec3};
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn random_affine(rng: &mut SmallRng) -> AffineTransform {
        let axis = DVec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(0.1..1.0),
        )
        .normalize();
        let rotation = DQuat::from_axis_angle(axis, rng.gen_range(-3.0..3.0));
        let scale = DVec3::new(
            rng.gen_range(0.2..3.0),
            rng.gen_range(0.2..3.0),
            rng.gen_range(0.2..3.0),
        );
        let translation = DVec3::new(
            rng.gen_range(-10.0..10.0),
            rng.gen_range(-10.0..10.0),
            rng.gen_range(-10.0..10.0),
        );
        AffineTransform::from_scale_rotation_translation(scale, rotation, translation)
    }

    fn random_alpha(rng: &mut SmallRng) -> AlphaMask {
        AlphaMask::new(rng.gen_range(0.0..1.0))
    }

    // ── identity ──────────────────────────────────────────────────────────

    fn check_identity<P: Property>(x: &P) {
        for side in [Side::Left, Side::Right] {
            let mut p = x.clone();
            p.set_identity();
            p.apply(x, side);
            assert_eq!(&p, x, "identity·x != x on {side:?}");
        }
    }

    #[test]
    fn identity_is_neutral_for_every_property_type() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..32 {
            check_identity(&random_affine(&mut rng));
            check_identity(&random_alpha(&mut rng));
            check_identity(&GeometryProperties::new(random_affine(&mut rng), random_alpha(&mut rng)));
        }
        check_identity(&NameProperty::new("hand/palm"));
        check_identity(&AffineTransform::from_translation(DVec3::X).replacing());
    }

    #[test]
    fn identity_on_the_right_is_neutral() {
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..16 {
            let x = random_affine(&mut rng);
            assert_eq!(x.applied(&AffineTransform::identity(), Side::Right), x);
            assert_eq!(x.applied(&AffineTransform::identity(), Side::Left), x);
        }
    }

    // ── associativity ─────────────────────────────────────────────────────

    #[test]
    fn operate_is_associative_for_affine_sequences() {
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..64 {
            let (a, b, c) = (random_affine(&mut rng), random_affine(&mut rng), random_affine(&mut rng));
            for side in [Side::Left, Side::Right] {
                let lhs = a.applied(&b, side).applied(&c, side);
                let rhs = a.applied(&b.applied(&c, side), side);
                assert!(lhs.abs_diff_eq(&rhs, 1e-9), "{lhs} != {rhs}");
            }
        }
    }

    #[test]
    fn operate_is_associative_for_alpha_sequences() {
        let mut rng = SmallRng::seed_from_u64(43);
        for _ in 0..64 {
            let (a, b, c) = (random_alpha(&mut rng), random_alpha(&mut rng), random_alpha(&mut rng));
            let lhs = a.applied(&b, Side::Right).applied(&c, Side::Right);
            let rhs = a.applied(&b.applied(&c, Side::Right), Side::Right);
            assert!((lhs.value() - rhs.value()).abs() < 1e-12);
        }
    }

    // ── validity ──────────────────────────────────────────────────────────

    #[test]
    fn invalid_absorbs_on_both_sides() {
        let x = AffineTransform::from_translation(DVec3::new(1.0, 2.0, 3.0));
        let bad = AffineTransform::invalid();
        assert!(!x.applied(&bad, Side::Right).is_valid());
        assert!(!bad.applied(&x, Side::Left).is_valid());
    }

    #[test]
    fn all_invalid_values_compare_equal() {
        let mut singular = AffineTransform::from_scale(DVec3::new(1.0, 0.0, 1.0));
        assert!(!singular.invert());
        assert_eq!(singular, AffineTransform::invalid());
        assert_eq!(AlphaMask::invalid(), AlphaMask::new(0.3).inverse());
    }

    #[test]
    fn equality_distinguishes_apply_type() {
        let t = AffineTransform::from_translation(DVec3::Y);
        assert_ne!(t, t.clone().replacing());
    }
}
