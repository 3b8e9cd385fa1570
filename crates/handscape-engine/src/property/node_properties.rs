use std::fmt;

use super::{AffineTransform, AlphaMask, Property, Side};

/// Two properties combined component-wise.
///
/// Validity is tracked per component: an invalid alpha does not poison the
/// transform, so callers can still place an object whose opacity could not be
/// inverted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeProperties<A, B> {
    first: A,
    second: B,
}

/// The properties every drawable scene node carries.
pub type GeometryProperties = NodeProperties<AffineTransform, AlphaMask>;

impl<A: Property, B: Property> NodeProperties<A, B> {
    #[inline]
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    #[inline]
    pub fn first(&self) -> &A {
        &self.first
    }

    #[inline]
    pub fn second(&self) -> &B {
        &self.second
    }

    #[inline]
    pub fn first_mut(&mut self) -> &mut A {
        &mut self.first
    }

    #[inline]
    pub fn second_mut(&mut self) -> &mut B {
        &mut self.second
    }
}

impl GeometryProperties {
    #[inline]
    pub fn transform(&self) -> &AffineTransform {
        &self.first
    }

    #[inline]
    pub fn alpha(&self) -> &AlphaMask {
        &self.second
    }

    #[inline]
    pub fn transform_mut(&mut self) -> &mut AffineTransform {
        &mut self.first
    }

    #[inline]
    pub fn alpha_mut(&mut self) -> &mut AlphaMask {
        &mut self.second
    }

    /// Transform only; alpha stays at identity.
    #[inline]
    pub fn from_transform(transform: AffineTransform) -> Self {
        Self::new(transform, AlphaMask::identity())
    }
}

impl<A: Property, B: Property> Property for NodeProperties<A, B> {
    fn identity() -> Self {
        Self::new(A::identity(), B::identity())
    }

    fn invalid() -> Self {
        Self::new(A::invalid(), B::invalid())
    }

    #[inline]
    fn is_valid(&self) -> bool {
        self.first.is_valid() && self.second.is_valid()
    }

    fn apply(&mut self, other: &Self, side: Side) {
        self.first.apply(&other.first, side);
        self.second.apply(&other.second, side);
    }

    fn invert(&mut self) -> bool {
        let first = self.first.invert();
        let second = self.second.invert();
        first && second
    }

    /// The first component carries placement.
    fn invert_placement(&mut self) -> bool {
        let first = self.first.invert_placement();
        self.second.invert();
        first
    }
}

impl<A: fmt::Display, B: fmt::Display> fmt::Display for NodeProperties<A, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.first, self.second)
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::*;

    #[test]
    fn components_apply_independently() {
        let parent = GeometryProperties::new(
            AffineTransform::from_translation(DVec3::new(10.0, 0.0, 0.0)),
            AlphaMask::new(0.5),
        );
        let child = GeometryProperties::new(AffineTransform::from_scale(DVec3::splat(2.0)), AlphaMask::new(0.5));
        let global = parent.applied(&child, Side::Right);
        let p = global.transform().transform_point(DVec3::X);
        assert!(p.abs_diff_eq(DVec3::new(12.0, 0.0, 0.0), 1e-12));
        assert!((global.alpha().alpha() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn invert_reports_failure_but_keeps_invertible_parts() {
        let mut g = GeometryProperties::new(
            AffineTransform::from_translation(DVec3::new(1.0, 2.0, 3.0)),
            AlphaMask::new(0.5),
        );
        assert!(!g.invert());
        assert!(g.transform().is_valid());
        assert!(!g.alpha().is_valid());
        assert!(!g.is_valid());
        assert!(g.transform().translation().abs_diff_eq(DVec3::new(-1.0, -2.0, -3.0), 1e-12));
    }

    #[test]
    fn placement_inverse_ignores_alpha() {
        let mut g = GeometryProperties::new(AffineTransform::from_scale(DVec3::splat(2.0)), AlphaMask::new(0.5));
        assert!(g.invert_placement());
        assert!(g.transform().transform_point(DVec3::X).abs_diff_eq(DVec3::new(0.5, 0.0, 0.0), 1e-12));
        assert!(!g.alpha().is_valid());

        let mut flat = GeometryProperties::from_transform(AffineTransform::from_scale(DVec3::new(1.0, 1.0, 0.0)));
        assert!(!flat.invert_placement());
    }

    #[test]
    fn display_pairs_components() {
        let g = GeometryProperties::identity();
        assert!(g.to_string().starts_with("(affine("));
        assert!(g.to_string().ends_with(", alpha(1))"));
    }
}
