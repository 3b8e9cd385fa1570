use std::fmt;

use super::{PropertyValue, Side, ValueProperty};

/// Opacity multiplier inherited down the scene graph. Never invertible.
pub type AlphaMask = ValueProperty<f64>;

impl PropertyValue for f64 {
    const KIND: &'static str = "alpha";

    #[inline]
    fn identity() -> Self {
        1.0
    }

    #[inline]
    fn operate(&self, other: &Self, _side: Side) -> Self {
        self * other
    }

    #[inline]
    fn inverse(&self) -> Option<Self> {
        None
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl AlphaMask {
    #[inline]
    pub fn new(alpha: f64) -> Self {
        Self::from_value(alpha)
    }

    #[inline]
    pub fn alpha(&self) -> f64 {
        *self.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::Property;

    #[test]
    fn alpha_multiplies_regardless_of_side() {
        let a = AlphaMask::new(0.5);
        let b = AlphaMask::new(0.4);
        assert_eq!(a.applied(&b, Side::Left).alpha(), a.applied(&b, Side::Right).alpha());
        assert!((a.applied(&b, Side::Right).alpha() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn alpha_is_never_invertible() {
        let mut a = AlphaMask::new(1.0);
        assert!(!a.invert());
        assert!(!a.is_valid());
    }
}
