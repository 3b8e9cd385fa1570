use std::fmt;

use super::{ApplyType, Property, Side};

/// The value half of a [`ValueProperty`].
///
/// Implementors define identity, combination and (optionally) inversion; the
/// wrapper adds apply type and validity bookkeeping once for all of them.
pub trait PropertyValue: Clone + PartialEq + fmt::Debug {
    /// Short tag used when printing the property.
    const KIND: &'static str;

    fn identity() -> Self;

    /// `self` combined with `other` on `side`.
    fn operate(&self, other: &Self, side: Side) -> Self;

    /// `None` when the value has no inverse.
    fn inverse(&self) -> Option<Self>;

    fn describe(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

/// A [`PropertyValue`] together with its apply type and validity flag.
#[derive(Debug, Clone)]
pub struct ValueProperty<V> {
    value: V,
    apply_type: ApplyType,
    valid: bool,
}

impl<V: PropertyValue> ValueProperty<V> {
    /// A valid `Operate` property holding `value`.
    #[inline]
    pub fn from_value(value: V) -> Self {
        Self { value, apply_type: ApplyType::Operate, valid: true }
    }

    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Overwrites the value and revalidates the property.
    ///
    /// The apply type is left alone; call [`ValueProperty::set_apply_type`]
    /// to turn a `Replace` property back into an `Operate` one.
    #[inline]
    pub fn set_value(&mut self, value: V) {
        self.value = value;
        self.valid = true;
    }

    #[inline]
    pub fn apply_type(&self) -> ApplyType {
        self.apply_type
    }

    #[inline]
    pub fn set_apply_type(&mut self, apply_type: ApplyType) {
        self.apply_type = apply_type;
    }

    /// Builder-style switch to [`ApplyType::Replace`].
    #[inline]
    pub fn replacing(mut self) -> Self {
        self.apply_type = ApplyType::Replace;
        self
    }
}

impl<V: PropertyValue> Property for ValueProperty<V> {
    fn identity() -> Self {
        Self::from_value(V::identity())
    }

    fn invalid() -> Self {
        Self { value: V::identity(), apply_type: ApplyType::Operate, valid: false }
    }

    #[inline]
    fn is_valid(&self) -> bool {
        self.valid
    }

    fn apply(&mut self, other: &Self, side: Side) {
        if !self.valid || !other.valid {
            *self = Self::invalid();
            return;
        }
        match other.apply_type {
            ApplyType::Operate => {
                // Keeps our own apply type: a Replace-derived accumulation
                // stays non-invertible after further operations.
                self.value = self.value.operate(&other.value, side);
            }
            ApplyType::Replace => {
                self.value = other.value.clone();
                self.apply_type = ApplyType::Replace;
            }
        }
    }

    fn invert(&mut self) -> bool {
        let inverse = match self.apply_type {
            ApplyType::Replace => None,
            ApplyType::Operate if self.valid => self.value.inverse(),
            ApplyType::Operate => None,
        };
        match inverse {
            Some(v) => {
                self.value = v;
                true
            }
            None => {
                *self = Self::invalid();
                false
            }
        }
    }
}

impl<V: PropertyValue> PartialEq for ValueProperty<V> {
    fn eq(&self, other: &Self) -> bool {
        match (self.valid, other.valid) {
            (false, false) => true,
            (true, true) => self.apply_type == other.apply_type && self.value == other.value,
            _ => false,
        }
    }
}

impl<V: PropertyValue> fmt::Display for ValueProperty<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.valid {
            return write!(f, "{}(invalid)", V::KIND);
        }
        write!(f, "{}(", V::KIND)?;
        if self.apply_type == ApplyType::Replace {
            f.write_str("replace ")?;
        }
        self.value.describe(f)?;
        f.write_str(")")
    }
}

impl<V: PropertyValue> Default for ValueProperty<V> {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::AlphaMask;

    #[test]
    fn replace_overwrites_and_blocks_inversion() {
        let mut acc = AlphaMask::new(0.5);
        acc.apply(&AlphaMask::new(0.25).replacing(), Side::Right);
        assert_eq!(*acc.value(), 0.25);
        assert_eq!(acc.apply_type(), ApplyType::Replace);

        let mut acc_affine = crate::property::AffineTransform::identity();
        acc_affine.apply(
            &crate::property::AffineTransform::from_translation(glam::DVec3::X).replacing(),
            Side::Right,
        );
        assert!(!acc_affine.invert());
        assert!(!acc_affine.is_valid());
    }

    #[test]
    fn set_value_revalidates() {
        let mut p = AlphaMask::invalid();
        p.set_value(0.75);
        assert!(p.is_valid());
        assert_eq!(*p.value(), 0.75);
    }

    #[test]
    fn display_marks_invalid_and_replace() {
        assert_eq!(AlphaMask::invalid().to_string(), "alpha(invalid)");
        assert_eq!(AlphaMask::new(0.5).replacing().to_string(), "alpha(replace 0.5)");
    }
}
