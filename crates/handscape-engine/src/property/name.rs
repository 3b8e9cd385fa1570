use std::fmt;

use super::{PropertyValue, Side, ValueProperty};

/// Free-form label. Operating appends a `/`-separated path segment, so the
/// global value of a node reads like its path from the root.
pub type NameProperty = ValueProperty<String>;

impl PropertyValue for String {
    const KIND: &'static str = "name";

    #[inline]
    fn identity() -> Self {
        String::new()
    }

    fn operate(&self, other: &Self, side: Side) -> Self {
        let (first, second) = match side {
            Side::Left => (other, self),
            Side::Right => (self, other),
        };
        match (first.is_empty(), second.is_empty()) {
            (true, _) => second.clone(),
            (_, true) => first.clone(),
            _ => format!("{first}/{second}"),
        }
    }

    #[inline]
    fn inverse(&self) -> Option<Self> {
        None
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl NameProperty {
    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_value(name.into())
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::Property;

    #[test]
    fn names_join_as_paths() {
        let root = NameProperty::new("scene");
        let child = NameProperty::new("hand");
        assert_eq!(root.applied(&child, Side::Right).name(), "scene/hand");
        assert_eq!(child.applied(&root, Side::Left).name(), "scene/hand");
    }

    #[test]
    fn names_do_not_invert() {
        assert!(!NameProperty::new("x").inverse().is_valid());
    }
}
