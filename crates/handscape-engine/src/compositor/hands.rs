use std::collections::BTreeMap;
use std::rc::Rc;

use glam::Vec4;

use crate::config::HandStyle;
use crate::hand::{Chirality, HandModel, HandTracker};
use crate::primitives::{group_node, SceneNode};
use crate::property::{GeometryProperties, Property};

fn hand_color(style: &HandStyle, chirality: Chirality) -> Vec4 {
    match chirality {
        Chirality::Left => style.left_color,
        Chirality::Right => style.right_color,
    }
}

/// One [`HandModel`] per tracked hand, kept under a common root.
pub struct HandLayer {
    root: Rc<SceneNode>,
    models: BTreeMap<i32, HandModel>,
}

impl Default for HandLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl HandLayer {
    pub fn new() -> Self {
        Self { root: group_node(GeometryProperties::identity()), models: BTreeMap::new() }
    }

    #[inline]
    pub fn node(&self) -> &Rc<SceneNode> {
        &self.root
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn model(&self, id: i32) -> Option<&HandModel> {
        self.models.get(&id)
    }

    /// Creates models for new hands, drops models of evicted hands and poses
    /// the rest.
    pub fn sync(&mut self, tracker: &HandTracker, style: &HandStyle) {
        self.models.retain(|id, model| {
            let keep = tracker.get(*id).is_some();
            if !keep {
                model.node().remove_from_parent();
            }
            keep
        });

        for info in tracker.hands() {
            let model = self.models.entry(info.id()).or_insert_with(|| {
                let model = HandModel::new(hand_color(style, info.chirality()));
                self.root.add_child(Rc::clone(model.node()));
                model
            });
            model.sync(info);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::{flat_hand, HandFrame};
    use glam::Vec3;

    fn frame(id: u64, hands: &[i32]) -> HandFrame {
        HandFrame {
            id,
            timestamp_us: id as i64 * 10_000,
            hands: hands.iter().map(|&h| flat_hand(h, Vec3::ZERO, 1.0, 1.0)).collect(),
            images: Vec::new(),
        }
    }

    #[test]
    fn models_follow_tracked_hands() {
        let mut tracker = HandTracker::default();
        let mut layer = HandLayer::new();
        let style = HandStyle::default();

        tracker.update(&[frame(1, &[1, 2])], 0.01);
        layer.sync(&tracker, &style);
        assert_eq!(layer.len(), 2);
        assert_eq!(layer.node().child_count(), 2);

        for _ in 0..100 {
            tracker.update(&[], 0.01);
        }
        assert!(tracker.is_empty());
        layer.sync(&tracker, &style);
        assert!(layer.is_empty());
        assert_eq!(layer.node().child_count(), 0);
    }

    #[test]
    fn chirality_picks_the_color() {
        let style = HandStyle::default();
        assert_eq!(hand_color(&style, Chirality::Left), style.left_color);
        assert_eq!(hand_color(&style, Chirality::Right), style.right_color);
    }
}
