use std::collections::BTreeMap;

use glam::{Quat, Vec3};
use log::debug;

use super::frame::HandFrame;
use super::info::{EvictionPolicy, HandInfo, Intersection, PlaneDisk, PlaneRect};

/// Tracker silence tolerated before visible hands start to fade.
const TRACKER_SILENCE: f32 = 0.1;

/// All hands currently tracked, keyed by tracker ID.
///
/// The timeline is render time: every [`HandTracker::update`] moves it by
/// exactly the render `dt`. Tracker timestamps only order frames.
#[derive(Debug, Clone)]
pub struct HandTracker {
    hands: BTreeMap<i32, HandInfo>,
    rotation: Quat,
    translation: Vec3,
    policy: EvictionPolicy,
    /// Tracking timeline in seconds.
    now: f64,
    /// Render time since the last drained frame.
    silence: f32,
}

impl Default for HandTracker {
    fn default() -> Self {
        Self::new(Quat::IDENTITY, Vec3::ZERO, EvictionPolicy::default())
    }
}

impl HandTracker {
    /// `rotation` and `translation` register tracker space into world space.
    pub fn new(rotation: Quat, translation: Vec3, policy: EvictionPolicy) -> Self {
        Self { hands: BTreeMap::new(), rotation, translation, policy, now: 0.0, silence: 0.0 }
    }

    pub fn set_registration(&mut self, rotation: Quat, translation: Vec3) {
        self.rotation = rotation;
        self.translation = translation;
    }

    #[inline]
    pub fn now(&self) -> f64 {
        self.now
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.hands.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }

    pub fn get(&self, id: i32) -> Option<&HandInfo> {
        self.hands.get(&id)
    }

    /// Hands in ID order.
    pub fn hands(&self) -> impl Iterator<Item = &HandInfo> {
        self.hands.values()
    }

    /// Applies the frames drained during the last `dt` seconds, in order.
    ///
    /// The frames split `dt` evenly. With nothing drained the hands hold
    /// their pose until the tracker has been silent for
    /// [`TRACKER_SILENCE`], then fade.
    pub fn update(&mut self, frames: &[HandFrame], dt: f32) {
        let dt = dt.max(0.0);

        if frames.is_empty() {
            self.silence += dt;
            self.now += dt as f64;
            let fading = self.silence > TRACKER_SILENCE;
            for info in self.hands.values_mut() {
                if fading {
                    info.update_without_hand(dt);
                } else {
                    info.wait(dt);
                }
            }
            self.evict();
            return;
        }

        self.silence = 0.0;
        let step = dt / frames.len() as f32;
        for frame in frames {
            self.apply(frame, step);
        }
        self.evict();
    }

    fn apply(&mut self, frame: &HandFrame, step: f32) {
        self.now += step as f64;
        let now = self.now;

        for hand in &frame.hands {
            let info = self.hands.entry(hand.id).or_insert_with(|| {
                debug!("hand {} appeared", hand.id);
                // Created one step back so the first sample lands on `now`.
                HandInfo::new(hand.id, now - step as f64)
            });
            info.update(hand, step, self.rotation, self.translation);
        }

        for (id, info) in &mut self.hands {
            if frame.hand(*id).is_none() {
                info.update_without_hand(step);
            }
        }
    }

    fn evict(&mut self) {
        let now = self.now;
        let policy = self.policy;
        self.hands.retain(|id, info| {
            let evict = info.should_evict_with(now, &policy);
            if evict {
                debug!("hand {id} evicted (confidence {:.3})", info.confidence());
            }
            !evict
        });
    }

    /// Intersections of every hand with `rect`, hands in ID order.
    pub fn intersect_rectangle(&self, rect: &PlaneRect) -> Vec<Intersection> {
        self.hands.values().flat_map(|h| h.intersect_rectangle(rect)).collect()
    }

    pub fn intersect_disk(&self, disk: &PlaneDisk) -> Vec<Intersection> {
        self.hands.values().flat_map(|h| h.intersect_disk(disk)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::frame::flat_hand;

    fn frame(id: u64, hands: &[i32]) -> HandFrame {
        HandFrame {
            id,
            timestamp_us: id as i64 * 10_000,
            hands: hands.iter().map(|&h| flat_hand(h, Vec3::ZERO, 1.0, 1.0)).collect(),
            images: Vec::new(),
        }
    }

    #[test]
    fn hands_appear_and_update() {
        let mut tracker = HandTracker::default();
        tracker.update(&[frame(1, &[3]), frame(2, &[3, 4])], 0.016);
        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.get(3).unwrap().samples(), 2);
        assert_eq!(tracker.get(4).unwrap().samples(), 1);
        assert!((tracker.now() - 0.016).abs() < 1e-6);
    }

    #[test]
    fn vanished_hands_are_evicted_after_the_timeout() {
        let mut tracker = HandTracker::default();
        tracker.update(&[frame(1, &[3])], 0.01);
        for i in 0..6 {
            tracker.update(&[frame(2 + i, &[])], 0.01);
            assert_eq!(tracker.len(), 1, "kept through {i}");
        }
        for i in 0..50 {
            tracker.update(&[], 0.01);
            if tracker.is_empty() {
                assert!(i >= 40);
                return;
            }
        }
        panic!("hand never evicted");
    }

    #[test]
    fn timeline_follows_render_time_when_the_tracker_is_slower() {
        const RENDER_DT: f32 = 1.0 / 120.0;
        let mut tracker = HandTracker::default();

        // 60 Hz tracker, 120 Hz render: every other render frame drains nothing.
        for i in 0..240u64 {
            if i % 2 == 0 {
                tracker.update(&[frame(i / 2, &[3])], RENDER_DT);
            } else {
                let before = tracker.get(3).unwrap().confidence();
                tracker.update(&[], RENDER_DT);
                assert_eq!(tracker.get(3).unwrap().confidence(), before);
            }
        }
        assert!((tracker.now() - 2.0).abs() < 1e-4);
        assert!(tracker.get(3).unwrap().confidence() > 0.99);

        // The hand leaves; the tracker keeps reporting empty frames.
        let left_at = tracker.now();
        let mut i = 240u64;
        while tracker.get(3).is_some() {
            let frames = if i % 2 == 0 { vec![frame(i / 2, &[])] } else { Vec::new() };
            tracker.update(&frames, RENDER_DT);
            i += 1;
            assert!(i < 480, "hand never evicted");
        }
        let faded_after = tracker.now() - left_at;
        assert!(faded_after > 0.3 && faded_after < 0.45, "evicted after {faded_after}");
    }

    #[test]
    fn a_silent_tracker_fades_hands_after_the_tolerance() {
        let mut tracker = HandTracker::default();
        tracker.update(&[frame(1, &[3])], 0.01);
        let seen = tracker.get(3).unwrap().confidence();

        tracker.update(&[], 0.05);
        assert_eq!(tracker.get(3).unwrap().confidence(), seen);
        tracker.update(&[], 0.06);
        assert!(tracker.get(3).unwrap().confidence() < seen);
    }

    #[test]
    fn registration_applies_to_new_samples() {
        let mut tracker = HandTracker::new(Quat::IDENTITY, Vec3::new(0.0, 0.0, -1.0), EvictionPolicy::default());
        tracker.update(&[frame(1, &[1])], 0.01);
        assert_eq!(tracker.get(1).unwrap().palm_position(), Vec3::new(0.0, 0.0, -1.0));
    }
}
