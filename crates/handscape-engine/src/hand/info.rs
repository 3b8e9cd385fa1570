use glam::{DAffine3, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::frame::{Chirality, TrackedHand, BONES_PER_FINGER, JOINTS_PER_FINGER};
use super::smoothing::{smootherstep, smoothstep, Smoothed};

/// Smoothing while the hand is visible.
pub const TRACKED_SMOOTHING: f32 = 0.5;
/// Smoothing while the hand is missing; confidence fades out more slowly.
pub const LOST_SMOOTHING: f32 = 0.8;
/// Seconds of continuous tracking before the visibility ramp saturates.
pub const FULL_VISIBILITY_TIME: f32 = 1.0 / 6.0;

/// When a hand is dropped from the tracker.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvictionPolicy {
    /// Confidence below which an old enough hand is dropped.
    pub confidence_floor: f32,
    /// Seconds without an update after which a hand is dropped.
    pub max_age: f64,
    /// Grace period after creation during which low confidence is tolerated.
    pub min_age: f64,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self { confidence_floor: 0.01, max_age: 0.5, min_age: 0.5 }
    }
}

/// One skeleton joint in world space.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct JointPoint {
    pub position: Vec3,
    pub velocity: Vec3,
    pub radius: f32,
    pub is_tip: bool,
    pub extended: bool,
}

/// A rectangle in the local XY plane of `transform`, centered on its origin.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlaneRect {
    pub transform: DAffine3,
    pub size: Vec2,
}

/// A disk in the local XY plane of `transform`, centered on its origin.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlaneDisk {
    pub transform: DAffine3,
    pub radius: f32,
}

/// Where a bone crosses a planar target.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Intersection {
    /// World space.
    pub position: Vec3,
    /// In the target's local plane.
    pub local: Vec2,
    pub radius: f32,
    pub velocity: Vec3,
    /// The hand's confidence at the time of the test.
    pub confidence: f32,
    pub finger: usize,
    pub bone: usize,
}

/// Smoothed per-hand state fed from tracker frames.
#[derive(Debug, Clone)]
pub struct HandInfo {
    id: i32,
    chirality: Chirality,
    joints: Vec<JointPoint>,
    palm_position: Vec3,
    palm_normal: Vec3,
    palm_width: f32,
    confidence: Smoothed<f32>,
    created_at: f64,
    last_update: f64,
    /// Local timeline, advanced by every update.
    clock: f64,
    /// Clock value of the last confidence step.
    smoothed_at: f64,
    extended_fingers: u32,
    samples: u64,
}

impl HandInfo {
    /// A hand first seen at `now`, with zero confidence.
    pub fn new(id: i32, now: f64) -> Self {
        Self {
            id,
            chirality: Chirality::Right,
            joints: vec![JointPoint::default(); 5 * JOINTS_PER_FINGER],
            palm_position: Vec3::ZERO,
            palm_normal: Vec3::NEG_Y,
            palm_width: 0.0,
            confidence: Smoothed::new(0.0, TRACKED_SMOOTHING),
            created_at: now,
            last_update: now,
            clock: now,
            smoothed_at: now,
            extended_fingers: 0,
            samples: 0,
        }
    }

    #[inline]
    pub fn id(&self) -> i32 {
        self.id
    }

    #[inline]
    pub fn chirality(&self) -> Chirality {
        self.chirality
    }

    #[inline]
    pub fn confidence(&self) -> f32 {
        self.confidence.value()
    }

    #[inline]
    pub fn created_at(&self) -> f64 {
        self.created_at
    }

    #[inline]
    pub fn last_update(&self) -> f64 {
        self.last_update
    }

    /// Tracker samples taken so far.
    #[inline]
    pub fn samples(&self) -> u64 {
        self.samples
    }

    #[inline]
    pub fn extended_fingers(&self) -> u32 {
        self.extended_fingers
    }

    /// Five joints per finger, thumb first, wrist side first.
    #[inline]
    pub fn joints(&self) -> &[JointPoint] {
        &self.joints
    }

    pub fn finger_joints(&self, finger: usize) -> &[JointPoint] {
        &self.joints[finger * JOINTS_PER_FINGER..(finger + 1) * JOINTS_PER_FINGER]
    }

    #[inline]
    pub fn palm_position(&self) -> Vec3 {
        self.palm_position
    }

    #[inline]
    pub fn palm_normal(&self) -> Vec3 {
        self.palm_normal
    }

    #[inline]
    pub fn palm_width(&self) -> f32 {
        self.palm_width
    }

    /// Target confidence for a tracked hand before smoothing.
    pub fn instant_confidence(hand: &TrackedHand) -> f32 {
        let visible = smootherstep(hand.time_visible / FULL_VISIBILITY_TIME);
        let tracked = smootherstep(smoothstep(hand.confidence).powi(2));
        visible * tracked
    }

    /// Takes a new tracker sample `dt` after the previous step. Joint
    /// positions are registered into world space with `rotation` then
    /// `translation`.
    ///
    /// Velocities span the time since the previous sample, and confidence is
    /// smoothed over the time since the previous confidence step, so clock
    /// advanced through [`HandInfo::wait`] is accounted for.
    pub fn update(&mut self, hand: &TrackedHand, dt: f32, rotation: Quat, translation: Vec3) {
        let register = |p: Vec3| rotation * p + translation;
        self.clock += dt.max(0.0) as f64;
        let sample_dt = (self.clock - self.last_update) as f32;
        let has_previous = self.samples > 0;

        self.chirality = hand.chirality;
        self.palm_position = register(hand.palm_position);
        self.palm_normal = (rotation * hand.palm_normal).normalize_or_zero();
        self.palm_width = hand.palm_width;
        self.extended_fingers = hand.fingers.iter().filter(|f| f.extended).count() as u32;

        for (f, finger) in hand.fingers.iter().enumerate() {
            for j in 0..JOINTS_PER_FINGER {
                let (position, width) = if j == 0 {
                    (finger.bones[0].prev_joint, finger.bones[0].width)
                } else {
                    let bone = &finger.bones[j - 1];
                    (bone.next_joint, bone.width)
                };
                let position = register(position);
                let joint = &mut self.joints[f * JOINTS_PER_FINGER + j];
                joint.velocity = if has_previous && sample_dt > 0.0 {
                    (position - joint.position) / sample_dt
                } else {
                    Vec3::ZERO
                };
                joint.position = position;
                joint.radius = 0.5 * width;
                joint.is_tip = j == BONES_PER_FINGER;
                joint.extended = finger.extended;
            }
        }

        self.confidence.set_strength(TRACKED_SMOOTHING);
        self.confidence.update(Self::instant_confidence(hand), (self.clock - self.smoothed_at) as f32);
        self.smoothed_at = self.clock;
        self.last_update = self.clock;
        self.samples += 1;
    }

    /// Advances a hand that was not in this frame: confidence fades toward
    /// zero and the joints stop.
    pub fn update_without_hand(&mut self, dt: f32) {
        self.clock += dt.max(0.0) as f64;
        self.confidence.set_strength(LOST_SMOOTHING);
        self.confidence.update(0.0, (self.clock - self.smoothed_at) as f32);
        self.smoothed_at = self.clock;
        for joint in &mut self.joints {
            joint.velocity = Vec3::ZERO;
        }
    }

    /// Advances the clock while the tracker has simply not reported yet.
    /// Pose and confidence stay as they are.
    pub fn wait(&mut self, dt: f32) {
        self.clock += dt.max(0.0) as f64;
    }

    #[cfg(test)]
    pub(crate) fn force_confidence(&mut self, value: f32) {
        self.confidence.reset(value);
    }

    pub fn should_evict(&self, now: f64) -> bool {
        self.should_evict_with(now, &EvictionPolicy::default())
    }

    pub fn should_evict_with(&self, now: f64, policy: &EvictionPolicy) -> bool {
        let stale = now - self.last_update > policy.max_age;
        let faded = now - self.created_at >= policy.min_age && self.confidence() < policy.confidence_floor;
        stale || faded
    }

    // ── intersection ──────────────────────────────────────────────────────

    /// Bones crossing the target's plane inside the rectangle, in finger then
    /// bone order. Points exactly on an edge count as inside.
    pub fn intersect_rectangle(&self, rect: &PlaneRect) -> Vec<Intersection> {
        let half = rect.size * 0.5;
        self.intersect_plane(&rect.transform, |p| p.x.abs() <= half.x && p.y.abs() <= half.y)
    }

    /// Bones crossing the target's plane within `radius` of its center.
    pub fn intersect_disk(&self, disk: &PlaneDisk) -> Vec<Intersection> {
        let r2 = disk.radius * disk.radius;
        self.intersect_plane(&disk.transform, |p| p.length_squared() <= r2)
    }

    fn intersect_plane<F>(&self, transform: &DAffine3, inside: F) -> Vec<Intersection>
    where
        F: Fn(Vec2) -> bool,
    {
        let to_local = transform.inverse();
        if !to_local.is_finite() {
            return Vec::new();
        }
        let local = |p: Vec3| to_local.transform_point3(p.as_dvec3()).as_vec3();

        let confidence = self.confidence();
        let mut hits = Vec::new();
        for finger in 0..5 {
            let joints = self.finger_joints(finger);
            for bone in 0..BONES_PER_FINGER {
                let (a, b) = (&joints[bone], &joints[bone + 1]);
                let (la, lb) = (local(a.position), local(b.position));
                let (da, db) = (la.z, lb.z);
                // Sign change of the signed distance; touching counts.
                if da * db > 0.0 || da == db {
                    continue;
                }
                let t = da / (da - db);
                let hit = la.lerp(lb, t);
                let in_plane = Vec2::new(hit.x, hit.y);
                if !inside(in_plane) {
                    continue;
                }
                hits.push(Intersection {
                    position: a.position.lerp(b.position, t),
                    local: in_plane,
                    radius: a.radius + (b.radius - a.radius) * t,
                    velocity: a.velocity.lerp(b.velocity, t),
                    confidence,
                    finger,
                    bone,
                });
            }
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::frame::flat_hand;
    use glam::DVec3;

    fn hand_at(created: f64, last_update: f64, confidence: f32) -> HandInfo {
        let mut info = HandInfo::new(1, created);
        info.last_update = last_update;
        info.force_confidence(confidence);
        info
    }

    // ── eviction ──────────────────────────────────────────────────────────

    #[test]
    fn stale_hands_are_evicted_regardless_of_confidence() {
        let info = hand_at(0.0, 10.0, 1.0);
        assert!(info.should_evict(10.51));
        assert!(!info.should_evict(10.49));
    }

    #[test]
    fn young_hands_get_a_grace_period() {
        let info = hand_at(10.0, 10.2, 0.0);
        assert!(!info.should_evict(10.2));
    }

    #[test]
    fn old_faded_hands_are_evicted() {
        let info = hand_at(9.0, 10.0, 0.005);
        assert!(info.should_evict(10.0));
        let info = hand_at(9.0, 10.0, 0.02);
        assert!(!info.should_evict(10.0));
    }

    // ── confidence ────────────────────────────────────────────────────────

    #[test]
    fn confidence_ramps_with_time_visible() {
        let fresh = flat_hand(1, Vec3::ZERO, 1.0, 0.0);
        let settled = flat_hand(1, Vec3::ZERO, 1.0, 0.5);
        assert_eq!(HandInfo::instant_confidence(&fresh), 0.0);
        assert_eq!(HandInfo::instant_confidence(&settled), 1.0);

        let mut info = HandInfo::new(1, 0.0);
        info.update(&settled, 1.0 / 60.0, Quat::IDENTITY, Vec3::ZERO);
        assert!((info.confidence() - 0.5).abs() < 1e-5);
        assert!((info.last_update() - 1.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn missing_hands_fade_and_stop() {
        let hand = flat_hand(1, Vec3::ZERO, 1.0, 1.0);
        let mut info = HandInfo::new(1, 0.0);
        info.update(&hand, 0.1, Quat::IDENTITY, Vec3::ZERO);
        let moved = flat_hand(1, Vec3::X * 0.1, 1.0, 1.0);
        info.update(&moved, 0.1, Quat::IDENTITY, Vec3::ZERO);
        assert!(info.joints()[0].velocity.x > 0.9);

        let before = info.confidence();
        info.update_without_hand(1.0 / 60.0);
        assert!((info.confidence() - before * 0.8).abs() < 1e-5);
        assert!(info.joints().iter().all(|j| j.velocity == Vec3::ZERO));
        assert!((info.last_update() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn waiting_stretches_the_next_sample_interval() {
        let mut info = HandInfo::new(1, 0.0);
        info.update(&flat_hand(1, Vec3::ZERO, 1.0, 1.0), 1.0 / 120.0, Quat::IDENTITY, Vec3::ZERO);
        let before = info.confidence();

        info.wait(1.0 / 120.0);
        assert_eq!(info.confidence(), before);
        assert!((info.last_update() - 1.0 / 120.0).abs() < 1e-9);

        info.update(&flat_hand(1, Vec3::X * 0.01, 1.0, 1.0), 1.0 / 120.0, Quat::IDENTITY, Vec3::ZERO);
        // 1 cm over two render frames at 120 Hz.
        assert!((info.joints()[0].velocity.x - 0.6).abs() < 1e-3);
        assert!((info.last_update() - 1.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn registration_moves_joints_into_world_space() {
        let hand = flat_hand(1, Vec3::ZERO, 1.0, 1.0);
        let mut info = HandInfo::new(1, 0.0);
        info.update(&hand, 0.01, Quat::IDENTITY, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(info.palm_position(), Vec3::Y);
        assert_eq!(info.joints()[4].position, hand.fingers[0].tip() + Vec3::Y);
        assert!(info.joints()[4].is_tip);
        assert_eq!(info.extended_fingers(), 5);
    }

    // ── intersection ──────────────────────────────────────────────────────

    /// A hand whose index distal bone runs from z = 0.01 to z = -0.01 at
    /// `(x, 0)`; every other joint sits far above the plane.
    fn poking_hand(x: f32) -> HandInfo {
        let mut info = HandInfo::new(7, 0.0);
        info.force_confidence(0.9);
        for joint in &mut info.joints {
            joint.position = Vec3::new(0.0, 0.0, 1.0);
        }
        let base = JOINTS_PER_FINGER;
        info.joints[base + 3] = JointPoint { position: Vec3::new(x, 0.0, 0.01), radius: 0.01, ..Default::default() };
        info.joints[base + 4] = JointPoint {
            position: Vec3::new(x, 0.0, -0.01),
            velocity: Vec3::new(0.0, 0.0, -2.0),
            radius: 0.005,
            is_tip: true,
            extended: true,
        };
        info
    }

    fn rect() -> PlaneRect {
        PlaneRect { transform: DAffine3::IDENTITY, size: Vec2::new(0.2, 0.1) }
    }

    #[test]
    fn crossing_on_the_edge_counts() {
        let hits = poking_hand(0.1).intersect_rectangle(&rect());
        assert_eq!(hits.len(), 1);
        let hit = hits[0];
        assert_eq!((hit.finger, hit.bone), (1, 3));
        assert!((hit.local.x - 0.1).abs() < 1e-6);
        assert!((hit.radius - 0.0075).abs() < 1e-6);
        assert_eq!(hit.velocity, Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(hit.confidence, 0.9);
    }

    #[test]
    fn crossing_outside_the_extent_is_ignored() {
        assert!(poking_hand(0.11).intersect_rectangle(&rect()).is_empty());
    }

    #[test]
    fn targets_are_tested_in_their_own_frame() {
        let moved = PlaneRect { transform: DAffine3::from_translation(DVec3::new(0.5, 0.0, 0.0)), size: rect().size };
        assert!(poking_hand(0.0).intersect_rectangle(&moved).is_empty());
        assert_eq!(poking_hand(0.5).intersect_rectangle(&moved).len(), 1);
    }

    #[test]
    fn disk_uses_the_radius() {
        let disk = PlaneDisk { transform: DAffine3::IDENTITY, radius: 0.05 };
        assert_eq!(poking_hand(0.05).intersect_disk(&disk).len(), 1);
        assert!(poking_hand(0.06).intersect_disk(&disk).is_empty());
    }

    #[test]
    fn bones_lying_in_the_plane_never_hit() {
        let mut info = poking_hand(0.0);
        for (i, joint) in info.joints.iter_mut().enumerate() {
            joint.position = Vec3::new(0.001 * i as f32, 0.0, 0.0);
        }
        assert!(info.intersect_rectangle(&rect()).is_empty());
    }
}
