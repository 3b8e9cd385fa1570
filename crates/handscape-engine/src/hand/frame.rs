use std::sync::Arc;

use glam::Vec3;

/// Bones per finger, wrist side first (metacarpal, proximal, intermediate,
/// distal). The thumb carries a zero-length metacarpal.
pub const BONES_PER_FINGER: usize = 4;

/// Joints per finger: both ends of every bone, shared ends counted once.
pub const JOINTS_PER_FINGER: usize = BONES_PER_FINGER + 1;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FingerKind {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl FingerKind {
    pub const ALL: [Self; 5] = [Self::Thumb, Self::Index, Self::Middle, Self::Ring, Self::Pinky];
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Bone {
    /// End closer to the wrist.
    pub prev_joint: Vec3,
    /// End closer to the finger tip.
    pub next_joint: Vec3,
    pub width: f32,
}

impl Bone {
    #[inline]
    pub fn length(&self) -> f32 {
        self.prev_joint.distance(self.next_joint)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Finger {
    pub kind: FingerKind,
    pub extended: bool,
    pub bones: [Bone; BONES_PER_FINGER],
}

impl Finger {
    #[inline]
    pub fn tip(&self) -> Vec3 {
        self.bones[BONES_PER_FINGER - 1].next_joint
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Chirality {
    Left,
    Right,
}

/// One hand as reported by the tracker, in tracker space (meters).
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedHand {
    /// Stable while the hand stays tracked.
    pub id: i32,
    pub chirality: Chirality,
    /// Sensor confidence in `[0, 1]`.
    pub confidence: f32,
    /// Seconds this hand has been continuously tracked.
    pub time_visible: f32,
    pub palm_position: Vec3,
    pub palm_normal: Vec3,
    pub palm_width: f32,
    pub fingers: [Finger; 5],
}

/// A raw sensor image plus its lens distortion map.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraImage {
    pub width: u32,
    pub height: u32,
    pub bytes_per_pixel: u32,
    pub data: Arc<[u8]>,
    pub distortion_width: u32,
    pub distortion_height: u32,
    /// Interleaved `(x, y)` lookup pairs.
    pub distortion: Arc<[f32]>,
}

/// One tracker frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HandFrame {
    /// Strictly increasing, no gaps after backfill.
    pub id: u64,
    /// Sensor timestamp in microseconds.
    pub timestamp_us: i64,
    pub hands: Vec<TrackedHand>,
    /// Zero, one (mono) or two (stereo, left first) camera images.
    pub images: Vec<CameraImage>,
}

impl HandFrame {
    pub fn hand(&self, id: i32) -> Option<&TrackedHand> {
        self.hands.iter().find(|h| h.id == id)
    }
}

/// A straight, open hand with the palm at `palm` facing -Y; handy for demos
/// and tests.
pub fn flat_hand(id: i32, palm: Vec3, confidence: f32, time_visible: f32) -> TrackedHand {
    const SPREAD: [f32; 5] = [-0.045, -0.02, 0.0, 0.02, 0.038];
    const LENGTHS: [[f32; BONES_PER_FINGER]; 5] = [
        [0.0, 0.04, 0.03, 0.025],
        [0.065, 0.04, 0.025, 0.02],
        [0.063, 0.045, 0.028, 0.02],
        [0.058, 0.042, 0.026, 0.019],
        [0.054, 0.033, 0.02, 0.018],
    ];
    let fingers = FingerKind::ALL.map(|kind| {
        let i = kind as usize;
        let mut at = palm + Vec3::new(SPREAD[i] * 0.5, 0.0, 0.04);
        let bones = LENGTHS[i].map(|len| {
            let next = at + Vec3::new(SPREAD[i] * len * 4.0, 0.0, -len);
            let bone = Bone { prev_joint: at, next_joint: next, width: 0.016 };
            at = next;
            bone
        });
        Finger { kind, extended: true, bones }
    });
    TrackedHand {
        id,
        chirality: Chirality::Right,
        confidence,
        time_visible,
        palm_position: palm,
        palm_normal: Vec3::NEG_Y,
        palm_width: 0.085,
        fingers,
    }
}
