//! Hand tracking.
//!
//! Tracker frames ([`HandFrame`]) arrive on a background thread through a
//! [`FrameQueue`]. The render thread feeds them to a [`HandTracker`], which
//! keeps one smoothed [`HandInfo`] per hand ID and evicts hands that faded
//! out or went stale. [`HandModel`] turns a `HandInfo` into scene geometry,
//! and the intersection tests let UI surfaces react to fingers.

mod frame;
mod info;
mod model;
mod queue;
mod smoothing;
mod tracker;

pub use frame::{
    flat_hand, Bone, CameraImage, Chirality, Finger, FingerKind, HandFrame, TrackedHand, BONES_PER_FINGER,
    JOINTS_PER_FINGER,
};
pub use info::{
    EvictionPolicy, HandInfo, Intersection, JointPoint, PlaneDisk, PlaneRect, FULL_VISIBILITY_TIME, LOST_SMOOTHING,
    TRACKED_SMOOTHING,
};
pub use model::{segment_transform, HandModel};
pub use queue::{spawn_listener, FrameHistory, FrameListener, FrameQueue, FrameSource, MAX_BACKFILL, MAX_PENDING};
pub use smoothing::{smootherstep, smoothstep, Smoothed};
pub use tracker::HandTracker;
