//! Time subsystem.
//!
//! One `FrameClock` per render loop; `tick()` once per presented frame. The
//! accumulated `FrameTime::elapsed` is the timeline hand tracking runs on.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
