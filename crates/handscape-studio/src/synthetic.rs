//! Stand-ins for the tracker SDK and the OS window list.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use glam::{IVec2, UVec2, Vec3};
use handscape_engine::compositor::{WindowHandle, WindowImage, WindowInfo, WindowSource};
use handscape_engine::hand::{flat_hand, CameraImage, Chirality, FrameSource, HandFrame};
use handscape_engine::render::PixelFormat;

const CAMERA_SIZE: (u32, u32) = (128, 96);

/// Two hands waving in front of the sensor at a fixed rate.
///
/// Every `drop_every`-th frame is withheld so the listener has gaps to
/// backfill through [`FrameSource::history`].
pub struct SyntheticHands {
    period: Duration,
    next_id: u64,
    started: Instant,
    drop_every: u64,
    limit: Option<u64>,
}

impl SyntheticHands {
    pub fn new(rate_hz: f32) -> Self {
        Self {
            period: Duration::from_secs_f32(1.0 / rate_hz.max(1.0)),
            next_id: 0,
            started: Instant::now(),
            drop_every: 50,
            limit: None,
        }
    }

    /// Closes the source after `frames` frames.
    #[cfg(test)]
    pub fn with_limit(mut self, frames: u64) -> Self {
        self.limit = Some(frames);
        self
    }

    fn timestamp_us(&self, id: u64) -> i64 {
        (id as u128 * self.period.as_micros()) as i64
    }

    /// The frame with `id`; a pure function of the ID so history lookups
    /// reproduce what live delivery would have sent.
    pub fn frame_at(&self, id: u64) -> HandFrame {
        let t = self.timestamp_us(id) as f32 * 1e-6;
        let sway = (t * 1.3).sin() * 0.05;

        let mut left = flat_hand(1, Vec3::new(-0.12 + sway, 0.18, 0.02), 1.0, t);
        left.chirality = Chirality::Left;
        let right = flat_hand(2, Vec3::new(0.12 - sway, 0.2 + (t * 0.7).sin() * 0.03, 0.0), 1.0, t);

        let mut hands = vec![left, right];
        // The right hand leaves the field of view for a while every 8 s.
        if t % 8.0 > 6.0 {
            hands.pop();
        }

        HandFrame { id, timestamp_us: self.timestamp_us(id), hands, images: camera_images(id) }
    }
}

impl FrameSource for SyntheticHands {
    fn next_frame(&mut self) -> Option<HandFrame> {
        loop {
            let id = self.next_id;
            if self.limit.is_some_and(|limit| id >= limit) {
                return None;
            }
            self.next_id += 1;

            let due = self.started + self.period * id as u32;
            if let Some(wait) = due.checked_duration_since(Instant::now()) {
                thread::sleep(wait);
            }
            if self.drop_every > 0 && id % self.drop_every == self.drop_every - 1 {
                continue;
            }
            return Some(self.frame_at(id));
        }
    }

    fn history(&self, id: u64) -> Option<HandFrame> {
        (id < self.next_id).then(|| self.frame_at(id))
    }
}

/// A scrolling luma gradient for each of the two sensor cameras, with an
/// identity distortion map.
fn camera_images(id: u64) -> Vec<CameraImage> {
    let (w, h) = CAMERA_SIZE;
    let distortion: Arc<[f32]> = (0..h)
        .flat_map(|y| (0..w).flat_map(move |x| [(x as f32 + 0.5) / w as f32, (y as f32 + 0.5) / h as f32]))
        .collect();

    (0..2u64)
        .map(|camera| {
            let shift = id * 2 + camera * 8;
            let data: Arc<[u8]> =
                (0..h).flat_map(|y| (0..w).map(move |x| ((x as u64 + y as u64 + shift) % 256) as u8)).collect();
            CameraImage {
                width: w,
                height: h,
                bytes_per_pixel: 1,
                data,
                distortion_width: w,
                distortion_height: h,
                distortion: Arc::clone(&distortion),
            }
        })
        .collect()
}

/// A fixed pair of desktop windows with checkerboard contents.
pub struct DemoWindows {
    windows: Vec<WindowInfo>,
    frame: u32,
}

impl DemoWindows {
    pub fn new() -> Self {
        let window = |handle: WindowHandle, x, y, w, h, z_order, title: &str| WindowInfo {
            handle,
            position: IVec2::new(x, y),
            size: UVec2::new(w, h),
            z_order,
            title: title.to_owned(),
        };
        Self {
            windows: vec![
                window(0x10, 120, 80, 960, 600, 0, "terminal"),
                window(0x20, 700, 300, 800, 500, 1, "browser"),
            ],
            frame: 0,
        }
    }
}

impl Default for DemoWindows {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowSource for DemoWindows {
    fn windows(&mut self) -> Vec<WindowInfo> {
        self.frame = self.frame.wrapping_add(1);
        self.windows.clone()
    }

    fn snapshot(&mut self, handle: WindowHandle) -> Option<WindowImage> {
        let info = self.windows.iter().find(|w| w.handle == handle)?;
        // Capture at a quarter of the desktop resolution.
        let (w, h) = ((info.size.x / 4).max(1), (info.size.y / 4).max(1));
        let tint = (handle as u8).wrapping_mul(5);
        let scroll = self.frame / 4;
        let mut data = Vec::with_capacity((w * h * 4) as usize);
        for y in 0..h {
            for x in 0..w {
                let on = ((x / 16) + (y + scroll) / 16) % 2 == 0;
                let v: u8 = if on { 220 } else { 60 };
                data.extend_from_slice(&[v, v.saturating_sub(tint), tint, 255]);
            }
        }
        Some(WindowImage { width: w, height: h, format: PixelFormat::Bgra8, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_reproduces_live_frames() {
        let mut source = SyntheticHands::new(1000.0).with_limit(3);
        let live = source.next_frame().unwrap();
        assert_eq!(source.history(live.id), Some(live));
        assert_eq!(source.history(10), None);
    }

    #[test]
    fn withheld_frames_are_still_in_history() {
        let mut source = SyntheticHands::new(1000.0).with_limit(60);
        let mut ids = Vec::new();
        while let Some(frame) = source.next_frame() {
            ids.push(frame.id);
        }
        assert!(!ids.contains(&49));
        assert_eq!(ids.len(), 59);
        assert!(source.history(49).is_some());
    }

    #[test]
    fn captures_match_their_declared_size() {
        let mut windows = DemoWindows::new();
        let list = windows.windows();
        let shot = windows.snapshot(list[0].handle).unwrap();
        assert_eq!(shot.data.len() as u32, shot.width * shot.height * 4);
        assert!(windows.snapshot(0xdead).is_none());
    }
}
