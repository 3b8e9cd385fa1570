//! Cross-thread hand frame delivery.
//!
//! A tracker thread runs a [`FrameListener`] that pushes into a shared
//! [`FrameQueue`]; the render thread drains the queue once per frame. The
//! lock is held only to move frames in or out.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, info, warn};
use parking_lot::Mutex;

use super::frame::HandFrame;

/// Frames kept when the render thread stops draining.
pub const MAX_PENDING: usize = 256;

/// Largest gap the listener tries to backfill.
pub const MAX_BACKFILL: u64 = 60;

/// The tracker SDK's past-frame lookup.
pub trait FrameHistory {
    /// The frame with `id`, if the tracker still has it.
    fn frame(&self, id: u64) -> Option<HandFrame>;
}

/// A blocking producer of tracker frames.
pub trait FrameSource: Send {
    /// The next frame; `None` once the source is closed.
    fn next_frame(&mut self) -> Option<HandFrame>;

    /// Looks up an already delivered or skipped frame.
    fn history(&self, _id: u64) -> Option<HandFrame> {
        None
    }
}

#[derive(Debug, Default)]
struct QueueState {
    latest: Option<HandFrame>,
    pending: VecDeque<HandFrame>,
    dropped: u64,
}

/// Most recent frame plus every frame not yet drained.
#[derive(Debug, Default)]
pub struct FrameQueue {
    state: Mutex<QueueState>,
}

impl FrameQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, frame: HandFrame) {
        let mut state = self.state.lock();
        if state.pending.len() >= MAX_PENDING {
            state.pending.pop_front();
            state.dropped += 1;
        }
        state.latest = Some(frame.clone());
        state.pending.push_back(frame);
    }

    /// Takes every undrained frame in arrival order.
    pub fn drain(&self) -> Vec<HandFrame> {
        let mut state = self.state.lock();
        state.pending.drain(..).collect()
    }

    /// The newest frame, whether drained or not.
    pub fn latest(&self) -> Option<HandFrame> {
        self.state.lock().latest.clone()
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Frames discarded because nobody drained them.
    pub fn dropped(&self) -> u64 {
        self.state.lock().dropped
    }
}

/// Feeds a [`FrameQueue`], filling ID gaps from a [`FrameHistory`] so the
/// drained sequence has no holes.
#[derive(Debug)]
pub struct FrameListener {
    queue: Arc<FrameQueue>,
    last_id: Option<u64>,
}

impl FrameListener {
    pub fn new(queue: Arc<FrameQueue>) -> Self {
        Self { queue, last_id: None }
    }

    #[inline]
    pub fn last_id(&self) -> Option<u64> {
        self.last_id
    }

    /// Queues `frame`, preceded by any frames between the last one seen and
    /// it. Frames older than the last one are ignored.
    pub fn on_frame<H: FrameHistory + ?Sized>(&mut self, frame: HandFrame, history: &H) {
        if let Some(last) = self.last_id {
            if frame.id <= last {
                debug!("ignoring out-of-order frame {} (last {last})", frame.id);
                return;
            }
            let gap = frame.id - last - 1;
            if gap > MAX_BACKFILL {
                warn!("tracker skipped {gap} frames; backfilling the last {MAX_BACKFILL}");
            }
            let first = last + 1 + gap.saturating_sub(MAX_BACKFILL);
            for id in first..frame.id {
                match history.frame(id) {
                    Some(missed) => {
                        debug!("backfilled frame {id}");
                        self.queue.push(missed);
                    }
                    None => debug!("frame {id} no longer in tracker history"),
                }
            }
        }
        self.last_id = Some(frame.id);
        self.queue.push(frame);
    }

    /// Pulls from `source` until it closes.
    pub fn run<S: FrameSource + ?Sized>(mut self, source: &mut S) {
        struct Lookup<'a, S: ?Sized>(&'a S);
        impl<S: FrameSource + ?Sized> FrameHistory for Lookup<'_, S> {
            fn frame(&self, id: u64) -> Option<HandFrame> {
                self.0.history(id)
            }
        }

        while let Some(frame) = source.next_frame() {
            self.on_frame(frame, &Lookup(&*source));
        }
        info!("hand frame source closed after frame {:?}", self.last_id);
    }
}

impl<F: Fn(u64) -> Option<HandFrame>> FrameHistory for F {
    fn frame(&self, id: u64) -> Option<HandFrame> {
        self(id)
    }
}

/// Runs `source` on a named background thread feeding `queue`.
pub fn spawn_listener<S>(mut source: S, queue: Arc<FrameQueue>) -> std::io::Result<JoinHandle<()>>
where
    S: FrameSource + 'static,
{
    thread::Builder::new().name("hand-tracker".into()).spawn(move || {
        FrameListener::new(queue).run(&mut source);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(id: u64) -> HandFrame {
        HandFrame { id, timestamp_us: id as i64 * 1000, ..Default::default() }
    }

    fn ids(frames: &[HandFrame]) -> Vec<u64> {
        frames.iter().map(|f| f.id).collect()
    }

    #[test]
    fn gaps_are_backfilled_in_order() {
        let queue = FrameQueue::new();
        let mut listener = FrameListener::new(queue.clone());
        let history = |id: u64| Some(frame(id));
        listener.on_frame(frame(1), &history);
        listener.on_frame(frame(4), &history);
        assert_eq!(ids(&queue.drain()), [1, 2, 3, 4]);
        assert!(queue.drain().is_empty());
        assert_eq!(queue.latest().map(|f| f.id), Some(4));
    }

    #[test]
    fn forgotten_frames_are_skipped() {
        let queue = FrameQueue::new();
        let mut listener = FrameListener::new(queue.clone());
        let history = |id: u64| (id != 2).then(|| frame(id));
        listener.on_frame(frame(1), &history);
        listener.on_frame(frame(4), &history);
        assert_eq!(ids(&queue.drain()), [1, 3, 4]);
    }

    #[test]
    fn stale_frames_are_ignored() {
        let queue = FrameQueue::new();
        let mut listener = FrameListener::new(queue.clone());
        let none = |_: u64| -> Option<HandFrame> { None };
        listener.on_frame(frame(5), &none);
        listener.on_frame(frame(5), &none);
        listener.on_frame(frame(3), &none);
        assert_eq!(ids(&queue.drain()), [5]);
        assert_eq!(listener.last_id(), Some(5));
    }

    #[test]
    fn long_gaps_backfill_only_the_tail() {
        let queue = FrameQueue::new();
        let mut listener = FrameListener::new(queue.clone());
        let history = |id: u64| Some(frame(id));
        listener.on_frame(frame(0), &history);
        listener.on_frame(frame(1000), &history);
        let drained = queue.drain();
        assert_eq!(drained.len() as u64, 1 + MAX_BACKFILL + 1);
        assert_eq!(drained[1].id, 1000 - MAX_BACKFILL);
    }

    #[test]
    fn undrained_queue_is_bounded() {
        let queue = FrameQueue::new();
        for id in 0..(MAX_PENDING as u64 + 10) {
            queue.push(frame(id));
        }
        assert_eq!(queue.pending_len(), MAX_PENDING);
        assert_eq!(queue.dropped(), 10);
        assert_eq!(queue.drain()[0].id, 10);
    }

    struct Scripted(VecDeque<HandFrame>);

    impl FrameSource for Scripted {
        fn next_frame(&mut self) -> Option<HandFrame> {
            self.0.pop_front()
        }

        fn history(&self, id: u64) -> Option<HandFrame> {
            Some(frame(id))
        }
    }

    #[test]
    fn listener_thread_feeds_the_queue() {
        let queue = FrameQueue::new();
        let source = Scripted(VecDeque::from([frame(1), frame(2), frame(5)]));
        spawn_listener(source, queue.clone()).unwrap().join().unwrap();
        assert_eq!(ids(&queue.drain()), [1, 2, 3, 4, 5]);
    }
}
