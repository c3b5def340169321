// THEORY:
// The pipeline never acquires frames itself. A `FrameSource` is whatever the
// caller plugs in: a capture device, a directory replay or a test queue. Each
// poll answers one of four ways, and only `Exhausted` ends monitoring. A source
// with nothing new yet answers `Pending`, which the monitor treats as idle time,
// not as a failure.

use crate::core_modules::frame::Frame;
use crate::error::VisionError;
use std::collections::VecDeque;

/// Outcome of asking a source for its next frame.
#[derive(Debug)]
pub enum FramePoll {
    Ready(Frame),
    /// A frame was due but could not be produced (corrupt file, dropped capture).
    Unavailable(VisionError),
    /// Nothing new yet.
    Pending,
    /// The source has ended for good.
    Exhausted,
}

pub trait FrameSource: Send {
    fn poll_frame(&mut self) -> FramePoll;
}

/// Replays a fixed list of polls, then reports `Exhausted`.
#[derive(Debug, Default)]
pub struct QueuedFrameSource {
    queue: VecDeque<FramePoll>,
}

impl QueuedFrameSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_frames(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            queue: frames.into_iter().map(FramePoll::Ready).collect(),
        }
    }

    pub fn push(&mut self, poll: FramePoll) -> &mut Self {
        self.queue.push_back(poll);
        self
    }

    pub fn push_frame(&mut self, frame: Frame) -> &mut Self {
        self.push(FramePoll::Ready(frame))
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl FrameSource for QueuedFrameSource {
    fn poll_frame(&mut self) -> FramePoll {
        self.queue.pop_front().unwrap_or(FramePoll::Exhausted)
    }
}
