//! Refresh-synchronized frame callbacks and the wall clock.
//!
//! Frame tasks are one-shot, like an animation frame request: a task that
//! wants to keep running schedules itself again when it runs. The host
//! drains due tasks once per display refresh through `Controller::tick`.

use std::time::Instant;

/// Work the controller runs on the next display refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameTask {
    /// Read the microphone's amplitude snapshot.
    Sample,
    /// Poll the playback output's position.
    PlaybackPosition,
}

/// Identifies one scheduled frame task so it can be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

/// Schedules frame tasks for the next refresh.
pub trait FrameScheduler: Send {
    /// Requests `task` to run on the next refresh.
    fn schedule(&mut self, task: FrameTask) -> FrameHandle;
    /// Cancels a pending task. Unknown or already-run handles are ignored.
    fn cancel(&mut self, handle: FrameHandle);
    /// Removes and returns every task due on this refresh, in request order.
    fn take_due(&mut self) -> Vec<(FrameHandle, FrameTask)>;
}

/// Default scheduler: everything requested before a refresh runs on it.
#[derive(Debug, Default)]
pub struct FrameLoop {
    next_id: u64,
    pending: Vec<(FrameHandle, FrameTask)>,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting for the next refresh.
    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl FrameScheduler for FrameLoop {
    fn schedule(&mut self, task: FrameTask) -> FrameHandle {
        self.next_id += 1;
        let handle = FrameHandle(self.next_id);
        self.pending.push((handle, task));
        handle
    }

    fn cancel(&mut self, handle: FrameHandle) {
        self.pending.retain(|(pending, _)| *pending != handle);
    }

    fn take_due(&mut self) -> Vec<(FrameHandle, FrameTask)> {
        std::mem::take(&mut self.pending)
    }
}

/// Source of wall-clock time for elapsed-time accounting.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The system's monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
