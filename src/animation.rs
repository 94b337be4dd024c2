//! Animation Manager contract and a deterministic, tick-driven implementation.
//!
//! Effects never own a timer. They hand an update and a completion callback to
//! an [`AnimationManager`] and progress only when the manager calls back.

use std::cell::{Cell, RefCell};
use std::time::Duration;

use tracing::{debug, trace};

use crate::easing::Easing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationHandle(u64);

impl AnimationHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

pub type UpdateFn = Box<dyn FnMut(f32)>;
pub type CompleteFn = Box<dyn FnOnce()>;

pub trait AnimationManager {
    /// Schedules an animation; `on_update` receives the eased progress once per
    /// frame and `on_complete` runs once after the final update.
    fn animate(
        &self,
        duration: Duration,
        easing: Easing,
        on_update: UpdateFn,
        on_complete: CompleteFn,
    ) -> AnimationHandle;

    /// Drops a scheduled animation; its completion callback never runs.
    fn cancel(&self, handle: AnimationHandle);

    fn set_target_fps(&self, fps: u32);
}

pub const DEFAULT_TARGET_FPS: u32 = 60;

struct Running {
    handle: AnimationHandle,
    duration: Duration,
    elapsed: Duration,
    easing: Easing,
    on_update: Option<UpdateFn>,
    on_complete: Option<CompleteFn>,
}

/// Single-threaded animator advanced explicitly by the host loop.
///
/// Callbacks run with no internal borrow held, so they may schedule or cancel
/// animations (including their own).
pub struct FrameAnimator {
    running: RefCell<Vec<Running>>,
    next_id: Cell<u64>,
    target_fps: Cell<u32>,
}

impl Default for FrameAnimator {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAnimator {
    pub fn new() -> Self {
        Self {
            running: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
            target_fps: Cell::new(DEFAULT_TARGET_FPS),
        }
    }

    pub fn target_fps(&self) -> u32 {
        self.target_fps.get()
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps.get().max(1) as f64)
    }

    pub fn active(&self) -> usize {
        self.running.borrow().len()
    }

    pub fn is_active(&self, handle: AnimationHandle) -> bool {
        self.running.borrow().iter().any(|r| r.handle == handle)
    }

    /// Advances every scheduled animation by `dt` and delivers one update each.
    pub fn advance(&self, dt: Duration) {
        let handles: Vec<AnimationHandle> =
            self.running.borrow().iter().map(|r| r.handle).collect();
        for handle in handles {
            self.step(handle, dt);
        }
    }

    fn step(&self, handle: AnimationHandle, dt: Duration) {
        let (value, done, mut update) = {
            let mut running = self.running.borrow_mut();
            let Some(entry) = running.iter_mut().find(|r| r.handle == handle) else {
                return;
            };
            entry.elapsed += dt;
            let t = if entry.duration.is_zero() {
                1.0
            } else {
                (entry.elapsed.as_secs_f64() / entry.duration.as_secs_f64()).min(1.0) as f32
            };
            (entry.easing.apply(t), t >= 1.0, entry.on_update.take())
        };

        if let Some(cb) = update.as_mut() {
            trace!(animation = handle.0, progress = value, "animation_tick");
            cb(value);
        }

        let complete = {
            let mut running = self.running.borrow_mut();
            let Some(pos) = running.iter().position(|r| r.handle == handle) else {
                // cancelled from inside the update callback
                return;
            };
            if done {
                let entry = running.remove(pos);
                entry.on_complete
            } else {
                running[pos].on_update = update;
                None
            }
        };

        if let Some(cb) = complete {
            debug!(animation = handle.0, "animation_complete");
            cb();
        }
    }

    /// Ticks at the target frame interval until nothing is scheduled, or
    /// `max_frames` frames have elapsed. Returns the number of frames ticked.
    pub fn run_until_idle(&self, max_frames: usize) -> usize {
        let mut frames = 0;
        while self.active() > 0 && frames < max_frames {
            self.advance(self.frame_interval());
            frames += 1;
        }
        frames
    }
}

impl AnimationManager for FrameAnimator {
    fn animate(
        &self,
        duration: Duration,
        easing: Easing,
        on_update: UpdateFn,
        on_complete: CompleteFn,
    ) -> AnimationHandle {
        let handle = AnimationHandle(self.next_id.get());
        self.next_id.set(handle.0 + 1);
        debug!(animation = handle.0, duration_ms = duration.as_millis() as u64, easing = %easing, "animation_scheduled");
        self.running.borrow_mut().push(Running {
            handle,
            duration,
            elapsed: Duration::ZERO,
            easing,
            on_update: Some(on_update),
            on_complete: Some(on_complete),
        });
        handle
    }

    fn cancel(&self, handle: AnimationHandle) {
        let mut running = self.running.borrow_mut();
        let before = running.len();
        running.retain(|r| r.handle != handle);
        if running.len() != before {
            debug!(animation = handle.0, "animation_cancelled");
        }
    }

    fn set_target_fps(&self, fps: u32) {
        self.target_fps.set(fps.clamp(1, 240));
    }
}
