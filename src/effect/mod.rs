//! Transition lifecycle shared by every effect kind.
//!
//! A [`TransitionEffect`] owns one [`EffectKernel`], which knows the geometry of
//! a single effect, and drives it through the Animation Manager on whichever
//! backend the factory selected. Timing, state, notifications and failure
//! handling live here; kernels only turn progress into a [`FramePlan`].

pub mod element;
pub mod kinds;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, info, trace, warn};

use crate::animation::{AnimationHandle, AnimationManager};
use crate::backend::compositor::{CompositorBackend, SharedCompositor};
use crate::backend::software::SoftwareBackend;
use crate::backend::{
    AttachRequest, BackendKind, EffectFamily, FramePlan, RenderBackend, SharedImage, Surface,
    is_valid_image,
};
use crate::config::EffectKind;
use crate::easing::Easing;
use crate::error::{Result, TransitionError};
use crate::geometry::Size;
use crate::geometry::stagger::{Edge, Jitter};
use crate::geometry::timeline::expected_duration;
use crate::precompute::{
    GridLayout, LayoutParams, LayoutShape, POLL_BUDGET, PrecomputeWorker, compute_layout,
    fetch_layout,
};
use crate::resources::{Releasable, ResourceRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionState {
    Idle,
    Running,
    /// Reserved; no effect pauses today.
    Paused,
    Finished,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionEvent {
    Started,
    Progress(f32),
    Finished,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeline {
    Single,
    /// Staggered element starts followed by a completion phase.
    TwoPhase { element_duration: Duration },
}

/// What a kernel may use while building its elements for one run.
pub struct PrepareContext<'a> {
    pub size: Size,
    pub duration: Duration,
    pub rng: &'a mut StdRng,
    pub precompute: Option<&'a dyn PrecomputeWorker>,
}

impl PrepareContext<'_> {
    /// Grid layout for this run, from the precompute worker when it answers in
    /// time and computed here otherwise.
    pub fn layout(
        &mut self,
        effect: EffectKind,
        shape: LayoutShape,
        bias: Option<Edge>,
        jitter: Jitter,
    ) -> Arc<GridLayout> {
        let params = LayoutParams {
            size: self.size,
            shape,
            bias,
            jitter,
            seed: self.rng.random(),
        };
        if let Some(worker) = self.precompute {
            if let Some(layout) = fetch_layout(worker, effect, params, POLL_BUDGET) {
                return layout;
            }
        }
        Arc::new(compute_layout(&params))
    }
}

/// Geometry and timing of one effect kind.
pub trait EffectKernel {
    fn kind(&self) -> EffectKind;

    /// Valid after `prepare`.
    fn family(&self) -> EffectFamily;

    fn timeline(&self) -> Timeline {
        Timeline::Single
    }

    /// Curve the Animation Manager applies to the linear time fraction.
    fn easing(&self) -> Easing {
        Easing::Linear
    }

    /// Whether a software rendering of this effect is worth running.
    fn supports_software(&self) -> bool {
        true
    }

    /// Builds per-run state sized to `ctx.size`.
    fn prepare(&mut self, ctx: &mut PrepareContext<'_>) -> Result<()>;

    fn frame(&mut self, progress: f32) -> FramePlan;

    /// Plan for the end state. Must show exactly the new image.
    fn finish(&mut self) -> FramePlan {
        FramePlan::Complete
    }

    fn release(&mut self) {}
}

#[derive(Clone)]
pub enum BackendChoice {
    Software,
    Compositor(SharedCompositor),
}

/// Collaborators one effect instance runs against.
#[derive(Clone)]
pub struct EffectContext {
    pub animator: Rc<dyn AnimationManager>,
    pub backend: BackendChoice,
    pub resources: Option<Rc<dyn ResourceRegistry>>,
    pub precompute: Option<Rc<dyn PrecomputeWorker>>,
    pub target_fps: u32,
    pub software_fps_cap: Option<u32>,
    pub seed: u64,
}

type Listener = Box<dyn FnMut(&TransitionEvent)>;

#[derive(Default)]
struct EventQueue {
    listeners: RefCell<Vec<Listener>>,
    pending: RefCell<VecDeque<TransitionEvent>>,
    dispatching: Cell<bool>,
}

impl EventQueue {
    /// Delivers events in order. Listeners may call back into the effect;
    /// events raised meanwhile are queued behind the current one.
    fn emit(&self, events: impl IntoIterator<Item = TransitionEvent>) {
        self.pending.borrow_mut().extend(events);
        if self.dispatching.replace(true) {
            return;
        }
        loop {
            let Some(event) = self.pending.borrow_mut().pop_front() else {
                break;
            };
            let mut listeners = std::mem::take(&mut *self.listeners.borrow_mut());
            for listener in listeners.iter_mut() {
                listener(&event);
            }
            let mut slot = self.listeners.borrow_mut();
            listeners.append(&mut slot);
            *slot = listeners;
        }
        self.dispatching.set(false);
    }
}

struct EffectCore {
    kernel: Box<dyn EffectKernel>,
    ctx: EffectContext,
    rng: StdRng,
    duration: Duration,
    state: TransitionState,
    backend: Option<Box<dyn RenderBackend>>,
    handle: Option<AnimationHandle>,
    run: u64,
    progress: f32,
    final_emitted: bool,
    target: Option<Surface>,
    new_image: Option<SharedImage>,
}

enum StartOutcome {
    Rejected(TransitionError),
    Shown,
    Running {
        run: u64,
        expected: Duration,
        easing: Easing,
    },
    Failed(TransitionError),
}

enum Begin {
    Running,
    Shown,
}

impl EffectCore {
    fn expected_duration(&self) -> Duration {
        match self.kernel.timeline() {
            Timeline::Single => self.duration,
            Timeline::TwoPhase { element_duration } => {
                expected_duration(self.duration, element_duration)
            }
        }
    }

    fn start(
        &mut self,
        old: Option<SharedImage>,
        new: SharedImage,
        target: &Surface,
    ) -> StartOutcome {
        if self.state == TransitionState::Running {
            return StartOutcome::Rejected(TransitionError::AlreadyRunning);
        }
        if !is_valid_image(&new) {
            return StartOutcome::Rejected(TransitionError::InvalidImage);
        }
        self.release_run();
        self.progress = 0.0;
        self.final_emitted = false;

        let Some(old) = old.filter(|img| is_valid_image(img)) else {
            debug!(effect = %self.kernel.kind(), "transition_first_image");
            self.show_directly(&new, target);
            self.finish_shown();
            return StartOutcome::Shown;
        };

        match self.begin(old, new, target) {
            Ok(Begin::Running) => StartOutcome::Running {
                run: self.run,
                expected: self.expected_duration(),
                easing: self.kernel.easing(),
            },
            Ok(Begin::Shown) => {
                self.finish_shown();
                StartOutcome::Shown
            }
            Err(err) => {
                self.cleanup();
                StartOutcome::Failed(err)
            }
        }
    }

    fn finish_shown(&mut self) {
        self.progress = 1.0;
        self.final_emitted = true;
        self.state = TransitionState::Finished;
    }

    fn begin(&mut self, old: SharedImage, new: SharedImage, target: &Surface) -> Result<Begin> {
        let size = target.size();
        if size.is_empty() {
            return Err(TransitionError::Backend("target surface has zero size".into()));
        }
        let mut prep = PrepareContext {
            size,
            duration: self.duration,
            rng: &mut self.rng,
            precompute: self.ctx.precompute.as_deref(),
        };
        self.kernel.prepare(&mut prep)?;

        let request = AttachRequest {
            old,
            new: Arc::clone(&new),
            size,
            family: self.kernel.family(),
        };
        let Some(backend) = self.attach_backend(&request, target)? else {
            self.show_directly(&new, target);
            self.kernel.release();
            return Ok(Begin::Shown);
        };
        let fps = match backend.kind() {
            BackendKind::Software => self
                .ctx
                .software_fps_cap
                .map_or(self.ctx.target_fps, |cap| self.ctx.target_fps.min(cap)),
            BackendKind::Compositor => self.ctx.target_fps,
        };
        self.ctx.animator.set_target_fps(fps);
        info!(
            effect = %self.kernel.kind(),
            backend = backend.kind().as_str(),
            duration_ms = self.duration.as_millis() as u64,
            expected_ms = self.expected_duration().as_millis() as u64,
            fps,
            "transition_start"
        );
        self.backend = Some(backend);
        self.target = Some(target.clone());
        self.new_image = Some(new);

        let plan = self.kernel.frame(0.0);
        if let Some(backend) = self.backend.as_mut() {
            backend.present(&plan)?;
        }
        self.run += 1;
        self.state = TransitionState::Running;
        Ok(Begin::Running)
    }

    /// `Ok(None)` means no backend can run this effect and the new image
    /// should be shown immediately.
    fn attach_backend(
        &mut self,
        request: &AttachRequest,
        target: &Surface,
    ) -> Result<Option<Box<dyn RenderBackend>>> {
        let kind = self.kernel.kind();
        if let BackendChoice::Compositor(surface) = &self.ctx.backend {
            let mut backend = CompositorBackend::new(Rc::clone(surface));
            match backend.attach(request) {
                Ok(()) => {
                    self.register(Box::new(backend.lease()), "compositor textures");
                    return Ok(Some(Box::new(backend)));
                }
                Err(err) => {
                    warn!(effect = %kind, error = %err, "compositor_attach_failed");
                    if !self.kernel.supports_software() {
                        return Ok(None);
                    }
                }
            }
        }
        let mut backend = SoftwareBackend::new(target.clone());
        backend.attach(request)?;
        self.register(Box::new(backend.lease()), "software layers");
        Ok(Some(Box::new(backend)))
    }

    fn register(&self, lease: Box<dyn Releasable>, what: &str) {
        if let Some(registry) = &self.ctx.resources {
            registry.register(lease, &format!("{what} ({})", self.kernel.kind()));
        }
    }

    /// Shows `image` without a run: on the compositor when one is configured,
    /// always on the target canvas.
    fn show_directly(&self, image: &SharedImage, target: &Surface) {
        if let BackendChoice::Compositor(surface) = &self.ctx.backend {
            let mut backend = CompositorBackend::new(Rc::clone(surface));
            if let Err(err) = backend.show_image(image) {
                debug!(error = %err, "compositor_show_failed");
            }
        }
        target.paint(image);
    }

    /// Presents one eased frame. Reaching 1.0 ends the run in the same tick:
    /// overshooting curves get there before the manager's own completion.
    fn tick(&mut self, run: u64, raw: f32) -> Vec<TransitionEvent> {
        if self.state != TransitionState::Running || self.run != run || self.final_emitted {
            return Vec::new();
        }
        let mut p = raw.clamp(0.0, 1.0).max(self.progress);
        if 1.0 - p < 1e-6 {
            p = 1.0;
        }
        let plan = if p >= 1.0 {
            self.kernel.finish()
        } else {
            self.kernel.frame(p)
        };
        let presented = match self.backend.as_mut() {
            Some(backend) => backend.present(&plan),
            None => Err(TransitionError::Backend("no backend attached".into())),
        };
        if let Err(err) = presented {
            error!(effect = %self.kernel.kind(), progress = p, error = %err, "transition_frame_failed");
            self.cleanup();
            return vec![TransitionEvent::Error(err.to_string())];
        }
        self.progress = p;
        self.final_emitted = p >= 1.0;
        trace!(effect = %self.kernel.kind(), progress = p, "transition_progress");
        if p < 1.0 {
            return vec![TransitionEvent::Progress(p)];
        }
        if let Some(handle) = self.handle.take() {
            self.ctx.animator.cancel(handle);
        }
        self.state = TransitionState::Finished;
        info!(effect = %self.kernel.kind(), "transition_finished");
        vec![TransitionEvent::Progress(1.0), TransitionEvent::Finished]
    }

    fn complete(&mut self, run: u64) -> Vec<TransitionEvent> {
        if self.state != TransitionState::Running || self.run != run {
            return Vec::new();
        }
        self.handle = None;
        let mut events = Vec::with_capacity(2);
        if !self.final_emitted {
            if let Err(err) = self.present_end() {
                error!(effect = %self.kernel.kind(), error = %err, "transition_frame_failed");
                self.cleanup();
                return vec![TransitionEvent::Error(err.to_string())];
            }
            self.progress = 1.0;
            self.final_emitted = true;
            events.push(TransitionEvent::Progress(1.0));
        }
        self.state = TransitionState::Finished;
        info!(effect = %self.kernel.kind(), "transition_finished");
        events.push(TransitionEvent::Finished);
        events
    }

    fn present_end(&mut self) -> Result<()> {
        let plan = self.kernel.finish();
        match self.backend.as_mut() {
            Some(backend) => backend.present(&plan),
            None => Err(TransitionError::Backend("no backend attached".into())),
        }
    }

    fn stop(&mut self) -> Vec<TransitionEvent> {
        if self.state != TransitionState::Running {
            return Vec::new();
        }
        if let Some(handle) = self.handle.take() {
            self.ctx.animator.cancel(handle);
        }
        let mut events = Vec::with_capacity(2);
        if !self.final_emitted {
            if let Err(err) = self.present_end() {
                debug!(error = %err, "transition_stop_paint_fallback");
                if let (Some(target), Some(image)) = (&self.target, &self.new_image) {
                    target.paint(image);
                }
            }
            self.progress = 1.0;
            self.final_emitted = true;
            events.push(TransitionEvent::Progress(1.0));
        }
        self.state = TransitionState::Cancelled;
        info!(effect = %self.kernel.kind(), "transition_cancelled");
        events.push(TransitionEvent::Finished);
        events
    }

    fn release_run(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.ctx.animator.cancel(handle);
        }
        self.kernel.release();
        if let Some(mut backend) = self.backend.take() {
            backend.detach();
        }
        self.target = None;
        self.new_image = None;
    }

    fn cleanup(&mut self) {
        self.release_run();
        if !matches!(
            self.state,
            TransitionState::Finished | TransitionState::Cancelled
        ) {
            self.state = TransitionState::Idle;
        }
    }
}

impl Drop for EffectCore {
    fn drop(&mut self) {
        self.release_run();
    }
}

struct EffectShared {
    core: RefCell<EffectCore>,
    events: EventQueue,
}

/// Handle to one configured transition. Clones share the same effect.
#[derive(Clone)]
pub struct TransitionEffect {
    shared: Rc<EffectShared>,
}

/// Non-owning handle, for listeners that need to reach their own effect.
#[derive(Clone)]
pub struct WeakTransition {
    shared: Weak<EffectShared>,
}

impl WeakTransition {
    pub fn upgrade(&self) -> Option<TransitionEffect> {
        self.shared.upgrade().map(|shared| TransitionEffect { shared })
    }
}

impl TransitionEffect {
    pub(crate) fn new(kernel: Box<dyn EffectKernel>, ctx: EffectContext, duration: Duration) -> Self {
        let rng = StdRng::seed_from_u64(ctx.seed);
        Self {
            shared: Rc::new(EffectShared {
                core: RefCell::new(EffectCore {
                    kernel,
                    ctx,
                    rng,
                    duration,
                    state: TransitionState::Idle,
                    backend: None,
                    handle: None,
                    run: 0,
                    progress: 0.0,
                    final_emitted: false,
                    target: None,
                    new_image: None,
                }),
                events: EventQueue::default(),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakTransition {
        WeakTransition {
            shared: Rc::downgrade(&self.shared),
        }
    }

    pub fn kind(&self) -> EffectKind {
        self.shared.core.borrow().kernel.kind()
    }

    pub fn state(&self) -> TransitionState {
        self.shared.core.borrow().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == TransitionState::Running
    }

    pub fn duration(&self) -> Duration {
        self.shared.core.borrow().duration
    }

    /// Ignored while a run is in flight.
    pub fn set_duration(&self, duration: Duration) {
        let mut core = self.shared.core.borrow_mut();
        if core.state == TransitionState::Running {
            warn!(effect = %core.kernel.kind(), "transition_duration_locked");
            return;
        }
        core.duration = duration;
    }

    pub fn expected_duration(&self) -> Duration {
        self.shared.core.borrow().expected_duration()
    }

    /// Last progress value delivered to listeners.
    pub fn progress(&self) -> f32 {
        self.shared.core.borrow().progress
    }

    pub fn backend_kind(&self) -> Option<BackendKind> {
        self.shared.core.borrow().backend.as_ref().map(|b| b.kind())
    }

    pub fn subscribe(&self, listener: impl FnMut(&TransitionEvent) + 'static) {
        self.shared
            .events
            .listeners
            .borrow_mut()
            .push(Box::new(listener));
    }

    /// Starts a run from `old` to `new` on `target`.
    ///
    /// Returns `false` (plus an error event) when `new` is empty, when a run is
    /// already in flight, or when setup fails. Without a usable `old` image the
    /// new one is shown at once and the effect finishes without animating.
    pub fn start(&self, old: Option<SharedImage>, new: SharedImage, target: &Surface) -> bool {
        let outcome = match self.shared.core.try_borrow_mut() {
            Ok(mut core) => core.start(old, new, target),
            Err(_) => StartOutcome::Rejected(TransitionError::AlreadyRunning),
        };
        match outcome {
            StartOutcome::Rejected(err) => {
                warn!(error = %err, "transition_start_rejected");
                self.shared
                    .events
                    .emit([TransitionEvent::Error(err.to_string())]);
                false
            }
            StartOutcome::Failed(err) => {
                error!(effect = %self.kind(), error = %err, "transition_start_failed");
                self.shared
                    .events
                    .emit([TransitionEvent::Error(err.to_string())]);
                false
            }
            StartOutcome::Shown => {
                self.shared
                    .events
                    .emit([TransitionEvent::Progress(1.0), TransitionEvent::Finished]);
                true
            }
            StartOutcome::Running {
                run,
                expected,
                easing,
            } => {
                self.shared.events.emit([TransitionEvent::Started]);
                self.schedule(run, expected, easing);
                true
            }
        }
    }

    fn schedule(&self, run: u64, expected: Duration, easing: Easing) {
        let animator = Rc::clone(&self.shared.core.borrow().ctx.animator);
        let on_update = {
            let weak = Rc::downgrade(&self.shared);
            Box::new(move |p: f32| {
                if let Some(shared) = weak.upgrade() {
                    on_tick(&shared, run, p);
                }
            })
        };
        let on_complete = {
            let weak = Rc::downgrade(&self.shared);
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    on_complete(&shared, run);
                }
            })
        };
        let handle = animator.animate(expected, easing, on_update, on_complete);
        let mut core = self.shared.core.borrow_mut();
        if core.state == TransitionState::Running && core.run == run {
            core.handle = Some(handle);
        } else {
            // a listener already ended this run
            drop(core);
            animator.cancel(handle);
        }
    }

    /// Jumps to the end state. No-op unless running.
    pub fn stop(&self) {
        let events = match self.shared.core.try_borrow_mut() {
            Ok(mut core) => core.stop(),
            Err(_) => return,
        };
        self.shared.events.emit(events);
    }

    /// Releases elements and backend resources. Safe to call repeatedly.
    pub fn cleanup(&self) {
        if let Ok(mut core) = self.shared.core.try_borrow_mut() {
            core.cleanup();
        }
    }
}

fn on_tick(shared: &Rc<EffectShared>, run: u64, raw: f32) {
    let events = match shared.core.try_borrow_mut() {
        Ok(mut core) => core.tick(run, raw),
        Err(_) => Vec::new(),
    };
    shared.events.emit(events);
}

fn on_complete(shared: &Rc<EffectShared>, run: u64) {
    let events = match shared.core.try_borrow_mut() {
        Ok(mut core) => core.complete(run),
        Err(_) => Vec::new(),
    };
    shared.events.emit(events);
}
