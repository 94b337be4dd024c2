use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use frame_transitions::backend::compositor::{CompositorSurface, SharedCompositor};
use frame_transitions::backend::{BackendKind, Capability, ShaderEffect, SharedImage, Surface};
use frame_transitions::config::{EffectKind, EffectRequest, TransitionSettings};
use frame_transitions::error::Result;
use frame_transitions::geometry::{RevealRegion, Size};
use frame_transitions::precompute::{
    LayoutWorker, PrecomputeRequest, PrecomputeResponse, PrecomputeWorker, WorkerKind,
};
use frame_transitions::resources::ResourceTracker;
use frame_transitions::{
    FrameAnimator, TransitionEffect, TransitionEvent, TransitionFactory, TransitionHost,
    TransitionState,
};
use image::{Rgba, RgbaImage};

const W: u32 = 64;
const H: u32 = 48;

fn solid(rgba: [u8; 4]) -> SharedImage {
    Arc::new(RgbaImage::from_pixel(W, H, Rgba(rgba)))
}

fn gradient() -> SharedImage {
    Arc::new(RgbaImage::from_fn(W, H, |x, y| {
        Rgba([(x * 4) as u8, (y * 5) as u8, 200, 255])
    }))
}

fn settings(kind: EffectKind) -> TransitionSettings {
    let mut settings = TransitionSettings {
        effect: EffectRequest::Named(kind),
        hardware_acceleration: false,
        duration: Duration::from_millis(500),
        ..TransitionSettings::default()
    };
    settings.options.set(EffectKind::Crossfade, "easing", "linear");
    settings
}

fn factory(settings: TransitionSettings) -> (Rc<FrameAnimator>, TransitionFactory) {
    let animator = Rc::new(FrameAnimator::new());
    let factory = TransitionFactory::with_seed(settings, animator.clone(), 11);
    (animator, factory)
}

fn record(effect: &TransitionEffect) -> Rc<RefCell<Vec<TransitionEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    effect.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    events
}

#[test]
fn first_image_is_shown_without_animating() {
    let (animator, mut factory) = factory(settings(EffectKind::Crossfade));
    let effect = factory.create_transition().unwrap();
    let events = record(&effect);
    let surface = Surface::new(W, H);
    let new = gradient();

    assert!(effect.start(None, new.clone(), &surface));
    assert_eq!(
        *events.borrow(),
        vec![TransitionEvent::Progress(1.0), TransitionEvent::Finished]
    );
    assert_eq!(effect.state(), TransitionState::Finished);
    assert_eq!(animator.active(), 0);
    assert_eq!(surface.snapshot(), *new);
}

#[test]
fn zero_sized_image_is_rejected() {
    let (animator, mut factory) = factory(settings(EffectKind::Crossfade));
    let effect = factory.create_transition().unwrap();
    let events = record(&effect);
    let surface = Surface::new(W, H);

    assert!(!effect.start(Some(solid([0, 0, 0, 255])), Arc::new(RgbaImage::new(0, 0)), &surface));
    assert_eq!(effect.state(), TransitionState::Idle);
    assert_eq!(animator.active(), 0);
    let events = events.borrow();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], TransitionEvent::Error(_)));
}

#[test]
fn ticks_deliver_linear_progress_then_finish() {
    let (animator, mut factory) = factory(settings(EffectKind::Crossfade));
    let effect = factory.create_transition().unwrap();
    let events = record(&effect);
    let surface = Surface::new(W, H);

    assert!(effect.start(Some(solid([255, 0, 0, 255])), gradient(), &surface));
    assert_eq!(effect.state(), TransitionState::Running);
    animator.advance(Duration::ZERO);
    for _ in 0..4 {
        animator.advance(Duration::from_millis(125));
    }

    assert_eq!(
        *events.borrow(),
        vec![
            TransitionEvent::Started,
            TransitionEvent::Progress(0.0),
            TransitionEvent::Progress(0.25),
            TransitionEvent::Progress(0.5),
            TransitionEvent::Progress(0.75),
            TransitionEvent::Progress(1.0),
            TransitionEvent::Finished,
        ]
    );
    assert_eq!(effect.state(), TransitionState::Finished);
    assert_eq!(animator.active(), 0);
}

#[test]
fn progress_never_moves_backwards() {
    let (animator, mut factory) = factory(settings(EffectKind::BlockFlip));
    let effect = factory.create_transition().unwrap();
    let events = record(&effect);
    let surface = Surface::new(W, H);

    assert!(effect.start(Some(solid([0, 0, 0, 255])), gradient(), &surface));
    animator.run_until_idle(1_000);

    let progress: Vec<f32> = events
        .borrow()
        .iter()
        .filter_map(|e| match e {
            TransitionEvent::Progress(p) => Some(*p),
            _ => None,
        })
        .collect();
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(progress.last(), Some(&1.0));
    assert_eq!(events.borrow().last(), Some(&TransitionEvent::Finished));
}

#[test]
fn overshooting_easing_finishes_on_the_tick_reaching_one() {
    let mut settings = settings(EffectKind::Crossfade);
    settings.duration = Duration::from_millis(1000);
    settings.options.set(EffectKind::Crossfade, "easing", "out-back");
    let (animator, mut factory) = factory(settings);
    let effect = factory.create_transition().unwrap();
    let events = record(&effect);
    let surface = Surface::new(W, H);
    let new = gradient();

    assert!(effect.start(Some(solid([0, 0, 0, 255])), new.clone(), &surface));
    let mut ticks = 0;
    while animator.active() > 0 && ticks < 100 {
        animator.advance(Duration::from_millis(50));
        ticks += 1;
    }

    assert!(ticks < 20, "ran {ticks} ticks");
    assert_eq!(effect.state(), TransitionState::Finished);
    let events = events.borrow();
    let full = events
        .iter()
        .position(|e| *e == TransitionEvent::Progress(1.0))
        .unwrap();
    assert_eq!(events[full + 1..], [TransitionEvent::Finished]);
    assert!(surface.snapshot() == *new);
}

#[test]
fn start_while_running_is_rejected() {
    let (animator, mut factory) = factory(settings(EffectKind::Crossfade));
    let effect = factory.create_transition().unwrap();
    let events = record(&effect);
    let surface = Surface::new(W, H);

    assert!(effect.start(Some(solid([0, 0, 0, 255])), gradient(), &surface));
    assert!(!effect.start(Some(solid([0, 0, 0, 255])), gradient(), &surface));
    assert_eq!(effect.state(), TransitionState::Running);
    assert!(matches!(events.borrow().last(), Some(TransitionEvent::Error(_))));

    animator.run_until_idle(1_000);
    assert_eq!(effect.state(), TransitionState::Finished);
}

#[test]
fn listeners_may_reenter_the_effect() {
    let (animator, mut factory) = factory(settings(EffectKind::Crossfade));
    let effect = factory.create_transition().unwrap();
    let events = record(&effect);
    let surface = Surface::new(W, H);

    let weak = effect.downgrade();
    let restart_surface = surface.clone();
    let rejected = Rc::new(RefCell::new(None));
    let seen = rejected.clone();
    effect.subscribe(move |event| {
        if *event == TransitionEvent::Progress(0.25) {
            if let Some(effect) = weak.upgrade() {
                *seen.borrow_mut() = Some(effect.start(None, gradient(), &restart_surface));
                effect.stop();
            }
        }
    });

    assert!(effect.start(Some(solid([0, 0, 0, 255])), gradient(), &surface));
    animator.advance(Duration::from_millis(125));
    animator.advance(Duration::from_millis(125));

    assert_eq!(*rejected.borrow(), Some(false));
    assert_eq!(effect.state(), TransitionState::Cancelled);
    assert_eq!(animator.active(), 0);
    let events = events.borrow();
    assert_eq!(events.last(), Some(&TransitionEvent::Finished));
    assert_eq!(
        events
            .iter()
            .filter(|e| **e == TransitionEvent::Finished)
            .count(),
        1
    );
}

#[test]
fn stop_jumps_to_the_end_state() {
    let (animator, mut factory) = factory(settings(EffectKind::Wipe));
    let effect = factory.create_transition().unwrap();
    let events = record(&effect);
    let surface = Surface::new(W, H);
    let new = gradient();

    assert!(effect.start(Some(solid([0, 0, 0, 255])), new.clone(), &surface));
    animator.advance(Duration::from_millis(100));
    effect.stop();

    assert_eq!(effect.state(), TransitionState::Cancelled);
    assert_eq!(effect.progress(), 1.0);
    assert_eq!(animator.active(), 0);
    assert_eq!(surface.snapshot(), *new);
    let seen = events.borrow().len();
    assert_eq!(
        events.borrow()[seen - 2..],
        [TransitionEvent::Progress(1.0), TransitionEvent::Finished]
    );

    // stopping again changes nothing
    effect.stop();
    assert_eq!(events.borrow().len(), seen);
    assert_eq!(effect.state(), TransitionState::Cancelled);
}

#[test]
fn cleanup_is_idempotent_and_releases_resources() {
    let tracker = Rc::new(ResourceTracker::new());
    let (animator, factory) = factory(settings(EffectKind::Diffuse));
    let mut factory = factory.with_resources(tracker.clone());
    let effect = factory.create_transition().unwrap();
    let surface = Surface::new(W, H);

    assert!(effect.start(Some(solid([0, 0, 0, 255])), gradient(), &surface));
    assert_eq!(tracker.live(), 1);
    animator.run_until_idle(1_000);

    effect.cleanup();
    effect.cleanup();
    assert_eq!(effect.state(), TransitionState::Finished);
    assert_eq!(effect.backend_kind(), None);
    assert_eq!(tracker.live(), 0);
    assert_eq!(tracker.release_all(), 0);
}

#[test]
fn cleanup_mid_run_cancels_the_animation() {
    let (animator, mut factory) = factory(settings(EffectKind::Slide));
    let effect = factory.create_transition().unwrap();
    let events = record(&effect);
    let surface = Surface::new(W, H);

    assert!(effect.start(Some(solid([0, 0, 0, 255])), gradient(), &surface));
    animator.advance(Duration::from_millis(50));
    effect.cleanup();

    assert_eq!(effect.state(), TransitionState::Idle);
    assert_eq!(animator.active(), 0);
    assert!(!events.borrow().contains(&TransitionEvent::Finished));
}

#[test]
fn duration_is_locked_while_running() {
    let (animator, mut factory) = factory(settings(EffectKind::Crossfade));
    let effect = factory.create_transition().unwrap();
    let surface = Surface::new(W, H);

    assert!(effect.start(Some(solid([0, 0, 0, 255])), gradient(), &surface));
    effect.set_duration(Duration::from_secs(5));
    assert_eq!(effect.duration(), Duration::from_millis(500));
    animator.run_until_idle(1_000);
    effect.set_duration(Duration::from_secs(1));
    assert_eq!(effect.duration(), Duration::from_secs(1));
}

#[test]
fn two_phase_effects_expect_longer_runs() {
    let (_animator, mut factory) = factory(settings(EffectKind::BlockFlip));
    let effect = factory.create_transition().unwrap();
    assert!(effect.expected_duration() > effect.duration());

    let (_animator, mut factory) = self::factory(settings(EffectKind::Crossfade));
    let effect = factory.create_transition().unwrap();
    assert_eq!(effect.expected_duration(), effect.duration());
}

#[test]
fn every_effect_ends_on_the_new_image() {
    for kind in EffectKind::ALL {
        let (animator, mut factory) = factory(settings(*kind));
        let effect = factory.create_transition().unwrap();
        let surface = Surface::new(W, H);
        let new = gradient();

        assert!(effect.start(Some(solid([255, 0, 0, 255])), new.clone(), &surface));
        assert_eq!(effect.backend_kind(), Some(BackendKind::Software), "{kind}");
        animator.run_until_idle(1_000);

        assert_eq!(effect.state(), TransitionState::Finished, "{kind}");
        assert!(surface.snapshot() == *new, "{kind} left residue");
    }
}

#[test]
fn images_are_fitted_to_the_target() {
    let (animator, mut factory) = factory(settings(EffectKind::Wipe));
    let effect = factory.create_transition().unwrap();
    let surface = Surface::new(W, H);
    let small_new: SharedImage = Arc::new(RgbaImage::from_pixel(16, 12, Rgba([0, 90, 0, 255])));

    assert!(effect.start(Some(solid([9, 9, 9, 255])), small_new, &surface));
    animator.run_until_idle(1_000);
    let shot = surface.snapshot();
    assert_eq!(shot.dimensions(), (W, H));
    assert!(shot.pixels().all(|p| p.0[1].abs_diff(90) <= 1));
}

#[test]
fn host_replaces_an_in_flight_run() {
    let (animator, factory) = factory(settings(EffectKind::Crossfade));
    let surface = Surface::new(W, H);
    let mut host = TransitionHost::new(factory, surface.clone());

    assert!(host.show(solid([1, 1, 1, 255])));
    assert!(host.show(solid([2, 2, 2, 255])));
    let first = host.current().unwrap().clone();
    animator.advance(Duration::from_millis(100));

    let last = gradient();
    assert!(host.show(last.clone()));
    assert_eq!(first.state(), TransitionState::Cancelled);
    animator.run_until_idle(1_000);
    assert_eq!(host.current().unwrap().state(), TransitionState::Finished);
    assert_eq!(surface.snapshot(), *last);
}

#[test]
fn host_paints_when_the_effect_cannot_start() {
    let (_animator, factory) = factory(settings(EffectKind::Crossfade));
    let surface = Surface::new(W, H);
    let mut host = TransitionHost::new(factory, surface.clone());

    assert!(host.show(solid([4, 4, 4, 255])));
    assert!(!host.show(Arc::new(RgbaImage::new(0, 0))));
    // the listener falls back to painting, which an empty image cannot change
    assert_eq!(surface.snapshot(), *solid([4, 4, 4, 255]));
}

#[derive(Default)]
struct Recording {
    calls: Vec<String>,
    capability: Option<Capability>,
    size: Option<Size>,
}

impl CompositorSurface for Recording {
    fn capability(&self) -> Capability {
        self.capability.clone().unwrap_or(Capability::Available)
    }

    fn size(&self) -> Size {
        self.size.unwrap_or(Size::new(W, H))
    }

    fn warm_textures(&mut self, images: &[&RgbaImage]) {
        self.calls.push(format!("warm:{}", images.len()));
    }

    fn load_images(&mut self, old: &RgbaImage, new: &RgbaImage) -> Result<()> {
        assert_eq!(old.dimensions(), new.dimensions());
        self.calls.push("load".into());
        Ok(())
    }

    fn start_crossfade(&mut self) -> Result<()> {
        self.calls.push("start:crossfade".into());
        Ok(())
    }

    fn start_slide(&mut self) -> Result<()> {
        self.calls.push("start:slide".into());
        Ok(())
    }

    fn start_reveal(&mut self) -> Result<()> {
        self.calls.push("start:reveal".into());
        Ok(())
    }

    fn start_shader(&mut self, effect: &ShaderEffect) -> Result<()> {
        self.calls.push(format!("start:{}", effect.name()));
        Ok(())
    }

    fn set_crossfade(&mut self, _mix: f32) -> Result<()> {
        self.calls.push("crossfade".into());
        Ok(())
    }

    fn set_slide_offsets(&mut self, _old: [f32; 2], _new: [f32; 2]) -> Result<()> {
        self.calls.push("slide".into());
        Ok(())
    }

    fn set_reveal_region(&mut self, _region: &RevealRegion) -> Result<()> {
        self.calls.push("reveal".into());
        Ok(())
    }

    fn set_shader_progress(&mut self, _progress: f32) -> Result<()> {
        self.calls.push("shader".into());
        Ok(())
    }

    fn show_image(&mut self, _image: &RgbaImage) -> Result<()> {
        self.calls.push("show".into());
        Ok(())
    }

    fn release(&mut self) {
        self.calls.push("release".into());
    }
}

fn accelerated(kind: EffectKind, surface: Recording) -> (Rc<FrameAnimator>, TransitionFactory, Rc<RefCell<Recording>>) {
    let recording = Rc::new(RefCell::new(surface));
    let shared: SharedCompositor = recording.clone();
    let (animator, factory) = factory(TransitionSettings {
        hardware_acceleration: true,
        ..settings(kind)
    });
    (animator, factory.with_compositor(shared), recording)
}

#[test]
fn shader_effects_drive_the_compositor() {
    let (animator, mut factory, recording) = accelerated(EffectKind::Burn, Recording::default());
    let effect = factory.create_transition().unwrap();
    assert_eq!(effect.kind(), EffectKind::Burn);
    let surface = Surface::new(W, H);

    assert!(effect.start(Some(solid([0, 0, 0, 255])), gradient(), &surface));
    assert_eq!(effect.backend_kind(), Some(BackendKind::Compositor));
    animator.run_until_idle(1_000);
    effect.cleanup();

    let calls = recording.borrow().calls.clone();
    assert_eq!(calls[..3], ["warm:2", "load", "start:burn"]);
    assert!(calls.iter().filter(|c| *c == "shader").count() >= 2);
    assert_eq!(calls[calls.len() - 2..], ["show", "release"]);
}

#[test]
fn reveal_effects_push_regions() {
    let (animator, mut factory, recording) = accelerated(EffectKind::Diffuse, Recording::default());
    let effect = factory.create_transition().unwrap();
    let surface = Surface::new(W, H);

    assert!(effect.start(Some(solid([0, 0, 0, 255])), gradient(), &surface));
    animator.run_until_idle(1_000);

    let calls = recording.borrow().calls.clone();
    assert_eq!(calls[..2], ["load", "start:reveal"]);
    assert!(calls.contains(&"reveal".to_string()));
    assert!(calls.contains(&"show".to_string()));
}

#[test]
fn unavailable_compositor_falls_back_to_software() {
    let surface_state = Recording {
        capability: Some(Capability::Unavailable("no gpu".into())),
        ..Recording::default()
    };
    let (animator, mut factory, recording) = accelerated(EffectKind::Particle, surface_state);
    assert!(!factory.capability().is_available());
    let effect = factory.create_transition().unwrap();
    assert_eq!(effect.kind(), EffectKind::Crossfade);

    let surface = Surface::new(W, H);
    let new = gradient();
    assert!(effect.start(Some(solid([0, 0, 0, 255])), new.clone(), &surface));
    assert_eq!(effect.backend_kind(), Some(BackendKind::Software));
    animator.run_until_idle(1_000);
    assert_eq!(surface.snapshot(), *new);
    assert!(recording.borrow().calls.is_empty());
}

#[test]
fn mismatched_compositor_retries_on_software() {
    let surface_state = Recording {
        size: Some(Size::new(W * 2, H * 2)),
        ..Recording::default()
    };
    let (animator, mut factory, _recording) = accelerated(EffectKind::Wipe, surface_state);
    let effect = factory.create_transition().unwrap();
    let surface = Surface::new(W, H);

    assert!(effect.start(Some(solid([0, 0, 0, 255])), gradient(), &surface));
    assert_eq!(effect.backend_kind(), Some(BackendKind::Software));
    animator.run_until_idle(1_000);
    assert_eq!(effect.state(), TransitionState::Finished);
}

#[test]
fn shader_effect_without_usable_compositor_shows_the_image() {
    let surface_state = Recording {
        size: Some(Size::new(W * 2, H * 2)),
        ..Recording::default()
    };
    let (animator, mut factory, recording) = accelerated(EffectKind::Crumble, surface_state);
    let effect = factory.create_transition().unwrap();
    let events = record(&effect);
    let surface = Surface::new(W, H);
    let new = gradient();

    assert!(effect.start(Some(solid([0, 0, 0, 255])), new.clone(), &surface));
    assert_eq!(effect.state(), TransitionState::Finished);
    assert_eq!(animator.active(), 0);
    assert_eq!(surface.snapshot(), *new);
    assert_eq!(
        *events.borrow(),
        vec![TransitionEvent::Progress(1.0), TransitionEvent::Finished]
    );
    assert_eq!(recording.borrow().calls, ["show"]);
}

fn run_frames(animator: &FrameAnimator, effect: &TransitionEffect) -> Vec<RgbaImage> {
    let surface = Surface::new(W, H);
    assert!(effect.start(Some(solid([0, 0, 0, 255])), gradient(), &surface));
    let mut frames = vec![surface.snapshot()];
    for _ in 0..1_000 {
        if animator.active() == 0 {
            break;
        }
        animator.advance(Duration::from_millis(40));
        frames.push(surface.snapshot());
    }
    assert_eq!(effect.state(), TransitionState::Finished);
    frames
}

#[test]
fn precomputed_layouts_render_like_local_ones() {
    let (local_animator, mut local) = factory(settings(EffectKind::BlockFlip));
    let (worker_animator, worker_factory) = factory(settings(EffectKind::BlockFlip));
    let worker: Rc<dyn PrecomputeWorker> = Rc::new(LayoutWorker::spawn().unwrap());
    let mut precomputed = worker_factory.with_precompute(worker);

    // later runs reuse the worker's cache
    for run in 0..3 {
        let expected = run_frames(&local_animator, &local.create_transition().unwrap());
        let actual = run_frames(&worker_animator, &precomputed.create_transition().unwrap());
        assert!(expected.len() > 2);
        assert!(expected == actual, "run {run} diverged");
    }
}

/// Worker that takes every request and never answers.
#[derive(Default)]
struct SilentWorker {
    submitted: Cell<u64>,
}

impl PrecomputeWorker for SilentWorker {
    fn submit(&self, _request: PrecomputeRequest) -> Option<u64> {
        self.submitted.set(self.submitted.get() + 1);
        Some(self.submitted.get())
    }

    fn poll_responses(&self, _kind: WorkerKind, _max: usize) -> Vec<PrecomputeResponse> {
        Vec::new()
    }
}

#[test]
fn silent_worker_falls_back_to_local_layouts() {
    let (local_animator, mut local) = factory(settings(EffectKind::BlockFlip));
    let (animator, silent_factory) = factory(settings(EffectKind::BlockFlip));
    let worker = Rc::new(SilentWorker::default());
    let mut silent = silent_factory.with_precompute(worker.clone());

    let started = Instant::now();
    let frames = run_frames(&animator, &silent.create_transition().unwrap());
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(worker.submitted.get() >= 1);
    assert!(frames == run_frames(&local_animator, &local.create_transition().unwrap()));
    assert!(*frames.last().unwrap() == *gradient());
}

#[test]
fn huge_element_counts_still_run() {
    for (kind, key) in [
        (EffectKind::BlockFlip, "columns"),
        (EffectKind::Diffuse, "columns"),
        (EffectKind::Shuffle, "columns"),
        (EffectKind::Blinds, "slats"),
        (EffectKind::Raindrops, "drop-count"),
        (EffectKind::ClawMarks, "claw-count"),
    ] {
        let mut settings = settings(kind);
        settings.options.set(kind, key, "4294967295");
        let (animator, mut factory) = factory(settings);
        let effect = factory.create_transition().unwrap();
        let surface = Surface::new(W, H);
        let new = gradient();

        assert!(effect.start(Some(solid([0, 0, 0, 255])), new.clone(), &surface), "{kind}");
        animator.run_until_idle(1_000);
        assert_eq!(effect.state(), TransitionState::Finished, "{kind}");
        assert!(surface.snapshot() == *new, "{kind}");
    }
}
