//! `transition-preview`: renders one transition between two images to PNG
//! frames.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use image::RgbaImage;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use frame_transitions::backend::BackendKind;
use frame_transitions::backend::compositor::SharedCompositor;
use frame_transitions::backend::gpu::GpuCompositor;
use frame_transitions::config::{EffectRequest, RandomMemory};
use frame_transitions::precompute::{LayoutWorker, PrecomputeWorker};
use frame_transitions::resources::ResourceTracker;
use frame_transitions::{
    FrameAnimator, SharedImage, Surface, TransitionFactory, TransitionHost, TransitionSettings,
};

// hard stop for effects that never complete
const MAX_FRAMES: usize = 10_000;

#[derive(Debug, Parser)]
#[command(name = "transition-preview", about = "Render a transition to PNG frames")]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Image shown before the transition
    #[arg(long, value_name = "FILE")]
    old: PathBuf,

    /// Image the transition reveals
    #[arg(long, value_name = "FILE")]
    new: PathBuf,

    /// Directory receiving frame_NNNN.png
    #[arg(long, value_name = "DIR", default_value = "frames")]
    out: PathBuf,

    /// Effect name, overriding the config
    #[arg(long)]
    effect: Option<String>,

    /// Frames per second to render
    #[arg(long)]
    fps: Option<u32>,

    /// YAML file keeping the last effect and directions between runs
    #[arg(long, value_name = "FILE")]
    memory: Option<PathBuf>,

    /// Seed for every random choice
    #[arg(long)]
    seed: Option<u64>,

    /// Composite on the GPU when an adapter is available
    #[arg(long)]
    gpu: bool,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(
            format!("frame_transitions={level}")
                .parse()
                .context("log directive")?,
        )
        .add_directive(
            format!("transition_preview={level}")
                .parse()
                .context("log directive")?,
        )
        .add_directive("wgpu=warn".parse().context("log directive")?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

fn load_image(path: &Path) -> Result<SharedImage> {
    let img = image::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Ok(Arc::new(img.to_rgba8()))
}

fn settings(cli: &Cli) -> Result<TransitionSettings> {
    let mut settings = match &cli.config {
        Some(path) => TransitionSettings::from_yaml_file(path)?,
        None => TransitionSettings::default(),
    };
    if let Some(name) = &cli.effect {
        settings.effect = name.parse::<EffectRequest>()?;
        settings.random_always = false;
    }
    if let Some(fps) = cli.fps {
        settings.target_fps = fps;
    }
    if let Some(path) = &cli.memory {
        settings.memory = RandomMemory::load(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
    }
    settings.hardware_acceleration = cli.gpu;
    settings.validated()
}

fn save_frame(out: &Path, index: usize, frame: &RgbaImage) -> Result<()> {
    let path = out.join(format!("frame_{index:04}.png"));
    frame
        .save(&path)
        .with_context(|| format!("failed to write {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let settings = settings(&cli)?;
    let old = load_image(&cli.old)?;
    let new = load_image(&cli.new)?;
    std::fs::create_dir_all(&cli.out)
        .with_context(|| format!("failed to create {}", cli.out.display()))?;

    let surface = Surface::new(new.width(), new.height());
    let interval = Duration::from_secs(1) / settings.target_fps;
    let animator = Rc::new(FrameAnimator::new());
    let tracker = Rc::new(ResourceTracker::new());

    let mut factory = match cli.seed {
        Some(seed) => TransitionFactory::with_seed(settings, animator.clone(), seed),
        None => TransitionFactory::new(settings, animator.clone()),
    }
    .with_resources(tracker.clone());
    match LayoutWorker::spawn() {
        Ok(worker) => {
            let worker: Rc<dyn PrecomputeWorker> = Rc::new(worker);
            factory = factory.with_precompute(worker);
        }
        Err(err) => warn!(error = %err, "precompute_worker_unavailable"),
    }

    let gpu = if cli.gpu {
        match GpuCompositor::probe(surface.size()) {
            Ok(gpu) => Some(Rc::new(RefCell::new(gpu))),
            Err(err) => {
                warn!(error = %err, "gpu_unavailable_using_software");
                None
            }
        }
    } else {
        None
    };
    let mut host = match &gpu {
        Some(gpu) => {
            let shared: SharedCompositor = gpu.clone();
            TransitionHost::new(factory.with_compositor(shared.clone()), surface.clone())
                .with_compositor(shared)
        }
        None => TransitionHost::new(factory, surface.clone()),
    };

    host.show(old);
    if !host.show(new) {
        warn!("transition_not_started");
    }
    let from_gpu = host
        .current()
        .and_then(|effect| effect.backend_kind())
        .is_some_and(|kind| kind == BackendKind::Compositor);
    let grab = || -> Result<RgbaImage> {
        match (&gpu, from_gpu) {
            (Some(gpu), true) => gpu.borrow().read_frame(),
            _ => Ok(surface.snapshot()),
        }
    };

    let mut frames = 0;
    save_frame(&cli.out, frames, &grab()?)?;
    while animator.active() > 0 && frames < MAX_FRAMES {
        animator.advance(interval);
        frames += 1;
        save_frame(&cli.out, frames, &grab()?)?;
    }

    if let Some(path) = &cli.memory {
        host.factory()
            .memory()
            .save(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    let released = tracker.release_all();
    info!(
        frames = frames + 1,
        released,
        out = %cli.out.display(),
        "preview_written"
    );
    Ok(())
}
