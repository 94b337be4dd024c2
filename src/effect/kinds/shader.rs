use rand::Rng;

use crate::backend::{EffectFamily, FramePlan, ShaderEffect};
use crate::config::{EffectKind, ParamBag};
use crate::easing::Easing;
use crate::effect::{EffectKernel, PrepareContext};
use crate::error::Result;
use crate::geometry::stagger::Edge;

pub const MAX_PIECES: u32 = 256;

pub const DEFAULT_GLOW: [u8; 3] = [255, 140, 40];

/// Parameters of the compositor-only effects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShaderParams {
    Crumble { pieces: u32, easing: Easing },
    Particle { radius: f32, edge: Edge },
    Burn { edge: Edge, glow: [u8; 3], jaggedness: f32 },
}

impl ShaderParams {
    pub fn from_bag(kind: EffectKind, bag: &ParamBag<'_>, edge: Option<Edge>) -> Self {
        let edge = edge.unwrap_or(Edge::Left);
        match kind {
            EffectKind::Particle => Self::Particle {
                radius: bag.f32("particle-radius", 24.0).max(1.0),
                edge,
            },
            EffectKind::Burn => Self::Burn {
                edge,
                glow: bag.rgb("glow-color", DEFAULT_GLOW),
                jaggedness: bag.f32("jaggedness", 0.5).clamp(0.0, 1.0),
            },
            _ => Self::Crumble {
                pieces: bag.count("pieces", 12, 1..=MAX_PIECES),
                easing: bag.easing("easing", Easing::InQuad),
            },
        }
    }
}

/// Crumble, particle and burn: the compositor's shader does all the work and
/// only the progress changes per frame.
pub struct ShaderKernel {
    params: ShaderParams,
    effect: Option<ShaderEffect>,
}

impl ShaderKernel {
    pub fn new(params: ShaderParams) -> Self {
        Self {
            params,
            effect: None,
        }
    }

    fn effect_with_seed(&self, seed: u32) -> ShaderEffect {
        match self.params {
            ShaderParams::Crumble { pieces, .. } => ShaderEffect::Crumble { pieces, seed },
            ShaderParams::Particle { radius, edge } => ShaderEffect::Particle { radius, edge, seed },
            ShaderParams::Burn {
                edge,
                glow,
                jaggedness,
            } => ShaderEffect::Burn {
                edge,
                glow,
                jaggedness,
                seed,
            },
        }
    }

    fn effect(&self) -> ShaderEffect {
        self.effect.clone().unwrap_or_else(|| self.effect_with_seed(0))
    }
}

impl EffectKernel for ShaderKernel {
    fn kind(&self) -> EffectKind {
        match self.params {
            ShaderParams::Crumble { .. } => EffectKind::Crumble,
            ShaderParams::Particle { .. } => EffectKind::Particle,
            ShaderParams::Burn { .. } => EffectKind::Burn,
        }
    }

    fn family(&self) -> EffectFamily {
        EffectFamily::Shader(self.effect())
    }

    fn easing(&self) -> Easing {
        match self.params {
            ShaderParams::Crumble { easing, .. } => easing,
            _ => Easing::Linear,
        }
    }

    fn supports_software(&self) -> bool {
        false
    }

    fn prepare(&mut self, ctx: &mut PrepareContext<'_>) -> Result<()> {
        let seed = ctx.rng.random::<u32>();
        self.effect = Some(self.effect_with_seed(seed));
        Ok(())
    }

    fn frame(&mut self, progress: f32) -> FramePlan {
        FramePlan::Shader {
            effect: self.effect(),
            progress: progress.clamp(0.0, 1.0),
        }
    }

    fn release(&mut self) {
        self.effect = None;
    }
}
