use crate::backend::{EffectFamily, FramePlan};
use crate::config::{EffectKind, ParamBag};
use crate::easing::Easing;
use crate::effect::{EffectKernel, PrepareContext};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossfadeParams {
    pub easing: Easing,
}

impl Default for CrossfadeParams {
    fn default() -> Self {
        Self {
            easing: Easing::InOutQuad,
        }
    }
}

impl CrossfadeParams {
    pub fn from_bag(bag: &ParamBag<'_>) -> Self {
        let d = Self::default();
        Self {
            easing: bag.easing("easing", d.easing),
        }
    }
}

/// Opacity blend from the old image to the new one.
pub struct Crossfade {
    params: CrossfadeParams,
}

impl Crossfade {
    pub fn new(params: CrossfadeParams) -> Self {
        Self { params }
    }
}

impl EffectKernel for Crossfade {
    fn kind(&self) -> EffectKind {
        EffectKind::Crossfade
    }

    fn family(&self) -> EffectFamily {
        EffectFamily::Crossfade
    }

    fn easing(&self) -> Easing {
        self.params.easing
    }

    fn prepare(&mut self, _ctx: &mut PrepareContext<'_>) -> Result<()> {
        Ok(())
    }

    fn frame(&mut self, progress: f32) -> FramePlan {
        FramePlan::Blend {
            mix: progress.clamp(0.0, 1.0),
        }
    }
}
