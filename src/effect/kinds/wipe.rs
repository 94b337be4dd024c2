use crate::backend::{EffectFamily, FramePlan};
use crate::config::{EffectKind, ParamBag};
use crate::easing::Easing;
use crate::effect::{EffectKernel, PrepareContext};
use crate::error::Result;
use crate::geometry::sweep::{WipeDirection, wipe_shape};
use crate::geometry::{RevealRegion, Size};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WipeParams {
    pub easing: Easing,
}

impl Default for WipeParams {
    fn default() -> Self {
        Self {
            easing: Easing::InOutSine,
        }
    }
}

impl WipeParams {
    pub fn from_bag(bag: &ParamBag<'_>) -> Self {
        let d = Self::default();
        Self {
            easing: bag.easing("easing", d.easing),
        }
    }
}

/// A single boundary sweeping across the frame.
pub struct Wipe {
    params: WipeParams,
    direction: WipeDirection,
    size: Size,
}

impl Wipe {
    pub fn new(params: WipeParams, direction: WipeDirection) -> Self {
        Self {
            params,
            direction,
            size: Size::default(),
        }
    }
}

impl EffectKernel for Wipe {
    fn kind(&self) -> EffectKind {
        EffectKind::Wipe
    }

    fn family(&self) -> EffectFamily {
        EffectFamily::Reveal
    }

    fn easing(&self) -> Easing {
        self.params.easing
    }

    fn prepare(&mut self, ctx: &mut PrepareContext<'_>) -> Result<()> {
        self.size = ctx.size;
        Ok(())
    }

    fn frame(&mut self, progress: f32) -> FramePlan {
        let region: RevealRegion = wipe_shape(self.size, self.direction, progress)
            .into_iter()
            .collect();
        FramePlan::Reveal(region)
    }
}
