use crate::backend::{EffectFamily, FramePlan};
use crate::config::{EffectKind, ParamBag};
use crate::easing::Easing;
use crate::effect::{EffectKernel, PrepareContext};
use crate::error::Result;
use crate::geometry::Size;
use crate::geometry::sweep::{SlideDirection, slide_offsets};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlideParams {
    pub easing: Easing,
}

impl Default for SlideParams {
    fn default() -> Self {
        Self {
            easing: Easing::OutCubic,
        }
    }
}

impl SlideParams {
    pub fn from_bag(bag: &ParamBag<'_>) -> Self {
        let d = Self::default();
        Self {
            easing: bag.easing("easing", d.easing),
        }
    }
}

/// Old image leaves, new image enters, both travelling the same way.
pub struct Slide {
    params: SlideParams,
    direction: SlideDirection,
    size: Size,
}

impl Slide {
    pub fn new(params: SlideParams, direction: SlideDirection) -> Self {
        Self {
            params,
            direction,
            size: Size::default(),
        }
    }
}

impl EffectKernel for Slide {
    fn kind(&self) -> EffectKind {
        EffectKind::Slide
    }

    fn family(&self) -> EffectFamily {
        EffectFamily::Slide
    }

    fn easing(&self) -> Easing {
        self.params.easing
    }

    fn prepare(&mut self, ctx: &mut PrepareContext<'_>) -> Result<()> {
        self.size = ctx.size;
        Ok(())
    }

    fn frame(&mut self, progress: f32) -> FramePlan {
        let (old_offset, new_offset) = slide_offsets(self.size, self.direction, progress);
        FramePlan::Slide {
            old_offset,
            new_offset,
        }
    }
}
