use std::time::Duration;

use rand::Rng;

use crate::backend::{EffectFamily, FramePlan};
use crate::config::{EffectKind, ParamBag};
use crate::effect::element::ElementSet;
use crate::effect::{EffectKernel, PrepareContext, Timeline};
use crate::error::Result;
use crate::geometry::scatter::{Raindrop, scatter_raindrops};

use super::reveal_elements;

pub const MAX_DROPS: u32 = 2048;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaindropParams {
    pub drop_count: u32,
    pub element_duration: Duration,
}

impl Default for RaindropParams {
    fn default() -> Self {
        Self {
            drop_count: 24,
            element_duration: Duration::from_millis(700),
        }
    }
}

impl RaindropParams {
    pub fn from_bag(bag: &ParamBag<'_>) -> Self {
        let d = Self::default();
        Self {
            drop_count: bag.count("drop-count", d.drop_count, 1..=MAX_DROPS),
            element_duration: bag.millis("element-duration-ms", d.element_duration),
        }
    }
}

/// Drops land at random spots and spread until the frame is covered.
pub struct Raindrops {
    params: RaindropParams,
    drops: ElementSet<Raindrop>,
}

impl Raindrops {
    pub fn new(params: RaindropParams) -> Self {
        Self {
            params,
            drops: ElementSet::empty(),
        }
    }
}

impl EffectKernel for Raindrops {
    fn kind(&self) -> EffectKind {
        EffectKind::Raindrops
    }

    fn family(&self) -> EffectFamily {
        EffectFamily::Reveal
    }

    fn timeline(&self) -> Timeline {
        Timeline::TwoPhase {
            element_duration: self.params.element_duration,
        }
    }

    fn prepare(&mut self, ctx: &mut PrepareContext<'_>) -> Result<()> {
        let drops = scatter_raindrops(ctx.size, self.params.drop_count, &mut *ctx.rng);
        let items: Vec<(Raindrop, f32)> = drops
            .into_iter()
            .map(|drop| (drop, ctx.rng.random::<f32>()))
            .collect();
        self.drops = ElementSet::new(items, ctx.duration, self.params.element_duration);
        Ok(())
    }

    fn frame(&mut self, progress: f32) -> FramePlan {
        reveal_elements(&mut self.drops, progress, |drop, p| {
            drop.shape(p).into_iter().collect()
        })
    }

    fn release(&mut self) {
        self.drops.clear();
    }
}
