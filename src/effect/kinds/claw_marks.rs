use std::time::Duration;

use rand::Rng;

use crate::backend::{EffectFamily, FramePlan};
use crate::config::{EffectKind, ParamBag};
use crate::effect::element::ElementSet;
use crate::effect::{EffectKernel, PrepareContext, Timeline};
use crate::error::Result;
use crate::geometry::scatter::{ClawStroke, claw_paths};

use super::reveal_elements;

pub const MAX_CLAWS: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClawParams {
    pub claw_count: u32,
    pub element_duration: Duration,
}

impl Default for ClawParams {
    fn default() -> Self {
        Self {
            claw_count: 4,
            element_duration: Duration::from_millis(900),
        }
    }
}

impl ClawParams {
    pub fn from_bag(bag: &ParamBag<'_>) -> Self {
        let d = Self::default();
        Self {
            claw_count: bag.count("claw-count", d.claw_count, 1..=MAX_CLAWS),
            element_duration: bag.millis("element-duration-ms", d.element_duration),
        }
    }
}

/// Diagonal strokes rake across the frame and widen until they meet.
pub struct ClawMarks {
    params: ClawParams,
    strokes: ElementSet<ClawStroke>,
}

impl ClawMarks {
    pub fn new(params: ClawParams) -> Self {
        Self {
            params,
            strokes: ElementSet::empty(),
        }
    }
}

impl EffectKernel for ClawMarks {
    fn kind(&self) -> EffectKind {
        EffectKind::ClawMarks
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
        let strokes = claw_paths(ctx.size, self.params.claw_count, &mut *ctx.rng);
        // strokes land in quick succession, one swipe at a time
        let count = strokes.len().max(1) as f32;
        let items: Vec<(ClawStroke, f32)> = strokes
            .into_iter()
            .enumerate()
            .map(|(i, stroke)| {
                let slot = i as f32 / count;
                (stroke, slot + ctx.rng.random_range(0.0..0.5) / count)
            })
            .collect();
        self.strokes = ElementSet::new(items, ctx.duration, self.params.element_duration);
        Ok(())
    }

    fn frame(&mut self, progress: f32) -> FramePlan {
        reveal_elements(&mut self.strokes, progress, |stroke, p| {
            stroke.shape(p).into_iter().collect()
        })
    }

    fn release(&mut self) {
        self.strokes.clear();
    }
}
