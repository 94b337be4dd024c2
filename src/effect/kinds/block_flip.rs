use std::time::Duration;

use crate::backend::{EffectFamily, FramePlan};
use crate::config::{EffectKind, ParamBag};
use crate::effect::element::ElementSet;
use crate::effect::{EffectKernel, PrepareContext, Timeline};
use crate::error::Result;
use crate::geometry::grid::MAX_REQUESTED;
use crate::geometry::shapes::{block_flip_rect, block_flip_wedge};
use crate::geometry::stagger::{Edge, Jitter};
use crate::geometry::{Rect, RevealShape};
use crate::precompute::LayoutShape;

use super::reveal_elements;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockFlipParams {
    pub columns: u32,
    pub element_duration: Duration,
    pub wedge: bool,
}

impl Default for BlockFlipParams {
    fn default() -> Self {
        Self {
            columns: 4,
            element_duration: Duration::from_millis(500),
            wedge: false,
        }
    }
}

impl BlockFlipParams {
    pub fn from_bag(bag: &ParamBag<'_>) -> Self {
        let d = Self::default();
        Self {
            columns: bag.count("columns", d.columns, 1..=MAX_REQUESTED),
            element_duration: bag.millis("element-duration-ms", d.element_duration),
            wedge: bag.bool("wedge", d.wedge),
        }
    }
}

/// Blocks flip over to the new image, optionally as a wave from one edge.
pub struct BlockFlip {
    params: BlockFlipParams,
    bias: Option<Edge>,
    blocks: ElementSet<Rect>,
}

impl BlockFlip {
    pub fn new(params: BlockFlipParams, bias: Option<Edge>) -> Self {
        Self {
            params,
            bias,
            blocks: ElementSet::empty(),
        }
    }
}

impl EffectKernel for BlockFlip {
    fn kind(&self) -> EffectKind {
        EffectKind::BlockFlip
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
        let layout = ctx.layout(
            EffectKind::BlockFlip,
            LayoutShape::Grid {
                columns: self.params.columns,
            },
            self.bias,
            Jitter::Grid,
        );
        self.blocks = ElementSet::new(
            layout
                .cells
                .iter()
                .copied()
                .zip(layout.thresholds.iter().copied()),
            ctx.duration,
            self.params.element_duration,
        );
        Ok(())
    }

    fn frame(&mut self, progress: f32) -> FramePlan {
        let wedge = self.params.wedge.then(|| self.bias.unwrap_or(Edge::Left));
        reveal_elements(&mut self.blocks, progress, |cell, p| match wedge {
            Some(entry) => vec![RevealShape::polygon(block_flip_wedge(*cell, entry, p))],
            None => vec![RevealShape::rect(block_flip_rect(*cell, p))],
        })
    }

    fn release(&mut self) {
        self.blocks.clear();
    }
}
