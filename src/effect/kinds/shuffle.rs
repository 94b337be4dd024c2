use std::time::Duration;

use crate::backend::{EffectFamily, FramePlan};
use crate::config::{EffectKind, ParamBag};
use crate::effect::element::ElementSet;
use crate::effect::{EffectKernel, PrepareContext, Timeline};
use crate::error::Result;
use crate::geometry::grid::MAX_REQUESTED;
use crate::geometry::shapes::shuffle_block;
use crate::geometry::stagger::{Edge, Jitter};
use crate::geometry::{Rect, RevealShape};
use crate::precompute::LayoutShape;

use super::reveal_elements;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShuffleParams {
    pub columns: u32,
    pub element_duration: Duration,
}

impl Default for ShuffleParams {
    fn default() -> Self {
        Self {
            columns: 4,
            element_duration: Duration::from_millis(450),
        }
    }
}

impl ShuffleParams {
    pub fn from_bag(bag: &ParamBag<'_>) -> Self {
        let d = Self::default();
        Self {
            columns: bag.count("columns", d.columns, 1..=MAX_REQUESTED),
            element_duration: bag.millis("element-duration-ms", d.element_duration),
        }
    }
}

/// Blocks of the new image slide in from one edge onto their cells.
pub struct Shuffle {
    params: ShuffleParams,
    edge: Edge,
    blocks: ElementSet<Rect>,
}

impl Shuffle {
    pub fn new(params: ShuffleParams, edge: Edge) -> Self {
        Self {
            params,
            edge,
            blocks: ElementSet::empty(),
        }
    }
}

impl EffectKernel for Shuffle {
    fn kind(&self) -> EffectKind {
        EffectKind::Shuffle
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
            EffectKind::Shuffle,
            LayoutShape::Grid {
                columns: self.params.columns,
            },
            Some(self.edge),
            Jitter::Span,
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
        let edge = self.edge;
        reveal_elements(&mut self.blocks, progress, |cell, p| {
            vec![RevealShape::rect(shuffle_block(*cell, edge, p))]
        })
    }

    fn release(&mut self) {
        self.blocks.clear();
    }
}
