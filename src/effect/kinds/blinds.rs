use std::time::Duration;

use crate::backend::{EffectFamily, FramePlan};
use crate::config::{EffectKind, ParamBag};
use crate::effect::element::ElementSet;
use crate::effect::{EffectKernel, PrepareContext, Timeline};
use crate::error::Result;
use crate::geometry::grid::{MAX_REQUESTED, StripAxis};
use crate::geometry::shapes::blinds_slat;
use crate::geometry::stagger::{Edge, Jitter};
use crate::geometry::{Rect, RevealShape};
use crate::precompute::LayoutShape;

use super::reveal_elements;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlindsParams {
    pub slats: u32,
    pub element_duration: Duration,
}

impl Default for BlindsParams {
    fn default() -> Self {
        Self {
            slats: 6,
            element_duration: Duration::from_millis(400),
        }
    }
}

impl BlindsParams {
    pub fn from_bag(bag: &ParamBag<'_>) -> Self {
        let d = Self::default();
        Self {
            slats: bag.count("slats", d.slats, 1..=MAX_REQUESTED),
            element_duration: bag.millis("element-duration-ms", d.element_duration),
        }
    }
}

/// Slats open from their centre lines in a wave from one edge.
///
/// A left/right wave uses vertical slats, a top/bottom wave horizontal ones.
pub struct Blinds {
    params: BlindsParams,
    edge: Edge,
    slats: ElementSet<Rect>,
}

impl Blinds {
    pub fn new(params: BlindsParams, edge: Edge) -> Self {
        Self {
            params,
            edge,
            slats: ElementSet::empty(),
        }
    }

    fn vertical(&self) -> bool {
        self.edge.is_horizontal()
    }
}

impl EffectKernel for Blinds {
    fn kind(&self) -> EffectKind {
        EffectKind::Blinds
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
        let axis = if self.vertical() {
            StripAxis::Columns
        } else {
            StripAxis::Rows
        };
        let layout = ctx.layout(
            EffectKind::Blinds,
            LayoutShape::Strips {
                count: self.params.slats,
                axis,
            },
            Some(self.edge),
            Jitter::Span,
        );
        self.slats = ElementSet::new(
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
        let vertical = self.vertical();
        reveal_elements(&mut self.slats, progress, |slat, p| {
            vec![RevealShape::rect(blinds_slat(*slat, vertical, p))]
        })
    }

    fn release(&mut self) {
        self.slats.clear();
    }
}
