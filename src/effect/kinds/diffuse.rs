use std::time::Duration;

use crate::backend::{EffectFamily, FramePlan};
use crate::config::{EffectKind, ParamBag};
use crate::effect::element::ElementSet;
use crate::effect::{EffectKernel, PrepareContext, Timeline};
use crate::error::Result;
use crate::geometry::Rect;
use crate::geometry::grid::MAX_REQUESTED;
use crate::geometry::shapes::{DiffuseShape, diffuse_shape};
use crate::geometry::stagger::Jitter;
use crate::precompute::LayoutShape;

use super::reveal_elements;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffuseParams {
    pub columns: u32,
    pub shape: DiffuseShape,
    pub element_duration: Duration,
}

impl Default for DiffuseParams {
    fn default() -> Self {
        Self {
            columns: 8,
            shape: DiffuseShape::Rectangle,
            element_duration: Duration::from_millis(350),
        }
    }
}

impl DiffuseParams {
    pub fn from_bag(bag: &ParamBag<'_>) -> Self {
        let d = Self::default();
        Self {
            columns: bag.count("columns", d.columns, 1..=MAX_REQUESTED),
            shape: bag.choice("shape", d.shape, DiffuseShape::parse),
            element_duration: bag.millis("element-duration-ms", d.element_duration),
        }
    }
}

/// Cells dissolve in random order, each growing a shape from its centre.
pub struct Diffuse {
    params: DiffuseParams,
    cells: ElementSet<Rect>,
}

impl Diffuse {
    pub fn new(params: DiffuseParams) -> Self {
        Self {
            params,
            cells: ElementSet::empty(),
        }
    }
}

impl EffectKernel for Diffuse {
    fn kind(&self) -> EffectKind {
        EffectKind::Diffuse
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
            EffectKind::Diffuse,
            LayoutShape::Grid {
                columns: self.params.columns,
            },
            None,
            Jitter::Grid,
        );
        self.cells = ElementSet::new(
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
        let shape = self.params.shape;
        reveal_elements(&mut self.cells, progress, |cell, p| {
            diffuse_shape(*cell, shape, p)
        })
    }

    fn release(&mut self) {
        self.cells.clear();
    }
}
