//! Concrete effect kernels, one per [`EffectKind`].

mod blinds;
mod block_flip;
mod claw_marks;
mod crossfade;
mod diffuse;
mod raindrops;
mod shader;
mod shuffle;
mod slide;
mod wipe;

pub use blinds::{Blinds, BlindsParams};
pub use block_flip::{BlockFlip, BlockFlipParams};
pub use claw_marks::{ClawMarks, ClawParams};
pub use crossfade::{Crossfade, CrossfadeParams};
pub use diffuse::{Diffuse, DiffuseParams};
pub use raindrops::{RaindropParams, Raindrops};
pub use shader::{ShaderKernel, ShaderParams};
pub use shuffle::{Shuffle, ShuffleParams};
pub use slide::{Slide, SlideParams};
pub use wipe::{Wipe, WipeParams};

use crate::backend::FramePlan;
use crate::config::{EffectKind, ParamBag};
use crate::geometry::stagger::Edge;
use crate::geometry::sweep::{SlideDirection, WipeDirection};
use crate::geometry::{RevealRegion, RevealShape};

use super::EffectKernel;
use super::element::ElementSet;

/// Resolved direction of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionChoice {
    None,
    Slide(SlideDirection),
    Wipe(WipeDirection),
    /// Edge a wave starts from; `None` means unbiased random thresholds.
    Edge(Option<Edge>),
}

impl DirectionChoice {
    /// Concrete directions a random pick chooses between.
    pub fn candidates(kind: EffectKind) -> Vec<Self> {
        match kind {
            EffectKind::Slide => SlideDirection::ALL.iter().map(|d| Self::Slide(*d)).collect(),
            EffectKind::Wipe => WipeDirection::ALL.iter().map(|d| Self::Wipe(*d)).collect(),
            // unbiased random order is one of block-flip's looks
            EffectKind::BlockFlip => Edge::ALL
                .iter()
                .map(|e| Self::Edge(Some(*e)))
                .chain([Self::Edge(None)])
                .collect(),
            k if k.has_direction() => Edge::ALL.iter().map(|e| Self::Edge(Some(*e))).collect(),
            _ => vec![Self::None],
        }
    }

    /// Explicit direction for `kind`. `random` is handled by the factory.
    pub fn parse(kind: EffectKind, raw: &str) -> Option<Self> {
        match kind {
            EffectKind::Slide => SlideDirection::parse(raw).map(Self::Slide),
            EffectKind::Wipe => WipeDirection::parse(raw).map(Self::Wipe),
            EffectKind::BlockFlip if raw.trim().eq_ignore_ascii_case("none") => {
                Some(Self::Edge(None))
            }
            k if k.has_direction() => Edge::parse(raw).map(|e| Self::Edge(Some(e))),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None | Self::Edge(None) => "none",
            Self::Slide(d) => d.as_str(),
            Self::Wipe(d) => d.as_str(),
            Self::Edge(Some(e)) => e.as_str(),
        }
    }

    fn edge(&self) -> Option<Edge> {
        match self {
            Self::Edge(edge) => *edge,
            _ => None,
        }
    }
}

/// Builds the kernel for `kind` from its parameter bag.
pub fn build(kind: EffectKind, bag: &ParamBag<'_>, direction: DirectionChoice) -> Box<dyn EffectKernel> {
    match kind {
        EffectKind::Crossfade => Box::new(Crossfade::new(CrossfadeParams::from_bag(bag))),
        EffectKind::Slide => {
            let dir = match direction {
                DirectionChoice::Slide(d) => d,
                _ => SlideDirection::Left,
            };
            Box::new(Slide::new(SlideParams::from_bag(bag), dir))
        }
        EffectKind::Wipe => {
            let dir = match direction {
                DirectionChoice::Wipe(d) => d,
                _ => WipeDirection::LeftToRight,
            };
            Box::new(Wipe::new(WipeParams::from_bag(bag), dir))
        }
        EffectKind::Diffuse => Box::new(Diffuse::new(DiffuseParams::from_bag(bag))),
        EffectKind::BlockFlip => {
            Box::new(BlockFlip::new(BlockFlipParams::from_bag(bag), direction.edge()))
        }
        EffectKind::Blinds => Box::new(Blinds::new(
            BlindsParams::from_bag(bag),
            direction.edge().unwrap_or(Edge::Left),
        )),
        EffectKind::Shuffle => Box::new(Shuffle::new(
            ShuffleParams::from_bag(bag),
            direction.edge().unwrap_or(Edge::Left),
        )),
        EffectKind::Raindrops => Box::new(Raindrops::new(RaindropParams::from_bag(bag))),
        EffectKind::ClawMarks => Box::new(ClawMarks::new(ClawParams::from_bag(bag))),
        EffectKind::Crumble | EffectKind::Particle | EffectKind::Burn => Box::new(
            ShaderKernel::new(ShaderParams::from_bag(kind, bag, direction.edge())),
        ),
    }
}

/// Advances `elements` to `progress` and unions the shapes of every element
/// that has started revealing.
fn reveal_elements<G>(
    elements: &mut ElementSet<G>,
    progress: f32,
    mut shapes: impl FnMut(&G, f32) -> Vec<RevealShape>,
) -> FramePlan {
    elements.update(progress);
    let region: RevealRegion = elements
        .revealed()
        .flat_map(|el| shapes(&el.geometry, el.progress))
        .collect();
    FramePlan::Reveal(region)
}
