//! Transition effects that morph one full-frame image into another.
//!
//! Effects are built by [`TransitionFactory`] from [`TransitionSettings`],
//! advanced by an [`AnimationManager`] and drawn either by the CPU raster
//! backend or through a shared GPU compositor.

pub mod animation;
pub mod backend;
pub mod config;
pub mod easing;
pub mod effect;
pub mod error;
pub mod factory;
pub mod geometry;
pub mod host;
pub mod precompute;
pub mod resources;

pub use animation::{AnimationManager, FrameAnimator};
pub use backend::{SharedImage, Surface};
pub use config::{EffectKind, TransitionSettings};
pub use effect::{TransitionEffect, TransitionEvent, TransitionState};
pub use error::{Result, TransitionError};
pub use factory::TransitionFactory;
pub use host::TransitionHost;
