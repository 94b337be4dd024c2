//! Resolves settings into one ready-to-start [`TransitionEffect`].

use std::rc::Rc;

use rand::rngs::StdRng;
use rand::seq::IteratorRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, info, warn};

use crate::animation::AnimationManager;
use crate::backend::Capability;
use crate::backend::compositor::SharedCompositor;
use crate::config::{EffectKind, EffectRequest, RANDOM, RandomMemory, TransitionSettings};
use crate::effect::kinds::{self, DirectionChoice};
use crate::effect::{BackendChoice, EffectContext, TransitionEffect};
use crate::error::{Result, TransitionError};
use crate::precompute::PrecomputeWorker;
use crate::resources::ResourceRegistry;

/// The only construction path for effects.
///
/// Owns the settings, including the random-choice memory that it alone
/// updates.
pub struct TransitionFactory {
    settings: TransitionSettings,
    rng: StdRng,
    animator: Rc<dyn AnimationManager>,
    compositor: Option<SharedCompositor>,
    resources: Option<Rc<dyn ResourceRegistry>>,
    precompute: Option<Rc<dyn PrecomputeWorker>>,
}

impl TransitionFactory {
    pub fn new(settings: TransitionSettings, animator: Rc<dyn AnimationManager>) -> Self {
        Self::with_rng(settings, animator, StdRng::from_os_rng())
    }

    /// Deterministic factory; every choice it makes follows from `seed`.
    pub fn with_seed(
        settings: TransitionSettings,
        animator: Rc<dyn AnimationManager>,
        seed: u64,
    ) -> Self {
        Self::with_rng(settings, animator, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        settings: TransitionSettings,
        animator: Rc<dyn AnimationManager>,
        rng: StdRng,
    ) -> Self {
        Self {
            settings,
            rng,
            animator,
            compositor: None,
            resources: None,
            precompute: None,
        }
    }

    pub fn with_compositor(mut self, compositor: SharedCompositor) -> Self {
        self.compositor = Some(compositor);
        self
    }

    pub fn with_resources(mut self, resources: Rc<dyn ResourceRegistry>) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn with_precompute(mut self, precompute: Rc<dyn PrecomputeWorker>) -> Self {
        self.precompute = Some(precompute);
        self
    }

    pub fn settings(&self) -> &TransitionSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut TransitionSettings {
        &mut self.settings
    }

    pub fn memory(&self) -> &RandomMemory {
        &self.settings.memory
    }

    /// Compositor state as seen by the next resolution.
    pub fn capability(&self) -> Capability {
        if !self.settings.hardware_acceleration {
            return Capability::Unavailable("hardware acceleration is disabled".into());
        }
        let Some(compositor) = &self.compositor else {
            return Capability::Unavailable("no compositor surface".into());
        };
        match compositor.try_borrow() {
            Ok(surface) => surface.capability(),
            Err(_) => Capability::Unavailable("compositor surface is busy".into()),
        }
    }

    /// Builds the next effect, or `None` when resolution failed. The caller is
    /// expected to show the new image directly in that case.
    pub fn create_transition(&mut self) -> Option<TransitionEffect> {
        match self.try_create() {
            Ok(effect) => Some(effect),
            Err(err) => {
                error!(error = %err, "transition_create_failed");
                None
            }
        }
    }

    pub fn try_create(&mut self) -> Result<TransitionEffect> {
        let capability = self.capability();
        let accelerated = capability.is_available();
        if let Capability::Unavailable(reason) = &capability {
            debug!(%reason, "transition_software_only");
        }

        let kind = self.resolve_kind(accelerated)?;
        let direction = self.resolve_direction(kind);
        let bag = self.settings.params(kind);
        let kernel = kinds::build(kind, &bag, direction);

        let backend = match (&self.compositor, accelerated) {
            (Some(compositor), true) => BackendChoice::Compositor(Rc::clone(compositor)),
            _ => BackendChoice::Software,
        };
        let ctx = EffectContext {
            animator: Rc::clone(&self.animator),
            backend,
            resources: self.resources.clone(),
            precompute: self.precompute.clone(),
            target_fps: self.settings.target_fps,
            software_fps_cap: self.settings.software_fps_cap,
            seed: self.rng.random(),
        };
        info!(
            effect = %kind,
            direction = direction.as_str(),
            accelerated,
            duration_ms = self.settings.duration.as_millis() as u64,
            "transition_resolved"
        );
        Ok(TransitionEffect::new(kernel, ctx, self.settings.duration))
    }

    fn resolve_kind(&mut self, accelerated: bool) -> Result<EffectKind> {
        let requested = if self.settings.random_always {
            EffectRequest::Random
        } else {
            self.settings.effect.clone()
        };
        let kind = match requested {
            EffectRequest::Named(kind) => kind,
            EffectRequest::Retired(name) => {
                info!(effect = %name, "transition_retired_effect");
                EffectKind::Crossfade
            }
            EffectRequest::Random => {
                let kind = self.pick_random_kind(accelerated)?;
                self.settings.memory.last_effect = Some(kind);
                kind
            }
        };
        if kind.is_gpu_only() && !accelerated {
            let fallback = self.settings.software_fallback(kind);
            warn!(effect = %kind, fallback = %fallback, "transition_software_fallback");
            return Ok(fallback);
        }
        Ok(kind)
    }

    fn pick_random_kind(&mut self, accelerated: bool) -> Result<EffectKind> {
        let mut pool: Vec<EffectKind> = self
            .settings
            .enabled
            .iter()
            .copied()
            .filter(|k| accelerated || !k.is_gpu_only())
            .collect();
        if pool.is_empty() {
            pool.push(EffectKind::Crossfade);
        }
        if pool.len() > 1 {
            if let Some(last) = self.settings.memory.last_effect {
                pool.retain(|k| *k != last);
            }
        }
        pool.iter()
            .copied()
            .choose(&mut self.rng)
            .ok_or_else(|| TransitionError::Config("no effect to choose from".into()))
    }

    fn resolve_direction(&mut self, kind: EffectKind) -> DirectionChoice {
        let bag = self.settings.params(kind);
        let raw = bag.string("direction").unwrap_or(RANDOM);
        if !raw.trim().eq_ignore_ascii_case(RANDOM) {
            if let Some(choice) = DirectionChoice::parse(kind, raw) {
                return choice;
            }
            debug!(effect = %kind, direction = raw, "transition_direction_random");
        }

        let mut candidates = DirectionChoice::candidates(kind);
        if self.settings.random_always || !kind.has_direction() {
            return candidates
                .into_iter()
                .choose(&mut self.rng)
                .unwrap_or(DirectionChoice::None);
        }
        if candidates.len() > 1 {
            if let Some(last) = self.settings.memory.last_direction(kind) {
                candidates.retain(|c| c.as_str() != last);
            }
        }
        let choice = candidates
            .into_iter()
            .choose(&mut self.rng)
            .unwrap_or(DirectionChoice::None);
        self.settings
            .memory
            .last_directions
            .insert(kind, choice.as_str().to_string());
        choice
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::FrameAnimator;

    fn factory(settings: TransitionSettings) -> TransitionFactory {
        TransitionFactory::with_seed(settings, Rc::new(FrameAnimator::new()), 7)
    }

    #[test]
    fn random_pool_skips_gpu_only_without_acceleration() {
        let mut f = factory(TransitionSettings {
            hardware_acceleration: false,
            ..TransitionSettings::default()
        });
        for _ in 0..100 {
            let kind = f.resolve_kind(false).unwrap();
            assert!(!kind.is_gpu_only());
        }
    }

    #[test]
    fn single_candidate_may_repeat() {
        let mut f = factory(TransitionSettings {
            enabled: vec![EffectKind::Wipe],
            ..TransitionSettings::default()
        });
        assert_eq!(f.resolve_kind(false).unwrap(), EffectKind::Wipe);
        assert_eq!(f.resolve_kind(false).unwrap(), EffectKind::Wipe);
    }

    #[test]
    fn explicit_direction_is_not_remembered() {
        let mut settings = TransitionSettings::default();
        settings.options.set(EffectKind::Wipe, "direction", "top-to-bottom");
        let mut f = factory(settings);
        let dir = f.resolve_direction(EffectKind::Wipe);
        assert_eq!(dir.as_str(), "top-to-bottom");
        assert!(f.memory().last_direction(EffectKind::Wipe).is_none());
    }

    #[test]
    fn capability_reflects_the_flag_first() {
        let f = factory(TransitionSettings {
            hardware_acceleration: false,
            ..TransitionSettings::default()
        });
        assert!(!f.capability().is_available());
    }
}
