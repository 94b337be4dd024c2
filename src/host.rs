//! Display-side owner of the current transition.

use std::sync::Arc;

use tracing::{info, warn};

use crate::backend::compositor::SharedCompositor;
use crate::backend::{SharedImage, Surface, fit_to, is_valid_image};
use crate::effect::{TransitionEffect, TransitionEvent};
use crate::factory::TransitionFactory;

/// Shows images on a surface, one transition at a time.
///
/// Starting a new image always ends the previous run first. Whenever no
/// transition can run, the new image is painted directly.
pub struct TransitionHost {
    factory: TransitionFactory,
    surface: Surface,
    compositor: Option<SharedCompositor>,
    current: Option<TransitionEffect>,
    shown: Option<SharedImage>,
}

impl TransitionHost {
    pub fn new(factory: TransitionFactory, surface: Surface) -> Self {
        Self {
            factory,
            surface,
            compositor: None,
            current: None,
            shown: None,
        }
    }

    /// Compositor that also receives direct paints.
    pub fn with_compositor(mut self, compositor: SharedCompositor) -> Self {
        self.compositor = Some(compositor);
        self
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn factory(&self) -> &TransitionFactory {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut TransitionFactory {
        &mut self.factory
    }

    pub fn current(&self) -> Option<&TransitionEffect> {
        self.current.as_ref()
    }

    pub fn shown(&self) -> Option<&SharedImage> {
        self.shown.as_ref()
    }

    /// Transitions from the image on screen to `image`. Returns `true` when an
    /// effect started; otherwise `image` was painted directly.
    pub fn show(&mut self, image: SharedImage) -> bool {
        if let Some(previous) = self.current.take() {
            if previous.is_running() {
                info!(effect = %previous.kind(), "transition_interrupted");
                previous.stop();
            }
            previous.cleanup();
        }

        let old = self.shown.replace(Arc::clone(&image));
        let Some(effect) = self.factory.create_transition() else {
            self.paint_directly(&image);
            return false;
        };

        let weak = effect.downgrade();
        let surface = self.surface.clone();
        let compositor = self.compositor.clone();
        let fallback = Arc::clone(&image);
        effect.subscribe(move |event| match event {
            TransitionEvent::Finished => {
                if let Some(effect) = weak.upgrade() {
                    effect.cleanup();
                }
            }
            TransitionEvent::Error(message) => {
                warn!(%message, "transition_host_fallback");
                paint(&surface, compositor.as_ref(), &fallback);
            }
            _ => {}
        });

        let started = effect.start(old, image, &self.surface);
        self.current = Some(effect);
        started
    }

    fn paint_directly(&self, image: &SharedImage) {
        paint(&self.surface, self.compositor.as_ref(), image);
    }
}

fn paint(surface: &Surface, compositor: Option<&SharedCompositor>, image: &SharedImage) {
    surface.paint(image);
    if !is_valid_image(image) {
        return;
    }
    let Some(compositor) = compositor else {
        return;
    };
    let Ok(mut compositor) = compositor.try_borrow_mut() else {
        warn!("compositor_paint_skipped");
        return;
    };
    if !compositor.capability().is_available() || compositor.size().is_empty() {
        return;
    }
    let fitted = fit_to(image, compositor.size());
    if let Err(err) = compositor.show_image(&fitted) {
        warn!(error = %err, "compositor_paint_failed");
    }
}
