//! Shared GPU compositing surface and the backend adapter that drives it.
//!
//! One surface serves every effect instance. Effects never draw on it
//! directly; they call entry points named by effect family and push one
//! parameter update per frame.

use std::cell::{Cell, RefCell, RefMut};
use std::rc::{Rc, Weak};

use image::RgbaImage;
use tracing::{debug, warn};

use super::{
    AttachRequest, BackendKind, Capability, EffectFamily, FramePlan, RenderBackend, ShaderEffect,
    SharedImage, fit_to,
};
use crate::error::{Result, TransitionError};
use crate::geometry::{RevealRegion, Size};
use crate::resources::Releasable;

pub trait CompositorSurface {
    fn capability(&self) -> Capability;

    fn size(&self) -> Size;

    /// Best-effort upload ahead of an expensive shader effect.
    fn warm_textures(&mut self, images: &[&RgbaImage]);

    fn load_images(&mut self, old: &RgbaImage, new: &RgbaImage) -> Result<()>;

    fn start_crossfade(&mut self) -> Result<()>;
    fn start_slide(&mut self) -> Result<()>;
    fn start_reveal(&mut self) -> Result<()>;
    fn start_shader(&mut self, effect: &ShaderEffect) -> Result<()>;

    fn set_crossfade(&mut self, mix: f32) -> Result<()>;
    fn set_slide_offsets(&mut self, old: [f32; 2], new: [f32; 2]) -> Result<()>;
    fn set_reveal_region(&mut self, region: &RevealRegion) -> Result<()>;
    fn set_shader_progress(&mut self, progress: f32) -> Result<()>;

    /// Displays `image` alone and ends any running effect.
    fn show_image(&mut self, image: &RgbaImage) -> Result<()>;

    /// Drops the textures of the current run. Safe to call repeatedly.
    fn release(&mut self);
}

pub type SharedCompositor = Rc<RefCell<dyn CompositorSurface>>;

pub struct CompositorBackend {
    surface: SharedCompositor,
    new: Option<SharedImage>,
    // set while this backend owns the surface's textures
    holding: Rc<Cell<bool>>,
}

impl CompositorBackend {
    pub fn new(surface: SharedCompositor) -> Self {
        Self {
            surface,
            new: None,
            holding: Rc::new(Cell::new(false)),
        }
    }

    pub fn lease(&self) -> CompositorLease {
        CompositorLease {
            surface: Rc::downgrade(&self.surface),
            holding: Rc::clone(&self.holding),
        }
    }

    fn surface(&self) -> Result<RefMut<'_, dyn CompositorSurface + 'static>> {
        self.surface
            .try_borrow_mut()
            .map_err(|_| TransitionError::Backend("compositor surface is busy".into()))
    }
}

impl RenderBackend for CompositorBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Compositor
    }

    fn attach(&mut self, request: &AttachRequest) -> Result<()> {
        let mut surface = self.surface()?;
        if let Capability::Unavailable(reason) = surface.capability() {
            return Err(TransitionError::BackendUnavailable(reason));
        }
        let size = surface.size();
        if size.is_empty() {
            return Err(TransitionError::BackendUnavailable(
                "compositor surface has zero size".into(),
            ));
        }
        if size != request.size {
            // reveal geometry is laid out in target pixels
            return Err(TransitionError::BackendUnavailable(format!(
                "compositor is {}x{}, target is {}x{}",
                size.width, size.height, request.size.width, request.size.height
            )));
        }
        let old = fit_to(&request.old, size);
        let new = fit_to(&request.new, size);
        if let EffectFamily::Shader(_) = &request.family {
            surface.warm_textures(&[old.as_ref(), new.as_ref()]);
        }
        surface.load_images(&old, &new)?;
        match &request.family {
            EffectFamily::Crossfade => surface.start_crossfade()?,
            EffectFamily::Slide => surface.start_slide()?,
            EffectFamily::Reveal => surface.start_reveal()?,
            EffectFamily::Shader(effect) => surface.start_shader(effect)?,
        }
        drop(surface);
        debug!(width = size.width, height = size.height, "compositor_attach");
        self.new = Some(new);
        self.holding.set(true);
        Ok(())
    }

    fn present(&mut self, plan: &FramePlan) -> Result<()> {
        let mut surface = self.surface()?;
        match plan {
            FramePlan::Blend { mix } => surface.set_crossfade(*mix),
            FramePlan::Slide {
                old_offset,
                new_offset,
            } => surface.set_slide_offsets(*old_offset, *new_offset),
            FramePlan::Reveal(region) => surface.set_reveal_region(region),
            FramePlan::Shader { progress, .. } => surface.set_shader_progress(*progress),
            FramePlan::Complete => match &self.new {
                Some(new) => surface.show_image(new),
                None => Err(TransitionError::Backend(
                    "compositor backend is not attached".into(),
                )),
            },
        }
    }

    fn show_image(&mut self, image: &SharedImage) -> Result<()> {
        let mut surface = self.surface()?;
        let fitted = fit_to(image, surface.size());
        surface.show_image(&fitted)
    }

    fn detach(&mut self) {
        self.new = None;
        if !self.holding.replace(false) {
            return;
        }
        match self.surface.try_borrow_mut() {
            Ok(mut surface) => surface.release(),
            Err(_) => warn!("compositor_release_skipped"),
        }
    }
}

/// Registry handle releasing the shared surface's per-run textures.
pub struct CompositorLease {
    surface: Weak<RefCell<dyn CompositorSurface>>,
    holding: Rc<Cell<bool>>,
}

impl Releasable for CompositorLease {
    fn release(&mut self) {
        if !self.holding.replace(false) {
            return;
        }
        if let Some(surface) = self.surface.upgrade() {
            if let Ok(mut surface) = surface.try_borrow_mut() {
                surface.release();
            }
        }
    }

    fn is_released(&self) -> bool {
        !self.holding.get() || self.surface.strong_count() == 0
    }
}
