//! CPU raster compositor drawing straight into the target surface.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use image::{Rgba, RgbaImage};
use tracing::debug;

use super::{AttachRequest, BackendKind, FramePlan, RenderBackend, SharedImage, Surface, fit_to};
use crate::error::{Result, TransitionError};
use crate::geometry::raster::for_each_covered_pixel;
use crate::geometry::{RevealRegion, Size};
use crate::resources::Releasable;

struct Layers {
    old: SharedImage,
    new: SharedImage,
}

/// One run's raster compositor. The fitted images are the only state.
pub struct SoftwareBackend {
    target: Surface,
    layers: Rc<RefCell<Option<Layers>>>,
}

impl SoftwareBackend {
    pub fn new(target: Surface) -> Self {
        Self {
            target,
            layers: Rc::new(RefCell::new(None)),
        }
    }

    /// Handle that drops this backend's layers if the owner never detaches.
    pub fn lease(&self) -> SoftwareLease {
        SoftwareLease {
            layers: Rc::downgrade(&self.layers),
        }
    }
}

impl RenderBackend for SoftwareBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Software
    }

    fn attach(&mut self, request: &AttachRequest) -> Result<()> {
        let size = self.target.size();
        if size.is_empty() {
            return Err(TransitionError::Backend("target surface has zero size".into()));
        }
        *self.layers.borrow_mut() = Some(Layers {
            old: fit_to(&request.old, size),
            new: fit_to(&request.new, size),
        });
        debug!(width = size.width, height = size.height, "software_attach");
        Ok(())
    }

    fn present(&mut self, plan: &FramePlan) -> Result<()> {
        let layers = self.layers.borrow();
        let layers = layers
            .as_ref()
            .ok_or_else(|| TransitionError::Backend("software backend is not attached".into()))?;
        let (old, new) = (layers.old.as_ref(), layers.new.as_ref());
        self.target.with_canvas(|canvas| match plan {
            FramePlan::Complete => canvas.copy_from_slice(new.as_raw()),
            FramePlan::Blend { mix } => blend(canvas, old, new, *mix),
            // shader effects have no raster form; they degrade to a crossfade
            FramePlan::Shader { progress, .. } => blend(canvas, old, new, *progress),
            FramePlan::Slide {
                old_offset,
                new_offset,
            } => {
                // one rounding for both blits so they abut
                let new_at = [new_offset[0].round(), new_offset[1].round()];
                let old_at = [
                    new_at[0] + (old_offset[0] - new_offset[0]).round(),
                    new_at[1] + (old_offset[1] - new_offset[1]).round(),
                ];
                canvas.copy_from_slice(old.as_raw());
                blit_offset(canvas, old, old_at);
                blit_offset(canvas, new, new_at);
            }
            FramePlan::Reveal(region) => reveal(canvas, old, new, region),
        });
        Ok(())
    }

    fn show_image(&mut self, image: &SharedImage) -> Result<()> {
        self.target.paint(image);
        Ok(())
    }

    fn detach(&mut self) {
        if self.layers.borrow_mut().take().is_some() {
            debug!("software_detach");
        }
    }
}

/// Registry handle for a `SoftwareBackend`'s layers.
pub struct SoftwareLease {
    layers: Weak<RefCell<Option<Layers>>>,
}

impl Releasable for SoftwareLease {
    fn release(&mut self) {
        if let Some(layers) = self.layers.upgrade() {
            layers.borrow_mut().take();
        }
    }

    fn is_released(&self) -> bool {
        self.layers
            .upgrade()
            .is_none_or(|layers| layers.borrow().is_none())
    }
}

fn blend(canvas: &mut RgbaImage, old: &RgbaImage, new: &RgbaImage, mix: f32) {
    let mix = mix.clamp(0.0, 1.0);
    if mix >= 1.0 {
        canvas.copy_from_slice(new.as_raw());
        return;
    }
    if mix <= 0.0 {
        canvas.copy_from_slice(old.as_raw());
        return;
    }
    let inv = 1.0 - mix;
    let out: &mut [u8] = canvas;
    for ((dst, a), b) in out.iter_mut().zip(old.as_raw()).zip(new.as_raw()) {
        *dst = (*a as f32 * inv + *b as f32 * mix).round() as u8;
    }
}

fn blit_offset(canvas: &mut RgbaImage, src: &RgbaImage, offset: [f32; 2]) {
    let (w, h) = (canvas.width() as i64, canvas.height() as i64);
    let dx = offset[0].round() as i64;
    let dy = offset[1].round() as i64;
    let x0 = dx.max(0);
    let x1 = (dx + src.width() as i64).min(w);
    if x1 <= x0 {
        return;
    }
    let row_len = ((x1 - x0) * 4) as usize;
    for y in dy.max(0)..(dy + src.height() as i64).min(h) {
        let sy = (y - dy) as u32;
        let sx = (x0 - dx) as u32;
        let src_start = ((sy * src.width() + sx) * 4) as usize;
        let dst_start = ((y * w + x0) * 4) as usize;
        let dst: &mut [u8] = canvas;
        dst[dst_start..dst_start + row_len]
            .copy_from_slice(&src.as_raw()[src_start..src_start + row_len]);
    }
}

fn reveal(canvas: &mut RgbaImage, old: &RgbaImage, new: &RgbaImage, region: &RevealRegion) {
    canvas.copy_from_slice(old.as_raw());
    let size = Size::new(canvas.width(), canvas.height());
    for shape in &region.shapes {
        for_each_covered_pixel(shape, size, |x, y| {
            let px: Rgba<u8> = *new.get_pixel(x, y);
            canvas.put_pixel(x, y, px);
        });
    }
}
