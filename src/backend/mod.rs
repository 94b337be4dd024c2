//! Rendering strategies that turn a per-frame plan into pixels.

pub mod compositor;
pub mod gpu;
pub mod software;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use image::{RgbaImage, imageops};
use tracing::debug;

use crate::error::Result;
use crate::geometry::stagger::Edge;
use crate::geometry::{RevealRegion, Size};

/// Immutable bitmap shared between effects and backends.
pub type SharedImage = Arc<RgbaImage>;

pub fn is_valid_image(image: &RgbaImage) -> bool {
    image.width() > 0 && image.height() > 0
}

/// Returns `image` unchanged when it already matches `size`, otherwise a copy
/// resized to fill `size` exactly.
pub fn fit_to(image: &SharedImage, size: Size) -> SharedImage {
    if image.width() == size.width && image.height() == size.height {
        return Arc::clone(image);
    }
    debug!(
        from_w = image.width(),
        from_h = image.height(),
        to_w = size.width,
        to_h = size.height,
        "image_fit"
    );
    Arc::new(imageops::resize(
        image.as_ref(),
        size.width,
        size.height,
        imageops::FilterType::Triangle,
    ))
}

/// The display surface an effect draws into. Cloning shares the canvas.
#[derive(Clone)]
pub struct Surface {
    canvas: Rc<RefCell<RgbaImage>>,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: Rc::new(RefCell::new(RgbaImage::new(width, height))),
        }
    }

    pub fn size(&self) -> Size {
        let canvas = self.canvas.borrow();
        Size::new(canvas.width(), canvas.height())
    }

    pub fn snapshot(&self) -> RgbaImage {
        self.canvas.borrow().clone()
    }

    pub fn with_canvas<R>(&self, f: impl FnOnce(&mut RgbaImage) -> R) -> R {
        f(&mut self.canvas.borrow_mut())
    }

    /// Replaces the whole canvas with `image`, resized when needed. Empty images
    /// leave the canvas untouched.
    pub fn paint(&self, image: &SharedImage) {
        if self.size().is_empty() || !is_valid_image(image) {
            return;
        }
        let fitted = fit_to(image, self.size());
        self.with_canvas(|canvas| canvas.copy_from_slice(fitted.as_raw()));
    }
}

/// Whether the shared GPU compositor can be used right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    Available,
    Unavailable(String),
}

impl Capability {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Software,
    Compositor,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Software => "software",
            Self::Compositor => "compositor",
        }
    }
}

/// Parameters of a compositor-only shader effect.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderEffect {
    Crumble { pieces: u32, seed: u32 },
    Particle { radius: f32, edge: Edge, seed: u32 },
    Burn { edge: Edge, glow: [u8; 3], jaggedness: f32, seed: u32 },
}

impl ShaderEffect {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Crumble { .. } => "crumble",
            Self::Particle { .. } => "particle",
            Self::Burn { .. } => "burn",
        }
    }
}

/// Compositing primitive an effect drives, fixed for one run.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectFamily {
    Crossfade,
    Slide,
    Reveal,
    Shader(ShaderEffect),
}

/// What to show for one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FramePlan {
    /// Opacity blend, `mix == 1` shows only the new image.
    Blend { mix: f32 },
    /// Both images translated by pixel offsets.
    Slide {
        old_offset: [f32; 2],
        new_offset: [f32; 2],
    },
    /// Old image everywhere except the region, which shows the new one.
    Reveal(RevealRegion),
    Shader { effect: ShaderEffect, progress: f32 },
    /// The unmodified new image.
    Complete,
}

pub struct AttachRequest {
    pub old: SharedImage,
    pub new: SharedImage,
    pub size: Size,
    pub family: EffectFamily,
}

pub trait RenderBackend {
    fn kind(&self) -> BackendKind;

    /// Binds the images for one run and paints nothing yet.
    fn attach(&mut self, request: &AttachRequest) -> Result<()>;

    fn present(&mut self, plan: &FramePlan) -> Result<()>;

    /// Shows `image` directly, outside of any run.
    fn show_image(&mut self, image: &SharedImage) -> Result<()>;

    /// Drops per-run resources. Safe to call repeatedly.
    fn detach(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn fit_reuses_matching_images() {
        let img: SharedImage = Arc::new(RgbaImage::from_pixel(4, 3, Rgba([1, 2, 3, 255])));
        let same = fit_to(&img, Size::new(4, 3));
        assert!(Arc::ptr_eq(&img, &same));
        let resized = fit_to(&img, Size::new(8, 6));
        assert_eq!(resized.dimensions(), (8, 6));
        let px = resized.get_pixel(5, 5);
        assert!(px.0.iter().zip([1u8, 2, 3, 255]).all(|(a, b)| a.abs_diff(b) <= 1));
    }

    #[test]
    fn surface_paint_fills_canvas() {
        let surface = Surface::new(6, 4);
        let img: SharedImage = Arc::new(RgbaImage::from_pixel(3, 2, Rgba([9, 9, 9, 255])));
        surface.paint(&img);
        assert!(
            surface
                .snapshot()
                .pixels()
                .all(|p| p.0[0].abs_diff(9) <= 1 && p.0[3] >= 254)
        );
    }
}
