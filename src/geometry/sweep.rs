//! Single-boundary effects: wipe sweeps and slide offsets.

use super::{Polygon, Rect, RevealShape, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WipeDirection {
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
    TopLeftToBottomRight,
    TopRightToBottomLeft,
    BottomLeftToTopRight,
    BottomRightToTopLeft,
}

impl WipeDirection {
    pub const ALL: &'static [Self] = &[
        Self::LeftToRight,
        Self::RightToLeft,
        Self::TopToBottom,
        Self::BottomToTop,
        Self::TopLeftToBottomRight,
        Self::TopRightToBottomLeft,
        Self::BottomLeftToTopRight,
        Self::BottomRightToTopLeft,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LeftToRight => "left-to-right",
            Self::RightToLeft => "right-to-left",
            Self::TopToBottom => "top-to-bottom",
            Self::BottomToTop => "bottom-to-top",
            Self::TopLeftToBottomRight => "top-left-to-bottom-right",
            Self::TopRightToBottomLeft => "top-right-to-bottom-left",
            Self::BottomLeftToTopRight => "bottom-left-to-top-right",
            Self::BottomRightToTopLeft => "bottom-right-to-top-left",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let lower = raw.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        match lower.as_str() {
            "left" => Some(Self::LeftToRight),
            "right" => Some(Self::RightToLeft),
            "top" | "down" => Some(Self::TopToBottom),
            "bottom" | "up" => Some(Self::BottomToTop),
            _ => Self::ALL.iter().copied().find(|d| d.as_str() == lower),
        }
    }

    pub fn is_diagonal(&self) -> bool {
        matches!(
            self,
            Self::TopLeftToBottomRight
                | Self::TopRightToBottomLeft
                | Self::BottomLeftToTopRight
                | Self::BottomRightToTopLeft
        )
    }
}

/// Region revealed by a wipe at `progress`.
///
/// Axis wipes are a growing rectangle. Diagonal wipes keep the part of the
/// frame on the origin side of a line `±x ± y = d` with `d` sweeping from 0 to
/// `width + height`, which yields a triangle, then a quadrilateral, then a
/// pentagon.
pub fn wipe_shape(size: Size, direction: WipeDirection, progress: f32) -> Option<RevealShape> {
    let p = progress.clamp(0.0, 1.0);
    if p <= 0.0 || size.is_empty() {
        return None;
    }
    let (w, h) = (size.width as f32, size.height as f32);
    let shape = match direction {
        WipeDirection::LeftToRight => RevealShape::rect(Rect::new(0.0, 0.0, w * p, h)),
        WipeDirection::RightToLeft => RevealShape::rect(Rect::new(w - w * p, 0.0, w * p, h)),
        WipeDirection::TopToBottom => RevealShape::rect(Rect::new(0.0, 0.0, w, h * p)),
        WipeDirection::BottomToTop => RevealShape::rect(Rect::new(0.0, h - h * p, w, h * p)),
        diagonal => {
            let d = p * (w + h);
            let frame = Polygon::from_rect(&size.bounds());
            // a·x + b·y <= c, anchored at the starting corner
            let (a, b, c) = match diagonal {
                WipeDirection::TopLeftToBottomRight => (1.0, 1.0, d),
                WipeDirection::TopRightToBottomLeft => (-1.0, 1.0, d - w),
                WipeDirection::BottomLeftToTopRight => (1.0, -1.0, d - h),
                _ => (-1.0, -1.0, d - w - h),
            };
            if p >= 1.0 {
                RevealShape::polygon(frame)
            } else {
                RevealShape::polygon(frame.clip_half_plane(a, b, c))
            }
        }
    };
    (!shape.is_empty()).then_some(shape)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlideDirection {
    Left,
    Right,
    Up,
    Down,
}

impl SlideDirection {
    pub const ALL: &'static [Self] = &[Self::Left, Self::Right, Self::Up, Self::Down];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "left" | "right-to-left" => Some(Self::Left),
            "right" | "left-to-right" => Some(Self::Right),
            "up" | "bottom-to-top" => Some(Self::Up),
            "down" | "top-to-bottom" => Some(Self::Down),
            _ => None,
        }
    }

    fn unit(&self) -> (f32, f32) {
        match self {
            Self::Left => (-1.0, 0.0),
            Self::Right => (1.0, 0.0),
            Self::Up => (0.0, -1.0),
            Self::Down => (0.0, 1.0),
        }
    }
}

/// Whole-pixel offsets of the old and new image while both travel in
/// `direction`.
///
/// The old image leaves through the leading edge while the new one enters
/// from the trailing edge; at `progress == 1` the new image sits at the origin.
/// The old offset is derived from the rounded new one so the two always abut.
pub fn slide_offsets(size: Size, direction: SlideDirection, progress: f32) -> ([f32; 2], [f32; 2]) {
    let p = progress.clamp(0.0, 1.0);
    let (ux, uy) = direction.unit();
    let (w, h) = (size.width as f32, size.height as f32);
    let new = [
        (-ux * w * (1.0 - p)).round(),
        (-uy * h * (1.0 - p)).round(),
    ];
    let old = [new[0] + ux * w, new[1] + uy * h];
    (old, new)
}
