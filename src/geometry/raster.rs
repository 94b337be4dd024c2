//! Pixel-centre rasterisation of reveal regions.

use super::{Point, RevealRegion, RevealShape, Size};

/// Per-pixel coverage of a `RevealRegion`, sampled at pixel centres.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageMask {
    size: Size,
    covered: Vec<bool>,
}

impl CoverageMask {
    pub fn empty(size: Size) -> Self {
        Self {
            size,
            covered: vec![false; size.width as usize * size.height as usize],
        }
    }

    pub fn full(size: Size) -> Self {
        Self {
            size,
            covered: vec![true; size.width as usize * size.height as usize],
        }
    }

    pub fn from_region(region: &RevealRegion, size: Size) -> Self {
        let mut mask = Self::empty(size);
        for shape in &region.shapes {
            mask.fill_shape(shape);
        }
        mask
    }

    pub fn fill_shape(&mut self, shape: &RevealShape) {
        for_each_covered_pixel(shape, self.size, |x, y| {
            let idx = y as usize * self.size.width as usize + x as usize;
            self.covered[idx] = true;
        });
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        if x >= self.size.width || y >= self.size.height {
            return false;
        }
        self.covered[y as usize * self.size.width as usize + x as usize]
    }

    /// Number of covered pixels.
    pub fn area(&self) -> usize {
        self.covered.iter().filter(|c| **c).count()
    }

    pub fn is_full(&self) -> bool {
        self.covered.iter().all(|c| *c)
    }

    /// True when every pixel covered by `other` is also covered here.
    pub fn covers(&self, other: &CoverageMask) -> bool {
        self.size == other.size
            && self
                .covered
                .iter()
                .zip(&other.covered)
                .all(|(mine, theirs)| *mine || !*theirs)
    }
}

/// Calls `f(x, y)` for every pixel of `size` whose centre lies in `shape`.
pub fn for_each_covered_pixel(shape: &RevealShape, size: Size, mut f: impl FnMut(u32, u32)) {
    if shape.is_empty() || size.is_empty() {
        return;
    }
    let b = shape.bounds();
    let x0 = (b.x - 0.5).floor().max(0.0) as u32;
    let y0 = (b.y - 0.5).floor().max(0.0) as u32;
    let x1 = ((b.right() + 0.5).ceil().max(0.0) as u32).min(size.width);
    let y1 = ((b.bottom() + 0.5).ceil().max(0.0) as u32).min(size.height);
    for y in y0..y1 {
        for x in x0..x1 {
            if shape.contains(Point::new(x as f32 + 0.5, y as f32 + 0.5)) {
                f(x, y);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    #[test]
    fn integer_rect_covers_exact_pixels() {
        let region = RevealRegion {
            shapes: vec![RevealShape::rect(Rect::new(2.0, 3.0, 4.0, 5.0))],
        };
        let mask = CoverageMask::from_region(&region, Size::new(10, 10));
        assert_eq!(mask.area(), 20);
        assert!(mask.contains(2, 3));
        assert!(!mask.contains(6, 3));
    }

    #[test]
    fn full_region_fills_mask() {
        let size = Size::new(7, 3);
        let mask = CoverageMask::from_region(&RevealRegion::full(size), size);
        assert!(mask.is_full());
        assert!(mask.covers(&CoverageMask::empty(size)));
        assert!(!CoverageMask::empty(size).covers(&mask));
    }
}
