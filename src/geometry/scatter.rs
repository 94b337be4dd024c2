//! Free-floating elements: raindrops and claw strokes.

use rand::Rng;

use super::{Point, Polygon, RevealShape, Size};
use super::shapes::eased_local;

/// An expanding circle anchored at `center`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Raindrop {
    pub center: Point,
    /// Radius at completion: the distance to the farthest frame corner.
    pub max_radius: f32,
}

impl Raindrop {
    pub fn new(center: Point, size: Size) -> Self {
        Self {
            center,
            max_radius: farthest_corner_distance(size, center),
        }
    }

    pub fn shape(&self, progress: f32) -> Option<RevealShape> {
        let r = eased_local(progress) * self.max_radius;
        (r > 0.0).then(|| RevealShape::circle(self.center, r))
    }
}

pub fn farthest_corner_distance(size: Size, p: Point) -> f32 {
    size.bounds()
        .corners()
        .iter()
        .map(|c| c.distance(p))
        .fold(0.0, f32::max)
}

pub fn scatter_raindrops<R: Rng>(size: Size, count: u32, rng: &mut R) -> Vec<Raindrop> {
    let (w, h) = (size.width.max(1) as f32, size.height.max(1) as f32);
    (0..count.max(1))
        .map(|_| {
            let center = Point::new(rng.random_range(0.0..w), rng.random_range(0.0..h));
            Raindrop::new(center, size)
        })
        .collect()
}

/// A claw stroke along a fixed diagonal path.
///
/// The path runs through the frame and extends one frame diagonal past its
/// midpoint on each side, so a stroke of full width covers every pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClawStroke {
    pub start: Point,
    pub end: Point,
    pub base_half_width: f32,
    pub max_half_width: f32,
}

impl ClawStroke {
    /// Stroke polygon at `progress`: the length grows over the first half,
    /// the width over the second.
    pub fn shape(&self, progress: f32) -> Option<RevealShape> {
        let e = eased_local(progress);
        if e <= 0.0 {
            return None;
        }
        let length = (2.0 * e).min(1.0);
        let widen = (2.0 * e - 1.0).max(0.0);
        let half = self.base_half_width + (self.max_half_width - self.base_half_width) * widen;
        let dx = self.end.x - self.start.x;
        let dy = self.end.y - self.start.y;
        let len = dx.hypot(dy);
        if len <= 0.0 {
            return None;
        }
        let (nx, ny) = (-dy / len * half, dx / len * half);
        let tip = Point::new(self.start.x + dx * length, self.start.y + dy * length);
        Some(RevealShape::polygon(Polygon::new(vec![
            Point::new(self.start.x + nx, self.start.y + ny),
            Point::new(tip.x + nx, tip.y + ny),
            Point::new(tip.x - nx, tip.y - ny),
            Point::new(self.start.x - nx, self.start.y - ny),
        ])))
    }
}

/// Parallel diagonal strokes spread across the frame with a little jitter.
pub fn claw_paths<R: Rng>(size: Size, count: u32, rng: &mut R) -> Vec<ClawStroke> {
    let count = count.max(1);
    let (w, h) = (size.width as f32, size.height as f32);
    let diag = size.diagonal().max(1.0);
    // shared slant, slightly randomised per run
    let angle = rng.random_range(0.9_f32..1.2) * (h.max(1.0)).atan2(w.max(1.0));
    let dir = Point::new(angle.cos(), angle.sin());
    let normal = Point::new(-dir.y, dir.x);
    let spacing = diag / (count as f32 + 1.0);
    let center = Point::new(w * 0.5, h * 0.5);
    (0..count)
        .map(|i| {
            let offset = (i as f32 + 1.0) * spacing - diag * 0.5
                + rng.random_range(-0.2..=0.2) * spacing;
            let mid = Point::new(center.x + normal.x * offset, center.y + normal.y * offset);
            ClawStroke {
                start: Point::new(mid.x - dir.x * diag, mid.y - dir.y * diag),
                end: Point::new(mid.x + dir.x * diag, mid.y + dir.y * diag),
                base_half_width: (diag * 0.012).max(2.0),
                max_half_width: diag,
            }
        })
        .collect()
}
