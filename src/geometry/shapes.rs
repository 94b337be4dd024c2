//! Per-element reveal shapes.
//!
//! Each function maps an element's local progress to the part of its bounds
//! that shows the new image. Shapes are nested as progress grows, so an
//! element never un-reveals pixels, and every shape covers its whole element
//! at progress 1.

use std::f32::consts::PI;

use super::stagger::Edge;
use super::{Point, Polygon, Rect, RevealShape};

/// `e = 0.5 − 0.5·cos(π·progress)`.
pub fn eased_local(progress: f32) -> f32 {
    0.5 - 0.5 * (PI * progress.clamp(0.0, 1.0)).cos()
}

/// Centred sub-rectangle of `cell` grown by the eased local progress.
pub fn block_flip_rect(cell: Rect, progress: f32) -> Rect {
    let e = eased_local(progress);
    cell.scaled_about_center(e, e)
}

/// Wedge with its base on the entry edge.
///
/// The apex travels to the far edge while `e ≤ 0.5` (`depth = min(1, 2e)`),
/// then the apex widens into the far edge (`spread = max(0, 2e − 1)`) until the
/// wedge fills the cell.
pub fn block_flip_wedge(cell: Rect, entry: Edge, progress: f32) -> Polygon {
    let e = eased_local(progress);
    let depth = (2.0 * e).min(1.0);
    let spread = (2.0 * e - 1.0).max(0.0);
    if e <= 0.0 {
        return Polygon::default();
    }
    // Work in a local frame where the entry edge is at u = 0 and u grows
    // toward the far edge; v runs along the entry edge.
    let (len_u, len_v) = if entry.is_horizontal() {
        (cell.width, cell.height)
    } else {
        (cell.height, cell.width)
    };
    let reach = depth * len_u;
    let half_far = spread * len_v * 0.5;
    let mid_v = len_v * 0.5;
    let local = [
        (0.0, 0.0),
        (reach, mid_v - half_far),
        (reach, mid_v + half_far),
        (0.0, len_v),
    ];
    let mut points: Vec<Point> = local
        .iter()
        .map(|&(u, v)| match entry {
            Edge::Left => Point::new(cell.x + u, cell.y + v),
            Edge::Right => Point::new(cell.right() - u, cell.y + v),
            Edge::Top => Point::new(cell.x + v, cell.y + u),
            Edge::Bottom => Point::new(cell.x + v, cell.bottom() - u),
        })
        .collect();
    if half_far <= 0.0 {
        // triangle: both far vertices coincide
        points.remove(2);
    }
    Polygon::new(points)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DiffuseShape {
    #[default]
    Rectangle,
    Circle,
    Diamond,
    Plus,
    Triangle,
}

impl DiffuseShape {
    pub const ALL: &'static [Self] = &[
        Self::Rectangle,
        Self::Circle,
        Self::Diamond,
        Self::Plus,
        Self::Triangle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rectangle => "rectangle",
            Self::Circle => "circle",
            Self::Diamond => "diamond",
            Self::Plus => "plus",
            Self::Triangle => "triangle",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let lower = raw.trim().to_ascii_lowercase();
        match lower.as_str() {
            "rect" | "square" => Some(Self::Rectangle),
            "cross" => Some(Self::Plus),
            _ => Self::ALL.iter().copied().find(|s| s.as_str() == lower),
        }
    }
}

const TRIANGLE_MAX_SCALE: f32 = 2.5;

/// Diffuse reveal pieces for one cell, scaled directly by `progress`.
pub fn diffuse_shape(cell: Rect, shape: DiffuseShape, progress: f32) -> Vec<RevealShape> {
    let p = progress.clamp(0.0, 1.0);
    if p <= 0.0 {
        return Vec::new();
    }
    let c = cell.center();
    match shape {
        DiffuseShape::Rectangle => vec![RevealShape::rect(cell.scaled_about_center(p, p))],
        DiffuseShape::Circle => {
            let radius = p * cell.width.hypot(cell.height) * 0.5;
            vec![RevealShape::circle(c, radius).clipped(cell)]
        }
        DiffuseShape::Diamond => {
            let (hw, hh) = (p * cell.width, p * cell.height);
            let poly = Polygon::new(vec![
                Point::new(c.x, c.y - hh),
                Point::new(c.x + hw, c.y),
                Point::new(c.x, c.y + hh),
                Point::new(c.x - hw, c.y),
            ]);
            vec![RevealShape::polygon(poly).clipped(cell)]
        }
        DiffuseShape::Plus => {
            let long = (2.0 * p).min(1.0);
            vec![
                RevealShape::rect(cell.scaled_about_center(long, p)),
                RevealShape::rect(cell.scaled_about_center(p, long)),
            ]
        }
        DiffuseShape::Triangle => {
            let k = p * TRIANGLE_MAX_SCALE;
            let poly = Polygon::new(vec![
                Point::new(c.x, c.y - k * cell.height),
                Point::new(c.x + k * cell.width, c.y + k * cell.height * 0.5),
                Point::new(c.x - k * cell.width, c.y + k * cell.height * 0.5),
            ]);
            vec![RevealShape::polygon(poly).clipped(cell)]
        }
    }
}

/// Slat opening symmetrically from its centre line.
pub fn blinds_slat(slat: Rect, vertical: bool, progress: f32) -> Rect {
    let e = eased_local(progress);
    if vertical {
        slat.scaled_about_center(e, 1.0)
    } else {
        slat.scaled_about_center(1.0, e)
    }
}

/// Portion of a target cell covered by a block entering from `entry`.
pub fn shuffle_block(cell: Rect, entry: Edge, progress: f32) -> Rect {
    let e = eased_local(progress);
    match entry {
        Edge::Left => Rect::new(cell.x, cell.y, cell.width * e, cell.height),
        Edge::Right => Rect::new(
            cell.right() - cell.width * e,
            cell.y,
            cell.width * e,
            cell.height,
        ),
        Edge::Top => Rect::new(cell.x, cell.y, cell.width, cell.height * e),
        Edge::Bottom => Rect::new(
            cell.x,
            cell.bottom() - cell.height * e,
            cell.width,
            cell.height * e,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::geometry::raster::CoverageMask;
    use crate::geometry::RevealRegion;

    fn cell() -> Rect {
        Rect::new(0.0, 0.0, 40.0, 30.0)
    }

    fn mask(shapes: Vec<RevealShape>) -> CoverageMask {
        CoverageMask::from_region(&RevealRegion { shapes }, Size::new(40, 30))
    }

    #[test]
    fn eased_progress_endpoints() {
        assert_eq!(eased_local(0.0), 0.0);
        assert!((eased_local(0.5) - 0.5).abs() < 1e-6);
        assert!((eased_local(1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn wedge_is_triangle_until_apex_reaches_far_edge() {
        let tri = block_flip_wedge(cell(), Edge::Left, 0.3);
        assert_eq!(tri.points.len(), 3);
        let quad = block_flip_wedge(cell(), Edge::Top, 0.8);
        assert_eq!(quad.points.len(), 4);
    }

    #[test]
    fn every_shape_fills_cell_at_completion() {
        for shape in DiffuseShape::ALL {
            assert!(mask(diffuse_shape(cell(), *shape, 1.0)).is_full(), "{shape:?}");
        }
        for edge in Edge::ALL {
            let wedge = RevealShape::polygon(block_flip_wedge(cell(), *edge, 1.0));
            assert!(mask(vec![wedge]).is_full(), "wedge {edge:?}");
            let block = RevealShape::rect(shuffle_block(cell(), *edge, 1.0));
            assert!(mask(vec![block]).is_full(), "shuffle {edge:?}");
        }
        assert!(mask(vec![RevealShape::rect(block_flip_rect(cell(), 1.0))]).is_full());
        assert!(mask(vec![RevealShape::rect(blinds_slat(cell(), true, 1.0))]).is_full());
    }

    #[test]
    fn shapes_grow_monotonically() {
        for shape in DiffuseShape::ALL {
            let mut previous = mask(Vec::new());
            for step in 0..=20 {
                let current = mask(diffuse_shape(cell(), *shape, step as f32 / 20.0));
                assert!(current.covers(&previous), "{shape:?} step {step}");
                previous = current;
            }
        }
        let mut previous = mask(Vec::new());
        for step in 0..=20 {
            let wedge = block_flip_wedge(cell(), Edge::Bottom, step as f32 / 20.0);
            let current = mask(vec![RevealShape::polygon(wedge)]);
            assert!(current.covers(&previous), "wedge step {step}");
            previous = current;
        }
    }

    #[test]
    fn parses_shape_names() {
        assert_eq!(DiffuseShape::parse("Circle"), Some(DiffuseShape::Circle));
        assert_eq!(DiffuseShape::parse("cross"), Some(DiffuseShape::Plus));
        assert_eq!(DiffuseShape::parse("hexagon"), None);
    }
}
