//! Screen-space primitives shared by the reveal algorithms and both backends.
//!
//! All coordinates are in target-surface pixels with the origin at the top-left
//! corner. Rectangles are half-open (`[x, x + width) × [y, y + height)`), so a
//! grid of integer rectangles tiles a frame without double-covering edges.

pub mod grid;
pub mod raster;
pub mod scatter;
pub mod shapes;
pub mod stagger;
pub mod sweep;
pub mod timeline;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    fn lerp(self, other: Point, t: f32) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn diagonal(&self) -> f32 {
        (self.width as f32).hypot(self.height as f32)
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width as f32, self.height as f32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    /// Rectangle of `scale` times this one's extent, sharing its centre.
    pub fn scaled_about_center(&self, sx: f32, sy: f32) -> Rect {
        let c = self.center();
        let w = self.width * sx.max(0.0);
        let h = self.height * sy.max(0.0);
        Rect::new(c.x - w * 0.5, c.y - h * 0.5, w, h)
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        (x1 > x0 && y1 > y0).then(|| Rect::new(x0, y0, x1 - x0, y1 - y0))
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.x, self.y),
            Point::new(self.right(), self.y),
            Point::new(self.right(), self.bottom()),
            Point::new(self.x, self.bottom()),
        ]
    }
}

/// Convex polygon; vertex winding may be either direction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
    pub points: Vec<Point>,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn from_rect(rect: &Rect) -> Self {
        Self::new(rect.corners().to_vec())
    }

    pub fn is_degenerate(&self) -> bool {
        self.points.len() < 3 || self.area() <= f32::EPSILON
    }

    fn signed_area(&self) -> f32 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut acc = 0.0;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            acc += a.x * b.y - b.x * a.y;
        }
        acc * 0.5
    }

    pub fn area(&self) -> f32 {
        self.signed_area().abs()
    }

    pub fn contains(&self, p: Point) -> bool {
        if self.points.len() < 3 {
            return false;
        }
        let orientation = self.signed_area().signum();
        if orientation == 0.0 {
            return false;
        }
        let n = self.points.len();
        (0..n).all(|i| {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
            cross * orientation >= 0.0
        })
    }

    pub fn bounds(&self) -> Rect {
        let mut min = Point::new(f32::INFINITY, f32::INFINITY);
        let mut max = Point::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
        for p in &self.points {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        if self.points.is_empty() {
            return Rect::default();
        }
        Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    /// Keeps the part of the polygon where `a·x + b·y <= c`.
    pub fn clip_half_plane(&self, a: f32, b: f32, c: f32) -> Polygon {
        let inside = |p: &Point| a * p.x + b * p.y <= c;
        let n = self.points.len();
        let mut out = Vec::with_capacity(n + 1);
        for i in 0..n {
            let cur = self.points[i];
            let next = self.points[(i + 1) % n];
            let cur_in = inside(&cur);
            let next_in = inside(&next);
            if cur_in {
                out.push(cur);
            }
            if cur_in != next_in {
                let fc = a * cur.x + b * cur.y - c;
                let fn_ = a * next.x + b * next.y - c;
                let t = fc / (fc - fn_);
                out.push(cur.lerp(next, t));
            }
        }
        Polygon::new(out)
    }

    /// Sutherland–Hodgman clip against an axis-aligned rectangle.
    pub fn clip_to_rect(&self, rect: &Rect) -> Polygon {
        self.clip_half_plane(-1.0, 0.0, -rect.x)
            .clip_half_plane(1.0, 0.0, rect.right())
            .clip_half_plane(0.0, -1.0, -rect.y)
            .clip_half_plane(0.0, 1.0, rect.bottom())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Circle {
    pub center: Point,
    pub radius: f32,
}

impl Circle {
    pub fn contains(&self, p: Point) -> bool {
        self.center.distance(p) <= self.radius
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.center.x - self.radius,
            self.center.y - self.radius,
            self.radius * 2.0,
            self.radius * 2.0,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    Rect(Rect),
    Polygon(Polygon),
    Circle(Circle),
}

/// One revealed piece, optionally clipped to an element's bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct RevealShape {
    pub kind: ShapeKind,
    pub clip: Option<Rect>,
}

impl RevealShape {
    pub fn rect(rect: Rect) -> Self {
        Self {
            kind: ShapeKind::Rect(rect),
            clip: None,
        }
    }

    pub fn polygon(polygon: Polygon) -> Self {
        Self {
            kind: ShapeKind::Polygon(polygon),
            clip: None,
        }
    }

    pub fn circle(center: Point, radius: f32) -> Self {
        Self {
            kind: ShapeKind::Circle(Circle { center, radius }),
            clip: None,
        }
    }

    pub fn clipped(mut self, clip: Rect) -> Self {
        self.clip = Some(clip);
        self
    }

    pub fn is_empty(&self) -> bool {
        let body_empty = match &self.kind {
            ShapeKind::Rect(r) => r.is_empty(),
            ShapeKind::Polygon(p) => p.is_degenerate(),
            ShapeKind::Circle(c) => c.radius <= 0.0,
        };
        body_empty || self.clip.is_some_and(|c| c.is_empty())
    }

    pub fn contains(&self, p: Point) -> bool {
        if let Some(clip) = &self.clip {
            if !clip.contains(p) {
                return false;
            }
        }
        match &self.kind {
            ShapeKind::Rect(r) => r.contains(p),
            ShapeKind::Polygon(poly) => poly.contains(p),
            ShapeKind::Circle(c) => c.contains(p),
        }
    }

    /// Bounding box of the visible part of the shape.
    pub fn bounds(&self) -> Rect {
        let body = match &self.kind {
            ShapeKind::Rect(r) => *r,
            ShapeKind::Polygon(p) => p.bounds(),
            ShapeKind::Circle(c) => c.bounds(),
        };
        match &self.clip {
            Some(clip) => body.intersection(clip).unwrap_or_default(),
            None => body,
        }
    }

    /// Outline as a convex polygon, approximating circles with `segments`
    /// vertices and applying the clip rectangle.
    pub fn to_polygon(&self, segments: usize) -> Polygon {
        let body = match &self.kind {
            ShapeKind::Rect(r) => Polygon::from_rect(r),
            ShapeKind::Polygon(p) => p.clone(),
            ShapeKind::Circle(c) => {
                let n = segments.max(8);
                // circumscribed so the outline never falls inside the circle
                let r = c.radius / (std::f32::consts::PI / n as f32).cos();
                Polygon::new(
                    (0..n)
                        .map(|i| {
                            let a = i as f32 / n as f32 * std::f32::consts::TAU;
                            Point::new(c.center.x + r * a.cos(), c.center.y + r * a.sin())
                        })
                        .collect(),
                )
            }
        };
        match &self.clip {
            Some(clip) => body.clip_to_rect(clip),
            None => body,
        }
    }
}

/// Union of shapes currently showing the new image.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RevealRegion {
    pub shapes: Vec<RevealShape>,
}

impl RevealRegion {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn full(size: Size) -> Self {
        Self {
            shapes: vec![RevealShape::rect(size.bounds())],
        }
    }

    pub fn push(&mut self, shape: RevealShape) {
        if !shape.is_empty() {
            self.shapes.push(shape);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn contains(&self, p: Point) -> bool {
        self.shapes.iter().any(|s| s.contains(p))
    }
}

impl FromIterator<RevealShape> for RevealRegion {
    fn from_iter<I: IntoIterator<Item = RevealShape>>(iter: I) -> Self {
        let mut region = RevealRegion::empty();
        for shape in iter {
            region.push(shape);
        }
        region
    }
}
