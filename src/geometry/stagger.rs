//! Start thresholds for staggered elements.

use rand::Rng;

/// Frame edge a wave of elements starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Left,
    Right,
    Top,
    Bottom,
}

impl Edge {
    pub const ALL: &'static [Self] = &[Self::Left, Self::Right, Self::Top, Self::Bottom];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Top => "top",
            Self::Bottom => "bottom",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "left" | "from-left" | "left-to-right" => Some(Self::Left),
            "right" | "from-right" | "right-to-left" => Some(Self::Right),
            "top" | "from-top" | "top-to-bottom" => Some(Self::Top),
            "bottom" | "from-bottom" | "bottom-to-top" => Some(Self::Bottom),
            _ => None,
        }
    }

    pub fn is_horizontal(&self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }
}

/// How far a wave threshold may stray from its position on the axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Jitter {
    /// `±0.18 / max(cols, rows)`, used by block-flip.
    Grid,
    /// `±0.35 / span`, where span is the element count along the wave axis.
    Span,
}

impl Jitter {
    pub fn amplitude(&self, cols: u32, rows: u32, edge: Edge) -> f32 {
        match self {
            Self::Grid => 0.18 / cols.max(rows).max(1) as f32,
            Self::Span => {
                let span = if edge.is_horizontal() { cols } else { rows };
                0.35 / span.max(1) as f32
            }
        }
    }
}

/// Normalised position of `(col, row)` along the wave travelling away from `edge`.
pub fn wave_position(col: u32, row: u32, cols: u32, rows: u32, edge: Edge) -> f32 {
    let norm = |i: u32, n: u32| {
        if n <= 1 {
            0.0
        } else {
            i as f32 / (n - 1) as f32
        }
    };
    match edge {
        Edge::Left => norm(col, cols),
        Edge::Right => 1.0 - norm(col, cols),
        Edge::Top => norm(row, rows),
        Edge::Bottom => 1.0 - norm(row, rows),
    }
}

/// Thresholds for a `cols × rows` layout in row-major order.
///
/// Without a bias every threshold is uniform in `[0, 1)`; with one it is the
/// wave position plus bounded jitter, clamped to `[0, 1]`.
pub fn thresholds<R: Rng>(
    cols: u32,
    rows: u32,
    bias: Option<Edge>,
    jitter: Jitter,
    rng: &mut R,
) -> Vec<f32> {
    let mut out = Vec::with_capacity(cols as usize * rows as usize);
    for row in 0..rows {
        for col in 0..cols {
            let value = match bias {
                None => rng.random::<f32>(),
                Some(edge) => {
                    let amp = jitter.amplitude(cols, rows, edge);
                    let offset = if amp > 0.0 {
                        rng.random_range(-amp..=amp)
                    } else {
                        0.0
                    };
                    (wave_position(col, row, cols, rows, edge) + offset).clamp(0.0, 1.0)
                }
            };
            out.push(value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn random_thresholds_stay_in_unit_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let t = thresholds(8, 5, None, Jitter::Grid, &mut rng);
        assert_eq!(t.len(), 40);
        assert!(t.iter().all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn left_wave_orders_columns() {
        let mut rng = StdRng::seed_from_u64(3);
        let t = thresholds(8, 5, Some(Edge::Left), Jitter::Grid, &mut rng);
        let amp = 0.18 / 8.0;
        for row in 0..5 {
            for col in 0..8 {
                let expected = col as f32 / 7.0;
                let got = t[row * 8 + col];
                assert!((got - expected).abs() <= amp + 1e-6);
            }
        }
    }

    #[test]
    fn opposite_edges_invert_position() {
        assert_eq!(wave_position(0, 0, 4, 4, Edge::Right), 1.0);
        assert_eq!(wave_position(3, 0, 4, 4, Edge::Right), 0.0);
        assert_eq!(wave_position(0, 3, 4, 4, Edge::Bottom), 0.0);
        assert_eq!(wave_position(0, 0, 1, 1, Edge::Top), 0.0);
    }

    #[test]
    fn span_jitter_uses_axis_length() {
        assert!((Jitter::Span.amplitude(10, 4, Edge::Left) - 0.035).abs() < 1e-6);
        assert!((Jitter::Span.amplitude(10, 4, Edge::Top) - 0.0875).abs() < 1e-6);
    }
}
