//! Easing curves mapping normalized time to normalized progress.
//!
//! Every curve satisfies `apply(0) == 0` and `apply(1) == 1`. Elastic and back
//! curves overshoot the unit interval in between; callers that need a bounded
//! value clamp the result themselves.

use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Easing {
    #[default]
    Linear,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
    InQuart,
    OutQuart,
    InOutQuart,
    InQuint,
    OutQuint,
    InOutQuint,
    InSine,
    OutSine,
    InOutSine,
    InExpo,
    OutExpo,
    InOutExpo,
    InCirc,
    OutCirc,
    InOutCirc,
    InElastic,
    OutElastic,
    InOutElastic,
    InBack,
    OutBack,
    InOutBack,
    InBounce,
    OutBounce,
    InOutBounce,
}

const BACK_C1: f32 = 1.70158;
const BACK_C2: f32 = BACK_C1 * 1.525;
const BACK_C3: f32 = BACK_C1 + 1.0;
const ELASTIC_C4: f32 = (2.0 * PI) / 3.0;
const ELASTIC_C5: f32 = (2.0 * PI) / 4.5;

impl Easing {
    pub const ALL: &'static [Self] = &[
        Self::Linear,
        Self::InQuad,
        Self::OutQuad,
        Self::InOutQuad,
        Self::InCubic,
        Self::OutCubic,
        Self::InOutCubic,
        Self::InQuart,
        Self::OutQuart,
        Self::InOutQuart,
        Self::InQuint,
        Self::OutQuint,
        Self::InOutQuint,
        Self::InSine,
        Self::OutSine,
        Self::InOutSine,
        Self::InExpo,
        Self::OutExpo,
        Self::InOutExpo,
        Self::InCirc,
        Self::OutCirc,
        Self::InOutCirc,
        Self::InElastic,
        Self::OutElastic,
        Self::InOutElastic,
        Self::InBack,
        Self::OutBack,
        Self::InOutBack,
        Self::InBounce,
        Self::OutBounce,
        Self::InOutBounce,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::InQuad => "in-quad",
            Self::OutQuad => "out-quad",
            Self::InOutQuad => "in-out-quad",
            Self::InCubic => "in-cubic",
            Self::OutCubic => "out-cubic",
            Self::InOutCubic => "in-out-cubic",
            Self::InQuart => "in-quart",
            Self::OutQuart => "out-quart",
            Self::InOutQuart => "in-out-quart",
            Self::InQuint => "in-quint",
            Self::OutQuint => "out-quint",
            Self::InOutQuint => "in-out-quint",
            Self::InSine => "in-sine",
            Self::OutSine => "out-sine",
            Self::InOutSine => "in-out-sine",
            Self::InExpo => "in-expo",
            Self::OutExpo => "out-expo",
            Self::InOutExpo => "in-out-expo",
            Self::InCirc => "in-circ",
            Self::OutCirc => "out-circ",
            Self::InOutCirc => "in-out-circ",
            Self::InElastic => "in-elastic",
            Self::OutElastic => "out-elastic",
            Self::InOutElastic => "in-out-elastic",
            Self::InBack => "in-back",
            Self::OutBack => "out-back",
            Self::InOutBack => "in-out-back",
            Self::InBounce => "in-bounce",
            Self::OutBounce => "out-bounce",
            Self::InOutBounce => "in-out-bounce",
        }
    }

    /// Evaluates the curve at `t`, clamping the input to `[0, 1]`.
    pub fn apply(&self, t: f32) -> f32 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Self::Linear => t,
            Self::InQuad => t * t,
            Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Self::InCubic => t * t * t,
            Self::OutCubic => 1.0 - (1.0 - t).powi(3),
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Self::InQuart => t.powi(4),
            Self::OutQuart => 1.0 - (1.0 - t).powi(4),
            Self::InOutQuart => {
                if t < 0.5 {
                    8.0 * t.powi(4)
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(4) / 2.0
                }
            }
            Self::InQuint => t.powi(5),
            Self::OutQuint => 1.0 - (1.0 - t).powi(5),
            Self::InOutQuint => {
                if t < 0.5 {
                    16.0 * t.powi(5)
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(5) / 2.0
                }
            }
            Self::InSine => 1.0 - (t * PI / 2.0).cos(),
            Self::OutSine => (t * PI / 2.0).sin(),
            Self::InOutSine => -((PI * t).cos() - 1.0) / 2.0,
            Self::InExpo => {
                if t == 0.0 {
                    0.0
                } else {
                    2.0_f32.powf(10.0 * t - 10.0)
                }
            }
            Self::OutExpo => {
                if t == 1.0 {
                    1.0
                } else {
                    1.0 - 2.0_f32.powf(-10.0 * t)
                }
            }
            Self::InOutExpo => {
                if t == 0.0 || t == 1.0 {
                    t
                } else if t < 0.5 {
                    2.0_f32.powf(20.0 * t - 10.0) / 2.0
                } else {
                    (2.0 - 2.0_f32.powf(-20.0 * t + 10.0)) / 2.0
                }
            }
            Self::InCirc => 1.0 - (1.0 - t * t).max(0.0).sqrt(),
            Self::OutCirc => (1.0 - (t - 1.0).powi(2)).max(0.0).sqrt(),
            Self::InOutCirc => {
                if t < 0.5 {
                    (1.0 - (1.0 - (2.0 * t).powi(2)).max(0.0).sqrt()) / 2.0
                } else {
                    ((1.0 - (-2.0 * t + 2.0).powi(2)).max(0.0).sqrt() + 1.0) / 2.0
                }
            }
            Self::InElastic => {
                if t == 0.0 || t == 1.0 {
                    t
                } else {
                    -(2.0_f32.powf(10.0 * t - 10.0)) * ((t * 10.0 - 10.75) * ELASTIC_C4).sin()
                }
            }
            Self::OutElastic => {
                if t == 0.0 || t == 1.0 {
                    t
                } else {
                    2.0_f32.powf(-10.0 * t) * ((t * 10.0 - 0.75) * ELASTIC_C4).sin() + 1.0
                }
            }
            Self::InOutElastic => {
                if t == 0.0 || t == 1.0 {
                    t
                } else if t < 0.5 {
                    -(2.0_f32.powf(20.0 * t - 10.0) * ((20.0 * t - 11.125) * ELASTIC_C5).sin())
                        / 2.0
                } else {
                    (2.0_f32.powf(-20.0 * t + 10.0) * ((20.0 * t - 11.125) * ELASTIC_C5).sin())
                        / 2.0
                        + 1.0
                }
            }
            Self::InBack => BACK_C3 * t * t * t - BACK_C1 * t * t,
            Self::OutBack => 1.0 + BACK_C3 * (t - 1.0).powi(3) + BACK_C1 * (t - 1.0).powi(2),
            Self::InOutBack => {
                if t < 0.5 {
                    ((2.0 * t).powi(2) * ((BACK_C2 + 1.0) * 2.0 * t - BACK_C2)) / 2.0
                } else {
                    ((2.0 * t - 2.0).powi(2) * ((BACK_C2 + 1.0) * (t * 2.0 - 2.0) + BACK_C2)
                        + 2.0)
                        / 2.0
                }
            }
            Self::InBounce => 1.0 - bounce_out(1.0 - t),
            Self::OutBounce => bounce_out(t),
            Self::InOutBounce => {
                if t < 0.5 {
                    (1.0 - bounce_out(1.0 - 2.0 * t)) / 2.0
                } else {
                    (1.0 + bounce_out(2.0 * t - 1.0)) / 2.0
                }
            }
        }
    }

    /// Parses a curve name, accepting kebab-case (`in-out-quad`), the
    /// `ease-` prefix (`ease-in-out-quad`) and CamelCase (`InOutQuad`).
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = normalize_name(raw);
        let normalized = normalized.strip_prefix("ease-").unwrap_or(&normalized);
        Self::ALL
            .iter()
            .copied()
            .find(|easing| easing.as_str() == normalized)
    }
}

fn normalize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    let mut prev_lower = false;
    for ch in raw.trim().chars() {
        if ch == '_' || ch == ' ' || ch == '-' {
            if !out.ends_with('-') {
                out.push('-');
            }
            prev_lower = false;
            continue;
        }
        if ch.is_ascii_uppercase() && prev_lower && !out.ends_with('-') {
            out.push('-');
        }
        prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        out.push(ch.to_ascii_lowercase());
    }
    out.trim_matches('-').to_string()
}

fn bounce_out(t: f32) -> f32 {
    let n1 = 7.5625;
    let d1 = 2.75;

    if t < 1.0 / d1 {
        n1 * t * t
    } else if t < 2.0 / d1 {
        let t = t - 1.5 / d1;
        n1 * t * t + 0.75
    } else if t < 2.5 / d1 {
        let t = t - 2.25 / d1;
        n1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / d1;
        n1 * t * t + 0.984375
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Easing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown easing curve: {s}"))
    }
}

impl<'de> Deserialize<'de> for Easing {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).ok_or_else(|| de::Error::custom(format!("unknown easing curve: {raw}")))
    }
}

impl Serialize for Easing {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_curve_hits_both_endpoints() {
        for easing in Easing::ALL {
            assert!(easing.apply(0.0).abs() < 1e-4, "{easing} at 0");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-4, "{easing} at 1");
        }
    }

    #[test]
    fn input_is_clamped() {
        assert_eq!(Easing::Linear.apply(-0.5), 0.0);
        assert_eq!(Easing::Linear.apply(1.5), 1.0);
        assert_eq!(Easing::InOutQuad.apply(f32::NAN), 0.0);
    }

    #[test]
    fn symmetric_curves_pass_through_midpoint() {
        for easing in [
            Easing::InOutQuad,
            Easing::InOutCubic,
            Easing::InOutQuart,
            Easing::InOutQuint,
            Easing::InOutSine,
            Easing::InOutCirc,
        ] {
            assert!((easing.apply(0.5) - 0.5).abs() < 1e-3, "{easing}");
        }
    }

    #[test]
    fn non_overshooting_curves_are_monotonic() {
        let bounded = [
            Easing::Linear,
            Easing::InQuad,
            Easing::OutQuad,
            Easing::InOutCubic,
            Easing::OutQuint,
            Easing::InOutSine,
            Easing::InOutExpo,
            Easing::OutCirc,
        ];
        for easing in bounded {
            let mut last = 0.0;
            for step in 0..=100 {
                let value = easing.apply(step as f32 / 100.0);
                assert!(value + 1e-6 >= last, "{easing} dipped at step {step}");
                last = value;
            }
        }
    }

    #[test]
    fn back_curve_overshoots_below_zero() {
        assert!(Easing::InBack.apply(0.2) < 0.0);
        assert!(Easing::OutBack.apply(0.8) > 1.0);
    }

    #[test]
    fn parses_common_spellings() {
        assert_eq!(Easing::parse("in-out-quad"), Some(Easing::InOutQuad));
        assert_eq!(Easing::parse("InOutQuad"), Some(Easing::InOutQuad));
        assert_eq!(Easing::parse("ease_out_bounce"), Some(Easing::OutBounce));
        assert_eq!(Easing::parse("Linear"), Some(Easing::Linear));
        assert_eq!(Easing::parse("wobbly"), None);
    }
}
