use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_yaml::{Mapping, Value as YamlValue};
use tracing::debug;

use crate::easing::Easing;
use crate::error::TransitionError;

/// Names that older configurations may still carry. They resolve to crossfade.
pub const RETIRED_EFFECTS: &[&str] = &[
    "ripple",
    "warp-dissolve",
    "blob-merge",
    "block-spins",
    "curtain-call",
];

pub const RANDOM: &str = "random";

/// Lower-cases and hyphenates an effect or option name.
pub fn normalize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.trim().chars() {
        let ch = match ch {
            ' ' | '_' | '-' => '-',
            other => other.to_ascii_lowercase(),
        };
        if ch == '-' && (out.is_empty() || out.ends_with('-')) {
            continue;
        }
        out.push(ch);
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EffectKind {
    Crossfade,
    Slide,
    Wipe,
    Diffuse,
    BlockFlip,
    Blinds,
    Shuffle,
    Raindrops,
    ClawMarks,
    Crumble,
    Particle,
    Burn,
}

impl EffectKind {
    pub const ALL: &'static [Self] = &[
        Self::Crossfade,
        Self::Slide,
        Self::Wipe,
        Self::Diffuse,
        Self::BlockFlip,
        Self::Blinds,
        Self::Shuffle,
        Self::Raindrops,
        Self::ClawMarks,
        Self::Crumble,
        Self::Particle,
        Self::Burn,
    ];
    pub const NAMES: &'static [&'static str] = &[
        "crossfade",
        "slide",
        "wipe",
        "diffuse",
        "block-flip",
        "blinds",
        "shuffle",
        "raindrops",
        "claw-marks",
        "crumble",
        "particle",
        "burn",
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Crossfade => "crossfade",
            Self::Slide => "slide",
            Self::Wipe => "wipe",
            Self::Diffuse => "diffuse",
            Self::BlockFlip => "block-flip",
            Self::Blinds => "blinds",
            Self::Shuffle => "shuffle",
            Self::Raindrops => "raindrops",
            Self::ClawMarks => "claw-marks",
            Self::Crumble => "crumble",
            Self::Particle => "particle",
            Self::Burn => "burn",
        }
    }

    /// Effects that only exist as compositor shaders.
    pub fn is_gpu_only(&self) -> bool {
        matches!(self, Self::Crumble | Self::Particle | Self::Burn)
    }

    /// Effects whose direction option takes part in non-repeating selection.
    pub fn has_direction(&self) -> bool {
        matches!(
            self,
            Self::Slide
                | Self::Wipe
                | Self::BlockFlip
                | Self::Blinds
                | Self::Shuffle
                | Self::Particle
                | Self::Burn
        )
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let name = normalize_name(raw);
        let name = match name.as_str() {
            "fade" | "cross-fade" => "crossfade",
            "blockflip" | "block-flips" => "block-flip",
            "claws" | "clawmarks" => "claw-marks",
            "rain" | "raindrop" => "raindrops",
            other => other,
        };
        Self::ALL.iter().copied().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EffectKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).ok_or_else(|| de::Error::unknown_variant(&raw, Self::NAMES))
    }
}

impl Serialize for EffectKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// The `effect:` setting: a concrete effect, random selection, or a retired name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EffectRequest {
    #[default]
    Random,
    Named(EffectKind),
    Retired(String),
}

impl EffectRequest {
    pub fn parse(raw: &str) -> Option<Self> {
        let name = normalize_name(raw);
        if name == RANDOM {
            return Some(Self::Random);
        }
        if let Some(kind) = EffectKind::parse(&name) {
            return Some(Self::Named(kind));
        }
        RETIRED_EFFECTS
            .iter()
            .find(|retired| **retired == name)
            .map(|retired| Self::Retired((*retired).to_string()))
    }
}

impl FromStr for EffectRequest {
    type Err = TransitionError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw).ok_or_else(|| TransitionError::UnknownEffect(raw.trim().to_string()))
    }
}

impl<'de> Deserialize<'de> for EffectRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).ok_or_else(|| de::Error::unknown_variant(&raw, EffectKind::NAMES))
    }
}

/// Raw per-effect parameter bag, keyed by effect name.
///
/// Values stay as YAML until an effect is resolved, so a malformed entry only
/// affects the parameter it belongs to.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct EffectOptions(Mapping);

impl EffectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` for `kind`, creating the effect's table on first use.
    pub fn set(&mut self, kind: EffectKind, key: &str, value: impl Into<YamlValue>) -> &mut Self {
        let table_key = YamlValue::String(kind.as_str().to_string());
        if !matches!(self.0.get(&table_key), Some(YamlValue::Mapping(_))) {
            self.0
                .insert(table_key.clone(), YamlValue::Mapping(Mapping::new()));
        }
        if let Some(YamlValue::Mapping(table)) = self.0.get_mut(&table_key) {
            table.insert(YamlValue::String(key.to_string()), value.into());
        }
        self
    }

    pub fn for_effect(&self, kind: EffectKind) -> ParamBag<'_> {
        let table = self.0.iter().find_map(|(k, v)| match (k, v) {
            (YamlValue::String(name), YamlValue::Mapping(table))
                if EffectKind::parse(name) == Some(kind) =>
            {
                Some(table)
            }
            _ => None,
        });
        ParamBag { kind, table }
    }
}

/// Typed, forgiving view of one effect's parameters.
///
/// Every accessor returns the supplied default when the key is absent or its
/// value has the wrong shape.
#[derive(Debug, Clone, Copy)]
pub struct ParamBag<'a> {
    kind: EffectKind,
    table: Option<&'a Mapping>,
}

impl<'a> ParamBag<'a> {
    pub fn empty(kind: EffectKind) -> Self {
        Self { kind, table: None }
    }

    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    fn raw(&self, key: &str) -> Option<&'a YamlValue> {
        let table = self.table?;
        table.iter().find_map(|(k, v)| match k {
            YamlValue::String(name) if normalize_name(name) == key => Some(v),
            _ => None,
        })
    }

    fn degrade<T: fmt::Debug>(&self, key: &str, value: &YamlValue, default: T) -> T {
        debug!(
            effect = %self.kind,
            key,
            value = ?value,
            default = ?default,
            "transition_param_default"
        );
        default
    }

    fn number(value: &YamlValue) -> Option<f64> {
        let parsed = match value {
            YamlValue::Number(n) => n.as_f64(),
            YamlValue::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed.filter(|v| v.is_finite())
    }

    pub fn u32(&self, key: &str, default: u32) -> u32 {
        let Some(value) = self.raw(key) else {
            return default;
        };
        match Self::number(value) {
            Some(v) if v >= 0.0 && v <= u32::MAX as f64 => v.round() as u32,
            _ => self.degrade(key, value, default),
        }
    }

    /// Element count limited to `range`. Out-of-range values are pulled to the
    /// nearest bound.
    pub fn count(&self, key: &str, default: u32, range: RangeInclusive<u32>) -> u32 {
        let value = self.u32(key, default);
        let clamped = value.clamp(*range.start(), *range.end());
        if clamped != value {
            debug!(
                effect = %self.kind,
                key,
                value,
                clamped,
                "transition_param_clamped"
            );
        }
        clamped
    }

    pub fn f32(&self, key: &str, default: f32) -> f32 {
        let Some(value) = self.raw(key) else {
            return default;
        };
        match Self::number(value) {
            Some(v) => v as f32,
            None => self.degrade(key, value, default),
        }
    }

    pub fn bool(&self, key: &str, default: bool) -> bool {
        let Some(value) = self.raw(key) else {
            return default;
        };
        match value {
            YamlValue::Bool(b) => *b,
            YamlValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => true,
                "false" | "no" | "off" | "0" => false,
                _ => self.degrade(key, value, default),
            },
            _ => self.degrade(key, value, default),
        }
    }

    pub fn string(&self, key: &str) -> Option<&'a str> {
        match self.raw(key)? {
            YamlValue::String(s) => Some(s.as_str()),
            other => {
                debug!(effect = %self.kind, key, value = ?other, "transition_param_ignored");
                None
            }
        }
    }

    /// Named option parsed with `parse`, e.g. a diffuse shape.
    pub fn choice<T: fmt::Debug>(
        &self,
        key: &str,
        default: T,
        parse: impl FnOnce(&str) -> Option<T>,
    ) -> T {
        let Some(value) = self.raw(key) else {
            return default;
        };
        match value {
            YamlValue::String(s) => match parse(s) {
                Some(v) => v,
                None => self.degrade(key, value, default),
            },
            _ => self.degrade(key, value, default),
        }
    }

    pub fn millis(&self, key: &str, default: Duration) -> Duration {
        let ms = self.u32(key, default.as_millis().min(u32::MAX as u128) as u32);
        Duration::from_millis(ms as u64)
    }

    pub fn easing(&self, key: &str, default: Easing) -> Easing {
        let Some(value) = self.raw(key) else {
            return default;
        };
        match value {
            YamlValue::String(s) => match Easing::parse(s) {
                Some(e) => e,
                None => self.degrade(key, value, default),
            },
            _ => self.degrade(key, value, default),
        }
    }

    pub fn rgb(&self, key: &str, default: [u8; 3]) -> [u8; 3] {
        let Some(value) = self.raw(key) else {
            return default;
        };
        let parsed = match value {
            YamlValue::Sequence(items) if items.len() == 3 => {
                let mut out = [0u8; 3];
                let mut ok = true;
                for (slot, item) in out.iter_mut().zip(items) {
                    match Self::number(item) {
                        Some(v) if (0.0..=255.0).contains(&v) => *slot = v.round() as u8,
                        _ => ok = false,
                    }
                }
                ok.then_some(out)
            }
            YamlValue::String(s) => parse_hex_color(s),
            _ => None,
        };
        match parsed {
            Some(rgb) => rgb,
            None => self.degrade(key, value, default),
        }
    }
}

fn parse_hex_color(raw: &str) -> Option<[u8; 3]> {
    let hex = raw.trim().strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// Memory for non-repeating random choices, persisted by the host between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RandomMemory {
    pub last_effect: Option<EffectKind>,
    pub last_directions: BTreeMap<EffectKind, String>,
}

impl RandomMemory {
    pub fn to_yaml_string(&self) -> Result<String, TransitionError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, TransitionError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Reads memory written by [`RandomMemory::save`]. A missing file is an
    /// empty memory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TransitionError> {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(raw) => Self::from_yaml_str(&raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TransitionError> {
        std::fs::write(path, self.to_yaml_string()?)?;
        Ok(())
    }

    pub fn last_direction(&self, kind: EffectKind) -> Option<&str> {
        self.last_directions.get(&kind).map(String::as_str)
    }
}

pub const MIN_DURATION: Duration = Duration::from_millis(50);
pub const MAX_DURATION: Duration = Duration::from_secs(60);
pub const MAX_FPS: u32 = 240;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct TransitionSettings {
    /// Concrete effect name, `random`, or a retired name.
    pub effect: EffectRequest,
    /// Re-roll the effect (and ignore direction memory) on every transition.
    pub random_always: bool,
    /// Drive effects through the shared GPU compositor when it is available.
    pub hardware_acceleration: bool,
    /// Declared duration of one transition.
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    pub target_fps: u32,
    /// Frame-rate cap applied when an effect runs on the software backend.
    pub software_fps_cap: Option<u32>,
    /// Candidate pool for random selection.
    pub enabled: Vec<EffectKind>,
    /// Replacement for GPU-only effects when acceleration is unavailable.
    pub software_fallbacks: BTreeMap<EffectKind, EffectKind>,
    /// Per-effect parameter bag.
    pub options: EffectOptions,
    pub memory: RandomMemory,
}

impl Default for TransitionSettings {
    fn default() -> Self {
        Self {
            effect: EffectRequest::Random,
            random_always: false,
            hardware_acceleration: true,
            duration: Duration::from_millis(1200),
            target_fps: 60,
            software_fps_cap: Some(30),
            enabled: EffectKind::ALL.to_vec(),
            software_fallbacks: default_software_fallbacks(),
            options: EffectOptions::default(),
            memory: RandomMemory::default(),
        }
    }
}

pub fn default_software_fallbacks() -> BTreeMap<EffectKind, EffectKind> {
    EffectKind::ALL
        .iter()
        .filter(|k| k.is_gpu_only())
        .map(|k| (*k, EffectKind::Crossfade))
        .collect()
}

impl TransitionSettings {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml_str(&s).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let settings: Self = serde_yaml::from_str(raw)?;
        settings.validated()
    }

    /// Validate invariants that serde defaults cannot express, clamping
    /// out-of-range timing values.
    pub fn validated(mut self) -> Result<Self> {
        ensure!(
            !self.enabled.is_empty(),
            "enabled must list at least one effect"
        );
        let mut seen = Vec::with_capacity(self.enabled.len());
        self.enabled.retain(|k| {
            let fresh = !seen.contains(k);
            seen.push(*k);
            fresh
        });
        for (from, to) in &self.software_fallbacks {
            ensure!(
                !to.is_gpu_only(),
                "software-fallbacks maps {from} to {to}, which also needs the compositor"
            );
        }
        for kind in EffectKind::ALL.iter().filter(|k| k.is_gpu_only()) {
            self.software_fallbacks
                .entry(*kind)
                .or_insert(EffectKind::Crossfade);
        }
        self.target_fps = self.target_fps.clamp(1, MAX_FPS);
        self.software_fps_cap = self.software_fps_cap.map(|cap| cap.clamp(1, MAX_FPS));
        self.duration = self.duration.clamp(MIN_DURATION, MAX_DURATION);
        Ok(self)
    }

    pub fn params(&self, kind: EffectKind) -> ParamBag<'_> {
        self.options.for_effect(kind)
    }

    pub fn software_fallback(&self, kind: EffectKind) -> EffectKind {
        if !kind.is_gpu_only() {
            return kind;
        }
        self.software_fallbacks
            .get(&kind)
            .copied()
            .filter(|k| !k.is_gpu_only())
            .unwrap_or(EffectKind::Crossfade)
    }
}
