#![forbid(unsafe_code)]

//! Engine configuration.
//!
//! [`BarrageConfig`] gathers every tunable of the allocator and the delay
//! calculator. It can be built in code or, with the `config-file` feature,
//! loaded from TOML or JSON.
//!
//! ```toml
//! # barrage.toml
//! speed = "fast"
//! area = 60.0
//! row_height = 28.0
//! min_gap = 40.0
//! strategy = "compact"
//! ```
//!
//! ```rust,ignore
//! let config = BarrageConfig::from_toml_file("barrage.toml")?;
//! ```
//!
//! # Defaults
//!
//! `BarrageConfig::default()` is the fastest preset speed, lanes over the top
//! half of the area, 24px rows, a 50px trailing gap and sparse allocation.

#[cfg(feature = "config-file")]
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::item::Millis;

/// Transit duration presets. Lower means faster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speed {
    /// 26 seconds.
    Slower,
    /// 23 seconds.
    Slow,
    /// 20 seconds.
    Slowless,
    /// 18 seconds.
    Normal,
    /// 16 seconds.
    Fastless,
    /// 14 seconds.
    Fast,
    /// 12 seconds.
    #[default]
    Faster,
    /// Explicit transit duration in milliseconds.
    Custom(Millis),
}

impl Speed {
    /// Time for an item to cross the whole area, in milliseconds.
    #[must_use]
    pub const fn transit(self) -> Millis {
        match self {
            Self::Slower => 26_000,
            Self::Slow => 23_000,
            Self::Slowless => 20_000,
            Self::Normal => 18_000,
            Self::Fastless => 16_000,
            Self::Fast => 14_000,
            Self::Faster => 12_000,
            Self::Custom(ms) => ms,
        }
    }
}

/// How free lanes are picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStrategy {
    /// First usable lane by index; packs items towards the top.
    Compact,
    /// Empty lanes first (shuffled), then lanes whose incumbent has fully
    /// entered; spreads items out.
    #[default]
    Sparse,
}

/// How `Item::scheduled_time` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timebase {
    /// Absolute timestamps (live chat style).
    #[default]
    Online,
    /// Offsets from a playback origin (video style).
    Preset,
}

/// Tunables for lane allocation and entry timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarrageConfig {
    pub speed: Speed,
    /// Percent of the container height given to lanes.
    pub area: f64,
    /// Lane height.
    pub row_height: f64,
    /// Minimum distance kept behind the item ahead in the same lane.
    pub min_gap: f64,
    pub strategy: AllocationStrategy,
    pub timebase: Timebase,
    /// Items this close to their natural exit are dropped instead of shown.
    pub late_grace_ms: Millis,
    /// Negative delays shorter than this start immediately.
    pub clamp_window_ms: Millis,
    /// How many removed ids are remembered to reject re-delivery.
    pub tombstone_capacity: usize,
    /// Seed for sparse lane shuffling. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for BarrageConfig {
    fn default() -> Self {
        Self {
            speed: Speed::Faster,
            area: 50.0,
            row_height: 24.0,
            min_gap: 50.0,
            strategy: AllocationStrategy::Sparse,
            timebase: Timebase::Online,
            late_grace_ms: 3_000,
            clamp_window_ms: 500,
            tombstone_capacity: 4_096,
            seed: None,
        }
    }
}

impl BarrageConfig {
    /// Transit duration in milliseconds.
    #[inline]
    #[must_use]
    pub fn transit(&self) -> Millis {
        self.speed.transit()
    }

    /// Number of lanes that fit in a container of the given height.
    ///
    /// A hidden or collapsed container (height <= 0) has no lanes; any
    /// visible container has at least one.
    #[must_use]
    pub fn lane_capacity(&self, container_height: f64) -> usize {
        if !(container_height > 0.0) || !(self.row_height > 0.0) {
            return 0;
        }
        let usable = container_height * (self.area.clamp(0.0, 100.0) / 100.0);
        ((usable / self.row_height).floor() as usize).max(1)
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of validation errors; empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !(self.area > 0.0 && self.area <= 100.0) {
            errors.push(format!("area must be in (0, 100], got {}", self.area));
        }
        if !(self.row_height > 0.0) {
            errors.push(format!("row_height must be > 0, got {}", self.row_height));
        }
        if !(self.min_gap >= 0.0) {
            errors.push(format!("min_gap must be >= 0, got {}", self.min_gap));
        }

        let transit = self.transit();
        if transit <= 0 {
            errors.push(format!("speed transit must be > 0ms, got {transit}"));
        }
        if self.late_grace_ms < 0 {
            errors.push(format!(
                "late_grace_ms must be >= 0, got {}",
                self.late_grace_ms
            ));
        } else if transit > 0 && self.late_grace_ms >= transit {
            errors.push(format!(
                "late_grace_ms ({}) must be below the transit duration ({transit})",
                self.late_grace_ms
            ));
        }
        if self.clamp_window_ms < 0 {
            errors.push(format!(
                "clamp_window_ms must be >= 0, got {}",
                self.clamp_window_ms
            ));
        }
        if self.tombstone_capacity == 0 {
            errors.push("tombstone_capacity must be > 0".into());
        }

        errors
    }

    /// Return `self` if valid.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load from a TOML string.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(ConfigError::Toml)?;
        config.validated()
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config-file")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config-file")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s).map_err(ConfigError::Json)?;
        config.validated()
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config-file")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }
}

/// Errors from loading or validating a [`BarrageConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config-file")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config-file")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config-file")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config-file")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config-file")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config-file")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
