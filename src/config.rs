//! Configuration for the engine and its predictor tables.
//!
//! Every structure deserializes from JSON with all fields optional; missing
//! fields take the values in [defaults]. Call [EngineConfig::validate] (or
//! load with [EngineConfig::from_json_file], which does it for you) before
//! building anything.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::watch::WatchTag;

/// Baseline table geometry and confidence bounds.
pub mod defaults {
    /// Sets in the single-stride table.
    pub const SS_NUM_SETS: usize = 256;
    /// Ways per set in the single-stride table.
    pub const SS_NUM_WAYS: usize = 4;
    /// Confidence after the first stride is learned.
    pub const SS_CONF_MIN: u8 = 2;
    /// Confidence needed to speculate.
    pub const SS_CONF_THD: u8 = 4;
    /// Saturation point.
    pub const SS_CONF_MAX: u8 = 7;

    pub const FMS_NUM_SETS: usize = 64;
    pub const FMS_NUM_WAYS: usize = 2;
    pub const FMS_MAX_MULTI_STRIDE: usize = 2;
    pub const FMS_CONF_MIN: u8 = 1;
    pub const FMS_CONF_THD: u8 = 3;
    pub const FMS_CONF_MAX: u8 = 7;

    /// Instruction followed by the pattern recorder when nothing is configured.
    pub const PATTERN_WATCH: &str = "0xffff00000844f73c.0";
}

/// Bounds for a saturating confidence counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct ConfidenceConfig {
    /// Lower bound once trained
    pub min: u8,
    /// Speculation threshold
    pub thd: u8,
    /// Upper bound
    pub max: u8,
}
impl ConfidenceConfig {
    /// Check `floor <= min < thd <= max`.
    pub fn validate(&self, floor: u8) -> Result<(), ConfigError> {
        if floor <= self.min && self.min < self.thd && self.thd <= self.max {
            Ok(())
        } else {
            Err(ConfigError::BadConfidence {
                floor, min: self.min, thd: self.thd, max: self.max,
            })
        }
    }
}

fn validate_geometry(num_sets: usize, num_ways: usize)
    -> Result<(), ConfigError>
{
    if num_sets == 0 || !num_sets.is_power_of_two() {
        return Err(ConfigError::BadSetCount(num_sets));
    }
    if num_ways == 0 {
        return Err(ConfigError::ZeroWays);
    }
    Ok(())
}

/// Configuration for a [SingleStridePredictor](crate::SingleStridePredictor).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SingleStrideConfig {
    /// Number of sets (power of two)
    pub num_sets: usize,

    /// Number of ways in each set
    pub num_ways: usize,

    /// Confidence bounds; `min` must be at least 2 since a confidence of 1
    /// marks an entry that has only seen one value
    pub conf: ConfidenceConfig,
}
impl Default for SingleStrideConfig {
    fn default() -> Self {
        Self {
            num_sets: defaults::SS_NUM_SETS,
            num_ways: defaults::SS_NUM_WAYS,
            conf: ConfidenceConfig {
                min: defaults::SS_CONF_MIN,
                thd: defaults::SS_CONF_THD,
                max: defaults::SS_CONF_MAX,
            },
        }
    }
}
impl SingleStrideConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_geometry(self.num_sets, self.num_ways)?;
        self.conf.validate(2)
    }
}

/// Configuration for a
/// [FuzzyMultiStridePredictor](crate::FuzzyMultiStridePredictor).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FuzzyMultiStrideConfig {
    /// Register the predictor with the engine
    pub enabled: bool,

    pub num_sets: usize,
    pub num_ways: usize,

    /// Each entry has room for twice this many candidate strides
    pub max_multi_stride: usize,

    pub conf: ConfidenceConfig,
}
impl Default for FuzzyMultiStrideConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            num_sets: defaults::FMS_NUM_SETS,
            num_ways: defaults::FMS_NUM_WAYS,
            max_multi_stride: defaults::FMS_MAX_MULTI_STRIDE,
            conf: ConfidenceConfig {
                min: defaults::FMS_CONF_MIN,
                thd: defaults::FMS_CONF_THD,
                max: defaults::FMS_CONF_MAX,
            },
        }
    }
}
impl FuzzyMultiStrideConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_geometry(self.num_sets, self.num_ways)?;
        if self.max_multi_stride == 0 {
            return Err(ConfigError::ZeroMultiStride);
        }
        self.conf.validate(1)
    }

    /// Number of candidate stride slots in each entry.
    pub fn stride_count(&self) -> usize { 2 * self.max_multi_stride }
}

/// Top-level configuration for an [Engine](crate::Engine).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub single_stride: SingleStrideConfig,
    pub fuzzy_multi_stride: FuzzyMultiStrideConfig,

    /// Instruction (`0x<pc>.<piece>`) whose table entries are traced
    pub watch: Option<String>,

    /// Instruction whose retired values are recorded for the pattern dump
    pub pattern_watch: Option<String>,

    /// Collect per-instruction statistics for the end-of-run report
    pub analysis: bool,
}
impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            single_stride: SingleStrideConfig::default(),
            fuzzy_multi_stride: FuzzyMultiStrideConfig::default(),
            watch: None,
            pattern_watch: Some(defaults::PATTERN_WATCH.to_string()),
            analysis: true,
        }
    }
}
impl EngineConfig {
    /// Parse a configuration from a JSON string and validate it.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read a configuration from a JSON file and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path)?;
        Self::from_json_str(&s)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.single_stride.validate()?;
        self.fuzzy_multi_stride.validate()?;
        self.watch_tag()?;
        self.pattern_watch_tag()?;
        Ok(())
    }

    /// The parsed [EngineConfig::watch] tag.
    pub fn watch_tag(&self) -> Result<Option<WatchTag>, ConfigError> {
        self.watch.as_deref().map(WatchTag::parse).transpose()
    }

    /// The parsed [EngineConfig::pattern_watch] tag.
    pub fn pattern_watch_tag(&self) -> Result<Option<WatchTag>, ConfigError> {
        self.pattern_watch.as_deref().map(WatchTag::parse).transpose()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg = EngineConfig::from_json_str(
            r#"{ "single_stride": { "num_sets": 16 }, "watch": "0x1000.0" }"#
        ).unwrap();
        assert_eq!(cfg.single_stride.num_sets, 16);
        assert_eq!(cfg.single_stride.num_ways, defaults::SS_NUM_WAYS);
        assert_eq!(cfg.watch_tag().unwrap(), Some(WatchTag::new(0x1000, 0)));
    }

    #[test]
    fn rejects_bad_geometry() {
        let mut cfg = SingleStrideConfig::default();
        cfg.num_sets = 12;
        assert!(matches!(cfg.validate(), Err(ConfigError::BadSetCount(12))));
        cfg.num_sets = 16;
        cfg.num_ways = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroWays)));
    }

    #[test]
    fn single_stride_min_must_leave_room_for_first_seen() {
        let mut cfg = SingleStrideConfig::default();
        cfg.conf = ConfidenceConfig { min: 1, thd: 3, max: 4 };
        assert!(matches!(cfg.validate(),
            Err(ConfigError::BadConfidence { floor: 2, .. })));
    }

    #[test]
    fn rejects_bad_json() {
        assert!(matches!(EngineConfig::from_json_str("{ nope"),
            Err(ConfigError::Parse(_))));
        assert!(matches!(EngineConfig::from_json_str(r#"{"watch": "1000"}"#),
            Err(ConfigError::BadWatchTag(_))));
    }
}
