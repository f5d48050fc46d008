/// Engine configuration.
/// Centralizes the rule constants that shape cascades, rebooking and chaos.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

// ==========================================
// Defaults
// ==========================================

/// Maximum recursion depth for one root delay trigger
pub const DEFAULT_MAX_DEPTH: u32 = 20;

/// Minimum aircraft ground time between an arrival and its next departure
pub const DEFAULT_MIN_TURNAROUND_MINUTES: i64 = 45;

/// Minimum passenger connection time between an arrival and the onward departure
pub const DEFAULT_MIN_CONNECTION_MINUTES: i64 = 30;

/// How long before departure a SCHEDULED flight starts boarding
pub const DEFAULT_BOARDING_WINDOW_MINUTES: i64 = 30;

/// Candidate flights inspected per missed connection
pub const DEFAULT_REBOOKING_CANDIDATES: usize = 3;

/// Log entries included in a world-state read
pub const DEFAULT_RECENT_DISRUPTIONS: usize = 50;

/// Random chaos delay range (inclusive)
pub const DEFAULT_CHAOS_MIN_DELAY: u32 = 15;
pub const DEFAULT_CHAOS_MAX_DELAY: u32 = 180;

/// Chance that an autonomous tick fires a random disruption
pub const DEFAULT_CHAOS_PROBABILITY: f64 = 0.1;

/// Ceiling for configured chaos delays (one week)
pub const MAX_CHAOS_DELAY_MINUTES: u32 = 7 * 24 * 60;

/// Ceiling for every configured minute threshold (one day)
pub const MAX_THRESHOLD_MINUTES: i64 = 24 * 60;

/// Rules applied by the propagation engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeRules {
    pub max_depth: u32,
    pub min_turnaround_minutes: i64,
    pub min_connection_minutes: i64,
}

impl Default for CascadeRules {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            min_turnaround_minutes: DEFAULT_MIN_TURNAROUND_MINUTES,
            min_connection_minutes: DEFAULT_MIN_CONNECTION_MINUTES,
        }
    }
}

/// Random disruption settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaosConfig {
    /// Seed for the chaos RNG; a random seed is drawn when absent
    pub seed: Option<u64>,
    pub min_delay_minutes: u32,
    pub max_delay_minutes: u32,
    /// Whether `tick` may fire random disruptions on its own
    pub autonomous: bool,
    pub probability_per_tick: f64,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            seed: None,
            min_delay_minutes: DEFAULT_CHAOS_MIN_DELAY,
            max_delay_minutes: DEFAULT_CHAOS_MAX_DELAY,
            autonomous: false,
            probability_per_tick: DEFAULT_CHAOS_PROBABILITY,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub cascade: CascadeRules,
    pub boarding_window_minutes: i64,
    pub rebooking_candidates: usize,
    pub recent_disruptions: usize,
    pub chaos: ChaosConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cascade: CascadeRules::default(),
            boarding_window_minutes: DEFAULT_BOARDING_WINDOW_MINUTES,
            rebooking_candidates: DEFAULT_REBOOKING_CANDIDATES,
            recent_disruptions: DEFAULT_RECENT_DISRUPTIONS,
            chaos: ChaosConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON config file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Builder-style seed override, mostly for tests and demos
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.chaos.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.chaos.min_delay_minutes > self.chaos.max_delay_minutes {
            return Err(EngineError::config(format!(
                "chaos delay range is inverted: {}..={}",
                self.chaos.min_delay_minutes, self.chaos.max_delay_minutes
            )));
        }
        if !(0.0..=1.0).contains(&self.chaos.probability_per_tick) {
            return Err(EngineError::config(format!(
                "probability_per_tick must be within [0, 1], got {}",
                self.chaos.probability_per_tick
            )));
        }
        if self.rebooking_candidates == 0 {
            return Err(EngineError::config("rebooking_candidates must be at least 1"));
        }
        if self.chaos.max_delay_minutes > MAX_CHAOS_DELAY_MINUTES {
            return Err(EngineError::config(format!(
                "chaos max_delay_minutes {} exceeds {MAX_CHAOS_DELAY_MINUTES}",
                self.chaos.max_delay_minutes
            )));
        }
        let thresholds = [
            ("min_turnaround_minutes", self.cascade.min_turnaround_minutes),
            ("min_connection_minutes", self.cascade.min_connection_minutes),
            ("boarding_window_minutes", self.boarding_window_minutes),
        ];
        for (name, minutes) in thresholds {
            if !(0..=MAX_THRESHOLD_MINUTES).contains(&minutes) {
                return Err(EngineError::config(format!(
                    "{name} must be within 0..={MAX_THRESHOLD_MINUTES}, got {minutes}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.cascade.max_depth, 20);
        assert_eq!(config.cascade.min_turnaround_minutes, 45);
        assert_eq!(config.cascade.min_connection_minutes, 30);
        assert_eq!(config.rebooking_candidates, 3);
        assert_eq!(config.chaos.min_delay_minutes, 15);
        assert_eq!(config.chaos.max_delay_minutes, 180);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{ "cascade": { "max_depth": 5 }, "chaos": { "seed": 7 } }"#,
        )
        .unwrap();
        assert_eq!(config.cascade.max_depth, 5);
        assert_eq!(config.cascade.min_turnaround_minutes, 45);
        assert_eq!(config.chaos.seed, Some(7));
        assert_eq!(config.boarding_window_minutes, 30);
    }

    #[test]
    fn test_rejects_inverted_range() {
        let result = EngineConfig::from_json_str(
            r#"{ "chaos": { "min_delay_minutes": 200, "max_delay_minutes": 100 } }"#,
        );
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_rejects_bad_probability() {
        let mut config = EngineConfig::default();
        config.chaos.probability_per_tick = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_oversized_minutes() {
        let mut config = EngineConfig::default();
        config.boarding_window_minutes = i64::MAX;
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));

        let mut config = EngineConfig::default();
        config.cascade.min_connection_minutes = -1;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.chaos.max_delay_minutes = u32::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "rebooking_candidates": 5 }}"#).unwrap();
        let config = EngineConfig::from_path(file.path()).unwrap();
        assert_eq!(config.rebooking_candidates, 5);
    }
}
