//! Engine configuration
//!
//! Every domain constant used by the engine lives here with its conventional
//! default. Configurations are plain serde values so callers can persist and load
//! them alongside their own settings; every field is optional in JSON.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// Default average cycle length when history is insufficient (days)
pub const DEFAULT_CYCLE_LENGTH: i64 = 28;

/// Default average period length when history is insufficient (days)
pub const DEFAULT_PERIOD_LENGTH: i64 = 5;

/// Number of recent samples kept for averaging
pub const DEFAULT_HISTORY_WINDOW: usize = 6;

/// Assumed luteal phase length used to back-calculate ovulation (days)
pub const DEFAULT_LUTEAL_PHASE_DAYS: i64 = 14;

/// How ids are carried over when cycles are re-derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reconciliation {
    /// Reuse an id only when the start date is unchanged
    #[default]
    StartDate,
    /// Fall back to the previous record with the greatest day overlap
    Overlap,
}

/// Exclusive bounds for a plausible sample: `min < value < max`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleBounds {
    pub min: i64,
    pub max: i64,
}

impl SampleBounds {
    pub fn contains(&self, value: i64) -> bool {
        value > self.min && value < self.max
    }
}

/// Inclusive upper day bounds for each phase, measured from the last start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseThresholds {
    pub menstrual_until: i64,
    pub follicular_until: i64,
    pub ovulation_until: i64,
}

impl Default for PhaseThresholds {
    fn default() -> Self {
        Self {
            menstrual_until: 5,
            follicular_until: 12,
            ovulation_until: 16,
        }
    }
}

/// Day offsets from an event to each test stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOffsets {
    pub early: i64,
    pub standard: i64,
    pub confirmatory: i64,
}

impl Default for TestOffsets {
    fn default() -> Self {
        Self {
            early: 10,
            standard: 14,
            confirmatory: 21,
        }
    }
}

/// Tunable constants for derivation, statistics, prediction and risk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub default_cycle_length: i64,
    pub default_period_length: i64,
    pub history_window: usize,
    pub cycle_length_bounds: SampleBounds,
    pub period_length_bounds: SampleBounds,
    /// Variation strictly above this marks a history irregular
    pub irregular_variation_threshold: i64,
    pub min_buffer_days: i64,
    pub prediction_horizon: usize,
    pub luteal_phase_days: i64,
    pub fertile_days_before_ovulation: i64,
    pub fertile_days_after_ovulation: i64,
    pub warning_days_late: i64,
    pub critical_days_late: i64,
    pub phase_thresholds: PhaseThresholds,
    pub test_offsets: TestOffsets,
    /// Events older than this many days are not assessed
    pub event_recency_days: i64,
    /// Ongoing cycles never expand further than this past their start
    pub ongoing_display_cap_days: i64,
    pub reconciliation: Reconciliation,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_cycle_length: DEFAULT_CYCLE_LENGTH,
            default_period_length: DEFAULT_PERIOD_LENGTH,
            history_window: DEFAULT_HISTORY_WINDOW,
            cycle_length_bounds: SampleBounds { min: 15, max: 100 },
            period_length_bounds: SampleBounds { min: 0, max: 15 },
            irregular_variation_threshold: 7,
            min_buffer_days: 2,
            prediction_horizon: 3,
            luteal_phase_days: DEFAULT_LUTEAL_PHASE_DAYS,
            fertile_days_before_ovulation: 5,
            fertile_days_after_ovulation: 1,
            warning_days_late: 1,
            critical_days_late: 7,
            phase_thresholds: PhaseThresholds::default(),
            test_offsets: TestOffsets::default(),
            event_recency_days: 45,
            ongoing_display_cap_days: 60,
            reconciliation: Reconciliation::StartDate,
        }
    }
}

impl EngineConfig {
    /// Load and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string_pretty(self).map_err(EngineError::Json)
    }

    /// Reject configurations the engine cannot compute with
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.default_cycle_length <= 0 || self.default_period_length <= 0 {
            return Err(EngineError::InvalidConfig(
                "default lengths must be positive".to_string(),
            ));
        }
        if self.history_window == 0 {
            return Err(EngineError::InvalidConfig(
                "history_window must be at least 1".to_string(),
            ));
        }
        if self.prediction_horizon == 0 {
            return Err(EngineError::InvalidConfig(
                "prediction_horizon must be at least 1".to_string(),
            ));
        }
        for (name, bounds) in [
            ("cycle_length_bounds", self.cycle_length_bounds),
            ("period_length_bounds", self.period_length_bounds),
        ] {
            if bounds.min >= bounds.max {
                return Err(EngineError::InvalidConfig(format!(
                    "{name}: min ({}) must be below max ({})",
                    bounds.min, bounds.max
                )));
            }
        }
        if self.min_buffer_days < 0 || self.luteal_phase_days < 0 {
            return Err(EngineError::InvalidConfig(
                "buffer and luteal days must not be negative".to_string(),
            ));
        }
        if self.critical_days_late < self.warning_days_late {
            return Err(EngineError::InvalidConfig(format!(
                "critical_days_late ({}) is below warning_days_late ({})",
                self.critical_days_late, self.warning_days_late
            )));
        }
        let p = self.phase_thresholds;
        if !(p.menstrual_until < p.follicular_until && p.follicular_until < p.ovulation_until) {
            return Err(EngineError::InvalidConfig(
                "phase thresholds must be strictly ascending".to_string(),
            ));
        }
        let t = self.test_offsets;
        if !(0 <= t.early && t.early < t.standard && t.standard < t.confirmatory) {
            return Err(EngineError::InvalidConfig(
                "test offsets must be non-negative and strictly ascending".to_string(),
            ));
        }
        if self.event_recency_days < 0 || self.ongoing_display_cap_days < 0 {
            return Err(EngineError::InvalidConfig(
                "day windows must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
