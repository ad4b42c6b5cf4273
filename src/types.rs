//! Core types for the Calm Cycle engine
//!
//! This module defines the data structures that flow through each stage of the
//! engine: cycle records derived from marked days, statistics, predictions and
//! risk timelines. Every derived type is a plain value owned by the caller.

use crate::dates::{day_difference, to_iso_date, CalendarDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One menstrual bleeding interval.
///
/// `end_date` is absent while the cycle is ongoing. When present it is never
/// before `start_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleRecord {
    /// Stable identity, preserved across re-derivation
    pub id: String,
    /// First bleeding day
    pub start_date: CalendarDate,
    /// Last bleeding day, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<CalendarDate>,
}

impl CycleRecord {
    pub fn new(id: impl Into<String>, start_date: CalendarDate, end_date: Option<CalendarDate>) -> Self {
        Self {
            id: id.into(),
            start_date,
            end_date,
        }
    }

    /// Create a record whose id is derived from its start date.
    ///
    /// Deriving twice from the same start date yields the same id.
    pub fn from_interval(start_date: CalendarDate, end_date: CalendarDate) -> Self {
        Self {
            id: Self::id_for_start(start_date),
            start_date,
            end_date: Some(end_date),
        }
    }

    /// Deterministic id for a cycle starting on `start_date`
    pub fn id_for_start(start_date: CalendarDate) -> String {
        format!("cycle-{}", to_iso_date(start_date))
    }

    pub fn is_ongoing(&self) -> bool {
        self.end_date.is_none()
    }

    /// Inclusive number of bleeding days, if the end is known
    pub fn period_length(&self) -> Option<i64> {
        self.end_date
            .map(|end| day_difference(end, self.start_date) + 1)
    }
}

/// Menstrual flow intensity for a logged day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    Light,
    Medium,
    Heavy,
}

/// Free-form per-day log, keyed by date
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyLog {
    pub date: CalendarDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<Flow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symptoms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Whether protection was used for a logged event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protection {
    Protected,
    Unprotected,
}

/// A logged intimate-activity event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    pub id: String,
    pub date: CalendarDate,
    pub protection: Protection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl EventLog {
    /// Create an event with a freshly minted random id
    pub fn new(date: CalendarDate, protection: Protection) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            date,
            protection,
            notes: None,
        }
    }
}

/// Regularity statistics derived from a cycle history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleStats {
    /// Average start-to-start length over recent cycles (days)
    pub avg_cycle_length: i64,
    /// Average inclusive bleeding length over recent cycles (days)
    pub avg_period_length: i64,
    /// Most recent plausible cycle length (days)
    pub last_cycle_length: i64,
    /// Max minus min of the recent cycle lengths (days)
    pub cycle_variation: i64,
    pub is_irregular: bool,
}

/// One projected future cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictedCycle {
    pub start_date: CalendarDate,
    /// Earliest and latest plausible start
    pub start_date_range: (CalendarDate, CalendarDate),
    pub end_date: CalendarDate,
    pub is_late: bool,
    pub days_late: i64,
}

/// Escalation signal for an overdue period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Normal,
    Warning,
    Critical,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Normal => "normal",
            Urgency::Warning => "warning",
            Urgency::Critical => "critical",
        }
    }
}

/// Coarse position within the current cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CyclePhase {
    Menstrual,
    Follicular,
    Ovulation,
    Luteal,
}

impl CyclePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CyclePhase::Menstrual => "Menstrual",
            CyclePhase::Follicular => "Follicular",
            CyclePhase::Ovulation => "Ovulation",
            CyclePhase::Luteal => "Luteal",
        }
    }
}

/// Full forward-looking result for a cycle history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub next_cycles: Vec<PredictedCycle>,
    pub ovulation_date: CalendarDate,
    pub fertile_window_start: CalendarDate,
    pub fertile_window_end: CalendarDate,
    pub urgency: Urgency,
    pub current_phase: CyclePhase,
    pub stats: CycleStats,
}

/// Where the user stands relative to the next period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CycleStatus {
    /// The most recent cycle is still ongoing
    Current,
    Late { days_late: i64 },
    Upcoming { days_until: i64 },
}

/// Calendar rendering class for a single day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayMark {
    Period,
    PredictedCore,
    PredictedWindow,
    Unmarked,
}

/// Qualitative shape of recent cycle lengths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleTrend {
    Stable,
    Varying,
    Irregular,
}

/// One row of the per-cycle history shown in trend charts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleHistoryRow {
    pub start_date: CalendarDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_length: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_length: Option<i64>,
}

/// Pregnancy risk classification for a logged event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    High,
}

/// Why an event received its risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskReason {
    /// A period started after the event
    PeriodSinceEvent,
    Protected,
    Unprotected,
}

/// The three test-readiness stages following an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStageKind {
    EarlyTest,
    StandardTest,
    ConfirmatoryTest,
}

impl TestStageKind {
    pub const ALL: [TestStageKind; 3] = [
        TestStageKind::EarlyTest,
        TestStageKind::StandardTest,
        TestStageKind::ConfirmatoryTest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TestStageKind::EarlyTest => "earlyTest",
            TestStageKind::StandardTest => "standardTest",
            TestStageKind::ConfirmatoryTest => "confirmatoryTest",
        }
    }

    /// Qualitative detection accuracy at this stage
    pub fn accuracy_band(&self) -> &'static str {
        match self {
            TestStageKind::EarlyTest => "60-70%",
            TestStageKind::StandardTest => "90-95%",
            TestStageKind::ConfirmatoryTest => ">99%",
        }
    }
}

/// One stage of an event's test timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestStage {
    pub label: TestStageKind,
    pub date: CalendarDate,
    pub accuracy_band: String,
    pub ready: bool,
}

/// Risk classification plus timeline for one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub event_id: String,
    pub event_date: CalendarDate,
    pub risk_level: RiskLevel,
    pub reason: RiskReason,
    pub stages: Vec<TestStage>,
}
