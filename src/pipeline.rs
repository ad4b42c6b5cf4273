//! Pipeline orchestration
//!
//! This module provides the public API for the Calm Cycle engine. `CycleEngine`
//! binds the four core operations to a configuration and runs the full pipeline
//! from a tracker document to a dashboard snapshot:
//! segmentation → statistics → prediction → status, trend and risk.

use crate::config::EngineConfig;
use crate::context::{AssistantContext, DailySummary};
use crate::dates::{local_today, CalendarDate};
use crate::error::EngineError;
use crate::logs::{book_from_logs, flow_implies_mark, recent_symptoms, DEFAULT_SYMPTOM_LOOKBACK_DAYS};
use crate::predictor::Predictor;
use crate::risk::RiskCalculator;
use crate::schema::TrackerInput;
use crate::segmenter::CycleSegmenter;
use crate::stats::{most_recent_first, StatsCalculator};
use crate::types::{
    CycleHistoryRow, CycleRecord, CycleStats, CycleStatus, CycleTrend, EventLog, PredictionResult,
    RiskAssessment,
};
use crate::ENGINE_VERSION;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Everything the dashboard needs for one day, computed in one pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub engine_version: String,
    /// The `today` every date-relative field was computed against
    pub computed_for: CalendarDate,
    /// Cycle records, most recent first
    pub cycles: Vec<CycleRecord>,
    pub stats: CycleStats,
    pub prediction: Option<PredictionResult>,
    pub status: Option<CycleStatus>,
    pub trend: CycleTrend,
    pub history: Vec<CycleHistoryRow>,
    /// Assessments for recent events, most recent first
    pub risk: Vec<RiskAssessment>,
    pub summary: DailySummary,
    pub assistant_context: String,
}

/// Engine bound to a configuration.
///
/// Holds no per-user state; every call is a pure function of its arguments.
#[derive(Debug, Clone, Default)]
pub struct CycleEngine {
    config: EngineConfig,
}

impl CycleEngine {
    /// Create an engine with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with a validated configuration
    pub fn with_config(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Get the active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Derive cycle records from the full mark set, most recent first.
    pub fn derive_cycles<I>(&self, marked_days: I, previous: &[CycleRecord]) -> Vec<CycleRecord>
    where
        I: IntoIterator<Item = CalendarDate>,
    {
        CycleSegmenter::new(self.config.reconciliation).derive(marked_days, previous)
    }

    /// Compute cycle statistics over the recent history window
    pub fn compute_stats(&self, cycles: &[CycleRecord]) -> CycleStats {
        StatsCalculator::new(&self.config).compute(cycles)
    }

    /// Predict upcoming cycles; `None` for an empty history
    pub fn predict(&self, cycles: &[CycleRecord], today: CalendarDate) -> Option<PredictionResult> {
        Predictor::new(&self.config).predict(cycles, today)
    }

    /// Assess pregnancy risk and test timing for one event
    pub fn assess_risk(
        &self,
        event: &EventLog,
        cycles: &[CycleRecord],
        today: CalendarDate,
    ) -> RiskAssessment {
        RiskCalculator::new(&self.config).assess(event, cycles, today)
    }

    /// Assess events within the recency window, most recent first
    pub fn assess_recent(
        &self,
        events: &[EventLog],
        cycles: &[CycleRecord],
        today: CalendarDate,
    ) -> Vec<RiskAssessment> {
        RiskCalculator::new(&self.config).assess_recent(events, cycles, today)
    }

    /// Current period status relative to the prediction
    pub fn status(
        &self,
        cycles: &[CycleRecord],
        prediction: &PredictionResult,
        today: CalendarDate,
    ) -> Option<CycleStatus> {
        Predictor::new(&self.config).status(cycles, prediction, today)
    }

    /// Cycle records for a document.
    ///
    /// With marked days present the records are re-derived, and days with a
    /// logged flow count as marked. Otherwise the stored records are used as-is.
    pub fn cycles_for(&self, input: &TrackerInput) -> Vec<CycleRecord> {
        match &input.marked_days {
            Some(marks) => {
                let mut all: BTreeSet<CalendarDate> = marks.iter().copied().collect();
                let implied: Vec<CalendarDate> = input
                    .daily_logs
                    .iter()
                    .filter(|log| flow_implies_mark(log, &all))
                    .map(|log| log.date)
                    .collect();
                if !implied.is_empty() {
                    debug!(days = implied.len(), "marking days with logged flow");
                    all.extend(implied);
                }
                self.derive_cycles(all, &input.cycles)
            }
            None => most_recent_first(&input.cycles).into_owned(),
        }
    }

    /// Run the full pipeline for one evaluation date.
    pub fn snapshot(&self, input: &TrackerInput, today: CalendarDate) -> EngineSnapshot {
        let cycles = self.cycles_for(input);

        let stats_calc = StatsCalculator::new(&self.config);
        let predictor = Predictor::new(&self.config);

        let stats = stats_calc.compute(&cycles);
        let history = stats_calc.history(&cycles, self.config.history_window);
        let trend = stats_calc.trend(&stats, &history);

        let prediction = predictor.predict(&cycles, today);
        let status = prediction
            .as_ref()
            .and_then(|p| predictor.status(&cycles, p, today));

        let risk = RiskCalculator::new(&self.config).assess_recent(&input.events, &cycles, today);

        let book = book_from_logs(input.daily_logs.iter().cloned());
        let symptoms = recent_symptoms(&book, today, DEFAULT_SYMPTOM_LOOKBACK_DAYS);
        let summary = DailySummary::compose(status, &symptoms);

        let profile = input.profile.clone().unwrap_or_default();
        let assistant_context = AssistantContext::from_prediction(&profile, prediction.as_ref()).text;

        info!(
            %today,
            cycles = cycles.len(),
            events = risk.len(),
            ?status,
            "computed snapshot"
        );

        EngineSnapshot {
            engine_version: ENGINE_VERSION.to_string(),
            computed_for: today,
            cycles,
            stats,
            prediction,
            status,
            trend,
            history,
            risk,
            summary,
            assistant_context,
        }
    }

    /// Validate a JSON document and return its snapshot as JSON.
    ///
    /// `today` wins over the document's own `today`; the local date is used when
    /// neither is set.
    pub fn snapshot_json(&self, json: &str, today: Option<CalendarDate>) -> Result<String, EngineError> {
        let input = TrackerInput::from_json(json)?;

        let issues = input.validate();
        if !issues.is_empty() {
            let messages: Vec<String> = issues
                .iter()
                .map(|issue| match issue.index {
                    Some(idx) => format!("{}[{}]: {}", issue.section, idx, issue.error),
                    None => format!("{}: {}", issue.section, issue.error),
                })
                .collect();
            return Err(EngineError::InvalidInput(messages.join("; ")));
        }

        let today = today.or(input.today).unwrap_or_else(local_today);
        let snapshot = self.snapshot(&input, today);
        serde_json::to_string(&snapshot).map_err(|e| EngineError::Encoding(e.to_string()))
    }
}

/// Compute a snapshot JSON with the default configuration.
///
/// # Example
/// ```ignore
/// let snapshot = snapshot_from_json(r#"{"marked_days": ["2024-01-01"]}"#, None)?;
/// ```
pub fn snapshot_from_json(json: &str, today: Option<CalendarDate>) -> Result<String, EngineError> {
    CycleEngine::new().snapshot_json(json, today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Reconciliation;
    use crate::types::{RiskLevel, RiskReason};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn d(s: &str) -> CalendarDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample_input_json() -> &'static str {
        r#"{
            "today": "2024-03-10",
            "profile": { "name": "Ada", "language": "en" },
            "marked_days": [
                "2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04", "2024-01-05",
                "2024-01-29", "2024-01-30", "2024-01-31", "2024-02-01", "2024-02-02",
                "2024-02-26", "2024-02-27", "2024-02-28", "2024-02-29", "2024-03-01"
            ],
            "cycles": [
                { "id": "kept-id", "start_date": "2024-01-29", "end_date": "2024-02-01" }
            ],
            "events": [
                { "id": "recent", "date": "2024-03-05", "protection": "unprotected" },
                { "id": "before-period", "date": "2024-02-10", "protection": "protected" },
                { "id": "stale", "date": "2024-01-10", "protection": "unprotected" }
            ],
            "daily_logs": [
                { "date": "2024-03-08", "symptoms": ["cramps"] }
            ]
        }"#
    }

    #[test]
    fn test_snapshot_full_pipeline() {
        let input = TrackerInput::from_json(sample_input_json()).unwrap();
        let snapshot = CycleEngine::new().snapshot(&input, d("2024-03-10"));

        let ids: Vec<&str> = snapshot.cycles.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["cycle-2024-02-26", "kept-id", "cycle-2024-01-01"]);

        assert_eq!(snapshot.stats.avg_cycle_length, 28);
        assert_eq!(snapshot.stats.avg_period_length, 5);
        assert!(!snapshot.stats.is_irregular);
        assert_eq!(snapshot.trend, CycleTrend::Stable);
        assert_eq!(snapshot.history.len(), 3);

        let prediction = snapshot.prediction.as_ref().unwrap();
        assert_eq!(prediction.next_cycles[0].start_date, d("2024-03-25"));
        assert_eq!(snapshot.status, Some(CycleStatus::Upcoming { days_until: 15 }));

        let risk: Vec<(&str, RiskLevel, RiskReason)> = snapshot
            .risk
            .iter()
            .map(|r| (r.event_id.as_str(), r.risk_level, r.reason))
            .collect();
        assert_eq!(
            risk,
            vec![
                ("recent", RiskLevel::High, RiskReason::Unprotected),
                ("before-period", RiskLevel::Low, RiskReason::PeriodSinceEvent),
            ]
        );

        assert_eq!(
            snapshot.summary,
            DailySummary::SymptomCare {
                symptom: "cramps".to_string()
            }
        );
        assert!(snapshot.assistant_context.starts_with("User Profile: Name: Ada"));
    }

    #[test]
    fn test_snapshot_uses_stored_cycles_without_marks() {
        let input = TrackerInput {
            cycles: vec![
                CycleRecord::from_interval(d("2024-01-01"), d("2024-01-05")),
                CycleRecord::from_interval(d("2024-01-29"), d("2024-02-02")),
            ],
            ..Default::default()
        };
        let snapshot = CycleEngine::new().snapshot(&input, d("2024-02-10"));
        assert_eq!(snapshot.cycles[0].start_date, d("2024-01-29"));
        assert_eq!(snapshot.computed_for, d("2024-02-10"));
    }

    #[test]
    fn test_logged_flow_marks_day() {
        let input = TrackerInput::from_json(
            r#"{
                "marked_days": ["2024-01-01", "2024-01-02"],
                "daily_logs": [{ "date": "2024-01-03", "flow": "light" }]
            }"#,
        )
        .unwrap();
        let cycles = CycleEngine::new().cycles_for(&input);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].end_date, Some(d("2024-01-03")));
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = CycleEngine::new().snapshot(&TrackerInput::default(), d("2024-01-01"));
        assert!(snapshot.cycles.is_empty());
        assert!(snapshot.prediction.is_none());
        assert!(snapshot.status.is_none());
        assert_eq!(snapshot.stats.avg_cycle_length, 28);
        assert_eq!(snapshot.summary, DailySummary::NoData);
    }

    #[test]
    fn test_snapshot_json_today_precedence() {
        let pinned = snapshot_from_json(sample_input_json(), Some(d("2024-03-12"))).unwrap();
        let value: serde_json::Value = serde_json::from_str(&pinned).unwrap();
        assert_eq!(value["computed_for"], "2024-03-12");

        let from_doc = snapshot_from_json(sample_input_json(), None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&from_doc).unwrap();
        assert_eq!(value["computed_for"], "2024-03-10");
        assert_eq!(value["engine_version"], ENGINE_VERSION);
        assert_eq!(value["status"]["status"], "upcoming");
    }

    #[test]
    fn test_snapshot_json_rejects_invalid_document() {
        let json = r#"{"cycles": [
            {"id": "a", "start_date": "2024-01-05", "end_date": "2024-01-01"}
        ]}"#;
        let err = snapshot_from_json(json, Some(d("2024-02-01"))).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(ref msg) if msg.starts_with("cycles[0]")));

        assert!(matches!(
            snapshot_from_json("not json", None),
            Err(EngineError::Json(_))
        ));
    }

    #[test]
    fn test_engine_rejects_invalid_config() {
        let config = EngineConfig {
            prediction_horizon: 0,
            ..Default::default()
        };
        assert!(CycleEngine::with_config(config).is_err());
    }

    #[test]
    fn test_engine_uses_configured_reconciliation() {
        let config = EngineConfig {
            reconciliation: Reconciliation::Overlap,
            ..Default::default()
        };
        let engine = CycleEngine::with_config(config).unwrap();
        let previous = vec![CycleRecord::new("keep", d("2024-01-01"), Some(d("2024-01-05")))];
        let marks = (2..=5).map(|day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap());
        let cycles = engine.derive_cycles(marks, &previous);
        assert_eq!(cycles[0].id, "keep");
        assert_eq!(cycles[0].start_date, d("2024-01-02"));
    }
}
