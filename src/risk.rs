//! Test-timing risk assessment
//!
//! For a logged event, classifies pregnancy risk from protection status and
//! whether a period has started since, then lays out the three test stages with
//! their readiness relative to `today`.

use crate::config::EngineConfig;
use crate::dates::{add_days, day_difference, CalendarDate};
use crate::types::{
    CycleRecord, EventLog, Protection, RiskAssessment, RiskLevel, RiskReason, TestStage,
    TestStageKind,
};
use tracing::debug;

/// Risk calculator bound to a configuration
#[derive(Debug, Clone, Copy)]
pub struct RiskCalculator<'a> {
    config: &'a EngineConfig,
}

impl<'a> RiskCalculator<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Assess a single event against the cycle history.
    pub fn assess(
        &self,
        event: &EventLog,
        cycles: &[CycleRecord],
        today: CalendarDate,
    ) -> RiskAssessment {
        let (risk_level, reason) = classify(event, cycles);

        let stages = TestStageKind::ALL
            .iter()
            .map(|&kind| {
                let date = add_days(event.date, self.offset(kind));
                TestStage {
                    label: kind,
                    date,
                    accuracy_band: kind.accuracy_band().to_string(),
                    ready: day_difference(today, date) >= 0,
                }
            })
            .collect();

        debug!(event_id = %event.id, ?risk_level, ?reason, "assessed event risk");

        RiskAssessment {
            event_id: event.id.clone(),
            event_date: event.date,
            risk_level,
            reason,
            stages,
        }
    }

    /// Events within the recency window, most recent first
    pub fn recent_events<'e>(&self, events: &'e [EventLog], today: CalendarDate) -> Vec<&'e EventLog> {
        let mut recent: Vec<&EventLog> = events
            .iter()
            .filter(|e| day_difference(today, e.date) <= self.config.event_recency_days)
            .collect();
        recent.sort_by(|a, b| b.date.cmp(&a.date));
        recent
    }

    /// Assess every recent event, most recent first
    pub fn assess_recent(
        &self,
        events: &[EventLog],
        cycles: &[CycleRecord],
        today: CalendarDate,
    ) -> Vec<RiskAssessment> {
        self.recent_events(events, today)
            .into_iter()
            .map(|event| self.assess(event, cycles, today))
            .collect()
    }

    fn offset(&self, kind: TestStageKind) -> i64 {
        let offsets = self.config.test_offsets;
        match kind {
            TestStageKind::EarlyTest => offsets.early,
            TestStageKind::StandardTest => offsets.standard,
            TestStageKind::ConfirmatoryTest => offsets.confirmatory,
        }
    }
}

/// A period since the event takes precedence over protection for the reason.
fn classify(event: &EventLog, cycles: &[CycleRecord]) -> (RiskLevel, RiskReason) {
    if cycles.iter().any(|c| c.start_date > event.date) {
        (RiskLevel::Low, RiskReason::PeriodSinceEvent)
    } else if event.protection == Protection::Protected {
        (RiskLevel::Low, RiskReason::Protected)
    } else {
        (RiskLevel::High, RiskReason::Unprotected)
    }
}

/// Assess an event with the default configuration.
pub fn assess_risk(event: &EventLog, cycles: &[CycleRecord], today: CalendarDate) -> RiskAssessment {
    RiskCalculator::new(&EngineConfig::default()).assess(event, cycles, today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn d(s: &str) -> CalendarDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn event(id: &str, date: &str, protection: Protection) -> EventLog {
        EventLog {
            id: id.to_string(),
            date: d(date),
            protection,
            notes: None,
        }
    }

    #[test]
    fn test_unprotected_without_period_is_high() {
        let cycles = vec![CycleRecord::from_interval(d("2024-01-01"), d("2024-01-05"))];
        let result = assess_risk(&event("e", "2024-01-15", Protection::Unprotected), &cycles, d("2024-01-20"));
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.reason, RiskReason::Unprotected);
    }

    #[test]
    fn test_period_since_event_is_low_regardless_of_protection() {
        let cycles = vec![
            CycleRecord::from_interval(d("2024-02-10"), d("2024-02-14")),
            CycleRecord::from_interval(d("2024-01-01"), d("2024-01-05")),
        ];
        for protection in [Protection::Unprotected, Protection::Protected] {
            let result = assess_risk(&event("e", "2024-01-15", protection), &cycles, d("2024-02-20"));
            assert_eq!(result.risk_level, RiskLevel::Low);
            assert_eq!(result.reason, RiskReason::PeriodSinceEvent);
        }
    }

    #[test]
    fn test_period_on_event_day_does_not_count() {
        let cycles = vec![CycleRecord::from_interval(d("2024-01-15"), d("2024-01-19"))];
        let result = assess_risk(&event("e", "2024-01-15", Protection::Unprotected), &cycles, d("2024-01-20"));
        assert_eq!(result.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_protected_is_low() {
        let result = assess_risk(&event("e", "2024-01-15", Protection::Protected), &[], d("2024-01-20"));
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert_eq!(result.reason, RiskReason::Protected);
    }

    #[test]
    fn test_timeline_readiness() {
        let today = d("2024-03-16");
        let result = assess_risk(&event("e", "2024-03-01", Protection::Unprotected), &[], today);

        let labels: Vec<TestStageKind> = result.stages.iter().map(|s| s.label).collect();
        assert_eq!(labels, TestStageKind::ALL.to_vec());

        let dates: Vec<CalendarDate> = result.stages.iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![d("2024-03-11"), d("2024-03-15"), d("2024-03-22")]);

        let ready: Vec<bool> = result.stages.iter().map(|s| s.ready).collect();
        assert_eq!(ready, vec![true, true, false]);

        assert_eq!(result.stages[0].accuracy_band, "60-70%");
        assert_eq!(result.stages[2].accuracy_band, ">99%");
    }

    #[test]
    fn test_stage_ready_on_its_own_date() {
        let result = assess_risk(&event("e", "2024-03-01", Protection::Unprotected), &[], d("2024-03-11"));
        assert!(result.stages[0].ready);
        assert!(!result.stages[1].ready);
    }

    #[test]
    fn test_recent_events_window_and_order() {
        let config = EngineConfig::default();
        let calc = RiskCalculator::new(&config);
        let events = vec![
            event("old", "2024-01-01", Protection::Unprotected),
            event("edge", "2024-02-01", Protection::Unprotected),
            event("new", "2024-03-10", Protection::Protected),
        ];
        // 2024-03-17 minus 45 days is 2024-02-01
        let recent = calc.recent_events(&events, d("2024-03-17"));
        let ids: Vec<&str> = recent.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "edge"]);

        let assessments = calc.assess_recent(&events, &[], d("2024-03-17"));
        assert_eq!(assessments.len(), 2);
        assert_eq!(assessments[0].event_id, "new");
    }
}
