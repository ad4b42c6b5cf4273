//! Cycle prediction
//!
//! Projects future cycle start windows from the rolling statistics and the most
//! recent start date, flags lateness, estimates the fertile window and classifies
//! the current phase. `today` is always supplied by the caller.

use crate::config::EngineConfig;
use crate::dates::{add_days, day_difference, CalendarDate};
use crate::stats::{most_recent_first, StatsCalculator};
use crate::types::{
    CycleRecord, CyclePhase, CycleStatus, DayMark, PredictedCycle, PredictionResult, Urgency,
};
use tracing::debug;

/// Predictor bound to a configuration
#[derive(Debug, Clone, Copy)]
pub struct Predictor<'a> {
    config: &'a EngineConfig,
}

impl<'a> Predictor<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Predict upcoming cycles. Returns `None` for an empty history.
    pub fn predict(&self, cycles: &[CycleRecord], today: CalendarDate) -> Option<PredictionResult> {
        let cfg = self.config;
        let cycles = most_recent_first(cycles);
        let last_start = cycles.first()?.start_date;

        let stats = StatsCalculator::new(cfg).compute(&cycles);

        // Half-width of each start window, never narrower than the minimum
        let buffer_days = cfg.min_buffer_days.max(ceil_half(stats.cycle_variation));

        let mut next_cycles = Vec::with_capacity(cfg.prediction_horizon);
        let mut base = last_start;
        for i in 0..cfg.prediction_horizon {
            let start_date = add_days(base, stats.avg_cycle_length);
            let range_start = add_days(start_date, -buffer_days);
            let range_end = add_days(start_date, buffer_days);
            let end_date = add_days(start_date, stats.avg_period_length - 1);

            let (is_late, days_late) = if i == 0 && today > range_end {
                (true, day_difference(today, start_date))
            } else {
                (false, 0)
            };

            next_cycles.push(PredictedCycle {
                start_date,
                start_date_range: (range_start, range_end),
                end_date,
                is_late,
                days_late,
            });
            base = start_date;
        }

        let follicular_days = stats.avg_cycle_length - cfg.luteal_phase_days;
        let ovulation_date = add_days(last_start, follicular_days);
        let fertile_window_start = add_days(ovulation_date, -cfg.fertile_days_before_ovulation);
        let fertile_window_end = add_days(ovulation_date, cfg.fertile_days_after_ovulation);

        let days_late = next_cycles.first().map_or(0, |c| c.days_late);
        let urgency = self.urgency(days_late);
        let current_phase = self.classify_phase(day_difference(today, last_start));

        debug!(
            %last_start,
            %today,
            buffer_days,
            days_late,
            ?urgency,
            ?current_phase,
            "predicted cycles"
        );

        Some(PredictionResult {
            next_cycles,
            ovulation_date,
            fertile_window_start,
            fertile_window_end,
            urgency,
            current_phase,
            stats,
        })
    }

    /// Escalation level for a number of days overdue
    pub fn urgency(&self, days_late: i64) -> Urgency {
        if days_late >= self.config.critical_days_late {
            Urgency::Critical
        } else if days_late >= self.config.warning_days_late {
            Urgency::Warning
        } else {
            Urgency::Normal
        }
    }

    /// Phase from days since the last start.
    ///
    /// Thresholds are fixed day counts and do not scale with cycle length.
    pub fn classify_phase(&self, days_since_start: i64) -> CyclePhase {
        let t = self.config.phase_thresholds;
        if days_since_start <= t.menstrual_until {
            CyclePhase::Menstrual
        } else if days_since_start <= t.follicular_until {
            CyclePhase::Follicular
        } else if days_since_start <= t.ovulation_until {
            CyclePhase::Ovulation
        } else {
            CyclePhase::Luteal
        }
    }

    /// Where `today` stands relative to the next expected period
    pub fn status(
        &self,
        cycles: &[CycleRecord],
        prediction: &PredictionResult,
        today: CalendarDate,
    ) -> Option<CycleStatus> {
        let cycles = most_recent_first(cycles);
        let latest = cycles.first()?;
        let next = prediction.next_cycles.first()?;

        let status = if latest.is_ongoing() {
            CycleStatus::Current
        } else if next.is_late {
            CycleStatus::Late {
                days_late: next.days_late,
            }
        } else {
            CycleStatus::Upcoming {
                days_until: day_difference(next.start_date, today).max(0),
            }
        };
        Some(status)
    }

    /// Calendar class of a single day.
    ///
    /// Ongoing records are drawn for the average period length. Predicted windows
    /// extend past the latest start by the average period length.
    pub fn classify_day(
        &self,
        date: CalendarDate,
        cycles: &[CycleRecord],
        prediction: Option<&PredictionResult>,
    ) -> DayMark {
        let avg_period = prediction
            .map(|p| p.stats.avg_period_length)
            .unwrap_or(self.config.default_period_length);

        let in_period = cycles.iter().any(|c| {
            let end = c
                .end_date
                .unwrap_or_else(|| add_days(c.start_date, avg_period - 1));
            date >= c.start_date && date <= end
        });
        if in_period {
            return DayMark::Period;
        }

        let Some(prediction) = prediction else {
            return DayMark::Unmarked;
        };
        for predicted in &prediction.next_cycles {
            let (range_start, range_end) = predicted.start_date_range;
            let window_end = add_days(range_end, avg_period - 1);
            if date >= range_start && date <= window_end {
                let core_end = add_days(predicted.start_date, avg_period - 1);
                return if date >= predicted.start_date && date <= core_end {
                    DayMark::PredictedCore
                } else {
                    DayMark::PredictedWindow
                };
            }
        }
        DayMark::Unmarked
    }
}

/// Predict with the default configuration.
pub fn predict(cycles: &[CycleRecord], today: CalendarDate) -> Option<PredictionResult> {
    Predictor::new(&EngineConfig::default()).predict(cycles, today)
}

/// Ceiling of a non-negative day count halved
fn ceil_half(days: i64) -> i64 {
    (days + 1).div_euclid(2)
}
