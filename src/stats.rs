//! Cycle statistics
//!
//! This module derives rolling regularity statistics from a cycle history.
//! Implausible samples (typos, duplicate entries) are discarded as outliers and
//! only the most recent window of plausible samples is averaged.

use crate::config::EngineConfig;
use crate::dates::day_difference;
use crate::types::{CycleHistoryRow, CycleRecord, CycleStats, CycleTrend};
use std::borrow::Cow;
use tracing::{debug, warn};

/// Spread of recent cycle lengths above which a history reads as varying
pub const VARYING_SPREAD_DAYS: i64 = 5;

/// Statistics calculator bound to a configuration
#[derive(Debug, Clone, Copy)]
pub struct StatsCalculator<'a> {
    config: &'a EngineConfig,
}

impl<'a> StatsCalculator<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Compute statistics from a history ordered most-recent-first.
    pub fn compute(&self, cycles: &[CycleRecord]) -> CycleStats {
        let cfg = self.config;
        let cycles = most_recent_first(cycles);

        if cycles.len() < 2 {
            let avg_period_length = cycles
                .first()
                .and_then(CycleRecord::period_length)
                .unwrap_or(cfg.default_period_length);
            return CycleStats {
                avg_cycle_length: cfg.default_cycle_length,
                avg_period_length,
                last_cycle_length: cfg.default_cycle_length,
                cycle_variation: 0,
                is_irregular: false,
            };
        }

        let cycle_lengths = self.recent_cycle_lengths(&cycles);
        let period_lengths = self.recent_period_lengths(&cycles);

        let avg_cycle_length = rounded_mean(&cycle_lengths).unwrap_or(cfg.default_cycle_length);
        let avg_period_length = rounded_mean(&period_lengths).unwrap_or(cfg.default_period_length);

        let cycle_variation = spread(&cycle_lengths);
        let is_irregular =
            cycle_lengths.len() > 1 && cycle_variation > cfg.irregular_variation_threshold;

        debug!(
            cycles = cycles.len(),
            cycle_samples = cycle_lengths.len(),
            period_samples = period_lengths.len(),
            avg_cycle_length,
            avg_period_length,
            cycle_variation,
            "computed cycle stats"
        );

        CycleStats {
            avg_cycle_length,
            avg_period_length,
            last_cycle_length: cycle_lengths
                .first()
                .copied()
                .unwrap_or(cfg.default_cycle_length),
            cycle_variation,
            is_irregular,
        }
    }

    /// Plausible start-to-start lengths, most recent first, capped to the window
    pub fn recent_cycle_lengths(&self, cycles: &[CycleRecord]) -> Vec<i64> {
        let bounds = self.config.cycle_length_bounds;
        let all: Vec<i64> = cycles
            .windows(2)
            .map(|pair| day_difference(pair[0].start_date, pair[1].start_date))
            .collect();
        let plausible: Vec<i64> = all.iter().copied().filter(|&len| bounds.contains(len)).collect();
        if plausible.len() < all.len() {
            debug!(
                discarded = all.len() - plausible.len(),
                "discarded implausible cycle lengths"
            );
        }
        plausible.into_iter().take(self.config.history_window).collect()
    }

    /// Plausible inclusive bleeding lengths, most recent first, capped to the window
    pub fn recent_period_lengths(&self, cycles: &[CycleRecord]) -> Vec<i64> {
        let bounds = self.config.period_length_bounds;
        cycles
            .iter()
            .filter_map(CycleRecord::period_length)
            .filter(|&len| bounds.contains(len))
            .take(self.config.history_window)
            .collect()
    }

    /// Per-cycle rows for the most recent `limit` records, oldest first.
    ///
    /// Rows with neither a known period length nor a following cycle are dropped.
    pub fn history(&self, cycles: &[CycleRecord], limit: usize) -> Vec<CycleHistoryRow> {
        let cycles = most_recent_first(cycles);
        let mut rows: Vec<CycleHistoryRow> = cycles
            .iter()
            .enumerate()
            .take(limit)
            .map(|(idx, record)| {
                let cycle_length = cycles
                    .get(idx + 1)
                    .map(|older| day_difference(record.start_date, older.start_date))
                    .filter(|&len| len > 0);
                CycleHistoryRow {
                    start_date: record.start_date,
                    period_length: record.period_length().filter(|&len| len > 0),
                    cycle_length,
                }
            })
            .filter(|row| row.period_length.is_some() || row.cycle_length.is_some())
            .collect();
        rows.reverse();
        rows
    }

    /// Qualitative trend of the recent history
    pub fn trend(&self, stats: &CycleStats, history: &[CycleHistoryRow]) -> CycleTrend {
        if stats.is_irregular {
            return CycleTrend::Irregular;
        }
        let lengths: Vec<i64> = history.iter().filter_map(|row| row.cycle_length).collect();
        if spread(&lengths) > VARYING_SPREAD_DAYS {
            CycleTrend::Varying
        } else {
            CycleTrend::Stable
        }
    }
}

/// Compute statistics with the default configuration.
pub fn compute_stats(cycles: &[CycleRecord]) -> CycleStats {
    StatsCalculator::new(&EngineConfig::default()).compute(cycles)
}

/// Borrow the history as-is when already ordered, otherwise sort a copy.
pub(crate) fn most_recent_first(cycles: &[CycleRecord]) -> Cow<'_, [CycleRecord]> {
    let ordered = cycles
        .windows(2)
        .all(|pair| pair[0].start_date >= pair[1].start_date);
    if ordered {
        Cow::Borrowed(cycles)
    } else {
        warn!(cycles = cycles.len(), "cycle history not most-recent-first; sorting");
        let mut sorted = cycles.to_vec();
        sorted.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Cow::Owned(sorted)
    }
}

/// Mean rounded half away from zero
fn rounded_mean(values: &[i64]) -> Option<i64> {
    if values.is_empty() {
        return None;
    }
    let sum: i64 = values.iter().sum();
    Some((sum as f64 / values.len() as f64).round() as i64)
}

/// Max minus min, zero for fewer than two values
fn spread(values: &[i64]) -> i64 {
    if values.len() < 2 {
        return 0;
    }
    let max = values.iter().copied().max().unwrap_or(0);
    let min = values.iter().copied().min().unwrap_or(0);
    max - min
}
