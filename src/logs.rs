//! Daily log and event log collections
//!
//! Helpers for the per-day log book and the event list. These hold no state of
//! their own; callers pass in their collections and persist the result.

use crate::dates::{add_days, CalendarDate};
use crate::types::{DailyLog, EventLog};
use std::collections::{BTreeMap, BTreeSet};

/// Per-day logs keyed by date
pub type DailyLogBook = BTreeMap<CalendarDate, DailyLog>;

/// Default look-back for the recent symptom summary (days)
pub const DEFAULT_SYMPTOM_LOOKBACK_DAYS: i64 = 7;

impl DailyLog {
    pub fn new(date: CalendarDate) -> Self {
        Self {
            date,
            ..Default::default()
        }
    }

    /// No flow, no symptoms and no (non-blank) notes
    pub fn is_empty(&self) -> bool {
        self.flow.is_none()
            && self.symptoms.is_empty()
            && self.notes.as_deref().map_or(true, |n| n.trim().is_empty())
    }
}

/// Insert or replace a day's log, removing the entry when it is empty.
///
/// Duplicate symptoms are collapsed, keeping first occurrence order. Returns
/// whether an entry exists for the date afterwards.
pub fn upsert_daily_log(book: &mut DailyLogBook, mut log: DailyLog) -> bool {
    if log.is_empty() {
        book.remove(&log.date);
        return false;
    }
    let mut seen = BTreeSet::new();
    log.symptoms.retain(|s| seen.insert(s.clone()));
    book.insert(log.date, log);
    true
}

/// Logging a flow on an unmarked day implies the day should be marked.
pub fn flow_implies_mark(log: &DailyLog, marks: &BTreeSet<CalendarDate>) -> bool {
    log.flow.is_some() && !marks.contains(&log.date)
}

/// Distinct symptoms logged over the last `days` days, walking back from today.
pub fn recent_symptoms(book: &DailyLogBook, today: CalendarDate, days: i64) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut symptoms = Vec::new();
    for offset in 0..days {
        let date = add_days(today, -offset);
        if let Some(log) = book.get(&date) {
            for symptom in &log.symptoms {
                if seen.insert(symptom.as_str()) {
                    symptoms.push(symptom.clone());
                }
            }
        }
    }
    symptoms
}

/// Order events by date, most recent first. Ties keep their input order.
pub fn sort_events_desc(events: &mut [EventLog]) {
    events.sort_by(|a, b| b.date.cmp(&a.date));
}

/// Build a log book from a list, later entries replacing earlier ones
pub fn book_from_logs(logs: impl IntoIterator<Item = DailyLog>) -> DailyLogBook {
    let mut book = DailyLogBook::new();
    for log in logs {
        upsert_daily_log(&mut book, log);
    }
    book
}
