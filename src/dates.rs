//! Calendar date utilities
//!
//! All arithmetic is done on `NaiveDate`, which carries no time of day and no
//! timezone. Differences are therefore whole calendar days and cannot drift across
//! daylight-saving transitions.

use crate::error::EngineError;
use chrono::{Datelike, Days, Local, NaiveDate};

/// A local calendar date with no time-of-day component.
pub type CalendarDate = NaiveDate;

/// Canonical ISO date format used at every boundary.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Number of calendar days from `b` to `a`. Negative when `a` is before `b`.
pub fn day_difference(a: CalendarDate, b: CalendarDate) -> i64 {
    a.signed_duration_since(b).num_days()
}

/// Shift `date` by `days` calendar days (may be negative).
///
/// Saturates at the ends of the representable calendar instead of overflowing.
pub fn add_days(date: CalendarDate, days: i64) -> CalendarDate {
    let step = Days::new(days.unsigned_abs());
    if days >= 0 {
        date.checked_add_days(step).unwrap_or(NaiveDate::MAX)
    } else {
        date.checked_sub_days(step).unwrap_or(NaiveDate::MIN)
    }
}

/// Format as `YYYY-MM-DD` from the local calendar fields.
pub fn to_iso_date(date: CalendarDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

/// Parse a `YYYY-MM-DD` string into a calendar date.
///
/// Only the date fields are read; no UTC conversion takes place, so the result is
/// the same calendar day regardless of the host timezone.
pub fn parse_iso_date(s: &str) -> Result<CalendarDate, EngineError> {
    let trimmed = s.trim();
    if trimmed.len() != 10 {
        return Err(EngineError::DateParse(format!(
            "expected YYYY-MM-DD, got '{trimmed}'"
        )));
    }
    NaiveDate::parse_from_str(trimmed, ISO_DATE_FORMAT)
        .map_err(|e| EngineError::DateParse(format!("'{trimmed}': {e}")))
}

/// Today's date on the host's local calendar.
///
/// Only boundary code (CLI, FFI) should call this; engine operations take `today`
/// as a parameter.
pub fn local_today() -> CalendarDate {
    Local::now().date_naive()
}
