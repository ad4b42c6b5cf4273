//! Cycle segmentation
//!
//! Turns the full set of marked period days into contiguous cycle records. The
//! segmenter always re-runs over the complete set rather than patching records
//! incrementally, so any sequence of mark/unmark edits converges to the same
//! result. Identities are carried over from the previous derivation so notes and
//! aggregates keyed by cycle id keep their continuity.

use crate::config::Reconciliation;
use crate::dates::{add_days, day_difference, CalendarDate};
use crate::types::CycleRecord;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

/// Segmenter for deriving cycle records from marked days
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleSegmenter {
    reconciliation: Reconciliation,
}

impl CycleSegmenter {
    pub fn new(reconciliation: Reconciliation) -> Self {
        Self { reconciliation }
    }

    /// Derive cycle records from the full set of marked days.
    ///
    /// Records are returned most-recent-first, ready for statistics and
    /// prediction. Duplicate marks are ignored.
    pub fn derive<I>(&self, marked_days: I, previous: &[CycleRecord]) -> Vec<CycleRecord>
    where
        I: IntoIterator<Item = CalendarDate>,
    {
        let sorted: BTreeSet<CalendarDate> = marked_days.into_iter().collect();
        let runs = group_runs(&sorted);

        debug!(
            marked_days = sorted.len(),
            runs = runs.len(),
            previous = previous.len(),
            "segmented marked days"
        );

        let mut records = self.reconcile(runs, previous);
        records.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        records
    }

    fn reconcile(
        &self,
        runs: Vec<(CalendarDate, CalendarDate)>,
        previous: &[CycleRecord],
    ) -> Vec<CycleRecord> {
        // First record wins when several share a start date
        let mut by_start: HashMap<CalendarDate, usize> = HashMap::new();
        for (idx, record) in previous.iter().enumerate() {
            by_start.entry(record.start_date).or_insert(idx);
        }

        let mut claimed: HashSet<usize> = HashSet::new();
        let mut assigned: Vec<Option<usize>> = runs
            .iter()
            .map(|(start, _)| {
                by_start.get(start).copied().inspect(|&idx| {
                    claimed.insert(idx);
                })
            })
            .collect();

        if self.reconciliation == Reconciliation::Overlap {
            for (slot, &(start, end)) in assigned.iter_mut().zip(runs.iter()) {
                if slot.is_some() {
                    continue;
                }
                if let Some(idx) = best_overlap(start, end, previous, &claimed) {
                    claimed.insert(idx);
                    *slot = Some(idx);
                }
            }
        }

        // Carried-over ids are reserved before any fresh id is minted
        let mut used_ids: HashSet<String> = HashSet::new();
        let mut records: Vec<CycleRecord> = Vec::with_capacity(runs.len());
        let mut fresh: Vec<usize> = Vec::new();
        for (pos, (&(start, end), prev_idx)) in runs.iter().zip(assigned).enumerate() {
            let mut record = CycleRecord::from_interval(start, end);
            match prev_idx {
                Some(idx) if used_ids.insert(previous[idx].id.clone()) => {
                    record.id = previous[idx].id.clone();
                }
                Some(idx) => {
                    record.id = previous[idx].id.clone();
                    fresh.push(pos);
                }
                None => fresh.push(pos),
            }
            records.push(record);
        }

        for pos in fresh {
            let record = &mut records[pos];
            if used_ids.insert(record.id.clone()) {
                continue;
            }
            let base = record.id.clone();
            let mut n = 2;
            while !used_ids.insert(format!("{base}-{n}")) {
                n += 1;
            }
            record.id = format!("{base}-{n}");
            warn!(id = %base, renamed = %record.id, "cycle id collision during reconciliation");
        }
        records
    }
}

/// Group ascending dates into runs of consecutive days
fn group_runs(sorted: &BTreeSet<CalendarDate>) -> Vec<(CalendarDate, CalendarDate)> {
    let mut runs = Vec::new();
    let mut iter = sorted.iter().copied();

    let Some(first) = iter.next() else {
        return runs;
    };

    let mut run_start = first;
    let mut run_end = first;
    for day in iter {
        if day_difference(day, run_end) == 1 {
            run_end = day;
        } else {
            runs.push((run_start, run_end));
            run_start = day;
            run_end = day;
        }
    }
    runs.push((run_start, run_end));
    runs
}

/// Unclaimed previous record sharing the most days with `[start, end]`
fn best_overlap(
    start: CalendarDate,
    end: CalendarDate,
    previous: &[CycleRecord],
    claimed: &HashSet<usize>,
) -> Option<usize> {
    let mut best: Option<(usize, i64)> = None;
    for (idx, record) in previous.iter().enumerate() {
        if claimed.contains(&idx) {
            continue;
        }
        // Ongoing records are treated as open-ended
        let prev_end = record.end_date.unwrap_or(end.max(record.start_date));
        let overlap = day_difference(end.min(prev_end), start.max(record.start_date)) + 1;
        if overlap > 0 && best.map_or(true, |(_, days)| overlap > days) {
            best = Some((idx, overlap));
        }
    }
    best.map(|(idx, _)| idx)
}

/// Derive cycle records using start-date reconciliation.
pub fn derive_cycles<I>(marked_days: I, previous: &[CycleRecord]) -> Vec<CycleRecord>
where
    I: IntoIterator<Item = CalendarDate>,
{
    CycleSegmenter::default().derive(marked_days, previous)
}

/// Expand stored cycle records back into the set of marked days.
///
/// Ongoing records extend to `today` but never more than `cap_days` past their
/// start.
pub fn expand_marked_days(
    cycles: &[CycleRecord],
    today: CalendarDate,
    cap_days: i64,
) -> BTreeSet<CalendarDate> {
    let mut days = BTreeSet::new();
    for cycle in cycles {
        let mut end = cycle.end_date.unwrap_or(today);
        if day_difference(end, cycle.start_date) > cap_days {
            end = add_days(cycle.start_date, cap_days);
        }
        days.extend(cycle.start_date.iter_days().take_while(|day| *day <= end));
    }
    days
}

/// Flip a single day in the mark set. Returns whether the day is now marked.
pub fn toggle_marked_day(marks: &mut BTreeSet<CalendarDate>, date: CalendarDate) -> bool {
    if marks.remove(&date) {
        false
    } else {
        marks.insert(date);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn d(s: &str) -> CalendarDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn intervals(records: &[CycleRecord]) -> Vec<(CalendarDate, Option<CalendarDate>)> {
        records.iter().map(|r| (r.start_date, r.end_date)).collect()
    }

    #[test]
    fn test_segments_consecutive_runs() {
        let marks = vec![d("2024-01-01"), d("2024-01-02"), d("2024-01-03"), d("2024-01-10")];
        let records = derive_cycles(marks, &[]);

        assert_eq!(
            intervals(&records),
            vec![
                (d("2024-01-10"), Some(d("2024-01-10"))),
                (d("2024-01-01"), Some(d("2024-01-03"))),
            ]
        );
    }

    #[test]
    fn test_unsorted_and_duplicate_marks() {
        let marks = vec![d("2024-01-03"), d("2024-01-01"), d("2024-01-02"), d("2024-01-02")];
        let records = derive_cycles(marks, &[]);
        assert_eq!(intervals(&records), vec![(d("2024-01-01"), Some(d("2024-01-03")))]);
    }

    #[test]
    fn test_runs_span_month_boundaries() {
        let marks = vec![d("2024-01-30"), d("2024-01-31"), d("2024-02-01")];
        let records = derive_cycles(marks, &[]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].end_date, Some(d("2024-02-01")));
    }

    #[test]
    fn test_single_mark_is_one_day_cycle() {
        let records = derive_cycles(vec![d("2024-05-05")], &[]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].start_date, records[0].end_date.unwrap());
    }

    #[test]
    fn test_no_marks_yields_no_cycles() {
        let previous = vec![CycleRecord::from_interval(d("2024-01-01"), d("2024-01-03"))];
        assert!(derive_cycles(Vec::new(), &previous).is_empty());
    }

    #[test]
    fn test_rederivation_is_idempotent() {
        let marks = vec![d("2024-01-01"), d("2024-01-02"), d("2024-01-20"), d("2024-01-21")];
        let first = derive_cycles(marks.clone(), &[]);
        let second = derive_cycles(marks, &first);
        assert_eq!(first, second);
    }

    #[test]
    fn test_id_preserved_when_start_unchanged() {
        let previous = vec![CycleRecord::new("user-note-anchor", d("2024-01-01"), Some(d("2024-01-02")))];
        // Extending the end keeps the start, so the id survives
        let marks = vec![d("2024-01-01"), d("2024-01-02"), d("2024-01-03")];
        let records = derive_cycles(marks, &previous);
        assert_eq!(records[0].id, "user-note-anchor");
        assert_eq!(records[0].end_date, Some(d("2024-01-03")));
    }

    #[test]
    fn test_shifted_start_mints_new_id_by_default() {
        let previous = vec![CycleRecord::new("anchor", d("2024-01-02"), Some(d("2024-01-04")))];
        let marks = vec![d("2024-01-01"), d("2024-01-02"), d("2024-01-03"), d("2024-01-04")];
        let records = derive_cycles(marks, &previous);
        assert_eq!(records[0].id, "cycle-2024-01-01");
    }

    #[test]
    fn test_overlap_reconciliation_keeps_shifted_id() {
        let previous = vec![CycleRecord::new("anchor", d("2024-01-02"), Some(d("2024-01-04")))];
        let marks = vec![d("2024-01-01"), d("2024-01-02"), d("2024-01-03"), d("2024-01-04")];
        let records = CycleSegmenter::new(Reconciliation::Overlap).derive(marks, &previous);
        assert_eq!(records[0].id, "anchor");
    }

    #[test]
    fn test_overlap_does_not_steal_start_matches() {
        let previous = vec![
            CycleRecord::new("a", d("2024-01-01"), Some(d("2024-01-05"))),
            CycleRecord::new("b", d("2024-01-04"), Some(d("2024-01-05"))),
        ];
        // Unmarking 01-03 splits the run: [01-01..01-02] keeps "a" by start,
        // [01-04..01-05] keeps "b" by start.
        let marks = vec![d("2024-01-01"), d("2024-01-02"), d("2024-01-04"), d("2024-01-05")];
        let records = CycleSegmenter::new(Reconciliation::Overlap).derive(marks, &previous);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_colliding_ids_are_disambiguated() {
        // A carried-over id that happens to equal a freshly minted one
        let previous = vec![CycleRecord::new("cycle-2024-01-10", d("2024-01-01"), Some(d("2024-01-02")))];
        let marks = vec![d("2024-01-01"), d("2024-01-02"), d("2024-01-10")];
        let records = derive_cycles(marks, &previous);
        let ids: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn test_fresh_id_never_takes_a_carried_id() {
        let segmenter = CycleSegmenter::new(Reconciliation::Overlap);
        let mut marks: BTreeSet<CalendarDate> =
            (1..=5).map(|day| d(&format!("2024-01-{day:02}"))).collect();
        let first = segmenter.derive(marks.iter().copied(), &[]);

        toggle_marked_day(&mut marks, d("2024-01-01"));
        toggle_marked_day(&mut marks, d("2024-01-02"));
        let shrunk = segmenter.derive(marks.iter().copied(), &first);
        assert_eq!(shrunk[0].id, "cycle-2024-01-01");
        assert_eq!(shrunk[0].start_date, d("2024-01-03"));

        toggle_marked_day(&mut marks, d("2024-01-01"));
        let remarked = segmenter.derive(marks.iter().copied(), &shrunk);
        let ids: Vec<(&str, CalendarDate)> =
            remarked.iter().map(|r| (r.id.as_str(), r.start_date)).collect();
        assert_eq!(
            ids,
            vec![
                ("cycle-2024-01-01", d("2024-01-03")),
                ("cycle-2024-01-01-2", d("2024-01-01")),
            ]
        );

        // Both identities survive a further re-derivation
        assert_eq!(segmenter.derive(marks.iter().copied(), &remarked), remarked);
    }

    #[test]
    fn test_duplicate_previous_ids_are_disambiguated() {
        let previous = vec![
            CycleRecord::new("dup", d("2024-01-01"), Some(d("2024-01-02"))),
            CycleRecord::new("dup", d("2024-02-01"), Some(d("2024-02-02"))),
        ];
        let marks = vec![d("2024-01-01"), d("2024-01-02"), d("2024-02-01"), d("2024-02-02")];
        let records = derive_cycles(marks, &previous);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["dup-2", "dup"]);
    }

    #[test]
    fn test_expand_ongoing_at_calendar_end_terminates() {
        let start = add_days(NaiveDate::MAX, -2);
        let ongoing = vec![CycleRecord::new("x", start, None)];
        let days = expand_marked_days(&ongoing, NaiveDate::MAX, 60);
        assert_eq!(days.len(), 3);
    }

    #[test]
    fn test_expand_marked_days_inverts_segmentation() {
        let marks: BTreeSet<CalendarDate> =
            [d("2024-01-01"), d("2024-01-02"), d("2024-01-10")].into_iter().collect();
        let records = derive_cycles(marks.iter().copied(), &[]);
        assert_eq!(expand_marked_days(&records, d("2024-02-01"), 60), marks);
    }

    #[test]
    fn test_expand_ongoing_is_capped() {
        let ongoing = vec![CycleRecord::new("x", d("2024-01-01"), None)];
        let days = expand_marked_days(&ongoing, d("2024-01-03"), 60);
        assert_eq!(days.len(), 3);

        let days = expand_marked_days(&ongoing, d("2024-12-31"), 60);
        assert_eq!(days.len(), 61);
        assert_eq!(days.iter().next_back().copied(), Some(d("2024-03-01")));
    }

    #[test]
    fn test_toggle_then_rederive_splits_cycle() {
        let mut marks: BTreeSet<CalendarDate> =
            [d("2024-01-01"), d("2024-01-02"), d("2024-01-03")].into_iter().collect();
        let before = derive_cycles(marks.iter().copied(), &[]);

        assert!(!toggle_marked_day(&mut marks, d("2024-01-02")));
        let after = derive_cycles(marks.iter().copied(), &before);
        assert_eq!(after.len(), 2);
        assert_eq!(after[1].id, before[0].id);

        assert!(toggle_marked_day(&mut marks, d("2024-01-02")));
        assert_eq!(derive_cycles(marks.iter().copied(), &after), before);
    }
}
