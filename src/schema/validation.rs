//! Input validation
//!
//! Serde already guarantees well-formed dates. Validation catches the structural
//! problems serde cannot see, and reports every issue rather than the first.

use super::input::{TrackerInput, SCHEMA_VERSION};
use serde::Serialize;
use std::collections::HashSet;

/// Structural problems in a tracker document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("Invalid schema version: expected {expected}, got {actual}")]
    InvalidSchemaVersion { expected: String, actual: String },

    #[error("Cycle ends ({end}) before it starts ({start})")]
    EndBeforeStart { start: String, end: String },

    #[error("Duplicate cycle id: {id}")]
    DuplicateCycleId { id: String },

    #[error("Duplicate event id: {id}")]
    DuplicateEventId { id: String },

    #[error("Duplicate daily log for {date}")]
    DuplicateLogDate { date: String },
}

/// One validation failure with its location in the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Top-level field the issue was found in
    pub section: String,
    pub index: Option<usize>,
    pub error: ValidationError,
}

impl ValidationIssue {
    fn at(section: &str, index: usize, error: ValidationError) -> Self {
        Self {
            section: section.to_string(),
            index: Some(index),
            error,
        }
    }
}

impl TrackerInput {
    /// Check the document for structural problems. Empty means valid.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if self.schema_version != SCHEMA_VERSION {
            issues.push(ValidationIssue {
                section: "schema_version".to_string(),
                index: None,
                error: ValidationError::InvalidSchemaVersion {
                    expected: SCHEMA_VERSION.to_string(),
                    actual: self.schema_version.clone(),
                },
            });
        }

        let mut cycle_ids = HashSet::new();
        for (idx, cycle) in self.cycles.iter().enumerate() {
            if let Some(end) = cycle.end_date {
                if end < cycle.start_date {
                    issues.push(ValidationIssue::at(
                        "cycles",
                        idx,
                        ValidationError::EndBeforeStart {
                            start: cycle.start_date.to_string(),
                            end: end.to_string(),
                        },
                    ));
                }
            }
            if !cycle_ids.insert(cycle.id.as_str()) {
                issues.push(ValidationIssue::at(
                    "cycles",
                    idx,
                    ValidationError::DuplicateCycleId { id: cycle.id.clone() },
                ));
            }
        }

        let mut event_ids = HashSet::new();
        for (idx, event) in self.events.iter().enumerate() {
            if !event_ids.insert(event.id.as_str()) {
                issues.push(ValidationIssue::at(
                    "events",
                    idx,
                    ValidationError::DuplicateEventId { id: event.id.clone() },
                ));
            }
        }

        let mut log_dates = HashSet::new();
        for (idx, log) in self.daily_logs.iter().enumerate() {
            if !log_dates.insert(log.date) {
                issues.push(ValidationIssue::at(
                    "daily_logs",
                    idx,
                    ValidationError::DuplicateLogDate {
                        date: log.date.to_string(),
                    },
                ));
            }
        }

        issues
    }
}
