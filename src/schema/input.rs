//! calmcycle.input.v1 document

use crate::context::ProfileInfo;
use crate::dates::CalendarDate;
use crate::error::EngineError;
use crate::types::{CycleRecord, DailyLog, EventLog};
use serde::{Deserialize, Serialize};

/// Current input schema version
pub const SCHEMA_VERSION: &str = "calmcycle.input.v1";

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

/// Everything the engine needs to produce a snapshot.
///
/// When `marked_days` is present, cycle records are re-derived from it and
/// `cycles` only supplies the previous identities. Otherwise `cycles` is taken as
/// the stored history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerInput {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    /// Pinned evaluation date; the host's local date is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub today: Option<CalendarDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marked_days: Option<Vec<CalendarDate>>,
    #[serde(default)]
    pub cycles: Vec<CycleRecord>,
    #[serde(default)]
    pub events: Vec<EventLog>,
    #[serde(default)]
    pub daily_logs: Vec<DailyLog>,
}

impl Default for TrackerInput {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            today: None,
            profile: None,
            marked_days: None,
            cycles: Vec::new(),
            events: Vec::new(),
            daily_logs: Vec::new(),
        }
    }
}

impl TrackerInput {
    /// Parse a document from JSON
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let input: Self = serde_json::from_str(json)?;
        Ok(input)
    }

    /// Serialize the document to JSON
    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string(self).map_err(EngineError::Json)
    }
}
