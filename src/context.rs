//! Assistant context and dashboard summary
//!
//! The conversational assistant and the dashboard both read engine output rather
//! than computing anything themselves. This module turns a prediction into the
//! free-text context the assistant embeds in its prompt, and picks which summary
//! message the dashboard should show. Localized wording stays with the caller.

use crate::types::{CycleStatus, PredictionResult};
use serde::{Deserialize, Serialize};

/// Profile fields the assistant context mentions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileInfo {
    pub name: String,
    /// Language tag, e.g. "en" or "zh"
    pub language: String,
}

impl Default for ProfileInfo {
    fn default() -> Self {
        Self {
            name: "User".to_string(),
            language: "en".to_string(),
        }
    }
}

/// Plain-text context handed to the conversational assistant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantContext {
    pub text: String,
}

impl AssistantContext {
    /// Render the profile line, then stats and status when a prediction exists.
    pub fn from_prediction(profile: &ProfileInfo, prediction: Option<&PredictionResult>) -> Self {
        let mut lines = vec![format!(
            "User Profile: Name: {}, Language: {}.",
            profile.name, profile.language
        )];

        if let Some(p) = prediction {
            lines.push(format!(
                "Cycle Stats: Avg Cycle Length: {} days, Avg Period Length: {} days.",
                p.stats.avg_cycle_length, p.stats.avg_period_length
            ));
            let next_start = p
                .next_cycles
                .first()
                .map(|c| c.start_date.format("%a %b %d %Y").to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            lines.push(format!(
                "Current Status: Phase: {}. Next period expected start: {}. Urgency: {}.",
                p.current_phase.as_str(),
                next_start,
                p.urgency.as_str()
            ));
        }

        Self {
            text: lines.join("\n"),
        }
    }
}

/// Which summary message the dashboard should show
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DailySummary {
    /// A recently logged symptom deserves a care tip
    SymptomCare { symptom: String },
    /// A period is in progress
    Period,
    Late { days_late: i64 },
    Upcoming,
    /// Nothing to go on yet
    NoData,
}

impl DailySummary {
    /// Symptoms take priority unless a period is in progress.
    pub fn compose(status: Option<CycleStatus>, recent_symptoms: &[String]) -> Self {
        let in_period = matches!(status, Some(CycleStatus::Current));
        if let (Some(symptom), false) = (recent_symptoms.first(), in_period) {
            return DailySummary::SymptomCare {
                symptom: symptom.clone(),
            };
        }
        match status {
            Some(CycleStatus::Current) => DailySummary::Period,
            Some(CycleStatus::Late { days_late }) => DailySummary::Late { days_late },
            Some(CycleStatus::Upcoming { .. }) => DailySummary::Upcoming,
            None => DailySummary::NoData,
        }
    }
}
