//! Calm Cycle - On-device menstrual cycle derivation and prediction engine
//!
//! The engine turns a set of marked period days into cycle records and runs a
//! deterministic pipeline over them: segmentation → statistics → prediction →
//! status, trend and pregnancy-risk timelines.
//!
//! Every operation is a pure function of its inputs. The evaluation date
//! (`today`) is always passed in explicitly.
//!
//! ## Modules
//!
//! - **Core**: `segmenter`, `stats`, `predictor`, `risk`
//! - **Boundary**: `schema` (input document), `pipeline` (snapshot), `ffi` (C ABI)

pub mod config;
pub mod context;
pub mod dates;
pub mod error;
pub mod logs;
pub mod pipeline;
pub mod predictor;
pub mod risk;
pub mod schema;
pub mod segmenter;
pub mod stats;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::EngineConfig;
pub use context::{AssistantContext, DailySummary, ProfileInfo};
pub use dates::CalendarDate;
pub use error::EngineError;
pub use pipeline::{snapshot_from_json, CycleEngine, EngineSnapshot};
pub use predictor::predict;
pub use risk::assess_risk;
pub use segmenter::derive_cycles;
pub use stats::compute_stats;
pub use types::{
    CycleRecord, CycleStats, CycleStatus, DailyLog, EventLog, PredictedCycle, PredictionResult,
    RiskAssessment,
};

// Schema exports
pub use schema::{TrackerInput, SCHEMA_VERSION};

/// Engine version embedded in every snapshot
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "calmcycle-engine";
