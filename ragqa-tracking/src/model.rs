//! Experiment and run records.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Open and accepting params and artifacts.
    Running,
    /// Created but not started; never produced by this crate.
    Scheduled,
    /// Completed successfully.
    Finished,
    /// Ended with an error.
    Failed,
    /// Terminated from outside.
    Killed,
}

impl RunStatus {
    /// The MLflow wire name, e.g. `FINISHED`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Scheduled => "SCHEDULED",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
            Self::Killed => "KILLED",
        }
    }
}

/// A named group of runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experiment {
    /// Store-assigned id; numeric for both backends.
    pub experiment_id: String,
    /// Unique experiment name, e.g. `rag-qa-pipeline`.
    pub name: String,
    /// Root URI under which the experiment's run artifacts live.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_location: Option<String>,
}

/// Metadata of one run.
///
/// Times are milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInfo {
    /// Store-assigned id, 32 hex characters.
    pub run_id: String,
    /// Experiment the run belongs to.
    pub experiment_id: String,
    /// Human-readable label, e.g. `ragqa-1a2b3c4d`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_name: Option<String>,
    /// Current lifecycle state.
    pub status: RunStatus,
    /// When the run was opened.
    pub start_time: i64,
    /// When the run was finished or failed; `None` while running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    /// Where [`log_artifact`](crate::TrackingStore::log_artifact) writes files.
    pub artifact_uri: String,
}
