//! Storage backend trait for experiment tracking.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Experiment, RunInfo};

/// A backend that persists experiments, runs, parameters, and artifacts.
///
/// Implementations must be `Send + Sync` so they can be shared across async
/// tasks behind an `Arc`. Keys and values reach the store already validated
/// by [`ActiveRun`](crate::ActiveRun).
#[async_trait]
pub trait TrackingStore: Send + Sync {
    /// Look up an experiment by name.
    async fn get_experiment_by_name(&self, name: &str) -> Result<Option<Experiment>>;

    /// Create an experiment and return its id.
    async fn create_experiment(&self, name: &str) -> Result<String>;

    /// Open a new run in `experiment_id` with status `RUNNING`.
    async fn create_run(
        &self,
        experiment_id: &str,
        run_name: &str,
        start_time: i64,
    ) -> Result<RunInfo>;

    /// Record one parameter. Logging the same key twice with a different
    /// value is an error.
    async fn log_param(&self, run: &RunInfo, key: &str, value: &str) -> Result<()>;

    /// Store `contents` as `file_name` under the run's artifact location.
    async fn log_artifact(&self, run: &RunInfo, file_name: &str, contents: &[u8]) -> Result<()>;

    /// Persist the run's status and end time.
    async fn update_run(&self, run: &RunInfo) -> Result<()>;
}
