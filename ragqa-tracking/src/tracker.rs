//! Run lifecycle on top of a [`TrackingStore`].

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, info};

use crate::error::{Result, TrackingError};
use crate::model::{RunInfo, RunStatus};
use crate::store::TrackingStore;

/// Longest accepted parameter key.
pub const MAX_PARAM_KEY_LEN: usize = 250;

/// Longest accepted parameter value.
pub const MAX_PARAM_VALUE_LEN: usize = 6000;

static PARAM_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-. /]+$").expect("valid parameter key pattern"));

/// Check a parameter key and value against MLflow's limits.
pub fn validate_param(key: &str, value: &str) -> Result<()> {
    if key.is_empty() || !PARAM_KEY.is_match(key) {
        return Err(TrackingError::InvalidParam(format!(
            "key '{key}' may only contain alphanumerics, underscores, dashes, periods, spaces, and slashes"
        )));
    }
    if key.len() > MAX_PARAM_KEY_LEN {
        return Err(TrackingError::InvalidParam(format!(
            "key '{key}' exceeds {MAX_PARAM_KEY_LEN} characters"
        )));
    }
    if key.split('/').any(|part| part == "..") || key.starts_with('/') {
        return Err(TrackingError::InvalidParam(format!("key '{key}' is not a relative path")));
    }
    if value.chars().count() > MAX_PARAM_VALUE_LEN {
        return Err(TrackingError::InvalidParam(format!(
            "value for '{key}' exceeds {MAX_PARAM_VALUE_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_artifact_name(file_name: &str) -> Result<()> {
    let bad = file_name.is_empty()
        || file_name.starts_with('/')
        || file_name.split(['/', '\\']).any(|part| part == ".." || part.is_empty());
    if bad {
        return Err(TrackingError::InvalidParam(format!("invalid artifact file name '{file_name}'")));
    }
    Ok(())
}

/// Opens runs in one named experiment.
///
/// ```rust,ignore
/// let tracker = ExperimentTracker::new(Arc::new(FileTrackingStore::new("mlruns")), "rag-qa-pipeline");
/// let run = tracker.start_run().await?;
/// run.log_param("chunk_size", "500").await?;
/// run.log_text("The invoice total is $450.", "output_answer.txt").await?;
/// run.finish().await?;
/// ```
#[derive(Clone)]
pub struct ExperimentTracker {
    store: Arc<dyn TrackingStore>,
    experiment_name: String,
}

impl ExperimentTracker {
    /// Track runs of `experiment_name` in `store`. The experiment is created
    /// on the first [`start_run`](Self::start_run) if it does not exist.
    pub fn new(store: Arc<dyn TrackingStore>, experiment_name: impl Into<String>) -> Self {
        Self { store, experiment_name: experiment_name.into() }
    }

    /// Name of the experiment runs are opened in.
    pub fn experiment_name(&self) -> &str {
        &self.experiment_name
    }

    /// Resolve or create the experiment, then open a `RUNNING` run in it.
    pub async fn start_run(&self) -> Result<ActiveRun> {
        let experiment_id = match self.store.get_experiment_by_name(&self.experiment_name).await? {
            Some(experiment) => experiment.experiment_id,
            None => self.store.create_experiment(&self.experiment_name).await?,
        };

        let start_time = chrono::Utc::now().timestamp_millis();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let run_name = format!("ragqa-{}", &suffix[..8]);
        let info = self.store.create_run(&experiment_id, &run_name, start_time).await?;

        info!(
            experiment = %self.experiment_name,
            experiment_id = %info.experiment_id,
            run_id = %info.run_id,
            "started tracking run"
        );
        Ok(ActiveRun { store: Arc::clone(&self.store), info })
    }
}

/// An open run. Call [`finish`](ActiveRun::finish) to close it.
///
/// Dropping an unfinished run leaves it `RUNNING` in the store; nothing
/// already logged is rolled back.
pub struct ActiveRun {
    store: Arc<dyn TrackingStore>,
    info: RunInfo,
}

impl ActiveRun {
    /// The run as last written to the store.
    pub fn info(&self) -> &RunInfo {
        &self.info
    }

    /// Shorthand for `info().run_id`.
    pub fn run_id(&self) -> &str {
        &self.info.run_id
    }

    /// Log one parameter.
    pub async fn log_param(&self, key: &str, value: impl ToString) -> Result<()> {
        let value = value.to_string();
        validate_param(key, &value)?;
        self.store.log_param(&self.info, key, &value).await?;
        debug!(run_id = %self.info.run_id, key, "logged param");
        Ok(())
    }

    /// Log parameters in order, stopping at the first failure.
    pub async fn log_params<K, V, I>(&self, params: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToString,
    {
        for (key, value) in params {
            self.log_param(key.as_ref(), value).await?;
        }
        Ok(())
    }

    /// Store `text` as a UTF-8 artifact named `file_name`.
    pub async fn log_text(&self, text: &str, file_name: &str) -> Result<()> {
        validate_artifact_name(file_name)?;
        self.store.log_artifact(&self.info, file_name, text.as_bytes()).await
    }

    /// Mark the run `FINISHED` with the current time as its end time.
    pub async fn finish(self) -> Result<RunInfo> {
        self.end(RunStatus::Finished).await
    }

    /// Mark the run `FAILED`.
    pub async fn fail(self) -> Result<RunInfo> {
        self.end(RunStatus::Failed).await
    }

    async fn end(mut self, status: RunStatus) -> Result<RunInfo> {
        self.info.status = status;
        self.info.end_time = Some(chrono::Utc::now().timestamp_millis());
        self.store.update_run(&self.info).await?;
        info!(run_id = %self.info.run_id, status = status.as_str(), "ended tracking run");
        Ok(self.info)
    }
}
