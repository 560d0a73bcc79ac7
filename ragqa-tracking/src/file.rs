//! Local directory tracking store.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<experiment_id>/meta.json
//! <root>/<experiment_id>/<run_id>/meta.json
//! <root>/<experiment_id>/<run_id>/params/<key>
//! <root>/<experiment_id>/<run_id>/artifacts/<file>
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::error::{Result, TrackingError};
use crate::model::{Experiment, RunInfo, RunStatus};
use crate::store::TrackingStore;

const META_FILE: &str = "meta.json";
const PARAMS_DIR: &str = "params";
const ARTIFACTS_DIR: &str = "artifacts";

/// Default root directory, relative to the working directory.
pub const DEFAULT_TRACKING_DIR: &str = "mlruns";

/// A [`TrackingStore`] that writes plain files under a root directory.
#[derive(Debug, Clone)]
pub struct FileTrackingStore {
    root: PathBuf,
}

impl FileTrackingStore {
    /// Create a store rooted at `root`. Nothing is written until the first
    /// experiment is created.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn run_dir(&self, run: &RunInfo) -> PathBuf {
        self.root.join(&run.experiment_id).join(&run.run_id)
    }

    /// All experiments found under the root, skipping directories without metadata.
    async fn experiments(&self) -> Result<Vec<Experiment>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut experiments = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let meta = entry.path().join(META_FILE);
            match fs::read(&meta).await {
                Ok(bytes) => experiments.push(serde_json::from_slice(&bytes)?),
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(experiments)
    }
}

async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    fs::write(path, serde_json::to_vec_pretty(value)?).await?;
    Ok(())
}

#[async_trait]
impl TrackingStore for FileTrackingStore {
    async fn get_experiment_by_name(&self, name: &str) -> Result<Option<Experiment>> {
        Ok(self.experiments().await?.into_iter().find(|e| e.name == name))
    }

    async fn create_experiment(&self, name: &str) -> Result<String> {
        let experiments = self.experiments().await?;
        if experiments.iter().any(|e| e.name == name) {
            return Err(TrackingError::InvalidParam(format!(
                "experiment '{name}' already exists"
            )));
        }

        // Id 0 is MLflow's "Default" experiment.
        let next_id = experiments
            .iter()
            .filter_map(|e| e.experiment_id.parse::<u64>().ok())
            .max()
            .map_or(1, |id| id + 1);
        let experiment_id = next_id.to_string();

        let dir = self.root.join(&experiment_id);
        fs::create_dir_all(&dir).await?;
        let experiment = Experiment {
            experiment_id: experiment_id.clone(),
            name: name.to_string(),
            artifact_location: Some(dir.display().to_string()),
        };
        write_json(&dir.join(META_FILE), &experiment).await?;

        debug!(experiment_id, name, root = %self.root.display(), "created experiment");
        Ok(experiment_id)
    }

    async fn create_run(
        &self,
        experiment_id: &str,
        run_name: &str,
        start_time: i64,
    ) -> Result<RunInfo> {
        let experiment_dir = self.root.join(experiment_id);
        if fs::metadata(experiment_dir.join(META_FILE)).await.is_err() {
            return Err(TrackingError::NotFound(format!("experiment '{experiment_id}'")));
        }

        let run_id = uuid::Uuid::new_v4().simple().to_string();
        let run_dir = experiment_dir.join(&run_id);
        fs::create_dir_all(run_dir.join(PARAMS_DIR)).await?;
        fs::create_dir_all(run_dir.join(ARTIFACTS_DIR)).await?;

        let run = RunInfo {
            run_id,
            experiment_id: experiment_id.to_string(),
            run_name: Some(run_name.to_string()),
            status: RunStatus::Running,
            start_time,
            end_time: None,
            artifact_uri: run_dir.join(ARTIFACTS_DIR).display().to_string(),
        };
        write_json(&run_dir.join(META_FILE), &run).await?;
        Ok(run)
    }

    async fn log_param(&self, run: &RunInfo, key: &str, value: &str) -> Result<()> {
        let path = self.run_dir(run).join(PARAMS_DIR).join(key);
        match fs::read_to_string(&path).await {
            Ok(existing) if existing == value => return Ok(()),
            Ok(existing) => {
                return Err(TrackingError::InvalidParam(format!(
                    "parameter '{key}' already logged with value '{existing}'"
                )));
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, value).await?;
        Ok(())
    }

    async fn log_artifact(&self, run: &RunInfo, file_name: &str, contents: &[u8]) -> Result<()> {
        let path = self.run_dir(run).join(ARTIFACTS_DIR).join(file_name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, contents).await?;
        Ok(())
    }

    async fn update_run(&self, run: &RunInfo) -> Result<()> {
        let meta = self.run_dir(run).join(META_FILE);
        if fs::metadata(&meta).await.is_err() {
            return Err(TrackingError::NotFound(format!("run '{}'", run.run_id)));
        }
        write_json(&meta, run).await
    }
}
