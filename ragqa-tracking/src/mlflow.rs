//! MLflow tracking server backend over the REST API.
//!
//! Experiments, runs, and parameters go through `/api/2.0/mlflow/...`.
//! Artifacts are uploaded through the server's `mlflow-artifacts` proxy, or
//! written directly when the run's artifact location is a local path.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{Result, TrackingError};
use crate::model::{Experiment, RunInfo, RunStatus};
use crate::store::TrackingStore;

const API_PREFIX: &str = "api/2.0/mlflow";
const ARTIFACTS_PREFIX: &str = "api/2.0/mlflow-artifacts/artifacts";
const PROXY_SCHEME: &str = "mlflow-artifacts:";
const RESOURCE_DOES_NOT_EXIST: &str = "RESOURCE_DOES_NOT_EXIST";

/// How requests to the tracking server authenticate.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Credentials {
    #[default]
    None,
    /// `Authorization: Bearer <token>`.
    Bearer(String),
    /// HTTP basic auth.
    Basic { username: String, password: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Self::Basic { username, .. } => {
                f.debug_struct("Basic").field("username", username).finish_non_exhaustive()
            }
        }
    }
}

/// A [`TrackingStore`] backed by an MLflow tracking server.
#[derive(Debug, Clone)]
pub struct MlflowRestStore {
    client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl MlflowRestStore {
    /// Create a store for the server at `base_url`, e.g. `http://localhost:5000`.
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    /// The server base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/{API_PREFIX}/{method}", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            Credentials::None => request,
            Credentials::Bearer(token) => request.bearer_auth(token),
            Credentials::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
        }
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String> {
        let response = self.authorize(request).send().await.inspect_err(|e| {
            error!(base_url = %self.base_url, error = %e, "tracking request failed");
        })?;
        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(api_error(status.as_u16(), &body))
        }
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T> {
        let text = self.send(self.client.post(self.api_url(method)).json(body)).await?;
        Ok(serde_json::from_str(&text)?)
    }
}

// ── REST request/response types ────────────────────────────────────

#[derive(Deserialize)]
struct GetExperimentResponse {
    experiment: Experiment,
}

#[derive(Deserialize)]
struct CreateExperimentResponse {
    experiment_id: String,
}

#[derive(Deserialize)]
struct CreateRunResponse {
    run: WireRun,
}

#[derive(Deserialize)]
struct WireRun {
    info: WireRunInfo,
}

#[derive(Deserialize)]
struct WireRunInfo {
    run_id: String,
    experiment_id: String,
    #[serde(default)]
    run_name: Option<String>,
    #[serde(default)]
    artifact_uri: String,
}

/// Empty JSON object returned by the logging endpoints.
#[derive(Deserialize)]
struct Empty {}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    message: String,
}

fn api_error(status: u16, body: &str) -> TrackingError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(e) => TrackingError::Api { status, code: e.error_code, message: e.message },
        Err(_) => TrackingError::Api { status, code: String::new(), message: body.to_string() },
    }
}

/// Where an artifact for a run's `artifact_uri` should be written.
#[derive(Debug, PartialEq, Eq)]
enum ArtifactTarget {
    /// Relative path under the server's artifact proxy.
    Proxy(String),
    /// A directory on the local file system.
    Local(PathBuf),
}

fn artifact_target(artifact_uri: &str) -> Result<ArtifactTarget> {
    let unsupported = || TrackingError::UnsupportedArtifactLocation(artifact_uri.to_string());

    if let Some(rest) = artifact_uri.strip_prefix(PROXY_SCHEME) {
        // mlflow-artifacts://host:port/path carries an authority we ignore.
        let path = match rest.strip_prefix("//") {
            Some(with_authority) => with_authority.split_once('/').map_or("", |(_, p)| p),
            None => rest,
        };
        let path = path.trim_matches('/');
        if path.is_empty() {
            return Err(unsupported());
        }
        return Ok(ArtifactTarget::Proxy(path.to_string()));
    }

    if let Some(path) = artifact_uri.strip_prefix("file://") {
        return Ok(ArtifactTarget::Local(PathBuf::from(path)));
    }
    if artifact_uri.starts_with('/') {
        return Ok(ArtifactTarget::Local(PathBuf::from(artifact_uri)));
    }
    Err(unsupported())
}

// ── TrackingStore implementation ────────────────────────────────────

#[async_trait]
impl TrackingStore for MlflowRestStore {
    async fn get_experiment_by_name(&self, name: &str) -> Result<Option<Experiment>> {
        let request = self
            .client
            .get(self.api_url("experiments/get-by-name"))
            .query(&[("experiment_name", name)]);
        match self.send(request).await {
            Ok(text) => Ok(Some(serde_json::from_str::<GetExperimentResponse>(&text)?.experiment)),
            Err(TrackingError::Api { code, .. }) if code == RESOURCE_DOES_NOT_EXIST => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_experiment(&self, name: &str) -> Result<String> {
        let response: CreateExperimentResponse =
            self.post("experiments/create", &serde_json::json!({ "name": name })).await?;
        debug!(experiment_id = %response.experiment_id, name, "created experiment");
        Ok(response.experiment_id)
    }

    async fn create_run(
        &self,
        experiment_id: &str,
        run_name: &str,
        start_time: i64,
    ) -> Result<RunInfo> {
        let body = serde_json::json!({
            "experiment_id": experiment_id,
            "run_name": run_name,
            "start_time": start_time,
        });
        let response: CreateRunResponse = self.post("runs/create", &body).await?;
        let info = response.run.info;
        Ok(RunInfo {
            run_id: info.run_id,
            experiment_id: info.experiment_id,
            run_name: info.run_name.or_else(|| Some(run_name.to_string())),
            status: RunStatus::Running,
            start_time,
            end_time: None,
            artifact_uri: info.artifact_uri,
        })
    }

    async fn log_param(&self, run: &RunInfo, key: &str, value: &str) -> Result<()> {
        let body = serde_json::json!({ "run_id": run.run_id, "key": key, "value": value });
        let _: Empty = self.post("runs/log-parameter", &body).await?;
        Ok(())
    }

    async fn log_artifact(&self, run: &RunInfo, file_name: &str, contents: &[u8]) -> Result<()> {
        match artifact_target(&run.artifact_uri)? {
            ArtifactTarget::Proxy(path) => {
                let url = format!("{}/{ARTIFACTS_PREFIX}/{path}/{file_name}", self.base_url);
                self.send(self.client.put(url).body(contents.to_vec())).await?;
            }
            ArtifactTarget::Local(dir) => {
                let path = dir.join(file_name);
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(path, contents).await?;
            }
        }
        debug!(run_id = %run.run_id, file_name, bytes = contents.len(), "logged artifact");
        Ok(())
    }

    async fn update_run(&self, run: &RunInfo) -> Result<()> {
        let body = serde_json::json!({
            "run_id": run.run_id,
            "status": run.status.as_str(),
            "end_time": run.end_time,
        });
        let _: Empty = self.post("runs/update", &body).await?;
        Ok(())
    }
}
