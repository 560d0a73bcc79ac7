//! Experiment tracking for question-answering runs.
//!
//! Records run parameters and output artifacts either in a local directory
//! ([`FileTrackingStore`]) or on an MLflow tracking server
//! ([`MlflowRestStore`]). [`TrackingUri`] picks the backend from an
//! `MLFLOW_TRACKING_URI` value, and [`ExperimentTracker`] manages the run
//! lifecycle on top of either.

pub mod error;
pub mod file;
pub mod mlflow;
pub mod model;
pub mod store;
pub mod tracker;
pub mod uri;

pub use error::{Result, TrackingError};
pub use file::{DEFAULT_TRACKING_DIR, FileTrackingStore};
pub use mlflow::{Credentials, MlflowRestStore};
pub use model::{Experiment, RunInfo, RunStatus};
pub use store::TrackingStore;
pub use tracker::{
    ActiveRun, ExperimentTracker, MAX_PARAM_KEY_LEN, MAX_PARAM_VALUE_LEN, validate_param,
};
pub use uri::TrackingUri;
