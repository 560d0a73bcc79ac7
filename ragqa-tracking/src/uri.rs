//! Tracking URI parsing and backend selection.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{Result, TrackingError};
use crate::file::{DEFAULT_TRACKING_DIR, FileTrackingStore};
use crate::mlflow::{Credentials, MlflowRestStore};
use crate::store::TrackingStore;

/// Where tracking data goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingUri {
    /// A local directory.
    File(PathBuf),
    /// An MLflow tracking server base URL.
    Http(String),
}

impl Default for TrackingUri {
    fn default() -> Self {
        Self::File(PathBuf::from(DEFAULT_TRACKING_DIR))
    }
}

impl TrackingUri {
    /// Parse an `MLFLOW_TRACKING_URI` value.
    ///
    /// `http://` and `https://` select a tracking server, `file:` URIs and bare
    /// paths select a local directory, and an unset or blank value selects
    /// `./mlruns`. Other schemes are rejected.
    pub fn parse(uri: Option<&str>) -> Result<Self> {
        let Some(uri) = uri.map(str::trim).filter(|u| !u.is_empty()) else {
            return Ok(Self::default());
        };
        let invalid = |reason: &str| TrackingError::InvalidUri {
            uri: uri.to_string(),
            reason: reason.to_string(),
        };

        if uri.starts_with("http://") || uri.starts_with("https://") {
            let url = reqwest::Url::parse(uri).map_err(|e| invalid(&e.to_string()))?;
            if url.host_str().is_none_or(str::is_empty) {
                return Err(invalid("missing host"));
            }
            return Ok(Self::Http(uri.trim_end_matches('/').to_string()));
        }

        if let Some(rest) = uri.strip_prefix("file:") {
            let path = rest.strip_prefix("//").unwrap_or(rest);
            if path.is_empty() {
                return Err(invalid("empty path"));
            }
            return Ok(Self::File(PathBuf::from(path)));
        }

        if let Some((scheme, _)) = uri.split_once("://") {
            return Err(invalid(&format!("unsupported scheme '{scheme}'")));
        }

        Ok(Self::File(PathBuf::from(uri)))
    }

    /// Build the store for this URI. Credentials apply to tracking servers only.
    pub fn open(&self, credentials: Credentials) -> Arc<dyn TrackingStore> {
        match self {
            Self::File(root) => Arc::new(FileTrackingStore::new(root.clone())),
            Self::Http(base_url) => Arc::new(MlflowRestStore::new(base_url.clone(), credentials)),
        }
    }
}

impl std::fmt::Display for TrackingUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Http(url) => f.write_str(url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_or_blank_defaults_to_mlruns() {
        assert_eq!(TrackingUri::parse(None).unwrap(), TrackingUri::File("mlruns".into()));
        assert_eq!(TrackingUri::parse(Some("  ")).unwrap(), TrackingUri::File("mlruns".into()));
    }

    #[test]
    fn http_uris_select_the_server() {
        assert_eq!(
            TrackingUri::parse(Some("http://localhost:5000/")).unwrap(),
            TrackingUri::Http("http://localhost:5000".into())
        );
        assert_eq!(
            TrackingUri::parse(Some("https://mlflow.example.com")).unwrap(),
            TrackingUri::Http("https://mlflow.example.com".into())
        );
    }

    #[test]
    fn file_uris_and_paths_select_a_directory() {
        assert_eq!(
            TrackingUri::parse(Some("file:///tmp/mlruns")).unwrap(),
            TrackingUri::File("/tmp/mlruns".into())
        );
        assert_eq!(
            TrackingUri::parse(Some("file:runs")).unwrap(),
            TrackingUri::File("runs".into())
        );
        assert_eq!(
            TrackingUri::parse(Some("./experiments")).unwrap(),
            TrackingUri::File("./experiments".into())
        );
    }

    #[test]
    fn unsupported_uris_are_rejected() {
        for uri in ["databricks://profile", "sqlite:///mlflow.db", "file://", "http://"] {
            assert!(
                matches!(TrackingUri::parse(Some(uri)), Err(TrackingError::InvalidUri { .. })),
                "{uri}"
            );
        }
    }
}
