//! Process configuration from the environment and `.env`.

use std::path::PathBuf;

use ragqa_tracking::{Credentials, TrackingError, TrackingUri};
use thiserror::Error;

/// Configuration problems detected before any work starts.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("OPENAI_API_KEY not found; set it in the environment or a .env file")]
    MissingApiKey,

    #[error("invalid MLFLOW_TRACKING_URI: {0}")]
    InvalidTrackingUri(#[source] TrackingError),
}

/// Everything the binary reads from its environment.
#[derive(Clone)]
pub struct Settings {
    pub openai_api_key: String,
    pub openai_base_url: Option<String>,
    pub tracking_uri: TrackingUri,
    pub tracking_credentials: Credentials,
    /// Directory holding the embedding model files.
    pub model_dir: Option<PathBuf>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("openai_api_key", &"<redacted>")
            .field("openai_base_url", &self.openai_base_url)
            .field("tracking_uri", &self.tracking_uri)
            .field("tracking_credentials", &self.tracking_credentials)
            .field("model_dir", &self.model_dir)
            .finish()
    }
}

impl Settings {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from a variable lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_api_key = get("OPENAI_API_KEY").ok_or(SettingsError::MissingApiKey)?;
        let tracking_uri = TrackingUri::parse(get("MLFLOW_TRACKING_URI").as_deref())
            .map_err(SettingsError::InvalidTrackingUri)?;

        let tracking_credentials = match (
            get("MLFLOW_TRACKING_TOKEN"),
            get("MLFLOW_TRACKING_USERNAME"),
            get("MLFLOW_TRACKING_PASSWORD"),
        ) {
            (Some(token), _, _) => Credentials::Bearer(token),
            (None, Some(username), password) => {
                Credentials::Basic { username, password: password.unwrap_or_default() }
            }
            (None, None, _) => Credentials::None,
        };

        Ok(Self {
            openai_api_key,
            openai_base_url: get("OPENAI_BASE_URL"),
            tracking_uri,
            tracking_credentials,
            model_dir: get("RAGQA_MODEL_DIR").map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, SettingsError> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn missing_or_blank_key_is_an_error() {
        assert!(matches!(settings(&[]), Err(SettingsError::MissingApiKey)));
        assert!(matches!(
            settings(&[("OPENAI_API_KEY", "   ")]),
            Err(SettingsError::MissingApiKey)
        ));
    }

    #[test]
    fn defaults_with_only_a_key() {
        let s = settings(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert_eq!(s.openai_api_key, "sk-test");
        assert_eq!(s.openai_base_url, None);
        assert_eq!(s.tracking_uri, TrackingUri::default());
        assert_eq!(s.tracking_credentials, Credentials::None);
        assert_eq!(s.model_dir, None);
    }

    #[test]
    fn token_wins_over_basic_auth() {
        let s = settings(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("MLFLOW_TRACKING_URI", "http://localhost:5000"),
            ("MLFLOW_TRACKING_TOKEN", "tok"),
            ("MLFLOW_TRACKING_USERNAME", "alice"),
        ])
        .unwrap();
        assert_eq!(s.tracking_uri, TrackingUri::Http("http://localhost:5000".into()));
        assert_eq!(s.tracking_credentials, Credentials::Bearer("tok".into()));

        let s = settings(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("MLFLOW_TRACKING_USERNAME", "alice"),
            ("MLFLOW_TRACKING_PASSWORD", "pw"),
        ])
        .unwrap();
        assert_eq!(
            s.tracking_credentials,
            Credentials::Basic { username: "alice".into(), password: "pw".into() }
        );
    }

    #[test]
    fn bad_tracking_uri_is_a_settings_error() {
        assert!(matches!(
            settings(&[("OPENAI_API_KEY", "sk-test"), ("MLFLOW_TRACKING_URI", "sqlite:///x.db")]),
            Err(SettingsError::InvalidTrackingUri(_))
        ));
    }

    #[test]
    fn debug_redacts_the_key() {
        let s = settings(&[("OPENAI_API_KEY", "sk-very-secret")]).unwrap();
        assert!(!format!("{s:?}").contains("sk-very-secret"));
    }
}
