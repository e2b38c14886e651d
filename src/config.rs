//! Labeler configuration
//!
//! Read from the environment by the binary, or assembled with the `with_*`
//! builders in tests and embedding code.

use moderation::ConfigError;
use std::path::PathBuf;
use std::time::Duration;

/// Directory holding rule listings and reference images
pub const INPUT_DIR_ENV: &str = "LABELER_INPUT_DIR";
/// PDS or entryway used for every XRPC call
pub const SERVICE_URL_ENV: &str = "BSKY_SERVICE_URL";
/// Moderator handle or email
pub const IDENTIFIER_ENV: &str = "BSKY_ID";
/// Moderator password
pub const PASSWORD_ENV: &str = "BSKY_PWD";
/// DID of the labeler service
pub const LABELER_DID_ENV: &str = "LABELER_DID";

/// Moderator login for the label store
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Handle or email
    pub identifier: String,
    /// Account or app password
    pub password: String,
    /// DID of the labeler the moderator acts for
    pub labeler_did: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("password", &"<redacted>")
            .field("labeler_did", &self.labeler_did)
            .finish()
    }
}

/// Runtime settings for the labeler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelerConfig {
    /// Directory with the rule listings and reference images
    pub input_dir: PathBuf,
    /// Base URL for XRPC calls
    pub service_url: String,
    /// Timeout of each HTTP request
    pub timeout: Duration,
    /// Moderator login; only needed to write labels
    pub credentials: Option<Credentials>,
}

impl Default for LabelerConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            service_url: "https://bsky.social".to_string(),
            timeout: Duration::from_secs(30),
            credentials: None,
        }
    }
}

impl LabelerConfig {
    /// Config reading inputs from `input_dir`
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            ..Default::default()
        }
    }

    /// Set the XRPC service URL
    pub fn with_service_url(mut self, service_url: impl Into<String>) -> Self {
        self.service_url = service_url.into();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the moderator login
    pub fn with_credentials(
        mut self,
        identifier: impl Into<String>,
        password: impl Into<String>,
        labeler_did: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials {
            identifier: identifier.into(),
            password: password.into(),
            labeler_did: labeler_did.into(),
        });
        self
    }

    /// Read settings from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`
    ///
    /// The input directory and service URL fall back to their defaults.
    /// Credentials are all-or-nothing: once any of them is set, the others
    /// are required.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Self::default();
        if let Some(dir) = get(INPUT_DIR_ENV) {
            config.input_dir = PathBuf::from(dir);
        }
        if let Some(url) = get(SERVICE_URL_ENV) {
            config.service_url = url;
        }

        let identifier = get(IDENTIFIER_ENV);
        let password = get(PASSWORD_ENV);
        let labeler_did = get(LABELER_DID_ENV);
        if identifier.is_some() || password.is_some() || labeler_did.is_some() {
            config.credentials = Some(Credentials {
                identifier: identifier.ok_or(ConfigError::MissingEnv(IDENTIFIER_ENV))?,
                password: password.ok_or(ConfigError::MissingEnv(PASSWORD_ENV))?,
                labeler_did: labeler_did.ok_or(ConfigError::MissingEnv(LABELER_DID_ENV))?,
            });
        }

        Ok(config)
    }

    /// Moderator login, or the first variable that would provide it
    pub fn require_credentials(&self) -> Result<&Credentials, ConfigError> {
        self.credentials
            .as_ref()
            .ok_or(ConfigError::MissingEnv(IDENTIFIER_ENV))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LabelerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, LabelerConfig::default());
        assert!(matches!(
            config.require_credentials(),
            Err(ConfigError::MissingEnv("BSKY_ID"))
        ));
    }

    #[test]
    fn test_full_environment() {
        let config = LabelerConfig::from_lookup(lookup(&[
            ("LABELER_INPUT_DIR", "/srv/labeler"),
            ("BSKY_SERVICE_URL", "https://pds.example"),
            ("BSKY_ID", "mod.example"),
            ("BSKY_PWD", "hunter2"),
            ("LABELER_DID", "did:plc:labeler"),
        ]))
        .unwrap();

        assert_eq!(config.input_dir, PathBuf::from("/srv/labeler"));
        assert_eq!(config.service_url, "https://pds.example");
        let creds = config.require_credentials().unwrap();
        assert_eq!(creds.identifier, "mod.example");
        assert_eq!(creds.labeler_did, "did:plc:labeler");
    }

    #[test]
    fn test_partial_credentials() {
        let err = LabelerConfig::from_lookup(lookup(&[("BSKY_ID", "mod.example"), ("BSKY_PWD", "x")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv("LABELER_DID")));

        let err = LabelerConfig::from_lookup(lookup(&[("BSKY_PWD", "x"), ("BSKY_ID", "  ")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv("BSKY_ID")));
    }

    #[test]
    fn test_builders() {
        let config = LabelerConfig::new("/tmp/in")
            .with_service_url("http://localhost:2583")
            .with_timeout(Duration::from_secs(5))
            .with_credentials("mod", "pw", "did:plc:labeler");

        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.require_credentials().is_ok());
        assert!(!format!("{:?}", config).contains("pw\""));
    }
}
