/// Guard client configuration
///
/// Loads the authentication service endpoint, transport timeouts and local
/// verification options. Environment variables override defaults.
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

use guard_core::VerificationOptions;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid base url {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Authentication service base URL, e.g. `http://localhost:8080`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Whole-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// TCP connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Required `iss` for locally verified tokens
    #[serde(default)]
    pub expected_issuer: Option<String>,

    /// Required `aud` for locally verified tokens
    #[serde(default)]
    pub expected_audience: Option<String>,

    /// Clock skew tolerance for `exp`/`nbf` in seconds
    #[serde(default = "default_leeway")]
    pub leeway_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_leeway() -> u64 {
    guard_core::codec::DEFAULT_LEEWAY_SECS
}

fn default_user_agent() -> String {
    format!("bulwark-guard/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            expected_issuer: None,
            expected_audience: None,
            leeway_secs: default_leeway(),
            user_agent: default_user_agent(),
        }
    }
}

impl GuardConfig {
    /// Config pointing at `base_url` with every other field defaulted
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables
    /// Falls back to defaults for development
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            base_url: env::var("BULWARK_BASE_URL").unwrap_or_else(|_| default_base_url()),
            request_timeout_secs: env_parse("BULWARK_REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(default_request_timeout),
            connect_timeout_secs: env_parse("BULWARK_CONNECT_TIMEOUT_SECS")
                .unwrap_or_else(default_connect_timeout),
            expected_issuer: env::var("BULWARK_EXPECTED_ISSUER").ok().filter(|s| !s.is_empty()),
            expected_audience: env::var("BULWARK_EXPECTED_AUDIENCE")
                .ok()
                .filter(|s| !s.is_empty()),
            leeway_secs: env_parse("BULWARK_LEEWAY_SECS").unwrap_or_else(default_leeway),
            user_agent: env::var("BULWARK_USER_AGENT").unwrap_or_else(|_| default_user_agent()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: format!("unsupported scheme {:?}", url.scheme()),
            });
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("request_timeout_secs"));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("connect_timeout_secs"));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Options handed to the token codec for local verification
    pub fn verification_options(&self) -> VerificationOptions {
        VerificationOptions {
            issuer: self.expected_issuer.clone(),
            audience: self.expected_audience.clone(),
            leeway_secs: self.leeway_secs,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GuardConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert!(config.user_agent.starts_with("bulwark-guard/"));
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let config = GuardConfig::new("not a url");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));

        let config = GuardConfig::new("ftp://auth.example.com");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_rejects_zero_timeouts() {
        let config = GuardConfig {
            request_timeout_secs: 0,
            ..GuardConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroTimeout("request_timeout_secs"))
        );
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: GuardConfig =
            serde_json::from_str(r#"{"base_url":"https://auth.example.com","expected_issuer":"bulwark"}"#)
                .unwrap();
        assert_eq!(config.base_url, "https://auth.example.com");
        assert_eq!(config.request_timeout_secs, 30);

        let options = config.verification_options();
        assert_eq!(options.issuer.as_deref(), Some("bulwark"));
        assert_eq!(options.audience, None);
        assert_eq!(options.leeway_secs, 30);
    }
}
