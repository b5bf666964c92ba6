//! Connection settings for the target service

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default endpoint when none is configured
pub const DEFAULT_URL: &str = "http://localhost:9200";

/// Configuration validation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientConfigError {
    /// A required configuration field is missing.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The endpoint is not an http(s) URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// A timeout value is out of acceptable range.
    #[error("invalid timeout: {0:?}")]
    InvalidTimeout(Duration),

    /// Zero idle connections per host.
    #[error("pool size must be at least 1")]
    InvalidPoolSize,
}

/// Configuration for creating an OpenSearch client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL, scheme included
    #[serde(default = "default_url")]
    pub url: String,

    /// Basic-auth user
    #[serde(default)]
    pub username: Option<String>,

    /// Basic-auth password
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Request timeout
    #[serde(default = "default_request_timeout")]
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Connection timeout
    #[serde(default = "default_connect_timeout")]
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Idle connections kept per host
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Accept self-signed certificates
    #[serde(default)]
    pub insecure: bool,
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_pool_size() -> usize {
    25
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_URL)
    }
}

impl ClientConfig {
    /// Create a config pointing at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            pool_size: default_pool_size(),
            insecure: false,
        }
    }

    /// Set basic-auth credentials. Empty strings leave auth disabled.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let username = username.into();
        let password = password.into();
        if username.is_empty() && password.is_empty() {
            self.username = None;
            self.password = None;
        } else {
            self.username = Some(username);
            self.password = Some(password);
        }
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the idle pool size per host.
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    /// Accept invalid TLS certificates.
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ClientConfigError> {
        if self.url.trim().is_empty() {
            return Err(ClientConfigError::MissingField("url"));
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(ClientConfigError::InvalidUrl(self.url.clone()));
        }

        // 1s to 1h for requests, 1s to 5m for connects
        if self.request_timeout < Duration::from_secs(1)
            || self.request_timeout > Duration::from_secs(3600)
        {
            return Err(ClientConfigError::InvalidTimeout(self.request_timeout));
        }
        if self.connect_timeout < Duration::from_secs(1)
            || self.connect_timeout > Duration::from_secs(300)
        {
            return Err(ClientConfigError::InvalidTimeout(self.connect_timeout));
        }

        if self.pool_size == 0 {
            return Err(ClientConfigError::InvalidPoolSize);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.url, "http://localhost:9200");
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.pool_size, 25);
        assert!(config.username.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_credentials_disable_auth() {
        let config = ClientConfig::default().with_credentials("", "");
        assert!(config.username.is_none());
        assert!(config.password.is_none());

        let config = ClientConfig::default().with_credentials("admin", "admin");
        assert_eq!(config.username.as_deref(), Some("admin"));
    }

    #[test]
    fn test_base_url_trims_slash() {
        let config = ClientConfig::new("https://search.local:9200/");
        assert_eq!(config.base_url(), "https://search.local:9200");
    }

    #[test]
    fn test_validate() {
        assert_eq!(
            ClientConfig::new("").validate(),
            Err(ClientConfigError::MissingField("url"))
        );
        assert!(matches!(
            ClientConfig::new("localhost:9200").validate(),
            Err(ClientConfigError::InvalidUrl(_))
        ));
        assert!(ClientConfig::default()
            .with_request_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(ClientConfig::default()
            .with_connect_timeout(Duration::from_secs(600))
            .validate()
            .is_err());
        assert_eq!(
            ClientConfig::default().with_pool_size(0).validate(),
            Err(ClientConfigError::InvalidPoolSize)
        );
    }

    #[test]
    fn test_deserialize_humantime() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"url": "https://os:9200", "request_timeout": "2m", "password": "secret"}"#,
        )
        .unwrap();

        assert_eq!(config.request_timeout, Duration::from_secs(120));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.password.as_deref(), Some("secret"));

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
