//! Configuration for the HTTP client.

use std::time::Duration;

/// Configuration for [`crate::HttpTaskApi`].
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL including the API prefix, e.g. `http://localhost:8000/api`
    pub base_url: String,
    /// Timeout applied to every request
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl ApiConfig {
    /// Create a config for the given base URL.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Base URL without trailing slashes.
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_builder() {
        let config = ApiConfig::new("http://tasks.lan/api/").with_request_timeout(Duration::from_secs(3));
        assert_eq!(config.normalized_base_url(), "http://tasks.lan/api");
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(ApiConfig::default().request_timeout, Duration::from_secs(10));
    }
}
