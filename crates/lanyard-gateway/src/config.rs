use std::time::Duration;

/// Settings for the REST gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the REST API, without a trailing slash
    /// (e.g. `https://api.example.com`). Resource paths are appended
    /// verbatim.
    pub base_url: String,

    /// Per-request deadline, covering connect, send and the full body
    /// read. Elapsed deadlines surface as transport errors; the gateway
    /// never retries them.
    pub request_timeout: Duration,
}

impl GatewayConfig {
    /// Config with the default timeout. A trailing slash on the base URL
    /// is stripped so path joining stays predictable.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(15),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_strips_trailing_slash() {
        let config = GatewayConfig::new("https://api.example.com/");
        assert_eq!(config.base_url, "https://api.example.com");
    }

    #[test]
    fn test_new_keeps_clean_url_untouched() {
        let config = GatewayConfig::new("http://localhost:8080");
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.request_timeout, Duration::from_secs(15));
    }
}
