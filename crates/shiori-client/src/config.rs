//! Gateway configuration.

use shiori_core::defaults;

/// Configuration for the catalog gateway.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Base URL of the remote catalog API.
    pub base_url: String,
    /// Bearer credential for authenticated operations (optional; public
    /// reads work without one).
    pub token: Option<String>,
    /// Page size for search reads.
    pub page_size: u32,
    /// Transport timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::BASE_URL.to_string(),
            token: None,
            page_size: defaults::SEARCH_PAGE_SIZE,
            timeout_seconds: defaults::TIMEOUT_SECS,
        }
    }
}

impl CatalogConfig {
    /// Create from environment variables.
    ///
    /// Reads:
    /// - `SHIORI_API_URL` (default: [`defaults::BASE_URL`])
    /// - `SHIORI_API_TOKEN` (default: none)
    /// - `SHIORI_PAGE_SIZE` (default: [`defaults::SEARCH_PAGE_SIZE`])
    /// - `SHIORI_TIMEOUT_SECS` (default: [`defaults::TIMEOUT_SECS`])
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("SHIORI_API_URL")
                .unwrap_or_else(|_| defaults::BASE_URL.to_string()),
            token: std::env::var("SHIORI_API_TOKEN").ok().filter(|t| !t.is_empty()),
            page_size: std::env::var("SHIORI_PAGE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::SEARCH_PAGE_SIZE),
            timeout_seconds: std::env::var("SHIORI_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::TIMEOUT_SECS),
        }
    }

    /// Set the bearer credential.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Point at a different base URL (tests, mirrors).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}
