use std::time::Duration;

use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.checknumber.ai";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Everything a [`crate::api::TaskClient`] needs that doesn't change between
/// tasks.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: Url,
    /// Upload and status calls.
    pub request_timeout: Duration,
    /// Result downloads, which can be large.
    pub download_timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            // Constant, checked by the `defaults` test
            base_url: Url::parse(DEFAULT_BASE_URL).unwrap(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }
}
