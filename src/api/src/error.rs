//! Error types for event ingestion.

use std::time::Duration;

/// Failure of a single extraction attempt.
///
/// Every variant is reported as "fetch failure" once it leaves the cache.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("failed to launch browser: {0}")]
    BrowserLaunch(String),
    #[error("navigation to {url} timed out after {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },
    #[error("no element matching `{selector}` appeared within {timeout:?}")]
    ElementWaitTimeout { selector: String, timeout: Duration },
    #[error("browser session error: {0}")]
    Browser(String),
}

/// Raised by the events cache when there is nothing to serve.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("events unavailable and nothing cached")]
    Unavailable(#[source] FetchError),
}
