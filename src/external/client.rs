use std::time::Duration;

use crate::error::{AppError, AppResult};

const USER_AGENT: &str = concat!("freelancelot/", env!("CARGO_PKG_VERSION"));

/// Builds an HTTP client for one collaborator.
///
/// Each source or notifier owns its client, so timeouts are per
/// collaborator and tests can point them at local servers.
///
/// - gzip responses, HTTP/2 keep-alive and pooled connections
/// - `timeout` bounds the whole request, `connect_timeout` the TCP/TLS handshake
pub fn build_http_client(timeout: Duration, connect_timeout: Duration) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(connect_timeout.min(timeout))
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(90))
        .http2_keep_alive_interval(Duration::from_secs(10))
        .http2_keep_alive_timeout(Duration::from_secs(20))
        .gzip(true)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| AppError::Internal {
            source: anyhow::Error::from(e).context("building HTTP client"),
        })
}
