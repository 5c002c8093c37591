//! Shared HTTP client for schedule API requests.
//!
//! Provides a configured [`reqwest::Client`] with gzip decompression
//! and the timeout taken from [`NotifyConfig`].

use crate::config::NotifyConfig;
use crate::error::NotifyError;
use std::time::Duration;

/// User-Agent sent with every schedule API request.
const USER_AGENT: &str = concat!("imsakiyah-notify/", env!("CARGO_PKG_VERSION"));

/// Build a [`reqwest::Client`] configured for the schedule API.
///
/// The client has:
/// - Timeout from config
/// - Gzip decompression
/// - A stable crate User-Agent
///
/// # Errors
///
/// Returns [`NotifyError::Network`] if the client cannot be constructed.
pub fn build_client(config: &NotifyConfig) -> Result<reqwest::Client, NotifyError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| NotifyError::Network(format!("failed to build HTTP client: {e}")))
}
