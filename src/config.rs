//! Crate configuration with sensible defaults.
//!
//! [`NotifyConfig`] controls the remote endpoint, the season anchor and
//! fetch window, retry behaviour, the scheduler tick period, and the
//! background worker's cache identity. The defaults reproduce the
//! Ramadan 1447H (February 2026) deployment.

use crate::error::NotifyError;

/// Configuration for schedule fetching, notification scheduling, and
/// offline caching.
///
/// Use [`Default::default()`] for the production values, or construct
/// with field overrides for custom behaviour.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    /// Base URL of the remote schedule API.
    pub api_base_url: String,
    /// Calendar year of the covered season.
    pub year: i32,
    /// Calendar month (1–12) the anchor day falls in.
    pub month: u32,
    /// Day-of-month of the window anchor (first day of Ramadan).
    pub start_day: u32,
    /// Number of days returned from the anchor onward.
    pub window_days: usize,
    /// Default location id used before the user selects one.
    pub default_location_id: String,
    /// Default location display name.
    pub default_location_name: String,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// Maximum number of retries after a failed network call.
    pub max_retries: u32,
    /// First retry delay in milliseconds; doubles on each retry.
    pub initial_backoff_ms: u64,
    /// Scheduler tick period in seconds.
    pub tick_interval_secs: u64,
    /// Versioned cache name; changing it purges all prior generations.
    pub cache_name: String,
    /// Static asset paths precached by the background worker on install.
    pub precache_assets: Vec<String>,
    /// Icon path used for alerts.
    pub icon_path: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.myquran.com/v2".into(),
            year: 2026,
            month: 2,
            start_day: 19,
            window_days: 30,
            default_location_id: "1301".into(),
            default_location_name: "JAKARTA".into(),
            timeout_seconds: 8,
            max_retries: 5,
            initial_backoff_ms: 1000,
            tick_interval_secs: 10,
            cache_name: "imsakiyah-cache-v2".into(),
            precache_assets: vec![
                "/".into(),
                "/manifest.json".into(),
                "/logo-imsakiyah.png".into(),
            ],
            icon_path: "/logo-imsakiyah.png".into(),
        }
    }
}

impl NotifyConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `api_base_url` must not be empty
    /// - `month` must be in 1–12 and `start_day` in 1–31
    /// - `window_days` must be greater than 0
    /// - `timeout_seconds` and `tick_interval_secs` must be greater than 0
    /// - `initial_backoff_ms` must be greater than 0
    /// - `cache_name` must not be empty
    pub fn validate(&self) -> Result<(), NotifyError> {
        if self.api_base_url.trim().is_empty() {
            return Err(NotifyError::Config("api_base_url must not be empty".into()));
        }
        if !(1..=12).contains(&self.month) {
            return Err(NotifyError::Config("month must be in 1..=12".into()));
        }
        if !(1..=31).contains(&self.start_day) {
            return Err(NotifyError::Config("start_day must be in 1..=31".into()));
        }
        if self.window_days == 0 {
            return Err(NotifyError::Config(
                "window_days must be greater than 0".into(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(NotifyError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.tick_interval_secs == 0 {
            return Err(NotifyError::Config(
                "tick_interval_secs must be greater than 0".into(),
            ));
        }
        if self.initial_backoff_ms == 0 {
            return Err(NotifyError::Config(
                "initial_backoff_ms must be greater than 0".into(),
            ));
        }
        if self.cache_name.trim().is_empty() {
            return Err(NotifyError::Config("cache_name must not be empty".into()));
        }
        Ok(())
    }

    /// Returns the default location as a selection value.
    pub fn default_location(&self) -> crate::types::LocationSelection {
        crate::types::LocationSelection::new(
            self.default_location_id.clone(),
            self.default_location_name.clone(),
        )
    }
}
