//! Error types for the imsakiyah-notify crate.
//!
//! All errors use stable string messages suitable for display to users
//! and programmatic handling. No failure here is fatal to the hosting
//! page: each variant maps to one degraded capability (freshness,
//! foreground delivery, background delivery, or offline support).

/// Errors that can occur while fetching schedules or delivering alerts.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Transport failure after exhausting retries. Surfaced as an
    /// empty/stale schedule, never as a crash.
    #[error("network error: {0}")]
    Network(String),

    /// Structurally invalid API response (wrong field shapes). Distinct
    /// from an empty-but-valid response, which yields an empty schedule.
    #[error("parse error: {0}")]
    Parse(String),

    /// The schedule endpoint reported no such resource (unknown location).
    #[error("not found: {0}")]
    NotFound(String),

    /// Notification permission was denied; terminal for the session.
    #[error("notification permission denied: {0}")]
    PermissionDenied(String),

    /// The background worker channel is absent or not yet controlling.
    #[error("background worker unavailable: {0}")]
    WorkerUnavailable(String),

    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for imsakiyah-notify results.
pub type Result<T> = std::result::Result<T, NotifyError>;
