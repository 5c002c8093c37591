//! Prayer-time notification scheduling with offline-capable caching.
//!
//! `imsakiyah-notify` fetches Ramadan prayer schedules from the
//! myquran API, watches the local clock, and raises notifications the
//! minute each prayer time arrives. A background cache worker keeps
//! the app usable offline by replaying previously fetched responses
//! byte for byte.
//!
//! - **Schedule store** ([`store`]): fetches month pages concurrently
//!   with retry and exponential backoff, windows them from the season
//!   anchor, and discards stale responses when the user switches
//!   location mid-flight.
//! - **Scheduler** ([`scheduler`]): coarse 10-second polling against
//!   wall-clock time with a one-minute lateness tolerance and
//!   at-most-once firing per prayer per day.
//! - **Dispatch** ([`dispatch`]): dual delivery through the background
//!   worker and a permission-gated foreground channel, each
//!   independently fallible.
//! - **Worker** ([`worker`]): install/activate lifecycle, versioned
//!   precache, network-first fetch interception with cached fallback,
//!   and push-message alert rendering.
//!
//! # Design
//!
//! Remote data is treated as untrusted: response bodies go through a
//! strict parse step ([`api`]) that distinguishes structural garbage
//! (an error) from a truthful "no data" reply (an empty schedule).
//! Transport, parsing, scheduling, and rendering are separated behind
//! traits ([`store::ScheduleFetch`], [`worker::NetworkFetch`],
//! [`dispatch::AlertSink`], [`permission::PermissionPrompt`]) so every
//! layer is testable without a network or a display.
//!
//! # Example
//!
//! ```no_run
//! use imsakiyah_notify::{load_schedule, NotifyConfig};
//!
//! # async fn demo() -> imsakiyah_notify::Result<()> {
//! let config = NotifyConfig::default();
//! let location = config.default_location();
//! let schedule = load_schedule(&config, &location).await?;
//! for day in schedule.iter() {
//!     println!("{}: maghrib at {}", day.date, day.maghrib);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod location;
pub mod permission;
pub mod scheduler;
pub mod store;
pub mod types;
pub mod worker;

pub use config::NotifyConfig;
pub use dispatch::{Alert, AlertAction, AlertSink, NotificationDispatcher, NotifyChannel};
pub use error::{NotifyError, Result};
pub use permission::{PermissionGate, PermissionPrompt, PermissionState};
pub use scheduler::{NotificationScheduler, SchedulerState};
pub use store::{HttpScheduleFetch, LoadOutcome, ScheduleFetch, ScheduleStore};
pub use types::{LocationSelection, PrayerLabel, Schedule, ScheduleDay};
pub use worker::{BackgroundWorker, CacheStorage, PageMessage, WorkerHandle, WorkerLifecycle};

use chrono::NaiveDate;

/// Minimum location-search query length; shorter queries return no
/// results instead of hitting the endpoint.
pub const MIN_QUERY_LEN: usize = 3;

fn anchor_date(config: &NotifyConfig) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(config.year, config.month, config.start_day).ok_or_else(|| {
        NotifyError::Config(format!(
            "invalid anchor date {:04}-{:02}-{:02}",
            config.year, config.month, config.start_day
        ))
    })
}

/// Fetch and window the schedule for a location in one call.
///
/// Convenience over [`ScheduleStore`] for callers that load once at
/// startup and do not need stale-response arbitration.
///
/// # Errors
///
/// Returns [`NotifyError::Config`] when the configuration is invalid,
/// [`NotifyError::Network`] when the API stays unreachable after
/// retries, [`NotifyError::NotFound`] for an unknown location, and
/// [`NotifyError::Parse`] for a structurally invalid response.
pub async fn load_schedule(
    config: &NotifyConfig,
    location: &LocationSelection,
) -> Result<Schedule> {
    config.validate()?;
    let anchor = anchor_date(config)?;
    let store = ScheduleStore::new(HttpScheduleFetch::new(config)?, config.clone());
    match store.load(location, anchor).await? {
        LoadOutcome::Installed(schedule) => Ok(schedule),
        // A private store with a single load cannot be superseded.
        LoadOutcome::Superseded => Ok(Schedule::new()),
    }
}

/// Search for locations matching a free-text query.
///
/// Queries shorter than [`MIN_QUERY_LEN`] characters (after trimming)
/// return an empty list without touching the network, matching the
/// search box's debounce threshold.
///
/// # Errors
///
/// Returns [`NotifyError::Config`] when the configuration is invalid,
/// [`NotifyError::Network`] on transport failure, and
/// [`NotifyError::Parse`] for a structurally invalid response.
pub async fn search_locations(
    query: &str,
    config: &NotifyConfig,
) -> Result<Vec<LocationSelection>> {
    config.validate()?;
    let trimmed = query.trim();
    if trimmed.chars().count() < MIN_QUERY_LEN {
        tracing::trace!(query = trimmed, "query below search threshold");
        return Ok(Vec::new());
    }
    let store = ScheduleStore::new(HttpScheduleFetch::new(config)?, config.clone());
    store.search_locations(trimmed).await
}
