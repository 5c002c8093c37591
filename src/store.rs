//! Schedule fetching with retry/backoff, windowing, and race resolution.
//!
//! [`ScheduleStore`] owns the in-memory active schedule. Each call to
//! [`ScheduleStore::load`] fetches the month pages covering the
//! reference date plus 32 days, concatenates them chronologically,
//! windows from the configured anchor, and installs the result —
//! unless a newer `load` started in the meantime, in which case the
//! stale result is discarded (last-location-wins).

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{Datelike, Days, NaiveDate};

use crate::api;
use crate::config::NotifyConfig;
use crate::error::{NotifyError, Result};
use crate::http;
use crate::types::{LocationSelection, Schedule};

/// Days past the reference date the fetched pages must cover.
const FETCH_HORIZON_DAYS: u64 = 32;

/// Transport backend for the schedule API.
///
/// Implementors return raw response bodies; parsing happens in a
/// separate step so transport retries never mask a structural problem.
/// All implementations must be `Send + Sync` for concurrent page fetches.
pub trait ScheduleFetch: Send + Sync {
    /// Fetch one month page for a location.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Network`] on transport failure or
    /// [`NotifyError::NotFound`] when the endpoint reports no such
    /// location. Transport failures are retried by the store.
    fn fetch_month(
        &self,
        location_id: &str,
        year: i32,
        month: u32,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Fetch location-search results for a free-text query.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Network`] on transport failure.
    fn fetch_locations(&self, query: &str) -> impl Future<Output = Result<String>> + Send;
}

/// [`ScheduleFetch`] implementation backed by the live myquran API.
#[derive(Debug, Clone)]
pub struct HttpScheduleFetch {
    client: reqwest::Client,
    base_url: url::Url,
}

impl HttpScheduleFetch {
    /// Build an HTTP fetcher from the configured base URL and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Config`] if the base URL does not parse,
    /// or [`NotifyError::Network`] if the client cannot be constructed.
    pub fn new(config: &NotifyConfig) -> Result<Self> {
        let base_url = url::Url::parse(config.api_base_url.trim_end_matches('/'))
            .map_err(|e| NotifyError::Config(format!("invalid api_base_url: {e}")))?;
        Ok(Self {
            client: http::build_client(config)?,
            base_url,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<url::Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| NotifyError::Config("api_base_url cannot be a base".into()))?
            .extend(segments);
        Ok(url)
    }

    async fn get_text(&self, url: url::Url) -> Result<String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| NotifyError::Network(format!("request to {url} failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(NotifyError::NotFound(format!("{url} returned 404")));
        }
        if !response.status().is_success() {
            return Err(NotifyError::Network(format!(
                "{url} returned HTTP {}",
                response.status()
            )));
        }
        response
            .text()
            .await
            .map_err(|e| NotifyError::Network(format!("reading body from {url} failed: {e}")))
    }
}

impl ScheduleFetch for HttpScheduleFetch {
    async fn fetch_month(&self, location_id: &str, year: i32, month: u32) -> Result<String> {
        let url = self.endpoint(&[
            "sholat",
            "jadwal",
            location_id,
            &year.to_string(),
            &month.to_string(),
        ])?;
        self.get_text(url).await
    }

    async fn fetch_locations(&self, query: &str) -> Result<String> {
        let url = self.endpoint(&["sholat", "kota", "cari", query])?;
        self.get_text(url).await
    }
}

/// Outcome of a [`ScheduleStore::load`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The fetched schedule was installed as the active schedule.
    Installed(Schedule),
    /// A newer `load` started before this one resolved; the result was
    /// discarded and the newer call's schedule remains active.
    Superseded,
}

#[derive(Debug, Clone)]
struct ActiveSchedule {
    token: u64,
    location: LocationSelection,
    schedule: Schedule,
}

/// Fetches and owns the active prayer schedule.
pub struct ScheduleStore<F: ScheduleFetch> {
    fetch: F,
    config: NotifyConfig,
    next_token: AtomicU64,
    active: Mutex<Option<ActiveSchedule>>,
}

impl<F: ScheduleFetch> ScheduleStore<F> {
    /// Create a store over the given transport backend.
    pub fn new(fetch: F, config: NotifyConfig) -> Self {
        Self {
            fetch,
            config,
            next_token: AtomicU64::new(0),
            active: Mutex::new(None),
        }
    }

    /// Load the schedule for a location around a reference date.
    ///
    /// Fetches every month page covering `[reference, reference + 32
    /// days]` concurrently, concatenates the pages in chronological
    /// order, and windows `window_days` days from the configured
    /// `(start_day, month)` anchor (full set when the anchor is
    /// absent). Each transport failure is retried up to `max_retries`
    /// times with doubling backoff before surfacing.
    ///
    /// A request token is attached per call; if a newer `load` starts
    /// before this one resolves, the result is discarded and
    /// [`LoadOutcome::Superseded`] is returned.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Network`] after exhausting retries,
    /// [`NotifyError::NotFound`] for an unknown location, or
    /// [`NotifyError::Parse`] for a structurally invalid response.
    pub async fn load(
        &self,
        location: &LocationSelection,
        reference: NaiveDate,
    ) -> Result<LoadOutcome> {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(%location, %reference, token, "loading schedule");

        let months = months_covering(reference, FETCH_HORIZON_DAYS);
        let fetches = months
            .iter()
            .map(|&(year, month)| self.fetch_month_with_retry(&location.id, year, month));
        let bodies = futures::future::join_all(fetches).await;

        let mut combined = Schedule::new();
        for body in bodies {
            let page = api::parse_month(&body?)?;
            for day in page.iter() {
                combined.push(day.clone());
            }
        }

        let windowed = combined.window_from_anchor(
            self.config.start_day,
            self.config.month,
            self.config.window_days,
        );

        self.install(token, location.clone(), windowed)
    }

    /// Returns the active location and schedule, if one is installed.
    pub fn current(&self) -> Option<(LocationSelection, Schedule)> {
        match self.active.lock() {
            Ok(active) => active
                .as_ref()
                .map(|a| (a.location.clone(), a.schedule.clone())),
            Err(_) => None,
        }
    }

    /// Search for locations by free-text query.
    ///
    /// The 3-character minimum is the caller's responsibility; this
    /// lookup forwards whatever it is given. No retries — a failed
    /// search is retried by the next keystroke, not by the store.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Network`] on transport failure or
    /// [`NotifyError::Parse`] for a structurally invalid response.
    pub async fn search_locations(&self, query: &str) -> Result<Vec<LocationSelection>> {
        let body = self.fetch.fetch_locations(query).await?;
        api::parse_locations(&body)
    }

    async fn fetch_month_with_retry(
        &self,
        location_id: &str,
        year: i32,
        month: u32,
    ) -> Result<String> {
        let mut backoff = Duration::from_millis(self.config.initial_backoff_ms);
        let mut attempt = 0u32;
        loop {
            match self.fetch.fetch_month(location_id, year, month).await {
                Ok(body) => return Ok(body),
                // Only transport failures can heal with time; anything
                // else (NotFound, Config) fails the same way every try.
                Err(err) if !matches!(err, NotifyError::Network(_)) => return Err(err),
                Err(err) => {
                    if attempt >= self.config.max_retries {
                        return Err(NotifyError::Network(format!(
                            "giving up on {year}-{month:02} after {attempt} retries: {err}"
                        )));
                    }
                    attempt += 1;
                    tracing::warn!(
                        year,
                        month,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "month fetch failed; retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
    }

    fn install(
        &self,
        token: u64,
        location: LocationSelection,
        schedule: Schedule,
    ) -> Result<LoadOutcome> {
        let latest = self.next_token.load(Ordering::SeqCst);
        if token < latest {
            tracing::debug!(token, latest, "discarding stale schedule result");
            return Ok(LoadOutcome::Superseded);
        }
        if let Ok(mut active) = self.active.lock() {
            // Re-check under the lock: a newer result may have installed
            // while this call was parsing.
            if let Some(existing) = active.as_ref() {
                if existing.token > token {
                    return Ok(LoadOutcome::Superseded);
                }
            }
            *active = Some(ActiveSchedule {
                token,
                location,
                schedule: schedule.clone(),
            });
        }
        Ok(LoadOutcome::Installed(schedule))
    }
}

/// Enumerate `(year, month)` pairs from `reference` through
/// `reference + horizon_days`, in chronological order.
fn months_covering(reference: NaiveDate, horizon_days: u64) -> Vec<(i32, u32)> {
    let end = reference
        .checked_add_days(Days::new(horizon_days))
        .unwrap_or(reference);
    let mut months = Vec::new();
    let mut year = reference.year();
    let mut month = reference.month();
    loop {
        months.push((year, month));
        if (year, month) >= (end.year(), end.month()) {
            break;
        }
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    months
}
