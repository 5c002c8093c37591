//! Alert construction and dual-channel notification dispatch.
//!
//! [`NotificationDispatcher`] hides two heterogeneous delivery
//! mechanisms behind one contract: a cross-context message to the
//! background worker (fires even when the tab is backgrounded) and a
//! foreground alert gated by [`PermissionGate`]. Each channel is
//! independently fallible and independently optional; a channel
//! failure is logged and never propagates to the scheduler.

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::error::{NotifyError, Result};
use crate::permission::PermissionGate;
use crate::types::PrayerLabel;
use crate::worker::{PageMessage, WorkerHandle};

/// A platform alert, ready to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// Alert title.
    pub title: String,
    /// Alert body text.
    pub body: String,
    /// Icon path.
    pub icon: String,
    /// Badge path, when the renderer supports one.
    pub badge: Option<String>,
    /// Coalescing tag: a repeat alert with the same tag replaces the
    /// prior one instead of stacking.
    pub tag: Option<String>,
    /// Whether the alert stays until explicitly dismissed.
    pub require_interaction: bool,
    /// Vibration pattern in milliseconds.
    pub vibrate: Vec<u32>,
    /// Action buttons.
    pub actions: Vec<AlertAction>,
}

/// One action button on an [`Alert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertAction {
    /// Action identifier reported on click.
    pub action: String,
    /// Button label.
    pub title: String,
}

/// Renders alerts on the platform.
///
/// The production implementation binds to the platform notification
/// surface; tests record what would have been shown.
pub trait AlertSink: Send + Sync {
    /// Render the alert.
    ///
    /// # Errors
    ///
    /// Returns any error verbatim; callers treat a failed render as a
    /// degraded channel, never as fatal.
    fn show(&self, alert: Alert) -> Result<()>;
}

/// Builds the alert text for a prayer at a location.
pub(crate) fn prayer_alert_text(label: PrayerLabel, location_name: &str) -> (String, String) {
    (
        format!("Waktunya {label}"),
        format!("Jadwal {label} untuk wilayah {location_name} telah tiba."),
    )
}

/// One delivery channel behind the dispatch contract.
pub trait NotifyChannel: Send + Sync {
    /// Short channel name for logging.
    fn name(&self) -> &'static str;

    /// Deliver an alert for the given prayer.
    ///
    /// # Errors
    ///
    /// [`NotifyError::WorkerUnavailable`] / [`NotifyError::PermissionDenied`]
    /// mean the channel is currently not usable (routine, logged at
    /// debug); anything else is an unexpected delivery failure.
    fn deliver(&self, label: PrayerLabel, location_name: &str) -> Result<()>;
}

/// Background delivery: posts a `SHOW_NOTIFICATION` message to the
/// worker, which renders the alert even if the tab is backgrounded or
/// closed (subject to platform lifetime limits).
pub struct WorkerChannel {
    handle: WorkerHandle,
    icon: String,
}

impl WorkerChannel {
    /// Create a channel over a registered worker handle.
    pub fn new(handle: WorkerHandle, icon: impl Into<String>) -> Self {
        Self {
            handle,
            icon: icon.into(),
        }
    }
}

impl NotifyChannel for WorkerChannel {
    fn name(&self) -> &'static str {
        "worker"
    }

    fn deliver(&self, label: PrayerLabel, location_name: &str) -> Result<()> {
        let (title, body) = prayer_alert_text(label, location_name);
        self.handle.post_message(PageMessage::ShowNotification {
            title,
            body,
            icon: self.icon.clone(),
        })
    }
}

/// Foreground delivery: constructs an alert directly, gated by the
/// permission state consulted fresh on every delivery.
pub struct ForegroundChannel {
    gate: Arc<Mutex<PermissionGate>>,
    sink: Arc<dyn AlertSink>,
    icon: String,
}

impl ForegroundChannel {
    /// Create a channel over the shared permission gate and alert sink.
    pub fn new(
        gate: Arc<Mutex<PermissionGate>>,
        sink: Arc<dyn AlertSink>,
        icon: impl Into<String>,
    ) -> Self {
        Self {
            gate,
            sink,
            icon: icon.into(),
        }
    }
}

impl NotifyChannel for ForegroundChannel {
    fn name(&self) -> &'static str {
        "foreground"
    }

    fn deliver(&self, label: PrayerLabel, location_name: &str) -> Result<()> {
        let can_notify = match self.gate.lock() {
            Ok(gate) => gate.can_notify(),
            Err(_) => false,
        };
        if !can_notify {
            return Err(NotifyError::PermissionDenied(
                "foreground alerts disabled".into(),
            ));
        }

        let (title, body) = prayer_alert_text(label, location_name);
        self.sink.show(Alert {
            title,
            body,
            icon: self.icon.clone(),
            badge: None,
            // Stable per-label tag: a repeat construction replaces the
            // prior alert instead of stacking.
            tag: Some(format!("prayer-{}", label.slug())),
            require_interaction: true,
            vibrate: Vec::new(),
            actions: Vec::new(),
        })
    }
}

/// Delivers a single alert through whichever channels are available.
///
/// Callers own the at-most-once-per-day guarantee; the dispatcher only
/// performs delivery, with a defensive last-delivered guard beneath the
/// scheduler's own bookkeeping.
pub struct NotificationDispatcher {
    channels: Vec<Box<dyn NotifyChannel>>,
    last_delivered: Mutex<Option<(NaiveDate, PrayerLabel, String)>>,
}

impl NotificationDispatcher {
    /// Create a dispatcher with no channels. Dispatching is then a
    /// logged no-op; delivery degrades, nothing fails.
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
            last_delivered: Mutex::new(None),
        }
    }

    /// Add a delivery channel.
    pub fn with_channel(mut self, channel: Box<dyn NotifyChannel>) -> Self {
        self.channels.push(channel);
        self
    }

    /// Deliver an alert for `label` at `location_name` on `date`
    /// through every registered channel.
    ///
    /// A repeat call for the same `(date, label, location)` triple with
    /// no intervening dispatch is a no-op — the defensive second layer
    /// beneath the scheduler's per-day marks, strictly weaker than
    /// them: a new date or location always delivers. Channel failures
    /// are logged and isolated from one another.
    pub fn dispatch(&self, date: NaiveDate, label: PrayerLabel, location_name: &str) {
        if let Ok(mut last) = self.last_delivered.lock() {
            let key = (date, label, location_name.to_string());
            if last.as_ref() == Some(&key) {
                tracing::trace!(%date, %label, location_name, "duplicate dispatch suppressed");
                return;
            }
            *last = Some(key);
        }

        for channel in &self.channels {
            match channel.deliver(label, location_name) {
                Ok(()) => {
                    tracing::debug!(channel = channel.name(), %label, "alert delivered");
                }
                Err(
                    err @ (NotifyError::WorkerUnavailable(_) | NotifyError::PermissionDenied(_)),
                ) => {
                    tracing::debug!(channel = channel.name(), %label, %err, "channel not usable");
                }
                Err(err) => {
                    tracing::warn!(channel = channel.name(), %label, %err, "alert delivery failed");
                }
            }
        }
    }
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
