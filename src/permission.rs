//! Notification-permission state machine.
//!
//! # State Machine
//!
//! ```text
//! ┌─────────┐  request() granted   ┌─────────┐
//! │ Default ├─────────────────────►│ Granted │
//! └────┬────┘                      └─────────┘
//!      │ request() denied          ┌─────────┐
//!      └─────────────────────────► │ Denied  │  (sticky — no re-prompt)
//!                                  └─────────┘
//! ```
//!
//! `Denied` can only be left via [`PermissionGate::sync`], reflecting a
//! change the user made outside the app; the platform does not allow
//! re-prompting after a denial.

use std::future::Future;

use crate::error::{NotifyError, Result};

/// Platform-reported notification permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    /// No decision yet; a prompt is allowed.
    Default,
    /// The user granted notifications.
    Granted,
    /// The user denied notifications; terminal per session.
    Denied,
}

/// Platform permission prompt.
///
/// Implementors show the native permission dialog and resolve to the
/// user's decision. Must only be invoked from a direct user action.
pub trait PermissionPrompt: Send + Sync {
    /// Show the prompt and return the platform's decision.
    fn request(&self) -> impl Future<Output = PermissionState> + Send;
}

/// Tracks the user's notification-permission state.
#[derive(Debug)]
pub struct PermissionGate {
    state: PermissionState,
}

impl PermissionGate {
    /// Create a gate seeded with the platform-reported current state.
    pub fn new(initial: PermissionState) -> Self {
        Self { state: initial }
    }

    /// Returns the current state.
    pub fn state(&self) -> PermissionState {
        self.state
    }

    /// Returns `true` when foreground alerts may be constructed.
    ///
    /// Callers must consult this fresh on every use — the state can
    /// change outside the app's control.
    pub fn can_notify(&self) -> bool {
        self.state == PermissionState::Granted
    }

    /// Request permission via the platform prompt.
    ///
    /// Only transitions from [`PermissionState::Default`]. When already
    /// granted this is a no-op returning the current state; when denied
    /// it surfaces an explanatory error instead of re-prompting.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::PermissionDenied`] when permission was
    /// previously denied.
    pub async fn request<P: PermissionPrompt>(&mut self, prompt: &P) -> Result<PermissionState> {
        match self.state {
            PermissionState::Granted => Ok(PermissionState::Granted),
            PermissionState::Denied => Err(NotifyError::PermissionDenied(
                "notifications are blocked; enable them in your browser's site settings".into(),
            )),
            PermissionState::Default => {
                let decision = prompt.request().await;
                tracing::debug!(?decision, "permission prompt resolved");
                self.state = decision;
                Ok(decision)
            }
        }
    }

    /// Overwrite the state with a fresh platform report.
    ///
    /// Denial revocation happens outside the app; this is the only way
    /// back out of [`PermissionState::Denied`].
    pub fn sync(&mut self, platform: PermissionState) {
        if platform != self.state {
            tracing::debug!(from = ?self.state, to = ?platform, "permission state changed externally");
            self.state = platform;
        }
    }
}
