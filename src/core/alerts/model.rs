// Alert model types shared by the controller and both backends.
//
// NOTE: BackendKind and AlertPhase reach the frontend as JSON inside the
// alert status. Keep variant names stable when modifying data structures.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_ALERT_TITLE: &str = "New Order!";
pub const DEFAULT_ALERT_MESSAGE: &str = "You have a new order to accept";

/// Which platform mechanism produces the alert. Chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// Persistent native service that keeps sounding while the app is suspended
    Native,
    /// In-page audio element, gated by the browser autoplay policy
    Web,
}

impl BackendKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Native => "Native Service",
            Self::Web => "Web Audio",
        }
    }
}

/// Payload handed to a backend when an alert starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRequest {
    pub title: String,
    pub message: String,
    /// Empty when the alert was not raised for a specific order
    #[serde(default)]
    pub order_id: String,
}

impl AlertRequest {
    /// Build a request, filling in the stock title and message for missing or blank parts.
    pub fn new(order_id: Option<&str>, title: Option<&str>, message: Option<&str>) -> Self {
        Self::with_defaults(
            order_id,
            title,
            message,
            DEFAULT_ALERT_TITLE,
            DEFAULT_ALERT_MESSAGE,
        )
    }

    pub fn with_defaults(
        order_id: Option<&str>,
        title: Option<&str>,
        message: Option<&str>,
        default_title: &str,
        default_message: &str,
    ) -> Self {
        let pick = |value: Option<&str>, fallback: &str| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(fallback)
                .to_string()
        };
        Self {
            title: pick(title, default_title),
            message: pick(message, default_message),
            order_id: order_id.unwrap_or_default().to_string(),
        }
    }
}

impl Default for AlertRequest {
    fn default() -> Self {
        Self::new(None, None, None)
    }
}

/// Physical playback state of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
}

/// Autoplay unlock progress of the web backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UnlockState {
    /// No qualifying user gesture seen yet
    #[default]
    Locked,
    /// A start arrived while locked; it fires as soon as the gate unlocks
    PendingStart(AlertRequest),
    /// Autoplay is permitted for the rest of the page lifetime
    Unlocked,
}

/// Controller-level view of the alert state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertPhase {
    /// No alert-worthy orders
    Idle,
    /// Orders pending and the backend is playing (or will play on unlock)
    Active,
    /// Orders pending but the backend is silent; healed by the next start
    Desynced,
}

/// Failures a backend can report. The controller logs and swallows all of them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlertError {
    /// Bridge missing, plugin unregistered, or audio resource never created
    #[error("Alert backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Autoplay policy or the OS refused to start playback
    #[error("Playback rejected: {0}")]
    PlaybackRejected(String),
}
