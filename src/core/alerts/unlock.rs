// Autoplay unlock gate for the web backend.
//
// Browsers refuse audio until the page has seen a user gesture. The gate
// waits for the first qualifying interaction, lets the backend run a muted
// play/pause probe, and then releases any start that arrived while locked.

use super::model::{AlertRequest, UnlockState};

pub const DEFAULT_UNLOCK_EVENTS: &[&str] = &["click", "touchstart", "keydown"];

/// Explicit unlock state owned by one web backend instance.
#[derive(Debug)]
pub struct UnlockGate {
    state: UnlockState,
    /// Event types that count as a user gesture
    events: Vec<String>,
    /// A muted probe is currently awaiting the browser
    probing: bool,
}

impl UnlockGate {
    pub fn new(events: &[String]) -> Self {
        let events = if events.is_empty() {
            DEFAULT_UNLOCK_EVENTS.iter().map(|e| e.to_string()).collect()
        } else {
            events.to_vec()
        };
        Self {
            state: UnlockState::Locked,
            events,
            probing: false,
        }
    }

    pub fn state(&self) -> &UnlockState {
        &self.state
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == UnlockState::Unlocked
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, UnlockState::PendingStart(_))
    }

    /// Gesture listeners stay attached until the first successful unlock.
    pub fn is_listening(&self) -> bool {
        !self.is_unlocked()
    }

    /// Park a start until unlock. A later request replaces an earlier one.
    /// Returns false when already unlocked; the caller should play directly.
    pub fn defer_start(&mut self, request: AlertRequest) -> bool {
        if self.is_unlocked() {
            return false;
        }
        self.state = UnlockState::PendingStart(request);
        true
    }

    /// Withdraw a parked start after an explicit stop.
    pub fn cancel_pending(&mut self) -> bool {
        if self.is_pending() {
            self.state = UnlockState::Locked;
            return true;
        }
        false
    }

    /// Claim the probe for this gesture. False for non-qualifying event types,
    /// after unlock, or while another probe is in flight.
    pub fn begin_probe(&mut self, event_type: &str) -> bool {
        if !self.is_listening() || self.probing {
            return false;
        }
        if !self.events.iter().any(|e| e == event_type) {
            return false;
        }
        self.probing = true;
        true
    }

    /// Record the probe outcome. On success the gate is unlocked and the parked
    /// request, if any, is handed back exactly once.
    pub fn finish_probe(&mut self, unlocked: bool) -> Option<AlertRequest> {
        self.probing = false;
        if !unlocked {
            return None;
        }
        match std::mem::replace(&mut self.state, UnlockState::Unlocked) {
            UnlockState::PendingStart(request) => Some(request),
            _ => None,
        }
    }
}

impl Default for UnlockGate {
    fn default() -> Self {
        Self::new(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_configured_events_qualify() {
        let mut gate = UnlockGate::default();
        assert!(!gate.begin_probe("mousemove"));
        assert!(gate.begin_probe("touchstart"));
    }

    #[test]
    fn test_single_probe_in_flight() {
        let mut gate = UnlockGate::default();
        assert!(gate.begin_probe("click"));
        assert!(!gate.begin_probe("keydown"));
        gate.finish_probe(false);
        assert!(gate.begin_probe("keydown"));
    }

    #[test]
    fn test_pending_request_released_once() {
        let mut gate = UnlockGate::default();
        assert!(gate.defer_start(AlertRequest::new(Some("ORD-1"), None, None)));
        assert!(gate.is_pending());

        assert!(gate.begin_probe("click"));
        let released = gate.finish_probe(true).unwrap();
        assert_eq!(released.order_id, "ORD-1");
        assert!(gate.is_unlocked());

        assert!(!gate.begin_probe("click"));
        assert!(!gate.is_listening());
    }

    #[test]
    fn test_failed_probe_keeps_pending() {
        let mut gate = UnlockGate::default();
        gate.defer_start(AlertRequest::default());
        gate.begin_probe("click");
        assert!(gate.finish_probe(false).is_none());
        assert!(gate.is_pending());
        assert!(gate.is_listening());
    }

    #[test]
    fn test_cancel_withdraws_pending() {
        let mut gate = UnlockGate::default();
        gate.defer_start(AlertRequest::default());
        assert!(gate.cancel_pending());
        assert_eq!(gate.state(), &UnlockState::Locked);
        gate.begin_probe("click");
        assert!(gate.finish_probe(true).is_none());
    }

    #[test]
    fn test_defer_after_unlock_refused() {
        let mut gate = UnlockGate::default();
        gate.begin_probe("click");
        gate.finish_probe(true);
        assert!(!gate.defer_start(AlertRequest::default()));
    }

    #[test]
    fn test_custom_events() {
        let mut gate = UnlockGate::new(&["pointerdown".to_string()]);
        assert!(!gate.begin_probe("click"));
        assert!(gate.begin_probe("pointerdown"));
    }
}
