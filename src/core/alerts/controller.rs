// Alert controller - reference-counts alert-worthy orders and drives the backend.
//
// The active-order set is the source of truth. It is always mutated before a
// backend call is issued, so whichever bridge call resolves last, the set
// reflects what the vendor still has to act on. Backend failures are logged
// and swallowed: a missed alert degrades to silence, never to an error.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use super::backend::AlertBackend;
use super::model::{
    AlertError, AlertPhase, AlertRequest, BackendKind, PlaybackState, DEFAULT_ALERT_MESSAGE,
    DEFAULT_ALERT_TITLE,
};

/// How often one start re-checks the backend after losing a race with a stop
/// while orders are still pending.
const RACE_RETRIES: usize = 2;

struct ControllerInner {
    backend: AlertBackend,
    active: RefCell<HashSet<String>>,
    /// Most recent request, replayed by `resync`
    last_request: RefCell<Option<AlertRequest>>,
    /// A backend start is awaiting the bridge
    starting: Cell<bool>,
    /// Counts stops that reached the backend; lets a slow start detect it went stale
    stop_epoch: Cell<u64>,
    /// Last playback state the backend confirmed
    last_known: Cell<PlaybackState>,
    default_title: String,
    default_message: String,
}

/// Handle to the process-wide alert state. Clones share the same state.
#[derive(Clone)]
pub struct AlertController {
    inner: Rc<ControllerInner>,
}

impl AlertController {
    pub fn new(backend: AlertBackend) -> Self {
        Self::with_defaults(backend, DEFAULT_ALERT_TITLE, DEFAULT_ALERT_MESSAGE)
    }

    /// Create a controller whose requests fall back to the given title and message.
    pub fn with_defaults(
        backend: AlertBackend,
        default_title: &str,
        default_message: &str,
    ) -> Self {
        log::info!("[OrderAlert] using {} backend", backend.kind().display_name());
        Self {
            inner: Rc::new(ControllerInner {
                backend,
                active: RefCell::new(HashSet::new()),
                last_request: RefCell::new(None),
                starting: Cell::new(false),
                stop_epoch: Cell::new(0),
                last_known: Cell::new(PlaybackState::Idle),
                default_title: default_title.to_string(),
                default_message: default_message.to_string(),
            }),
        }
    }

    pub fn backend(&self) -> &AlertBackend {
        &self.inner.backend
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.inner.backend.kind()
    }

    /// Mark an order alert-worthy and make sure the alert is sounding.
    pub async fn start(&self, order_id: Option<&str>, title: Option<&str>, message: Option<&str>) {
        let order_id = order_id.filter(|id| !id.is_empty());
        if let Some(id) = order_id {
            let mut active = self.inner.active.borrow_mut();
            if active.insert(id.to_string()) {
                log::info!("[OrderAlert] order {} now alerting ({} active)", id, active.len());
            }
        }

        let request = AlertRequest::with_defaults(
            order_id,
            title,
            message,
            &self.inner.default_title,
            &self.inner.default_message,
        );
        *self.inner.last_request.borrow_mut() = Some(request.clone());
        self.ensure_playing(request).await;
    }

    /// Release an order. The backend stops only once no order is left, or
    /// immediately when `force` is set.
    pub async fn stop(&self, order_id: Option<&str>, force: bool) {
        {
            let mut active = self.inner.active.borrow_mut();
            if force {
                log::info!("[OrderAlert] force stop, clearing {} active orders", active.len());
                active.clear();
            } else {
                if let Some(id) = order_id {
                    if !active.remove(id) {
                        log::debug!("[OrderAlert] stop for order {} which was not alerting", id);
                    }
                }
                if !active.is_empty() {
                    log::info!(
                        "[OrderAlert] {} orders still pending, alert continues",
                        active.len()
                    );
                    return;
                }
            }
        }
        *self.inner.last_request.borrow_mut() = None;
        self.dispatch_stop().await;
    }

    /// Unconditional stop, used on logout.
    pub async fn stop_all(&self) {
        self.stop(None, true).await;
    }

    /// Native: the service's own answer. Web: sounding or waiting for unlock.
    pub async fn is_playing(&self) -> bool {
        let playing = self.inner.backend.is_playing().await;
        self.inner.last_known.set(if playing {
            PlaybackState::Playing
        } else {
            PlaybackState::Idle
        });
        playing
    }

    /// Re-attempt playback when orders are pending but the backend went quiet,
    /// e.g. when the app returns to the foreground.
    pub async fn resync(&self) {
        if self.inner.active.borrow().is_empty() {
            return;
        }
        let request = self
            .inner
            .last_request
            .borrow()
            .clone()
            .unwrap_or_else(|| {
                AlertRequest::with_defaults(
                    None,
                    None,
                    None,
                    &self.inner.default_title,
                    &self.inner.default_message,
                )
            });
        log::debug!("[OrderAlert] resync with {} active orders", self.active_count());
        self.ensure_playing(request).await;
    }

    pub fn active_orders(&self) -> Vec<String> {
        let mut orders: Vec<String> = self.inner.active.borrow().iter().cloned().collect();
        orders.sort();
        orders
    }

    pub fn active_count(&self) -> usize {
        self.inner.active.borrow().len()
    }

    pub fn is_active(&self, order_id: &str) -> bool {
        self.inner.active.borrow().contains(order_id)
    }

    /// Synchronous view of the state machine. The web backend answers directly;
    /// native uses the last state the bridge confirmed.
    pub fn phase(&self) -> AlertPhase {
        if self.inner.active.borrow().is_empty() {
            return AlertPhase::Idle;
        }
        let playing = match self.inner.backend.as_web() {
            Some(web) => web.is_playing(),
            None => self.inner.last_known.get() == PlaybackState::Playing,
        };
        if playing {
            AlertPhase::Active
        } else {
            AlertPhase::Desynced
        }
    }

    async fn ensure_playing(&self, request: AlertRequest) {
        if self.inner.starting.get() {
            log::debug!("[OrderAlert] start already in flight, order covered by it");
            return;
        }
        self.inner.starting.set(true);
        self.drive_start(&request).await;
        self.inner.starting.set(false);
    }

    async fn drive_start(&self, request: &AlertRequest) {
        let mut attempts = 0;
        loop {
            let epoch = self.inner.stop_epoch.get();
            if self.inner.backend.is_playing().await {
                log::debug!("[OrderAlert] backend already playing, not restarting");
                self.inner.last_known.set(PlaybackState::Playing);
                return;
            }
            if self.inner.stop_epoch.get() != epoch && self.inner.active.borrow().is_empty() {
                return;
            }

            let result = self.inner.backend.start(request).await;
            if self.inner.stop_epoch.get() == epoch {
                self.record_start(result);
                return;
            }

            // A stop reached the backend while this start was in flight.
            if self.inner.active.borrow().is_empty() {
                if matches!(result, Ok(true)) {
                    log::info!(
                        "[OrderAlert] discarding stale start for order '{}'",
                        request.order_id
                    );
                    self.dispatch_stop().await;
                }
                if self.inner.active.borrow().is_empty() {
                    return;
                }
            }

            attempts += 1;
            if attempts > RACE_RETRIES {
                let playing = self.inner.backend.is_playing().await;
                self.inner.last_known.set(if playing {
                    PlaybackState::Playing
                } else {
                    PlaybackState::Idle
                });
                if !playing {
                    log::warn!("[OrderAlert] alert left silent after repeated start/stop races");
                }
                return;
            }
            log::debug!("[OrderAlert] start raced a stop with orders pending, re-checking backend");
        }
    }

    fn record_start(&self, result: Result<bool, AlertError>) {
        match result {
            Ok(true) => {
                self.inner.last_known.set(PlaybackState::Playing);
                log::info!("[OrderAlert] alert started");
            }
            Ok(false) => {
                self.inner.last_known.set(PlaybackState::Idle);
                log::warn!(
                    "[OrderAlert] backend declined to start, {} orders waiting",
                    self.active_count()
                );
            }
            Err(e) => {
                self.inner.last_known.set(PlaybackState::Idle);
                log::warn!("[OrderAlert] failed to start alert: {}", e);
            }
        }
    }

    async fn dispatch_stop(&self) {
        self.inner.stop_epoch.set(self.inner.stop_epoch.get() + 1);
        if self.inner.last_known.get() == PlaybackState::Idle {
            log::debug!("[OrderAlert] stop requested while idle");
        }
        match self.inner.backend.stop().await {
            Ok(true) => {
                self.inner.last_known.set(PlaybackState::Idle);
                log::info!("[OrderAlert] alert stopped");
            }
            Ok(false) => log::warn!("[OrderAlert] backend declined to stop"),
            Err(e) => log::warn!("[OrderAlert] failed to stop alert: {}", e),
        }
    }
}
