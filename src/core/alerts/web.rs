// Web backend - one looping audio element, unlocked by the first user gesture.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures_util::future::LocalBoxFuture;

use super::model::{AlertError, AlertRequest, UnlockState};
use super::unlock::UnlockGate;

pub const DEFAULT_WEB_VOLUME: f64 = 0.8;

/// The slice of an HTML audio element the backend drives.
/// The element is expected to be configured with `loop` enabled.
pub trait AudioElement {
    fn set_volume(&self, volume: f64);
    fn set_muted(&self, muted: bool);
    fn set_current_time(&self, seconds: f64);
    /// Resolves once the browser accepted playback
    fn play(&self) -> LocalBoxFuture<'_, Result<(), AlertError>>;
    fn pause(&self);
}

struct WebInner {
    element: Option<Rc<dyn AudioElement>>,
    volume: f64,
    gate: RefCell<UnlockGate>,
    playing: Cell<bool>,
    /// Bumped by every stop so a slow play() can tell it was superseded
    stop_epoch: Cell<u64>,
}

/// Cheap to clone; clones share the element and the unlock state.
#[derive(Clone)]
pub struct WebAudioBackend {
    inner: Rc<WebInner>,
}

impl WebAudioBackend {
    pub fn new(element: Rc<dyn AudioElement>, volume: f64, unlock_events: &[String]) -> Self {
        Self::build(Some(element), volume, unlock_events)
    }

    /// Backend whose audio element could not be created (no window, no audio support).
    pub fn without_element(unlock_events: &[String]) -> Self {
        Self::build(None, DEFAULT_WEB_VOLUME, unlock_events)
    }

    fn build(
        element: Option<Rc<dyn AudioElement>>,
        volume: f64,
        unlock_events: &[String],
    ) -> Self {
        // HTMLMediaElement.volume throws outside [0, 1]
        let volume = volume.clamp(0.0, 1.0);
        if let Some(element) = &element {
            element.set_volume(volume);
        }
        Self {
            inner: Rc::new(WebInner {
                element,
                volume,
                gate: RefCell::new(UnlockGate::new(unlock_events)),
                playing: Cell::new(false),
                stop_epoch: Cell::new(0),
            }),
        }
    }

    pub fn unlock_state(&self) -> UnlockState {
        self.inner.gate.borrow().state().clone()
    }

    pub fn unlock_events(&self) -> Vec<String> {
        self.inner.gate.borrow().events().to_vec()
    }

    pub fn is_listening(&self) -> bool {
        self.inner.gate.borrow().is_listening()
    }

    fn element(&self) -> Result<Rc<dyn AudioElement>, AlertError> {
        self.inner
            .element
            .clone()
            .ok_or_else(|| AlertError::BackendUnavailable("audio not initialized".to_string()))
    }

    pub async fn start(&self, request: &AlertRequest) -> Result<bool, AlertError> {
        let element = self.element()?;
        if self.inner.gate.borrow_mut().defer_start(request.clone()) {
            log::info!(
                "[OrderAlertWeb] start for order '{}' deferred until first user gesture",
                request.order_id
            );
            return Ok(true);
        }
        self.play_from_start(&element).await
    }

    async fn play_from_start(&self, element: &Rc<dyn AudioElement>) -> Result<bool, AlertError> {
        let epoch = self.inner.stop_epoch.get();
        element.set_current_time(0.0);
        element.set_volume(self.inner.volume);
        match element.play().await {
            Ok(()) if self.inner.stop_epoch.get() != epoch => {
                log::debug!("[OrderAlertWeb] play resolved after stop; pausing again");
                element.pause();
                element.set_current_time(0.0);
                Ok(false)
            }
            Ok(()) => {
                self.inner.playing.set(true);
                log::info!("[OrderAlertWeb] alert started");
                Ok(true)
            }
            Err(e) => {
                self.inner.playing.set(false);
                Err(e)
            }
        }
    }

    pub async fn stop(&self) -> Result<bool, AlertError> {
        self.inner.stop_epoch.set(self.inner.stop_epoch.get() + 1);
        if self.inner.gate.borrow_mut().cancel_pending() {
            log::debug!("[OrderAlertWeb] pending start withdrawn");
        }
        if let Some(element) = &self.inner.element {
            element.pause();
            element.set_current_time(0.0);
        }
        self.inner.playing.set(false);
        Ok(true)
    }

    /// True while sounding or while a start waits for the unlock gesture.
    pub fn is_playing(&self) -> bool {
        self.inner.playing.get() || self.inner.gate.borrow().is_pending()
    }

    /// Feed one DOM interaction to the unlock gate. Returns true if this call
    /// unlocked autoplay; listeners can be detached at that point.
    pub async fn handle_gesture(&self, event_type: &str) -> bool {
        if !self.inner.gate.borrow_mut().begin_probe(event_type) {
            return false;
        }
        let element = match self.element() {
            Ok(element) => element,
            Err(_) => {
                self.inner.gate.borrow_mut().finish_probe(false);
                return false;
            }
        };

        element.set_muted(true);
        element.set_volume(0.0);
        let probe = element.play().await;
        element.pause();
        element.set_current_time(0.0);
        element.set_volume(self.inner.volume);
        element.set_muted(false);

        let unlocked = match probe {
            Ok(()) => true,
            Err(e) => {
                log::warn!("[OrderAlertWeb] unlock probe on '{}' failed: {}", event_type, e);
                false
            }
        };
        let pending = self.inner.gate.borrow_mut().finish_probe(unlocked);
        if !unlocked {
            return false;
        }
        log::info!("[OrderAlertWeb] audio unlocked by '{}'", event_type);

        if let Some(request) = pending {
            log::info!(
                "[OrderAlertWeb] firing deferred start for order '{}'",
                request.order_id
            );
            if let Err(e) = self.play_from_start(&element).await {
                log::warn!("[OrderAlertWeb] deferred start failed: {}", e);
            }
        }
        true
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;

    use tokio::sync::oneshot;

    use super::*;

    #[derive(Default)]
    pub struct FakeAudioElement {
        pub plays: Cell<usize>,
        pub pauses: Cell<usize>,
        pub volume: Cell<f64>,
        pub muted: Cell<bool>,
        pub current_time: Cell<f64>,
        pub reject_play: Cell<bool>,
        /// Reject unmuted plays only, so unlock probes still succeed
        pub reject_audible: Cell<bool>,
        pub hold_plays: Cell<bool>,
        held: RefCell<VecDeque<oneshot::Sender<()>>>,
        /// (muted, volume) observed at each play() call
        pub play_log: RefCell<Vec<(bool, f64)>>,
    }

    impl FakeAudioElement {
        pub fn release_play(&self) -> bool {
            match self.held.borrow_mut().pop_front() {
                Some(tx) => tx.send(()).is_ok(),
                None => false,
            }
        }

        /// Plays made at audible volume, i.e. real starts rather than unlock probes
        pub fn audible_plays(&self) -> usize {
            self.play_log.borrow().iter().filter(|(muted, _)| !muted).count()
        }
    }

    impl AudioElement for FakeAudioElement {
        fn set_volume(&self, volume: f64) {
            self.volume.set(volume);
        }

        fn set_muted(&self, muted: bool) {
            self.muted.set(muted);
        }

        fn set_current_time(&self, seconds: f64) {
            self.current_time.set(seconds);
        }

        fn play(&self) -> LocalBoxFuture<'_, Result<(), AlertError>> {
            self.plays.set(self.plays.get() + 1);
            let audible = !self.muted.get();
            self.play_log
                .borrow_mut()
                .push((self.muted.get(), self.volume.get()));
            let gate = if self.hold_plays.get() {
                let (tx, rx) = oneshot::channel();
                self.held.borrow_mut().push_back(tx);
                Some(rx)
            } else {
                None
            };
            Box::pin(async move {
                if let Some(rx) = gate {
                    let _ = rx.await;
                }
                if self.reject_play.get() || (audible && self.reject_audible.get()) {
                    return Err(AlertError::PlaybackRejected("NotAllowedError".to_string()));
                }
                Ok(())
            })
        }

        fn pause(&self) {
            self.pauses.set(self.pauses.get() + 1);
        }
    }
}
