// Alert provider - wires collaborator events to the alert controller.
//
// Push arrival starts alerts; order actions, status-change pushes and logout
// release them. One provider is installed per process.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::alerts::backend::AlertBackend;
use super::alerts::capability::{select_backend_kind, CapabilityProbe};
use super::alerts::controller::AlertController;
use super::alerts::model::BackendKind;
use super::alerts::native::{NativeAlertBackend, PlatformBridge};
use super::alerts::web::{AudioElement, WebAudioBackend};
use super::config::Settings;
use super::push::{PushEvent, PushKind};

/// What the vendor did with an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderAction {
    Accepted,
    Rejected,
    Viewed,
}

/// Effect a push had on the alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PushOutcome {
    AlertStarted,
    AlertReleased,
    Ignored,
}

thread_local! {
    static INSTALLED: RefCell<Option<AlertProvider>> = const { RefCell::new(None) };
}

#[derive(Clone)]
pub struct AlertProvider {
    controller: AlertController,
}

impl AlertProvider {
    pub fn new(controller: AlertController) -> Self {
        Self { controller }
    }

    /// Pick the backend from the capability probe and build the controller.
    /// A missing bridge or element still yields a working provider that stays
    /// silent and keeps its bookkeeping.
    pub fn from_settings(
        settings: &Settings,
        probe: &dyn CapabilityProbe,
        bridge: Option<Rc<dyn PlatformBridge>>,
        element: Option<Rc<dyn AudioElement>>,
    ) -> Self {
        let backend: AlertBackend = match select_backend_kind(probe) {
            BackendKind::Native => match bridge {
                Some(bridge) => NativeAlertBackend::new(bridge).into(),
                None => {
                    log::warn!(
                        "[OrderAlert] native platform reported but no alert bridge registered"
                    );
                    NativeAlertBackend::unavailable().into()
                }
            },
            BackendKind::Web => match element {
                Some(element) => WebAudioBackend::new(
                    element,
                    settings.web_volume,
                    &settings.unlock_events,
                )
                .into(),
                None => {
                    log::warn!("[OrderAlert] audio element unavailable, web alerts will be silent");
                    WebAudioBackend::without_element(&settings.unlock_events).into()
                }
            },
        };
        Self::new(AlertController::with_defaults(
            backend,
            &settings.default_title,
            &settings.default_message,
        ))
    }

    pub fn controller(&self) -> &AlertController {
        &self.controller
    }

    /// Make this provider the process-wide one for the current thread.
    pub fn install(self) {
        INSTALLED.with(|slot| *slot.borrow_mut() = Some(self));
    }

    pub fn installed() -> Option<AlertProvider> {
        INSTALLED.with(|slot| slot.borrow().clone())
    }

    pub async fn handle_push(&self, event: &PushEvent) -> PushOutcome {
        match event.kind() {
            PushKind::NewOrder => {
                log::info!(
                    "[OrderAlert] new order push (order {:?})",
                    event.order_id()
                );
                self.controller
                    .start(event.order_id(), event.title(), event.body())
                    .await;
                PushOutcome::AlertStarted
            }
            PushKind::OrderStatusChanged => match event.order_id() {
                Some(order_id) => {
                    log::info!(
                        "[OrderAlert] order {} changed status ({:?}), releasing",
                        order_id,
                        event.event_type()
                    );
                    self.controller.stop(Some(order_id), false).await;
                    PushOutcome::AlertReleased
                }
                None => PushOutcome::Ignored,
            },
            PushKind::Other => {
                log::debug!("[OrderAlert] regular push, no alert ({:?})", event.event_type());
                PushOutcome::Ignored
            }
        }
    }

    /// The vendor accepted, rejected or opened the order; it no longer needs attention.
    pub async fn order_acted(&self, order_id: &str, action: OrderAction) {
        log::info!("[OrderAlert] order {} {:?}", order_id, action);
        self.controller.stop(Some(order_id), false).await;
    }

    pub async fn logout(&self) {
        self.controller.stop_all().await;
    }

    /// The app came back to the foreground; heal a silent alert if orders are waiting.
    pub async fn foreground_resumed(&self) {
        self.controller.resync().await;
    }
}
