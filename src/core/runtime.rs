// Alert thread - hosts the single-threaded alert core for multi-threaded callers.
//
// Commands are applied in arrival order, each as its own local task, so a
// slow bridge call never blocks the next command from mutating the order set.

use std::io;
use std::thread;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::LocalSet;

use super::alerts::model::{AlertPhase, BackendKind};
use super::provider::{AlertProvider, OrderAction, PushOutcome};
use super::push::PushEvent;

pub enum AlertCommand {
    Start {
        order_id: Option<String>,
        title: Option<String>,
        message: Option<String>,
    },
    Stop {
        order_id: Option<String>,
        force: bool,
    },
    Push(PushEvent),
    OrderActed(String, OrderAction),
    Logout,
    Resume,
    Status,
}

pub enum AlertReply {
    Done,
    Push(PushOutcome),
    Status(AlertStatus),
}

/// Snapshot for UIs and diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertStatus {
    pub backend: BackendKind,
    pub playing: bool,
    pub phase: AlertPhase,
    pub active_orders: Vec<String>,
}

type Envelope = (AlertCommand, oneshot::Sender<AlertReply>);

async fn execute(provider: &AlertProvider, command: AlertCommand) -> AlertReply {
    let controller = provider.controller();
    match command {
        AlertCommand::Start {
            order_id,
            title,
            message,
        } => {
            controller
                .start(order_id.as_deref(), title.as_deref(), message.as_deref())
                .await;
            AlertReply::Done
        }
        AlertCommand::Stop { order_id, force } => {
            controller.stop(order_id.as_deref(), force).await;
            AlertReply::Done
        }
        AlertCommand::Push(event) => AlertReply::Push(provider.handle_push(&event).await),
        AlertCommand::OrderActed(order_id, action) => {
            provider.order_acted(&order_id, action).await;
            AlertReply::Done
        }
        AlertCommand::Logout => {
            provider.logout().await;
            AlertReply::Done
        }
        AlertCommand::Resume => {
            provider.foreground_resumed().await;
            AlertReply::Done
        }
        AlertCommand::Status => {
            let playing = controller.is_playing().await;
            AlertReply::Status(AlertStatus {
                backend: controller.backend_kind(),
                playing,
                phase: controller.phase(),
                active_orders: controller.active_orders(),
            })
        }
    }
}

/// `Send + Clone` entry point to the alert thread.
#[derive(Clone)]
pub struct AlertHandle {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl AlertHandle {
    async fn request(&self, command: AlertCommand) -> Option<AlertReply> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send((command, reply_tx)).is_err() {
            log::warn!("[OrderAlert] alert thread is gone, command dropped");
            return None;
        }
        reply_rx.await.ok()
    }

    pub async fn start(
        &self,
        order_id: Option<String>,
        title: Option<String>,
        message: Option<String>,
    ) {
        self.request(AlertCommand::Start {
            order_id,
            title,
            message,
        })
        .await;
    }

    pub async fn stop(&self, order_id: Option<String>, force: bool) {
        self.request(AlertCommand::Stop { order_id, force }).await;
    }

    pub async fn stop_all(&self) {
        self.stop(None, true).await;
    }

    pub async fn is_playing(&self) -> bool {
        self.status().await.map(|s| s.playing).unwrap_or(false)
    }

    pub async fn handle_push(&self, event: PushEvent) -> PushOutcome {
        match self.request(AlertCommand::Push(event)).await {
            Some(AlertReply::Push(outcome)) => outcome,
            _ => PushOutcome::Ignored,
        }
    }

    pub async fn order_acted(&self, order_id: String, action: OrderAction) {
        self.request(AlertCommand::OrderActed(order_id, action)).await;
    }

    pub async fn logout(&self) {
        self.request(AlertCommand::Logout).await;
    }

    pub async fn foreground_resumed(&self) {
        self.request(AlertCommand::Resume).await;
    }

    pub async fn status(&self) -> Option<AlertStatus> {
        match self.request(AlertCommand::Status).await {
            Some(AlertReply::Status(status)) => Some(status),
            _ => None,
        }
    }
}

/// Start the alert thread. The provider is built on that thread because the
/// alert core is not `Send`.
pub fn spawn_alert_thread<F>(make_provider: F) -> io::Result<AlertHandle>
where
    F: FnOnce() -> AlertProvider + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    thread::Builder::new()
        .name("order-alert".to_string())
        .spawn(move || {
            let local = LocalSet::new();
            local.block_on(&runtime, async move {
                let provider = make_provider();
                log::info!(
                    "[OrderAlert] alert thread running ({} backend)",
                    provider.controller().backend_kind().display_name()
                );
                while let Some((command, reply)) = rx.recv().await {
                    let provider = provider.clone();
                    tokio::task::spawn_local(async move {
                        let _ = reply.send(execute(&provider, command).await);
                    });
                }
                log::info!("[OrderAlert] alert thread exiting");
            });
        })?;

    Ok(AlertHandle { tx })
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::core::alerts::controller::AlertController;
    use crate::core::alerts::native::testing::FakeBridge;
    use crate::core::alerts::native::NativeAlertBackend;

    fn spawn_fake() -> AlertHandle {
        spawn_alert_thread(|| {
            let bridge = Rc::new(FakeBridge::default());
            AlertProvider::new(AlertController::new(NativeAlertBackend::new(bridge).into()))
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_handle_drives_controller() {
        let handle = spawn_fake();
        handle
            .start(Some("ORD-1".to_string()), Some("New Order!".to_string()), None)
            .await;
        handle.start(Some("ORD-2".to_string()), None, None).await;
        assert!(handle.is_playing().await);

        handle.stop(Some("ORD-1".to_string()), false).await;
        let status = handle.status().await.unwrap();
        assert!(status.playing);
        assert_eq!(status.active_orders, vec!["ORD-2"]);
        assert_eq!(status.backend, BackendKind::Native);

        handle.stop_all().await;
        let status = handle.status().await.unwrap();
        assert!(!status.playing);
        assert_eq!(status.phase, AlertPhase::Idle);
    }

    #[tokio::test]
    async fn test_handle_push_and_logout() {
        let handle = spawn_fake();
        let outcome = handle
            .handle_push(PushEvent::new_order("ORD-9", "New Order!", "1x GPU"))
            .await;
        assert_eq!(outcome, PushOutcome::AlertStarted);

        handle.order_acted("ORD-9".to_string(), OrderAction::Viewed).await;
        assert!(!handle.is_playing().await);

        handle.start(Some("ORD-10".to_string()), None, None).await;
        handle.logout().await;
        assert!(handle.status().await.unwrap().active_orders.is_empty());
    }

    #[tokio::test]
    async fn test_handle_is_send() {
        fn assert_send<T: Send + Sync + Clone>(_: &T) {}
        let handle = spawn_fake();
        assert_send(&handle);
        let clone = handle.clone();
        tokio::task::spawn_blocking(move || drop(clone)).await.unwrap();
    }
}
