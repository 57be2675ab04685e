// Native backend - proxies start/stop/query to the platform alert service.
//
// Each call is one round-trip over the bridge. No retries here; the
// controller re-invokes on the next trigger.

use std::rc::Rc;

use futures_util::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};

use super::model::{AlertError, AlertRequest};

/// Reply shape of the platform alert plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeReply {
    pub success: bool,
    pub message: String,
}

impl BridgeReply {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Asynchronous channel to the OS-level alert mechanism.
pub trait PlatformBridge {
    fn start_alert(
        &self,
        request: AlertRequest,
    ) -> LocalBoxFuture<'_, Result<BridgeReply, AlertError>>;
    fn stop_alert(&self) -> LocalBoxFuture<'_, Result<BridgeReply, AlertError>>;
    fn is_alert_playing(&self) -> LocalBoxFuture<'_, Result<bool, AlertError>>;
}

pub struct NativeAlertBackend {
    /// None when the plugin was never registered on this host
    bridge: Option<Rc<dyn PlatformBridge>>,
}

impl NativeAlertBackend {
    pub fn new(bridge: Rc<dyn PlatformBridge>) -> Self {
        Self {
            bridge: Some(bridge),
        }
    }

    /// Backend for a host where the capability probe said native but no bridge exists.
    pub fn unavailable() -> Self {
        Self { bridge: None }
    }

    pub fn has_bridge(&self) -> bool {
        self.bridge.is_some()
    }

    fn bridge(&self) -> Result<&Rc<dyn PlatformBridge>, AlertError> {
        self.bridge
            .as_ref()
            .ok_or_else(|| {
                AlertError::BackendUnavailable("native alert bridge not registered".to_string())
            })
    }

    pub async fn start(&self, request: &AlertRequest) -> Result<bool, AlertError> {
        let reply = self.bridge()?.start_alert(request.clone()).await?;
        log::info!(
            "[OrderAlert] native start for order '{}': {}",
            request.order_id,
            reply.message
        );
        Ok(reply.success)
    }

    pub async fn stop(&self) -> Result<bool, AlertError> {
        let reply = self.bridge()?.stop_alert().await?;
        log::info!("[OrderAlert] native stop: {}", reply.message);
        Ok(reply.success)
    }

    pub async fn is_playing(&self) -> bool {
        let Ok(bridge) = self.bridge() else {
            return false;
        };
        match bridge.is_alert_playing().await {
            Ok(playing) => playing,
            Err(e) => {
                log::warn!("[OrderAlert] failed to query native alert state: {}", e);
                false
            }
        }
    }
}
