// Backend selection - a tagged variant fixed for the process lifetime.

use super::model::{AlertError, AlertRequest, BackendKind};
use super::native::NativeAlertBackend;
use super::web::WebAudioBackend;

pub enum AlertBackend {
    Native(NativeAlertBackend),
    Web(WebAudioBackend),
}

impl AlertBackend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Native(_) => BackendKind::Native,
            Self::Web(_) => BackendKind::Web,
        }
    }

    pub async fn start(&self, request: &AlertRequest) -> Result<bool, AlertError> {
        match self {
            Self::Native(backend) => backend.start(request).await,
            Self::Web(backend) => backend.start(request).await,
        }
    }

    pub async fn stop(&self) -> Result<bool, AlertError> {
        match self {
            Self::Native(backend) => backend.stop().await,
            Self::Web(backend) => backend.stop().await,
        }
    }

    pub async fn is_playing(&self) -> bool {
        match self {
            Self::Native(backend) => backend.is_playing().await,
            Self::Web(backend) => backend.is_playing(),
        }
    }

    /// The web backend, for wiring gesture listeners. None on native hosts.
    pub fn as_web(&self) -> Option<&WebAudioBackend> {
        match self {
            Self::Web(backend) => Some(backend),
            Self::Native(_) => None,
        }
    }
}

impl From<NativeAlertBackend> for AlertBackend {
    fn from(backend: NativeAlertBackend) -> Self {
        Self::Native(backend)
    }
}

impl From<WebAudioBackend> for AlertBackend {
    fn from(backend: WebAudioBackend) -> Self {
        Self::Web(backend)
    }
}
