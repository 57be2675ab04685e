// Native alert service - owns the audio output on a dedicated thread.
//
// The service outlives any page or window: it keeps looping the alert until
// it is told to stop. The controller reaches it through `ServiceBridge`,
// one command and one reply per call.

use std::io;
use std::sync::mpsc;
use std::thread;

use futures_util::future::LocalBoxFuture;
use serde::Serialize;
use tokio::sync::oneshot;

use super::model::{AlertError, AlertRequest};
use super::native::{BridgeReply, PlatformBridge};

/// Whatever actually makes noise on this host.
pub trait AlarmPlayer {
    fn begin(&mut self, request: &AlertRequest) -> Result<(), AlertError>;
    fn end(&mut self);
}

/// Vibration pattern in milliseconds (wait, buzz, wait, buzz), repeated while
/// the alert sounds on hosts that can vibrate.
pub const VIBRATION_PATTERN_MS: [u64; 4] = [0, 500, 200, 500];

/// Ongoing notice shown while the alert sounds. Hosts render it with a
/// "View Order" action and a "Dismiss" action that calls `ServiceBridge::dismiss`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertNotice {
    pub visible: bool,
    pub title: String,
    pub message: String,
    pub order_id: String,
    pub vibration_ms: Vec<u64>,
}

impl AlertNotice {
    fn shown(request: &AlertRequest) -> Self {
        Self {
            visible: true,
            title: request.title.clone(),
            message: request.message.clone(),
            order_id: request.order_id.clone(),
            vibration_ms: VIBRATION_PATTERN_MS.to_vec(),
        }
    }

    fn cleared() -> Self {
        Self {
            visible: false,
            title: String::new(),
            message: String::new(),
            order_id: String::new(),
            vibration_ms: Vec::new(),
        }
    }
}

type NoticeSink = Box<dyn FnMut(AlertNotice) + Send>;

pub enum ServiceCommand {
    Start(AlertRequest, oneshot::Sender<BridgeReply>),
    Stop(oneshot::Sender<BridgeReply>),
    /// Stop requested from the notice, not by the controller
    Dismiss,
    Query(oneshot::Sender<bool>),
    Shutdown,
}

pub struct AlertService<P: AlarmPlayer> {
    player: P,
    playing: bool,
    notice: Option<NoticeSink>,
}

impl<P: AlarmPlayer> AlertService<P> {
    pub fn new(player: P) -> Self {
        Self {
            player,
            playing: false,
            notice: None,
        }
    }

    /// Service that reports notice changes to `notice`.
    pub fn with_notice<N>(player: P, notice: N) -> Self
    where
        N: FnMut(AlertNotice) + Send + 'static,
    {
        Self {
            notice: Some(Box::new(notice)),
            ..Self::new(player)
        }
    }

    fn publish(&mut self, notice: AlertNotice) {
        if let Some(sink) = self.notice.as_mut() {
            sink(notice);
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Apply one command. Returns false once the service should exit.
    pub fn handle(&mut self, command: ServiceCommand) -> bool {
        match command {
            ServiceCommand::Start(request, reply) => {
                let _ = reply.send(self.start(&request));
            }
            ServiceCommand::Stop(reply) => {
                let _ = reply.send(self.stop());
            }
            ServiceCommand::Dismiss => {
                log::info!("[OrderAlertService] alert dismissed from notice");
                self.stop();
            }
            ServiceCommand::Query(reply) => {
                let _ = reply.send(self.playing);
            }
            ServiceCommand::Shutdown => {
                self.stop();
                return false;
            }
        }
        true
    }

    pub fn start(&mut self, request: &AlertRequest) -> BridgeReply {
        if self.playing {
            log::debug!("[OrderAlertService] alert already playing");
            return BridgeReply::ok("Already playing");
        }
        match self.player.begin(request) {
            Ok(()) => {
                self.playing = true;
                log::info!(
                    "[OrderAlertService] {} - {} (order '{}')",
                    request.title,
                    request.message,
                    request.order_id
                );
                self.publish(AlertNotice::shown(request));
                BridgeReply::ok("Alert started")
            }
            Err(e) => {
                log::error!("[OrderAlertService] error starting alert: {}", e);
                BridgeReply::failed(format!("Failed to start alert: {}", e))
            }
        }
    }

    pub fn stop(&mut self) -> BridgeReply {
        if self.playing {
            self.player.end();
            self.playing = false;
            self.publish(AlertNotice::cleared());
            log::info!("[OrderAlertService] alert stopped");
        }
        BridgeReply::ok("Alert stopped")
    }
}

/// Sending half of the service channel. Clone freely.
#[derive(Clone)]
pub struct ServiceBridge {
    tx: mpsc::Sender<ServiceCommand>,
}

impl ServiceBridge {
    pub fn shutdown(&self) {
        let _ = self.tx.send(ServiceCommand::Shutdown);
    }

    /// Silence the alert from its notice. The controller keeps its orders and
    /// restarts the alert on the next trigger.
    pub fn dismiss(&self) {
        let _ = self.tx.send(ServiceCommand::Dismiss);
    }

    fn send(&self, command: ServiceCommand) -> Result<(), AlertError> {
        self.tx
            .send(command)
            .map_err(|_| AlertError::BackendUnavailable("alert service not running".to_string()))
    }
}

fn service_gone(_: oneshot::error::RecvError) -> AlertError {
    AlertError::BackendUnavailable("alert service dropped the request".to_string())
}

impl PlatformBridge for ServiceBridge {
    fn start_alert(
        &self,
        request: AlertRequest,
    ) -> LocalBoxFuture<'_, Result<BridgeReply, AlertError>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let sent = self.send(ServiceCommand::Start(request, reply_tx));
        Box::pin(async move {
            sent?;
            reply_rx.await.map_err(service_gone)
        })
    }

    fn stop_alert(&self) -> LocalBoxFuture<'_, Result<BridgeReply, AlertError>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let sent = self.send(ServiceCommand::Stop(reply_tx));
        Box::pin(async move {
            sent?;
            reply_rx.await.map_err(service_gone)
        })
    }

    fn is_alert_playing(&self) -> LocalBoxFuture<'_, Result<bool, AlertError>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let sent = self.send(ServiceCommand::Query(reply_tx));
        Box::pin(async move {
            sent?;
            reply_rx.await.map_err(service_gone)
        })
    }
}

/// Start the service thread. The player is built on that thread, since audio
/// output handles are usually not `Send`.
pub fn spawn_alert_service<P, F>(make_player: F) -> io::Result<ServiceBridge>
where
    P: AlarmPlayer,
    F: FnOnce() -> P + Send + 'static,
{
    spawn_service_thread(move || AlertService::new(make_player()))
}

/// Like `spawn_alert_service`, reporting notice changes to `notice` from the
/// service thread.
pub fn spawn_alert_service_with_notice<P, F, N>(
    make_player: F,
    notice: N,
) -> io::Result<ServiceBridge>
where
    P: AlarmPlayer,
    F: FnOnce() -> P + Send + 'static,
    N: FnMut(AlertNotice) + Send + 'static,
{
    spawn_service_thread(move || AlertService::with_notice(make_player(), notice))
}

fn spawn_service_thread<P, F>(make_service: F) -> io::Result<ServiceBridge>
where
    P: AlarmPlayer,
    F: FnOnce() -> AlertService<P> + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<ServiceCommand>();
    thread::Builder::new()
        .name("order-alert-service".to_string())
        .spawn(move || {
            let mut service = make_service();
            log::info!("[OrderAlertService] service started");
            while let Ok(command) = rx.recv() {
                if !service.handle(command) {
                    break;
                }
            }
            service.stop();
            log::info!("[OrderAlertService] service exited");
        })?;
    Ok(ServiceBridge { tx })
}

#[cfg(feature = "native-audio")]
pub use self::rodio_player::RodioPlayer;

#[cfg(feature = "native-audio")]
mod rodio_player {
    use std::fs::File;
    use std::io::BufReader;
    use std::path::PathBuf;

    use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};

    use super::AlarmPlayer;
    use crate::core::alerts::model::{AlertError, AlertRequest};

    /// Loops the alert asset through the default output device.
    pub struct RodioPlayer {
        sound_path: PathBuf,
        volume: f32,
        output: Option<(OutputStream, Sink)>,
    }

    impl RodioPlayer {
        pub fn new(sound_path: PathBuf, volume: f32) -> Self {
            Self {
                sound_path,
                volume: volume.clamp(0.0, 1.0),
                output: None,
            }
        }
    }

    impl AlarmPlayer for RodioPlayer {
        fn begin(&mut self, _request: &AlertRequest) -> Result<(), AlertError> {
            let file = File::open(&self.sound_path).map_err(|e| {
                AlertError::PlaybackRejected(format!("{}: {}", self.sound_path.display(), e))
            })?;
            let source = Decoder::new(BufReader::new(file))
                .map_err(|e| AlertError::PlaybackRejected(format!("Failed to decode sound: {e}")))?;

            let stream = OutputStreamBuilder::open_default_stream().map_err(|e| {
                AlertError::BackendUnavailable(format!("Failed to open audio output: {e}"))
            })?;
            let sink = Sink::connect_new(stream.mixer());
            sink.set_volume(self.volume);
            sink.append(source.repeat_infinite());

            self.output = Some((stream, sink));
            Ok(())
        }

        fn end(&mut self) {
            if let Some((_stream, sink)) = self.output.take() {
                sink.stop();
            }
        }
    }
}
