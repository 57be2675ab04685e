// Browser glue - HtmlAudioElement adapter, unlock listeners, and JS exports.

use std::cell::RefCell;
use std::rc::Rc;

use futures_util::future::LocalBoxFuture;
use wasm_bindgen::{closure::Closure, prelude::wasm_bindgen, JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{window, Document, Event, HtmlAudioElement};

use super::capability::HostProbe;
use super::model::AlertError;
use super::web::{AudioElement, WebAudioBackend};
use crate::core::config::Settings;
use crate::core::provider::{AlertProvider, PushOutcome};

fn rejected(err: JsValue) -> AlertError {
    AlertError::PlaybackRejected(
        err.as_string()
            .unwrap_or_else(|| format!("{:?}", err)),
    )
}

/// Looping alert element, created once per page.
pub struct HtmlAudio {
    audio: HtmlAudioElement,
}

impl HtmlAudio {
    pub fn create(src: &str) -> Option<Self> {
        let audio = HtmlAudioElement::new_with_src(src).ok()?;
        audio.set_loop(true);
        audio.set_preload("auto");
        audio.load();
        Some(Self { audio })
    }
}

impl AudioElement for HtmlAudio {
    fn set_volume(&self, volume: f64) {
        self.audio.set_volume(volume);
    }

    fn set_muted(&self, muted: bool) {
        self.audio.set_muted(muted);
    }

    fn set_current_time(&self, seconds: f64) {
        self.audio.set_current_time(seconds);
    }

    fn play(&self) -> LocalBoxFuture<'_, Result<(), AlertError>> {
        let promise = self.audio.play();
        Box::pin(async move {
            let promise = promise.map_err(rejected)?;
            JsFuture::from(promise).await.map(|_| ()).map_err(rejected)
        })
    }

    fn pause(&self) {
        let _ = self.audio.pause();
    }
}

type Listeners = Rc<RefCell<Vec<(String, Closure<dyn FnMut(Event)>)>>>;

fn detach(document: &Document, listeners: &Listeners) {
    for (event_type, callback) in listeners.borrow_mut().drain(..) {
        let _ = document
            .remove_event_listener_with_callback(&event_type, callback.as_ref().unchecked_ref());
    }
}

/// Attach the gesture listeners that unlock autoplay. They remove themselves
/// after the first successful unlock.
pub fn install_unlock_listeners(backend: &WebAudioBackend) -> Result<(), JsValue> {
    let Some(document) = window().and_then(|w| w.document()) else {
        return Ok(());
    };
    let listeners: Listeners = Rc::default();

    for event_type in backend.unlock_events() {
        let backend = backend.clone();
        let document_ref = document.clone();
        let listeners_ref = listeners.clone();
        let callback = Closure::wrap(Box::new(move |event: Event| {
            let backend = backend.clone();
            let document = document_ref.clone();
            let listeners = listeners_ref.clone();
            wasm_bindgen_futures::spawn_local(async move {
                if backend.handle_gesture(&event.type_()).await {
                    detach(&document, &listeners);
                }
            });
        }) as Box<dyn FnMut(Event)>);

        document.add_event_listener_with_callback(&event_type, callback.as_ref().unchecked_ref())?;
        listeners.borrow_mut().push((event_type, callback));
    }
    Ok(())
}

/// Build the page's provider: audio element, web backend, unlock listeners.
pub fn browser_provider(settings: &Settings) -> AlertProvider {
    let element = HtmlAudio::create(&settings.web_sound_url)
        .map(|audio| Rc::new(audio) as Rc<dyn AudioElement>);
    let provider = AlertProvider::from_settings(settings, &HostProbe, None, element);
    if let Some(web) = provider.controller().backend().as_web() {
        if let Err(e) = install_unlock_listeners(web) {
            log::warn!("[OrderAlertWeb] could not attach unlock listeners: {:?}", e);
        }
    }
    provider
}

fn installed() -> AlertProvider {
    if let Some(provider) = AlertProvider::installed() {
        return provider;
    }
    let provider = browser_provider(&Settings::default());
    provider.clone().install();
    provider
}

/// Install the page-wide provider. `settings_json` may be empty for defaults.
#[wasm_bindgen(js_name = initOrderAlerts)]
pub fn init_order_alerts(settings_json: &str) {
    let settings = if settings_json.trim().is_empty() {
        Settings::default()
    } else {
        serde_json::from_str(settings_json).unwrap_or_else(|e| {
            log::warn!("[OrderAlertWeb] bad settings, using defaults: {}", e);
            Settings::default()
        })
    };
    browser_provider(&settings).install();
}

#[wasm_bindgen(js_name = startOrderAlert)]
pub async fn start_order_alert(
    order_id: Option<String>,
    title: Option<String>,
    message: Option<String>,
) {
    installed()
        .controller()
        .start(order_id.as_deref(), title.as_deref(), message.as_deref())
        .await;
}

#[wasm_bindgen(js_name = stopOrderAlert)]
pub async fn stop_order_alert(order_id: Option<String>, force: Option<bool>) {
    installed()
        .controller()
        .stop(order_id.as_deref(), force.unwrap_or(false))
        .await;
}

#[wasm_bindgen(js_name = stopAllOrderAlerts)]
pub async fn stop_all_order_alerts() {
    installed().logout().await;
}

#[wasm_bindgen(js_name = isOrderAlertPlaying)]
pub async fn is_order_alert_playing() -> bool {
    installed().controller().is_playing().await
}

/// Forward a push payload (the transport's JSON) to the provider.
/// Resolves to true when the push started or released an alert.
#[wasm_bindgen(js_name = handleOrderPush)]
pub async fn handle_order_push(payload_json: String) -> bool {
    match serde_json::from_str(&payload_json) {
        Ok(event) => installed().handle_push(&event).await != PushOutcome::Ignored,
        Err(e) => {
            log::warn!("[OrderAlertWeb] unreadable push payload: {}", e);
            false
        }
    }
}
