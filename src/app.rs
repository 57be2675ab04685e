use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Mutex;

use tauri::{AppHandle, Emitter, Manager, State, WindowEvent};

use crate::core::{
    alerts::{
        capability::HostProbe,
        native::PlatformBridge,
        service::{spawn_alert_service_with_notice, AlertNotice, RodioPlayer, ServiceBridge},
    },
    config::{ConfigManager, Settings},
    provider::{AlertProvider, OrderAction, PushOutcome},
    push::PushEvent,
    runtime::{spawn_alert_thread, AlertHandle, AlertStatus},
};

struct AppState {
    alerts: AlertHandle,
    service: ServiceBridge,
    settings: Mutex<Settings>,
    config_manager: ConfigManager,
}

async fn emit_status(app: &AppHandle, alerts: &AlertHandle) {
    if let Some(status) = alerts.status().await {
        let _ = app.emit("order-alert-status", status);
    }
}

#[tauri::command]
async fn start_order_alert(
    order_id: Option<String>,
    title: Option<String>,
    message: Option<String>,
    state: State<'_, AppState>,
    app: AppHandle,
) -> Result<(), String> {
    state.alerts.start(order_id, title, message).await;
    emit_status(&app, &state.alerts).await;
    Ok(())
}

#[tauri::command]
async fn stop_order_alert(
    order_id: Option<String>,
    force: Option<bool>,
    state: State<'_, AppState>,
    app: AppHandle,
) -> Result<(), String> {
    state.alerts.stop(order_id, force.unwrap_or(false)).await;
    emit_status(&app, &state.alerts).await;
    Ok(())
}

#[tauri::command]
async fn stop_all_order_alerts(state: State<'_, AppState>, app: AppHandle) -> Result<(), String> {
    state.alerts.stop_all().await;
    emit_status(&app, &state.alerts).await;
    Ok(())
}

#[tauri::command]
async fn is_order_alert_playing(state: State<'_, AppState>) -> Result<bool, String> {
    Ok(state.alerts.is_playing().await)
}

#[tauri::command]
async fn order_alert_status(state: State<'_, AppState>) -> Result<AlertStatus, String> {
    state
        .alerts
        .status()
        .await
        .ok_or_else(|| "alert thread is not running".to_string())
}

/// The frontend forwards every push payload it receives; only order pushes
/// touch the alert.
#[tauri::command]
async fn handle_push(
    event: PushEvent,
    state: State<'_, AppState>,
    app: AppHandle,
) -> Result<PushOutcome, String> {
    let outcome = state.alerts.handle_push(event).await;
    if outcome != PushOutcome::Ignored {
        emit_status(&app, &state.alerts).await;
    }
    Ok(outcome)
}

/// "Dismiss" on the alert notice. Silences the service only; pending orders
/// stay and the next trigger sounds the alert again.
#[tauri::command]
async fn dismiss_order_alert(state: State<'_, AppState>, app: AppHandle) -> Result<(), String> {
    state.service.dismiss();
    emit_status(&app, &state.alerts).await;
    Ok(())
}

#[tauri::command]
async fn order_acted(
    order_id: String,
    action: OrderAction,
    state: State<'_, AppState>,
    app: AppHandle,
) -> Result<(), String> {
    state.alerts.order_acted(order_id, action).await;
    emit_status(&app, &state.alerts).await;
    Ok(())
}

#[tauri::command]
async fn logout(state: State<'_, AppState>, app: AppHandle) -> Result<(), String> {
    state.alerts.logout().await;
    emit_status(&app, &state.alerts).await;
    Ok(())
}

/// Closing the window only hides it; this is the way out.
#[tauri::command]
async fn quit_app(state: State<'_, AppState>, app: AppHandle) -> Result<(), String> {
    state.alerts.stop_all().await;
    state.service.shutdown();
    app.exit(0);
    Ok(())
}

#[tauri::command]
fn get_settings(state: State<'_, AppState>) -> Result<Settings, String> {
    state
        .settings
        .lock()
        .map(|settings| settings.clone())
        .map_err(|e| e.to_string())
}

/// Sound and volume changes apply on next launch; the alert service opens
/// its asset once.
#[tauri::command]
fn save_settings(settings: Settings, state: State<'_, AppState>) -> Result<(), String> {
    let mut current = state.settings.lock().map_err(|e| e.to_string())?;
    *current = settings.clone();
    state.config_manager.save(&settings).map_err(|e| e.to_string())
}

fn publish_notice(app: &AppHandle, notice: AlertNotice) {
    if notice.visible {
        if let Some(window) = app.get_webview_window("main") {
            let _ = window.show();
            let _ = window.set_focus();
        }
    }
    let _ = app.emit("order-alert-notice", notice);
}

fn resolve_sound_path(app: &AppHandle, sound_path: &Path) -> PathBuf {
    if sound_path.is_absolute() {
        return sound_path.to_path_buf();
    }
    match app.path().resource_dir() {
        Ok(dir) => dir.join(sound_path),
        Err(_) => sound_path.to_path_buf(),
    }
}

pub fn run() {
    let result = tauri::Builder::default()
        .setup(|app| {
            if cfg!(debug_assertions) {
                app.handle().plugin(
                    tauri_plugin_log::Builder::default()
                        .level(log::LevelFilter::Info)
                        .build(),
                )?;
            }

            // Initialize Config
            let config_dir = app.path().app_config_dir().unwrap_or(PathBuf::from("."));
            let config_manager = ConfigManager::new(config_dir);
            let settings = config_manager.load();

            // Native alert service first, then the alert thread that talks to it
            let sound_path = resolve_sound_path(app.handle(), &settings.sound_path);
            let volume = settings.native_volume;
            let notice_handle = app.handle().clone();
            let service = spawn_alert_service_with_notice(
                move || RodioPlayer::new(sound_path, volume),
                move |notice| publish_notice(&notice_handle, notice),
            )?;

            let bridge = service.clone();
            let thread_settings = settings.clone();
            let alerts = spawn_alert_thread(move || {
                AlertProvider::from_settings(
                    &thread_settings,
                    &HostProbe,
                    Some(Rc::new(bridge) as Rc<dyn PlatformBridge>),
                    None,
                )
            })?;

            app.manage(AppState {
                alerts,
                service,
                settings: Mutex::new(settings),
                config_manager,
            });
            Ok(())
        })
        .on_window_event(|window, event| {
            let Some(state) = window.try_state::<AppState>() else {
                return;
            };
            match event {
                WindowEvent::Focused(true) => {
                    let alerts = state.alerts.clone();
                    tauri::async_runtime::spawn(async move {
                        alerts.foreground_resumed().await;
                    });
                }
                // The alert outlives the window; only logout or an explicit stop ends it
                WindowEvent::CloseRequested { api, .. } => {
                    api.prevent_close();
                    let _ = window.hide();
                }
                _ => {}
            }
        })
        .invoke_handler(tauri::generate_handler![
            start_order_alert,
            stop_order_alert,
            stop_all_order_alerts,
            is_order_alert_playing,
            order_alert_status,
            handle_push,
            dismiss_order_alert,
            order_acted,
            logout,
            quit_app,
            get_settings,
            save_settings
        ])
        .run(tauri::generate_context!());

    if let Err(e) = result {
        eprintln!("error while running tauri application: {e}");
        std::process::exit(1);
    }
}
