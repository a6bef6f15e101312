//! Tauri IPC commands for the shell window.
//!
//! `ui_ready` drives the one outbound composition per window load;
//! `set_title` relays the UI's action back onto its own window. Both act on
//! the window the invocation came from — resolved from the command's window
//! handle, never a global window reference — so they stay correct with
//! multiple windows open.

use std::sync::Mutex;

use tauri::Emitter;

use crate::orchestrator::{compose_greeting, GREETING_CALL, GREETING_TARGET};
use crate::store::NameStore;
use crate::BridgeState;

/// Event pushed to the UI with the composed greeting.
pub const SET_GREETING_EVENT: &str = "set-greeting";

/// The UI signals it has loaded; compose a greeting and push it back.
///
/// One helper call, one store read, one push — to the window that signalled.
/// If either sub-call fails the push simply never happens: the UI keeps its
/// placeholder and the failure is logged here.
#[tauri::command]
pub async fn ui_ready(
    window: tauri::WebviewWindow,
    bridge: tauri::State<'_, BridgeState>,
    store: tauri::State<'_, Mutex<NameStore>>,
) -> Result<(), String> {
    compose_and_push(window, bridge, store).await.map_err(|e| {
        tracing::warn!(error = %e, "composition failed, nothing pushed");
        e
    })
}

async fn compose_and_push(
    window: tauri::WebviewWindow,
    bridge: tauri::State<'_, BridgeState>,
    store: tauri::State<'_, Mutex<NameStore>>,
) -> Result<(), String> {
    tracing::info!(window = window.label(), "ui ready");

    let greeting = {
        let guard = bridge.lock().await;
        let conn = guard
            .as_ref()
            .ok_or_else(|| "helper not connected".to_string())?;
        conn.call(GREETING_CALL, GREETING_TARGET)
            .await
            .map_err(|e| format!("{e}"))?
    };

    let names = {
        let store = store.lock().map_err(|e| format!("Lock error: {e}"))?;
        store.select_names().map_err(|e| format!("{e}"))?
    };

    let message = compose_greeting(&greeting, &names);
    tracing::info!(greeting = %message, "composed greeting");

    window
        .emit_to(window.label(), SET_GREETING_EVENT, &message)
        .map_err(|e| format!("{e}"))
}

/// Set the title of the window the action came from.
#[tauri::command]
pub fn set_title(title: String, window: tauri::WebviewWindow) -> Result<(), String> {
    tracing::debug!(window = window.label(), "set title");
    window.set_title(&title).map_err(|e| format!("{e}"))
}
