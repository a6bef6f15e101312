//! Tauri IPC commands exposed to the webview.
//!
//! Each command is callable via `invoke("command_name", { args })` from the
//! frontend. This is the entire allow-listed surface the UI gets — it never
//! receives direct host capabilities.

pub mod ui;
