pub mod bridge;
pub mod commands;
pub mod helper;
pub mod orchestrator;
pub mod store;

use std::sync::Mutex;

use bridge::{resolve_helper_config, HelperConnection};
use store::NameStore;
use tauri::Manager;

/// Async mutex for state touched inside async commands.
pub type TokioMutex<T> = tokio::sync::Mutex<T>;

/// Bridge slot — `None` until the async setup task has connected the helper.
///
/// Registered synchronously so the state is always present; `ui_ready` calls
/// that land before the helper is up fail cleanly instead of panicking.
pub type BridgeState = TokioMutex<Option<HelperConnection>>;

/// Return the platform-standard data directory for GreetShell.
///
/// - macOS: `~/Library/Application Support/com.greetshell.app/`
/// - Windows: `{FOLDERID_RoamingAppData}\com.greetshell.app\`
/// - Linux: `$XDG_DATA_HOME/com.greetshell.app/` (fallback `~/.local/share/...`)
///
/// Falls back to `~/.greetshell/` only if none of the above can be resolved.
pub(crate) fn data_dir() -> std::path::PathBuf {
    if let Some(dir) = dirs::data_dir() {
        return dir.join("com.greetshell.app");
    }
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".greetshell")
}

/// Initialize the tracing subscriber — writes structured logs to the app data
/// directory, stamped with elapsed time since process start.
///
/// On each app startup:
/// 1. Rotates existing logs (greetshell.log → .1 → .2 → .3, keeps last 3).
/// 2. Opens a fresh greetshell.log with a line-flushing writer.
/// 3. Logs a startup banner with the data directory path for discoverability.
fn init_tracing() {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = data_dir();
    let _ = std::fs::create_dir_all(&log_dir);

    let log_path = log_dir.join("greetshell.log");

    rotate_log_file(&log_path, 3);

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .expect("failed to open greetshell.log");

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("greetshell=info,warn"));

    fmt::fmt()
        .with_env_filter(filter)
        .with_timer(fmt::time::uptime())
        .with_writer(FlushingWriter::new(log_file))
        .with_ansi(false)
        .with_target(true)
        .init();

    // Startup banner — makes it easy to find the right log file
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %log_dir.display(),
        log_file = %log_path.display(),
        pid = std::process::id(),
        "=== GreetShell starting ==="
    );
}

/// Rotate log files: `greetshell.log` → `.1` → `.2` → … → `.{keep}`.
///
/// The oldest file beyond `keep` is deleted. Missing files in the chain are
/// skipped.
fn rotate_log_file(base_path: &std::path::Path, keep: u32) {
    let oldest = format!("{}.{keep}", base_path.display());
    let _ = std::fs::remove_file(&oldest);

    for i in (1..keep).rev() {
        let from = format!("{}.{i}", base_path.display());
        let to = format!("{}.{}", base_path.display(), i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    if base_path.exists() {
        let to = format!("{}.1", base_path.display());
        let _ = std::fs::rename(base_path, &to);
    }
}

/// A writer that wraps `std::fs::File` and flushes after every write.
///
/// `tracing-subscriber` buffers log output internally; without explicit
/// flushing, entries may sit in OS buffers and be lost on crash. Throughput
/// is irrelevant at this app's log volume.
#[derive(Clone)]
struct FlushingWriter {
    file: std::sync::Arc<std::sync::Mutex<std::fs::File>>,
}

impl FlushingWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: std::sync::Arc::new(std::sync::Mutex::new(file)),
        }
    }
}

impl std::io::Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        let n = std::io::Write::write(&mut *f, buf)?;
        std::io::Write::flush(&mut *f)?;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        std::io::Write::flush(&mut *f)
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FlushingWriter {
    type Writer = FlushingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Resolve the path for the demo-record SQLite database.
///
/// Uses the platform-standard data directory (creates it if needed).
fn resolve_db_path() -> String {
    data_dir().join("greetshell.db").to_string_lossy().into_owned()
}

/// Run the Tauri application.
pub fn run() {
    // Initialize tracing FIRST — before any tracing::info!() calls
    init_tracing();

    // Open (and on first run, seed) the store. A failure here is fatal to
    // startup — there is no recovery policy beyond surfacing it.
    let db_path = resolve_db_path();
    let name_store = NameStore::open(&db_path).expect("failed to open name store");

    match name_store.select_records() {
        Ok(records) => {
            tracing::info!(db_path = %db_path, rows = records.len(), "name store ready");
            for record in &records {
                tracing::debug!(name = %record.name, age = record.age, "stored record");
            }
        }
        Err(e) => tracing::warn!(error = %e, "name store opened but unreadable"),
    }

    tauri::Builder::default()
        .manage(Mutex::new(name_store))
        .manage(TokioMutex::new(None::<HelperConnection>))
        .setup(|app| {
            // Spawn the helper before any window finishes loading — ui_ready
            // must find the bridge in place. A helper that fails to start
            // leaves the slot empty: the greeting push then never happens and
            // the UI keeps its placeholder.
            let config = resolve_helper_config();
            tauri::async_runtime::block_on(async {
                match HelperConnection::spawn(&config) {
                    Ok(conn) => {
                        tracing::info!(command = %config.command, "helper connected");
                        let state: tauri::State<'_, BridgeState> = app.state();
                        *state.lock().await = Some(conn);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "helper failed to start (non-fatal)");
                    }
                }
            });

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::ui::ui_ready,
            commands::ui::set_title,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
