//! Helper process configuration.
//!
//! The helper is addressed by an executable path resolved at startup:
//!
//! 1. `GREETSHELL_CORE` environment variable (command only, no arguments)
//! 2. optional `helper.json` override file next to the app executable or in
//!    the current directory
//! 3. the `greet-core` binary adjacent to the app executable (dev builds and
//!    packaged installs both place the two binaries side by side)
//! 4. bare `greet-core`, left to `PATH` resolution

use serde::Deserialize;

/// Environment variable overriding the helper command.
pub const HELPER_ENV_VAR: &str = "GREETSHELL_CORE";

/// Override file name, searched next to the executable and in the cwd.
const OVERRIDE_FILE: &str = "helper.json";

/// Helper binary name for the adjacent-executable and `PATH` fallbacks.
#[cfg(target_os = "windows")]
const HELPER_BIN_NAME: &str = "greet-core.exe";
#[cfg(not(target_os = "windows"))]
const HELPER_BIN_NAME: &str = "greet-core";

/// How to launch the helper process.
#[derive(Debug, Clone, Deserialize)]
pub struct HelperConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl HelperConfig {
    fn from_command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
        }
    }
}

/// Resolve the helper configuration.
///
/// Never fails: the last resort is the bare binary name, and a missing or
/// unlaunchable helper surfaces later as a spawn error.
pub fn resolve_helper_config() -> HelperConfig {
    if let Ok(command) = std::env::var(HELPER_ENV_VAR) {
        if !command.is_empty() {
            tracing::info!(command = %command, "helper command from {HELPER_ENV_VAR}");
            return HelperConfig::from_command(command);
        }
    }

    if let Some(config) = load_override_file() {
        return config;
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(exe_dir) = exe.parent() {
            let adjacent = exe_dir.join(HELPER_BIN_NAME);
            if adjacent.is_file() {
                return HelperConfig::from_command(adjacent.to_string_lossy().into_owned());
            }
        }
    }

    tracing::info!(
        command = HELPER_BIN_NAME,
        "helper not found next to executable, relying on PATH"
    );
    HelperConfig::from_command(HELPER_BIN_NAME)
}

/// Load the optional `helper.json` override file.
///
/// Returns `None` if the file doesn't exist or can't be parsed (a parse
/// failure is logged and resolution falls through to the defaults).
fn load_override_file() -> Option<HelperConfig> {
    let mut candidates = Vec::new();
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            candidates.push(dir.join(OVERRIDE_FILE));
        }
    }
    candidates.push(std::path::PathBuf::from(OVERRIDE_FILE));

    for path in &candidates {
        if let Ok(content) = std::fs::read_to_string(path) {
            match serde_json::from_str::<HelperConfig>(&content) {
                Ok(config) => {
                    tracing::info!(
                        path = %path.display(),
                        command = %config.command,
                        "loaded helper override config"
                    );
                    return Some(config);
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to parse helper override config"
                    );
                }
            }
        }
    }

    None
}

// ─── Tests ───────────────────────────────────────────────────────────────────
