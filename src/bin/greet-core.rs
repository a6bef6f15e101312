//! The helper executable: answers named calls over stdio.
//!
//! Launched by the shell as a child process. Requests arrive one JSON object
//! per line on stdin; replies leave the same way on stdout. All diagnostics
//! go to stderr — stdout is the reply channel.

use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!(pid = std::process::id(), "greet-core starting");

    greetshell::helper::serve(tokio::io::stdin(), tokio::io::stdout()).await
}
