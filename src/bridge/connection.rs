//! Connection to the helper process.
//!
//! Spawns the helper as a child process, owns its stdio channel, and matches
//! line-delimited JSON replies to pending calls by correlation id. A
//! background reader task completes the pending calls; when the channel
//! closes or errors, every pending call fails with `Disconnected` and the
//! disconnect becomes observable exactly once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, watch, Mutex};

use super::config::HelperConfig;
use super::errors::BridgeError;
use super::wire::{WireReply, WireRequest};

// ─── Request ID Generator ────────────────────────────────────────────────────

/// Global monotonic request ID counter.
static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Generate a unique request ID.
fn next_request_id() -> u64 {
    NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

// ─── Connection ──────────────────────────────────────────────────────────────

/// Calls awaiting their reply, keyed by request id.
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<String, BridgeError>>>>>;

/// Handle to a running helper process.
///
/// The write half lives behind a mutex so concurrent calls interleave at
/// line granularity; the read half is owned exclusively by the reader task.
pub struct HelperConnection {
    writer: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
    pending: PendingMap,
    disconnected: watch::Receiver<bool>,
    /// Keeps the child alive; `kill_on_drop` ties its lifetime to ours.
    _child: Option<Child>,
}

impl HelperConnection {
    /// Spawn the helper addressed by `config` and open the line channel.
    ///
    /// Must be called from within a tokio runtime (the reader task is
    /// spawned here). The helper's stderr passes through to the host's.
    pub fn spawn(config: &HelperConfig) -> Result<Self, BridgeError> {
        let spawn_failed = |reason: String| BridgeError::SpawnFailed {
            command: config.command.clone(),
            reason,
        };

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args);
        cmd.stdin(std::process::Stdio::piped());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::inherit());
        cmd.kill_on_drop(true);

        // Windows: prevent a console window from appearing for the child
        #[cfg(target_os = "windows")]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x08000000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        let mut child = cmd.spawn().map_err(|e| spawn_failed(e.to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| spawn_failed("failed to capture stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_failed("failed to capture stdout".into()))?;

        Ok(Self::from_io(stdout, stdin, Some(child)))
    }

    /// Build a connection over an arbitrary byte channel.
    ///
    /// Production uses the child's stdio; tests drive this with an in-memory
    /// duplex stream.
    pub fn from_io<R, W>(reader: R, writer: W, child: Option<Child>) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (disconnect_tx, disconnect_rx) = watch::channel(false);

        tokio::spawn(read_loop(reader, Arc::clone(&pending), disconnect_tx));

        Self {
            writer: Mutex::new(Box::new(writer)),
            pending,
            disconnected: disconnect_rx,
            _child: child,
        }
    }

    /// Issue one named call and await the matching reply.
    ///
    /// Resolves with the helper's result, or fails with `Disconnected` if the
    /// channel closes first. There is no timeout and no retry.
    pub async fn call(&self, name: &str, arg: &str) -> Result<String, BridgeError> {
        if *self.disconnected.borrow() {
            return Err(BridgeError::Disconnected {
                reason: "channel already closed".into(),
            });
        }

        let id = next_request_id();
        let request = WireRequest::new(id, name, arg);
        let mut line = serde_json::to_string(&request).map_err(|e| BridgeError::Transport {
            reason: format!("failed to serialize request: {e}"),
        })?;
        line.push('\n');

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let written = {
            let mut writer = self.writer.lock().await;
            match writer.write_all(line.as_bytes()).await {
                Ok(()) => writer.flush().await,
                Err(e) => Err(e),
            }
        };
        if let Err(e) = written {
            self.pending.lock().await.remove(&id);
            return Err(BridgeError::Transport {
                reason: format!("failed to write request: {e}"),
            });
        }

        // The reader may have drained the map between our insert and now; a
        // still-present entry with the flag up would never be completed.
        if *self.disconnected.borrow() && self.pending.lock().await.remove(&id).is_some() {
            return Err(BridgeError::Disconnected {
                reason: "channel closed before reply".into(),
            });
        }

        rx.await.map_err(|_| BridgeError::Disconnected {
            reason: "channel closed before reply".into(),
        })?
    }

    /// Watch the disconnect flag. It transitions `false → true` exactly once,
    /// when the channel to the helper closes.
    pub fn subscribe_disconnect(&self) -> watch::Receiver<bool> {
        self.disconnected.clone()
    }
}

// ─── Reader Task ─────────────────────────────────────────────────────────────

/// Read reply lines until the channel closes, completing pending calls.
///
/// Non-JSON lines are skipped (stray log output on stdout). On EOF or read
/// error, every pending call is failed and the disconnect flag is raised.
async fn read_loop<R>(reader: R, pending: PendingMap, disconnected: watch::Sender<bool>)
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let mut lines = BufReader::new(reader).lines();

    let reason = loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str::<WireReply>(trimmed) {
                    Ok(reply) => match pending.lock().await.remove(&reply.id) {
                        Some(sender) => {
                            let _ = sender.send(reply.into_result());
                        }
                        None => {
                            tracing::warn!(id = reply.id, "reply for unknown request id");
                        }
                    },
                    // Not a reply — skip and keep reading.
                    Err(_) => continue,
                }
            }
            Ok(None) => break "helper stdout closed".to_string(),
            Err(e) => break format!("failed to read from helper: {e}"),
        }
    };

    for (_, sender) in pending.lock().await.drain() {
        let _ = sender.send(Err(BridgeError::Disconnected {
            reason: reason.clone(),
        }));
    }

    let _ = disconnected.send(true);
    tracing::warn!(reason = %reason, "helper disconnected");
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, split};

    /// A fake helper on the far end of a duplex channel: answers `greeting`
    /// requests with `"Hello " + arg`, `count` lines at most, then hangs up.
    async fn echo_helper<R, W>(reader: R, mut writer: W, count: usize)
    where
        R: AsyncRead + Send + Unpin,
        W: AsyncWrite + Send + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();
        for _ in 0..count {
            let Ok(Some(line)) = lines.next_line().await else {
                return;
            };
            let request: WireRequest = serde_json::from_str(&line).unwrap();
            let reply = WireReply::ok(request.id, format!("Hello {}", request.arg));
            let mut json = serde_json::to_string(&reply).unwrap();
            json.push('\n');
            writer.write_all(json.as_bytes()).await.unwrap();
            writer.flush().await.unwrap();
        }
    }

    fn connect() -> (HelperConnection, tokio::io::ReadHalf<tokio::io::DuplexStream>, tokio::io::WriteHalf<tokio::io::DuplexStream>)
    {
        let (near, far) = duplex(4096);
        let (near_read, near_write) = split(near);
        let (far_read, far_write) = split(far);
        (
            HelperConnection::from_io(near_read, near_write, None),
            far_read,
            far_write,
        )
    }

    #[tokio::test]
    async fn test_call_resolves_with_reply() {
        let (conn, far_read, far_write) = connect();
        tokio::spawn(echo_helper(far_read, far_write, 1));

        let result = conn.call("greeting", "World").await.unwrap();
        assert_eq!(result, "Hello World");
    }

    #[tokio::test]
    async fn test_replies_match_by_correlation_id() {
        let (conn, far_read, mut far_write) = connect();

        // Answer with a bogus id first, then the real reply.
        tokio::spawn(async move {
            let mut lines = BufReader::new(far_read).lines();
            let line = lines.next_line().await.unwrap().unwrap();
            let request: WireRequest = serde_json::from_str(&line).unwrap();

            let bogus = serde_json::to_string(&WireReply::ok(u64::MAX, "wrong")).unwrap();
            let real =
                serde_json::to_string(&WireReply::ok(request.id, format!("Hello {}", request.arg)))
                    .unwrap();
            far_write
                .write_all(format!("{bogus}\n{real}\n").as_bytes())
                .await
                .unwrap();
            far_write.flush().await.unwrap();
        });

        let result = conn.call("greeting", "World").await.unwrap();
        assert_eq!(result, "Hello World");
    }

    #[tokio::test]
    async fn test_stray_output_lines_are_skipped() {
        let (conn, far_read, mut far_write) = connect();

        tokio::spawn(async move {
            let mut lines = BufReader::new(far_read).lines();
            let line = lines.next_line().await.unwrap().unwrap();
            let request: WireRequest = serde_json::from_str(&line).unwrap();

            let reply = serde_json::to_string(&WireReply::ok(request.id, "Hello World")).unwrap();
            far_write
                .write_all(format!("helper warming up...\n\n{reply}\n").as_bytes())
                .await
                .unwrap();
            far_write.flush().await.unwrap();
        });

        assert_eq!(conn.call("greeting", "World").await.unwrap(), "Hello World");
    }

    #[tokio::test]
    async fn test_error_reply_fails_the_call() {
        let (conn, far_read, mut far_write) = connect();

        tokio::spawn(async move {
            let mut lines = BufReader::new(far_read).lines();
            let line = lines.next_line().await.unwrap().unwrap();
            let request: WireRequest = serde_json::from_str(&line).unwrap();

            let reply =
                serde_json::to_string(&WireReply::err(request.id, "unknown call: 'nope'")).unwrap();
            far_write
                .write_all(format!("{reply}\n").as_bytes())
                .await
                .unwrap();
            far_write.flush().await.unwrap();
        });

        let err = conn.call("nope", "x").await.unwrap_err();
        assert!(matches!(err, BridgeError::CallFailed { .. }));
    }

    #[tokio::test]
    async fn test_disconnect_rejects_pending_and_fires_once() {
        let (conn, far_read, far_write) = connect();
        let mut disconnect = conn.subscribe_disconnect();
        assert!(!*disconnect.borrow());

        // Read the request, then hang up without replying.
        tokio::spawn(async move {
            let mut lines = BufReader::new(far_read).lines();
            let _ = lines.next_line().await;
            drop(far_write);
        });

        let err = conn.call("greeting", "World").await.unwrap_err();
        assert!(matches!(err, BridgeError::Disconnected { .. }));

        disconnect.changed().await.unwrap();
        assert!(*disconnect.borrow());

        // Subsequent calls fail immediately — the flag never resets.
        let err = conn.call("greeting", "again").await.unwrap_err();
        assert!(matches!(err, BridgeError::Disconnected { .. }));
    }

    #[tokio::test]
    async fn test_sequential_calls_share_the_channel() {
        let (conn, far_read, far_write) = connect();
        tokio::spawn(echo_helper(far_read, far_write, 2));

        assert_eq!(conn.call("greeting", "one").await.unwrap(), "Hello one");
        assert_eq!(conn.call("greeting", "two").await.unwrap(), "Hello two");
    }
}
