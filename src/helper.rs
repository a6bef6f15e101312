//! Helper-side request loop.
//!
//! The `greet-core` binary wraps [`serve`] around its stdio: each line on
//! stdin is one call, each line on stdout is the matching reply. Diagnostics
//! must go to stderr — stdout belongs to the reply channel.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::bridge::wire::{WireReply, WireRequest};

/// Answer one call. Unknown call names produce an error reply carrying the
/// request's correlation id.
pub fn handle_request(request: &WireRequest) -> WireReply {
    match request.name.as_str() {
        "greeting" => WireReply::ok(request.id, format!("Hello {}", request.arg)),
        other => WireReply::err(request.id, format!("unknown call: '{other}'")),
    }
}

/// Serve calls until the inbound channel closes.
///
/// Malformed request lines are logged and skipped; the loop only ends on EOF
/// (the host hung up) or an I/O error.
pub async fn serve<R, W>(reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let request = match serde_json::from_str::<WireRequest>(trimmed) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "malformed request line");
                continue;
            }
        };

        tracing::debug!(id = request.id, name = %request.name, "helper call");
        let reply = handle_request(&request);

        let mut json = serde_json::to_string(&reply).map_err(std::io::Error::other)?;
        json.push('\n');
        writer.write_all(json.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_call() {
        let reply = handle_request(&WireRequest::new(1, "greeting", "World"));
        assert_eq!(reply.into_result().unwrap(), "Hello World");
    }

    #[test]
    fn test_unknown_call_is_an_error_with_same_id() {
        let reply = handle_request(&WireRequest::new(9, "farewell", "World"));
        assert_eq!(reply.id, 9);
        assert!(reply.error.as_deref().unwrap().contains("farewell"));
        assert!(reply.result.is_none());
    }

    #[tokio::test]
    async fn test_serve_round_trip() {
        let (host, helper) = tokio::io::duplex(4096);
        let (helper_read, helper_write) = tokio::io::split(helper);
        tokio::spawn(serve(helper_read, helper_write));

        let (host_read, mut host_write) = tokio::io::split(host);
        let request = serde_json::to_string(&WireRequest::new(4, "greeting", "World")).unwrap();
        host_write
            .write_all(format!("{request}\n").as_bytes())
            .await
            .unwrap();
        host_write.flush().await.unwrap();

        let mut lines = BufReader::new(host_read).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        let reply: WireReply = serde_json::from_str(&line).unwrap();
        assert_eq!(reply.id, 4);
        assert_eq!(reply.into_result().unwrap(), "Hello World");
    }

    #[tokio::test]
    async fn test_serve_skips_garbage_lines() {
        let (host, helper) = tokio::io::duplex(4096);
        let (helper_read, helper_write) = tokio::io::split(helper);
        tokio::spawn(serve(helper_read, helper_write));

        let (host_read, mut host_write) = tokio::io::split(host);
        let request = serde_json::to_string(&WireRequest::new(5, "greeting", "again")).unwrap();
        host_write
            .write_all(format!("not json\n\n{request}\n").as_bytes())
            .await
            .unwrap();
        host_write.flush().await.unwrap();

        let mut lines = BufReader::new(host_read).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        let reply: WireReply = serde_json::from_str(&line).unwrap();
        assert_eq!(reply.into_result().unwrap(), "Hello again");
    }
}
