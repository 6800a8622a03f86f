//! Line-framed stdio transport
//!
//! Each input line is one JSON-RPC message. Requests are dispatched on their
//! own task so a slow upstream call never blocks the reader; responses are
//! funnelled through a single writer task, one line each.
//!
//! `notifications/cancelled` fires the cancellation token of the matching
//! in-flight request. A cancelled request gets no response.
//!
//! A line that is not UTF-8 or not JSON is answered with `-32700` and
//! serving continues. A request reusing the id of one still in flight is
//! answered with `-32600` and not dispatched.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::protocol::{CancelledParams, JsonRpcRequest, JsonRpcResponse, codes};
use crate::server::{GitLabMcpServer, decode_request};

/// Tracing target for raw protocol traffic.
pub const IO_TARGET: &str = "gl_mcp::io";

const CANCELLED_METHOD: &str = "notifications/cancelled";

#[derive(Debug, Clone, Copy, Default)]
pub struct TransportOptions {
    /// Log every inbound and outbound line on [`IO_TARGET`]
    pub log_commands: bool,
}

type InFlight = Arc<Mutex<HashMap<String, CancellationToken>>>;

/// Serve requests from `reader` until EOF or until `shutdown` fires.
///
/// On EOF, requests already in flight are allowed to finish and their
/// responses are written. On shutdown every in-flight request is cancelled.
pub async fn serve<R, W>(
    server: Arc<GitLabMcpServer>,
    reader: R,
    writer: W,
    options: TransportOptions,
    shutdown: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel::<String>();
    let writer_task = tokio::spawn(write_lines(writer, rx, options));

    let in_flight: InFlight = Arc::default();
    let mut tasks = JoinSet::new();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut outcome = Ok(());

    tracing::info!("MCP server ready, listening on stdio");

    loop {
        buf.clear();
        let read = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                tracing::info!("shutting down server...");
                break;
            }
            read = reader.read_until(b'\n', &mut buf) => read,
        };
        match read {
            Ok(0) => {
                tracing::debug!("Input closed");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, "Failed to read input");
                outcome = Err(Error::Io(e));
                break;
            }
        }

        // Bytes that are not UTF-8 get the same answer as malformed JSON.
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(e) => {
                tracing::warn!(error = %e, "Input line is not valid UTF-8");
                let rejected = JsonRpcResponse::error(
                    None,
                    codes::PARSE_ERROR,
                    format!("Parse error: {e}"),
                );
                send(&tx, &rejected);
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }
        if options.log_commands {
            tracing::info!(target: IO_TARGET, direction = "in", "{line}");
        }

        while let Some(joined) = tasks.try_join_next() {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Request task failed");
            }
        }

        let request = match decode_request(line) {
            Ok(request) => request,
            Err(rejected) => {
                send(&tx, &rejected);
                continue;
            }
        };

        if request.method == CANCELLED_METHOD {
            cancel_request(&in_flight, request.params).await;
            continue;
        }

        let token = shutdown.child_token();
        let key = request.id.as_ref().map(request_key);
        if let Some(key) = &key {
            let mut in_flight = in_flight.lock().await;
            if in_flight.contains_key(key) {
                tracing::warn!(request_id = %key, "Request id already in flight");
                let rejected = JsonRpcResponse::error(
                    request.id.clone(),
                    codes::INVALID_REQUEST,
                    format!("Invalid request: id {key} is already in use"),
                );
                send(&tx, &rejected);
                continue;
            }
            in_flight.insert(key.clone(), token.clone());
        }

        tasks.spawn(dispatch(
            Arc::clone(&server),
            request,
            token,
            key,
            Arc::clone(&in_flight),
            tx.clone(),
        ));
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "Request task failed");
        }
    }

    drop(tx);
    writer_task
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))??;
    outcome
}

async fn dispatch(
    server: Arc<GitLabMcpServer>,
    request: JsonRpcRequest,
    token: CancellationToken,
    key: Option<String>,
    in_flight: InFlight,
    tx: mpsc::UnboundedSender<String>,
) {
    let ctx = RequestContext::new(request.id.clone()).with_cancellation(token.clone());
    let response = server.handle_request(request, ctx).await;

    if let Some(key) = key {
        in_flight.lock().await.remove(&key);
    }
    if token.is_cancelled() {
        tracing::debug!("Dropping response of cancelled request");
        return;
    }
    if let Some(response) = response {
        send(&tx, &response);
    }
}

async fn cancel_request(in_flight: &InFlight, params: Value) {
    let params: CancelledParams = match serde_json::from_value(params) {
        Ok(params) => params,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed cancellation");
            return;
        }
    };
    let key = request_key(&params.request_id);
    match in_flight.lock().await.get(&key) {
        Some(token) => {
            tracing::info!(
                request_id = %key,
                reason = params.reason.as_deref().unwrap_or(""),
                "Cancelling request"
            );
            token.cancel();
        }
        None => tracing::debug!(request_id = %key, "Cancellation for unknown request"),
    }
}

/// Map key for a request id; `7` and `"7"` stay distinct.
fn request_key(id: &Value) -> String {
    id.to_string()
}

fn send(tx: &mpsc::UnboundedSender<String>, response: &JsonRpcResponse) {
    match serde_json::to_string(response) {
        Ok(line) => {
            if tx.send(line).is_err() {
                tracing::warn!("Writer closed, response dropped");
            }
        }
        Err(e) => tracing::error!(error = %e, "Failed to serialize response"),
    }
}

async fn write_lines<W>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<String>,
    options: TransportOptions,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        if options.log_commands {
            tracing::info!(target: IO_TARGET, direction = "out", "{line}");
        }
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    writer.shutdown().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crate::registry::CatalogBuilder;
    use crate::server::ServerOptions;
    use crate::tool::{ErrorPolicy, Tool, ToolDescriptor, ToolResult};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, DuplexStream, duplex};

    fn server() -> Arc<GitLabMcpServer> {
        let stalled = Tool::new(
            ToolDescriptor::new("stalled", "never finishes").with_policy(ErrorPolicy::SOFT),
            |_ctx, _args| async {
                std::future::pending::<()>().await;
                Ok::<_, HandlerError>(ToolResult::text("late"))
            },
        );
        let echo = Tool::new(ToolDescriptor::new("echo", "echo"), |_ctx, _args| async {
            Ok::<_, HandlerError>(ToolResult::text("echo"))
        });
        let mut builder = CatalogBuilder::new();
        builder.add_tools([stalled, echo]).unwrap();
        Arc::new(GitLabMcpServer::with_catalog(
            builder.build(),
            "0.0.0",
            true,
            ServerOptions::default(),
        ))
    }

    fn input(messages: &[Value]) -> DuplexStream {
        let mut raw = String::new();
        for m in messages {
            raw.push_str(&m.to_string());
            raw.push('\n');
        }
        // one extra blank line to exercise skipping
        raw.push('\n');
        let (mut client, server) = duplex(64 * 1024);
        tokio::spawn(async move {
            client.write_all(raw.as_bytes()).await.unwrap();
        });
        server
    }

    async fn run(messages: &[Value]) -> Vec<Value> {
        let (out_server, mut out_client) = duplex(64 * 1024);
        serve(
            server(),
            input(messages),
            out_server,
            TransportOptions::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        let mut raw = String::new();
        out_client.read_to_string(&mut raw).await.unwrap();
        raw.lines().map(|l| serde_json::from_str(l).unwrap()).collect()
    }

    fn call(id: i64, tool: &str) -> Value {
        json!({"jsonrpc": "2.0", "id": id, "method": "tools/call", "params": {"name": tool}})
    }

    #[tokio::test]
    async fn responds_one_line_per_request() {
        let replies = run(&[
            json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            call(2, "echo"),
        ])
        .await;

        let mut ids: Vec<i64> = replies.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn malformed_line_gets_parse_error() {
        let (out_server, mut out_client) = duplex(4096);
        let (mut client, input) = duplex(4096);
        client.write_all(b"{oops\n").await.unwrap();
        drop(client);

        serve(
            server(),
            input,
            out_server,
            TransportOptions::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        let mut raw = String::new();
        out_client.read_to_string(&mut raw).await.unwrap();
        let reply: Value = serde_json::from_str(raw.trim()).unwrap();
        assert_eq!(reply["error"]["code"], -32700);
        assert_eq!(reply["id"], Value::Null);
    }

    #[tokio::test]
    async fn invalid_utf8_line_gets_parse_error_and_serving_continues() {
        let (out_server, mut out_client) = duplex(4096);
        let (mut client, input) = duplex(4096);
        let mut raw = format!("{}\n", json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}))
            .into_bytes();
        raw.extend_from_slice(b"\xff\xfe\n");
        raw.extend_from_slice(
            format!("{}\n", json!({"jsonrpc": "2.0", "id": 2, "method": "ping"})).as_bytes(),
        );
        client.write_all(&raw).await.unwrap();
        drop(client);

        serve(
            server(),
            input,
            out_server,
            TransportOptions::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        let mut out = String::new();
        out_client.read_to_string(&mut out).await.unwrap();
        let replies: Vec<Value> = out.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(replies.len(), 3);

        let parse_error = replies.iter().find(|r| r["id"].is_null()).unwrap();
        assert_eq!(parse_error["error"]["code"], -32700);
        let mut ids: Vec<i64> = replies.iter().filter_map(|r| r["id"].as_i64()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn reused_in_flight_id_is_rejected() {
        let replies = run(&[
            call(1, "stalled"),
            call(1, "echo"),
            // Still reaches the first request 1.
            json!({"jsonrpc": "2.0", "method": "notifications/cancelled", "params": {"requestId": 1}}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "ping"}),
        ])
        .await;

        assert_eq!(replies.len(), 2);
        let rejected = replies.iter().find(|r| r["id"] == 1).unwrap();
        assert_eq!(rejected["error"]["code"], -32600);
        assert_eq!(
            rejected["error"]["message"],
            "Invalid request: id 1 is already in use"
        );
        assert!(replies.iter().any(|r| r["id"] == 2));
    }

    #[tokio::test]
    async fn cancelled_request_gets_no_response() {
        let replies = run(&[
            call(1, "stalled"),
            json!({"jsonrpc": "2.0", "method": "notifications/cancelled", "params": {"requestId": 1, "reason": "user"}}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "ping"}),
        ])
        .await;

        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["id"], 2);
    }

    #[tokio::test]
    async fn cancellation_matches_id_type() {
        let (out_server, mut out_client) = duplex(64 * 1024);
        let (mut client, input) = duplex(64 * 1024);
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(serve(
            server(),
            input,
            out_server,
            TransportOptions::default(),
            shutdown.clone(),
        ));

        // A string id "1" does not cancel numeric request 1.
        let lines = [
            call(1, "stalled"),
            json!({"jsonrpc": "2.0", "method": "notifications/cancelled", "params": {"requestId": "1"}}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "ping"}),
        ];
        for line in &lines {
            client
                .write_all(format!("{line}\n").as_bytes())
                .await
                .unwrap();
        }

        let mut reader = BufReader::new(&mut out_client);
        let mut first = String::new();
        reader.read_line(&mut first).await.unwrap();
        let reply: Value = serde_json::from_str(&first).unwrap();
        assert_eq!(reply["id"], 2);

        shutdown.cancel();
        task.await.unwrap().unwrap();

        let mut rest = String::new();
        reader.read_to_string(&mut rest).await.unwrap();
        assert!(rest.is_empty(), "unexpected output: {rest}");
    }

    #[tokio::test]
    async fn shutdown_cancels_in_flight_requests() {
        let (out_server, mut out_client) = duplex(4096);
        let (mut client, input) = duplex(4096);
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(serve(
            server(),
            input,
            out_server,
            TransportOptions { log_commands: true },
            shutdown.clone(),
        ));
        client
            .write_all(format!("{}\n", call(1, "stalled")).as_bytes())
            .await
            .unwrap();
        tokio::task::yield_now().await;

        shutdown.cancel();
        task.await.unwrap().unwrap();

        let mut raw = String::new();
        out_client.read_to_string(&mut raw).await.unwrap();
        assert!(raw.is_empty());
        drop(client);
    }
}
