use anyhow::Context as _;
use haiven_mcp::{JsonRpcError, JsonRpcId, JsonRpcMessage, JsonRpcResponse, McpConnection, Routed};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt as _, AsyncWrite, AsyncWriteExt as _};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{Instrument as _, error, info, info_span, warn};

const OUTBOX_CAPACITY: usize = 64;

/// Serve line-delimited JSON-RPC until the reader hits EOF or the client sends `shutdown`.
///
/// A frame that is not valid UTF-8 or JSON gets an error reply and serving continues. Only a
/// failing reader ends the loop early.
///
/// Lifecycle messages are answered in read order. Handler calls run concurrently and may
/// complete out of order; every response goes through one writer task so frames never
/// interleave. In-flight calls are drained before returning.
pub async fn run_stdio<R, W>(
    mut conn: McpConnection,
    mut reader: R,
    writer: W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<JsonRpcResponse>(OUTBOX_CAPACITY);
    let writer_task = tokio::spawn(write_responses(writer, rx));
    let mut inflight = JoinSet::new();
    // Survives a cancelled read_until so partial frames are not lost.
    let mut frame = Vec::new();
    let mut read_error = None;

    loop {
        tokio::select! {
            read = reader.read_until(b'\n', &mut frame) => {
                match read {
                    Ok(0) if frame.is_empty() => {
                        info!("stdin closed");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(error = %e, "failed to read request frame");
                        read_error = Some(e);
                        break;
                    }
                }
                let line = std::mem::take(&mut frame);
                if line.trim_ascii().is_empty() {
                    continue;
                }

                let routed = match decode(&line) {
                    Ok(msg) => conn.route(msg),
                    Err(resp) => Routed::Reply(resp),
                };
                match routed {
                    Routed::Reply(resp) => {
                        if tx.send(resp).await.is_err() {
                            break;
                        }
                    }
                    Routed::Dispatch(pending) => {
                        let span = info_span!(
                            "mcp_request",
                            method = %pending.method(),
                            id = %pending.id()
                        );
                        let tx = tx.clone();
                        inflight.spawn(
                            async move {
                                let resp = pending.run().await;
                                let _ = tx.send(resp).await;
                            }
                            .instrument(span),
                        );
                    }
                    Routed::Ignore => {}
                }

                if conn.is_shutting_down() {
                    break;
                }
            }
            Some(done) = inflight.join_next(), if !inflight.is_empty() => {
                if let Err(e) = done {
                    error!(error = %e, "request task failed");
                }
            }
        }
    }

    if !inflight.is_empty() {
        info!(pending = inflight.len(), "waiting for in-flight requests");
    }
    while let Some(done) = inflight.join_next().await {
        if let Err(e) = done {
            error!(error = %e, "request task failed");
        }
    }

    drop(tx);
    writer_task.await.context("join writer task")??;
    if let Some(e) = read_error {
        return Err(e).context("read request frame");
    }
    info!("server stopped");
    Ok(())
}

/// Malformed frames become the response to send back.
fn decode(line: &[u8]) -> Result<JsonRpcMessage, JsonRpcResponse> {
    let val: Value = serde_json::from_slice(line).map_err(|e| {
        warn!(error = %e, "unparsable request frame");
        JsonRpcResponse::err(JsonRpcId::Null, JsonRpcError::parse_error(e.to_string()))
    })?;

    if val.is_array() {
        return Err(JsonRpcResponse::err(
            JsonRpcId::Null,
            JsonRpcError::invalid_request("batching not supported", None),
        ));
    }

    // Keep the id when the envelope is otherwise broken so the client can correlate. An id that
    // is not a string, an integer or null cannot be echoed back.
    let id = match val.get("id") {
        None => JsonRpcId::Null,
        Some(raw) => serde_json::from_value::<JsonRpcId>(raw.clone()).map_err(|_| {
            JsonRpcResponse::err(
                JsonRpcId::Null,
                JsonRpcError::invalid_request(
                    "invalid request",
                    Some("id must be a string, an integer, or null".to_string()),
                ),
            )
        })?,
    };
    let is_envelope = val.get("method").is_some()
        || val.get("result").is_some()
        || val.get("error").is_some();
    if !is_envelope {
        return Err(JsonRpcResponse::err(
            id,
            JsonRpcError::invalid_request("invalid request", Some("missing method".to_string())),
        ));
    }
    serde_json::from_value(val).map_err(|e| {
        JsonRpcResponse::err(
            id,
            JsonRpcError::invalid_request("invalid request", Some(e.to_string())),
        )
    })
}

async fn write_responses<W>(
    mut writer: W,
    mut rx: mpsc::Receiver<JsonRpcResponse>,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(resp) = rx.recv().await {
        let mut out = serde_json::to_vec(&resp).context("encode response")?;
        out.push(b'\n');
        writer.write_all(&out).await.context("write response")?;
        writer.flush().await.context("flush response")?;
    }
    Ok(())
}
