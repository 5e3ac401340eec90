// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Newline-delimited JSON-RPC 2.0 framing over the agent subprocess's
//! stdio. Grounded on `oj-daemon/src/adapters/agent/coop/http.rs`'s
//! hand-written frame parsing over a child's stdio (`BufReader` +
//! manual line handling), adapted from HTTP/1.1-over-unix-socket to one
//! JSON value per newline-terminated line.

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Read the next newline-delimited JSON frame, skipping blank lines.
/// Returns `Ok(None)` on clean EOF.
pub async fn read_frame<R>(reader: &mut BufReader<R>) -> std::io::Result<Option<Value>>
where
    R: tokio::io::AsyncRead + Unpin,
{
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            return Ok(None);
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value: Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, line = %trimmed, "dropping unparseable frame from agent");
                continue;
            }
        };
        return Ok(Some(value));
    }
}

/// Write one JSON value as a newline-terminated frame.
pub async fn write_frame<W>(writer: &mut W, value: &Value) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await
}
