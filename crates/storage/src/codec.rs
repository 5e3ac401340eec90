// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Encodes/decodes [`EventPayload`] to the `(type, payload)` column pair the
//! `events` table stores (spec.md §6's logical schema), round-tripping
//! through the adjacently-tagged JSON shape `ac-core::event` already
//! produces rather than hand-rolling a second serialization.

use crate::error::StorageError;
use ac_core::EventPayload;

pub fn encode(payload: &EventPayload) -> Result<(String, String), StorageError> {
    let value = serde_json::to_value(payload)?;
    let type_tag = value
        .get("type")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let payload_value = value.get("payload").cloned().unwrap_or(serde_json::Value::Null);
    Ok((type_tag, serde_json::to_string(&payload_value)?))
}

pub fn decode(type_tag: &str, payload_json: &str) -> Result<EventPayload, StorageError> {
    let payload_value: serde_json::Value = serde_json::from_str(payload_json)?;
    let wrapped = serde_json::json!({ "type": type_tag, "payload": payload_value });
    Ok(serde_json::from_value(wrapped)?)
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
