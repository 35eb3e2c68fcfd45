//! Wire encoding of message envelopes.
//!
//! The JSON format is the one existing workers speak:
//!
//! ```text
//! { "id": "...", "timestamp": "<RFC 3339>", "queue_name": "...", "data": <JSON> }
//! ```
//!
//! Opaque payloads replace `data` with `serialized_data_base64`. The CBOR
//! format has the same fields but carries opaque payloads as a raw byte string
//! under `serialized_data`.
use crate::error::{Error, Result};
use crate::payload::Payload;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Encoding used for envelopes stored in the backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WireFormat {
    /// UTF-8 JSON text.
    #[default]
    Json,

    /// CBOR.
    Cbor,
}

/// Everything about a message that travels through the backend.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    /// Unique message identifier.
    pub id: String,

    /// When the message was created.
    pub timestamp: DateTime<Utc>,

    /// Logical name of the queue the message was sent to.
    pub queue_name: String,

    /// Message body.
    pub payload: Payload,
}

#[derive(Serialize)]
struct WireEnvelopeRef<'a> {
    id: &'a str,
    timestamp: &'a DateTime<Utc>,
    queue_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    serialized_data_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    serialized_data: Option<&'a Bytes>,
}

#[derive(Deserialize)]
struct WireEnvelope {
    id: String,
    timestamp: DateTime<Utc>,
    queue_name: String,
    #[serde(default, deserialize_with = "present")]
    data: Option<Value>,
    #[serde(default)]
    serialized_data_base64: Option<String>,
    #[serde(default)]
    serialized_data: Option<Bytes>,
}

// Distinguishes `"data": null` (a null payload) from a missing field.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Encodes an envelope.
///
/// # Errors
///
/// Returns [`Error::Serialization`] if the envelope cannot be written in
/// `format`.
pub fn encode(envelope: &Envelope, format: WireFormat) -> Result<Bytes> {
    let (data, opaque) = match &envelope.payload {
        Payload::Structured(value) => (Some(value), None),
        Payload::Opaque(bytes) => (None, Some(bytes)),
    };

    let wire = WireEnvelopeRef {
        id: &envelope.id,
        timestamp: &envelope.timestamp,
        queue_name: &envelope.queue_name,
        data,
        serialized_data_base64: match format {
            WireFormat::Json => opaque.map(|bytes| BASE64.encode(bytes)),
            WireFormat::Cbor => None,
        },
        serialized_data: match format {
            WireFormat::Json => None,
            WireFormat::Cbor => opaque,
        },
    };

    match format {
        WireFormat::Json => Ok(Bytes::from(serde_json::to_vec(&wire)?)),
        WireFormat::Cbor => {
            let mut buf = Vec::new();
            ciborium::into_writer(&wire, &mut buf)?;
            Ok(Bytes::from(buf))
        }
    }
}

/// Decodes an envelope.
///
/// # Errors
///
/// Returns [`Error::Serialization`] if `bytes` is not a well-formed envelope
/// in `format`, or if it carries zero or two payloads.
pub fn decode(bytes: &[u8], format: WireFormat) -> Result<Envelope> {
    let wire: WireEnvelope = match format {
        WireFormat::Json => serde_json::from_slice(bytes)?,
        WireFormat::Cbor => ciborium::from_reader(bytes)?,
    };

    let payload = match (wire.data, wire.serialized_data_base64, wire.serialized_data) {
        (Some(value), None, None) => Payload::Structured(value),
        (None, Some(encoded), None) => Payload::Opaque(Bytes::from(BASE64.decode(encoded)?)),
        (None, None, Some(bytes)) => Payload::Opaque(bytes),
        (None, None, None) => {
            return Err(Error::Serialization(format!(
                "envelope {} has no payload",
                wire.id
            )));
        }
        _ => {
            return Err(Error::Serialization(format!(
                "envelope {} has more than one payload",
                wire.id
            )));
        }
    };

    Ok(Envelope {
        id: wire.id,
        timestamp: wire.timestamp,
        queue_name: wire.queue_name,
        payload,
    })
}
