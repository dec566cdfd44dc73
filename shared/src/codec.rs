//! JSON text codec for the wire envelope
//!
//! WebSocket text frames already carry message boundaries, so the codec is a
//! straight JSON mapping plus the validation the dispatcher relies on: a
//! size guard on inbound frames and a non-empty dispatch key.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::Envelope;

/// Maximum message size (256 KB) to prevent memory exhaustion
pub const MAX_MESSAGE_SIZE: usize = 256 * 1024;

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("message too large: {0} bytes (max: {MAX_MESSAGE_SIZE})")]
    MessageTooLarge(usize),

    #[error("envelope has an empty event type")]
    MissingEventType,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode an envelope as a JSON text frame
pub fn encode(envelope: &Envelope) -> Result<String, CodecError> {
    let text = serde_json::to_string(envelope)?;
    if text.len() > MAX_MESSAGE_SIZE {
        return Err(CodecError::MessageTooLarge(text.len()));
    }
    Ok(text)
}

/// Decode a JSON text frame into an envelope
pub fn decode(text: &str) -> Result<Envelope, CodecError> {
    if text.len() > MAX_MESSAGE_SIZE {
        return Err(CodecError::MessageTooLarge(text.len()));
    }

    let envelope: Envelope = serde_json::from_str(text)?;

    if envelope.event_type.is_empty() {
        return Err(CodecError::MissingEventType);
    }

    Ok(envelope)
}

/// Extract a typed payload from an envelope's `data` value
pub fn payload<T: DeserializeOwned>(data: &Value) -> Result<T, CodecError> {
    Ok(serde_json::from_value(data.clone())?)
}
