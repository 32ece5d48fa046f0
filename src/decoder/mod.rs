//! Metric envelope decoding.
//!
//! Each broker message carries one JSON-encoded [`MetricEnvelope`]. A payload
//! that does not parse yields a [`DecodeError`] holding everything needed to
//! find the offending record again; the caller logs it and moves on.

use crate::broker::ConsumedMessage;
use crate::core::MetricEnvelope;
use thiserror::Error;

/// A payload that could not be decoded into a metric envelope.
#[derive(Error, Debug)]
#[error("invalid metric envelope on {topic}[{partition}]@{offset}: {source}")]
pub struct DecodeError {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    /// The payload exactly as received
    pub payload: Vec<u8>,
    #[source]
    pub source: serde_json::Error,
}

impl DecodeError {
    /// Payload rendered for diagnostics, lossily if it is not UTF-8
    pub fn payload_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// Decode a consumed message into a metric envelope.
pub fn decode(message: &ConsumedMessage) -> Result<MetricEnvelope, DecodeError> {
    serde_json::from_slice(&message.payload).map_err(|source| DecodeError {
        topic: message.topic.clone(),
        partition: message.partition,
        offset: message.offset,
        payload: message.payload.clone(),
        source,
    })
}
