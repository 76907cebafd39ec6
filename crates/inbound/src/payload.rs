//! Relay payload shapes and their reduction to one canonical message.
//!
//! Two shapes are accepted: an event envelope (`{"type": "email.received",
//! "data": {...}}`) and a bare message object used by the legacy relay.
//! Nothing past `normalize` looks at the shape again.

use crate::sanitizer::to_plain_text;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Event type marking an enveloped inbound message.
pub const RECEIVED_EVENT: &str = "email.received";

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Invalid JSON payload: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Invalid email payload: {0}")]
    InvalidShape(#[source] serde_json::Error),

    #[error("Invalid email payload: missing required fields")]
    MissingFields,
}

/// `to` arrives either as one address or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    One(String),
    Many(Vec<String>),
}

/// Message fields as the relays send them. `plain` only appears in the
/// legacy shape.
#[derive(Debug, Default, Deserialize)]
pub struct RawMessage {
    pub from: Option<String>,
    pub to: Option<Recipients>,
    pub subject: Option<String>,
    pub text: Option<String>,
    pub plain: Option<String>,
    pub html: Option<String>,
    #[serde(alias = "messageId")]
    pub message_id: Option<String>,
}

#[derive(Debug)]
pub enum InboundPayload {
    Enveloped(RawMessage),
    Legacy(RawMessage),
}

/// Canonical inbound message. `body` is plain text but not yet sanitized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedMessage {
    pub sender: String,
    pub recipients: Vec<String>,
    pub subject: Option<String>,
    pub body: String,
    pub message_id: Option<String>,
}

impl InboundPayload {
    pub fn parse(raw_body: &[u8]) -> Result<Self, PayloadError> {
        let value: Value = serde_json::from_slice(raw_body).map_err(PayloadError::InvalidJson)?;

        if value.get("type").and_then(Value::as_str) == Some(RECEIVED_EVENT) {
            let data = value.get("data").cloned().unwrap_or(Value::Null);
            let message = serde_json::from_value(data).map_err(PayloadError::InvalidShape)?;
            return Ok(InboundPayload::Enveloped(message));
        }

        let message = serde_json::from_value(value).map_err(PayloadError::InvalidShape)?;
        Ok(InboundPayload::Legacy(message))
    }

    pub fn into_message(self) -> RawMessage {
        match self {
            InboundPayload::Enveloped(message) | InboundPayload::Legacy(message) => message,
        }
    }
}

impl RawMessage {
    /// Validates `from`/`to` and selects the body: `text`, then `plain`, then
    /// `html` reduced to plain text. Blank fields count as absent, except
    /// recipients, which fail only when every entry is blank.
    pub fn normalize(self) -> Result<NormalizedMessage, PayloadError> {
        let sender = non_blank(self.from).ok_or(PayloadError::MissingFields)?;

        let recipients: Vec<String> = match self.to {
            Some(Recipients::One(address)) => vec![address],
            Some(Recipients::Many(addresses)) => addresses,
            None => Vec::new(),
        }
        .into_iter()
        .map(|address| address.trim().to_string())
        .collect();
        // Blank entries stay so results line up with the relay's list.
        if recipients.iter().all(|address| address.is_empty()) {
            return Err(PayloadError::MissingFields);
        }

        let body = non_blank(self.text)
            .or_else(|| non_blank(self.plain))
            .or_else(|| non_blank(self.html).map(|html| to_plain_text(&html)))
            .unwrap_or_default();

        Ok(NormalizedMessage {
            sender,
            recipients,
            subject: non_blank(self.subject),
            body,
            message_id: non_blank(self.message_id),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parses a relay body in any supported shape into a `NormalizedMessage`.
pub fn normalize(raw_body: &[u8]) -> Result<NormalizedMessage, PayloadError> {
    InboundPayload::parse(raw_body)?.into_message().normalize()
}
