//! Inbound diagnostic channel from the remote context

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Message kind the remote console forwarder uses
pub const CONSOLE: &str = "Console";

/// Message kind the bootstrap uses to report fatal problems
pub const ERROR: &str = "Error";

/// `{type, data}` wrapper the bootstrap and console forwarder post
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,

    #[serde(default)]
    data: Value,
}

/// A message posted by the remote context.
///
/// Typed messages carry `kind` and their `data` field; anything else the
/// page posts arrives untyped with the whole payload as `data`.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub kind: Option<String>,
    pub data: Value,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    fn new(kind: Option<String>, data: Value) -> Self {
        Self {
            kind,
            data,
            received_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    pub fn is_console(&self) -> bool {
        self.kind() == Some(CONSOLE)
    }

    pub fn is_error(&self) -> bool {
        self.kind() == Some(ERROR)
    }
}

/// Parse a raw payload; only text that is not JSON is dropped.
///
/// The channel is best-effort, so a bad payload is not an error.
pub fn parse_inbound(raw: &str) -> Option<InboundMessage> {
    let payload = match serde_json::from_str::<Value>(raw) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::trace!("Dropping malformed inbound message: {}", e);
            return None;
        }
    };
    Some(match serde_json::from_value::<Envelope>(payload.clone()) {
        Ok(envelope) => InboundMessage::new(Some(envelope.kind), envelope.data),
        Err(_) => InboundMessage::new(None, payload),
    })
}

/// Caller hook for messages that are not console output
pub type MessageHandler = Box<dyn FnMut(&InboundMessage)>;
