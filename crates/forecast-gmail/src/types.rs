//! Gmail API request and response bodies.

use serde::{Deserialize, Serialize};

/// Body of `users.messages.send`: the whole RFC 822 message, URL-safe base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendEnvelope {
    pub raw: String,
}

/// Gmail's answer to a successful send.
///
/// Only used for logging, so every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub label_ids: Vec<String>,
}
