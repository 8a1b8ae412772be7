//! Normalized inbound message produced by platform adapters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reply::{ConversationId, Platform};

/// Message received from a chat platform, already normalized
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Source platform
    pub platform: Platform,
    /// Conversation the message belongs to
    pub conversation_id: ConversationId,
    /// Sender identifier
    pub user_id: String,
    /// Platform message identifier
    pub message_id: String,
    /// Plain text content
    pub text: String,
    /// Message this one replies to, if any
    #[serde(default)]
    pub reply_to: Option<String>,
    /// Receive timestamp
    pub timestamp: DateTime<Utc>,
}

impl InboundMessage {
    /// Create a new inbound message
    pub fn new(
        platform: Platform,
        conversation_id: impl Into<ConversationId>,
        user_id: impl Into<String>,
        message_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            conversation_id: conversation_id.into(),
            user_id: user_id.into(),
            message_id: message_id.into(),
            text: text.into(),
            reply_to: None,
            timestamp: Utc::now(),
        }
    }

    /// Set the replied-to message ID
    pub fn with_reply_to(mut self, message_id: impl Into<String>) -> Self {
        self.reply_to = Some(message_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_roundtrips_without_reply_to() {
        let raw = r#"{
            "platform": "telegram",
            "conversation_id": "-1001",
            "user_id": "42",
            "message_id": "7",
            "text": "hello",
            "timestamp": "2026-01-01T00:00:00Z"
        }"#;
        let msg: InboundMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.platform, Platform::Telegram);
        assert_eq!(msg.conversation_id.as_str(), "-1001");
        assert!(msg.reply_to.is_none());
    }
}
