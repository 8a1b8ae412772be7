//! Write-only log of delivered replies

pub mod jsonl;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reply::{ConversationId, Platform};

pub use jsonl::JsonlDeliveryLog;
pub use memory::MemoryDeliveryLog;

/// A reply that reached the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub conversation_id: ConversationId,
    pub platform: Platform,
    /// Text as shown in history; special content is replaced by a label
    pub text: String,
    pub delivered_at: DateTime<Utc>,
}

impl DeliveryRecord {
    pub fn new(conversation_id: ConversationId, platform: Platform, text: impl Into<String>) -> Self {
        Self {
            conversation_id,
            platform,
            text: text.into(),
            delivered_at: Utc::now(),
        }
    }
}

/// Sink for delivery records
#[async_trait]
pub trait DeliveryLog: Send + Sync {
    /// Append one record
    async fn append(&self, record: DeliveryRecord) -> crate::Result<()>;
}
