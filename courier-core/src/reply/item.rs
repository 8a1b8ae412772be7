//! Queued reply items

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;

use super::types::{ConversationId, ItemId, Platform};
use crate::locator;

/// Placeholder for a reply that is still being generated
#[derive(Debug, Clone)]
pub struct ThinkingItem {
    id: ItemId,
    conversation_id: ConversationId,
    created_at: Instant,
    thinking_time: Duration,
}

impl ThinkingItem {
    /// Create a placeholder stamped with the current time
    pub fn new(conversation_id: impl Into<ConversationId>) -> Self {
        Self {
            id: ItemId::next(),
            conversation_id: conversation_id.into(),
            created_at: Instant::now(),
            thinking_time: Duration::ZERO,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Elapsed thinking time as of the last update
    pub fn thinking_time(&self) -> Duration {
        self.thinking_time
    }

    /// Recompute elapsed thinking time; never moves backwards
    pub fn update_thinking_time(&mut self, now: Instant) -> Duration {
        let elapsed = now.saturating_duration_since(self.created_at);
        if elapsed > self.thinking_time {
            self.thinking_time = elapsed;
        }
        self.thinking_time
    }
}

/// A finished reply waiting for delivery
#[derive(Debug, Clone)]
pub struct SendingItem {
    id: ItemId,
    conversation_id: ConversationId,
    platform: Platform,
    text: String,
    is_special: bool,
    content_ref: Option<PathBuf>,
    reply_to: Option<String>,
    caption: Option<String>,
    created_at: Instant,
}

impl SendingItem {
    /// Create a plain text reply
    pub fn text(
        conversation_id: impl Into<ConversationId>,
        platform: Platform,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: ItemId::next(),
            conversation_id: conversation_id.into(),
            platform,
            text: text.into(),
            is_special: false,
            content_ref: None,
            reply_to: None,
            caption: None,
            created_at: Instant::now(),
        }
    }

    /// Create a reply carrying a locally stored file (a sticker, an image)
    pub fn special(
        conversation_id: impl Into<ConversationId>,
        platform: Platform,
        content_ref: impl Into<PathBuf>,
    ) -> Self {
        let content_ref = content_ref.into();
        let mut item = Self::text(conversation_id, platform, content_ref.display().to_string());
        item.is_special = true;
        item.content_ref = Some(content_ref);
        item
    }

    /// Build an item from a producer that still embeds `file=<path>` locators in text.
    ///
    /// The locator is lifted into the structured content reference when present;
    /// special text without one is delivered as plain text.
    pub fn from_legacy(
        conversation_id: impl Into<ConversationId>,
        platform: Platform,
        text: impl Into<String>,
        is_special: bool,
    ) -> Self {
        let text = text.into();
        let content_ref = if is_special {
            locator::extract_file_locator(&text)
        } else {
            None
        };
        let mut item = Self::text(conversation_id, platform, text);
        item.is_special = is_special;
        item.content_ref = content_ref;
        item
    }

    /// Set the message this reply answers
    pub fn reply_to(mut self, message_id: impl Into<String>) -> Self {
        self.reply_to = Some(message_id.into());
        self
    }

    /// Set the caption shown under special content
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub(crate) fn inherit_created_at(&mut self, created_at: Instant) {
        self.created_at = created_at;
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn text_content(&self) -> &str {
        &self.text
    }

    pub fn is_special(&self) -> bool {
        self.is_special
    }

    pub fn content_ref(&self) -> Option<&Path> {
        self.content_ref.as_deref()
    }

    pub fn reply_to_id(&self) -> Option<&str> {
        self.reply_to.as_deref()
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Time spent waiting since creation
    pub fn waited(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    /// Text recorded in the delivery log; special content is replaced by `label`
    pub fn display_text<'a>(&'a self, label: &'a str) -> &'a str {
        if self.is_special {
            label
        } else {
            &self.text
        }
    }
}

/// One unit of work in a conversation queue
#[derive(Debug, Clone)]
pub enum ReplyItem {
    Thinking(ThinkingItem),
    Sending(SendingItem),
}

impl ReplyItem {
    pub fn id(&self) -> ItemId {
        match self {
            ReplyItem::Thinking(t) => t.id(),
            ReplyItem::Sending(s) => s.id(),
        }
    }

    pub fn conversation_id(&self) -> &ConversationId {
        match self {
            ReplyItem::Thinking(t) => t.conversation_id(),
            ReplyItem::Sending(s) => s.conversation_id(),
        }
    }

    pub fn created_at(&self) -> Instant {
        match self {
            ReplyItem::Thinking(t) => t.created_at(),
            ReplyItem::Sending(s) => s.created_at(),
        }
    }

    pub fn is_thinking(&self) -> bool {
        matches!(self, ReplyItem::Thinking(_))
    }
}

impl From<ThinkingItem> for ReplyItem {
    fn from(item: ThinkingItem) -> Self {
        ReplyItem::Thinking(item)
    }
}

impl From<SendingItem> for ReplyItem {
    fn from(item: SendingItem) -> Self {
        ReplyItem::Sending(item)
    }
}
