//! Multi-bubble reply groups and the content lookup seam

use async_trait::async_trait;
use std::path::PathBuf;

use super::item::SendingItem;
use super::types::{ConversationId, Platform};
use crate::inbound::InboundMessage;

/// A file-backed piece of content found for a description
#[derive(Debug, Clone, PartialEq)]
pub struct ContentMatch {
    /// Local file holding the content
    pub path: PathBuf,
    /// Human-readable description, used as caption
    pub caption: String,
}

/// Looks up special content (stickers, images) matching a description.
///
/// Implementations are external; the scheduling core only consumes the result.
#[async_trait]
pub trait ContentLookup: Send + Sync {
    async fn lookup(&self, description: &str) -> Option<ContentMatch>;
}

/// Ordered replies produced by one generation turn
///
/// Each member becomes an independent queue item once enqueued.
#[derive(Debug, Clone)]
pub struct ReplyGroup {
    conversation_id: ConversationId,
    platform: Platform,
    reply_to: Option<String>,
    items: Vec<SendingItem>,
}

impl ReplyGroup {
    /// Create an empty group for a conversation
    pub fn new(conversation_id: impl Into<ConversationId>, platform: Platform) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            platform,
            reply_to: None,
            items: Vec::new(),
        }
    }

    /// Create a group answering an inbound message; the first bubble quotes it
    pub fn replying_to(inbound: &InboundMessage) -> Self {
        Self {
            conversation_id: inbound.conversation_id.clone(),
            platform: inbound.platform,
            reply_to: Some(inbound.message_id.clone()),
            items: Vec::new(),
        }
    }

    /// Quote `message_id` with the first bubble pushed afterwards
    pub fn with_reply_to(mut self, message_id: impl Into<String>) -> Self {
        self.reply_to = Some(message_id.into());
        self
    }

    /// Create a group from pre-split text bubbles
    pub fn from_texts<I, S>(
        conversation_id: impl Into<ConversationId>,
        platform: Platform,
        texts: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut group = Self::new(conversation_id, platform);
        for text in texts {
            group.push_text(text);
        }
        group
    }

    fn push(&mut self, mut item: SendingItem) -> &mut Self {
        if self.items.is_empty() {
            if let Some(reply_to) = &self.reply_to {
                item = item.reply_to(reply_to.clone());
            }
        }
        self.items.push(item);
        self
    }

    /// Append a text bubble
    pub fn push_text(&mut self, text: impl Into<String>) -> &mut Self {
        let item = SendingItem::text(self.conversation_id.clone(), self.platform, text);
        self.push(item)
    }

    /// Append a file-backed bubble
    pub fn push_special(
        &mut self,
        content_ref: impl Into<PathBuf>,
        caption: Option<String>,
    ) -> &mut Self {
        let mut item = SendingItem::special(self.conversation_id.clone(), self.platform, content_ref);
        if let Some(caption) = caption {
            item = item.with_caption(caption);
        }
        self.push(item)
    }

    /// Append a bubble from a producer that encodes files as `file=<path>` tokens
    pub fn push_legacy(&mut self, text: impl Into<String>, is_special: bool) -> &mut Self {
        let item =
            SendingItem::from_legacy(self.conversation_id.clone(), self.platform, text, is_special);
        self.push(item)
    }

    /// Ask `lookup` for content matching `description` and append it when found.
    ///
    /// Returns whether a bubble was added.
    pub async fn attach_lookup(&mut self, lookup: &dyn ContentLookup, description: &str) -> bool {
        match lookup.lookup(description).await {
            Some(found) => {
                self.push_special(found.path, Some(found.caption));
                true
            }
            None => {
                tracing::debug!("No content found for description: {}", description);
                false
            }
        }
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[SendingItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<SendingItem> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLookup(Option<ContentMatch>);

    #[async_trait]
    impl ContentLookup for FixedLookup {
        async fn lookup(&self, _description: &str) -> Option<ContentMatch> {
            self.0.clone()
        }
    }

    #[test]
    fn test_from_texts_preserves_order() {
        let group = ReplyGroup::from_texts("7", Platform::Telegram, ["one", "two", "three"]);
        let texts: Vec<&str> = group.items().iter().map(|i| i.text_content()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        assert!(group.items().iter().all(|i| i.conversation_id().as_str() == "7"));
    }

    #[test]
    fn test_replying_to_quotes_only_first_bubble() {
        let inbound = InboundMessage::new(Platform::Discord, "chan", "user", "m-1", "hey");
        let mut group = ReplyGroup::replying_to(&inbound);
        group.push_text("first").push_text("second");

        assert_eq!(group.items()[0].reply_to_id(), Some("m-1"));
        assert_eq!(group.items()[1].reply_to_id(), None);
        assert_eq!(group.items()[0].platform(), Platform::Discord);
    }

    #[tokio::test]
    async fn test_attach_lookup() {
        let mut group = ReplyGroup::new("1", Platform::Telegram);
        let hit = FixedLookup(Some(ContentMatch {
            path: PathBuf::from("/emoji/happy.png"),
            caption: "a happy cat".to_string(),
        }));
        assert!(group.attach_lookup(&hit, "happy").await);
        assert!(!group.attach_lookup(&FixedLookup(None), "sad").await);

        assert_eq!(group.len(), 1);
        let item = &group.items()[0];
        assert!(item.is_special());
        assert_eq!(item.caption(), Some("a happy cat"));
    }
}
