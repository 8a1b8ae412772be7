//! Pending reply items for a single conversation

use std::time::Duration;
use tokio::time::Instant;

use crate::reply::{ConversationId, ItemId, ReplyGroup, ReplyItem, SendingItem, ThinkingItem};
use crate::{Error, Result};

/// Anything that can be added to a conversation queue
#[derive(Debug, Clone)]
pub enum QueueEntry {
    Item(ReplyItem),
    Group(ReplyGroup),
}

impl QueueEntry {
    /// Conversation the entry belongs to
    pub fn conversation_id(&self) -> &ConversationId {
        match self {
            QueueEntry::Item(item) => item.conversation_id(),
            QueueEntry::Group(group) => group.conversation_id(),
        }
    }
}

impl From<ReplyItem> for QueueEntry {
    fn from(item: ReplyItem) -> Self {
        QueueEntry::Item(item)
    }
}

impl From<ThinkingItem> for QueueEntry {
    fn from(item: ThinkingItem) -> Self {
        QueueEntry::Item(item.into())
    }
}

impl From<SendingItem> for QueueEntry {
    fn from(item: SendingItem) -> Self {
        QueueEntry::Item(item.into())
    }
}

impl From<ReplyGroup> for QueueEntry {
    fn from(group: ReplyGroup) -> Self {
        QueueEntry::Group(group)
    }
}

/// Queued item plus its ordering key
#[derive(Debug, Clone)]
struct Slot {
    seq: u64,
    sub: u32,
    item: ReplyItem,
}

impl Slot {
    fn key(&self) -> (Instant, u64, u32) {
        (self.item.created_at(), self.seq, self.sub)
    }
}

/// Bounded collection of reply items for one conversation
///
/// Items are ordered by creation time, ties broken by insertion order.
/// Members of a resolved group share their placeholder's position.
#[derive(Debug)]
pub struct ConversationQueue {
    conversation_id: ConversationId,
    max_size: usize,
    thinking_timeout: Duration,
    next_seq: u64,
    slots: Vec<Slot>,
}

impl ConversationQueue {
    /// Create an empty queue
    pub fn new(
        conversation_id: impl Into<ConversationId>,
        max_size: usize,
        thinking_timeout: Duration,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            max_size,
            thinking_timeout,
            next_seq: 0,
            slots: Vec::new(),
        }
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn full_error(&self) -> Error {
        Error::QueueFull {
            conversation: self.conversation_id.to_string(),
            max_size: self.max_size,
        }
    }

    fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Add an item, or every member of a group in order.
    ///
    /// Groups are admitted all-or-nothing. Returns the IDs of the added items.
    pub fn add(&mut self, entry: impl Into<QueueEntry>) -> Result<Vec<ItemId>> {
        let items: Vec<ReplyItem> = match entry.into() {
            QueueEntry::Item(item) => vec![item],
            QueueEntry::Group(group) => {
                if group.is_empty() {
                    return Err(Error::Validation("reply group is empty".to_string()));
                }
                group.into_items().into_iter().map(ReplyItem::from).collect()
            }
        };

        if self.slots.len() + items.len() > self.max_size {
            return Err(self.full_error());
        }

        let seq = self.take_seq();
        let mut ids = Vec::with_capacity(items.len());
        for (sub, item) in items.into_iter().enumerate() {
            ids.push(item.id());
            self.slots.push(Slot {
                seq,
                sub: sub as u32,
                item,
            });
        }
        Ok(ids)
    }

    /// Item with the smallest creation time, Thinking and Sending alike
    pub fn earliest(&self) -> Option<&ReplyItem> {
        self.slots
            .iter()
            .min_by_key(|slot| slot.key())
            .map(|slot| &slot.item)
    }

    /// Sending items that have waited longer than the thinking timeout, oldest first
    pub fn timed_out(&self, now: Instant) -> Vec<SendingItem> {
        let mut expired: Vec<&Slot> = self
            .slots
            .iter()
            .filter(|slot| match &slot.item {
                ReplyItem::Sending(item) => item.waited(now) > self.thinking_timeout,
                ReplyItem::Thinking(_) => false,
            })
            .collect();
        expired.sort_by_key(|slot| slot.key());
        expired
            .into_iter()
            .filter_map(|slot| match &slot.item {
                ReplyItem::Sending(item) => Some(item.clone()),
                ReplyItem::Thinking(_) => None,
            })
            .collect()
    }

    /// Remove an item by ID; returns whether it was present
    pub fn remove(&mut self, id: ItemId) -> bool {
        match self.slots.iter().position(|slot| slot.item.id() == id) {
            Some(index) => {
                self.slots.remove(index);
                true
            }
            None => false,
        }
    }

    /// Look up an item by ID
    pub fn get(&self, id: ItemId) -> Option<&ReplyItem> {
        self.slots
            .iter()
            .find(|slot| slot.item.id() == id)
            .map(|slot| &slot.item)
    }

    /// Snapshot of all items in delivery order
    pub fn items(&self) -> Vec<ReplyItem> {
        let mut slots: Vec<&Slot> = self.slots.iter().collect();
        slots.sort_by_key(|slot| slot.key());
        slots.into_iter().map(|slot| slot.item.clone()).collect()
    }

    /// Recompute a Thinking item's elapsed time.
    ///
    /// Returns `None` if the ID is missing or not a Thinking item.
    pub fn touch_thinking(&mut self, id: ItemId, now: Instant) -> Option<Duration> {
        self.slots.iter_mut().find_map(|slot| match &mut slot.item {
            ReplyItem::Thinking(item) if item.id() == id => Some(item.update_thinking_time(now)),
            _ => None,
        })
    }

    /// Whether a Thinking item has exceeded the timeout
    pub fn is_expired(&self, item: &ThinkingItem) -> bool {
        item.thinking_time() > self.thinking_timeout
    }

    /// Replace a Thinking placeholder with the members of `group`.
    ///
    /// Members inherit the placeholder's creation time and position. Returns
    /// `Ok(false)` when the placeholder is gone (resolved, abandoned or expired).
    pub fn resolve(&mut self, id: ItemId, group: ReplyGroup) -> Result<bool> {
        if group.is_empty() {
            return Err(Error::Validation("reply group is empty".to_string()));
        }

        let Some(index) = self
            .slots
            .iter()
            .position(|slot| slot.item.id() == id && slot.item.is_thinking())
        else {
            return Ok(false);
        };

        if self.slots.len() - 1 + group.len() > self.max_size {
            return Err(self.full_error());
        }

        let placeholder = self.slots.remove(index);
        let created_at = placeholder.item.created_at();
        for (sub, mut item) in group.into_items().into_iter().enumerate() {
            item.inherit_created_at(created_at);
            self.slots.push(Slot {
                seq: placeholder.seq,
                sub: sub as u32,
                item: item.into(),
            });
        }
        Ok(true)
    }
}
