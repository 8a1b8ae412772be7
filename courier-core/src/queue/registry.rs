//! Process-wide map of conversation queues

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::conversation::ConversationQueue;
use crate::config::SchedulerConfig;
use crate::reply::{ConversationId, ItemId};

/// Shared handle to one conversation's queue
pub type SharedQueue = Arc<Mutex<ConversationQueue>>;

/// Identifies a queued item from outside the queue
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReplyHandle {
    pub conversation_id: ConversationId,
    pub item_id: ItemId,
}

/// One queue per conversation, created lazily on first use
///
/// Each queue has its own lock; the map lock is only held to look up or
/// insert an entry.
#[derive(Debug)]
pub struct Registry {
    max_queue_size: usize,
    thinking_timeout: Duration,
    queues: RwLock<HashMap<ConversationId, SharedQueue>>,
}

impl Registry {
    pub fn new(max_queue_size: usize, thinking_timeout: Duration) -> Self {
        Self {
            max_queue_size,
            thinking_timeout,
            queues: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(config.max_queue_size, config.thinking_timeout())
    }

    pub fn thinking_timeout(&self) -> Duration {
        self.thinking_timeout
    }

    /// Get the queue for a conversation, creating it if needed
    pub fn get_or_create(&self, conversation_id: &ConversationId) -> SharedQueue {
        if let Some(queue) = self.queues.read().get(conversation_id) {
            return queue.clone();
        }

        let mut queues = self.queues.write();
        queues
            .entry(conversation_id.clone())
            .or_insert_with(|| {
                tracing::debug!("Creating queue for conversation {}", conversation_id);
                Arc::new(Mutex::new(ConversationQueue::new(
                    conversation_id.clone(),
                    self.max_queue_size,
                    self.thinking_timeout,
                )))
            })
            .clone()
    }

    /// Get the queue for a conversation if one exists
    pub fn get(&self, conversation_id: &ConversationId) -> Option<SharedQueue> {
        self.queues.read().get(conversation_id).cloned()
    }

    /// Snapshot of all registered queues
    pub fn snapshot(&self) -> Vec<(ConversationId, SharedQueue)> {
        self.queues
            .read()
            .iter()
            .map(|(id, queue)| (id.clone(), queue.clone()))
            .collect()
    }

    /// Number of registered conversations
    pub fn len(&self) -> usize {
        self.queues.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.read().is_empty()
    }

    /// Pending item count per conversation
    pub fn pending_counts(&self) -> HashMap<ConversationId, usize> {
        self.snapshot()
            .into_iter()
            .map(|(id, queue)| {
                let len = queue.lock().len();
                (id, len)
            })
            .collect()
    }
}
