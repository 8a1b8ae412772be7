//! The producer-facing context: registry plus dispatcher

use courier_channels::{Connection, Dispatcher, SenderSet};
use courier_core::config::Config;
use courier_core::queue::{QueueEntry, Registry, ReplyHandle};
use courier_core::reply::{ConversationId, ItemId, ReplyGroup, ThinkingItem};
use courier_core::{Error, Result};
use std::sync::Arc;

/// Shared state built once at startup and handed to producers and the scheduler
pub struct Courier {
    registry: Arc<Registry>,
    dispatcher: Arc<Dispatcher>,
}

impl Courier {
    pub fn new(registry: Arc<Registry>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            registry,
            dispatcher,
        }
    }

    /// Build the registry and dispatcher from config
    pub fn from_config(config: &Config, senders: SenderSet) -> Result<Self> {
        let registry = Registry::from_config(&config.scheduler);
        let dispatcher = Dispatcher::from_config(&config.dispatch, senders)?;
        Ok(Self::new(Arc::new(registry), Arc::new(dispatcher)))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Reserve a slot for a reply that is about to be generated
    pub fn enqueue_thinking(&self, conversation_id: impl Into<ConversationId>) -> Result<ReplyHandle> {
        let conversation_id = conversation_id.into();
        let thinking = ThinkingItem::new(conversation_id.clone());
        let item_id = thinking.id();

        self.registry
            .get_or_create(&conversation_id)
            .lock()
            .add(thinking)?;
        tracing::debug!("Thinking {} queued for conversation {}", item_id, conversation_id);

        Ok(ReplyHandle {
            conversation_id,
            item_id,
        })
    }

    /// Replace a Thinking placeholder with finished replies.
    ///
    /// Returns `Ok(false)` when the placeholder no longer exists, for example
    /// after it timed out.
    pub fn resolve(&self, handle: &ReplyHandle, group: ReplyGroup) -> Result<bool> {
        if group.conversation_id() != &handle.conversation_id {
            return Err(Error::Validation(format!(
                "reply group for conversation {} cannot resolve a handle of conversation {}",
                group.conversation_id(),
                handle.conversation_id
            )));
        }

        let Some(queue) = self.registry.get(&handle.conversation_id) else {
            return Ok(false);
        };
        let resolved = queue.lock().resolve(handle.item_id, group)?;
        if !resolved {
            tracing::info!(
                "Thinking {} in conversation {} is gone, dropping late reply",
                handle.item_id,
                handle.conversation_id
            );
        }
        Ok(resolved)
    }

    /// Drop a Thinking placeholder whose generation was cancelled
    pub fn abandon(&self, handle: &ReplyHandle) -> bool {
        self.registry
            .get(&handle.conversation_id)
            .map(|queue| queue.lock().remove(handle.item_id))
            .unwrap_or(false)
    }

    /// Queue finished items directly, without a Thinking precursor
    pub fn enqueue(&self, entry: impl Into<QueueEntry>) -> Result<Vec<ItemId>> {
        let entry = entry.into();
        let conversation_id = entry.conversation_id().clone();
        self.registry.get_or_create(&conversation_id).lock().add(entry)
    }

    /// Install the active platform connection
    pub fn set_connection(&self, connection: Connection) {
        self.dispatcher.set_connection(connection);
    }
}
