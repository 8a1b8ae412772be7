//! Fixed-interval scheduler draining conversation queues

use courier_channels::{DispatchError, Dispatcher};
use courier_core::config::SchedulerConfig;
use courier_core::history::{DeliveryLog, DeliveryRecord};
use courier_core::queue::{Registry, SharedQueue};
use courier_core::reply::{ConversationId, ReplyItem, SendingItem};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::context::Courier;

/// Scheduler tuning
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub tick_interval: Duration,
    /// Label recorded in the delivery log instead of special content
    pub special_content_label: String,
}

impl SchedulerOptions {
    pub fn from_config(config: &SchedulerConfig, special_content_label: impl Into<String>) -> Self {
        Self {
            tick_interval: config.tick_interval(),
            special_content_label: special_content_label.into(),
        }
    }
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            special_content_label: "[sticker]".to_string(),
        }
    }
}

/// Counters since startup
#[derive(Debug, Default)]
pub struct SchedulerStats {
    pub ticks: AtomicU64,
    pub sent: AtomicU64,
    pub failed: AtomicU64,
    pub discarded: AtomicU64,
}

/// What the earliest-item pass decided for one conversation
enum Step {
    Idle,
    Discarded,
    Send(SendingItem),
}

/// Advances every conversation queue by one item per tick
///
/// Per tick and conversation: the earliest item is inspected (expired
/// Thinking placeholders are discarded, Sending items dispatched), then
/// every other Sending item older than the thinking timeout is flushed.
/// Items are removed whether or not delivery succeeded.
pub struct Scheduler {
    registry: Arc<Registry>,
    dispatcher: Arc<Dispatcher>,
    delivery_log: Arc<dyn DeliveryLog>,
    options: SchedulerOptions,
    stats: SchedulerStats,
    cancel: Mutex<Option<CancellationToken>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(
        courier: &Courier,
        delivery_log: Arc<dyn DeliveryLog>,
        options: SchedulerOptions,
    ) -> Self {
        Self {
            registry: courier.registry().clone(),
            dispatcher: courier.dispatcher().clone(),
            delivery_log,
            options,
            stats: SchedulerStats::default(),
            cancel: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// Start the tick loop on the current runtime
    pub fn start(self: &Arc<Self>) {
        let mut cancel_guard = self.cancel.lock();
        if cancel_guard.as_ref().is_some_and(|t| !t.is_cancelled()) {
            debug!("Scheduler already running");
            return;
        }

        let token = CancellationToken::new();
        *cancel_guard = Some(token.clone());
        drop(cancel_guard);

        let scheduler = Arc::clone(self);
        let interval = self.options.tick_interval;
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => scheduler.tick().await,
                }
            }
            debug!("Scheduler loop exited");
        });

        *self.task.lock() = Some(task);
        info!("Scheduler started (every {:?})", interval);
    }

    /// Stop the tick loop; an in-flight tick is allowed to finish
    pub async fn stop(&self) {
        if let Some(token) = self.cancel.lock().take() {
            token.cancel();
        }

        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!("Scheduler task ended abnormally: {}", e);
            }
            info!("Scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.cancel
            .lock()
            .as_ref()
            .is_some_and(|t| !t.is_cancelled())
    }

    /// Run one pass over every registered conversation
    pub async fn tick(&self) {
        let now = Instant::now();
        self.stats.ticks.fetch_add(1, Ordering::Relaxed);

        let work = self
            .registry
            .snapshot()
            .into_iter()
            .map(|(conversation_id, queue)| self.tick_conversation(conversation_id, queue, now));
        futures::future::join_all(work).await;
    }

    async fn tick_conversation(&self, conversation_id: ConversationId, queue: SharedQueue, now: Instant) {
        let (step, expired) = {
            let mut queue = queue.lock();

            let step = match queue.earliest().cloned() {
                None => Step::Idle,
                Some(ReplyItem::Thinking(thinking)) => {
                    queue.touch_thinking(thinking.id(), now);
                    let expired = matches!(
                        queue.get(thinking.id()),
                        Some(ReplyItem::Thinking(touched)) if queue.is_expired(touched)
                    );
                    if expired {
                        queue.remove(thinking.id());
                        Step::Discarded
                    } else {
                        Step::Idle
                    }
                }
                Some(ReplyItem::Sending(item)) => Step::Send(item),
            };

            let handled = match &step {
                Step::Send(item) => Some(item.id()),
                _ => None,
            };
            let expired: Vec<SendingItem> = queue
                .timed_out(now)
                .into_iter()
                .filter(|item| Some(item.id()) != handled)
                .collect();

            (step, expired)
        };

        match step {
            Step::Idle => {}
            Step::Discarded => {
                self.stats.discarded.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Reply generation in conversation {} exceeded {:?}, discarding",
                    conversation_id,
                    self.registry.thinking_timeout()
                );
            }
            Step::Send(item) => self.send_and_remove(&queue, item).await,
        }

        if !expired.is_empty() {
            info!(
                "Flushing {} overdue replies in conversation {}",
                expired.len(),
                conversation_id
            );
        }
        for item in expired {
            self.send_and_remove(&queue, item).await;
        }
    }

    async fn send_and_remove(&self, queue: &SharedQueue, item: SendingItem) {
        let result = self.dispatch(&item).await;
        queue.lock().remove(item.id());

        match result {
            Ok(()) => {
                self.stats.sent.fetch_add(1, Ordering::Relaxed);
                let record = DeliveryRecord::new(
                    item.conversation_id().clone(),
                    item.platform(),
                    item.display_text(&self.options.special_content_label),
                );
                if let Err(e) = self.delivery_log.append(record).await {
                    warn!("Failed to record delivery: {}", e);
                }
            }
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    "Delivery of {} to conversation {} failed: {}",
                    item.id(),
                    item.conversation_id(),
                    e
                );
            }
        }
    }

    async fn dispatch(&self, item: &SendingItem) -> Result<(), DispatchError> {
        let conversation_id = item.conversation_id();
        match item.content_ref() {
            Some(path)
                if item.is_special()
                    && self.dispatcher.active_platform() == Some(item.platform()) =>
            {
                self.dispatcher
                    .deliver_special(conversation_id, path, item.caption(), item.reply_to_id())
                    .await
            }
            _ => {
                self.dispatcher
                    .deliver(conversation_id, item.text_content(), item.reply_to_id())
                    .await
            }
        }
    }

    /// Service status as JSON
    pub fn status(&self) -> serde_json::Value {
        let pending: serde_json::Map<String, serde_json::Value> = self
            .registry
            .pending_counts()
            .into_iter()
            .map(|(id, n)| (id.to_string(), serde_json::json!(n)))
            .collect();

        serde_json::json!({
            "running": self.is_running(),
            "tick_interval_ms": self.options.tick_interval.as_millis() as u64,
            "thinking_timeout_secs": self.registry.thinking_timeout().as_secs(),
            "platform": self.dispatcher.platform().as_str(),
            "connected": self.dispatcher.active_platform().map(|p| p.as_str()),
            "conversations": self.registry.len(),
            "pending": pending,
            "ticks": self.stats.ticks.load(Ordering::Relaxed),
            "sent": self.stats.sent.load(Ordering::Relaxed),
            "failed": self.stats.failed.load(Ordering::Relaxed),
            "discarded": self.stats.discarded.load(Ordering::Relaxed),
        })
    }
}
