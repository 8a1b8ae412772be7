use async_trait::async_trait;
use courier_channels::{
    Connection, DispatchError, Dispatcher, PlatformSender, RichContent, SenderSet,
};
use courier_core::config::schema::TypingConfig;
use courier_core::history::MemoryDeliveryLog;
use courier_core::queue::Registry;
use courier_core::reply::{ConversationId, Platform, ReplyGroup, SendingItem};
use courier_core::Error;
use courier_scheduler::{Courier, Scheduler, SchedulerOptions};
use parking_lot::Mutex;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{advance, Instant};

#[derive(Debug, Clone, PartialEq)]
enum Sent {
    Plain(String, String),
    Rich(String, String),
}

struct RecordingSender {
    platform: Platform,
    fail: bool,
    sent: Mutex<Vec<Sent>>,
}

impl RecordingSender {
    fn new(platform: Platform) -> Arc<Self> {
        Arc::new(Self {
            platform,
            fail: false,
            sent: Mutex::new(Vec::new()),
        })
    }

    fn failing(platform: Platform) -> Arc<Self> {
        Arc::new(Self {
            platform,
            fail: true,
            sent: Mutex::new(Vec::new()),
        })
    }

    fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl PlatformSender for RecordingSender {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn send_plain(
        &self,
        target: &ConversationId,
        text: &str,
        _reply_to: Option<&str>,
    ) -> courier_channels::Result<()> {
        if self.fail {
            return Err(DispatchError::Api("platform down".to_string()));
        }
        self.sent
            .lock()
            .push(Sent::Plain(target.to_string(), text.to_string()));
        Ok(())
    }

    async fn send_rich(
        &self,
        target: &ConversationId,
        content: &RichContent,
        _reply_to: Option<&str>,
    ) -> courier_channels::Result<()> {
        if self.fail {
            return Err(DispatchError::Api("platform down".to_string()));
        }
        self.sent
            .lock()
            .push(Sent::Rich(target.to_string(), content.filename.clone()));
        Ok(())
    }
}

struct Harness {
    courier: Courier,
    scheduler: Arc<Scheduler>,
    log: Arc<MemoryDeliveryLog>,
    sender: Arc<RecordingSender>,
}

fn harness_with(timeout_secs: u64, sender: Arc<RecordingSender>) -> Harness {
    let courier = Courier::new(
        Arc::new(Registry::new(100, Duration::from_secs(timeout_secs))),
        Arc::new(Dispatcher::new(
            Platform::Telegram,
            TypingConfig::default(),
            SenderSet::default(),
        )),
    );
    courier.set_connection(Connection::from_sender(sender.clone()));

    let log = Arc::new(MemoryDeliveryLog::new());
    let scheduler = Arc::new(Scheduler::new(
        &courier,
        log.clone(),
        SchedulerOptions::default(),
    ));

    Harness {
        courier,
        scheduler,
        log,
        sender,
    }
}

fn harness(timeout_secs: u64) -> Harness {
    harness_with(timeout_secs, RecordingSender::new(Platform::Telegram))
}

fn pending(h: &Harness, conversation: &str) -> usize {
    h.courier
        .registry()
        .get(&ConversationId::from(conversation))
        .map(|q| q.lock().len())
        .unwrap_or(0)
}

fn plain(conversation: &str, text: &str) -> Sent {
    Sent::Plain(conversation.to_string(), text.to_string())
}

#[tokio::test(start_paused = true)]
async fn resolved_reply_is_dispatched_on_next_tick() {
    let h = harness(20);
    let handle = h.courier.enqueue_thinking("1").unwrap();

    advance(Duration::from_secs(5)).await;
    let group = ReplyGroup::from_texts("1", Platform::Telegram, ["hi"]);
    assert!(h.courier.resolve(&handle, group).unwrap());

    advance(Duration::from_secs(1)).await;
    let start = Instant::now();
    h.scheduler.tick().await;

    assert!(start.elapsed() <= Duration::from_secs(10));
    assert_eq!(h.sender.sent(), vec![plain("1", "hi")]);
    assert_eq!(pending(&h, "1"), 0);
    assert_eq!(h.log.records()[0].text, "hi");
}

#[tokio::test(start_paused = true)]
async fn unresolved_thinking_is_discarded_after_timeout() {
    let h = harness(20);
    h.courier.enqueue_thinking("2").unwrap();

    advance(Duration::from_secs(10)).await;
    h.scheduler.tick().await;
    assert_eq!(pending(&h, "2"), 1);

    advance(Duration::from_secs(11)).await;
    h.scheduler.tick().await;

    assert_eq!(pending(&h, "2"), 0);
    assert!(h.sender.sent().is_empty());
    assert!(h.log.is_empty());
    assert_eq!(h.scheduler.stats().discarded.load(Ordering::Relaxed), 1);
}

#[tokio::test(start_paused = true)]
async fn overdue_items_are_flushed_oldest_first() {
    let h = harness(5);
    h.courier
        .enqueue(SendingItem::text("3", Platform::Telegram, "first"))
        .unwrap();
    advance(Duration::from_secs(1)).await;
    h.courier
        .enqueue(SendingItem::text("3", Platform::Telegram, "second"))
        .unwrap();

    advance(Duration::from_secs(9)).await;
    let queue = h
        .courier
        .registry()
        .get(&ConversationId::from("3"))
        .unwrap();
    let overdue: Vec<String> = queue
        .lock()
        .timed_out(Instant::now())
        .iter()
        .map(|i| i.text_content().to_string())
        .collect();
    assert_eq!(overdue, vec!["first", "second"]);

    h.scheduler.tick().await;

    assert_eq!(h.sender.sent(), vec![plain("3", "first"), plain("3", "second")]);
    assert_eq!(pending(&h, "3"), 0);
    let logged: Vec<String> = h.log.records().into_iter().map(|r| r.text).collect();
    assert_eq!(logged, vec!["first", "second"]);
}

#[tokio::test(start_paused = true)]
async fn item_overdue_and_earliest_is_sent_once() {
    let h = harness(5);
    h.courier
        .enqueue(SendingItem::text("4", Platform::Telegram, "only"))
        .unwrap();

    advance(Duration::from_secs(30)).await;
    h.scheduler.tick().await;
    h.scheduler.tick().await;

    assert_eq!(h.sender.sent(), vec![plain("4", "only")]);
    assert_eq!(h.log.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn one_item_per_conversation_per_tick() {
    let h = harness(20);
    let group = ReplyGroup::from_texts("5", Platform::Telegram, ["a", "b"]);
    h.courier.enqueue(group).unwrap();

    h.scheduler.tick().await;
    assert_eq!(h.sender.sent(), vec![plain("5", "a")]);
    assert_eq!(pending(&h, "5"), 1);

    h.scheduler.tick().await;
    assert_eq!(h.sender.sent(), vec![plain("5", "a"), plain("5", "b")]);
}

#[tokio::test(start_paused = true)]
async fn thinking_blocks_later_replies_until_resolved() {
    let h = harness(20);
    let handle = h.courier.enqueue_thinking("6").unwrap();
    advance(Duration::from_secs(1)).await;
    h.courier
        .enqueue(SendingItem::text("6", Platform::Telegram, "later"))
        .unwrap();

    h.scheduler.tick().await;
    assert!(h.sender.sent().is_empty());

    let group = ReplyGroup::from_texts("6", Platform::Telegram, ["answer"]);
    h.courier.resolve(&handle, group).unwrap();
    h.scheduler.tick().await;
    h.scheduler.tick().await;

    assert_eq!(h.sender.sent(), vec![plain("6", "answer"), plain("6", "later")]);
}

#[tokio::test(start_paused = true)]
async fn conversations_are_served_concurrently() {
    let h = harness(20);
    for conversation in ["a", "b", "c"] {
        h.courier
            .enqueue(SendingItem::text(conversation, Platform::Telegram, "hello"))
            .unwrap();
    }

    let start = Instant::now();
    h.scheduler.tick().await;

    // Typing delays overlap instead of adding up
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(h.sender.sent().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn special_items_use_rich_send_and_masked_log() {
    let temp = tempfile::TempDir::new().unwrap();
    let file = temp.path().join("happy.png");
    std::fs::write(&file, b"png").unwrap();

    let h = harness(20);
    let mut group = ReplyGroup::new("7", Platform::Telegram);
    group.push_special(&file, Some("happy".to_string()));
    h.courier.enqueue(group).unwrap();

    h.scheduler.tick().await;

    assert_eq!(
        h.sender.sent(),
        vec![Sent::Rich("7".to_string(), "happy.png".to_string())]
    );
    assert_eq!(h.log.records()[0].text, "[sticker]");
}

#[tokio::test(start_paused = true)]
async fn special_item_for_other_platform_goes_out_as_text() {
    let h = harness(20);
    let item = SendingItem::from_legacy(
        "8",
        Platform::OneBot,
        "[CQ:image,file=/emoji/a.jpg]",
        true,
    );
    h.courier.enqueue(item).unwrap();

    h.scheduler.tick().await;

    assert_eq!(h.sender.sent(), vec![plain("8", "[CQ:image,file=/emoji/a.jpg]")]);
}

#[tokio::test(start_paused = true)]
async fn failed_delivery_is_removed_and_not_logged() {
    let h = harness_with(20, RecordingSender::failing(Platform::Telegram));
    h.courier
        .enqueue(SendingItem::text("9", Platform::Telegram, "lost"))
        .unwrap();

    h.scheduler.tick().await;

    assert_eq!(pending(&h, "9"), 0);
    assert!(h.log.is_empty());
    assert_eq!(h.scheduler.stats().failed.load(Ordering::Relaxed), 1);
}

#[tokio::test(start_paused = true)]
async fn overflow_is_reported_to_the_producer() {
    let courier = Courier::new(
        Arc::new(Registry::new(2, Duration::from_secs(20))),
        Arc::new(Dispatcher::new(
            Platform::Telegram,
            TypingConfig::default(),
            SenderSet::default(),
        )),
    );

    let handle = courier.enqueue_thinking("10").unwrap();
    let group = ReplyGroup::from_texts("10", Platform::Telegram, ["a", "b", "c"]);
    assert!(matches!(
        courier.resolve(&handle, group),
        Err(Error::QueueFull { max_size: 2, .. })
    ));

    // The placeholder survives a rejected resolve
    let group = ReplyGroup::from_texts("10", Platform::Telegram, ["a", "b"]);
    assert!(courier.resolve(&handle, group).unwrap());
}

#[tokio::test(start_paused = true)]
async fn start_and_stop_the_loop() {
    let h = harness(20);
    assert!(!h.scheduler.is_running());

    h.scheduler.start();
    assert!(h.scheduler.is_running());
    h.courier
        .enqueue(SendingItem::text("11", Platform::Telegram, "tick"))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(h.sender.sent(), vec![plain("11", "tick")]);

    h.scheduler.stop().await;
    assert!(!h.scheduler.is_running());

    let status = h.scheduler.status();
    assert_eq!(status["running"], false);
    assert_eq!(status["sent"], 1);
    assert_eq!(status["platform"], "telegram");
    assert_eq!(status["connected"], "telegram");
}

#[tokio::test(start_paused = true)]
async fn producers_are_not_blocked_by_an_inflight_tick() {
    let h = harness(20);
    let long = "x".repeat(500);
    h.courier
        .enqueue(SendingItem::text("12", Platform::Telegram, long.clone()))
        .unwrap();

    let scheduler = h.scheduler.clone();
    let tick = tokio::spawn(async move { scheduler.tick().await });

    // The tick is now inside its 10s typing delay
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!tick.is_finished());
    assert!(h.sender.sent().is_empty());

    let same = h.courier.enqueue_thinking("12").unwrap();
    h.courier.enqueue_thinking("13").unwrap();
    assert_eq!(pending(&h, "12"), 2);
    assert!(h.courier.abandon(&same));

    tick.await.unwrap();

    assert_eq!(h.sender.sent(), vec![plain("12", &long)]);
    assert_eq!(pending(&h, "12"), 0);
    assert_eq!(pending(&h, "13"), 1);
    assert_eq!(h.log.len(), 1);
}
