//! Platform-agnostic delivery with human typing cadence

use courier_core::config::schema::{DispatchConfig, TypingConfig};
use courier_core::reply::{ConversationId, Platform};
use courier_core::utils::typing_delay;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;

use crate::base::{DispatchError, PlatformSender, Result, RichContent, SenderPtr};
use crate::manager::SenderSet;

/// The live platform connection used for sends
#[derive(Clone)]
pub struct Connection {
    platform: Platform,
    sender: SenderPtr,
}

impl Connection {
    /// Wrap a sender, tagging it with the platform it reports
    pub fn from_sender(sender: SenderPtr) -> Self {
        Self {
            platform: sender.platform(),
            sender,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("platform", &self.platform)
            .finish()
    }
}

/// Routes sends to the active connection
///
/// Every send sleeps for a typing delay first. When the connection does not
/// belong to the configured platform, plain sends walk the fallback chain:
/// the connection's own sender, then every other known sender.
pub struct Dispatcher {
    platform: Platform,
    typing: TypingConfig,
    connection: RwLock<Option<Connection>>,
    fallbacks: SenderSet,
}

impl Dispatcher {
    pub fn new(platform: Platform, typing: TypingConfig, fallbacks: SenderSet) -> Self {
        Self {
            platform,
            typing,
            connection: RwLock::new(None),
            fallbacks,
        }
    }

    /// Create a dispatcher from the `dispatch` config section
    pub fn from_config(config: &DispatchConfig, fallbacks: SenderSet) -> courier_core::Result<Self> {
        let platform = config.platform.parse::<Platform>()?;
        Ok(Self::new(platform, config.typing.clone(), fallbacks))
    }

    /// Configured platform tag
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Install the active connection, replacing any previous one
    pub fn set_connection(&self, connection: Connection) {
        tracing::info!("Dispatcher connection set to {}", connection.platform());
        *self.connection.write() = Some(connection);
    }

    /// Currently installed connection
    pub fn connection(&self) -> Option<Connection> {
        self.connection.read().clone()
    }

    /// Platform of the active connection
    pub fn active_platform(&self) -> Option<Platform> {
        self.connection.read().as_ref().map(|c| c.platform())
    }

    fn require_connection(&self) -> Result<Connection> {
        self.connection().ok_or_else(|| {
            DispatchError::NotConfigured("no active connection; call set_connection first".to_string())
        })
    }

    async fn simulate_typing(&self, text: &str) {
        let delay = typing_delay(text, &self.typing);
        if !delay.is_zero() {
            tracing::debug!("Typing for {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }

    /// Send a text message after the typing delay
    pub async fn deliver(
        &self,
        conversation_id: &ConversationId,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<()> {
        let connection = self.require_connection()?;
        self.simulate_typing(text).await;

        if connection.platform == self.platform {
            return connection
                .sender
                .send_plain(conversation_id, text, reply_to)
                .await;
        }

        tracing::warn!(
            "Configured platform {} does not match connection {}, trying every sender",
            self.platform,
            connection.platform
        );

        let mut chain: Vec<SenderPtr> = vec![connection.sender.clone()];
        chain.extend(
            self.fallbacks
                .all()
                .iter()
                .filter(|s| !Arc::ptr_eq(s, &connection.sender))
                .cloned(),
        );

        let mut failures = Vec::new();
        for sender in chain {
            match sender.send_plain(conversation_id, text, reply_to).await {
                Ok(()) => {
                    tracing::info!("Delivered to {} via {}", conversation_id, sender.platform());
                    return Ok(());
                }
                Err(e) => {
                    tracing::error!("Send via {} failed: {}", sender.platform(), e);
                    failures.push(e);
                }
            }
        }

        Err(DispatchError::AllFailed(failures))
    }

    /// Send a file-backed message after the typing delay.
    ///
    /// The typing delay is computed from the caption, so an uncaptioned file
    /// goes out without one. Falls back to the platform's alternate rich form
    /// when the primary call fails. Requires the connection to match the
    /// configured platform.
    pub async fn deliver_special(
        &self,
        conversation_id: &ConversationId,
        content_ref: &Path,
        caption: Option<&str>,
        reply_to: Option<&str>,
    ) -> Result<()> {
        let connection = self.require_connection()?;
        if connection.platform != self.platform {
            return Err(DispatchError::PlatformMismatch {
                configured: self.platform,
                connected: connection.platform,
            });
        }

        self.simulate_typing(caption.unwrap_or_default()).await;
        let content = RichContent::load(content_ref, caption).await?;

        match connection
            .sender
            .send_rich(conversation_id, &content, reply_to)
            .await
        {
            Ok(()) => Ok(()),
            Err(primary) => {
                tracing::warn!(
                    "Rich send of {} failed, trying alternate form: {}",
                    content.filename,
                    primary
                );
                connection
                    .sender
                    .send_rich_alternate(conversation_id, &content, reply_to)
                    .await
                    .map_err(|alternate| DispatchError::AllFailed(vec![primary, alternate]))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Default)]
    struct Calls {
        plain: Vec<String>,
        rich: Vec<String>,
        alternate: Vec<String>,
    }

    struct MockSender {
        platform: Platform,
        fail_plain: bool,
        fail_rich: bool,
        calls: Mutex<Calls>,
    }

    impl MockSender {
        fn new(platform: Platform) -> Arc<Self> {
            Arc::new(Self {
                platform,
                fail_plain: false,
                fail_rich: false,
                calls: Mutex::new(Calls::default()),
            })
        }

        fn failing(platform: Platform) -> Arc<Self> {
            Arc::new(Self {
                platform,
                fail_plain: true,
                fail_rich: true,
                calls: Mutex::new(Calls::default()),
            })
        }
    }

    #[async_trait]
    impl PlatformSender for MockSender {
        fn platform(&self) -> Platform {
            self.platform
        }

        async fn send_plain(
            &self,
            _target: &ConversationId,
            text: &str,
            _reply_to: Option<&str>,
        ) -> Result<()> {
            self.calls.lock().plain.push(text.to_string());
            if self.fail_plain {
                Err(DispatchError::Api(format!("{} down", self.platform)))
            } else {
                Ok(())
            }
        }

        async fn send_rich(
            &self,
            _target: &ConversationId,
            content: &RichContent,
            _reply_to: Option<&str>,
        ) -> Result<()> {
            self.calls.lock().rich.push(content.filename.clone());
            if self.fail_rich {
                Err(DispatchError::Api("photo rejected".to_string()))
            } else {
                Ok(())
            }
        }

        async fn send_rich_alternate(
            &self,
            _target: &ConversationId,
            content: &RichContent,
            _reply_to: Option<&str>,
        ) -> Result<()> {
            self.calls.lock().alternate.push(content.filename.clone());
            Ok(())
        }
    }

    fn ptr(sender: &Arc<MockSender>) -> SenderPtr {
        sender.clone()
    }

    fn dispatcher(platform: Platform, fallbacks: Vec<SenderPtr>) -> Dispatcher {
        Dispatcher::new(platform, TypingConfig::default(), SenderSet::new(fallbacks))
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliver_without_connection() {
        let d = dispatcher(Platform::Telegram, vec![]);
        let err = d
            .deliver(&ConversationId::from("1"), "hi", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotConfigured(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliver_waits_typing_delay() {
        let sender = MockSender::new(Platform::Telegram);
        let d = dispatcher(Platform::Telegram, vec![]);
        d.set_connection(Connection::from_sender(sender.clone()));

        let start = Instant::now();
        d.deliver(&ConversationId::from("1"), "hello", None)
            .await
            .unwrap();
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(499) && waited <= Duration::from_millis(501));
        assert_eq!(sender.calls.lock().plain, vec!["hello"]);

        // Long text is capped
        let start = Instant::now();
        d.deliver(&ConversationId::from("1"), &"x".repeat(500), None)
            .await
            .unwrap();
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(10) && waited <= Duration::from_millis(10_001));
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_connection_wins() {
        let first = MockSender::new(Platform::Telegram);
        let second = MockSender::new(Platform::Telegram);
        let d = dispatcher(Platform::Telegram, vec![]);
        d.set_connection(Connection::from_sender(first.clone()));
        d.set_connection(Connection::from_sender(second.clone()));

        d.deliver(&ConversationId::from("1"), "hi", None).await.unwrap();
        assert!(first.calls.lock().plain.is_empty());
        assert_eq!(second.calls.lock().plain.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mismatch_walks_fallback_chain() {
        let discord = MockSender::failing(Platform::Discord);
        let onebot = MockSender::new(Platform::OneBot);
        let d = dispatcher(Platform::Telegram, vec![ptr(&discord), ptr(&onebot)]);
        d.set_connection(Connection::from_sender(discord.clone()));

        d.deliver(&ConversationId::from("1"), "hi", None).await.unwrap();
        // The connection's sender is tried once, not again from the fallback list
        assert_eq!(discord.calls.lock().plain.len(), 1);
        assert_eq!(onebot.calls.lock().plain.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mismatch_aggregates_failures() {
        let discord = MockSender::failing(Platform::Discord);
        let onebot = MockSender::failing(Platform::OneBot);
        let d = dispatcher(Platform::Telegram, vec![ptr(&onebot)]);
        d.set_connection(Connection::from_sender(discord.clone()));

        match d.deliver(&ConversationId::from("1"), "hi", None).await {
            Err(DispatchError::AllFailed(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected AllFailed, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliver_special_falls_back_to_alternate() {
        let temp = tempfile::TempDir::new().unwrap();
        let file = temp.path().join("wave.gif");
        std::fs::write(&file, b"gif").unwrap();

        let telegram = MockSender::failing(Platform::Telegram);
        let d = dispatcher(Platform::Telegram, vec![]);
        d.set_connection(Connection::from_sender(telegram.clone()));

        d.deliver_special(&ConversationId::from("1"), &file, Some("wave"), None)
            .await
            .unwrap();
        let calls = telegram.calls.lock();
        assert_eq!(calls.rich, vec!["wave.gif"]);
        assert_eq!(calls.alternate, vec!["wave.gif"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliver_special_delay_follows_caption() {
        let temp = tempfile::TempDir::new().unwrap();
        let file = temp.path().join("cat.png");
        std::fs::write(&file, b"png").unwrap();

        let telegram = MockSender::new(Platform::Telegram);
        let d = dispatcher(Platform::Telegram, vec![]);
        d.set_connection(Connection::from_sender(telegram.clone()));
        let target = ConversationId::from("1");

        let start = Instant::now();
        d.deliver_special(&target, &file, Some("a cat"), None)
            .await
            .unwrap();
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(499) && waited <= Duration::from_millis(501));

        let start = Instant::now();
        d.deliver_special(&target, &file, None, None).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(1));

        assert_eq!(telegram.calls.lock().rich, vec!["cat.png", "cat.png"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliver_special_requires_matching_platform() {
        let d = dispatcher(Platform::Telegram, vec![]);
        d.set_connection(Connection::from_sender(MockSender::new(Platform::Discord)));

        let err = d
            .deliver_special(&ConversationId::from("1"), Path::new("/none.png"), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::PlatformMismatch { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliver_special_missing_file() {
        let d = dispatcher(Platform::Telegram, vec![]);
        d.set_connection(Connection::from_sender(MockSender::new(Platform::Telegram)));

        let err = d
            .deliver_special(&ConversationId::from("1"), Path::new("/no/such/file.png"), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Content(_)));
    }
}
