//! Builds platform senders from configuration

use courier_core::config::schema::ChannelsConfig;
use courier_core::reply::Platform;
use std::sync::Arc;

use crate::base::SenderPtr;
use crate::discord::DiscordSender;
use crate::onebot::OneBotSender;
use crate::telegram::TelegramSender;

/// Senders for every enabled platform, in fallback order
#[derive(Clone, Default)]
pub struct SenderSet {
    senders: Vec<SenderPtr>,
}

impl SenderSet {
    pub fn new(senders: Vec<SenderPtr>) -> Self {
        Self { senders }
    }

    /// Create senders for the enabled channels.
    ///
    /// Channels that fail to initialize are skipped with a warning.
    pub fn from_config(config: &ChannelsConfig) -> Self {
        let mut senders: Vec<SenderPtr> = Vec::new();

        if config.telegram.enabled {
            match TelegramSender::new(&config.telegram) {
                Ok(sender) => {
                    senders.push(Arc::new(sender));
                    tracing::info!("Telegram sender initialized");
                }
                Err(e) => tracing::warn!("Telegram channel enabled but not usable: {}", e),
            }
        }

        if config.discord.enabled {
            match DiscordSender::new(&config.discord) {
                Ok(sender) => {
                    senders.push(Arc::new(sender));
                    tracing::info!("Discord sender initialized");
                }
                Err(e) => tracing::warn!("Discord channel enabled but not usable: {}", e),
            }
        }

        if config.onebot.enabled {
            match OneBotSender::new(&config.onebot) {
                Ok(sender) => {
                    senders.push(Arc::new(sender));
                    tracing::info!("OneBot sender initialized");
                }
                Err(e) => tracing::warn!("OneBot channel enabled but not usable: {}", e),
            }
        }

        Self { senders }
    }

    /// Sender for a platform, if one was built
    pub fn get(&self, platform: Platform) -> Option<SenderPtr> {
        self.senders
            .iter()
            .find(|s| s.platform() == platform)
            .cloned()
    }

    /// Platforms with a sender
    pub fn platforms(&self) -> Vec<Platform> {
        self.senders.iter().map(|s| s.platform()).collect()
    }

    pub fn all(&self) -> &[SenderPtr] {
        &self.senders
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}
