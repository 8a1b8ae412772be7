//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration for courier
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Scheduler loop configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Dispatcher configuration
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Platform connection configuration
    #[serde(default)]
    pub channels: ChannelsConfig,
    /// Delivery log sink
    #[serde(default)]
    pub delivery_log: DeliveryLogConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}

/// Scheduler loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Milliseconds between ticks
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Seconds a placeholder may think, and a finished reply may wait, before eviction
    #[serde(default = "default_thinking_timeout_secs")]
    pub thinking_timeout_secs: u64,
    /// Maximum pending items per conversation
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_thinking_timeout_secs() -> u64 {
    20
}

fn default_max_queue_size() -> usize {
    100
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            thinking_timeout_secs: default_thinking_timeout_secs(),
            max_queue_size: default_max_queue_size(),
        }
    }
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn thinking_timeout(&self) -> Duration {
        Duration::from_secs(self.thinking_timeout_secs)
    }
}

/// Dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Platform the deployment targets (telegram, discord, onebot)
    #[serde(default = "default_platform")]
    pub platform: String,
    /// Typing delay policy
    #[serde(default)]
    pub typing: TypingConfig,
    /// Text written to the delivery log in place of special content
    #[serde(default = "default_special_content_label")]
    pub special_content_label: String,
}

fn default_platform() -> String {
    "telegram".to_string()
}

fn default_special_content_label() -> String {
    "[sticker]".to_string()
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            platform: default_platform(),
            typing: TypingConfig::default(),
            special_content_label: default_special_content_label(),
        }
    }
}

/// Typing delay policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingConfig {
    /// Seconds per CJK ideograph
    #[serde(default = "default_cjk_char_secs")]
    pub cjk_char_secs: f64,
    /// Seconds per other character
    #[serde(default = "default_other_char_secs")]
    pub other_char_secs: f64,
    /// Upper bound on any single delay
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: f64,
}

fn default_cjk_char_secs() -> f64 {
    0.2
}

fn default_other_char_secs() -> f64 {
    0.1
}

fn default_max_delay_secs() -> f64 {
    10.0
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            cjk_char_secs: default_cjk_char_secs(),
            other_char_secs: default_other_char_secs(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

/// Platform connection configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub onebot: OneBotConfig,
}

/// Telegram connection configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub token: String,
    /// Bot API base URL override (self-hosted bot API server)
    #[serde(default)]
    pub api_url: Option<String>,
}

/// Discord connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_discord_api_base")]
    pub api_base: String,
}

fn default_discord_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token: String::new(),
            api_base: default_discord_api_base(),
        }
    }
}

/// OneBot v11 HTTP connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneBotConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_onebot_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub access_token: String,
}

fn default_onebot_api_url() -> String {
    "http://127.0.0.1:5700".to_string()
}

impl Default for OneBotConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: default_onebot_api_url(),
            access_token: String::new(),
        }
    }
}

/// Delivery log sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryLogConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_delivery_log_path")]
    pub path: String,
}

fn default_true() -> bool {
    true
}

fn default_delivery_log_path() -> String {
    "data/delivery.jsonl".to_string()
}

impl Default for DeliveryLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_delivery_log_path(),
        }
    }
}
