//! Configuration validation rules.

use super::schema::Config;
use crate::reply::Platform;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.scheduler.tick_interval_ms == 0 {
        errors.push("scheduler.tick_interval_ms must be > 0".to_string());
    }
    if config.scheduler.thinking_timeout_secs == 0 {
        errors.push("scheduler.thinking_timeout_secs must be > 0".to_string());
    }
    if config.scheduler.max_queue_size == 0 {
        errors.push("scheduler.max_queue_size must be > 0".to_string());
    }

    if config.dispatch.platform.parse::<Platform>().is_err() {
        errors.push(format!(
            "dispatch.platform must be one of telegram, discord, onebot (got {})",
            config.dispatch.platform
        ));
    }
    let typing = &config.dispatch.typing;
    if typing.cjk_char_secs < 0.0 || typing.other_char_secs < 0.0 {
        errors.push("dispatch.typing per-char costs must be >= 0".to_string());
    }
    if !(0.0..=60.0).contains(&typing.max_delay_secs) {
        errors.push("dispatch.typing.max_delay_secs must be in [0, 60]".to_string());
    }

    if config.channels.telegram.enabled && config.channels.telegram.token.trim().is_empty() {
        errors.push("channels.telegram.token is required when telegram is enabled".to_string());
    }
    if config.channels.discord.enabled && config.channels.discord.token.trim().is_empty() {
        errors.push("channels.discord.token is required when discord is enabled".to_string());
    }
    if config.channels.onebot.enabled && config.channels.onebot.api_url.trim().is_empty() {
        errors.push("channels.onebot.api_url is required when onebot is enabled".to_string());
    }

    if config.delivery_log.enabled && config.delivery_log.path.trim().is_empty() {
        errors.push("delivery_log.path is required when the delivery log is enabled".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}
