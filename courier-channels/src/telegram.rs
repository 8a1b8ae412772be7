//! Telegram sender built on teloxide

use async_trait::async_trait;
use courier_core::config::schema::TelegramConfig;
use courier_core::reply::{ConversationId, Platform};
use teloxide::payloads::{SendDocumentSetters, SendMessageSetters, SendPhotoSetters};
use teloxide::requests::Requester;
use teloxide::types::{ChatId, InputFile, MessageId, ReplyParameters};
use teloxide::Bot;

use crate::base::{DispatchError, PlatformSender, Result, RichContent};

/// Sends messages through the Telegram Bot API
pub struct TelegramSender {
    bot: Bot,
}

impl TelegramSender {
    /// Create a sender from config
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        if config.token.is_empty() {
            return Err(DispatchError::NotConfigured(
                "Telegram bot token is empty".to_string(),
            ));
        }

        let mut bot = Bot::new(&config.token);
        if let Some(api_url) = &config.api_url {
            let url = api_url.parse::<reqwest::Url>().map_err(|e| {
                DispatchError::NotConfigured(format!("Invalid Telegram API URL {}: {}", api_url, e))
            })?;
            bot = bot.set_api_url(url);
        }

        Ok(Self { bot })
    }

    fn chat_id(target: &ConversationId) -> Result<ChatId> {
        target
            .as_str()
            .parse::<i64>()
            .map(ChatId)
            .map_err(|_| DispatchError::Send(format!("Invalid chat_id: {}", target)))
    }

    fn reply_parameters(reply_to: Option<&str>) -> Option<ReplyParameters> {
        let id = reply_to?;
        match id.parse::<i32>() {
            Ok(id) => Some(ReplyParameters::new(MessageId(id))),
            Err(_) => {
                tracing::warn!("Ignoring non-numeric Telegram reply id: {}", id);
                None
            }
        }
    }

    fn input_file(content: &RichContent) -> InputFile {
        InputFile::memory(content.bytes.clone()).file_name(content.filename.clone())
    }
}

#[async_trait]
impl PlatformSender for TelegramSender {
    fn platform(&self) -> Platform {
        Platform::Telegram
    }

    async fn send_plain(
        &self,
        target: &ConversationId,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<()> {
        let chat_id = Self::chat_id(target)?;
        let mut request = self.bot.send_message(chat_id, text);
        if let Some(params) = Self::reply_parameters(reply_to) {
            request = request.reply_parameters(params);
        }

        request
            .await
            .map_err(|e| DispatchError::Api(format!("Failed to send Telegram message: {}", e)))?;
        tracing::info!("Telegram message sent to {}", target);
        Ok(())
    }

    async fn send_rich(
        &self,
        target: &ConversationId,
        content: &RichContent,
        reply_to: Option<&str>,
    ) -> Result<()> {
        let chat_id = Self::chat_id(target)?;
        let mut request = self.bot.send_photo(chat_id, Self::input_file(content));
        if let Some(caption) = &content.caption {
            request = request.caption(caption.clone());
        }
        if let Some(params) = Self::reply_parameters(reply_to) {
            request = request.reply_parameters(params);
        }

        request
            .await
            .map_err(|e| DispatchError::Api(format!("Failed to send Telegram photo: {}", e)))?;
        tracing::info!("Telegram photo {} sent to {}", content.filename, target);
        Ok(())
    }

    async fn send_rich_alternate(
        &self,
        target: &ConversationId,
        content: &RichContent,
        reply_to: Option<&str>,
    ) -> Result<()> {
        let chat_id = Self::chat_id(target)?;
        let mut request = self.bot.send_document(chat_id, Self::input_file(content));
        if let Some(caption) = &content.caption {
            request = request.caption(caption.clone());
        }
        if let Some(params) = Self::reply_parameters(reply_to) {
            request = request.reply_parameters(params);
        }

        request
            .await
            .map_err(|e| DispatchError::Api(format!("Failed to send Telegram document: {}", e)))?;
        tracing::info!("Telegram document {} sent to {}", content.filename, target);
        Ok(())
    }
}
