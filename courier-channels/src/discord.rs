//! Discord sender over the REST API

use async_trait::async_trait;
use courier_core::config::schema::DiscordConfig;
use courier_core::reply::{ConversationId, Platform};
use reqwest::multipart::{Form, Part};

use crate::base::{DispatchError, PlatformSender, Result, RichContent};
use crate::common::{check_response, create_http_client};

/// Sends messages via `POST /channels/{id}/messages`
pub struct DiscordSender {
    token: String,
    api_base: String,
    http: reqwest::Client,
}

impl DiscordSender {
    /// Create a sender from config
    pub fn new(config: &DiscordConfig) -> Result<Self> {
        if config.token.is_empty() {
            return Err(DispatchError::NotConfigured(
                "Discord bot token is empty".to_string(),
            ));
        }

        Ok(Self {
            token: config.token.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            http: create_http_client()?,
        })
    }

    fn messages_url(&self, target: &ConversationId) -> String {
        format!("{}/channels/{}/messages", self.api_base, target)
    }

    fn payload(content: &str, reply_to: Option<&str>) -> serde_json::Value {
        let mut payload = serde_json::json!({
            "content": content
        });

        if let Some(reply_to) = reply_to.filter(|id| !id.is_empty()) {
            payload["message_reference"] = serde_json::json!({
                "message_id": reply_to
            });
            payload["allowed_mentions"] = serde_json::json!({
                "replied_user": false
            });
        }

        payload
    }

    async fn post_json(&self, target: &ConversationId, payload: &serde_json::Value) -> Result<()> {
        let response = self
            .http
            .post(self.messages_url(target))
            .header("Authorization", format!("Bot {}", self.token))
            .json(payload)
            .send()
            .await
            .map_err(|e| DispatchError::Send(format!("Request failed: {}", e)))?;
        check_response("Discord", response).await?;
        Ok(())
    }

    async fn post_file(
        &self,
        target: &ConversationId,
        content: &RichContent,
        reply_to: Option<&str>,
    ) -> Result<()> {
        let payload = Self::payload(content.caption.as_deref().unwrap_or(""), reply_to);
        let part = Part::bytes(content.bytes.clone())
            .file_name(content.filename.clone())
            .mime_str(&content.mime_type())
            .map_err(|e| DispatchError::Content(format!("Invalid MIME type: {}", e)))?;
        let form = Form::new()
            .text("payload_json", payload.to_string())
            .part("files[0]", part);

        let response = self
            .http
            .post(self.messages_url(target))
            .header("Authorization", format!("Bot {}", self.token))
            .multipart(form)
            .send()
            .await
            .map_err(|e| DispatchError::Send(format!("Request failed: {}", e)))?;
        check_response("Discord", response).await?;
        Ok(())
    }
}

#[async_trait]
impl PlatformSender for DiscordSender {
    fn platform(&self) -> Platform {
        Platform::Discord
    }

    async fn send_plain(
        &self,
        target: &ConversationId,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<()> {
        match self.post_json(target, &Self::payload(text, reply_to)).await {
            Ok(()) => {
                tracing::info!("Discord message sent to {}", target);
                Ok(())
            }
            Err(e) => {
                // Fallback form: bare content, no reference
                tracing::warn!("Discord send failed, retrying without reference: {}", e);
                self.post_json(target, &serde_json::json!({ "content": text }))
                    .await?;
                tracing::info!("Discord message sent to {} via minimal body", target);
                Ok(())
            }
        }
    }

    async fn send_rich(
        &self,
        target: &ConversationId,
        content: &RichContent,
        reply_to: Option<&str>,
    ) -> Result<()> {
        self.post_file(target, content, reply_to).await?;
        tracing::info!("Discord file {} sent to {}", content.filename, target);
        Ok(())
    }

    async fn send_rich_alternate(
        &self,
        target: &ConversationId,
        content: &RichContent,
        _reply_to: Option<&str>,
    ) -> Result<()> {
        self.post_file(target, content, None).await?;
        tracing::info!("Discord file {} sent to {} without reference", content.filename, target);
        Ok(())
    }
}
