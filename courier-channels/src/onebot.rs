//! OneBot v11 sender over the HTTP API
//!
//! Messages are CQ-code strings posted to `send_group_msg`.

use async_trait::async_trait;
use base64::Engine;
use courier_core::config::schema::OneBotConfig;
use courier_core::reply::{ConversationId, Platform};
use std::path::Path;

use crate::base::{DispatchError, PlatformSender, Result, RichContent};
use crate::common::{check_response, create_http_client};

/// Sends group messages to a OneBot v11 implementation
pub struct OneBotSender {
    api_url: String,
    access_token: String,
    http: reqwest::Client,
}

impl OneBotSender {
    /// Create a sender from config
    pub fn new(config: &OneBotConfig) -> Result<Self> {
        if config.api_url.is_empty() {
            return Err(DispatchError::NotConfigured(
                "OneBot API URL is empty".to_string(),
            ));
        }

        Ok(Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            http: create_http_client()?,
        })
    }

    fn group_id(target: &ConversationId) -> Result<i64> {
        target
            .as_str()
            .parse::<i64>()
            .map_err(|_| DispatchError::Send(format!("Invalid group_id: {}", target)))
    }

    fn with_reply(message: String, reply_to: Option<&str>) -> String {
        match reply_to {
            Some(id) if !id.is_empty() => format!("[CQ:reply,id={}]{}", id, message),
            _ => message,
        }
    }

    fn image_from_path(path: &Path) -> String {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|dir| dir.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        };
        format!("[CQ:image,file=file:///{}]", absolute.display().to_string().trim_start_matches('/'))
    }

    fn image_from_bytes(bytes: &[u8]) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        format!("[CQ:image,file=base64://{}]", encoded)
    }

    fn with_caption(message: String, content: &RichContent) -> String {
        match &content.caption {
            Some(caption) if !caption.is_empty() => format!("{}{}", message, caption),
            _ => message,
        }
    }

    async fn send_group_msg(
        &self,
        target: &ConversationId,
        message: &str,
        auto_escape: bool,
    ) -> Result<()> {
        let payload = serde_json::json!({
            "group_id": Self::group_id(target)?,
            "message": message,
            "auto_escape": auto_escape,
        });

        let mut request = self
            .http
            .post(format!("{}/send_group_msg", self.api_url))
            .json(&payload);
        if !self.access_token.is_empty() {
            request = request.bearer_auth(&self.access_token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DispatchError::Send(format!("Request failed: {}", e)))?;
        let response = check_response("OneBot", response).await?;

        // OneBot reports failures in the body with HTTP 200
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DispatchError::Api(format!("Invalid OneBot response: {}", e)))?;
        match body.get("status").and_then(|s| s.as_str()) {
            Some("failed") => Err(DispatchError::Api(format!(
                "OneBot rejected message: retcode {}",
                body.get("retcode").cloned().unwrap_or_default()
            ))),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl PlatformSender for OneBotSender {
    fn platform(&self) -> Platform {
        Platform::OneBot
    }

    async fn send_plain(
        &self,
        target: &ConversationId,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<()> {
        let message = Self::with_reply(text.to_string(), reply_to);
        self.send_group_msg(target, &message, false).await?;
        tracing::info!("OneBot message sent to group {}", target);
        Ok(())
    }

    async fn send_rich(
        &self,
        target: &ConversationId,
        content: &RichContent,
        reply_to: Option<&str>,
    ) -> Result<()> {
        let message = Self::with_caption(Self::image_from_path(&content.path), content);
        let message = Self::with_reply(message, reply_to);
        self.send_group_msg(target, &message, false).await?;
        tracing::info!("OneBot image {} sent to group {}", content.filename, target);
        Ok(())
    }

    async fn send_rich_alternate(
        &self,
        target: &ConversationId,
        content: &RichContent,
        reply_to: Option<&str>,
    ) -> Result<()> {
        let message = Self::with_caption(Self::image_from_bytes(&content.bytes), content);
        let message = Self::with_reply(message, reply_to);
        self.send_group_msg(target, &message, false).await?;
        tracing::info!("OneBot inline image {} sent to group {}", content.filename, target);
        Ok(())
    }
}
