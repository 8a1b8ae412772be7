//! Base trait for platform senders

use async_trait::async_trait;
use courier_core::reply::{ConversationId, Platform};
use std::path::Path;
use std::sync::Arc;

/// Delivery capability of one chat platform
#[async_trait]
pub trait PlatformSender: Send + Sync {
    /// Platform this sender talks to
    fn platform(&self) -> Platform;

    /// Send a text message
    async fn send_plain(
        &self,
        target: &ConversationId,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<()>;

    /// Send a file-backed message (a sticker, an image)
    async fn send_rich(
        &self,
        target: &ConversationId,
        content: &RichContent,
        reply_to: Option<&str>,
    ) -> Result<()>;

    /// Secondary API form used when `send_rich` fails
    async fn send_rich_alternate(
        &self,
        _target: &ConversationId,
        _content: &RichContent,
        _reply_to: Option<&str>,
    ) -> Result<()> {
        Err(DispatchError::Unsupported(format!(
            "{} has no alternate rich send",
            self.platform()
        )))
    }
}

pub type SenderPtr = Arc<dyn PlatformSender>;

/// File content loaded for a rich send
#[derive(Debug, Clone)]
pub struct RichContent {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub path: std::path::PathBuf,
    pub caption: Option<String>,
}

impl RichContent {
    /// Read a file into memory
    pub async fn load(path: &Path, caption: Option<&str>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            DispatchError::Content(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".to_string());

        Ok(Self {
            bytes,
            filename,
            path: path.to_path_buf(),
            caption: caption.map(str::to_string),
        })
    }

    /// MIME type guessed from the file name
    pub fn mime_type(&self) -> String {
        mime_guess::from_path(&self.filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }
}

/// Dispatch errors
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Dispatcher not configured: {0}")]
    NotConfigured(String),

    #[error("Platform mismatch: configured {configured}, connected {connected}")]
    PlatformMismatch {
        configured: Platform,
        connected: Platform,
    },

    #[error("Content error: {0}")]
    Content(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Send error: {0}")]
    Send(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("All senders failed: {}", join_errors(.0))]
    AllFailed(Vec<DispatchError>),
}

fn join_errors(errors: &[DispatchError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, DispatchError>;
