//! JSON-lines delivery log on disk

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::{DeliveryLog, DeliveryRecord};

/// Appends one JSON object per line to a file
#[derive(Debug)]
pub struct JsonlDeliveryLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlDeliveryLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record back, skipping lines that do not parse
    pub async fn read_all(&self) -> crate::Result<Vec<DeliveryRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = tokio::fs::read_to_string(&self.path).await?;
        let records = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| match serde_json::from_str::<DeliveryRecord>(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Skipping malformed delivery record: {}", e);
                    None
                }
            })
            .collect();
        Ok(records)
    }
}

#[async_trait]
impl DeliveryLog for JsonlDeliveryLog {
    async fn append(&self, record: DeliveryRecord) -> crate::Result<()> {
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
