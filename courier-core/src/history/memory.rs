//! In-memory delivery log

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{DeliveryLog, DeliveryRecord};

/// Keeps records in memory; used when the on-disk log is disabled
#[derive(Debug, Default)]
pub struct MemoryDeliveryLog {
    records: Mutex<Vec<DeliveryRecord>>,
}

impl MemoryDeliveryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records appended so far
    pub fn records(&self) -> Vec<DeliveryRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl DeliveryLog for MemoryDeliveryLog {
    async fn append(&self, record: DeliveryRecord) -> crate::Result<()> {
        self.records.lock().push(record);
        Ok(())
    }
}
