//! Audit record sinks
//!
//! A sink is where normalized records go next. Real deployments write to a
//! database or search index; [`MemoryAuditSink`] keeps them in process.

use crate::error::Result;
use crate::types::{AuditRecord, RecordKey};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Destination for normalized audit records
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persist one record
    async fn write(&self, record: AuditRecord) -> Result<()>;

    /// Number of records written so far
    async fn count(&self) -> Result<usize>;
}

/// In-memory sink for development and testing
///
/// Keeps every record in arrival order.
#[derive(Default)]
pub struct MemoryAuditSink {
    records: RwLock<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records in arrival order
    pub async fn records(&self) -> Vec<AuditRecord> {
        self.records.read().await.clone()
    }

    /// Latest record written for `key`
    pub async fn latest(&self, key: &RecordKey) -> Option<AuditRecord> {
        let records = self.records.read().await;
        records.iter().rev().find(|r| &r.key() == key).cloned()
    }

    /// Full audit trail for `key`, oldest first
    pub async fn history(&self, key: &RecordKey) -> Vec<AuditRecord> {
        let records = self.records.read().await;
        records.iter().filter(|r| &r.key() == key).cloned().collect()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn write(&self, record: AuditRecord) -> Result<()> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().await.len())
    }
}
