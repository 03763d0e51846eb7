//! Canonical audit record types
//!
//! All types use camelCase JSON serialization so records can be handed to
//! downstream writers as-is.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Partition key substituted when the effective snapshot has no partition values
pub const PARTITION_KEY_SENTINEL: &str = "?";

/// Text rendering of an absent or null value
pub const NULL_TEXT: &str = "null";

/// Which kind of metastore entity an audit event describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Table,
    Partition,
}

impl EventKind {
    /// Canonical event name written to `AuditRecord::event_name`
    pub fn event_name(self) -> &'static str {
        match self {
            EventKind::Table => "TableAuditEvent",
            EventKind::Partition => "PartitionAuditEvent",
        }
    }

    /// Message keys that may carry this kind's content block, in lookup order
    pub fn content_keys(self) -> &'static [&'static str] {
        match self {
            EventKind::Table => &["tableAuditContent", "metastoreTableAuditContent"],
            EventKind::Partition => &["partitionAuditContent", "metastorePartitionAuditContent"],
        }
    }

    /// Content key holding the pre-change snapshot
    pub fn old_entity_key(self) -> &'static str {
        match self {
            EventKind::Table => "oldTable",
            EventKind::Partition => "oldPartition",
        }
    }

    /// Content key holding the post-change snapshot
    pub fn new_entity_key(self) -> &'static str {
        match self {
            EventKind::Table => "newTable",
            EventKind::Partition => "newPartition",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_name())
    }
}

/// One normalized metastore audit record
///
/// Exactly one record is produced per inbound message. Every string field is
/// populated; missing non-identifying values are rendered as `"null"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// Canonical cluster code resolved from the raw server identifier
    pub server: String,
    pub instance: String,
    pub app_name: String,

    /// `TableAuditEvent` or `PartitionAuditEvent`
    pub event_name: String,

    /// Metastore operation (e.g. "CREATE", "ALTER", "DROP")
    pub event_type: String,

    /// Event time in Unix milliseconds
    pub timestamp: i64,

    pub metastore_uri: String,
    pub metastore_version: String,
    pub is_successful: String,
    pub is_data_deleted: String,

    pub db_name: String,
    pub table_name: String,

    /// Rendered partition values, or `"?"` when there are none
    ///
    /// Value lists render as `[2024-01-01, us]`, the form existing audit
    /// tables were keyed with.
    pub partition_key: String,

    pub location: String,
    pub owner: String,
    pub create_time: i64,
    pub last_access_time: i64,

    /// Full rendering of the pre-change snapshot
    pub old_info_text: String,

    /// Full rendering of the post-change snapshot
    pub new_info_text: String,
}

impl AuditRecord {
    /// Identifying key of the entity this record describes
    pub fn key(&self) -> RecordKey {
        RecordKey {
            db_name: self.db_name.clone(),
            table_name: self.table_name.clone(),
            partition_key: self.partition_key.clone(),
        }
    }

    /// Event time as a UTC datetime, if `timestamp` is in range
    pub fn event_time(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp_millis(self.timestamp)
    }

    /// Whether the record describes a partition-level change
    pub fn is_partition_event(&self) -> bool {
        self.event_name == EventKind::Partition.event_name()
    }
}

/// `(dbName, tableName, partitionKey)` — stable downstream key of a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordKey {
    pub db_name: String,
    pub table_name: String,
    pub partition_key: String,
}

impl RecordKey {
    pub fn new(
        db_name: impl Into<String>,
        table_name: impl Into<String>,
        partition_key: impl Into<String>,
    ) -> Self {
        Self {
            db_name: db_name.into(),
            table_name: table_name.into(),
            partition_key: partition_key.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}[{}]", self.db_name, self.table_name, self.partition_key)
    }
}
