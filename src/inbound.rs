//! Inbound metastore audit messages
//!
//! Messages arrive as dynamically-shaped `serde_json::Value`s. Decoding
//! resolves the content variant into [`AuditContent`] up front, so nothing
//! downstream has to re-check which content block is present.

use crate::error::{AuditError, Result};
use crate::types::{EventKind, NULL_TEXT, PARTITION_KEY_SENTINEL};
use serde_json::Value;

/// `auditHeader` block, already rendered to text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditHeader {
    /// Raw server identifier, before cluster-code resolution
    pub server: String,
    pub instance: String,
    pub app_name: String,
}

impl AuditHeader {
    fn from_value(value: Option<&Value>) -> Result<Self> {
        let header = match value {
            Some(v @ Value::Object(_)) => v,
            Some(Value::Null) | None => {
                return Err(AuditError::malformed("auditHeader", "absent"));
            }
            Some(_) => return Err(AuditError::malformed("auditHeader", "not an object")),
        };

        Ok(Self {
            server: render_text(header.get("server")),
            instance: render_text(header.get("instance")),
            app_name: render_text(header.get("appName")),
        })
    }
}

/// Fields shared by table and partition content blocks
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeContent {
    pub event_type: String,
    pub metastore_thrift_uri: String,
    pub metastore_version: String,

    /// Event time in Unix milliseconds
    pub timestamp: i64,

    pub is_successful: String,
    pub is_data_deleted: String,

    /// Pre-change snapshot (`oldTable` / `oldPartition`)
    pub old_entity: Option<Value>,

    /// Post-change snapshot (`newTable` / `newPartition`)
    pub new_entity: Option<Value>,
}

impl ChangeContent {
    fn from_value(kind: EventKind, content: &Value) -> Result<Self> {
        Ok(Self {
            event_type: render_text(content.get("eventType")),
            metastore_thrift_uri: render_text(content.get("metastoreThriftUri")),
            metastore_version: render_text(content.get("metastoreVersion")),
            timestamp: required_i64(content.get("timestamp"), "timestamp")?,
            is_successful: render_text(content.get("isSuccessful")),
            is_data_deleted: render_text(content.get("isDataDeleted")),
            old_entity: non_null(content.get(kind.old_entity_key())).cloned(),
            new_entity: non_null(content.get(kind.new_entity_key())).cloned(),
        })
    }
}

/// The two mutually-exclusive content variants of an audit message
#[derive(Debug, Clone, PartialEq)]
pub enum AuditContent {
    Table(ChangeContent),
    Partition(ChangeContent),
}

impl AuditContent {
    pub fn kind(&self) -> EventKind {
        match self {
            AuditContent::Table(_) => EventKind::Table,
            AuditContent::Partition(_) => EventKind::Partition,
        }
    }

    pub fn change(&self) -> &ChangeContent {
        match self {
            AuditContent::Table(c) | AuditContent::Partition(c) => c,
        }
    }
}

/// A decoded metastore audit message
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub header: AuditHeader,
    pub content: AuditContent,
}

impl InboundEvent {
    /// Decode a generic message into a typed event.
    ///
    /// Table content takes precedence when a message carries both blocks.
    pub fn from_value(message: &Value) -> Result<Self> {
        let header = AuditHeader::from_value(message.get("auditHeader"))?;

        let content = [EventKind::Table, EventKind::Partition]
            .into_iter()
            .find_map(|kind| content_block(message, kind).map(|block| (kind, block)));

        let content = match content {
            Some((EventKind::Table, block)) => {
                AuditContent::Table(ChangeContent::from_value(EventKind::Table, block)?)
            }
            Some((EventKind::Partition, block)) => {
                AuditContent::Partition(ChangeContent::from_value(EventKind::Partition, block)?)
            }
            None => {
                return Err(AuditError::UnrecognizedEventKind {
                    raw: message.to_string(),
                });
            }
        };

        Ok(Self { header, content })
    }

    pub fn kind(&self) -> EventKind {
        self.content.kind()
    }
}

fn content_block(message: &Value, kind: EventKind) -> Option<&Value> {
    kind.content_keys()
        .iter()
        .find_map(|key| non_null(message.get(*key)))
}

/// Which snapshot was chosen as the effective entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSide {
    Old,
    New,
}

/// Pick the effective snapshot: new if present, otherwise old
pub fn coalesce_snapshot<'a>(
    old: Option<&'a Value>,
    new: Option<&'a Value>,
) -> Option<(SnapshotSide, &'a Value)> {
    match (non_null(new), non_null(old)) {
        (Some(new), _) => Some((SnapshotSide::New, new)),
        (None, Some(old)) => Some((SnapshotSide::Old, old)),
        (None, None) => None,
    }
}

/// Structured fields read from the effective snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySnapshot {
    pub db_name: String,
    pub table_name: String,

    /// Rendered partition values, `"?"` when absent
    pub partition_key: String,

    pub location: String,
    pub owner: String,
    pub create_time: i64,
    pub last_access_time: i64,
}

impl EntitySnapshot {
    pub fn from_value(entity: &Value) -> Result<Self> {
        let partition_key = match non_null(entity.get("values"))
            .or_else(|| non_null(entity.get("partitionValues")))
        {
            Some(values) => render_partition_values(values),
            None => PARTITION_KEY_SENTINEL.to_string(),
        };

        Ok(Self {
            db_name: render_text(entity.get("dbName")),
            table_name: render_text(entity.get("tableName")),
            partition_key,
            location: render_text(entity.get("location")),
            owner: render_text(entity.get("owner")),
            create_time: required_i64(entity.get("createTime"), "createTime")?,
            last_access_time: required_i64(entity.get("lastAccessTime"), "lastAccessTime")?,
        })
    }
}

/// Render a value as text: absent/null → `"null"`, strings unquoted,
/// everything else as compact JSON
pub fn render_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => NULL_TEXT.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Render partition values the way the metastore's audit writer always has:
/// arrays as `[a, b]` with unquoted elements, anything else via [`render_text`]
pub fn render_partition_values(values: &Value) -> String {
    match values {
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(|v| render_text(Some(v))).collect();
            format!("[{}]", items.join(", "))
        }
        other => render_text(Some(other)),
    }
}

fn required_i64(value: Option<&Value>, field: &str) -> Result<i64> {
    match value {
        None | Some(Value::Null) => Err(AuditError::malformed(field, "absent")),
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| AuditError::malformed(field, format!("not a 64-bit integer: {}", n))),
        Some(other) => Err(AuditError::malformed(field, format!("non-numeric: {}", other))),
    }
}

fn non_null(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}
