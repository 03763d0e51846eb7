//! # metastore-audit
//!
//! Normalize metastore table/partition audit events into one canonical record.
//!
//! ## Overview
//!
//! A metastore emits an audit message whenever a table or partition is
//! created, altered, or dropped. Table and partition messages are shaped
//! differently, and either entity snapshot may be missing. `metastore-audit`
//! resolves the variant, picks the effective snapshot, and produces an
//! [`AuditRecord`] with the same fields every time.
//!
//! ## Quick Start
//!
//! ```rust
//! use metastore_audit::{AuditEventNormalizer, ClusterMapping, ClusterTable};
//!
//! # fn example() -> metastore_audit::Result<()> {
//! let normalizer = AuditEventNormalizer::new(ClusterTable::new(vec![
//!     ClusterMapping::new("ltx1-holdem", "holdem"),
//! ]));
//!
//! let message = serde_json::json!({
//!     "auditHeader": {"server": "ltx1-holdemnn01", "instance": "i1", "appName": "hive"},
//!     "tableAuditContent": {
//!         "eventType": "DROP",
//!         "metastoreThriftUri": "thrift://metastore:9083",
//!         "metastoreVersion": "2.3",
//!         "timestamp": 1700000000000i64,
//!         "isSuccessful": true,
//!         "isDataDeleted": true,
//!         "oldTable": {
//!             "dbName": "tracking", "tableName": "page_views", "values": null,
//!             "location": "/data/tracking/page_views", "owner": "etl",
//!             "createTime": 1600000000, "lastAccessTime": 0
//!         },
//!         "newTable": null
//!     }
//! });
//!
//! let record = normalizer
//!     .normalize(Some(&message), "MetastoreTableAuditEvent")?
//!     .expect("message was present");
//! assert_eq!(record.server, "ltx1-holdem");
//! assert_eq!(record.partition_key, "?");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Architecture
//!
//! - **ClusterResolver** trait — raw server identifier → canonical cluster code
//! - **AuditEventNormalizer** — stateless message → record transformation
//! - **AuditSink** / **DeadLetterHandler** traits — where records and rejects go
//! - **AuditPipeline** — normalizes, stores, and dead-letters decoded messages

pub mod cluster;
pub mod config;
pub mod dlq;
pub mod error;
pub mod inbound;
pub mod normalizer;
pub mod pipeline;
pub mod sink;
pub mod types;

pub use cluster::{ClusterMapping, ClusterResolver, ClusterTable};
pub use config::AuditConfig;
pub use dlq::{DeadLetterHandler, MemoryDeadLetterQueue, RejectedMessage};
pub use error::{AuditError, Result};
pub use inbound::{
    coalesce_snapshot, AuditContent, AuditHeader, ChangeContent, EntitySnapshot, InboundEvent,
    SnapshotSide,
};
pub use normalizer::AuditEventNormalizer;
pub use pipeline::{AuditPipeline, PipelineStats, ProcessOutcome};
pub use sink::{AuditSink, MemoryAuditSink};
pub use types::{AuditRecord, EventKind, RecordKey, NULL_TEXT, PARTITION_KEY_SENTINEL};
