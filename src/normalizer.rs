//! Audit event normalization
//!
//! Turns one decoded metastore audit message into one [`AuditRecord`].
//! The normalizer holds nothing but its cluster resolver and can be shared
//! freely across worker threads.

use crate::cluster::{ClusterResolver, ClusterTable};
use crate::error::{AuditError, Result};
use crate::inbound::{coalesce_snapshot, render_text, EntitySnapshot, InboundEvent};
use crate::types::AuditRecord;
use serde_json::Value;

/// Normalizes table and partition audit events into canonical records
#[derive(Debug, Clone, Default)]
pub struct AuditEventNormalizer<R = ClusterTable> {
    resolver: R,
}

impl<R: ClusterResolver> AuditEventNormalizer<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Normalize a decoded message.
    ///
    /// An absent message yields `Ok(None)`. `topic` only identifies the call
    /// site in logs.
    pub fn normalize(&self, message: Option<&Value>, topic: &str) -> Result<Option<AuditRecord>> {
        let Some(message) = message else {
            tracing::trace!(topic = %topic, "Empty audit message, nothing to normalize");
            return Ok(None);
        };

        let event = InboundEvent::from_value(message)?;
        self.normalize_event(&event, topic).map(Some)
    }

    /// Normalize an already-decoded event
    pub fn normalize_event(&self, event: &InboundEvent, topic: &str) -> Result<AuditRecord> {
        let kind = event.kind();
        let change = event.content.change();

        let (side, effective) =
            coalesce_snapshot(change.old_entity.as_ref(), change.new_entity.as_ref()).ok_or_else(
                || AuditError::MissingEntitySnapshot {
                    event_name: kind.event_name().to_string(),
                },
            )?;
        let entity = EntitySnapshot::from_value(effective)?;

        let record = AuditRecord {
            server: self.resolver.resolve_cluster_code(&event.header.server),
            instance: event.header.instance.clone(),
            app_name: event.header.app_name.clone(),
            event_name: kind.event_name().to_string(),
            event_type: change.event_type.clone(),
            timestamp: change.timestamp,
            metastore_uri: change.metastore_thrift_uri.clone(),
            metastore_version: change.metastore_version.clone(),
            is_successful: change.is_successful.clone(),
            is_data_deleted: change.is_data_deleted.clone(),
            db_name: entity.db_name,
            table_name: entity.table_name,
            partition_key: entity.partition_key,
            location: entity.location,
            owner: entity.owner,
            create_time: entity.create_time,
            last_access_time: entity.last_access_time,
            old_info_text: render_text(change.old_entity.as_ref()),
            new_info_text: render_text(change.new_entity.as_ref()),
        };

        tracing::debug!(
            topic = %topic,
            event_name = %record.event_name,
            event_type = %record.event_type,
            server = %record.server,
            key = %record.key(),
            snapshot = ?side,
            "Audit event normalized"
        );

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    const TOPIC: &str = "MetastoreTableAuditEvent";

    fn normalizer() -> AuditEventNormalizer<ClusterTable> {
        AuditEventNormalizer::new(ClusterTable::default())
    }

    fn entity(location: &str, owner: &str, last_access: i64) -> serde_json::Value {
        json!({
            "dbName": "d",
            "tableName": "t",
            "values": null,
            "location": location,
            "owner": owner,
            "createTime": 1,
            "lastAccessTime": last_access,
        })
    }

    fn table_message(old: serde_json::Value, new: serde_json::Value) -> serde_json::Value {
        json!({
            "auditHeader": {"server": "cluster-a-raw", "instance": "i1", "appName": "hive"},
            "tableAuditContent": {
                "eventType": "ALTER",
                "metastoreThriftUri": "thrift://x",
                "metastoreVersion": "2.3",
                "timestamp": 1000,
                "isSuccessful": "true",
                "isDataDeleted": "false",
                "oldTable": old,
                "newTable": new,
            }
        })
    }

    fn partition_message(old: serde_json::Value, new: serde_json::Value) -> serde_json::Value {
        json!({
            "auditHeader": {"server": "cluster-b-raw", "instance": "i2", "appName": "hive"},
            "partitionAuditContent": {
                "eventType": "ADD_PARTITION",
                "metastoreThriftUri": "thrift://y",
                "metastoreVersion": "3.1",
                "timestamp": 2000,
                "isSuccessful": true,
                "isDataDeleted": false,
                "oldPartition": old,
                "newPartition": new,
            }
        })
    }

    #[test]
    fn test_normalize_none_is_noop() {
        assert!(normalizer().normalize(None, TOPIC).unwrap().is_none());
        assert!(normalizer().normalize(None, "").unwrap().is_none());
    }

    #[test]
    fn test_alter_table_scenario() {
        let msg = table_message(entity("/old", "o", 2), entity("/new", "o2", 3));
        let record = normalizer().normalize(Some(&msg), TOPIC).unwrap().unwrap();

        assert_eq!(record.partition_key, "?");
        assert_eq!(record.location, "/new");
        assert_eq!(record.owner, "o2");
        assert_eq!(record.last_access_time, 3);
    }

    #[test]
    fn test_table_identity_fields() {
        let msg = table_message(json!(null), entity("/new", "o2", 3));
        let record = normalizer().normalize(Some(&msg), TOPIC).unwrap().unwrap();

        assert_eq!(record.event_name, "TableAuditEvent");
        assert_eq!(record.server, "cluster-a-raw");
        assert_eq!(record.instance, "i1");
        assert_eq!(record.app_name, "hive");
        assert_eq!(record.event_type, "ALTER");
        assert_eq!(record.timestamp, 1000);
        assert_eq!(record.metastore_uri, "thrift://x");
        assert_eq!(record.metastore_version, "2.3");
        assert_eq!(record.is_successful, "true");
        assert_eq!(record.is_data_deleted, "false");
        assert_eq!(record.create_time, 1);
    }

    #[test]
    fn test_partition_event() {
        let mut new = entity("/data/ds=2024-01-01", "etl", 5);
        new["values"] = json!(["2024-01-01"]);
        let msg = partition_message(json!(null), new);

        let record = normalizer().normalize(Some(&msg), "partitions").unwrap().unwrap();
        assert_eq!(record.event_name, "PartitionAuditEvent");
        assert_eq!(record.event_type, "ADD_PARTITION");
        assert_eq!(record.partition_key, "[2024-01-01]");
        assert_eq!(record.is_successful, "true");
        assert_eq!(record.is_data_deleted, "false");
        assert!(record.is_partition_event());
    }

    #[test]
    fn test_drop_falls_back_to_old_snapshot() {
        let msg = table_message(entity("/old", "o", 2), json!(null));
        let record = normalizer().normalize(Some(&msg), TOPIC).unwrap().unwrap();

        assert_eq!(record.location, "/old");
        assert_eq!(record.owner, "o");
        assert_eq!(record.last_access_time, 2);
        assert_eq!(record.new_info_text, "null");
        assert!(record.old_info_text.contains("/old"));
    }

    #[test]
    fn test_partition_drop_falls_back_to_old_partition() {
        let mut old = entity("/data/ds=2024-01-01", "etl", 4);
        old["values"] = json!(["2024-01-01"]);
        let msg = partition_message(old, json!(null));

        let record = normalizer().normalize(Some(&msg), "partitions").unwrap().unwrap();
        assert_eq!(record.event_name, "PartitionAuditEvent");
        assert_eq!(record.location, "/data/ds=2024-01-01");
        assert_eq!(record.owner, "etl");
        assert_eq!(record.last_access_time, 4);
        assert_eq!(record.partition_key, "[2024-01-01]");
        assert_eq!(record.new_info_text, "null");
        assert!(record.old_info_text.contains("ds=2024-01-01"));
    }

    #[test]
    fn test_info_texts_keep_both_sides() {
        let msg = table_message(entity("/old", "o", 2), entity("/new", "o2", 3));
        let record = normalizer().normalize(Some(&msg), TOPIC).unwrap().unwrap();

        let old: serde_json::Value = serde_json::from_str(&record.old_info_text).unwrap();
        let new: serde_json::Value = serde_json::from_str(&record.new_info_text).unwrap();
        assert_eq!(old["location"], "/old");
        assert_eq!(new["location"], "/new");
    }

    #[test]
    fn test_missing_snapshots() {
        let msg = table_message(json!(null), json!(null));
        match normalizer().normalize(Some(&msg), TOPIC).unwrap_err() {
            AuditError::MissingEntitySnapshot { event_name } => {
                assert_eq!(event_name, "TableAuditEvent")
            }
            other => panic!("unexpected error: {other}"),
        }

        let mut msg = partition_message(json!(null), json!(null));
        let content = msg["partitionAuditContent"].as_object_mut().unwrap();
        content.remove("oldPartition");
        content.remove("newPartition");
        assert!(matches!(
            normalizer().normalize(Some(&msg), TOPIC),
            Err(AuditError::MissingEntitySnapshot { .. })
        ));
    }

    #[test]
    fn test_unrecognized_event_kind() {
        let msg = json!({
            "auditHeader": {"server": "s", "instance": "i", "appName": "a"},
            "databaseAuditContent": {}
        });
        assert!(matches!(
            normalizer().normalize(Some(&msg), TOPIC),
            Err(AuditError::UnrecognizedEventKind { .. })
        ));
    }

    #[test]
    fn test_effective_snapshot_times_required() {
        let mut new = entity("/new", "o2", 3);
        new.as_object_mut().unwrap().remove("createTime");
        let msg = table_message(entity("/old", "o", 2), new);

        match normalizer().normalize(Some(&msg), TOPIC).unwrap_err() {
            AuditError::MalformedRequiredField { field, .. } => assert_eq!(field, "createTime"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_only_effective_snapshot_is_validated() {
        // A broken old snapshot does not matter when the new one is usable
        let msg = table_message(json!({"location": "/old"}), entity("/new", "o2", 3));
        let record = normalizer().normalize(Some(&msg), TOPIC).unwrap().unwrap();
        assert_eq!(record.location, "/new");
        assert_eq!(record.old_info_text, r#"{"location":"/old"}"#);
    }

    #[test]
    fn test_string_fields_degrade_to_null_text() {
        let msg = json!({
            "auditHeader": {"server": "s"},
            "tableAuditContent": {
                "timestamp": 7,
                "newTable": {"createTime": 1, "lastAccessTime": 2}
            }
        });
        let record = normalizer().normalize(Some(&msg), TOPIC).unwrap().unwrap();

        assert_eq!(record.instance, "null");
        assert_eq!(record.app_name, "null");
        assert_eq!(record.event_type, "null");
        assert_eq!(record.metastore_uri, "null");
        assert_eq!(record.is_successful, "null");
        assert_eq!(record.db_name, "null");
        assert_eq!(record.location, "null");
        assert_eq!(record.partition_key, "?");
        assert_eq!(record.old_info_text, "null");
    }

    #[test]
    fn test_server_resolved_through_resolver() {
        let normalizer = AuditEventNormalizer::new(|raw: &str| {
            if raw.starts_with("cluster-a") {
                "CLUSTER_A".to_string()
            } else {
                "UNKNOWN".to_string()
            }
        });
        let msg = table_message(json!(null), entity("/new", "o2", 3));
        let record = normalizer.normalize(Some(&msg), TOPIC).unwrap().unwrap();
        assert_eq!(record.server, "CLUSTER_A");
    }

    #[test]
    fn test_normalize_event_typed() {
        let msg = table_message(entity("/old", "o", 2), entity("/new", "o2", 3));
        let event = InboundEvent::from_value(&msg).unwrap();
        let record = normalizer().normalize_event(&event, TOPIC).unwrap();
        assert_eq!(record, normalizer().normalize(Some(&msg), TOPIC).unwrap().unwrap());
    }

    #[test]
    fn test_concurrent_normalization() {
        let normalizer = Arc::new(normalizer());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let normalizer = normalizer.clone();
                std::thread::spawn(move || {
                    let msg = table_message(json!(null), entity(&format!("/t{}", i), "o", i));
                    normalizer.normalize(Some(&msg), TOPIC).unwrap().unwrap()
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let record = handle.join().unwrap();
            assert_eq!(record.location, format!("/t{}", i));
            assert_eq!(record.last_access_time, i as i64);
        }
    }
}
