//! Normalizer configuration
//!
//! Configuration is plain JSON so it can ship next to the consumer's other
//! settings. Every field has a default; an empty object is a valid config.

use crate::cluster::{ClusterMapping, ClusterTable};
use crate::error::{AuditError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for the audit normalizer and its pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditConfig {
    /// Known clusters, matched in order
    #[serde(default)]
    pub clusters: Vec<ClusterMapping>,

    /// Code for servers that match no cluster (raw identifier kept if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown_cluster_code: Option<String>,

    /// Maximum rejected messages retained by the in-memory dead-letter queue
    ///
    /// 0 means unbounded.
    #[serde(default = "default_dead_letter_capacity")]
    pub dead_letter_capacity: usize,
}

fn default_dead_letter_capacity() -> usize {
    10_000
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            clusters: Vec::new(),
            unknown_cluster_code: None,
            dead_letter_capacity: default_dead_letter_capacity(),
        }
    }
}

impl AuditConfig {
    /// Parse and validate a JSON config document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: AuditConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            AuditError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config = Self::from_json(&json)?;
        tracing::debug!(
            path = %path.display(),
            clusters = config.clusters.len(),
            "Audit config loaded"
        );
        Ok(config)
    }

    /// Reject mappings that could never match or would resolve to nothing
    pub fn validate(&self) -> Result<()> {
        for (i, mapping) in self.clusters.iter().enumerate() {
            if mapping.code.trim().is_empty() {
                return Err(AuditError::Config(format!(
                    "Cluster mapping #{} has an empty code",
                    i
                )));
            }
            if mapping.short_name.trim().is_empty() {
                return Err(AuditError::Config(format!(
                    "Cluster mapping '{}' has an empty short name",
                    mapping.code
                )));
            }
        }
        if matches!(self.unknown_cluster_code.as_deref(), Some(code) if code.trim().is_empty()) {
            return Err(AuditError::Config(
                "Unknown cluster code cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the cluster lookup table described by this config
    pub fn cluster_table(&self) -> ClusterTable {
        let table = ClusterTable::new(self.clusters.clone());
        match &self.unknown_cluster_code {
            Some(code) => table.with_unknown_code(code.clone()),
            None => table,
        }
    }
}
