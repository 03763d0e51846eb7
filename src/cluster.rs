//! Cluster code resolution
//!
//! Maps the raw `server` identifier found in an audit header to a canonical
//! cluster code. Resolution is a pure in-memory lookup.

use serde::{Deserialize, Serialize};

/// Trait for mapping raw server identifiers to canonical cluster codes
///
/// Implementations must be total: every input yields some code, possibly an
/// "unknown" sentinel.
pub trait ClusterResolver: Send + Sync {
    fn resolve_cluster_code(&self, raw_server: &str) -> String;
}

impl<F> ClusterResolver for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn resolve_cluster_code(&self, raw_server: &str) -> String {
        self(raw_server)
    }
}

/// One known cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMapping {
    /// Canonical cluster code (e.g., "ltx1-holdem")
    pub code: String,

    /// Token that identifies the cluster inside raw server names
    pub short_name: String,
}

impl ClusterMapping {
    pub fn new(code: impl Into<String>, short_name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            short_name: short_name.into(),
        }
    }
}

/// Ordered cluster lookup table
///
/// The first mapping whose short name occurs in the raw identifier (ASCII
/// case-insensitive) wins. Unmatched identifiers resolve to the unknown code
/// when one is configured, otherwise they pass through unchanged.
#[derive(Debug, Clone, Default)]
pub struct ClusterTable {
    mappings: Vec<ClusterMapping>,
    unknown_code: Option<String>,
}

impl ClusterTable {
    pub fn new(mappings: Vec<ClusterMapping>) -> Self {
        Self {
            mappings,
            unknown_code: None,
        }
    }

    /// Resolve unmatched identifiers to `code` instead of passing them through
    pub fn with_unknown_code(mut self, code: impl Into<String>) -> Self {
        self.unknown_code = Some(code.into());
        self
    }

    pub fn mappings(&self) -> &[ClusterMapping] {
        &self.mappings
    }

    fn matching(&self, raw_server: &str) -> Option<&ClusterMapping> {
        let raw = raw_server.to_ascii_lowercase();
        self.mappings
            .iter()
            .find(|m| raw.contains(&m.short_name.to_ascii_lowercase()))
    }
}

impl ClusterResolver for ClusterTable {
    fn resolve_cluster_code(&self, raw_server: &str) -> String {
        match self.matching(raw_server) {
            Some(mapping) => mapping.code.clone(),
            None => {
                tracing::trace!(server = raw_server, "No cluster mapping matched");
                self.unknown_code
                    .clone()
                    .unwrap_or_else(|| raw_server.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ClusterTable {
        ClusterTable::new(vec![
            ClusterMapping::new("ltx1-holdem", "holdem"),
            ClusterMapping::new("ltx1-war", "war"),
            ClusterMapping::new("ltx1-warpspeed", "warpspeed"),
        ])
    }

    #[test]
    fn test_resolve_by_short_name() {
        let t = table();
        assert_eq!(
            t.resolve_cluster_code("ltx1-holdemnn01.grid.example.com"),
            "ltx1-holdem"
        );
        assert_eq!(t.resolve_cluster_code("LTX1-HOLDEMNN01"), "ltx1-holdem");
    }

    #[test]
    fn test_first_match_wins() {
        // "war" is listed before "warpspeed", so it shadows it
        assert_eq!(table().resolve_cluster_code("warpspeed-nn01"), "ltx1-war");
    }

    #[test]
    fn test_unmatched_passes_through() {
        assert_eq!(table().resolve_cluster_code("cluster-a-raw"), "cluster-a-raw");
        assert_eq!(ClusterTable::default().resolve_cluster_code(""), "");
    }

    #[test]
    fn test_unmatched_uses_unknown_code() {
        let t = table().with_unknown_code("UNKNOWN");
        assert_eq!(t.resolve_cluster_code("cluster-a-raw"), "UNKNOWN");
        assert_eq!(t.resolve_cluster_code("holdem-gw"), "ltx1-holdem");
    }

    #[test]
    fn test_closure_resolver() {
        let resolver = |raw: &str| format!("code:{}", raw);
        assert_eq!(resolver.resolve_cluster_code("x"), "code:x");
    }
}
