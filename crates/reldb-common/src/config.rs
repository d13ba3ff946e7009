//! Configuration structures for the reldb engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which associative structure backs a table's primary-key index.
///
/// All three expose the same mapping contract; the B+-tree additionally
/// supports ordered range scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IndexKind {
    /// Order-preserving B+-tree map.
    #[default]
    BTree,
    /// Extendible-hashing map (directory doubling).
    ExtHash,
    /// Linear-hashing map (split pointer, overflow chains).
    LinHash,
}

/// Storage configuration for the reldb engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Index structure backing new tables.
    pub index_kind: IndexKind,
    /// Maximum fanout for B+-tree nodes.
    pub btree_order: usize,
    /// Initial bucket count for the hashed indexes (a power of two).
    pub initial_buckets: usize,
    /// Directory for named table snapshots.
    pub snapshot_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            index_kind: IndexKind::BTree,
            btree_order: 5,
            initial_buckets: 4,
            snapshot_dir: PathBuf::from("./store"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.index_kind, IndexKind::BTree);
        assert_eq!(config.btree_order, 5);
        assert_eq!(config.initial_buckets, 4);
        assert_eq!(config.snapshot_dir, PathBuf::from("./store"));
    }

    #[test]
    fn test_custom_config() {
        let config = StoreConfig {
            index_kind: IndexKind::LinHash,
            btree_order: 64,
            initial_buckets: 16,
            snapshot_dir: PathBuf::from("/var/lib/reldb"),
        };

        assert_eq!(config.index_kind, IndexKind::LinHash);
        assert_eq!(config.btree_order, 64);
        assert_eq!(config.initial_buckets, 16);
        assert_eq!(config.snapshot_dir, PathBuf::from("/var/lib/reldb"));
    }

    #[test]
    fn test_index_kind_default() {
        assert_eq!(IndexKind::default(), IndexKind::BTree);
    }

    #[test]
    fn test_index_kind_clone_copy() {
        let k1 = IndexKind::ExtHash;
        let k2 = k1;
        let k3 = k1.clone();
        assert_eq!(k1, k2);
        assert_eq!(k1, k3);
    }

    #[test]
    fn test_serde_roundtrip() {
        let original = StoreConfig {
            index_kind: IndexKind::ExtHash,
            ..Default::default()
        };
        let serialized = serde_json::to_string(&original).unwrap();
        let deserialized: StoreConfig = serde_json::from_str(&serialized).unwrap();

        assert_eq!(original.index_kind, deserialized.index_kind);
        assert_eq!(original.btree_order, deserialized.btree_order);
        assert_eq!(original.initial_buckets, deserialized.initial_buckets);
        assert_eq!(original.snapshot_dir, deserialized.snapshot_dir);
    }

    #[test]
    fn test_index_kind_serde_roundtrip() {
        for kind in [IndexKind::BTree, IndexKind::ExtHash, IndexKind::LinHash] {
            let serialized = serde_json::to_string(&kind).unwrap();
            let deserialized: IndexKind = serde_json::from_str(&serialized).unwrap();
            assert_eq!(kind, deserialized);
        }
    }
}
