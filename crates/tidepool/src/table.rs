//! Logical table handles and partition-key derivation.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// How a table maps row keys onto the shard keyspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partitioning {
    /// Rows are placed by a 16-bit hash prefix derived from the row key.
    Hash,
    /// Rows are placed by the raw row key, lexicographically.
    Range,
}

/// Logical reference to a partitioned table.
#[derive(Debug, Clone)]
pub struct TableHandle {
    name: String,
    partitioning: Partitioning,
}

impl TableHandle {
    pub fn new(name: impl Into<String>, partitioning: Partitioning) -> Self {
        Self {
            name: name.into(),
            partitioning,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn partitioning(&self) -> Partitioning {
        self.partitioning
    }

    pub fn is_hash_partitioned(&self) -> bool {
        self.partitioning == Partitioning::Hash
    }

    /// Derive the partition key bytes for a row key. Hash tables prefix the
    /// big-endian 16-bit hash so shard ranges cover the same byte space as
    /// range tables. An empty row key yields an empty partition key.
    pub fn partition_key(&self, row_key: &[u8]) -> Vec<u8> {
        if row_key.is_empty() {
            return Vec::new();
        }
        match self.partitioning {
            Partitioning::Hash => {
                let mut out = hash_code(row_key).to_be_bytes().to_vec();
                out.extend_from_slice(row_key);
                out
            }
            Partitioning::Range => row_key.to_vec(),
        }
    }
}

/// Decode the 16-bit hash prefix from a hash-partition key.
pub fn decode_hash_prefix(partition_key: &[u8]) -> Option<u16> {
    if partition_key.len() < 2 {
        return None;
    }
    Some(u16::from_be_bytes([partition_key[0], partition_key[1]]))
}

fn hash_code(bytes: &[u8]) -> u16 {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    (hasher.finish() & 0xffff) as u16
}
