//! Persistence for the append-only audit trail.

use crate::audit::entry::AuditLogEntry;
use crate::error::StorageError;
use sled::Tree;

/// Append-only audit sink. The trait seam keeps the recorder testable against
/// failing stores.
pub trait AuditStore: Send + Sync {
    fn append(&self, entry: &AuditLogEntry) -> Result<(), StorageError>;

    /// All entries, newest first.
    fn scan_newest(&self) -> Result<Vec<AuditLogEntry>, StorageError>;

    /// Delete entries older than the cutoff; returns the deleted count.
    fn purge_older_than(&self, cutoff_ms: u64) -> Result<usize, StorageError>;
}

/// Sled-backed audit store. Keys are big-endian `(timestamp_ms, seq)` so the
/// tree iterates in write order and reverse iteration yields newest first.
pub struct SledAuditStore {
    db: sled::Db,
    tree: Tree,
}

impl SledAuditStore {
    pub const TREE_NAME: &'static str = "audit_log";

    pub fn new(db: &sled::Db) -> Result<Self, StorageError> {
        let tree = db.open_tree(Self::TREE_NAME)?;
        Ok(Self {
            db: db.clone(),
            tree,
        })
    }

    fn key(timestamp_ms: u64, seq: u64) -> [u8; 16] {
        let mut key = [0u8; 16];
        key[..8].copy_from_slice(&timestamp_ms.to_be_bytes());
        key[8..].copy_from_slice(&seq.to_be_bytes());
        key
    }

    fn decode(value: &[u8]) -> Result<AuditLogEntry, StorageError> {
        bincode::deserialize(value)
            .map_err(|e| StorageError::Serialization(format!("audit entry decode: {e}")))
    }
}

impl AuditStore for SledAuditStore {
    fn append(&self, entry: &AuditLogEntry) -> Result<(), StorageError> {
        // Persisted monotonic id keeps same-millisecond keys distinct across
        // process restarts.
        let seq = self.db.generate_id()?;
        let key = Self::key(entry.timestamp_ms, seq);
        let value = bincode::serialize(entry)
            .map_err(|e| StorageError::Serialization(format!("audit entry encode: {e}")))?;
        self.tree.insert(key, value)?;
        Ok(())
    }

    fn scan_newest(&self) -> Result<Vec<AuditLogEntry>, StorageError> {
        let mut entries = Vec::new();
        for item in self.tree.iter().rev() {
            let (_, value) = item?;
            entries.push(Self::decode(&value)?);
        }
        Ok(entries)
    }

    fn purge_older_than(&self, cutoff_ms: u64) -> Result<usize, StorageError> {
        let boundary = Self::key(cutoff_ms, 0);
        let mut deleted = 0usize;
        let keys: Vec<_> = self
            .tree
            .range(..boundary)
            .keys()
            .collect::<Result<_, _>>()?;
        for key in keys {
            self.tree.remove(key)?;
            deleted += 1;
        }
        Ok(deleted)
    }
}
