//! Audit Recorder
//!
//! Append-only log of workflow transitions and generation/export events.
//! Recording is best-effort by contract: a failure to persist an entry is
//! logged to the diagnostic channel and never surfaces to the caller.

pub mod entry;
pub mod sink;
pub mod store;

pub use entry::{AuditAction, AuditLogEntry, InvocationDetail};
pub use store::{AuditStore, SledAuditStore};

use crate::error::StorageError;
use crate::invocation::InvocationNumber;
use crate::types::{millis_of, now_millis, CourseId, UserId};
use chrono::{DateTime, Utc};
use sink::{AuditBus, AuditIngestor, SharedIngestor};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

const MILLIS_PER_DAY: u64 = 24 * 60 * 60 * 1000;
const DEFAULT_TRAIL_LIMIT: usize = 100;

/// Filters for a per-course trail query.
#[derive(Debug, Clone, Default)]
pub struct CourseTrailOptions {
    pub limit: Option<usize>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Filters for a per-user trail query.
#[derive(Debug, Clone, Default)]
pub struct UserTrailOptions {
    pub limit: Option<usize>,
    pub actions: Vec<AuditAction>,
}

/// Per-invocation aggregate over a time window.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationStat {
    pub invocation: InvocationNumber,
    pub completed: u64,
    pub failed: u64,
    pub avg_duration_ms: Option<f64>,
}

/// Best-effort audit recorder: bus in front, ingestor drain, sled behind.
#[derive(Clone)]
pub struct AuditRecorder {
    bus: AuditBus,
    ingestor: SharedIngestor,
    store: Arc<dyn AuditStore>,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        let (bus, receiver) = AuditBus::new_pair();
        let ingestor = SharedIngestor::new(AuditIngestor::new(store.clone(), receiver));
        Self {
            bus,
            ingestor,
            store,
        }
    }

    pub fn sled(db: &sled::Db) -> Result<Self, StorageError> {
        Ok(Self::new(Arc::new(SledAuditStore::new(db)?)))
    }

    /// Fire-and-forget: persistence failures are logged, never propagated.
    pub fn record(&self, entry: AuditLogEntry) {
        let action = entry.action;
        if let Err(err) = self.bus.emit(entry) {
            warn!(action = action.as_str(), error = %err, "failed to enqueue audit entry");
            return;
        }
        if let Err(err) = self.ingestor.drain() {
            warn!(action = action.as_str(), error = %err, "failed to persist audit entry");
        }
    }

    /// Successful generation round-trip for an invocation.
    pub fn record_invocation_completed(
        &self,
        user_id: UserId,
        course_id: CourseId,
        invocation: InvocationNumber,
        duration_ms: u64,
        metadata: serde_json::Value,
    ) {
        self.record(
            AuditLogEntry::new(AuditAction::InvocationCompleted, user_id)
                .course(course_id)
                .invocation(invocation, Some(duration_ms))
                .metadata(metadata),
        );
    }

    /// Failed generation round-trip for an invocation.
    pub fn record_invocation_failed(
        &self,
        user_id: UserId,
        course_id: CourseId,
        invocation: InvocationNumber,
        duration_ms: u64,
        error: &str,
    ) {
        self.record(
            AuditLogEntry::new(AuditAction::InvocationFailed, user_id)
                .course(course_id)
                .invocation(invocation, Some(duration_ms))
                .failed(error),
        );
    }

    /// Entries for one course, newest first.
    pub fn course_trail(
        &self,
        course_id: &CourseId,
        options: &CourseTrailOptions,
    ) -> Result<Vec<AuditLogEntry>, StorageError> {
        let start_ms = options.start.map(millis_of);
        let end_ms = options.end.map(millis_of);
        let limit = options.limit.unwrap_or(DEFAULT_TRAIL_LIMIT);
        Ok(self
            .store
            .scan_newest()?
            .into_iter()
            .filter(|e| e.course_id.as_ref() == Some(course_id))
            .filter(|e| start_ms.map_or(true, |s| e.timestamp_ms >= s))
            .filter(|e| end_ms.map_or(true, |s| e.timestamp_ms <= s))
            .take(limit)
            .collect())
    }

    /// Entries for one user, newest first, optionally filtered by action.
    pub fn user_trail(
        &self,
        user_id: &UserId,
        options: &UserTrailOptions,
    ) -> Result<Vec<AuditLogEntry>, StorageError> {
        let limit = options.limit.unwrap_or(DEFAULT_TRAIL_LIMIT);
        Ok(self
            .store
            .scan_newest()?
            .into_iter()
            .filter(|e| &e.user_id == user_id)
            .filter(|e| options.actions.is_empty() || options.actions.contains(&e.action))
            .take(limit)
            .collect())
    }

    /// Completed/failed counts and average generation duration per
    /// invocation over the trailing window.
    pub fn invocation_stats(
        &self,
        time_range_days: u32,
    ) -> Result<Vec<InvocationStat>, StorageError> {
        let cutoff = now_millis().saturating_sub(time_range_days as u64 * MILLIS_PER_DAY);
        let mut grouped: BTreeMap<InvocationNumber, (u64, u64, u64, u64)> = BTreeMap::new();

        for entry in self.store.scan_newest()? {
            if entry.timestamp_ms < cutoff {
                continue;
            }
            let Some(detail) = &entry.invocation else {
                continue;
            };
            let bucket = match entry.action {
                AuditAction::InvocationCompleted | AuditAction::InvocationFailed => {
                    grouped.entry(detail.number).or_default()
                }
                _ => continue,
            };
            if entry.success {
                bucket.0 += 1;
            } else {
                bucket.1 += 1;
            }
            if let Some(duration) = detail.duration_ms {
                bucket.2 += duration;
                bucket.3 += 1;
            }
        }

        Ok(grouped
            .into_iter()
            .map(
                |(invocation, (completed, failed, duration_sum, duration_count))| InvocationStat {
                    invocation,
                    completed,
                    failed,
                    avg_duration_ms: (duration_count > 0)
                        .then(|| duration_sum as f64 / duration_count as f64),
                },
            )
            .collect())
    }

    /// Purge entries older than the retention window; returns deleted count.
    pub fn clean_old_logs(&self, days_to_keep: u32) -> Result<usize, StorageError> {
        let cutoff = now_millis().saturating_sub(days_to_keep as u64 * MILLIS_PER_DAY);
        self.store.purge_older_than(cutoff)
    }
}
