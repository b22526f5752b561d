//! In-process bus and drain for audit entries.
//!
//! The bus decouples the critical path from persistence: callers enqueue and
//! move on; the ingestor drains pending entries into the store.

use crate::audit::entry::AuditLogEntry;
use crate::audit::store::AuditStore;
use crate::error::StorageError;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct AuditBus {
    sender: Sender<AuditLogEntry>,
}

impl AuditBus {
    pub fn new_pair() -> (Self, Receiver<AuditLogEntry>) {
        let (sender, receiver) = channel();
        (Self { sender }, receiver)
    }

    pub fn emit(
        &self,
        entry: AuditLogEntry,
    ) -> Result<(), std::sync::mpsc::SendError<AuditLogEntry>> {
        self.sender.send(entry)
    }
}

pub struct AuditIngestor {
    store: Arc<dyn AuditStore>,
    receiver: Receiver<AuditLogEntry>,
}

impl AuditIngestor {
    pub fn new(store: Arc<dyn AuditStore>, receiver: Receiver<AuditLogEntry>) -> Self {
        Self { store, receiver }
    }

    pub fn ingest_pending(&mut self) -> Result<usize, StorageError> {
        let mut count = 0usize;
        while let Ok(entry) = self.receiver.try_recv() {
            self.store.append(&entry)?;
            count += 1;
        }
        Ok(count)
    }
}

#[derive(Clone)]
pub struct SharedIngestor(Arc<Mutex<AuditIngestor>>);

impl SharedIngestor {
    pub fn new(inner: AuditIngestor) -> Self {
        Self(Arc::new(Mutex::new(inner)))
    }

    pub fn drain(&self) -> Result<usize, StorageError> {
        let mut guard = self.0.lock().expect("audit ingestor lock poisoned");
        guard.ingest_pending()
    }
}
