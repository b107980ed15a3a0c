//! In-memory record store that records every operation

use super::{Record, RecordStore, StoreConnector, StoreTransaction, StoredRecord};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// One operation issued against a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Prepare,
    Begin,
    EnsureRow(String),
    Update(String),
    Commit,
    Close,
}

#[derive(Debug, Default)]
struct State {
    rows: BTreeMap<String, StoredRecord>,
    ops: Vec<StoreOp>,
    failing: HashSet<String>,
    fail_prepare: bool,
    fail_connect: bool,
    fail_commit: bool,
}

/// Shared in-memory store. Clones see the same rows and operation log.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means another test thread panicked
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every `update` for `id` fail.
    pub fn fail_updates_for(&self, id: &str) {
        self.lock().failing.insert(id.to_string());
    }

    pub fn fail_prepare(&self, fail: bool) {
        self.lock().fail_prepare = fail;
    }

    /// Make every commit fail, discarding the transaction.
    pub fn fail_commit(&self, fail: bool) {
        self.lock().fail_commit = fail;
    }

    /// Make [`StoreConnector::connect`] fail.
    pub fn fail_connect(&self, fail: bool) {
        self.lock().fail_connect = fail;
    }

    /// Committed row for `id`.
    pub fn get(&self, id: &str) -> Option<StoredRecord> {
        self.lock().rows.get(id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        self.lock().rows.keys().cloned().collect()
    }

    pub fn ops(&self) -> Vec<StoreOp> {
        self.lock().ops.clone()
    }

    /// Number of `ensure_row` and `update` operations issued.
    pub fn write_count(&self) -> usize {
        self.lock()
            .ops
            .iter()
            .filter(|op| matches!(op, StoreOp::EnsureRow(_) | StoreOp::Update(_)))
            .count()
    }

    pub fn clear_ops(&self) {
        self.lock().ops.clear();
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn prepare(&self) -> Result<()> {
        let mut state = self.lock();
        state.ops.push(StoreOp::Prepare);
        if state.fail_prepare {
            return Err(Error::store("prepare failed"));
        }
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        self.lock().ops.push(StoreOp::Begin);
        Ok(Box::new(MemoryTransaction {
            store: self.clone(),
            pending: BTreeMap::new(),
        }))
    }

    async fn close(&self) {
        self.lock().ops.push(StoreOp::Close);
    }
}

#[async_trait]
impl StoreConnector for MemoryStore {
    async fn connect(&self) -> Result<Box<dyn RecordStore>> {
        if self.lock().fail_connect {
            return Err(Error::store("connection refused"));
        }
        Ok(Box::new(self.clone()))
    }
}

struct MemoryTransaction {
    store: MemoryStore,
    pending: BTreeMap<String, Option<StoredRecord>>,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn ensure_row(&mut self, id: &str) -> Result<()> {
        self.store.lock().ops.push(StoreOp::EnsureRow(id.to_string()));
        self.pending.entry(id.to_string()).or_insert(None);
        Ok(())
    }

    async fn update(&mut self, record: &Record<'_>) -> Result<()> {
        {
            let mut state = self.store.lock();
            state.ops.push(StoreOp::Update(record.id.to_string()));
            if state.failing.contains(record.id) {
                return Err(Error::store(format!("update of '{}' failed", record.id)));
            }
        }
        self.pending.insert(
            record.id.to_string(),
            Some(StoredRecord {
                id: record.id.to_string(),
                payload: record.payload.to_vec(),
                content_type: Some(record.content_type.to_string()),
                modification_time: Some(record.modification_time),
            }),
        );
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction { store, pending } = *self;
        let mut state = store.lock();
        state.ops.push(StoreOp::Commit);
        if state.fail_commit {
            return Err(Error::store("commit failed"));
        }
        for (id, row) in pending {
            match row {
                Some(row) => {
                    state.rows.insert(id, row);
                }
                None => {
                    state.rows.entry(id.clone()).or_insert(StoredRecord {
                        id,
                        payload: Vec::new(),
                        content_type: None,
                        modification_time: None,
                    });
                }
            }
        }
        Ok(())
    }
}
