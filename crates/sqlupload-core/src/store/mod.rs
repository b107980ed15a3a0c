//! Record store capability
//!
//! The orchestrator only needs a transactional upsert keyed by artifact id:
//!
//! - `prepare` creates the table when absent (`id` primary key,
//!   `modification_time`, `content_type`, `text` blob)
//! - `ensure_row` inserts an empty identity row if none exists
//! - `update` sets `text`, `content_type` and `modification_time`
//!
//! [`SqliteStore`] talks to a real database, [`MemoryStore`] records every
//! operation for tests, and [`DryRunStore`] only logs.

mod dry_run;
mod memory;
mod sqlite;

pub use dry_run::DryRunStore;
pub use memory::{MemoryStore, StoreOp};
pub use sqlite::SqliteStore;

use crate::config::StoreSection;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One row to write.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    pub id: &'a str,
    pub payload: &'a [u8],
    pub content_type: &'a str,
    pub modification_time: DateTime<Utc>,
}

/// One row as read back from a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub id: String,
    pub payload: Vec<u8>,
    pub content_type: Option<String>,
    pub modification_time: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create the record table if it does not exist.
    async fn prepare(&self) -> Result<()>;

    /// Start the transaction a whole run is issued against.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;

    /// Release the connection.
    async fn close(&self);

    /// Write a single record in its own transaction.
    async fn upsert(&self, record: &Record<'_>) -> Result<()> {
        let mut tx = self.begin().await?;
        tx.update(record).await?;
        tx.commit().await
    }
}

/// A store transaction. Dropping it without [`commit`](Self::commit)
/// discards every write.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn ensure_row(&mut self, id: &str) -> Result<()>;

    /// Update a row, inserting it when it does not exist yet.
    async fn update(&mut self, record: &Record<'_>) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Opens stores on demand; used where a connection may have to be reopened.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn RecordStore>>;
}

/// Connector for the configured store.
#[derive(Debug, Clone)]
pub struct ConfiguredStore {
    settings: StoreSection,
    dry_run: bool,
}

impl ConfiguredStore {
    pub fn new(settings: StoreSection, dry_run: bool) -> Self {
        Self { settings, dry_run }
    }
}

#[async_trait]
impl StoreConnector for ConfiguredStore {
    async fn connect(&self) -> Result<Box<dyn RecordStore>> {
        let table = self.settings.table().to_string();
        if self.dry_run {
            return Ok(Box::new(DryRunStore::new(table)));
        }
        let database = self
            .settings
            .database
            .as_deref()
            .ok_or_else(|| Error::config("store.database is required"))?;
        Ok(Box::new(SqliteStore::connect(database, &table).await?))
    }
}
