//! Store that logs what would be written

use super::{Record, RecordStore, StoreTransaction};
use crate::Result;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct DryRunStore {
    table: String,
}

impl DryRunStore {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }
}

#[async_trait]
impl RecordStore for DryRunStore {
    async fn prepare(&self) -> Result<()> {
        tracing::info!(table = %self.table, "[dry-run] Would create record table if absent");
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        tracing::info!(table = %self.table, "[dry-run] Would begin transaction");
        Ok(Box::new(DryRunTransaction {
            table: self.table.clone(),
        }))
    }

    async fn close(&self) {
        tracing::info!(table = %self.table, "[dry-run] Would close connection");
    }
}

struct DryRunTransaction {
    table: String,
}

#[async_trait]
impl StoreTransaction for DryRunTransaction {
    async fn ensure_row(&mut self, id: &str) -> Result<()> {
        tracing::info!(table = %self.table, id, "[dry-run] Would insert identity row");
        Ok(())
    }

    async fn update(&mut self, record: &Record<'_>) -> Result<()> {
        tracing::info!(
            table = %self.table,
            id = record.id,
            content_type = record.content_type,
            bytes = record.payload.len(),
            "[dry-run] Would update row"
        );
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        tracing::info!(table = %self.table, "[dry-run] Would commit");
        Ok(())
    }
}
