//! SQLite record store

use super::{Record, RecordStore, StoreTransaction, StoredRecord};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Row, Sqlite, Transaction};
use std::str::FromStr;
use std::time::Duration;

const MAX_CONNECTIONS: u32 = 2;

/// Record store backed by a SQLite database.
///
/// The table name has been checked to be a plain identifier when the
/// configuration was validated; it is still quoted in every statement.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    table: String,
}

impl SqliteStore {
    /// Connect to a database URL such as `sqlite:///var/lib/weewx/upload.sdb`.
    ///
    /// The database file is created if it does not exist.
    pub async fn connect(url: &str, table: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_millis(1500));
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;
        tracing::debug!(url, table, "Connected to record store");
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    /// Connect to a private in-memory database.
    pub async fn connect_in_memory(table: &str) -> Result<Self> {
        // One connection, otherwise every pooled connection sees its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?)
            .await?;
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Read a row back.
    pub async fn fetch(&self, id: &str) -> Result<Option<StoredRecord>> {
        let sql = format!(
            "SELECT id, text, content_type, modification_time FROM \"{}\" WHERE id = ?",
            self.table
        );
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.map(|row| -> Result<StoredRecord> {
            Ok(StoredRecord {
                id: row.try_get("id")?,
                payload: row.try_get::<Option<Vec<u8>>, _>("text")?.unwrap_or_default(),
                content_type: row.try_get("content_type")?,
                modification_time: row.try_get::<Option<DateTime<Utc>>, _>("modification_time")?,
            })
        })
        .transpose()
    }

    /// Number of rows in the table.
    pub async fn count(&self) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM \"{}\"", self.table);
        let (count,): (i64,) = sqlx::query_as(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn prepare(&self) -> Result<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (
                id TEXT PRIMARY KEY NOT NULL,
                modification_time TIMESTAMP,
                content_type TEXT,
                text BLOB
            )",
            self.table
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        tracing::debug!(table = %self.table, "Prepared record table");
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteTransaction {
            tx,
            table: self.table.clone(),
        }))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
    table: String,
}

#[async_trait]
impl StoreTransaction for SqliteTransaction {
    async fn ensure_row(&mut self, id: &str) -> Result<()> {
        let sql = format!("INSERT OR IGNORE INTO \"{}\" (id, text) VALUES (?, ?)", self.table);
        sqlx::query(&sql)
            .bind(id)
            .bind(Vec::<u8>::new())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn update(&mut self, record: &Record<'_>) -> Result<()> {
        let sql = format!(
            "UPDATE \"{}\" SET text = ?, content_type = ?, modification_time = ? WHERE id = ?",
            self.table
        );
        let updated = sqlx::query(&sql)
            .bind(record.payload)
            .bind(record.content_type)
            .bind(record.modification_time)
            .bind(record.id)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        if updated == 0 {
            let sql = format!(
                "INSERT INTO \"{}\" (id, text, content_type, modification_time) VALUES (?, ?, ?, ?)",
                self.table
            );
            sqlx::query(&sql)
                .bind(record.id)
                .bind(record.payload)
                .bind(record.content_type)
                .bind(record.modification_time)
                .execute(&mut *self.tx)
                .await?;
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| Error::store(format!("commit failed: {e}")))
    }
}
