//! Live telemetry upload
//!
//! Measurement packets arrive every few seconds. Producers hand them to a
//! small bounded queue and never wait: when the queue is full the packet is
//! dropped and an error is returned. One worker drains the queue and writes
//! each packet as a JSON row keyed by its binding (`loop` or `archive`).
//! A failed write is logged and not retried; the connection is dropped and
//! reopened for the next packet.

use crate::store::{Record, RecordStore, StoreConnector};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Queue capacity between producers and the worker.
pub const QUEUE_CAPACITY: usize = 5;

/// Which capture path produced a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Binding {
    Loop,
    Archive,
}

impl Binding {
    /// Row id the packet is stored under.
    pub fn record_id(&self) -> &'static str {
        match self {
            Binding::Loop => "loop",
            Binding::Archive => "archive",
        }
    }
}

/// One measurement packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPacket {
    pub binding: Binding,
    /// Observation fields, including `dateTime` when present
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl TelemetryPacket {
    /// Parse one newline-delimited JSON packet.
    pub fn from_json(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }

    /// Observation time from the `dateTime` field.
    pub fn date_time(&self) -> Option<DateTime<Utc>> {
        let value = self.fields.get("dateTime")?;
        let secs = value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))?;
        DateTime::from_timestamp(secs, 0)
    }
}

/// Counters reported by the worker when it exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub uploaded: usize,
    pub failed: usize,
}

/// Producer handle for the telemetry worker.
pub struct TelemetryUploader {
    tx: mpsc::Sender<TelemetryPacket>,
    stop: watch::Sender<bool>,
    worker: JoinHandle<WorkerStats>,
}

impl TelemetryUploader {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn(connector: Arc<dyn StoreConnector>) -> Self {
        Self::with_capacity(connector, QUEUE_CAPACITY)
    }

    pub fn with_capacity(connector: Arc<dyn StoreConnector>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        let (stop, stop_rx) = watch::channel(false);
        let worker = tokio::spawn(run_worker(connector, rx, stop_rx));
        Self { tx, stop, worker }
    }

    /// Queue a packet without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Telemetry`] when the queue is full or the worker has
    /// stopped. The packet is dropped in both cases.
    pub fn submit(&self, packet: TelemetryPacket) -> Result<()> {
        match self.tx.try_send(packet) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(packet)) => {
                tracing::warn!(binding = ?packet.binding, "Telemetry queue full, dropping packet");
                Err(Error::Telemetry {
                    message: "queue full".to_string(),
                })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(Error::Telemetry {
                message: "worker stopped".to_string(),
            }),
        }
    }

    /// Stop accepting packets, let the worker drain the queue, and wait.
    pub async fn finish(self) -> WorkerStats {
        let Self { tx, stop, worker } = self;
        drop(tx);
        let stats = join(worker).await;
        drop(stop);
        stats
    }

    /// Ask the worker to exit after its current packet, and wait.
    pub async fn shutdown(self) -> WorkerStats {
        let Self { tx, stop, worker } = self;
        // Receiver may already be gone when the worker exited on its own
        let _ = stop.send(true);
        drop(tx);
        join(worker).await
    }
}

async fn join(worker: JoinHandle<WorkerStats>) -> WorkerStats {
    worker.await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Telemetry worker panicked");
        WorkerStats::default()
    })
}

async fn run_worker(
    connector: Arc<dyn StoreConnector>,
    mut rx: mpsc::Receiver<TelemetryPacket>,
    mut stop: watch::Receiver<bool>,
) -> WorkerStats {
    tracing::debug!("Telemetry worker started");
    let mut store: Option<Box<dyn RecordStore>> = None;
    let mut stats = WorkerStats::default();

    loop {
        let packet = tokio::select! {
            biased;
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
                continue;
            }
            packet = rx.recv() => match packet {
                Some(packet) => packet,
                None => break,
            },
        };

        match upload(connector.as_ref(), &mut store, &packet).await {
            Ok(()) => stats.uploaded += 1,
            Err(e) => {
                stats.failed += 1;
                tracing::error!(binding = ?packet.binding, error = %e, "Telemetry upload failed");
                if let Some(store) = store.take() {
                    store.close().await;
                }
            }
        }
    }

    if let Some(store) = store.take() {
        store.close().await;
    }
    tracing::debug!(uploaded = stats.uploaded, failed = stats.failed, "Telemetry worker stopped");
    stats
}

async fn upload(
    connector: &dyn StoreConnector,
    store: &mut Option<Box<dyn RecordStore>>,
    packet: &TelemetryPacket,
) -> Result<()> {
    if store.is_none() {
        let connected = connector.connect().await?;
        connected.prepare().await?;
        *store = Some(connected);
    }
    let Some(store) = store.as_ref() else {
        return Err(Error::store("no connection"));
    };

    let payload = serde_json::to_vec(&packet.fields)?;
    store
        .upsert(&Record {
            id: packet.binding.record_id(),
            payload: &payload,
            content_type: "application/json",
            modification_time: packet.date_time().unwrap_or_else(Utc::now),
        })
        .await?;
    tracing::trace!(binding = ?packet.binding, bytes = payload.len(), "Uploaded telemetry packet");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_parses_binding_and_fields() {
        let packet =
            TelemetryPacket::from_json(r#"{"binding":"loop","dateTime":1700000000,"outTemp":21.5}"#)
                .unwrap();
        assert_eq!(packet.binding, Binding::Loop);
        assert_eq!(packet.fields["outTemp"], 21.5);
        assert!(!packet.fields.contains_key("binding"));
        assert_eq!(packet.date_time().unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn unknown_binding_is_rejected() {
        assert!(TelemetryPacket::from_json(r#"{"binding":"report"}"#).is_err());
    }
}
