//! Tests for the telemetry queue and worker

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use sqlupload_core::Error;
use sqlupload_core::store::MemoryStore;
use sqlupload_core::telemetry::{Binding, TelemetryPacket, TelemetryUploader, WorkerStats};
use std::sync::Arc;
use std::time::Duration;

fn packet(binding: &str, temperature: f64) -> TelemetryPacket {
    TelemetryPacket::from_json(
        &json!({ "binding": binding, "dateTime": 1_700_000_000, "outTemp": temperature }).to_string(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_packets_are_stored_by_binding() {
    let store = MemoryStore::new();
    let uploader = TelemetryUploader::spawn(Arc::new(store.clone()));

    uploader.submit(packet("loop", 21.3)).unwrap();
    uploader.submit(packet("archive", 20.9)).unwrap();
    uploader.submit(packet("loop", 21.4)).unwrap();
    let stats = uploader.finish().await;

    assert_eq!(stats, WorkerStats { uploaded: 3, failed: 0 });
    assert_eq!(store.ids(), vec!["archive".to_string(), "loop".to_string()]);

    let row = store.get("loop").unwrap();
    let fields: Value = serde_json::from_slice(&row.payload).unwrap();
    assert_eq!(fields["outTemp"], 21.4);
    assert!(fields.get("binding").is_none());
    assert_eq!(row.content_type.as_deref(), Some("application/json"));
    assert_eq!(row.modification_time.unwrap().timestamp(), 1_700_000_000);
}

#[tokio::test]
async fn test_full_queue_drops_packet() {
    // The current-thread runtime does not run the worker until we yield
    let store = MemoryStore::new();
    let uploader = TelemetryUploader::with_capacity(Arc::new(store.clone()), 1);

    uploader.submit(packet("loop", 1.0)).unwrap();
    let err = uploader.submit(packet("loop", 2.0)).unwrap_err();
    assert!(matches!(err, Error::Telemetry { .. }));

    let stats = uploader.finish().await;
    assert_eq!(stats.uploaded, 1);
    let fields: Value = serde_json::from_slice(&store.get("loop").unwrap().payload).unwrap();
    assert_eq!(fields["outTemp"], 1.0);
}

#[tokio::test]
async fn test_failed_connection_is_reopened_for_next_packet() {
    let store = MemoryStore::new();
    store.fail_connect(true);
    let uploader = TelemetryUploader::spawn(Arc::new(store.clone()));

    uploader.submit(packet("loop", 1.0)).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    store.fail_connect(false);
    uploader.submit(packet("archive", 2.0)).unwrap();
    let stats = uploader.finish().await;

    assert_eq!(stats, WorkerStats { uploaded: 1, failed: 1 });
    assert!(store.get("loop").is_none());
    assert!(store.get("archive").is_some());
}

#[tokio::test]
async fn test_shutdown_of_idle_worker() {
    let uploader = TelemetryUploader::spawn(Arc::new(MemoryStore::new()));
    assert_eq!(uploader.shutdown().await, WorkerStats::default());
}

#[test]
fn test_binding_record_ids() {
    assert_eq!(Binding::Loop.record_id(), "loop");
    assert_eq!(Binding::Archive.record_id(), "archive");
}
