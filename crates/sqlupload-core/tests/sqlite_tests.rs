//! End-to-end runs against a SQLite database

use pretty_assertions::assert_eq;
use sqlupload_core::store::SqliteStore;
use sqlupload_core::{Manifest, RecordStore, SyncEngine};
use sqlupload_test_utils::ReportTree;

const PAGE: &str = "<html><body><p>Rain 0.2 mm</p></body></html>";

#[tokio::test]
async fn test_run_writes_rows_to_database() {
    let tree = ReportTree::new();
    tree.write("index.html", PAGE);
    tree.write("week.html", PAGE.replace("0.2", "4.8"));
    let manifest = Manifest::parse(&tree.config(
        "html_divide_tag = \"body\"",
        "[[artifacts]]\nid = \"index.html\"\n\n[[artifacts]]\nid = \"week.html\"\n\n[[artifacts]]\nid = \"month.html\"\nenable = false\n",
    ))
    .unwrap();
    let mut engine = SyncEngine::new(&manifest).unwrap();

    let store = SqliteStore::connect(&tree.database_url(), "weewx_files")
        .await
        .unwrap();
    let report = engine.run(&store).await.unwrap();
    assert_eq!(report.uploaded, 2);
    assert!(report.committed);

    let reader = SqliteStore::connect(&tree.database_url(), "weewx_files")
        .await
        .unwrap();
    assert_eq!(reader.count().await.unwrap(), 2);
    let row = reader.fetch("week.html").await.unwrap().unwrap();
    assert_eq!(row.payload, b"<p>Rain 4.8 mm</p>".to_vec());
    assert_eq!(row.content_type.as_deref(), Some("text/html; charset=utf-8"));
    assert!(reader.fetch("month.html").await.unwrap().is_none());
}

#[tokio::test]
async fn test_upsert_replaces_existing_row() {
    use chrono::Utc;
    use sqlupload_core::store::Record;

    let store = SqliteStore::connect_in_memory("telemetry").await.unwrap();
    store.prepare().await.unwrap();
    for payload in [&b"{\"outTemp\":1}"[..], &b"{\"outTemp\":2}"[..]] {
        store
            .upsert(&Record {
                id: "loop",
                payload,
                content_type: "application/json",
                modification_time: Utc::now(),
            })
            .await
            .unwrap();
    }

    assert_eq!(store.count().await.unwrap(), 1);
    assert_eq!(
        store.fetch("loop").await.unwrap().unwrap().payload,
        b"{\"outTemp\":2}".to_vec()
    );
}
