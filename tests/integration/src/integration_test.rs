//! End-to-end integration test for report upload cycles
//!
//! This test exercises the complete flow: config loading -> policy
//! resolution -> splitting -> SQLite upsert -> shell replacement -> ledgers.

use serde_json::Value;
use sqlupload_core::store::SqliteStore;
use sqlupload_core::{ArtifactState, Manifest, RecordStore, SkipReason, SyncEngine};
use sqlupload_fs::{NormalizedPath, compute_bytes_checksum};
use sqlupload_split::{LinkTargets, split_markup};
use sqlupload_test_utils::ReportTree;
use std::time::{SystemTime, UNIX_EPOCH};

const INDEX: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <title>Current Conditions</title>
  <script src="gauges.js"></script>
</head>
<body>
  <nav><a href="week.html">This week</a> <a href="./NOAA/year.txt">Year</a></nav>
  <div id="current"><p>Outside temperature 21.3 &#176;C</p><div class="nested">Wind 12 km/h</div></div>
  <footer>Generated by weewx</footer>
</body>
</html>
"#;

const GAUGES: &str = "// refresh every minute\nvar src = \"week.html\"; /* index.html */\nload('index.html');\n";

const ARTIFACTS: &str = r#"
[[artifacts]]
id = "index.html"
html_divide_tag = "div"

[[artifacts]]
id = "week.html"

[[artifacts]]
id = "gauges.js"

[[artifacts]]
id = "NOAA/year.txt"
replace_extension = false

[[artifacts]]
id = "chart.png"
actions = ["store"]

[[artifacts]]
id = "about.html"
run_once = true
replace_extension = false
"#;

fn generate(tree: &ReportTree) {
    tree.write("index.html", INDEX);
    tree.write("week.html", "<html><body><h1>Week</h1><p>Rain 4.8 mm</p></body></html>");
    tree.write("gauges.js", GAUGES);
    tree.write("NOAA/year.txt", "YEAR 2026\nMEAN 11.2\n");
    tree.write("about.html", "<html><body>Station about page</body></html>");
}

fn later() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() + 3600
}

async fn open(tree: &ReportTree) -> SqliteStore {
    SqliteStore::connect(&tree.database_url(), "weewx_files")
        .await
        .unwrap()
}

#[tokio::test]
async fn test_report_cycle_end_to_end() {
    let tree = ReportTree::new();
    generate(&tree);
    let config = tree.write_config("html_divide_tag = \"body\"\ntransfer_ledger = \"#FTP.last\"", ARTIFACTS);

    let manifest = Manifest::load(&NormalizedPath::new(&config)).unwrap();
    let mut engine = SyncEngine::new(&manifest).unwrap();

    // First cycle
    let store = open(&tree).await;
    let report = engine.run(&store).await.unwrap();

    assert!(report.committed);
    assert_eq!(report.uploaded, 5, "{report}");
    tree.assert_file_contains("sqlupload-connect.php", "function sqlupload_serve($id)");
    // chart.png was never generated; image failures are quiet but counted
    assert!(matches!(
        report.state_of("chart.png"),
        Some(ArtifactState::Failed { .. })
    ));

    // Markup shell keeps navigation, links follow the renamed artifacts
    tree.assert_file_not_exists("index.html");
    let shell = tree.read("index.php");
    assert!(shell.contains(r#"<script src="gauges.php"></script>"#), "{shell}");
    assert!(shell.contains(r#"<a href="week.php">This week</a>"#), "{shell}");
    assert!(shell.contains(r#"<a href="./NOAA/year.txt">Year</a>"#), "{shell}");
    assert!(shell.contains("<div id=\"current\"><?php $sqlupload_id='index.html';"), "{shell}");
    assert!(shell.contains("<footer>Generated by weewx</footer>"), "{shell}");
    assert!(!shell.contains("21.3"));

    // Script shell is the standalone stub, payload rewritten outside comments
    tree.assert_file_contains("gauges.php", "sqlupload_serve($sqlupload_id);");
    let reader = open(&tree).await;
    let gauges = reader.fetch("gauges.js").await.unwrap().unwrap();
    assert_eq!(
        String::from_utf8(gauges.payload).unwrap(),
        "// refresh every minute\nvar src = \"week.php\"; /* index.html */\nload('index.php');\n"
    );
    assert_eq!(gauges.content_type.as_deref(), Some("text/javascript; charset=utf-8"));

    // Payload equals the dynamic region of the markup split
    let index = reader.fetch("index.html").await.unwrap().unwrap();
    let expected = split_markup(INDEX, "div", &LinkTargets::none(), "").unwrap();
    assert_eq!(index.payload, expected.payload);

    // Kept-extension text artifact is replaced in place
    tree.assert_file_contains("NOAA/year.txt", "require_once '../sqlupload-connect.php';");
    let year = reader.fetch("NOAA/year.txt").await.unwrap().unwrap();
    assert_eq!(year.content_type.as_deref(), Some("text/plain; charset=utf-8"));

    // Ledger holds the digest of every stored payload
    let ledger: Value = serde_json::from_str(&tree.read("#SQLupload.last")).unwrap();
    assert_eq!(
        ledger["hash"]["week.html"],
        compute_bytes_checksum(b"<h1>Week</h1><p>Rain 4.8 mm</p>")
    );
    assert_eq!(
        ledger["timestamp"].as_object().unwrap().len(),
        5,
        "{ledger}"
    );
    reader.close().await;

    // Second cycle: the generator rewrites everything, only week.html changed
    generate(&tree);
    tree.write("week.html", "<html><body><h1>Week</h1><p>Rain 5.1 mm</p></body></html>");
    for file in ["index.html", "week.html", "gauges.js", "NOAA/year.txt", "about.html"] {
        tree.set_modified(file, later());
    }

    let store = open(&tree).await;
    let report = engine.run(&store).await.unwrap();

    assert_eq!(report.uploaded, 1, "{report}");
    assert_eq!(
        report.state_of("about.html"),
        Some(&ArtifactState::Skipped {
            reason: SkipReason::RunOnce
        })
    );
    assert!(matches!(
        report.state_of("index.html"),
        Some(ArtifactState::Processed { stored: false, .. })
    ));
    tree.assert_file_not_exists("week.html");

    let reader = open(&tree).await;
    let week = reader.fetch("week.html").await.unwrap().unwrap();
    assert_eq!(week.payload, b"<h1>Week</h1><p>Rain 5.1 mm</p>".to_vec());
    assert_eq!(reader.count().await.unwrap(), 6);
}

#[tokio::test]
async fn test_fresh_process_sees_persisted_ledger() {
    let tree = ReportTree::new();
    tree.write("index.html", INDEX);
    let config = tree.write_config(
        "html_divide_tag = \"div\"\nreplace_extension = false",
        "[[artifacts]]\nid = \"index.html\"\n",
    );
    let manifest = Manifest::load(&NormalizedPath::new(&config)).unwrap();

    let mut first = SyncEngine::new(&manifest).unwrap();
    assert_eq!(first.run(&open(&tree).await).await.unwrap().uploaded, 1);

    // A new engine is a new process: it prepares the table again but the
    // on-disk ledger still says the shell is current
    let mut second = SyncEngine::new(&manifest).unwrap();
    let report = second.run(&open(&tree).await).await.unwrap();
    assert_eq!(
        report.state_of("index.html"),
        Some(&ArtifactState::Skipped {
            reason: SkipReason::Unchanged
        })
    );
    assert!(report.is_noop());
}
