//! Core orchestration layer for sqlupload
//!
//! Moves the dynamic part of generated report artifacts into a record store
//! and replaces the artifacts on disk with static shells that fetch it back:
//!
//! - **Configuration**: manifest parsing and per-artifact action policy
//! - **Ledgers**: content digests and processed timestamps for change
//!   detection, plus the hand-off to the co-located transfer component
//! - **Stores**: transactional record upserts (SQLite, in-memory, dry run)
//! - **SyncEngine**: the per-run loop tying splitting, storing and
//!   filesystem replacement together
//! - **Telemetry**: a bounded queue feeding best-effort live uploads
//!
//! # Architecture
//!
//! ```text
//!                  sqlupload-cli
//!                        |
//!                  sqlupload-core
//!                        |
//!            +-----------+-----------+
//!            |                       |
//!      sqlupload-fs           sqlupload-split
//! ```
//!
//! # Example
//!
//! ```ignore
//! use sqlupload_core::{Manifest, SyncEngine, store::SqliteStore};
//!
//! let manifest = Manifest::parse(&config_text)?;
//! let mut engine = SyncEngine::new(&manifest)?;
//! let store = SqliteStore::connect("sqlite://upload.sdb", "weewx_files").await?;
//! let report = engine.run(&store).await?;
//! println!("{report}");
//! ```

pub mod config;
pub mod error;
pub mod ledger;
pub mod store;
pub mod stub;
pub mod sync;
pub mod targets;
pub mod telemetry;

pub use config::{Action, ActionSet, ArtifactSection, Manifest, ResolvedArtifact, SyncPlan};
pub use error::{Error, Result};
pub use ledger::{SyncLedger, TransferLedger};
pub use store::{ConfiguredStore, RecordStore, StoreConnector};
pub use sync::{ArtifactState, RunReport, ShutdownHandle, SkipReason, SyncEngine};
pub use telemetry::{TelemetryPacket, TelemetryUploader};
