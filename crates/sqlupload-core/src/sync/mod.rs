//! Synchronization orchestrator
//!
//! [`SyncEngine`] runs the configured artifacts against a record store and
//! returns a [`RunReport`].

mod engine;
mod report;

pub use engine::{ShutdownHandle, SyncEngine};
pub use report::{ArtifactState, RunReport, SkipReason};
