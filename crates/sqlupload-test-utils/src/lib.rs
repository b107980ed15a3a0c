//! Shared test utilities for the sqlupload workspace.
//!
//! This crate provides standardised test fixtures to eliminate duplication
//! across crate test suites. It is a dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`report`]: [`ReportTree`] builder for generated report directories

pub mod report;

pub use report::ReportTree;
