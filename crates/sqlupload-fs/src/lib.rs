//! Filesystem primitives for SQLupload
//!
//! Provides the path type used for artifact identities on disk, the
//! workspace-wide checksum format, and the safe I/O operations the sync
//! engine relies on when it replaces generated files.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod path;

pub use checksum::{compute_bytes_checksum, compute_content_checksum};
pub use config::ConfigStore;
pub use error::{Error, Result};
pub use path::NormalizedPath;
