//! Shell/payload splitting for generated report artifacts.
//!
//! Every artifact falls into one [`ContentCategory`]:
//!
//! - **Markup** (`.html`, `.htm`): partitioned at a divider tag into a static
//!   shell that embeds a fetch stub and a dynamic payload.
//! - **Script** (`.js`): string literals are rewritten, the whole script is
//!   the payload and the shell is the fetch stub.
//! - **Opaque** (anything else): bytes are stored unchanged.
//!
//! Markup and scripts rewrite references to artifacts that are renamed on
//! disk, see [`LinkTargets`].

pub mod category;
pub mod error;
pub mod links;
pub mod markup;
pub mod mime;
pub mod opaque;
pub mod script;

pub use category::{ContentCategory, SplitContext, SplitResult};
pub use error::{Error, Result};
pub use links::{LinkTargets, is_absolute_link, strip_relative_prefixes};
pub use markup::split_markup;
pub use script::{rewrite_script, split_script};
