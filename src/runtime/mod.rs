//! Embedded python runtime lifecycle
//!
//! - Version selection from settings
//! - Handle state machine (create, search paths, boot, destroy)
//! - The single process-wide runtime and its published diagnostics

mod global;
mod handle;
mod version;

pub use global::*;
pub use handle::*;
pub use version::*;
