//! Embedding boundary between the agent and the guest interpreter
//!
//! The guest runtime is only ever reached through these two traits:
//!
//! - [`Embedding`] allocates a runtime for a version and home path
//! - [`GuestRuntime`] is the opaque handle: path injection, boot, diagnostics,
//!   capability dispatch table and teardown
//!
//! The native `six` library backs them when the `embedded-six` feature is on;
//! its host callbacks live in [`callbacks`], which is also built for tests.

use std::path::Path;

use crate::capabilities::ModuleBinding;
use crate::runtime::RuntimeVersion;

#[cfg(any(test, feature = "embedded-six"))]
pub mod callbacks;
#[cfg(any(test, feature = "embedded-six"))]
pub mod marshal;

#[cfg(feature = "embedded-six")]
pub mod six;

#[cfg(test)]
pub(crate) mod fake;

/// Factory for guest runtime handles
pub trait Embedding: Send + Sync {
    /// Allocate a runtime handle, `None` when the library cannot create one
    fn make(&self, version: RuntimeVersion, home: &Path) -> Option<Box<dyn GuestRuntime>>;
}

/// Live guest runtime handle
///
/// Implementations own every allocation the interpreter makes. Strings
/// returned from these methods are already copied into host memory.
pub trait GuestRuntime: Send {
    /// Append a directory to the interpreter module search path
    fn add_search_path(&mut self, path: &Path);

    /// Bring the interpreter up
    fn init(&mut self);

    /// Whether the last `init` produced a usable interpreter
    fn is_initialized(&self) -> bool;

    /// Error text recorded by the runtime, if any
    fn last_error(&self) -> Option<String>;

    /// Raw interpreter version string (`sys.version`)
    fn version(&self) -> Option<String>;

    /// Install the free callback the runtime uses for memory handed over by host callbacks
    fn set_free_callback(&mut self);

    /// Bind a capability module into the runtime dispatch table
    fn bind(&mut self, binding: ModuleBinding);

    /// Release the interpreter and everything it allocated
    fn destroy(&mut self);
}
