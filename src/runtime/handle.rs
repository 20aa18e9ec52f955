//! Runtime handle lifecycle
//!
//! A handle moves through `Uninitialized → Created → Booted → Destroyed`.
//! `Created → Destroyed` is allowed for an abort before boot, and the guest
//! runtime is released exactly once whichever state was reached.

use std::path::{Path, PathBuf};

use crate::capabilities::{self, HostModules, ModuleBinding};
use crate::embed::{Embedding, GuestRuntime};
use crate::error::{BridgeError, BridgeResult};
use crate::runtime::RuntimeVersion;

/// Lifecycle state of a runtime handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Created,
    Booted,
    Destroyed,
}

/// Outcome of a boot attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootDiagnostics {
    /// Interpreter is up; version has newlines stripped
    Ready { version: String },

    /// Interpreter did not come up; message comes from the runtime
    Failed { message: String },
}

impl BootDiagnostics {
    /// Convert into the version string or a `BootFailed` error
    pub fn into_result(self) -> BridgeResult<String> {
        match self {
            BootDiagnostics::Ready { version } => Ok(version),
            BootDiagnostics::Failed { message } => Err(BridgeError::BootFailed(message)),
        }
    }
}

/// Exclusively owned handle to the embedded interpreter
pub struct RuntimeHandle {
    /// Guest runtime, only reached through the embedding API
    guest: Box<dyn GuestRuntime>,

    /// Version chosen at creation
    version: RuntimeVersion,

    /// Python home fixed at creation
    home: PathBuf,

    /// Search paths in injection order
    search_paths: Vec<PathBuf>,

    state: LifecycleState,
}

impl RuntimeHandle {
    /// Allocate a runtime for `version` rooted at `home`
    pub fn create(
        embedding: &dyn Embedding,
        version: RuntimeVersion,
        home: &Path,
    ) -> BridgeResult<Self> {
        let guest = embedding
            .make(version, home)
            .ok_or(BridgeError::CreateFailed { version: version.major() })?;

        tracing::debug!(
            python_version = version.major(),
            home = %home.display(),
            "Created embedded python runtime"
        );

        Ok(Self {
            guest,
            version,
            home: home.to_path_buf(),
            search_paths: Vec::new(),
            state: LifecycleState::Created,
        })
    }

    pub fn version(&self) -> RuntimeVersion {
        self.version
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Append a module search directory; only honoured before boot
    pub fn add_search_path(&mut self, path: &Path) {
        if self.state != LifecycleState::Created {
            tracing::warn!(
                path = %path.display(),
                state = ?self.state,
                "Ignoring python search path added outside of the created state"
            );
            return;
        }

        self.guest.add_search_path(path);
        self.search_paths.push(path.to_path_buf());
    }

    /// Bring the interpreter up and collect its diagnostics
    ///
    /// The handle stays usable, and must still be destroyed, when boot fails.
    pub fn boot(&mut self) -> BootDiagnostics {
        if self.state != LifecycleState::Created {
            return BootDiagnostics::Failed {
                message: format!("cannot boot a runtime in state {:?}", self.state),
            };
        }

        self.guest.init();

        if !self.guest.is_initialized() {
            let message = self.guest.last_error().unwrap_or_default();
            tracing::error!(error = %message, "Embedded python runtime failed to initialize");
            return BootDiagnostics::Failed { message };
        }

        self.state = LifecycleState::Booted;

        let version = self
            .guest
            .version()
            .map(|raw| strip_newlines(&raw))
            .unwrap_or_default();

        tracing::info!(
            python_version = %version,
            home = %self.home.display(),
            "Embedded python runtime initialized"
        );

        BootDiagnostics::Ready { version }
    }

    /// Register the free callback and every host capability module
    pub fn register_capabilities(&mut self, host: &HostModules) {
        self.guest.set_free_callback();
        capabilities::register_all(self.guest.as_mut(), host);
    }

    /// Register a single capability module
    pub fn register_module(&mut self, binding: ModuleBinding) {
        capabilities::register_module(self.guest.as_mut(), binding);
    }

    /// Release the interpreter; later calls do nothing
    pub fn destroy(&mut self) {
        match self.state {
            LifecycleState::Created | LifecycleState::Booted => {
                self.guest.destroy();
                self.state = LifecycleState::Destroyed;
                tracing::debug!("Destroyed embedded python runtime");
            }
            LifecycleState::Uninitialized | LifecycleState::Destroyed => {}
        }
    }
}

impl Drop for RuntimeHandle {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeHandle")
            .field("version", &self.version)
            .field("home", &self.home)
            .field("search_paths", &self.search_paths)
            .field("state", &self.state)
            .finish()
    }
}

/// Remove every line break from a runtime-provided string
fn strip_newlines(raw: &str) -> String {
    raw.chars().filter(|c| *c != '\n' && *c != '\r').collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::fake::FakeEmbedding;

    fn create(embedding: &FakeEmbedding) -> RuntimeHandle {
        RuntimeHandle::create(embedding, RuntimeVersion::V3, Path::new("/opt/alga/embedded3")).unwrap()
    }

    #[test]
    fn test_create_failure() {
        let embedding = FakeEmbedding::new().failing_create();
        let result = RuntimeHandle::create(&embedding, RuntimeVersion::V2, Path::new("/opt"));
        assert!(matches!(result, Err(BridgeError::CreateFailed { version: 2 })));
    }

    #[test]
    fn test_create_then_destroy_without_boot() {
        let embedding = FakeEmbedding::new();
        let state = embedding.state();
        let mut handle = create(&embedding);
        assert_eq!(handle.state(), LifecycleState::Created);

        handle.destroy();
        assert_eq!(handle.state(), LifecycleState::Destroyed);
        assert_eq!(state.destroy_calls(), 1);
        assert_eq!(state.init_calls(), 0);
    }

    #[test]
    fn test_destroy_twice_is_noop() {
        let embedding = FakeEmbedding::new();
        let state = embedding.state();
        let mut handle = create(&embedding);

        handle.destroy();
        handle.destroy();
        drop(handle);
        assert_eq!(state.destroy_calls(), 1);
    }

    #[test]
    fn test_drop_destroys_live_handle() {
        let embedding = FakeEmbedding::new();
        let state = embedding.state();
        drop(create(&embedding));
        assert_eq!(state.destroy_calls(), 1);
    }

    #[test]
    fn test_search_paths_keep_order_and_duplicates() {
        let embedding = FakeEmbedding::new();
        let state = embedding.state();
        let mut handle = create(&embedding);

        for path in ["/etc/checks.d", "/opt/checks.d", "/etc/checks.d"] {
            handle.add_search_path(Path::new(path));
        }

        let expected: Vec<PathBuf> = ["/etc/checks.d", "/opt/checks.d", "/etc/checks.d"]
            .iter()
            .map(PathBuf::from)
            .collect();
        assert_eq!(handle.search_paths(), expected.as_slice());
        assert_eq!(state.search_paths(), expected);
    }

    #[test]
    fn test_search_path_after_boot_ignored() {
        let embedding = FakeEmbedding::new();
        let state = embedding.state();
        let mut handle = create(&embedding);
        handle.add_search_path(Path::new("/etc/checks.d"));
        handle.boot().into_result().unwrap();

        handle.add_search_path(Path::new("/late"));
        assert_eq!(handle.search_paths().len(), 1);
        assert_eq!(state.search_paths().len(), 1);
    }

    #[test]
    fn test_boot_strips_newlines() {
        let embedding = FakeEmbedding::new().with_version("3.8.10\n");
        let mut handle = create(&embedding);

        assert_eq!(
            handle.boot(),
            BootDiagnostics::Ready { version: "3.8.10".to_string() }
        );
        assert_eq!(handle.state(), LifecycleState::Booted);
    }

    #[test]
    fn test_boot_strips_embedded_newlines() {
        let embedding =
            FakeEmbedding::new().with_version("2.7.16 (default, Apr  1 2019)\n[GCC 4.7.2]\r\n");
        let mut handle = create(&embedding);

        let version = handle.boot().into_result().unwrap();
        assert!(!version.contains('\n'));
        assert!(!version.contains('\r'));
        assert_eq!(version, "2.7.16 (default, Apr  1 2019)[GCC 4.7.2]");
    }

    #[test]
    fn test_boot_failure_keeps_handle() {
        let embedding = FakeEmbedding::new().failing_boot("No module named site");
        let state = embedding.state();
        let mut handle = create(&embedding);

        let result = handle.boot().into_result();
        match result {
            Err(BridgeError::BootFailed(message)) => assert_eq!(message, "No module named site"),
            other => panic!("expected BootFailed, got {:?}", other),
        }
        assert_eq!(handle.state(), LifecycleState::Created);

        handle.destroy();
        assert_eq!(state.destroy_calls(), 1);
    }

    #[test]
    fn test_boot_twice_rejected() {
        let embedding = FakeEmbedding::new();
        let state = embedding.state();
        let mut handle = create(&embedding);

        assert!(handle.boot().into_result().is_ok());
        assert!(handle.boot().into_result().is_err());
        assert_eq!(state.init_calls(), 1);
    }
}
