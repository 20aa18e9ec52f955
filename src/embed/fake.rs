//! In-process stand-in for the embedding library, used by tests
//!
//! Records every call made on its runtimes so tests can inspect the search
//! path list, the dispatch table and the teardown count.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use super::{Embedding, GuestRuntime};
use crate::capabilities::{CapabilityModule, ModuleBinding};
use crate::runtime::RuntimeVersion;

#[derive(Debug, Default)]
struct Recorded {
    created: Vec<(RuntimeVersion, PathBuf)>,
    search_paths: Vec<PathBuf>,
    init_calls: usize,
    destroy_calls: usize,
    free_callback: bool,
    bind_calls: usize,
    dispatch: BTreeMap<CapabilityModule, ModuleBinding>,
}

/// Shared view of what the fake runtimes recorded
#[derive(Debug, Clone, Default)]
pub struct FakeState(Arc<Mutex<Recorded>>);

impl FakeState {
    fn with<R>(&self, f: impl FnOnce(&mut Recorded) -> R) -> R {
        f(&mut self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn created(&self) -> Vec<(RuntimeVersion, PathBuf)> {
        self.with(|r| r.created.clone())
    }

    pub fn search_paths(&self) -> Vec<PathBuf> {
        self.with(|r| r.search_paths.clone())
    }

    pub fn init_calls(&self) -> usize {
        self.with(|r| r.init_calls)
    }

    pub fn destroy_calls(&self) -> usize {
        self.with(|r| r.destroy_calls)
    }

    pub fn free_callback_set(&self) -> bool {
        self.with(|r| r.free_callback)
    }

    pub fn bind_calls(&self) -> usize {
        self.with(|r| r.bind_calls)
    }

    /// Modules currently in the dispatch table
    pub fn bound_modules(&self) -> Vec<CapabilityModule> {
        self.with(|r| r.dispatch.keys().copied().collect())
    }

    pub fn binding(&self, module: CapabilityModule) -> Option<ModuleBinding> {
        self.with(|r| r.dispatch.get(&module).cloned())
    }
}

/// Configurable fake [`Embedding`]
#[derive(Debug, Clone)]
pub struct FakeEmbedding {
    state: FakeState,
    fail_create: bool,
    boot_error: Option<String>,
    raw_version: Option<String>,
}

impl FakeEmbedding {
    pub fn new() -> Self {
        Self {
            state: FakeState::default(),
            fail_create: false,
            boot_error: None,
            raw_version: Some("3.8.10\n".to_string()),
        }
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_boot(mut self, error: &str) -> Self {
        self.boot_error = Some(error.to_string());
        self
    }

    pub fn with_version(mut self, raw: &str) -> Self {
        self.raw_version = Some(raw.to_string());
        self
    }

    pub fn state(&self) -> FakeState {
        self.state.clone()
    }
}

impl Embedding for FakeEmbedding {
    fn make(&self, version: RuntimeVersion, home: &Path) -> Option<Box<dyn GuestRuntime>> {
        if self.fail_create {
            return None;
        }

        self.state
            .with(|r| r.created.push((version, home.to_path_buf())));

        Some(Box::new(FakeRuntime {
            state: self.state.clone(),
            boot_error: self.boot_error.clone(),
            raw_version: self.raw_version.clone(),
            initialized: false,
        }))
    }
}

struct FakeRuntime {
    state: FakeState,
    boot_error: Option<String>,
    raw_version: Option<String>,
    initialized: bool,
}

impl GuestRuntime for FakeRuntime {
    fn add_search_path(&mut self, path: &Path) {
        self.state.with(|r| r.search_paths.push(path.to_path_buf()));
    }

    fn init(&mut self) {
        self.state.with(|r| r.init_calls += 1);
        self.initialized = self.boot_error.is_none();
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn last_error(&self) -> Option<String> {
        self.boot_error.clone()
    }

    fn version(&self) -> Option<String> {
        self.raw_version.clone()
    }

    fn set_free_callback(&mut self) {
        self.state.with(|r| r.free_callback = true);
    }

    fn bind(&mut self, binding: ModuleBinding) {
        self.state.with(|r| {
            r.bind_calls += 1;
            r.dispatch.insert(binding.module(), binding);
        });
    }

    fn destroy(&mut self) {
        self.state.with(|r| {
            r.destroy_calls += 1;
            r.dispatch.clear();
        });
    }
}
