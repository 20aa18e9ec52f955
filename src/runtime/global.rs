//! Process-wide embedded runtime
//!
//! Only one interpreter may be live in a process, so the handle lives in a
//! single global slot with explicit `initialize` / `destroy` phases. The
//! hosting process runs those phases from one thread (startup and shutdown
//! barriers); the slot lock keeps the slot itself sound but does not
//! serialise guest execution, which is left to the interpreter's own lock.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::capabilities::HostModules;
use crate::config::Settings;
use crate::embed::Embedding;
use crate::error::{BridgeError, BridgeResult};
use crate::platform::resolve_home;
use crate::runtime::{select_version, LifecycleState, RuntimeHandle, RuntimeVersion};
use crate::telemetry::{self, SeriesSink};

static RUNTIME: Mutex<Option<RuntimeHandle>> = Mutex::new(None);

static PUBLISHED: RwLock<Published> = RwLock::new(Published {
    python_version: String::new(),
    python_home: String::new(),
    python_path: String::new(),
});

/// Values readable by the rest of the agent once the runtime is up
struct Published {
    python_version: String,
    python_home: String,
    python_path: String,
}

/// Everything `initialize` needs from the hosting agent
#[derive(Clone)]
pub struct InitContext {
    /// Embedding backend creating the guest runtime
    pub embedding: Arc<dyn Embedding>,

    /// Agent settings (`python_version` selects the runtime)
    pub settings: Settings,

    /// Build-time python homes, by version
    pub python2_home: PathBuf,
    pub python3_home: PathBuf,

    /// Host implementations of the capability modules
    pub host: HostModules,

    /// Recurring series mechanism for boot telemetry
    pub telemetry: Arc<dyn SeriesSink>,
}

impl InitContext {
    /// Context using the homes baked in at build time
    pub fn new(
        embedding: Arc<dyn Embedding>,
        settings: Settings,
        host: HostModules,
        telemetry: Arc<dyn SeriesSink>,
    ) -> Self {
        Self {
            embedding,
            settings,
            python2_home: PathBuf::from(RuntimeVersion::V2.compiled_home()),
            python3_home: PathBuf::from(RuntimeVersion::V3.compiled_home()),
            host,
            telemetry,
        }
    }

    fn compiled_home(&self, version: RuntimeVersion) -> &Path {
        match version {
            RuntimeVersion::V2 => &self.python2_home,
            RuntimeVersion::V3 => &self.python3_home,
        }
    }
}

/// Boot the embedded interpreter with extra module search paths
///
/// On `BootFailed` the handle stays in the global slot; [`destroy`] must
/// still be called to release it.
///
/// The slot lock is not held while the telemetry sink and agent info run,
/// so they may call [`current`].
pub fn initialize<P: AsRef<Path>>(ctx: &InitContext, search_paths: &[P]) -> BridgeResult<()> {
    let (version, python_version, home) = boot_into_slot(ctx, search_paths)?;

    telemetry::report_boot(
        ctx.telemetry.as_ref(),
        version,
        &ctx.host.agent_info.version(),
    );

    let mut slot = lock_runtime();
    let handle = slot
        .as_mut()
        .filter(|h| h.state() == LifecycleState::Booted)
        .ok_or_else(|| {
            BridgeError::BootFailed("runtime destroyed during initialization".to_string())
        })?;

    handle.register_capabilities(&ctx.host);

    tracing::info!(
        python_version = %python_version,
        home = %home.display(),
        search_paths = handle.search_paths().len(),
        "Embedded python runtime ready for checks"
    );

    Ok(())
}

/// Create, boot and publish the runtime while holding the slot lock
fn boot_into_slot<P: AsRef<Path>>(
    ctx: &InitContext,
    search_paths: &[P],
) -> BridgeResult<(RuntimeVersion, String, PathBuf)> {
    let mut slot = lock_runtime();
    if slot.as_ref().is_some_and(|h| h.state() != LifecycleState::Destroyed) {
        return Err(BridgeError::AlreadyInitialized);
    }

    let version = select_version(ctx.settings.python_version)?;
    let home = resolve_home(version, ctx.compiled_home(version));

    let mut handle = RuntimeHandle::create(ctx.embedding.as_ref(), version, &home)?;
    for path in search_paths {
        handle.add_search_path(path.as_ref());
    }

    set_published(|p| p.python_home = home.to_string_lossy().into_owned());
    let handle = slot.insert(handle);

    let python_version = handle.boot().into_result()?;

    let python_path = handle
        .search_paths()
        .iter()
        .map(|p| p.to_string_lossy())
        .collect::<Vec<_>>()
        .join(path_list_separator());
    set_published(|p| {
        p.python_version = python_version.clone();
        p.python_path = python_path;
    });

    Ok((version, python_version, home))
}

/// Tear down the runtime created by [`initialize`]
///
/// Safe to call when nothing was ever initialized, and more than once.
pub fn destroy() {
    let handle = lock_runtime().take();

    if let Some(mut handle) = handle {
        handle.destroy();
        set_published(|p| {
            p.python_version.clear();
            p.python_home.clear();
            p.python_path.clear();
        });
    }
}

/// Access the live runtime handle, for diagnostics and tests
///
/// The returned guard holds the global slot lock; drop it before calling
/// [`initialize`] or [`destroy`].
pub fn current() -> CurrentRuntime {
    CurrentRuntime(lock_runtime())
}

/// Guard over the global runtime slot
pub struct CurrentRuntime(MutexGuard<'static, Option<RuntimeHandle>>);

impl CurrentRuntime {
    pub fn is_some(&self) -> bool {
        self.0.is_some()
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    pub fn get(&self) -> Option<&RuntimeHandle> {
        self.0.as_ref()
    }

    pub fn version(&self) -> Option<RuntimeVersion> {
        self.get().map(RuntimeHandle::version)
    }

    pub fn state(&self) -> Option<LifecycleState> {
        self.get().map(RuntimeHandle::state)
    }
}

/// Interpreter version (`sys.version`, newlines removed), empty until booted
pub fn python_version() -> String {
    read_published(|p| p.python_version.clone())
}

/// Python home the runtime was created with, empty until created
pub fn python_home() -> String {
    read_published(|p| p.python_home.clone())
}

/// Search paths injected before boot, joined with the platform separator
pub fn python_path() -> String {
    read_published(|p| p.python_path.clone())
}

fn lock_runtime() -> MutexGuard<'static, Option<RuntimeHandle>> {
    RUNTIME.lock().unwrap_or_else(PoisonError::into_inner)
}

fn set_published(f: impl FnOnce(&mut Published)) {
    f(&mut PUBLISHED.write().unwrap_or_else(PoisonError::into_inner));
}

fn read_published<R>(f: impl FnOnce(&Published) -> R) -> R {
    f(&PUBLISHED.read().unwrap_or_else(PoisonError::into_inner))
}

fn path_list_separator() -> &'static str {
    if cfg!(windows) {
        ";"
    } else {
        ":"
    }
}
