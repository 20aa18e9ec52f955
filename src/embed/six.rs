//! Native backend over the `six` embedding library
//!
//! The library exposes a C API: `make2`/`make3` allocate an interpreter,
//! `init` boots it, and one `set_*_cb` setter per host callback fills its
//! dispatch table. The callbacks themselves live in [`super::callbacks`].

use std::ffi::CString;
use std::os::raw::{c_char, c_float, c_int, c_void};
use std::path::Path;
use std::ptr::NonNull;

use super::callbacks::{self, *};
use super::marshal::{copy_from_guest, free_from_guest};
use super::{Embedding, GuestRuntime};
use crate::capabilities::ModuleBinding;
use crate::runtime::RuntimeVersion;

#[allow(non_camel_case_types)]
mod sys {
    use super::*;

    #[repr(C)]
    pub struct six_t {
        _private: [u8; 0],
    }

    pub type cb_free_t = unsafe extern "C" fn(*mut c_void);
    pub type cb_get_string_t = unsafe extern "C" fn(*mut *mut c_char);
    pub type cb_get_config_t = unsafe extern "C" fn(*mut c_char, *mut *mut c_char);
    pub type cb_log_t = unsafe extern "C" fn(*mut c_char, c_int);
    pub type cb_set_external_tags_t =
        unsafe extern "C" fn(*mut c_char, *mut c_char, *mut *mut c_char);
    pub type cb_submit_metric_t = unsafe extern "C" fn(
        *mut c_char,
        c_int,
        *mut c_char,
        c_float,
        *mut *mut c_char,
        c_int,
        *mut c_char,
    );
    pub type cb_submit_service_check_t = unsafe extern "C" fn(
        *mut c_char,
        *mut c_char,
        c_int,
        *mut *mut c_char,
        c_int,
        *mut c_char,
        *mut c_char,
    );
    pub type cb_submit_event_t =
        unsafe extern "C" fn(*mut c_char, *mut callbacks::event_t, c_int);
    pub type cb_get_subprocess_output_t = unsafe extern "C" fn(
        *mut *mut c_char,
        c_int,
        *mut *mut c_char,
        *mut *mut c_char,
        *mut c_int,
        *mut *mut c_char,
    );
    // datadog_agent_six.h: `typedef char **(*cb_tags_t)(char *, int)`; the
    // entity id is a single string.
    pub type cb_tags_t = unsafe extern "C" fn(*mut c_char, c_int) -> *mut *mut c_char;
    pub type cb_is_excluded_t = unsafe extern "C" fn(*mut c_char, *mut c_char) -> c_int;

    #[link(name = "datadog-agent-six")]
    extern "C" {
        pub fn make2(python_home: *const c_char) -> *mut six_t;
        pub fn make3(python_home: *const c_char) -> *mut six_t;
        pub fn destroy(six: *mut six_t);

        pub fn add_python_path(six: *mut six_t, path: *const c_char) -> c_int;
        pub fn init(six: *mut six_t) -> c_int;
        pub fn is_initialized(six: *mut six_t) -> c_int;
        pub fn get_error(six: *const six_t) -> *const c_char;
        pub fn get_py_version(six: *const six_t) -> *const c_char;

        pub fn set_cgo_free_cb(six: *mut six_t, cb: cb_free_t);

        pub fn set_get_version_cb(six: *mut six_t, cb: cb_get_string_t);
        pub fn set_get_hostname_cb(six: *mut six_t, cb: cb_get_string_t);
        pub fn set_get_clustername_cb(six: *mut six_t, cb: cb_get_string_t);
        pub fn set_headers_cb(six: *mut six_t, cb: cb_get_string_t);
        pub fn set_get_config_cb(six: *mut six_t, cb: cb_get_config_t);
        pub fn set_log_cb(six: *mut six_t, cb: cb_log_t);
        pub fn set_set_external_tags_cb(six: *mut six_t, cb: cb_set_external_tags_t);

        pub fn set_submit_metric_cb(six: *mut six_t, cb: cb_submit_metric_t);
        pub fn set_submit_service_check_cb(six: *mut six_t, cb: cb_submit_service_check_t);
        pub fn set_submit_event_cb(six: *mut six_t, cb: cb_submit_event_t);

        pub fn set_get_subprocess_output_cb(six: *mut six_t, cb: cb_get_subprocess_output_t);
        pub fn set_tags_cb(six: *mut six_t, cb: cb_tags_t);
        pub fn set_is_excluded_cb(six: *mut six_t, cb: cb_is_excluded_t);
        // datadog_agent_six.h: `typedef void (*cb_get_connection_info_t)(char **)`.
        // The JSON payload is allocated by the callback, so it needs the
        // out-parameter form shared with the other string getters.
        pub fn set_get_connection_info_cb(six: *mut six_t, cb: cb_get_string_t);
    }
}

/// [`Embedding`] backed by `libdatadog-agent-six`
#[derive(Debug, Default)]
pub struct SixEmbedding;

impl Embedding for SixEmbedding {
    fn make(&self, version: RuntimeVersion, home: &Path) -> Option<Box<dyn GuestRuntime>> {
        let home = match CString::new(home.to_string_lossy().as_bytes()) {
            Ok(home) => home,
            Err(e) => {
                tracing::error!(error = %e, "Python home contains a NUL byte");
                return None;
            }
        };

        // SAFETY: `home` is a valid C string kept alive by the runtime below.
        let raw = unsafe {
            match version {
                RuntimeVersion::V2 => sys::make2(home.as_ptr()),
                RuntimeVersion::V3 => sys::make3(home.as_ptr()),
            }
        };

        NonNull::new(raw).map(|six| {
            Box::new(SixRuntime {
                six: Some(six),
                _home: home,
            }) as Box<dyn GuestRuntime>
        })
    }
}

/// Live `six_t` handle
struct SixRuntime {
    /// `None` once destroyed
    six: Option<NonNull<sys::six_t>>,

    /// Home string handed to `make*`, kept for the runtime's lifetime
    _home: CString,
}

// SAFETY: the handle is only driven from the thread running the init and
// destroy phases; guest execution is serialised by the interpreter lock.
unsafe impl Send for SixRuntime {}

impl GuestRuntime for SixRuntime {
    fn add_search_path(&mut self, path: &Path) {
        let Some(six) = self.six else { return };
        let Ok(path) = CString::new(path.to_string_lossy().as_bytes()) else {
            tracing::warn!(path = %path.display(), "Skipping python path with a NUL byte");
            return;
        };
        // SAFETY: live handle, valid C string for the duration of the call.
        unsafe {
            sys::add_python_path(six.as_ptr(), path.as_ptr());
        }
    }

    fn init(&mut self) {
        if let Some(six) = self.six {
            // SAFETY: live handle.
            unsafe {
                sys::init(six.as_ptr());
            }
        }
    }

    fn is_initialized(&self) -> bool {
        // SAFETY: live handle.
        self.six
            .map(|six| unsafe { sys::is_initialized(six.as_ptr()) } != 0)
            .unwrap_or(false)
    }

    fn last_error(&self) -> Option<String> {
        let six = self.six?;
        // SAFETY: the runtime owns the returned string; it is copied right away.
        unsafe { copy_from_guest(sys::get_error(six.as_ptr())) }
    }

    fn version(&self) -> Option<String> {
        let six = self.six?;
        // SAFETY: the runtime owns the returned string; it is copied right away.
        unsafe { copy_from_guest(sys::get_py_version(six.as_ptr())) }
    }

    fn set_free_callback(&mut self) {
        if let Some(six) = self.six {
            // SAFETY: live handle; `free_from_guest` matches the malloc used by
            // every callback returning memory to the guest.
            unsafe { sys::set_cgo_free_cb(six.as_ptr(), free_from_guest) }
        }
    }

    fn bind(&mut self, binding: ModuleBinding) {
        let Some(six) = self.six else { return };
        let six = six.as_ptr();

        // SAFETY: live handle; every callback matches the setter's signature.
        unsafe {
            match &binding {
                ModuleBinding::AgentInfo(_) => {
                    sys::set_get_version_cb(six, get_version_cb);
                    sys::set_get_hostname_cb(six, get_hostname_cb);
                    sys::set_get_clustername_cb(six, get_clustername_cb);
                    sys::set_headers_cb(six, headers_cb);
                    sys::set_get_config_cb(six, get_config_cb);
                    sys::set_log_cb(six, log_cb);
                    sys::set_set_external_tags_cb(six, set_external_tags_cb);
                }
                ModuleBinding::Aggregator(_) => {
                    sys::set_submit_metric_cb(six, submit_metric_cb);
                    sys::set_submit_service_check_cb(six, submit_service_check_cb);
                    sys::set_submit_event_cb(six, submit_event_cb);
                }
                ModuleBinding::Util(_) => {
                    sys::set_get_subprocess_output_cb(six, get_subprocess_output_cb);
                }
                ModuleBinding::Tagger(_) => sys::set_tags_cb(six, tags_cb),
                ModuleBinding::Containers(_) => sys::set_is_excluded_cb(six, is_excluded_cb),
                ModuleBinding::KubeUtil(_) => {
                    sys::set_get_connection_info_cb(six, get_connection_info_cb);
                }
            }
        }

        callbacks::install(binding);
    }

    fn destroy(&mut self) {
        if let Some(six) = self.six.take() {
            // SAFETY: the handle is live and never used again.
            unsafe { sys::destroy(six.as_ptr()) }
            callbacks::clear();
        }
    }
}

impl Drop for SixRuntime {
    fn drop(&mut self) {
        self.destroy();
    }
}
