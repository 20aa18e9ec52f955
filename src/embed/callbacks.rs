//! Host callbacks handed to the embedding library
//!
//! Callbacks are plain C function pointers, so the host module
//! implementations they reach live in a process-wide table. A module is
//! installed when it is bound into the runtime and the table is cleared when
//! the runtime is destroyed.
//!
//! Every callback copies its string arguments on receipt, returns memory
//! allocated with [`to_guest_string`] / [`to_guest_string_array`] (released
//! by the guest through `free_from_guest`) and never lets a panic unwind
//! into C.

use std::os::raw::{c_char, c_float, c_int, c_long};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::{Arc, PoisonError, RwLock};

use super::marshal::{
    copy_array_from_guest, copy_from_guest, copy_null_terminated_from_guest, to_guest_string,
    to_guest_string_array,
};
use crate::capabilities::{
    AgentInfo, Aggregator, ContainerExclusion, Event, KubeletConnectivity, LogLevel, MetricSample,
    MetricType, ModuleBinding, ServiceCheck, ServiceCheckStatus, SubprocessRunner, TagCardinality,
    Tagger,
};

/// Event payload as laid out by the embedding library (`event_t`)
#[repr(C)]
#[allow(non_camel_case_types)]
pub struct event_t {
    pub title: *mut c_char,
    pub text: *mut c_char,
    pub ts: c_long,
    pub priority: *mut c_char,
    pub host: *mut c_char,
    /// NULL-terminated
    pub tags: *mut *mut c_char,
    pub alert_type: *mut c_char,
    pub aggregation_key: *mut c_char,
    pub source_type_name: *mut c_char,
    pub event_type: *mut c_char,
}

/// Host implementations reachable from the callbacks
struct Modules {
    agent_info: Option<Arc<dyn AgentInfo>>,
    aggregator: Option<Arc<dyn Aggregator>>,
    subprocess: Option<Arc<dyn SubprocessRunner>>,
    tagger: Option<Arc<dyn Tagger>>,
    containers: Option<Arc<dyn ContainerExclusion>>,
    kubelet: Option<Arc<dyn KubeletConnectivity>>,
}

static MODULES: RwLock<Modules> = RwLock::new(Modules {
    agent_info: None,
    aggregator: None,
    subprocess: None,
    tagger: None,
    containers: None,
    kubelet: None,
});

/// Make a bound module reachable from its callbacks, replacing any previous one
pub fn install(binding: ModuleBinding) {
    let mut modules = MODULES.write().unwrap_or_else(PoisonError::into_inner);
    match binding {
        ModuleBinding::AgentInfo(module) => modules.agent_info = Some(module),
        ModuleBinding::Aggregator(module) => modules.aggregator = Some(module),
        ModuleBinding::Util(module) => modules.subprocess = Some(module),
        ModuleBinding::Tagger(module) => modules.tagger = Some(module),
        ModuleBinding::Containers(module) => modules.containers = Some(module),
        ModuleBinding::KubeUtil(module) => modules.kubelet = Some(module),
    }
}

/// Drop every installed module
pub fn clear() {
    let mut modules = MODULES.write().unwrap_or_else(PoisonError::into_inner);
    modules.agent_info = None;
    modules.aggregator = None;
    modules.subprocess = None;
    modules.tagger = None;
    modules.containers = None;
    modules.kubelet = None;
}

/// Clone a module out of the table, releasing the lock before use
fn module<T: ?Sized>(select: impl FnOnce(&Modules) -> Option<Arc<T>>) -> Option<Arc<T>> {
    select(&MODULES.read().unwrap_or_else(PoisonError::into_inner))
}

/// Run a callback body without letting a panic unwind into C
fn guarded<R>(callback: &'static str, fallback: R, body: impl FnOnce() -> R) -> R {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(value) => value,
        Err(_) => {
            tracing::error!(callback, "Host callback panicked");
            fallback
        }
    }
}

/// Store a freshly allocated guest string in an out parameter
unsafe fn write_out(out: *mut *mut c_char, value: &str) {
    if !out.is_null() {
        *out = to_guest_string(value);
    }
}

fn copy_str(ptr: *const c_char) -> String {
    // SAFETY: callback arguments are valid C strings for the call duration.
    unsafe { copy_from_guest(ptr) }.unwrap_or_default()
}

fn copy_tags(tags: *mut *mut c_char, len: c_int) -> Vec<String> {
    // SAFETY: the guest passes `len` valid string pointers.
    unsafe { copy_array_from_guest(tags as *const *const c_char, len.max(0) as usize) }
}

pub unsafe extern "C" fn get_version_cb(out: *mut *mut c_char) {
    guarded("get_version", (), || {
        if let Some(info) = module(|m| m.agent_info.clone()) {
            write_out(out, &info.version());
        }
    })
}

pub unsafe extern "C" fn get_hostname_cb(out: *mut *mut c_char) {
    guarded("get_hostname", (), || {
        if let Some(info) = module(|m| m.agent_info.clone()) {
            write_out(out, &info.hostname());
        }
    })
}

pub unsafe extern "C" fn get_clustername_cb(out: *mut *mut c_char) {
    guarded("get_clustername", (), || {
        if let Some(info) = module(|m| m.agent_info.clone()) {
            write_out(out, &info.cluster_name());
        }
    })
}

/// Headers as a JSON object
pub unsafe extern "C" fn headers_cb(out: *mut *mut c_char) {
    guarded("headers", (), || {
        if let Some(info) = module(|m| m.agent_info.clone()) {
            match serde_json::to_string(&info.headers()) {
                Ok(json) => write_out(out, &json),
                Err(e) => tracing::error!(error = %e, "Failed to serialize headers"),
            }
        }
    })
}

/// Config value as JSON; `out` is left untouched for unset keys
pub unsafe extern "C" fn get_config_cb(key: *mut c_char, out: *mut *mut c_char) {
    guarded("get_config", (), || {
        let key = copy_str(key);
        let Some(info) = module(|m| m.agent_info.clone()) else { return };
        if let Some(value) = info.config_value(&key) {
            match serde_json::to_string(&value) {
                Ok(json) => write_out(out, &json),
                Err(e) => tracing::error!(key = %key, error = %e, "Failed to serialize config value"),
            }
        }
    })
}

pub unsafe extern "C" fn log_cb(message: *mut c_char, level: c_int) {
    guarded("log", (), || {
        if let Some(info) = module(|m| m.agent_info.clone()) {
            info.log(&copy_str(message), LogLevel::from_python(level));
        }
    })
}

pub unsafe extern "C" fn set_external_tags_cb(
    hostname: *mut c_char,
    source_type: *mut c_char,
    tags: *mut *mut c_char,
) {
    guarded("set_external_tags", (), || {
        if let Some(info) = module(|m| m.agent_info.clone()) {
            let tags = copy_null_terminated_from_guest(tags as *const *const c_char);
            info.set_external_tags(&copy_str(hostname), &copy_str(source_type), tags);
        }
    })
}

pub unsafe extern "C" fn submit_metric_cb(
    check_id: *mut c_char,
    metric_type: c_int,
    name: *mut c_char,
    value: c_float,
    tags: *mut *mut c_char,
    tags_len: c_int,
    hostname: *mut c_char,
) {
    guarded("submit_metric", (), || {
        let Some(aggregator) = module(|m| m.aggregator.clone()) else { return };
        let name = copy_str(name);
        let Some(metric_type) = MetricType::from_raw(metric_type) else {
            tracing::warn!(metric = %name, metric_type, "Dropping metric with unknown type");
            return;
        };
        aggregator.submit_metric(
            &copy_str(check_id),
            MetricSample {
                name,
                metric_type,
                value: f64::from(value),
                tags: copy_tags(tags, tags_len),
                hostname: copy_str(hostname),
            },
        );
    })
}

pub unsafe extern "C" fn submit_service_check_cb(
    check_id: *mut c_char,
    name: *mut c_char,
    status: c_int,
    tags: *mut *mut c_char,
    tags_len: c_int,
    hostname: *mut c_char,
    message: *mut c_char,
) {
    guarded("submit_service_check", (), || {
        let Some(aggregator) = module(|m| m.aggregator.clone()) else { return };
        aggregator.submit_service_check(
            &copy_str(check_id),
            ServiceCheck {
                name: copy_str(name),
                status: ServiceCheckStatus::from_raw(status),
                tags: copy_tags(tags, tags_len),
                hostname: copy_str(hostname),
                message: copy_str(message),
            },
        );
    })
}

pub unsafe extern "C" fn submit_event_cb(check_id: *mut c_char, event: *mut event_t, _len: c_int) {
    guarded("submit_event", (), || {
        let Some(aggregator) = module(|m| m.aggregator.clone()) else { return };
        if event.is_null() {
            return;
        }
        let ev = &*event;
        aggregator.submit_event(
            &copy_str(check_id),
            Event {
                title: copy_str(ev.title),
                text: copy_str(ev.text),
                timestamp: i64::from(ev.ts),
                priority: copy_str(ev.priority),
                host: copy_str(ev.host),
                tags: copy_null_terminated_from_guest(ev.tags as *const *const c_char),
                alert_type: copy_str(ev.alert_type),
                aggregation_key: copy_str(ev.aggregation_key),
                source_type_name: copy_str(ev.source_type_name),
                event_type: copy_str(ev.event_type),
            },
        );
    })
}

/// Run `argv[..argc]`; failures go to `exception` and leave the other outputs untouched
///
/// The native callback has no `raise_on_empty` argument, the guest wrapper
/// raises on empty output itself.
pub unsafe extern "C" fn get_subprocess_output_cb(
    argv: *mut *mut c_char,
    argc: c_int,
    stdout: *mut *mut c_char,
    stderr: *mut *mut c_char,
    ret_code: *mut c_int,
    exception: *mut *mut c_char,
) {
    guarded("get_subprocess_output", (), || {
        let Some(runner) = module(|m| m.subprocess.clone()) else {
            write_out(exception, "subprocess module is not available");
            return;
        };
        let argv = copy_tags(argv, argc);
        match runner.run(&argv, false) {
            Ok(output) => {
                write_out(stdout, &output.stdout);
                write_out(stderr, &output.stderr);
                if !ret_code.is_null() {
                    *ret_code = output.exit_code;
                }
            }
            Err(e) => write_out(exception, &e.to_string()),
        }
    })
}

/// NULL-terminated tag array, or NULL when the entity has no tags
pub unsafe extern "C" fn tags_cb(entity_id: *mut c_char, cardinality: c_int) -> *mut *mut c_char {
    guarded("tags", ptr::null_mut(), || {
        let Some(tagger) = module(|m| m.tagger.clone()) else {
            return ptr::null_mut();
        };
        let tags = tagger.tags(&copy_str(entity_id), TagCardinality::from_raw(cardinality));
        if tags.is_empty() {
            return ptr::null_mut();
        }
        to_guest_string_array(&tags)
    })
}

pub unsafe extern "C" fn is_excluded_cb(name: *mut c_char, image: *mut c_char) -> c_int {
    guarded("is_excluded", 0, || {
        module(|m| m.containers.clone())
            .map(|filter| c_int::from(filter.is_excluded(&copy_str(name), &copy_str(image))))
            .unwrap_or(0)
    })
}

/// Kubelet connection info as a JSON object; `out` stays NULL when unavailable
pub unsafe extern "C" fn get_connection_info_cb(out: *mut *mut c_char) {
    guarded("get_connection_info", (), || {
        let Some(kubelet) = module(|m| m.kubelet.clone()) else { return };
        match kubelet.connection_info() {
            Ok(info) => match serde_json::to_string(&info) {
                Ok(json) => write_out(out, &json),
                Err(e) => tracing::error!(error = %e, "Failed to serialize kubelet connection info"),
            },
            Err(e) => tracing::warn!(error = %e, "Kubelet connection info unavailable"),
        }
    })
}
