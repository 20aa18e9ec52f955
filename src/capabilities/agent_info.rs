//! `datadog_agent` module: agent facts, configuration, logging and external tags

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

use crate::config::Settings;

/// Severity of a log line emitted by guest code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Map a Python `logging` level number
    pub fn from_python(level: i32) -> Self {
        match level {
            l if l >= 50 => LogLevel::Critical,
            l if l >= 40 => LogLevel::Error,
            l if l >= 30 => LogLevel::Warning,
            l if l >= 20 => LogLevel::Info,
            l if l >= 10 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

/// Host agent facts and services available to checks
#[cfg_attr(test, mockall::automock)]
pub trait AgentInfo: Send + Sync {
    /// Agent version string
    fn version(&self) -> String;

    /// Canonical hostname of this agent
    fn hostname(&self) -> String;

    /// Orchestrator cluster name, empty when unknown
    fn cluster_name(&self) -> String;

    /// HTTP headers checks should send
    fn headers(&self) -> BTreeMap<String, String>;

    /// Named configuration value, `None` when unset
    fn config_value(&self, key: &str) -> Option<serde_json::Value>;

    /// Emit a guest log line through the agent logger
    fn log(&self, message: &str, level: LogLevel);

    /// Attach host tags reported by a check for a given source type
    fn set_external_tags(&self, hostname: &str, source_type: &str, tags: Vec<String>);
}

/// [`AgentInfo`] backed by the agent settings
pub struct SettingsAgentInfo {
    settings: Settings,

    /// External host tags keyed by (hostname, source type)
    external_tags: Mutex<HashMap<(String, String), Vec<String>>>,
}

impl SettingsAgentInfo {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            external_tags: Mutex::new(HashMap::new()),
        }
    }

    /// Tags last reported for a host and source type
    pub fn external_tags(&self, hostname: &str, source_type: &str) -> Option<Vec<String>> {
        self.external_tags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(hostname.to_string(), source_type.to_string()))
            .cloned()
    }
}

impl AgentInfo for SettingsAgentInfo {
    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    fn hostname(&self) -> String {
        if let Some(hostname) = self.settings.hostname.as_deref().filter(|h| !h.is_empty()) {
            return hostname.to_string();
        }

        gethostname::gethostname()
            .into_string()
            .unwrap_or_else(|_| "unknown".to_string())
    }

    fn cluster_name(&self) -> String {
        self.settings.cluster_name.clone().unwrap_or_default()
    }

    fn headers(&self) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        headers.insert("User-Agent".to_string(), format!("Alga Agent/{}", self.version()));
        headers.insert(
            "Content-Type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );
        headers.insert("Accept".to_string(), "text/html, */*".to_string());
        headers
    }

    fn config_value(&self, key: &str) -> Option<serde_json::Value> {
        self.settings.value(key)
    }

    fn log(&self, message: &str, level: LogLevel) {
        match level {
            LogLevel::Critical => tracing::error!(target: "python", critical = true, "{}", message),
            LogLevel::Error => tracing::error!(target: "python", "{}", message),
            LogLevel::Warning => tracing::warn!(target: "python", "{}", message),
            LogLevel::Info => tracing::info!(target: "python", "{}", message),
            LogLevel::Debug => tracing::debug!(target: "python", "{}", message),
            LogLevel::Trace => tracing::trace!(target: "python", "{}", message),
        }
    }

    fn set_external_tags(&self, hostname: &str, source_type: &str, tags: Vec<String>) {
        tracing::debug!(
            hostname = %hostname,
            source_type = %source_type,
            tags = tags.len(),
            "Setting external host tags"
        );
        self.external_tags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((hostname.to_string(), source_type.to_string()), tags);
    }
}
