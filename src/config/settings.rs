//! Checks runtime settings

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::platform::dirs::get_config_dir;

/// Settings file name inside the agent config directory
pub const SETTINGS_FILE: &str = "checks-runtime.toml";

/// Settings consumed by the embedded runtime and its host modules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Python major version to embed (2 or 3)
    #[serde(default)]
    pub python_version: i64,

    /// Hostname override, the OS hostname is used when unset
    #[serde(default)]
    pub hostname: Option<String>,

    /// Orchestrator cluster name
    #[serde(default)]
    pub cluster_name: Option<String>,

    /// Container include rules (`name:<regex>` / `image:<regex>`)
    #[serde(default)]
    pub ac_include: Vec<String>,

    /// Container exclude rules (`name:<regex>` / `image:<regex>`)
    #[serde(default)]
    pub ac_exclude: Vec<String>,

    /// Exclude infrastructure pause containers
    #[serde(default = "default_true")]
    pub exclude_pause_container: bool,

    /// Kubelet host for the local node
    #[serde(default)]
    pub kubelet_host: Option<String>,

    #[serde(default = "default_kubelet_https_port")]
    pub kubelet_https_port: u16,

    #[serde(default = "default_kubelet_http_port")]
    pub kubelet_http_port: u16,

    #[serde(default = "default_true")]
    pub kubelet_tls_verify: bool,

    /// Enable debug logging
    #[serde(default)]
    pub debug: bool,

    /// Any other key, readable by checks through `config_value`
    #[serde(flatten)]
    pub extra: toml::Table,
}

fn default_true() -> bool {
    true
}

fn default_kubelet_https_port() -> u16 {
    10250
}

fn default_kubelet_http_port() -> u16 {
    10255
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            python_version: 0,
            hostname: None,
            cluster_name: None,
            ac_include: Vec::new(),
            ac_exclude: Vec::new(),
            exclude_pause_container: true,
            kubelet_host: None,
            kubelet_https_port: default_kubelet_https_port(),
            kubelet_http_port: default_kubelet_http_port(),
            kubelet_tls_verify: true,
            debug: false,
            extra: toml::Table::new(),
        }
    }
}

impl Settings {
    /// Default settings file location
    pub fn default_path() -> PathBuf {
        get_config_dir().join(SETTINGS_FILE)
    }

    /// Load settings from the config directory
    pub async fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()).await
    }

    /// Load settings from a file, defaults when it does not exist
    pub async fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            tracing::warn!(
                path = %config_path.display(),
                "Settings file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(config_path)
            .await
            .context("Failed to read settings file")?;

        let settings: Settings = toml::from_str(&content)
            .context("Failed to parse settings file")?;

        Ok(settings)
    }

    /// Look up a setting by key, known fields and extra keys alike
    pub fn value(&self, key: &str) -> Option<serde_json::Value> {
        let all = serde_json::to_value(self).ok()?;
        all.get(key).filter(|v| !v.is_null()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert_eq!(settings.python_version, 0);
        assert_eq!(settings.kubelet_https_port, 10250);
        assert!(settings.exclude_pause_container);
        assert!(!settings.debug);
    }

    #[test]
    fn test_settings_parse_with_extra_keys() {
        let settings: Settings = toml::from_str(
            r#"
            python_version = 2
            ac_exclude = ["image:.*"]
            exclude_pause_container = false

            [proxy]
            https = "http://proxy:3128"
            "#,
        )
        .unwrap();

        assert_eq!(settings.python_version, 2);
        assert_eq!(settings.ac_exclude, vec!["image:.*".to_string()]);
        assert!(!settings.exclude_pause_container);
        assert_eq!(
            settings.value("proxy"),
            Some(serde_json::json!({"https": "http://proxy:3128"}))
        );
    }

    #[test]
    fn test_value_skips_unset_options() {
        let settings = Settings::default();
        assert_eq!(settings.value("hostname"), None);
        assert_eq!(settings.value("kubelet_http_port"), Some(serde_json::json!(10255)));
    }

    #[tokio::test]
    async fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("missing.toml")).await.unwrap();
        assert_eq!(settings.python_version, 0);
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "python_version = 3\ncluster_name = \"edge\"\n").unwrap();

        let settings = Settings::load_from(&path).await.unwrap();
        assert_eq!(settings.python_version, 3);
        assert_eq!(settings.cluster_name.as_deref(), Some("edge"));
    }

    #[tokio::test]
    async fn test_load_invalid_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "python_version = \"three\"\n").unwrap();

        assert!(Settings::load_from(&path).await.is_err());
    }
}
