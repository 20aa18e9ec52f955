//! `kubeutil` module: kubelet connection info for the local node

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::{BridgeError, BridgeResult};

/// How checks should reach the local kubelet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KubeletConnectionInfo {
    pub url: String,
    pub host: String,
    pub port: u16,
    pub scheme: String,
    pub verify_tls: bool,
}

/// Resolves kubelet connection info
#[cfg_attr(test, mockall::automock)]
pub trait KubeletConnectivity: Send + Sync {
    fn connection_info(&self) -> BridgeResult<KubeletConnectionInfo>;
}

/// [`KubeletConnectivity`] from the configured kubelet host and ports
#[derive(Debug, Clone)]
pub struct SettingsKubelet {
    host: Option<String>,
    https_port: u16,
    http_port: u16,
    verify_tls: bool,
}

impl SettingsKubelet {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            host: settings.kubelet_host.clone(),
            https_port: settings.kubelet_https_port,
            http_port: settings.kubelet_http_port,
            verify_tls: settings.kubelet_tls_verify,
        }
    }
}

impl KubeletConnectivity for SettingsKubelet {
    fn connection_info(&self) -> BridgeResult<KubeletConnectionInfo> {
        let host = self
            .host
            .as_deref()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| BridgeError::Kubelet("kubelet_host is not configured".to_string()))?;

        // HTTPS wins when both ports are set
        let (scheme, port) = if self.https_port > 0 {
            ("https", self.https_port)
        } else if self.http_port > 0 {
            ("http", self.http_port)
        } else {
            return Err(BridgeError::Kubelet("no kubelet port configured".to_string()));
        };

        Ok(KubeletConnectionInfo {
            url: format!("{}://{}:{}", scheme, host, port),
            host: host.to_string(),
            port,
            scheme: scheme.to_string(),
            verify_tls: scheme == "https" && self.verify_tls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kubelet(host: Option<&str>, https_port: u16, http_port: u16) -> SettingsKubelet {
        SettingsKubelet {
            host: host.map(str::to_string),
            https_port,
            http_port,
            verify_tls: true,
        }
    }

    #[test]
    fn test_https_preferred() {
        let info = kubelet(Some("10.0.0.5"), 10250, 10255).connection_info().unwrap();
        assert_eq!(info.url, "https://10.0.0.5:10250");
        assert_eq!(info.scheme, "https");
        assert!(info.verify_tls);
    }

    #[test]
    fn test_http_fallback() {
        let info = kubelet(Some("node-1"), 0, 10255).connection_info().unwrap();
        assert_eq!(info.url, "http://node-1:10255");
        assert!(!info.verify_tls);
    }

    #[test]
    fn test_missing_host_or_ports() {
        assert!(matches!(kubelet(None, 10250, 0).connection_info(), Err(BridgeError::Kubelet(_))));
        assert!(matches!(kubelet(Some(""), 10250, 0).connection_info(), Err(BridgeError::Kubelet(_))));
        assert!(matches!(kubelet(Some("node"), 0, 0).connection_info(), Err(BridgeError::Kubelet(_))));
    }

    #[test]
    fn test_defaults_from_settings() {
        let settings = Settings {
            kubelet_host: Some("127.0.0.1".to_string()),
            ..Default::default()
        };
        let info = SettingsKubelet::from_settings(&settings).connection_info().unwrap();
        assert_eq!(info.port, 10250);
    }
}
