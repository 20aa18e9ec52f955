//! `containers` module: container exclusion policy
//!
//! Rules are `name:<regex>` or `image:<regex>` strings. A container is
//! excluded when an exclude rule matches it and no include rule does.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::Settings;
use crate::error::{BridgeError, BridgeResult};

/// Infrastructure pause containers, excluded unless disabled
static PAUSE_CONTAINER_RULES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"gcr\.io/google_containers/pause.*",
        r"k8s\.gcr\.io/pause.*",
        r"registry\.k8s\.io/pause.*",
        r"kubernetes/pause",
        r"azurecr\.io/pause.*",
        r"openshift/origin-pod",
        r"rancher/pause.*",
        r"docker\.io/rancher/pause.*",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("pause container pattern"))
    .collect()
});

/// Raw include/exclude rules from configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerRules {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub exclude_pause: bool,
}

impl ContainerRules {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            include: settings.ac_include.clone(),
            exclude: settings.ac_exclude.clone(),
            exclude_pause: settings.exclude_pause_container,
        }
    }
}

/// Answers whether a container is excluded from checks
#[cfg_attr(test, mockall::automock)]
pub trait ContainerExclusion: Send + Sync {
    fn is_excluded(&self, name: &str, image: &str) -> bool;
}

/// Compiled container exclusion filter
#[derive(Debug, Clone, Default)]
pub struct ContainerFilter {
    include_names: Vec<Regex>,
    include_images: Vec<Regex>,
    exclude_names: Vec<Regex>,
    exclude_images: Vec<Regex>,
}

impl ContainerFilter {
    /// Compile the configured rules
    pub fn from_rules(rules: &ContainerRules) -> BridgeResult<Self> {
        let (include_names, include_images) = compile_rules(&rules.include)?;
        let (exclude_names, mut exclude_images) = compile_rules(&rules.exclude)?;

        if rules.exclude_pause {
            exclude_images.extend(PAUSE_CONTAINER_RULES.iter().cloned());
        }

        Ok(Self {
            include_names,
            include_images,
            exclude_names,
            exclude_images,
        })
    }
}

impl ContainerExclusion for ContainerFilter {
    fn is_excluded(&self, name: &str, image: &str) -> bool {
        let matches = |names: &[Regex], images: &[Regex]| {
            names.iter().any(|re| re.is_match(name)) || images.iter().any(|re| re.is_match(image))
        };

        matches(&self.exclude_names, &self.exclude_images)
            && !matches(&self.include_names, &self.include_images)
    }
}

/// Split rules into (name, image) regex lists
fn compile_rules(rules: &[String]) -> BridgeResult<(Vec<Regex>, Vec<Regex>)> {
    let mut names = Vec::new();
    let mut images = Vec::new();

    for rule in rules {
        let (kind, pattern) = rule
            .split_once(':')
            .ok_or_else(|| BridgeError::ContainerFilter(format!("rule without a key: {}", rule)))?;

        let regex = Regex::new(pattern)
            .map_err(|e| BridgeError::ContainerFilter(format!("invalid regex in {}: {}", rule, e)))?;

        match kind.trim() {
            "name" => names.push(regex),
            "image" => images.push(regex),
            other => {
                return Err(BridgeError::ContainerFilter(format!(
                    "unknown rule key {} in {}",
                    other, rule
                )))
            }
        }
    }

    Ok((names, images))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(include: &[&str], exclude: &[&str], exclude_pause: bool) -> ContainerRules {
        ContainerRules {
            include: include.iter().map(|s| s.to_string()).collect(),
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
            exclude_pause,
        }
    }

    #[test]
    fn test_default_filter_excludes_nothing() {
        let filter = ContainerFilter::default();
        assert!(!filter.is_excluded("redis", "redis:7"));
    }

    #[test]
    fn test_exclude_by_name_and_image() {
        let filter = ContainerFilter::from_rules(&rules(&[], &["name:^dd-", "image:^nginx"], false)).unwrap();

        assert!(filter.is_excluded("dd-agent", "datadog/agent"));
        assert!(filter.is_excluded("web", "nginx:1.25"));
        assert!(!filter.is_excluded("web", "httpd:2"));
    }

    #[test]
    fn test_include_overrides_exclude() {
        let filter = ContainerFilter::from_rules(&rules(&["name:frontend"], &["image:.*"], false)).unwrap();

        assert!(filter.is_excluded("worker", "busybox"));
        assert!(!filter.is_excluded("frontend", "busybox"));
    }

    #[test]
    fn test_pause_containers() {
        let with_pause = ContainerFilter::from_rules(&rules(&[], &[], true)).unwrap();
        assert!(with_pause.is_excluded("POD", "k8s.gcr.io/pause:3.1"));
        assert!(!with_pause.is_excluded("app", "myorg/app:1.0"));

        let without_pause = ContainerFilter::from_rules(&rules(&[], &[], false)).unwrap();
        assert!(!without_pause.is_excluded("POD", "k8s.gcr.io/pause:3.1"));
    }

    #[test]
    fn test_malformed_rules_rejected() {
        assert!(matches!(
            ContainerFilter::from_rules(&rules(&[], &["no-colon"], false)),
            Err(BridgeError::ContainerFilter(_))
        ));
        assert!(matches!(
            ContainerFilter::from_rules(&rules(&[], &["label:foo"], false)),
            Err(BridgeError::ContainerFilter(_))
        ));
        assert!(matches!(
            ContainerFilter::from_rules(&rules(&["name:("], &[], false)),
            Err(BridgeError::ContainerFilter(_))
        ));
    }
}
