//! Host capability modules exposed to guest check code
//!
//! Each module is a fixed set of host operations registered into the live
//! runtime under a stable module name:
//!
//! - `datadog_agent`: agent version, hostname, cluster name, headers, config, logging, external tags
//! - `aggregator`: metric, service check and event submission
//! - `_util`: subprocess execution
//! - `tagger`: entity tag lookup
//! - `containers`: container exclusion policy
//! - `kubeutil`: kubelet connection info

mod agent_info;
mod aggregator;
mod containers;
mod kubeutil;
mod subprocess;
mod tagger;

pub use agent_info::*;
pub use aggregator::*;
pub use containers::*;
pub use kubeutil::*;
pub use subprocess::*;
pub use tagger::*;

use std::fmt;
use std::sync::Arc;

use crate::config::Settings;
use crate::embed::GuestRuntime;

/// Capability module identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CapabilityModule {
    AgentInfo,
    Aggregator,
    Util,
    Tagger,
    Containers,
    KubeUtil,
}

impl CapabilityModule {
    /// Module name as seen from guest code
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityModule::AgentInfo => "datadog_agent",
            CapabilityModule::Aggregator => "aggregator",
            CapabilityModule::Util => "_util",
            CapabilityModule::Tagger => "tagger",
            CapabilityModule::Containers => "containers",
            CapabilityModule::KubeUtil => "kubeutil",
        }
    }
}

impl fmt::Display for CapabilityModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every module, in registration order
pub const ALL_MODULES: [CapabilityModule; 6] = [
    CapabilityModule::AgentInfo,
    CapabilityModule::Aggregator,
    CapabilityModule::Util,
    CapabilityModule::Tagger,
    CapabilityModule::Containers,
    CapabilityModule::KubeUtil,
];

/// A module paired with the host implementation backing it
#[derive(Clone)]
pub enum ModuleBinding {
    AgentInfo(Arc<dyn AgentInfo>),
    Aggregator(Arc<dyn Aggregator>),
    Util(Arc<dyn SubprocessRunner>),
    Tagger(Arc<dyn Tagger>),
    Containers(Arc<dyn ContainerExclusion>),
    KubeUtil(Arc<dyn KubeletConnectivity>),
}

impl ModuleBinding {
    /// Module this binding fills
    pub fn module(&self) -> CapabilityModule {
        match self {
            ModuleBinding::AgentInfo(_) => CapabilityModule::AgentInfo,
            ModuleBinding::Aggregator(_) => CapabilityModule::Aggregator,
            ModuleBinding::Util(_) => CapabilityModule::Util,
            ModuleBinding::Tagger(_) => CapabilityModule::Tagger,
            ModuleBinding::Containers(_) => CapabilityModule::Containers,
            ModuleBinding::KubeUtil(_) => CapabilityModule::KubeUtil,
        }
    }
}

impl fmt::Debug for ModuleBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModuleBinding").field(&self.module()).finish()
    }
}

/// Host implementations for every capability module
#[derive(Clone)]
pub struct HostModules {
    pub agent_info: Arc<dyn AgentInfo>,
    pub aggregator: Arc<dyn Aggregator>,
    pub subprocess: Arc<dyn SubprocessRunner>,
    pub tagger: Arc<dyn Tagger>,
    /// Rules the container filter is built from at registration time
    pub container_rules: ContainerRules,
    pub kubelet: Arc<dyn KubeletConnectivity>,
}

impl HostModules {
    /// Wire the settings-backed modules around a host aggregator and tagger
    pub fn from_settings(
        settings: &Settings,
        aggregator: Arc<dyn Aggregator>,
        tagger: Arc<dyn Tagger>,
    ) -> Self {
        Self {
            agent_info: Arc::new(SettingsAgentInfo::new(settings.clone())),
            aggregator,
            subprocess: Arc::new(CommandRunner),
            tagger,
            container_rules: ContainerRules::from_settings(settings),
            kubelet: Arc::new(SettingsKubelet::from_settings(settings)),
        }
    }
}

/// Bind one module into the runtime dispatch table
///
/// Binding the same module again replaces the slot with the new target.
pub fn register_module(runtime: &mut dyn GuestRuntime, binding: ModuleBinding) {
    tracing::debug!(module = %binding.module(), "Registering capability module");
    runtime.bind(binding);
}

/// Bind every host module into a booted runtime
///
/// The container filter is built right before the containers module is
/// bound since its callback reads the filter without lazy initialization.
pub fn register_all(runtime: &mut dyn GuestRuntime, host: &HostModules) {
    register_module(runtime, ModuleBinding::AgentInfo(host.agent_info.clone()));
    register_module(runtime, ModuleBinding::Aggregator(host.aggregator.clone()));
    register_module(runtime, ModuleBinding::Util(host.subprocess.clone()));
    register_module(runtime, ModuleBinding::Tagger(host.tagger.clone()));

    let filter = match ContainerFilter::from_rules(&host.container_rules) {
        Ok(filter) => filter,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build container filter, no container will be excluded");
            ContainerFilter::default()
        }
    };
    register_module(runtime, ModuleBinding::Containers(Arc::new(filter)));

    register_module(runtime, ModuleBinding::KubeUtil(host.kubelet.clone()));
}
