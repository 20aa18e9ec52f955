//! Boot telemetry
//!
//! After a successful boot one recurring gauge series is queued so fleet
//! dashboards can show which Python version every agent embeds.

use crate::error::BridgeResult;
use crate::runtime::RuntimeVersion;

/// Name of the python version series
pub const PYTHON_VERSION_METRIC: &str = "datadog.agent.python.version";

/// Series type understood by the metrics intake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesType {
    Gauge,
    Count,
    Rate,
}

/// A metric series sent on every flush
#[derive(Debug, Clone, PartialEq)]
pub struct Serie {
    pub name: String,
    pub points: Vec<f64>,
    pub tags: Vec<String>,
    pub series_type: SeriesType,
}

/// Host mechanism for series re-sent on every flush
#[cfg_attr(test, mockall::automock)]
pub trait SeriesSink: Send + Sync {
    fn add_recurrent_series(&self, serie: Serie) -> BridgeResult<()>;
}

/// Sink that only logs the series, for running without a metrics pipeline
#[derive(Debug, Default)]
pub struct LoggingSeriesSink;

impl SeriesSink for LoggingSeriesSink {
    fn add_recurrent_series(&self, serie: Serie) -> BridgeResult<()> {
        tracing::info!(metric = %serie.name, tags = ?serie.tags, "Recurrent series registered");
        Ok(())
    }
}

/// Tags for the python version series
///
/// Agent version tags are left out when `agent_version` is not semver.
pub fn boot_tags(version: RuntimeVersion, agent_version: &str) -> Vec<String> {
    let mut tags = vec![format!("python_version:{}", version.major())];

    match semver::Version::parse(agent_version) {
        Ok(agent) => {
            tags.push(format!("agent_version_major:{}", agent.major));
            tags.push(format!("agent_version_minor:{}", agent.minor));
            tags.push(format!("agent_version_patch:{}", agent.patch));
        }
        Err(e) => {
            tracing::debug!(
                agent_version = %agent_version,
                error = %e,
                "Agent version is not semver, omitting version tags"
            );
        }
    }

    tags
}

/// Queue the python version series; failures are logged, never returned
pub fn report_boot(sink: &dyn SeriesSink, version: RuntimeVersion, agent_version: &str) {
    let serie = Serie {
        name: PYTHON_VERSION_METRIC.to_string(),
        points: vec![1.0],
        tags: boot_tags(version, agent_version),
        series_type: SeriesType::Gauge,
    };

    if let Err(e) = sink.add_recurrent_series(serie) {
        tracing::warn!(error = %e, "Failed to register python version telemetry");
    }
}
