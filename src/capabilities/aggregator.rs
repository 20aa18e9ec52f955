//! `aggregator` module: metric, service check and event submission

/// Metric types a check may submit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Gauge,
    Rate,
    Count,
    MonotonicCount,
    Counter,
    Histogram,
    Historate,
}

impl MetricType {
    /// Decode the embedding library's metric type tag
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(MetricType::Gauge),
            1 => Some(MetricType::Rate),
            2 => Some(MetricType::Count),
            3 => Some(MetricType::MonotonicCount),
            4 => Some(MetricType::Counter),
            5 => Some(MetricType::Histogram),
            6 => Some(MetricType::Historate),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Gauge => "gauge",
            MetricType::Rate => "rate",
            MetricType::Count => "count",
            MetricType::MonotonicCount => "monotonic_count",
            MetricType::Counter => "counter",
            MetricType::Histogram => "histogram",
            MetricType::Historate => "historate",
        }
    }
}

/// One metric sample submitted by a check
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub name: String,
    pub metric_type: MetricType,
    pub value: f64,
    pub tags: Vec<String>,
    pub hostname: String,
}

/// Service check status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceCheckStatus {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl ServiceCheckStatus {
    /// Decode a raw status, anything unexpected is `Unknown`
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => ServiceCheckStatus::Ok,
            1 => ServiceCheckStatus::Warning,
            2 => ServiceCheckStatus::Critical,
            _ => ServiceCheckStatus::Unknown,
        }
    }
}

/// Service check result submitted by a check
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCheck {
    pub name: String,
    pub status: ServiceCheckStatus,
    pub tags: Vec<String>,
    pub hostname: String,
    pub message: String,
}

/// Event submitted by a check
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    pub title: String,
    pub text: String,
    /// Unix timestamp in seconds, 0 lets the aggregator stamp it
    pub timestamp: i64,
    pub priority: String,
    pub host: String,
    pub tags: Vec<String>,
    pub alert_type: String,
    pub aggregation_key: String,
    pub source_type_name: String,
    pub event_type: String,
}

/// Sink for check submissions, implemented by the host aggregator
#[cfg_attr(test, mockall::automock)]
pub trait Aggregator: Send + Sync {
    fn submit_metric(&self, check_id: &str, sample: MetricSample);

    fn submit_service_check(&self, check_id: &str, check: ServiceCheck);

    fn submit_event(&self, check_id: &str, event: Event);
}

/// Aggregator that only logs submissions, for running without a host aggregator
#[derive(Debug, Default)]
pub struct LoggingAggregator;

impl Aggregator for LoggingAggregator {
    fn submit_metric(&self, check_id: &str, sample: MetricSample) {
        tracing::debug!(
            check_id = %check_id,
            metric = %sample.name,
            metric_type = sample.metric_type.as_str(),
            value = sample.value,
            "Metric submitted"
        );
    }

    fn submit_service_check(&self, check_id: &str, check: ServiceCheck) {
        tracing::debug!(
            check_id = %check_id,
            service_check = %check.name,
            status = ?check.status,
            "Service check submitted"
        );
    }

    fn submit_event(&self, check_id: &str, event: Event) {
        tracing::debug!(check_id = %check_id, title = %event.title, "Event submitted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_type_from_raw() {
        assert_eq!(MetricType::from_raw(0), Some(MetricType::Gauge));
        assert_eq!(MetricType::from_raw(3), Some(MetricType::MonotonicCount));
        assert_eq!(MetricType::from_raw(6), Some(MetricType::Historate));
        assert_eq!(MetricType::from_raw(7), None);
        assert_eq!(MetricType::from_raw(-1), None);
    }

    #[test]
    fn test_service_check_status_from_raw() {
        assert_eq!(ServiceCheckStatus::from_raw(0), ServiceCheckStatus::Ok);
        assert_eq!(ServiceCheckStatus::from_raw(2), ServiceCheckStatus::Critical);
        assert_eq!(ServiceCheckStatus::from_raw(42), ServiceCheckStatus::Unknown);
    }

    #[test]
    fn test_mock_aggregator_receives_sample() {
        let mut aggregator = MockAggregator::new();
        aggregator
            .expect_submit_metric()
            .withf(|check_id, sample| check_id == "redis:abc" && sample.value == 42.0)
            .times(1)
            .return_const(());

        aggregator.submit_metric(
            "redis:abc",
            MetricSample {
                name: "redis.clients".to_string(),
                metric_type: MetricType::Gauge,
                value: 42.0,
                tags: vec!["role:primary".to_string()],
                hostname: String::new(),
            },
        );
    }
}
