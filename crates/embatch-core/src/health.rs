//! Health reporting for the services the pipeline depends on.

use std::collections::HashMap;
use std::time::Duration;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::IntoStaticStr;

/// Status of a dependency, ordered from best to worst.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ServiceStatus {
    #[default]
    Healthy,
    /// Reachable but impaired.
    Degraded,
    Unhealthy,
}

impl ServiceStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// One health probe result.
///
/// Serialized as the body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: ServiceStatus,
    /// Round-trip time of the probe, when one was measured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub checked_at: Timestamp,
    /// Free-form details keyed by name, one entry per component when combined.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metrics: HashMap<String, Value>,
}

impl ServiceHealth {
    fn report(status: ServiceStatus, message: Option<String>) -> Self {
        Self {
            status,
            response: None,
            message,
            checked_at: Timestamp::now(),
            metrics: HashMap::new(),
        }
    }

    pub fn healthy() -> Self {
        Self::report(ServiceStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::report(ServiceStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::report(ServiceStatus::Unhealthy, Some(message.into()))
    }

    #[must_use]
    pub fn with_response_time(self, response: Duration) -> Self {
        Self {
            response: Some(response),
            ..self
        }
    }

    #[must_use]
    pub fn with_metric(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }

    /// Merges component reports into one carrying the worst status.
    ///
    /// Each component's status lands in `metrics` under its name, and the
    /// messages of components that reported one are joined in order.
    pub fn combine(reports: impl IntoIterator<Item = (&'static str, Self)>) -> Self {
        let mut combined = Self::healthy();
        let mut messages = Vec::new();

        for (component, report) in reports {
            combined.status = combined.status.max(report.status);
            combined
                .metrics
                .insert(component.to_owned(), Value::from(report.status.as_str()));
            if let Some(message) = report.message {
                messages.push(format!("{component}: {message}"));
            }
        }

        combined.message = (!messages.is_empty()).then(|| messages.join("; "));
        combined
    }

    /// Returns `true` unless the service is unhealthy.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status < ServiceStatus::Unhealthy
    }
}
