//! Per-batch aggregation engine
//!
//! Folds the data points of one OTLP metrics batch into running aggregates
//! keyed by scope and series identity, then renders each aggregate back into
//! OTLP metrics. All state lives in a [`ScopeAccumulator`] that is created
//! and dropped inside a single processor call.

use opentelemetry_proto::tonic::metrics::v1::AggregationTemporality;

pub mod counter;
pub mod gauge;
pub mod histogram;
pub mod keys;
pub mod scope;

pub use counter::CounterAggregate;
pub use gauge::{GaugeAggregate, GaugeStatistic, NumberValue};
pub use histogram::HistogramAggregate;
pub use keys::{any_value_to_string, scope_key, series_key};
pub use scope::ScopeAccumulator;

/// Temporality of a Sum or Histogram stream
///
/// Only the two mergeable temporalities are represented; `Unspecified`
/// streams never reach an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Temporality {
    /// Each point is an absolute snapshot since a fixed start
    Cumulative,
    /// Each point is an increment since the previous report
    Delta,
}

impl Temporality {
    /// Decode the proto `aggregation_temporality` field
    pub fn from_proto(value: i32) -> Option<Self> {
        match AggregationTemporality::try_from(value) {
            Ok(AggregationTemporality::Cumulative) => Some(Self::Cumulative),
            Ok(AggregationTemporality::Delta) => Some(Self::Delta),
            _ => None,
        }
    }

    /// Encode back into the proto `aggregation_temporality` field
    pub fn to_proto(self) -> i32 {
        match self {
            Self::Cumulative => AggregationTemporality::Cumulative as i32,
            Self::Delta => AggregationTemporality::Delta as i32,
        }
    }

    /// Lowercase name used in log records and errors
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cumulative => "cumulative",
            Self::Delta => "delta",
        }
    }
}

/// Name, description and unit copied from the metric a series first appeared in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricDescriptor {
    /// Metric name
    pub name: String,
    /// Metric description
    pub description: String,
    /// Metric unit
    pub unit: String,
}

impl MetricDescriptor {
    /// Capture the identity fields of a proto metric
    pub fn from_metric(metric: &opentelemetry_proto::tonic::metrics::v1::Metric) -> Self {
        Self {
            name: metric.name.clone(),
            description: metric.description.clone(),
            unit: metric.unit.clone(),
        }
    }
}
