//! Sum (counter) aggregation
//!
//! Cumulative points are absolute snapshots: the latest one wins. Delta
//! points are increments and are added together.

use crate::aggregation::{MetricDescriptor, NumberValue, Temporality};
use crate::error::MergeError;
use opentelemetry_proto::tonic::common::v1::KeyValue;
use opentelemetry_proto::tonic::metrics::v1::{Metric, NumberDataPoint, Sum, metric::Data};

/// Running aggregate for one sum series
#[derive(Debug, Clone)]
pub struct CounterAggregate<T: NumberValue> {
    /// Latest snapshot (cumulative) or running total (delta)
    pub value: T,
    /// Identity of the source metric
    pub descriptor: MetricDescriptor,
    /// Data point attributes of the series
    pub attributes: Vec<KeyValue>,
    /// Earliest start timestamp seen
    pub start_time_unix_nano: u64,
    /// Observation time of the snapshot currently held
    pub last_time_unix_nano: u64,
    /// Temporality fixed at creation
    pub temporality: Temporality,
    /// Monotonic flag fixed at creation
    pub monotonic: bool,
}

impl<T: NumberValue> CounterAggregate<T> {
    /// Start a new aggregate from its first observation
    pub fn new(
        descriptor: MetricDescriptor,
        attributes: Vec<KeyValue>,
        temporality: Temporality,
        monotonic: bool,
        start_time_unix_nano: u64,
        time_unix_nano: u64,
        value: T,
    ) -> Self {
        Self {
            value,
            descriptor,
            attributes,
            start_time_unix_nano,
            last_time_unix_nano: time_unix_nano,
            temporality,
            monotonic,
        }
    }

    /// Fold one more observation into the aggregate
    ///
    /// A point whose temporality differs from the aggregate's is rejected and
    /// the aggregate is left unchanged. A cumulative point that is not newer
    /// than the tracked snapshot is ignored.
    pub fn merge(
        &mut self,
        temporality: Temporality,
        start_time_unix_nano: u64,
        time_unix_nano: u64,
        value: T,
    ) -> Result<(), MergeError> {
        if temporality != self.temporality {
            return Err(MergeError::TemporalityMismatch {
                existing: self.temporality.as_str(),
                incoming: temporality.as_str(),
            });
        }

        match self.temporality {
            Temporality::Cumulative => {
                if time_unix_nano > self.last_time_unix_nano {
                    self.value = value;
                    self.start_time_unix_nano =
                        self.start_time_unix_nano.min(start_time_unix_nano);
                    self.last_time_unix_nano = time_unix_nano;
                }
            }
            Temporality::Delta => {
                self.value = self.value.accumulate(value);
                self.start_time_unix_nano = self.start_time_unix_nano.min(start_time_unix_nano);
                self.last_time_unix_nano = self.last_time_unix_nano.max(time_unix_nano);
            }
        }
        Ok(())
    }

    /// Render as a single-point Sum metric stamped with `time_unix_nano`
    pub fn render(&self, time_unix_nano: u64) -> Metric {
        Metric {
            name: self.descriptor.name.clone(),
            description: self.descriptor.description.clone(),
            unit: self.descriptor.unit.clone(),
            data: Some(Data::Sum(Sum {
                data_points: vec![NumberDataPoint {
                    attributes: self.attributes.clone(),
                    start_time_unix_nano: self.start_time_unix_nano,
                    time_unix_nano,
                    value: Some(self.value.into_value()),
                    ..Default::default()
                }],
                aggregation_temporality: self.temporality.to_proto(),
                is_monotonic: self.monotonic,
            })),
            ..Default::default()
        }
    }
}
