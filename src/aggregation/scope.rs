//! Per-scope aggregation state
//!
//! One accumulator exists per distinct scope key within a processor call.
//! Each value kind × metric kind combination has its own map so identical
//! series keys never collide across kinds.

use crate::aggregation::{
    CounterAggregate, GaugeAggregate, HistogramAggregate, MetricDescriptor, NumberValue,
    Temporality, series_key,
};
use crate::config::GaugeStatistics;
use crate::error::MergeError;
use opentelemetry_proto::tonic::common::v1::{InstrumentationScope, KeyValue};
use opentelemetry_proto::tonic::metrics::v1::{
    HistogramDataPoint, Metric, NumberDataPoint, ScopeMetrics, number_data_point::Value,
};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::debug;

/// Aggregation state for one output scope
#[derive(Debug, Default)]
pub struct ScopeAccumulator {
    /// Scope name
    pub name: String,
    /// Scope version
    pub version: String,
    /// Scope attributes (part of the scope key)
    pub attributes: Vec<KeyValue>,
    int_gauges: HashMap<String, GaugeAggregate<i64>>,
    float_gauges: HashMap<String, GaugeAggregate<f64>>,
    int_counters: HashMap<String, CounterAggregate<i64>>,
    float_counters: HashMap<String, CounterAggregate<f64>>,
    histograms: HashMap<String, HistogramAggregate>,
    passthrough: Vec<Metric>,
}

impl ScopeAccumulator {
    /// Create an empty accumulator for `scope`
    pub fn new(scope: &InstrumentationScope) -> Self {
        Self {
            name: scope.name.clone(),
            version: scope.version.clone(),
            attributes: scope.attributes.clone(),
            ..Default::default()
        }
    }

    /// Fold one gauge data point
    pub fn add_gauge_point(&mut self, descriptor: &MetricDescriptor, point: &NumberDataPoint) {
        let key = series_key(&descriptor.name, &point.attributes);
        match point.value {
            Some(Value::AsInt(v)) => {
                upsert_gauge(&mut self.int_gauges, key, descriptor, point, v)
            }
            Some(Value::AsDouble(v)) => {
                upsert_gauge(&mut self.float_gauges, key, descriptor, point, v)
            }
            None => debug!(metric = %descriptor.name, "Skipping gauge data point without a value"),
        }
    }

    /// Fold one sum data point
    pub fn add_counter_point(
        &mut self,
        descriptor: &MetricDescriptor,
        temporality: Temporality,
        monotonic: bool,
        point: &NumberDataPoint,
    ) -> Result<(), MergeError> {
        let key = series_key(&descriptor.name, &point.attributes);
        match point.value {
            Some(Value::AsInt(v)) => upsert_counter(
                &mut self.int_counters,
                key,
                descriptor,
                temporality,
                monotonic,
                point,
                v,
            ),
            Some(Value::AsDouble(v)) => upsert_counter(
                &mut self.float_counters,
                key,
                descriptor,
                temporality,
                monotonic,
                point,
                v,
            ),
            None => {
                debug!(metric = %descriptor.name, "Skipping sum data point without a value");
                Ok(())
            }
        }
    }

    /// Fold one histogram data point
    pub fn add_histogram_point(
        &mut self,
        descriptor: &MetricDescriptor,
        temporality: Temporality,
        point: &HistogramDataPoint,
    ) -> Result<(), MergeError> {
        let key = series_key(&descriptor.name, &point.attributes);
        match self.histograms.entry(key) {
            Entry::Occupied(mut entry) => entry.get_mut().merge(temporality, point),
            Entry::Vacant(entry) => {
                entry.insert(HistogramAggregate::new(
                    descriptor.clone(),
                    temporality,
                    point,
                ));
                Ok(())
            }
        }
    }

    /// Keep a metric that is not aggregated
    pub fn add_passthrough(&mut self, metric: Metric) {
        self.passthrough.push(metric);
    }

    /// Number of distinct aggregated series plus passthrough metrics
    pub fn len(&self) -> usize {
        self.int_gauges.len()
            + self.float_gauges.len()
            + self.int_counters.len()
            + self.float_counters.len()
            + self.histograms.len()
            + self.passthrough.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render all aggregates into one output scope
    ///
    /// Order: int gauges, float gauges, int counters, float counters,
    /// histograms, then passthrough metrics in arrival order.
    pub fn render(
        self,
        time_unix_nano: u64,
        statistics: &GaugeStatistics,
        propagate_attributes: bool,
    ) -> ScopeMetrics {
        let mut metrics = Vec::with_capacity(self.len() * 2);

        for aggregate in self.int_gauges.values() {
            metrics.extend(aggregate.render(
                time_unix_nano,
                statistics.for_metric(&aggregate.descriptor.name),
            ));
        }
        for aggregate in self.float_gauges.values() {
            metrics.extend(aggregate.render(
                time_unix_nano,
                statistics.for_metric(&aggregate.descriptor.name),
            ));
        }
        metrics.extend(self.int_counters.values().map(|a| a.render(time_unix_nano)));
        metrics.extend(self.float_counters.values().map(|a| a.render(time_unix_nano)));
        metrics.extend(self.histograms.values().map(|a| a.render(time_unix_nano)));
        metrics.extend(self.passthrough);

        let attributes = if propagate_attributes {
            self.attributes
        } else {
            Vec::new()
        };

        ScopeMetrics {
            scope: Some(InstrumentationScope {
                name: self.name,
                version: self.version,
                attributes,
                dropped_attributes_count: 0,
            }),
            metrics,
            schema_url: String::new(),
        }
    }
}

fn upsert_gauge<T: NumberValue>(
    map: &mut HashMap<String, GaugeAggregate<T>>,
    key: String,
    descriptor: &MetricDescriptor,
    point: &NumberDataPoint,
    value: T,
) {
    match map.entry(key) {
        Entry::Occupied(mut entry) => entry.get_mut().merge(point.start_time_unix_nano, value),
        Entry::Vacant(entry) => {
            entry.insert(GaugeAggregate::new(
                descriptor.clone(),
                point.attributes.clone(),
                point.start_time_unix_nano,
                value,
            ));
        }
    }
}

fn upsert_counter<T: NumberValue>(
    map: &mut HashMap<String, CounterAggregate<T>>,
    key: String,
    descriptor: &MetricDescriptor,
    temporality: Temporality,
    monotonic: bool,
    point: &NumberDataPoint,
    value: T,
) -> Result<(), MergeError> {
    match map.entry(key) {
        Entry::Occupied(mut entry) => entry.get_mut().merge(
            temporality,
            point.start_time_unix_nano,
            point.time_unix_nano,
            value,
        ),
        Entry::Vacant(entry) => {
            entry.insert(CounterAggregate::new(
                descriptor.clone(),
                point.attributes.clone(),
                temporality,
                monotonic,
                point.start_time_unix_nano,
                point.time_unix_nano,
                value,
            ));
            Ok(())
        }
    }
}
