//! Gauge aggregation
//!
//! Tracks count, sum, extrema and absolute extrema for one gauge series and
//! renders the configured statistics as `<metric>_gauge_<statistic>` gauges.

use crate::aggregation::MetricDescriptor;
use opentelemetry_proto::tonic::common::v1::KeyValue;
use opentelemetry_proto::tonic::metrics::v1::{
    Gauge, Metric, NumberDataPoint, metric::Data, number_data_point::Value,
};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Statistics emitted when a metric has no configured list
pub const DEFAULT_STATISTICS: [GaugeStatistic; 2] =
    [GaugeStatistic::AbsMin, GaugeStatistic::AbsMax];

/// Numeric type a gauge or counter series can be aggregated over
pub trait NumberValue: Copy + PartialOrd + fmt::Debug {
    /// Absolute value; `i64::MIN` saturates to `i64::MAX`
    fn abs_value(self) -> Self;

    /// Running-sum addition
    fn accumulate(self, other: Self) -> Self;

    /// `sum / count`; integers truncate toward zero
    fn average(sum: Self, count: u64) -> Self;

    /// Wrap into the proto data point value
    fn into_value(self) -> Value;
}

impl NumberValue for i64 {
    fn abs_value(self) -> Self {
        self.saturating_abs()
    }

    fn accumulate(self, other: Self) -> Self {
        self.wrapping_add(other)
    }

    fn average(sum: Self, count: u64) -> Self {
        match i64::try_from(count) {
            Ok(0) | Err(_) => 0,
            Ok(count) => sum / count,
        }
    }

    fn into_value(self) -> Value {
        Value::AsInt(self)
    }
}

impl NumberValue for f64 {
    fn abs_value(self) -> Self {
        self.abs()
    }

    fn accumulate(self, other: Self) -> Self {
        self + other
    }

    fn average(sum: Self, count: u64) -> Self {
        sum / count as f64
    }

    fn into_value(self) -> Value {
        Value::AsDouble(self)
    }
}

/// A statistic a gauge series can be reduced to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GaugeStatistic {
    /// Mean of all observations
    Avg,
    /// Sum of all observations
    Sum,
    /// Smallest observation
    Min,
    /// Largest observation
    Max,
    /// Smallest absolute observation
    AbsMin,
    /// Largest absolute observation
    AbsMax,
    /// Number of observations
    Count,
}

impl GaugeStatistic {
    /// Name used in configuration and as output metric suffix
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Avg => "avg",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::AbsMin => "abs_min",
            Self::AbsMax => "abs_max",
            Self::Count => "count",
        }
    }
}

impl fmt::Display for GaugeStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GaugeStatistic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "avg" => Ok(Self::Avg),
            "sum" => Ok(Self::Sum),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "abs_min" => Ok(Self::AbsMin),
            "abs_max" => Ok(Self::AbsMax),
            "count" => Ok(Self::Count),
            other => Err(format!("unknown gauge statistic '{}'", other)),
        }
    }
}

/// Running aggregate for one gauge series
#[derive(Debug, Clone)]
pub struct GaugeAggregate<T: NumberValue> {
    /// Number of observations
    pub count: u64,
    /// Sum of observations
    pub sum: T,
    /// Smallest observation
    pub min: T,
    /// Largest observation
    pub max: T,
    /// Smallest absolute observation
    pub abs_min: T,
    /// Largest absolute observation
    pub abs_max: T,
    /// Identity of the source metric
    pub descriptor: MetricDescriptor,
    /// Data point attributes of the series
    pub attributes: Vec<KeyValue>,
    /// Earliest start timestamp seen
    pub start_time_unix_nano: u64,
}

impl<T: NumberValue> GaugeAggregate<T> {
    /// Start a new aggregate from its first observation
    pub fn new(
        descriptor: MetricDescriptor,
        attributes: Vec<KeyValue>,
        start_time_unix_nano: u64,
        value: T,
    ) -> Self {
        Self {
            count: 1,
            sum: value,
            min: value,
            max: value,
            abs_min: value.abs_value(),
            abs_max: value.abs_value(),
            descriptor,
            attributes,
            start_time_unix_nano,
        }
    }

    /// Fold one more observation into the aggregate
    pub fn merge(&mut self, start_time_unix_nano: u64, value: T) {
        self.count += 1;
        self.sum = self.sum.accumulate(value);
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
        let abs = value.abs_value();
        if abs < self.abs_min {
            self.abs_min = abs;
        }
        if abs > self.abs_max {
            self.abs_max = abs;
        }
        self.start_time_unix_nano = self.start_time_unix_nano.min(start_time_unix_nano);
    }

    /// Mean of the observations
    pub fn average(&self) -> T {
        T::average(self.sum, self.count)
    }

    /// Render the requested statistics as gauge metrics
    ///
    /// `statistics` is the configured list for this metric; `None` or an empty
    /// list selects the default pair. Unrecognized names are logged and skipped.
    pub fn render(&self, time_unix_nano: u64, statistics: Option<&[String]>) -> Vec<Metric> {
        let Some(statistics) = statistics.filter(|s| !s.is_empty()) else {
            return DEFAULT_STATISTICS
                .iter()
                .map(|stat| self.render_statistic(*stat, time_unix_nano))
                .collect();
        };

        statistics
            .iter()
            .filter_map(|name| match name.parse::<GaugeStatistic>() {
                Ok(stat) => Some(self.render_statistic(stat, time_unix_nano)),
                Err(_) => {
                    warn!(
                        metric = %self.descriptor.name,
                        statistic = %name,
                        "Skipping unrecognized gauge statistic"
                    );
                    None
                }
            })
            .collect()
    }

    fn render_statistic(&self, stat: GaugeStatistic, time_unix_nano: u64) -> Metric {
        let value = match stat {
            GaugeStatistic::Avg => self.average().into_value(),
            GaugeStatistic::Sum => self.sum.into_value(),
            GaugeStatistic::Min => self.min.into_value(),
            GaugeStatistic::Max => self.max.into_value(),
            GaugeStatistic::AbsMin => self.abs_min.into_value(),
            GaugeStatistic::AbsMax => self.abs_max.into_value(),
            GaugeStatistic::Count => Value::AsInt(i64::try_from(self.count).unwrap_or(i64::MAX)),
        };
        let unit = match stat {
            GaugeStatistic::Count => String::new(),
            _ => self.descriptor.unit.clone(),
        };

        Metric {
            name: format!("{}_gauge_{}", self.descriptor.name, stat),
            description: self.descriptor.description.clone(),
            unit,
            data: Some(Data::Gauge(Gauge {
                data_points: vec![NumberDataPoint {
                    attributes: self.attributes.clone(),
                    start_time_unix_nano: self.start_time_unix_nano,
                    time_unix_nano,
                    value: Some(value),
                    ..Default::default()
                }],
            })),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> MetricDescriptor {
        MetricDescriptor {
            name: "temp".to_string(),
            description: "temperature".to_string(),
            unit: "Cel".to_string(),
        }
    }

    fn value_of(metric: &Metric) -> Value {
        match metric.data.as_ref() {
            Some(Data::Gauge(g)) => g.data_points[0].value.clone().unwrap(),
            other => panic!("expected gauge, got {:?}", other),
        }
    }

    #[test]
    fn test_statistic_names_parse() {
        assert_eq!("abs_min".parse::<GaugeStatistic>(), Ok(GaugeStatistic::AbsMin));
        assert_eq!(" AVG ".parse::<GaugeStatistic>(), Ok(GaugeStatistic::Avg));
        assert!("median".parse::<GaugeStatistic>().is_err());
    }

    #[test]
    fn test_abs_extrema_track_negative_values() {
        let mut agg = GaugeAggregate::new(descriptor(), vec![], 10, -7i64);
        agg.merge(10, 2);
        agg.merge(10, -1);
        assert_eq!(agg.abs_min, 1);
        assert_eq!(agg.abs_max, 7);
        assert_eq!(agg.min, -7);
        assert_eq!(agg.max, 2);
    }

    #[test]
    fn test_integer_average_truncates_toward_zero() {
        let mut agg = GaugeAggregate::new(descriptor(), vec![], 0, 3i64);
        agg.merge(0, 4);
        assert_eq!(agg.average(), 3);

        let mut neg = GaugeAggregate::new(descriptor(), vec![], 0, -3i64);
        neg.merge(0, -4);
        assert_eq!(neg.average(), -3);
    }

    #[test]
    fn test_float_average_is_exact() {
        let mut agg = GaugeAggregate::new(descriptor(), vec![], 0, 3.0f64);
        agg.merge(0, 4.0);
        assert_eq!(agg.average(), 3.5);
    }

    #[test]
    fn test_start_time_widens_to_earliest() {
        let mut agg = GaugeAggregate::new(descriptor(), vec![], 20, 1.0f64);
        agg.merge(10, 1.0);
        agg.merge(30, 1.0);
        assert_eq!(agg.start_time_unix_nano, 10);
    }

    #[test]
    fn test_render_defaults_to_abs_extrema() {
        let agg = GaugeAggregate::new(descriptor(), vec![], 0, -5i64);
        let metrics = agg.render(99, None);
        let names: Vec<&str> = metrics.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["temp_gauge_abs_min", "temp_gauge_abs_max"]);
        assert_eq!(value_of(&metrics[0]), Value::AsInt(5));
    }

    #[test]
    fn test_render_skips_unknown_statistics() {
        let agg = GaugeAggregate::new(descriptor(), vec![], 0, 2.5f64);
        let stats = vec!["count".to_string(), "p99".to_string(), "max".to_string()];
        let metrics = agg.render(99, Some(&stats));
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].name, "temp_gauge_count");
        assert_eq!(metrics[0].unit, "");
        assert_eq!(value_of(&metrics[0]), Value::AsInt(1));
        assert_eq!(metrics[1].name, "temp_gauge_max");
        assert_eq!(metrics[1].unit, "Cel");
        assert_eq!(value_of(&metrics[1]), Value::AsDouble(2.5));
    }

    #[test]
    fn test_rendered_points_carry_times() {
        let agg = GaugeAggregate::new(descriptor(), vec![], 7, 1i64);
        let metrics = agg.render(1234, None);
        match metrics[0].data.as_ref() {
            Some(Data::Gauge(g)) => {
                assert_eq!(g.data_points[0].start_time_unix_nano, 7);
                assert_eq!(g.data_points[0].time_unix_nano, 1234);
            }
            _ => panic!("expected gauge"),
        }
    }

    #[test]
    fn test_abs_extrema_of_int_min_saturate() {
        let mut agg = GaugeAggregate::new(descriptor(), vec![], 0, i64::MIN);
        assert_eq!(agg.abs_min, i64::MAX);
        assert_eq!(agg.abs_max, i64::MAX);

        agg.merge(0, 3);
        assert_eq!(agg.abs_max, i64::MAX);
        assert_eq!(agg.abs_min, 3);
        assert_eq!(agg.min, i64::MIN);
    }

    #[test]
    fn test_render_empty_statistics_falls_back_to_defaults() {
        let agg = GaugeAggregate::new(descriptor(), vec![], 0, -2.5f64);
        let configured: &[String] = &[];
        let metrics = agg.render(99, Some(configured));
        let names: Vec<&str> = metrics.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["temp_gauge_abs_min", "temp_gauge_abs_max"]);
        assert_eq!(value_of(&metrics[1]), Value::AsDouble(2.5));
    }
}
