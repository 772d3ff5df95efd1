//! Explicit-bucket histogram aggregation

use crate::aggregation::{MetricDescriptor, Temporality};
use crate::error::MergeError;
use opentelemetry_proto::tonic::common::v1::KeyValue;
use opentelemetry_proto::tonic::metrics::v1::{
    Histogram, HistogramDataPoint, Metric, metric::Data,
};

/// Running aggregate for one histogram series
#[derive(Debug, Clone)]
pub struct HistogramAggregate {
    /// Total observation count
    pub count: u64,
    /// Sum of observations, when every merged point reported one
    pub sum: Option<f64>,
    /// Largest observation, when every merged point reported one
    pub max: Option<f64>,
    /// Smallest observation, when every merged point reported one
    pub min: Option<f64>,
    /// Per-bucket counts; one more entry than `explicit_bounds`
    pub bucket_counts: Vec<u64>,
    /// Upper bucket boundaries
    pub explicit_bounds: Vec<f64>,
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
}

impl HistogramAggregate {
    /// Snapshot the first point of a series
    pub fn new(
        descriptor: MetricDescriptor,
        temporality: Temporality,
        point: &HistogramDataPoint,
    ) -> Self {
        Self {
            count: point.count,
            sum: point.sum,
            max: point.max,
            min: point.min,
            bucket_counts: point.bucket_counts.clone(),
            explicit_bounds: point.explicit_bounds.clone(),
            descriptor,
            attributes: point.attributes.clone(),
            start_time_unix_nano: point.start_time_unix_nano,
            last_time_unix_nano: point.time_unix_nano,
            temporality,
        }
    }

    /// Fold one more point into the aggregate
    ///
    /// Cumulative: a newer point replaces the snapshot, an older one is
    /// ignored. Delta: the point is added bucket by bucket, which requires an
    /// identical bucket layout. On error the aggregate is unchanged.
    pub fn merge(
        &mut self,
        temporality: Temporality,
        point: &HistogramDataPoint,
    ) -> Result<(), MergeError> {
        if temporality != self.temporality {
            return Err(MergeError::TemporalityMismatch {
                existing: self.temporality.as_str(),
                incoming: temporality.as_str(),
            });
        }

        match self.temporality {
            Temporality::Cumulative => {
                if point.time_unix_nano > self.last_time_unix_nano {
                    self.count = point.count;
                    self.sum = point.sum;
                    self.max = point.max;
                    self.min = point.min;
                    self.bucket_counts = point.bucket_counts.clone();
                    self.explicit_bounds = point.explicit_bounds.clone();
                    self.start_time_unix_nano =
                        self.start_time_unix_nano.min(point.start_time_unix_nano);
                    self.last_time_unix_nano = point.time_unix_nano;
                }
            }
            Temporality::Delta => {
                if self.explicit_bounds != point.explicit_bounds
                    || self.bucket_counts.len() != point.bucket_counts.len()
                {
                    return Err(MergeError::BucketLayoutMismatch {
                        existing_bounds: self.explicit_bounds.len(),
                        incoming_bounds: point.explicit_bounds.len(),
                    });
                }

                for (tracked, incoming) in self.bucket_counts.iter_mut().zip(&point.bucket_counts) {
                    *tracked = tracked.saturating_add(*incoming);
                }
                self.count = self.count.saturating_add(point.count);
                self.sum = combine(self.sum, point.sum, |a, b| a + b);
                self.max = combine(self.max, point.max, f64::max);
                self.min = combine(self.min, point.min, f64::min);
                self.explicit_bounds = point.explicit_bounds.clone();
                self.start_time_unix_nano =
                    self.start_time_unix_nano.min(point.start_time_unix_nano);
                self.last_time_unix_nano = self.last_time_unix_nano.max(point.time_unix_nano);
            }
        }
        Ok(())
    }

    /// Render as a single-point Histogram metric stamped with `time_unix_nano`
    pub fn render(&self, time_unix_nano: u64) -> Metric {
        Metric {
            name: self.descriptor.name.clone(),
            description: self.descriptor.description.clone(),
            unit: self.descriptor.unit.clone(),
            data: Some(Data::Histogram(Histogram {
                data_points: vec![HistogramDataPoint {
                    attributes: self.attributes.clone(),
                    start_time_unix_nano: self.start_time_unix_nano,
                    time_unix_nano,
                    count: self.count,
                    sum: self.sum,
                    bucket_counts: self.bucket_counts.clone(),
                    explicit_bounds: self.explicit_bounds.clone(),
                    min: self.min,
                    max: self.max,
                    ..Default::default()
                }],
                aggregation_temporality: self.temporality.to_proto(),
            })),
            ..Default::default()
        }
    }
}

fn combine(a: Option<f64>, b: Option<f64>, f: impl Fn(f64, f64) -> f64) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a, b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(time: u64, count: u64, sum: f64, min: f64, max: f64, buckets: &[u64]) -> HistogramDataPoint {
        HistogramDataPoint {
            start_time_unix_nano: 10,
            time_unix_nano: time,
            count,
            sum: Some(sum),
            min: Some(min),
            max: Some(max),
            bucket_counts: buckets.to_vec(),
            explicit_bounds: vec![0.0, 5.0, 10.0],
            ..Default::default()
        }
    }

    fn descriptor() -> MetricDescriptor {
        MetricDescriptor {
            name: "latency".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_delta_merge_sums_buckets() {
        let mut agg = HistogramAggregate::new(
            descriptor(),
            Temporality::Delta,
            &point(30, 1, 2.0, 2.0, 2.0, &[0, 1, 0, 0]),
        );
        agg.merge(Temporality::Delta, &point(40, 2, 13.0, 6.0, 7.0, &[0, 0, 2, 0]))
            .unwrap();
        assert_eq!(agg.count, 3);
        assert_eq!(agg.sum, Some(15.0));
        assert_eq!(agg.min, Some(2.0));
        assert_eq!(agg.max, Some(7.0));
        assert_eq!(agg.bucket_counts, vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_delta_merge_rejects_different_bounds() {
        let first = point(30, 1, 2.0, 2.0, 2.0, &[0, 1, 0, 0]);
        let mut agg = HistogramAggregate::new(descriptor(), Temporality::Delta, &first);
        let mut other = point(40, 2, 13.0, 6.0, 7.0, &[0, 0, 2, 0]);
        other.explicit_bounds = vec![0.0, 5.0, 20.0];
        let err = agg.merge(Temporality::Delta, &other).unwrap_err();
        assert!(matches!(err, MergeError::BucketLayoutMismatch { .. }));
        assert_eq!(agg.count, 1);
        assert_eq!(agg.sum, Some(2.0));
        assert_eq!(agg.bucket_counts, vec![0, 1, 0, 0]);
        assert_eq!(agg.explicit_bounds, vec![0.0, 5.0, 10.0]);
    }

    #[test]
    fn test_delta_merge_rejects_different_bucket_count() {
        let mut agg = HistogramAggregate::new(
            descriptor(),
            Temporality::Delta,
            &point(30, 1, 2.0, 2.0, 2.0, &[0, 1, 0, 0]),
        );
        let short = point(40, 1, 2.0, 2.0, 2.0, &[0, 1, 0]);
        assert!(agg.merge(Temporality::Delta, &short).is_err());
        assert_eq!(agg.bucket_counts.len(), 4);
    }

    #[test]
    fn test_cumulative_newer_point_replaces_snapshot() {
        let mut agg = HistogramAggregate::new(
            descriptor(),
            Temporality::Cumulative,
            &point(30, 1, 2.0, 2.0, 2.0, &[0, 1, 0, 0]),
        );
        agg.merge(Temporality::Cumulative, &point(40, 2, 6.0, 2.0, 4.0, &[0, 2, 0, 0]))
            .unwrap();
        agg.merge(Temporality::Cumulative, &point(35, 9, 9.0, 9.0, 9.0, &[0, 0, 9, 0]))
            .unwrap();
        assert_eq!(agg.count, 2);
        assert_eq!(agg.sum, Some(6.0));
        assert_eq!(agg.max, Some(4.0));
        assert_eq!(agg.bucket_counts, vec![0, 2, 0, 0]);
        assert_eq!(agg.last_time_unix_nano, 40);
    }

    #[test]
    fn test_missing_sum_stays_missing() {
        let mut first = point(30, 1, 2.0, 2.0, 2.0, &[0, 1, 0, 0]);
        first.sum = None;
        let mut agg = HistogramAggregate::new(descriptor(), Temporality::Delta, &first);
        agg.merge(Temporality::Delta, &point(40, 1, 3.0, 3.0, 3.0, &[0, 1, 0, 0]))
            .unwrap();
        assert_eq!(agg.sum, None);
        assert_eq!(agg.count, 2);
    }

    #[test]
    fn test_render_carries_layout_and_times() {
        let agg = HistogramAggregate::new(
            descriptor(),
            Temporality::Delta,
            &point(30, 1, 2.0, 2.0, 2.0, &[0, 1, 0, 0]),
        );
        let metric = agg.render(500);
        match metric.data {
            Some(Data::Histogram(h)) => {
                assert_eq!(h.aggregation_temporality, Temporality::Delta.to_proto());
                let dp = &h.data_points[0];
                assert_eq!(dp.start_time_unix_nano, 10);
                assert_eq!(dp.time_unix_nano, 500);
                assert_eq!(dp.explicit_bounds, vec![0.0, 5.0, 10.0]);
                assert_eq!(dp.bucket_counts, vec![0, 1, 0, 0]);
            }
            other => panic!("expected histogram, got {:?}", other),
        }
    }
}
