//! Summary estimation for bucketed histograms.
//!
//! When the source does not record exact extrema they are derived from the
//! outermost non-empty buckets; a missing sum is derived from bucket
//! midpoints. The result always satisfies `min <= sum / count <= max`.

use crate::metrics::line::SummaryValue;
use crate::metrics::types::HistogramValue;

/// Estimate min, max and sum of a histogram.
///
/// Exact values present on the input always win over estimates, but they are
/// clamped against the average like estimates are. A histogram without
/// recorded values yields an all-zero summary.
pub fn estimate_summary(histogram: &HistogramValue) -> SummaryValue {
    let count = histogram.count;
    if count == 0 {
        return SummaryValue::default();
    }

    let estimate = if histogram.bucket_boundaries.is_empty() {
        // single bucket spanning everything: the mean is the only information
        let mean = histogram.sum.unwrap_or(0.0) / count as f64;
        BucketEstimate {
            min: mean,
            max: mean,
            sum: 0.0,
        }
    } else {
        BucketEstimate::from_buckets(&histogram.bucket_boundaries, &histogram.bucket_counts)
    };

    let sum = histogram.sum.unwrap_or(estimate.sum);
    let avg = sum / count as f64;
    let mut min = histogram.min.unwrap_or(estimate.min);
    let mut max = histogram.max.unwrap_or(estimate.max);

    if min > avg {
        min = avg;
    }
    if max < avg {
        max = avg;
    }

    SummaryValue::new(min, max, sum, count)
}

#[derive(Debug, Default)]
struct BucketEstimate {
    min: f64,
    max: f64,
    sum: f64,
}

impl BucketEstimate {
    fn from_buckets(boundaries: &[f64], counts: &[u64]) -> Self {
        let mut estimate = Self::default();
        let mut first_non_empty = None;
        let mut last_non_empty = None;

        for (idx, &bucket_count) in counts.iter().enumerate() {
            if bucket_count == 0 {
                continue;
            }
            first_non_empty.get_or_insert(idx);
            last_non_empty = Some(idx);

            let point = match (lower_bound(boundaries, idx), upper_bound(boundaries, idx)) {
                (Some(lower), Some(upper)) => (lower + upper) / 2.0,
                (None, Some(upper)) => upper,
                (Some(lower), None) => lower,
                (None, None) => 0.0,
            };
            estimate.sum += point * bucket_count as f64;
        }

        if let Some(idx) = first_non_empty {
            estimate.min = lower_bound(boundaries, idx)
                .or_else(|| upper_bound(boundaries, idx))
                .unwrap_or(0.0);
        }
        if let Some(idx) = last_non_empty {
            estimate.max = upper_bound(boundaries, idx)
                .or_else(|| lower_bound(boundaries, idx))
                .unwrap_or(0.0);
        }

        estimate
    }
}

fn lower_bound(boundaries: &[f64], idx: usize) -> Option<f64> {
    idx.checked_sub(1).and_then(|i| boundaries.get(i).copied())
}

fn upper_bound(boundaries: &[f64], idx: usize) -> Option<f64> {
    boundaries.get(idx).copied()
}
