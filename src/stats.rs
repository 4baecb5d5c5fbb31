use std::collections::{BTreeMap, HashMap};

use ndarray::ArrayD;
use thiserror::Error;

use crate::models::RoiStats;

/// Options controlling voxel filtering and which statistics are produced.
#[derive(Debug, Clone, Copy)]
pub struct AggregateOptions {
    pub include_negative: bool,
    pub compute_minmax: bool,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            include_negative: false,
            compute_minmax: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("shape mismatch: labels {labels:?} vs values {values:?}")]
    ShapeMismatch {
        labels: Vec<usize>,
        values: Vec<usize>,
    },
}

/// Computes one [`RoiStats`] record per distinct non-zero label id.
///
/// Two-pass structure: a grouped count/sum/sum-of-squares accumulation gives
/// O(N) mean and standard deviation, and a single stable sort by label yields
/// contiguous per-id runs for the order statistics (quantiles, min/max) that
/// cannot be derived from sums. Accumulator slots are assigned through a
/// sparse id -> index map, so large or sparse atlas ids cost nothing extra.
///
/// Voxels with a non-finite value, and negative values unless
/// `include_negative` is set, never contribute to any region. Ids with zero
/// surviving voxels are absent from the result rather than emitted as
/// placeholders; id 0 (background) is never emitted.
pub fn aggregate(
    labels: &ArrayD<i32>,
    values: &ArrayD<f32>,
    opts: AggregateOptions,
) -> Result<BTreeMap<i32, RoiStats>, StatsError> {
    if labels.shape() != values.shape() {
        return Err(StatsError::ShapeMismatch {
            labels: labels.shape().to_vec(),
            values: values.shape().to_vec(),
        });
    }

    let mut pairs: Vec<(i32, f64)> = labels
        .iter()
        .zip(values.iter())
        .filter(|&(&l, &v)| l > 0 && v.is_finite() && (opts.include_negative || v >= 0.0))
        .map(|(&l, &v)| (l, f64::from(v)))
        .collect();

    if pairs.is_empty() {
        return Ok(BTreeMap::new());
    }

    // Pass 1: grouped accumulation of count / sum / sum of squares.
    let mut slots: HashMap<i32, usize> = HashMap::new();
    let mut counts: Vec<u64> = Vec::new();
    let mut sums: Vec<f64> = Vec::new();
    let mut sumsqs: Vec<f64> = Vec::new();
    for &(id, v) in &pairs {
        let next = counts.len();
        let slot = *slots.entry(id).or_insert(next);
        if slot == next {
            counts.push(0);
            sums.push(0.0);
            sumsqs.push(0.0);
        }
        counts[slot] += 1;
        sums[slot] += v;
        sumsqs[slot] += v * v;
    }

    // Pass 2: sort by id so every region is one contiguous run.
    pairs.sort_by_key(|&(id, _)| id);

    let mut result = BTreeMap::new();
    let mut start = 0usize;
    while start < pairs.len() {
        let id = pairs[start].0;
        let mut end = start;
        while end < pairs.len() && pairs[end].0 == id {
            end += 1;
        }

        let mut vals: Vec<f64> = pairs[start..end].iter().map(|&(_, v)| v).collect();
        vals.sort_by(f64::total_cmp);
        let n = vals.len();

        let slot = slots[&id];
        let count = counts[slot];
        let mean = sums[slot] / count as f64;
        // The clamp absorbs floating-point cancellation; without it the
        // variance of a near-constant region can come out slightly negative.
        let variance = (sumsqs[slot] / count as f64 - mean * mean).max(0.0);
        let std = variance.sqrt();

        let p05 = quantile(&vals, 0.05);
        let q1 = quantile(&vals, 0.25);
        let median = quantile(&vals, 0.50);
        let q3 = quantile(&vals, 0.75);
        let p95 = quantile(&vals, 0.95);
        let iqr = q3 - q1;

        let pct_within = |low: f64, high: f64| {
            let hits = vals.iter().filter(|&&v| v >= low && v <= high).count();
            100.0 * hits as f64 / n as f64
        };
        let pct_within_1sd = if mean.is_finite() && std.is_finite() {
            pct_within(mean - std, mean + std)
        } else {
            f64::NAN
        };
        let pct_within_whiskers = if iqr.is_finite() {
            pct_within(q1 - 1.5 * iqr, q3 + 1.5 * iqr)
        } else {
            f64::NAN
        };

        result.insert(
            id,
            RoiStats {
                n_voxels: count,
                mean,
                std,
                min: opts.compute_minmax.then(|| vals[0]),
                max: opts.compute_minmax.then(|| vals[n - 1]),
                p05,
                q1,
                median,
                q3,
                p95,
                iqr,
                pct_within_1sd,
                pct_within_whiskers,
            },
        );

        start = end;
    }

    Ok(result)
}

/// The filtered raw voxel sample for a single ROI, using the same validity
/// rule as [`aggregate`]. Feeds the per-ROI distribution plots.
pub fn roi_values(
    labels: &ArrayD<i32>,
    values: &ArrayD<f32>,
    roi_id: i32,
    include_negative: bool,
) -> Result<Vec<f32>, StatsError> {
    if labels.shape() != values.shape() {
        return Err(StatsError::ShapeMismatch {
            labels: labels.shape().to_vec(),
            values: values.shape().to_vec(),
        });
    }
    Ok(labels
        .iter()
        .zip(values.iter())
        .filter(|&(&l, &v)| l == roi_id && v.is_finite() && (include_negative || v >= 0.0))
        .map(|(_, &v)| v)
        .collect())
}

/// Linear-interpolation quantile over an ascending-sorted slice: interpolates
/// between the two nearest order statistics at rank `q * (n - 1)`.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let h = q * (sorted.len() - 1) as f64;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (h - lo as f64)
}
