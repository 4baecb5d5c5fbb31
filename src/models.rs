//
// models.rs
// ROI-Stats-rs
//
// Defines serializable data structures for per-ROI statistics and report rows.
//

use serde::{Deserialize, Serialize};

/// Aggregate statistics over the voxels of one ROI.
///
/// `min`/`max` are `None` when min/max computation was disabled. Quantiles and
/// percentages may be NaN for degenerate distributions; NaN is the in-memory
/// "not available" sentinel and becomes `NA` in written tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoiStats {
    pub n_voxels: u64,
    pub mean: f64,
    pub std: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub p05: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub p95: f64,
    pub iqr: f64,
    pub pct_within_1sd: f64,
    pub pct_within_whiskers: f64,
}

/// One line of a (group, modality) report table.
///
/// Rows exist for every non-zero id present in the atlas, including ids whose
/// voxels were all filtered out; those carry `n_voxels == 0` and NaN fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRow {
    pub group: String,
    pub modality: String,
    pub template_file: String,
    pub roi_id: i32,
    pub roi_base_id: i32,
    pub hemisphere: String,
    pub roi_name: String,
    pub n_voxels: u64,
    pub mean: f64,
    pub std: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub p05: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub p95: f64,
    pub iqr: f64,
    pub pct_within_1sd: f64,
    pub pct_within_whiskers: f64,
}
