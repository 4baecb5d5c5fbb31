//
// plot.rs
// ROI-Stats-rs
//
// Renders one diagnostic distribution plot per ROI: Tukey box, jittered voxel
// scatter, mean and ±1 SD guides, and a statistics summary block.
//

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};

use crate::models::RoiStats;

// Fixed seeds keep repeated runs on identical input pixel-identical; the
// subsample affects only what is drawn, never the reported statistics.
const SUBSAMPLE_SEED: u64 = 0;
const JITTER_SEED: u64 = 1;

const PLOT_SIZE: (u32, u32) = (550, 750);
const BOX_HALF_WIDTH: f64 = 0.175;

/// Deterministic without-replacement subsample of `0..n`; at most `max_points`
/// indices, everything when `max_points` is 0 or not smaller than `n`.
pub fn subsample_indices(n: usize, max_points: usize) -> Vec<usize> {
    if max_points == 0 || n <= max_points {
        return (0..n).collect();
    }
    let mut rng = StdRng::seed_from_u64(SUBSAMPLE_SEED);
    let mut picked = sample(&mut rng, n, max_points).into_vec();
    picked.sort_unstable();
    picked
}

/// Renders one PNG for a single ROI. `values` is the already-filtered voxel
/// sample; `stats` must come from the full sample. Nothing is written when the
/// sample is empty.
#[allow(clippy::too_many_arguments)]
pub fn plot_roi_distribution(
    values: &[f32],
    roi_id: i32,
    roi_name: &str,
    hemisphere: &str,
    stats: &RoiStats,
    out_png: &Path,
    modality: &str,
    max_points: usize,
) -> Result<()> {
    if values.is_empty() {
        return Ok(());
    }
    if let Some(parent) = out_png.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create plot directory {:?}", parent))?;
    }

    let lo = f64::from(values.iter().copied().fold(f32::INFINITY, f32::min));
    let hi = f64::from(values.iter().copied().fold(f32::NEG_INFINITY, f32::max));
    let pad = ((hi - lo) * 0.05).max(1e-6);
    let (y_min, y_max) = (lo - pad, hi + pad);

    let root = BitMapBackend::new(out_png, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let caption = format!("{} ({}) (ID={})", roi_name, hemisphere, roi_id);
    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 18))
        .margin(12)
        .x_label_area_size(32)
        .y_label_area_size(56)
        .build_cartesian_2d(0.0f64..2.0f64, y_min..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(1)
        .x_label_formatter(&|_| roi_id.to_string())
        .y_desc(format!("{} value", modality))
        .light_line_style(BLACK.mix(0.1))
        .draw()?;

    let x0 = 1.0f64;
    draw_box(&mut chart, values, stats, x0)?;

    // Jittered sampled voxels.
    let picked = subsample_indices(values.len(), max_points);
    let mut jitter = StdRng::seed_from_u64(JITTER_SEED);
    chart.draw_series(picked.iter().map(|&i| {
        let x = x0 + (jitter.gen::<f64>() - 0.5) * 0.10;
        Circle::new((x, f64::from(values[i])), 2, BLACK.mix(0.25).filled())
    }))?;

    // Mean and ±1 SD guides.
    if stats.mean.is_finite() {
        chart.draw_series(DashedLineSeries::new(
            [(0.2, stats.mean), (1.8, stats.mean)],
            8,
            4,
            BLACK.stroke_width(2),
        ))?;
        if stats.std.is_finite() {
            for y in [stats.mean - stats.std, stats.mean + stats.std] {
                chart.draw_series(DashedLineSeries::new(
                    [(0.2, y), (1.8, y)],
                    2,
                    4,
                    BLACK.stroke_width(1),
                ))?;
            }
        }
    }

    draw_summary(&root, stats)?;
    root.present()
        .with_context(|| format!("Failed to write plot {:?}", out_png))?;
    Ok(())
}

type RoiChart<'a, 'b> = ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Box between q1 and q3 with a median bar; whisker ends clamp to the data
/// inside the Tukey fences so outliers do not stretch the drawn box.
fn draw_box(chart: &mut RoiChart, values: &[f32], stats: &RoiStats, x0: f64) -> Result<()> {
    let (q1, q3, median, iqr) = (stats.q1, stats.q3, stats.median, stats.iqr);
    if !(q1.is_finite() && q3.is_finite() && iqr.is_finite()) {
        return Ok(());
    }

    let fence_lo = q1 - 1.5 * iqr;
    let fence_hi = q3 + 1.5 * iqr;
    let mut whisker_lo = q1;
    let mut whisker_hi = q3;
    for &v in values {
        let v = f64::from(v);
        if v >= fence_lo && v < whisker_lo {
            whisker_lo = v;
        }
        if v <= fence_hi && v > whisker_hi {
            whisker_hi = v;
        }
    }

    chart.draw_series(std::iter::once(Rectangle::new(
        [(x0 - BOX_HALF_WIDTH, q1), (x0 + BOX_HALF_WIDTH, q3)],
        RED.mix(0.35).filled(),
    )))?;
    chart.draw_series(std::iter::once(Rectangle::new(
        [(x0 - BOX_HALF_WIDTH, q1), (x0 + BOX_HALF_WIDTH, q3)],
        BLACK.stroke_width(1),
    )))?;
    if median.is_finite() {
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x0 - BOX_HALF_WIDTH, median), (x0 + BOX_HALF_WIDTH, median)],
            BLACK.stroke_width(2),
        )))?;
    }
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(x0, whisker_lo), (x0, q1)],
        BLACK.stroke_width(1),
    )))?;
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(x0, q3), (x0, whisker_hi)],
        BLACK.stroke_width(1),
    )))?;
    Ok(())
}

fn draw_summary(
    root: &DrawingArea<BitMapBackend, plotters::coord::Shift>,
    stats: &RoiStats,
) -> Result<()> {
    let fmt = |v: f64| {
        if v.is_finite() {
            format!("{:.6}", v)
        } else {
            "NA".to_string()
        }
    };
    let fmt_opt = |v: Option<f64>| v.map_or_else(|| "NA".to_string(), fmt);

    let lines = [
        format!("n_voxels: {}", stats.n_voxels),
        format!("mean: {}", fmt(stats.mean)),
        format!("std:  {}", fmt(stats.std)),
        format!("min:  {}", fmt_opt(stats.min)),
        format!("max:  {}", fmt_opt(stats.max)),
    ];
    for (i, line) in lines.iter().enumerate() {
        root.draw(&Text::new(
            line.clone(),
            (PLOT_SIZE.0 as i32 - 190, 48 + 16 * i as i32),
            ("sans-serif", 14),
        ))?;
    }
    Ok(())
}
