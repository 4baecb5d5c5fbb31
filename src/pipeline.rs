use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use ndarray::ArrayD;
use rayon::prelude::*;
use tracing::{error, info, warn};

use crate::config::{Config, RoiSelection};
use crate::discover::{self, TemplatePair};
use crate::labels;
use crate::models::RoiStats;
use crate::plot;
use crate::report;
use crate::stats::{self, AggregateOptions};
use crate::volume;

/// Runs the full extraction: discover templates, aggregate, write one table
/// per (group, modality), optionally plot. Returns the number of pairs that
/// produced a table; per-pair failures are logged and skipped so one bad
/// input cannot block the rest of the batch.
pub fn run(config: &Config) -> Result<usize> {
    // Missing resources are configuration errors and abort before any pair.
    if !config.labels_path.is_file() {
        bail!("Labels NIfTI not found: {:?}", config.labels_path);
    }
    let table = if config.table_path.is_file() {
        labels::load_label_table(&config.table_path)?
    } else {
        warn!(
            "Label table not found at {:?}; names will be synthesized",
            config.table_path
        );
        HashMap::new()
    };
    labels::validate_offset(&table, &config.resolve)?;

    let label_volume = volume::load_label_volume(&config.labels_path)
        .context("Failed to load the labels volume")?;
    let roi_ids_present = volume::present_roi_ids(&label_volume);

    let pairs = discover::discover_templates(&config.out_root, &config.modalities);
    if pairs.is_empty() {
        info!(
            "No templates found for modalities {:?}; nothing to do",
            config.modalities
        );
        return Ok(0);
    }
    info!("Discovered {} (group, modality) pair(s)", pairs.len());

    // Pairs share only read-only state, so they can run concurrently.
    let succeeded = pairs
        .par_iter()
        .map(
            |pair| match process_pair(config, pair, &label_volume, &roi_ids_present, &table) {
                Ok(()) => 1usize,
                Err(err) => {
                    error!(
                        "Pair {} * {} failed: {:#}",
                        pair.group, pair.modality, err
                    );
                    0
                }
            },
        )
        .sum();

    Ok(succeeded)
}

fn process_pair(
    config: &Config,
    pair: &TemplatePair,
    label_volume: &ArrayD<i32>,
    roi_ids_present: &[i32],
    table: &HashMap<i32, String>,
) -> Result<()> {
    let values = volume::load_value_volume(&pair.template)?;
    let stats_map = stats::aggregate(
        label_volume,
        &values,
        AggregateOptions {
            include_negative: config.include_negative,
            compute_minmax: config.compute_minmax,
        },
    )?;

    let template_file = pair
        .template
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let rows = report::assemble(
        &pair.group,
        &pair.modality,
        &template_file,
        roi_ids_present,
        &stats_map,
        table,
        &config.resolve,
    );

    let out_table = report::write_table(
        &rows,
        &config.outdir,
        &pair.group,
        &pair.modality,
        config.format,
    )?;
    info!("ROI table: {}", out_table.display());

    if let Some(plot_cfg) = &config.plots {
        let roi_ids = match &plot_cfg.selection {
            RoiSelection::None => return Ok(()),
            RoiSelection::All => roi_ids_present.to_vec(),
            RoiSelection::Ids(ids) => ids.clone(),
        };
        let capped = if plot_cfg.max_plots > 0 {
            &roi_ids[..roi_ids.len().min(plot_cfg.max_plots)]
        } else {
            &roi_ids[..]
        };

        for &roi_id in capped {
            if roi_id == 0 {
                continue;
            }
            render_roi_plot(
                config,
                pair,
                label_volume,
                &values,
                &stats_map,
                table,
                roi_id,
                plot_cfg.max_points,
            );
        }
        info!(
            "Per-ROI plots in: {}",
            plots_dir(config, pair).display()
        );
    }

    Ok(())
}

fn plots_dir(config: &Config, pair: &TemplatePair) -> PathBuf {
    config
        .outdir
        .join("plots_by_roi")
        .join(&pair.group)
        .join(&pair.modality)
}

// A failed plot is worth a warning, never worth losing the pair's table.
#[allow(clippy::too_many_arguments)]
fn render_roi_plot(
    config: &Config,
    pair: &TemplatePair,
    label_volume: &ArrayD<i32>,
    values: &ArrayD<f32>,
    stats_map: &BTreeMap<i32, RoiStats>,
    table: &HashMap<i32, String>,
    roi_id: i32,
    max_points: usize,
) {
    let vals = match stats::roi_values(label_volume, values, roi_id, config.include_negative) {
        Ok(vals) => vals,
        Err(err) => {
            warn!("ROI {} sample extraction failed: {}", roi_id, err);
            return;
        }
    };
    if vals.is_empty() {
        return;
    }
    // The same filter fed the aggregation, so a non-empty sample always has a
    // record; skip quietly otherwise.
    let Some(record) = stats_map.get(&roi_id) else {
        return;
    };

    let resolved = labels::resolve(roi_id, table, &config.resolve);
    let out_png = plots_dir(config, pair).join(format!(
        "{}_{}_{}.png",
        pair.group, pair.modality, roi_id
    ));
    if let Err(err) = plot::plot_roi_distribution(
        &vals,
        roi_id,
        &resolved.name,
        resolved.hemisphere,
        record,
        &out_png,
        &pair.modality,
        max_points,
    ) {
        warn!(
            "Plot for ROI {} ({} * {}) failed: {:#}",
            roi_id, pair.group, pair.modality, err
        );
    }
}
