//
// report.rs
// ROI-Stats-rs
//
// Joins aggregated statistics with resolved label names into report rows and
// serializes one delimited table per (group, modality).
//

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::labels::{self, ResolveOptions};
use crate::models::{ReportRow, RoiStats};

/// Serialized form of a missing numeric value.
pub const NOT_AVAILABLE: &str = "NA";

/// Table flavor; identical columns either way, only delimiter and extension
/// differ.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Tsv,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Tsv => "tsv",
        }
    }

    pub fn delimiter(self) -> u8 {
        match self {
            OutputFormat::Csv => b',',
            OutputFormat::Tsv => b'\t',
        }
    }
}

pub const HEADER: [&str; 20] = [
    "Group",
    "Modality",
    "TemplateFile",
    "ROI_id",
    "ROI_base_id",
    "Hemisphere",
    "ROI_name",
    "n_voxels",
    "mean",
    "std",
    "min",
    "max",
    "p05",
    "q1",
    "median",
    "q3",
    "p95",
    "iqr",
    "pct_within_1sd",
    "pct_within_whiskers",
];

/// Builds one row per distinct non-zero id present in the atlas, in ascending
/// id order. Ids absent from the stats map (zero qualifying voxels) still get
/// a row, with `n_voxels == 0` and NaN for every float field.
pub fn assemble(
    group: &str,
    modality: &str,
    template_file: &str,
    roi_ids_present: &[i32],
    stats_map: &BTreeMap<i32, RoiStats>,
    table: &HashMap<i32, String>,
    resolve_opts: &ResolveOptions,
) -> Vec<ReportRow> {
    roi_ids_present
        .iter()
        .filter(|&&id| id != 0)
        .map(|&roi_id| {
            let resolved = labels::resolve(roi_id, table, resolve_opts);
            let stats = stats_map.get(&roi_id).cloned().unwrap_or_else(|| RoiStats {
                n_voxels: 0,
                mean: f64::NAN,
                std: f64::NAN,
                min: None,
                max: None,
                p05: f64::NAN,
                q1: f64::NAN,
                median: f64::NAN,
                q3: f64::NAN,
                p95: f64::NAN,
                iqr: f64::NAN,
                pct_within_1sd: f64::NAN,
                pct_within_whiskers: f64::NAN,
            });
            ReportRow {
                group: group.to_string(),
                modality: modality.to_string(),
                template_file: template_file.to_string(),
                roi_id,
                roi_base_id: resolved.base_id,
                hemisphere: resolved.hemisphere.to_string(),
                roi_name: resolved.name,
                n_voxels: stats.n_voxels,
                mean: stats.mean,
                std: stats.std,
                min: stats.min,
                max: stats.max,
                p05: stats.p05,
                q1: stats.q1,
                median: stats.median,
                q3: stats.q3,
                p95: stats.p95,
                iqr: stats.iqr,
                pct_within_1sd: stats.pct_within_1sd,
                pct_within_whiskers: stats.pct_within_whiskers,
            }
        })
        .collect()
}

/// Writes rows as a delimited table. Floats are rounded to two decimals here,
/// at serialization time only; non-finite values become [`NOT_AVAILABLE`].
pub fn write_rows<W: Write>(rows: &[ReportRow], format: OutputFormat, writer: W) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(format.delimiter())
        .from_writer(writer);
    wtr.write_record(HEADER).context("Failed to write header")?;
    for row in rows {
        wtr.write_record(row_record(row))
            .context("Failed to write report row")?;
    }
    wtr.flush().context("Failed to flush report table")?;
    Ok(())
}

/// Writes the table for one (group, modality) under `<outdir>/<group>/` and
/// returns the file path.
pub fn write_table(
    rows: &[ReportRow],
    outdir: &Path,
    group: &str,
    modality: &str,
    format: OutputFormat,
) -> Result<PathBuf> {
    let group_dir = outdir.join(group);
    fs::create_dir_all(&group_dir)
        .with_context(|| format!("Failed to create output directory {:?}", group_dir))?;

    let path = group_dir.join(format!(
        "{}_{}_roi_stats.{}",
        group,
        modality,
        format.extension()
    ));
    let file = fs::File::create(&path)
        .with_context(|| format!("Failed to create report table {:?}", path))?;
    write_rows(rows, format, file)?;
    Ok(path)
}

fn row_record(row: &ReportRow) -> Vec<String> {
    vec![
        row.group.clone(),
        row.modality.clone(),
        row.template_file.clone(),
        row.roi_id.to_string(),
        row.roi_base_id.to_string(),
        row.hemisphere.clone(),
        row.roi_name.clone(),
        row.n_voxels.to_string(),
        fmt2(row.mean),
        fmt2(row.std),
        fmt2_opt(row.min),
        fmt2_opt(row.max),
        fmt2(row.p05),
        fmt2(row.q1),
        fmt2(row.median),
        fmt2(row.q3),
        fmt2(row.p95),
        fmt2(row.iqr),
        fmt2(row.pct_within_1sd),
        fmt2(row.pct_within_whiskers),
    ]
}

fn fmt2(v: f64) -> String {
    if v.is_finite() {
        format!("{:.2}", v)
    } else {
        NOT_AVAILABLE.to_string()
    }
}

fn fmt2_opt(v: Option<f64>) -> String {
    v.map_or_else(|| NOT_AVAILABLE.to_string(), fmt2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_stats() -> RoiStats {
        RoiStats {
            n_voxels: 8,
            mean: 10.0,
            std: 0.004,
            min: Some(9.5),
            max: Some(10.5),
            p05: 9.6,
            q1: 9.875,
            median: 10.0,
            q3: 10.125,
            p95: 10.4,
            iqr: 0.25,
            pct_within_1sd: 75.0,
            pct_within_whiskers: 100.0,
        }
    }

    #[test]
    fn rows_cover_every_present_id_in_order() {
        let mut stats_map = BTreeMap::new();
        stats_map.insert(7, sample_stats());

        let table = HashMap::from([(5, "Thalamus".to_string()), (7, "Cortex".to_string())]);
        let rows = assemble(
            "S01",
            "T1map",
            "S01_T1map_template.nii.gz",
            &[7, 2005],
            &stats_map,
            &table,
            &ResolveOptions::default(),
        );

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].roi_id, 7);
        assert_eq!(rows[0].roi_name, "Cortex_R");
        assert_eq!(rows[0].hemisphere, "R");
        assert_eq!(rows[0].n_voxels, 8);

        // Present in the atlas but without qualifying voxels: sentinel row.
        assert_eq!(rows[1].roi_id, 2005);
        assert_eq!(rows[1].roi_base_id, 5);
        assert_eq!(rows[1].hemisphere, "L");
        assert_eq!(rows[1].roi_name, "Thalamus_L");
        assert_eq!(rows[1].n_voxels, 0);
        assert!(rows[1].mean.is_nan());
        assert_eq!(rows[1].min, None);
    }

    #[test]
    fn background_never_gets_a_row() {
        let rows = assemble(
            "S01",
            "T1map",
            "tpl.nii.gz",
            &[0, 7],
            &BTreeMap::new(),
            &HashMap::new(),
            &ResolveOptions::default(),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].roi_id, 7);
    }

    #[test]
    fn serialization_rounds_and_uses_na_sentinel() {
        let mut stats_map = BTreeMap::new();
        stats_map.insert(7, sample_stats());
        let rows = assemble(
            "S01",
            "T1map",
            "tpl.nii.gz",
            &[7, 9],
            &stats_map,
            &HashMap::new(),
            &ResolveOptions::default(),
        );

        let mut buf = Vec::new();
        write_rows(&rows, OutputFormat::Tsv, &mut buf).expect("write rows");
        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER.join("\t"));

        let row7: Vec<&str> = lines[1].split('\t').collect();
        assert_eq!(row7[3], "7");
        assert_eq!(row7[8], "10.00");
        // Rounding happens at serialization only: 0.004 -> "0.00".
        assert_eq!(row7[9], "0.00");
        assert_eq!(row7[13], "9.88");

        let row9: Vec<&str> = lines[2].split('\t').collect();
        assert_eq!(row9[7], "0");
        assert_eq!(row9[8], NOT_AVAILABLE);
        assert_eq!(row9[10], NOT_AVAILABLE);
        assert_eq!(row9[19], NOT_AVAILABLE);
    }

    #[test]
    fn csv_format_uses_commas() {
        let rows = assemble(
            "S01",
            "T1map",
            "tpl.nii.gz",
            &[7],
            &BTreeMap::new(),
            &HashMap::new(),
            &ResolveOptions::default(),
        );
        let mut buf = Vec::new();
        write_rows(&rows, OutputFormat::Csv, &mut buf).expect("write rows");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.starts_with("Group,Modality,"));
    }
}
