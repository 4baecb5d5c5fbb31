//
// config.rs
// ROI-Stats-rs
//
// Explicit runtime configuration; every path and default is resolved once at
// startup instead of being looked up implicitly during execution.
//

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::labels::ResolveOptions;
use crate::report::OutputFormat;

pub const DEFAULT_LABELS_VOLUME: &str = "resources/100_AMBA_LR.nii.gz";
pub const DEFAULT_LABELS_TABLE: &str = "resources/allen_labels_table.csv";
pub const DEFAULT_MODALITIES: &str = "T1map,UNIT1";

/// Which ROI ids get a diagnostic plot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoiSelection {
    /// Plot nothing (the default).
    None,
    /// Plot every id present in the atlas.
    All,
    /// Plot an explicit id list.
    Ids(Vec<i32>),
}

impl RoiSelection {
    /// Parses the `--roi-ids` argument: empty selects nothing, `all` selects
    /// every present id, anything else is a comma-separated id list.
    pub fn parse(arg: &str) -> Result<Self> {
        let s = arg.trim().to_ascii_lowercase();
        if s.is_empty() {
            return Ok(Self::None);
        }
        if s == "all" {
            return Ok(Self::All);
        }
        let mut ids = Vec::new();
        for tok in s.split(',') {
            let tok = tok.trim();
            if tok.is_empty() {
                continue;
            }
            let id = tok
                .parse::<i32>()
                .with_context(|| format!("Invalid ROI id {:?} in --roi-ids", tok))?;
            ids.push(id);
        }
        Ok(Self::Ids(ids))
    }
}

/// Per-ROI plot settings; absent entirely when plots are disabled.
#[derive(Debug, Clone)]
pub struct PlotConfig {
    pub selection: RoiSelection,
    /// Cap on the number of plots per (group, modality); 0 means no cap.
    pub max_plots: usize,
    /// Cap on drawn points per plot; 0 draws every voxel.
    pub max_points: usize,
}

/// Fully resolved pipeline configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub out_root: PathBuf,
    pub labels_path: PathBuf,
    pub table_path: PathBuf,
    pub modalities: Vec<String>,
    pub outdir: PathBuf,
    pub format: OutputFormat,
    pub resolve: ResolveOptions,
    pub include_negative: bool,
    pub compute_minmax: bool,
    pub plots: Option<PlotConfig>,
}

/// Splits a comma-separated modality list, dropping empty entries.
pub fn parse_modalities(arg: &str) -> Vec<String> {
    arg.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_selection_means_none() {
        assert_eq!(RoiSelection::parse("").expect("parse"), RoiSelection::None);
        assert_eq!(
            RoiSelection::parse("  ").expect("parse"),
            RoiSelection::None
        );
    }

    #[test]
    fn all_keyword_is_case_insensitive() {
        assert_eq!(RoiSelection::parse("ALL").expect("parse"), RoiSelection::All);
    }

    #[test]
    fn id_lists_tolerate_whitespace_and_blanks() {
        assert_eq!(
            RoiSelection::parse("214, 2214,,3").expect("parse"),
            RoiSelection::Ids(vec![214, 2214, 3])
        );
    }

    #[test]
    fn bad_ids_are_rejected() {
        assert!(RoiSelection::parse("214,xyz").is_err());
    }

    #[test]
    fn modality_lists_drop_empty_entries() {
        assert_eq!(
            parse_modalities("T1map, UNIT1,,"),
            vec!["T1map".to_string(), "UNIT1".to_string()]
        );
        assert!(parse_modalities("").is_empty());
    }
}
