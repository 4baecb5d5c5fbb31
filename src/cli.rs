//
// cli.rs
// ROI-Stats-rs
//
// Defines the CLI surface with Clap and dispatches user-selected commands to
// the corresponding modules.
//

use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{
    self, Config, PlotConfig, RoiSelection, DEFAULT_LABELS_TABLE, DEFAULT_LABELS_VOLUME,
    DEFAULT_MODALITIES,
};
use crate::labels::{self, ResolveOptions};
use crate::pipeline;
use crate::report::{self, OutputFormat};
use crate::stats::{self, AggregateOptions};
use crate::{discover, volume};

/// Command-line interface glue code: defines the available verbs and
/// dispatches to modules.
#[derive(Parser)]
#[command(name = "roi-stats")]
#[command(about = "Atlas ROI statistics over aligned NIfTI template volumes", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Full extraction: one table per Group*Modality plus optional ROI plots
    Extract {
        /// Root directory produced by the upstream pipeline
        out_root: PathBuf,
        /// Labels (atlas) NIfTI volume
        #[arg(long, default_value = DEFAULT_LABELS_VOLUME)]
        labels: PathBuf,
        /// CSV table with `id` and `name` columns
        #[arg(long, default_value = DEFAULT_LABELS_TABLE)]
        labels_table: PathBuf,
        /// Comma-separated modality list
        #[arg(long, default_value = DEFAULT_MODALITIES)]
        modalities: String,
        /// Output directory (default: OUT_ROOT/derivatives/ROI_stats)
        #[arg(long)]
        outdir: Option<PathBuf>,
        /// Write CSV instead of TSV
        #[arg(long)]
        csv: bool,
        /// Additive id offset marking left-hemisphere regions
        #[arg(long, default_value_t = 2000)]
        lr_offset: i32,
        #[arg(long, default_value = "_R")]
        right_suffix: String,
        #[arg(long, default_value = "_L")]
        left_suffix: String,
        /// Keep negative voxel values in the statistics
        #[arg(long)]
        include_negative: bool,
        /// Skip per-ROI min/max
        #[arg(long)]
        no_minmax: bool,
        /// Generate one PNG per selected ROI id
        #[arg(long)]
        per_roi_png: bool,
        /// ROI ids to plot: 'all' or a comma list like '214,2214'
        #[arg(long, default_value = "")]
        roi_ids: String,
        /// Limit the number of ROI PNGs per Group*Modality (0 = no limit)
        #[arg(long, default_value_t = 0)]
        roi_png_max: usize,
        /// Max voxels drawn per ROI plot (0 = no subsample)
        #[arg(long, default_value_t = 5000)]
        roi_max_points: usize,
    },
    /// Statistics for one explicit labels/values volume pair
    Stats {
        /// Labels (atlas) NIfTI volume
        labels: PathBuf,
        /// Value NIfTI volume, same shape as the labels
        values: PathBuf,
        /// Optional CSV table with `id` and `name` columns
        #[arg(long)]
        labels_table: Option<PathBuf>,
        #[arg(long, default_value_t = 2000)]
        lr_offset: i32,
        #[arg(long, default_value = "_R")]
        right_suffix: String,
        #[arg(long, default_value = "_L")]
        left_suffix: String,
        #[arg(long)]
        include_negative: bool,
        #[arg(long)]
        no_minmax: bool,
        /// Write the table here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Comma-delimited output instead of tab-delimited
        #[arg(long)]
        csv: bool,
    },
    /// List the (group, modality, template) pairs that would be processed
    Discover {
        out_root: PathBuf,
        #[arg(long, default_value = DEFAULT_MODALITIES)]
        modalities: String,
    },
}

pub fn run() -> anyhow::Result<()> {
    // Parse the raw CLI arguments once and dispatch to a subcommand handler.
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            out_root,
            labels,
            labels_table,
            modalities,
            outdir,
            csv,
            lr_offset,
            right_suffix,
            left_suffix,
            include_negative,
            no_minmax,
            per_roi_png,
            roi_ids,
            roi_png_max,
            roi_max_points,
        } => {
            let outdir =
                outdir.unwrap_or_else(|| out_root.join("derivatives").join("ROI_stats"));
            let plots = per_roi_png
                .then(|| -> anyhow::Result<PlotConfig> {
                    Ok(PlotConfig {
                        selection: RoiSelection::parse(&roi_ids)?,
                        max_plots: roi_png_max,
                        max_points: roi_max_points,
                    })
                })
                .transpose()?;

            let config = Config {
                out_root,
                labels_path: labels,
                table_path: labels_table,
                modalities: config::parse_modalities(&modalities),
                outdir,
                format: if csv { OutputFormat::Csv } else { OutputFormat::Tsv },
                resolve: ResolveOptions {
                    lr_offset,
                    right_suffix,
                    left_suffix,
                },
                include_negative,
                compute_minmax: !no_minmax,
                plots,
            };

            let succeeded = pipeline::run(&config)?;
            println!("Wrote {} ROI table(s) to {:?}", succeeded, config.outdir);
        }
        Commands::Stats {
            labels,
            values,
            labels_table,
            lr_offset,
            right_suffix,
            left_suffix,
            include_negative,
            no_minmax,
            output,
            csv,
        } => {
            let table = match labels_table {
                Some(path) => labels::load_label_table(&path)?,
                None => HashMap::new(),
            };
            let resolve = ResolveOptions {
                lr_offset,
                right_suffix,
                left_suffix,
            };
            labels::validate_offset(&table, &resolve)?;

            let label_volume = volume::load_label_volume(&labels)?;
            let value_volume = volume::load_value_volume(&values)?;
            let stats_map = stats::aggregate(
                &label_volume,
                &value_volume,
                AggregateOptions {
                    include_negative,
                    compute_minmax: !no_minmax,
                },
            )?;

            let roi_ids = volume::present_roi_ids(&label_volume);
            let source = values
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let rows = report::assemble("-", "-", &source, &roi_ids, &stats_map, &table, &resolve);

            let format = if csv { OutputFormat::Csv } else { OutputFormat::Tsv };
            match output {
                Some(path) => {
                    let file = std::fs::File::create(&path)?;
                    report::write_rows(&rows, format, file)?;
                    println!("ROI table saved to {:?}", path);
                }
                None => report::write_rows(&rows, format, std::io::stdout().lock())?,
            }
        }
        Commands::Discover {
            out_root,
            modalities,
        } => {
            let modalities = config::parse_modalities(&modalities);
            let pairs = discover::discover_templates(&out_root, &modalities);
            if pairs.is_empty() {
                println!("No templates found for modalities: {:?}", modalities);
            }
            for pair in &pairs {
                println!(
                    "{}\t{}\t{}",
                    pair.group,
                    pair.modality,
                    pair.template.display()
                );
            }
        }
    }

    Ok(())
}
