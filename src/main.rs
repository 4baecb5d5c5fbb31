//
// main.rs
// ROI-Stats-rs
//
// Entry point: installs the log subscriber and hands execution to the CLI
// layer.
//

use roi_stats::cli;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    cli::run()
}
