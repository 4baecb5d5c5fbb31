//
// lib.rs
// ROI-Stats-rs
//
// Exposes the crate's modules and re-exports the CLI entry point for both
// binary and library consumers.
//

// Public surface of the library: each module mirrors a CLI verb or shared
// pipeline stage.
pub mod cli;
pub mod config;
pub mod discover;
pub mod labels;
pub mod models;
pub mod pipeline;
pub mod plot;
pub mod report;
pub mod stats;
pub mod volume;

pub use cli::{run as run_cli, Cli, Commands};
