//! # duckbench
//!
//! Runs a locomotion policy for one of the supported bipeds in the control
//! loop, against the built-in simulated substrate.
//!
//! ```text
//! duckbench --variant open_duck_mini_v2 --policy policy.json --realtime -k
//! duckbench --variant bdx --zero-policy --max-ticks 2000 --record runs/
//! duckbench --variant bdx identify --dof left_knee --out left_knee.json
//! ```
//!
//! Logging goes through `tracing`; set `RUST_LOG` to change the filter
//! (default `info`). A fatal control-loop error is reported with its kind
//! and tick, and the process exits non-zero.

mod app;
mod keyboard;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = app::Cli::parse();
    app::run(cli)
}
