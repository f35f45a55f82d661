use std::{path::PathBuf, sync::OnceLock};

use clap::Parser;

/// Rolling-window alert monitoring for the tuna fleet.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the config file.
    #[arg(short, long, default_value = "fleetwatch.toml")]
    pub config: PathBuf,
    /// Refresh interval in seconds, overrides the config file value.
    #[arg(short, long)]
    pub refresh: Option<u64>,
}

static ARGS: OnceLock<Args> = OnceLock::new();

pub fn get_cli_args() -> &'static Args {
    ARGS.get_or_init(Args::parse)
}
