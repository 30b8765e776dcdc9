use std::path::PathBuf;

use clap::Parser;

/// With no flags the run is driven entirely by the config file.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "taskmill", version, about = "Run a config-driven graph of task scripts")]
pub struct Args {
    /// Config file tried before TASKMILL_CONFIG and the default locations.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Run every enabled task without the interactive selector.
    #[arg(long)]
    pub all: bool,
}
