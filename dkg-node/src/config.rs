//! Configuration for a DKG node instance.

use std::{path::PathBuf, time::Duration};

use clap::Parser;

/// Configuration of the demo DKG run; parsed from command line arguments
/// or environment variables.
#[derive(Parser, Debug)]
pub struct DkgNodeConfig {
    /// Number of locally simulated participants.
    #[clap(long, env = "DKG_NODE_PARTICIPANTS", default_value = "5")]
    pub participants: usize,

    /// Length of the registration, share distribution and dispute phases,
    /// in blocks.
    #[clap(long, env = "DKG_NODE_PHASE_LENGTH", default_value = "16")]
    pub phase_length: u64,

    /// Blocks to wait after a phase deadline until its submissions count
    /// as final.
    #[clap(long, env = "DKG_NODE_DELTA_CONFIRM", default_value = "2")]
    pub delta_confirm: u64,

    /// Blocks guaranteed to be enough for a transaction to be included.
    #[clap(long, env = "DKG_NODE_DELTA_INCLUDE", default_value = "8")]
    pub delta_include: u64,

    /// Interval at which block height and events are polled.
    #[clap(
        long,
        env = "DKG_NODE_POLL_INTERVAL",
        value_parser = humantime::parse_duration,
        default_value = "100ms"
    )]
    pub poll_interval: Duration,

    /// Wall-clock time per block of the simulated chain.
    #[clap(
        long,
        env = "DKG_NODE_BLOCK_TIME",
        value_parser = humantime::parse_duration,
        default_value = "200ms"
    )]
    pub block_time: Duration,

    /// Directory for persisted participant secrets. Nothing is persisted
    /// when unset.
    #[clap(long, env = "DKG_NODE_STORE_DIR")]
    pub store_dir: Option<PathBuf>,
}
