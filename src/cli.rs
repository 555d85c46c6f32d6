//! CLI definitions for rlnc-bench.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[clap(
    name = "rlnc-bench",
    version,
    about = "Random linear network coding benchmark\n\nTime encoders and decoders, push generations through lossy recoding relays, and run sliding-window feedback sessions.",
    long_about = None
)]
pub struct Cli {
    /// Path to bench.toml config file
    #[clap(long, short, default_value = "bench.toml")]
    pub config: PathBuf,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Time encode and decode for every configured scenario and output a JSON report
    Bench {
        /// Generations coded per scenario
        #[clap(long, default_value = "20")]
        iterations: usize,

        /// Write JSON report to this file (default: stdout)
        #[clap(long)]
        output: Option<PathBuf>,
    },

    /// Push one generation through encoder -> relay -> sink threads over lossy links
    Relay {
        /// Scenario to run (default: first scenario that supports recoding)
        #[clap(long)]
        scenario: Option<String>,

        /// Loss probability on each link, overriding the scenario's
        #[clap(long)]
        loss: Option<f64>,

        /// Relay through a pure recoder caching this many payloads instead of a decoder
        #[clap(long)]
        cache: Option<usize>,
    },

    /// Sliding-window session with incremental symbols and lossy feedback
    Window {
        /// Loss probability for payloads and feedback
        #[clap(long, default_value = "0.1")]
        loss: f64,
    },

    /// Print an example bench.toml to stdout
    Init,
}
