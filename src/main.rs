//! rlnc-bench — random linear network coding benchmark.
//!
//! Drives the `rlnc-engine` coders: throughput benchmarks, lossy recoding
//! relays and sliding-window feedback sessions. Run `rlnc-bench --help` for
//! usage.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod bench;
mod cli;
mod config;
mod relay;
mod window;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    let cli = Cli::parse();

    // Load config (except for `init` which doesn't need it)
    let config = match &cli.command {
        Commands::Init => config::BenchConfig::default_example(),
        _ => {
            if cli.config.exists() {
                config::BenchConfig::load(&cli.config)?
            } else {
                eprintln!(
                    "No '{}' found — using the built-in scenarios (`rlnc-bench init` prints them).",
                    cli.config.display()
                );
                config::BenchConfig::default_example()
            }
        }
    };

    match cli.command {
        Commands::Init => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Bench { iterations, output } => {
            bench::run(&config, iterations, output)?;
        }
        Commands::Relay {
            scenario,
            loss,
            cache,
        } => {
            relay::run(&config, scenario, loss, cache)?;
        }
        Commands::Window { loss } => {
            window::run(&config, loss)?;
        }
    }

    Ok(())
}
