//! `rlnc-bench bench` — coding throughput benchmark with structured JSON output.
//!
//! For every configured scenario, codes `iterations` random generations end to
//! end (encode, optional simulated loss, decode) and emits a JSON report with
//! setup cost, encode/decode throughput and payload overhead.

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use rlnc_engine::metrics::{now_ns, StageMetrics};
use serde::Serialize;
use std::path::PathBuf;

use crate::config::{check_loss, BenchConfig, Scenario};

/// Upper bound on payloads per generation before a run counts as failed.
const MAX_PAYLOADS_FACTOR: usize = 50;

#[derive(Debug, Serialize)]
pub struct BenchReport {
    pub timestamp: String,
    pub iterations: usize,
    pub scenarios: Vec<ScenarioReport>,
}

#[derive(Debug, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub scheme: String,
    pub field: String,
    pub symbols: usize,
    pub symbol_size: usize,
    pub loss: f64,
    /// Mean factory + coder construction time.
    pub setup_us: f64,
    pub encode_mbps: f64,
    pub decode_mbps: f64,
    /// Mean payloads sent per decoded generation.
    pub payloads_per_generation: f64,
    /// Payloads sent beyond `symbols`, relative to `symbols`.
    pub overhead_pct: f64,
    pub success_rate_pct: f64,
}

struct RunOutcome {
    sent: usize,
    decoded: bool,
}

pub fn run(config: &BenchConfig, iterations: usize, output: Option<PathBuf>) -> Result<()> {
    if config.scenarios.is_empty() {
        anyhow::bail!(
            "no scenarios configured — run `rlnc-bench init > bench.toml` to create a config"
        );
    }
    if iterations == 0 {
        anyhow::bail!("iterations must be at least 1");
    }

    eprintln!(
        "rlnc-bench bench — {} iteration(s) over {} scenario(s)...",
        iterations,
        config.scenarios.len()
    );

    let mut reports = Vec::with_capacity(config.scenarios.len());
    for scenario in &config.scenarios {
        let report = bench_scenario(scenario, iterations)
            .with_context(|| format!("scenario '{}' failed", scenario.name))?;
        eprintln!("  ...{} done", scenario.name);
        reports.push(report);
    }

    let report = BenchReport {
        timestamp: chrono::Utc::now().to_rfc3339(),
        iterations,
        scenarios: reports,
    };

    let json = serde_json::to_string_pretty(&report)?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json)?;
            eprintln!("Report written to {}", path.display());
        }
        None => {
            println!("{}", json);
        }
    }

    // Also print a human-readable summary to stderr
    eprintln!();
    eprintln!("=== BENCH SUMMARY ({} iterations) ===", iterations);
    for s in &report.scenarios {
        eprintln!(
            "  {:<28} enc={:>8.1} MB/s  dec={:>8.1} MB/s  overhead={:>5.1}%  ok={:.0}%",
            s.name, s.encode_mbps, s.decode_mbps, s.overhead_pct, s.success_rate_pct,
        );
    }

    Ok(())
}

fn bench_scenario(scenario: &Scenario, iterations: usize) -> Result<ScenarioReport> {
    let loss = check_loss(scenario.loss)?;
    let seed = scenario.factory.seed.unwrap_or_else(|| rand::thread_rng().next_u64());
    let mut rng = StdRng::seed_from_u64(seed);
    let stages = StageMetrics::new();

    let mut setup_ns = 0u64;
    let mut sent_total = 0usize;
    let mut successes = 0usize;
    let mut block_bytes = 0usize;

    for _ in 0..iterations {
        let start = now_ns();
        let factory = scenario.build_factory()?;
        let mut encoder = factory.build_encoder();
        let mut decoder = factory.build_decoder();
        scenario.configure(&mut encoder)?;
        setup_ns += now_ns().saturating_sub(start);

        let mut data = vec![0u8; encoder.block_size()];
        rng.fill_bytes(&mut data);
        block_bytes = data.len();
        encoder.set_symbols(&data)?;

        let outcome = code_generation(&mut encoder, &mut decoder, &stages, &mut rng, loss)?;
        sent_total += outcome.sent;
        if outcome.decoded && decoder.copy_symbols() == data {
            successes += 1;
        } else {
            tracing::warn!(scenario = %scenario.name, sent = outcome.sent, "generation not decoded");
        }
    }

    let symbols = scenario.factory.symbols;
    let per_gen = sent_total as f64 / iterations as f64;
    Ok(ScenarioReport {
        name: scenario.name.clone(),
        scheme: scenario.factory.scheme.to_string(),
        field: scenario.factory.field.to_string(),
        symbols,
        symbol_size: scenario.factory.symbol_size,
        loss,
        setup_us: setup_ns as f64 / iterations as f64 / 1_000.0,
        encode_mbps: throughput_mbps(block_bytes * iterations, stages.encode.total_ns()),
        decode_mbps: throughput_mbps(block_bytes * iterations, stages.decode.total_ns()),
        payloads_per_generation: per_gen,
        overhead_pct: (per_gen - symbols as f64) / symbols as f64 * 100.0,
        success_rate_pct: successes as f64 / iterations as f64 * 100.0,
    })
}

fn code_generation(
    encoder: &mut rlnc_engine::Encoder,
    decoder: &mut rlnc_engine::Decoder,
    stages: &StageMetrics,
    rng: &mut StdRng,
    loss: f64,
) -> Result<RunOutcome> {
    let limit = encoder.symbols() * MAX_PAYLOADS_FACTOR;
    let mut sent = 0;
    while !decoder.is_complete() && sent < limit {
        let payload = stages.encode.time(|| encoder.encode())?;
        sent += 1;
        if loss > 0.0 && rng.gen_bool(loss) {
            continue;
        }
        stages.decode.time(|| decoder.decode(&payload))?;
    }
    Ok(RunOutcome {
        sent,
        decoded: decoder.is_complete(),
    })
}

fn throughput_mbps(bytes: usize, ns: u64) -> f64 {
    if ns == 0 {
        return 0.0;
    }
    bytes as f64 / 1_000_000.0 / (ns as f64 / 1e9)
}
