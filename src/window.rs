//! `rlnc-bench window` — sliding-window session with feedback.
//!
//! Source symbols arrive one per round. Each round the encoder sends a small
//! burst of payloads over a lossy link, and the decoder answers with a
//! feedback bitmap over an equally lossy return link. Acknowledged symbols
//! drop out of the encoder's window.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use rlnc_engine::{
    CodingScheme, DecodeOutcome, Factory, FactoryConfig, Field, SessionMetrics,
    SessionMetricsSnapshot,
};
use serde::Serialize;
use std::sync::atomic::Ordering::Relaxed;

use crate::config::{check_loss, BenchConfig, Scenario};

const BURST: usize = 2;
const MAX_ROUNDS_FACTOR: usize = 100;

#[derive(Debug, Serialize)]
pub struct WindowReport {
    pub scenario: String,
    pub symbols: usize,
    pub rounds: usize,
    pub decoded: bool,
    pub payloads: SessionMetricsSnapshot,
    pub feedback: SessionMetricsSnapshot,
}

pub fn run(config: &BenchConfig, loss: f64) -> Result<()> {
    let loss = check_loss(loss)?;
    let scenario = config
        .scenarios
        .iter()
        .find(|s| s.factory.scheme == CodingScheme::SlidingWindow)
        .cloned()
        .unwrap_or_else(default_scenario);

    eprintln!(
        "rlnc-bench window — {} ({} × {} B over {}), loss {:.0}%",
        scenario.name,
        scenario.factory.symbols,
        scenario.factory.symbol_size,
        scenario.factory.field,
        loss * 100.0
    );

    let report = run_session(&scenario, loss)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    eprintln!();
    eprintln!("=== WINDOW SUMMARY ({} rounds) ===", report.rounds);
    eprintln!(
        "  payloads sent={} lost={} redundant={}  feedback sent={} lost={}",
        report.payloads.payloads_sent,
        report.payloads.payloads_lost,
        report.payloads.payloads_redundant,
        report.feedback.feedback_sent,
        report.feedback.feedback_lost,
    );
    if !report.decoded {
        anyhow::bail!("decoder did not complete within {} rounds", report.rounds);
    }
    Ok(())
}

fn default_scenario() -> Scenario {
    Scenario {
        name: "sw-default".into(),
        factory: FactoryConfig {
            scheme: CodingScheme::SlidingWindow,
            field: Field::Binary8,
            symbols: 32,
            symbol_size: 256,
            expansion: None,
            recoder_capacity: None,
            seed: None,
        },
        density: None,
        width: None,
        systematic: None,
        loss: 0.0,
    }
}

pub fn run_session(scenario: &Scenario, loss: f64) -> Result<WindowReport> {
    if scenario.factory.scheme != CodingScheme::SlidingWindow {
        anyhow::bail!(
            "scenario '{}' uses {}; the window session needs sliding_window",
            scenario.name,
            scenario.factory.scheme
        );
    }
    let factory: Factory = scenario.build_factory()?;
    let mut encoder = factory.build_encoder();
    scenario.configure(&mut encoder)?;
    let mut decoder = factory.build_decoder();

    let seed = scenario.factory.seed.unwrap_or_else(|| rand::thread_rng().next_u64());
    let mut rng = StdRng::seed_from_u64(seed);
    let symbols = encoder.symbols();
    let l = encoder.symbol_size();
    let mut data = vec![0u8; encoder.block_size()];
    rng.fill_bytes(&mut data);

    let payloads = SessionMetrics::new("payloads");
    let feedback = SessionMetrics::new("feedback");
    let max_rounds = symbols * MAX_ROUNDS_FACTOR;

    let mut rounds = 0;
    while !decoder.is_complete() && rounds < max_rounds {
        if rounds < symbols {
            encoder.set_symbol(rounds, &data[rounds * l..(rounds + 1) * l])?;
        }
        rounds += 1;

        for _ in 0..BURST {
            let payload = encoder.encode()?;
            payloads.record_sent(payload.len());
            if rng.gen_bool(loss) {
                payloads.payloads_lost.fetch_add(1, Relaxed);
                continue;
            }
            payloads.payloads_delivered.fetch_add(1, Relaxed);
            if decoder.decode(&payload)? == DecodeOutcome::Redundant {
                payloads.payloads_redundant.fetch_add(1, Relaxed);
            }
        }

        let fb = decoder.write_feedback()?;
        feedback.feedback_sent.fetch_add(1, Relaxed);
        if rng.gen_bool(loss) {
            feedback.feedback_lost.fetch_add(1, Relaxed);
        } else {
            encoder.read_feedback(&fb)?;
        }
        tracing::debug!(round = rounds, rank = decoder.rank(), "window round");
    }

    if decoder.is_complete() {
        payloads.record_complete();
    }
    Ok(WindowReport {
        scenario: scenario.name.clone(),
        symbols,
        rounds,
        decoded: decoder.is_complete() && decoder.copy_symbols() == data,
        payloads: payloads.snapshot(),
        feedback: feedback.snapshot(),
    })
}
