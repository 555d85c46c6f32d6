//! `rlnc-bench relay` — encoder → relay → sink over lossy in-process links.
//!
//! Each node runs on its own thread and owns its coder. Links are bounded
//! crossbeam channels; every hop drops a payload with the configured loss
//! probability before forwarding it. The relay recodes each payload it
//! receives, either as a full decoder or as a pure recoder with a bounded cache.

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use rlnc_engine::metrics::StageMetrics;
use rlnc_engine::{DecodeOutcome, Decoder, Encoder, Recoder, SessionMetrics};
use std::sync::atomic::{AtomicBool, Ordering::Relaxed};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::config::{check_loss, BenchConfig, Scenario};

const LINK_CAPACITY: usize = 1024;
const MAX_PAYLOADS_FACTOR: usize = 100;

/// How the middle node forwards.
enum RelayNode {
    Decoder(Decoder),
    Cache(Recoder),
}

impl RelayNode {
    fn absorb(&mut self, payload: &[u8]) -> Result<()> {
        match self {
            RelayNode::Decoder(d) => {
                d.decode(payload)?;
            }
            RelayNode::Cache(r) => {
                r.read_payload(payload)?;
            }
        }
        Ok(())
    }

    fn recode(&mut self) -> Result<Vec<u8>> {
        Ok(match self {
            RelayNode::Decoder(d) => d.recode()?,
            RelayNode::Cache(r) => r.recode()?,
        })
    }
}

pub fn run(
    config: &BenchConfig,
    scenario: Option<String>,
    loss: Option<f64>,
    cache: Option<usize>,
) -> Result<()> {
    let scenario = match scenario {
        Some(name) => config.scenario(&name)?,
        None => config
            .scenarios
            .iter()
            .find(|s| s.factory.scheme.supports_recoding())
            .context("no scenario supports recoding — add one to the config")?,
    };
    if !scenario.factory.scheme.supports_recoding() {
        anyhow::bail!(
            "scenario '{}' uses {}, which cannot be recoded",
            scenario.name,
            scenario.factory.scheme
        );
    }
    let loss = check_loss(loss.unwrap_or(scenario.loss))?;

    eprintln!(
        "rlnc-bench relay — {} ({} × {} B over {}), loss {:.0}% per link, relay={}",
        scenario.name,
        scenario.factory.symbols,
        scenario.factory.symbol_size,
        scenario.factory.field,
        loss * 100.0,
        cache.map_or("decoder".to_string(), |c| format!("cache({c})")),
    );

    let summary = run_pipeline(scenario, loss, cache)?;
    let json = serde_json::to_string_pretty(&summary.nodes)?;
    println!("{}", json);

    eprintln!();
    eprintln!("=== RELAY SUMMARY ===");
    for n in &summary.nodes {
        eprintln!(
            "  {:<7} sent={:<6} lost={:<6} delivered={:<6} redundant={:<6} recoded={}",
            n.name,
            n.payloads_sent,
            n.payloads_lost,
            n.payloads_delivered,
            n.payloads_redundant,
            n.payloads_recoded,
        );
    }
    if !summary.decoded {
        anyhow::bail!("sink did not decode the generation");
    }
    eprintln!(
        "  recode avg={} ns  sink decode avg={} ns",
        summary.recode_avg_ns, summary.decode_avg_ns
    );
    eprintln!("  sink decoded the generation intact");
    Ok(())
}

pub struct PipelineSummary {
    pub decoded: bool,
    pub nodes: Vec<rlnc_engine::SessionMetricsSnapshot>,
    /// Mean time per recode at the relay.
    pub recode_avg_ns: u64,
    pub decode_avg_ns: u64,
}

pub fn run_pipeline(scenario: &Scenario, loss: f64, cache: Option<usize>) -> Result<PipelineSummary> {
    let mut factory = scenario.build_factory()?;
    if let Some(c) = cache {
        factory.set_recoder_capacity(c)?;
    }
    let mut encoder = factory.build_encoder();
    scenario.configure(&mut encoder)?;
    let relay = match cache {
        Some(_) => RelayNode::Cache(factory.build_recoder()?),
        None => RelayNode::Decoder(factory.build_decoder()),
    };
    let sink = factory.build_decoder();

    let seed = scenario.factory.seed.unwrap_or_else(|| rand::thread_rng().next_u64());
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; encoder.block_size()];
    rng.fill_bytes(&mut data);
    encoder.set_symbols(&data)?;

    let source_metrics = SessionMetrics::new("source");
    let relay_metrics = SessionMetrics::new("relay");
    let sink_metrics = SessionMetrics::new("sink");
    let stages = Arc::new(StageMetrics::new());
    let done = Arc::new(AtomicBool::new(false));
    let limit = encoder.symbols() * MAX_PAYLOADS_FACTOR;

    let (to_relay, relay_rx) = crossbeam_channel::bounded::<Vec<u8>>(LINK_CAPACITY);
    let (to_sink, sink_rx) = crossbeam_channel::bounded::<Vec<u8>>(LINK_CAPACITY);

    let source_handle = {
        let metrics = Arc::clone(&source_metrics);
        let done = Arc::clone(&done);
        let rng = StdRng::seed_from_u64(seed ^ 1);
        std::thread::Builder::new()
            .name("relay-source".into())
            .spawn(move || source_loop(encoder, to_relay, metrics, done, rng, loss, limit))
            .context("failed to spawn source thread")?
    };

    let relay_handle = {
        let metrics = Arc::clone(&relay_metrics);
        let stages = Arc::clone(&stages);
        let rng = StdRng::seed_from_u64(seed ^ 2);
        std::thread::Builder::new()
            .name("relay-node".into())
            .spawn(move || relay_loop(relay, relay_rx, to_sink, metrics, stages, rng, loss))
            .context("failed to spawn relay thread")?
    };

    let sink_handle: JoinHandle<Result<Vec<u8>>> = {
        let metrics = Arc::clone(&sink_metrics);
        let stages = Arc::clone(&stages);
        let done = Arc::clone(&done);
        std::thread::Builder::new()
            .name("relay-sink".into())
            .spawn(move || sink_loop(sink, sink_rx, metrics, stages, done))
            .context("failed to spawn sink thread")?
    };

    let decoded_block = join(sink_handle, "sink")??;
    join(relay_handle, "relay")??;
    join(source_handle, "source")??;

    Ok(PipelineSummary {
        decoded: decoded_block == data,
        nodes: vec![
            source_metrics.snapshot(),
            relay_metrics.snapshot(),
            sink_metrics.snapshot(),
        ],
        recode_avg_ns: stages.recode.avg_ns(),
        decode_avg_ns: stages.decode.avg_ns(),
    })
}

fn join<T>(handle: JoinHandle<T>, name: &str) -> Result<T> {
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("{} thread panicked", name))
}

fn source_loop(
    mut encoder: Encoder,
    out: Sender<Vec<u8>>,
    metrics: Arc<SessionMetrics>,
    done: Arc<AtomicBool>,
    mut rng: StdRng,
    loss: f64,
    limit: usize,
) -> Result<()> {
    for _ in 0..limit {
        if done.load(Relaxed) {
            break;
        }
        let payload = encoder.encode()?;
        metrics.record_sent(payload.len());
        if rng.gen_bool(loss) {
            metrics.payloads_lost.fetch_add(1, Relaxed);
            continue;
        }
        if out.send(payload).is_err() {
            break;
        }
    }
    tracing::debug!(sent = metrics.payloads_sent.load(Relaxed), "source finished");
    Ok(())
}

fn relay_loop(
    mut node: RelayNode,
    input: Receiver<Vec<u8>>,
    out: Sender<Vec<u8>>,
    metrics: Arc<SessionMetrics>,
    stages: Arc<StageMetrics>,
    mut rng: StdRng,
    loss: f64,
) -> Result<()> {
    for payload in input {
        metrics.payloads_delivered.fetch_add(1, Relaxed);
        node.absorb(&payload)?;
        let recoded = stages.recode.time(|| node.recode())?;
        metrics.payloads_recoded.fetch_add(1, Relaxed);
        metrics.record_sent(recoded.len());
        if rng.gen_bool(loss) {
            metrics.payloads_lost.fetch_add(1, Relaxed);
            continue;
        }
        if out.send(recoded).is_err() {
            break;
        }
    }
    Ok(())
}

fn sink_loop(
    mut decoder: Decoder,
    input: Receiver<Vec<u8>>,
    metrics: Arc<SessionMetrics>,
    stages: Arc<StageMetrics>,
    done: Arc<AtomicBool>,
) -> Result<Vec<u8>> {
    for payload in input {
        metrics.payloads_delivered.fetch_add(1, Relaxed);
        if stages.decode.time(|| decoder.decode(&payload))? == DecodeOutcome::Redundant {
            metrics.payloads_redundant.fetch_add(1, Relaxed);
        }
        if decoder.is_complete() {
            metrics.record_complete();
            tracing::debug!(rank = decoder.rank(), "sink complete");
            break;
        }
    }
    done.store(true, Relaxed);
    Ok(decoder.copy_symbols())
}
