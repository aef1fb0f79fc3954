
use std::error::Error;
use std::io;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vpred::*;
use vpred::sim::PipelineModel;
use vpred::trace::synthetic::Generator;

/// Replay a value trace through the stride value predictor.
#[derive(Parser, Debug)]
#[command(name = "evaluate-stride", version)]
struct Args {
    /// Value trace to replay (a synthetic trace is generated if omitted)
    trace: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Instruction to trace, formatted as `0x<pc>.<piece>`
    #[arg(short, long)]
    watch: Option<String>,

    /// Maximum number of instructions in flight
    #[arg(long, default_value_t = 32)]
    window: usize,

    /// Issues between the issue and execute of an instruction
    #[arg(long, default_value_t = 4)]
    exec_lag: usize,

    /// Only replay the first N records
    #[arg(short, long)]
    limit: Option<usize>,

    /// Length of the synthetic trace
    #[arg(long, default_value_t = 100_000)]
    synthetic_len: usize,

    /// Number of static instructions in the synthetic loop body
    #[arg(long, default_value_t = 64)]
    synthetic_body: usize,

    /// Seed for the synthetic trace
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut cfg = match args.config.as_ref() {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    if args.watch.is_some() {
        cfg.watch = args.watch.clone();
    }

    let trace = match args.trace.as_ref() {
        Some(path) => ValueTrace::from_file(path)?,
        None => {
            let mut g = Generator::new(0x1000, args.seed);
            g.push_random(args.synthetic_body);
            ValueTrace::new("synthetic", g.simulate_for(args.synthetic_len))
        },
    };
    let records = match args.limit {
        Some(limit) => trace.as_slice_trunc(limit),
        None => trace.as_slice(),
    };
    println!("[*] Replaying {} records from '{}'", records.len(), trace.name());

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let mut engine = Engine::begin(cfg, &argv)?;
    let model = PipelineModel::new(args.window, args.exec_lag);
    let stats = model.run(&mut engine, records)?;

    println!("[*] Coverage: {}/{} ({:.2}%)",
        stats.global.speculated, stats.global.eligible,
        stats.coverage() * 100.0);
    println!("[*] Accuracy: {}/{} ({:.2}%) ({} mispredictions)",
        stats.global.correct, stats.global.speculated,
        stats.accuracy() * 100.0, stats.global.incorrect);

    let mut out = io::stdout().lock();
    stats.dump(&mut out)?;
    engine.end(&mut out)?;
    Ok(())
}
