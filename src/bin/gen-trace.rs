
use std::error::Error;
use std::path::PathBuf;

use clap::Parser;

use vpred::*;
use vpred::trace::synthetic::Generator;

/// Write a synthetic value trace.
#[derive(Parser, Debug)]
#[command(name = "gen-trace", version)]
struct Args {
    /// Output file
    output: PathBuf,

    /// Number of records
    #[arg(short, long, default_value_t = 100_000)]
    len: usize,

    /// Number of static instructions in the loop body
    #[arg(short, long, default_value_t = 64)]
    body: usize,

    /// Base program counter of the loop body
    #[arg(long, default_value_t = 0x1000)]
    base: u64,

    #[arg(short, long, default_value_t = 0)]
    seed: u64,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let mut g = Generator::new(args.base, args.seed);
    g.push_random(args.body);
    for op in g.ops() {
        println!("[*] {} {:<4} {:?}", pc_str(op.pc, 0), op.inst_class.mnemonic(),
            op.pattern);
    }

    let name = args.output.display().to_string();
    let trace = ValueTrace::new(&name, g.simulate_for(args.len));
    trace.to_file(&args.output)?;
    println!("[*] Wrote {} records to {}", trace.num_entries(), name);
    Ok(())
}
