
use std::error::Error;
use std::path::PathBuf;

use clap::Parser;

use vpred::*;

/// Print the records in a value trace.
#[derive(Parser, Debug)]
#[command(name = "read-trace", version)]
struct Args {
    trace: PathBuf,

    /// Only print the first N records
    #[arg(short, long)]
    limit: Option<usize>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let trace = ValueTrace::from_file(&args.trace)?;
    let records = match args.limit {
        Some(limit) => trace.as_slice_trunc(limit),
        None => trace.as_slice(),
    };

    println!("[*] {}: {} records", trace.name(), trace.num_entries());
    for r in records.iter() {
        let dst = r.dst_reg.map_or("--".to_string(), |d| format!("r{}", d));
        println!("{} {:<4} {:<4} value=0x{:016x} addr=0x{:x} lat={} elig={}",
            r.pc_str(), r.inst_class.mnemonic(), dst, r.value, r.addr,
            r.latency, r.eligible as u8);
    }
    Ok(())
}
