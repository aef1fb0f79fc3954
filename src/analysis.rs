//! Tools for analyzing the retired instruction stream.

pub mod imem;
pub mod pattern;

pub use imem::*;
pub use pattern::*;

use std::collections::*;
use std::io::{self, Write};

use crate::inflight::*;

/// Rows whose share of retired instructions is below this percentage are
/// collapsed in the report.
pub const MIN_REPORT_WEIGHT: f64 = 0.01;

/// Per-instruction statistics, indexed by the [pc_str] of each instruction.
#[derive(Clone, Debug, Default)]
pub struct InstStats {
    pub data: BTreeMap<String, ImemInst>,

    /// Number of retired instructions
    pub total_count: u64,
}
impl InstStats {
    pub fn new() -> Self { Self::default() }

    /// Add a retired instruction.
    pub fn add_retired(&mut self, op: &InflightEntry) {
        self.total_count += 1;
        self.data.entry(op.pc_str())
            .or_insert_with(|| ImemInst::new(op))
            .add(op);
    }

    pub fn get(&self, pc: u64, piece: u32) -> Option<&ImemInst> {
        self.data.get(&pc_str(pc, piece))
    }

    /// Returns the number of unique static instructions.
    pub fn num_unique_insts(&self) -> usize { self.data.len() }

    /// Write one line per static instruction, ordered by the text of its
    /// program counter and piece.
    pub fn dump_imem(&self, w: &mut impl Write) -> io::Result<()> {
        writeln!(w, "================ IMEM Start ================")?;
        let mut run_count = 0;
        let mut skipped = 0;
        for inst in self.data.values() {
            run_count += inst.count;
            let weight = 100.0 * inst.count as f64 / self.total_count as f64;
            let run_weight = 100.0 * run_count as f64 / self.total_count as f64;
            if weight < MIN_REPORT_WEIGHT {
                skipped += 1;
                continue;
            }
            if skipped > 0 {
                writeln!(w, " ... skipped {} lines.", skipped)?;
                skipped = 0;
            }
            writeln!(w, "{:>8}{:>7.3}%{:>7.2}%  {}",
                inst.count, weight, run_weight, inst.display_str())?;
        }
        if skipped > 0 {
            writeln!(w, " ... skipped {} lines.", skipped)?;
        }
        writeln!(w, "================ IMEM End ================")?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn retire(stats: &mut InstStats, pc: u64, n: usize) {
        for i in 0..n {
            let mut op = InflightEntry::candidate(pc, 0);
            op.value = i as u64;
            stats.add_retired(&op);
        }
    }

    #[test]
    fn rare_instructions_are_collapsed() {
        let mut stats = InstStats::new();
        retire(&mut stats, 0x10, 1);
        retire(&mut stats, 0x20, 20_000);
        retire(&mut stats, 0x30, 1);
        assert_eq!(stats.num_unique_insts(), 3);

        let mut out = Vec::new();
        stats.dump_imem(&mut out).unwrap();
        let s = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = s.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1], " ... skipped 1 lines.");
        assert!(lines[2].starts_with("   20000 99.990%"));
        assert!(lines[2].contains("%  0x0000000000000020.0  ???"));
        assert_eq!(lines[3], " ... skipped 1 lines.");
    }

    #[test]
    fn rows_follow_pc_text_order() {
        let mut stats = InstStats::new();
        for piece in [2, 0x10] {
            let mut op = InflightEntry::candidate(0x40, piece);
            op.value = 1;
            stats.add_retired(&op);
        }
        assert_eq!(stats.get(0x40, 2).unwrap().count, 1);
        assert_eq!(stats.get(0x40, 0x10).unwrap().count, 1);

        let mut out = Vec::new();
        stats.dump_imem(&mut out).unwrap();
        let s = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = s.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("  0x0000000000000040.10  "));
        assert!(lines[2].contains("  0x0000000000000040.2  "));
    }
}
