//! Record the value sequence of one instruction and summarize it as runs of
//! equal strides.

use std::io::{self, Write};

use crate::inflight::*;
use crate::watch::WatchTag;

/// A run of consecutive retired values separated by the same stride.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StrideRun {
    /// First value reached with this stride
    pub start: u64,
    pub stride: i64,
    /// Number of consecutive times the stride was observed
    pub repeat: u32,
}

/// Retired values of a single watched instruction.
#[derive(Clone, Debug)]
pub struct PatternRecorder {
    watch: WatchTag,
    values: Vec<u64>,
}
impl PatternRecorder {
    pub fn new(watch: WatchTag) -> Self {
        Self { watch, values: Vec::new() }
    }

    pub fn watch(&self) -> &WatchTag { &self.watch }
    pub fn values(&self) -> &[u64] { &self.values }

    /// Record the value if `op` is the watched instruction.
    pub fn add(&mut self, op: &InflightEntry) {
        if self.watch.matches(op) {
            self.values.push(op.value);
        }
    }

    /// Split the recorded values into runs of equal strides.
    pub fn runs(&self) -> Vec<StrideRun> {
        let mut res: Vec<StrideRun> = Vec::new();
        for w in self.values.windows(2) {
            let stride = w[1].wrapping_sub(w[0]) as i64;
            match res.last_mut() {
                Some(run) if run.stride == stride => run.repeat += 1,
                _ => res.push(StrideRun { start: w[1], stride, repeat: 1 }),
            }
        }
        res
    }

    /// Write the pattern report.
    pub fn dump(&self, w: &mut impl Write) -> io::Result<()> {
        writeln!(w, "================ Pattern Start ================")?;
        writeln!(w, "pc = 0x{:x}, piece = {}", self.watch.pc, self.watch.piece)?;
        if let Some(v) = self.values.first() {
            writeln!(w, "1st appearance: value=0x{:x}", v)?;
        }
        if let Some(v) = self.values.get(1) {
            writeln!(w, "2nd appearance: value=0x{:x}", v)?;
        }
        for run in self.runs() {
            writeln!(w, "0x{:016x}\t{:<22}{:>6}",
                run.start, signed_hex(run.stride), run.repeat)?;
        }
        writeln!(w, "================ Pattern End ================")?;
        Ok(())
    }
}
