//! Implementations of different value predictors.

pub mod confidence;
pub mod table;
pub mod stride;
pub mod fuzzy;

pub use confidence::*;
pub use table::*;
pub use stride::*;
pub use fuzzy::*;

use std::io::{self, Write};

use crate::error::InvariantViolation;
use crate::inflight::*;

/// Interface to a value predictor driven by the three pipeline events of a
/// dynamic instruction: lookup at issue, speculative update at execute and
/// final update at retire.
///
/// Predictors talk to later events (and to each other) only through the
/// flags on the [InflightEntry].
pub trait ValuePredictor {
    fn name(&self) -> &'static str;

    /// Make a prediction. `num_inflights` is the number of occurrences of the
    /// same static instruction currently in flight, including this one.
    fn lookup(&mut self, op: &mut InflightEntry, num_inflights: u32)
        -> Prediction;

    /// Account for the outcome judged by the host at execute.
    fn spec_update(&mut self, op: &mut InflightEntry)
        -> Result<(), InvariantViolation>;

    /// Train with the retired value.
    fn final_update(&mut self, op: &InflightEntry);

    /// Forget an instruction that was looked up but will never reach
    /// [ValuePredictor::spec_update] (flushed, or retired without executing).
    fn squash(&mut self, _op: &InflightEntry) {}

    /// Write runtime statistics for the end-of-run report.
    fn dump_stats(&self, _w: &mut dyn Write) -> io::Result<()> { Ok(()) }
}
