//! Implementation of a single-stride value predictor.
//!
//! Each entry remembers the last retired value of a static instruction and
//! the difference between its two most recent retired values. Once the same
//! stride has been seen twice in a row, the entry extrapolates from the last
//! retired value across the occurrences that are still in flight.

use std::fmt;
use std::io::{self, Write};

use tracing::debug;

use crate::config::*;
use crate::error::InvariantViolation;
use crate::inflight::*;
use crate::predictor::*;
use crate::watch::*;

/// An entry in a [SingleStridePredictor].
#[derive(Clone, Debug)]
pub struct SingleStrideEntry {
    pc: u64,
    piece: u32,

    /// Tag associated with this entry
    tag: u64,

    /// Confidence in [SingleStrideEntry::stride]
    conf: ConfidenceCounter,

    /// Most recently retired value
    last_value: u64,

    /// Difference between the two most recently retired values; unknown
    /// until the entry has seen a second value
    stride: Option<i64>,

    /// Distance (in occurrences) from the last retired value to the
    /// occurrence predicted by the latest lookup
    predict_ptr: u32,

    /// In-flight instructions that hit this entry at lookup and have not
    /// reached their speculative update yet
    pending: u32,

    /// Report activity on this entry to the trace sink
    watched: bool,
}
impl SingleStrideEntry {
    /// Create an entry from the first retired occurrence of an instruction.
    pub fn new(op: &InflightEntry, cfg: ConfidenceConfig,
        watch: Option<&WatchTag>) -> Self
    {
        Self {
            pc: op.pc,
            piece: op.piece,
            tag: op.tag(),
            conf: ConfidenceCounter::first_seen(cfg),
            last_value: op.value,
            stride: None,
            predict_ptr: 0,
            pending: 0,
            watched: watch.map_or(false, |w| w.matches(op)),
        }
    }

    pub fn confidence(&self) -> u8 { self.conf.value() }
    pub fn last_value(&self) -> u64 { self.last_value }
    pub fn stride(&self) -> Option<i64> { self.stride }
    pub fn predict_ptr(&self) -> u32 { self.predict_ptr }
    pub fn pending(&self) -> u32 { self.pending }
    pub fn is_watched(&self) -> bool { self.watched }

    /// Returns true if this entry is valid and belongs to the instruction.
    pub fn is_tag_match(&self, op: &InflightEntry) -> bool {
        self.conf.is_valid() && self.tag == op.tag()
    }

    /// The value expected `predict_ptr` occurrences after the last retired one.
    fn extrapolate(&self) -> u64 {
        let stride = self.stride.unwrap_or(0);
        let delta = stride.wrapping_mul(self.predict_ptr as i64);
        self.last_value.wrapping_add(delta as u64)
    }

    /// Make a prediction for an instruction that matched this entry.
    pub fn lookup(&mut self, op: &mut InflightEntry, num_inflights: u32)
        -> Prediction
    {
        self.predict_ptr = num_inflights;
        let result = if self.conf.is_confident() {
            op.single_stride_conf_hit = true;
            Prediction::value(self.extrapolate())
        } else {
            Prediction::abstain()
        };
        op.single_stride_hit = true;
        result
    }

    /// Adjust confidence with the outcome judged at execute.
    pub fn spec_update(&mut self, op: &InflightEntry)
        -> Result<(), InvariantViolation>
    {
        match op.prediction_result {
            PredictionOutcome::Incorrect => {
                if !op.single_stride_conf_hit {
                    return Err(InvariantViolation::UnconfidentMisprediction {
                        predictor: SingleStridePredictor::NAME,
                        tag: self.tag,
                    });
                }
                self.conf.weaken();
            },
            PredictionOutcome::Correct => self.conf.strengthen(),
            PredictionOutcome::Unknown => {},
        }
        Ok(())
    }

    /// Train with the retired value.
    pub fn final_update(&mut self, op: &InflightEntry) {
        assert!(self.conf.is_valid());
        let curr_stride = op.value.wrapping_sub(self.last_value) as i64;
        if self.conf.is_first_seen() {
            self.conf.reset();
            self.stride = Some(curr_stride);
        } else if self.stride == Some(curr_stride) {
            // Stride repeated, enable speculation
            self.conf.arm();
        } else {
            self.conf.reset();
            self.stride = Some(curr_stride);
        }
        self.last_value = op.value;
    }
}

impl TableEntry for SingleStrideEntry {
    fn tag(&self) -> u64 { self.tag }
    fn is_valid(&self) -> bool { self.conf.is_valid() }
    fn is_pinned(&self) -> bool { self.pending > 0 }
}

impl fmt::Display for SingleStrideEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let stride = self.stride.map_or("??".to_string(), signed_hex);
        write!(f, "{} conf={} stride={} val=0x{:x} ptr={}",
            pc_str(self.pc, self.piece), self.conf.value(), stride,
            self.last_value, self.predict_ptr
        )
    }
}

/// Runtime counters for a [SingleStridePredictor].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SingleStrideStats {
    pub lookups: usize,
    /// Lookups that found an entry
    pub hits: usize,
    /// Lookups that found an entry confident enough to speculate
    pub conf_hits: usize,
    /// Confident hits judged incorrect at execute
    pub mis_preds: usize,
    pub allocs: usize,
    /// Allocations dropped because every way was pinned
    pub failed_allocs: usize,
    pub evictions: usize,
    /// Lookup hits released without a speculative update
    pub squashes: usize,
}

/// A set-associative table of [SingleStrideEntry].
pub struct SingleStridePredictor {
    cfg: SingleStrideConfig,
    table: SetAssocTable<SingleStrideEntry>,
    watch: Option<WatchTag>,
    sink: Box<dyn TraceSink>,
    pub stat: SingleStrideStats,
}

impl SingleStrideConfig {
    /// Use this configuration to create a new [SingleStridePredictor].
    pub fn build(self) -> SingleStridePredictor {
        SingleStridePredictor {
            table: SetAssocTable::new(self.num_sets, self.num_ways),
            cfg: self,
            watch: None,
            sink: Box::new(NullSink),
            stat: SingleStrideStats::default(),
        }
    }
}

impl SingleStridePredictor {
    pub const NAME: &'static str = "SingleStridePredictor";

    /// Trace entries allocated for `watch` into `sink`.
    pub fn with_watch(mut self, watch: WatchTag, sink: Box<dyn TraceSink>)
        -> Self
    {
        self.watch = Some(watch);
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &SingleStrideConfig { &self.cfg }
    pub fn table(&self) -> &SetAssocTable<SingleStrideEntry> { &self.table }

    /// Select a set for this instruction.
    pub fn get_index(&self, op: &InflightEntry) -> usize {
        self.table.get_index(op.tag())
    }

    /// Returns the valid entry matching this instruction.
    pub fn find_entry(&self, op: &InflightEntry) -> Option<&SingleStrideEntry> {
        self.table.find_entry(op.tag())
    }

    fn allocate(&mut self, op: &InflightEntry) {
        let entry = SingleStrideEntry::new(op, self.cfg.conf, self.watch.as_ref());
        let line = entry.is_watched().then(|| format!("{} allocated", entry));
        match self.table.insert(entry) {
            Some((slot, old)) => {
                self.stat.allocs += 1;
                if let Some(old) = old {
                    self.stat.evictions += 1;
                    debug!("evicted {} from set {} way {}", old, slot.set, slot.way);
                }
                if let Some(line) = line {
                    self.sink.record(&line);
                }
            },
            None => {
                self.stat.failed_allocs += 1;
                debug!("no free way for {} in set {}",
                    op.pc_str(), self.get_index(op));
            },
        }
    }
}

impl ValuePredictor for SingleStridePredictor {
    fn name(&self) -> &'static str { Self::NAME }

    fn lookup(&mut self, op: &mut InflightEntry, num_inflights: u32)
        -> Prediction
    {
        self.stat.lookups += 1;
        let first_lookup = !op.single_stride_hit;
        let entry = match self.table.find_entry_mut(op.tag()) {
            Some(entry) => entry,
            None => return Prediction::abstain(),
        };
        if first_lookup {
            entry.pending += 1;
        }
        let result = entry.lookup(op, num_inflights);

        self.stat.hits += 1;
        if result.speculate {
            self.stat.conf_hits += 1;
        }
        if entry.is_watched() {
            let pred = if result.speculate {
                format!("0x{:x}", result.predicted_value)
            } else {
                "??".to_string()
            };
            self.sink.record(&format!("{} pred={}", entry, pred));
        }
        result
    }

    fn spec_update(&mut self, op: &mut InflightEntry)
        -> Result<(), InvariantViolation>
    {
        if !op.single_stride_hit {
            return Ok(());
        }
        if op.single_stride_conf_hit
            && op.prediction_result == PredictionOutcome::Incorrect
        {
            // Hand the instruction over to multi-stride training
            op.single_stride_mis_pred = true;
            self.stat.mis_preds += 1;
        }
        let tag = op.tag();
        let entry = self.table.find_entry_mut(tag)
            .ok_or(InvariantViolation::MissingEntry { predictor: Self::NAME, tag })?;
        entry.pending = entry.pending.saturating_sub(1);
        entry.spec_update(op)?;
        if entry.is_watched() {
            self.sink.record(&format!("{} spec={:?}", entry, op.prediction_result));
        }
        Ok(())
    }

    fn final_update(&mut self, op: &InflightEntry) {
        match self.table.find_entry_mut(op.tag()) {
            Some(entry) => {
                entry.final_update(op);
                if entry.is_watched() {
                    self.sink.record(&format!("{} retired=0x{:x}", entry, op.value));
                }
            },
            None => self.allocate(op),
        }
    }

    fn squash(&mut self, op: &InflightEntry) {
        if !op.single_stride_hit || op.executed {
            return;
        }
        if let Some(entry) = self.table.find_entry_mut(op.tag()) {
            entry.pending = entry.pending.saturating_sub(1);
            self.stat.squashes += 1;
        }
    }

    fn dump_stats(&self, w: &mut dyn Write) -> io::Result<()> {
        let s = &self.stat;
        writeln!(w, "[*] {} ({} sets x {} ways, {:.2}% utilization):",
            Self::NAME, self.cfg.num_sets, self.cfg.num_ways,
            self.table.utilization())?;
        writeln!(w, "      lookups={} hits={} conf_hits={} mis_preds={}",
            s.lookups, s.hits, s.conf_hits, s.mis_preds)?;
        writeln!(w, "      allocs={} failed_allocs={} evictions={} squashes={}",
            s.allocs, s.failed_allocs, s.evictions, s.squashes)?;
        Ok(())
    }
}
