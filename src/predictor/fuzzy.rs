//! The multi-candidate stride predictor.
//!
//! Entries have room for several candidate strides, each with its own
//! observation count and a "fuzzy" flag for strides that only match
//! approximately. The table has the same shape as the single-stride table.
//!
//! No selection or training algorithm is implemented yet: lookups never
//! speculate and retired values are not used for training. The predictor
//! only counts the single-stride mispredictions it would be trained on.

use std::io::{self, Write};

use bitvec::prelude::*;

use crate::config::*;
use crate::error::InvariantViolation;
use crate::inflight::*;
use crate::predictor::*;

/// One candidate stride in a [FuzzyMultiStrideEntry].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StrideCandidate {
    pub stride: i64,
    /// Number of times this stride was observed
    pub count: u32,
}

/// An entry in a [FuzzyMultiStridePredictor].
#[derive(Clone, Debug)]
pub struct FuzzyMultiStrideEntry {
    tag: u64,
    conf: ConfidenceCounter,
    last_value: u64,

    /// Candidate strides (`2 * max_multi_stride` slots)
    strides: Vec<StrideCandidate>,

    /// One bit per candidate: set when the candidate matches approximately
    fuzzy: BitVec,
}
impl FuzzyMultiStrideEntry {
    pub fn new(op: &InflightEntry, cfg: &FuzzyMultiStrideConfig) -> Self {
        let n = cfg.stride_count();
        Self {
            tag: op.tag(),
            conf: ConfidenceCounter::first_seen(cfg.conf),
            last_value: op.value,
            strides: vec![StrideCandidate::default(); n],
            fuzzy: bitvec![0; n],
        }
    }

    pub fn confidence(&self) -> u8 { self.conf.value() }
    pub fn last_value(&self) -> u64 { self.last_value }

    /// Number of candidate slots.
    pub fn stride_count(&self) -> usize { self.strides.len() }

    pub fn candidates(&self) -> &[StrideCandidate] { &self.strides }

    pub fn candidate_mut(&mut self, idx: usize) -> Option<&mut StrideCandidate> {
        self.strides.get_mut(idx)
    }

    pub fn is_fuzzy(&self, idx: usize) -> bool {
        self.fuzzy.get(idx).map_or(false, |b| *b)
    }

    /// Returns false if there is no slot `idx`.
    pub fn set_fuzzy(&mut self, idx: usize, fuzzy: bool) -> bool {
        match self.fuzzy.get_mut(idx) {
            Some(mut bit) => {
                *bit = fuzzy;
                true
            },
            None => false,
        }
    }
}

impl TableEntry for FuzzyMultiStrideEntry {
    fn tag(&self) -> u64 { self.tag }
    fn is_valid(&self) -> bool { self.conf.is_valid() }
}

/// Runtime counters for a [FuzzyMultiStridePredictor].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FuzzyMultiStrideStats {
    pub lookups: usize,
    pub hits: usize,
    /// Single-stride mispredictions seen at execute
    pub mis_pred_signals: usize,
}

/// A set-associative table of [FuzzyMultiStrideEntry].
pub struct FuzzyMultiStridePredictor {
    cfg: FuzzyMultiStrideConfig,
    table: SetAssocTable<FuzzyMultiStrideEntry>,
    pub stat: FuzzyMultiStrideStats,
}

impl FuzzyMultiStrideConfig {
    /// Use this configuration to create a new [FuzzyMultiStridePredictor].
    pub fn build(self) -> FuzzyMultiStridePredictor {
        FuzzyMultiStridePredictor {
            table: SetAssocTable::new(self.num_sets, self.num_ways),
            cfg: self,
            stat: FuzzyMultiStrideStats::default(),
        }
    }
}

impl FuzzyMultiStridePredictor {
    pub const NAME: &'static str = "FuzzyMultiStridePredictor";

    pub fn config(&self) -> &FuzzyMultiStrideConfig { &self.cfg }
    pub fn table(&self) -> &SetAssocTable<FuzzyMultiStrideEntry> { &self.table }
}

impl ValuePredictor for FuzzyMultiStridePredictor {
    fn name(&self) -> &'static str { Self::NAME }

    fn lookup(&mut self, op: &mut InflightEntry, _num_inflights: u32)
        -> Prediction
    {
        self.stat.lookups += 1;
        if self.table.find(op.tag()).is_some() {
            self.stat.hits += 1;
        }
        Prediction::abstain()
    }

    fn spec_update(&mut self, op: &mut InflightEntry)
        -> Result<(), InvariantViolation>
    {
        if op.single_stride_mis_pred {
            self.stat.mis_pred_signals += 1;
        }
        Ok(())
    }

    fn final_update(&mut self, _op: &InflightEntry) {}

    fn dump_stats(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "[*] {} ({} sets x {} ways, {} strides per entry):",
            Self::NAME, self.cfg.num_sets, self.cfg.num_ways,
            self.cfg.stride_count())?;
        writeln!(w, "      lookups={} hits={} mis_pred_signals={}",
            self.stat.lookups, self.stat.hits, self.stat.mis_pred_signals)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn entry_shape_follows_config() {
        let cfg = FuzzyMultiStrideConfig {
            max_multi_stride: 3,
            ..Default::default()
        };
        let mut op = InflightEntry::candidate(0x40, 1);
        op.value = 9;
        let mut e = FuzzyMultiStrideEntry::new(&op, &cfg);
        assert_eq!(e.stride_count(), 6);
        assert_eq!(e.tag(), 0x41);
        assert_eq!(e.confidence(), 1);
        assert_eq!(e.last_value(), 9);
        assert!(e.candidates().iter().all(|c| *c == StrideCandidate::default()));

        assert!(e.set_fuzzy(5, true));
        e.candidate_mut(5).unwrap().stride = -8;
        assert!(e.is_fuzzy(5) && !e.is_fuzzy(4) && !e.is_fuzzy(6));
        assert_eq!(e.candidates()[5].stride, -8);
    }

    #[test]
    fn out_of_range_slot_is_ignored() {
        let mut op = InflightEntry::candidate(0x40, 0);
        op.value = 1;
        let mut e = FuzzyMultiStrideEntry::new(&op, &FuzzyMultiStrideConfig::default());
        let n = e.stride_count();
        assert!(!e.set_fuzzy(n, true));
        assert!(!e.set_fuzzy(usize::MAX, true));
        assert!(!e.is_fuzzy(n));
        assert!((0..n).all(|i| !e.is_fuzzy(i)));
        assert!(e.candidate_mut(n).is_none());
    }

    #[test]
    fn predictor_never_speculates() {
        let mut p = FuzzyMultiStrideConfig::default().build();
        let mut op = InflightEntry::candidate(0x40, 0);
        op.value = 1;
        p.final_update(&op);
        assert!(!p.lookup(&mut op, 1).speculate);
        assert_eq!(p.table().occupancy(), 0);

        op.single_stride_mis_pred = true;
        p.spec_update(&mut op).unwrap();
        assert_eq!(p.stat.mis_pred_signals, 1);
        assert_eq!(p.stat.lookups, 1);
    }
}
