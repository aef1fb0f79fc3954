//! The run context that connects host pipeline events to the predictors.

use std::collections::*;
use std::io::Write;

use tracing::{debug, info, warn};

use crate::analysis::*;
use crate::config::*;
use crate::error::*;
use crate::inflight::*;
use crate::predictor::*;
use crate::watch::*;

/// Counters for the events seen by an [Engine].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineCounters {
    pub issued: usize,
    pub executed: usize,
    pub retired: usize,
    /// Instructions dropped because a younger instruction retired first
    pub flushed: usize,
    /// Issued instructions that received a speculative value
    pub speculated: usize,
    /// Host events that were dropped (see [ProtocolError])
    pub protocol_errors: usize,
}

/// State for one simulation run.
///
/// Owns the predictor registry, the instructions currently in flight and the
/// optional analysis state. Every call-back takes `&mut self`.
pub struct Engine {
    cfg: EngineConfig,

    /// Predictors, in priority order. The first one that speculates provides
    /// the predicted value.
    predictors: Vec<Box<dyn ValuePredictor>>,

    /// In-flight instructions, indexed by sequence number
    inflight: BTreeMap<u64, InflightEntry>,

    /// Number of in-flight occurrences per tag
    inflight_tags: HashMap<u64, u32>,

    inst_stats: Option<InstStats>,
    pattern: Option<PatternRecorder>,

    pub counters: EngineCounters,
}

impl Engine {
    /// Start a run with the default predictors. Entries for the watched
    /// instruction (if any) are traced with [TracingSink].
    pub fn begin(cfg: EngineConfig, args: &[String])
        -> Result<Self, ConfigError>
    {
        info!("starting value prediction run");
        for (idx, arg) in args.iter().enumerate() {
            info!("  argv[{}] = {}", idx, arg);
        }
        Self::with_sink(cfg, Box::new(TracingSink))
    }

    /// Start a run with the default predictors, tracing the watched
    /// instruction into `sink`.
    pub fn with_sink(cfg: EngineConfig, sink: Box<dyn TraceSink>)
        -> Result<Self, ConfigError>
    {
        cfg.validate()?;
        let mut single = cfg.single_stride.build();
        if let Some(tag) = cfg.watch_tag()? {
            info!("watching {}", tag);
            single = single.with_watch(tag, sink);
        }
        let mut predictors: Vec<Box<dyn ValuePredictor>> = vec![
            Box::new(single)
        ];
        if cfg.fuzzy_multi_stride.enabled {
            predictors.push(Box::new(cfg.fuzzy_multi_stride.build()));
        }
        Self::with_predictors(cfg, predictors)
    }

    /// Start a run with a custom predictor registry.
    pub fn with_predictors(cfg: EngineConfig,
        predictors: Vec<Box<dyn ValuePredictor>>)
        -> Result<Self, ConfigError>
    {
        cfg.validate()?;
        let pattern = cfg.pattern_watch_tag()?.map(PatternRecorder::new);
        let inst_stats = cfg.analysis.then(InstStats::new);
        for p in predictors.iter() {
            debug!("registered {}", p.name());
        }
        Ok(Self {
            cfg,
            predictors,
            inflight: BTreeMap::new(),
            inflight_tags: HashMap::new(),
            inst_stats,
            pattern,
            counters: EngineCounters::default(),
        })
    }

    pub fn config(&self) -> &EngineConfig { &self.cfg }
    pub fn predictors(&self) -> &[Box<dyn ValuePredictor>] { &self.predictors }
    pub fn inst_stats(&self) -> Option<&InstStats> { self.inst_stats.as_ref() }
    pub fn pattern(&self) -> Option<&PatternRecorder> { self.pattern.as_ref() }

    /// Number of instructions currently in flight.
    pub fn num_inflight(&self) -> usize { self.inflight.len() }

    /// Returns the in-flight instruction with this sequence number.
    pub fn get_inflight(&self, seq_no: u64) -> Option<&InflightEntry> {
        self.inflight.get(&seq_no)
    }

    /// Number of in-flight occurrences of the instruction at `pc`/`piece`.
    pub fn inflight_count(&self, pc: u64, piece: u32) -> u32 {
        self.inflight_tags.get(&calc_tag(pc, piece)).copied().unwrap_or(0)
    }

    fn protocol_error(&mut self, err: ProtocolError) {
        warn!("{}", err);
        self.counters.protocol_errors += 1;
    }

    fn release_tag(&mut self, tag: u64) {
        if let Some(cnt) = self.inflight_tags.get_mut(&tag) {
            *cnt -= 1;
            if *cnt == 0 {
                self.inflight_tags.remove(&tag);
            }
        }
    }

    /// Issue-time call-back.
    pub fn get_prediction(&mut self, req: &PredictionRequest) -> Prediction {
        if self.inflight.contains_key(&req.seq_no) {
            self.protocol_error(ProtocolError::DuplicateSeqNo(req.seq_no));
            return Prediction::abstain();
        }

        let mut op = InflightEntry::new(req);
        let num_inflights = {
            let cnt = self.inflight_tags.entry(op.tag()).or_insert(0);
            *cnt += 1;
            *cnt
        };
        self.counters.issued += 1;

        if op.eligible {
            let mut res = Prediction::abstain();
            for p in self.predictors.iter_mut() {
                let pred = p.lookup(&mut op, num_inflights);
                if pred.speculate && !res.speculate {
                    res = pred;
                }
            }
            op.prediction = res;
        }
        if op.prediction.speculate {
            self.counters.speculated += 1;
        }

        let res = op.prediction;
        self.inflight.insert(op.seq_no, op);
        res
    }

    /// Execute-time call-back.
    pub fn speculative_update(&mut self, fb: &ExecuteFeedback)
        -> Result<(), EngineError>
    {
        let op = match self.inflight.get_mut(&fb.seq_no) {
            Some(op) if op.executed => {
                self.protocol_error(ProtocolError::AlreadyExecuted(fb.seq_no));
                return Ok(());
            },
            Some(op) => op,
            None => {
                self.protocol_error(ProtocolError::UnknownSeqNo(fb.seq_no));
                return Ok(());
            },
        };
        op.set_meta_info(fb);
        if op.eligible {
            for p in self.predictors.iter_mut() {
                p.spec_update(op)?;
            }
        }
        self.counters.executed += 1;
        Ok(())
    }

    /// Retire-time call-back.
    pub fn update_predictor(&mut self, fb: &RetireFeedback) {
        self.flush_older(fb.seq_no);
        let mut op = match self.inflight.remove(&fb.seq_no) {
            Some(op) => op,
            None => {
                self.protocol_error(ProtocolError::UnknownSeqNo(fb.seq_no));
                return;
            },
        };
        op.set_final_info(fb);
        self.release_tag(op.tag());
        if op.eligible {
            for p in self.predictors.iter_mut() {
                // Never reached spec_update
                if !op.executed {
                    p.squash(&op);
                }
                p.final_update(&op);
            }
        }
        if let Some(stats) = self.inst_stats.as_mut() {
            stats.add_retired(&op);
        }
        if let Some(pattern) = self.pattern.as_mut() {
            pattern.add(&op);
        }
        self.counters.retired += 1;
    }

    /// Drop every in-flight instruction older than `seq_no`.
    fn flush_older(&mut self, seq_no: u64) {
        let younger = self.inflight.split_off(&seq_no);
        let flushed = std::mem::replace(&mut self.inflight, younger);
        for (seq, op) in flushed {
            debug!("flushed seq_no={} {}", seq, op.pc_str());
            if op.eligible {
                for p in self.predictors.iter_mut() {
                    p.squash(&op);
                }
            }
            self.release_tag(op.tag());
            self.counters.flushed += 1;
        }
    }

    /// Write the analysis reports and the predictor statistics.
    pub fn end(self, w: &mut impl Write) -> Result<EngineCounters, EngineError> {
        let c = &self.counters;
        info!("ending value prediction run ({} retired)", c.retired);
        if let Some(stats) = self.inst_stats.as_ref() {
            stats.dump_imem(w)?;
        }
        if let Some(pattern) = self.pattern.as_ref() {
            pattern.dump(w)?;
        }
        for p in self.predictors.iter() {
            p.dump_stats(w)?;
        }
        writeln!(w, "[*] Engine:")?;
        writeln!(w, "      issued={} executed={} retired={} flushed={}",
            c.issued, c.executed, c.retired, c.flushed)?;
        writeln!(w, "      speculated={} protocol_errors={} still_inflight={}",
            c.speculated, c.protocol_errors, self.inflight.len())?;
        Ok(self.counters)
    }
}
