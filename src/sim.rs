//! A simple in-order pipeline model for replaying value traces through an
//! [Engine].

use std::collections::*;

use tracing::{debug, info};

use crate::engine::Engine;
use crate::error::EngineError;
use crate::inflight::*;
use crate::stats::PredictionStats;
use crate::trace::ValueRecord;

/// An instruction between issue and retire.
#[derive(Clone, Copy, Debug)]
struct InflightSlot {
    seq_no: u64,
    idx: usize,
    prediction: Prediction,
    executed: bool,
}

/// Replays records in program order.
///
/// Each record is issued in turn, executes `exec_lag` issues later and
/// retires once more than `window` instructions are in flight. At execute,
/// the model plays the host and judges the prediction against the recorded
/// value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineModel {
    /// Maximum number of instructions in flight
    pub window: usize,

    /// Number of issues between the issue and execute of an instruction
    pub exec_lag: usize,
}
impl Default for PipelineModel {
    fn default() -> Self {
        Self { window: 32, exec_lag: 4 }
    }
}
impl PipelineModel {
    pub fn new(window: usize, exec_lag: usize) -> Self {
        Self { window, exec_lag }
    }

    /// Judge a prediction against the recorded value.
    pub fn judge(prediction: &Prediction, actual: u64) -> PredictionOutcome {
        if !prediction.speculate {
            PredictionOutcome::Unknown
        } else if prediction.predicted_value == actual {
            PredictionOutcome::Correct
        } else {
            PredictionOutcome::Incorrect
        }
    }

    fn execute(engine: &mut Engine, records: &[ValueRecord],
        slot: &mut InflightSlot) -> Result<(), EngineError>
    {
        let rec = &records[slot.idx];
        let outcome = Self::judge(&slot.prediction, rec.value);
        engine.speculative_update(&rec.execute(slot.seq_no, outcome))?;
        slot.executed = true;
        Ok(())
    }

    fn retire(engine: &mut Engine, records: &[ValueRecord],
        mut slot: InflightSlot, stats: &mut PredictionStats)
        -> Result<(), EngineError>
    {
        if !slot.executed {
            Self::execute(engine, records, &mut slot)?;
        }
        let rec = &records[slot.idx];
        engine.update_predictor(&rec.retire(slot.seq_no));
        stats.update(rec.inst_class, rec.eligible, slot.prediction, rec.value);
        Ok(())
    }

    /// Replay `records` through `engine`.
    pub fn run(&self, engine: &mut Engine, records: &[ValueRecord])
        -> Result<PredictionStats, EngineError>
    {
        info!("replaying {} records (window={}, exec_lag={})",
            records.len(), self.window, self.exec_lag);
        let mut stats = PredictionStats::new();
        let mut inflight: VecDeque<InflightSlot> = VecDeque::new();

        for (idx, rec) in records.iter().enumerate() {
            let seq_no = idx as u64 + 1;
            let prediction = engine.get_prediction(&rec.request(seq_no));
            if prediction.speculate {
                debug!("seq_no={} {} predicted 0x{:x}",
                    seq_no, rec.pc_str(), prediction.predicted_value);
            }
            inflight.push_back(InflightSlot {
                seq_no, idx, prediction, executed: false,
            });

            // The instruction issued `exec_lag` issues ago
            if let Some(pos) = inflight.len().checked_sub(self.exec_lag + 1) {
                let slot = &mut inflight[pos];
                if !slot.executed {
                    Self::execute(engine, records, slot)?;
                }
            }

            while inflight.len() > self.window {
                if let Some(slot) = inflight.pop_front() {
                    Self::retire(engine, records, slot, &mut stats)?;
                }
            }
        }

        while let Some(slot) = inflight.pop_front() {
            Self::retire(engine, records, slot, &mut stats)?;
        }
        info!("replay done: coverage={:.3}% accuracy={:.3}%",
            stats.coverage() * 100.0, stats.accuracy() * 100.0);
        Ok(stats)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::EngineConfig;
    use crate::watch::NullSink;

    #[test]
    fn judge() {
        let p = Prediction::value(8);
        assert_eq!(PipelineModel::judge(&p, 8), PredictionOutcome::Correct);
        assert_eq!(PipelineModel::judge(&p, 9), PredictionOutcome::Incorrect);
        assert_eq!(PipelineModel::judge(&Prediction::abstain(), 8),
            PredictionOutcome::Unknown);
    }

    #[test]
    fn drains_every_record() {
        let cfg = EngineConfig { analysis: false, pattern_watch: None,
            ..Default::default() };
        let mut engine = Engine::with_sink(cfg, Box::new(NullSink)).unwrap();
        let records: Vec<ValueRecord> = (0..10u64).map(|i| ValueRecord {
            pc: 0x1000,
            value: i * 8,
            addr: 0,
            latency: 1,
            src_regs: [None; 3],
            dst_reg: Some(1),
            piece: 0,
            inst_class: InstClass::Alu,
            cache_hit: 0,
            eligible: true,
        }).collect();

        // Executes lag behind retirement: instructions are executed on the
        // way out instead.
        let stats = PipelineModel::new(2, 8).run(&mut engine, &records).unwrap();
        assert_eq!(stats.global.retired, 10);
        assert_eq!(engine.num_inflight(), 0);
        assert_eq!(engine.counters.executed, 10);
        assert_eq!(engine.counters.protocol_errors, 0);
        assert_eq!(stats.global.incorrect, 0);
    }
}
