//! Shared helpers for the integration tests.

#![allow(dead_code)]

use vpred::*;

/// Single-stride defaults: confidence 2/4/7.
pub const CONF: ConfidenceConfig = ConfidenceConfig { min: 2, thd: 4, max: 7 };

/// An eligible candidate at `pc` with its retired value already known.
pub fn op(pc: u64, value: u64) -> InflightEntry {
    let mut op = InflightEntry::candidate(pc, 0);
    op.value = value;
    op
}

/// Drive one dynamic instruction through all three events with a single
/// occurrence in flight. Returns the lookup result.
pub fn step(p: &mut impl ValuePredictor, pc: u64, value: u64) -> Prediction {
    let mut op = op(pc, value);
    let pred = p.lookup(&mut op, 1);
    op.prediction_result = if !pred.speculate {
        PredictionOutcome::Unknown
    } else if pred.predicted_value == value {
        PredictionOutcome::Correct
    } else {
        PredictionOutcome::Incorrect
    };
    p.spec_update(&mut op).expect("spec_update");
    p.final_update(&op);
    pred
}

/// Train the instruction at `pc` with `values`, one at a time.
pub fn train(p: &mut impl ValuePredictor, pc: u64, values: &[u64]) {
    for v in values {
        step(p, pc, *v);
    }
}

/// An engine without the analysis reports.
pub fn quiet_engine() -> Engine {
    let cfg = EngineConfig {
        analysis: false,
        pattern_watch: None,
        ..Default::default()
    };
    Engine::with_sink(cfg, Box::new(NullSink)).expect("engine")
}

pub fn request(seq_no: u64, pc: u64) -> PredictionRequest {
    PredictionRequest { seq_no, pc, piece: 0, eligible: true, cache_hit: 0 }
}

pub fn execute(seq_no: u64, pc: u64, prediction_result: PredictionOutcome)
    -> ExecuteFeedback
{
    ExecuteFeedback {
        seq_no,
        eligible: true,
        prediction_result,
        pc,
        next_pc: pc + 4,
        inst_class: InstClass::Alu,
        piece: 0,
        src1: 1,
        src2: NO_REG,
        src3: NO_REG,
        dst: 2,
    }
}

pub fn retire(seq_no: u64, value: u64) -> RetireFeedback {
    RetireFeedback { seq_no, actual_addr: 0, actual_value: value, actual_latency: 1 }
}
