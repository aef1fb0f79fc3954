//! Error types.
//!
//! Host protocol violations are diagnostics ([ProtocolError]): the engine
//! reports them and carries on. A broken table invariant
//! ([InvariantViolation]) means the predictor state can no longer be trusted
//! and is always propagated to the caller.

use thiserror::Error;

/// Problems with an [EngineConfig](crate::config::EngineConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("number of sets must be a nonzero power of two (got {0})")]
    BadSetCount(usize),

    #[error("number of ways must be nonzero")]
    ZeroWays,

    #[error("confidence bounds must satisfy {floor} <= min < thd <= max \
        (got min={min}, thd={thd}, max={max})")]
    BadConfidence { floor: u8, min: u8, thd: u8, max: u8 },

    #[error("max_multi_stride must be nonzero")]
    ZeroMultiStride,

    #[error("invalid watch tag '{0}' (expected '0x<pc>.<piece>')")]
    BadWatchTag(String),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Problems reading or writing a [ValueTrace](crate::trace::ValueTrace).
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("trace length {len} is not a multiple of the record size ({size})")]
    Truncated { len: usize, size: usize },

    #[error("record {index} has an unknown instruction class {class}")]
    BadClass { index: usize, class: u8 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An event from the host does not line up with the instructions the engine
/// is tracking. The event is dropped.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("seq_no={0} issued again while still in flight")]
    DuplicateSeqNo(u64),

    #[error("seq_no={0} is not in flight")]
    UnknownSeqNo(u64),

    #[error("seq_no={0} already executed")]
    AlreadyExecuted(u64),
}

/// The predictor tables are in a state that the event protocol should have
/// made impossible.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("{predictor}: no entry for tag {tag:#x} at spec_update after a lookup hit")]
    MissingEntry { predictor: &'static str, tag: u64 },

    #[error("{predictor}: misprediction reported for tag {tag:#x} which never \
        speculated")]
    UnconfidentMisprediction { predictor: &'static str, tag: u64 },
}

/// Errors that end a run.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("predictor state corrupted: {0}")]
    Invariant(#[from] InvariantViolation),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
