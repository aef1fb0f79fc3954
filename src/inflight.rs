//! Records passed between the host pipeline and the predictors.

use std::fmt;

/// Register id used by the host for "no register".
pub const NO_REG: u64 = 0xdeadbeef;

/// Combine a program counter and a piece index into a table tag.
pub fn calc_tag(pc: u64, piece: u32) -> u64 {
    pc.wrapping_add(piece as u64)
}

/// Printable identity of a static instruction, ie. `0x000000000000abcd.1`.
pub fn pc_str(pc: u64, piece: u32) -> String {
    format!("0x{:016x}.{:x}", pc, piece)
}

/// Convert a host register operand into an [Option].
pub fn reg_from_host(reg: u64) -> Option<u64> {
    if reg == NO_REG { None } else { Some(reg) }
}

/// Instruction classes reported by the host at execute.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InstClass {
    Alu = 0,
    Load = 1,
    Store = 2,
    CondBranch = 3,
    UncondDirectBranch = 4,
    UncondIndirectBranch = 5,
    Fp = 6,
    SlowAlu = 7,
    Undef = 8,
}
impl InstClass {
    /// Short name used in reports.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::Alu => "alu",
            Self::Load => "ld",
            Self::Store => "st",
            Self::CondBranch => "br",
            Self::UncondDirectBranch => "jmp",
            Self::UncondIndirectBranch => "jr",
            Self::Fp => "fp",
            Self::SlowAlu => "mul",
            Self::Undef => "???",
        }
    }
}
impl TryFrom<u8> for InstClass {
    type Error = u8;
    fn try_from(x: u8) -> Result<Self, u8> {
        Ok(match x {
            0 => Self::Alu,
            1 => Self::Load,
            2 => Self::Store,
            3 => Self::CondBranch,
            4 => Self::UncondDirectBranch,
            5 => Self::UncondIndirectBranch,
            6 => Self::Fp,
            7 => Self::SlowAlu,
            8 => Self::Undef,
            _ => return Err(x),
        })
    }
}

/// How the host judged a prediction once the instruction executed.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PredictionOutcome {
    Incorrect = 0,
    Correct = 1,
    #[default]
    Unknown = 2,
}
impl From<u8> for PredictionOutcome {
    /// Anything other than 0 or 1 is treated as unresolved.
    fn from(x: u8) -> Self {
        match x {
            0 => Self::Incorrect,
            1 => Self::Correct,
            _ => Self::Unknown,
        }
    }
}

/// Output of a lookup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Prediction {
    /// Whether the host should use [Prediction::predicted_value]
    pub speculate: bool,

    /// The predicted 64-bit value
    pub predicted_value: u64,
}
impl Prediction {
    /// Decline to predict.
    pub fn abstain() -> Self {
        Self { speculate: false, predicted_value: 0 }
    }

    /// Predict some value.
    pub fn value(predicted_value: u64) -> Self {
        Self { speculate: true, predicted_value }
    }
}

/// Issue-time request from the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PredictionRequest {
    pub seq_no: u64,
    pub pc: u64,
    pub piece: u32,
    pub eligible: bool,
    pub cache_hit: u32,
}

/// Execute-time feedback from the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecuteFeedback {
    pub seq_no: u64,
    pub eligible: bool,
    pub prediction_result: PredictionOutcome,
    pub pc: u64,
    pub next_pc: u64,
    pub inst_class: InstClass,
    pub piece: u32,
    pub src1: u64,
    pub src2: u64,
    pub src3: u64,
    pub dst: u64,
}

/// Retire-time feedback from the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetireFeedback {
    pub seq_no: u64,
    pub actual_addr: u64,
    pub actual_value: u64,
    pub actual_latency: u64,
}

/// Per-dynamic-instruction state carried from issue to retire.
///
/// The identity fields are fixed at issue. The predictors communicate with
/// later pipeline events through the `single_stride_*` flags.
#[derive(Clone, Debug)]
pub struct InflightEntry {
    pub seq_no: u64,
    pub pc: u64,
    pub piece: u32,
    pub eligible: bool,
    pub cache_hit: u32,

    /// What the engine answered at issue
    pub prediction: Prediction,

    /// Outcome judged by the host at execute
    pub prediction_result: PredictionOutcome,

    /// Set when the host reported execute for this instruction
    pub executed: bool,
    pub inst_class: InstClass,
    pub next_pc: u64,
    pub src_regs: [Option<u64>; 3],
    pub dst_reg: Option<u64>,

    /// Retired value
    pub value: u64,
    pub addr: u64,
    pub latency: u64,

    /// The single-stride table had an entry for this instruction
    pub single_stride_hit: bool,

    /// ... and that entry was confident enough to speculate
    pub single_stride_conf_hit: bool,

    /// ... and the speculated value turned out to be wrong
    pub single_stride_mis_pred: bool,
}
impl InflightEntry {
    pub fn new(req: &PredictionRequest) -> Self {
        Self {
            seq_no: req.seq_no,
            pc: req.pc,
            piece: req.piece,
            eligible: req.eligible,
            cache_hit: req.cache_hit,
            prediction: Prediction::abstain(),
            prediction_result: PredictionOutcome::Unknown,
            executed: false,
            inst_class: InstClass::Undef,
            next_pc: 0,
            src_regs: [None; 3],
            dst_reg: None,
            value: 0,
            addr: 0,
            latency: 0,
            single_stride_hit: false,
            single_stride_conf_hit: false,
            single_stride_mis_pred: false,
        }
    }

    /// Shorthand for a candidate instruction with no other metadata.
    pub fn candidate(pc: u64, piece: u32) -> Self {
        Self::new(&PredictionRequest {
            seq_no: 0, pc, piece, eligible: true, cache_hit: 0,
        })
    }

    pub fn tag(&self) -> u64 { calc_tag(self.pc, self.piece) }

    pub fn pc_str(&self) -> String { pc_str(self.pc, self.piece) }

    /// Record execute-time metadata.
    pub fn set_meta_info(&mut self, fb: &ExecuteFeedback) {
        self.executed = true;
        self.prediction_result = fb.prediction_result;
        self.inst_class = fb.inst_class;
        self.next_pc = fb.next_pc;
        self.src_regs = [
            reg_from_host(fb.src1),
            reg_from_host(fb.src2),
            reg_from_host(fb.src3),
        ];
        self.dst_reg = reg_from_host(fb.dst);
    }

    /// Record retire-time ground truth.
    pub fn set_final_info(&mut self, fb: &RetireFeedback) {
        self.addr = fb.actual_addr;
        self.value = fb.actual_value;
        self.latency = fb.actual_latency;
    }
}

impl fmt::Display for InflightEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "seq={} {}", self.seq_no, self.pc_str())
    }
}

/// Format a signed stride with an explicit sign, ie. `-0x4` or `0x4`.
pub fn signed_hex(x: i64) -> String {
    if x < 0 {
        format!("-0x{:x}", x.unsigned_abs())
    } else {
        format!("0x{:x}", x)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pc_str_format() {
        assert_eq!(pc_str(0xffff00000844f73c, 0), "0xffff00000844f73c.0");
        assert_eq!(pc_str(0x1000, 0xa), "0x0000000000001000.a");
    }

    #[test]
    fn signed_stride_format() {
        assert_eq!(signed_hex(4), "0x4");
        assert_eq!(signed_hex(-4), "-0x4");
        assert_eq!(signed_hex(i64::MIN), "-0x8000000000000000");
    }

    #[test]
    fn outcome_from_host() {
        assert_eq!(PredictionOutcome::from(0), PredictionOutcome::Incorrect);
        assert_eq!(PredictionOutcome::from(1), PredictionOutcome::Correct);
        assert_eq!(PredictionOutcome::from(2), PredictionOutcome::Unknown);
        assert_eq!(PredictionOutcome::from(7), PredictionOutcome::Unknown);
    }

    #[test]
    fn class_roundtrip_rejects_unknown() {
        assert_eq!(InstClass::try_from(1), Ok(InstClass::Load));
        assert_eq!(InstClass::try_from(9), Err(9));
    }
}
