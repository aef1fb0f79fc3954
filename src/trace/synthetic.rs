//! Generate value traces for a loop of static instructions with known value
//! patterns.

use rand::prelude::*;
use rand::rngs::StdRng;

use crate::inflight::InstClass;
use crate::trace::*;

/// A pre-determined pattern of values associated with a static instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValuePattern {
    /// An instruction that always produces the same value.
    Constant(u64),

    /// An instruction whose value moves by the same stride every time.
    Strided { base: u64, stride: i64 },

    /// An instruction whose value moves by two strides in turn.
    Alternating { base: u64, strides: [i64; 2] },

    /// An instruction with uniformly random values.
    Random,
}
impl ValuePattern {
    /// Given some counter, generate a value.
    pub fn value(&self, ctr: u64, rng: &mut impl Rng) -> u64 {
        match *self {
            Self::Constant(v) => v,
            Self::Strided { base, stride } => {
                base.wrapping_add(stride.wrapping_mul(ctr as i64) as u64)
            },
            Self::Alternating { base, strides } => {
                let pairs = (ctr / 2) as i64;
                let mut delta = pairs.wrapping_mul(strides[0].wrapping_add(strides[1]));
                if ctr % 2 == 1 {
                    delta = delta.wrapping_add(strides[0]);
                }
                base.wrapping_add(delta as u64)
            },
            Self::Random => rng.gen(),
        }
    }

    /// Returns true if a stride predictor should eventually learn this.
    pub fn is_strided(&self) -> bool {
        matches!(self, Self::Constant(_) | Self::Strided { .. })
    }
}

/// A static instruction in the generated loop body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorOp {
    pub pc: u64,
    pub inst_class: InstClass,
    pub pattern: ValuePattern,
    pub eligible: bool,
    pub dst_reg: Option<u8>,
}

/// Emits a loop body of instructions and unrolls it into [ValueRecord]s.
#[derive(Debug)]
pub struct Generator {
    ops: Vec<GeneratorOp>,

    /// Number of times each op has been emitted
    ctr: Vec<u64>,

    /// State tracking the program counter value during assembly
    cursor: u64,

    rng: StdRng,
}
impl Generator {
    /// Create a new generator for a loop starting at `base`.
    pub fn new(base: u64, seed: u64) -> Self {
        Self {
            ops: Vec::new(),
            ctr: Vec::new(),
            cursor: base,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn ops(&self) -> &[GeneratorOp] { &self.ops }

    /// Emit an instruction that produces values following `pattern`.
    /// Branches and stores are never eligible for prediction.
    pub fn push(&mut self, inst_class: InstClass, pattern: ValuePattern) {
        let eligible = !matches!(inst_class,
            InstClass::Store | InstClass::CondBranch
            | InstClass::UncondDirectBranch | InstClass::UncondIndirectBranch);
        let dst_reg = eligible.then(|| (self.ops.len() % 31) as u8 + 1);
        self.ops.push(GeneratorOp {
            pc: self.cursor,
            inst_class,
            pattern,
            eligible,
            dst_reg,
        });
        self.ctr.push(0);
        self.cursor += 4;
    }

    /// Emit a loop body with `n` instructions of random classes and
    /// patterns.
    pub fn push_random(&mut self, n: usize) {
        const CLASSES: [InstClass; 4] = [
            InstClass::Alu, InstClass::Load, InstClass::SlowAlu, InstClass::Store,
        ];
        for _ in 0..n {
            let class = CLASSES[self.rng.gen_range(0..CLASSES.len())];
            let base = self.rng.gen_range(0..0x1_0000u64) << 4;
            let pattern = match self.rng.gen_range(0..4) {
                0 => ValuePattern::Constant(base),
                1 => ValuePattern::Strided {
                    base,
                    stride: self.rng.gen_range(-64..=64),
                },
                2 => ValuePattern::Alternating {
                    base,
                    strides: [self.rng.gen_range(1..=16), -self.rng.gen_range(1..=8)],
                },
                _ => ValuePattern::Random,
            };
            self.push(class, pattern);
        }
    }

    /// Unroll the loop body until `len` records have been produced.
    pub fn simulate_for(&mut self, len: usize) -> Vec<ValueRecord> {
        let mut res = Vec::with_capacity(len);
        if self.ops.is_empty() {
            return res;
        }
        for i in 0..len {
            let idx = i % self.ops.len();
            let ctr = self.ctr[idx];
            self.ctr[idx] += 1;

            let op = &self.ops[idx];
            let value = op.pattern.value(ctr, &mut self.rng);
            let is_mem = matches!(op.inst_class, InstClass::Load | InstClass::Store);
            res.push(ValueRecord {
                pc: op.pc,
                value,
                addr: if is_mem { 0x8000_0000 + (ctr << 3) } else { 0 },
                latency: if op.inst_class == InstClass::Load { 4 } else { 1 },
                src_regs: [Some(0), None, None],
                dst_reg: op.dst_reg,
                piece: 0,
                inst_class: op.inst_class,
                cache_hit: is_mem as u8,
                eligible: op.eligible,
            });
        }
        res
    }
}
