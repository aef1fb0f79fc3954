//! Value traces: the retired instruction stream of some program, recorded
//! as fixed-size binary records.

pub mod synthetic;

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::TraceError;
use crate::inflight::*;

/// Register number stored in a [ValueRecord] for a missing operand.
pub const NO_TRACE_REG: u8 = 0xff;

/// One retired instruction.
///
/// Stored in 40 bytes, little-endian:
///
/// | offset | size | field        |
/// |--------|------|--------------|
/// | 0      | 8    | `pc`         |
/// | 8      | 8    | `value`      |
/// | 16     | 8    | `addr`       |
/// | 24     | 4    | `latency`    |
/// | 28     | 3    | `src_regs`   |
/// | 31     | 1    | `dst_reg`    |
/// | 32     | 4    | `piece`      |
/// | 36     | 1    | `inst_class` |
/// | 37     | 1    | `cache_hit`  |
/// | 38     | 1    | `eligible`   |
/// | 39     | 1    | (reserved)   |
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValueRecord {
    pub pc: u64,
    pub value: u64,
    pub addr: u64,
    pub latency: u32,
    pub src_regs: [Option<u8>; 3],
    pub dst_reg: Option<u8>,
    pub piece: u32,
    pub inst_class: InstClass,
    pub cache_hit: u8,
    pub eligible: bool,
}
impl ValueRecord {
    pub const SIZE: usize = 40;

    pub fn pc_str(&self) -> String { pc_str(self.pc, self.piece) }

    /// Decode a record. `index` is only used for error reporting.
    pub fn from_bytes(b: &[u8; Self::SIZE], index: usize)
        -> Result<Self, TraceError>
    {
        let u64_at = |off: usize| {
            let mut x = [0u8; 8];
            x.copy_from_slice(&b[off..off + 8]);
            u64::from_le_bytes(x)
        };
        let u32_at = |off: usize| {
            let mut x = [0u8; 4];
            x.copy_from_slice(&b[off..off + 4]);
            u32::from_le_bytes(x)
        };
        let reg = |x: u8| if x == NO_TRACE_REG { None } else { Some(x) };
        let inst_class = InstClass::try_from(b[36])
            .map_err(|class| TraceError::BadClass { index, class })?;
        Ok(Self {
            pc: u64_at(0),
            value: u64_at(8),
            addr: u64_at(16),
            latency: u32_at(24),
            src_regs: [reg(b[28]), reg(b[29]), reg(b[30])],
            dst_reg: reg(b[31]),
            piece: u32_at(32),
            inst_class,
            cache_hit: b[37],
            eligible: b[38] != 0,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let reg = |x: Option<u8>| x.unwrap_or(NO_TRACE_REG);
        let mut b = [0u8; Self::SIZE];
        b[0..8].copy_from_slice(&self.pc.to_le_bytes());
        b[8..16].copy_from_slice(&self.value.to_le_bytes());
        b[16..24].copy_from_slice(&self.addr.to_le_bytes());
        b[24..28].copy_from_slice(&self.latency.to_le_bytes());
        for (i, r) in self.src_regs.iter().enumerate() {
            b[28 + i] = reg(*r);
        }
        b[31] = reg(self.dst_reg);
        b[32..36].copy_from_slice(&self.piece.to_le_bytes());
        b[36] = self.inst_class as u8;
        b[37] = self.cache_hit;
        b[38] = self.eligible as u8;
        b
    }

    /// The issue-time request the host would send for this instruction.
    pub fn request(&self, seq_no: u64) -> PredictionRequest {
        PredictionRequest {
            seq_no,
            pc: self.pc,
            piece: self.piece,
            eligible: self.eligible,
            cache_hit: self.cache_hit as u32,
        }
    }

    /// The execute-time feedback for this instruction.
    pub fn execute(&self, seq_no: u64, prediction_result: PredictionOutcome)
        -> ExecuteFeedback
    {
        let reg = |x: Option<u8>| x.map_or(NO_REG, |r| r as u64);
        ExecuteFeedback {
            seq_no,
            eligible: self.eligible,
            prediction_result,
            pc: self.pc,
            next_pc: self.pc.wrapping_add(4),
            inst_class: self.inst_class,
            piece: self.piece,
            src1: reg(self.src_regs[0]),
            src2: reg(self.src_regs[1]),
            src3: reg(self.src_regs[2]),
            dst: reg(self.dst_reg),
        }
    }

    /// The retire-time feedback for this instruction.
    pub fn retire(&self, seq_no: u64) -> RetireFeedback {
        RetireFeedback {
            seq_no,
            actual_addr: self.addr,
            actual_value: self.value,
            actual_latency: self.latency as u64,
        }
    }
}

/// A list of [ValueRecord] read from (or destined for) a file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValueTrace {
    pub name: String,
    pub records: Vec<ValueRecord>,
}
impl ValueTrace {
    pub fn new(name: impl ToString, records: Vec<ValueRecord>) -> Self {
        Self { name: name.to_string(), records }
    }

    /// Decode a whole trace.
    pub fn from_bytes(name: impl ToString, data: &[u8])
        -> Result<Self, TraceError>
    {
        if data.len() % ValueRecord::SIZE != 0 {
            return Err(TraceError::Truncated {
                len: data.len(),
                size: ValueRecord::SIZE,
            });
        }
        let mut records = Vec::with_capacity(data.len() / ValueRecord::SIZE);
        for (index, chunk) in data.chunks_exact(ValueRecord::SIZE).enumerate() {
            let mut b = [0u8; ValueRecord::SIZE];
            b.copy_from_slice(chunk);
            records.push(ValueRecord::from_bytes(&b, index)?);
        }
        Ok(Self::new(name, records))
    }

    /// Create a [ValueTrace] from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let path = path.as_ref();
        let name = path.file_name()
            .map_or(String::new(), |n| n.to_string_lossy().into_owned());
        let mut data = Vec::new();
        File::open(path)?.read_to_end(&mut data)?;
        Self::from_bytes(name, &data)
    }

    pub fn write_to(&self, w: &mut impl Write) -> Result<(), TraceError> {
        for r in self.records.iter() {
            w.write_all(&r.to_bytes())?;
        }
        Ok(())
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), TraceError> {
        let mut f = File::create(path)?;
        self.write_to(&mut f)?;
        f.flush()?;
        Ok(())
    }

    /// Return the number of records
    pub fn num_entries(&self) -> usize { self.records.len() }

    pub fn name(&self) -> &str { &self.name }

    pub fn as_slice(&self) -> &[ValueRecord] { &self.records }

    /// Return a truncated slice of records
    pub fn as_slice_trunc(&self, limit: usize) -> &[ValueRecord] {
        &self.records[..limit.min(self.records.len())]
    }
}
