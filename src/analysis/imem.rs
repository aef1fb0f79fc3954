//! Aggregate statistics for a single static instruction.

use std::collections::*;
use itertools::*;

use crate::inflight::*;

/// Number of patterns shown for each histogram in a report line.
pub const TOP_N: usize = 4;

/// Increment the count for some key.
fn bump<K: Ord>(map: &mut BTreeMap<K, u64>, key: K) {
    *map.entry(key).or_insert(0) += 1;
}

/// Everything observed about one static instruction across all of its
/// retired occurrences.
#[derive(Clone, Debug)]
pub struct ImemInst {
    pub pc: u64,
    pub piece: u32,
    pub inst_class: InstClass,
    pub eligible: bool,
    pub dst_reg: Option<u64>,
    pub src_regs: [Option<u64>; 3],

    /// Number of retired occurrences
    pub count: u64,

    /// Sum of reported latencies
    pub total_latency: u64,

    last_value: Option<u64>,

    /// Histograms (eligible instructions only)
    pub cache_hits: BTreeMap<u32, u64>,
    pub values: BTreeMap<u64, u64>,
    pub strides: BTreeMap<i64, u64>,
}
impl ImemInst {
    /// Take the static properties from the first retired occurrence.
    pub fn new(op: &InflightEntry) -> Self {
        Self {
            pc: op.pc,
            piece: op.piece,
            inst_class: op.inst_class,
            eligible: op.eligible,
            dst_reg: op.dst_reg,
            src_regs: op.src_regs,
            count: 0,
            total_latency: 0,
            last_value: None,
            cache_hits: BTreeMap::new(),
            values: BTreeMap::new(),
            strides: BTreeMap::new(),
        }
    }

    /// Add a retired occurrence.
    pub fn add(&mut self, op: &InflightEntry) {
        self.count += 1;
        self.total_latency += op.latency;
        if self.eligible {
            bump(&mut self.cache_hits, op.cache_hit);
            bump(&mut self.values, op.value);
            if let Some(last) = self.last_value {
                bump(&mut self.strides, op.value.wrapping_sub(last) as i64);
            }
            self.last_value = Some(op.value);
        }
    }

    pub fn avg_latency(&self) -> u64 {
        if self.count == 0 { 0 } else { self.total_latency / self.count }
    }

    /// The `n` most frequent values, most frequent first.
    pub fn top_values(&self, n: usize) -> Vec<(u64, u64)> {
        top_n(&self.values, n)
    }

    /// The `n` most frequent strides, most frequent first.
    pub fn top_strides(&self, n: usize) -> Vec<(i64, u64)> {
        top_n(&self.strides, n)
    }

    /// Format the report line for this instruction (without the count and
    /// weight columns).
    pub fn display_str(&self) -> String {
        let dst = match self.dst_reg {
            Some(r) => format!("{:<7}", format!("r{:<2} <- ", r)),
            None => " ".repeat(7),
        };
        let srcs: String = self.src_regs.iter().map(|r| match r {
            Some(r) => format!("{:<4}", format!("r{},", r)),
            None => " ".repeat(4),
        }).collect();

        let values = format_patterns(&self.top_values(TOP_N), self.count,
            |v| format!("0x{:x}", v));
        let strides = format_patterns(&self.top_strides(TOP_N),
            self.count.saturating_sub(1), |s| signed_hex(*s));

        format!("{}  {:<4}{}{}{:>6}  [{}]  [{}]",
            pc_str(self.pc, self.piece), self.inst_class.mnemonic(),
            dst, srcs, self.avg_latency(), values, strides
        )
    }
}

fn top_n<K: Copy + Ord>(map: &BTreeMap<K, u64>, n: usize) -> Vec<(K, u64)> {
    map.iter()
        .sorted_by(|x, y| y.1.cmp(x.1))
        .take(n)
        .map(|(k, c)| (*k, *c))
        .collect()
}

/// Render up to [TOP_N] `key/count/percent%` items, padding with `-`.
fn format_patterns<K>(items: &[(K, u64)], total: u64, key: impl Fn(&K) -> String)
    -> String
{
    (0..TOP_N).map(|i| match items.get(i) {
        Some((k, c)) => {
            let pct = if total == 0 { 0 } else { 100 * c / total };
            format!("{}/{}/{}%", key(k), c, pct)
        },
        None => "-".to_string(),
    }).join(", ")
}

#[cfg(test)]
mod test {
    use super::*;

    fn retired(value: u64, latency: u64) -> InflightEntry {
        let mut op = InflightEntry::candidate(0x1000, 0);
        op.inst_class = InstClass::Load;
        op.dst_reg = Some(3);
        op.src_regs = [Some(1), None, None];
        op.value = value;
        op.latency = latency;
        op
    }

    #[test]
    fn histograms_and_latency() {
        let mut inst = ImemInst::new(&retired(0, 0));
        for (v, l) in [(10, 2), (14, 4), (18, 6), (10, 4)] {
            inst.add(&retired(v, l));
        }
        assert_eq!(inst.count, 4);
        assert_eq!(inst.avg_latency(), 4);
        assert_eq!(inst.top_values(1), vec![(10, 2)]);
        assert_eq!(inst.top_strides(2), vec![(4, 2), (-8, 1)]);
    }

    #[test]
    fn ineligible_instructions_have_no_histograms() {
        let mut op = retired(1, 1);
        op.eligible = false;
        let mut inst = ImemInst::new(&op);
        inst.add(&op);
        inst.add(&op);
        assert!(inst.values.is_empty() && inst.strides.is_empty());
        assert_eq!(inst.count, 2);
    }

    #[test]
    fn display_line() {
        let mut inst = ImemInst::new(&retired(0, 0));
        inst.add(&retired(0x10, 3));
        inst.add(&retired(0xc, 3));
        assert_eq!(inst.display_str(),
            "0x0000000000001000.0  ld  r3  <- r1,              3  \
            [0xc/1/50%, 0x10/1/50%, -, -]  [-0x4/1/100%, -, -, -]");
    }
}
