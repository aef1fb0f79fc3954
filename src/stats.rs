//! Helpers for collecting prediction statistics.

use std::collections::*;
use std::io::{self, Write};

use crate::inflight::*;

/// Prediction counts for a group of retired instructions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassStats {
    /// Retired instructions
    pub retired: usize,
    /// Retired instructions eligible for prediction
    pub eligible: usize,
    /// Eligible instructions that received a speculative value
    pub speculated: usize,
    pub correct: usize,
    pub incorrect: usize,
}
impl ClassStats {
    fn update(&mut self, eligible: bool, prediction: Prediction, actual: u64) {
        self.retired += 1;
        if !eligible {
            return;
        }
        self.eligible += 1;
        if prediction.speculate {
            self.speculated += 1;
            if prediction.predicted_value == actual {
                self.correct += 1;
            } else {
                self.incorrect += 1;
            }
        }
    }

    /// Fraction of eligible instructions that were predicted.
    pub fn coverage(&self) -> f64 {
        if self.eligible == 0 { return 0.0; }
        self.speculated as f64 / self.eligible as f64
    }

    /// Fraction of predictions that were correct.
    pub fn accuracy(&self) -> f64 {
        if self.speculated == 0 { return 0.0; }
        self.correct as f64 / self.speculated as f64
    }
}

/// Container for recording prediction statistics while replaying a trace.
#[derive(Clone, Debug, Default)]
pub struct PredictionStats {
    pub global: ClassStats,

    /// Per-class statistics (indexed by instruction class)
    pub data: BTreeMap<InstClass, ClassStats>,
}
impl PredictionStats {
    pub fn new() -> Self { Self::default() }

    /// Record a retired instruction and the prediction made for it.
    pub fn update(&mut self, class: InstClass, eligible: bool,
        prediction: Prediction, actual: u64)
    {
        self.global.update(eligible, prediction, actual);
        self.data.entry(class).or_default()
            .update(eligible, prediction, actual);
    }

    pub fn get(&self, class: InstClass) -> Option<&ClassStats> {
        self.data.get(&class)
    }

    pub fn coverage(&self) -> f64 { self.global.coverage() }
    pub fn accuracy(&self) -> f64 { self.global.accuracy() }

    pub fn dump(&self, w: &mut impl Write) -> io::Result<()> {
        writeln!(w, "[*] Prediction statistics:")?;
        Self::dump_line(w, "all", &self.global)?;
        for (class, s) in self.data.iter() {
            Self::dump_line(w, class.mnemonic(), s)?;
        }
        Ok(())
    }

    fn dump_line(w: &mut impl Write, name: &str, s: &ClassStats)
        -> io::Result<()>
    {
        writeln!(w, "  {:<6} retired={:<10} eligible={:<10} speculated={:<10} \
            correct={:<10} incorrect={:<8} coverage={:>7.3}% accuracy={:>7.3}%",
            name, s.retired, s.eligible, s.speculated, s.correct,
            s.incorrect, s.coverage() * 100.0, s.accuracy() * 100.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn coverage_and_accuracy() {
        let mut s = PredictionStats::new();
        s.update(InstClass::Load, true, Prediction::value(4), 4);
        s.update(InstClass::Load, true, Prediction::value(4), 8);
        s.update(InstClass::Alu, true, Prediction::abstain(), 1);
        s.update(InstClass::Store, false, Prediction::abstain(), 1);
        s.update(InstClass::Alu, true, Prediction::value(1), 1);

        assert_eq!(s.global.retired, 5);
        assert_eq!(s.global.eligible, 4);
        assert_eq!(s.global.speculated, 3);
        assert!((s.coverage() - 0.75).abs() < 1e-9);
        assert!((s.accuracy() - 2.0 / 3.0).abs() < 1e-9);

        let ld = s.get(InstClass::Load).unwrap();
        assert_eq!((ld.correct, ld.incorrect), (1, 1));
        assert_eq!(s.get(InstClass::Store).unwrap().eligible, 0);
        assert_eq!(ClassStats::default().accuracy(), 0.0);
    }
}
