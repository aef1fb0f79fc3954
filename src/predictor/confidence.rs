//! Implementation of a saturating confidence counter.

use crate::config::ConfidenceConfig;

/// A saturating counter estimating how much a predictor trusts an entry.
///
/// A value of zero marks an invalid entry and one marks an entry that has
/// observed a single value. Trained entries live in `min..=max`, and only
/// entries at or above `thd` are allowed to speculate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfidenceCounter {
    cfg: ConfidenceConfig,
    ctr: u8,
}
impl ConfidenceCounter {
    pub fn new(cfg: ConfidenceConfig, init: u8) -> Self {
        Self { cfg, ctr: init.min(cfg.max) }
    }

    /// A counter for an entry that has just seen its first value.
    pub fn first_seen(cfg: ConfidenceConfig) -> Self {
        Self::new(cfg, 1)
    }

    pub fn value(&self) -> u8 { self.ctr }
    pub fn config(&self) -> &ConfidenceConfig { &self.cfg }

    pub fn is_valid(&self) -> bool { self.ctr > 0 }
    pub fn is_first_seen(&self) -> bool { self.ctr == 1 }
    pub fn is_confident(&self) -> bool { self.ctr >= self.cfg.thd }

    /// Increment, saturating at `max`.
    pub fn strengthen(&mut self) {
        if self.ctr < self.cfg.max {
            self.ctr += 1;
        }
    }

    /// Decrement, saturating at `min`.
    pub fn weaken(&mut self) {
        if self.ctr > self.cfg.min {
            self.ctr -= 1;
        }
    }

    /// Drop back to the lowest trained state.
    pub fn reset(&mut self) {
        self.ctr = self.cfg.min;
    }

    /// Jump straight to the speculation threshold.
    pub fn arm(&mut self) {
        self.ctr = self.cfg.thd;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const CFG: ConfidenceConfig = ConfidenceConfig { min: 2, thd: 4, max: 7 };

    #[test]
    fn saturates_at_both_ends() {
        let mut c = ConfidenceCounter::new(CFG, 2);
        for _ in 0..16 { c.strengthen(); }
        assert_eq!(c.value(), 7);
        for _ in 0..16 { c.weaken(); }
        assert_eq!(c.value(), 2);
    }

    #[test]
    fn threshold_gates_confidence() {
        let mut c = ConfidenceCounter::new(CFG, 3);
        assert!(!c.is_confident());
        c.strengthen();
        assert!(c.is_confident());
        c.reset();
        assert_eq!(c.value(), 2);
        c.arm();
        assert_eq!(c.value(), 4);
    }

    #[test]
    fn first_seen_is_valid_but_untrained() {
        let c = ConfidenceCounter::first_seen(CFG);
        assert!(c.is_valid() && c.is_first_seen() && !c.is_confident());
        assert!(!ConfidenceCounter::new(CFG, 0).is_valid());
    }
}
