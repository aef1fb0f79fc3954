//! Tracing for a single watched instruction.
//!
//! A table is built with an optional [WatchTag] and a [TraceSink]. Entries
//! allocated for the watched instruction report every lookup and update to
//! the sink; all other entries stay silent.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::ConfigError;
use crate::inflight::*;

/// Identity of a watched static instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WatchTag {
    pub pc: u64,
    pub piece: u32,
}
impl WatchTag {
    pub fn new(pc: u64, piece: u32) -> Self { Self { pc, piece } }

    /// Parse a tag written as `0x<pc>.<piece>` (both in hex).
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let bad = || ConfigError::BadWatchTag(s.to_string());
        let (pc, piece) = s.trim().split_once('.').ok_or_else(bad)?;
        let pc = pc.strip_prefix("0x").ok_or_else(bad)?;
        let pc = u64::from_str_radix(pc, 16).map_err(|_| bad())?;
        let piece = u32::from_str_radix(piece, 16).map_err(|_| bad())?;
        Ok(Self { pc, piece })
    }

    pub fn matches(&self, op: &InflightEntry) -> bool {
        self.pc == op.pc && self.piece == op.piece
    }
}
impl fmt::Display for WatchTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", pc_str(self.pc, self.piece))
    }
}

/// Destination for per-entry trace lines.
pub trait TraceSink {
    fn record(&mut self, line: &str);
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;
impl TraceSink for NullSink {
    fn record(&mut self, _line: &str) {}
}

/// Forwards trace lines to `tracing` at debug level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;
impl TraceSink for TracingSink {
    fn record(&mut self, line: &str) {
        tracing::debug!(target: "vpred::watch", "{}", line);
    }
}

/// Keeps trace lines in memory. Clones share the same buffer.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    lines: Rc<RefCell<Vec<String>>>,
}
impl MemorySink {
    pub fn new() -> Self { Self::default() }

    /// Return a copy of everything recorded so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}
impl TraceSink for MemorySink {
    fn record(&mut self, line: &str) {
        self.lines.borrow_mut().push(line.to_string());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_watch_tag() {
        let tag = WatchTag::parse("0xffff00000844f73c.0").unwrap();
        assert_eq!(tag, WatchTag::new(0xffff00000844f73c, 0));
        assert_eq!(tag.to_string(), "0xffff00000844f73c.0");
        assert_eq!(WatchTag::parse("0x10.a").unwrap().piece, 10);
    }

    #[test]
    fn reject_malformed_tags() {
        for s in ["", "0x10", "10.0", "0xzz.0", "0x10.q"] {
            assert!(WatchTag::parse(s).is_err(), "{}", s);
        }
    }

    #[test]
    fn memory_sink_clones_share_lines() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        writer.record("a");
        writer.record("b");
        assert_eq!(sink.lines(), vec!["a", "b"]);
    }
}
