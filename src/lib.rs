//! Stride-based value prediction for out-of-order processor simulators.

pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod inflight;
pub mod predictor;
pub mod sim;
pub mod stats;
pub mod trace;
pub mod watch;

pub use config::*;
pub use engine::*;
pub use error::*;
pub use inflight::*;
pub use predictor::*;
pub use trace::*;
pub use watch::*;
