//! `mavtap` - Passive MAVLink stream tap with line-delimited JSON logging
//!
//! This library taps a duplicated MAVLink telemetry stream on a UDP
//! endpoint, decodes message envelopes into structured records, and
//! appends them to a per-session JSONL log without disturbing the primary
//! forwarding path.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod record;
pub mod source;
pub mod tap;
pub mod writer;

pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use record::{normalize, Direction, LogRecord};
pub use source::{Received, TapSource};
pub use tap::{SessionSummary, StopReason, TapEvent, TapOptions, TapSession, TapState};
pub use writer::{read_records, LogWriter};
