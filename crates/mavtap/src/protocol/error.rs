//! Per-frame decode errors.
//!
//! These are recoverable by contract: a frame that fails to decode is
//! discarded and the tap keeps running. They are therefore kept separate
//! from the crate-level [`Error`](crate::Error) type, which covers
//! setup-time and session-fatal conditions.

use thiserror::Error;

/// A single frame failed to parse as a well-formed MAVLink envelope.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The datagram was empty.
    #[error("empty frame")]
    Empty,

    /// The first byte was not a known MAVLink sync byte.
    #[error("unknown sync byte 0x{byte:02X}")]
    BadSync {
        /// The byte found where a sync byte was expected.
        byte: u8,
    },

    /// The frame was shorter than its header-declared length.
    #[error("truncated frame: need {needed} bytes, got {actual}")]
    Truncated {
        /// Bytes required by the declared payload length.
        needed: usize,
        /// Bytes actually present.
        actual: usize,
    },

    /// The trailing checksum did not match the frame contents.
    #[error("checksum mismatch: expected 0x{expected:04X}, got 0x{actual:04X}")]
    ChecksumMismatch {
        /// Checksum computed over the frame.
        expected: u16,
        /// Checksum carried in the frame.
        actual: u16,
    },
}
