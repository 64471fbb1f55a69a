//! MAVLink envelope decoding.
//!
//! This module parses raw datagrams into [`DecodedMessage`] values: the
//! envelope header (message id and name, source system/component, sequence
//! number) plus an ordered field mapping decoded against the message
//! dictionary in [`dialect`]. Decoding is per-frame with no cross-frame
//! state, so a lossy or reordered stream is handled frame by frame.

pub mod dialect;
mod error;
pub mod layout;
mod parser;

pub use error::FrameError;
pub use parser::{crc_x25, parse_frame, Frame, Version};

/// A decoded payload field value.
///
/// MAVLink payloads are tree-shaped by construction; the list and map
/// variants cover nested structures so conversion downstream is total over
/// a closed set of shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Unsigned integer field.
    UInt(u64),
    /// Signed integer field.
    Int(i64),
    /// Floating-point field.
    Float(f64),
    /// Text field already known to be valid UTF-8.
    Text(String),
    /// Raw byte field (char arrays, opaque payloads).
    Bytes(Vec<u8>),
    /// Nested sequence of values.
    List(Vec<FieldValue>),
    /// Nested mapping of values, in insertion order.
    Map(Vec<(String, FieldValue)>),
}

/// One fully decoded MAVLink message.
///
/// Owned by the capture loop iteration that produced it and discarded
/// after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    /// Numeric message id.
    pub msg_id: u32,
    /// Symbolic message name, or `UNKNOWN_<id>` outside the dialect table.
    pub msg_name: String,
    /// Source system id from the envelope.
    pub system_id: u8,
    /// Source component id from the envelope.
    pub component_id: u8,
    /// Envelope sequence number.
    pub seq: u8,
    /// Payload fields in wire order.
    pub fields: Vec<(String, FieldValue)>,
}

/// Decode one datagram into a message.
///
/// # Errors
///
/// Returns a [`FrameError`] if the bytes do not form a well-formed MAVLink
/// envelope (bad sync byte, truncation, checksum mismatch). The error is
/// recoverable by contract; the caller discards the frame and continues.
pub fn decode(bytes: &[u8]) -> Result<DecodedMessage, FrameError> {
    let frame = parse_frame(bytes)?;
    let msg_name = dialect::message_name(frame.msg_id)
        .map_or_else(|| format!("UNKNOWN_{}", frame.msg_id), str::to_string);
    Ok(DecodedMessage {
        msg_id: frame.msg_id,
        msg_name,
        system_id: frame.system_id,
        component_id: frame.component_id,
        seq: frame.seq,
        fields: dialect::decode_fields(frame.msg_id, frame.payload),
    })
}
