//! Canonical log records and normalization.
//!
//! This module converts a [`DecodedMessage`] into the JSON-safe
//! [`LogRecord`] written to the session log. Normalization is pure and
//! total: any field value, however nested, maps to a JSON tree of the same
//! shape, with byte blobs decoded as UTF-8 and invalid sequences replaced
//! by U+FFFD. Re-normalizing the same message at the same timestamp
//! reproduces the same record byte for byte.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::{DecodedMessage, FieldValue};

/// Which side of the tapped stream a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Received from the vehicle (inbound through the tap).
    #[serde(rename = "RX")]
    Rx,
    /// Commanded toward the vehicle.
    #[serde(rename = "TX")]
    Tx,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rx => write!(f, "RX"),
            Self::Tx => write!(f, "TX"),
        }
    }
}

/// One line of the session log.
///
/// Immutable once built; owned by the writer until flushed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Receipt wall-clock time, RFC 3339 UTC.
    pub timestamp: DateTime<Utc>,
    /// Source system id.
    pub system_id: u8,
    /// Source component id.
    pub component_id: u8,
    /// Numeric message id.
    pub msg_id: u32,
    /// Symbolic message name.
    pub msg_name: String,
    /// Envelope sequence number.
    pub seq: u8,
    /// Stream direction.
    pub direction: Direction,
    /// JSON-safe payload tree.
    pub payload: Value,
}

/// Normalize a decoded message into a log record.
///
/// Pure and total over any `DecodedMessage`; never fails.
#[must_use]
pub fn normalize(
    msg: &DecodedMessage,
    direction: Direction,
    received_at: DateTime<Utc>,
) -> LogRecord {
    let payload = msg
        .fields
        .iter()
        .map(|(name, value)| (name.clone(), json_safe(value)))
        .collect::<serde_json::Map<String, Value>>();

    LogRecord {
        timestamp: received_at,
        system_id: msg.system_id,
        component_id: msg.component_id,
        msg_id: msg.msg_id,
        msg_name: msg.msg_name.clone(),
        seq: msg.seq,
        direction,
        payload: Value::Object(payload),
    }
}

/// Convert one field value into its JSON-safe equivalent, recursively.
///
/// Bytes become UTF-8 text with replacement characters for invalid
/// sequences. Non-finite floats have no JSON representation and map to
/// null.
fn json_safe(value: &FieldValue) -> Value {
    match value {
        FieldValue::UInt(v) => Value::from(*v),
        FieldValue::Int(v) => Value::from(*v),
        FieldValue::Float(v) => {
            serde_json::Number::from_f64(*v).map_or(Value::Null, Value::Number)
        }
        FieldValue::Text(v) => Value::String(v.clone()),
        FieldValue::Bytes(v) => Value::String(String::from_utf8_lossy(v).into_owned()),
        FieldValue::List(items) => Value::Array(items.iter().map(json_safe).collect()),
        FieldValue::Map(entries) => Value::Object(
            entries
                .iter()
                .map(|(name, value)| (name.clone(), json_safe(value)))
                .collect(),
        ),
    }
}
