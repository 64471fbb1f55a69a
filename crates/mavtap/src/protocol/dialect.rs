//! Message dictionary for the common MAVLink dialect subset.
//!
//! Known message ids carry their CRC_EXTRA seed, expected payload length,
//! and a field schema in wire order (MAVLink sorts fields by type size,
//! largest first). Ids outside this table fall back to a generic decode
//! that carries the raw payload, so an unfamiliar dialect never stops the
//! tap from recording.

use super::FieldValue;

/// HEARTBEAT: component presence and mode beacon.
pub const MSG_HEARTBEAT: u32 = 0;
/// SYS_STATUS: onboard health, load, and battery state.
pub const MSG_SYS_STATUS: u32 = 1;
/// ATTITUDE: roll/pitch/yaw angles and rates.
pub const MSG_ATTITUDE: u32 = 30;
/// GLOBAL_POSITION_INT: fused GPS position and velocity.
pub const MSG_GLOBAL_POSITION_INT: u32 = 33;
/// STATUSTEXT: severity-tagged free-text status message.
pub const MSG_STATUSTEXT: u32 = 253;

/// Symbolic name for a known message id.
#[must_use]
pub fn message_name(msg_id: u32) -> Option<&'static str> {
    match msg_id {
        MSG_HEARTBEAT => Some("HEARTBEAT"),
        MSG_SYS_STATUS => Some("SYS_STATUS"),
        MSG_ATTITUDE => Some("ATTITUDE"),
        MSG_GLOBAL_POSITION_INT => Some("GLOBAL_POSITION_INT"),
        MSG_STATUSTEXT => Some("STATUSTEXT"),
        _ => None,
    }
}

/// CRC_EXTRA seed byte for a known message id.
#[must_use]
pub fn crc_extra(msg_id: u32) -> Option<u8> {
    match msg_id {
        MSG_HEARTBEAT => Some(50),
        MSG_SYS_STATUS => Some(124),
        MSG_ATTITUDE => Some(39),
        MSG_GLOBAL_POSITION_INT => Some(104),
        MSG_STATUSTEXT => Some(83),
        _ => None,
    }
}

/// Decode a payload into named fields in wire order.
///
/// Total over any input: MAVLink v2 truncates trailing zero bytes on the
/// wire, so the cursor reads zeros past the end of the buffer rather than
/// failing. Unknown message ids yield a single `data` field carrying the
/// raw payload bytes.
#[must_use]
pub fn decode_fields(msg_id: u32, payload: &[u8]) -> Vec<(String, FieldValue)> {
    let mut cursor = PayloadCursor::new(payload);
    match msg_id {
        MSG_HEARTBEAT => vec![
            field("custom_mode", FieldValue::UInt(u64::from(cursor.u32()))),
            field("type", FieldValue::UInt(u64::from(cursor.u8()))),
            field("autopilot", FieldValue::UInt(u64::from(cursor.u8()))),
            field("base_mode", FieldValue::UInt(u64::from(cursor.u8()))),
            field("system_status", FieldValue::UInt(u64::from(cursor.u8()))),
            field("mavlink_version", FieldValue::UInt(u64::from(cursor.u8()))),
        ],
        MSG_SYS_STATUS => vec![
            field(
                "onboard_control_sensors_present",
                FieldValue::UInt(u64::from(cursor.u32())),
            ),
            field(
                "onboard_control_sensors_enabled",
                FieldValue::UInt(u64::from(cursor.u32())),
            ),
            field(
                "onboard_control_sensors_health",
                FieldValue::UInt(u64::from(cursor.u32())),
            ),
            field("load", FieldValue::UInt(u64::from(cursor.u16()))),
            field("voltage_battery", FieldValue::UInt(u64::from(cursor.u16()))),
            field("current_battery", FieldValue::Int(i64::from(cursor.i16()))),
            field("drop_rate_comm", FieldValue::UInt(u64::from(cursor.u16()))),
            field("errors_comm", FieldValue::UInt(u64::from(cursor.u16()))),
            field("errors_count1", FieldValue::UInt(u64::from(cursor.u16()))),
            field("errors_count2", FieldValue::UInt(u64::from(cursor.u16()))),
            field("errors_count3", FieldValue::UInt(u64::from(cursor.u16()))),
            field("errors_count4", FieldValue::UInt(u64::from(cursor.u16()))),
            field("battery_remaining", FieldValue::Int(i64::from(cursor.i8()))),
        ],
        MSG_ATTITUDE => vec![
            field("time_boot_ms", FieldValue::UInt(u64::from(cursor.u32()))),
            field("roll", FieldValue::Float(f64::from(cursor.f32()))),
            field("pitch", FieldValue::Float(f64::from(cursor.f32()))),
            field("yaw", FieldValue::Float(f64::from(cursor.f32()))),
            field("rollspeed", FieldValue::Float(f64::from(cursor.f32()))),
            field("pitchspeed", FieldValue::Float(f64::from(cursor.f32()))),
            field("yawspeed", FieldValue::Float(f64::from(cursor.f32()))),
        ],
        MSG_GLOBAL_POSITION_INT => vec![
            field("time_boot_ms", FieldValue::UInt(u64::from(cursor.u32()))),
            field("lat", FieldValue::Int(i64::from(cursor.i32()))),
            field("lon", FieldValue::Int(i64::from(cursor.i32()))),
            field("alt", FieldValue::Int(i64::from(cursor.i32()))),
            field("relative_alt", FieldValue::Int(i64::from(cursor.i32()))),
            field("vx", FieldValue::Int(i64::from(cursor.i16()))),
            field("vy", FieldValue::Int(i64::from(cursor.i16()))),
            field("vz", FieldValue::Int(i64::from(cursor.i16()))),
            field("hdg", FieldValue::UInt(u64::from(cursor.u16()))),
        ],
        MSG_STATUSTEXT => vec![
            field("severity", FieldValue::UInt(u64::from(cursor.u8()))),
            field("text", FieldValue::Bytes(trim_nul(cursor.bytes(50)))),
        ],
        _ => vec![field("data", FieldValue::Bytes(payload.to_vec()))],
    }
}

fn field(name: &str, value: FieldValue) -> (String, FieldValue) {
    (name.to_string(), value)
}

fn trim_nul(mut bytes: Vec<u8>) -> Vec<u8> {
    while bytes.last() == Some(&0) {
        bytes.pop();
    }
    bytes
}

/// Bounds-tolerant little-endian reader over a message payload.
///
/// Reads past the end of the buffer yield zero bytes, matching the v2
/// zero-truncation rule.
struct PayloadCursor<'a> {
    payload: &'a [u8],
    pos: usize,
}

impl<'a> PayloadCursor<'a> {
    fn new(payload: &'a [u8]) -> Self {
        Self { payload, pos: 0 }
    }

    fn byte(&mut self) -> u8 {
        let value = self.payload.get(self.pos).copied().unwrap_or(0);
        self.pos += 1;
        value
    }

    fn u8(&mut self) -> u8 {
        self.byte()
    }

    fn i8(&mut self) -> i8 {
        self.byte() as i8
    }

    fn u16(&mut self) -> u16 {
        u16::from_le_bytes([self.byte(), self.byte()])
    }

    fn i16(&mut self) -> i16 {
        i16::from_le_bytes([self.byte(), self.byte()])
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes([self.byte(), self.byte(), self.byte(), self.byte()])
    }

    fn i32(&mut self) -> i32 {
        i32::from_le_bytes([self.byte(), self.byte(), self.byte(), self.byte()])
    }

    fn f32(&mut self) -> f32 {
        f32::from_le_bytes([self.byte(), self.byte(), self.byte(), self.byte()])
    }

    fn bytes(&mut self, count: usize) -> Vec<u8> {
        (0..count).map(|_| self.byte()).collect()
    }
}
