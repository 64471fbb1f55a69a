use super::dialect;
use super::error::FrameError;
use super::layout;

/// MAVLink wire protocol revision of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    /// MAVLink 1 framing (0xFE sync byte).
    V1,
    /// MAVLink 2 framing (0xFD sync byte).
    V2,
}

/// A validated MAVLink envelope, borrowing its payload from the datagram.
#[derive(Debug)]
pub struct Frame<'a> {
    /// Wire protocol revision.
    pub version: Version,
    /// Envelope sequence number.
    pub seq: u8,
    /// Source system id.
    pub system_id: u8,
    /// Source component id.
    pub component_id: u8,
    /// Numeric message id.
    pub msg_id: u32,
    /// Payload bytes, possibly zero-truncated on v2 frames.
    pub payload: &'a [u8],
}

/// Parse the leading MAVLink frame out of one datagram.
///
/// Validates the sync byte, the header-declared length, and the X.25
/// checksum (seeded with the per-message CRC_EXTRA byte). Messages whose
/// id is not in the dialect table cannot have their checksum verified and
/// are accepted on framing alone. Bytes trailing the frame are ignored.
pub fn parse_frame(bytes: &[u8]) -> Result<Frame<'_>, FrameError> {
    let stx = *bytes.first().ok_or(FrameError::Empty)?;
    match stx {
        layout::STX_V1 => parse_v1(bytes),
        layout::STX_V2 => parse_v2(bytes),
        byte => Err(FrameError::BadSync { byte }),
    }
}

fn parse_v1(bytes: &[u8]) -> Result<Frame<'_>, FrameError> {
    require_len(bytes, layout::HEADER_LEN_V1 + layout::CHECKSUM_LEN)?;
    let payload_len = bytes[layout::LEN_OFFSET] as usize;
    let crc_end = layout::HEADER_LEN_V1 + payload_len;
    require_len(bytes, crc_end + layout::CHECKSUM_LEN)?;

    let msg_id = u32::from(bytes[layout::V1_MSGID_OFFSET]);
    verify_checksum(bytes, crc_end, msg_id)?;

    Ok(Frame {
        version: Version::V1,
        seq: bytes[layout::V1_SEQ_OFFSET],
        system_id: bytes[layout::V1_SYSID_OFFSET],
        component_id: bytes[layout::V1_COMPID_OFFSET],
        msg_id,
        payload: &bytes[layout::HEADER_LEN_V1..crc_end],
    })
}

fn parse_v2(bytes: &[u8]) -> Result<Frame<'_>, FrameError> {
    require_len(bytes, layout::HEADER_LEN_V2 + layout::CHECKSUM_LEN)?;
    let payload_len = bytes[layout::LEN_OFFSET] as usize;
    let crc_end = layout::HEADER_LEN_V2 + payload_len;
    let mut total = crc_end + layout::CHECKSUM_LEN;
    if bytes[layout::V2_INCOMPAT_OFFSET] & layout::INCOMPAT_FLAG_SIGNED != 0 {
        // Signature trails the checksum; it is not covered by the CRC and
        // this tap does not verify it.
        total += layout::SIGNATURE_LEN;
    }
    require_len(bytes, total)?;

    let id = &bytes[layout::V2_MSGID_RANGE];
    let msg_id = u32::from_le_bytes([id[0], id[1], id[2], 0]);
    verify_checksum(bytes, crc_end, msg_id)?;

    Ok(Frame {
        version: Version::V2,
        seq: bytes[layout::V2_SEQ_OFFSET],
        system_id: bytes[layout::V2_SYSID_OFFSET],
        component_id: bytes[layout::V2_COMPID_OFFSET],
        msg_id,
        payload: &bytes[layout::HEADER_LEN_V2..crc_end],
    })
}

fn require_len(bytes: &[u8], needed: usize) -> Result<(), FrameError> {
    if bytes.len() < needed {
        return Err(FrameError::Truncated {
            needed,
            actual: bytes.len(),
        });
    }
    Ok(())
}

fn verify_checksum(bytes: &[u8], crc_end: usize, msg_id: u32) -> Result<(), FrameError> {
    let Some(extra) = dialect::crc_extra(msg_id) else {
        return Ok(());
    };
    let expected = crc_x25(&bytes[layout::LEN_OFFSET..crc_end], extra);
    let actual = u16::from_le_bytes([bytes[crc_end], bytes[crc_end + 1]]);
    if expected != actual {
        return Err(FrameError::ChecksumMismatch { expected, actual });
    }
    Ok(())
}

/// X.25 (CRC-16/MCRF4XX) checksum over the frame bytes plus the
/// per-message CRC_EXTRA seed byte, as specified by MAVLink.
pub fn crc_x25(bytes: &[u8], extra: u8) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in bytes.iter().chain(std::iter::once(&extra)) {
        let mut tmp = byte ^ (crc & 0xFF) as u8;
        tmp ^= tmp << 4;
        crc = (crc >> 8) ^ (u16::from(tmp) << 8) ^ (u16::from(tmp) << 3) ^ (u16::from(tmp) >> 4);
    }
    crc
}
