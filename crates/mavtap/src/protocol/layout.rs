//! MAVLink frame layout constants.

/// Sync byte opening a MAVLink v1 frame.
pub const STX_V1: u8 = 0xFE;

/// Sync byte opening a MAVLink v2 frame.
pub const STX_V2: u8 = 0xFD;

/// Header length for v1 frames: stx, len, seq, sysid, compid, msgid.
pub const HEADER_LEN_V1: usize = 6;

/// Header length for v2 frames: stx, len, incompat, compat, seq, sysid,
/// compid, msgid (3 bytes).
pub const HEADER_LEN_V2: usize = 10;

/// Length of the trailing X.25 checksum.
pub const CHECKSUM_LEN: usize = 2;

/// Length of the optional v2 signature block.
pub const SIGNATURE_LEN: usize = 13;

/// Incompatibility flag marking a signed v2 frame.
pub const INCOMPAT_FLAG_SIGNED: u8 = 0x01;

/// Offset of the payload-length byte (both revisions).
pub const LEN_OFFSET: usize = 1;
/// v1 sequence number offset.
pub const V1_SEQ_OFFSET: usize = 2;
/// v1 system id offset.
pub const V1_SYSID_OFFSET: usize = 3;
/// v1 component id offset.
pub const V1_COMPID_OFFSET: usize = 4;
/// v1 message id offset.
pub const V1_MSGID_OFFSET: usize = 5;

/// v2 incompatibility flags offset.
pub const V2_INCOMPAT_OFFSET: usize = 2;
/// v2 sequence number offset.
pub const V2_SEQ_OFFSET: usize = 4;
/// v2 system id offset.
pub const V2_SYSID_OFFSET: usize = 5;
/// v2 component id offset.
pub const V2_COMPID_OFFSET: usize = 6;
/// v2 message id range (24-bit little-endian).
pub const V2_MSGID_RANGE: std::ops::Range<usize> = 7..10;
