//! Wire-format definitions for protocol packets.
//!
//! Every unit exchanged between the two peers is a [`Packet`]: a [`Frame`]
//! (either a data frame or an acknowledgment frame) plus the checksum that
//! was computed when the packet was built.  This module is responsible for:
//! - Defining the two frame kinds and the additive checksum over them.
//! - Serialising a [`Packet`] into a byte buffer ready for the channel.
//! - Deserialising a raw byte slice back into a [`Packet`], returning errors
//!   for structurally malformed input.
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Corruption vs. structural damage
//!
//! [`Packet::decode`] rejects only *structural* damage: truncation, a length
//! field that disagrees with the buffer, an unknown frame kind.  It does
//! **not** verify the checksum — a bit-flipped field must still reach the
//! receiving state machine so that [`Packet::verify`] can detect it, count
//! it, and drop it.  This mirrors the channel's fault model, where
//! corruption flips bits inside fields rather than mangling the framing.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**.
//!
//! ```text
//! Data frame (kind = 0):
//! +------+--------+-------------+------------+-----------------+
//! | kind | seq(2) | payload_len | checksum   | payload ...     |
//! | (1)  |        | (2)         | (4)        | (0..=20 bytes)  |
//! +------+--------+-------------+------------+-----------------+
//!
//! Ack frame (kind = 1):
//! +------+---------------+-------------------+------------+
//! | kind | cumulative(2) | sack 5 × u16 (10) | checksum(4)|
//! +------+---------------+-------------------+------------+
//! ```

use thiserror::Error;

/// Upper bound on the payload of a single data frame, in bytes.
pub const MAX_PAYLOAD: usize = 20;

/// Number of selective-ack slots carried by every ack frame.
pub const SACK_SLOTS: usize = 5;

/// Sentinel marking an unused selective-ack slot.
pub const SACK_UNUSED: u16 = u16::MAX;

/// Fixed-size selective-ack list: sequence numbers currently held in the
/// receiver's reorder buffer, padded with [`SACK_UNUSED`].
pub type SackList = [u16; SACK_SLOTS];

const KIND_DATA: u8 = 0;
const KIND_ACK: u8 = 1;

/// Byte length of a data frame's fixed header: kind(1) + seq(2) + len(2)
/// + checksum(4).
pub const DATA_HEADER_LEN: usize = 9;

/// Byte length of an ack frame on the wire: kind(1) + cumulative(2)
/// + sack(10) + checksum(4).
pub const ACK_WIRE_LEN: usize = 17;

// Byte offsets within a serialised data frame.
const OFF_DATA_SEQ: usize = 1;
const OFF_DATA_LEN: usize = 3;
const OFF_DATA_CSUM: usize = 5;

// Byte offsets within a serialised ack frame.
const OFF_ACK_CUM: usize = 1;
const OFF_ACK_SACK: usize = 3;
const OFF_ACK_CSUM: usize = 13;

/// The two kinds of frame a peer can place on the channel.
///
/// An explicit tagged type rather than a dual-purpose "ack number" field:
/// a packet either carries data or acknowledges data, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Application payload, one message per frame.
    Data { seq: u16, payload: Vec<u8> },
    /// Cumulative acknowledgment: every sequence number up to and including
    /// `cumulative` has been delivered in order.  `sack` additionally lists
    /// out-of-order frames sitting in the reorder buffer.
    Ack { cumulative: u16, sack: SackList },
}

/// A complete protocol packet: frame plus the checksum stored at build time.
///
/// Packets are value objects — once constructed for transmission they are
/// never mutated by either peer.  A receiving peer may inspect a packet but
/// re-derives trust only through [`Packet::verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    frame: Frame,
    checksum: u32,
}

impl Packet {
    /// Build a data packet, computing its checksum.
    ///
    /// # Panics
    ///
    /// Panics in debug mode if `payload` exceeds [`MAX_PAYLOAD`].
    pub fn data(seq: u16, payload: Vec<u8>) -> Self {
        debug_assert!(
            payload.len() <= MAX_PAYLOAD,
            "payload of {} bytes exceeds MAX_PAYLOAD",
            payload.len()
        );
        let frame = Frame::Data { seq, payload };
        let checksum = additive_checksum(&frame);
        Self { frame, checksum }
    }

    /// Build an ack packet with an empty selective-ack list.
    pub fn ack(cumulative: u16) -> Self {
        Self::ack_with_sack(cumulative, [SACK_UNUSED; SACK_SLOTS])
    }

    /// Build an ack packet carrying the given selective-ack list.
    pub fn ack_with_sack(cumulative: u16, sack: SackList) -> Self {
        let frame = Frame::Ack { cumulative, sack };
        let checksum = additive_checksum(&frame);
        Self { frame, checksum }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    /// The sequence number when this is a data packet.
    pub fn data_seq(&self) -> Option<u16> {
        match &self.frame {
            Frame::Data { seq, .. } => Some(*seq),
            Frame::Ack { .. } => None,
        }
    }

    /// Recompute the checksum over the frame and compare with the stored
    /// value.  `false` means the packet was corrupted in transit and must be
    /// treated as garbage.
    pub fn verify(&self) -> bool {
        additive_checksum(&self.frame) == self.checksum
    }

    /// Serialise this packet into a newly allocated byte vector.
    pub fn encode(&self) -> Vec<u8> {
        match &self.frame {
            Frame::Data { seq, payload } => {
                let mut buf = vec![0u8; DATA_HEADER_LEN + payload.len()];
                buf[0] = KIND_DATA;
                buf[OFF_DATA_SEQ..OFF_DATA_SEQ + 2].copy_from_slice(&seq.to_be_bytes());
                buf[OFF_DATA_LEN..OFF_DATA_LEN + 2]
                    .copy_from_slice(&(payload.len() as u16).to_be_bytes());
                buf[OFF_DATA_CSUM..OFF_DATA_CSUM + 4]
                    .copy_from_slice(&self.checksum.to_be_bytes());
                buf[DATA_HEADER_LEN..].copy_from_slice(payload);
                buf
            }
            Frame::Ack { cumulative, sack } => {
                let mut buf = vec![0u8; ACK_WIRE_LEN];
                buf[0] = KIND_ACK;
                buf[OFF_ACK_CUM..OFF_ACK_CUM + 2].copy_from_slice(&cumulative.to_be_bytes());
                for (i, s) in sack.iter().enumerate() {
                    let off = OFF_ACK_SACK + i * 2;
                    buf[off..off + 2].copy_from_slice(&s.to_be_bytes());
                }
                buf[OFF_ACK_CSUM..OFF_ACK_CSUM + 4]
                    .copy_from_slice(&self.checksum.to_be_bytes());
                buf
            }
        }
    }

    /// Parse a [`Packet`] from a raw byte slice.
    ///
    /// The stored checksum field is preserved as-is; call [`Packet::verify`]
    /// to detect in-transit corruption.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        let kind = *buf.first().ok_or(PacketError::BufferTooShort)?;
        match kind {
            KIND_DATA => {
                if buf.len() < DATA_HEADER_LEN {
                    return Err(PacketError::BufferTooShort);
                }
                let seq =
                    u16::from_be_bytes(buf[OFF_DATA_SEQ..OFF_DATA_SEQ + 2].try_into().unwrap());
                let len =
                    u16::from_be_bytes(buf[OFF_DATA_LEN..OFF_DATA_LEN + 2].try_into().unwrap());
                let checksum =
                    u32::from_be_bytes(buf[OFF_DATA_CSUM..OFF_DATA_CSUM + 4].try_into().unwrap());
                if buf.len() != DATA_HEADER_LEN + len as usize {
                    return Err(PacketError::LengthMismatch);
                }
                Ok(Self {
                    frame: Frame::Data {
                        seq,
                        payload: buf[DATA_HEADER_LEN..].to_vec(),
                    },
                    checksum,
                })
            }
            KIND_ACK => {
                if buf.len() != ACK_WIRE_LEN {
                    return Err(PacketError::LengthMismatch);
                }
                let cumulative =
                    u16::from_be_bytes(buf[OFF_ACK_CUM..OFF_ACK_CUM + 2].try_into().unwrap());
                let mut sack = [SACK_UNUSED; SACK_SLOTS];
                for (i, slot) in sack.iter_mut().enumerate() {
                    let off = OFF_ACK_SACK + i * 2;
                    *slot = u16::from_be_bytes(buf[off..off + 2].try_into().unwrap());
                }
                let checksum =
                    u32::from_be_bytes(buf[OFF_ACK_CSUM..OFF_ACK_CSUM + 4].try_into().unwrap());
                Ok(Self {
                    frame: Frame::Ack { cumulative, sack },
                    checksum,
                })
            }
            other => Err(PacketError::UnknownKind(other)),
        }
    }
}

/// Errors that can arise when parsing a raw datagram.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    /// Buffer shorter than the fixed header size for its kind.
    #[error("buffer too short to contain a frame header")]
    BufferTooShort,
    /// Length field (or fixed frame size) does not match the buffer.
    #[error("frame length does not match remaining bytes")]
    LengthMismatch,
    /// Kind byte is neither data nor ack.
    #[error("unknown frame kind {0:#04x}")]
    UnknownKind(u8),
}

/// Additive checksum over a frame's fields.
///
/// Sequence/ack fields and every payload byte (and sack entry) are summed as
/// integers with wrapping arithmetic.  No cryptographic strength — the goal
/// is only to catch the independent bit-level corruption the channel
/// injects, where a single flipped bit always changes the sum.
fn additive_checksum(frame: &Frame) -> u32 {
    match frame {
        Frame::Data { seq, payload } => payload
            .iter()
            .fold(u32::from(*seq), |sum, &b| sum.wrapping_add(u32::from(b))),
        Frame::Ack { cumulative, sack } => sack
            .iter()
            .fold(u32::from(*cumulative), |sum, &s| {
                sum.wrapping_add(u32::from(s))
            }),
    }
}
