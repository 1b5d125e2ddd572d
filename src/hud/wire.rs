// SPDX-License-Identifier: MIT
use anyhow::bail;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Exact size of one wire frame. The producer writes these back to back at
/// its render rate; anything that is not a whole multiple of this is a
/// framing fault.
pub const PACKET_SIZE: usize = std::mem::size_of::<FpsPacket>();

/// One frame of the producer's metrics feed, in wire layout.
///
/// Native byte order (the producer runs on the same machine), field offsets
/// 0 / 8 / 12. `frame_count` increases monotonically for the lifetime of a
/// producer and resets when a new producer starts.
#[derive(Debug, Clone, Copy, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct FpsPacket {
    pub fps: f64,
    pub frametime_ms: f32,
    pub frame_count: u32,
}

const _: () = assert!(PACKET_SIZE == 16, "FpsPacket must be exactly 16 bytes");

impl FpsPacket {
    /// Decodes a single wire frame.
    ///
    /// # Errors
    ///
    /// Returns an error if `bytes` is not exactly [`PACKET_SIZE`] bytes.
    pub fn decode(bytes: &[u8]) -> anyhow::Result<Self> {
        match Self::read_from_bytes(bytes) {
            Ok(packet) => Ok(packet),
            Err(_) => bail!(
                "invalid packet length {} (expected {PACKET_SIZE})",
                bytes.len()
            ),
        }
    }

    /// Encodes this frame into its exact wire representation.
    #[must_use]
    pub fn encode(&self) -> [u8; PACKET_SIZE] {
        let mut out = [0u8; PACKET_SIZE];
        out.copy_from_slice(self.as_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_encode_round_trip() {
        let packet = FpsPacket {
            fps: 143.7,
            frametime_ms: 6.96,
            frame_count: 123_456,
        };
        let bytes = packet.encode();
        let decoded = FpsPacket::decode(&bytes).unwrap();
        assert_eq!(decoded, packet);
        assert_eq!(decoded.encode(), bytes);
    }

    #[test]
    fn decode_rejects_short_frame() {
        assert!(FpsPacket::decode(&[0u8; 15]).is_err());
    }

    #[test]
    fn decode_rejects_long_frame() {
        assert!(FpsPacket::decode(&[0u8; 17]).is_err());
    }

    #[test]
    fn field_offsets_match_wire_layout() {
        let packet = FpsPacket {
            fps: 60.0,
            frametime_ms: 16.6,
            frame_count: 42,
        };
        let bytes = packet.encode();
        assert_eq!(bytes[0..8], 60.0_f64.to_ne_bytes());
        assert_eq!(bytes[8..12], 16.6_f32.to_ne_bytes());
        assert_eq!(bytes[12..16], 42_u32.to_ne_bytes());
    }
}
