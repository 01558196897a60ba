// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport header and acknowledgment bitmap decoding.
//!
//! A session-scoped datagram opens with a fixed transport header followed by
//! a fixed acknowledgment block. Both are consumed here; later stages only
//! see the message-stream body that follows.

use super::constants::{ACK_BITMAP_LEN, TRANSPORT_HEADER_LEN};

/// Fixed transport header at the front of every datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportHeader {
    /// Connection id (0 = system message, nonzero = session-scoped data).
    pub connection_id: u16,
    /// Datagram sequence number.
    pub packet_seq: u16,
}

/// Acknowledgment block: last acked reliable message id plus a 128-bit
/// bitmap of the ids preceding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckBitmap {
    /// Most recent reliable message id acknowledged by the sender.
    pub last_acked: u16,
    /// One bit per id before `last_acked`, most recent first.
    pub bits: [u8; 16],
}

impl AckBitmap {
    /// Whether the id `offset` steps before `last_acked` is acknowledged.
    ///
    /// Offsets past the 128-bit window report `false`.
    #[must_use]
    pub fn is_acked(&self, offset: u8) -> bool {
        if usize::from(offset) >= self.bits.len() * 8 {
            return false;
        }
        let byte = usize::from(offset) / 8;
        let bit = offset % 8;
        self.bits[byte] & (1 << bit) != 0
    }
}

/// Read the connection id without consuming anything.
///
/// Returns `None` when the datagram cannot hold one.
#[must_use]
pub fn peek_connection_id(payload: &[u8]) -> Option<u16> {
    if payload.len() < 2 {
        return None;
    }
    Some(u16::from_be_bytes([payload[0], payload[1]]))
}

/// Decode the transport header and ack bitmap, returning both plus the
/// number of bytes consumed.
///
/// Returns `None` when the datagram is too short to hold both fixed blocks.
/// The <= 3 byte fast-path filter runs earlier in the session tracker, but a
/// datagram can pass that and still be shorter than the two headers, so the
/// bound is re-checked here and the caller treats `None` as a drop.
#[must_use]
pub fn decode_headers(payload: &[u8]) -> Option<(TransportHeader, AckBitmap, usize)> {
    if payload.len() < TRANSPORT_HEADER_LEN + ACK_BITMAP_LEN {
        log::trace!(
            "[header] datagram too short for transport headers ({} bytes)",
            payload.len()
        );
        return None;
    }

    let header = TransportHeader {
        connection_id: u16::from_be_bytes([payload[0], payload[1]]),
        packet_seq: u16::from_be_bytes([payload[2], payload[3]]),
    };

    let mut offset = TRANSPORT_HEADER_LEN;
    let last_acked = u16::from_be_bytes([payload[offset], payload[offset + 1]]);
    offset += 2;

    let mut bits = [0u8; 16];
    bits.copy_from_slice(&payload[offset..offset + 16]);
    offset += 16;

    Some((header, AckBitmap { last_acked, bits }, offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_datagram() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0x0004u16.to_be_bytes()); // connection id
        buf.extend_from_slice(&0x0102u16.to_be_bytes()); // packet seq
        buf.extend_from_slice(&0x0010u16.to_be_bytes()); // last acked
        buf.extend_from_slice(&[0b0000_0101u8; 16]); // bitmap
        buf.extend_from_slice(b"body");
        buf
    }

    #[test]
    fn decodes_both_fixed_blocks() {
        let datagram = sample_datagram();
        let (header, acks, consumed) = decode_headers(&datagram).expect("decode");

        assert_eq!(header.connection_id, 4);
        assert_eq!(header.packet_seq, 0x0102);
        assert_eq!(acks.last_acked, 0x0010);
        assert_eq!(consumed, TRANSPORT_HEADER_LEN + ACK_BITMAP_LEN);
        assert_eq!(&datagram[consumed..], b"body");
    }

    #[test]
    fn bitmap_offsets() {
        let datagram = sample_datagram();
        let (_, acks, _) = decode_headers(&datagram).expect("decode");

        assert!(acks.is_acked(0));
        assert!(!acks.is_acked(1));
        assert!(acks.is_acked(2));
        assert!(!acks.is_acked(200)); // past the window
    }

    #[test]
    fn short_datagram_is_rejected() {
        let datagram = sample_datagram();
        for len in 0..TRANSPORT_HEADER_LEN + ACK_BITMAP_LEN {
            assert!(decode_headers(&datagram[..len]).is_none(), "len {len}");
        }
    }

    #[test]
    fn peek_reads_big_endian_connection_id() {
        assert_eq!(peek_connection_id(&[0x01, 0x02, 0xFF]), Some(0x0102));
        assert_eq!(peek_connection_id(&[0x01]), None);
    }
}
