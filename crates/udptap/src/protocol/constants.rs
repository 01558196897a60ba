// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire-format constants for the targeted transport version.
//!
//! Centralizes every header size and magic value so the parsing stages never
//! hardcode offsets. All multi-byte transport fields are big-endian on the
//! wire; decoding normalizes to host order.

// ============================================================================
// Datagram envelope
// ============================================================================

/// Smallest datagram the pipeline looks at. Anything shorter (<= 3 bytes) is
/// dropped before the connection id is decoded.
pub const MIN_DATAGRAM_LEN: usize = 4;

/// Connection id reserved for system/control messages.
pub const SYSTEM_CONNECTION_ID: u16 = 0;

/// Byte offset of the message-type byte inside a system datagram.
pub const SYSTEM_TYPE_OFFSET: usize = 2;

/// System message type announcing connection establishment.
pub const SYS_CONNECT: u8 = 1;

/// Transport header: `connection_id: u16` + `packet_seq: u16`.
pub const TRANSPORT_HEADER_LEN: usize = 4;

/// Acknowledgment block: `last_acked: u16` + 128-bit ack bitmap.
pub const ACK_BITMAP_LEN: usize = 18;

// ============================================================================
// Message stream body
// ============================================================================

/// Number of channels carried by the targeted transport version.
pub const CHANNEL_COUNT: usize = 102;

/// Per-channel RTT/sequencing table preceding the first framed message.
/// Carries no message content; the extractor skips it wholesale.
pub const CHANNEL_PREAMBLE_LEN: usize = 3 + 2 * CHANNEL_COUNT;

/// Message frame header: `length: u16` + `channel: u8`.
pub const FRAME_HEADER_LEN: usize = 3;

/// Highest channel id that carries fragmented-reliable traffic (ids 0..=2).
pub const FRAGMENTED_CHANNEL_MAX: u8 = 2;

/// Fragment header on fragmented channels: `group: u8`, `index: u8`, `total: u8`.
pub const FRAGMENT_HEADER_LEN: usize = 3;

/// Reliability header on reliable-ordered channels: `message_id: u16`.
pub const RELIABLE_HEADER_LEN: usize = 2;

/// Ordering header following the reliability header.
pub const ORDERED_HEADER_LEN: usize = 2;

/// Total header span of a non-fragmented message. Unreliable channels carry
/// no reliability header, but their ordering block occupies the same byte
/// span, so the skip is identical for both classes.
pub const ORDERED_MESSAGE_HEADER_LEN: usize = RELIABLE_HEADER_LEN + ORDERED_HEADER_LEN;
