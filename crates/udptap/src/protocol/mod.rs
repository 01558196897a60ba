// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport wire format.
//!
//! This module contains the protocol-facing pieces of the tap:
//! - Constants: header sizes, channel table geometry, system message types
//! - Header decoding: transport header + acknowledgment bitmap
//! - Channel classification: reliability tier per channel id
//! - Message extraction: framing one datagram body into channel-tagged messages

pub mod channel;
pub mod constants;
pub mod extractor;
pub mod header;

pub use channel::ChannelClass;
pub use constants::*;
pub use extractor::{decode_frame, Frame, FragmentHeader, MessageEvent, MessageExtractor};
pub use header::{decode_headers, peek_connection_id, AckBitmap, TransportHeader};
