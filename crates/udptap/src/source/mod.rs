// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Offline packet sources.
//!
//! Sources produce [`crate::RawPacket`]s for the ingestion thread. Live
//! capture stays outside this crate: any capture callback can build packets
//! and push them into the work queue directly. What ships here is the
//! offline pcap-file reader; tap-log replay lives in `udptap-recording`.

pub mod pcap;

pub use pcap::{PcapError, PcapFileSource};
