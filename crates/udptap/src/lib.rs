// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # UDPTAP - Reliable-UDP game protocol reconstruction
//!
//! A passive tap that rebuilds the application-level message stream of a
//! multiplayer game's custom reliable-UDP transport from raw datagrams. The
//! datagrams come from an offline capture file or a recorded tap log; decoded
//! messages are handed to a pluggable downstream sink (typically a game-state
//! decoder).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::atomic::AtomicBool;
//! use udptap::engine::{Pipeline, WorkQueue};
//! use udptap::session::ServerIdentity;
//! use udptap::{Direction, RawPacket};
//!
//! struct PrintSink;
//!
//! impl udptap::engine::MessageSink for PrintSink {
//!     fn on_message(&mut self, direction: Direction, channel: u8, payload: &[u8]) {
//!         println!("{direction} ch={channel} {} bytes", payload.len());
//!     }
//!     fn on_session(&mut self, server: &ServerIdentity) {
//!         println!("new session: {server}");
//!     }
//! }
//!
//! let queue = WorkQueue::new();
//! let mut pipeline = Pipeline::new(Box::new(PrintSink));
//!
//! // Any capture callback may push; the processing thread drains.
//! queue.push(RawPacket::new(0, Direction::Inbound, vec![0u8; 64]));
//! let stop = AtomicBool::new(true);
//! pipeline.run(&queue, &stop);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------------+
//! |                  Capture / Replay source (ingestion thread)        |
//! |        pcap file reader | tap-log player | external callback       |
//! +--------------------------------------------------------------------+
//!                          | RawPacket via WorkQueue::push
//!                          v
//! +--------------------------------------------------------------------+
//! |                Processing thread (Pipeline::run)                   |
//! |  SessionTracker --> Header Decoder --> Message Extractor           |
//! |       |                                   |          |             |
//! |   RecordSink                          AckCache   FragmentReassembler
//! +--------------------------------------------------------------------+
//!                          | complete messages
//!                          v
//! +--------------------------------------------------------------------+
//! |            MessageSink (external game-state decoder)               |
//! +--------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RawPacket`] | One captured datagram plus capture metadata |
//! | [`engine::WorkQueue`] | Batched handoff from ingestion to processing |
//! | [`session::SessionTracker`] | Connection detection and traffic filtering |
//! | [`protocol::MessageExtractor`] | Channel demultiplexing of one datagram |
//! | [`reassembly::FragmentReassembler`] | Multi-part message reconstruction |
//! | [`engine::MessageSink`] | Boundary to the downstream decoder |
//!
//! All malformed or unexpected traffic is dropped, never raised: short
//! datagrams, session mismatches, out-of-range fragments, and duplicate
//! reliable message ids leave the pipeline live and the caches consistent.

/// Runtime configuration (source selection, endpoints, recording).
pub mod config;
/// Ingestion, work queue, pipeline, and sink boundaries.
pub mod engine;
/// Captured datagram data model.
pub mod packet;
/// Wire constants, header decoding, and message extraction.
pub mod protocol;
/// Multi-part message reassembly.
pub mod reassembly;
/// Per-direction acknowledgment (dedup) tracking.
pub mod reliability;
/// Session detection, filtering, and snapshot publication.
pub mod session;
/// Offline packet sources.
pub mod source;

pub use config::{SourceMode, TapConfig};
pub use packet::{Direction, RawPacket};
