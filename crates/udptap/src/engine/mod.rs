// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ingestion, batching, and the processing pipeline.
//!
//! One ingestion thread pushes raw packets into the [`WorkQueue`]; one
//! processing thread drains it in batches and runs the whole reconstruction
//! pipeline synchronously, which keeps all per-session state single-writer
//! with no locking on the hot path.

pub mod ingest;
pub mod pipeline;
pub mod queue;

pub use ingest::spawn_ingest;
pub use pipeline::Pipeline;
pub use queue::WorkQueue;

use crate::packet::{Direction, RawPacket};
use crate::session::ServerIdentity;

/// Boundary to the downstream game-state decoder.
///
/// Called once per completed message (single-part or reassembled), in
/// extraction order within a datagram, datagrams in drain order.
pub trait MessageSink: Send {
    /// A complete application message on `channel`.
    fn on_message(&mut self, direction: Direction, channel: u8, payload: &[u8]);

    /// A new session replaced the previous one. The decoder should reset any
    /// session-scoped state it owns.
    fn on_session(&mut self, server: &ServerIdentity);
}

/// Recorder hook fed by the session tracker's admission rules.
///
/// Receives system messages and accepted session traffic; rejected and
/// undersized datagrams never reach it.
pub trait RecordSink: Send {
    /// One packet to append to the tap log.
    fn on_packet(&mut self, packet: &RawPacket);
}
