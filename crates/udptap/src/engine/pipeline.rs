// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The per-datagram reconstruction pipeline and its batch loop.
//!
//! Every stage applies drop-and-continue: malformed traffic leaves state
//! consistent and never escapes as an error.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::IDLE_POLL_INTERVAL;
use crate::packet::RawPacket;
use crate::protocol::constants::CHANNEL_PREAMBLE_LEN;
use crate::protocol::extractor::{decode_frame, MessageEvent, MessageExtractor};
use crate::protocol::header::decode_headers;
use crate::session::{Admission, SessionTracker, SharedSessionInfo};

use super::queue::WorkQueue;
use super::{MessageSink, RecordSink};

/// Owns the session tracker and drives one datagram at a time through
/// admission, header decoding, extraction, reassembly, and dispatch.
pub struct Pipeline {
    tracker: SessionTracker,
    sink: Box<dyn MessageSink>,
    recorder: Option<Box<dyn RecordSink>>,
}

impl Pipeline {
    /// Create a pipeline dispatching into `sink`.
    #[must_use]
    pub fn new(sink: Box<dyn MessageSink>) -> Self {
        Self {
            tracker: SessionTracker::new(),
            sink,
            recorder: None,
        }
    }

    /// Attach a recorder fed by the session tracker's admission rules.
    #[must_use]
    pub fn with_recorder(mut self, recorder: Box<dyn RecordSink>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Handle for concurrent readers of the active session snapshot.
    #[must_use]
    pub fn published_session(&self) -> SharedSessionInfo {
        self.tracker.published()
    }

    /// Drain-and-process loop for the processing thread.
    ///
    /// Sleeps [`IDLE_POLL_INTERVAL`] when a drain yields nothing. Once `stop`
    /// is observed, any batch already started runs to completion and one
    /// final drain clears packets enqueued before the ingestion side wound
    /// down.
    pub fn run(&mut self, queue: &WorkQueue, stop: &AtomicBool) {
        while !stop.load(Ordering::Relaxed) {
            let batch = queue.drain_all();
            if batch.is_empty() {
                std::thread::sleep(IDLE_POLL_INTERVAL);
                continue;
            }
            self.process_batch(batch);
        }

        let leftovers = queue.drain_all();
        if !leftovers.is_empty() {
            self.process_batch(leftovers);
        }
        log::debug!("[pipeline] batch loop exited");
    }

    /// Process one drained batch in capture order.
    pub fn process_batch(&mut self, batch: Vec<RawPacket>) {
        log::trace!("[pipeline] processing batch of {}", batch.len());
        for packet in batch {
            self.process_packet(&packet);
        }
    }

    /// Run one datagram through the whole pipeline.
    pub fn process_packet(&mut self, packet: &RawPacket) {
        match self.tracker.admit(packet) {
            Admission::Dropped => return,
            Admission::System => {
                self.record(packet);
                return;
            }
            Admission::Established => {
                self.record(packet);
                if let Some(session) = self.tracker.session() {
                    let server = *session.server();
                    self.sink.on_session(&server);
                }
                return;
            }
            Admission::Accepted => self.record(packet),
        }

        let Some((header, _acks, consumed)) = decode_headers(&packet.payload) else {
            // Passed the fast-path length filter but cannot hold both fixed
            // headers; treated as dropped.
            return;
        };
        log::trace!(
            "[pipeline] {} datagram conn={} seq={}",
            packet.direction,
            header.connection_id,
            header.packet_seq
        );

        let body = &packet.payload[consumed..];
        let mut extractor = MessageExtractor::new(body, CHANNEL_PREAMBLE_LEN);
        while let Some(frame) = extractor.next_frame() {
            let Some(session) = self.tracker.session_mut() else {
                return;
            };
            match decode_frame(&frame, session.acks_mut(packet.direction)) {
                MessageEvent::Fragment { header, payload } => {
                    if let Some(message) =
                        session.reassembler.accept(frame.channel, header, payload)
                    {
                        self.sink.on_message(packet.direction, frame.channel, &message);
                    }
                }
                MessageEvent::Deliver { payload } => {
                    self.sink.on_message(packet.direction, frame.channel, payload);
                }
                MessageEvent::Skip => {}
            }
        }
    }

    fn record(&mut self, packet: &RawPacket) {
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.on_packet(packet);
        }
    }
}
