// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end pipeline tests over synthetic datagrams.

use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use udptap::engine::{MessageSink, Pipeline, RecordSink};
use udptap::protocol::constants::{ACK_BITMAP_LEN, CHANNEL_PREAMBLE_LEN, SYS_CONNECT};
use udptap::session::ServerIdentity;
use udptap::{Direction, RawPacket};

#[derive(Default)]
struct Collected {
    messages: Vec<(Direction, u8, Vec<u8>)>,
    sessions: Vec<ServerIdentity>,
}

#[derive(Clone, Default)]
struct CollectSink(Arc<Mutex<Collected>>);

impl CollectSink {
    fn messages(&self) -> Vec<(Direction, u8, Vec<u8>)> {
        self.0.lock().expect("collector lock").messages.clone()
    }

    fn sessions(&self) -> Vec<ServerIdentity> {
        self.0.lock().expect("collector lock").sessions.clone()
    }
}

impl MessageSink for CollectSink {
    fn on_message(&mut self, direction: Direction, channel: u8, payload: &[u8]) {
        self.0
            .lock()
            .expect("collector lock")
            .messages
            .push((direction, channel, payload.to_vec()));
    }

    fn on_session(&mut self, server: &ServerIdentity) {
        self.0.lock().expect("collector lock").sessions.push(*server);
    }
}

#[derive(Clone, Default)]
struct CountRecorder(Arc<AtomicUsize>);

impl CountRecorder {
    fn count(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

impl RecordSink for CountRecorder {
    fn on_packet(&mut self, _packet: &RawPacket) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

fn connect_packet() -> RawPacket {
    RawPacket::new(0, Direction::Inbound, vec![0, 0, SYS_CONNECT, 0])
}

fn message_datagram(
    direction: Direction,
    connection_id: u16,
    frames: &[(u8, Vec<u8>)],
) -> RawPacket {
    let mut payload = Vec::new();
    payload.extend_from_slice(&connection_id.to_be_bytes());
    payload.extend_from_slice(&1u16.to_be_bytes()); // packet seq
    payload.extend_from_slice(&[0u8; ACK_BITMAP_LEN]);
    payload.extend_from_slice(&vec![0u8; CHANNEL_PREAMBLE_LEN]);
    for (channel, message) in frames {
        payload.extend_from_slice(&(message.len() as u16).to_be_bytes());
        payload.push(*channel);
        payload.extend_from_slice(message);
    }
    RawPacket::new(0, direction, payload)
}

fn reliable_message(message_id: u16, payload: &[u8]) -> Vec<u8> {
    let mut message = message_id.to_be_bytes().to_vec();
    message.extend_from_slice(&[0, 0]); // ordering header
    message.extend_from_slice(payload);
    message
}

fn unreliable_message(payload: &[u8]) -> Vec<u8> {
    let mut message = vec![0u8; 4];
    message.extend_from_slice(payload);
    message
}

fn fragment(group: u8, index: u8, total: u8, payload: &[u8]) -> Vec<u8> {
    let mut message = vec![group, index, total];
    message.extend_from_slice(payload);
    message
}

#[test]
fn duplicate_reliable_message_dispatches_once() {
    let sink = CollectSink::default();
    let mut pipeline = Pipeline::new(Box::new(sink.clone()));

    pipeline.process_packet(&connect_packet());
    let datagram = message_datagram(
        Direction::Inbound,
        8,
        &[(5, reliable_message(42, b"state update"))],
    );
    pipeline.process_packet(&datagram);
    pipeline.process_packet(&datagram); // retransmission

    let messages = sink.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0], (Direction::Inbound, 5, b"state update".to_vec()));
}

#[test]
fn two_byte_datagram_produces_nothing() {
    let sink = CollectSink::default();
    let recorder = CountRecorder::default();
    let mut pipeline =
        Pipeline::new(Box::new(sink.clone())).with_recorder(Box::new(recorder.clone()));

    pipeline.process_packet(&RawPacket::new(0, Direction::Inbound, vec![0xAB, 0xCD]));

    assert!(sink.messages().is_empty());
    assert!(sink.sessions().is_empty());
    assert_eq!(recorder.count(), 0);
}

#[test]
fn fragments_across_datagrams_reassemble_out_of_order() {
    let sink = CollectSink::default();
    let mut pipeline = Pipeline::new(Box::new(sink.clone()));

    pipeline.process_packet(&connect_packet());
    for part in [fragment(5, 1, 3, b"B"), fragment(5, 0, 3, b"A")] {
        pipeline.process_packet(&message_datagram(Direction::Inbound, 8, &[(0, part)]));
        assert!(sink.messages().is_empty());
    }
    pipeline.process_packet(&message_datagram(
        Direction::Inbound,
        8,
        &[(0, fragment(5, 2, 3, b"C"))],
    ));

    let messages = sink.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0], (Direction::Inbound, 0, b"ABC".to_vec()));
}

#[test]
fn out_of_range_fragment_never_completes_a_group() {
    let sink = CollectSink::default();
    let mut pipeline = Pipeline::new(Box::new(sink.clone()));

    pipeline.process_packet(&connect_packet());
    pipeline.process_packet(&message_datagram(
        Direction::Inbound,
        8,
        &[
            (0, fragment(5, 0, 3, b"A")),
            (0, fragment(5, 1, 3, b"B")),
            (0, fragment(5, 5, 3, b"X")),
        ],
    ));

    assert!(sink.messages().is_empty());
}

#[test]
fn session_replacement_renews_reliable_ids_and_drops_fragments() {
    let sink = CollectSink::default();
    let mut pipeline = Pipeline::new(Box::new(sink.clone()));

    pipeline.process_packet(&connect_packet());
    pipeline.process_packet(&message_datagram(
        Direction::Outbound,
        8,
        &[
            (5, reliable_message(42, b"first session")),
            (0, fragment(9, 0, 2, b"half-")),
        ],
    ));

    // Second establishment fully replaces the session.
    pipeline.process_packet(&connect_packet());
    pipeline.process_packet(&message_datagram(
        Direction::Outbound,
        8,
        &[(5, reliable_message(42, b"second session"))],
    ));
    // The old group's tail cannot complete against the new session.
    pipeline.process_packet(&message_datagram(
        Direction::Outbound,
        8,
        &[(0, fragment(9, 1, 2, b"done"))],
    ));

    let messages = sink.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].2, b"first session".to_vec());
    assert_eq!(messages[1].2, b"second session".to_vec());
    assert_eq!(sink.sessions().len(), 2);
}

#[test]
fn recorder_receives_system_and_accepted_traffic_only() {
    let sink = CollectSink::default();
    let recorder = CountRecorder::default();
    let mut pipeline =
        Pipeline::new(Box::new(sink.clone())).with_recorder(Box::new(recorder.clone()));

    let server: IpAddr = "10.0.0.9".parse().expect("addr");
    let client: IpAddr = "192.168.1.20".parse().expect("addr");

    let mut connect = connect_packet();
    connect.src = Some(client);
    connect.dst = Some(server);
    pipeline.process_packet(&connect);
    assert_eq!(recorder.count(), 1);

    // Unrelated system message: recorded, never decoded further.
    pipeline.process_packet(&RawPacket::new(0, Direction::Inbound, vec![0, 0, 0x42, 0]));
    assert_eq!(recorder.count(), 2);

    // Matching data traffic: recorded.
    let matching = message_datagram(
        Direction::Inbound,
        8,
        &[(6, unreliable_message(b"tick"))],
    )
    .with_endpoints(server, client);
    pipeline.process_packet(&matching);
    assert_eq!(recorder.count(), 3);

    // Traffic between two other machines: silently dropped.
    let unrelated = message_datagram(
        Direction::Inbound,
        8,
        &[(6, unreliable_message(b"noise"))],
    )
    .with_endpoints(client, client);
    pipeline.process_packet(&unrelated);
    assert_eq!(recorder.count(), 3);

    let messages = sink.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].2, b"tick".to_vec());
}

#[test]
fn data_before_any_session_is_dropped() {
    let sink = CollectSink::default();
    let mut pipeline = Pipeline::new(Box::new(sink.clone()));

    pipeline.process_packet(&message_datagram(
        Direction::Inbound,
        8,
        &[(6, unreliable_message(b"early"))],
    ));

    assert!(sink.messages().is_empty());
}

#[test]
fn unreliable_duplicates_are_not_deduped() {
    let sink = CollectSink::default();
    let mut pipeline = Pipeline::new(Box::new(sink.clone()));

    pipeline.process_packet(&connect_packet());
    let datagram =
        message_datagram(Direction::Inbound, 8, &[(6, unreliable_message(b"pos"))]);
    pipeline.process_packet(&datagram);
    pipeline.process_packet(&datagram);

    assert_eq!(sink.messages().len(), 2);
}

#[test]
fn accepted_datagram_too_short_for_headers_is_dropped_after_recording() {
    let sink = CollectSink::default();
    let recorder = CountRecorder::default();
    let mut pipeline =
        Pipeline::new(Box::new(sink.clone())).with_recorder(Box::new(recorder.clone()));

    pipeline.process_packet(&connect_packet());
    // Nonzero connection id, but only 10 bytes: passes admission, fails the
    // defensive header bound.
    let mut payload = 8u16.to_be_bytes().to_vec();
    payload.extend_from_slice(&[0u8; 8]);
    pipeline.process_packet(&RawPacket::new(0, Direction::Inbound, payload));

    assert_eq!(recorder.count(), 2);
    assert!(sink.messages().is_empty());
}

#[test]
fn dispatch_preserves_extraction_order_across_channels() {
    let sink = CollectSink::default();
    let mut pipeline = Pipeline::new(Box::new(sink.clone()));

    pipeline.process_packet(&connect_packet());
    pipeline.process_packet(&message_datagram(
        Direction::Outbound,
        8,
        &[
            (7, reliable_message(1, b"one")),
            (6, unreliable_message(b"two")),
            (7, reliable_message(2, b"three")),
        ],
    ));

    let payloads: Vec<Vec<u8>> = sink.messages().into_iter().map(|(_, _, p)| p).collect();
    assert_eq!(payloads, vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]);
}

#[test]
fn published_snapshot_tracks_the_active_session() {
    let sink = CollectSink::default();
    let mut pipeline = Pipeline::new(Box::new(sink.clone()));
    let published = pipeline.published_session();
    assert!(published.load().is_none());

    let server: IpAddr = "10.0.0.9".parse().expect("addr");
    let mut connect = connect_packet();
    connect.dst = Some(server);
    pipeline.process_packet(&connect);

    let info = published.load_full().expect("snapshot");
    assert_eq!(info.server, ServerIdentity::Endpoint(server));
}
