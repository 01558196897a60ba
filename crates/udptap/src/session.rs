// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Session detection and traffic filtering.
//!
//! A session begins when a connection-establishment system message is
//! observed; there is no teardown message, a new session simply replaces the
//! old one. The tracker owns all mutable per-session state (ack caches,
//! fragment assemblies) on the processing thread and publishes an immutable
//! [`SessionInfo`] snapshot through an atomic swap, so concurrent readers
//! never observe a partially-constructed session.

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::packet::{Direction, RawPacket};
use crate::protocol::constants::{SYSTEM_CONNECTION_ID, SYSTEM_TYPE_OFFSET, SYS_CONNECT};
use crate::protocol::header::peek_connection_id;
use crate::reassembly::FragmentReassembler;
use crate::reliability::AckCache;

/// Identity of the game server a session talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerIdentity {
    /// Match traffic whose source or destination equals this address.
    Endpoint(IpAddr),
    /// Accept all session-scoped traffic. Used for offline replay, where the
    /// capture carries no endpoint metadata.
    AcceptAll,
}

impl ServerIdentity {
    /// Whether `packet` belongs to this server's connection.
    #[must_use]
    pub fn matches(&self, packet: &RawPacket) -> bool {
        match self {
            Self::AcceptAll => true,
            Self::Endpoint(addr) => {
                packet.src == Some(*addr) || packet.dst == Some(*addr)
            }
        }
    }
}

impl fmt::Display for ServerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Endpoint(addr) => write!(f, "{addr}"),
            Self::AcceptAll => write!(f, "accept-all"),
        }
    }
}

/// Immutable session snapshot shared with concurrent readers.
#[derive(Debug)]
pub struct SessionInfo {
    /// Server identity the session filters on.
    pub server: ServerIdentity,
}

/// Shared handle through which readers observe the active session.
pub type SharedSessionInfo = Arc<ArcSwapOption<SessionInfo>>;

/// The tracked logical connection to one game peer.
///
/// Owns every piece of per-session mutable state; all of it is constructed
/// fresh on establishment and dropped on replacement, never reused.
#[derive(Debug)]
pub struct Session {
    info: Arc<SessionInfo>,
    inbound_acks: AckCache,
    outbound_acks: AckCache,
    /// Fragment assemblies are session-scoped: replacement drops in-flight
    /// groups so they cannot collide with the new connection's numbering.
    pub reassembler: FragmentReassembler,
}

impl Session {
    fn new(server: ServerIdentity) -> Self {
        Self {
            info: Arc::new(SessionInfo { server }),
            inbound_acks: AckCache::new(Direction::Inbound),
            outbound_acks: AckCache::new(Direction::Outbound),
            reassembler: FragmentReassembler::new(),
        }
    }

    /// Snapshot handle for this session.
    #[must_use]
    pub fn info(&self) -> &Arc<SessionInfo> {
        &self.info
    }

    /// Server identity the session filters on.
    #[must_use]
    pub fn server(&self) -> &ServerIdentity {
        &self.info.server
    }

    /// The ack cache for one direction.
    pub fn acks_mut(&mut self, direction: Direction) -> &mut AckCache {
        match direction {
            Direction::Inbound => &mut self.inbound_acks,
            Direction::Outbound => &mut self.outbound_acks,
        }
    }
}

/// Admission verdict for one datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Connection establishment: a fresh session now replaces the old one.
    /// Hand the packet to the recorder; processing stops here.
    Established,
    /// Some other system message. Hand to the recorder; processing stops.
    System,
    /// Session-scoped datagram matching the active session. Hand to the
    /// recorder, then continue into header decoding.
    Accepted,
    /// Too short, no session, or unrelated traffic. Silently dropped.
    Dropped,
}

/// Detects connection establishment and filters unrelated traffic.
#[derive(Debug, Default)]
pub struct SessionTracker {
    session: Option<Session>,
    published: SharedSessionInfo,
}

impl SessionTracker {
    /// Create a tracker with no active session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for concurrent readers of the active session snapshot.
    #[must_use]
    pub fn published(&self) -> SharedSessionInfo {
        Arc::clone(&self.published)
    }

    /// The active session, if any.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Mutable access to the active session's state.
    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    /// Classify one datagram and update session state.
    ///
    /// System messages never proceed past this point; session-scoped data is
    /// accepted only when an active session exists and its server identity
    /// matches the packet's endpoints (or the session is in accept-all mode).
    pub fn admit(&mut self, packet: &RawPacket) -> Admission {
        let payload = &packet.payload;
        if payload.len() <= 3 {
            return Admission::Dropped;
        }

        let Some(connection_id) = peek_connection_id(payload) else {
            return Admission::Dropped;
        };

        if connection_id == SYSTEM_CONNECTION_ID {
            if payload[SYSTEM_TYPE_OFFSET] == SYS_CONNECT {
                self.establish(packet);
                return Admission::Established;
            }
            return Admission::System;
        }

        match &self.session {
            Some(session) if session.server().matches(packet) => Admission::Accepted,
            _ => Admission::Dropped,
        }
    }

    fn establish(&mut self, packet: &RawPacket) {
        let server = match packet.dst {
            Some(addr) => ServerIdentity::Endpoint(addr),
            None => ServerIdentity::AcceptAll,
        };
        log::debug!("[session] connection establishment, server={server}");

        let session = Session::new(server);
        // Publish the fully-built snapshot before the session goes live so a
        // reader never sees the old identity paired with new state.
        self.published.store(Some(Arc::clone(session.info())));
        self.session = Some(session);
    }
}
