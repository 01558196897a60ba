// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Tap-log recording and paced replay for udptap.
//!
//! The tap log is a binary, append-only sequence of records, one per packet
//! the session tracker routes to the recorder hook:
//!
//! ```text
//! +---------------------------------------------------------+
//! | direction (1) | timestamp_ms (4, LE) | length (4, LE)   |
//! | payload (length bytes)                                  |
//! +---------------------------------------------------------+
//! ```
//!
//! [`TapRecorder`] plugs into the core pipeline as its
//! [`udptap::engine::RecordSink`]; [`Player`] replays a log paced by its
//! timestamp deltas, scaled by a configurable speed multiplier.

pub mod format;
pub mod player;
pub mod recorder;

pub use format::{FormatError, TapReader, TapWriter};
pub use player::{PlaybackSpeed, Player, PlayerError, ReplayConfig};
pub use recorder::TapRecorder;
