// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime configuration for a tap run.
//!
//! Wire-format constants live in [`crate::protocol::constants`]; this module
//! only carries the knobs an operator chooses per run: where the datagrams
//! come from, which address is the game machine, and whether accepted traffic
//! is recorded to a tap log.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Idle sleep of the processing thread when a drain yields no packets.
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Where raw datagrams come from.
#[derive(Debug, Clone)]
pub enum SourceMode {
    /// Replay a previously recorded tap log, paced by its timestamps.
    Replay {
        /// Tap-log file path.
        path: PathBuf,
        /// Speed multiplier (1.0 = realtime, <= 0.0 = unpaced).
        speed: f64,
    },
    /// Read a classic pcap capture file (offline).
    PcapFile {
        /// Capture file path.
        path: PathBuf,
    },
}

/// Per-run configuration consumed by the wiring layer.
///
/// Live capture stays outside this crate: any callback thread may construct
/// [`crate::RawPacket`]s and push them into the work queue directly, in which
/// case only `game_endpoint` and `record_path` apply.
#[derive(Debug, Clone)]
pub struct TapConfig {
    /// Datagram source.
    pub source: SourceMode,

    /// Address of the game machine, used for direction classification and
    /// session matching. `None` puts sessions in accept-all mode.
    pub game_endpoint: Option<IpAddr>,

    /// When set, packets routed to the recorder hook are appended here.
    pub record_path: Option<PathBuf>,
}

impl TapConfig {
    /// Configuration for replaying a tap log.
    pub fn replay<P: AsRef<Path>>(path: P, speed: f64) -> Self {
        Self {
            source: SourceMode::Replay {
                path: path.as_ref().to_path_buf(),
                speed,
            },
            game_endpoint: None,
            record_path: None,
        }
    }

    /// Configuration for reading a pcap capture file.
    pub fn pcap_file<P: AsRef<Path>>(path: P) -> Self {
        Self {
            source: SourceMode::PcapFile {
                path: path.as_ref().to_path_buf(),
            },
            game_endpoint: None,
            record_path: None,
        }
    }

    /// Set the game endpoint address.
    #[must_use]
    pub fn game_endpoint(mut self, addr: IpAddr) -> Self {
        self.game_endpoint = Some(addr);
        self
    }

    /// Record accepted traffic to a tap log at `path`.
    #[must_use]
    pub fn record_to<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.record_path = Some(path.as_ref().to_path_buf());
        self
    }
}
