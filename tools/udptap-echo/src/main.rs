// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! udptap-echo - Echo the decoded message stream of a capture or tap log.
//!
//! Usage:
//!   udptap-echo --pcap match.pcap --game-endpoint 192.168.1.20
//!   udptap-echo --replay session.tap --speed 2.0
//!   udptap-echo --pcap match.pcap --game-endpoint 192.168.1.20 --record session.tap

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgGroup, Parser};
use tracing::{error, info};

use udptap::engine::{spawn_ingest, MessageSink, Pipeline, WorkQueue};
use udptap::session::ServerIdentity;
use udptap::source::PcapFileSource;
use udptap::{Direction, RawPacket, SourceMode, TapConfig};
use udptap_recording::{Player, ReplayConfig, TapRecorder};

#[derive(Parser, Debug)]
#[command(name = "udptap-echo")]
#[command(about = "Echo the decoded message stream of a capture or tap log")]
#[command(version)]
#[command(group(ArgGroup::new("source").required(true).args(["replay", "pcap"])))]
struct Args {
    /// Replay a recorded tap log
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Read a pcap capture file
    #[arg(long)]
    pcap: Option<PathBuf>,

    /// Replay speed multiplier (1.0 = realtime, 0 = unpaced)
    #[arg(short, long, default_value = "1.0")]
    speed: f64,

    /// Record accepted traffic to a tap log
    #[arg(long)]
    record: Option<PathBuf>,

    /// Game machine address, for direction classification and session matching
    #[arg(long)]
    game_endpoint: Option<IpAddr>,

    /// Bytes of each message to show as a hex preview
    #[arg(long, default_value = "16")]
    preview: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn to_config(&self) -> anyhow::Result<TapConfig> {
        let mut config = if let Some(path) = &self.replay {
            TapConfig::replay(path, self.speed)
        } else if let Some(path) = &self.pcap {
            TapConfig::pcap_file(path)
        } else {
            anyhow::bail!("either --replay or --pcap is required");
        };
        if let Some(addr) = self.game_endpoint {
            config = config.game_endpoint(addr);
        }
        if let Some(path) = &self.record {
            config = config.record_to(path);
        }
        Ok(config)
    }
}

/// Sink that logs every decoded message and session change.
struct EchoSink {
    messages: Arc<AtomicU64>,
    sessions: Arc<AtomicU64>,
    preview: usize,
}

impl MessageSink for EchoSink {
    fn on_message(&mut self, direction: Direction, channel: u8, payload: &[u8]) {
        self.messages.fetch_add(1, Ordering::Relaxed);
        info!(
            "{direction:>8} ch={channel:<3} {:>5}B  {}",
            payload.len(),
            hex_preview(payload, self.preview)
        );
    }

    fn on_session(&mut self, server: &ServerIdentity) {
        self.sessions.fetch_add(1, Ordering::Relaxed);
        info!("new session, server={server}");
    }
}

fn hex_preview(payload: &[u8], limit: usize) -> String {
    let mut preview: String = payload
        .iter()
        .take(limit)
        .map(|b| format!("{b:02x} "))
        .collect();
    if payload.len() > limit {
        preview.push_str("..");
    }
    preview
}

/// Open the configured source. Failure to open a capture or tap log is
/// fatal: report it and terminate with a distinct status.
fn open_source(config: &TapConfig) -> Box<dyn Iterator<Item = RawPacket> + Send> {
    match &config.source {
        SourceMode::Replay { path, speed } => {
            match Player::open(ReplayConfig::new(path).speed_multiplier(*speed)) {
                Ok(player) => Box::new(player.packets()),
                Err(err) => {
                    error!("cannot open tap log {}: {err}", path.display());
                    std::process::exit(2);
                }
            }
        }
        SourceMode::PcapFile { path } => {
            match PcapFileSource::open(path, config.game_endpoint) {
                Ok(source) => Box::new(source),
                Err(err) => {
                    error!("cannot open capture {}: {err}", path.display());
                    std::process::exit(2);
                }
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = args.log_level.parse().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    let config = args.to_config()?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || {
            info!("interrupted, shutting down");
            stop.store(true, Ordering::Relaxed);
        })?;
    }

    let source = open_source(&config);

    let messages = Arc::new(AtomicU64::new(0));
    let sessions = Arc::new(AtomicU64::new(0));
    let sink = EchoSink {
        messages: Arc::clone(&messages),
        sessions: Arc::clone(&sessions),
        preview: args.preview,
    };

    let mut pipeline = Pipeline::new(Box::new(sink));
    if let Some(path) = &config.record_path {
        match TapRecorder::create(path) {
            Ok(recorder) => pipeline = pipeline.with_recorder(Box::new(recorder)),
            Err(err) => {
                error!("cannot open record file {}: {err}", path.display());
                std::process::exit(2);
            }
        }
    }

    let queue = Arc::new(WorkQueue::new());

    let ingest = spawn_ingest(Arc::clone(&queue), source, Arc::clone(&stop))?;
    let processing = {
        let queue = Arc::clone(&queue);
        let stop = Arc::clone(&stop);
        std::thread::Builder::new()
            .name("udptap-process".into())
            .spawn(move || pipeline.run(&queue, &stop))?
    };

    // Source exhausted (or interrupted): let the pipeline catch up, then stop.
    if ingest.join().is_err() {
        error!("ingestion thread panicked");
    }
    while !queue.is_empty() && !stop.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(20));
    }
    stop.store(true, Ordering::Relaxed);
    if processing.join().is_err() {
        error!("processing thread panicked");
    }

    info!(
        "done: {} messages across {} sessions",
        messages.load(Ordering::Relaxed),
        sessions.load(Ordering::Relaxed)
    );
    Ok(())
}
