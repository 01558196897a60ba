// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Paced tap-log replay.
//!
//! Each record's scheduled emit time is `(timestamp - first_timestamp) /
//! speed`, measured against a start mark taken when the first record is
//! read. The player sleeps until the deadline rather than spinning; pacing
//! is wall-clock-relative with no bounded-jitter guarantee.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;

use udptap::RawPacket;

use crate::format::{FormatError, TapReader};

/// Playback speed control.
#[derive(Debug, Clone, Copy, Default)]
pub enum PlaybackSpeed {
    /// Real-time playback (1.0x).
    #[default]
    Realtime,
    /// Fixed speed multiplier (e.g., 2.0 = 2x faster).
    Speed(f64),
    /// As fast as possible (no timing).
    Unlimited,
}

impl PlaybackSpeed {
    /// Scheduled offset from the start mark for a record `offset_ms` after
    /// the first one. `None` means emit immediately.
    #[must_use]
    pub fn schedule_for(&self, offset_ms: u64) -> Option<Duration> {
        match self {
            Self::Unlimited => None,
            Self::Realtime => Some(Duration::from_millis(offset_ms)),
            Self::Speed(speed) => {
                if *speed <= 0.0 {
                    None
                } else {
                    Some(Duration::from_millis((offset_ms as f64 / speed) as u64))
                }
            }
        }
    }
}

/// Replay configuration.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Tap-log path.
    pub path: PathBuf,
    /// Playback speed.
    pub speed: PlaybackSpeed,
}

impl ReplayConfig {
    /// Replay `path` in real time.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            speed: PlaybackSpeed::Realtime,
        }
    }

    /// Set the playback speed.
    #[must_use]
    pub fn speed(mut self, speed: PlaybackSpeed) -> Self {
        self.speed = speed;
        self
    }

    /// Set the speed as a multiplier. Values at or below zero disable
    /// pacing; values close to 1.0 collapse to realtime.
    #[must_use]
    pub fn speed_multiplier(mut self, multiplier: f64) -> Self {
        self.speed = if multiplier <= 0.0 {
            PlaybackSpeed::Unlimited
        } else if (multiplier - 1.0).abs() < 0.001 {
            PlaybackSpeed::Realtime
        } else {
            PlaybackSpeed::Speed(multiplier)
        };
        self
    }
}

/// Replay errors.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("tap log not found: {0}")]
    FileNotFound(PathBuf),

    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Paced tap-log player.
pub struct Player {
    config: ReplayConfig,
    reader: TapReader,
    first_timestamp: Option<u32>,
    start_mark: Option<Instant>,
    played: u64,
}

impl Player {
    /// Open the tap log named by `config`.
    pub fn open(config: ReplayConfig) -> Result<Self, PlayerError> {
        if !config.path.exists() {
            return Err(PlayerError::FileNotFound(config.path.clone()));
        }
        let reader = TapReader::open(&config.path)?;
        tracing::info!(path = %config.path.display(), "replaying tap log");

        Ok(Self {
            config,
            reader,
            first_timestamp: None,
            start_mark: None,
            played: 0,
        })
    }

    /// Read the next record, sleeping until its scheduled emit time.
    ///
    /// Returns `Ok(None)` when the log is exhausted.
    pub fn next_packet(&mut self) -> Result<Option<RawPacket>, PlayerError> {
        let Some(packet) = self.reader.read_record()? else {
            tracing::debug!(records = self.played, "replay complete");
            return Ok(None);
        };

        let first = *self.first_timestamp.get_or_insert(packet.timestamp_ms);
        let start = *self.start_mark.get_or_insert_with(Instant::now);

        // Out-of-order timestamps schedule immediately instead of rewinding.
        let offset_ms = u64::from(packet.timestamp_ms.saturating_sub(first));
        if let Some(offset) = self.config.speed.schedule_for(offset_ms) {
            let deadline = start + offset;
            let now = Instant::now();
            if deadline > now {
                std::thread::sleep(deadline - now);
            }
        }

        self.played += 1;
        Ok(Some(packet))
    }

    /// Number of records emitted so far.
    #[must_use]
    pub fn records_played(&self) -> u64 {
        self.played
    }

    /// Consume the player as a packet iterator.
    ///
    /// A read error ends the iteration with a log line; the pipeline treats
    /// a corrupt log the same as one that simply ended.
    pub fn packets(mut self) -> impl Iterator<Item = RawPacket> + Send {
        std::iter::from_fn(move || match self.next_packet() {
            Ok(packet) => packet,
            Err(err) => {
                tracing::warn!(error = %err, "replay aborted");
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::TapWriter;
    use tempfile::tempdir;
    use udptap::Direction;

    fn write_log(path: &Path, timestamps: &[u32]) {
        let mut writer = TapWriter::create(path).expect("create");
        for (i, ts) in timestamps.iter().enumerate() {
            writer
                .write_record(&RawPacket::new(*ts, Direction::Inbound, vec![i as u8]))
                .expect("write");
        }
        writer.flush().expect("flush");
    }

    #[test]
    fn unlimited_replay_preserves_records_and_order() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("session.tap");
        write_log(&path, &[0, 100, 200, 300]);

        let player = Player::open(ReplayConfig::new(&path).speed(PlaybackSpeed::Unlimited))
            .expect("open");
        let tags: Vec<u8> = player.packets().map(|p| p.payload[0]).collect();
        assert_eq!(tags, vec![0, 1, 2, 3]);
    }

    #[test]
    fn speed_multiplier_scales_the_schedule() {
        let double = ReplayConfig::new("/tmp/x.tap").speed_multiplier(2.0);
        assert!(matches!(double.speed, PlaybackSpeed::Speed(s) if (s - 2.0).abs() < 0.001));
        assert_eq!(double.speed.schedule_for(500), Some(Duration::from_millis(250)));

        let realtime = ReplayConfig::new("/tmp/x.tap").speed_multiplier(1.0);
        assert!(matches!(realtime.speed, PlaybackSpeed::Realtime));
        assert_eq!(realtime.speed.schedule_for(500), Some(Duration::from_millis(500)));

        let unpaced = ReplayConfig::new("/tmp/x.tap").speed_multiplier(0.0);
        assert!(matches!(unpaced.speed, PlaybackSpeed::Unlimited));
        assert_eq!(unpaced.speed.schedule_for(500), None);
    }

    #[test]
    fn second_record_waits_for_its_scaled_deadline() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("session.tap");
        write_log(&path, &[0, 500]);

        let mut player = Player::open(
            ReplayConfig::new(&path).speed(PlaybackSpeed::Speed(2.0)),
        )
        .expect("open");

        // The player's start mark is taken at or after this point, so the
        // second emission can never land before `before + 250ms`.
        let before = Instant::now();
        let first = player.next_packet().expect("read").expect("first");
        let second = player.next_packet().expect("read").expect("second");
        let elapsed = before.elapsed();

        assert_eq!(first.timestamp_ms, 0);
        assert_eq!(second.timestamp_ms, 500);
        // 500ms of recorded time at 2x replays in no less than 250ms.
        assert!(elapsed >= Duration::from_millis(250), "elapsed {elapsed:?}");
    }

    #[test]
    fn missing_file_is_reported() {
        let result = Player::open(ReplayConfig::new("/nonexistent/never.tap"));
        assert!(matches!(result, Err(PlayerError::FileNotFound(_))));
    }
}
