// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Recorder sink for the core pipeline.

use std::path::Path;

use udptap::engine::RecordSink;
use udptap::RawPacket;

use crate::format::{FormatError, TapWriter};

/// Writes every packet the pipeline's recorder hook receives to a tap log.
///
/// Write failures are counted and logged, never propagated: a full disk must
/// not take the reconstruction pipeline down with it.
pub struct TapRecorder {
    writer: TapWriter,
    write_errors: u64,
}

impl TapRecorder {
    /// Record to a fresh tap log at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, FormatError> {
        Ok(Self {
            writer: TapWriter::create(path)?,
            write_errors: 0,
        })
    }

    /// Append to an existing tap log at `path`.
    pub fn append<P: AsRef<Path>>(path: P) -> Result<Self, FormatError> {
        Ok(Self {
            writer: TapWriter::append(path)?,
            write_errors: 0,
        })
    }

    /// Flush buffered records and report totals.
    pub fn finish(mut self) -> Result<(u64, u64), FormatError> {
        self.writer.flush()?;
        Ok((self.writer.record_count(), self.writer.bytes_written()))
    }

    /// Number of records that failed to write.
    #[must_use]
    pub fn write_errors(&self) -> u64 {
        self.write_errors
    }
}

impl RecordSink for TapRecorder {
    fn on_packet(&mut self, packet: &RawPacket) {
        if let Err(err) = self.writer.write_record(packet) {
            self.write_errors += 1;
            tracing::warn!(error = %err, "tap log write failed, record dropped");
        }
    }
}
