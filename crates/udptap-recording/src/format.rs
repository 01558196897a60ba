// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Tap-log record codec.
//!
//! Records are self-delimiting and the file carries no header, so a writer
//! can only ever append and a reader can consume a log that is still being
//! written. A truncated trailing record (the writer died mid-append) ends
//! the stream instead of failing it.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

use udptap::{Direction, RawPacket};

/// Upper bound on a record's payload length. UDP cannot carry more, so
/// anything larger means the log is corrupt.
pub const MAX_PAYLOAD_LEN: u32 = 65_535;

/// Tap-log format errors.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid direction flag {0:#04x}")]
    BadDirection(u8),

    #[error("payload length {0} exceeds the UDP maximum")]
    OversizedRecord(u32),
}

/// Appends tap-log records.
pub struct TapWriter {
    out: BufWriter<File>,
    records: u64,
    bytes: u64,
}

impl TapWriter {
    /// Create (or truncate) a tap log at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, FormatError> {
        let file = File::create(path.as_ref())?;
        Ok(Self::from_file(file))
    }

    /// Open a tap log for appending, creating it when absent.
    pub fn append<P: AsRef<Path>>(path: P) -> Result<Self, FormatError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self::from_file(file))
    }

    fn from_file(file: File) -> Self {
        Self {
            out: BufWriter::new(file),
            records: 0,
            bytes: 0,
        }
    }

    /// Append one record.
    pub fn write_record(&mut self, packet: &RawPacket) -> Result<(), FormatError> {
        let length = packet.payload.len() as u32;
        if length > MAX_PAYLOAD_LEN {
            return Err(FormatError::OversizedRecord(length));
        }

        self.out.write_u8(packet.direction.as_wire())?;
        self.out.write_u32::<LittleEndian>(packet.timestamp_ms)?;
        self.out.write_u32::<LittleEndian>(length)?;
        self.out.write_all(&packet.payload)?;

        self.records += 1;
        self.bytes += 9 + u64::from(length);
        Ok(())
    }

    /// Flush buffered records to disk.
    pub fn flush(&mut self) -> Result<(), FormatError> {
        self.out.flush()?;
        Ok(())
    }

    /// Number of records written so far.
    #[must_use]
    pub fn record_count(&self) -> u64 {
        self.records
    }

    /// Number of bytes written so far.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

/// Reads tap-log records in file order.
pub struct TapReader {
    input: BufReader<File>,
    offset: u64,
}

impl TapReader {
    /// Open a tap log.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FormatError> {
        let file = File::open(path.as_ref())?;
        Ok(Self {
            input: BufReader::new(file),
            offset: 0,
        })
    }

    /// Read the next record.
    ///
    /// Returns `Ok(None)` at end of file, or when the trailing record is
    /// truncated (logged, tolerated). Replayed records carry no endpoint
    /// metadata, which puts the session tracker in accept-all mode.
    pub fn read_record(&mut self) -> Result<Option<RawPacket>, FormatError> {
        let flag = match self.input.read_u8() {
            Ok(flag) => flag,
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let direction =
            Direction::from_wire(flag).ok_or(FormatError::BadDirection(flag))?;

        match self.read_record_body(direction) {
            Ok(packet) => {
                self.offset += 9 + packet.payload.len() as u64;
                Ok(Some(packet))
            }
            Err(FormatError::Io(err)) if err.kind() == io::ErrorKind::UnexpectedEof => {
                tracing::warn!(
                    offset = self.offset,
                    "tap log ends with a truncated record"
                );
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn read_record_body(&mut self, direction: Direction) -> Result<RawPacket, FormatError> {
        let timestamp_ms = self.input.read_u32::<LittleEndian>()?;
        let length = self.input.read_u32::<LittleEndian>()?;
        if length > MAX_PAYLOAD_LEN {
            return Err(FormatError::OversizedRecord(length));
        }

        let mut payload = vec![0u8; length as usize];
        self.input.read_exact(&mut payload)?;
        Ok(RawPacket::new(timestamp_ms, direction, payload))
    }
}
