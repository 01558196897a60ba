// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Classic pcap capture file reader.
//!
//! Reads a capture file without linking libpcap: global header, per-record
//! headers, Ethernet or null/loopback framing, IPv4/IPv6, UDP payloads.
//! Non-UDP records are skipped; timestamps are rebased to milliseconds
//! relative to the first record; direction is classified by matching the
//! source address against the configured game endpoint.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::Path;

use crate::packet::{Direction, RawPacket};

/// Pcap magic, file byte order matching the host reader.
const PCAP_MAGIC: u32 = 0xa1b2_c3d4;
/// Pcap magic written on an opposite-endian machine.
const PCAP_MAGIC_SWAPPED: u32 = 0xd4c3_b2a1;

const GLOBAL_HEADER_LEN: usize = 24;
const RECORD_HEADER_LEN: usize = 16;

/// Link type: Ethernet frames.
const LINKTYPE_ETHERNET: u32 = 1;
/// Link type: BSD null/loopback frames (4-byte address family).
const LINKTYPE_NULL: u32 = 0;

const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_IPV6: u16 = 0x86DD;
const IP_PROTOCOL_UDP: u8 = 17;

/// Errors opening a capture file.
#[derive(Debug)]
pub enum PcapError {
    /// Underlying I/O failure.
    Io(io::Error),
    /// The file does not start with a pcap magic number.
    BadMagic(u32),
    /// The capture uses a link type this reader does not decode.
    UnsupportedLinkType(u32),
}

impl fmt::Display for PcapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::BadMagic(magic) => write!(f, "not a pcap file (magic {magic:#010x})"),
            Self::UnsupportedLinkType(link) => write!(f, "unsupported link type {link}"),
        }
    }
}

impl std::error::Error for PcapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for PcapError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// Iterator over the UDP payloads of a capture file.
pub struct PcapFileSource {
    input: BufReader<File>,
    swapped: bool,
    link_type: u32,
    game_endpoint: Option<IpAddr>,
    first_timestamp_ms: Option<u64>,
}

impl PcapFileSource {
    /// Open a capture file.
    ///
    /// `game_endpoint` drives direction classification: records whose source
    /// address equals it are outbound, everything else inbound. With `None`
    /// every record is classified inbound.
    pub fn open<P: AsRef<Path>>(
        path: P,
        game_endpoint: Option<IpAddr>,
    ) -> Result<Self, PcapError> {
        let file = File::open(path.as_ref())?;
        let mut input = BufReader::new(file);

        let mut header = [0u8; GLOBAL_HEADER_LEN];
        input.read_exact(&mut header)?;

        let magic = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let swapped = match magic {
            PCAP_MAGIC => false,
            PCAP_MAGIC_SWAPPED => true,
            other => return Err(PcapError::BadMagic(other)),
        };

        let link_type = read_u32(&header[20..24], swapped);
        if link_type != LINKTYPE_ETHERNET && link_type != LINKTYPE_NULL {
            return Err(PcapError::UnsupportedLinkType(link_type));
        }

        log::debug!(
            "[pcap] opened capture, link type {link_type}, swapped={swapped}"
        );

        Ok(Self {
            input,
            swapped,
            link_type,
            game_endpoint,
            first_timestamp_ms: None,
        })
    }

    /// Read the next record's timestamp and frame bytes.
    ///
    /// Returns `None` on end of file; a truncated trailing record also ends
    /// the stream (with a log line) rather than failing the run.
    fn read_record(&mut self) -> Option<(u64, Vec<u8>)> {
        let mut header = [0u8; RECORD_HEADER_LEN];
        if let Err(err) = self.input.read_exact(&mut header) {
            if err.kind() != io::ErrorKind::UnexpectedEof {
                log::warn!("[pcap] read failed: {err}");
            }
            return None;
        }

        let ts_sec = read_u32(&header[0..4], self.swapped);
        let ts_usec = read_u32(&header[4..8], self.swapped);
        let incl_len = read_u32(&header[8..12], self.swapped) as usize;

        let mut frame = vec![0u8; incl_len];
        if let Err(err) = self.input.read_exact(&mut frame) {
            log::warn!("[pcap] truncated record at end of capture: {err}");
            return None;
        }

        let timestamp_ms = u64::from(ts_sec) * 1000 + u64::from(ts_usec) / 1000;
        Some((timestamp_ms, frame))
    }

    /// Strip link and IP framing, keeping UDP payloads only.
    fn parse_udp(&self, frame: &[u8]) -> Option<(IpAddr, IpAddr, Vec<u8>)> {
        let (ip_packet, ethertype) = match self.link_type {
            LINKTYPE_ETHERNET => {
                if frame.len() < 14 {
                    return None;
                }
                let ethertype = u16::from_be_bytes([frame[12], frame[13]]);
                (&frame[14..], ethertype)
            }
            _ => {
                // Null/loopback: 4-byte address family in file byte order.
                if frame.len() < 4 {
                    return None;
                }
                let family = read_u32(&frame[0..4], self.swapped);
                let ethertype = match family {
                    2 => ETHERTYPE_IPV4,
                    24 | 28 | 30 => ETHERTYPE_IPV6,
                    _ => return None,
                };
                (&frame[4..], ethertype)
            }
        };

        match ethertype {
            ETHERTYPE_IPV4 => parse_ipv4(ip_packet),
            ETHERTYPE_IPV6 => parse_ipv6(ip_packet),
            _ => None,
        }
    }
}

impl Iterator for PcapFileSource {
    type Item = RawPacket;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (timestamp_ms, frame) = self.read_record()?;
            let Some((src, dst, payload)) = self.parse_udp(&frame) else {
                continue;
            };

            let first = *self.first_timestamp_ms.get_or_insert(timestamp_ms);
            let relative_ms = timestamp_ms.saturating_sub(first) as u32;

            let direction = match self.game_endpoint {
                Some(endpoint) if src == endpoint => Direction::Outbound,
                _ => Direction::Inbound,
            };

            return Some(
                RawPacket::new(relative_ms, direction, payload).with_endpoints(src, dst),
            );
        }
    }
}

fn read_u32(bytes: &[u8], swapped: bool) -> u32 {
    let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
    if swapped {
        u32::from_be_bytes(raw)
    } else {
        u32::from_le_bytes(raw)
    }
}

fn parse_ipv4(packet: &[u8]) -> Option<(IpAddr, IpAddr, Vec<u8>)> {
    if packet.len() < 20 || packet[0] >> 4 != 4 {
        return None;
    }
    let header_len = usize::from(packet[0] & 0x0F) * 4;
    if header_len < 20 || packet.len() < header_len {
        return None;
    }
    if packet[9] != IP_PROTOCOL_UDP {
        return None;
    }

    let src = IpAddr::V4(Ipv4Addr::new(packet[12], packet[13], packet[14], packet[15]));
    let dst = IpAddr::V4(Ipv4Addr::new(packet[16], packet[17], packet[18], packet[19]));
    let payload = parse_udp_segment(&packet[header_len..])?;
    Some((src, dst, payload))
}

fn parse_ipv6(packet: &[u8]) -> Option<(IpAddr, IpAddr, Vec<u8>)> {
    if packet.len() < 40 {
        return None;
    }
    // Extension headers are not chased; a non-UDP next header skips the record.
    if packet[6] != IP_PROTOCOL_UDP {
        return None;
    }

    let mut src = [0u8; 16];
    src.copy_from_slice(&packet[8..24]);
    let mut dst = [0u8; 16];
    dst.copy_from_slice(&packet[24..40]);

    let payload = parse_udp_segment(&packet[40..])?;
    Some((
        IpAddr::V6(Ipv6Addr::from(src)),
        IpAddr::V6(Ipv6Addr::from(dst)),
        payload,
    ))
}

fn parse_udp_segment(segment: &[u8]) -> Option<Vec<u8>> {
    if segment.len() < 8 {
        return None;
    }
    let declared = usize::from(u16::from_be_bytes([segment[4], segment[5]]));
    let end = if declared >= 8 && declared <= segment.len() {
        declared
    } else {
        segment.len()
    };
    Some(segment[8..end].to_vec())
}
