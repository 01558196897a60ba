// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ingestion thread: drives a packet source into the work queue.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::packet::RawPacket;

use super::queue::WorkQueue;

/// Spawn the ingestion thread for any packet source.
///
/// The thread pushes every packet the source yields until the source is
/// exhausted or `stop` is raised, then exits. The source owns its pacing:
/// a replay player sleeps between yields, a capture callback yields as
/// packets arrive.
pub fn spawn_ingest<S>(
    queue: Arc<WorkQueue>,
    source: S,
    stop: Arc<AtomicBool>,
) -> io::Result<JoinHandle<()>>
where
    S: Iterator<Item = RawPacket> + Send + 'static,
{
    std::thread::Builder::new()
        .name("udptap-ingest".into())
        .spawn(move || {
            let mut count: u64 = 0;
            for packet in source {
                if stop.load(Ordering::Relaxed) {
                    break;
                }
                queue.push(packet);
                count += 1;
            }
            log::debug!("[ingest] source finished after {count} packets");
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Direction;

    #[test]
    fn ingests_the_whole_source() {
        let queue = Arc::new(WorkQueue::new());
        let stop = Arc::new(AtomicBool::new(false));
        let source = (0..32u32).map(|i| RawPacket::new(i, Direction::Inbound, vec![0; 8]));

        let handle =
            spawn_ingest(Arc::clone(&queue), source, Arc::clone(&stop)).expect("spawn");
        handle.join().expect("join");

        assert_eq!(queue.drain_all().len(), 32);
    }

    #[test]
    fn stop_flag_cuts_ingestion_short() {
        let queue = Arc::new(WorkQueue::new());
        let stop = Arc::new(AtomicBool::new(true));
        let source = (0..1000u32).map(|i| RawPacket::new(i, Direction::Inbound, Vec::new()));

        let handle =
            spawn_ingest(Arc::clone(&queue), source, Arc::clone(&stop)).expect("spawn");
        handle.join().expect("join");

        assert!(queue.is_empty());
    }
}
