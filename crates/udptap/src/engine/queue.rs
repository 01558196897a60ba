// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Batched handoff between the ingestion and processing threads.

use parking_lot::Mutex;

use crate::packet::RawPacket;

/// Thread-safe packet queue with O(1) lock hold time.
///
/// `push` appends under the lock; [`WorkQueue::drain_all`] swaps the backing
/// vector for an empty one and releases the lock before the caller touches a
/// single packet. No loss, no duplication, capture order preserved.
#[derive(Debug, Default)]
pub struct WorkQueue {
    pending: Mutex<Vec<RawPacket>>,
}

impl WorkQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one packet.
    pub fn push(&self, packet: RawPacket) {
        self.pending.lock().push(packet);
    }

    /// Take every queued packet, leaving the queue empty.
    #[must_use]
    pub fn drain_all(&self) -> Vec<RawPacket> {
        std::mem::take(&mut *self.pending.lock())
    }

    /// Whether the queue currently holds no packets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Direction;

    fn packet(tag: u8) -> RawPacket {
        RawPacket::new(u32::from(tag), Direction::Inbound, vec![tag])
    }

    #[test]
    fn drain_returns_packets_in_push_order() {
        let queue = WorkQueue::new();
        for tag in 0..5 {
            queue.push(packet(tag));
        }

        let drained = queue.drain_all();
        let tags: Vec<u8> = drained.iter().map(|p| p.payload[0]).collect();
        assert_eq!(tags, vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn drain_on_empty_queue_returns_nothing() {
        let queue = WorkQueue::new();
        assert!(queue.drain_all().is_empty());
    }

    #[test]
    fn pushes_after_a_drain_land_in_the_next_batch() {
        let queue = WorkQueue::new();
        queue.push(packet(1));
        assert_eq!(queue.drain_all().len(), 1);

        queue.push(packet(2));
        queue.push(packet(3));
        let batch = queue.drain_all();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].payload[0], 2);
    }

    #[test]
    fn concurrent_pushes_are_neither_lost_nor_duplicated() {
        use std::sync::Arc;

        let queue = Arc::new(WorkQueue::new());
        let writers: Vec<_> = (0..4u8)
            .map(|w| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    for i in 0..250u32 {
                        queue.push(RawPacket::new(i, Direction::Outbound, vec![w]));
                    }
                })
            })
            .collect();

        let mut total = 0;
        while total < 1000 {
            total += queue.drain_all().len();
            std::thread::yield_now();
        }
        for writer in writers {
            writer.join().expect("writer");
        }
        total += queue.drain_all().len();
        assert_eq!(total, 1000);
    }
}
