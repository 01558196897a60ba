// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Multi-part message reassembly.
//!
//! Large reliable messages arrive split into fragments that share a group id.
//! Group ids are numbered independently per channel, so the assembly key is
//! the `(group, channel)` pair. Assemblies are owned by the session and
//! dropped wholesale when a new session replaces it, so stale fragments from
//! a previous connection can never complete a new connection's groups.

use std::collections::HashMap;

use crate::protocol::extractor::FragmentHeader;

/// Assembly key: fragment group id scoped by channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct FragmentKey {
    group: u8,
    channel: u8,
}

/// One in-flight fragment group.
#[derive(Debug)]
struct FragmentAssembly {
    /// Index -> fragment payload; `None` until the slot arrives.
    slots: Vec<Option<Vec<u8>>>,
}

impl FragmentAssembly {
    fn new(total: usize) -> Self {
        let mut slots = Vec::with_capacity(total);
        slots.resize_with(total, || None);
        Self { slots }
    }

    fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }
}

/// Reconstructs fragmented messages, keyed by `(group, channel)`.
#[derive(Debug, Default)]
pub struct FragmentReassembler {
    assemblies: HashMap<FragmentKey, FragmentAssembly>,
}

impl FragmentReassembler {
    /// Create an empty reassembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one fragment.
    ///
    /// Returns the reassembled message exactly once, when the fragment fills
    /// the group's last empty slot. Until then, and for every dropped
    /// fragment, returns `None`:
    /// - a declared total differing from the group's current one resets the
    ///   assembly, discarding collected slots (the group is desynced and the
    ///   loss is not recoverable)
    /// - a zero declared total is dropped
    /// - an index >= the declared total is dropped, slots untouched
    /// - a duplicate index overwrites its slot (last write wins)
    pub fn accept(
        &mut self,
        channel: u8,
        header: FragmentHeader,
        payload: &[u8],
    ) -> Option<Vec<u8>> {
        if header.total == 0 {
            log::trace!("[frag] zero-part group {} on channel {channel} dropped", header.group);
            return None;
        }

        let key = FragmentKey {
            group: header.group,
            channel,
        };
        let total = usize::from(header.total);

        let assembly = self
            .assemblies
            .entry(key)
            .or_insert_with(|| FragmentAssembly::new(total));
        if assembly.slots.len() != total {
            log::debug!(
                "[frag] group {} on channel {channel} changed total {} -> {}, resetting",
                header.group,
                assembly.slots.len(),
                total
            );
            *assembly = FragmentAssembly::new(total);
        }

        if usize::from(header.index) >= total {
            log::trace!(
                "[frag] group {} on channel {channel}: index {} out of range (total {})",
                header.group,
                header.index,
                total
            );
            return None;
        }

        assembly.slots[usize::from(header.index)] = Some(payload.to_vec());

        if !assembly.is_complete() {
            return None;
        }

        let assembly = self.assemblies.remove(&key)?;
        let mut message = Vec::new();
        for slot in assembly.slots.into_iter().flatten() {
            message.extend_from_slice(&slot);
        }
        log::trace!(
            "[frag] group {} on channel {channel} complete ({} bytes)",
            header.group,
            message.len()
        );
        Some(message)
    }

    /// Number of in-flight (incomplete) groups.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.assemblies.len()
    }
}
