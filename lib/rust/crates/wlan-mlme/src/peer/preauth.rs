// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{error::Error, timer::EventId},
    wlan_common::{mac::MacAddr, Time},
};

/// A client that completed authentication but has not associated yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreAuthEntry {
    pub addr: MacAddr,
    pub auth_alg_num: u16,
    pub created: Time,
    pub timer: Option<EventId>,
}

#[derive(Debug)]
pub struct PreAuthPool {
    entries: Vec<PreAuthEntry>,
    capacity: usize,
}

impl PreAuthPool {
    pub fn new(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity), capacity }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, addr: &MacAddr) -> bool {
        self.entries.iter().any(|e| &e.addr == addr)
    }

    pub fn get(&self, addr: &MacAddr) -> Option<&PreAuthEntry> {
        self.entries.iter().find(|e| &e.addr == addr)
    }

    /// Adds `entry`, replacing an existing one for the same client. The replaced entry is
    /// returned so its timer can be cancelled. Fails when the pool is full.
    pub fn insert(&mut self, entry: PreAuthEntry) -> Result<Option<PreAuthEntry>, Error> {
        let replaced = self.take(&entry.addr);
        if replaced.is_none() && self.entries.len() >= self.capacity {
            return Err(Error::NoResources);
        }
        self.entries.push(entry);
        Ok(replaced)
    }

    pub fn take(&mut self, addr: &MacAddr) -> Option<PreAuthEntry> {
        let idx = self.entries.iter().position(|e| &e.addr == addr)?;
        Some(self.entries.swap_remove(idx))
    }

    pub fn drain(&mut self) -> Vec<PreAuthEntry> {
        std::mem::take(&mut self.entries)
    }
}
