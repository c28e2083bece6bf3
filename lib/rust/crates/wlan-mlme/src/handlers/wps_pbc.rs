// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! WPS push-button session overlap detection. Push-button probe requests seen within the walk
//! time are remembered; more than one distinct requester in that window is an overlap.

use {
    log::{debug, info},
    std::{collections::VecDeque, time::Duration},
    wlan_common::{format::MacFmt, ie::wsc::Uuid, mac::MacAddr, Time},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PbcEntry {
    pub addr: MacAddr,
    pub uuid: Uuid,
    pub timestamp: Time,
}

#[derive(Debug)]
pub struct PbcSessionList {
    entries: VecDeque<PbcEntry>,
    walk_time: Duration,
    max_entries: usize,
}

impl PbcSessionList {
    pub fn new(walk_time: Duration, max_entries: usize) -> Self {
        Self { entries: VecDeque::with_capacity(max_entries), walk_time, max_entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drops entries older than the walk time.
    pub fn prune(&mut self, now: Time) {
        let walk_time = self.walk_time;
        self.entries.retain(|e| now.since(e.timestamp) <= walk_time);
    }

    /// Records a push-button probe request and returns whether the window now overlaps.
    /// A requester seen again only has its timestamp refreshed.
    pub fn insert(&mut self, addr: MacAddr, uuid: Uuid, now: Time) -> bool {
        self.prune(now);
        self.entries.retain(|e| e.addr != addr);
        if self.max_entries > 0 && self.entries.len() >= self.max_entries {
            if let Some(evicted) = self.entries.pop_front() {
                debug!("PBC list full, evicting {}", evicted.addr.to_mac_str());
            }
        }
        self.entries.push_back(PbcEntry { addr, uuid, timestamp: now });
        let overlap = self.is_overlap();
        if overlap {
            info!("WPS PBC overlap: {} requesters in the walk time", self.entries.len());
        }
        overlap
    }

    /// Requesters sharing one UUID-E are the same enrollee on several interfaces.
    pub fn is_overlap(&self) -> bool {
        match self.entries.front() {
            Some(first) => self.entries.iter().any(|e| e.uuid != first.uuid),
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PbcEntry> {
        self.entries.iter()
    }
}
