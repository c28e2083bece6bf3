// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

pub mod deletion;
pub mod preauth;

pub use {
    deletion::{trigger_deletion, DeletionOutcome},
    preauth::{PreAuthEntry, PreAuthPool},
};

use {
    crate::{device::PeerCaps, error::Error, indication::DisconnectTrigger},
    log::{debug, warn},
    parking_lot::Mutex,
    std::{collections::HashMap, sync::Arc},
    wlan_common::{
        format::MacFmt,
        ie::{EdcaParams, HtCapabilities, VhtCapabilities},
        mac::{CapabilityInfo, MacAddr, ReasonCode, MAX_AID},
        Time,
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeerMlmState {
    Idle,
    WtAuthFrame2,
    Authenticated,
    WtAssocCnf,
    Associated,
    LinkEstablished,
    WtReassocRsp,
    WtFtReassocRsp,
    WtDelStaRsp,
    WtDelBssRsp,
}

impl PeerMlmState {
    pub fn is_deleting(self) -> bool {
        self == PeerMlmState::WtDelStaRsp || self == PeerMlmState::WtDelBssRsp
    }

    pub fn is_reassociating(self) -> bool {
        self == PeerMlmState::WtReassocRsp || self == PeerMlmState::WtFtReassocRsp
    }

    /// Position along one connection attempt. Only defined for the forward path.
    fn rank(self) -> Option<u8> {
        match self {
            PeerMlmState::Idle => Some(0),
            PeerMlmState::WtAuthFrame2 => Some(1),
            PeerMlmState::Authenticated => Some(2),
            PeerMlmState::WtAssocCnf => Some(3),
            PeerMlmState::Associated => Some(4),
            PeerMlmState::LinkEstablished => Some(5),
            _ => None,
        }
    }

    /// Whether a peer may move from `self` to `next`. States only advance; the exceptions are
    /// the reassociation detour out of and back into an established link, and deletion, which
    /// may start from anywhere but cannot be left.
    pub fn can_transition_to(self, next: PeerMlmState) -> bool {
        use PeerMlmState::*;
        match (self, next) {
            (WtDelStaRsp, WtDelBssRsp) => true,
            (from, _) if from.is_deleting() => false,
            (_, WtDelStaRsp) => true,
            (_, WtDelBssRsp) => false,
            (Associated, WtReassocRsp)
            | (Associated, WtFtReassocRsp)
            | (LinkEstablished, WtReassocRsp)
            | (LinkEstablished, WtFtReassocRsp) => true,
            (_, WtReassocRsp) | (_, WtFtReassocRsp) => false,
            (from, Associated) | (from, LinkEstablished) if from.is_reassociating() => true,
            (from, _) if from.is_reassociating() => false,
            (from, to) => match (from.rank(), to.rank()) {
                (Some(a), Some(b)) => b > a,
                _ => false,
            },
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeerStats {
    pub rx_mgmt_frames: u64,
    pub tx_mgmt_frames: u64,
    pub last_activity: Time,
}

/// Statistics readable from outside the dispatch context.
pub type PeerStatsHandle = Arc<Mutex<PeerStats>>;

#[derive(Debug)]
pub struct PeerContext {
    pub addr: MacAddr,
    pub aid: u16,
    pub capabilities: CapabilityInfo,
    pub listen_interval: u16,
    pub rates: Vec<u8>,
    pub qos: bool,
    pub ht_cap: Option<HtCapabilities>,
    pub vht_cap: Option<VhtCapabilities>,
    pub he_cap: Option<Vec<u8>>,
    pub edca: Option<EdcaParams>,
    /// Set when the association was requested with a reassociation request.
    pub reassoc_requested: bool,
    pub cleanup_trigger: Option<DisconnectTrigger>,
    pub disassoc_reason: Option<ReasonCode>,
    pub deletion_in_progress: bool,
    mlm_state: PeerMlmState,
    stats: PeerStatsHandle,
}

impl PeerContext {
    pub fn new(addr: MacAddr, aid: u16, mlm_state: PeerMlmState) -> Self {
        Self {
            addr,
            aid,
            capabilities: CapabilityInfo::default(),
            listen_interval: 0,
            rates: vec![],
            qos: false,
            ht_cap: None,
            vht_cap: None,
            he_cap: None,
            edca: None,
            reassoc_requested: false,
            cleanup_trigger: None,
            disassoc_reason: None,
            deletion_in_progress: false,
            mlm_state,
            stats: Arc::new(Mutex::new(PeerStats::default())),
        }
    }

    pub fn mlm_state(&self) -> PeerMlmState {
        self.mlm_state
    }

    /// Moves to `next`. Setting the current state again is a no-op.
    pub fn set_mlm_state(&mut self, next: PeerMlmState) -> Result<(), Error> {
        if next == self.mlm_state {
            return Ok(());
        }
        if !self.mlm_state.can_transition_to(next) {
            warn!(
                "peer {}: refusing transition {:?} -> {:?}",
                self.addr.to_mac_str(),
                self.mlm_state,
                next
            );
            return Err(Error::InvalidState);
        }
        debug!("peer {}: {:?} -> {:?}", self.addr.to_mac_str(), self.mlm_state, next);
        self.mlm_state = next;
        Ok(())
    }

    pub fn is_deleting(&self) -> bool {
        self.deletion_in_progress || self.mlm_state.is_deleting()
    }

    pub fn stats(&self) -> PeerStatsHandle {
        self.stats.clone()
    }

    pub fn record_rx(&self, now: Time) {
        let mut stats = self.stats.lock();
        stats.rx_mgmt_frames += 1;
        stats.last_activity = now;
    }

    pub fn record_tx(&self) {
        self.stats.lock().tx_mgmt_frames += 1;
    }

    pub fn caps(&self, pmf: bool) -> PeerCaps {
        PeerCaps {
            addr: self.addr,
            aid: self.aid,
            rates: self.rates.clone(),
            qos: self.qos,
            pmf,
            ht_cap: self.ht_cap,
            vht_cap: self.vht_cap,
            he_cap: self.he_cap.clone(),
            edca: self.edca,
        }
    }
}

/// Peers of one session, keyed by MAC address.
#[derive(Debug)]
pub struct PeerTable {
    peers: HashMap<MacAddr, PeerContext>,
    max_peers: usize,
}

impl PeerTable {
    pub fn new(max_peers: usize) -> Self {
        Self { peers: HashMap::new(), max_peers }
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.peers.len() >= self.max_peers
    }

    pub fn get(&self, addr: &MacAddr) -> Option<&PeerContext> {
        self.peers.get(addr)
    }

    pub fn get_mut(&mut self, addr: &MacAddr) -> Option<&mut PeerContext> {
        self.peers.get_mut(addr)
    }

    pub fn contains(&self, addr: &MacAddr) -> bool {
        self.peers.contains_key(addr)
    }

    pub fn insert(&mut self, peer: PeerContext) -> Result<(), Error> {
        if !self.peers.contains_key(&peer.addr) && self.is_full() {
            return Err(Error::NoResources);
        }
        self.peers.insert(peer.addr, peer);
        Ok(())
    }

    pub fn remove(&mut self, addr: &MacAddr) -> Option<PeerContext> {
        self.peers.remove(addr)
    }

    pub fn lookup_by_aid(&self, aid: u16) -> Option<&PeerContext> {
        self.peers.values().find(|peer| peer.aid == aid)
    }

    /// Lowest AID not held by any peer, within `1..=max_peers` and never above 2007.
    pub fn alloc_aid(&self) -> Option<u16> {
        if self.is_full() {
            return None;
        }
        let upper = std::cmp::min(self.max_peers, MAX_AID as usize) as u16;
        (1..=upper).find(|aid| self.lookup_by_aid(*aid).is_none())
    }

    pub fn addrs(&self) -> Vec<MacAddr> {
        let mut addrs: Vec<_> = self.peers.keys().cloned().collect();
        addrs.sort();
        addrs
    }

    pub fn any_deleting(&self) -> bool {
        self.peers.values().any(|peer| peer.is_deleting())
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerContext> {
        self.peers.values()
    }
}
