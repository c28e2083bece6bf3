// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{
        command::AssociateRequest,
        config::MlmeConfig,
        handlers::wps_pbc::PbcSessionList,
        peer::{PeerContext, PeerTable, PreAuthPool},
        timer::EventId,
    },
    log::debug,
    wlan_common::{
        channel::Channel,
        format::MacFmt,
        mac::{CapabilityInfo, MacAddr},
        Time, TimeUnit,
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Client,
    Ap,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MlmState {
    Idle,
    WtJoinBeacon,
    Joined,
    WtAuthFrame2,
    Authenticated,
    WtAssocRsp,
    WtReassocRsp,
    WtFtReassocRsp,
    WtAddBssRsp,
    LinkEstablished,
    WtDelStaRsp,
    WtDelBssRsp,
    BssStarted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SmeState {
    Idle,
    Joining,
    Authenticating,
    Associating,
    Associated,
    Disconnecting,
    BssStarting,
    BssActive,
}

/// Opaque security material handed down by the SME.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SecurityContext {
    pub rsne: Option<Vec<u8>>,
    pub keys: Vec<Vec<u8>>,
    pub pmf: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProtectionFlags {
    pub qos: bool,
    pub ht: bool,
    pub vht: bool,
    pub he: bool,
    pub privacy: bool,
    pub short_preamble: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BeaconCounters {
    pub beacons_received: u64,
    pub last_beacon: Time,
    /// Beacons and probe responses from the BSS since the last heartbeat check.
    pub seen_since_check: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeartbeatState {
    /// An active probe went out after the previous miss.
    pub probe_sent: bool,
    pub probes_sent_total: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReassocContext {
    pub target: MacAddr,
    pub old_bssid: MacAddr,
    pub ft: bool,
}

/// A traffic stream admitted by the AP. Kept across a same-BSS reassociation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tspec {
    pub tsid: u8,
    pub user_priority: u8,
}

#[derive(Debug, Default)]
pub struct SessionTimers {
    pub join: Option<EventId>,
    pub auth: Option<EventId>,
    pub assoc: Option<EventId>,
    pub reassoc: Option<EventId>,
    pub comeback: Option<EventId>,
    pub heartbeat: Option<EventId>,
}

/// One BSS a vdev takes part in, either as a client or as the AP.
#[derive(Debug)]
pub struct Session {
    pub role: Role,
    pub bssid: MacAddr,
    pub ssid: Vec<u8>,
    pub hidden_ssid: bool,
    pub channel: Channel,
    pub security: SecurityContext,
    pub beacon_interval: TimeUnit,
    pub beacon_template: Vec<u8>,
    pub capabilities: CapabilityInfo,
    pub flags: ProtectionFlags,
    pub peers: PeerTable,
    pub beacon_counters: BeaconCounters,
    pub heartbeat: HeartbeatState,
    /// Raw beacon seen while joining.
    pub join_beacon: Option<Vec<u8>>,
    pub reassoc: Option<ReassocContext>,
    pub admitted_tspecs: Vec<Tspec>,
    pub pbc: PbcSessionList,
    pub pbc_overlap: bool,
    pub preauth: PreAuthPool,
    pub timers: SessionTimers,
    pub comeback_retries: u8,
    pub pending_assoc: Option<AssociateRequest>,
    mlm_state: MlmState,
    sme_state: SmeState,
}

impl Session {
    fn new(
        role: Role,
        bssid: MacAddr,
        ssid: Vec<u8>,
        channel: Channel,
        beacon_interval: TimeUnit,
        max_peers: usize,
        config: &MlmeConfig,
    ) -> Self {
        Self {
            role,
            bssid,
            ssid,
            hidden_ssid: false,
            channel,
            security: SecurityContext::default(),
            beacon_interval,
            beacon_template: vec![],
            capabilities: CapabilityInfo::default(),
            flags: ProtectionFlags::default(),
            peers: PeerTable::new(max_peers),
            beacon_counters: BeaconCounters::default(),
            heartbeat: HeartbeatState::default(),
            join_beacon: None,
            reassoc: None,
            admitted_tspecs: vec![],
            pbc: PbcSessionList::new(config.wps_pbc_walk_time(), config.wps_pbc_max_entries),
            pbc_overlap: false,
            preauth: PreAuthPool::new(config.max_preauth),
            timers: SessionTimers::default(),
            comeback_retries: 0,
            pending_assoc: None,
            mlm_state: MlmState::Idle,
            sme_state: SmeState::Idle,
        }
    }

    /// Client session: at most one peer, the AP.
    pub fn new_client(
        bssid: MacAddr,
        ssid: Vec<u8>,
        channel: Channel,
        beacon_interval: TimeUnit,
        config: &MlmeConfig,
    ) -> Self {
        let mut session = Self::new(Role::Client, bssid, ssid, channel, beacon_interval, 1, config);
        session.capabilities.set_ess(true);
        session.capabilities.set_short_preamble(true);
        session.capabilities.set_qos(config.local_caps.qos);
        session
    }

    pub fn new_ap(
        bssid: MacAddr,
        ssid: Vec<u8>,
        channel: Channel,
        beacon_interval: TimeUnit,
        config: &MlmeConfig,
    ) -> Self {
        let mut session =
            Self::new(Role::Ap, bssid, ssid, channel, beacon_interval, config.max_peers, config);
        session.capabilities.set_ess(true);
        session.capabilities.set_short_preamble(true);
        session.flags.qos = config.local_caps.qos;
        session.flags.ht = config.local_caps.ht;
        session.flags.vht = config.local_caps.vht;
        session
    }

    pub fn mlm_state(&self) -> MlmState {
        self.mlm_state
    }

    pub fn set_mlm_state(&mut self, next: MlmState) {
        if next != self.mlm_state {
            debug!("session {}: {:?} -> {:?}", self.bssid.to_mac_str(), self.mlm_state, next);
            self.mlm_state = next;
        }
    }

    pub fn sme_state(&self) -> SmeState {
        self.sme_state
    }

    pub fn set_sme_state(&mut self, next: SmeState) {
        self.sme_state = next;
    }

    pub fn is_client(&self) -> bool {
        self.role == Role::Client
    }

    pub fn is_ap(&self) -> bool {
        self.role == Role::Ap
    }

    pub fn is_link_established(&self) -> bool {
        self.mlm_state == MlmState::LinkEstablished
    }

    /// The AP a client session is associated with.
    pub fn ap_peer(&self) -> Option<&PeerContext> {
        self.peers.get(&self.bssid)
    }

    pub fn ap_peer_mut(&mut self) -> Option<&mut PeerContext> {
        let bssid = self.bssid;
        self.peers.get_mut(&bssid)
    }

    /// Beacon/probe response activity from the BSS.
    pub fn record_bss_activity(&mut self, now: Time, is_beacon: bool) {
        if is_beacon {
            self.beacon_counters.beacons_received += 1;
            self.beacon_counters.last_beacon = now;
        }
        self.beacon_counters.seen_since_check += 1;
    }

    /// Back to a blank client session that may join again.
    pub fn reset_to_idle(&mut self) {
        self.set_mlm_state(MlmState::Idle);
        self.set_sme_state(SmeState::Idle);
        self.reassoc = None;
        self.pending_assoc = None;
        self.comeback_retries = 0;
        self.admitted_tspecs.clear();
        self.heartbeat = HeartbeatState::default();
        self.beacon_counters.seen_since_check = 0;
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::peer::PeerMlmState,
        wlan_common::{channel::Cbw, test_utils::*},
    };

    fn client_session() -> Session {
        Session::new_client(
            AP_ADDR,
            b"ssid".to_vec(),
            Channel::new(6, Cbw::Cbw20),
            TimeUnit::DEFAULT_BEACON_INTERVAL,
            &MlmeConfig::default(),
        )
    }

    #[test]
    fn client_session_holds_one_peer() {
        let mut session = client_session();
        session.peers.insert(PeerContext::new(AP_ADDR, 1, PeerMlmState::Associated)).expect("insert");
        assert!(session.peers.insert(PeerContext::new(OTHER_AP_ADDR, 1, PeerMlmState::Associated)).is_err());
        assert_eq!(session.ap_peer().map(|p| p.aid), Some(1));
    }

    #[test]
    fn ap_session_bounded_by_config() {
        let config = MlmeConfig { max_peers: 2, max_preauth: 1, ..Default::default() };
        let session =
            Session::new_ap(AP_ADDR, b"ssid".to_vec(), Channel::new(36, Cbw::Cbw20),
                TimeUnit::DEFAULT_BEACON_INTERVAL, &config);
        assert!(session.is_ap());
        assert_eq!(session.peers.alloc_aid(), Some(1));
        assert!(session.flags.qos);
        assert!(session.capabilities.ess());
    }

    #[test]
    fn activity_counters() {
        let mut session = client_session();
        session.record_bss_activity(Time::from_nanos(10), true);
        session.record_bss_activity(Time::from_nanos(20), false);
        assert_eq!(session.beacon_counters.beacons_received, 1);
        assert_eq!(session.beacon_counters.last_beacon, Time::from_nanos(10));
        assert_eq!(session.beacon_counters.seen_since_check, 2);
    }

    #[test]
    fn reset_keeps_identity() {
        let mut session = client_session();
        session.set_mlm_state(MlmState::LinkEstablished);
        session.admitted_tspecs.push(Tspec { tsid: 1, user_priority: 6 });
        session.reset_to_idle();
        assert_eq!(session.mlm_state(), MlmState::Idle);
        assert_eq!(session.sme_state(), SmeState::Idle);
        assert!(session.admitted_tspecs.is_empty());
        assert_eq!(session.bssid, AP_ADDR);
    }
}
