// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{device::FwStatus, vdev::VdevId},
    wlan_common::mac::{MacAddr, ReasonCode, StatusCode},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmResult {
    Success,
    Refused(StatusCode),
    /// The peer granted an AID outside 1..=2007.
    InvalidAid(u16),
    Timeout,
}

/// What initiated a teardown. Carried upward so the SME can tell a local decision from a
/// peer's.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DisconnectTrigger {
    HostDisassoc,
    PeerDisassoc,
    LinkMonitoringDisassoc,
    PromiscuousDisassoc,
    HostDeauth,
    PeerDeauth,
    LinkMonitoringDeauth,
    JoinFailure,
    ReassocReject,
}

impl DisconnectTrigger {
    pub fn is_disassoc(self) -> bool {
        match self {
            DisconnectTrigger::HostDisassoc
            | DisconnectTrigger::PeerDisassoc
            | DisconnectTrigger::LinkMonitoringDisassoc
            | DisconnectTrigger::PromiscuousDisassoc => true,
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisconnectInfo {
    pub vdev_id: VdevId,
    pub peer: MacAddr,
    pub reason_code: ReasonCode,
    pub trigger: DisconnectTrigger,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Indication {
    JoinConfirm { vdev_id: VdevId, bssid: MacAddr, result: ConfirmResult },
    AuthenticateConfirm { vdev_id: VdevId, peer: MacAddr, result: ConfirmResult },
    AssociateConfirm { vdev_id: VdevId, bssid: MacAddr, aid: Option<u16>, result: ConfirmResult },
    ReassociateConfirm { vdev_id: VdevId, bssid: MacAddr, aid: Option<u16>, result: ConfirmResult },
    AssociateIndication { vdev_id: VdevId, peer: MacAddr, aid: u16, reassoc: bool },
    DeauthenticateIndication(DisconnectInfo),
    DisassociateIndication(DisconnectInfo),
    VdevStartConfirm { vdev_id: VdevId, status: FwStatus },
    VdevStopConfirm { vdev_id: VdevId },
    VdevDeleteConfirm { vdev_id: VdevId },
    WpsPbcOverlap { vdev_id: VdevId, overlap: bool },
}

impl Indication {
    /// Deauthenticate or disassociate indication, picked by the trigger.
    pub fn disconnect(info: DisconnectInfo) -> Self {
        if info.trigger.is_disassoc() {
            Indication::DisassociateIndication(info)
        } else {
            Indication::DeauthenticateIndication(info)
        }
    }
}
