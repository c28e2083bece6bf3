// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Requests from the upper layer.

use {
    crate::vdev::{OpMode, VdevId},
    wlan_common::{
        channel::Channel,
        mac::{MacAddr, ReasonCode},
        TimeUnit,
    },
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinRequest {
    pub bssid: MacAddr,
    pub ssid: Vec<u8>,
    pub channel: Channel,
    pub beacon_interval: TimeUnit,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticateRequest {
    pub peer: MacAddr,
    pub auth_alg_num: u16,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssociateRequest {
    pub peer: MacAddr,
    pub rsne: Option<Vec<u8>>,
    pub keys: Vec<Vec<u8>>,
    pub pmf: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReassociateRequest {
    pub target: MacAddr,
    /// Fast BSS transition rather than a plain reassociation.
    pub ft: bool,
}

/// Deauthenticate or disassociate `peer`. `ies` are appended verbatim to the outgoing frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisconnectRequest {
    pub peer: MacAddr,
    pub reason_code: ReasonCode,
    pub ies: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartBssRequest {
    pub ssid: Vec<u8>,
    pub hidden_ssid: bool,
    pub channel: Channel,
    pub beacon_interval: TimeUnit,
    pub rsne: Option<Vec<u8>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BeaconUpdateOp {
    /// Regenerate and push the template, no restart.
    Template,
    HiddenSsid(bool),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MlmeCommand {
    CreateVdev { vdev_id: VdevId, opmode: OpMode, mac_addr: MacAddr },
    StopVdev { vdev_id: VdevId },
    DeleteVdev { vdev_id: VdevId },
    StartMonitor { vdev_id: VdevId, channel: Channel },
    Join { vdev_id: VdevId, req: JoinRequest },
    Authenticate { vdev_id: VdevId, req: AuthenticateRequest },
    Associate { vdev_id: VdevId, req: AssociateRequest },
    Reassociate { vdev_id: VdevId, req: ReassociateRequest },
    Deauthenticate { vdev_id: VdevId, req: DisconnectRequest },
    Disassociate { vdev_id: VdevId, req: DisconnectRequest },
    StartBss { vdev_id: VdevId, req: StartBssRequest },
    StopBss { vdev_id: VdevId },
    UpdateBeacon { vdev_id: VdevId, op: BeaconUpdateOp },
    SwitchChannel { vdev_id: VdevId, channel: Channel },
}

impl MlmeCommand {
    pub fn vdev_id(&self) -> VdevId {
        match self {
            MlmeCommand::CreateVdev { vdev_id, .. }
            | MlmeCommand::StopVdev { vdev_id }
            | MlmeCommand::DeleteVdev { vdev_id }
            | MlmeCommand::StartMonitor { vdev_id, .. }
            | MlmeCommand::Join { vdev_id, .. }
            | MlmeCommand::Authenticate { vdev_id, .. }
            | MlmeCommand::Associate { vdev_id, .. }
            | MlmeCommand::Reassociate { vdev_id, .. }
            | MlmeCommand::Deauthenticate { vdev_id, .. }
            | MlmeCommand::Disassociate { vdev_id, .. }
            | MlmeCommand::StartBss { vdev_id, .. }
            | MlmeCommand::StopBss { vdev_id }
            | MlmeCommand::UpdateBeacon { vdev_id, .. }
            | MlmeCommand::SwitchChannel { vdev_id, .. } => *vdev_id,
        }
    }
}
