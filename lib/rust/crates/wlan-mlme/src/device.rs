// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The firmware command boundary. Every `DeviceOps` call only submits a command; the outcome of
//! the asynchronous ones arrives later as an `FwEvent` on the MLME's message stream.

use {
    crate::vdev::{OpMode, VdevId},
    std::fmt,
    wlan_common::{
        channel::Channel,
        ie::{EdcaParams, HtCapabilities, VhtCapabilities},
        mac::MacAddr,
        TimeUnit,
    },
};

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FwStatus(pub i32);

impl FwStatus {
    pub const OK: Self = Self(0);
    pub const INTERNAL: Self = Self(-1);
    pub const NOT_SUPPORTED: Self = Self(-2);
    pub const NO_RESOURCES: Self = Self(-3);
    pub const INVALID_ARGS: Self = Self(-10);
    pub const BAD_STATE: Self = Self(-20);
    pub const TIMED_OUT: Self = Self(-21);
    pub const PEER_CLOSED: Self = Self(-24);

    pub fn is_ok(self) -> bool {
        self == Self::OK
    }

    pub fn into_result(self) -> Result<(), FwStatus> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(self)
        }
    }

    fn name(self) -> Option<&'static str> {
        match self {
            Self::OK => Some("OK"),
            Self::INTERNAL => Some("INTERNAL"),
            Self::NOT_SUPPORTED => Some("NOT_SUPPORTED"),
            Self::NO_RESOURCES => Some("NO_RESOURCES"),
            Self::INVALID_ARGS => Some("INVALID_ARGS"),
            Self::BAD_STATE => Some("BAD_STATE"),
            Self::TIMED_OUT => Some("TIMED_OUT"),
            Self::PEER_CLOSED => Some("PEER_CLOSED"),
            _ => None,
        }
    }
}

impl fmt::Display for FwStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "FwStatus({})", self.0),
        }
    }
}

impl fmt::Debug for FwStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Opaque handle the firmware assigned to a vdev at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FwHandle(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    PreAssoc,
    PostAssoc,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VdevStartParams {
    pub channel: Channel,
    pub bssid: MacAddr,
    pub ssid: Vec<u8>,
    pub hidden_ssid: bool,
    pub beacon_interval: TimeUnit,
    pub dtim_period: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddBssParams {
    pub bssid: MacAddr,
    pub aid: u16,
    pub channel: Channel,
    pub beacon_interval: TimeUnit,
    pub caps: PeerCaps,
}

/// Capabilities negotiated with one peer, pushed to firmware on association and on a
/// same-BSS reassociation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeerCaps {
    pub addr: MacAddr,
    pub aid: u16,
    pub rates: Vec<u8>,
    pub qos: bool,
    pub pmf: bool,
    pub ht_cap: Option<HtCapabilities>,
    pub vht_cap: Option<VhtCapabilities>,
    pub he_cap: Option<Vec<u8>>,
    pub edca: Option<EdcaParams>,
}

pub trait DeviceOps: Send {
    /// Creation is the one synchronous firmware call: the handle is needed before anything
    /// else can be issued.
    fn vdev_create(
        &mut self,
        id: VdevId,
        opmode: OpMode,
        mac_addr: MacAddr,
    ) -> Result<FwHandle, FwStatus>;
    fn vdev_start(&mut self, handle: FwHandle, params: &VdevStartParams) -> Result<(), FwStatus>;
    fn vdev_restart(&mut self, handle: FwHandle, params: &VdevStartParams)
        -> Result<(), FwStatus>;
    fn vdev_up(&mut self, handle: FwHandle, bssid: MacAddr, aid: u16) -> Result<(), FwStatus>;
    fn vdev_stop(&mut self, handle: FwHandle) -> Result<(), FwStatus>;
    fn vdev_down(&mut self, handle: FwHandle) -> Result<(), FwStatus>;
    fn vdev_delete(&mut self, handle: FwHandle) -> Result<(), FwStatus>;
    fn peer_create(&mut self, handle: FwHandle, addr: MacAddr) -> Result<(), FwStatus>;
    fn peer_delete(&mut self, handle: FwHandle, addr: MacAddr) -> Result<(), FwStatus>;
    fn peer_update_caps(&mut self, handle: FwHandle, caps: &PeerCaps) -> Result<(), FwStatus>;
    fn add_bss(&mut self, handle: FwHandle, params: &AddBssParams) -> Result<(), FwStatus>;
    fn del_bss(&mut self, handle: FwHandle, bssid: MacAddr) -> Result<(), FwStatus>;
    fn set_link_state(
        &mut self,
        handle: FwHandle,
        bssid: MacAddr,
        state: LinkState,
    ) -> Result<(), FwStatus>;
    fn update_beacon_template(&mut self, handle: FwHandle, template: &[u8])
        -> Result<(), FwStatus>;
    fn send_mgmt_frame(&mut self, handle: FwHandle, frame: Vec<u8>) -> Result<(), FwStatus>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FwEventKind {
    VdevStarted,
    VdevRestarted,
    VdevUp,
    VdevStopped,
    VdevDown,
    VdevDeleted,
    PeerCreated { addr: MacAddr },
    PeerDeleted { addr: MacAddr },
    BssAdded,
    BssDeleted,
}

/// Completion of a previously issued firmware command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FwEvent {
    pub vdev_id: VdevId,
    pub kind: FwEventKind,
    pub status: FwStatus,
}

impl FwEvent {
    pub fn ok(vdev_id: VdevId, kind: FwEventKind) -> Self {
        Self { vdev_id, kind, status: FwStatus::OK }
    }
}

#[cfg(test)]
pub use test_utils::*;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display() {
        assert_eq!(FwStatus::OK.to_string(), "OK");
        assert_eq!(FwStatus::TIMED_OUT.to_string(), "TIMED_OUT");
        assert_eq!(FwStatus(-99).to_string(), "FwStatus(-99)");
    }

    #[test]
    fn status_into_result() {
        assert!(FwStatus::OK.into_result().is_ok());
        assert_eq!(FwStatus::INTERNAL.into_result(), Err(FwStatus::INTERNAL));
    }

    #[test]
    fn fake_device_fails_on_request() {
        let fake = FakeDevice::new();
        let mut device = fake.clone();
        assert_eq!(device.vdev_create(1, OpMode::Sta, [1; 6]), Ok(FwHandle(101)));
        fake.set_fail_with(Some(FwStatus::NO_RESOURCES));
        assert_eq!(device.vdev_stop(FwHandle(101)), Err(FwStatus::NO_RESOURCES));
        assert_eq!(device.send_mgmt_frame(FwHandle(101), vec![]), Err(FwStatus::NO_RESOURCES));
        assert_eq!(fake.commands(), vec![FwCommand::VdevCreate { id: 1, opmode: OpMode::Sta }]);
    }
}
