// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Vdev lifecycle. Each vdev follows
//! Init -> StartRequested -> Started -> UpRequested -> Up [-> RestartRequested -> Started ...]
//! -> StopRequested -> Stopped -> DownRequested -> Init, with every firmware round trip modelled
//! as a wait state left by the matching `FwEvent`.

mod ap;
mod monitor;
mod sta;

pub use {ap::ApOps, monitor::MonitorOps, sta::StaOps};

use {
    crate::{
        command::BeaconUpdateOp,
        context::Context,
        device::{FwHandle, FwStatus, VdevStartParams},
        error::Error,
        session::Session,
        timer::EventId,
    },
    log::{debug, info},
    wlan_common::{channel::Channel, format::MacFmt, mac::MacAddr, TimeUnit},
};

pub type VdevId = u8;

const DEFAULT_DTIM_PERIOD: u8 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpMode {
    Sta,
    Ap,
    Monitor,
    P2pClient,
    P2pGo,
    P2pDevice,
}

impl OpMode {
    pub fn is_beaconing_mode(self) -> bool {
        self == OpMode::Ap || self == OpMode::P2pGo
    }

    pub fn is_monitor_mode(self) -> bool {
        self == OpMode::Monitor
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VdevState {
    Init,
    StartRequested,
    Started,
    UpRequested,
    Up,
    RestartRequested,
    StopRequested,
    Stopped,
    DownRequested,
}

impl VdevState {
    pub fn is_stopping(self) -> bool {
        match self {
            VdevState::StopRequested | VdevState::Stopped | VdevState::DownRequested => true,
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssocType {
    Initial,
    Reassoc,
    FtReassoc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopType {
    Normal,
    /// Delete the vdev once it is down.
    Delete,
}

/// Per-vdev extension data, allocated by `ext_create` and released by `ext_destroy`.
#[derive(Debug)]
pub struct VdevPrivate {
    pub channel_switch_in_progress: bool,
    pub hidden_ssid_restart_in_progress: bool,
    pub connection_fail: bool,
    pub cac_required: bool,
    pub vdev_start_failed: bool,
    pub assoc_type: AssocType,
    pub stop_type: StopType,
    /// Stop was requested while peer deletions were still in flight.
    pub stop_pending: bool,
    pub cac_timer: Option<EventId>,
    disconnect_ie: Vec<u8>,
}

/// The per-mode operation set, chosen once at registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VdevOps {
    Sta,
    Ap,
    Monitor,
}

impl VdevOps {
    pub fn register(opmode: OpMode) -> Self {
        if opmode.is_beaconing_mode() {
            VdevOps::Ap
        } else if opmode.is_monitor_mode() {
            VdevOps::Monitor
        } else {
            VdevOps::Sta
        }
    }

    pub fn ops(self) -> &'static dyn VdevMlmeOps {
        match self {
            VdevOps::Sta => &StaOps,
            VdevOps::Ap => &ApOps,
            VdevOps::Monitor => &MonitorOps,
        }
    }
}

#[derive(Debug)]
pub struct Vdev {
    pub id: VdevId,
    pub opmode: OpMode,
    pub mac_addr: MacAddr,
    pub fw_handle: FwHandle,
    pub ops: VdevOps,
    /// Channel of the last start/restart, or the one requested for a monitor.
    pub channel: Option<Channel>,
    state: VdevState,
    private: Option<Box<VdevPrivate>>,
}

impl Vdev {
    pub fn new(id: VdevId, opmode: OpMode, mac_addr: MacAddr, fw_handle: FwHandle) -> Self {
        Self {
            id,
            opmode,
            mac_addr,
            fw_handle,
            ops: VdevOps::register(opmode),
            channel: None,
            state: VdevState::Init,
            private: None,
        }
    }

    pub fn state(&self) -> VdevState {
        self.state
    }

    pub fn set_state(&mut self, next: VdevState) {
        if next != self.state {
            debug!("vdev {}: {:?} -> {:?}", self.id, self.state, next);
            self.state = next;
        }
    }

    /// Releases nothing; real cleanup happens in `ext_destroy`.
    pub fn unregister(&self) {
        debug!("vdev {} unregistered ({:?})", self.id, self.ops);
    }

    pub fn ext_create(&mut self, disconnect_ie_capacity: usize) -> Result<(), Error> {
        if self.private.is_some() {
            return Err(Error::InvalidState);
        }
        let mut disconnect_ie = Vec::new();
        disconnect_ie.try_reserve(disconnect_ie_capacity).map_err(|_| Error::NoResources)?;
        self.private = Some(Box::new(VdevPrivate {
            channel_switch_in_progress: false,
            hidden_ssid_restart_in_progress: false,
            connection_fail: false,
            cac_required: false,
            vdev_start_failed: false,
            assoc_type: AssocType::Initial,
            stop_type: StopType::Normal,
            stop_pending: false,
            cac_timer: None,
            disconnect_ie,
        }));
        Ok(())
    }

    pub fn ext_destroy(&mut self) -> Result<(), Error> {
        let mut private = self.private.take().ok_or(Error::InvalidState)?;
        private.disconnect_ie.clear();
        private.disconnect_ie.shrink_to_fit();
        debug!("vdev {} private data released", self.id);
        Ok(())
    }

    pub fn has_private(&self) -> bool {
        self.private.is_some()
    }

    pub fn private(&self) -> Result<&VdevPrivate, Error> {
        self.private.as_deref().ok_or(Error::InvalidState)
    }

    pub fn private_mut(&mut self) -> Result<&mut VdevPrivate, Error> {
        self.private.as_deref_mut().ok_or(Error::InvalidState)
    }

    pub fn set_disconnect_ie(&mut self, ies: &[u8]) -> Result<(), Error> {
        let private = self.private_mut()?;
        private.disconnect_ie.clear();
        private.disconnect_ie.try_reserve(ies.len()).map_err(|_| Error::NoResources)?;
        private.disconnect_ie.extend_from_slice(ies);
        Ok(())
    }

    /// Pending disconnect IEs, leaving the buffer empty but allocated.
    pub fn take_disconnect_ie(&mut self) -> Vec<u8> {
        match self.private.as_deref_mut() {
            Some(private) => {
                let ies = private.disconnect_ie.clone();
                private.disconnect_ie.clear();
                ies
            }
            None => vec![],
        }
    }

    pub fn channel_switch_in_progress(&self) -> bool {
        self.private.as_ref().map_or(false, |p| p.channel_switch_in_progress)
    }
}

/// Everything a mode handler may touch while running for one vdev.
pub struct VdevCtx<'a> {
    pub ctx: &'a mut Context,
    pub vdev: &'a mut Vdev,
    pub session: Option<&'a mut Session>,
}

impl<'a> VdevCtx<'a> {
    pub fn session_mut(&mut self) -> Result<&mut Session, Error> {
        let vdev_id = self.vdev.id;
        self.session.as_deref_mut().ok_or(Error::NoSession(vdev_id))
    }

    pub fn has_deleting_peers(&self) -> bool {
        self.session.as_ref().map_or(false, |s| s.peers.any_deleting())
    }

    fn start_params(&self) -> Result<VdevStartParams, Error> {
        match self.session.as_deref() {
            Some(session) => Ok(VdevStartParams {
                channel: session.channel,
                bssid: session.bssid,
                ssid: session.ssid.clone(),
                hidden_ssid: session.hidden_ssid,
                beacon_interval: session.beacon_interval,
                dtim_period: DEFAULT_DTIM_PERIOD,
            }),
            None => {
                let channel = self.vdev.channel.ok_or(Error::InvalidState)?;
                Ok(VdevStartParams {
                    channel,
                    bssid: self.vdev.mac_addr,
                    ssid: vec![],
                    hidden_ssid: false,
                    beacon_interval: TimeUnit::DEFAULT_BEACON_INTERVAL,
                    dtim_period: DEFAULT_DTIM_PERIOD,
                })
            }
        }
    }
}

/// Mode-specific vdev operations. Operations a mode does not support fail with `NotSupported`.
pub trait VdevMlmeOps: Sync {
    fn start(&self, v: &mut VdevCtx<'_>) -> Result<(), Error>;
    fn restart(&self, v: &mut VdevCtx<'_>) -> Result<(), Error>;

    /// Gate in front of start/restart.
    fn stop_start_send(&self, _v: &mut VdevCtx<'_>) -> Result<(), Error> {
        Ok(())
    }

    /// The firmware acknowledged a start or restart.
    fn start_continue(&self, v: &mut VdevCtx<'_>) -> Result<(), Error>;

    fn start_failed(&self, v: &mut VdevCtx<'_>, status: FwStatus) -> Result<(), Error> {
        info!("vdev {} failed to start: {}", v.vdev.id, status);
        v.vdev.private_mut()?.vdev_start_failed = true;
        v.vdev.set_state(VdevState::Init);
        Ok(())
    }

    fn connection_start(&self, _v: &mut VdevCtx<'_>) -> Result<(), Error> {
        Ok(())
    }

    fn up(&self, v: &mut VdevCtx<'_>) -> Result<(), Error>;

    fn notify_up_complete(&self, v: &mut VdevCtx<'_>) -> Result<(), Error> {
        v.vdev.set_state(VdevState::Up);
        Ok(())
    }

    fn roam_notify(&self, _v: &mut VdevCtx<'_>, _target: MacAddr) -> Result<(), Error> {
        Err(Error::NotSupported("roam notify"))
    }

    fn update_beacon(&self, _v: &mut VdevCtx<'_>, _op: BeaconUpdateOp) -> Result<(), Error> {
        Err(Error::NotSupported("beacon update"))
    }

    fn disconnect_peers(&self, v: &mut VdevCtx<'_>) -> Result<(), Error>;

    fn dfs_cac_timer_stop(&self, _v: &mut VdevCtx<'_>) -> Result<(), Error> {
        Err(Error::NotSupported("CAC timer"))
    }

    fn is_newchan_no_cac(&self, _v: &mut VdevCtx<'_>) -> Result<(), Error> {
        Err(Error::NotSupported("CAC gate"))
    }

    fn stop(&self, v: &mut VdevCtx<'_>) -> Result<(), Error> {
        begin_stop(self, v)
    }

    /// The firmware acknowledged the stop.
    fn stop_continue(&self, v: &mut VdevCtx<'_>) -> Result<(), Error> {
        v.vdev.set_state(VdevState::Stopped);
        self.down(v)
    }

    fn down(&self, v: &mut VdevCtx<'_>) -> Result<(), Error> {
        v.ctx.device.vdev_down(v.vdev.fw_handle)?;
        v.vdev.set_state(VdevState::DownRequested);
        Ok(())
    }

    fn notify_down_complete(&self, v: &mut VdevCtx<'_>) -> Result<(), Error> {
        v.vdev.set_state(VdevState::Init);
        info!("vdev {} down", v.vdev.id);
        Ok(())
    }
}

pub(crate) fn send_start(v: &mut VdevCtx<'_>, restart: bool) -> Result<(), Error> {
    let params = v.start_params()?;
    let handle = v.vdev.fw_handle;
    if restart {
        v.ctx.device.vdev_restart(handle, &params)?;
        v.vdev.set_state(VdevState::RestartRequested);
    } else {
        v.ctx.device.vdev_start(handle, &params)?;
        v.vdev.set_state(VdevState::StartRequested);
    }
    info!(
        "vdev {} {} on channel {}",
        v.vdev.id,
        if restart { "restarting" } else { "starting" },
        params.channel
    );
    v.vdev.channel = Some(params.channel);
    v.vdev.private_mut()?.vdev_start_failed = false;
    Ok(())
}

pub(crate) fn send_up(v: &mut VdevCtx<'_>, bssid: MacAddr, aid: u16) -> Result<(), Error> {
    v.ctx.device.vdev_up(v.vdev.fw_handle, bssid, aid)?;
    v.vdev.set_state(VdevState::UpRequested);
    Ok(())
}

/// Common stop path: tear down peers, then stop the vdev once their deletions are confirmed.
fn begin_stop<O: VdevMlmeOps + ?Sized>(ops: &O, v: &mut VdevCtx<'_>) -> Result<(), Error> {
    match v.vdev.state() {
        VdevState::Init => return Ok(()),
        state if state.is_stopping() => return Err(Error::InvalidState),
        _ => {}
    }
    v.vdev.set_state(VdevState::StopRequested);
    ops.disconnect_peers(v)?;
    if v.has_deleting_peers() {
        info!("vdev {}: stop waits for peer deletion", v.vdev.id);
        v.vdev.private_mut()?.stop_pending = true;
        return Ok(());
    }
    send_stop(v)
}

fn send_stop(v: &mut VdevCtx<'_>) -> Result<(), Error> {
    v.ctx.device.vdev_stop(v.vdev.fw_handle)?;
    v.vdev.private_mut()?.stop_pending = false;
    Ok(())
}

/// Resumes a stop that was waiting on peer deletions, once none remain.
pub fn continue_pending_stop(v: &mut VdevCtx<'_>) -> Result<(), Error> {
    let pending = v.vdev.private().map_or(false, |p| p.stop_pending);
    if pending && v.vdev.state() == VdevState::StopRequested && !v.has_deleting_peers() {
        send_stop(v)?;
    }
    Ok(())
}

/// Routes a start/restart completion to the mode handler.
pub fn on_start_response(v: &mut VdevCtx<'_>, status: FwStatus) -> Result<(), Error> {
    match v.vdev.state() {
        VdevState::StartRequested | VdevState::RestartRequested => {}
        other => {
            debug!("vdev {}: start response in {:?}", v.vdev.id, other);
            return Err(Error::InvalidState);
        }
    }
    let ops = v.vdev.ops.ops();
    if status.is_ok() {
        v.vdev.set_state(VdevState::Started);
        ops.start_continue(v)
    } else {
        ops.start_failed(v, status)
    }
}

pub fn on_up_response(v: &mut VdevCtx<'_>, status: FwStatus) -> Result<(), Error> {
    if v.vdev.state() != VdevState::UpRequested {
        return Err(Error::InvalidState);
    }
    if !status.is_ok() {
        v.vdev.set_state(VdevState::Started);
        return Err(Error::Firmware(status));
    }
    v.vdev.ops.ops().notify_up_complete(v)
}

pub fn on_stop_response(v: &mut VdevCtx<'_>, status: FwStatus) -> Result<(), Error> {
    if v.vdev.state() != VdevState::StopRequested {
        return Err(Error::InvalidState);
    }
    status.into_result()?;
    v.vdev.ops.ops().stop_continue(v)
}

pub fn on_down_response(v: &mut VdevCtx<'_>, status: FwStatus) -> Result<(), Error> {
    if v.vdev.state() != VdevState::DownRequested {
        return Err(Error::InvalidState);
    }
    status.into_result()?;
    v.vdev.ops.ops().notify_down_complete(v)
}

/// Channel switch announced by the AP or requested locally. The vdev restarts on the new
/// channel with the switch flagged until it is up again.
pub fn switch_channel(v: &mut VdevCtx<'_>, channel: Channel) -> Result<(), Error> {
    let ops = v.vdev.ops;
    if ops == VdevOps::Monitor {
        v.vdev.channel = Some(channel);
    } else {
        v.session_mut()?.channel = channel;
    }
    let private = v.vdev.private_mut()?;
    private.channel_switch_in_progress = true;
    private.cac_required = ops == VdevOps::Ap && channel.is_dfs();
    info!("vdev {} switching to channel {} ({})", v.vdev.id, channel, v.vdev.mac_addr.to_mac_str());
    if ops == VdevOps::Ap {
        // A CAC running for the old channel no longer applies.
        ApOps.dfs_cac_timer_stop(v)?;
    }
    ops.ops().restart(v)
}
