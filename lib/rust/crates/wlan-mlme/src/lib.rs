// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! This crate implements the IEEE Std 802.11-2016 MLME for devices whose firmware offloads the
//! data path but leaves connection management to the host. Each virtual device (vdev) runs in
//! one operating mode, and a vdev taking part in a BSS carries a session for it. The
//! implementation is broadly divided between client and AP roles, with shared vdev, peer and
//! timer infrastructure. See the [`client`] and [`ap`] modules.
//!
//! [`ap`]: crate::ap
//! [`client`]: crate::client

pub mod ap;
pub mod caps;
pub mod client;
pub mod command;
pub mod config;
pub mod context;
pub mod device;
pub mod error;
pub mod handlers;
pub mod indication;
pub mod link_monitor;
pub mod peer;
pub mod session;
pub mod sink;
pub mod timer;
pub mod vdev;

#[cfg(test)]
mod test_utils;

pub use wlan_common as common;

use {
    crate::{
        command::MlmeCommand,
        config::MlmeConfig,
        context::{Context, TimedEvent, TimeoutKind},
        device::{DeviceOps, FwEvent, FwEventKind},
        error::Error,
        handlers::FrameOutcome,
        indication::Indication,
        link_monitor::FailedApList,
        session::Session,
        sink::IndicationSink,
        timer::{EventId, Scheduler},
        vdev::{StopType, Vdev, VdevCtx, VdevId, VdevOps, VdevState},
    },
    anyhow::bail,
    futures::{channel::mpsc, StreamExt},
    log::{debug, info, warn},
    std::collections::HashMap,
};

/// Everything the MLME reacts to, handled one at a time on the main loop.
#[derive(Debug)]
pub enum MlmeMessage {
    // Indicates that the device is being removed and our main loop should exit.
    Stop,
    // A management frame received on a vdev.
    MacFrameRx { vdev_id: VdevId, bytes: Vec<u8> },
    // Completion of an asynchronous firmware command.
    FwEvent(FwEvent),
    // A scheduled event reached its deadline.
    Timeout(EventId),
    Command(MlmeCommand),
}

/// Cloneable way into a running main loop.
#[derive(Clone, Debug)]
pub struct MlmeHandle {
    sink: mpsc::UnboundedSender<MlmeMessage>,
}

impl MlmeHandle {
    pub fn new_channel() -> (Self, mpsc::UnboundedReceiver<MlmeMessage>) {
        let (sink, stream) = mpsc::unbounded();
        (Self { sink }, stream)
    }

    pub fn stop(&self) {
        self.send(MlmeMessage::Stop);
    }

    pub fn queue_command(&self, command: MlmeCommand) {
        self.send(MlmeMessage::Command(command));
    }

    pub fn deliver_frame(&self, vdev_id: VdevId, bytes: Vec<u8>) {
        self.send(MlmeMessage::MacFrameRx { vdev_id, bytes });
    }

    pub fn complete_fw_command(&self, event: FwEvent) {
        self.send(MlmeMessage::FwEvent(event));
    }

    pub fn fire_timer(&self, event_id: EventId) {
        self.send(MlmeMessage::Timeout(event_id));
    }

    fn send(&self, msg: MlmeMessage) {
        if let Err(e) = self.sink.unbounded_send(msg) {
            warn!("MLME main loop is gone, dropping message: {}", e);
        }
    }
}

/// The MLME for one device: every vdev, the session each one carries, and the state shared
/// between them.
pub struct Mlme {
    ctx: Context,
    vdevs: HashMap<VdevId, Vdev>,
    sessions: HashMap<VdevId, Session>,
    failed_aps: FailedApList,
}

impl Mlme {
    pub fn new(
        config: MlmeConfig,
        device: Box<dyn DeviceOps>,
        scheduler: Box<dyn Scheduler>,
        sink: IndicationSink,
    ) -> Self {
        Self {
            ctx: Context::new(config, device, scheduler, sink),
            vdevs: HashMap::new(),
            sessions: HashMap::new(),
            failed_aps: FailedApList::default(),
        }
    }

    pub fn vdev(&self, vdev_id: VdevId) -> Option<&Vdev> {
        self.vdevs.get(&vdev_id)
    }

    pub fn session(&self, vdev_id: VdevId) -> Option<&Session> {
        self.sessions.get(&vdev_id)
    }

    pub fn failed_aps(&self) -> &FailedApList {
        &self.failed_aps
    }

    fn vdev_ctx(&mut self, vdev_id: VdevId) -> Result<VdevCtx<'_>, Error> {
        let vdev = self.vdevs.get_mut(&vdev_id).ok_or(Error::NoSuchVdev(vdev_id))?;
        Ok(VdevCtx { ctx: &mut self.ctx, vdev, session: self.sessions.get_mut(&vdev_id) })
    }

    pub fn handle_message(&mut self, msg: MlmeMessage) -> Result<(), Error> {
        match msg {
            MlmeMessage::Stop => Ok(()),
            MlmeMessage::MacFrameRx { vdev_id, bytes } => {
                let outcome = self.handle_mac_frame_rx(vdev_id, &bytes[..])?;
                if let FrameOutcome::Dropped(reason) = outcome {
                    debug!("vdev {}: dropped frame: {}", vdev_id, reason);
                }
                Ok(())
            }
            MlmeMessage::FwEvent(event) => self.handle_fw_event(event),
            MlmeMessage::Timeout(event_id) => self.handle_timeout(event_id),
            MlmeMessage::Command(command) => self.handle_command(command),
        }
    }

    pub fn handle_command(&mut self, command: MlmeCommand) -> Result<(), Error> {
        match command {
            MlmeCommand::CreateVdev { vdev_id, opmode, mac_addr } => {
                if self.vdevs.contains_key(&vdev_id) {
                    return Err(Error::InvalidState);
                }
                let handle = self.ctx.device.vdev_create(vdev_id, opmode, mac_addr)?;
                let mut vdev = Vdev::new(vdev_id, opmode, mac_addr, handle);
                if let Err(e) = vdev.ext_create(self.ctx.config.disconnect_ie_capacity) {
                    self.ctx.device.vdev_delete(handle)?;
                    return Err(e);
                }
                info!("vdev {} created in {:?} mode", vdev_id, opmode);
                self.vdevs.insert(vdev_id, vdev);
                Ok(())
            }
            MlmeCommand::StopVdev { vdev_id } => self.stop_vdev(vdev_id, StopType::Normal),
            MlmeCommand::DeleteVdev { vdev_id } => self.stop_vdev(vdev_id, StopType::Delete),
            MlmeCommand::StartMonitor { vdev_id, channel } => {
                let mut v = self.vdev_ctx(vdev_id)?;
                if v.vdev.ops != VdevOps::Monitor {
                    return Err(Error::NotSupported("monitor start on a non-monitor vdev"));
                }
                if v.vdev.state() != VdevState::Init {
                    return Err(Error::InvalidState);
                }
                v.vdev.channel = Some(channel);
                v.vdev.ops.ops().start(&mut v)
            }
            MlmeCommand::Join { vdev_id, req } => {
                let vdev = self.vdevs.get(&vdev_id).ok_or(Error::NoSuchVdev(vdev_id))?;
                let session = client::prepare_join(
                    &self.ctx.config,
                    vdev,
                    self.sessions.get(&vdev_id),
                    &self.failed_aps,
                    req,
                )?;
                if let Some(old) = self.sessions.insert(vdev_id, session) {
                    release_session(&mut self.ctx, old);
                }
                client::join(&mut self.vdev_ctx(vdev_id)?)
            }
            MlmeCommand::Authenticate { vdev_id, req } => {
                client::authenticate(&mut self.vdev_ctx(vdev_id)?, req)
            }
            MlmeCommand::Associate { vdev_id, req } => {
                client::associate(&mut self.vdev_ctx(vdev_id)?, req)
            }
            MlmeCommand::Reassociate { vdev_id, req } => {
                client::reassociate(&mut self.vdev_ctx(vdev_id)?, req)
            }
            MlmeCommand::Deauthenticate { vdev_id, req } => {
                let mut v = self.vdev_ctx(vdev_id)?;
                match v.vdev.ops {
                    VdevOps::Sta => client::deauthenticate(&mut v, req),
                    VdevOps::Ap => ap::disconnect_client(&mut v, req, false),
                    VdevOps::Monitor => Err(Error::NotSupported("deauthenticate on monitor")),
                }
            }
            MlmeCommand::Disassociate { vdev_id, req } => {
                let mut v = self.vdev_ctx(vdev_id)?;
                match v.vdev.ops {
                    VdevOps::Sta => client::disassociate(&mut v, req),
                    VdevOps::Ap => ap::disconnect_client(&mut v, req, true),
                    VdevOps::Monitor => Err(Error::NotSupported("disassociate on monitor")),
                }
            }
            MlmeCommand::StartBss { vdev_id, req } => {
                let vdev = self.vdevs.get(&vdev_id).ok_or(Error::NoSuchVdev(vdev_id))?;
                if self.sessions.contains_key(&vdev_id) {
                    return Err(Error::InvalidState);
                }
                let session = ap::new_bss_session(&self.ctx.config, vdev, req)?;
                self.sessions.insert(vdev_id, session);
                ap::start_bss(&mut self.vdev_ctx(vdev_id)?)
            }
            MlmeCommand::StopBss { vdev_id } => ap::stop_bss(&mut self.vdev_ctx(vdev_id)?),
            MlmeCommand::UpdateBeacon { vdev_id, op } => {
                ap::update_beacon(&mut self.vdev_ctx(vdev_id)?, op)
            }
            MlmeCommand::SwitchChannel { vdev_id, channel } => {
                vdev::switch_channel(&mut self.vdev_ctx(vdev_id)?, channel)
            }
        }
    }

    fn stop_vdev(&mut self, vdev_id: VdevId, stop_type: StopType) -> Result<(), Error> {
        let mut v = self.vdev_ctx(vdev_id)?;
        v.vdev.private_mut()?.stop_type = stop_type;
        let state = v.vdev.state();
        if state.is_stopping() {
            // The pending stop picks up the new stop type.
            return Ok(());
        }
        if state != VdevState::Init {
            return v.vdev.ops.ops().stop(&mut v);
        }
        // Nothing is running in firmware, so there is nothing to wait for.
        let handle = v.vdev.fw_handle;
        if let Some(session) = self.sessions.remove(&vdev_id) {
            release_session(&mut self.ctx, session);
        }
        match stop_type {
            StopType::Normal => self.ctx.indicate(Indication::VdevStopConfirm { vdev_id }),
            StopType::Delete => self.ctx.device.vdev_delete(handle)?,
        }
        Ok(())
    }

    pub fn handle_mac_frame_rx(
        &mut self,
        vdev_id: VdevId,
        bytes: &[u8],
    ) -> Result<FrameOutcome, Error> {
        handlers::handle_mgmt_frame(&mut self.vdev_ctx(vdev_id)?, bytes)
    }

    pub fn handle_fw_event(&mut self, event: FwEvent) -> Result<(), Error> {
        let FwEvent { vdev_id, kind, status } = event;
        match kind {
            FwEventKind::VdevStarted | FwEventKind::VdevRestarted => {
                let mut v = self.vdev_ctx(vdev_id)?;
                let result = vdev::on_start_response(&mut v, status);
                v.ctx.indicate(Indication::VdevStartConfirm { vdev_id, status });
                result
            }
            FwEventKind::VdevUp => vdev::on_up_response(&mut self.vdev_ctx(vdev_id)?, status),
            FwEventKind::VdevStopped => {
                vdev::on_stop_response(&mut self.vdev_ctx(vdev_id)?, status)
            }
            FwEventKind::VdevDown => {
                let mut v = self.vdev_ctx(vdev_id)?;
                vdev::on_down_response(&mut v, status)?;
                let stop_type = v.vdev.private()?.stop_type;
                let handle = v.vdev.fw_handle;
                if let Some(session) = self.sessions.remove(&vdev_id) {
                    release_session(&mut self.ctx, session);
                }
                self.ctx.indicate(Indication::VdevStopConfirm { vdev_id });
                if stop_type == StopType::Delete {
                    self.ctx.device.vdev_delete(handle)?;
                }
                Ok(())
            }
            FwEventKind::VdevDeleted => {
                status.into_result()?;
                let mut vdev = self.vdevs.remove(&vdev_id).ok_or(Error::NoSuchVdev(vdev_id))?;
                if let Some(session) = self.sessions.remove(&vdev_id) {
                    release_session(&mut self.ctx, session);
                }
                vdev.unregister();
                if vdev.has_private() {
                    let mut cac_timer = vdev.private_mut()?.cac_timer.take();
                    self.ctx.cancel(&mut cac_timer);
                    vdev.ext_destroy()?;
                }
                info!("vdev {} deleted", vdev_id);
                self.ctx.indicate(Indication::VdevDeleteConfirm { vdev_id });
                Ok(())
            }
            FwEventKind::PeerCreated { addr } => {
                ap::on_peer_created(&mut self.vdev_ctx(vdev_id)?, addr, status)
            }
            FwEventKind::PeerDeleted { addr } => {
                let mut v = self.vdev_ctx(vdev_id)?;
                let handle = v.vdev.fw_handle;
                let session = v.session.as_deref_mut().ok_or(Error::NoSession(vdev_id))?;
                peer::deletion::on_peer_deleted(v.ctx, handle, session, addr, status)?;
                vdev::continue_pending_stop(&mut v)
            }
            FwEventKind::BssAdded => client::on_bss_added(&mut self.vdev_ctx(vdev_id)?, status),
            FwEventKind::BssDeleted => {
                let mut v = self.vdev_ctx(vdev_id)?;
                let handle = v.vdev.fw_handle;
                let session = v.session.as_deref_mut().ok_or(Error::NoSession(vdev_id))?;
                peer::deletion::on_bss_deleted(v.ctx, handle, session, status)?;
                vdev::continue_pending_stop(&mut v)
            }
        }
    }

    /// Runs the handler for an expired timer. Timers cancelled after they fired are ignored.
    pub fn handle_timeout(&mut self, event_id: EventId) -> Result<(), Error> {
        let TimedEvent { vdev_id, kind } = match self.ctx.timer.triggered(&event_id) {
            Some(event) => event,
            None => {
                debug!("ignoring cancelled timer {:?}", event_id);
                return Ok(());
            }
        };
        let Mlme { ctx, vdevs, sessions, failed_aps } = self;
        let vdev = vdevs.get_mut(&vdev_id).ok_or(Error::NoSuchVdev(vdev_id))?;
        let mut v = VdevCtx { ctx, vdev, session: sessions.get_mut(&vdev_id) };
        match kind {
            TimeoutKind::Join => client::on_join_timeout(&mut v),
            TimeoutKind::Auth => client::on_auth_timeout(&mut v),
            TimeoutKind::Assoc => client::on_assoc_timeout(&mut v),
            TimeoutKind::Reassoc => client::on_reassoc_timeout(&mut v),
            TimeoutKind::PmfComeback => client::on_comeback_timeout(&mut v),
            TimeoutKind::Heartbeat => {
                let outcome = link_monitor::on_heartbeat_timeout(&mut v, failed_aps)?;
                debug!("vdev {}: heartbeat {:?}", vdev_id, outcome);
                Ok(())
            }
            TimeoutKind::Cac => ap::on_cac_timeout(&mut v),
            TimeoutKind::PreAuth(addr) => ap::on_preauth_timeout(&mut v, addr),
        }
    }
}

/// Drops a session, disarming every timer it still holds.
fn release_session(ctx: &mut Context, mut session: Session) {
    let timers = &mut session.timers;
    for slot in [
        &mut timers.join,
        &mut timers.auth,
        &mut timers.assoc,
        &mut timers.reassoc,
        &mut timers.comeback,
        &mut timers.heartbeat,
    ] {
        ctx.cancel(slot);
    }
    for entry in session.preauth.drain() {
        let mut timer = entry.timer;
        ctx.cancel(&mut timer);
    }
}

pub async fn mlme_main_loop(
    mut mlme: Mlme,
    mut stream: mpsc::UnboundedReceiver<MlmeMessage>,
) -> Result<(), anyhow::Error> {
    loop {
        match stream.next().await {
            Some(MlmeMessage::Stop) => {
                mlme.ctx.timer.cancel_all();
                info!("MLME main loop stopped");
                return Ok(());
            }
            Some(msg) => {
                if let Err(e) = mlme.handle_message(msg) {
                    info!("Failed to handle MLME message: {}", e);
                }
            }
            None => bail!("MLME message stream terminated unexpectedly."),
        }
    }
}
