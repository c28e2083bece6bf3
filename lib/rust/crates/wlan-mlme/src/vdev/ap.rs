// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    super::{send_start, send_up, VdevCtx, VdevMlmeOps, VdevState},
    crate::{
        ap::build_beacon_template,
        command::BeaconUpdateOp,
        context::TimeoutKind,
        error::Error,
        indication::DisconnectTrigger,
        peer::{trigger_deletion, DeletionOutcome},
        session::{MlmState, SmeState},
    },
    log::{debug, info},
    wlan_common::{format::MacFmt, mac::ReasonCode, mgmt_writer},
};

/// Beaconing (AP and P2P GO) vdev operations.
pub struct ApOps;

impl VdevMlmeOps for ApOps {
    fn start(&self, v: &mut VdevCtx<'_>) -> Result<(), Error> {
        self.stop_start_send(v)?;
        let dfs = v.session_mut()?.channel.is_dfs();
        v.vdev.private_mut()?.cac_required = dfs;
        send_start(v, false)
    }

    fn restart(&self, v: &mut VdevCtx<'_>) -> Result<(), Error> {
        self.stop_start_send(v)?;
        send_start(v, true)
    }

    /// Refuses to start while a stop is outstanding.
    fn stop_start_send(&self, v: &mut VdevCtx<'_>) -> Result<(), Error> {
        let stop_pending = v.vdev.private()?.stop_pending;
        if stop_pending || v.vdev.state().is_stopping() {
            info!("vdev {}: start refused, stop outstanding", v.vdev.id);
            return Err(Error::InvalidState);
        }
        Ok(())
    }

    fn start_continue(&self, v: &mut VdevCtx<'_>) -> Result<(), Error> {
        match self.is_newchan_no_cac(v) {
            Ok(()) => self.up(v),
            Err(Error::CacRequired) => {
                let vdev_id = v.vdev.id;
                let duration = v.ctx.config.cac_duration();
                let event_id = v.ctx.schedule(vdev_id, TimeoutKind::Cac, duration);
                v.vdev.private_mut()?.cac_timer = Some(event_id);
                info!("vdev {}: channel availability check for {:?}", vdev_id, duration);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn up(&self, v: &mut VdevCtx<'_>) -> Result<(), Error> {
        let handle = v.vdev.fw_handle;
        let config = v.ctx.config.clone();
        let session = v.session.as_deref_mut().ok_or(Error::NoSession(v.vdev.id))?;
        session.beacon_template = build_beacon_template(&config, session)?;
        let bssid = session.bssid;
        v.ctx.device.update_beacon_template(handle, &session.beacon_template[..])?;
        send_up(v, bssid, 0)
    }

    fn notify_up_complete(&self, v: &mut VdevCtx<'_>) -> Result<(), Error> {
        v.vdev.set_state(VdevState::Up);
        let private = v.vdev.private_mut()?;
        private.channel_switch_in_progress = false;
        private.hidden_ssid_restart_in_progress = false;
        let session = v.session_mut()?;
        session.set_mlm_state(MlmState::BssStarted);
        session.set_sme_state(SmeState::BssActive);
        info!("BSS {} started", session.bssid.to_mac_str());
        Ok(())
    }

    fn update_beacon(&self, v: &mut VdevCtx<'_>, op: BeaconUpdateOp) -> Result<(), Error> {
        match op {
            BeaconUpdateOp::Template => {
                let handle = v.vdev.fw_handle;
                let config = v.ctx.config.clone();
                let session = v.session.as_deref_mut().ok_or(Error::NoSession(v.vdev.id))?;
                session.beacon_template = build_beacon_template(&config, session)?;
                v.ctx.device.update_beacon_template(handle, &session.beacon_template[..])?;
                Ok(())
            }
            BeaconUpdateOp::HiddenSsid(hidden) => {
                let session = v.session_mut()?;
                if session.hidden_ssid == hidden {
                    return Ok(());
                }
                session.hidden_ssid = hidden;
                v.vdev.private_mut()?.hidden_ssid_restart_in_progress = true;
                self.restart(v)
            }
        }
    }

    /// Deauthenticates every client, then starts its deletion.
    fn disconnect_peers(&self, v: &mut VdevCtx<'_>) -> Result<(), Error> {
        let handle = v.vdev.fw_handle;
        let vdev_id = v.vdev.id;
        let session = match v.session.as_deref_mut() {
            Some(session) => session,
            None => return Ok(()),
        };
        for entry in session.preauth.drain() {
            let mut timer = entry.timer;
            v.ctx.cancel(&mut timer);
        }
        let bssid = session.bssid;
        for addr in session.peers.addrs() {
            if session.peers.get(&addr).map_or(true, |p| p.is_deleting()) {
                continue;
            }
            let mut frame = vec![];
            let seq_ctrl = v.ctx.next_seq_ctrl();
            mgmt_writer::write_deauth_frame(
                &mut frame,
                addr,
                bssid,
                bssid,
                seq_ctrl,
                ReasonCode::LEAVING_NETWORK_DEAUTH,
            )?;
            v.ctx.send_mgmt_frame(handle, frame)?;
            let outcome = trigger_deletion(
                v.ctx,
                vdev_id,
                handle,
                session,
                addr,
                ReasonCode::LEAVING_NETWORK_DEAUTH,
                DisconnectTrigger::HostDeauth,
            )?;
            if outcome != DeletionOutcome::Started {
                debug!("peer {} not torn down: {:?}", addr.to_mac_str(), outcome);
            }
        }
        Ok(())
    }

    fn dfs_cac_timer_stop(&self, v: &mut VdevCtx<'_>) -> Result<(), Error> {
        let mut cac_timer = v.vdev.private_mut()?.cac_timer.take();
        v.ctx.cancel(&mut cac_timer);
        Ok(())
    }

    /// One-shot gate: the first call after landing on a channel that needs a CAC fails and
    /// clears the requirement, every later call succeeds until the next switch.
    fn is_newchan_no_cac(&self, v: &mut VdevCtx<'_>) -> Result<(), Error> {
        let private = v.vdev.private_mut()?;
        if private.cac_required {
            private.cac_required = false;
            Err(Error::CacRequired)
        } else {
            Ok(())
        }
    }

    fn stop(&self, v: &mut VdevCtx<'_>) -> Result<(), Error> {
        self.dfs_cac_timer_stop(v)?;
        super::begin_stop(self, v)
    }
}
