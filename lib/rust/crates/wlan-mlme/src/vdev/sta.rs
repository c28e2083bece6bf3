// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    super::{send_start, send_up, AssocType, VdevCtx, VdevMlmeOps, VdevState},
    crate::{
        device::FwStatus,
        error::Error,
        indication::DisconnectTrigger,
        peer::trigger_deletion,
    },
    log::{info, warn},
    wlan_common::{
        format::MacFmt,
        mac::{MacAddr, ReasonCode},
        mgmt_writer,
    },
};

/// Client (and P2P client/device) vdev operations.
pub struct StaOps;

impl VdevMlmeOps for StaOps {
    fn start(&self, v: &mut VdevCtx<'_>) -> Result<(), Error> {
        send_start(v, false)
    }

    fn restart(&self, v: &mut VdevCtx<'_>) -> Result<(), Error> {
        send_start(v, true)
    }

    fn start_continue(&self, v: &mut VdevCtx<'_>) -> Result<(), Error> {
        // After a channel switch the link is still there and the vdev goes straight back up.
        // Otherwise it comes up once the association completes.
        let linked = v.session.as_ref().map_or(false, |s| s.is_link_established());
        if linked {
            self.up(v)
        } else {
            self.connection_start(v)
        }
    }

    fn start_failed(&self, v: &mut VdevCtx<'_>, status: FwStatus) -> Result<(), Error> {
        warn!("client vdev {} failed to start: {}", v.vdev.id, status);
        let private = v.vdev.private_mut()?;
        private.vdev_start_failed = true;
        private.connection_fail = true;
        v.vdev.set_state(VdevState::Init);
        Ok(())
    }

    fn up(&self, v: &mut VdevCtx<'_>) -> Result<(), Error> {
        let session = v.session_mut()?;
        let bssid = session.bssid;
        let aid = session.ap_peer().map(|p| p.aid).ok_or(Error::NoSuchPeer)?;
        send_up(v, bssid, aid)
    }

    fn notify_up_complete(&self, v: &mut VdevCtx<'_>) -> Result<(), Error> {
        v.vdev.set_state(VdevState::Up);
        let private = v.vdev.private_mut()?;
        private.channel_switch_in_progress = false;
        private.connection_fail = false;
        info!("client vdev {} up", v.vdev.id);
        Ok(())
    }

    fn roam_notify(&self, v: &mut VdevCtx<'_>, target: MacAddr) -> Result<(), Error> {
        info!("client vdev {} roaming to {}", v.vdev.id, target.to_mac_str());
        let private = v.vdev.private_mut()?;
        if private.assoc_type == AssocType::Initial {
            private.assoc_type = AssocType::Reassoc;
        }
        Ok(())
    }

    /// A client has at most one peer, the AP.
    fn disconnect_peers(&self, v: &mut VdevCtx<'_>) -> Result<(), Error> {
        let seq_ctrl = v.ctx.next_seq_ctrl();
        let handle = v.vdev.fw_handle;
        let vdev_id = v.vdev.id;
        let sta_addr = v.vdev.mac_addr;
        let session = match v.session.as_deref_mut() {
            Some(session) => session,
            None => return Ok(()),
        };
        let bssid = session.bssid;
        match session.ap_peer() {
            Some(peer) if !peer.is_deleting() => {}
            _ => return Ok(()),
        }
        let mut frame = vec![];
        mgmt_writer::write_deauth_frame(
            &mut frame,
            bssid,
            sta_addr,
            bssid,
            seq_ctrl,
            ReasonCode::LEAVING_NETWORK_DEAUTH,
        )?;
        v.ctx.send_mgmt_frame(handle, frame)?;
        trigger_deletion(
            v.ctx,
            vdev_id,
            handle,
            session,
            bssid,
            ReasonCode::LEAVING_NETWORK_DEAUTH,
            DisconnectTrigger::HostDeauth,
        )?;
        Ok(())
    }
}
