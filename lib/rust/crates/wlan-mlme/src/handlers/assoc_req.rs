// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    super::FrameOutcome,
    crate::{
        ap::send_assoc_resp,
        caps,
        error::Error,
        peer::{PeerContext, PeerMlmState},
        vdev::VdevCtx,
    },
    log::{debug, info},
    wlan_common::{
        format::MacFmt,
        frame::MgmtFrame,
        ie::Elements,
        mac::{self, CapabilityInfo, ReasonCode, StatusCode},
        mgmt_writer,
    },
};

/// (Re)association request reaching an AP. An authenticated client is promoted to a peer with
/// the lowest free AID; the response goes out once firmware has created the station.
pub fn handle_assoc_req(
    v: &mut VdevCtx<'_>,
    frame: &MgmtFrame,
    capabilities: CapabilityInfo,
    listen_interval: u16,
    elements: &Elements,
    reassoc: bool,
) -> Result<FrameOutcome, Error> {
    let vdev_id = v.vdev.id;
    let handle = v.vdev.fw_handle;
    let now = v.ctx.now();
    let session = v.session.as_deref_mut().ok_or(Error::NoSession(vdev_id))?;
    if !session.is_ap() {
        return Ok(FrameOutcome::Dropped("not an AP"));
    }
    let sa = frame.sa();
    if mac::is_group_addr(&sa) {
        return Ok(FrameOutcome::Dropped("group source address"));
    }
    if frame.da() != session.bssid || frame.bssid() != session.bssid {
        return Ok(FrameOutcome::Dropped("not addressed to this BSS"));
    }
    if elements.ssid.as_deref() != Some(&session.ssid[..]) {
        return Ok(FrameOutcome::Dropped("SSID mismatch"));
    }

    if let Some(peer) = session.peers.get(&sa) {
        if peer.is_deleting() {
            return Ok(FrameOutcome::Dropped("deletion in progress"));
        }
        if peer.mlm_state() == PeerMlmState::WtAssocCnf {
            debug!("association of {} already in progress", sa.to_mac_str());
            return Ok(FrameOutcome::Dropped("association in progress"));
        }
        // The client missed our response; repeat it.
        let aid = peer.aid;
        send_assoc_resp(v, sa, StatusCode::SUCCESS, aid, reassoc)?;
        return Ok(FrameOutcome::Handled);
    }

    let entry = match session.preauth.take(&sa) {
        Some(entry) => entry,
        None => {
            info!("association request from unauthenticated {}", sa.to_mac_str());
            let bssid = session.bssid;
            let mut buf = vec![];
            mgmt_writer::write_deauth_frame(
                &mut buf,
                sa,
                bssid,
                bssid,
                v.ctx.next_seq_ctrl(),
                ReasonCode::INVALID_CLASS2FRAME,
            )?;
            v.ctx.send_mgmt_frame(handle, buf)?;
            return Ok(FrameOutcome::Dropped("not authenticated"));
        }
    };
    let mut preauth_timer = entry.timer;
    v.ctx.cancel(&mut preauth_timer);

    let aid = match session.peers.alloc_aid() {
        Some(aid) => aid,
        None => {
            info!("no AID left for {}", sa.to_mac_str());
            send_assoc_resp(v, sa, StatusCode::DENIED_NO_MORE_STAS, 0, reassoc)?;
            return Ok(FrameOutcome::Handled);
        }
    };

    let mut peer = PeerContext::new(sa, aid, PeerMlmState::WtAssocCnf);
    peer.capabilities = capabilities;
    peer.listen_interval = listen_interval;
    peer.reassoc_requested = reassoc;
    caps::negotiate(&v.ctx.config.local_caps, capabilities, elements).apply_to(&mut peer);
    peer.record_rx(now);
    session.peers.insert(peer)?;
    if let Err(status) = v.ctx.device.peer_create(handle, sa) {
        session.peers.remove(&sa);
        return Err(status.into());
    }
    debug!("peer {} created with AID {}, awaiting firmware", sa.to_mac_str(), aid);
    Ok(FrameOutcome::Handled)
}
