// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    super::FrameOutcome,
    crate::{
        client,
        error::Error,
        indication::DisconnectTrigger,
        peer::{trigger_deletion, DeletionOutcome},
        vdev::VdevCtx,
    },
    log::{debug, info},
    wlan_common::{
        format::MacFmt,
        frame::MgmtFrame,
        mac::{self, ReasonCode, ReasonRole},
    },
};

pub fn handle_deauth(
    v: &mut VdevCtx<'_>,
    frame: &MgmtFrame,
    reason_code: ReasonCode,
) -> Result<FrameOutcome, Error> {
    handle_disconnect(v, frame, reason_code, false)
}

pub fn handle_disassoc(
    v: &mut VdevCtx<'_>,
    frame: &MgmtFrame,
    reason_code: ReasonCode,
) -> Result<FrameOutcome, Error> {
    handle_disconnect(v, frame, reason_code, true)
}

fn handle_disconnect(
    v: &mut VdevCtx<'_>,
    frame: &MgmtFrame,
    reason_code: ReasonCode,
    disassoc: bool,
) -> Result<FrameOutcome, Error> {
    let (sa, da) = (frame.sa(), frame.da());
    if mac::is_group_addr(&sa) {
        return Ok(FrameOutcome::Dropped("group source address"));
    }
    if mac::is_multicast_not_broadcast(&da) {
        return Ok(FrameOutcome::Dropped("multicast destination"));
    }

    if !mac::is_broadcast(&da) && da != v.vdev.mac_addr {
        return Ok(FrameOutcome::Dropped("addressed to another station"));
    }

    let handle = v.vdev.fw_handle;
    let vdev_id = v.vdev.id;
    let now = v.ctx.now();
    let session = v.session.as_deref_mut().ok_or(Error::NoSession(vdev_id))?;
    let is_client = session.is_client();
    if frame.bssid() != session.bssid {
        return Ok(FrameOutcome::Dropped("other BSS"));
    }
    // Only a client takes a broadcast deauth/disassoc, and only from its own AP.
    if mac::is_broadcast(&da) && !is_client {
        return Ok(FrameOutcome::Dropped("broadcast destination"));
    }
    if is_client && sa != session.bssid {
        return Ok(FrameOutcome::Dropped("not from the AP"));
    }

    let role = if is_client { ReasonRole::Sta } else { ReasonRole::Ap };
    let allowed = if disassoc {
        reason_code.valid_for_disassoc(role)
    } else {
        reason_code.valid_for_deauth(role)
    };
    if !allowed {
        info!(
            "{} from {} with reason {} not accepted",
            if disassoc { "disassoc" } else { "deauth" },
            sa.to_mac_str(),
            reason_code.0
        );
        return Ok(FrameOutcome::Dropped("reason code not allowed"));
    }

    let trigger =
        if disassoc { DisconnectTrigger::PeerDisassoc } else { DisconnectTrigger::PeerDeauth };
    if is_client && !session.peers.contains(&sa) && client::is_connecting(session) {
        client::abandon_attempt(v, reason_code, trigger)?;
        return Ok(FrameOutcome::Handled);
    }

    match session.peers.get(&sa) {
        Some(peer) if peer.is_deleting() => {
            debug!("{} already being deleted, frame is a duplicate", sa.to_mac_str());
            return Ok(FrameOutcome::Dropped("deletion in progress"));
        }
        Some(peer) => peer.record_rx(now),
        None => {
            // A client that only authenticated has no peer context yet.
            if let Some(entry) = session.preauth.take(&sa) {
                let mut timer = entry.timer;
                v.ctx.cancel(&mut timer);
                info!("pre-auth state for {} dropped by {}", sa.to_mac_str(), reason_code.0);
                return Ok(FrameOutcome::Handled);
            }
            return Ok(FrameOutcome::Dropped("unknown peer"));
        }
    }

    match trigger_deletion(v.ctx, vdev_id, handle, session, sa, reason_code, trigger)? {
        DeletionOutcome::Started => Ok(FrameOutcome::Handled),
        DeletionOutcome::AlreadyInProgress => Ok(FrameOutcome::Dropped("deletion in progress")),
        DeletionOutcome::NoSuchPeer => Ok(FrameOutcome::Dropped("unknown peer")),
    }
}
