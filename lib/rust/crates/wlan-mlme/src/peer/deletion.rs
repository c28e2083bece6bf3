// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The single teardown path shared by peer-initiated, host-initiated and link-monitor
//! disconnects.

use {
    super::PeerMlmState,
    crate::{
        context::Context,
        device::{FwHandle, FwStatus, LinkState},
        error::Error,
        indication::{DisconnectInfo, DisconnectTrigger, Indication},
        session::{MlmState, Session, SmeState},
        vdev::VdevId,
    },
    log::{debug, info, warn},
    wlan_common::{
        format::MacFmt,
        mac::{MacAddr, ReasonCode},
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeletionOutcome {
    Started,
    AlreadyInProgress,
    NoSuchPeer,
}

/// Starts tearing down `addr`: records why, raises the one upward indication for this
/// teardown and asks firmware to delete the peer. A peer already being deleted is left alone.
pub fn trigger_deletion(
    ctx: &mut Context,
    vdev_id: VdevId,
    handle: FwHandle,
    session: &mut Session,
    addr: MacAddr,
    reason_code: ReasonCode,
    trigger: DisconnectTrigger,
) -> Result<DeletionOutcome, Error> {
    let peer = match session.peers.get_mut(&addr) {
        Some(peer) => peer,
        None => return Ok(DeletionOutcome::NoSuchPeer),
    };
    if peer.is_deleting() {
        debug!("peer {} already being deleted", addr.to_mac_str());
        return Ok(DeletionOutcome::AlreadyInProgress);
    }
    peer.deletion_in_progress = true;
    peer.disassoc_reason = Some(reason_code);
    peer.cleanup_trigger = Some(trigger);
    peer.set_mlm_state(PeerMlmState::WtDelStaRsp)?;

    if session.is_client() {
        ctx.cancel(&mut session.timers.heartbeat);
        ctx.cancel(&mut session.timers.reassoc);
        session.set_mlm_state(MlmState::WtDelStaRsp);
        session.set_sme_state(SmeState::Disconnecting);
    }

    info!(
        "tearing down peer {} (reason {}, {:?})",
        addr.to_mac_str(),
        reason_code.0,
        trigger
    );
    ctx.indicate(Indication::disconnect(DisconnectInfo {
        vdev_id,
        peer: addr,
        reason_code,
        trigger,
    }));
    ctx.device.peer_delete(handle, addr)?;
    Ok(DeletionOutcome::Started)
}

/// Firmware removed the peer. A client still has to delete the BSS before the session is idle.
pub fn on_peer_deleted(
    ctx: &mut Context,
    handle: FwHandle,
    session: &mut Session,
    addr: MacAddr,
    status: FwStatus,
) -> Result<(), Error> {
    if !status.is_ok() {
        warn!("firmware failed to delete peer {}: {}", addr.to_mac_str(), status);
    }
    let is_client = session.is_client();
    let peer = match session.peers.get_mut(&addr) {
        Some(peer) if peer.mlm_state() == PeerMlmState::WtDelStaRsp => peer,
        _ => {
            debug!("peer delete completion for {} ignored", addr.to_mac_str());
            return Ok(());
        }
    };
    if is_client {
        peer.set_mlm_state(PeerMlmState::WtDelBssRsp)?;
        session.set_mlm_state(MlmState::WtDelBssRsp);
        ctx.device.del_bss(handle, addr)?;
    } else {
        session.peers.remove(&addr);
        info!("peer {} removed", addr.to_mac_str());
    }
    Ok(())
}

/// Firmware removed the client's BSS: the AP peer goes away and the session is idle again.
pub fn on_bss_deleted(
    ctx: &mut Context,
    handle: FwHandle,
    session: &mut Session,
    status: FwStatus,
) -> Result<(), Error> {
    if !status.is_ok() {
        warn!("firmware failed to delete BSS {}: {}", session.bssid.to_mac_str(), status);
    }
    if session.mlm_state() != MlmState::WtDelBssRsp {
        return Err(Error::InvalidState);
    }
    let bssid = session.bssid;
    session.peers.remove(&bssid);
    session.reset_to_idle();
    ctx.device.set_link_state(handle, bssid, LinkState::Idle)?;
    info!("left BSS {}", bssid.to_mac_str());
    Ok(())
}
