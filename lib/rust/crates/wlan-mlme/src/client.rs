// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Client side connect path: join, authenticate, (re)associate and host initiated
//! disconnects, plus the timeouts and firmware completions that drive them.

use {
    crate::{
        command::{
            AssociateRequest, AuthenticateRequest, DisconnectRequest, JoinRequest,
            ReassociateRequest,
        },
        config::MlmeConfig,
        context::{Context, TimeoutKind},
        device::{FwHandle, FwStatus, LinkState},
        error::Error,
        indication::{ConfirmResult, DisconnectInfo, DisconnectTrigger, Indication},
        link_monitor::{self, FailedApList},
        peer::{trigger_deletion, PeerMlmState},
        session::{MlmState, ReassocContext, SecurityContext, Session, SmeState},
        vdev::{AssocType, StaOps, Vdev, VdevCtx, VdevId, VdevMlmeOps, VdevOps, VdevState},
    },
    log::{debug, info, warn},
    wlan_common::{
        format::MacFmt,
        mac::{self, FrameControl, MacAddr, ReasonCode, StatusCode, AUTH_ALG_OPEN},
        mgmt_writer::{self, FixedFields, StaElements},
    },
};

/// Validates a join request and builds the session it will run in. The vdev must be a client
/// vdev whose previous session, if any, is idle.
pub fn prepare_join(
    config: &MlmeConfig,
    vdev: &Vdev,
    existing: Option<&Session>,
    failed_aps: &FailedApList,
    req: JoinRequest,
) -> Result<Session, Error> {
    if vdev.ops != VdevOps::Sta {
        return Err(Error::NotSupported("join on a non-client vdev"));
    }
    if vdev.state().is_stopping() {
        return Err(Error::InvalidState);
    }
    if let Some(session) = existing {
        if !session.is_client() || session.mlm_state() != MlmState::Idle {
            return Err(Error::InvalidState);
        }
    }
    if failed_aps.contains(&req.bssid) {
        if config.reject_recently_failed_ap {
            warn!("refusing to join {}: link recently lost", req.bssid.to_mac_str());
            return Err(Error::RecentlyFailedAp);
        }
        warn!("joining {} although its link was recently lost", req.bssid.to_mac_str());
    }
    Ok(Session::new_client(req.bssid, req.ssid, req.channel, req.beacon_interval, config))
}

/// Waits for a beacon from the session's BSS, starting the vdev on its channel first.
pub fn join(v: &mut VdevCtx<'_>) -> Result<(), Error> {
    let vdev_id = v.vdev.id;
    let session = v.session.as_deref_mut().ok_or(Error::NoSession(vdev_id))?;
    session.set_mlm_state(MlmState::WtJoinBeacon);
    session.set_sme_state(SmeState::Joining);
    let channel = session.channel;
    let timeout = v.ctx.config.join_timeout();
    v.ctx.cancel(&mut session.timers.join);
    session.timers.join = Some(v.ctx.schedule(vdev_id, TimeoutKind::Join, timeout));
    info!("joining {} on channel {}", session.bssid.to_mac_str(), channel);

    match v.vdev.state() {
        VdevState::Init => StaOps.start(v),
        VdevState::Started | VdevState::Up if v.vdev.channel != Some(channel) => {
            StaOps.restart(v)
        }
        _ => Ok(()),
    }
}

pub fn on_join_timeout(v: &mut VdevCtx<'_>) -> Result<(), Error> {
    let vdev_id = v.vdev.id;
    let session = v.session.as_deref_mut().ok_or(Error::NoSession(vdev_id))?;
    session.timers.join = None;
    if session.mlm_state() != MlmState::WtJoinBeacon {
        return Ok(());
    }
    let bssid = session.bssid;
    session.reset_to_idle();
    v.vdev.private_mut()?.connection_fail = true;
    warn!("no beacon from {}, join failed", bssid.to_mac_str());
    v.ctx.indicate(Indication::JoinConfirm { vdev_id, bssid, result: ConfirmResult::Timeout });
    Ok(())
}

/// Open System authentication with the joined BSS.
pub fn authenticate(v: &mut VdevCtx<'_>, req: AuthenticateRequest) -> Result<(), Error> {
    if req.auth_alg_num != AUTH_ALG_OPEN {
        return Err(Error::NotSupported("authentication algorithm"));
    }
    let vdev_id = v.vdev.id;
    let handle = v.vdev.fw_handle;
    let sta_addr = v.vdev.mac_addr;
    let session = v.session.as_deref_mut().ok_or(Error::NoSession(vdev_id))?;
    if session.mlm_state() != MlmState::Joined {
        return Err(Error::InvalidState);
    }
    if req.peer != session.bssid {
        return Err(Error::NoSuchPeer);
    }

    let fixed = FixedFields::sent_from_client(
        FrameControl::mgmt(mac::MGMT_SUBTYPE_AUTH),
        session.bssid,
        sta_addr,
        v.ctx.next_seq_ctrl(),
    );
    let mut buf = vec![];
    mgmt_writer::write_auth_frame(&mut buf, fixed, AUTH_ALG_OPEN, 1, StatusCode::SUCCESS)?;
    v.ctx.send_mgmt_frame(handle, buf)?;

    session.set_mlm_state(MlmState::WtAuthFrame2);
    session.set_sme_state(SmeState::Authenticating);
    let timeout = v.ctx.config.auth_timeout();
    v.ctx.cancel(&mut session.timers.auth);
    session.timers.auth = Some(v.ctx.schedule(vdev_id, TimeoutKind::Auth, timeout));
    Ok(())
}

pub fn on_auth_timeout(v: &mut VdevCtx<'_>) -> Result<(), Error> {
    let vdev_id = v.vdev.id;
    let session = v.session.as_deref_mut().ok_or(Error::NoSession(vdev_id))?;
    session.timers.auth = None;
    if session.mlm_state() != MlmState::WtAuthFrame2 {
        return Ok(());
    }
    session.set_mlm_state(MlmState::Joined);
    session.set_sme_state(SmeState::Joining);
    info!("authentication with {} timed out", session.bssid.to_mac_str());
    v.ctx.indicate(Indication::AuthenticateConfirm {
        vdev_id,
        peer: session.bssid,
        result: ConfirmResult::Timeout,
    });
    Ok(())
}

pub fn associate(v: &mut VdevCtx<'_>, req: AssociateRequest) -> Result<(), Error> {
    let vdev_id = v.vdev.id;
    let handle = v.vdev.fw_handle;
    let sta_addr = v.vdev.mac_addr;
    let session = v.session.as_deref_mut().ok_or(Error::NoSession(vdev_id))?;
    if session.mlm_state() != MlmState::Authenticated {
        return Err(Error::InvalidState);
    }
    if req.peer != session.bssid {
        return Err(Error::NoSuchPeer);
    }

    session.security =
        SecurityContext { rsne: req.rsne.clone(), keys: req.keys.clone(), pmf: req.pmf };
    v.ctx.device.set_link_state(handle, session.bssid, LinkState::PreAssoc)?;
    send_assoc_req(v.ctx, handle, sta_addr, session)?;
    session.pending_assoc = Some(req);
    session.comeback_retries = 0;
    session.set_mlm_state(MlmState::WtAssocRsp);
    session.set_sme_state(SmeState::Associating);
    let timeout = v.ctx.config.assoc_timeout();
    v.ctx.cancel(&mut session.timers.assoc);
    session.timers.assoc = Some(v.ctx.schedule(vdev_id, TimeoutKind::Assoc, timeout));
    v.vdev.private_mut()?.assoc_type = AssocType::Initial;
    Ok(())
}

/// Association request to the session's BSS, or a reassociation request to the target when a
/// reassociation is under way.
fn send_assoc_req(
    ctx: &mut Context,
    handle: FwHandle,
    sta_addr: MacAddr,
    session: &Session,
) -> Result<(), Error> {
    let seq_ctrl = ctx.next_seq_ctrl();
    let mut capabilities = session.capabilities;
    capabilities.set_privacy(session.security.rsne.is_some());
    let local = &ctx.config.local_caps;
    let he_cap = if session.flags.he { local.he_capabilities() } else { None };
    let elements = StaElements {
        ssid: &session.ssid[..],
        rates: &local.rates[..],
        ht_cap: if session.flags.ht { local.ht_capabilities() } else { None },
        vht_cap: if session.flags.vht { local.vht_capabilities() } else { None },
        he_cap: he_cap.as_deref(),
        rsne: session.security.rsne.as_deref(),
    };
    let listen_interval = ctx.config.listen_interval;

    let mut buf = vec![];
    match session.reassoc {
        Some(reassoc) => {
            let fixed = FixedFields::sent_from_client(
                FrameControl::mgmt(mac::MGMT_SUBTYPE_REASSOC_REQ),
                reassoc.target,
                sta_addr,
                seq_ctrl,
            );
            mgmt_writer::write_reassoc_req_frame(
                &mut buf,
                fixed,
                capabilities,
                listen_interval,
                reassoc.old_bssid,
                &elements,
            )?;
        }
        None => {
            let fixed = FixedFields::sent_from_client(
                FrameControl::mgmt(mac::MGMT_SUBTYPE_ASSOC_REQ),
                session.bssid,
                sta_addr,
                seq_ctrl,
            );
            mgmt_writer::write_assoc_req_frame(
                &mut buf,
                fixed,
                capabilities,
                listen_interval,
                &elements,
            )?;
        }
    }
    ctx.send_mgmt_frame(handle, buf)
}

/// The association attempt is over without a link: back to idle and tell the SME.
pub(crate) fn fail_association(v: &mut VdevCtx<'_>, result: ConfirmResult) -> Result<(), Error> {
    let vdev_id = v.vdev.id;
    let handle = v.vdev.fw_handle;
    let session = v.session.as_deref_mut().ok_or(Error::NoSession(vdev_id))?;
    v.ctx.cancel(&mut session.timers.comeback);
    v.ctx.cancel(&mut session.timers.assoc);
    v.ctx.cancel(&mut session.timers.auth);
    let bssid = session.bssid;
    session.peers.remove(&bssid);
    session.reset_to_idle();
    v.ctx.device.set_link_state(handle, bssid, LinkState::Idle)?;
    v.vdev.private_mut()?.connection_fail = true;
    info!("association with {} failed: {:?}", bssid.to_mac_str(), result);
    v.ctx.indicate(Indication::AssociateConfirm { vdev_id, bssid, aid: None, result });
    Ok(())
}

pub fn on_assoc_timeout(v: &mut VdevCtx<'_>) -> Result<(), Error> {
    let session = v.session_mut()?;
    session.timers.assoc = None;
    if session.mlm_state() != MlmState::WtAssocRsp {
        return Ok(());
    }
    fail_association(v, ConfirmResult::Timeout)
}

/// Whether a deauth or disassoc from the AP ends an attempt that has no peer context yet.
/// Authenticating or associating, before the AP has a peer context.
pub(crate) fn is_connecting(session: &Session) -> bool {
    match session.mlm_state() {
        MlmState::WtAuthFrame2 | MlmState::Authenticated | MlmState::WtAssocRsp => true,
        _ => false,
    }
}

/// The AP turned us away before the association completed. The attempt ends at once instead
/// of waiting for its timer.
pub(crate) fn abandon_attempt(
    v: &mut VdevCtx<'_>,
    reason_code: ReasonCode,
    trigger: DisconnectTrigger,
) -> Result<(), Error> {
    let vdev_id = v.vdev.id;
    let handle = v.vdev.fw_handle;
    let session = v.session.as_deref_mut().ok_or(Error::NoSession(vdev_id))?;
    if !is_connecting(session) {
        return Err(Error::InvalidState);
    }
    let associating = session.mlm_state() == MlmState::WtAssocRsp;
    v.ctx.cancel(&mut session.timers.auth);
    v.ctx.cancel(&mut session.timers.assoc);
    v.ctx.cancel(&mut session.timers.comeback);
    let bssid = session.bssid;
    session.reset_to_idle();
    if associating {
        v.ctx.device.set_link_state(handle, bssid, LinkState::Idle)?;
    }
    v.vdev.private_mut()?.connection_fail = true;
    info!("{} ended the connection attempt, reason {}", bssid.to_mac_str(), reason_code.0);
    v.ctx.indicate(Indication::disconnect(DisconnectInfo {
        vdev_id,
        peer: bssid,
        reason_code,
        trigger,
    }));
    Ok(())
}

/// The AP asked us to come back later: send the request again.
pub fn on_comeback_timeout(v: &mut VdevCtx<'_>) -> Result<(), Error> {
    let vdev_id = v.vdev.id;
    let handle = v.vdev.fw_handle;
    let sta_addr = v.vdev.mac_addr;
    let session = v.session.as_deref_mut().ok_or(Error::NoSession(vdev_id))?;
    session.timers.comeback = None;
    let (kind, timeout) = match session.mlm_state() {
        MlmState::WtAssocRsp => (TimeoutKind::Assoc, v.ctx.config.assoc_timeout()),
        MlmState::WtReassocRsp | MlmState::WtFtReassocRsp => {
            (TimeoutKind::Reassoc, v.ctx.config.reassoc_timeout())
        }
        _ => return Ok(()),
    };
    debug!("association comeback (attempt {})", session.comeback_retries);
    send_assoc_req(v.ctx, handle, sta_addr, session)?;
    let slot = match kind {
        TimeoutKind::Assoc => &mut session.timers.assoc,
        _ => &mut session.timers.reassoc,
    };
    v.ctx.cancel(slot);
    *slot = Some(v.ctx.schedule(vdev_id, kind, timeout));
    Ok(())
}

/// Reassociation (or fast transition) from the current AP to `req.target`. The current link
/// stays up until the target answers.
pub fn reassociate(v: &mut VdevCtx<'_>, req: ReassociateRequest) -> Result<(), Error> {
    let vdev_id = v.vdev.id;
    let handle = v.vdev.fw_handle;
    let sta_addr = v.vdev.mac_addr;
    let session = v.session.as_deref_mut().ok_or(Error::NoSession(vdev_id))?;
    if !session.is_client() || !session.is_link_established() {
        return Err(Error::InvalidState);
    }
    let (peer_state, mlm_state) = if req.ft {
        (PeerMlmState::WtFtReassocRsp, MlmState::WtFtReassocRsp)
    } else {
        (PeerMlmState::WtReassocRsp, MlmState::WtReassocRsp)
    };
    session.ap_peer_mut().ok_or(Error::NoSuchPeer)?.set_mlm_state(peer_state)?;
    v.ctx.cancel(&mut session.timers.heartbeat);
    session.reassoc =
        Some(ReassocContext { target: req.target, old_bssid: session.bssid, ft: req.ft });
    session.comeback_retries = 0;
    session.set_mlm_state(mlm_state);
    session.set_sme_state(SmeState::Associating);
    send_assoc_req(v.ctx, handle, sta_addr, session)?;
    let timeout = v.ctx.config.reassoc_timeout();
    v.ctx.cancel(&mut session.timers.reassoc);
    session.timers.reassoc = Some(v.ctx.schedule(vdev_id, TimeoutKind::Reassoc, timeout));

    StaOps.roam_notify(v, req.target)?;
    if req.ft {
        v.vdev.private_mut()?.assoc_type = AssocType::FtReassoc;
    }
    Ok(())
}

/// No answer from the target; the old link carries on.
pub fn on_reassoc_timeout(v: &mut VdevCtx<'_>) -> Result<(), Error> {
    let vdev_id = v.vdev.id;
    let session = v.session.as_deref_mut().ok_or(Error::NoSession(vdev_id))?;
    session.timers.reassoc = None;
    match session.mlm_state() {
        MlmState::WtReassocRsp | MlmState::WtFtReassocRsp => {}
        _ => return Ok(()),
    }
    v.ctx.cancel(&mut session.timers.comeback);
    let reassoc = session.reassoc.take().ok_or(Error::InvalidState)?;
    if let Some(peer) = session.ap_peer_mut() {
        peer.set_mlm_state(PeerMlmState::LinkEstablished)?;
    }
    session.comeback_retries = 0;
    session.set_mlm_state(MlmState::LinkEstablished);
    session.set_sme_state(SmeState::Associated);
    link_monitor::arm_heartbeat(v.ctx, vdev_id, session);
    info!("reassociation with {} timed out", reassoc.target.to_mac_str());
    v.ctx.indicate(Indication::ReassociateConfirm {
        vdev_id,
        bssid: reassoc.target,
        aid: None,
        result: ConfirmResult::Timeout,
    });
    Ok(())
}

pub fn deauthenticate(v: &mut VdevCtx<'_>, req: DisconnectRequest) -> Result<(), Error> {
    disconnect(v, req, false)
}

pub fn disassociate(v: &mut VdevCtx<'_>, req: DisconnectRequest) -> Result<(), Error> {
    disconnect(v, req, true)
}

fn disconnect(v: &mut VdevCtx<'_>, req: DisconnectRequest, disassoc: bool) -> Result<(), Error> {
    let vdev_id = v.vdev.id;
    let handle = v.vdev.fw_handle;
    let sta_addr = v.vdev.mac_addr;
    v.vdev.set_disconnect_ie(&req.ies[..])?;
    let ies = v.vdev.take_disconnect_ie();
    let session = v.session.as_deref_mut().ok_or(Error::NoSession(vdev_id))?;
    if req.peer != session.bssid {
        return Err(Error::NoSuchPeer);
    }
    let bssid = session.bssid;
    let trigger =
        if disassoc { DisconnectTrigger::HostDisassoc } else { DisconnectTrigger::HostDeauth };

    match session.ap_peer().map(|peer| peer.is_deleting()) {
        Some(true) => {
            debug!("{} already being torn down", bssid.to_mac_str());
            Ok(())
        }
        Some(false) => {
            send_disconnect_frame(v.ctx, handle, bssid, sta_addr, &req, &ies[..], disassoc)?;
            trigger_deletion(v.ctx, vdev_id, handle, session, bssid, req.reason_code, trigger)?;
            Ok(())
        }
        None => {
            // Nothing in firmware yet; abandon the attempt locally.
            let authenticated = match session.mlm_state() {
                MlmState::Idle => return Err(Error::InvalidState),
                MlmState::Authenticated | MlmState::WtAssocRsp => true,
                _ => false,
            };
            if authenticated {
                send_disconnect_frame(v.ctx, handle, bssid, sta_addr, &req, &ies[..], disassoc)?;
            }
            v.ctx.cancel(&mut session.timers.join);
            v.ctx.cancel(&mut session.timers.auth);
            v.ctx.cancel(&mut session.timers.assoc);
            v.ctx.cancel(&mut session.timers.comeback);
            session.reset_to_idle();
            v.ctx.device.set_link_state(handle, bssid, LinkState::Idle)?;
            info!("connection attempt to {} abandoned", bssid.to_mac_str());
            v.ctx.indicate(Indication::disconnect(DisconnectInfo {
                vdev_id,
                peer: bssid,
                reason_code: req.reason_code,
                trigger: DisconnectTrigger::JoinFailure,
            }));
            Ok(())
        }
    }
}

fn send_disconnect_frame(
    ctx: &mut Context,
    handle: FwHandle,
    bssid: MacAddr,
    sta_addr: MacAddr,
    req: &DisconnectRequest,
    ies: &[u8],
    disassoc: bool,
) -> Result<(), Error> {
    let seq_ctrl = ctx.next_seq_ctrl();
    let mut buf = vec![];
    if disassoc {
        mgmt_writer::write_disassoc_frame(
            &mut buf,
            bssid,
            sta_addr,
            bssid,
            seq_ctrl,
            req.reason_code,
        )?;
    } else {
        mgmt_writer::write_deauth_frame(&mut buf, bssid, sta_addr, bssid, seq_ctrl, req.reason_code)?;
    }
    buf.extend_from_slice(ies);
    ctx.send_mgmt_frame(handle, buf)
}

fn confirm(
    vdev_id: VdevId,
    bssid: MacAddr,
    aid: Option<u16>,
    result: ConfirmResult,
    reassoc: bool,
) -> Indication {
    if reassoc {
        Indication::ReassociateConfirm { vdev_id, bssid, aid, result }
    } else {
        Indication::AssociateConfirm { vdev_id, bssid, aid, result }
    }
}

/// Firmware installed the BSS: the link is up.
pub fn on_bss_added(v: &mut VdevCtx<'_>, status: FwStatus) -> Result<(), Error> {
    let vdev_id = v.vdev.id;
    let handle = v.vdev.fw_handle;
    let session = v.session.as_deref_mut().ok_or(Error::NoSession(vdev_id))?;
    if session.mlm_state() != MlmState::WtAddBssRsp {
        return Err(Error::InvalidState);
    }
    let reassoc = session.reassoc.take().is_some();
    let bssid = session.bssid;

    if !status.is_ok() {
        warn!("firmware failed to add BSS {}: {}", bssid.to_mac_str(), status);
        session.peers.remove(&bssid);
        session.reset_to_idle();
        v.ctx.device.set_link_state(handle, bssid, LinkState::Idle)?;
        v.vdev.private_mut()?.connection_fail = true;
        let result = ConfirmResult::Refused(StatusCode::REFUSED_REASON_UNSPECIFIED);
        v.ctx.indicate(confirm(vdev_id, bssid, None, result, reassoc));
        return Ok(());
    }

    let peer = session.ap_peer_mut().ok_or(Error::NoSuchPeer)?;
    peer.set_mlm_state(PeerMlmState::LinkEstablished)?;
    let aid = peer.aid;
    session.set_mlm_state(MlmState::LinkEstablished);
    session.set_sme_state(SmeState::Associated);
    link_monitor::arm_heartbeat(v.ctx, vdev_id, session);
    StaOps.up(v)?;
    info!("link to {} established (AID {})", bssid.to_mac_str(), aid);
    v.ctx.indicate(confirm(vdev_id, bssid, Some(aid), ConfirmResult::Success, reassoc));
    Ok(())
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{device::FwCommand, handlers::FrameOutcome, session::Role, test_utils::*},
        wlan_common::{
            assert_variant,
            channel::{Cbw, Channel},
            frame::MgmtBody,
            ie::TimeoutInterval,
            mac::{ReasonCode, AUTH_ALG_SHARED_KEY},
            test_utils::{fake_frames::*, *},
            TimeUnit,
        },
    };

    const RSNE: &[u8] = &[1, 0, 0, 0x0f, 0xac, 4, 1, 0, 0, 0x0f, 0xac, 4, 1, 0, 0, 0x0f, 0xac, 2];

    fn join_req(bssid: MacAddr) -> JoinRequest {
        JoinRequest {
            bssid,
            ssid: SSID.to_vec(),
            channel: Channel::new(6, Cbw::Cbw20),
            beacon_interval: TimeUnit::DEFAULT_BEACON_INTERVAL,
        }
    }

    fn in_state(mut h: Harness, state: MlmState) -> Harness {
        h.session_mut().set_mlm_state(state);
        h
    }

    fn assoc_req() -> AssociateRequest {
        AssociateRequest { peer: AP_ADDR, ..Default::default() }
    }

    fn deauth_req(peer: MacAddr, ies: Vec<u8>) -> DisconnectRequest {
        DisconnectRequest { peer, reason_code: ReasonCode::LEAVING_NETWORK_DEAUTH, ies }
    }

    #[test]
    fn join_starts_vdev_and_waits_for_beacon() {
        let mut h = Harness::client();
        join(&mut h.v()).expect("join");
        assert_eq!(h.session().mlm_state(), MlmState::WtJoinBeacon);
        assert_eq!(h.vdev.state(), VdevState::StartRequested);
        assert_eq!(h.scheduler.scheduled_count(), 1);
        assert_variant!(&h.device.commands()[..], [FwCommand::VdevStart(params)] => {
            assert_eq!(params.bssid, AP_ADDR);
            assert_eq!(params.channel.primary, 6);
        });

        let beacon = fake_beacon(&FakeBeacon { bssid: AP_ADDR, ssid: SSID, channel: 6, ..Default::default() });
        assert_eq!(h.rx(&beacon[..]), FrameOutcome::Handled);
        assert_eq!(h.session().mlm_state(), MlmState::Joined);
        assert_eq!(h.scheduler.scheduled_count(), 0);
        assert_eq!(
            h.next_indication(),
            Some(Indication::JoinConfirm { vdev_id: CLIENT_VDEV, bssid: AP_ADDR, result: ConfirmResult::Success })
        );
    }

    #[test]
    fn join_times_out() {
        let mut h = Harness::client();
        join(&mut h.v()).expect("join");
        on_join_timeout(&mut h.v()).expect("timeout");
        assert_eq!(h.session().mlm_state(), MlmState::Idle);
        assert!(h.vdev.private().expect("private").connection_fail);
        assert_eq!(
            h.next_indication(),
            Some(Indication::JoinConfirm { vdev_id: CLIENT_VDEV, bssid: AP_ADDR, result: ConfirmResult::Timeout })
        );
        // Late timer after the session moved on.
        on_join_timeout(&mut h.v()).expect("stale timeout");
        assert_eq!(h.next_indication(), None);
    }

    #[test]
    fn prepare_join_checks() {
        let h = Harness::client();
        let mut failed = FailedApList::default();
        let session = prepare_join(&h.ctx.config, &h.vdev, h.session.as_ref(), &failed, join_req(OTHER_AP_ADDR))
            .expect("join allowed");
        assert_eq!(session.role, Role::Client);
        assert_eq!(session.bssid, OTHER_AP_ADDR);

        failed.record(OTHER_AP_ADDR);
        assert!(prepare_join(&h.ctx.config, &h.vdev, None, &failed, join_req(OTHER_AP_ADDR)).is_ok());
        let strict = MlmeConfig { reject_recently_failed_ap: true, ..Default::default() };
        assert!(matches!(
            prepare_join(&strict, &h.vdev, None, &failed, join_req(OTHER_AP_ADDR)),
            Err(Error::RecentlyFailedAp)
        ));

        let busy = in_state(Harness::client(), MlmState::Joined);
        assert!(matches!(
            prepare_join(&busy.ctx.config, &busy.vdev, busy.session.as_ref(), &failed, join_req(AP_ADDR)),
            Err(Error::InvalidState)
        ));

        let ap = Harness::ap();
        assert!(matches!(
            prepare_join(&ap.ctx.config, &ap.vdev, None, &failed, join_req(AP_ADDR)),
            Err(Error::NotSupported(_))
        ));
    }

    #[test]
    fn authenticate_sends_open_system_request() {
        let mut h = in_state(Harness::client(), MlmState::Joined);
        authenticate(&mut h.v(), AuthenticateRequest { peer: AP_ADDR, auth_alg_num: AUTH_ALG_OPEN })
            .expect("authenticate");
        let frames = h.device.parsed_frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].da(), AP_ADDR);
        assert_eq!(frames[0].sa(), CLIENT_ADDR);
        assert_variant!(&frames[0].body, MgmtBody::Auth { auth_alg_num: AUTH_ALG_OPEN, auth_txn_seq_num: 1, .. });
        assert_eq!(h.session().mlm_state(), MlmState::WtAuthFrame2);
        assert_eq!(h.scheduler.scheduled_count(), 1);

        on_auth_timeout(&mut h.v()).expect("timeout");
        assert_eq!(h.session().mlm_state(), MlmState::Joined);
        assert_variant!(h.next_indication(), Some(Indication::AuthenticateConfirm {
            result: ConfirmResult::Timeout,
            ..
        }));
    }

    #[test]
    fn authenticate_rejects_bad_requests() {
        let mut h = in_state(Harness::client(), MlmState::Joined);
        let shared = AuthenticateRequest { peer: AP_ADDR, auth_alg_num: AUTH_ALG_SHARED_KEY };
        assert!(matches!(authenticate(&mut h.v(), shared), Err(Error::NotSupported(_))));
        let other = AuthenticateRequest { peer: OTHER_AP_ADDR, auth_alg_num: AUTH_ALG_OPEN };
        assert!(matches!(authenticate(&mut h.v(), other), Err(Error::NoSuchPeer)));

        let mut idle = Harness::client();
        let req = AuthenticateRequest { peer: AP_ADDR, auth_alg_num: AUTH_ALG_OPEN };
        assert!(matches!(authenticate(&mut idle.v(), req), Err(Error::InvalidState)));
        assert!(h.device.frames().is_empty());
    }

    #[test]
    fn associate_then_bss_added_establishes_link() {
        let mut h = in_state(Harness::client(), MlmState::Authenticated);
        h.vdev.set_state(VdevState::Started);
        let req = AssociateRequest { rsne: Some(RSNE.to_vec()), pmf: true, ..assoc_req() };
        associate(&mut h.v(), req).expect("associate");

        assert_eq!(
            h.device.commands(),
            vec![FwCommand::SetLinkState { bssid: AP_ADDR, state: LinkState::PreAssoc }]
        );
        let frames = h.device.parsed_frames();
        assert_eq!(frames.len(), 1);
        assert_variant!(&frames[0].body, MgmtBody::AssocReq { capabilities, listen_interval, elements } => {
            assert!(capabilities.privacy());
            assert_eq!(*listen_interval, 10);
            assert_eq!(elements.ssid, Some(SSID.to_vec()));
            assert_eq!(elements.rsne, Some(RSNE.to_vec()));
        });
        assert_eq!(h.session().mlm_state(), MlmState::WtAssocRsp);
        assert!(h.session().security.pmf);

        h.device.clear();
        h.rx(&FakeAssocResp::success(AP_ADDR, CLIENT_ADDR, 4).build()[..]);
        on_bss_added(&mut h.v(), FwStatus::OK).expect("bss added");
        let session = h.session();
        assert_eq!(session.mlm_state(), MlmState::LinkEstablished);
        assert_eq!(session.sme_state(), SmeState::Associated);
        assert_eq!(session.ap_peer().map(|p| p.mlm_state()), Some(PeerMlmState::LinkEstablished));
        assert!(session.timers.heartbeat.is_some());
        assert_eq!(h.vdev.state(), VdevState::UpRequested);
        assert_eq!(h.device.count_commands(|c| *c == FwCommand::VdevUp { bssid: AP_ADDR, aid: 4 }), 1);
        assert_eq!(
            h.next_indication(),
            Some(Indication::AssociateConfirm {
                vdev_id: CLIENT_VDEV,
                bssid: AP_ADDR,
                aid: Some(4),
                result: ConfirmResult::Success,
            })
        );
    }

    #[test]
    fn bss_add_failure_refuses_association() {
        let mut h = in_state(Harness::client(), MlmState::Authenticated);
        associate(&mut h.v(), assoc_req()).expect("associate");
        h.rx(&FakeAssocResp::success(AP_ADDR, CLIENT_ADDR, 4).build()[..]);
        on_bss_added(&mut h.v(), FwStatus::INTERNAL).expect("handled");
        assert_eq!(h.session().mlm_state(), MlmState::Idle);
        assert!(h.session().peers.is_empty());
        assert_variant!(h.next_indication(), Some(Indication::AssociateConfirm {
            aid: None,
            result: ConfirmResult::Refused(StatusCode::REFUSED_REASON_UNSPECIFIED),
            ..
        }));
        assert!(matches!(on_bss_added(&mut h.v(), FwStatus::OK), Err(Error::InvalidState)));
    }

    #[test]
    fn association_timeout() {
        let mut h = in_state(Harness::client(), MlmState::Authenticated);
        associate(&mut h.v(), assoc_req()).expect("associate");
        h.scheduler.advance(h.ctx.config.assoc_timeout());
        on_assoc_timeout(&mut h.v()).expect("timeout");
        assert_eq!(h.session().mlm_state(), MlmState::Idle);
        assert_eq!(h.session().pending_assoc, None);
        assert_eq!(h.scheduler.scheduled_count(), 0);
        assert_variant!(h.next_indication(), Some(Indication::AssociateConfirm {
            result: ConfirmResult::Timeout,
            ..
        }));
    }

    #[test]
    fn comeback_resends_request() {
        let mut h = in_state(Harness::client(), MlmState::Authenticated);
        associate(&mut h.v(), AssociateRequest { pmf: true, ..assoc_req() }).expect("associate");
        let resp = FakeAssocResp {
            status: StatusCode::REFUSED_TEMPORARILY,
            raw_aid: 0,
            timeout_interval: Some(TimeoutInterval { interval_type: 3, value: 100 }),
            ..FakeAssocResp::success(AP_ADDR, CLIENT_ADDR, 0)
        };
        h.rx(&resp.build()[..]);
        assert_eq!(h.session().timers.assoc, None);

        on_comeback_timeout(&mut h.v()).expect("comeback");
        let frames = h.device.parsed_frames();
        assert_eq!(frames.len(), 2);
        assert_variant!(&frames[1].body, MgmtBody::AssocReq { .. });
        assert!(h.session().timers.assoc.is_some());
        assert_eq!(h.session().timers.comeback, None);
        assert_eq!(h.session().mlm_state(), MlmState::WtAssocRsp);
    }

    #[test]
    fn reassociation_request_and_timeout() {
        let mut h = Harness::client().with_associated_ap();
        let session = h.session.as_mut().expect("session");
        link_monitor::arm_heartbeat(&mut h.ctx, CLIENT_VDEV, session);
        reassociate(&mut h.v(), ReassociateRequest { target: OTHER_AP_ADDR, ft: false })
            .expect("reassociate");

        let frames = h.device.parsed_frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].da(), OTHER_AP_ADDR);
        assert_variant!(&frames[0].body, MgmtBody::ReassocReq { current_ap: AP_ADDR, .. });
        assert_eq!(h.session().mlm_state(), MlmState::WtReassocRsp);
        assert_eq!(h.session().ap_peer().map(|p| p.mlm_state()), Some(PeerMlmState::WtReassocRsp));
        assert_eq!(h.session().timers.heartbeat, None);
        assert_eq!(h.vdev.private().expect("private").assoc_type, AssocType::Reassoc);

        on_reassoc_timeout(&mut h.v()).expect("timeout");
        let session = h.session();
        assert_eq!(session.mlm_state(), MlmState::LinkEstablished);
        assert_eq!(session.bssid, AP_ADDR);
        assert_eq!(session.reassoc, None);
        assert!(session.timers.heartbeat.is_some());
        assert_eq!(
            h.next_indication(),
            Some(Indication::ReassociateConfirm {
                vdev_id: CLIENT_VDEV,
                bssid: OTHER_AP_ADDR,
                aid: None,
                result: ConfirmResult::Timeout,
            })
        );
    }

    #[test]
    fn fast_transition_to_new_bss() {
        let mut h = Harness::client().with_associated_ap();
        reassociate(&mut h.v(), ReassociateRequest { target: OTHER_AP_ADDR, ft: true })
            .expect("reassociate");
        assert_eq!(h.session().mlm_state(), MlmState::WtFtReassocRsp);
        assert_eq!(h.vdev.private().expect("private").assoc_type, AssocType::FtReassoc);

        h.rx(&FakeAssocResp::success(OTHER_AP_ADDR, CLIENT_ADDR, 6).reassoc().build()[..]);
        on_bss_added(&mut h.v(), FwStatus::OK).expect("bss added");
        assert_eq!(h.session().bssid, OTHER_AP_ADDR);
        assert_eq!(h.session().mlm_state(), MlmState::LinkEstablished);
        assert_eq!(
            h.next_indication(),
            Some(Indication::ReassociateConfirm {
                vdev_id: CLIENT_VDEV,
                bssid: OTHER_AP_ADDR,
                aid: Some(6),
                result: ConfirmResult::Success,
            })
        );
    }

    #[test]
    fn reassociate_requires_link() {
        let mut h = in_state(Harness::client(), MlmState::Authenticated);
        let req = ReassociateRequest { target: OTHER_AP_ADDR, ft: false };
        assert!(matches!(reassociate(&mut h.v(), req), Err(Error::InvalidState)));
    }

    #[test]
    fn host_deauth_tears_down_once() {
        let mut h = Harness::client().with_associated_ap();
        let ies = vec![0xdd, 2, 0xaa, 0xbb];
        deauthenticate(&mut h.v(), deauth_req(AP_ADDR, ies.clone())).expect("deauth");

        let frames = h.device.frames();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].ends_with(&ies[..]));
        assert_eq!(h.device.commands(), vec![FwCommand::PeerDelete { addr: AP_ADDR }]);
        assert_variant!(h.next_indication(), Some(Indication::DeauthenticateIndication(info)) => {
            assert_eq!(info.reason_code, ReasonCode::LEAVING_NETWORK_DEAUTH);
            assert_eq!(info.trigger, DisconnectTrigger::HostDeauth);
        });
        assert_eq!(h.session().mlm_state(), MlmState::WtDelStaRsp);

        deauthenticate(&mut h.v(), deauth_req(AP_ADDR, vec![])).expect("repeat");
        assert_eq!(h.next_indication(), None);
        assert_eq!(h.device.frames().len(), 1);
        assert!(h.vdev.take_disconnect_ie().is_empty());
    }

    #[test]
    fn host_disassoc_raises_disassoc_indication() {
        let mut h = Harness::client().with_associated_ap();
        let req = DisconnectRequest {
            peer: AP_ADDR,
            reason_code: ReasonCode::LEAVING_NETWORK_DISASSOC,
            ies: vec![],
        };
        disassociate(&mut h.v(), req).expect("disassoc");
        assert_variant!(&h.device.parsed_frames()[0].body, MgmtBody::Disassoc {
            reason_code: ReasonCode::LEAVING_NETWORK_DISASSOC
        });
        assert_variant!(h.next_indication(), Some(Indication::DisassociateIndication(info)) => {
            assert_eq!(info.trigger, DisconnectTrigger::HostDisassoc);
        });
    }

    #[test]
    fn deauth_while_joining_abandons_attempt() {
        let mut h = Harness::client();
        join(&mut h.v()).expect("join");
        h.device.clear();
        deauthenticate(&mut h.v(), deauth_req(AP_ADDR, vec![])).expect("deauth");

        assert!(h.device.frames().is_empty());
        assert_eq!(
            h.device.commands(),
            vec![FwCommand::SetLinkState { bssid: AP_ADDR, state: LinkState::Idle }]
        );
        assert_eq!(h.session().mlm_state(), MlmState::Idle);
        assert_eq!(h.scheduler.scheduled_count(), 0);
        assert_variant!(h.next_indication(), Some(Indication::DeauthenticateIndication(info)) => {
            assert_eq!(info.trigger, DisconnectTrigger::JoinFailure);
        });

        assert!(matches!(
            deauthenticate(&mut h.v(), deauth_req(AP_ADDR, vec![])),
            Err(Error::InvalidState)
        ));
        assert!(matches!(
            deauthenticate(&mut h.v(), deauth_req(OTHER_AP_ADDR, vec![])),
            Err(Error::NoSuchPeer)
        ));
    }
}
