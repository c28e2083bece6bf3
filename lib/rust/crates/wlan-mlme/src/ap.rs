// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Access point side of the MLME: BSS start and stop, beacon templates, and the completion of
//! client associations.

use {
    crate::{
        command::{BeaconUpdateOp, DisconnectRequest, StartBssRequest},
        config::MlmeConfig,
        device::FwStatus,
        error::Error,
        indication::{DisconnectTrigger, Indication},
        peer::{trigger_deletion, PeerMlmState},
        session::{Session, SmeState},
        vdev::{ApOps, Vdev, VdevCtx, VdevMlmeOps, VdevOps, VdevState},
    },
    log::{debug, info, warn},
    wlan_common::{
        format::MacFmt,
        mac::{self, CapabilityInfo, FrameControl, MacAddr, StatusCode},
        mgmt_writer::{self, BssElements, FixedFields},
    },
};

/// Capabilities the BSS advertises. Privacy follows the presence of an RSNE.
pub fn bss_capabilities(session: &Session) -> CapabilityInfo {
    let mut capabilities = session.capabilities;
    capabilities.set_privacy(session.security.rsne.is_some());
    capabilities.set_qos(session.flags.qos);
    capabilities
}

pub fn bss_elements<'a>(
    config: &'a MlmeConfig,
    session: &'a Session,
    ssid: &'a [u8],
) -> BssElements<'a> {
    let local = &config.local_caps;
    BssElements {
        ssid,
        rates: &local.rates[..],
        channel: session.channel.primary,
        edca: if session.flags.qos { Some(local.edca_params()) } else { None },
        ht_cap: if session.flags.ht { local.ht_capabilities() } else { None },
        vht_cap: if session.flags.vht { local.vht_capabilities() } else { None },
        rsne: session.security.rsne.as_deref(),
    }
}

/// Beacon template handed to firmware. A hidden BSS beacons an empty SSID.
pub fn build_beacon_template(config: &MlmeConfig, session: &Session) -> Result<Vec<u8>, Error> {
    let ssid = if session.hidden_ssid { &[][..] } else { &session.ssid[..] };
    let mut buf = vec![];
    mgmt_writer::write_beacon_frame(
        &mut buf,
        session.bssid,
        session.beacon_interval.0,
        bss_capabilities(session),
        &bss_elements(config, session, ssid),
    )?;
    Ok(buf)
}

/// Session for a BSS about to start on `vdev`. Only beaconing vdevs can host one.
pub fn new_bss_session(
    config: &MlmeConfig,
    vdev: &Vdev,
    req: StartBssRequest,
) -> Result<Session, Error> {
    if vdev.ops != VdevOps::Ap {
        return Err(Error::NotSupported("BSS on a non-beaconing vdev"));
    }
    if vdev.state() != VdevState::Init {
        return Err(Error::InvalidState);
    }
    let mut session =
        Session::new_ap(vdev.mac_addr, req.ssid, req.channel, req.beacon_interval, config);
    session.hidden_ssid = req.hidden_ssid;
    session.security.rsne = req.rsne;
    Ok(session)
}

pub fn start_bss(v: &mut VdevCtx<'_>) -> Result<(), Error> {
    let session = v.session_mut()?;
    session.set_sme_state(SmeState::BssStarting);
    info!("starting BSS {} on channel {}", session.bssid.to_mac_str(), session.channel);
    ApOps.start(v)
}

pub fn stop_bss(v: &mut VdevCtx<'_>) -> Result<(), Error> {
    info!("stopping BSS on vdev {}", v.vdev.id);
    ApOps.stop(v)
}

pub fn update_beacon(v: &mut VdevCtx<'_>, op: BeaconUpdateOp) -> Result<(), Error> {
    v.vdev.ops.ops().update_beacon(v, op)
}

/// The channel availability check passed; the BSS may go up.
pub fn on_cac_timeout(v: &mut VdevCtx<'_>) -> Result<(), Error> {
    v.vdev.private_mut()?.cac_timer = None;
    if v.vdev.state() != VdevState::Started {
        return Err(Error::InvalidState);
    }
    info!("vdev {}: channel availability check complete", v.vdev.id);
    ApOps.up(v)
}

/// A client authenticated but never associated.
pub fn on_preauth_timeout(v: &mut VdevCtx<'_>, addr: MacAddr) -> Result<(), Error> {
    if let Some(entry) = v.session_mut()?.preauth.take(&addr) {
        info!("pre-auth state for {} expired", entry.addr.to_mac_str());
    }
    Ok(())
}

pub(crate) fn send_assoc_resp(
    v: &mut VdevCtx<'_>,
    addr: MacAddr,
    status_code: StatusCode,
    aid: u16,
    reassoc: bool,
) -> Result<(), Error> {
    let handle = v.vdev.fw_handle;
    let seq_ctrl = v.ctx.next_seq_ctrl();
    let session = v.session.as_deref().ok_or(Error::NoSession(v.vdev.id))?;
    let subtype =
        if reassoc { mac::MGMT_SUBTYPE_REASSOC_RESP } else { mac::MGMT_SUBTYPE_ASSOC_RESP };
    let fixed =
        FixedFields::sent_from_ap(FrameControl::mgmt(subtype), addr, session.bssid, seq_ctrl);
    let mut buf = vec![];
    mgmt_writer::write_assoc_resp_frame(
        &mut buf,
        fixed,
        bss_capabilities(session),
        status_code,
        aid,
        &bss_elements(&v.ctx.config, session, &session.ssid[..]),
        None,
    )?;
    v.ctx.send_mgmt_frame(handle, buf)
}

/// Firmware created the station for an association request: answer the client and install
/// its negotiated capabilities.
pub fn on_peer_created(v: &mut VdevCtx<'_>, addr: MacAddr, status: FwStatus) -> Result<(), Error> {
    let handle = v.vdev.fw_handle;
    let vdev_id = v.vdev.id;
    let session = v.session_mut()?;
    let (aid, reassoc) = match session.peers.get(&addr) {
        Some(peer) if peer.mlm_state() == PeerMlmState::WtAssocCnf => {
            (peer.aid, peer.reassoc_requested)
        }
        _ => return Err(Error::NoSuchPeer),
    };

    if !status.is_ok() {
        warn!("firmware failed to create peer {}: {}", addr.to_mac_str(), status);
        session.peers.remove(&addr);
        return send_assoc_resp(v, addr, StatusCode::REFUSED_REASON_UNSPECIFIED, 0, reassoc);
    }

    send_assoc_resp(v, addr, StatusCode::SUCCESS, aid, reassoc)?;
    let session = v.session.as_deref_mut().ok_or(Error::NoSession(vdev_id))?;
    let pmf = session.security.rsne.is_some();
    let peer = session.peers.get_mut(&addr).ok_or(Error::NoSuchPeer)?;
    peer.set_mlm_state(PeerMlmState::Associated)?;
    peer.record_tx();
    v.ctx.device.peer_update_caps(handle, &peer.caps(pmf))?;
    peer.set_mlm_state(PeerMlmState::LinkEstablished)?;
    info!("client {} associated with AID {}", addr.to_mac_str(), aid);
    v.ctx.indicate(Indication::AssociateIndication { vdev_id, peer: addr, aid, reassoc });
    Ok(())
}

/// Host request to deauthenticate or disassociate one client. A client that only
/// authenticated loses its pre-auth entry; an associated one goes through peer deletion.
pub fn disconnect_client(
    v: &mut VdevCtx<'_>,
    req: DisconnectRequest,
    disassoc: bool,
) -> Result<(), Error> {
    let vdev_id = v.vdev.id;
    let handle = v.vdev.fw_handle;
    v.vdev.set_disconnect_ie(&req.ies[..])?;
    let ies = v.vdev.take_disconnect_ie();
    let session = v.session.as_deref_mut().ok_or(Error::NoSession(vdev_id))?;
    if !session.is_ap() {
        return Err(Error::InvalidState);
    }
    let bssid = session.bssid;
    let addr = req.peer;

    let deleting = session.peers.get(&addr).map(|peer| peer.is_deleting());
    if deleting == Some(true) {
        debug!("{} already being torn down", addr.to_mac_str());
        return Ok(());
    }
    match (session.preauth.take(&addr), deleting) {
        (None, None) => return Err(Error::NoSuchPeer),
        (Some(entry), _) => {
            let mut timer = entry.timer;
            v.ctx.cancel(&mut timer);
        }
        (None, Some(_)) => {}
    }

    let seq_ctrl = v.ctx.next_seq_ctrl();
    let mut buf = vec![];
    if disassoc {
        mgmt_writer::write_disassoc_frame(&mut buf, addr, bssid, bssid, seq_ctrl, req.reason_code)?;
    } else {
        mgmt_writer::write_deauth_frame(&mut buf, addr, bssid, bssid, seq_ctrl, req.reason_code)?;
    }
    buf.extend_from_slice(&ies[..]);
    v.ctx.send_mgmt_frame(handle, buf)?;

    if deleting.is_some() {
        let trigger =
            if disassoc { DisconnectTrigger::HostDisassoc } else { DisconnectTrigger::HostDeauth };
        trigger_deletion(v.ctx, vdev_id, handle, session, addr, req.reason_code, trigger)?;
    } else {
        info!("pre-auth state for {} dropped on request", addr.to_mac_str());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            context::TimeoutKind,
            device::FwCommand,
            peer::{PeerContext, PreAuthEntry},
            test_utils::*,
        },
        std::time::Duration,
        wlan_common::{
            assert_variant,
            frame::{parse_mgmt_frame, MgmtBody},
            mac::AUTH_ALG_OPEN,
            test_utils::*,
        },
    };

    #[test]
    fn beacon_template_hides_ssid() {
        let mut h = Harness::ap();
        let config = h.ctx.config.clone();
        let template = build_beacon_template(&config, h.session()).expect("template");
        let frame = parse_mgmt_frame(&template[..]).expect("beacon");
        assert_eq!(frame.da(), mac::BCAST_ADDR);
        assert_variant!(frame.body, MgmtBody::Beacon(fields) => {
            assert_eq!(fields.elements.ssid, Some(SSID.to_vec()));
            assert_eq!(fields.elements.dsss_channel, Some(6));
            assert!(fields.elements.edca.is_some());
            assert!(!fields.capabilities.privacy());
        });

        let session = h.session_mut();
        session.hidden_ssid = true;
        session.security.rsne = Some(vec![1, 0, 0, 0x0f, 0xac, 4]);
        let template = build_beacon_template(&config, h.session()).expect("template");
        let frame = parse_mgmt_frame(&template[..]).expect("beacon");
        assert_variant!(frame.body, MgmtBody::Beacon(fields) => {
            assert_eq!(fields.elements.ssid, Some(vec![]));
            assert!(fields.elements.rsne.is_some());
            assert!(fields.capabilities.privacy());
        });
    }

    #[test]
    fn bss_needs_beaconing_vdev() {
        let h = Harness::client();
        let req = StartBssRequest {
            ssid: SSID.to_vec(),
            hidden_ssid: false,
            channel: h.session().channel,
            beacon_interval: h.session().beacon_interval,
            rsne: None,
        };
        assert!(matches!(
            new_bss_session(&h.ctx.config, &h.vdev, req),
            Err(Error::NotSupported(_))
        ));
    }

    #[test]
    fn peer_created_completes_association() {
        let mut h = Harness::ap();
        let mut peer = PeerContext::new(CLIENT_ADDR, 1, PeerMlmState::WtAssocCnf);
        peer.rates = vec![0x82, 0x84];
        h.session_mut().peers.insert(peer).expect("insert");

        on_peer_created(&mut h.v(), CLIENT_ADDR, FwStatus::OK).expect("peer created");
        let peer = h.session().peers.get(&CLIENT_ADDR).expect("peer");
        assert_eq!(peer.mlm_state(), PeerMlmState::LinkEstablished);
        assert_variant!(
            h.next_indication(),
            Some(Indication::AssociateIndication { peer: CLIENT_ADDR, aid: 1, reassoc: false, .. })
        );
        assert_variant!(&h.device.commands()[..], [FwCommand::PeerUpdateCaps(caps)] => {
            assert_eq!(caps.aid, 1);
            assert_eq!(caps.rates, vec![0x82, 0x84]);
        });
        let frames = h.device.parsed_frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].da(), CLIENT_ADDR);
        assert_variant!(&frames[0].body, MgmtBody::AssocResp(fields) => {
            assert_eq!(fields.status_code, StatusCode::SUCCESS);
            assert_eq!(fields.aid, 1);
        });
    }

    #[test]
    fn peer_create_failure_refuses_client() {
        let mut h = Harness::ap();
        let mut peer = PeerContext::new(CLIENT_ADDR, 3, PeerMlmState::WtAssocCnf);
        peer.reassoc_requested = true;
        h.session_mut().peers.insert(peer).expect("insert");

        on_peer_created(&mut h.v(), CLIENT_ADDR, FwStatus::NO_RESOURCES).expect("handled");
        assert!(h.session().peers.is_empty());
        assert_eq!(h.next_indication(), None);
        let frames = h.device.parsed_frames();
        assert_variant!(&frames[0].body, MgmtBody::ReassocResp(fields) => {
            assert_eq!(fields.status_code, StatusCode::REFUSED_REASON_UNSPECIFIED);
        });
    }

    #[test]
    fn stray_peer_created() {
        let mut h = Harness::ap();
        assert!(matches!(
            on_peer_created(&mut h.v(), CLIENT_ADDR, FwStatus::OK),
            Err(Error::NoSuchPeer)
        ));
    }

    #[test]
    fn cac_timeout_brings_bss_up() {
        let mut h = Harness::ap();
        h.vdev.set_state(VdevState::Started);
        on_cac_timeout(&mut h.v()).expect("cac timeout");
        assert_eq!(h.vdev.state(), VdevState::UpRequested);
        assert_variant!(&h.device.commands()[..], [
            FwCommand::UpdateBeaconTemplate(_),
            FwCommand::VdevUp { bssid: AP_ADDR, aid: 0 },
        ]);
    }

    fn disconnect_req(peer: MacAddr) -> DisconnectRequest {
        DisconnectRequest {
            peer,
            reason_code: mac::ReasonCode::LEAVING_NETWORK_DEAUTH,
            ies: vec![0xdd, 1, 0x42],
        }
    }

    #[test]
    fn host_deauths_associated_client() {
        let mut h = Harness::ap().with_client(CLIENT_ADDR);
        disconnect_client(&mut h.v(), disconnect_req(CLIENT_ADDR), false).expect("deauth");
        let frames = h.device.frames();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].ends_with(&[0xdd, 1, 0x42]));
        assert_eq!(h.device.commands(), vec![FwCommand::PeerDelete { addr: CLIENT_ADDR }]);
        assert_variant!(h.next_indication(), Some(Indication::DeauthenticateIndication(info)) => {
            assert_eq!(info.peer, CLIENT_ADDR);
            assert_eq!(info.trigger, DisconnectTrigger::HostDeauth);
        });

        disconnect_client(&mut h.v(), disconnect_req(CLIENT_ADDR), true).expect("repeat");
        assert_eq!(h.device.frames().len(), 1);
        assert_eq!(h.next_indication(), None);
    }

    #[test]
    fn host_drops_preauthenticated_client() {
        let mut h = Harness::ap();
        let timer = Some(h.ctx.schedule(AP_VDEV, TimeoutKind::PreAuth(CLIENT_ADDR), Duration::from_secs(5)));
        let created = h.ctx.now();
        h.session_mut()
            .preauth
            .insert(PreAuthEntry { addr: CLIENT_ADDR, auth_alg_num: AUTH_ALG_OPEN, created, timer })
            .expect("insert");
        disconnect_client(&mut h.v(), disconnect_req(CLIENT_ADDR), true).expect("disassoc");
        assert!(h.session().preauth.is_empty());
        assert_eq!(h.scheduler.scheduled_count(), 0);
        assert_variant!(&h.device.parsed_frames()[0].body, MgmtBody::Disassoc { .. });
        assert!(h.device.commands().is_empty());
        assert_eq!(h.next_indication(), None);

        assert!(matches!(
            disconnect_client(&mut h.v(), disconnect_req(CLIENT_ADDR2), false),
            Err(Error::NoSuchPeer)
        ));
    }

    #[test]
    fn repeat_disconnect_keeps_preauth_timer() {
        let mut h = Harness::ap().with_client(CLIENT_ADDR);
        disconnect_client(&mut h.v(), disconnect_req(CLIENT_ADDR), false).expect("deauth");
        assert!(h.session().peers.get(&CLIENT_ADDR).expect("peer").is_deleting());

        // The station authenticates again while its old context is still being deleted.
        let timer = Some(h.ctx.schedule(AP_VDEV, TimeoutKind::PreAuth(CLIENT_ADDR), Duration::from_secs(5)));
        let created = h.ctx.now();
        h.session_mut()
            .preauth
            .insert(PreAuthEntry { addr: CLIENT_ADDR, auth_alg_num: AUTH_ALG_OPEN, created, timer })
            .expect("insert");

        disconnect_client(&mut h.v(), disconnect_req(CLIENT_ADDR), false).expect("repeat");
        assert_eq!(h.session().preauth.get(&CLIENT_ADDR).and_then(|e| e.timer), timer);
        assert_eq!(h.scheduler.scheduled_count(), 1);
        assert_eq!(h.device.frames().len(), 1);

        // The entry still expires on its own.
        h.scheduler.advance(Duration::from_secs(5));
        on_preauth_timeout(&mut h.v(), CLIENT_ADDR).expect("timeout");
        assert!(h.session().preauth.is_empty());
    }

    #[test]
    fn preauth_expiry() {
        let mut h = Harness::ap();
        let timer = Some(h.ctx.schedule(AP_VDEV, TimeoutKind::PreAuth(CLIENT_ADDR), Duration::from_secs(5)));
        let created = h.ctx.now();
        h.session_mut()
            .preauth
            .insert(PreAuthEntry { addr: CLIENT_ADDR, auth_alg_num: AUTH_ALG_OPEN, created, timer })
            .expect("insert");
        on_preauth_timeout(&mut h.v(), CLIENT_ADDR).expect("timeout");
        assert!(h.session().preauth.is_empty());
        on_preauth_timeout(&mut h.v(), CLIENT_ADDR).expect("second timeout");
    }
}
