// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    super::FrameOutcome,
    crate::{
        caps,
        client,
        context::{Context, TimeoutKind},
        device::{AddBssParams, FwHandle, LinkState, PeerCaps},
        error::Error,
        indication::{ConfirmResult, DisconnectTrigger, Indication},
        link_monitor,
        peer::{trigger_deletion, PeerContext, PeerMlmState},
        session::{BeaconCounters, MlmState, Session, SmeState},
        vdev::VdevCtx,
    },
    log::{debug, info, warn},
    std::time::Duration,
    wlan_common::{
        format::MacFmt,
        frame::{AssocRespFields, MgmtFrame},
        ie::TIMEOUT_INTERVAL_ASSOC_COMEBACK,
        mac::{ReasonCode, StatusCode, MAX_AID},
    },
};

/// (Re)association response reaching a client.
pub fn handle_assoc_resp(
    v: &mut VdevCtx<'_>,
    frame: &MgmtFrame,
    fields: &AssocRespFields,
    reassoc: bool,
) -> Result<FrameOutcome, Error> {
    let vdev_id = v.vdev.id;
    let handle = v.vdev.fw_handle;
    let now = v.ctx.now();
    let session = v.session.as_deref_mut().ok_or(Error::NoSession(vdev_id))?;
    if !session.is_client() {
        return Ok(FrameOutcome::Dropped("not a client"));
    }

    let (expected_bssid, waiting) = if reassoc {
        let waiting = match session.mlm_state() {
            MlmState::WtReassocRsp | MlmState::WtFtReassocRsp => true,
            _ => false,
        };
        (session.reassoc.map(|r| r.target), waiting)
    } else {
        (Some(session.bssid), session.mlm_state() == MlmState::WtAssocRsp)
    };
    if expected_bssid != Some(frame.sa()) || expected_bssid != Some(frame.bssid()) {
        if frame.is_retry() {
            debug!("retransmitted response from {} ignored", frame.sa().to_mac_str());
        }
        return Ok(FrameOutcome::Dropped("not from the target AP"));
    }
    if !waiting {
        if frame.is_retry() {
            debug!("retransmitted response in {:?} ignored", session.mlm_state());
        }
        return Ok(FrameOutcome::Dropped("not awaiting a response"));
    }

    if reassoc {
        v.ctx.cancel(&mut session.timers.reassoc);
    } else {
        v.ctx.cancel(&mut session.timers.assoc);
    }

    let aid = fields.aid;
    if aid > MAX_AID {
        warn!("AP granted out of range AID {}", aid);
        return reject(v, ConfirmResult::InvalidAid(aid));
    }

    let status = fields.status_code;
    if !status.is_success() {
        if status == StatusCode::REFUSED_TEMPORARILY {
            let comeback = fields
                .elements
                .timeout_interval
                .filter(|ti| ti.interval_type == TIMEOUT_INTERVAL_ASSOC_COMEBACK);
            let max_retries = v.ctx.config.pmf_comeback_max_retries;
            if let Some(ti) = comeback {
                if session.security.pmf && session.comeback_retries < max_retries {
                    session.comeback_retries += 1;
                    let after = Duration::from_micros(u64::from(ti.value) * 1024);
                    info!(
                        "association comeback in {:?} (attempt {})",
                        after, session.comeback_retries
                    );
                    v.ctx.cancel(&mut session.timers.comeback);
                    session.timers.comeback =
                        Some(v.ctx.schedule(vdev_id, TimeoutKind::PmfComeback, after));
                    return Ok(FrameOutcome::Handled);
                }
            }
        }
        return reject(v, ConfirmResult::Refused(status));
    }
    if aid == 0 {
        return reject(v, ConfirmResult::InvalidAid(aid));
    }

    let negotiated =
        caps::negotiate(&v.ctx.config.local_caps, fields.capabilities, &fields.elements);
    let pmf = session.security.pmf;
    session.comeback_retries = 0;
    session.pending_assoc = None;

    let reassoc_ctx = session.reassoc;
    match reassoc_ctx {
        None => {
            let bssid = session.bssid;
            session.peers.remove(&bssid);
            let mut peer = PeerContext::new(bssid, aid, PeerMlmState::Associated);
            peer.capabilities = fields.capabilities;
            negotiated.apply_to(&mut peer);
            peer.record_rx(now);
            let caps = peer.caps(pmf);
            session.peers.insert(peer)?;
            info!("associated with {} (AID {})", bssid.to_mac_str(), aid);
            add_bss(v.ctx, handle, session, caps)?;
        }
        Some(ctx) if ctx.target == ctx.old_bssid => {
            let peer = session.ap_peer_mut().ok_or(Error::NoSuchPeer)?;
            peer.aid = aid;
            peer.capabilities = fields.capabilities;
            negotiated.apply_to(peer);
            peer.set_mlm_state(PeerMlmState::LinkEstablished)?;
            peer.record_rx(now);
            v.ctx.device.peer_update_caps(handle, &peer.caps(pmf))?;
            session.reassoc = None;
            session.set_mlm_state(MlmState::LinkEstablished);
            session.set_sme_state(SmeState::Associated);
            link_monitor::arm_heartbeat(v.ctx, vdev_id, session);
            info!("reassociated with {} (AID {})", ctx.target.to_mac_str(), aid);
            v.ctx.indicate(Indication::ReassociateConfirm {
                vdev_id,
                bssid: ctx.target,
                aid: Some(aid),
                result: ConfirmResult::Success,
            });
        }
        Some(ctx) => {
            session.peers.remove(&ctx.old_bssid);
            v.ctx.device.peer_delete(handle, ctx.old_bssid)?;
            session.admitted_tspecs.clear();
            session.bssid = ctx.target;
            session.beacon_counters = BeaconCounters::default();
            let mut peer = PeerContext::new(ctx.target, aid, PeerMlmState::Associated);
            peer.capabilities = fields.capabilities;
            negotiated.apply_to(&mut peer);
            peer.record_rx(now);
            let caps = peer.caps(pmf);
            session.peers.insert(peer)?;
            info!(
                "reassociated from {} to {} (AID {})",
                ctx.old_bssid.to_mac_str(),
                ctx.target.to_mac_str(),
                aid
            );
            add_bss(v.ctx, handle, session, caps)?;
        }
    }
    Ok(FrameOutcome::Handled)
}

fn add_bss(
    ctx: &mut Context,
    handle: FwHandle,
    session: &mut Session,
    caps: PeerCaps,
) -> Result<(), Error> {
    let bssid = session.bssid;
    ctx.device.set_link_state(handle, bssid, LinkState::PostAssoc)?;
    ctx.device.add_bss(
        handle,
        &AddBssParams {
            bssid,
            aid: caps.aid,
            channel: session.channel,
            beacon_interval: session.beacon_interval,
            caps,
        },
    )?;
    session.set_mlm_state(MlmState::WtAddBssRsp);
    Ok(())
}

/// A rejected reassociation costs the old link too.
fn reject(v: &mut VdevCtx<'_>, result: ConfirmResult) -> Result<FrameOutcome, Error> {
    let vdev_id = v.vdev.id;
    let handle = v.vdev.fw_handle;
    let session = v.session.as_deref_mut().ok_or(Error::NoSession(vdev_id))?;
    match session.reassoc.take() {
        Some(ctx) => {
            v.ctx.cancel(&mut session.timers.comeback);
            session.comeback_retries = 0;
            warn!("reassociation with {} rejected: {:?}", ctx.target.to_mac_str(), result);
            v.ctx.indicate(Indication::ReassociateConfirm {
                vdev_id,
                bssid: ctx.target,
                aid: None,
                result,
            });
            trigger_deletion(
                v.ctx,
                vdev_id,
                handle,
                session,
                ctx.old_bssid,
                ReasonCode::UNSPECIFIED_REASON,
                DisconnectTrigger::ReassocReject,
            )?;
        }
        None => client::fail_association(v, result)?,
    }
    Ok(FrameOutcome::Handled)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            config::MlmeConfig,
            device::FwCommand,
            session::{ReassocContext, Tspec},
            test_utils::*,
        },
        wlan_common::{
            assert_variant,
            ie::TimeoutInterval,
            test_utils::{fake_frames::*, *},
        },
    };

    fn associating(mut h: Harness) -> Harness {
        let assoc = h.ctx.schedule(CLIENT_VDEV, TimeoutKind::Assoc, Duration::from_millis(500));
        let session = h.session_mut();
        session.timers.assoc = Some(assoc);
        session.set_mlm_state(MlmState::WtAssocRsp);
        session.set_sme_state(SmeState::Associating);
        h
    }

    fn reassociating(target: [u8; 6]) -> Harness {
        let mut h = Harness::client().with_associated_ap();
        let session = h.session_mut();
        session.ap_peer_mut().expect("peer").set_mlm_state(PeerMlmState::WtReassocRsp).expect("state");
        session.reassoc = Some(ReassocContext { target, old_bssid: AP_ADDR, ft: false });
        session.admitted_tspecs.push(Tspec { tsid: 2, user_priority: 5 });
        session.set_mlm_state(MlmState::WtReassocRsp);
        h
    }

    fn comeback_resp() -> Vec<u8> {
        FakeAssocResp {
            status: StatusCode::REFUSED_TEMPORARILY,
            raw_aid: 0,
            timeout_interval: Some(TimeoutInterval {
                interval_type: TIMEOUT_INTERVAL_ASSOC_COMEBACK,
                value: 200,
            }),
            ..FakeAssocResp::success(AP_ADDR, CLIENT_ADDR, 0)
        }
        .build()
    }

    #[test]
    fn association_succeeds_once() {
        let mut h = associating(Harness::client());
        let resp = FakeAssocResp {
            with_ht: true,
            edca: Some(fake_edca_params()),
            ..FakeAssocResp::success(AP_ADDR, CLIENT_ADDR, 5)
        }
        .build();
        assert_eq!(h.rx(&resp[..]), FrameOutcome::Handled);

        let peer = h.session().ap_peer().expect("AP peer");
        assert_eq!(peer.aid, 5);
        assert_eq!(peer.mlm_state(), PeerMlmState::Associated);
        assert_eq!(peer.ht_cap, Some(fake_ht_capabilities()));
        assert_eq!(peer.vht_cap, None);
        assert!(peer.qos);
        assert_eq!(h.session().mlm_state(), MlmState::WtAddBssRsp);
        assert_eq!(h.scheduler.scheduled_count(), 0);
        assert_variant!(&h.device.commands()[..], [
            FwCommand::SetLinkState { bssid: AP_ADDR, state: LinkState::PostAssoc },
            FwCommand::AddBss(params),
        ] => {
            assert_eq!(params.aid, 5);
            assert_eq!(params.caps.rates, FAKE_RATES.to_vec());
        });

        assert_eq!(h.rx(&resp[..]), FrameOutcome::Dropped("not awaiting a response"));
        assert_eq!(h.device.count_commands(|c| matches!(c, FwCommand::AddBss(_))), 1);
    }

    #[test]
    fn aid_out_of_range_rejected() {
        let mut h = associating(Harness::client());
        let resp = FakeAssocResp { raw_aid: 2008 | 0xC000, ..FakeAssocResp::success(AP_ADDR, CLIENT_ADDR, 0) };
        h.rx(&resp.build()[..]);
        assert_eq!(h.session().mlm_state(), MlmState::Idle);
        assert!(h.session().peers.is_empty());
        assert_eq!(
            h.next_indication(),
            Some(Indication::AssociateConfirm {
                vdev_id: CLIENT_VDEV,
                bssid: AP_ADDR,
                aid: None,
                result: ConfirmResult::InvalidAid(2008),
            })
        );
        assert_eq!(
            h.device.commands(),
            vec![FwCommand::SetLinkState { bssid: AP_ADDR, state: LinkState::Idle }]
        );
        assert!(h.vdev.private().expect("private").connection_fail);
    }

    #[test]
    fn highest_aid_accepted() {
        let mut h = associating(Harness::client());
        let resp = FakeAssocResp::success(AP_ADDR, CLIENT_ADDR, 2007).build();
        assert_eq!(h.rx(&resp[..]), FrameOutcome::Handled);
        let peer = h.session().ap_peer().expect("AP peer");
        assert_eq!(peer.aid, 2007);
        assert_eq!(peer.mlm_state(), PeerMlmState::Associated);
        assert_eq!(h.session().mlm_state(), MlmState::WtAddBssRsp);
        assert_variant!(&h.device.commands()[..], [
            FwCommand::SetLinkState { bssid: AP_ADDR, state: LinkState::PostAssoc },
            FwCommand::AddBss(params),
        ] => assert_eq!(params.aid, 2007));
        assert_eq!(h.next_indication(), None);
    }

    #[test]
    fn zero_aid_rejected() {
        let mut h = associating(Harness::client());
        let resp = FakeAssocResp::success(AP_ADDR, CLIENT_ADDR, 0).build();
        h.rx(&resp[..]);
        assert_variant!(h.next_indication(), Some(Indication::AssociateConfirm {
            aid: None,
            result: ConfirmResult::InvalidAid(0),
            ..
        }));
        assert_eq!(h.session().mlm_state(), MlmState::Idle);
        assert!(h.session().peers.is_empty());
        assert_eq!(h.device.count_commands(|c| matches!(c, FwCommand::AddBss(_))), 0);
    }

    #[test]
    fn out_of_range_aid_wins_over_status() {
        let mut h = associating(Harness::client());
        let resp = FakeAssocResp {
            status: StatusCode::DENIED_NO_MORE_STAS,
            raw_aid: 3000 | 0xC000,
            ..FakeAssocResp::success(AP_ADDR, CLIENT_ADDR, 0)
        };
        h.rx(&resp.build()[..]);
        assert_variant!(h.next_indication(), Some(Indication::AssociateConfirm {
            result: ConfirmResult::InvalidAid(3000),
            ..
        }));
        assert_eq!(h.session().mlm_state(), MlmState::Idle);
        assert_eq!(h.scheduler.scheduled_count(), 0);
    }

    #[test]
    fn refused_association() {
        let mut h = associating(Harness::client());
        let resp = FakeAssocResp {
            status: StatusCode::DENIED_NO_MORE_STAS,
            ..FakeAssocResp::success(AP_ADDR, CLIENT_ADDR, 0)
        };
        h.rx(&resp.build()[..]);
        assert_variant!(h.next_indication(), Some(Indication::AssociateConfirm {
            result: ConfirmResult::Refused(StatusCode::DENIED_NO_MORE_STAS),
            ..
        }));
        assert_eq!(h.session().mlm_state(), MlmState::Idle);
    }

    #[test]
    fn response_from_other_ap_dropped() {
        let mut h = associating(Harness::client());
        let resp = FakeAssocResp::success(OTHER_AP_ADDR, CLIENT_ADDR, 1).build();
        assert_eq!(h.rx(&resp[..]), FrameOutcome::Dropped("not from the target AP"));
        let retry = FakeAssocResp { retry: true, ..FakeAssocResp::success(OTHER_AP_ADDR, CLIENT_ADDR, 1) };
        assert_eq!(h.rx(&retry.build()[..]), FrameOutcome::Dropped("not from the target AP"));
        assert_eq!(h.session().mlm_state(), MlmState::WtAssocRsp);
        assert_eq!(h.scheduler.scheduled_count(), 1);
    }

    #[test]
    fn pmf_comeback_retries_bounded() {
        let config = MlmeConfig { pmf_comeback_max_retries: 1, ..Default::default() };
        let mut h = associating(Harness::client_with_config(config));
        h.session_mut().security.pmf = true;

        assert_eq!(h.rx(&comeback_resp()[..]), FrameOutcome::Handled);
        assert_eq!(h.session().mlm_state(), MlmState::WtAssocRsp);
        assert!(h.session().timers.comeback.is_some());
        assert_eq!(h.session().comeback_retries, 1);
        assert_eq!(h.scheduler.scheduled_count(), 1);
        assert_eq!(h.next_indication(), None);

        h.rx(&comeback_resp()[..]);
        assert_variant!(h.next_indication(), Some(Indication::AssociateConfirm {
            result: ConfirmResult::Refused(StatusCode::REFUSED_TEMPORARILY),
            ..
        }));
        assert_eq!(h.scheduler.scheduled_count(), 0);
    }

    #[test]
    fn comeback_requires_pmf() {
        let mut h = associating(Harness::client());
        h.rx(&comeback_resp()[..]);
        assert_eq!(h.session().mlm_state(), MlmState::Idle);
        assert_eq!(h.session().timers.comeback, None);
    }

    #[test]
    fn same_bss_reassociation_updates_caps_only() {
        let mut h = reassociating(AP_ADDR);
        let resp = FakeAssocResp::success(AP_ADDR, CLIENT_ADDR, 2).reassoc().build();
        assert_eq!(h.rx(&resp[..]), FrameOutcome::Handled);

        assert_variant!(&h.device.commands()[..], [FwCommand::PeerUpdateCaps(caps)] => {
            assert_eq!(caps.aid, 2);
        });
        let session = h.session();
        assert_eq!(session.mlm_state(), MlmState::LinkEstablished);
        assert_eq!(session.admitted_tspecs.len(), 1);
        assert_eq!(session.reassoc, None);
        assert_eq!(session.ap_peer().map(|p| p.mlm_state()), Some(PeerMlmState::LinkEstablished));
        assert!(session.timers.heartbeat.is_some());
        assert_eq!(
            h.next_indication(),
            Some(Indication::ReassociateConfirm {
                vdev_id: CLIENT_VDEV,
                bssid: AP_ADDR,
                aid: Some(2),
                result: ConfirmResult::Success,
            })
        );
    }

    #[test]
    fn new_bss_reassociation_deletes_then_adds() {
        let mut h = reassociating(OTHER_AP_ADDR);
        let resp = FakeAssocResp::success(OTHER_AP_ADDR, CLIENT_ADDR, 3).reassoc().build();
        assert_eq!(h.rx(&resp[..]), FrameOutcome::Handled);

        assert_variant!(&h.device.commands()[..], [
            FwCommand::PeerDelete { addr: AP_ADDR },
            FwCommand::SetLinkState { bssid: OTHER_AP_ADDR, state: LinkState::PostAssoc },
            FwCommand::AddBss(params),
        ] => {
            assert_eq!(params.bssid, OTHER_AP_ADDR);
            assert_eq!(params.aid, 3);
        });
        let session = h.session();
        assert_eq!(session.bssid, OTHER_AP_ADDR);
        assert!(session.admitted_tspecs.is_empty());
        assert!(!session.peers.contains(&AP_ADDR));
        assert_eq!(session.ap_peer().map(|p| p.aid), Some(3));
        assert_eq!(session.mlm_state(), MlmState::WtAddBssRsp);
        // Confirmed once the BSS is added.
        assert_eq!(h.next_indication(), None);
    }

    #[test]
    fn reassociation_reject_tears_down_old_link() {
        let mut h = reassociating(OTHER_AP_ADDR);
        let resp = FakeAssocResp {
            status: StatusCode::DENIED_OTHER_REASON,
            ..FakeAssocResp::success(OTHER_AP_ADDR, CLIENT_ADDR, 0).reassoc()
        };
        h.rx(&resp.build()[..]);

        assert_variant!(h.next_indication(), Some(Indication::ReassociateConfirm {
            bssid: OTHER_AP_ADDR,
            result: ConfirmResult::Refused(StatusCode::DENIED_OTHER_REASON),
            ..
        }));
        assert_variant!(h.next_indication(), Some(Indication::DeauthenticateIndication(info)) => {
            assert_eq!(info.peer, AP_ADDR);
            assert_eq!(info.trigger, DisconnectTrigger::ReassocReject);
        });
        assert_eq!(h.device.commands(), vec![FwCommand::PeerDelete { addr: AP_ADDR }]);
        assert_eq!(h.session().mlm_state(), MlmState::WtDelStaRsp);
    }

    #[test]
    fn assoc_response_during_reassociation_dropped() {
        let mut h = reassociating(OTHER_AP_ADDR);
        let resp = FakeAssocResp::success(OTHER_AP_ADDR, CLIENT_ADDR, 3).build();
        assert_eq!(h.rx(&resp[..]), FrameOutcome::Dropped("not from the target AP"));
    }
}
