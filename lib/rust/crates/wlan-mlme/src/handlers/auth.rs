// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Open System authentication, both ends.

use {
    super::FrameOutcome,
    crate::{
        context::{Context, TimeoutKind},
        device::FwHandle,
        error::Error,
        indication::{ConfirmResult, Indication},
        peer::PreAuthEntry,
        session::{MlmState, Session, SmeState},
        vdev::{VdevCtx, VdevId},
    },
    log::{debug, info},
    wlan_common::{
        format::MacFmt,
        frame::MgmtFrame,
        mac::{self, FrameControl, StatusCode, AUTH_ALG_OPEN},
        mgmt_writer::{self, FixedFields},
    },
};

pub fn handle_auth(
    v: &mut VdevCtx<'_>,
    frame: &MgmtFrame,
    auth_alg_num: u16,
    auth_txn_seq_num: u16,
    status_code: StatusCode,
) -> Result<FrameOutcome, Error> {
    let vdev_id = v.vdev.id;
    let handle = v.vdev.fw_handle;
    let session = v.session.as_deref_mut().ok_or(Error::NoSession(vdev_id))?;
    if frame.bssid() != session.bssid {
        return Ok(FrameOutcome::Dropped("other BSS"));
    }
    if session.is_client() {
        handle_auth_resp(v.ctx, vdev_id, session, frame, auth_txn_seq_num, status_code)
    } else {
        handle_auth_req(v.ctx, vdev_id, handle, session, frame, auth_alg_num, auth_txn_seq_num)
    }
}

fn handle_auth_resp(
    ctx: &mut Context,
    vdev_id: VdevId,
    session: &mut Session,
    frame: &MgmtFrame,
    auth_txn_seq_num: u16,
    status_code: StatusCode,
) -> Result<FrameOutcome, Error> {
    if frame.sa() != session.bssid {
        return Ok(FrameOutcome::Dropped("not from the AP"));
    }
    if session.mlm_state() != MlmState::WtAuthFrame2 {
        return Ok(FrameOutcome::Dropped("not awaiting authentication"));
    }
    if auth_txn_seq_num != 2 {
        return Ok(FrameOutcome::Dropped("unexpected transaction sequence number"));
    }

    ctx.cancel(&mut session.timers.auth);
    let result = if status_code.is_success() {
        session.set_mlm_state(MlmState::Authenticated);
        info!("authenticated with {}", session.bssid.to_mac_str());
        ConfirmResult::Success
    } else {
        session.set_mlm_state(MlmState::Joined);
        session.set_sme_state(SmeState::Joining);
        info!("authentication refused by {}: status {}", session.bssid.to_mac_str(), status_code.0);
        ConfirmResult::Refused(status_code)
    };
    ctx.indicate(Indication::AuthenticateConfirm { vdev_id, peer: session.bssid, result });
    Ok(FrameOutcome::Handled)
}

fn handle_auth_req(
    ctx: &mut Context,
    vdev_id: VdevId,
    handle: FwHandle,
    session: &mut Session,
    frame: &MgmtFrame,
    auth_alg_num: u16,
    auth_txn_seq_num: u16,
) -> Result<FrameOutcome, Error> {
    let sa = frame.sa();
    if mac::is_group_addr(&sa) {
        return Ok(FrameOutcome::Dropped("group source address"));
    }
    if frame.da() != session.bssid {
        return Ok(FrameOutcome::Dropped("not addressed to this BSS"));
    }
    if auth_txn_seq_num != 1 {
        return Ok(FrameOutcome::Dropped("unexpected transaction sequence number"));
    }
    if session.peers.contains(&sa) {
        debug!("{} is already associated", sa.to_mac_str());
        return Ok(FrameOutcome::Dropped("already associated"));
    }

    let status_code = if auth_alg_num != AUTH_ALG_OPEN {
        StatusCode::UNSUPPORTED_AUTH_ALGORITHM
    } else {
        let timer = ctx.schedule(vdev_id, TimeoutKind::PreAuth(sa), ctx.config.preauth_timeout());
        let entry =
            PreAuthEntry { addr: sa, auth_alg_num, created: ctx.now(), timer: Some(timer) };
        match session.preauth.insert(entry) {
            Ok(replaced) => {
                if let Some(replaced) = replaced {
                    let mut stale = replaced.timer;
                    ctx.cancel(&mut stale);
                }
                StatusCode::SUCCESS
            }
            Err(Error::NoResources) => {
                ctx.cancel(&mut Some(timer));
                info!("pre-auth pool full, refusing {}", sa.to_mac_str());
                StatusCode::DENIED_NO_MORE_STAS
            }
            Err(e) => return Err(e),
        }
    };

    let fixed = FixedFields::sent_from_ap(
        FrameControl::mgmt(mac::MGMT_SUBTYPE_AUTH),
        sa,
        session.bssid,
        ctx.next_seq_ctrl(),
    );
    let mut buf = vec![];
    mgmt_writer::write_auth_frame(&mut buf, fixed, auth_alg_num, 2, status_code)?;
    ctx.send_mgmt_frame(handle, buf)?;
    Ok(FrameOutcome::Handled)
}
