// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Received management frame handlers. Each frame is decoded once and routed by subtype; the
//! handlers only ever see the decoded record.

pub mod assoc_req;
pub mod assoc_resp;
pub mod auth;
pub mod beacon;
pub mod deauth;
pub mod probe_req;
pub mod wps_pbc;

use {
    crate::{error::Error, vdev::VdevCtx},
    log::debug,
    wlan_common::frame::{parse_mgmt_frame, MgmtBody, MgmtFrame},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Handled,
    /// Not acted upon. Never an error; the reason is for logs and tests.
    Dropped(&'static str),
}

/// Decodes and dispatches one received management frame.
pub fn handle_mgmt_frame(v: &mut VdevCtx<'_>, bytes: &[u8]) -> Result<FrameOutcome, Error> {
    let frame = match parse_mgmt_frame(bytes) {
        Ok(frame) => frame,
        Err(e) => {
            debug!("vdev {}: dropping malformed frame: {}", v.vdev.id, e);
            return Ok(FrameOutcome::Dropped("malformed"));
        }
    };
    dispatch(v, &frame)
}

pub fn dispatch(v: &mut VdevCtx<'_>, frame: &MgmtFrame) -> Result<FrameOutcome, Error> {
    if v.session.is_none() {
        return Ok(FrameOutcome::Dropped("no session"));
    }
    match &frame.body {
        MgmtBody::Beacon(fields) => beacon::handle_beacon(v, frame, fields, true),
        MgmtBody::ProbeResp(fields) => beacon::handle_beacon(v, frame, fields, false),
        MgmtBody::ProbeReq { elements } => probe_req::handle_probe_req(v, frame, elements),
        MgmtBody::AssocResp(fields) => assoc_resp::handle_assoc_resp(v, frame, fields, false),
        MgmtBody::ReassocResp(fields) => assoc_resp::handle_assoc_resp(v, frame, fields, true),
        MgmtBody::Auth { auth_alg_num, auth_txn_seq_num, status_code, .. } => {
            auth::handle_auth(v, frame, *auth_alg_num, *auth_txn_seq_num, *status_code)
        }
        MgmtBody::AssocReq { capabilities, listen_interval, elements } => {
            assoc_req::handle_assoc_req(v, frame, *capabilities, *listen_interval, elements, false)
        }
        MgmtBody::ReassocReq { capabilities, listen_interval, elements, .. } => {
            assoc_req::handle_assoc_req(v, frame, *capabilities, *listen_interval, elements, true)
        }
        MgmtBody::Deauth { reason_code } => deauth::handle_deauth(v, frame, *reason_code),
        MgmtBody::Disassoc { reason_code } => deauth::handle_disassoc(v, frame, *reason_code),
        MgmtBody::Unsupported { subtype } => {
            debug!("vdev {}: unsupported mgmt subtype {}", v.vdev.id, subtype);
            Ok(FrameOutcome::Dropped("unsupported subtype"))
        }
    }
}
