// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Raw frame builders for tests. Builders that need invalid or unusual encodings (reserved AID
//! bits, retry flags, truncated elements) write the bytes directly instead of going through
//! `mgmt_writer`.

use crate::{
    appendable::Appendable,
    ie::{self, wsc, ChannelSwitchAnnouncement, EdcaParams, TimeoutInterval},
    mac::{self, CapabilityInfo, FrameControl, MacAddr, MgmtHdr, ReasonCode, SequenceControl,
        StatusCode},
    mgmt_writer,
};

pub const FAKE_RATES: &[u8] = &[0x82, 0x84, 0x8b, 0x96, 0x0c, 0x12, 0x18, 0x24, 0x30, 0x48];

fn hdr(subtype: u16, addr1: MacAddr, addr2: MacAddr, addr3: MacAddr, retry: bool) -> Vec<u8> {
    let mut fc = FrameControl::mgmt(subtype);
    fc.set_retry(retry);
    let mut buf = vec![];
    buf.append_value(&MgmtHdr::new(fc, addr1, addr2, addr3, SequenceControl::default()))
        .expect("vec append");
    buf
}

pub fn ess_capabilities() -> CapabilityInfo {
    let mut cap = CapabilityInfo::default();
    cap.set_ess(true);
    cap
}

#[derive(Clone, Debug, Default)]
pub struct FakeBeacon<'a> {
    pub bssid: MacAddr,
    pub ssid: &'a [u8],
    pub channel: u8,
    pub ibss: bool,
    pub csa: Option<ChannelSwitchAnnouncement>,
    pub edca: Option<EdcaParams>,
    /// Appended after the well-formed elements, e.g. to build malformed sequences.
    pub trailing: &'a [u8],
}

fn beacon_body(beacon: &FakeBeacon<'_>) -> Vec<u8> {
    let mut cap = CapabilityInfo::default();
    cap.set_ess(!beacon.ibss);
    cap.set_ibss(beacon.ibss);
    let mut body = vec![];
    body.extend_from_slice(&[0u8; 8]);
    body.extend_from_slice(&100u16.to_le_bytes());
    body.extend_from_slice(&cap.raw().to_le_bytes());
    ie::write_ssid(&mut body, beacon.ssid).expect("ssid");
    ie::write_rates(&mut body, FAKE_RATES).expect("rates");
    ie::write_dsss_param_set(&mut body, beacon.channel).expect("dsss");
    if let Some(csa) = beacon.csa.as_ref() {
        ie::write_csa(&mut body, csa).expect("csa");
    }
    if let Some(edca) = beacon.edca.as_ref() {
        ie::write_edca_param_set(&mut body, edca).expect("edca");
    }
    body.extend_from_slice(beacon.trailing);
    body
}

pub fn fake_beacon(beacon: &FakeBeacon<'_>) -> Vec<u8> {
    let mut buf = hdr(mac::MGMT_SUBTYPE_BEACON, mac::BCAST_ADDR, beacon.bssid, beacon.bssid, false);
    buf.extend_from_slice(&beacon_body(beacon)[..]);
    buf
}

pub fn fake_probe_resp(da: MacAddr, beacon: &FakeBeacon<'_>) -> Vec<u8> {
    let mut buf = hdr(mac::MGMT_SUBTYPE_PROBE_RESP, da, beacon.bssid, beacon.bssid, false);
    buf.extend_from_slice(&beacon_body(beacon)[..]);
    buf
}

/// Probe request from `sa`. `wps_uuid` adds a push-button WSC element with that UUID-E.
pub fn fake_probe_req(
    sa: MacAddr,
    da: MacAddr,
    ssid: &[u8],
    wps_uuid: Option<&wsc::Uuid>,
) -> Vec<u8> {
    let mut buf = hdr(mac::MGMT_SUBTYPE_PROBE_REQ, da, sa, da, false);
    ie::write_ssid(&mut buf, ssid).expect("ssid");
    ie::write_rates(&mut buf, FAKE_RATES).expect("rates");
    if let Some(uuid) = wps_uuid {
        ie::write_wsc(&mut buf, &wsc::push_button_probe_attrs(uuid)[..]).expect("wsc");
    }
    buf
}

#[derive(Clone, Debug)]
pub struct FakeAssocResp {
    pub subtype: u16,
    pub bssid: MacAddr,
    pub sta: MacAddr,
    pub status: StatusCode,
    /// Written as-is, including the reserved top bits.
    pub raw_aid: u16,
    pub retry: bool,
    pub edca: Option<EdcaParams>,
    pub with_ht: bool,
    pub with_vht: bool,
    pub timeout_interval: Option<TimeoutInterval>,
}

impl FakeAssocResp {
    pub fn success(bssid: MacAddr, sta: MacAddr, aid: u16) -> Self {
        Self {
            subtype: mac::MGMT_SUBTYPE_ASSOC_RESP,
            bssid,
            sta,
            status: StatusCode::SUCCESS,
            raw_aid: aid | 0xC000,
            retry: false,
            edca: None,
            with_ht: false,
            with_vht: false,
            timeout_interval: None,
        }
    }

    pub fn reassoc(mut self) -> Self {
        self.subtype = mac::MGMT_SUBTYPE_REASSOC_RESP;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut buf = hdr(self.subtype, self.sta, self.bssid, self.bssid, self.retry);
        buf.extend_from_slice(&ess_capabilities().raw().to_le_bytes());
        buf.extend_from_slice(&self.status.0.to_le_bytes());
        buf.extend_from_slice(&self.raw_aid.to_le_bytes());
        ie::write_rates(&mut buf, FAKE_RATES).expect("rates");
        if let Some(edca) = self.edca.as_ref() {
            ie::write_edca_param_set(&mut buf, edca).expect("edca");
        }
        if self.with_ht {
            ie::write_ht_capabilities(&mut buf, &super::fake_ht_capabilities()).expect("ht");
        }
        if self.with_vht {
            ie::write_vht_capabilities(&mut buf, &super::fake_vht_capabilities()).expect("vht");
        }
        if let Some(ti) = self.timeout_interval.as_ref() {
            ie::write_timeout_interval(&mut buf, ti).expect("timeout interval");
        }
        buf
    }
}

pub fn fake_deauth(da: MacAddr, sa: MacAddr, bssid: MacAddr, reason_code: ReasonCode) -> Vec<u8> {
    let mut buf = vec![];
    mgmt_writer::write_deauth_frame(&mut buf, da, sa, bssid, SequenceControl::default(), reason_code)
        .expect("deauth");
    buf
}

pub fn fake_disassoc(da: MacAddr, sa: MacAddr, bssid: MacAddr, reason_code: ReasonCode) -> Vec<u8> {
    let mut buf = vec![];
    mgmt_writer::write_disassoc_frame(
        &mut buf,
        da,
        sa,
        bssid,
        SequenceControl::default(),
        reason_code,
    )
    .expect("disassoc");
    buf
}

pub fn fake_auth(
    da: MacAddr,
    sa: MacAddr,
    bssid: MacAddr,
    auth_alg_num: u16,
    txn_seq_num: u16,
    status: StatusCode,
) -> Vec<u8> {
    let fixed = mgmt_writer::FixedFields {
        frame_ctrl: FrameControl::mgmt(mac::MGMT_SUBTYPE_AUTH),
        addr1: da,
        addr2: sa,
        addr3: bssid,
        seq_ctrl: SequenceControl::default(),
    };
    let mut buf = vec![];
    mgmt_writer::write_auth_frame(&mut buf, fixed, auth_alg_num, txn_seq_num, status)
        .expect("auth");
    buf
}

pub fn fake_assoc_req(sta: MacAddr, bssid: MacAddr, ssid: &[u8], with_ht: bool) -> Vec<u8> {
    let fixed = mgmt_writer::FixedFields::sent_from_client(
        FrameControl::mgmt(mac::MGMT_SUBTYPE_ASSOC_REQ),
        bssid,
        sta,
        SequenceControl::default(),
    );
    let elements = mgmt_writer::StaElements {
        ssid,
        rates: FAKE_RATES,
        ht_cap: if with_ht { Some(super::fake_ht_capabilities()) } else { None },
        ..Default::default()
    };
    let mut buf = vec![];
    mgmt_writer::write_assoc_req_frame(&mut buf, fixed, ess_capabilities(), 10, &elements)
        .expect("assoc req");
    buf
}
