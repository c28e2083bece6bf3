// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{
        appendable::Appendable,
        error::FrameWriteError,
        ie::{self, EdcaParams, HtCapabilities, TimeoutInterval, VhtCapabilities},
        mac::{
            self, AssocRespHdr, AuthHdr, BeaconHdr, CapabilityInfo, FrameControl, MacAddr,
            MgmtHdr, ReasonCode, ReasonHdr, SequenceControl, StatusCode,
        },
    },
    std::fmt,
};

#[derive(PartialEq)]
pub struct FixedFields {
    pub frame_ctrl: FrameControl,
    pub addr1: MacAddr,
    pub addr2: MacAddr,
    pub addr3: MacAddr,
    pub seq_ctrl: SequenceControl,
}

impl FixedFields {
    pub fn sent_from_client(
        frame_ctrl: FrameControl,
        bssid: MacAddr,
        client_addr: MacAddr,
        seq_ctrl: SequenceControl,
    ) -> FixedFields {
        FixedFields { frame_ctrl, addr1: bssid, addr2: client_addr, addr3: bssid, seq_ctrl }
    }

    pub fn sent_from_ap(
        frame_ctrl: FrameControl,
        client_addr: MacAddr,
        bssid: MacAddr,
        seq_ctrl: SequenceControl,
    ) -> FixedFields {
        FixedFields { frame_ctrl, addr1: client_addr, addr2: bssid, addr3: bssid, seq_ctrl }
    }
}

impl fmt::Debug for FixedFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "fc: {:#b}, addr1: {:02X?}, addr2: {:02X?}, addr3: {:02X?}, seq: {}",
            self.frame_ctrl.raw(),
            self.addr1,
            self.addr2,
            self.addr3,
            self.seq_ctrl.seq_num()
        )
    }
}

pub fn write_mgmt_hdr<B: Appendable>(
    buf: &mut B,
    mut fixed: FixedFields,
) -> Result<(), FrameWriteError> {
    if fixed.frame_ctrl.htc_order() {
        return Err(FrameWriteError::new_invalid_data("htc_order bit set while HT-Control is absent"));
    }
    fixed.frame_ctrl.set_frame_type(mac::FRAME_TYPE_MGMT);
    let hdr = MgmtHdr::new(fixed.frame_ctrl, fixed.addr1, fixed.addr2, fixed.addr3, fixed.seq_ctrl);
    buf.append_value(&hdr)?;
    Ok(())
}

fn reason_frame<B: Appendable>(
    buf: &mut B,
    subtype: u16,
    addr1: MacAddr,
    addr2: MacAddr,
    bssid: MacAddr,
    seq_ctrl: SequenceControl,
    reason_code: ReasonCode,
) -> Result<(), FrameWriteError> {
    write_mgmt_hdr(
        buf,
        FixedFields { frame_ctrl: FrameControl::mgmt(subtype), addr1, addr2, addr3: bssid, seq_ctrl },
    )?;
    buf.append_value(&ReasonHdr { reason_code: reason_code.0.to_le_bytes() })?;
    Ok(())
}

/// Deauthentication from `sa` to `da` within `bssid`.
pub fn write_deauth_frame<B: Appendable>(
    buf: &mut B,
    da: MacAddr,
    sa: MacAddr,
    bssid: MacAddr,
    seq_ctrl: SequenceControl,
    reason_code: ReasonCode,
) -> Result<(), FrameWriteError> {
    reason_frame(buf, mac::MGMT_SUBTYPE_DEAUTH, da, sa, bssid, seq_ctrl, reason_code)
}

pub fn write_disassoc_frame<B: Appendable>(
    buf: &mut B,
    da: MacAddr,
    sa: MacAddr,
    bssid: MacAddr,
    seq_ctrl: SequenceControl,
    reason_code: ReasonCode,
) -> Result<(), FrameWriteError> {
    reason_frame(buf, mac::MGMT_SUBTYPE_DISASSOC, da, sa, bssid, seq_ctrl, reason_code)
}

pub fn write_auth_frame<B: Appendable>(
    buf: &mut B,
    fixed: FixedFields,
    auth_alg_num: u16,
    auth_txn_seq_num: u16,
    status_code: StatusCode,
) -> Result<(), FrameWriteError> {
    write_mgmt_hdr(buf, fixed)?;
    buf.append_value(&AuthHdr {
        auth_alg_num: auth_alg_num.to_le_bytes(),
        auth_txn_seq_num: auth_txn_seq_num.to_le_bytes(),
        status_code: status_code.0.to_le_bytes(),
    })?;
    Ok(())
}

/// Elements a station advertises in (re)association and probe requests.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StaElements<'a> {
    pub ssid: &'a [u8],
    pub rates: &'a [u8],
    pub ht_cap: Option<HtCapabilities>,
    pub vht_cap: Option<VhtCapabilities>,
    pub he_cap: Option<&'a [u8]>,
    pub rsne: Option<&'a [u8]>,
}

fn write_sta_elements<B: Appendable>(
    buf: &mut B,
    elements: &StaElements<'_>,
) -> Result<(), FrameWriteError> {
    ie::write_ssid(buf, elements.ssid)?;
    ie::write_rates(buf, elements.rates)?;
    if let Some(rsne) = elements.rsne {
        ie::write_rsne(buf, rsne)?;
    }
    if let Some(ht_cap) = elements.ht_cap.as_ref() {
        ie::write_ht_capabilities(buf, ht_cap)?;
    }
    if let Some(vht_cap) = elements.vht_cap.as_ref() {
        ie::write_vht_capabilities(buf, vht_cap)?;
    }
    if let Some(he_cap) = elements.he_cap {
        ie::write_he_capabilities(buf, he_cap)?;
    }
    Ok(())
}

pub fn write_assoc_req_frame<B: Appendable>(
    buf: &mut B,
    fixed: FixedFields,
    capabilities: CapabilityInfo,
    listen_interval: u16,
    elements: &StaElements<'_>,
) -> Result<(), FrameWriteError> {
    write_mgmt_hdr(buf, fixed)?;
    buf.append_u16_le(capabilities.raw())?;
    buf.append_u16_le(listen_interval)?;
    write_sta_elements(buf, elements)
}

pub fn write_reassoc_req_frame<B: Appendable>(
    buf: &mut B,
    fixed: FixedFields,
    capabilities: CapabilityInfo,
    listen_interval: u16,
    current_ap: MacAddr,
    elements: &StaElements<'_>,
) -> Result<(), FrameWriteError> {
    write_mgmt_hdr(buf, fixed)?;
    buf.append_u16_le(capabilities.raw())?;
    buf.append_u16_le(listen_interval)?;
    buf.append_bytes(&current_ap[..])?;
    write_sta_elements(buf, elements)
}

/// Probe request. An empty `ssid` is the wildcard SSID.
pub fn write_probe_req_frame<B: Appendable>(
    buf: &mut B,
    fixed: FixedFields,
    ssid: &[u8],
    rates: &[u8],
) -> Result<(), FrameWriteError> {
    write_mgmt_hdr(buf, fixed)?;
    ie::write_ssid(buf, ssid)?;
    ie::write_rates(buf, rates)
}

/// Elements an AP carries in beacons, probe responses and (re)association responses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BssElements<'a> {
    pub ssid: &'a [u8],
    pub rates: &'a [u8],
    pub channel: u8,
    pub edca: Option<EdcaParams>,
    pub ht_cap: Option<HtCapabilities>,
    pub vht_cap: Option<VhtCapabilities>,
    pub rsne: Option<&'a [u8]>,
}

fn write_bss_elements<B: Appendable>(
    buf: &mut B,
    elements: &BssElements<'_>,
) -> Result<(), FrameWriteError> {
    ie::write_ssid(buf, elements.ssid)?;
    ie::write_rates(buf, elements.rates)?;
    ie::write_dsss_param_set(buf, elements.channel)?;
    if let Some(rsne) = elements.rsne {
        ie::write_rsne(buf, rsne)?;
    }
    if let Some(edca) = elements.edca.as_ref() {
        ie::write_edca_param_set(buf, edca)?;
    }
    if let Some(ht_cap) = elements.ht_cap.as_ref() {
        ie::write_ht_capabilities(buf, ht_cap)?;
    }
    if let Some(vht_cap) = elements.vht_cap.as_ref() {
        ie::write_vht_capabilities(buf, vht_cap)?;
    }
    Ok(())
}

fn write_beacon_like<B: Appendable>(
    buf: &mut B,
    fixed: FixedFields,
    beacon_interval: u16,
    capabilities: CapabilityInfo,
    elements: &BssElements<'_>,
) -> Result<(), FrameWriteError> {
    write_mgmt_hdr(buf, fixed)?;
    buf.append_value(&BeaconHdr {
        timestamp: [0; 8],
        beacon_interval: beacon_interval.to_le_bytes(),
        capabilities: capabilities.raw().to_le_bytes(),
    })?;
    write_bss_elements(buf, elements)
}

/// Beacon template. The timestamp is left zero for firmware to fill in.
pub fn write_beacon_frame<B: Appendable>(
    buf: &mut B,
    bssid: MacAddr,
    beacon_interval: u16,
    capabilities: CapabilityInfo,
    elements: &BssElements<'_>,
) -> Result<(), FrameWriteError> {
    let fixed = FixedFields::sent_from_ap(
        FrameControl::mgmt(mac::MGMT_SUBTYPE_BEACON),
        mac::BCAST_ADDR,
        bssid,
        SequenceControl::default(),
    );
    write_beacon_like(buf, fixed, beacon_interval, capabilities, elements)
}

pub fn write_probe_resp_frame<B: Appendable>(
    buf: &mut B,
    fixed: FixedFields,
    beacon_interval: u16,
    capabilities: CapabilityInfo,
    elements: &BssElements<'_>,
) -> Result<(), FrameWriteError> {
    write_beacon_like(buf, fixed, beacon_interval, capabilities, elements)
}

pub fn write_assoc_resp_frame<B: Appendable>(
    buf: &mut B,
    fixed: FixedFields,
    capabilities: CapabilityInfo,
    status_code: StatusCode,
    aid: u16,
    elements: &BssElements<'_>,
    timeout_interval: Option<TimeoutInterval>,
) -> Result<(), FrameWriteError> {
    write_mgmt_hdr(buf, fixed)?;
    buf.append_value(&AssocRespHdr {
        capabilities: capabilities.raw().to_le_bytes(),
        status_code: status_code.0.to_le_bytes(),
        aid: aid.to_le_bytes(),
    })?;
    ie::write_rates(buf, elements.rates)?;
    if let Some(edca) = elements.edca.as_ref() {
        ie::write_edca_param_set(buf, edca)?;
    }
    if let Some(ht_cap) = elements.ht_cap.as_ref() {
        ie::write_ht_capabilities(buf, ht_cap)?;
    }
    if let Some(vht_cap) = elements.vht_cap.as_ref() {
        ie::write_vht_capabilities(buf, vht_cap)?;
    }
    if let Some(ti) = timeout_interval.as_ref() {
        ie::write_timeout_interval(buf, ti)?;
    }
    Ok(())
}
