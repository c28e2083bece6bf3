// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

pub mod fake_frames;

use crate::{
    ie::{EdcaAcParams, EdcaParams, HtCapabilities, VhtCapabilities},
    mac::MacAddr,
};

pub const AP_ADDR: MacAddr = [0x0a, 0x0a, 0x0a, 0x0a, 0x0a, 0x0a];
pub const OTHER_AP_ADDR: MacAddr = [0x0b, 0x0b, 0x0b, 0x0b, 0x0b, 0x0b];
pub const CLIENT_ADDR: MacAddr = [0x02, 0x02, 0x02, 0x02, 0x02, 0x02];
pub const CLIENT_ADDR2: MacAddr = [0x04, 0x04, 0x04, 0x04, 0x04, 0x04];
pub const CLIENT_ADDR3: MacAddr = [0x06, 0x06, 0x06, 0x06, 0x06, 0x06];

pub fn fake_ht_capabilities() -> HtCapabilities {
    let mut mcs_set = [0u8; 16];
    mcs_set[0] = 0xff;
    HtCapabilities {
        ht_cap_info: 0x016e,
        ampdu_params: 0x17,
        mcs_set,
        ht_ext_cap: 0,
        txbf_cap: 0,
        asel_cap: 0,
    }
}

pub fn fake_vht_capabilities() -> VhtCapabilities {
    VhtCapabilities { vht_cap_info: 0x0f825991, vht_mcs_nss: 0x0000_ffea_0000_ffea }
}

/// WMM default parameter set for an AP, IEEE Std 802.11-2016, Table 9-137.
pub fn fake_edca_params() -> EdcaParams {
    EdcaParams {
        qos_info: 0,
        ac_be: EdcaAcParams { aifsn: 3, acm: false, ecw_min: 4, ecw_max: 10, txop_limit: 0 },
        ac_bk: EdcaAcParams { aifsn: 7, acm: false, ecw_min: 4, ecw_max: 10, txop_limit: 0 },
        ac_vi: EdcaAcParams { aifsn: 2, acm: false, ecw_min: 3, ecw_max: 4, txop_limit: 94 },
        ac_vo: EdcaAcParams { aifsn: 2, acm: false, ecw_min: 2, ecw_max: 3, txop_limit: 47 },
    }
}
