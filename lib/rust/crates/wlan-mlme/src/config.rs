// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::error::Error,
    serde::{Deserialize, Serialize},
    std::time::Duration,
    wlan_common::ie::{EdcaAcParams, EdcaParams, HtCapabilities, VhtCapabilities},
};

/// Engine configuration. Every field has a default so a partial JSON document is enough.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlmeConfig {
    /// Upper bound on associated peers per AP session.
    pub max_peers: usize,
    /// Upper bound on authenticated, not yet associated peers per AP session.
    pub max_preauth: usize,
    pub preauth_timeout_ms: u64,
    pub join_timeout_ms: u64,
    pub auth_timeout_ms: u64,
    pub assoc_timeout_ms: u64,
    pub reassoc_timeout_ms: u64,
    pub pmf_comeback_max_retries: u8,
    pub heartbeat_interval_ms: u64,
    pub cac_duration_ms: u64,
    pub wps_pbc_walk_time_secs: u64,
    pub wps_pbc_max_entries: usize,
    /// Remember APs the link monitor gave up on.
    pub record_failed_ap: bool,
    /// Refuse joins to a remembered AP instead of only warning.
    pub reject_recently_failed_ap: bool,
    /// Capacity reserved up front for vendor IEs appended to outgoing deauth/disassoc frames.
    pub disconnect_ie_capacity: usize,
    pub listen_interval: u16,
    pub local_caps: LocalCapabilities,
}

impl Default for MlmeConfig {
    fn default() -> Self {
        Self {
            max_peers: 32,
            max_preauth: 16,
            preauth_timeout_ms: 5_000,
            join_timeout_ms: 2_000,
            auth_timeout_ms: 500,
            assoc_timeout_ms: 500,
            reassoc_timeout_ms: 500,
            pmf_comeback_max_retries: 3,
            heartbeat_interval_ms: 1_000,
            cac_duration_ms: 60_000,
            wps_pbc_walk_time_secs: 120,
            wps_pbc_max_entries: 8,
            record_failed_ap: true,
            reject_recently_failed_ap: false,
            disconnect_ie_capacity: 256,
            listen_interval: 10,
            local_caps: LocalCapabilities::default(),
        }
    }
}

impl MlmeConfig {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn preauth_timeout(&self) -> Duration {
        Duration::from_millis(self.preauth_timeout_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_millis(self.auth_timeout_ms)
    }

    pub fn assoc_timeout(&self) -> Duration {
        Duration::from_millis(self.assoc_timeout_ms)
    }

    pub fn reassoc_timeout(&self) -> Duration {
        Duration::from_millis(self.reassoc_timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn cac_duration(&self) -> Duration {
        Duration::from_millis(self.cac_duration_ms)
    }

    pub fn wps_pbc_walk_time(&self) -> Duration {
        Duration::from_secs(self.wps_pbc_walk_time_secs)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalCapabilities {
    pub ht: bool,
    pub vht: bool,
    pub he: bool,
    pub qos: bool,
    pub rates: Vec<u8>,
    pub edca: EdcaConfig,
}

impl Default for LocalCapabilities {
    fn default() -> Self {
        Self {
            ht: true,
            vht: true,
            he: false,
            qos: true,
            rates: vec![0x82, 0x84, 0x8b, 0x96, 0x0c, 0x12, 0x18, 0x24, 0x30, 0x48, 0x60, 0x6c],
            edca: EdcaConfig::default(),
        }
    }
}

impl LocalCapabilities {
    pub fn ht_capabilities(&self) -> Option<HtCapabilities> {
        if !self.ht {
            return None;
        }
        let mut mcs_set = [0u8; 16];
        mcs_set[0] = 0xff;
        Some(HtCapabilities {
            ht_cap_info: 0x016e,
            ampdu_params: 0x17,
            mcs_set,
            ht_ext_cap: 0,
            txbf_cap: 0,
            asel_cap: 0,
        })
    }

    pub fn vht_capabilities(&self) -> Option<VhtCapabilities> {
        if !self.vht {
            return None;
        }
        Some(VhtCapabilities { vht_cap_info: 0x0f825991, vht_mcs_nss: 0x0000_fffe_0000_fffe })
    }

    /// HE capabilities element body (extension ID excluded): MAC and PHY capability
    /// information followed by the 80 MHz MCS/NSS map.
    pub fn he_capabilities(&self) -> Option<Vec<u8>> {
        if !self.he {
            return None;
        }
        let mut body = vec![0u8; 6 + 11];
        body.extend_from_slice(&[0xfa, 0xff, 0xfa, 0xff]);
        Some(body)
    }

    pub fn edca_params(&self) -> EdcaParams {
        EdcaParams {
            qos_info: 0,
            ac_be: self.edca.be.into(),
            ac_bk: self.edca.bk.into(),
            ac_vi: self.edca.vi.into(),
            ac_vo: self.edca.vo.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcConfig {
    pub aifsn: u8,
    pub ecw_min: u8,
    pub ecw_max: u8,
    /// In units of 32 microseconds.
    pub txop_limit: u16,
}

impl From<AcConfig> for EdcaAcParams {
    fn from(ac: AcConfig) -> Self {
        EdcaAcParams {
            aifsn: ac.aifsn,
            acm: false,
            ecw_min: ac.ecw_min,
            ecw_max: ac.ecw_max,
            txop_limit: ac.txop_limit,
        }
    }
}

/// Defaults are the AP parameter set of IEEE Std 802.11-2016, Table 9-137.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdcaConfig {
    pub be: AcConfig,
    pub bk: AcConfig,
    pub vi: AcConfig,
    pub vo: AcConfig,
}

impl Default for EdcaConfig {
    fn default() -> Self {
        Self {
            be: AcConfig { aifsn: 3, ecw_min: 4, ecw_max: 10, txop_limit: 0 },
            bk: AcConfig { aifsn: 7, ecw_min: 4, ecw_max: 10, txop_limit: 0 },
            vi: AcConfig { aifsn: 2, ecw_min: 3, ecw_max: 4, txop_limit: 94 },
            vo: AcConfig { aifsn: 2, ecw_min: 2, ecw_max: 3, txop_limit: 47 },
        }
    }
}
