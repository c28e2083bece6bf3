// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Capability negotiation between the local radio and one peer.

use {
    crate::{config::LocalCapabilities, peer::PeerContext},
    wlan_common::{
        ie::{EdcaAcParams, EdcaParams, Elements, HtCapabilities, VhtCapabilities},
        mac::CapabilityInfo,
    },
};

const RATE_BASIC_BIT: u8 = 0x80;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NegotiatedCaps {
    pub rates: Vec<u8>,
    pub qos: bool,
    pub ht_cap: Option<HtCapabilities>,
    pub vht_cap: Option<VhtCapabilities>,
    pub he_cap: Option<Vec<u8>>,
    pub edca: Option<EdcaParams>,
}

impl NegotiatedCaps {
    pub fn apply_to(self, peer: &mut PeerContext) {
        peer.rates = self.rates;
        peer.qos = self.qos;
        peer.ht_cap = self.ht_cap;
        peer.vht_cap = self.vht_cap;
        peer.he_cap = self.he_cap;
        peer.edca = self.edca;
    }
}

/// HT, VHT and HE are used only when both sides advertise them; VHT additionally needs HT.
/// EDCA is the field-wise minimum of both parameter sets with admission-controlled ACs
/// downgraded.
pub fn negotiate(
    local: &LocalCapabilities,
    peer_capabilities: CapabilityInfo,
    peer: &Elements,
) -> NegotiatedCaps {
    let ht_cap = local.ht_capabilities().and(peer.ht_cap);
    let vht_cap = if ht_cap.is_some() { local.vht_capabilities().and(peer.vht_cap) } else { None };
    let he_cap = local.he_capabilities().and(peer.he_cap.clone());
    let qos = local.qos && (peer.edca.is_some() || peer_capabilities.qos());
    let edca = match (qos, peer.edca.as_ref()) {
        (true, Some(peer_edca)) => Some(downgrade_acm(&local.edca_params().negotiate(peer_edca))),
        _ => None,
    };
    NegotiatedCaps { rates: intersect_rates(&local.rates[..], &peer.supported_rates[..]), qos, ht_cap, vht_cap, he_cap, edca }
}

/// Rates both sides support, keeping the peer's basic-rate marking.
pub fn intersect_rates(local: &[u8], peer: &[u8]) -> Vec<u8> {
    peer.iter()
        .filter(|p| local.iter().any(|l| (l & !RATE_BASIC_BIT) == (*p & !RATE_BASIC_BIT)))
        .cloned()
        .collect()
}

/// An AC that requires admission control cannot be used without an admitted TSPEC, so its
/// traffic goes out with the parameters of the next lower AC that does not
/// (VO -> VI -> BE -> BK). BK has nothing below it and is left alone.
pub fn downgrade_acm(edca: &EdcaParams) -> EdcaParams {
    let fallback = |candidates: &[&EdcaAcParams], own: &EdcaAcParams| -> EdcaAcParams {
        if !own.acm {
            return *own;
        }
        match candidates.iter().find(|ac| !ac.acm) {
            Some(lower) => **lower,
            None => *own,
        }
    };
    EdcaParams {
        qos_info: edca.qos_info,
        ac_vo: fallback(&[&edca.ac_vi, &edca.ac_be, &edca.ac_bk], &edca.ac_vo),
        ac_vi: fallback(&[&edca.ac_be, &edca.ac_bk], &edca.ac_vi),
        ac_be: fallback(&[&edca.ac_bk], &edca.ac_be),
        ac_bk: edca.ac_bk,
    }
}
