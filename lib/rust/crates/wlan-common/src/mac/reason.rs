// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use zerocopy::{AsBytes, FromBytes};

#[repr(C)]
#[derive(AsBytes, FromBytes, PartialEq, Eq, Hash, Clone, Copy, Debug, Default)]
pub struct ReasonCode(pub u16);

/// IEEE Std 802.11-2016, 9.4.1.7
impl ReasonCode {
    // 0 Reserved
    pub const UNSPECIFIED_REASON: Self = Self(1);
    pub const INVALID_AUTHENTICATION: Self = Self(2);
    pub const LEAVING_NETWORK_DEAUTH: Self = Self(3);
    pub const REASON_INACTIVITY: Self = Self(4);
    pub const NO_MORE_STAS: Self = Self(5);
    pub const INVALID_CLASS2FRAME: Self = Self(6);
    pub const INVALID_CLASS3FRAME: Self = Self(7);
    pub const LEAVING_NETWORK_DISASSOC: Self = Self(8);
    pub const NOT_AUTHENTICATED: Self = Self(9);
    pub const UNACCEPTABLE_POWER_CAPABILITY: Self = Self(10);
    pub const UNACCEPTABLE_SUPPORTED_CHANNELS: Self = Self(11);
    pub const BSS_TRANSITION_DISASSOC: Self = Self(12);
    pub const REASON_INVALID_ELEMENT: Self = Self(13);
    pub const MIC_FAILURE: Self = Self(14);
    pub const FOURWAY_HANDSHAKE_TIMEOUT: Self = Self(15);
    pub const GK_HANDSHAKE_TIMEOUT: Self = Self(16);
    pub const HANDSHAKE_ELEMENT_MISMATCH: Self = Self(17);
    pub const REASON_INVALID_GROUP_CIPHER: Self = Self(18);
    pub const REASON_INVALID_PAIRWISE_CIPHER: Self = Self(19);
    pub const REASON_INVALID_AKMP: Self = Self(20);
    pub const UNSUPPORTED_RSNE_VERSION: Self = Self(21);
    pub const INVALID_RSNE_CAPABILITIES: Self = Self(22);
    pub const IEEE802_1_X_AUTH_FAILED: Self = Self(23);
    pub const REASON_CIPHER_OUT_OF_POLICY: Self = Self(24);
    // 25-31 are TDLS and SSP reasons, not handled by this MLME.
    pub const UNSPECIFIED_QOS_REASON: Self = Self(32);
    pub const NOT_ENOUGH_BANDWIDTH: Self = Self(33);
    pub const MISSING_ACKS: Self = Self(34);
    pub const EXCEEDED_TXOP: Self = Self(35);
    pub const STA_LEAVING: Self = Self(36);
    pub const END_TS_BA_DLS: Self = Self(37);
    pub const UNKNOWN_TS_BA: Self = Self(38);
    pub const TIMEOUT: Self = Self(39);
    // 40 - 44 Reserved.
    pub const PEERKEY_MISMATCH: Self = Self(45);
    pub const PEER_INITIATED: Self = Self(46);
    pub const AP_INITIATED: Self = Self(47);
    // 48-66 are FT and mesh reasons.
}

/// Reasons a station accepts in a deauthentication frame from its AP.
const STA_DEAUTH_REASONS: &[ReasonCode] = &[
    ReasonCode::UNSPECIFIED_REASON,
    ReasonCode::INVALID_AUTHENTICATION,
    ReasonCode::LEAVING_NETWORK_DEAUTH,
    ReasonCode::REASON_INACTIVITY,
    ReasonCode::NO_MORE_STAS,
    ReasonCode::INVALID_CLASS2FRAME,
    ReasonCode::INVALID_CLASS3FRAME,
    ReasonCode::NOT_AUTHENTICATED,
    ReasonCode::REASON_INVALID_ELEMENT,
    ReasonCode::MIC_FAILURE,
    ReasonCode::FOURWAY_HANDSHAKE_TIMEOUT,
    ReasonCode::GK_HANDSHAKE_TIMEOUT,
    ReasonCode::HANDSHAKE_ELEMENT_MISMATCH,
    ReasonCode::REASON_INVALID_GROUP_CIPHER,
    ReasonCode::REASON_INVALID_PAIRWISE_CIPHER,
    ReasonCode::REASON_INVALID_AKMP,
    ReasonCode::UNSUPPORTED_RSNE_VERSION,
    ReasonCode::INVALID_RSNE_CAPABILITIES,
    ReasonCode::IEEE802_1_X_AUTH_FAILED,
    ReasonCode::REASON_CIPHER_OUT_OF_POLICY,
    ReasonCode::MISSING_ACKS,
    ReasonCode::PEER_INITIATED,
    ReasonCode::AP_INITIATED,
];

/// Reasons an AP accepts in a deauthentication frame from an associated client.
const AP_DEAUTH_REASONS: &[ReasonCode] = &[
    ReasonCode::UNSPECIFIED_REASON,
    ReasonCode::INVALID_AUTHENTICATION,
    ReasonCode::LEAVING_NETWORK_DEAUTH,
    ReasonCode::INVALID_CLASS2FRAME,
    ReasonCode::INVALID_CLASS3FRAME,
    ReasonCode::NOT_AUTHENTICATED,
    ReasonCode::REASON_INVALID_ELEMENT,
    ReasonCode::MIC_FAILURE,
    ReasonCode::FOURWAY_HANDSHAKE_TIMEOUT,
    ReasonCode::GK_HANDSHAKE_TIMEOUT,
    ReasonCode::HANDSHAKE_ELEMENT_MISMATCH,
    ReasonCode::REASON_INVALID_GROUP_CIPHER,
    ReasonCode::REASON_INVALID_PAIRWISE_CIPHER,
    ReasonCode::REASON_INVALID_AKMP,
    ReasonCode::UNSUPPORTED_RSNE_VERSION,
    ReasonCode::INVALID_RSNE_CAPABILITIES,
    ReasonCode::IEEE802_1_X_AUTH_FAILED,
    ReasonCode::REASON_CIPHER_OUT_OF_POLICY,
    ReasonCode::STA_LEAVING,
    ReasonCode::PEER_INITIATED,
];

/// Reasons a station accepts in a disassociation frame from its AP.
const STA_DISASSOC_REASONS: &[ReasonCode] = &[
    ReasonCode::UNSPECIFIED_REASON,
    ReasonCode::INVALID_AUTHENTICATION,
    ReasonCode::LEAVING_NETWORK_DEAUTH,
    ReasonCode::REASON_INACTIVITY,
    ReasonCode::NO_MORE_STAS,
    ReasonCode::INVALID_CLASS2FRAME,
    ReasonCode::INVALID_CLASS3FRAME,
    ReasonCode::LEAVING_NETWORK_DISASSOC,
    ReasonCode::NOT_AUTHENTICATED,
    ReasonCode::UNACCEPTABLE_POWER_CAPABILITY,
    ReasonCode::UNACCEPTABLE_SUPPORTED_CHANNELS,
    ReasonCode::BSS_TRANSITION_DISASSOC,
    ReasonCode::UNSPECIFIED_QOS_REASON,
    ReasonCode::NOT_ENOUGH_BANDWIDTH,
    ReasonCode::MISSING_ACKS,
    ReasonCode::EXCEEDED_TXOP,
    ReasonCode::AP_INITIATED,
];

/// Reasons an AP accepts in a disassociation frame from an associated client.
const AP_DISASSOC_REASONS: &[ReasonCode] = &[
    ReasonCode::UNSPECIFIED_REASON,
    ReasonCode::INVALID_AUTHENTICATION,
    ReasonCode::LEAVING_NETWORK_DEAUTH,
    ReasonCode::REASON_INACTIVITY,
    ReasonCode::LEAVING_NETWORK_DISASSOC,
    ReasonCode::UNACCEPTABLE_POWER_CAPABILITY,
    ReasonCode::UNACCEPTABLE_SUPPORTED_CHANNELS,
    ReasonCode::UNSPECIFIED_QOS_REASON,
    ReasonCode::STA_LEAVING,
    ReasonCode::PEER_INITIATED,
];

/// Which end of the link received the frame whose reason code is checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReasonRole {
    Sta,
    Ap,
}

impl ReasonCode {
    pub fn valid_for_deauth(self, role: ReasonRole) -> bool {
        match role {
            ReasonRole::Sta => STA_DEAUTH_REASONS.contains(&self),
            ReasonRole::Ap => AP_DEAUTH_REASONS.contains(&self),
        }
    }

    pub fn valid_for_disassoc(self, role: ReasonRole) -> bool {
        match role {
            ReasonRole::Sta => STA_DISASSOC_REASONS.contains(&self),
            ReasonRole::Ap => AP_DISASSOC_REASONS.contains(&self),
        }
    }
}
