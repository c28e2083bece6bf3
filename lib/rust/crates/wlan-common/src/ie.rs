// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::error::FrameParseError,
    zerocopy::{AsBytes, FromBytes, Unaligned},
};

mod fields;
mod reader;
pub mod wsc;
mod writer;

pub use {fields::*, reader::*, writer::*};

pub const IE_MAX_LEN: usize = 255;
pub const SSID_MAX_LEN: usize = 32;
pub const SUPPORTED_RATES_MAX_LEN: usize = 8;

/// IEEE Std 802.11-2016, 9.4.2.1, Table 9-77
#[repr(C, packed)]
#[derive(AsBytes, FromBytes, Unaligned, PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct Id(pub u8);

impl Id {
    pub const SSID: Self = Self(0);
    pub const SUPPORTED_RATES: Self = Self(1);
    pub const DSSS_PARAM_SET: Self = Self(3);
    pub const TIM: Self = Self(5);
    pub const COUNTRY: Self = Self(7);
    pub const EDCA_PARAM_SET: Self = Self(12);
    pub const CHANNEL_SWITCH_ANNOUNCEMENT: Self = Self(37);
    pub const HT_CAPABILITIES: Self = Self(45);
    pub const RSNE: Self = Self(48);
    pub const EXT_SUPPORTED_RATES: Self = Self(50);
    pub const TIMEOUT_INTERVAL: Self = Self(56);
    pub const HT_OPERATION: Self = Self(61);
    pub const VHT_CAPABILITIES: Self = Self(191);
    pub const VHT_OPERATION: Self = Self(192);
    pub const VENDOR_SPECIFIC: Self = Self(221);
    pub const EXTENSION: Self = Self(255);
}

/// IEEE Std 802.11-2016, 9.4.2.1, Table 9-77: Element ID Extension values.
pub const EXT_ID_HE_CAPABILITIES: u8 = 35;
pub const EXT_ID_HE_OPERATION: u8 = 36;

pub const WFA_OUI: [u8; 3] = [0x00, 0x50, 0xF2];
pub const WMM_OUI_TYPE: u8 = 2;
pub const WMM_PARAM_OUI_SUBTYPE: u8 = 1;

#[repr(C, packed)]
#[derive(AsBytes, FromBytes, Unaligned, Clone, Copy, Debug)]
pub struct Header {
    pub id: Id,
    pub body_len: u8,
}

/// The subset of elements the MLME acts upon, decoded once per received frame.
/// Elements this MLME does not act upon are skipped but still length-checked.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Elements {
    pub ssid: Option<Vec<u8>>,
    pub supported_rates: Vec<u8>,
    pub dsss_channel: Option<u8>,
    pub edca: Option<EdcaParams>,
    pub csa: Option<ChannelSwitchAnnouncement>,
    pub ht_cap: Option<HtCapabilities>,
    pub ht_op: Option<Vec<u8>>,
    pub vht_cap: Option<VhtCapabilities>,
    pub he_cap: Option<Vec<u8>>,
    pub rsne: Option<Vec<u8>>,
    pub timeout_interval: Option<TimeoutInterval>,
    pub wsc: Option<wsc::WscInfo>,
}

impl Elements {
    /// Decodes an element sequence. Fails if any element overruns the buffer or if an element
    /// the MLME acts upon has an invalid body.
    pub fn parse(bytes: &[u8]) -> Result<Self, FrameParseError> {
        validate_elements(bytes)?;
        let mut elements = Self::default();
        for (id, body) in Reader::new(bytes) {
            match id {
                Id::SSID => {
                    if body.len() > SSID_MAX_LEN {
                        return Err(malformed(id, "SSID too long"));
                    }
                    elements.ssid = Some(body.to_vec());
                }
                Id::SUPPORTED_RATES | Id::EXT_SUPPORTED_RATES => {
                    elements.supported_rates.extend_from_slice(body)
                }
                Id::DSSS_PARAM_SET => match body {
                    [channel] => elements.dsss_channel = Some(*channel),
                    _ => return Err(malformed(id, "DSSS parameter set must be 1 byte")),
                },
                Id::EDCA_PARAM_SET => {
                    let edca = EdcaParams::parse(body)
                        .ok_or_else(|| malformed(id, "EDCA parameter set length"))?;
                    elements.edca = Some(edca);
                }
                Id::CHANNEL_SWITCH_ANNOUNCEMENT => {
                    let csa = ChannelSwitchAnnouncement::parse(body)
                        .ok_or_else(|| malformed(id, "channel switch announcement length"))?;
                    elements.csa = Some(csa);
                }
                Id::HT_CAPABILITIES => {
                    let ht_cap = HtCapabilities::parse(body)
                        .ok_or_else(|| malformed(id, "HT capabilities length"))?;
                    elements.ht_cap = Some(ht_cap);
                }
                Id::HT_OPERATION => elements.ht_op = Some(body.to_vec()),
                Id::VHT_CAPABILITIES => {
                    let vht_cap = VhtCapabilities::parse(body)
                        .ok_or_else(|| malformed(id, "VHT capabilities length"))?;
                    elements.vht_cap = Some(vht_cap);
                }
                Id::RSNE => elements.rsne = Some(body.to_vec()),
                Id::TIMEOUT_INTERVAL => {
                    let ti = TimeoutInterval::parse(body)
                        .ok_or_else(|| malformed(id, "timeout interval length"))?;
                    elements.timeout_interval = Some(ti);
                }
                Id::EXTENSION => match body.split_first() {
                    Some((&EXT_ID_HE_CAPABILITIES, rest)) => elements.he_cap = Some(rest.to_vec()),
                    Some(_) => (),
                    None => return Err(malformed(id, "missing extension id")),
                },
                Id::VENDOR_SPECIFIC => elements.parse_vendor(body)?,
                _ => (),
            }
        }
        Ok(elements)
    }

    fn parse_vendor(&mut self, body: &[u8]) -> Result<(), FrameParseError> {
        if body.len() < 4 || body[..3] != WFA_OUI {
            return Ok(());
        }
        match body[3] {
            WMM_OUI_TYPE => {
                // WMM parameter element: subtype, version, then the EDCA parameter record.
                if body.len() >= 6 && body[4] == WMM_PARAM_OUI_SUBTYPE && self.edca.is_none() {
                    let edca = EdcaParams::parse(&body[6..]).ok_or_else(|| {
                        malformed(Id::VENDOR_SPECIFIC, "WMM parameter element length")
                    })?;
                    self.edca = Some(edca);
                }
            }
            wsc::VENDOR_SPECIFIC_TYPE => {
                self.wsc = Some(wsc::WscInfo::parse(&body[4..]).ok_or_else(|| {
                    malformed(Id::VENDOR_SPECIFIC, "WSC attributes overrun element")
                })?);
            }
            _ => (),
        }
        Ok(())
    }
}

fn malformed(id: Id, reason: &'static str) -> FrameParseError {
    FrameParseError::MalformedElement { id: id.0, reason }
}
