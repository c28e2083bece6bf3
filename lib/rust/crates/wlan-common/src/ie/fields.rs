// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {crate::buffer_reader::BufferReader, bitfield::bitfield, std::cmp::min};

pub const HT_CAPABILITIES_LEN: usize = 26;
pub const VHT_CAPABILITIES_LEN: usize = 12;
pub const EDCA_PARAM_SET_LEN: usize = 18;

// IEEE Std 802.11-2016, 9.4.2.56
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HtCapabilities {
    pub ht_cap_info: u16,
    pub ampdu_params: u8,
    pub mcs_set: [u8; 16],
    pub ht_ext_cap: u16,
    pub txbf_cap: u32,
    pub asel_cap: u8,
}

impl HtCapabilities {
    pub fn parse(body: &[u8]) -> Option<Self> {
        if body.len() != HT_CAPABILITIES_LEN {
            return None;
        }
        let mut reader = BufferReader::new(body);
        let ht_cap_info = reader.read_u16_le()?;
        let ampdu_params = reader.read_byte()?;
        let mut mcs_set = [0u8; 16];
        mcs_set.copy_from_slice(reader.read_bytes(16)?);
        Some(Self {
            ht_cap_info,
            ampdu_params,
            mcs_set,
            ht_ext_cap: reader.read_u16_le()?,
            txbf_cap: reader.read_u32_le()?,
            asel_cap: reader.read_byte()?,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HT_CAPABILITIES_LEN);
        bytes.extend_from_slice(&self.ht_cap_info.to_le_bytes());
        bytes.push(self.ampdu_params);
        bytes.extend_from_slice(&self.mcs_set);
        bytes.extend_from_slice(&self.ht_ext_cap.to_le_bytes());
        bytes.extend_from_slice(&self.txbf_cap.to_le_bytes());
        bytes.push(self.asel_cap);
        bytes
    }
}

// IEEE Std 802.11-2016, 9.4.2.158
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VhtCapabilities {
    pub vht_cap_info: u32,
    pub vht_mcs_nss: u64,
}

impl VhtCapabilities {
    pub fn parse(body: &[u8]) -> Option<Self> {
        if body.len() != VHT_CAPABILITIES_LEN {
            return None;
        }
        let mut reader = BufferReader::new(body);
        Some(Self { vht_cap_info: reader.read_u32_le()?, vht_mcs_nss: reader.read_u64_le()? })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(VHT_CAPABILITIES_LEN);
        bytes.extend_from_slice(&self.vht_cap_info.to_le_bytes());
        bytes.extend_from_slice(&self.vht_mcs_nss.to_le_bytes());
        bytes
    }
}

// IEEE Std 802.11-2016, 9.4.2.29, Figure 9-263
bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct AciAifsn(u8);
    impl Debug;
    pub u8, aifsn, set_aifsn: 3, 0;
    pub acm, set_acm: 4;
    pub u8, aci, set_aci: 6, 5;
}

// IEEE Std 802.11-2016, 9.4.2.29, Figure 9-264
bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct EcwMinMax(u8);
    impl Debug;
    pub u8, ecw_min, set_ecw_min: 3, 0;
    pub u8, ecw_max, set_ecw_max: 7, 4;
}

/// Access category index values used by `AciAifsn::aci`.
pub const ACI_BE: u8 = 0;
pub const ACI_BK: u8 = 1;
pub const ACI_VI: u8 = 2;
pub const ACI_VO: u8 = 3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EdcaAcParams {
    pub aifsn: u8,
    pub acm: bool,
    pub ecw_min: u8,
    pub ecw_max: u8,
    pub txop_limit: u16,
}

impl EdcaAcParams {
    fn parse(record: &[u8]) -> Option<(u8, Self)> {
        let mut reader = BufferReader::new(record);
        let aci_aifsn = AciAifsn(reader.read_byte()?);
        let ecw = EcwMinMax(reader.read_byte()?);
        let txop_limit = reader.read_u16_le()?;
        Some((
            aci_aifsn.aci(),
            Self {
                aifsn: aci_aifsn.aifsn(),
                acm: aci_aifsn.acm(),
                ecw_min: ecw.ecw_min(),
                ecw_max: ecw.ecw_max(),
                txop_limit,
            },
        ))
    }

    fn write(&self, aci: u8, bytes: &mut Vec<u8>) {
        let mut aci_aifsn = AciAifsn(0);
        aci_aifsn.set_aifsn(self.aifsn);
        aci_aifsn.set_acm(self.acm);
        aci_aifsn.set_aci(aci);
        let mut ecw = EcwMinMax(0);
        ecw.set_ecw_min(self.ecw_min);
        ecw.set_ecw_max(self.ecw_max);
        bytes.push(aci_aifsn.0);
        bytes.push(ecw.0);
        bytes.extend_from_slice(&self.txop_limit.to_le_bytes());
    }

    /// Combines the locally supported and the peer's advertised parameters field by field,
    /// keeping the smaller of each. Admission control stays mandatory if either side demands it.
    pub fn negotiate(&self, peer: &Self) -> Self {
        Self {
            aifsn: min(self.aifsn, peer.aifsn),
            acm: self.acm || peer.acm,
            ecw_min: min(self.ecw_min, peer.ecw_min),
            ecw_max: min(self.ecw_max, peer.ecw_max),
            txop_limit: min(self.txop_limit, peer.txop_limit),
        }
    }
}

// IEEE Std 802.11-2016, 9.4.2.29
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EdcaParams {
    pub qos_info: u8,
    pub ac_be: EdcaAcParams,
    pub ac_bk: EdcaAcParams,
    pub ac_vi: EdcaAcParams,
    pub ac_vo: EdcaAcParams,
}

impl EdcaParams {
    /// Parses QoS info, one reserved byte and four AC parameter records. Records are placed
    /// by their ACI field rather than by position.
    pub fn parse(body: &[u8]) -> Option<Self> {
        if body.len() != EDCA_PARAM_SET_LEN {
            return None;
        }
        let mut params = Self { qos_info: body[0], ..Default::default() };
        for record in body[2..].chunks(4) {
            let (aci, ac) = EdcaAcParams::parse(record)?;
            match aci {
                ACI_BE => params.ac_be = ac,
                ACI_BK => params.ac_bk = ac,
                ACI_VI => params.ac_vi = ac,
                _ => params.ac_vo = ac,
            }
        }
        Some(params)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(EDCA_PARAM_SET_LEN);
        bytes.push(self.qos_info);
        bytes.push(0);
        self.ac_be.write(ACI_BE, &mut bytes);
        self.ac_bk.write(ACI_BK, &mut bytes);
        self.ac_vi.write(ACI_VI, &mut bytes);
        self.ac_vo.write(ACI_VO, &mut bytes);
        bytes
    }

    pub fn negotiate(&self, peer: &Self) -> Self {
        Self {
            qos_info: peer.qos_info,
            ac_be: self.ac_be.negotiate(&peer.ac_be),
            ac_bk: self.ac_bk.negotiate(&peer.ac_bk),
            ac_vi: self.ac_vi.negotiate(&peer.ac_vi),
            ac_vo: self.ac_vo.negotiate(&peer.ac_vo),
        }
    }

    pub fn any_acm(&self) -> bool {
        self.ac_be.acm || self.ac_bk.acm || self.ac_vi.acm || self.ac_vo.acm
    }
}

// IEEE Std 802.11-2016, 9.4.2.19
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelSwitchAnnouncement {
    pub mode: u8,
    pub new_channel: u8,
    pub count: u8,
}

impl ChannelSwitchAnnouncement {
    pub fn parse(body: &[u8]) -> Option<Self> {
        match body {
            [mode, new_channel, count] => {
                Some(Self { mode: *mode, new_channel: *new_channel, count: *count })
            }
            _ => None,
        }
    }
}

// IEEE Std 802.11-2016, 9.4.2.49
pub const TIMEOUT_INTERVAL_ASSOC_COMEBACK: u8 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeoutInterval {
    pub interval_type: u8,
    pub value: u32,
}

impl TimeoutInterval {
    pub fn parse(body: &[u8]) -> Option<Self> {
        if body.len() != 5 {
            return None;
        }
        let mut reader = BufferReader::new(body);
        Some(Self { interval_type: reader.read_byte()?, value: reader.read_u32_le()? })
    }
}
