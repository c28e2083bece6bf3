// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    bitfield::bitfield,
    byteorder::{ByteOrder, LittleEndian},
    zerocopy::{AsBytes, FromBytes, Unaligned},
};

pub mod reason;
pub mod status;

pub use {reason::{ReasonCode, ReasonRole}, status::StatusCode};

pub type MacAddr = [u8; 6];
pub const BCAST_ADDR: MacAddr = [0xFF; 6];
pub const ZERO_ADDR: MacAddr = [0x00; 6];

/// The I/G bit of the first octet marks group (multicast or broadcast) addresses.
pub fn is_group_addr(addr: &MacAddr) -> bool {
    addr[0] & 0x01 != 0
}

pub fn is_broadcast(addr: &MacAddr) -> bool {
    *addr == BCAST_ADDR
}

pub fn is_multicast_not_broadcast(addr: &MacAddr) -> bool {
    is_group_addr(addr) && !is_broadcast(addr)
}

// IEEE Std 802.11-2016, 9.2.4.1.3
// Frame types:
pub const FRAME_TYPE_MGMT: u16 = 0;
pub const FRAME_TYPE_CTRL: u16 = 1;
pub const FRAME_TYPE_DATA: u16 = 2;
// Management subtypes:
pub const MGMT_SUBTYPE_ASSOC_REQ: u16 = 0x00;
pub const MGMT_SUBTYPE_ASSOC_RESP: u16 = 0x01;
pub const MGMT_SUBTYPE_REASSOC_REQ: u16 = 0x02;
pub const MGMT_SUBTYPE_REASSOC_RESP: u16 = 0x03;
pub const MGMT_SUBTYPE_PROBE_REQ: u16 = 0x04;
pub const MGMT_SUBTYPE_PROBE_RESP: u16 = 0x05;
pub const MGMT_SUBTYPE_BEACON: u16 = 0x08;
pub const MGMT_SUBTYPE_DISASSOC: u16 = 0x0A;
pub const MGMT_SUBTYPE_AUTH: u16 = 0x0B;
pub const MGMT_SUBTYPE_DEAUTH: u16 = 0x0C;
pub const MGMT_SUBTYPE_ACTION: u16 = 0x0D;

// IEEE Std 802.11-2016, 9.4.1.8
pub const AID_MASK: u16 = 0x3FFF;
pub const MAX_AID: u16 = 2007;

pub const HT_CONTROL_LEN: usize = 4;

// IEEE Std 802.11-2016, 9.2.4.1.1
bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct FrameControl(u16);
    impl Debug;
    pub u16, protocol_version, set_protocol_version: 1, 0;
    pub u16, frame_type, set_frame_type: 3, 2;
    pub u16, frame_subtype, set_frame_subtype: 7, 4;
    pub to_ds, set_to_ds: 8;
    pub from_ds, set_from_ds: 9;
    pub more_fragments, set_more_fragments: 10;
    pub retry, set_retry: 11;
    pub power_mgmt, set_power_mgmt: 12;
    pub more_data, set_more_data: 13;
    pub protected, set_protected: 14;
    pub htc_order, set_htc_order: 15;
}

impl FrameControl {
    pub fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u16 {
        self.0
    }

    pub fn mgmt(subtype: u16) -> Self {
        let mut fc = Self(0);
        fc.set_frame_type(FRAME_TYPE_MGMT);
        fc.set_frame_subtype(subtype);
        fc
    }
}

// IEEE Std 802.11-2016, 9.2.4.4
bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct SequenceControl(u16);
    impl Debug;
    pub u16, frag_num, set_frag_num: 3, 0;
    pub u16, seq_num, set_seq_num: 15, 4;
}

impl SequenceControl {
    pub fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u16 {
        self.0
    }
}

// IEEE Std 802.11-2016, 9.4.1.4
bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct CapabilityInfo(u16);
    impl Debug;
    pub ess, set_ess: 0;
    pub ibss, set_ibss: 1;
    pub cf_pollable, set_cf_pollable: 2;
    pub cf_poll_req, set_cf_poll_req: 3;
    pub privacy, set_privacy: 4;
    pub short_preamble, set_short_preamble: 5;
    // 6-7 reserved
    pub spectrum_mgmt, set_spectrum_mgmt: 8;
    pub qos, set_qos: 9;
    pub short_slot_time, set_short_slot_time: 10;
    pub apsd, set_apsd: 11;
    pub radio_measurement, set_radio_measurement: 12;
    // 13 reserved
    pub delayed_block_ack, set_delayed_block_ack: 14;
    pub immediate_block_ack, set_immediate_block_ack: 15;
}

impl CapabilityInfo {
    pub fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u16 {
        self.0
    }
}

// IEEE Std 802.11-2016, 9.3.3.2
#[derive(FromBytes, AsBytes, Unaligned, PartialEq, Eq, Clone, Copy, Debug)]
#[repr(C, packed)]
pub struct MgmtHdr {
    pub frame_ctrl: [u8; 2],
    pub duration: [u8; 2],
    pub addr1: MacAddr,
    pub addr2: MacAddr,
    pub addr3: MacAddr,
    pub seq_ctrl: [u8; 2],
}

impl MgmtHdr {
    pub fn new(
        frame_ctrl: FrameControl,
        addr1: MacAddr,
        addr2: MacAddr,
        addr3: MacAddr,
        seq_ctrl: SequenceControl,
    ) -> Self {
        Self {
            frame_ctrl: frame_ctrl.raw().to_le_bytes(),
            duration: [0, 0],
            addr1,
            addr2,
            addr3,
            seq_ctrl: seq_ctrl.raw().to_le_bytes(),
        }
    }

    pub fn frame_ctrl(&self) -> FrameControl {
        FrameControl(LittleEndian::read_u16(&self.frame_ctrl))
    }

    pub fn duration(&self) -> u16 {
        LittleEndian::read_u16(&self.duration)
    }

    pub fn seq_ctrl(&self) -> SequenceControl {
        SequenceControl(LittleEndian::read_u16(&self.seq_ctrl))
    }
}

// IEEE Std 802.11-2016, 9.3.3.3
#[derive(FromBytes, AsBytes, Unaligned, PartialEq, Eq, Clone, Copy, Debug)]
#[repr(C, packed)]
pub struct BeaconHdr {
    pub timestamp: [u8; 8],
    pub beacon_interval: [u8; 2],
    pub capabilities: [u8; 2],
}

impl BeaconHdr {
    pub fn timestamp(&self) -> u64 {
        LittleEndian::read_u64(&self.timestamp)
    }

    pub fn beacon_interval(&self) -> u16 {
        LittleEndian::read_u16(&self.beacon_interval)
    }

    pub fn capabilities(&self) -> CapabilityInfo {
        CapabilityInfo(LittleEndian::read_u16(&self.capabilities))
    }
}

// IEEE Std 802.11-2016, 9.4.1.1
pub type AuthAlgorithmNumber = u16;
pub const AUTH_ALG_OPEN: AuthAlgorithmNumber = 0;
pub const AUTH_ALG_SHARED_KEY: AuthAlgorithmNumber = 1;
pub const AUTH_ALG_FAST_BSS_TRANSITION: AuthAlgorithmNumber = 2;
pub const AUTH_ALG_SAE: AuthAlgorithmNumber = 3;

// IEEE Std 802.11-2016, 9.3.3.12
#[derive(FromBytes, AsBytes, Unaligned, PartialEq, Eq, Clone, Copy, Debug)]
#[repr(C, packed)]
pub struct AuthHdr {
    pub auth_alg_num: [u8; 2],
    pub auth_txn_seq_num: [u8; 2],
    pub status_code: [u8; 2],
}

impl AuthHdr {
    pub fn auth_alg_num(&self) -> AuthAlgorithmNumber {
        LittleEndian::read_u16(&self.auth_alg_num)
    }

    pub fn auth_txn_seq_num(&self) -> u16 {
        LittleEndian::read_u16(&self.auth_txn_seq_num)
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode(LittleEndian::read_u16(&self.status_code))
    }
}

// IEEE Std 802.11-2016, 9.3.3.13 and 9.3.3.5
// Deauthentication and disassociation bodies share one layout.
#[derive(FromBytes, AsBytes, Unaligned, PartialEq, Eq, Clone, Copy, Debug)]
#[repr(C, packed)]
pub struct ReasonHdr {
    pub reason_code: [u8; 2],
}

impl ReasonHdr {
    pub fn reason_code(&self) -> ReasonCode {
        ReasonCode(LittleEndian::read_u16(&self.reason_code))
    }
}

// IEEE Std 802.11-2016, 9.3.3.6
#[derive(FromBytes, AsBytes, Unaligned, PartialEq, Eq, Clone, Copy, Debug)]
#[repr(C, packed)]
pub struct AssocReqHdr {
    pub capabilities: [u8; 2],
    pub listen_interval: [u8; 2],
}

impl AssocReqHdr {
    pub fn capabilities(&self) -> CapabilityInfo {
        CapabilityInfo(LittleEndian::read_u16(&self.capabilities))
    }

    pub fn listen_interval(&self) -> u16 {
        LittleEndian::read_u16(&self.listen_interval)
    }
}

// IEEE Std 802.11-2016, 9.3.3.8
#[derive(FromBytes, AsBytes, Unaligned, PartialEq, Eq, Clone, Copy, Debug)]
#[repr(C, packed)]
pub struct ReassocReqHdr {
    pub capabilities: [u8; 2],
    pub listen_interval: [u8; 2],
    pub current_ap: MacAddr,
}

impl ReassocReqHdr {
    pub fn capabilities(&self) -> CapabilityInfo {
        CapabilityInfo(LittleEndian::read_u16(&self.capabilities))
    }

    pub fn listen_interval(&self) -> u16 {
        LittleEndian::read_u16(&self.listen_interval)
    }
}

// IEEE Std 802.11-2016, 9.3.3.7 and 9.3.3.9
#[derive(FromBytes, AsBytes, Unaligned, PartialEq, Eq, Clone, Copy, Debug)]
#[repr(C, packed)]
pub struct AssocRespHdr {
    pub capabilities: [u8; 2],
    pub status_code: [u8; 2],
    pub aid: [u8; 2],
}

impl AssocRespHdr {
    pub fn capabilities(&self) -> CapabilityInfo {
        CapabilityInfo(LittleEndian::read_u16(&self.capabilities))
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode(LittleEndian::read_u16(&self.status_code))
    }

    /// Raw AID field including the two reserved top bits.
    pub fn raw_aid(&self) -> u16 {
        LittleEndian::read_u16(&self.aid)
    }

    pub fn aid(&self) -> u16 {
        self.raw_aid() & AID_MASK
    }
}

#[cfg(test)]
mod tests {
    use {super::*, zerocopy::LayoutVerified};

    #[test]
    fn frame_control_fields() {
        let fc = FrameControl::from_raw(0b1000_1000_1011_0000);
        assert_eq!(fc.frame_type(), FRAME_TYPE_MGMT);
        assert_eq!(fc.frame_subtype(), MGMT_SUBTYPE_AUTH);
        assert!(fc.retry());
        assert!(fc.htc_order());
        assert!(!fc.protected());

        let fc = FrameControl::mgmt(MGMT_SUBTYPE_DEAUTH);
        assert_eq!(fc.raw(), 0x00C0);
    }

    #[test]
    fn sequence_control_fields() {
        let mut sc = SequenceControl::default();
        sc.set_seq_num(0xABC);
        sc.set_frag_num(3);
        assert_eq!(sc.raw(), 0xABC3);
    }

    #[test]
    fn group_addresses() {
        assert!(is_group_addr(&BCAST_ADDR));
        assert!(is_broadcast(&BCAST_ADDR));
        assert!(is_multicast_not_broadcast(&[0x01, 0x00, 0x5E, 0, 0, 1]));
        assert!(!is_group_addr(&[0x02, 0, 0, 0, 0, 1]));
        assert!(!is_multicast_not_broadcast(&BCAST_ADDR));
    }

    #[test]
    fn assoc_resp_aid_masks_reserved_bits() {
        let bytes = [0x01, 0x00, 0x00, 0x00, 0x05, 0xC0];
        let hdr = LayoutVerified::<_, AssocRespHdr>::new_unaligned(&bytes[..]).expect("hdr");
        assert_eq!(hdr.raw_aid(), 0xC005);
        assert_eq!(hdr.aid(), 5);
        assert_eq!(hdr.status_code(), StatusCode::SUCCESS);
        assert!(hdr.capabilities().ess());
    }

    #[test]
    fn mgmt_hdr_layout() {
        let hdr = MgmtHdr::new(
            FrameControl::mgmt(MGMT_SUBTYPE_BEACON),
            BCAST_ADDR,
            [1; 6],
            [1; 6],
            SequenceControl::from_raw(0x10),
        );
        assert_eq!(hdr.as_bytes().len(), 24);
        assert_eq!(&hdr.as_bytes()[..2], &[0x80, 0x00]);
        assert_eq!(hdr.frame_ctrl().frame_subtype(), MGMT_SUBTYPE_BEACON);
        assert_eq!(hdr.seq_ctrl().seq_num(), 1);
    }
}
