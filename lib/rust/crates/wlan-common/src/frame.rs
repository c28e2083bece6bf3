// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Decoded management frames. A received buffer is parsed once into a [`MgmtFrame`]; handlers
//! work on the decoded record and never index into raw bytes themselves.

use {
    crate::{
        buffer_reader::BufferReader,
        error::FrameParseError,
        ie::Elements,
        mac::{
            self, AssocReqHdr, AssocRespHdr, AuthHdr, BeaconHdr, CapabilityInfo, FrameControl,
            MacAddr, MgmtHdr, ReasonCode, ReasonHdr, ReassocReqHdr, SequenceControl, StatusCode,
        },
    },
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MgmtFrame {
    pub frame_ctrl: FrameControl,
    pub duration: u16,
    /// Receiver address.
    pub addr1: MacAddr,
    /// Transmitter address.
    pub addr2: MacAddr,
    /// BSSID.
    pub addr3: MacAddr,
    pub seq_ctrl: SequenceControl,
    pub body: MgmtBody,
}

impl MgmtFrame {
    pub fn da(&self) -> MacAddr {
        self.addr1
    }

    pub fn sa(&self) -> MacAddr {
        self.addr2
    }

    pub fn bssid(&self) -> MacAddr {
        self.addr3
    }

    pub fn is_retry(&self) -> bool {
        self.frame_ctrl.retry()
    }

    pub fn subtype(&self) -> u16 {
        self.frame_ctrl.frame_subtype()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BeaconFields {
    pub timestamp: u64,
    pub beacon_interval: u16,
    pub capabilities: CapabilityInfo,
    pub elements: Elements,
    /// The undecoded element bytes, retained for consumers storing the join beacon.
    pub raw_elements: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssocRespFields {
    pub capabilities: CapabilityInfo,
    pub status_code: StatusCode,
    /// AID with the two reserved top bits masked off.
    pub aid: u16,
    pub elements: Elements,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MgmtBody {
    Beacon(BeaconFields),
    ProbeResp(BeaconFields),
    ProbeReq { elements: Elements },
    AssocReq { capabilities: CapabilityInfo, listen_interval: u16, elements: Elements },
    ReassocReq {
        capabilities: CapabilityInfo,
        listen_interval: u16,
        current_ap: MacAddr,
        elements: Elements,
    },
    AssocResp(AssocRespFields),
    ReassocResp(AssocRespFields),
    Auth { auth_alg_num: u16, auth_txn_seq_num: u16, status_code: StatusCode, elements: Elements },
    Deauth { reason_code: ReasonCode },
    Disassoc { reason_code: ReasonCode },
    Unsupported { subtype: u16 },
}

impl MgmtBody {
    pub fn elements(&self) -> Option<&Elements> {
        match self {
            MgmtBody::Beacon(f) | MgmtBody::ProbeResp(f) => Some(&f.elements),
            MgmtBody::ProbeReq { elements }
            | MgmtBody::AssocReq { elements, .. }
            | MgmtBody::ReassocReq { elements, .. }
            | MgmtBody::Auth { elements, .. } => Some(elements),
            MgmtBody::AssocResp(f) | MgmtBody::ReassocResp(f) => Some(&f.elements),
            MgmtBody::Deauth { .. } | MgmtBody::Disassoc { .. } | MgmtBody::Unsupported { .. } => {
                None
            }
        }
    }
}

/// Parses a management frame, MAC header first. Fails on truncation or a malformed element
/// sequence; unsupported subtypes decode to `MgmtBody::Unsupported`.
pub fn parse_mgmt_frame(bytes: &[u8]) -> Result<MgmtFrame, FrameParseError> {
    let mut reader = BufferReader::new(bytes);
    let hdr = reader.read::<MgmtHdr>().ok_or(FrameParseError::TooShort("mgmt header"))?;
    let frame_ctrl = hdr.frame_ctrl();
    if frame_ctrl.frame_type() != mac::FRAME_TYPE_MGMT {
        return Err(FrameParseError::UnsupportedType(frame_ctrl.frame_type()));
    }
    if frame_ctrl.htc_order() {
        reader.read_bytes(mac::HT_CONTROL_LEN).ok_or(FrameParseError::TooShort("HT control"))?;
    }
    let body = parse_mgmt_body(frame_ctrl.frame_subtype(), reader)?;
    Ok(MgmtFrame {
        frame_ctrl,
        duration: hdr.duration(),
        addr1: hdr.addr1,
        addr2: hdr.addr2,
        addr3: hdr.addr3,
        seq_ctrl: hdr.seq_ctrl(),
        body,
    })
}

fn parse_beacon_fields(mut reader: BufferReader<'_>) -> Result<BeaconFields, FrameParseError> {
    let hdr = reader.read::<BeaconHdr>().ok_or(FrameParseError::TooShort("beacon fields"))?;
    let raw_elements = reader.into_remaining();
    Ok(BeaconFields {
        timestamp: hdr.timestamp(),
        beacon_interval: hdr.beacon_interval(),
        capabilities: hdr.capabilities(),
        elements: Elements::parse(raw_elements)?,
        raw_elements: raw_elements.to_vec(),
    })
}

fn parse_assoc_resp_fields(
    mut reader: BufferReader<'_>,
) -> Result<AssocRespFields, FrameParseError> {
    let hdr = reader.read::<AssocRespHdr>().ok_or(FrameParseError::TooShort("assoc resp"))?;
    Ok(AssocRespFields {
        capabilities: hdr.capabilities(),
        status_code: hdr.status_code(),
        aid: hdr.aid(),
        elements: Elements::parse(reader.into_remaining())?,
    })
}

fn parse_mgmt_body(subtype: u16, mut reader: BufferReader<'_>) -> Result<MgmtBody, FrameParseError> {
    Ok(match subtype {
        mac::MGMT_SUBTYPE_BEACON => MgmtBody::Beacon(parse_beacon_fields(reader)?),
        mac::MGMT_SUBTYPE_PROBE_RESP => MgmtBody::ProbeResp(parse_beacon_fields(reader)?),
        mac::MGMT_SUBTYPE_PROBE_REQ => {
            MgmtBody::ProbeReq { elements: Elements::parse(reader.into_remaining())? }
        }
        mac::MGMT_SUBTYPE_ASSOC_REQ => {
            let hdr = reader.read::<AssocReqHdr>().ok_or(FrameParseError::TooShort("assoc req"))?;
            MgmtBody::AssocReq {
                capabilities: hdr.capabilities(),
                listen_interval: hdr.listen_interval(),
                elements: Elements::parse(reader.into_remaining())?,
            }
        }
        mac::MGMT_SUBTYPE_REASSOC_REQ => {
            let hdr =
                reader.read::<ReassocReqHdr>().ok_or(FrameParseError::TooShort("reassoc req"))?;
            MgmtBody::ReassocReq {
                capabilities: hdr.capabilities(),
                listen_interval: hdr.listen_interval(),
                current_ap: hdr.current_ap,
                elements: Elements::parse(reader.into_remaining())?,
            }
        }
        mac::MGMT_SUBTYPE_ASSOC_RESP => MgmtBody::AssocResp(parse_assoc_resp_fields(reader)?),
        mac::MGMT_SUBTYPE_REASSOC_RESP => MgmtBody::ReassocResp(parse_assoc_resp_fields(reader)?),
        mac::MGMT_SUBTYPE_AUTH => {
            let hdr = reader.read::<AuthHdr>().ok_or(FrameParseError::TooShort("auth"))?;
            MgmtBody::Auth {
                auth_alg_num: hdr.auth_alg_num(),
                auth_txn_seq_num: hdr.auth_txn_seq_num(),
                status_code: hdr.status_code(),
                elements: Elements::parse(reader.into_remaining())?,
            }
        }
        mac::MGMT_SUBTYPE_DEAUTH => {
            let hdr = reader.read::<ReasonHdr>().ok_or(FrameParseError::TooShort("deauth"))?;
            MgmtBody::Deauth { reason_code: hdr.reason_code() }
        }
        mac::MGMT_SUBTYPE_DISASSOC => {
            let hdr = reader.read::<ReasonHdr>().ok_or(FrameParseError::TooShort("disassoc"))?;
            MgmtBody::Disassoc { reason_code: hdr.reason_code() }
        }
        subtype => MgmtBody::Unsupported { subtype },
    })
}

#[cfg(test)]
mod tests {
    use {super::*, crate::assert_variant};

    #[test]
    fn parse_deauth() {
        #[rustfmt::skip]
        let bytes = [
            0xc0, 0x00, // frame control: deauth
            0x00, 0x00, // duration
            1, 1, 1, 1, 1, 1, // addr1
            2, 2, 2, 2, 2, 2, // addr2
            2, 2, 2, 2, 2, 2, // addr3
            0x30, 0x00, // seq ctrl
            0x03, 0x00, // reason code
        ];
        let frame = parse_mgmt_frame(&bytes[..]).expect("valid frame");
        assert_eq!(frame.da(), [1; 6]);
        assert_eq!(frame.sa(), [2; 6]);
        assert_eq!(frame.bssid(), [2; 6]);
        assert_eq!(frame.seq_ctrl.seq_num(), 3);
        assert_variant!(frame.body, MgmtBody::Deauth { reason_code } => {
            assert_eq!(reason_code, ReasonCode::LEAVING_NETWORK_DEAUTH);
        });
    }

    #[test]
    fn parse_assoc_resp_masks_aid() {
        #[rustfmt::skip]
        let bytes = [
            0x10, 0x00, 0x00, 0x00,
            1, 1, 1, 1, 1, 1,
            2, 2, 2, 2, 2, 2,
            2, 2, 2, 2, 2, 2,
            0x00, 0x00,
            0x01, 0x00, // capabilities
            0x00, 0x00, // status
            0x2a, 0xc0, // aid with reserved bits set
            1, 1, 0x82, // supported rates
        ];
        let frame = parse_mgmt_frame(&bytes[..]).expect("valid frame");
        assert_variant!(frame.body, MgmtBody::AssocResp(fields) => {
            assert_eq!(fields.aid, 42);
            assert!(fields.status_code.is_success());
            assert_eq!(fields.elements.supported_rates, vec![0x82]);
        });
    }

    #[test]
    fn skips_ht_control() {
        #[rustfmt::skip]
        let bytes = [
            0xa0, 0x80, // disassoc with +HTC
            0x00, 0x00,
            1, 1, 1, 1, 1, 1,
            2, 2, 2, 2, 2, 2,
            2, 2, 2, 2, 2, 2,
            0x00, 0x00,
            0xaa, 0xbb, 0xcc, 0xdd, // HT control
            0x08, 0x00,
        ];
        let frame = parse_mgmt_frame(&bytes[..]).expect("valid frame");
        assert_eq!(frame.body, MgmtBody::Disassoc { reason_code: ReasonCode::LEAVING_NETWORK_DISASSOC });
    }

    #[test]
    fn too_short() {
        assert_eq!(parse_mgmt_frame(&[0u8; 10][..]), Err(FrameParseError::TooShort("mgmt header")));
        let mut bytes = vec![0xc0, 0x00];
        bytes.extend_from_slice(&[0u8; 22]);
        assert_eq!(parse_mgmt_frame(&bytes[..]), Err(FrameParseError::TooShort("deauth")));
    }

    #[test]
    fn data_frame_rejected() {
        let mut bytes = vec![0x08, 0x00];
        bytes.extend_from_slice(&[0u8; 22]);
        assert_eq!(parse_mgmt_frame(&bytes[..]), Err(FrameParseError::UnsupportedType(2)));
    }

    #[test]
    fn malformed_beacon_elements() {
        let mut bytes = vec![0x80, 0x00];
        bytes.extend_from_slice(&[0u8; 22]);
        bytes.extend_from_slice(&[0u8; 12]);
        bytes.extend_from_slice(&[0, 5, b'a']);
        assert_eq!(
            parse_mgmt_frame(&bytes[..]),
            Err(FrameParseError::TruncatedElement { id: 0 })
        );
    }

    #[test]
    fn unsupported_subtype() {
        let mut bytes = vec![0xd0, 0x00];
        bytes.extend_from_slice(&[0u8; 22]);
        bytes.extend_from_slice(&[1, 2, 3]);
        let frame = parse_mgmt_frame(&bytes[..]).expect("valid frame");
        assert_eq!(frame.body, MgmtBody::Unsupported { subtype: mac::MGMT_SUBTYPE_ACTION });
        assert!(frame.body.elements().is_none());
    }
}
