// Copyright 2020 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::buffer_reader::BufferReader,
    byteorder::{BigEndian, ByteOrder},
};

/// Wi-Fi Simple Configuration Technical Specification v2.0.7, Section 8.2
pub const VENDOR_SPECIFIC_TYPE: u8 = 4;

/// Wi-Fi Simple Configuration Technical Specification v2.0.7, Section 12, Table 28
pub const ATTR_DEVICE_PASSWORD_ID: u16 = 0x1012;
pub const ATTR_REQUEST_TYPE: u16 = 0x103A;
pub const ATTR_UUID_E: u16 = 0x1047;
pub const ATTR_VERSION: u16 = 0x104A;

/// Wi-Fi Simple Configuration Technical Specification v2.0.7, Section 12, Table 37
pub const DEVICE_PASSWORD_ID_PIN: u16 = 0x0000;
pub const DEVICE_PASSWORD_ID_PUSH_BUTTON: u16 = 0x0004;

pub const UUID_LEN: usize = 16;

pub type Uuid = [u8; UUID_LEN];

/// WSC attributes carried in probe requests that matter for push-button overlap detection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WscInfo {
    pub device_password_id: Option<u16>,
    pub request_type: Option<u8>,
    pub uuid_e: Option<Uuid>,
}

impl WscInfo {
    /// Parses big-endian TLV attributes following the WSC vendor header. Returns `None` when an
    /// attribute overruns the element.
    pub fn parse(attrs: &[u8]) -> Option<Self> {
        let mut info = Self::default();
        let mut reader = BufferReader::new(attrs);
        while reader.bytes_remaining() > 0 {
            let attr_type = BigEndian::read_u16(reader.read_bytes(2)?);
            let attr_len = BigEndian::read_u16(reader.read_bytes(2)?) as usize;
            let value = reader.read_bytes(attr_len)?;
            match attr_type {
                ATTR_DEVICE_PASSWORD_ID if value.len() == 2 => {
                    info.device_password_id = Some(BigEndian::read_u16(value))
                }
                ATTR_REQUEST_TYPE if value.len() == 1 => info.request_type = Some(value[0]),
                ATTR_UUID_E if value.len() == UUID_LEN => {
                    let mut uuid = [0u8; UUID_LEN];
                    uuid.copy_from_slice(value);
                    info.uuid_e = Some(uuid);
                }
                _ => (),
            }
        }
        Some(info)
    }

    pub fn is_push_button(&self) -> bool {
        self.device_password_id == Some(DEVICE_PASSWORD_ID_PUSH_BUTTON)
    }
}

/// Builds the attribute list of a push-button probe request.
pub fn push_button_probe_attrs(uuid_e: &Uuid) -> Vec<u8> {
    let mut attrs = vec![];
    let mut push_attr = |attr_type: u16, value: &[u8]| {
        attrs.extend_from_slice(&attr_type.to_be_bytes());
        attrs.extend_from_slice(&(value.len() as u16).to_be_bytes());
        attrs.extend_from_slice(value);
    };
    push_attr(ATTR_VERSION, &[0x10]);
    push_attr(ATTR_REQUEST_TYPE, &[0x01]);
    push_attr(ATTR_UUID_E, &uuid_e[..]);
    push_attr(ATTR_DEVICE_PASSWORD_ID, &DEVICE_PASSWORD_ID_PUSH_BUTTON.to_be_bytes());
    attrs
}
