// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    super::{
        wsc, ChannelSwitchAnnouncement, EdcaParams, HtCapabilities, Id, TimeoutInterval,
        VhtCapabilities, EXT_ID_HE_CAPABILITIES, IE_MAX_LEN, SSID_MAX_LEN,
        SUPPORTED_RATES_MAX_LEN, WFA_OUI,
    },
    crate::{appendable::Appendable, error::FrameWriteError},
};

fn write_element<B: Appendable>(buf: &mut B, id: Id, body: &[u8]) -> Result<(), FrameWriteError> {
    if body.len() > IE_MAX_LEN {
        return Err(FrameWriteError::new_invalid_data(format!(
            "element {} body of {} bytes exceeds {}",
            id.0,
            body.len(),
            IE_MAX_LEN
        )));
    }
    buf.append_byte(id.0)?;
    buf.append_byte(body.len() as u8)?;
    buf.append_bytes(body)?;
    Ok(())
}

pub fn write_ssid<B: Appendable>(buf: &mut B, ssid: &[u8]) -> Result<(), FrameWriteError> {
    if ssid.len() > SSID_MAX_LEN {
        return Err(FrameWriteError::new_invalid_data("SSID too long"));
    }
    write_element(buf, Id::SSID, ssid)
}

pub fn write_supported_rates<B: Appendable>(
    buf: &mut B,
    rates: &[u8],
) -> Result<(), FrameWriteError> {
    if rates.is_empty() {
        return Err(FrameWriteError::new_invalid_data("no rates to write"));
    }
    if rates.len() > SUPPORTED_RATES_MAX_LEN {
        return Err(FrameWriteError::new_invalid_data("too many supported rates"));
    }
    write_element(buf, Id::SUPPORTED_RATES, rates)
}

pub fn write_ext_supported_rates<B: Appendable>(
    buf: &mut B,
    rates: &[u8],
) -> Result<(), FrameWriteError> {
    if rates.is_empty() {
        return Err(FrameWriteError::new_invalid_data("no extended rates to write"));
    }
    write_element(buf, Id::EXT_SUPPORTED_RATES, rates)
}

/// Writes up to eight rates into Supported Rates and spills the rest into Extended Supported
/// Rates.
pub fn write_rates<B: Appendable>(buf: &mut B, rates: &[u8]) -> Result<(), FrameWriteError> {
    let split = rates.len().min(SUPPORTED_RATES_MAX_LEN);
    write_supported_rates(buf, &rates[..split])?;
    if rates.len() > split {
        write_ext_supported_rates(buf, &rates[split..])?;
    }
    Ok(())
}

pub fn write_dsss_param_set<B: Appendable>(buf: &mut B, channel: u8) -> Result<(), FrameWriteError> {
    write_element(buf, Id::DSSS_PARAM_SET, &[channel])
}

pub fn write_edca_param_set<B: Appendable>(
    buf: &mut B,
    edca: &EdcaParams,
) -> Result<(), FrameWriteError> {
    write_element(buf, Id::EDCA_PARAM_SET, &edca.to_bytes()[..])
}

pub fn write_csa<B: Appendable>(
    buf: &mut B,
    csa: &ChannelSwitchAnnouncement,
) -> Result<(), FrameWriteError> {
    write_element(buf, Id::CHANNEL_SWITCH_ANNOUNCEMENT, &[csa.mode, csa.new_channel, csa.count])
}

pub fn write_ht_capabilities<B: Appendable>(
    buf: &mut B,
    ht_cap: &HtCapabilities,
) -> Result<(), FrameWriteError> {
    write_element(buf, Id::HT_CAPABILITIES, &ht_cap.to_bytes()[..])
}

pub fn write_vht_capabilities<B: Appendable>(
    buf: &mut B,
    vht_cap: &VhtCapabilities,
) -> Result<(), FrameWriteError> {
    write_element(buf, Id::VHT_CAPABILITIES, &vht_cap.to_bytes()[..])
}

pub fn write_he_capabilities<B: Appendable>(
    buf: &mut B,
    he_cap: &[u8],
) -> Result<(), FrameWriteError> {
    let mut body = Vec::with_capacity(he_cap.len() + 1);
    body.push(EXT_ID_HE_CAPABILITIES);
    body.extend_from_slice(he_cap);
    write_element(buf, Id::EXTENSION, &body[..])
}

pub fn write_rsne<B: Appendable>(buf: &mut B, rsne_body: &[u8]) -> Result<(), FrameWriteError> {
    write_element(buf, Id::RSNE, rsne_body)
}

pub fn write_timeout_interval<B: Appendable>(
    buf: &mut B,
    ti: &TimeoutInterval,
) -> Result<(), FrameWriteError> {
    let mut body = [0u8; 5];
    body[0] = ti.interval_type;
    body[1..].copy_from_slice(&ti.value.to_le_bytes());
    write_element(buf, Id::TIMEOUT_INTERVAL, &body[..])
}

pub fn write_wsc<B: Appendable>(buf: &mut B, attrs: &[u8]) -> Result<(), FrameWriteError> {
    let mut body = Vec::with_capacity(attrs.len() + 4);
    body.extend_from_slice(&WFA_OUI[..]);
    body.push(wsc::VENDOR_SPECIFIC_TYPE);
    body.extend_from_slice(attrs);
    write_element(buf, Id::VENDOR_SPECIFIC, &body[..])
}

#[cfg(test)]
mod tests {
    use {super::*, crate::ie::Elements};

    #[test]
    fn ssid_too_long() {
        let mut buf = vec![];
        assert!(write_ssid(&mut buf, &[b'a'; 33][..]).is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn rates_split_into_extended() {
        let mut buf = vec![];
        write_rates(&mut buf, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10][..]).expect("write rates");
        assert_eq!(&buf[..], &[1, 8, 1, 2, 3, 4, 5, 6, 7, 8, 50, 2, 9, 10]);
    }

    #[test]
    fn empty_rates_rejected() {
        let mut buf = vec![];
        assert!(write_rates(&mut buf, &[][..]).is_err());
    }

    #[test]
    fn written_elements_parse_back() {
        let mut buf = vec![];
        write_ssid(&mut buf, b"ssid").expect("ssid");
        write_dsss_param_set(&mut buf, 11).expect("dsss");
        write_timeout_interval(&mut buf, &TimeoutInterval { interval_type: 3, value: 500 })
            .expect("timeout interval");
        write_wsc(&mut buf, &wsc::push_button_probe_attrs(&[3; 16])[..]).expect("wsc");
        write_he_capabilities(&mut buf, &[9, 9][..]).expect("he cap");

        let elements = Elements::parse(&buf[..]).expect("parse");
        assert_eq!(elements.ssid.as_deref(), Some(&b"ssid"[..]));
        assert_eq!(elements.dsss_channel, Some(11));
        assert_eq!(elements.timeout_interval.map(|ti| ti.value), Some(500));
        assert!(elements.wsc.expect("wsc").is_push_button());
        assert_eq!(elements.he_cap, Some(vec![9, 9]));
    }
}
