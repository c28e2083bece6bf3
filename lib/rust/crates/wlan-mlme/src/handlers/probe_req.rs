// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    super::FrameOutcome,
    crate::{
        ap::{bss_capabilities, bss_elements},
        error::Error,
        indication::Indication,
        vdev::VdevCtx,
    },
    log::debug,
    wlan_common::{
        format::MacFmt,
        frame::MgmtFrame,
        ie::Elements,
        mac::{self, FrameControl},
        mgmt_writer::{self, FixedFields},
    },
};

/// Probe requests reaching an AP. Push-button WPS requests feed overlap detection whether or
/// not they are answered.
pub fn handle_probe_req(
    v: &mut VdevCtx<'_>,
    frame: &MgmtFrame,
    elements: &Elements,
) -> Result<FrameOutcome, Error> {
    let vdev_id = v.vdev.id;
    let handle = v.vdev.fw_handle;
    let now = v.ctx.now();
    let session = v.session.as_deref_mut().ok_or(Error::NoSession(vdev_id))?;
    if !session.is_ap() {
        return Ok(FrameOutcome::Dropped("not an AP"));
    }
    let sa = frame.sa();
    if mac::is_group_addr(&sa) {
        return Ok(FrameOutcome::Dropped("group source address"));
    }

    if let Some(wsc) = elements.wsc.as_ref().filter(|wsc| wsc.is_push_button()) {
        if let Some(uuid) = wsc.uuid_e {
            let overlap = session.pbc.insert(sa, uuid, now);
            if overlap != session.pbc_overlap {
                session.pbc_overlap = overlap;
                v.ctx.indicate(Indication::WpsPbcOverlap { vdev_id, overlap });
            }
        }
    }

    let da = frame.da();
    if !mac::is_broadcast(&da) && da != session.bssid {
        return Ok(FrameOutcome::Dropped("not addressed to this BSS"));
    }
    let ssid = match elements.ssid.as_ref() {
        Some(ssid) => ssid,
        None => return Ok(FrameOutcome::Dropped("no SSID element")),
    };
    if ssid.is_empty() {
        if session.hidden_ssid {
            return Ok(FrameOutcome::Dropped("wildcard SSID on a hidden BSS"));
        }
    } else if ssid[..] != session.ssid[..] {
        return Ok(FrameOutcome::Dropped("SSID mismatch"));
    }

    let seq_ctrl = v.ctx.next_seq_ctrl();
    let fixed = FixedFields::sent_from_ap(
        FrameControl::mgmt(mac::MGMT_SUBTYPE_PROBE_RESP),
        sa,
        session.bssid,
        seq_ctrl,
    );
    let mut buf = vec![];
    mgmt_writer::write_probe_resp_frame(
        &mut buf,
        fixed,
        session.beacon_interval.0,
        bss_capabilities(session),
        &bss_elements(&v.ctx.config, session, &session.ssid[..]),
    )?;
    debug!("probe response to {}", sa.to_mac_str());
    v.ctx.send_mgmt_frame(handle, buf)?;
    Ok(FrameOutcome::Handled)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::test_utils::*,
        wlan_common::{
            assert_variant,
            frame::MgmtBody,
            mac::BCAST_ADDR,
            test_utils::{fake_frames::*, *},
        },
    };

    #[test]
    fn wildcard_probe_answered() {
        let mut h = Harness::ap();
        let req = fake_probe_req(CLIENT_ADDR, BCAST_ADDR, b"", None);
        assert_eq!(h.rx(&req[..]), FrameOutcome::Handled);
        let frames = h.device.parsed_frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].da(), CLIENT_ADDR);
        assert_eq!(frames[0].sa(), AP_ADDR);
        assert_variant!(&frames[0].body, MgmtBody::ProbeResp(fields) => {
            assert_eq!(fields.elements.ssid, Some(SSID.to_vec()));
            assert_eq!(fields.beacon_interval, 100);
        });
    }

    #[test]
    fn hidden_bss_answers_directed_probes_only() {
        let mut h = Harness::ap();
        h.session_mut().hidden_ssid = true;
        let wildcard = fake_probe_req(CLIENT_ADDR, BCAST_ADDR, b"", None);
        assert_eq!(h.rx(&wildcard[..]), FrameOutcome::Dropped("wildcard SSID on a hidden BSS"));
        let directed = fake_probe_req(CLIENT_ADDR, AP_ADDR, SSID, None);
        assert_eq!(h.rx(&directed[..]), FrameOutcome::Handled);
        assert_eq!(h.device.frames().len(), 1);
    }

    #[test]
    fn filters() {
        let mut h = Harness::ap();
        let other_ssid = fake_probe_req(CLIENT_ADDR, BCAST_ADDR, b"other", None);
        assert_eq!(h.rx(&other_ssid[..]), FrameOutcome::Dropped("SSID mismatch"));
        let other_bss = fake_probe_req(CLIENT_ADDR, OTHER_AP_ADDR, SSID, None);
        assert_eq!(h.rx(&other_bss[..]), FrameOutcome::Dropped("not addressed to this BSS"));
        assert!(h.device.frames().is_empty());

        let mut client = Harness::client();
        let req = fake_probe_req(OTHER_AP_ADDR, BCAST_ADDR, b"", None);
        assert_eq!(client.rx(&req[..]), FrameOutcome::Dropped("not an AP"));
    }

    #[test]
    fn pbc_overlap_reported_on_change() {
        let mut h = Harness::ap();
        h.rx(&fake_probe_req(CLIENT_ADDR, BCAST_ADDR, b"", Some(&[1; 16]))[..]);
        assert_eq!(h.next_indication(), None);

        h.rx(&fake_probe_req(CLIENT_ADDR2, BCAST_ADDR, b"", Some(&[2; 16]))[..]);
        assert_eq!(
            h.next_indication(),
            Some(Indication::WpsPbcOverlap { vdev_id: AP_VDEV, overlap: true })
        );
        // Still overlapping: nothing new to report.
        h.rx(&fake_probe_req(CLIENT_ADDR3, BCAST_ADDR, b"", Some(&[3; 16]))[..]);
        assert_eq!(h.next_indication(), None);
        assert!(h.session().pbc_overlap);
        assert_eq!(h.session().pbc.len(), 3);
    }

    #[test]
    fn pbc_tracked_for_unanswered_probes() {
        let mut h = Harness::ap();
        let req = fake_probe_req(CLIENT_ADDR, OTHER_AP_ADDR, b"x", Some(&[1; 16]));
        assert_eq!(h.rx(&req[..]), FrameOutcome::Dropped("not addressed to this BSS"));
        assert_eq!(h.session().pbc.len(), 1);
    }
}
