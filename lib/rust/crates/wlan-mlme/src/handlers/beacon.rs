// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    super::FrameOutcome,
    crate::{
        context::Context,
        error::Error,
        indication::{ConfirmResult, Indication},
        session::{MlmState, Session},
        vdev::{self, VdevCtx, VdevId},
    },
    log::{debug, info},
    wlan_common::{
        channel::{Cbw, Channel},
        format::MacFmt,
        frame::{BeaconFields, MgmtFrame},
        TimeUnit,
    },
};

/// Beacons and probe responses from the client's BSS. Both count as link activity; only a
/// beacon updates the beacon counters.
pub fn handle_beacon(
    v: &mut VdevCtx<'_>,
    frame: &MgmtFrame,
    fields: &BeaconFields,
    is_beacon: bool,
) -> Result<FrameOutcome, Error> {
    let vdev_id = v.vdev.id;
    let now = v.ctx.now();
    let session = v.session.as_deref_mut().ok_or(Error::NoSession(vdev_id))?;
    if !session.is_client() {
        return Ok(FrameOutcome::Dropped("not a client"));
    }
    if frame.bssid() != session.bssid {
        return Ok(FrameOutcome::Dropped("other BSS"));
    }
    session.record_bss_activity(now, is_beacon);
    if let Some(peer) = session.ap_peer() {
        peer.record_rx(now);
    }

    match session.mlm_state() {
        MlmState::WtJoinBeacon => return evaluate_join(v.ctx, vdev_id, session, fields),
        MlmState::LinkEstablished => {}
        _ => return Ok(FrameOutcome::Handled),
    }

    let csa = match fields.elements.csa {
        Some(csa) if csa.new_channel != session.channel.primary => csa,
        _ => return Ok(FrameOutcome::Handled),
    };
    if v.vdev.channel_switch_in_progress() {
        debug!("vdev {}: channel switch already in progress", vdev_id);
        return Ok(FrameOutcome::Handled);
    }
    info!(
        "{} announced a switch to channel {} (count {})",
        frame.bssid().to_mac_str(),
        csa.new_channel,
        csa.count
    );
    vdev::switch_channel(v, Channel::new(csa.new_channel, Cbw::Cbw20))?;
    Ok(FrameOutcome::Handled)
}

fn evaluate_join(
    ctx: &mut Context,
    vdev_id: VdevId,
    session: &mut Session,
    fields: &BeaconFields,
) -> Result<FrameOutcome, Error> {
    let elements = &fields.elements;
    if elements.ssid.as_deref() != Some(&session.ssid[..]) {
        return Ok(FrameOutcome::Dropped("SSID mismatch"));
    }
    if elements.dsss_channel.map_or(false, |c| c != session.channel.primary) {
        return Ok(FrameOutcome::Dropped("DS channel mismatch"));
    }
    if !fields.capabilities.ess() {
        return Ok(FrameOutcome::Dropped("not an ESS"));
    }

    ctx.cancel(&mut session.timers.join);
    session.join_beacon = Some(fields.raw_elements.clone());
    session.beacon_interval = TimeUnit(fields.beacon_interval);
    session.flags.qos = elements.edca.is_some() || fields.capabilities.qos();
    session.flags.ht = elements.ht_cap.is_some();
    session.flags.vht = elements.vht_cap.is_some();
    session.flags.he = elements.he_cap.is_some();
    session.flags.privacy = fields.capabilities.privacy();
    session.flags.short_preamble = fields.capabilities.short_preamble();
    session.set_mlm_state(MlmState::Joined);
    info!("joined BSS {}", session.bssid.to_mac_str());
    ctx.indicate(Indication::JoinConfirm {
        vdev_id,
        bssid: session.bssid,
        result: ConfirmResult::Success,
    });
    Ok(FrameOutcome::Handled)
}
