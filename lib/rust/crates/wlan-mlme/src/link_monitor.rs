// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Beacon-miss detection for an established client link.
//!
//! Every heartbeat interval the client checks whether its BSS was heard from since the last
//! check. On a passive (DFS) channel a miss tears the link down at once. Elsewhere the first
//! miss sends a single probe request and the link is torn down only if the next check still
//! finds nothing.

use {
    crate::{
        context::{Context, TimeoutKind},
        error::Error,
        indication::DisconnectTrigger,
        peer::trigger_deletion,
        session::Session,
        vdev::{VdevCtx, VdevId},
    },
    log::{debug, info, warn},
    wlan_common::{
        format::MacFmt,
        mac::{self, FrameControl, MacAddr, ReasonCode},
        mgmt_writer::{self, FixedFields},
    },
};

const FAILED_AP_SLOTS: usize = 2;

/// APs the link monitor recently gave up on, overwritten round robin.
#[derive(Debug, Default)]
pub struct FailedApList {
    slots: [Option<MacAddr>; FAILED_AP_SLOTS],
    next: usize,
}

impl FailedApList {
    pub fn record(&mut self, bssid: MacAddr) {
        if self.contains(&bssid) {
            return;
        }
        self.slots[self.next] = Some(bssid);
        self.next = (self.next + 1) % FAILED_AP_SLOTS;
    }

    pub fn contains(&self, bssid: &MacAddr) -> bool {
        self.slots.iter().any(|slot| slot.as_ref() == Some(bssid))
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// No established link to watch, or a channel switch is in progress.
    Skipped,
    Healthy,
    ProbeSent,
    TornDown,
}

/// Starts watching a freshly established link.
pub fn arm_heartbeat(ctx: &mut Context, vdev_id: VdevId, session: &mut Session) {
    session.heartbeat.probe_sent = false;
    session.beacon_counters.seen_since_check = 0;
    schedule_check(ctx, vdev_id, session);
}

fn schedule_check(ctx: &mut Context, vdev_id: VdevId, session: &mut Session) {
    ctx.cancel(&mut session.timers.heartbeat);
    let interval = ctx.config.heartbeat_interval();
    session.timers.heartbeat = Some(ctx.schedule(vdev_id, TimeoutKind::Heartbeat, interval));
}

pub fn on_heartbeat_timeout(
    v: &mut VdevCtx<'_>,
    failed_aps: &mut FailedApList,
) -> Result<HeartbeatOutcome, Error> {
    let vdev_id = v.vdev.id;
    let handle = v.vdev.fw_handle;
    let sta_addr = v.vdev.mac_addr;
    let switching = v.vdev.channel_switch_in_progress();
    let session = v.session.as_deref_mut().ok_or(Error::NoSession(vdev_id))?;
    session.timers.heartbeat = None;
    if !session.is_client() || !session.is_link_established() {
        return Ok(HeartbeatOutcome::Skipped);
    }
    if switching {
        debug!("vdev {}: heartbeat deferred during channel switch", vdev_id);
        schedule_check(v.ctx, vdev_id, session);
        return Ok(HeartbeatOutcome::Skipped);
    }

    if session.beacon_counters.seen_since_check > 0 {
        session.beacon_counters.seen_since_check = 0;
        session.heartbeat.probe_sent = false;
        schedule_check(v.ctx, vdev_id, session);
        return Ok(HeartbeatOutcome::Healthy);
    }

    let bssid = session.bssid;
    if !session.channel.is_dfs() && !session.heartbeat.probe_sent {
        let seq_ctrl = v.ctx.next_seq_ctrl();
        let fixed = FixedFields::sent_from_client(
            FrameControl::mgmt(mac::MGMT_SUBTYPE_PROBE_REQ),
            bssid,
            sta_addr,
            seq_ctrl,
        );
        let mut buf = vec![];
        mgmt_writer::write_probe_req_frame(
            &mut buf,
            fixed,
            &session.ssid[..],
            &v.ctx.config.local_caps.rates[..],
        )?;
        v.ctx.send_mgmt_frame(handle, buf)?;
        session.heartbeat.probe_sent = true;
        session.heartbeat.probes_sent_total += 1;
        info!("no beacons from {}, probing", bssid.to_mac_str());
        schedule_check(v.ctx, vdev_id, session);
        return Ok(HeartbeatOutcome::ProbeSent);
    }

    warn!("lost BSS {} on channel {}", bssid.to_mac_str(), session.channel);
    let mut buf = vec![];
    mgmt_writer::write_deauth_frame(
        &mut buf,
        bssid,
        sta_addr,
        bssid,
        v.ctx.next_seq_ctrl(),
        ReasonCode::REASON_INACTIVITY,
    )?;
    v.ctx.send_mgmt_frame(handle, buf)?;
    trigger_deletion(
        v.ctx,
        vdev_id,
        handle,
        session,
        bssid,
        ReasonCode::REASON_INACTIVITY,
        DisconnectTrigger::LinkMonitoringDeauth,
    )?;
    if v.ctx.config.record_failed_ap {
        failed_aps.record(bssid);
    }
    v.vdev.private_mut()?.connection_fail = true;
    Ok(HeartbeatOutcome::TornDown)
}
