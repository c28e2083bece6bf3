// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{
        config::MlmeConfig,
        context::Context,
        device::{FakeDevice, FwHandle},
        handlers::{self, FrameOutcome},
        indication::Indication,
        peer::{PeerContext, PeerMlmState},
        session::{MlmState, Session, SmeState},
        sink::UnboundedSink,
        timer::FakeScheduler,
        vdev::{OpMode, Vdev, VdevCtx, VdevId, VdevState},
    },
    futures::channel::mpsc,
    wlan_common::{
        channel::{Cbw, Channel},
        test_utils::{fake_frames::FAKE_RATES, AP_ADDR, CLIENT_ADDR},
        TimeUnit,
    },
};

pub const CLIENT_VDEV: VdevId = 0;
pub const AP_VDEV: VdevId = 1;
pub const SSID: &[u8] = b"fuchsia";

pub fn fake_context(config: MlmeConfig) -> (Context, FakeDevice, FakeScheduler, mpsc::UnboundedReceiver<Indication>) {
    let device = FakeDevice::new();
    let scheduler = FakeScheduler::new();
    let (sender, receiver) = mpsc::unbounded();
    let ctx = Context::new(
        config,
        Box::new(device.clone()),
        Box::new(scheduler.clone()),
        UnboundedSink::new(sender),
    );
    (ctx, device, scheduler, receiver)
}

/// One vdev with its session, wired to fakes.
pub struct Harness {
    pub ctx: Context,
    pub vdev: Vdev,
    pub session: Option<Session>,
    pub device: FakeDevice,
    pub scheduler: FakeScheduler,
    pub indications: mpsc::UnboundedReceiver<Indication>,
}

impl Harness {
    fn new(
        vdev_id: VdevId,
        opmode: OpMode,
        mac_addr: [u8; 6],
        config: MlmeConfig,
        make_session: fn(&MlmeConfig) -> Option<Session>,
    ) -> Self {
        let session = make_session(&config);
        let (ctx, device, scheduler, indications) = fake_context(config);
        let mut vdev = Vdev::new(vdev_id, opmode, mac_addr, FwHandle(100 + vdev_id as u32));
        vdev.ext_create(64).expect("ext_create");
        Self { ctx, vdev, session, device, scheduler, indications }
    }

    /// Client vdev with a fresh session towards `AP_ADDR` on channel 6.
    pub fn client() -> Self {
        Self::client_with_config(MlmeConfig::default())
    }

    pub fn client_with_config(config: MlmeConfig) -> Self {
        Self::new(CLIENT_VDEV, OpMode::Sta, CLIENT_ADDR, config, |config| {
            Some(Session::new_client(
                AP_ADDR,
                SSID.to_vec(),
                Channel::new(6, Cbw::Cbw20),
                TimeUnit::DEFAULT_BEACON_INTERVAL,
                config,
            ))
        })
    }

    /// AP vdev with a started BSS `AP_ADDR` on channel 6.
    pub fn ap() -> Self {
        Self::ap_with_config(MlmeConfig::default())
    }

    pub fn ap_with_config(config: MlmeConfig) -> Self {
        let mut h = Self::new(AP_VDEV, OpMode::Ap, AP_ADDR, config, |config| {
            Some(Session::new_ap(
                AP_ADDR,
                SSID.to_vec(),
                Channel::new(6, Cbw::Cbw20),
                TimeUnit::DEFAULT_BEACON_INTERVAL,
                config,
            ))
        });
        h.vdev.set_state(VdevState::Up);
        let session = h.session_mut();
        session.set_mlm_state(MlmState::BssStarted);
        session.set_sme_state(SmeState::BssActive);
        h
    }

    /// The client is associated with `AP_ADDR` using AID 1 and its vdev is up.
    pub fn with_associated_ap(mut self) -> Self {
        self.vdev.set_state(VdevState::Up);
        let session = self.session_mut();
        let mut peer = PeerContext::new(AP_ADDR, 1, PeerMlmState::LinkEstablished);
        peer.rates = FAKE_RATES.to_vec();
        session.peers.insert(peer).expect("insert AP peer");
        session.set_mlm_state(MlmState::LinkEstablished);
        session.set_sme_state(SmeState::Associated);
        self
    }

    pub fn with_client(mut self, addr: [u8; 6]) -> Self {
        let session = self.session_mut();
        let aid = session.peers.alloc_aid().expect("free AID");
        session
            .peers
            .insert(PeerContext::new(addr, aid, PeerMlmState::LinkEstablished))
            .expect("insert client");
        self
    }

    pub fn v(&mut self) -> VdevCtx<'_> {
        VdevCtx { ctx: &mut self.ctx, vdev: &mut self.vdev, session: self.session.as_mut() }
    }

    pub fn session(&self) -> &Session {
        self.session.as_ref().expect("session")
    }

    pub fn session_mut(&mut self) -> &mut Session {
        self.session.as_mut().expect("session")
    }

    pub fn rx(&mut self, bytes: &[u8]) -> FrameOutcome {
        handlers::handle_mgmt_frame(&mut self.v(), bytes).expect("handle frame")
    }

    pub fn next_indication(&mut self) -> Option<Indication> {
        self.indications.try_next().ok().flatten()
    }

    pub fn drain_indications(&mut self) -> Vec<Indication> {
        std::iter::from_fn(|| self.next_indication()).collect()
    }
}
