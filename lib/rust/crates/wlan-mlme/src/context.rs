// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{
        config::MlmeConfig,
        device::{DeviceOps, FwHandle},
        error::Error,
        indication::Indication,
        sink::IndicationSink,
        timer::{EventId, Scheduler, Timer},
        vdev::VdevId,
    },
    std::time::Duration,
    wlan_common::{
        mac::{MacAddr, SequenceControl},
        Time,
    },
};

/// 12-bit sequence number space, IEEE Std 802.11-2016, 9.2.4.4.2.
const SEQ_NUM_MODULO: u16 = 4096;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeoutKind {
    Join,
    Auth,
    Assoc,
    Reassoc,
    PmfComeback,
    Heartbeat,
    Cac,
    PreAuth(MacAddr),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimedEvent {
    pub vdev_id: VdevId,
    pub kind: TimeoutKind,
}

/// State shared by every vdev: the firmware boundary, the timer, the upward sink and the
/// transmit sequence counter.
pub struct Context {
    pub config: MlmeConfig,
    pub device: Box<dyn DeviceOps>,
    pub timer: Timer<TimedEvent>,
    pub sink: IndicationSink,
    seq_num: u16,
}

impl Context {
    pub fn new(
        config: MlmeConfig,
        device: Box<dyn DeviceOps>,
        scheduler: Box<dyn Scheduler>,
        sink: IndicationSink,
    ) -> Self {
        Self { config, device, timer: Timer::new(scheduler), sink, seq_num: 0 }
    }

    pub fn now(&self) -> Time {
        self.timer.now()
    }

    pub fn next_seq_ctrl(&mut self) -> SequenceControl {
        self.seq_num = (self.seq_num + 1) % SEQ_NUM_MODULO;
        let mut seq_ctrl = SequenceControl::default();
        seq_ctrl.set_seq_num(self.seq_num);
        seq_ctrl
    }

    pub fn schedule(&mut self, vdev_id: VdevId, kind: TimeoutKind, after: Duration) -> EventId {
        self.timer.schedule_after(after, TimedEvent { vdev_id, kind })
    }

    /// Cancels the timer in `slot`, if armed, leaving the slot empty.
    pub fn cancel(&mut self, slot: &mut Option<EventId>) {
        if let Some(event_id) = slot.take() {
            self.timer.cancel_event(event_id);
        }
    }

    pub fn send_mgmt_frame(&mut self, handle: FwHandle, frame: Vec<u8>) -> Result<(), Error> {
        self.device.send_mgmt_frame(handle, frame).map_err(Error::Firmware)
    }

    pub fn indicate(&self, indication: Indication) {
        self.sink.send(indication);
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{device::FakeDevice, sink::UnboundedSink, timer::FakeScheduler},
        futures::channel::mpsc,
    };

    fn fake_context() -> (Context, FakeScheduler) {
        let scheduler = FakeScheduler::new();
        let (sender, _receiver) = mpsc::unbounded();
        let ctx = Context::new(
            MlmeConfig::default(),
            Box::new(FakeDevice::new()),
            Box::new(scheduler.clone()),
            UnboundedSink::new(sender),
        );
        (ctx, scheduler)
    }

    #[test]
    fn sequence_number_wraps() {
        let (mut ctx, _) = fake_context();
        assert_eq!(ctx.next_seq_ctrl().seq_num(), 1);
        for _ in 0..4094 {
            ctx.next_seq_ctrl();
        }
        assert_eq!(ctx.next_seq_ctrl().seq_num(), 0);
        assert_eq!(ctx.next_seq_ctrl().seq_num(), 1);
    }

    #[test]
    fn cancel_clears_slot() {
        let (mut ctx, scheduler) = fake_context();
        let mut slot = Some(ctx.schedule(1, TimeoutKind::Join, Duration::from_secs(1)));
        assert_eq!(scheduler.scheduled_count(), 1);
        ctx.cancel(&mut slot);
        assert_eq!(slot, None);
        assert_eq!(scheduler.scheduled_count(), 0);
        // Cancelling an empty slot is a no-op.
        ctx.cancel(&mut slot);
    }
}
