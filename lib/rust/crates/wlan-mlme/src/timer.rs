// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    std::{collections::HashMap, time::Duration},
    wlan_common::time::Time,
};

#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone)]
pub struct EventId(pub u64);

/// Schedules and cancels timeouts. An implementation delivers each expired `EventId` back to the
/// MLME as `MlmeMessage::Timeout`.
pub trait Scheduler: Send {
    /// Requests to schedule an event. Returns a unique ID used to cancel the scheduled event.
    fn schedule(&mut self, deadline: Time) -> EventId;
    /// Cancels a previously scheduled event.
    fn cancel(&mut self, id: EventId);
    fn now(&self) -> Time;
}

/// A timer to schedule and cancel timeouts and retrieve triggered events.
pub struct Timer<E> {
    events: HashMap<EventId, E>,
    scheduler: Box<dyn Scheduler>,
}

impl<E> Timer<E> {
    pub fn new(scheduler: Box<dyn Scheduler>) -> Self {
        Self { events: HashMap::default(), scheduler }
    }

    pub fn triggered(&mut self, event_id: &EventId) -> Option<E> {
        self.events.remove(event_id)
    }

    pub fn now(&self) -> Time {
        self.scheduler.now()
    }

    pub fn schedule_event(&mut self, deadline: Time, event: E) -> EventId {
        let event_id = self.scheduler.schedule(deadline);
        self.events.insert(event_id, event);
        event_id
    }

    pub fn schedule_after(&mut self, duration: Duration, event: E) -> EventId {
        let deadline = self.now() + duration;
        self.schedule_event(deadline, event)
    }

    pub fn cancel_event(&mut self, event_id: EventId) {
        self.events.remove(&event_id);
        self.scheduler.cancel(event_id);
    }

    pub fn cancel_all(&mut self) {
        for event_id in self.events.keys() {
            self.scheduler.cancel(*event_id);
        }
        self.events.clear();
    }

    pub fn scheduled_event_count(&self) -> usize {
        self.events.len()
    }
}

#[cfg(test)]
pub use test_utils::*;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_cancel_event() {
        #[derive(PartialEq, Eq, Debug, Hash)]
        struct FooEvent(u8);

        let fake_scheduler = FakeScheduler::new();

        // Verify event triggers no more than once.
        let mut timer = Timer::<FooEvent>::new(Box::new(fake_scheduler.clone()));
        let deadline = timer.now() + Duration::from_nanos(5);
        let event_id = timer.schedule_event(deadline, FooEvent(8));
        assert_eq!(timer.triggered(&event_id), Some(FooEvent(8)));
        assert_eq!(timer.triggered(&event_id), None);

        // Verify event does not trigger if it was canceled.
        let event_id = timer.schedule_event(deadline, FooEvent(9));
        timer.cancel_event(event_id);
        assert_eq!(timer.triggered(&event_id), None);

        // Verify multiple events can be scheduled and canceled.
        let event_id_1 = timer.schedule_event(deadline, FooEvent(8));
        let event_id_2 = timer.schedule_event(deadline, FooEvent(9));
        let event_id_3 = timer.schedule_event(deadline, FooEvent(10));
        timer.cancel_event(event_id_2);
        assert_eq!(timer.triggered(&event_id_2), None);
        assert_eq!(timer.triggered(&event_id_3), Some(FooEvent(10)));
        assert_eq!(timer.triggered(&event_id_1), Some(FooEvent(8)));
    }

    #[test]
    fn cancel_all() {
        let fake_scheduler = FakeScheduler::new();
        let mut timer = Timer::<_>::new(Box::new(fake_scheduler.clone()));

        let event_id_1 = timer.schedule_after(Duration::from_nanos(5), 8);
        let event_id_2 = timer.schedule_after(Duration::from_nanos(5), 9);
        let event_id_3 = timer.schedule_after(Duration::from_nanos(5), 10);
        assert_eq!(fake_scheduler.scheduled_count(), 3);
        timer.cancel_all();
        assert_eq!(timer.triggered(&event_id_1), None);
        assert_eq!(timer.triggered(&event_id_2), None);
        assert_eq!(timer.triggered(&event_id_3), None);
        assert_eq!(fake_scheduler.scheduled_count(), 0);
    }

    #[test]
    fn fake_scheduler_expires_in_deadline_order() {
        let fake_scheduler = FakeScheduler::new();
        let mut timer = Timer::<_>::new(Box::new(fake_scheduler.clone()));
        let late = timer.schedule_after(Duration::from_secs(2), "late");
        let early = timer.schedule_after(Duration::from_secs(1), "early");
        let never = timer.schedule_after(Duration::from_secs(10), "never");

        assert!(fake_scheduler.advance(Duration::from_millis(500)).is_empty());
        assert_eq!(fake_scheduler.advance(Duration::from_secs(2)), vec![early, late]);
        assert_eq!(timer.triggered(&early), Some("early"));
        assert_eq!(timer.scheduled_event_count(), 2);
        assert_ne!(never, late);
    }
}
