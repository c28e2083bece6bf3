// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::{
    ops::{Add, Sub},
    time::Duration,
};

/// IEEE Std 802.11-2016, 3.1: one time unit is 1024 microseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeUnit(pub u16);

impl TimeUnit {
    pub const DEFAULT_BEACON_INTERVAL: Self = Self(100);

    pub fn into_duration(self) -> Duration {
        Duration::from_micros(self.0 as u64 * 1024)
    }
}

impl From<TimeUnit> for Duration {
    fn from(tu: TimeUnit) -> Duration {
        tu.into_duration()
    }
}

/// Monotonic timestamp in nanoseconds, supplied by the scheduler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(i64);

impl Time {
    pub const INFINITE_PAST: Self = Self(i64::MIN);

    pub fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub fn into_nanos(self) -> i64 {
        self.0
    }

    /// Elapsed time since `earlier`, saturating at zero.
    pub fn since(self, earlier: Time) -> Duration {
        if self.0 <= earlier.0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.0.saturating_sub(earlier.0) as u64)
        }
    }
}

fn duration_nanos(d: Duration) -> i64 {
    i64::try_from(d.as_nanos()).unwrap_or(i64::MAX)
}

impl Add<Duration> for Time {
    type Output = Time;

    fn add(self, rhs: Duration) -> Time {
        Time(self.0.saturating_add(duration_nanos(rhs)))
    }
}

impl Sub<Duration> for Time {
    type Output = Time;

    fn sub(self, rhs: Duration) -> Time {
        Time(self.0.saturating_sub(duration_nanos(rhs)))
    }
}
