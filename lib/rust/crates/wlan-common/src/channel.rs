// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cbw {
    Cbw20,
    Cbw40,
    Cbw40Below,
    Cbw80,
    Cbw160,
}

impl Default for Cbw {
    fn default() -> Self {
        Cbw::Cbw20
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Channel {
    pub primary: u8,
    pub cbw: Cbw,
}

impl Channel {
    pub fn new(primary: u8, cbw: Cbw) -> Self {
        Self { primary, cbw }
    }

    pub fn is_2ghz(&self) -> bool {
        self.primary >= 1 && self.primary <= 14
    }

    pub fn is_5ghz(&self) -> bool {
        self.primary >= 36
    }

    /// Channels subject to radar detection, where a Channel Availability Check precedes any
    /// transmission and scanning is passive only.
    pub fn is_dfs(&self) -> bool {
        (52..=64).contains(&self.primary) || (100..=144).contains(&self.primary)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cbw = match self.cbw {
            Cbw::Cbw20 => "",
            Cbw::Cbw40 => "+",
            Cbw::Cbw40Below => "-",
            Cbw::Cbw80 => "V",
            Cbw::Cbw160 => "W",
        };
        write!(f, "{}{}", self.primary, cbw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dfs_ranges() {
        assert!(!Channel::new(36, Cbw::Cbw20).is_dfs());
        assert!(Channel::new(52, Cbw::Cbw20).is_dfs());
        assert!(Channel::new(64, Cbw::Cbw20).is_dfs());
        assert!(!Channel::new(149, Cbw::Cbw80).is_dfs());
        assert!(Channel::new(100, Cbw::Cbw40).is_dfs());
        assert!(Channel::new(144, Cbw::Cbw20).is_dfs());
        assert!(!Channel::new(6, Cbw::Cbw20).is_dfs());
    }

    #[test]
    fn bands() {
        assert!(Channel::new(1, Cbw::Cbw20).is_2ghz());
        assert!(!Channel::new(1, Cbw::Cbw20).is_5ghz());
        assert!(Channel::new(165, Cbw::Cbw20).is_5ghz());
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", Channel::new(36, Cbw::Cbw80)), "36V");
        assert_eq!(format!("{}", Channel::new(6, Cbw::Cbw40Below)), "6-");
    }
}
