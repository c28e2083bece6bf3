// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{device::FwStatus, vdev::VdevId},
    thiserror::Error,
    wlan_common::error::{FrameParseError, FrameWriteError},
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("out of resources")]
    NoResources,
    #[error("operation not valid in the current state")]
    InvalidState,
    #[error("not supported: {}", _0)]
    NotSupported(&'static str),
    #[error("firmware returned {}", _0)]
    Firmware(FwStatus),
    #[error("channel availability check required before the vdev can go up")]
    CacRequired,
    #[error("no vdev with id {}", _0)]
    NoSuchVdev(VdevId),
    #[error("no session on vdev {}", _0)]
    NoSession(VdevId),
    #[error("no such peer")]
    NoSuchPeer,
    #[error("AP recently failed and is refused")]
    RecentlyFailedAp,
    #[error("error parsing frame: {}", _0)]
    ParsingFrame(#[from] FrameParseError),
    #[error("error writing frame: {}", _0)]
    WritingFrame(#[from] FrameWriteError),
    #[error("invalid configuration: {}", _0)]
    Config(#[from] serde_json::Error),
}

impl From<FwStatus> for Error {
    fn from(status: FwStatus) -> Self {
        Error::Firmware(status)
    }
}
