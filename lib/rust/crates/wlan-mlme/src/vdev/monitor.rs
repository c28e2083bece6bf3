// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    super::{send_start, send_up, VdevCtx, VdevMlmeOps},
    crate::error::Error,
    log::debug,
};

pub struct MonitorOps;

impl VdevMlmeOps for MonitorOps {
    fn start(&self, v: &mut VdevCtx<'_>) -> Result<(), Error> {
        send_start(v, false)
    }

    fn restart(&self, v: &mut VdevCtx<'_>) -> Result<(), Error> {
        send_start(v, true)
    }

    fn start_continue(&self, v: &mut VdevCtx<'_>) -> Result<(), Error> {
        self.up(v)
    }

    fn up(&self, v: &mut VdevCtx<'_>) -> Result<(), Error> {
        let addr = v.vdev.mac_addr;
        send_up(v, addr, 0)
    }

    // No peers; only the state transition.
    fn disconnect_peers(&self, v: &mut VdevCtx<'_>) -> Result<(), Error> {
        debug!("monitor vdev {}: no peers to disconnect", v.vdev.id);
        Ok(())
    }
}
