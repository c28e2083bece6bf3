// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Upward delivery of confirms and indications.

use {futures::channel::mpsc, log::debug};

/// Sender side of an unbounded channel that never fails the caller. Once the receiver is gone
/// messages are dropped.
#[derive(Debug, Clone)]
pub struct UnboundedSink<T> {
    sink: mpsc::UnboundedSender<T>,
}

impl<T> UnboundedSink<T> {
    pub fn new(sink: mpsc::UnboundedSender<T>) -> Self {
        UnboundedSink { sink }
    }

    pub fn send(&self, msg: T) {
        if let Err(e) = self.sink.unbounded_send(msg) {
            debug!("upper layer gone, dropping message: disconnected={}", e.is_disconnected());
        }
    }
}

pub type IndicationSink = UnboundedSink<crate::indication::Indication>;
