// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {crate::appendable::BufferTooSmall, thiserror::Error};

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum FrameParseError {
    #[error("frame too short to hold {0}")]
    TooShort(&'static str),
    #[error("unsupported frame type {0}")]
    UnsupportedType(u16),
    #[error("element {id} truncated")]
    TruncatedElement { id: u8 },
    #[error("element {id} malformed: {reason}")]
    MalformedElement { id: u8, reason: &'static str },
}

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum FrameWriteError {
    #[error("buffer too small")]
    BufferTooSmall,
    #[error("error writing frame: {debug_message}")]
    InvalidData { debug_message: String },
}

impl FrameWriteError {
    pub fn new_invalid_data<S: Into<String>>(debug_message: S) -> Self {
        FrameWriteError::InvalidData { debug_message: debug_message.into() }
    }
}

impl From<BufferTooSmall> for FrameWriteError {
    fn from(_error: BufferTooSmall) -> Self {
        FrameWriteError::BufferTooSmall
    }
}
