// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {thiserror::Error, zerocopy::AsBytes};

#[derive(Error, Debug, PartialEq, Eq)]
#[error("buffer is too small")]
pub struct BufferTooSmall;

/// A sink frames and elements are serialized into.
pub trait Appendable {
    fn append_bytes(&mut self, bytes: &[u8]) -> Result<(), BufferTooSmall>;

    fn bytes_written(&self) -> usize;

    fn append_byte(&mut self, byte: u8) -> Result<(), BufferTooSmall> {
        self.append_bytes(&[byte])
    }

    fn append_value<T: AsBytes + ?Sized>(&mut self, value: &T) -> Result<(), BufferTooSmall> {
        self.append_bytes(value.as_bytes())
    }

    fn append_u16_le(&mut self, value: u16) -> Result<(), BufferTooSmall> {
        self.append_bytes(&value.to_le_bytes())
    }

    fn append_u32_le(&mut self, value: u32) -> Result<(), BufferTooSmall> {
        self.append_bytes(&value.to_le_bytes())
    }

    fn append_u64_le(&mut self, value: u64) -> Result<(), BufferTooSmall> {
        self.append_bytes(&value.to_le_bytes())
    }
}

impl Appendable for Vec<u8> {
    fn append_bytes(&mut self, bytes: &[u8]) -> Result<(), BufferTooSmall> {
        self.extend_from_slice(bytes);
        Ok(())
    }

    fn bytes_written(&self) -> usize {
        self.len()
    }
}

/// Writes into a fixed-size buffer and fails once its capacity is exhausted.
pub struct BufferWriter<'a> {
    buf: &'a mut [u8],
    written: usize,
}

impl<'a> BufferWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, written: 0 }
    }

    pub fn into_written(self) -> &'a mut [u8] {
        let written = self.written;
        &mut self.buf[..written]
    }
}

impl<'a> Appendable for BufferWriter<'a> {
    fn append_bytes(&mut self, bytes: &[u8]) -> Result<(), BufferTooSmall> {
        let end = self.written + bytes.len();
        if end > self.buf.len() {
            return Err(BufferTooSmall);
        }
        self.buf[self.written..end].copy_from_slice(bytes);
        self.written = end;
        Ok(())
    }

    fn bytes_written(&self) -> usize {
        self.written
    }
}
