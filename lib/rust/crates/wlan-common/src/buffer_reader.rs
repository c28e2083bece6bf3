// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    byteorder::{ByteOrder, LittleEndian},
    std::mem::size_of,
    zerocopy::{FromBytes, LayoutVerified, Unaligned},
};

/// Sequential reader over a borrowed byte buffer. Every read is length-checked and returns
/// `None` instead of panicking when the buffer runs out.
pub struct BufferReader<'a> {
    buffer: &'a [u8],
    bytes_read: usize,
}

impl<'a> BufferReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, bytes_read: 0 }
    }

    pub fn peek<T: FromBytes + Unaligned>(&self) -> Option<&'a T> {
        LayoutVerified::<_, T>::new_unaligned_from_prefix(self.buffer).map(|(v, _)| v.into_ref())
    }

    pub fn peek_byte(&self) -> Option<u8> {
        self.buffer.first().copied()
    }

    pub fn read<T: FromBytes + Unaligned>(&mut self) -> Option<&'a T> {
        let (value, rest) = LayoutVerified::<_, T>::new_unaligned_from_prefix(self.buffer)?;
        self.buffer = rest;
        self.bytes_read += size_of::<T>();
        Some(value.into_ref())
    }

    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        if len > self.buffer.len() {
            return None;
        }
        let (head, tail) = self.buffer.split_at(len);
        self.buffer = tail;
        self.bytes_read += len;
        Some(head)
    }

    pub fn read_byte(&mut self) -> Option<u8> {
        self.read_bytes(1).map(|b| b[0])
    }

    pub fn read_u16_le(&mut self) -> Option<u16> {
        self.read_bytes(2).map(LittleEndian::read_u16)
    }

    pub fn read_u32_le(&mut self) -> Option<u32> {
        self.read_bytes(4).map(LittleEndian::read_u32)
    }

    pub fn read_u64_le(&mut self) -> Option<u64> {
        self.read_bytes(8).map(LittleEndian::read_u64)
    }

    pub fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    pub fn bytes_remaining(&self) -> usize {
        self.buffer.len()
    }

    pub fn into_remaining(self) -> &'a [u8] {
        self.buffer
    }
}
