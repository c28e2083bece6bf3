// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    super::{Header, Id},
    crate::{buffer_reader::BufferReader, error::FrameParseError},
    std::mem::size_of,
};

pub struct Reader<'a>(BufferReader<'a>);

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Reader(BufferReader::new(bytes))
    }
}

impl<'a> Iterator for Reader<'a> {
    type Item = (Id, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let header = self.0.peek::<Header>()?;
        let body_len = header.body_len as usize;
        if self.0.bytes_remaining() < size_of::<Header>() + body_len {
            return None;
        }
        let header = self.0.read::<Header>()?;
        let body = self.0.read_bytes(body_len)?;
        Some((header.id, body))
    }
}

/// Fails unless `bytes` is an exact sequence of complete elements.
pub fn validate_elements(bytes: &[u8]) -> Result<(), FrameParseError> {
    let mut reader = BufferReader::new(bytes);
    while reader.bytes_remaining() > 0 {
        let id = reader.peek_byte().unwrap_or_default();
        let header =
            reader.read::<Header>().ok_or(FrameParseError::TruncatedElement { id })?;
        reader
            .read_bytes(header.body_len as usize)
            .ok_or(FrameParseError::TruncatedElement { id })?;
    }
    Ok(())
}
