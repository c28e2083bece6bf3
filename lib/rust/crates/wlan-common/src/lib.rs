// Copyright 2019 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Shared IEEE Std 802.11-2016 definitions: MAC header layouts, status and reason codes,
//! information elements, and a codec that turns raw management frames into decoded records
//! (and back). The MLME never touches raw frame bytes beyond what this crate hands it.

pub mod appendable;
pub mod buffer_reader;
pub mod channel;
pub mod error;
pub mod format;
pub mod frame;
pub mod ie;
pub mod mac;
pub mod mgmt_writer;
pub mod test_utils;
pub mod time;

pub use time::{Time, TimeUnit};

/// Matches `$test` against a pattern and evaluates to `$e` on success. Panics with the
/// offending value otherwise.
#[macro_export]
macro_rules! assert_variant {
    ($test:expr, $variant:pat => $e:expr $(,)?) => {
        match $test {
            $variant => $e,
            other => panic!("unexpected variant: {:?}", other),
        }
    };
    ($test:expr, $variant:pat $(,)?) => {
        $crate::assert_variant!($test, $variant => {})
    };
}

#[cfg(test)]
mod tests {
    #[derive(Debug)]
    enum Foo {
        A(u8),
        B,
    }

    #[test]
    fn assert_variant_binds_value() {
        let value = assert_variant!(Foo::A(3), Foo::A(x) => x);
        assert_eq!(value, 3);
        assert_variant!(Foo::B, Foo::B);
    }

    #[test]
    #[should_panic(expected = "unexpected variant")]
    fn assert_variant_panics_on_mismatch() {
        assert_variant!(Foo::B, Foo::A(_));
    }
}
