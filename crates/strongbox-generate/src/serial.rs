// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Certificate serial numbers.

use rand::RngCore;
use rand::rngs::OsRng;

/// Serial length in bytes. The top bit is always cleared, leaving 159 random
/// bits in a positive DER integer that fits the 20-octet limit.
pub const SERIAL_LEN: usize = 20;

/// A fresh non-zero 159-bit serial, big-endian.
pub fn random_serial() -> [u8; SERIAL_LEN] {
    let mut serial = [0u8; SERIAL_LEN];
    loop {
        OsRng.fill_bytes(&mut serial);
        serial[0] &= 0x7f;
        if serial.iter().any(|b| *b != 0) {
            return serial;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_bit_is_clear() {
        for _ in 0..64 {
            assert!(random_serial()[0] < 0x80);
        }
    }

    #[test]
    fn serials_differ() {
        assert_ne!(random_serial(), random_serial());
    }
}
