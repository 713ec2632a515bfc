// ============================================
// File: crates/iplink-core/src/checksum.rs
// ============================================
//! # Link Checksum
//!
//! ## Creation Reason
//! Provides the 32-bit non-cryptographic integrity code carried in the
//! trailer of every packet on the serial link.
//!
//! ## Main Functionality
//! - [`calc_checksum`]: rotate/XOR digest over a byte string
//! - [`packet_checksum`]: digest mixed with the frame-type byte
//!
//! ## ⚠️ Important Note for Next Developer
//! - This is a wire-compatibility constant. Both link peers must compute
//!   identical values, so the algorithm must never change, bit for bit.
//! - It is NOT cryptographic and detects corruption only, not tampering.
//!
//! ## Last Modified
//! v0.1.0 - Initial checksum implementation

/// Seed value for the digest.
const SEED: u32 = 0xAAAA_AAAA;

/// Computes the link checksum over a byte string.
///
/// Each input byte complements-and-rotates the accumulator by five bits and
/// is XORed in; every eighth byte (starting with the first) applies an extra
/// two-bit complement-rotate. The empty string yields the seed value.
///
/// # Example
/// ```
/// use iplink_core::checksum::calc_checksum;
///
/// assert_eq!(calc_checksum(&[]), 0xAAAA_AAAA);
/// assert_eq!(calc_checksum(&[0x01]), 0x5555_552E);
/// ```
#[must_use]
pub fn calc_checksum(buf: &[u8]) -> u32 {
    let mut cs = SEED;
    for (i, &byte) in buf.iter().enumerate() {
        cs = (!cs << 5) | (cs >> 27);
        cs ^= u32::from(byte);
        if i % 8 == 0 {
            cs = (!cs << 2) | (cs >> 30);
        }
    }
    cs
}

/// Computes the checksum carried in a packet trailer.
///
/// The payload digest is XORed with the frame-type byte so that a frame
/// whose type byte is corrupted fails validation even when the payload
/// survives intact.
#[must_use]
pub fn packet_checksum(frame_type: u8, payload: &[u8]) -> u32 {
    calc_checksum(payload) ^ u32::from(frame_type)
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_seed() {
        assert_eq!(calc_checksum(&[]), 0xAAAA_AAAA);
    }

    #[test]
    fn test_golden_values() {
        // Reference values both link peers must agree on.
        assert_eq!(calc_checksum(&[0x01]), 0x5555_552E);
        assert_eq!(calc_checksum(b"A"), 0x5555_542E);
        assert_eq!(calc_checksum(b"hello world"), 0x5580_BAA0);
        let seq: Vec<u8> = (0u8..16).collect();
        assert_eq!(calc_checksum(&seq), 0x3640_7C88);
        assert_eq!(calc_checksum(&[0xFF]), 0x5555_56D6);
        assert_eq!(calc_checksum(&[0x00; 8]), 0xAAAA_A955);
        assert_eq!(calc_checksum(&[0x00; 9]), 0x5554_AAAA);
    }

    #[test]
    fn test_deterministic() {
        let payload = b"the quick brown fox";
        assert_eq!(calc_checksum(payload), calc_checksum(payload));
    }

    #[test]
    fn test_position_sensitive() {
        assert_ne!(calc_checksum(b"ab"), calc_checksum(b"ba"));
        assert_eq!(calc_checksum(b"ab"), 0x5555_6A48);
        assert_eq!(calc_checksum(b"ba"), 0x5555_6BCB);
    }

    #[test]
    fn test_single_bit_flip_changes_result() {
        let payload = b"keepalive payload bytes";
        let reference = calc_checksum(payload);
        for i in 0..payload.len() {
            for bit in 0..8 {
                let mut mutated = payload.to_vec();
                mutated[i] ^= 1 << bit;
                assert_ne!(
                    calc_checksum(&mutated),
                    reference,
                    "flip of bit {bit} in byte {i} went undetected"
                );
            }
        }
    }

    #[test]
    fn test_packet_checksum_mixes_type() {
        let payload = [0x01];
        assert_eq!(packet_checksum(0x01, &payload), 0x5555_552F);
        assert_ne!(packet_checksum(0x01, &payload), packet_checksum(0x02, &payload));
    }
}
