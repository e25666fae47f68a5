//! Length-prefixed bit framing shared by both engines.
//!
//! Wire format: a 32-bit big-endian byte count followed by the payload bytes,
//! every byte expanded MSB first into one `u8` per bit (0 or 1).

use crate::error::{Result, StegoError};

pub const LENGTH_PREFIX_BITS: usize = 32;

/// Number of carrier bits needed for a payload of `byte_len` bytes.
pub fn bit_count_for(byte_len: usize) -> usize {
    LENGTH_PREFIX_BITS + byte_len * 8
}

pub fn encode_payload(bytes: &[u8]) -> Result<Vec<u8>> {
    let length_header =
        u32::try_from(bytes.len()).map_err(|_| StegoError::PayloadTooLarge(bytes.len()))?;

    let mut bits = Vec::with_capacity(bit_count_for(bytes.len()));

    // 1. Length header (32 bits, MSB first)
    for shift in (0..LENGTH_PREFIX_BITS).rev() {
        bits.push(((length_header >> shift) & 1) as u8);
    }

    // 2. Payload (8 bits per byte, MSB first)
    for &byte in bytes {
        for shift in (0..8).rev() {
            bits.push((byte >> shift) & 1);
        }
    }

    Ok(bits)
}

/// Body bits behind a declared byte count; `None` if that overflows `usize`.
pub fn body_bit_count(declared: u32) -> Option<usize> {
    usize::try_from(declared).ok()?.checked_mul(8)
}

/// Parse the byte count from the first 32 bits.
pub fn read_length_prefix(bits: &[u8]) -> Result<u32> {
    if bits.len() < LENGTH_PREFIX_BITS {
        return Err(StegoError::TruncatedLength {
            available: bits.len(),
        });
    }
    Ok(bits[..LENGTH_PREFIX_BITS]
        .iter()
        .fold(0u32, |len, &bit| (len << 1) | u32::from(bit & 1)))
}

pub fn decode_payload(bits: &[u8]) -> Result<Vec<u8>> {
    let declared = read_length_prefix(bits)?;
    let body = &bits[LENGTH_PREFIX_BITS..];

    let needed = match body_bit_count(declared) {
        Some(needed) if needed <= body.len() => needed,
        _ => {
            return Err(StegoError::TruncatedPayload {
                declared,
                available: body.len(),
            })
        }
    };

    Ok(body[..needed]
        .chunks_exact(8)
        .map(|byte_bits| byte_bits.iter().fold(0u8, |byte, &bit| (byte << 1) | (bit & 1)))
        .collect())
}

pub fn encode_text(message: &str) -> Result<Vec<u8>> {
    encode_payload(message.as_bytes())
}

/// Strict: invalid UTF-8 is an error, never replaced.
pub fn decode_text(bits: &[u8]) -> Result<String> {
    let bytes = decode_payload(bits)?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_big_endian_msb_first() {
        let bits = encode_payload(b"A").unwrap();
        assert_eq!(bits.len(), 40);
        // length 1 -> 31 zeros then a single one
        assert!(bits[..31].iter().all(|&b| b == 0));
        assert_eq!(bits[31], 1);
        // 'A' = 0x41 = 0100_0001
        assert_eq!(&bits[32..], &[0, 1, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn decode_ignores_trailing_bits() {
        let mut bits = encode_payload(b"hey").unwrap();
        bits.extend_from_slice(&[1, 0, 1, 1, 0, 0, 1]);
        assert_eq!(decode_payload(&bits).unwrap(), b"hey");
    }

    #[test]
    fn empty_payload_is_just_a_header() {
        let bits = encode_payload(&[]).unwrap();
        assert_eq!(bits.len(), LENGTH_PREFIX_BITS);
        assert!(decode_payload(&bits).unwrap().is_empty());
    }

    #[test]
    fn short_header_is_truncated_length() {
        match decode_payload(&[1; 31]) {
            Err(StegoError::TruncatedLength { available: 31 }) => {}
            other => panic!("expected TruncatedLength, got {other:?}"),
        }
    }

    #[test]
    fn short_body_is_truncated_payload() {
        let bits = encode_payload(b"abcd").unwrap();
        match decode_payload(&bits[..bits.len() - 1]) {
            Err(StegoError::TruncatedPayload { declared: 4, available: 31 }) => {}
            other => panic!("expected TruncatedPayload, got {other:?}"),
        }
    }

    #[test]
    fn oversized_header_is_truncated_payload() {
        let mut bits = vec![1u8; LENGTH_PREFIX_BITS];
        bits.extend_from_slice(&[0, 1, 0, 0, 0, 0, 0, 1]);
        match decode_payload(&bits) {
            Err(StegoError::TruncatedPayload {
                declared: u32::MAX,
                available: 8,
            }) => {}
            other => panic!("expected TruncatedPayload, got {other:?}"),
        }
    }

    #[test]
    fn body_bit_count_never_wraps() {
        assert_eq!(body_bit_count(0), Some(0));
        assert_eq!(body_bit_count(2), Some(16));
        if usize::BITS == 32 {
            assert_eq!(body_bit_count(0x2000_0001), None);
        } else {
            assert_eq!(body_bit_count(u32::MAX), Some(u32::MAX as usize * 8));
        }
    }

    #[test]
    fn multibyte_text_is_byte_level() {
        let bits = encode_text("Привет").unwrap();
        assert_eq!(bits.len(), bit_count_for("Привет".len()));
        assert_eq!(decode_text(&bits).unwrap(), "Привет");
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let bits = encode_payload(&[0xff, 0xfe]).unwrap();
        assert!(matches!(decode_text(&bits), Err(StegoError::InvalidEncoding(_))));
    }
}
