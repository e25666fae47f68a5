//! Carrier capacity for both engines, checked before any sample is mutated.

use crate::error::{Result, StegoError};

/// Silence gate shared by the LSB encoder, decoder and planner.
#[inline]
pub fn is_usable(sample: i16, threshold: i32) -> bool {
    i32::from(sample).abs() >= threshold
}

pub fn lsb_capacity(samples: &[i16], threshold: i32) -> usize {
    samples
        .iter()
        .filter(|&&sample| is_usable(sample, threshold))
        .count()
}

pub fn lsb_can_embed(samples: &[i16], threshold: i32, bit_count: usize) -> bool {
    lsb_capacity(samples, threshold) >= bit_count
}

pub fn ensure_lsb_capacity(samples: &[i16], threshold: i32, bit_count: usize) -> Result<usize> {
    let available = lsb_capacity(samples, threshold);
    if available < bit_count {
        return Err(StegoError::CapacityExceeded {
            required: bit_count,
            available,
        });
    }
    Ok(available)
}

/// Bins 1..seg_len/2-1; DC and Nyquist are reserved.
pub fn phase_capacity(seg_len: usize) -> usize {
    (seg_len / 2).saturating_sub(1)
}

pub fn phase_can_embed(seg_len: usize, bit_count: usize) -> bool {
    phase_capacity(seg_len) >= bit_count
}

/// Smallest power-of-two segment length able to hold `bit_count` bits.
pub fn min_phase_segment_len(bit_count: usize) -> usize {
    (2 * (bit_count + 1)).next_power_of_two().max(4)
}

pub fn ensure_phase_capacity(seg_len: usize, bit_count: usize) -> Result<usize> {
    let available = phase_capacity(seg_len);
    if available < bit_count {
        return Err(StegoError::CapacityExceeded {
            required: bit_count,
            available,
        });
    }
    Ok(available)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_gate_is_inclusive() {
        assert!(is_usable(500, 500));
        assert!(is_usable(-500, 500));
        assert!(!is_usable(499, 500));
        assert!(!is_usable(-499, 500));
        assert!(is_usable(i16::MIN, 500));
    }

    #[test]
    fn lsb_capacity_counts_loud_samples() {
        let samples = [0, 600, -700, 499, -500, 10];
        assert_eq!(lsb_capacity(&samples, 500), 3);
        assert!(lsb_can_embed(&samples, 500, 3));
        assert!(!lsb_can_embed(&samples, 500, 4));
    }

    #[test]
    fn phase_capacity_reserves_dc_and_nyquist() {
        assert_eq!(phase_capacity(8192), 4095);
        assert_eq!(phase_capacity(4), 1);
        assert!(phase_can_embed(8192, 4095));
        assert!(!phase_can_embed(8192, 4096));
    }

    #[test]
    fn min_segment_len_fits_the_bits() {
        for bits in [1, 32, 48, 4095, 4096] {
            let seg_len = min_phase_segment_len(bits);
            assert!(seg_len.is_power_of_two());
            assert!(phase_can_embed(seg_len, bits));
            assert!(!phase_can_embed(seg_len / 2, bits));
        }
    }

    #[test]
    fn ensure_reports_required_and_available() {
        match ensure_phase_capacity(64, 48) {
            Err(StegoError::CapacityExceeded { required: 48, available: 31 }) => {}
            other => panic!("expected CapacityExceeded, got {other:?}"),
        }
    }
}
