use tracing::{debug, info};

use crate::capacity::{ensure_lsb_capacity, is_usable, lsb_capacity};
use crate::config::{MethodKind, StegoConfig};
use crate::error::{Result, StegoError};
use crate::method::{EmbedReport, StegoMethod};
use crate::payload::{
    body_bit_count, decode_payload, encode_payload, read_length_prefix, LENGTH_PREFIX_BITS,
};
use crate::wav::AudioBuffer;

/// Hides bits at a fixed bit position of every non-silent sample.
#[derive(Debug, Clone)]
pub struct LsbEngine {
    lsb_position: u32,
    silence_threshold: i32,
}

impl LsbEngine {
    pub fn new(config: &StegoConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            lsb_position: config.lsb_position,
            silence_threshold: config.silence_threshold,
        })
    }

    pub fn capacity_bits(&self, audio: &AudioBuffer) -> usize {
        lsb_capacity(&audio.samples, self.silence_threshold)
    }

    fn carrier_bits<'a>(&self, samples: &'a [i16]) -> impl Iterator<Item = u8> + 'a {
        let threshold = self.silence_threshold;
        let k = self.lsb_position;
        samples
            .iter()
            .filter(move |&&sample| is_usable(sample, threshold))
            .map(move |&sample| (((sample as u16) >> k) & 1) as u8)
    }
}

impl StegoMethod for LsbEngine {
    fn kind(&self) -> MethodKind {
        MethodKind::Lsb
    }

    fn embed(&self, audio: &AudioBuffer, payload: &[u8]) -> Result<(AudioBuffer, EmbedReport)> {
        // Step 1: Frame the payload
        let bits = encode_payload(payload)?;

        // Step 2: Refuse before touching anything if it cannot fit
        let capacity = ensure_lsb_capacity(&audio.samples, self.silence_threshold, bits.len())?;
        debug!(
            "LSB embed: {} bits into {} usable samples at bit {}",
            bits.len(),
            capacity,
            self.lsb_position
        );

        // Step 3: Walk the samples in order, one payload bit per usable sample
        let mut samples = audio.samples.clone();
        let mut pending = bits.iter().copied();
        let mut next_bit = pending.next();
        let mut embedded = 0usize;
        let mut max_change = 0u32;

        for sample in samples.iter_mut() {
            let Some(bit) = next_bit else { break };
            if !is_usable(*sample, self.silence_threshold) {
                continue; // silent samples pass through
            }

            let Some(stego) = embed_bit(*sample, bit, self.lsb_position, self.silence_threshold)
            else {
                return Err(StegoError::IncompleteEmbedding {
                    embedded,
                    required: bits.len(),
                });
            };
            max_change = max_change.max((i32::from(stego) - i32::from(*sample)).unsigned_abs());
            *sample = stego;

            embedded += 1;
            next_bit = pending.next();
        }

        // Step 4: The scan must have consumed every bit
        if embedded < bits.len() {
            return Err(StegoError::IncompleteEmbedding {
                embedded,
                required: bits.len(),
            });
        }

        let report = EmbedReport::new(MethodKind::Lsb, payload.len(), embedded, capacity, max_change);
        info!("{}", report.summary());
        Ok((audio.with_samples(samples), report))
    }

    fn extract(&self, audio: &AudioBuffer) -> Result<Vec<u8>> {
        let mut carrier = self.carrier_bits(&audio.samples);

        let mut bits: Vec<u8> = carrier.by_ref().take(LENGTH_PREFIX_BITS).collect();
        let declared = read_length_prefix(&bits)?;
        debug!("LSB extract: header declares {declared} bytes");

        // An overflowing length just drains the carrier; decode_payload rejects it
        bits.extend(carrier.take(body_bit_count(declared).unwrap_or(usize::MAX)));
        decode_payload(&bits)
    }
}

/// Force bit `k` of `sample` to `bit`, keeping the sample a usable carrier.
///
/// Takes the minimal-error value from the sample's own block first; only when
/// that value would drop under the silence gate are the two neighbouring
/// blocks with the same bit `k` considered. `None` if no usable value exists.
fn embed_bit(sample: i16, bit: u8, k: u32, threshold: i32) -> Option<i16> {
    let best = set_bit_min_error(sample, bit, k);
    if is_usable(best, threshold) {
        return Some(best);
    }

    let original = i32::from(sample);
    let block = 1i32 << k;
    let block_start = i32::from(best) & !(block - 1);
    let stride = block << 1;

    [block_start - stride, block_start + stride]
        .into_iter()
        .flat_map(|start| start..start + block)
        .filter(|&candidate| (i32::from(i16::MIN)..=i32::from(i16::MAX)).contains(&candidate))
        .map(|candidate| candidate as i16)
        .filter(|&candidate| is_usable(candidate, threshold))
        .min_by_key(|&candidate| (i32::from(candidate) - original).abs())
}

/// Minimal quantization error bit set: among the `2^k` values that share the
/// upper bits of `sample` with bit `k` forced to `bit`, the closest one wins.
/// Ties keep the first candidate found.
fn set_bit_min_error(sample: i16, bit: u8, k: u32) -> i16 {
    let original = i32::from(sample);
    let mask = 1u16 << k;
    let raw = sample as u16;

    let base = if bit & 1 == 1 { raw | mask } else { raw & !mask };
    let low_mask = mask - 1;
    let upper = base & !low_mask;

    let mut best = base as i16;
    let mut min_error = (i32::from(best) - original).abs();

    for low_bits in 0..=low_mask {
        let candidate = (upper | low_bits) as i16;
        let error = (i32::from(candidate) - original).abs();
        if error < min_error {
            min_error = error;
            best = candidate;
        }
    }

    best
}
