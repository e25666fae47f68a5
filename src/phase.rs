use realfft::num_complex::Complex;
use realfft::RealFftPlanner;
use tracing::{debug, info, warn};

use crate::capacity::{ensure_phase_capacity, min_phase_segment_len, phase_capacity};
use crate::config::{MethodKind, StegoConfig};
use crate::error::{Result, StegoError};
use crate::method::{EmbedReport, StegoMethod};
use crate::payload::{
    body_bit_count, decode_payload, encode_payload, read_length_prefix, LENGTH_PREFIX_BITS,
};
use crate::wav::AudioBuffer;

/// Phase coding: payload bits become `±delta` phases in the low bins of the
/// first segment, later segments follow through the original phase differences.
#[derive(Debug, Clone)]
pub struct PhaseEngine {
    seg_len: usize,
    delta: f64,
}

/// One-sided spectrum of every segment, split into magnitude and phase.
struct PhaseVectors {
    magnitudes: Vec<Vec<f64>>,
    phases: Vec<Vec<f64>>,
}

impl PhaseEngine {
    pub fn new(config: &StegoConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            seg_len: config.seg_len,
            delta: config.delta,
        })
    }

    pub fn capacity_bits(&self) -> usize {
        phase_capacity(self.seg_len)
    }

    fn ensure_long_enough(&self, audio: &AudioBuffer) -> Result<()> {
        // Truncating back to the original length would cut into segment 0
        if audio.samples.len() < self.seg_len {
            return Err(StegoError::SignalTooShort {
                samples: audio.samples.len(),
                seg_len: self.seg_len,
            });
        }
        Ok(())
    }

    // =========================================================================
    // STEP 3: Segment, transform, split into magnitude and phase
    // =========================================================================

    fn analyse(&self, samples: &[i16]) -> Result<PhaseVectors> {
        let seg_len = self.seg_len;
        let mut planner = RealFftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(seg_len);
        let mut scratch = forward.make_scratch_vec();
        let mut buffer = vec![0.0f64; seg_len];
        let mut spectrum = forward.make_output_vec();

        let seg_num = samples.len().div_ceil(seg_len).max(1);
        let mut magnitudes = Vec::with_capacity(seg_num);
        let mut phases = Vec::with_capacity(seg_num);

        for index in 0..seg_num {
            let start = (index * seg_len).min(samples.len());
            let end = (start + seg_len).min(samples.len());
            let chunk = &samples[start..end];

            buffer.fill(0.0); // zero padding for the final partial segment
            for (slot, &sample) in buffer.iter_mut().zip(chunk) {
                *slot = f64::from(sample);
            }

            forward.process_with_scratch(&mut buffer, &mut spectrum, &mut scratch)?;

            magnitudes.push(spectrum.iter().map(|bin| bin.norm()).collect());
            phases.push(spectrum.iter().map(|bin| bin.arg()).collect());
        }

        Ok(PhaseVectors { magnitudes, phases })
    }

    // =========================================================================
    // STEP 7: Recombine and return to the time domain
    // =========================================================================

    fn synthesise(&self, vectors: &PhaseVectors, original_len: usize) -> Result<Vec<i16>> {
        let seg_len = self.seg_len;
        let mut planner = RealFftPlanner::<f64>::new();
        let inverse = planner.plan_fft_inverse(seg_len);
        let mut scratch = inverse.make_scratch_vec();
        let mut spectrum = inverse.make_input_vec();
        let mut buffer = inverse.make_output_vec();
        let nyquist = spectrum.len() - 1;

        let mut output = Vec::with_capacity(vectors.phases.len() * seg_len);
        for (magnitude, phase) in vectors.magnitudes.iter().zip(&vectors.phases) {
            for ((bin, &m), &p) in spectrum.iter_mut().zip(magnitude).zip(phase) {
                *bin = Complex::from_polar(m, p);
            }
            // Real signal: DC and Nyquist carry no imaginary part
            spectrum[0].im = 0.0;
            spectrum[nyquist].im = 0.0;

            inverse.process_with_scratch(&mut spectrum, &mut buffer, &mut scratch)?;

            output.extend(buffer.iter().map(|&x| quantize(x / seg_len as f64)));
        }

        output.truncate(original_len);
        Ok(output)
    }

    /// Sign of every usable bin of segment 0. Strict: a phase of exactly zero reads as 0.
    fn read_segment_bits(&self, samples: &[i16]) -> Result<Vec<u8>> {
        let mut planner = RealFftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(self.seg_len);
        let mut scratch = forward.make_scratch_vec();
        let mut spectrum = forward.make_output_vec();
        let mut buffer: Vec<f64> = samples[..self.seg_len]
            .iter()
            .map(|&sample| f64::from(sample))
            .collect();

        forward.process_with_scratch(&mut buffer, &mut spectrum, &mut scratch)?;

        let capacity = phase_capacity(self.seg_len);
        Ok(spectrum[1..=capacity]
            .iter()
            .map(|bin| u8::from(bin.arg() > 0.0))
            .collect())
    }
}

impl StegoMethod for PhaseEngine {
    fn kind(&self) -> MethodKind {
        MethodKind::Phase
    }

    fn embed(&self, audio: &AudioBuffer, payload: &[u8]) -> Result<(AudioBuffer, EmbedReport)> {
        // Step 1: Frame the payload
        let bits = encode_payload(payload)?;

        // Step 2: Capacity is fixed by the segment length
        let capacity = ensure_phase_capacity(self.seg_len, bits.len())?;
        self.ensure_long_enough(audio)?;

        // Step 3: Segment and transform
        let mut vectors = self.analyse(&audio.samples)?;
        debug!(
            "phase embed: {} bits into {} segments of {} samples",
            bits.len(),
            vectors.phases.len(),
            self.seg_len
        );

        // Step 4: Phase differences of the untouched signal
        let diffs: Vec<Vec<f64>> = vectors
            .phases
            .windows(2)
            .map(|pair| pair[1].iter().zip(&pair[0]).map(|(cur, prev)| cur - prev).collect())
            .collect();

        // Step 5: Bit i lives in bin i + 1 of segment 0
        for (bin, &bit) in vectors.phases[0][1..].iter_mut().zip(&bits) {
            *bin = if bit == 1 { self.delta } else { -self.delta };
        }

        // Step 6: Ordered accumulation, segment i depends on segment i - 1
        for (index, diff) in diffs.iter().enumerate() {
            let (done, rest) = vectors.phases.split_at_mut(index + 1);
            let previous = &done[index];
            for ((phase, &prev), &d) in rest[0].iter_mut().zip(previous).zip(diff) {
                *phase = prev + d;
            }
        }

        // Step 7: Back to samples
        let samples = self.synthesise(&vectors, audio.samples.len())?;

        // Silent, quiet or clipped bins lose their phase; read segment 0 back
        let recovered = self.read_segment_bits(&samples)?;
        let embedded = recovered
            .iter()
            .zip(&bits)
            .take_while(|(got, want)| got == want)
            .count();
        if embedded < bits.len() {
            warn!(
                "phase embed: segment 0 only holds {embedded} of {} bits",
                bits.len()
            );
            return Err(StegoError::IncompleteEmbedding {
                embedded,
                required: bits.len(),
            });
        }

        let max_change = samples
            .iter()
            .zip(&audio.samples)
            .map(|(&stego, &orig)| (i32::from(stego) - i32::from(orig)).unsigned_abs())
            .max()
            .unwrap_or(0);

        let report = EmbedReport::new(MethodKind::Phase, payload.len(), bits.len(), capacity, max_change);
        info!("{}", report.summary());
        Ok((audio.with_samples(samples), report))
    }

    fn extract(&self, audio: &AudioBuffer) -> Result<Vec<u8>> {
        self.ensure_long_enough(audio)?;
        let bits = self.read_segment_bits(&audio.samples)?;

        let declared = read_length_prefix(&bits)?;
        debug!("phase extract: header declares {declared} bytes");

        let available = bits.len() - LENGTH_PREFIX_BITS;
        match body_bit_count(declared) {
            Some(needed) if needed <= available => {
                decode_payload(&bits[..LENGTH_PREFIX_BITS + needed])
            }
            _ => Err(StegoError::TruncatedPayload {
                declared,
                available,
            }),
        }
    }

    fn capacity_hint(&self, required_bits: usize) -> Option<String> {
        Some(format!(
            "a seg_len of at least {} would fit",
            min_phase_segment_len(required_bits)
        ))
    }
}

fn quantize(sample: f64) -> i16 {
    sample
        .round()
        .clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantize_clips_to_sixteen_bits() {
        assert_eq!(quantize(40_000.0), i16::MAX);
        assert_eq!(quantize(-40_000.0), i16::MIN);
        assert_eq!(quantize(1.4), 1);
        assert_eq!(quantize(-1.6), -2);
    }

    #[test]
    fn analyse_then_synthesise_is_lossless_without_embedding() {
        let config = StegoConfig {
            seg_len: 64,
            ..StegoConfig::default()
        };
        let engine = PhaseEngine::new(&config).unwrap();
        let samples: Vec<i16> = (0..150).map(|i| ((i * 37) % 2000 - 1000) as i16).collect();

        let vectors = engine.analyse(&samples).unwrap();
        assert_eq!(vectors.phases.len(), 3);
        assert_eq!(vectors.phases[0].len(), 33);

        let rebuilt = engine.synthesise(&vectors, samples.len()).unwrap();
        assert_eq!(rebuilt, samples);
    }
}
