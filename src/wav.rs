//! WAV container I/O. Only channel 0 is exposed as the working signal; any
//! other channels ride along untouched and are re-interleaved on write.

use std::fs;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::{debug, info};

use crate::error::{Result, StegoError};

/// Working channel of a 16-bit PCM signal plus what is needed to write it back.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    channels: u16,
    /// Interleaved samples of channels 1.. (empty for mono).
    other_channels: Vec<i16>,
}

impl AudioBuffer {
    pub fn mono(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            channels: 1,
            other_channels: Vec::new(),
        }
    }

    /// Split interleaved frames; channel 0 becomes the working signal.
    pub fn from_interleaved(interleaved: &[i16], channels: u16, sample_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(StegoError::UnsupportedFormat("zero channels".into()));
        }
        let stride = channels as usize;
        if interleaved.len() % stride != 0 {
            return Err(StegoError::UnsupportedFormat(format!(
                "{} samples do not form whole {channels}-channel frames",
                interleaved.len()
            )));
        }

        let frames = interleaved.len() / stride;
        let mut samples = Vec::with_capacity(frames);
        let mut other_channels = Vec::with_capacity(frames * (stride - 1));
        for frame in interleaved.chunks_exact(stride) {
            samples.push(frame[0]);
            other_channels.extend_from_slice(&frame[1..]);
        }

        Ok(Self {
            samples,
            sample_rate,
            channels,
            other_channels,
        })
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Same metadata and side channels, new working signal.
    pub fn with_samples(&self, samples: Vec<i16>) -> Self {
        Self {
            samples,
            sample_rate: self.sample_rate,
            channels: self.channels,
            other_channels: self.other_channels.clone(),
        }
    }

    pub fn to_interleaved(&self) -> Vec<i16> {
        let side = self.channels as usize - 1;
        if side == 0 {
            return self.samples.clone();
        }

        let mut interleaved = Vec::with_capacity(self.samples.len() * (side + 1));
        for (&sample, rest) in self
            .samples
            .iter()
            .zip(self.other_channels.chunks_exact(side))
        {
            interleaved.push(sample);
            interleaved.extend_from_slice(rest);
        }
        interleaved
    }

    fn spec(&self) -> WavSpec {
        WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        }
    }
}

pub fn read_wav(input_path: &Path) -> Result<AudioBuffer> {
    debug!("Loading audio from {}", input_path.display());

    let mut reader = WavReader::open(input_path)?;
    let spec = reader.spec();
    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(StegoError::UnsupportedFormat(format!(
            "expected 16-bit integer PCM, got {}-bit {:?}",
            spec.bits_per_sample, spec.sample_format
        )));
    }

    let interleaved = reader
        .samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let buffer = AudioBuffer::from_interleaved(&interleaved, spec.channels, spec.sample_rate)?;

    debug!(
        "Read {} frames ({} channels) at {} Hz",
        buffer.samples.len(),
        spec.channels,
        spec.sample_rate
    );
    Ok(buffer)
}

pub fn write_wav(output_path: &Path, buffer: &AudioBuffer) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(hound::Error::IoError)?;
        }
    }

    let mut writer = WavWriter::create(output_path, buffer.spec())?;
    for sample in buffer.to_interleaved() {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    info!("Wrote stego audio to {}", output_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleave_round_trip_keeps_side_channels() {
        let interleaved = [1, -1, 2, -2, 3, -3];
        let buffer = AudioBuffer::from_interleaved(&interleaved, 2, 44_100).unwrap();
        assert_eq!(buffer.samples, vec![1, 2, 3]);

        let replaced = buffer.with_samples(vec![10, 20, 30]);
        assert_eq!(replaced.to_interleaved(), vec![10, -1, 20, -2, 30, -3]);
    }

    #[test]
    fn ragged_frames_are_rejected() {
        assert!(matches!(
            AudioBuffer::from_interleaved(&[1, 2, 3], 2, 8000),
            Err(StegoError::UnsupportedFormat(_))
        ));
    }
}
