//! The `encode` / `decode` contract shared by both engines.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{MethodKind, StegoConfig};
use crate::error::{Result, StegoError};
use crate::lsb::LsbEngine;
use crate::phase::PhaseEngine;
use crate::wav::{read_wav, write_wav, AudioBuffer};

/// Statistics of a successful embed, used for the human-readable report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedReport {
    pub method: MethodKind,
    pub payload_bytes: usize,
    /// Carrier bits written, length prefix included.
    pub bits_embedded: usize,
    pub capacity_bits: usize,
    /// Largest absolute change applied to any sample.
    pub max_sample_change: u32,
}

impl EmbedReport {
    pub fn new(
        method: MethodKind,
        payload_bytes: usize,
        bits_embedded: usize,
        capacity_bits: usize,
        max_sample_change: u32,
    ) -> Self {
        Self {
            method,
            payload_bytes,
            bits_embedded,
            capacity_bits,
            max_sample_change,
        }
    }

    pub fn usage_percent(&self) -> f64 {
        if self.capacity_bits == 0 {
            return 0.0;
        }
        self.bits_embedded as f64 / self.capacity_bits as f64 * 100.0
    }

    pub fn summary(&self) -> String {
        format!(
            "{:?}: hid {} bytes ({} bits), {:.2}% of {} carrier bits used, max sample change {}",
            self.method,
            self.payload_bytes,
            self.bits_embedded,
            self.usage_percent(),
            self.capacity_bits,
            self.max_sample_change
        )
    }
}

/// Result of [`StegoMethod::encode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeOutcome {
    pub success: bool,
    pub message: String,
}

/// Result of [`StegoMethod::decode`]. `payload` is empty on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeOutcome {
    pub success: bool,
    pub payload: String,
    pub message: String,
}

pub trait StegoMethod: Send + Sync {
    fn kind(&self) -> MethodKind;

    /// Hide `payload` in the working channel. All-or-nothing: on error the
    /// input buffer is left as it was and nothing is returned.
    fn embed(&self, audio: &AudioBuffer, payload: &[u8]) -> Result<(AudioBuffer, EmbedReport)>;

    fn extract(&self, audio: &AudioBuffer) -> Result<Vec<u8>>;

    /// Configuration change that would fit `required_bits`, if the engine knows one.
    fn capacity_hint(&self, _required_bits: usize) -> Option<String> {
        None
    }

    fn embed_text(&self, audio: &AudioBuffer, message: &str) -> Result<(AudioBuffer, EmbedReport)> {
        self.embed(audio, message.as_bytes())
    }

    /// Strict UTF-8: invalid bytes fail with `InvalidEncoding`.
    fn extract_text(&self, audio: &AudioBuffer) -> Result<String> {
        Ok(String::from_utf8(self.extract(audio)?)?)
    }

    /// Read `input`, hide `payload`, write `output`. No file is written on failure.
    fn encode(&self, input: &Path, output: &Path, payload: &str) -> EncodeOutcome {
        let result = read_wav(input)
            .and_then(|audio| self.embed_text(&audio, payload))
            .and_then(|(stego, report)| write_wav(output, &stego).map(|()| report));

        match result {
            Ok(report) => EncodeOutcome {
                success: true,
                message: format!(
                    "message hidden in {}\n{}",
                    output.display(),
                    report.summary()
                ),
            },
            Err(err) => {
                warn!("{:?} encode of {} failed: {err}", self.kind(), input.display());
                let hint = match &err {
                    StegoError::CapacityExceeded { required, .. } => self.capacity_hint(*required),
                    _ => None,
                };
                let message = match hint {
                    Some(hint) => format!("encoding failed: {err}; {hint}"),
                    None => format!("encoding failed: {err}"),
                };
                EncodeOutcome {
                    success: false,
                    message,
                }
            }
        }
    }

    fn decode(&self, input: &Path) -> DecodeOutcome {
        match read_wav(input).and_then(|audio| self.extract_text(&audio)) {
            Ok(payload) if payload.is_empty() => DecodeOutcome {
                success: false,
                payload,
                message: "no hidden message found".into(),
            },
            Ok(payload) => DecodeOutcome {
                success: true,
                message: format!(
                    "message recovered: {} bytes ({} payload bits)",
                    payload.len(),
                    payload.len() * 8
                ),
                payload,
            },
            Err(err) => {
                warn!("{:?} decode of {} failed: {err}", self.kind(), input.display());
                DecodeOutcome {
                    success: false,
                    payload: String::new(),
                    message: format!("decoding failed: {err}"),
                }
            }
        }
    }
}

/// Build the engine selected by `kind`.
pub fn build_method(kind: MethodKind, config: &StegoConfig) -> Result<Box<dyn StegoMethod>> {
    Ok(match kind {
        MethodKind::Lsb => Box::new(LsbEngine::new(config)?),
        MethodKind::Phase => Box::new(PhaseEngine::new(config)?),
    })
}
