pub mod capacity;
pub mod config;
pub mod error;
pub mod lsb;
pub mod method;
pub mod payload;
pub mod phase;
pub mod wav;

use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

pub use config::{MethodKind, StegoConfig};
pub use error::{Result, StegoError};
pub use lsb::LsbEngine;
pub use method::{build_method, DecodeOutcome, EmbedReport, EncodeOutcome, StegoMethod};
pub use phase::PhaseEngine;
pub use wav::{read_wav, write_wav, AudioBuffer};

/// Struct to hold a decoded payload for JS
#[derive(Serialize, Deserialize)]
pub struct DecodedResult {
    pub success: bool,
    pub message: String,
    pub raw_bytes: Vec<u8>,
    pub error: Option<String>,
}

fn method_from_js(method: &str, config_json: &str) -> Result<Box<dyn StegoMethod>> {
    let kind: MethodKind = serde_json::from_value(serde_json::Value::String(method.to_lowercase()))
        .map_err(|_| StegoError::InvalidConfig(format!("unknown method {method:?}")))?;
    let config = if config_json.trim().is_empty() {
        StegoConfig::default()
    } else {
        StegoConfig::from_json_str(config_json)?
    };
    build_method(kind, &config)
}

fn console_log(line: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::log_1(&line.into());
    #[cfg(not(target_arch = "wasm32"))]
    tracing::debug!("{line}");
}

/// Hide a message in mono 16-bit samples
///
/// # Arguments
/// * `samples` - Audio samples as i16 array
/// * `sample_rate` - Sample rate in Hz
/// * `message` - Message string to hide
/// * `method` - `"lsb"` or `"phase"`
/// * `config_json` - Optional JSON overriding the default tunables (empty for defaults)
///
/// # Returns
/// Stego samples, same length as the input
#[wasm_bindgen]
pub fn encode_audio(
    samples: Vec<i16>,
    sample_rate: u32,
    message: String,
    method: &str,
    config_json: &str,
) -> std::result::Result<Vec<i16>, JsError> {
    let run = || -> Result<Vec<i16>> {
        let engine = method_from_js(method, config_json)?;
        let audio = AudioBuffer::mono(samples, sample_rate);
        let (stego, report) = engine.embed_text(&audio, &message)?;
        console_log(&report.summary());
        Ok(stego.samples)
    };
    run().map_err(|err| JsError::new(&err.to_string()))
}

/// Recover a hidden message from mono 16-bit samples
///
/// # Returns
/// Decoded payload (message and raw bytes) as JSON string
#[wasm_bindgen]
pub fn decode_audio(samples: Vec<i16>, sample_rate: u32, method: &str, config_json: &str) -> String {
    let result = method_from_js(method, config_json)
        .and_then(|engine| engine.extract(&AudioBuffer::mono(samples, sample_rate)));

    let decoded_result = match result {
        Ok(raw_bytes) => match String::from_utf8(raw_bytes.clone()) {
            Ok(message) => DecodedResult {
                success: true,
                message,
                raw_bytes,
                error: None,
            },
            Err(err) => DecodedResult {
                success: false,
                message: String::new(),
                raw_bytes,
                error: Some(StegoError::from(err).to_string()),
            },
        },
        Err(err) => DecodedResult {
            success: false,
            message: String::new(),
            raw_bytes: Vec::new(),
            error: Some(err.to_string()),
        },
    };
    console_log(&format!("decode success: {}", decoded_result.success));

    serde_json::to_string(&decoded_result)
        .unwrap_or_else(|err| format!("{{\"success\":false,\"error\":\"{err}\"}}"))
}
