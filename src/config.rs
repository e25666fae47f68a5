use std::f64::consts::PI;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StegoError};

pub const DEFAULT_LSB_POSITION: u32 = 0;
pub const DEFAULT_SILENCE_THRESHOLD: i32 = 500;
pub const DEFAULT_SEG_LEN: usize = 8192;
pub const DEFAULT_DELTA: f64 = PI / 8.0;

/// Which engine a [`crate::method::StegoMethod`] should be built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    Lsb,
    Phase,
}

/// Tunables shared by both engines. Missing JSON fields fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StegoConfig {
    /// Bit position used as carrier (0 = least significant). Range 0..=14;
    /// bit 15 is the sign bit.
    pub lsb_position: u32,
    /// Samples with a smaller absolute amplitude are never used as carriers.
    pub silence_threshold: i32,
    /// Phase-coding segment length. Must be a power of two.
    pub seg_len: usize,
    /// Phase written into a bin, in radians: `+delta` for 1, `-delta` for 0.
    pub delta: f64,
}

impl Default for StegoConfig {
    fn default() -> Self {
        Self {
            lsb_position: DEFAULT_LSB_POSITION,
            silence_threshold: DEFAULT_SILENCE_THRESHOLD,
            seg_len: DEFAULT_SEG_LEN,
            delta: DEFAULT_DELTA,
        }
    }
}

impl StegoConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| StegoError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            StegoError::InvalidConfig(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.lsb_position > 14 {
            return Err(StegoError::InvalidConfig(format!(
                "lsb_position must be within 0..=14, got {}",
                self.lsb_position
            )));
        }
        if self.silence_threshold < 0 {
            return Err(StegoError::InvalidConfig(format!(
                "silence_threshold must not be negative, got {}",
                self.silence_threshold
            )));
        }
        if self.seg_len < 4 || !self.seg_len.is_power_of_two() {
            return Err(StegoError::InvalidConfig(format!(
                "seg_len must be a power of two >= 4, got {}",
                self.seg_len
            )));
        }
        if !self.delta.is_finite() || self.delta <= 0.0 || self.delta >= PI {
            return Err(StegoError::InvalidConfig(format!(
                "delta must lie in (0, pi), got {}",
                self.delta
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = StegoConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.seg_len, 8192);
        assert_eq!(config.silence_threshold, 500);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = StegoConfig::from_json_str(r#"{ "lsb_position": 3 }"#).unwrap();
        assert_eq!(config.lsb_position, 3);
        assert_eq!(config.seg_len, DEFAULT_SEG_LEN);
        assert_eq!(config.delta, DEFAULT_DELTA);
    }

    #[test]
    fn rejects_bad_values() {
        for json in [
            r#"{ "lsb_position": 15 }"#,
            r#"{ "lsb_position": 16 }"#,
            r#"{ "seg_len": 1000 }"#,
            r#"{ "seg_len": 2 }"#,
            r#"{ "delta": 0.0 }"#,
            r#"{ "delta": 4.0 }"#,
            r#"{ "silence_threshold": -1 }"#,
        ] {
            match StegoConfig::from_json_str(json) {
                Err(StegoError::InvalidConfig(_)) => {}
                other => panic!("expected InvalidConfig for {json}, got {other:?}"),
            }
        }
    }

    #[test]
    fn loads_and_validates_config_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stego.json");
        fs::write(&path, r#"{ "seg_len": 1024, "delta": 0.5 }"#).unwrap();

        let config = StegoConfig::from_path(&path).unwrap();
        assert_eq!(config.seg_len, 1024);
        assert_eq!(config.delta, 0.5);
        assert_eq!(config.lsb_position, DEFAULT_LSB_POSITION);

        fs::write(&path, r#"{ "lsb_position": 15 }"#).unwrap();
        assert!(matches!(
            StegoConfig::from_path(&path),
            Err(StegoError::InvalidConfig(_))
        ));
        assert!(matches!(
            StegoConfig::from_path(dir.path().join("missing.json")),
            Err(StegoError::InvalidConfig(_))
        ));
    }

    #[test]
    fn method_kind_is_lowercase_in_json() {
        let kind: MethodKind = serde_json::from_str("\"phase\"").unwrap();
        assert_eq!(kind, MethodKind::Phase);
    }
}
