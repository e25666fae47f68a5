use thiserror::Error;

/// Every way an embed or extract call can fail.
#[derive(Debug, Error)]
pub enum StegoError {
    /// Payload does not fit the carrier; raised before any sample is touched.
    #[error("payload needs {required} bits but only {available} are available")]
    CapacityExceeded { required: usize, available: usize },

    /// The carrier could only hold the first `embedded` bits.
    #[error("only {embedded} of {required} bits could be embedded in this cover")]
    IncompleteEmbedding { embedded: usize, required: usize },

    #[error("length prefix truncated: only {available} of 32 bits recovered")]
    TruncatedLength { available: usize },

    #[error("payload truncated: header declares {declared} bytes but only {available} bits follow")]
    TruncatedPayload { declared: u32, available: usize },

    #[error("recovered payload is not valid UTF-8")]
    InvalidEncoding(#[from] std::string::FromUtf8Error),

    #[error("payload of {0} bytes does not fit a 32-bit length prefix")]
    PayloadTooLarge(usize),

    #[error("signal has {samples} samples, shorter than one {seg_len}-sample segment")]
    SignalTooShort { samples: usize, seg_len: usize },

    #[error("FFT failed: {0}")]
    Fft(#[from] realfft::FftError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("audio I/O failed: {0}")]
    Io(#[from] hound::Error),
}

pub type Result<T> = std::result::Result<T, StegoError>;
