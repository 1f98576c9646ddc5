/// Result alias that carries the custom [`LineVizError`] type.
pub type Result<T> = std::result::Result<T, LineVizError>;

/// Common error type for the core crate.
///
/// Decode and permission failures are recoverable by design: callers surface
/// them through the status sink and the controller falls back to the silent
/// source, so the frame loop keeps running.
#[derive(Debug, thiserror::Error)]
pub enum LineVizError {
    /// The uploaded file's extension is outside the recognised audio and
    /// video sets. Rejected before any decode attempt.
    #[error("unsupported file format `.{extension}`")]
    UnsupportedFormat { extension: String },
    /// A recognised file failed to decode.
    #[error("loading failed: {0}")]
    Load(String),
    /// Microphone access was denied or capture could not start.
    #[error("microphone unavailable: {0}")]
    Permission(String),
    /// Wrapper around FFT processing errors from the spectrum tap.
    #[error("spectrum analysis failed: {0}")]
    Fft(#[from] realfft::FftError),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}
