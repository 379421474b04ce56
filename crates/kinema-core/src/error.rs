//! Error types for kinema.

use thiserror::Error;

/// Result type alias using kinema's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for kinema.
#[derive(Error, Debug)]
pub enum Error {
    /// The media source could not be opened.
    #[error("Failed to open media source: {0}")]
    Open(String),

    /// The decoder reported an unrecoverable internal failure.
    #[error("Decoder failure: {0}")]
    Decode(String),

    /// A requested playback speed lies outside the supported range.
    #[error("Speed {speed} is outside the supported range [{min}, {max}]")]
    SpeedOutOfRange { speed: f32, min: f32, max: f32 },

    /// A requested seek target lies outside the stream's time range.
    #[error("Seek time {time} is outside the stream range [{start}, {end}]")]
    SeekOutOfRange { time: f64, start: f64, end: f64 },

    /// An operation required an open media source but none is open.
    #[error("No media source is open")]
    NotOpen,

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if retrying the same call with a different source can
    /// succeed (only failed opens qualify; decode failures are terminal for
    /// the stream that raised them).
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Open(_) | Self::Io(_))
    }
}
