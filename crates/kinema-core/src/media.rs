//! Shared media types: stream kinds, view geometry, decoder configuration
//! and frame accounting snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two independent pumping lanes of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => f.write_str("audio"),
            Self::Video => f.write_str("video"),
        }
    }
}

/// Pixel geometry of the decoder's current view.
///
/// The view is a sub-rectangle of the native stream and may change between
/// frames, so consumers re-query it rather than caching it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSize {
    /// View width in pixels.
    pub width: usize,
    /// View height in pixels.
    pub height: usize,
    /// Color channels per pixel (3 for RGB, 1 for grayscale).
    pub channels: usize,
}

impl ViewSize {
    pub const fn new(width: usize, height: usize, channels: usize) -> Self {
        Self {
            width,
            height,
            channels,
        }
    }

    /// Number of bytes one frame of this view occupies.
    pub const fn byte_len(&self) -> usize {
        self.width * self.height * self.channels
    }
}

/// Color space requested from the decoder when opening a source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    #[default]
    Rgb,
    Grayscale,
}

impl ColorSpace {
    /// Color channels per pixel for this color space.
    pub const fn channels(self) -> usize {
        match self {
            Self::Rgb => 3,
            Self::Grayscale => 1,
        }
    }
}

/// Audio channel layout requested from the decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelLayout {
    #[default]
    Mono,
    Stereo,
}

impl ChannelLayout {
    pub const fn channels(self) -> usize {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }
}

/// Audio format requested from the decoder when opening a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioRequest {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel layout.
    pub layout: ChannelLayout,
}

impl Default for AudioRequest {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            layout: ChannelLayout::Mono,
        }
    }
}

/// Configuration handed to the decoder on open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Requested output color space for video frames.
    pub color_space: ColorSpace,
    /// Requested output format for audio data.
    pub audio: AudioRequest,
}

/// Snapshot of the video frame counters.
///
/// Both counters are monotonically non-decreasing between opens and
/// `frames_dropped <= frames_read` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameStats {
    /// Total frames the decoder consumed on our behalf.
    pub frames_read: u64,
    /// Frames sacrificed to keep up with the configured speed.
    pub frames_dropped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_size_byte_len() {
        assert_eq!(ViewSize::new(640, 480, 3).byte_len(), 640 * 480 * 3);
        assert_eq!(ViewSize::new(0, 480, 3).byte_len(), 0);
    }

    #[test]
    fn test_color_space_channels() {
        assert_eq!(ColorSpace::Rgb.channels(), 3);
        assert_eq!(ColorSpace::Grayscale.channels(), 1);
    }

    #[test]
    fn test_decoder_config_default() {
        let config = DecoderConfig::default();
        assert_eq!(config.color_space, ColorSpace::Rgb);
        assert_eq!(config.audio.sample_rate, 44_100);
        assert_eq!(config.audio.layout, ChannelLayout::Mono);
    }

    #[test]
    fn test_media_kind_display() {
        assert_eq!(MediaKind::Audio.to_string(), "audio");
        assert_eq!(MediaKind::Video.to_string(), "video");
    }
}
