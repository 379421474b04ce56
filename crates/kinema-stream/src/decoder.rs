//! The decoder contract the engine pumps from.
//!
//! A [`MediaDecoder`] wraps an opened media source (typically native
//! bindings around a demuxer/decoder) and exposes blocking-or-empty pull
//! operations for one audio chunk and one video frame, plus transport
//! controls. The engine never decodes anything itself; it only schedules
//! pulls and fans the results out to listeners.

use kinema_core::{DecoderConfig, Result, ViewSize};
use std::path::Path;

/// Outcome of one audio pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioPull {
    /// The buffer was filled with one chunk of decoded audio.
    DataAvailable,
    /// No audio is available right now; the caller should throttle and retry.
    NoData,
}

/// An opened media source the engine pulls decoded data from.
///
/// All methods take `&self`: pump threads call the pull operations
/// concurrently with transport calls (`set_speed`, `seek`, stepping) from
/// the controlling thread, so implementations use interior mutability and
/// must tolerate that interleaving. The engine serializes the calls it can
/// (audio is stopped before speed changes take effect on that lane).
pub trait MediaDecoder: Send + Sync {
    /// Open `source` for decoding. Any previously opened source is replaced.
    fn open(&self, source: &Path, config: &DecoderConfig) -> Result<()>;

    /// Release the underlying resource. Closing a closed decoder is a no-op.
    fn close(&self);

    /// True if the opened source contains an audio stream.
    fn has_audio_stream(&self) -> bool;

    /// True if the opened source contains a video stream.
    fn has_video_stream(&self) -> bool;

    /// Size in bytes of one audio chunk as delivered by [`pull_audio`].
    ///
    /// [`pull_audio`]: MediaDecoder::pull_audio
    fn audio_buffer_size(&self) -> usize;

    /// Pull one chunk of decoded audio into `buf`.
    ///
    /// "No data yet" is a normal outcome, not an error; only an internal
    /// decoder failure returns `Err`.
    fn pull_audio(&self, buf: &mut [u8]) -> Result<AudioPull>;

    /// Pull the next video frame into `buf`, returning the number of frames
    /// the decoder consumed to produce it.
    ///
    /// Returns 0 when no frame is available. A value greater than 1 means
    /// the decoder skipped intermediate frames to keep up with the
    /// configured speed and only the most recent one is in `buf`.
    fn pull_video_frame(&self, buf: &mut [u8]) -> Result<u64>;

    /// Pixel geometry of the current view. May change between frames when
    /// the view rectangle is adjusted, so callers re-query it per pull.
    fn view_size(&self) -> ViewSize;

    /// Apply a new playback speed. The decoder derives playback direction
    /// from the sign.
    fn set_speed(&self, speed: f32);

    /// Advance the stream by a single frame.
    fn step_forward(&self);

    /// Rewind the stream by a single frame.
    fn step_backward(&self);

    /// Jump to `time` seconds into the stream.
    fn seek(&self, time: f64) -> Result<()>;

    /// Start of the stream's time range in seconds.
    fn start_time(&self) -> f64;

    /// End of the stream's time range in seconds.
    fn end_time(&self) -> f64;

    /// Total stream duration in seconds.
    fn duration(&self) -> f64 {
        self.end_time() - self.start_time()
    }

    /// Current playback position in seconds.
    fn current_time(&self) -> f64;
}
