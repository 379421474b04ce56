//! Minimal end-to-end demo: a synthetic decoder playing into listeners
//! that report what they receive.
//!
//! Run with `RUST_LOG=debug cargo run --example playback` for engine logs.

use kinema_core::{DecoderConfig, Result, ViewSize};
use kinema_stream::{AudioPull, MediaDecoder, StreamListener, StreamProvider};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Generates a 320x240 RGB gradient at ~25 fps and a steady audio tone.
struct SyntheticDecoder {
    state: Mutex<SyntheticState>,
}

struct SyntheticState {
    open: bool,
    frame: u8,
    speed: f32,
}

impl SyntheticDecoder {
    fn new() -> Self {
        Self {
            state: Mutex::new(SyntheticState {
                open: false,
                frame: 0,
                speed: 1.0,
            }),
        }
    }
}

impl MediaDecoder for SyntheticDecoder {
    fn open(&self, _source: &Path, _config: &DecoderConfig) -> Result<()> {
        self.state.lock().open = true;
        Ok(())
    }

    fn close(&self) {
        self.state.lock().open = false;
    }

    fn has_audio_stream(&self) -> bool {
        self.state.lock().open
    }

    fn has_video_stream(&self) -> bool {
        self.state.lock().open
    }

    fn audio_buffer_size(&self) -> usize {
        4096
    }

    fn pull_audio(&self, buf: &mut [u8]) -> Result<AudioPull> {
        std::thread::sleep(Duration::from_millis(20));
        buf.fill(0x40);
        Ok(AudioPull::DataAvailable)
    }

    fn pull_video_frame(&self, buf: &mut [u8]) -> Result<u64> {
        // Simulate frame pacing and catch-up at fast speeds.
        std::thread::sleep(Duration::from_millis(40));
        let mut state = self.state.lock();
        state.frame = state.frame.wrapping_add(1);
        buf.fill(state.frame);
        let consumed = state.speed.abs().round().max(1.0) as u64;
        Ok(consumed)
    }

    fn view_size(&self) -> ViewSize {
        ViewSize::new(320, 240, 3)
    }

    fn set_speed(&self, speed: f32) {
        self.state.lock().speed = speed;
    }

    fn step_forward(&self) {}

    fn step_backward(&self) {}

    fn seek(&self, _time: f64) -> Result<()> {
        Ok(())
    }

    fn start_time(&self) -> f64 {
        0.0
    }

    fn end_time(&self) -> f64 {
        60.0
    }

    fn current_time(&self) -> f64 {
        0.0
    }
}

struct CountingListener {
    name: &'static str,
    events: AtomicUsize,
}

impl CountingListener {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            events: AtomicUsize::new(0),
        }
    }
}

impl StreamListener for CountingListener {
    fn on_opened(&self) {
        println!("[{}] opened", self.name);
    }

    fn on_started(&self) {
        println!("[{}] started", self.name);
    }

    fn on_data(&self, data: &[u8]) {
        let n = self.events.fetch_add(1, Ordering::Relaxed) + 1;
        if n % 10 == 0 {
            println!("[{}] {} chunks, last {} bytes", self.name, n, data.len());
        }
    }

    fn on_stopped(&self) {
        println!(
            "[{}] stopped after {} chunks",
            self.name,
            self.events.load(Ordering::Relaxed)
        );
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut provider = StreamProvider::new(Arc::new(SyntheticDecoder::new()));
    provider.add_audio_listener(Arc::new(CountingListener::new("audio")));
    provider.add_video_listener(Arc::new(CountingListener::new("video")));

    provider.open(Path::new("synthetic://demo"), &DecoderConfig::default())?;
    provider.start()?;
    std::thread::sleep(Duration::from_secs(1));

    // Fast forward: audio drops out, video keeps up by skipping frames.
    provider.set_speed(4.0)?;
    std::thread::sleep(Duration::from_secs(1));

    provider.stop();
    let stats = provider.frame_stats();
    println!(
        "frames read: {}, dropped: {}",
        stats.frames_read, stats.frames_dropped
    );

    provider.step_forward()?;
    provider.close();
    Ok(())
}
