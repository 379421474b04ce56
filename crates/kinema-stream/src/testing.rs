//! Test doubles shared by the unit tests: a scriptable decoder and a
//! listener that records every notification it receives.

use crate::decoder::{AudioPull, MediaDecoder};
use crate::listener::StreamListener;
use kinema_core::{DecoderConfig, Error, Result, ViewSize};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Scriptable in-memory decoder.
///
/// Interior mutability everywhere, matching the trait's `&self` contract:
/// tests drive it from the controlling thread while pump workers pull.
pub(crate) struct FakeDecoder {
    inner: Mutex<FakeState>,
}

struct FakeState {
    open: bool,
    has_audio: bool,
    has_video: bool,
    audio_buffer_size: usize,
    view: ViewSize,
    /// Whether every audio pull returns data (true) or none ever does.
    audio_available: bool,
    /// Scripted `n` results for video pulls, consumed front to back.
    video_script: VecDeque<u64>,
    /// Result for video pulls once the script runs out.
    video_repeat: Option<u64>,
    fail_open: Option<String>,
    fail_audio: Option<String>,
    fail_video: Option<String>,
    start_time: f64,
    end_time: f64,
    current_time: f64,
    speeds: Vec<f32>,
    /// +1 per forward step, -1 per backward step, in call order.
    steps: Vec<i8>,
    seeks: Vec<f64>,
    closes: usize,
}

impl FakeDecoder {
    pub(crate) fn with_streams(has_audio: bool, has_video: bool) -> Self {
        Self {
            inner: Mutex::new(FakeState {
                open: false,
                has_audio,
                has_video,
                audio_buffer_size: 1024,
                view: ViewSize::new(64, 48, 3),
                audio_available: false,
                video_script: VecDeque::new(),
                video_repeat: None,
                fail_open: None,
                fail_audio: None,
                fail_video: None,
                start_time: 0.0,
                end_time: 0.0,
                current_time: 0.0,
                speeds: Vec::new(),
                steps: Vec::new(),
                seeks: Vec::new(),
                closes: 0,
            }),
        }
    }

    pub(crate) fn set_audio_available(&self, available: bool) {
        self.inner.lock().audio_available = available;
    }

    pub(crate) fn push_video_frames(&self, counts: impl IntoIterator<Item = u64>) {
        self.inner.lock().video_script.extend(counts);
    }

    /// After any scripted frames, every video pull consumes `n` frames.
    pub(crate) fn set_video_repeat(&self, n: u64) {
        self.inner.lock().video_repeat = Some(n);
    }

    pub(crate) fn fail_open(&self, message: &str) {
        self.inner.lock().fail_open = Some(message.to_string());
    }

    pub(crate) fn fail_audio(&self, message: &str) {
        self.inner.lock().fail_audio = Some(message.to_string());
    }

    pub(crate) fn fail_video(&self, message: &str) {
        self.inner.lock().fail_video = Some(message.to_string());
    }

    pub(crate) fn set_time_range(&self, start: f64, end: f64) {
        let mut inner = self.inner.lock();
        inner.start_time = start;
        inner.end_time = end;
    }

    pub(crate) fn speeds(&self) -> Vec<f32> {
        self.inner.lock().speeds.clone()
    }

    pub(crate) fn steps(&self) -> Vec<i8> {
        self.inner.lock().steps.clone()
    }

    pub(crate) fn seeks(&self) -> Vec<f64> {
        self.inner.lock().seeks.clone()
    }

    pub(crate) fn closes(&self) -> usize {
        self.inner.lock().closes
    }
}

impl MediaDecoder for FakeDecoder {
    fn open(&self, _source: &Path, _config: &DecoderConfig) -> Result<()> {
        let mut inner = self.inner.lock();
        if let Some(message) = &inner.fail_open {
            return Err(Error::Open(message.clone()));
        }
        inner.open = true;
        Ok(())
    }

    fn close(&self) {
        let mut inner = self.inner.lock();
        if inner.open {
            inner.open = false;
            inner.closes += 1;
        }
    }

    fn has_audio_stream(&self) -> bool {
        let inner = self.inner.lock();
        inner.open && inner.has_audio
    }

    fn has_video_stream(&self) -> bool {
        let inner = self.inner.lock();
        inner.open && inner.has_video
    }

    fn audio_buffer_size(&self) -> usize {
        self.inner.lock().audio_buffer_size
    }

    fn pull_audio(&self, buf: &mut [u8]) -> Result<AudioPull> {
        let inner = self.inner.lock();
        if let Some(message) = &inner.fail_audio {
            return Err(Error::Decode(message.clone()));
        }
        if inner.audio_available {
            buf.fill(0xA5);
            Ok(AudioPull::DataAvailable)
        } else {
            Ok(AudioPull::NoData)
        }
    }

    fn pull_video_frame(&self, buf: &mut [u8]) -> Result<u64> {
        let mut inner = self.inner.lock();
        if let Some(message) = &inner.fail_video {
            return Err(Error::Decode(message.clone()));
        }
        let n = inner
            .video_script
            .pop_front()
            .or(inner.video_repeat)
            .unwrap_or(0);
        if n > 0 {
            buf.fill(0x5A);
        }
        Ok(n)
    }

    fn view_size(&self) -> ViewSize {
        self.inner.lock().view
    }

    fn set_speed(&self, speed: f32) {
        self.inner.lock().speeds.push(speed);
    }

    fn step_forward(&self) {
        self.inner.lock().steps.push(1);
    }

    fn step_backward(&self) {
        self.inner.lock().steps.push(-1);
    }

    fn seek(&self, time: f64) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.current_time = time;
        inner.seeks.push(time);
        Ok(())
    }

    fn start_time(&self) -> f64 {
        self.inner.lock().start_time
    }

    fn end_time(&self) -> f64 {
        self.inner.lock().end_time
    }

    fn current_time(&self) -> f64 {
        self.inner.lock().current_time
    }
}

/// One recorded notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Note {
    Opened,
    Started,
    Data(usize),
    Stopped,
}

type SharedLog = Arc<Mutex<Vec<(String, Note)>>>;

/// Listener that records every notification, optionally into a log shared
/// with other listeners to observe cross-listener ordering.
pub(crate) struct RecordingListener {
    tag: String,
    shared: Option<SharedLog>,
    local: Mutex<Vec<Note>>,
    panic_on_data: bool,
}

impl RecordingListener {
    pub(crate) fn new() -> Self {
        Self {
            tag: String::new(),
            shared: None,
            local: Mutex::new(Vec::new()),
            panic_on_data: false,
        }
    }

    pub(crate) fn shared_log() -> SharedLog {
        Arc::new(Mutex::new(Vec::new()))
    }

    pub(crate) fn tagged(tag: &str, log: &SharedLog) -> Self {
        Self {
            tag: tag.to_string(),
            shared: Some(log.clone()),
            local: Mutex::new(Vec::new()),
            panic_on_data: false,
        }
    }

    /// A listener whose `on_data` always panics, for fault isolation tests.
    pub(crate) fn panicking_on_data() -> Self {
        Self {
            tag: String::new(),
            shared: None,
            local: Mutex::new(Vec::new()),
            panic_on_data: true,
        }
    }

    pub(crate) fn notes(&self) -> Vec<Note> {
        self.local.lock().clone()
    }

    /// Poll until at least `min` data notifications arrived or `timeout`
    /// elapses. Returns whether the threshold was reached.
    pub(crate) fn wait_for_data(&self, min: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let data = self
                .local
                .lock()
                .iter()
                .filter(|n| matches!(n, Note::Data(_)))
                .count();
            if data >= min {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn record(&self, note: Note) {
        self.local.lock().push(note);
        if let Some(shared) = &self.shared {
            shared.lock().push((self.tag.clone(), note));
        }
    }
}

impl StreamListener for RecordingListener {
    fn on_opened(&self) {
        self.record(Note::Opened);
    }

    fn on_started(&self) {
        self.record(Note::Started);
    }

    fn on_data(&self, data: &[u8]) {
        assert!(!self.panic_on_data, "listener wired to panic on data");
        self.record(Note::Data(data.len()));
    }

    fn on_stopped(&self) {
        self.record(Note::Stopped);
    }
}
