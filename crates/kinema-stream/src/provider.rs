//! The playback state machine coordinating the decoder, the pump workers
//! and the listener registries.
//!
//! A [`StreamProvider`] owns an opened media source for its lifetime and
//! feeds its audio stream and its video stream to any number of registered
//! listeners. Each kind is a simple two-state machine (stopped/running)
//! backed by one pump worker while running.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use crate::counters::FrameCounters;
use crate::decoder::MediaDecoder;
use crate::listener::{ListenerRegistry, StreamListener};
use crate::pump::{self, PumpWorker};
use crossbeam_channel::{unbounded, Receiver, Sender};
use kinema_core::{speed, DecoderConfig, Error, FrameStats, MediaKind, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Out-of-band reports from the engine to the controlling thread.
///
/// Transient "no data yet" never appears here; it is normal pump operation,
/// not an error.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// The decoder failed unrecoverably; the owning pump terminated.
    DecodeFailed { kind: MediaKind, message: String },
    /// A listener panicked during a notification and was skipped.
    ListenerFault { kind: MediaKind },
}

/// One pumping lane: the listeners for a kind plus its worker, if running.
struct Lane {
    registry: Arc<ListenerRegistry>,
    worker: Option<PumpWorker>,
}

impl Lane {
    fn new(kind: MediaKind, stream: Uuid, events: Sender<StreamEvent>) -> Self {
        Self {
            registry: Arc::new(ListenerRegistry::new(kind, stream, events)),
            worker: None,
        }
    }
}

/// Synchronized playback engine for one media source.
///
/// All control operations are called from a single controlling thread; the
/// two pump workers run concurrently with it and share only the listener
/// registries, the frame counters and the decoder's pull operations.
pub struct StreamProvider {
    /// Identifies this engine instance in logs.
    stream: Uuid,
    decoder: Arc<dyn MediaDecoder>,
    audio: Lane,
    video: Lane,
    /// Video frame accounting, reset on open.
    counters: Arc<FrameCounters>,
    /// Last non-zero speed applied, 1x until changed.
    speed: f32,
    /// Whether a source is currently open.
    open: bool,
    event_tx: Sender<StreamEvent>,
    event_rx: Receiver<StreamEvent>,
}

impl StreamProvider {
    /// Create an engine around a decoder. No source is open yet.
    pub fn new(decoder: Arc<dyn MediaDecoder>) -> Self {
        let stream = Uuid::new_v4();
        let (event_tx, event_rx) = unbounded();
        Self {
            stream,
            decoder,
            audio: Lane::new(MediaKind::Audio, stream, event_tx.clone()),
            video: Lane::new(MediaKind::Video, stream, event_tx.clone()),
            counters: Arc::new(FrameCounters::new()),
            speed: 1.0,
            open: false,
            event_tx,
            event_rx,
        }
    }

    /// Open a media source, replacing any source currently open.
    ///
    /// Both lanes are stopped first if running. On success the frame
    /// counters are reset and listeners of each present stream kind are
    /// notified `on_opened`.
    pub fn open(&mut self, source: &Path, config: &DecoderConfig) -> Result<()> {
        if self.audio.registry.is_running() || self.video.registry.is_running() {
            self.stop();
        }
        info!(stream = %self.stream, source = %source.display(), "opening media source");
        self.decoder.open(source, config)?;
        self.open = true;
        self.speed = 1.0;
        self.counters.reset();
        if self.decoder.has_audio_stream() {
            self.audio.registry.notify_opened();
        }
        if self.decoder.has_video_stream() {
            self.video.registry.notify_opened();
        }
        Ok(())
    }

    /// Start playback.
    ///
    /// Audio only follows at exactly forward 1x; video starts for any
    /// current speed. Starting a kind with no stream present or one that is
    /// already running is a no-op.
    pub fn start(&mut self) -> Result<()> {
        if !self.open {
            return Err(Error::NotOpen);
        }
        if speed::is_forward_1x(self.speed) {
            self.start_audio()?;
        }
        self.start_video()
    }

    /// Stop playback of both kinds, video first.
    ///
    /// Stopping an already-stopped kind is a no-op: no notifications fire
    /// and no join occurs.
    pub fn stop(&mut self) {
        self.stop_video();
        self.stop_audio();
    }

    /// Apply a new playback speed.
    ///
    /// Zero is equivalent to [`stop`](Self::stop). Otherwise the decoder
    /// sees the new speed before any lane decision is made (its reverse
    /// detection depends on that order), then audio starts if the new speed
    /// is forward 1x while video is running, and stops for every other
    /// speed. Video keeps running at any non-zero speed, reverse included.
    pub fn set_speed(&mut self, new_speed: f32) -> Result<()> {
        if speed::is_zero(new_speed) {
            self.stop();
            return Ok(());
        }
        if !speed::in_range(new_speed) {
            return Err(Error::SpeedOutOfRange {
                speed: new_speed,
                min: speed::MIN_SPEED,
                max: speed::MAX_SPEED,
            });
        }
        debug!(stream = %self.stream, speed = new_speed, "setting playback speed");
        self.decoder.set_speed(new_speed);
        self.speed = new_speed;
        if speed::is_forward_1x(new_speed) && self.video.registry.is_running() {
            self.start_audio()?;
        } else {
            self.stop_audio();
        }
        Ok(())
    }

    /// Advance one video frame without starting the continuous pump.
    ///
    /// Video listeners are sent `on_started` so a single externally driven
    /// frame update is observable, then exactly one frame is pulled and
    /// fanned out (if the decoder has one ready).
    pub fn step_forward(&mut self) -> Result<()> {
        self.step(true)
    }

    /// Rewind one video frame without starting the continuous pump.
    pub fn step_backward(&mut self) -> Result<()> {
        self.step(false)
    }

    /// Jump to `time` seconds. The target must lie within the stream's
    /// time range.
    pub fn seek(&mut self, time: f64) -> Result<()> {
        if !self.open {
            return Err(Error::NotOpen);
        }
        let (start, end) = (self.decoder.start_time(), self.decoder.end_time());
        if !(start..=end).contains(&time) {
            return Err(Error::SeekOutOfRange { time, start, end });
        }
        self.decoder.seek(time)
    }

    /// Stop both lanes and release the decoder resource. Idempotent.
    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        info!(stream = %self.stream, "closing media source");
        self.stop();
        self.decoder.close();
        self.open = false;
    }

    /// Register an audio listener. If audio is already running it receives
    /// `on_opened`/`on_started` before this returns.
    pub fn add_audio_listener(&self, listener: Arc<dyn StreamListener>) {
        self.audio.registry.add(listener);
    }

    /// Register a video listener. If video is already running it receives
    /// `on_opened`/`on_started` before this returns.
    pub fn add_video_listener(&self, listener: Arc<dyn StreamListener>) {
        self.video.registry.add(listener);
    }

    /// Remove an audio listener; it receives no further notifications.
    pub fn remove_audio_listener(&self, listener: &Arc<dyn StreamListener>) {
        self.audio.registry.remove(listener);
    }

    /// Remove a video listener; it receives no further notifications.
    pub fn remove_video_listener(&self, listener: &Arc<dyn StreamListener>) {
        self.video.registry.remove(listener);
    }

    /// True while the video lane is running, matching the engine's notion
    /// of "playing".
    pub fn is_playing(&self) -> bool {
        self.video.registry.is_running()
    }

    /// Last non-zero speed applied.
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Snapshot of the video frame counters.
    pub fn frame_stats(&self) -> FrameStats {
        self.counters.snapshot()
    }

    /// Total stream duration in seconds, 0.0 when nothing is open.
    pub fn duration(&self) -> f64 {
        if self.open {
            self.decoder.duration()
        } else {
            0.0
        }
    }

    /// Current playback position in seconds.
    pub fn current_time(&self) -> f64 {
        if self.open {
            self.decoder.current_time()
        } else {
            0.0
        }
    }

    /// Receive one engine event without blocking.
    pub fn try_recv_event(&self) -> Option<StreamEvent> {
        self.event_rx.try_recv().ok()
    }

    /// The engine event channel, for callers that want to select on it.
    pub fn events(&self) -> &Receiver<StreamEvent> {
        &self.event_rx
    }

    fn step(&mut self, forward: bool) -> Result<()> {
        if !self.open {
            return Err(Error::NotOpen);
        }
        // Enables display without starting the video pump.
        self.video.registry.notify_started();
        if forward {
            self.decoder.step_forward();
        } else {
            self.decoder.step_backward();
        }
        pump::pump_video_frame_once(&*self.decoder, &self.video.registry, &self.counters)?;
        Ok(())
    }

    fn start_audio(&mut self) -> Result<()> {
        if !self.decoder.has_audio_stream() {
            return Ok(());
        }
        self.reap_dead_worker(MediaKind::Audio);
        if self.audio.registry.is_running() {
            return Ok(());
        }
        info!(stream = %self.stream, "starting audio pump");
        // Listeners hear `on_started` before the worker can fan out data.
        self.audio.registry.mark_started();
        let spawned = PumpWorker::spawn("kinema-audio-pump", {
            let stream = self.stream;
            let decoder = self.decoder.clone();
            let registry = self.audio.registry.clone();
            let events = self.event_tx.clone();
            move |stop| pump::run_audio_pump(stream, decoder, registry, events, stop)
        });
        match spawned {
            Ok(worker) => {
                self.audio.worker = Some(worker);
                Ok(())
            }
            Err(err) => {
                self.audio.registry.unmark_started();
                Err(err)
            }
        }
    }

    fn start_video(&mut self) -> Result<()> {
        if !self.decoder.has_video_stream() {
            return Ok(());
        }
        self.reap_dead_worker(MediaKind::Video);
        if self.video.registry.is_running() {
            return Ok(());
        }
        info!(stream = %self.stream, "starting video pump");
        self.video.registry.mark_started();
        let spawned = PumpWorker::spawn("kinema-video-pump", {
            let stream = self.stream;
            let decoder = self.decoder.clone();
            let registry = self.video.registry.clone();
            let counters = self.counters.clone();
            let events = self.event_tx.clone();
            move |stop| pump::run_video_pump(stream, decoder, registry, counters, events, stop)
        });
        match spawned {
            Ok(worker) => {
                self.video.worker = Some(worker);
                Ok(())
            }
            Err(err) => {
                self.video.registry.unmark_started();
                Err(err)
            }
        }
    }

    fn stop_audio(&mut self) {
        let was_running = self.audio.registry.clear_running();
        if let Some(worker) = self.audio.worker.take() {
            debug!(stream = %self.stream, "stopping audio pump");
            worker.stop(MediaKind::Audio, self.stream);
        }
        if was_running {
            self.audio.registry.notify_stopped();
            info!(stream = %self.stream, "stopped audio pump");
        }
    }

    fn stop_video(&mut self) {
        let was_running = self.video.registry.clear_running();
        if let Some(worker) = self.video.worker.take() {
            debug!(stream = %self.stream, "stopping video pump");
            worker.stop(MediaKind::Video, self.stream);
        }
        if was_running {
            self.video.registry.notify_stopped();
            info!(stream = %self.stream, "stopped video pump");
        }
    }

    /// Reap the worker handle of a lane that terminated on its own after a
    /// decoder failure; its running flag is already clear and listeners
    /// were already told `on_stopped`.
    fn reap_dead_worker(&mut self, kind: MediaKind) {
        let lane = match kind {
            MediaKind::Audio => &mut self.audio,
            MediaKind::Video => &mut self.video,
        };
        if !lane.registry.is_running() {
            if let Some(worker) = lane.worker.take() {
                worker.stop(kind, self.stream);
            }
        }
    }
}

impl Drop for StreamProvider {
    /// Engines never leak pump threads: dropping stops both lanes and
    /// releases the decoder.
    fn drop(&mut self) {
        self.close();
    }
}
