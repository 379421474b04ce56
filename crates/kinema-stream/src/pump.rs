//! Pump workers: per-kind background threads that pull decoded data from
//! the decoder and fan it out to the registered listeners.
//!
//! Each worker owns one lane. It suspends only in the throttle wait when
//! the decoder has nothing to deliver, and that wait doubles as the stop
//! signal so cancellation is observed within one throttle interval.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use crate::counters::FrameCounters;
use crate::decoder::{AudioPull, MediaDecoder};
use crate::listener::ListenerRegistry;
use crate::provider::StreamEvent;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use kinema_core::{MediaKind, Result};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Sleep interval between polls when the decoder has no data.
pub(crate) const THROTTLE: Duration = Duration::from_millis(250);

/// How long `stop` waits for a worker to wind down before declaring it
/// stuck. Two throttle intervals covers one full sleep plus the loop check.
pub(crate) const JOIN_GRACE: Duration = Duration::from_millis(500);

/// Cancellation signal handed to a pump loop.
///
/// Backed by a channel rather than a bare flag so the throttle sleep is
/// interruptible: a stop request wakes the worker immediately instead of
/// letting it finish the sleep.
pub(crate) struct StopSignal {
    rx: Receiver<()>,
}

impl StopSignal {
    /// Non-blocking check, consumed at loop boundaries.
    fn is_set(&self) -> bool {
        match self.rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => true,
            Err(TryRecvError::Empty) => false,
        }
    }

    /// Sleep for one throttle interval, waking early on a stop request.
    /// Returns true if stop was requested.
    fn throttle(&self) -> bool {
        match self.rx.recv_timeout(THROTTLE) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => false,
        }
    }
}

/// Handle to a spawned pump worker: the thread itself plus the channels
/// used to cancel it and to observe its exit.
pub(crate) struct PumpWorker {
    handle: JoinHandle<()>,
    stop_tx: Sender<()>,
    exit_rx: Receiver<()>,
}

impl PumpWorker {
    /// Spawn a named worker running `body` until it returns or is stopped.
    pub(crate) fn spawn<F>(name: &str, body: F) -> Result<Self>
    where
        F: FnOnce(StopSignal) + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded(1);
        let (exit_tx, exit_rx) = bounded(0);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                // Moved in so the sender drops, and the exit channel
                // disconnects, exactly when the loop returns.
                let _exit_tx = exit_tx;
                body(StopSignal { rx: stop_rx });
            })?;
        Ok(Self {
            handle,
            stop_tx,
            exit_rx,
        })
    }

    /// Signal the worker to exit and wait for it, bounded by [`JOIN_GRACE`].
    ///
    /// Returns true if the worker terminated. A worker that misses the
    /// deadline is logged and detached rather than wedging shutdown; that
    /// indicates a decoder pull that never returned.
    pub(crate) fn stop(self, kind: MediaKind, stream: Uuid) -> bool {
        let _ = self.stop_tx.send(());
        match self.exit_rx.recv_timeout(JOIN_GRACE) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if self.handle.join().is_err() {
                    // Pump loops don't panic themselves; a payload here came
                    // through a poisoned decoder implementation.
                    error!(%stream, %kind, "pump worker terminated by panic");
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                error!(
                    %stream,
                    %kind,
                    grace_ms = JOIN_GRACE.as_millis() as u64,
                    "pump worker did not exit within grace period; detaching"
                );
                false
            }
        }
    }
}

/// Continuous audio pump: pull one chunk, fan it out, throttle on empty.
pub(crate) fn run_audio_pump(
    stream: Uuid,
    decoder: Arc<dyn MediaDecoder>,
    registry: Arc<ListenerRegistry>,
    events: Sender<StreamEvent>,
    stop: StopSignal,
) {
    // The chunk size is fixed for the lifetime of an opened source, so the
    // buffer is reused across pulls.
    let mut buffer = vec![0u8; decoder.audio_buffer_size()];
    debug!(%stream, "audio pump running");
    loop {
        if stop.is_set() {
            break;
        }
        match decoder.pull_audio(&mut buffer) {
            Ok(AudioPull::DataAvailable) => registry.fan_out_data(&buffer),
            Ok(AudioPull::NoData) => {
                if stop.throttle() {
                    break;
                }
            }
            Err(err) => {
                fail_lane(stream, MediaKind::Audio, &registry, &events, &err);
                break;
            }
        }
    }
    debug!(%stream, "audio pump exiting");
}

/// Continuous video pump: one frame per pass, throttle on empty.
pub(crate) fn run_video_pump(
    stream: Uuid,
    decoder: Arc<dyn MediaDecoder>,
    registry: Arc<ListenerRegistry>,
    counters: Arc<FrameCounters>,
    events: Sender<StreamEvent>,
    stop: StopSignal,
) {
    debug!(%stream, "video pump running");
    loop {
        if stop.is_set() {
            break;
        }
        match pump_video_frame_once(&*decoder, &registry, &counters) {
            Ok(true) => {}
            Ok(false) => {
                if stop.throttle() {
                    break;
                }
            }
            Err(err) => {
                fail_lane(stream, MediaKind::Video, &registry, &events, &err);
                break;
            }
        }
    }
    debug!(%stream, "video pump exiting");
}

/// One video pump pass, shared between the continuous pump and stepping.
///
/// Returns `Ok(true)` if a frame was fanned out, `Ok(false)` if none was
/// available. A pull that consumed `n` frames counts `n` read and `n - 1`
/// dropped; only the newest frame reaches listeners.
pub(crate) fn pump_video_frame_once(
    decoder: &dyn MediaDecoder,
    registry: &ListenerRegistry,
    counters: &FrameCounters,
) -> Result<bool> {
    // Allocated fresh each pass: the view rectangle can be resized between
    // frames, which changes the frame byte length.
    let mut buffer = vec![0u8; decoder.view_size().byte_len()];
    let consumed = decoder.pull_video_frame(&mut buffer)?;
    if consumed == 0 {
        return Ok(false);
    }
    counters.record(consumed);
    registry.fan_out_data(&buffer);
    Ok(true)
}

/// A decoder failure terminates the owning pump. The lane is halted (flag
/// cleared, listeners told `on_stopped`) and the failure is reported to the
/// controlling thread on the event channel, never swallowed.
fn fail_lane(
    stream: Uuid,
    kind: MediaKind,
    registry: &ListenerRegistry,
    events: &Sender<StreamEvent>,
    err: &kinema_core::Error,
) {
    warn!(%stream, %kind, error = %err, "decoder failure; terminating pump");
    registry.halt();
    let _ = events.send(StreamEvent::DecodeFailed {
        kind,
        message: err.to_string(),
    });
}
