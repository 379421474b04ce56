//! Listener contract and the per-kind listener registry.

use crate::provider::StreamEvent;
use crossbeam_channel::Sender;
use kinema_core::MediaKind;
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, trace};
use uuid::Uuid;

/// A passive sink for one kind of decoded stream data.
///
/// Lifecycle notifications arrive in a fixed order for every listener:
/// `on_opened`, then `on_started`, then zero or more `on_data`, then
/// `on_stopped`. A listener added while its kind is already running receives
/// a synthetic `on_opened`/`on_started` pair before any data.
pub trait StreamListener: Send + Sync {
    /// The stream this listener is registered for became available.
    fn on_opened(&self);

    /// Pumping of this listener's kind began.
    fn on_started(&self);

    /// One unit of decoded payload: an audio chunk or a single video frame.
    fn on_data(&self, data: &[u8]);

    /// Pumping of this listener's kind ended.
    fn on_stopped(&self);
}

/// Lifecycle phase of a notification, for dispatch and fault logs.
#[derive(Debug, Clone, Copy)]
enum Phase {
    Opened,
    Started,
    Stopped,
}

impl Phase {
    const fn label(self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::Started => "started",
            Self::Stopped => "stopped",
        }
    }
}

struct Inner {
    /// Insertion-ordered set of registered listeners.
    listeners: Vec<Arc<dyn StreamListener>>,
    /// Whether this kind's pump is currently running.
    running: bool,
}

/// Thread-safe, insertion-ordered collection of listeners for one kind.
///
/// A single mutex guards both the listener list and the kind's running flag,
/// so fan-out iteration, add/remove, and the running transitions that gate
/// synthetic notifications are all mutually exclusive. A listener added
/// mid-fan-out becomes visible from the next pass.
pub struct ListenerRegistry {
    kind: MediaKind,
    stream: Uuid,
    events: Sender<StreamEvent>,
    inner: Mutex<Inner>,
}

impl ListenerRegistry {
    pub fn new(kind: MediaKind, stream: Uuid, events: Sender<StreamEvent>) -> Self {
        Self {
            kind,
            stream,
            events,
            inner: Mutex::new(Inner {
                listeners: Vec::new(),
                running: false,
            }),
        }
    }

    /// Append a listener. If this kind is already running, the listener is
    /// sent `on_opened` then `on_started` before this call returns, under
    /// the same lock used for fan-out, so no data event can race ahead of
    /// the synthetic pair.
    pub fn add(&self, listener: Arc<dyn StreamListener>) {
        let mut inner = self.inner.lock();
        if inner.running {
            self.deliver(&listener, Phase::Opened);
            self.deliver(&listener, Phase::Started);
        }
        inner.listeners.push(listener);
    }

    /// Remove a listener by identity. No further notifications reach it.
    pub fn remove(&self, listener: &Arc<dyn StreamListener>) {
        let mut inner = self.inner.lock();
        inner.listeners.retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this kind's pump is currently running.
    pub fn is_running(&self) -> bool {
        self.inner.lock().running
    }

    /// Clear the running flag, returning its previous value.
    pub(crate) fn clear_running(&self) -> bool {
        let mut inner = self.inner.lock();
        std::mem::replace(&mut inner.running, false)
    }

    /// Set the running flag and notify `on_started` in one critical section,
    /// so listeners added concurrently observe either the synthetic pair or
    /// this fan-out, never both and never neither.
    pub(crate) fn mark_started(&self) {
        let mut inner = self.inner.lock();
        inner.running = true;
        self.fan_out(&inner.listeners, Phase::Started);
    }

    /// Roll back a `mark_started` whose worker failed to spawn.
    pub(crate) fn unmark_started(&self) {
        let mut inner = self.inner.lock();
        inner.running = false;
        self.fan_out(&inner.listeners, Phase::Stopped);
    }

    /// Notify all listeners the stream became available.
    pub(crate) fn notify_opened(&self) {
        let inner = self.inner.lock();
        self.fan_out(&inner.listeners, Phase::Opened);
    }

    /// Notify all listeners that pumping began, without touching the running
    /// flag. Used by single-stepping, which feeds frames to listeners
    /// outside a continuous pump.
    pub(crate) fn notify_started(&self) {
        let inner = self.inner.lock();
        self.fan_out(&inner.listeners, Phase::Started);
    }

    /// Notify all listeners that pumping ended.
    pub(crate) fn notify_stopped(&self) {
        let inner = self.inner.lock();
        self.fan_out(&inner.listeners, Phase::Stopped);
    }

    /// Deliver one payload to every listener in insertion order.
    pub(crate) fn fan_out_data(&self, data: &[u8]) {
        let inner = self.inner.lock();
        trace!(stream = %self.stream, kind = %self.kind, len = data.len(), "fan-out data");
        for listener in &inner.listeners {
            self.deliver_data(listener, data);
        }
    }

    /// Clear the running flag and notify `on_stopped`, from a pump worker
    /// that is terminating on its own after a decoder failure.
    pub(crate) fn halt(&self) {
        let mut inner = self.inner.lock();
        if std::mem::replace(&mut inner.running, false) {
            self.fan_out(&inner.listeners, Phase::Stopped);
        }
    }

    fn fan_out(&self, listeners: &[Arc<dyn StreamListener>], phase: Phase) {
        for listener in listeners {
            self.deliver(listener, phase);
        }
    }

    /// One lifecycle notification, isolated: a panicking listener is
    /// reported and skipped, delivery continues with the next listener.
    fn deliver(&self, listener: &Arc<dyn StreamListener>, phase: Phase) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| match phase {
            Phase::Opened => listener.on_opened(),
            Phase::Started => listener.on_started(),
            Phase::Stopped => listener.on_stopped(),
        }));
        if let Err(payload) = outcome {
            self.report_fault(phase.label(), &payload);
        }
    }

    fn deliver_data(&self, listener: &Arc<dyn StreamListener>, data: &[u8]) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener.on_data(data)));
        if let Err(payload) = outcome {
            self.report_fault("data", &payload);
        }
    }

    fn report_fault(&self, phase: &'static str, payload: &(dyn std::any::Any + Send)) {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            stream = %self.stream,
            kind = %self.kind,
            phase,
            message,
            "listener panicked during notification"
        );
        let _ = self.events.send(StreamEvent::ListenerFault { kind: self.kind });
    }
}
