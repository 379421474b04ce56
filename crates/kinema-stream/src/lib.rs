//! # kinema-stream
//!
//! Synchronized audio/video playback engine for kinema.
//!
//! A [`StreamProvider`] pulls decoded chunks from a [`MediaDecoder`] on two
//! background pump threads (one per media kind) and fans them out to any
//! number of registered [`StreamListener`]s, throttling when the decoder is
//! starved and intentionally dropping intermediate video frames to hold
//! wall-clock synchronization at fast playback speeds.

pub mod counters;
pub mod decoder;
pub mod listener;
pub mod provider;

mod pump;

#[cfg(test)]
pub(crate) mod testing;

pub use counters::FrameCounters;
pub use decoder::{AudioPull, MediaDecoder};
pub use listener::{ListenerRegistry, StreamListener};
pub use provider::{StreamEvent, StreamProvider};
