//! # kinema-core
//!
//! Core types and error handling for the kinema media playback engine.

pub mod error;
pub mod media;
pub mod speed;

pub use error::{Error, Result};
pub use media::{
    AudioRequest, ChannelLayout, ColorSpace, DecoderConfig, FrameStats, MediaKind, ViewSize,
};
