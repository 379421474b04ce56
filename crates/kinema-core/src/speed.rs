//! Playback speed helpers.
//!
//! Speed is a signed multiple of the native playback rate: zero means
//! stopped, positive plays forward, negative plays in reverse. Audio can
//! only follow at exactly forward 1x; video follows any non-zero speed.

/// Slowest supported reverse speed.
pub const MIN_SPEED: f32 = -16.0;

/// Fastest supported forward speed.
pub const MAX_SPEED: f32 = 16.0;

/// True if `speed` is numerically zero (stop request).
pub fn is_zero(speed: f32) -> bool {
    speed.abs() < f32::EPSILON
}

/// True if `speed` is exactly forward 1x, the only rate audio plays at.
pub fn is_forward_1x(speed: f32) -> bool {
    (speed - 1.0).abs() < f32::EPSILON
}

/// True if `speed` lies within the supported playback range.
pub fn in_range(speed: f32) -> bool {
    (MIN_SPEED..=MAX_SPEED).contains(&speed)
}
