//! Frame-rate throttling.
//!
//! The sensor delivers frames far faster than OCR can consume them, so the
//! pipeline only samples one frame out of every configured interval. The
//! counter is atomic because the capture thread drives it through a shared
//! pipeline handle.

use crate::capture::ConfigError;
use std::sync::atomic::{AtomicU64, Ordering};

/// Releases one frame out of every `interval`, dropping the rest.
#[derive(Debug)]
pub struct FrameThrottle {
    /// Frames seen since the last sampled frame.
    counter: AtomicU64,
    /// Configured sampling interval.
    interval: u32,
    /// Total frames offered (diagnostics).
    total_seen: AtomicU64,
    /// Total frames sampled (diagnostics).
    total_sampled: AtomicU64,
}

impl FrameThrottle {
    /// Creates a throttle sampling every `interval` frames.
    ///
    /// A zero interval is a configuration error, rejected rather than
    /// clamped.
    pub fn new(interval: u32) -> Result<Self, ConfigError> {
        if interval == 0 {
            return Err(ConfigError::InvalidSampleInterval);
        }
        Ok(Self {
            counter: AtomicU64::new(0),
            interval,
            total_seen: AtomicU64::new(0),
            total_sampled: AtomicU64::new(0),
        })
    }

    /// Returns the configured interval.
    pub fn interval(&self) -> u32 {
        self.interval
    }

    /// Counts one incoming frame; returns true when it should be sampled.
    ///
    /// Returns true exactly when the counter has reached the interval, in
    /// which case the counter resets; either way the current frame is
    /// counted toward the next interval, so a sample occurs once every
    /// `interval` frames after the first.
    pub fn should_sample(&self) -> bool {
        self.total_seen.fetch_add(1, Ordering::Relaxed);

        let interval = self.interval as u64;
        let previous = self
            .counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                if count >= interval {
                    Some(1)
                } else {
                    Some(count + 1)
                }
            })
            // fetch_update with a Some-returning closure cannot fail.
            .unwrap_or(0);

        let sampled = previous >= interval;
        if sampled {
            self.total_sampled.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(
                interval = self.interval,
                total = self.total_seen.load(Ordering::Relaxed),
                "frame sampled"
            );
        }
        sampled
    }

    /// Total frames offered so far.
    pub fn total_seen(&self) -> u64 {
        self.total_seen.load(Ordering::Relaxed)
    }

    /// Total frames sampled so far.
    pub fn total_sampled(&self) -> u64 {
        self.total_sampled.load(Ordering::Relaxed)
    }
}
