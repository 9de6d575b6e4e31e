//! RT telemetry counters
//!
//! The RT path never raises recoverable errors; every failure condition
//! lands in one of these relaxed atomic counters and is read off-RT.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free failure counters, shared between the engine and off-RT readers.
#[derive(Debug, Default)]
pub struct EngineTelemetry {
    ring_overflows: AtomicU64,
    page_overflows: AtomicU64,
    sink_backpressure: AtomicU64,
    unknown_commands: AtomicU64,
    bad_track_index: AtomicU64,
}

impl EngineTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn count_ring_overflow(&self) {
        self.ring_overflows.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn count_page_overflow(&self) {
        self.page_overflows.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn count_sink_backpressure(&self) {
        self.sink_backpressure.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn count_unknown_command(&self) {
        self.unknown_commands.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn count_bad_track_index(&self) {
        self.bad_track_index.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ring_overflows(&self) -> u64 {
        self.ring_overflows.load(Ordering::Relaxed)
    }

    pub fn page_overflows(&self) -> u64 {
        self.page_overflows.load(Ordering::Relaxed)
    }

    pub fn sink_backpressure(&self) -> u64 {
        self.sink_backpressure.load(Ordering::Relaxed)
    }

    pub fn unknown_commands(&self) -> u64 {
        self.unknown_commands.load(Ordering::Relaxed)
    }

    pub fn bad_track_index(&self) -> u64 {
        self.bad_track_index.load(Ordering::Relaxed)
    }

    /// Consistent-enough copy for logs and the service bus.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            ring_overflows: self.ring_overflows(),
            page_overflows: self.page_overflows(),
            sink_backpressure: self.sink_backpressure(),
            unknown_commands: self.unknown_commands(),
            bad_track_index: self.bad_track_index(),
        }
    }
}

/// Plain copy of the counters at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub ring_overflows: u64,
    pub page_overflows: u64,
    pub sink_backpressure: u64,
    pub unknown_commands: u64,
    pub bad_track_index: u64,
}
