//! Master record sink
//!
//! The engine writes the master output into an [`RtRecordSink`] at the end
//! of every block. The sink's RT side must never allocate or block; a
//! refused block (`false`) is back-pressure telemetry, not an error.
//!
//! [`RecorderSink`] is the standard implementation: one pre-allocated SPSC
//! sample ring per channel, drained by a non-RT writer thread. File
//! containers live behind that writer, outside this crate.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use lf_core::Sample;
use lf_rt::SampleRing;

/// RT-side recording contract, called from the audio thread.
pub trait RtRecordSink: Send + Sync {
    /// Write one block of non-interleaved channels `[channel][frame]`.
    /// Returns `false` when the internal ring is full (frame drop allowed).
    fn write_block(&self, channels: &[&[Sample]], frames: usize) -> bool;

    /// Locator/bar mark; plain event, no file format implications.
    fn mark(&self, _code: u32) {}
}

/// Ring-buffered record sink with off-RT drain and drop accounting.
pub struct RecorderSink {
    rings: Vec<SampleRing>,
    frames_written: AtomicU64,
    dropped_blocks: AtomicU64,
    marks: AtomicU64,
    last_mark: AtomicU32,
}

impl RecorderSink {
    /// `capacity_frames` is rounded up per channel to a power of two.
    pub fn new(channels: usize, capacity_frames: usize) -> Self {
        let channels = channels.max(1);
        Self {
            rings: (0..channels).map(|_| SampleRing::new(capacity_frames)).collect(),
            frames_written: AtomicU64::new(0),
            dropped_blocks: AtomicU64::new(0),
            marks: AtomicU64::new(0),
            last_mark: AtomicU32::new(0),
        }
    }

    pub fn channels(&self) -> usize {
        self.rings.len()
    }

    /// Drain recorded samples for channel `ch` (non-RT writer thread).
    /// Returns the number of samples copied.
    pub fn read_channel(&self, ch: usize, out: &mut [Sample]) -> usize {
        match self.rings.get(ch) {
            Some(ring) => ring.pop(out),
            None => 0,
        }
    }

    /// Frames accepted so far (per channel).
    pub fn total_frames_written(&self) -> u64 {
        self.frames_written.load(Ordering::Relaxed)
    }

    /// Blocks refused because a channel ring was full.
    pub fn dropped_blocks(&self) -> u64 {
        self.dropped_blocks.load(Ordering::Relaxed)
    }

    pub fn mark_count(&self) -> u64 {
        self.marks.load(Ordering::Relaxed)
    }

    pub fn last_mark(&self) -> u32 {
        self.last_mark.load(Ordering::Relaxed)
    }
}

impl RtRecordSink for RecorderSink {
    fn write_block(&self, channels: &[&[Sample]], frames: usize) -> bool {
        // All-or-nothing admission: a block is either fully queued on every
        // channel or refused, so channels never drift apart.
        for ring in &self.rings {
            if ring.available_write() < frames {
                self.dropped_blocks.fetch_add(1, Ordering::Relaxed);
                return false;
            }
        }

        for (ring, ch) in self.rings.iter().zip(channels.iter()) {
            let n = frames.min(ch.len());
            ring.push(&ch[..n]);
        }
        // A mono source feeding a stereo sink keeps lock-step by duplicating
        // the last provided channel.
        if channels.len() < self.rings.len() {
            if let Some(last) = channels.last() {
                for ring in &self.rings[channels.len()..] {
                    ring.push(&last[..frames.min(last.len())]);
                }
            }
        }

        self.frames_written.fetch_add(frames as u64, Ordering::Relaxed);
        true
    }

    fn mark(&self, code: u32) {
        self.marks.fetch_add(1, Ordering::Relaxed);
        self.last_mark.store(code, Ordering::Relaxed);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
