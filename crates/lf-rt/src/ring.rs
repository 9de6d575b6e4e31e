//! Lock-Free Ring Buffers for Audio Communication
//!
//! Provides thread-safe, lock-free data transfer between:
//! - Control thread → Audio thread (commands)
//! - Audio thread → Drain thread (recorded samples)
//!
//! Both rings are single-producer/single-consumer: two monotonically
//! increasing indices, masked to a power-of-two capacity, paired with
//! acquire/release ordering. Indices live on separate cache lines.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use lf_core::{RtCommand, Sample};

/// Index counter padded onto its own cache line to avoid false sharing
/// between producer and consumer.
#[repr(align(64))]
#[derive(Debug, Default)]
struct PaddedIndex(AtomicUsize);

fn normalize_capacity(requested: usize) -> usize {
    requested.max(2).next_power_of_two()
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMAND RING (SPSC, control → RT)
// ═══════════════════════════════════════════════════════════════════════════════

/// Bounded SPSC FIFO of [`RtCommand`] records.
///
/// Capacity is rounded up to a power of two (minimum 2); usable slots are
/// `capacity - 1` (classic one-slot-empty SPSC). A failed push latches the
/// overflow flag until [`CommandRing::overflow_flag_and_reset`] or
/// [`CommandRing::clear`].
///
/// # Contract
///
/// Strictly single-producer/single-consumer. Concurrent pushes from more
/// than one thread are undefined; funnel multiple command sources through
/// one enqueuer. Debug builds assert the single-producer rule.
pub struct CommandRing {
    write_pos: PaddedIndex,
    read_pos: PaddedIndex,
    overflow: AtomicBool,
    #[cfg(debug_assertions)]
    push_active: AtomicBool,
    capacity: usize,
    mask: usize,
    buffer: Box<[UnsafeCell<RtCommand>]>,
}

// SAFETY: slot (i & mask) is written only by the producer while unpublished
// (write_pos not yet advanced past it) and read only by the consumer after
// the release-store of write_pos; the index pair is atomic.
unsafe impl Send for CommandRing {}
unsafe impl Sync for CommandRing {}

impl CommandRing {
    /// Create a ring with at least `min_capacity` slots (rounded up to a
    /// power of two, minimum 2).
    pub fn new(min_capacity: usize) -> Self {
        let capacity = normalize_capacity(min_capacity);
        let buffer = (0..capacity)
            .map(|_| UnsafeCell::new(RtCommand::default()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            write_pos: PaddedIndex::default(),
            read_pos: PaddedIndex::default(),
            overflow: AtomicBool::new(false),
            #[cfg(debug_assertions)]
            push_active: AtomicBool::new(false),
            capacity,
            mask: capacity - 1,
            buffer,
        }
    }

    /// Push a command (single control thread).
    ///
    /// Returns `false` and latches the overflow flag when full. Never
    /// allocates or blocks.
    pub fn push(&self, cmd: RtCommand) -> bool {
        #[cfg(debug_assertions)]
        {
            let was_active = self.push_active.swap(true, Ordering::Acquire);
            debug_assert!(!was_active, "CommandRing::push is single-producer");
        }

        let w = self.write_pos.0.load(Ordering::Relaxed);
        let r = self.read_pos.0.load(Ordering::Acquire);

        let ok = if w.wrapping_sub(r) >= self.capacity - 1 {
            self.overflow.store(true, Ordering::Relaxed);
            false
        } else {
            // SAFETY: slot w & mask is unpublished; we are the only producer.
            unsafe {
                self.buffer[w & self.mask].get().write(cmd);
            }
            self.write_pos.0.store(w.wrapping_add(1), Ordering::Release);
            true
        };

        #[cfg(debug_assertions)]
        self.push_active.store(false, Ordering::Release);

        ok
    }

    /// Pop the oldest command (RT thread). Returns `None` when empty.
    pub fn pop(&self) -> Option<RtCommand> {
        let r = self.read_pos.0.load(Ordering::Relaxed);
        let w = self.write_pos.0.load(Ordering::Acquire);

        if r == w {
            return None;
        }

        // SAFETY: slot r & mask was published by the release-store of
        // write_pos; we are the only consumer.
        let cmd = unsafe { *self.buffer[r & self.mask].get() };
        self.read_pos.0.store(r.wrapping_add(1), Ordering::Release);
        Some(cmd)
    }

    /// Instantly drain the ring and clear the overflow flag.
    ///
    /// Defined only while no producer is active.
    pub fn clear(&self) {
        let w = self.write_pos.0.load(Ordering::Acquire);
        self.read_pos.0.store(w, Ordering::Release);
        self.overflow.store(false, Ordering::Relaxed);
    }

    /// Number of queued commands (0 ..= capacity - 1).
    pub fn len(&self) -> usize {
        let w = self.write_pos.0.load(Ordering::Acquire);
        let r = self.read_pos.0.load(Ordering::Acquire);
        w.wrapping_sub(r)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Telemetry: returns `true` exactly once after each overflow event.
    pub fn overflow_flag_and_reset(&self) -> bool {
        self.overflow.swap(false, Ordering::Relaxed)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SAMPLE RING (SPSC, audio → drain thread)
// ═══════════════════════════════════════════════════════════════════════════════

/// SPSC ring buffer of audio samples with partial-write semantics.
///
/// Wait-free for both sides; used by the recorder sink to hand blocks from
/// the audio thread to a drain thread.
#[repr(align(64))]
pub struct SampleRing {
    buffer: Box<[UnsafeCell<Sample>]>,
    capacity: usize,
    mask: usize,
    write_pos: PaddedIndex,
    read_pos: PaddedIndex,
}

// SAFETY: same publication discipline as CommandRing.
unsafe impl Send for SampleRing {}
unsafe impl Sync for SampleRing {}

impl SampleRing {
    pub fn new(min_capacity: usize) -> Self {
        let capacity = normalize_capacity(min_capacity);
        let buffer = (0..capacity)
            .map(|_| UnsafeCell::new(0.0))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            buffer,
            capacity,
            mask: capacity - 1,
            write_pos: PaddedIndex::default(),
            read_pos: PaddedIndex::default(),
        }
    }

    /// Free space for writing.
    #[inline]
    pub fn available_write(&self) -> usize {
        let w = self.write_pos.0.load(Ordering::Relaxed);
        let r = self.read_pos.0.load(Ordering::Acquire);
        self.capacity - w.wrapping_sub(r)
    }

    /// Samples available for reading.
    #[inline]
    pub fn available_read(&self) -> usize {
        let w = self.write_pos.0.load(Ordering::Acquire);
        let r = self.read_pos.0.load(Ordering::Relaxed);
        w.wrapping_sub(r)
    }

    /// Push samples (producer side). Returns the number actually written.
    pub fn push(&self, samples: &[Sample]) -> usize {
        let available = self.available_write();
        let to_write = samples.len().min(available);
        if to_write == 0 {
            return 0;
        }

        let w = self.write_pos.0.load(Ordering::Relaxed);
        for (i, &sample) in samples[..to_write].iter().enumerate() {
            let idx = w.wrapping_add(i) & self.mask;
            // SAFETY: slots [w, w + to_write) are unpublished; single producer.
            unsafe {
                self.buffer[idx].get().write(sample);
            }
        }
        self.write_pos
            .0
            .store(w.wrapping_add(to_write), Ordering::Release);
        to_write
    }

    /// Pop samples (consumer side). Returns the number actually read.
    pub fn pop(&self, output: &mut [Sample]) -> usize {
        let available = self.available_read();
        let to_read = output.len().min(available);
        if to_read == 0 {
            return 0;
        }

        let r = self.read_pos.0.load(Ordering::Relaxed);
        for (i, sample) in output[..to_read].iter_mut().enumerate() {
            let idx = r.wrapping_add(i) & self.mask;
            // SAFETY: published by the producer's release-store; single consumer.
            *sample = unsafe { *self.buffer[idx].get() };
        }
        self.read_pos
            .0
            .store(r.wrapping_add(to_read), Ordering::Release);
        to_read
    }

    pub fn clear(&self) {
        let w = self.write_pos.0.load(Ordering::Acquire);
        self.read_pos.0.store(w, Ordering::Release);
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use lf_core::CmdId;

    fn make_cmd(id: u16, track: i16, slot: i16, index: u16, value: f32) -> RtCommand {
        RtCommand {
            id,
            track,
            slot,
            index,
            value,
            aux: 0,
        }
    }

    #[test]
    fn test_basic_push_pop() {
        let q = CommandRing::new(8);
        assert!(q.capacity() >= 8);
        assert_eq!(q.len(), 0);

        let cmd = make_cmd(1, 2, 3, 4, 0.5);
        assert!(q.push(cmd));
        assert_eq!(q.len(), 1);

        let out = q.pop().unwrap();
        assert_eq!(q.len(), 0);
        assert_eq!(out, cmd);
    }

    #[test]
    fn test_pop_on_empty() {
        let q = CommandRing::new(4);
        assert!(q.pop().is_none());
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn test_fill_and_overflow_flag() {
        let q = CommandRing::new(8);
        let usable = q.capacity() - 1;

        for i in 0..usable {
            assert!(q.push(make_cmd(i as u16, 0, 0, 0, 0.0)));
        }
        assert_eq!(q.len(), usable);

        // The next push must refuse and latch the overflow flag.
        assert!(!q.push(make_cmd(999, 0, 0, 0, 0.0)));
        assert!(q.overflow_flag_and_reset());
        assert!(!q.overflow_flag_and_reset());

        let mut popped = 0;
        while q.pop().is_some() {
            popped += 1;
        }
        assert_eq!(popped, usable);
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn test_popped_equals_pushed() {
        let q = CommandRing::new(16);
        let cmds: Vec<RtCommand> = (0..5)
            .map(|i| make_cmd(i as u16, i as i16, -1, i as u16 * 2, i as f32 * 0.1))
            .collect();
        for &c in &cmds {
            assert!(q.push(c));
        }
        for &c in &cmds {
            assert_eq!(q.pop().unwrap(), c);
        }
    }

    #[test]
    fn test_clear_resets_overflow() {
        let q = CommandRing::new(8);
        let usable = q.capacity() - 1;
        for _ in 0..usable {
            assert!(q.push(make_cmd(1, 0, 0, 0, 0.0)));
        }
        assert!(!q.push(make_cmd(2, 0, 0, 0, 0.0)));
        q.clear();
        assert_eq!(q.len(), 0);
        assert!(!q.overflow_flag_and_reset());
        assert!(q.pop().is_none());
    }

    #[test]
    fn test_size_tracks_push_pop() {
        let q = CommandRing::new(16);
        for i in 0..5 {
            assert!(q.push(make_cmd(i, 0, 0, 0, 0.0)));
        }
        assert_eq!(q.len(), 5);
        q.pop();
        assert_eq!(q.len(), 4);
        for i in 0..3 {
            assert!(q.push(make_cmd(100 + i, 0, 0, 0, 0.0)));
        }
        assert_eq!(q.len(), 7);
        while q.pop().is_some() {}
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn test_capacity_normalized_to_power_of_two() {
        let q = CommandRing::new(7);
        assert!(q.capacity().is_power_of_two());
        assert!(q.capacity() >= 7);

        assert_eq!(CommandRing::new(1024).capacity(), 1024);
        assert_eq!(CommandRing::new(0).capacity(), 2);
        assert_eq!(CommandRing::new(1).capacity(), 2);
    }

    #[test]
    fn test_spsc_fifo_stress() {
        use std::sync::atomic::AtomicBool;
        use std::sync::Arc;

        // Deliberately more than 65536 items so u16 ids wrap around.
        const N: usize = 100_000;
        let q = Arc::new(CommandRing::new(1 << 12));
        let start = Arc::new(AtomicBool::new(false));

        let producer = {
            let q = Arc::clone(&q);
            let start = Arc::clone(&start);
            std::thread::spawn(move || {
                while !start.load(Ordering::Acquire) {}
                for i in 0..N {
                    let c = make_cmd((i & 0xFFFF) as u16, 0, 0, 0, 0.0);
                    while !q.push(c) {
                        std::hint::spin_loop();
                    }
                }
            })
        };

        let consumer = {
            let q = Arc::clone(&q);
            let start = Arc::clone(&start);
            std::thread::spawn(move || {
                while !start.load(Ordering::Acquire) {}
                let mut expected: u16 = 0;
                let mut consumed = 0;
                while consumed < N {
                    if let Some(c) = q.pop() {
                        assert_eq!(c.id, expected);
                        expected = expected.wrapping_add(1);
                        consumed += 1;
                    } else {
                        std::hint::spin_loop();
                    }
                }
            })
        };

        start.store(true, Ordering::Release);
        producer.join().unwrap();
        consumer.join().unwrap();

        // The producer may have hit a full ring; that is telemetry, not data loss.
        let _ = q.overflow_flag_and_reset();
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn test_cmd_id_survives_ring() {
        let q = CommandRing::new(4);
        assert!(q.push(RtCommand::param_set(0, 1, 3, 0.75)));
        let out = q.pop().unwrap();
        assert_eq!(CmdId::from_raw(out.id), CmdId::ParamSet);
        assert_eq!(out.index, 3);
    }

    #[test]
    fn test_sample_ring_basic() {
        let ring = SampleRing::new(1024);
        assert_eq!(ring.capacity(), 1024);

        let samples = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(ring.push(&samples), 4);
        assert_eq!(ring.available_read(), 4);

        let mut out = [0.0; 4];
        assert_eq!(ring.pop(&mut out), 4);
        assert_eq!(out, samples);
    }

    #[test]
    fn test_sample_ring_wrap() {
        let ring = SampleRing::new(8);
        let first: Vec<Sample> = (0..8).map(|i| i as Sample).collect();
        ring.push(&first);

        let mut out = [0.0; 4];
        ring.pop(&mut out);

        let more = [10.0, 11.0, 12.0, 13.0];
        assert_eq!(ring.push(&more), 4);

        let mut all = [0.0; 8];
        assert_eq!(ring.pop(&mut all), 8);
        assert_eq!(&all[..4], &[4.0, 5.0, 6.0, 7.0]);
        assert_eq!(&all[4..], &[10.0, 11.0, 12.0, 13.0]);
    }

    #[test]
    fn test_sample_ring_partial_write_when_full() {
        let ring = SampleRing::new(4);
        let samples = [1.0; 6];
        // Only capacity samples fit.
        assert_eq!(ring.push(&samples), 4);
        assert_eq!(ring.push(&samples), 0);
        ring.clear();
        assert_eq!(ring.available_read(), 0);
        assert_eq!(ring.push(&samples[..2]), 2);
    }
}
