//! Transport Bridge
//!
//! Double-buffered musical-time state: control threads stage tempo,
//! signature, quantize, and swing through per-field atomics guarded by a
//! generation counter; the RT prologue republishes the staging copy into
//! the RT-visible snapshot once per block. The sample clock is RT-owned and
//! advances monotonically.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};

use lf_core::{TimeSig, DEFAULT_PPQ, MAX_TEMPO, MIN_TEMPO};

/// Quantize granularity for transport-sensitive commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum QuantizeMode {
    /// Execute immediately
    #[default]
    None = 0,
    /// Execute on the next beat boundary
    Beat = 1,
    /// Execute on the next bar boundary
    Bar = 2,
}

impl QuantizeMode {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Beat,
            2 => Self::Bar,
            _ => Self::None,
        }
    }
}

/// RT-only transport snapshot, valid until the next `swap_buffers`.
///
/// `sample_time` is RT-owned: it advances only through
/// [`TransportBridge::advance_sample_time`] and never decreases. All other
/// fields are control-owned and published at the block prologue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportSnapshot {
    pub playing: bool,
    pub sig: TimeSig,
    pub ppq: u16,
    pub bpm: f32,
    pub quantize: QuantizeMode,
    pub swing: f32,
    pub sample_time: u64,
}

impl Default for TransportSnapshot {
    fn default() -> Self {
        Self {
            playing: false,
            sig: TimeSig::default(),
            ppq: DEFAULT_PPQ,
            bpm: 120.0,
            quantize: QuantizeMode::None,
            swing: 0.0,
            sample_time: 0,
        }
    }
}

/// Control → RT transport publisher plus RT-owned sample clock.
///
/// Control setters are lock-free and may race with each other; each field
/// resolves last-write-wins. The RT side sees a consistent republish once
/// per block.
pub struct TransportBridge {
    // Control-side staging, one atomic per field.
    playing: AtomicBool,
    /// num << 16 | den
    sig: AtomicU32,
    /// f32 bits
    bpm: AtomicU32,
    quantize: AtomicU8,
    /// f32 bits
    swing: AtomicU32,
    /// Bumped on every control write; RT republishes when it moves.
    generation: AtomicU64,

    // RT-side state; only the audio thread touches these.
    snapshot: UnsafeCell<TransportSnapshot>,
    seen_generation: UnsafeCell<u64>,
}

// SAFETY: `snapshot` and `seen_generation` are accessed only from the RT
// thread (swap_buffers / advance_sample_time / rt); everything else is
// atomic.
unsafe impl Send for TransportBridge {}
unsafe impl Sync for TransportBridge {}

impl TransportBridge {
    pub fn new() -> Self {
        let snap = TransportSnapshot::default();
        Self {
            playing: AtomicBool::new(snap.playing),
            sig: AtomicU32::new(pack_sig(snap.sig)),
            bpm: AtomicU32::new(snap.bpm.to_bits()),
            quantize: AtomicU8::new(snap.quantize as u8),
            swing: AtomicU32::new(snap.swing.to_bits()),
            generation: AtomicU64::new(0),
            snapshot: UnsafeCell::new(snap),
            seen_generation: UnsafeCell::new(0),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // CONTROL SIDE (lock-free, never blocks)
    // ═══════════════════════════════════════════════════════════════════════

    pub fn set_playing(&self, on: bool) {
        self.playing.store(on, Ordering::Release);
        self.bump();
    }

    /// Tempo in BPM, clamped to [20, 400].
    pub fn set_tempo(&self, bpm: f32) {
        let bpm = bpm.clamp(MIN_TEMPO, MAX_TEMPO);
        self.bpm.store(bpm.to_bits(), Ordering::Release);
        self.bump();
    }

    pub fn set_time_signature(&self, num: u16, den: u16) {
        self.sig
            .store(pack_sig(TimeSig::new(num, den)), Ordering::Release);
        self.bump();
    }

    pub fn set_quantize(&self, q: QuantizeMode) {
        self.quantize.store(q as u8, Ordering::Release);
        self.bump();
    }

    /// Swing amount, clamped to [0, 1].
    pub fn set_swing(&self, swing: f32) {
        self.swing
            .store(swing.clamp(0.0, 1.0).to_bits(), Ordering::Release);
        self.bump();
    }

    #[inline]
    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::Release);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // RT SIDE (audio thread only)
    // ═══════════════════════════════════════════════════════════════════════

    /// Republish the staged control fields into the RT snapshot. Called
    /// strictly once at the block prologue.
    pub fn swap_buffers(&self) {
        let gen = self.generation.load(Ordering::Acquire);
        // SAFETY: RT-thread-exclusive state, see struct invariant.
        let seen = unsafe { &mut *self.seen_generation.get() };
        if *seen == gen {
            return;
        }
        *seen = gen;

        let snap = unsafe { &mut *self.snapshot.get() };
        snap.playing = self.playing.load(Ordering::Acquire);
        snap.sig = unpack_sig(self.sig.load(Ordering::Acquire));
        snap.bpm = f32::from_bits(self.bpm.load(Ordering::Acquire));
        snap.quantize = QuantizeMode::from_raw(self.quantize.load(Ordering::Acquire));
        snap.swing = f32::from_bits(self.swing.load(Ordering::Acquire));
        // sample_time is RT-owned and untouched by the republish.
    }

    /// Advance the RT-owned sample clock by `frames`.
    pub fn advance_sample_time(&self, frames: u64) {
        // SAFETY: RT-thread-exclusive state.
        let snap = unsafe { &mut *self.snapshot.get() };
        snap.sample_time += frames;
    }

    /// Current RT snapshot; the copy is valid for this block.
    pub fn rt(&self) -> TransportSnapshot {
        // SAFETY: RT-thread-exclusive state; POD copy.
        unsafe { *self.snapshot.get() }
    }
}

impl Default for TransportBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn pack_sig(sig: TimeSig) -> u32 {
    (sig.num as u32) << 16 | sig.den as u32
}

#[inline]
fn unpack_sig(raw: u32) -> TimeSig {
    TimeSig::new((raw >> 16) as u16, (raw & 0xFFFF) as u16)
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
