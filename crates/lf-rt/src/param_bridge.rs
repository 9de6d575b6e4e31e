//! Dual-Page Parameter Bridge
//!
//! Batches parameter writes from the control side and applies them to
//! modules from the audio thread exactly once per block.
//!
//! Two equal pages of `(target, index, value)` entries; an atomic index
//! selects the current write page. The RT prologue freezes the write page,
//! flips the index, and applies the frozen entries in insertion order, so
//! multiple writes to the same address within one block resolve last-wins.
//!
//! # Lock-Free Design
//! Control side publishes entry count with release ordering; the RT side
//! acquires it. Neither side allocates, locks, or spins.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use lf_core::{clamp01, Target, DEFAULT_PAGE_CAPACITY};

/// One batched parameter write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamUpdate {
    pub target: Target,
    pub index: u16,
    /// Normalized [0, 1]; clamped on ingress.
    pub value: f32,
}

/// Outcome of one RT-side swap, converted into telemetry by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwapReport {
    /// Entries applied from the frozen page.
    pub applied: usize,
    /// The frozen page had overflowed (entries were discarded).
    pub overflowed: bool,
}

struct Page {
    entries: Box<[UnsafeCell<ParamUpdate>]>,
    len: AtomicUsize,
    overflow: AtomicBool,
}

impl Page {
    fn new(capacity: usize) -> Self {
        let entries = (0..capacity)
            .map(|_| {
                UnsafeCell::new(ParamUpdate {
                    target: Target::MASTER,
                    index: 0,
                    value: 0.0,
                })
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            entries,
            len: AtomicUsize::new(0),
            overflow: AtomicBool::new(false),
        }
    }
}

/// Dual-page batched parameter publisher.
///
/// Control side: [`ParamBridge::push_param`] (one writer thread).
/// RT side: [`ParamBridge::swap_and_apply`], strictly once per block
/// prologue. [`ParamBridge::drain_read`] copies the last frozen page for
/// diagnostics without applying it.
pub struct ParamBridge {
    pages: [Page; 2],
    /// 0 or 1; which page the producer currently targets.
    write_page: AtomicUsize,
    capacity: usize,
}

// SAFETY: an entry slot is written only by the control side while its page
// is the write page and below the published length, and read only by the
// RT side after the page was frozen (write_page flipped with release).
unsafe impl Send for ParamBridge {}
unsafe impl Sync for ParamBridge {}

impl ParamBridge {
    pub fn new(capacity_per_page: usize) -> Self {
        let capacity = capacity_per_page.max(1);
        Self {
            pages: [Page::new(capacity), Page::new(capacity)],
            write_page: AtomicUsize::new(0),
            capacity,
        }
    }

    #[inline]
    pub fn page_capacity(&self) -> usize {
        self.capacity
    }

    /// Queue a parameter write (single control thread).
    ///
    /// The value is clamped into [0, 1]. When the page is full the overflow
    /// flag is latched and the last slot is overwritten, keeping the most
    /// recent write at the cost of the one before it.
    pub fn push_param(&self, target: Target, index: u16, value: f32) {
        let value = clamp01(value);
        let w = self.write_page.load(Ordering::Relaxed);
        let page = &self.pages[w];

        let mut pos = page.len.load(Ordering::Relaxed);
        if pos >= self.capacity {
            page.overflow.store(true, Ordering::Relaxed);
            pos = self.capacity - 1;
        }

        // SAFETY: slot `pos` of the write page is unpublished (>= committed
        // length is never read by RT until the page is frozen).
        unsafe {
            page.entries[pos].get().write(ParamUpdate {
                target,
                index,
                value,
            });
        }
        page.len.store(pos + 1, Ordering::Release);
    }

    /// RT prologue: freeze the write page, flip pages, and apply the frozen
    /// entries in insertion order through `apply`.
    ///
    /// Unresolvable targets are the resolver's business; the bridge calls
    /// `apply` for every frozen entry. Idempotent: with no new writes and no
    /// pending overflow the call is a no-op.
    pub fn swap_and_apply<F>(&self, mut apply: F) -> SwapReport
    where
        F: FnMut(&ParamUpdate),
    {
        let w = self.write_page.load(Ordering::Relaxed);
        let r = w ^ 1;

        let ready = self.pages[w].len.load(Ordering::Acquire);
        let had_overflow = self.pages[w].overflow.load(Ordering::Relaxed);

        if ready == 0 && !had_overflow {
            return SwapReport::default();
        }

        // Prepare the future write page with clean counters, then flip. The
        // frozen page keeps its committed length for drain_read.
        self.pages[r].len.store(0, Ordering::Relaxed);
        self.pages[r].overflow.store(false, Ordering::Relaxed);
        self.write_page.store(r, Ordering::Release);

        for i in 0..ready {
            // SAFETY: page w is frozen; the control side now writes page r.
            let update = unsafe { *self.pages[w].entries[i].get() };
            apply(&update);
        }

        SwapReport {
            applied: ready,
            overflowed: had_overflow,
        }
    }

    /// Copy the last frozen page into `out` without applying it (diagnostics).
    /// Returns the number of entries copied.
    pub fn drain_read(&self, out: &mut [ParamUpdate]) -> usize {
        let r = self.write_page.load(Ordering::Relaxed) ^ 1;
        let n = self.pages[r].len.load(Ordering::Acquire);
        let to_copy = out.len().min(n);
        for (i, slot) in out[..to_copy].iter_mut().enumerate() {
            // SAFETY: the read page is not written while it is frozen.
            *slot = unsafe { *self.pages[r].entries[i].get() };
        }
        to_copy
    }

    /// Whether the last frozen page had overflowed.
    pub fn read_overflowed(&self) -> bool {
        let r = self.write_page.load(Ordering::Relaxed) ^ 1;
        self.pages[r].overflow.load(Ordering::Relaxed)
    }
}

impl Default for ParamBridge {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_CAPACITY)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
