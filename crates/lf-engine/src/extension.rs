//! RT extension hooks
//!
//! Pluggable per-block observers with static capacity. This is the
//! integration point for quantized schedulers, meter taps, and sequencers.
//! Hooks run in registration order with the same context the tracks see,
//! and must be RT-safe (implementations use atomics behind `&self`).

use std::sync::Arc;

use lf_core::{ProcessContext, MAX_EXTENSIONS};

/// Per-block begin/end observer, invoked from the audio thread.
pub trait RtExtension: Send + Sync {
    fn on_block_begin(&self, ctx: &mut ProcessContext);
    fn on_block_end(&self, ctx: &mut ProcessContext);
}

/// Fixed-capacity registry of non-owning extension references.
///
/// Registration is off-RT and idempotent up to [`MAX_EXTENSIONS`]; excess
/// registrations are silently dropped.
pub struct ExtensionSlots {
    slots: [Option<Arc<dyn RtExtension>>; MAX_EXTENSIONS],
    len: usize,
}

impl ExtensionSlots {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            len: 0,
        }
    }

    /// Register an extension. Re-registering the same extension is a no-op;
    /// registrations past capacity are dropped. Returns whether the
    /// extension occupies a slot afterwards.
    pub fn add(&mut self, ext: Arc<dyn RtExtension>) -> bool {
        for slot in self.slots[..self.len].iter().flatten() {
            if Arc::ptr_eq(slot, &ext) {
                return true;
            }
        }
        if self.len >= MAX_EXTENSIONS {
            log::warn!("extension slots full ({MAX_EXTENSIONS}), registration dropped");
            return false;
        }
        self.slots[self.len] = Some(ext);
        self.len += 1;
        true
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Registered extensions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn RtExtension>> {
        self.slots[..self.len].iter().flatten()
    }
}

impl Default for ExtensionSlots {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter {
        begins: AtomicUsize,
        ends: AtomicUsize,
    }

    impl Counter {
        fn new() -> Self {
            Self {
                begins: AtomicUsize::new(0),
                ends: AtomicUsize::new(0),
            }
        }
    }

    impl RtExtension for Counter {
        fn on_block_begin(&self, _ctx: &mut ProcessContext) {
            self.begins.fetch_add(1, Ordering::Relaxed);
        }
        fn on_block_end(&self, _ctx: &mut ProcessContext) {
            self.ends.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_capacity_and_idempotence() {
        let mut slots = ExtensionSlots::new();
        let first: Arc<dyn RtExtension> = Arc::new(Counter::new());

        assert!(slots.add(Arc::clone(&first)));
        assert!(slots.add(Arc::clone(&first))); // idempotent
        assert_eq!(slots.len(), 1);

        for _ in 1..MAX_EXTENSIONS {
            assert!(slots.add(Arc::new(Counter::new())));
        }
        assert_eq!(slots.len(), MAX_EXTENSIONS);

        // Past capacity: silently dropped.
        assert!(!slots.add(Arc::new(Counter::new())));
        assert_eq!(slots.len(), MAX_EXTENSIONS);
    }

    #[test]
    fn test_iteration_order() {
        let mut slots = ExtensionSlots::new();
        let a: Arc<dyn RtExtension> = Arc::new(Counter::new());
        let b: Arc<dyn RtExtension> = Arc::new(Counter::new());
        slots.add(Arc::clone(&a));
        slots.add(Arc::clone(&b));

        let order: Vec<_> = slots.iter().collect();
        assert_eq!(order.len(), 2);
        assert!(Arc::ptr_eq(order[0], &a));
        assert!(Arc::ptr_eq(order[1], &b));
    }
}
