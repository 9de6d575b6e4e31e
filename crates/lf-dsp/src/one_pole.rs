//! One-pole high-pass filter
//!
//! The canonical coefficient-recomputation pattern: `set_param` stores the
//! normalized cutoff in an atomic cell and raises a dirty flag; `process`
//! recomputes the coefficient at most once per block, outside the sample
//! loop. Difference equation per channel: `y = a·y₁ + a·(x − x₁)`.

use std::sync::atomic::{AtomicBool, Ordering};

use lf_core::{clamp01, map_log, AtomicParam, ParamMeta, ProcessContext};
use lf_engine::{AudioModule, Parameterized};

const HPF_MIN_HZ: f32 = 10.0;
const HPF_MAX_HZ: f32 = 20_000.0;
const MAX_CHANNELS: usize = 2;

/// One-pole HPF with log-mapped normalized cutoff.
pub struct OnePoleHpf {
    cutoff: AtomicParam,
    needs_recalc: AtomicBool,
    meta: ParamMeta,

    sample_rate: f64,
    a: f32,
    prev_x: [f32; MAX_CHANNELS],
    prev_y: [f32; MAX_CHANNELS],
}

impl OnePoleHpf {
    pub const P_CUTOFF: usize = 0;
    const NUM_PARAMS: usize = 1;

    pub fn new() -> Self {
        Self {
            cutoff: AtomicParam::new(0.5),
            needs_recalc: AtomicBool::new(true),
            meta: ParamMeta::new("Cutoff", 0.0, 1.0, true, "Norm"),
            sample_rate: 48_000.0,
            a: 0.0,
            prev_x: [0.0; MAX_CHANNELS],
            prev_y: [0.0; MAX_CHANNELS],
        }
    }

    /// Normalized cutoff shortcut.
    pub fn cutoff01(&self) -> f32 {
        self.cutoff.get()
    }

    pub fn set_cutoff01(&self, v: f32) {
        self.set_param(Self::P_CUTOFF, v);
    }

    fn map_norm_to_hz(&self, t: f32) -> f32 {
        // Keep the top of the range below Nyquist with headroom.
        let nyq45 = (0.45 * self.sample_rate) as f32;
        let fmax = if nyq45 > HPF_MIN_HZ {
            HPF_MAX_HZ.min(nyq45)
        } else {
            HPF_MAX_HZ
        };
        let fmin = HPF_MIN_HZ.min(fmax * 0.5).max(1.0);
        map_log(t, fmin, fmax)
    }

    fn recalc_coeff(&mut self) {
        let fc = self.map_norm_to_hz(self.cutoff.get());
        let a = (-2.0 * std::f32::consts::PI * fc / self.sample_rate as f32).exp();
        self.a = if a.is_finite() && (0.0..=1.0).contains(&a) {
            a
        } else {
            0.0
        };
    }
}

impl Default for OnePoleHpf {
    fn default() -> Self {
        Self::new()
    }
}

impl Parameterized for OnePoleHpf {
    fn param_count(&self) -> usize {
        Self::NUM_PARAMS
    }

    fn param(&self, index: usize) -> f32 {
        if index == Self::P_CUTOFF {
            self.cutoff.get()
        } else {
            0.0
        }
    }

    fn set_param(&self, index: usize, value: f32) {
        if index == Self::P_CUTOFF {
            self.cutoff.set(clamp01(value));
            // Coefficient is recomputed outside the inner loop.
            self.needs_recalc.store(true, Ordering::Relaxed);
        }
    }

    fn param_meta(&self, index: usize) -> Option<&ParamMeta> {
        (index == Self::P_CUTOFF).then_some(&self.meta)
    }
}

impl AudioModule for OnePoleHpf {
    fn init(&mut self, sample_rate: f64, _max_frames: usize) {
        self.sample_rate = if sample_rate > 0.0 {
            sample_rate
        } else {
            48_000.0
        };
        self.needs_recalc.store(true, Ordering::Relaxed);
        self.reset();
    }

    fn process(&mut self, ctx: &mut ProcessContext) {
        if self.needs_recalc.swap(false, Ordering::Relaxed) {
            self.recalc_coeff();
        }

        let a = self.a;
        let nch = ctx.outputs.len().min(MAX_CHANNELS);
        for ch in 0..nch {
            let Some(input) = ctx.input_or_first(ch) else {
                continue;
            };
            let mut px = self.prev_x[ch];
            let mut py = self.prev_y[ch];
            let out = &mut ctx.outputs[ch];
            for i in 0..ctx.frames {
                let x = input[i];
                let y = a * py + a * (x - px);
                out[i] = y;
                px = x;
                py = y;
            }
            self.prev_x[ch] = px;
            self.prev_y[ch] = py;
        }
    }

    fn reset(&mut self) {
        self.prev_x = [0.0; MAX_CHANNELS];
        self.prev_y = [0.0; MAX_CHANNELS];
        if self.needs_recalc.load(Ordering::Relaxed) {
            self.recalc_coeff();
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
