//! Slew-limited gain
//!
//! The canonical per-block parameter-snapshot module. Control threads write
//! the gain target into an atomic cell; `begin_block` snapshots it once per
//! block and arms a linear ramp from the *current* interpolated state, so a
//! mid-block write never affects the running block. Ramp length is resolved
//! lazily at the first `process` of a new ramp because per-blocks mode
//! needs the block length.

use lf_core::{clamp01, AtomicParam, ParamMeta, ProcessContext};
use lf_engine::{AudioModule, Parameterized};

/// Ramp duration policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlewMode {
    /// Reach the target after this many blocks.
    PerBlocks(u8),
    /// Reach the target after a fixed time in milliseconds.
    FixedMs(f32),
}

impl Default for SlewMode {
    fn default() -> Self {
        Self::PerBlocks(1)
    }
}

/// Gain stage with linear slew toward an atomically published target.
pub struct GainSlew {
    mode: SlewMode,
    sample_rate: f64,

    /// Control-side target cell; snapshotted in `begin_block`.
    cell: AtomicParam,
    meta: ParamMeta,

    // Ramp state (RT-owned).
    gain: f32,
    target: f32,
    start: f32,
    step: f32,
    samples_done: u32,
    total_samples: u32,
    ramp_pending: bool,
    ramp_active: bool,
}

impl GainSlew {
    pub const P_GAIN: usize = 0;
    const NUM_PARAMS: usize = 1;

    pub fn new() -> Self {
        Self::with_mode(SlewMode::default())
    }

    pub fn with_mode(mode: SlewMode) -> Self {
        let mode = match mode {
            SlewMode::PerBlocks(0) => SlewMode::PerBlocks(1),
            SlewMode::FixedMs(ms) => SlewMode::FixedMs(ms.max(0.0)),
            other => other,
        };
        Self {
            mode,
            sample_rate: 48_000.0,
            cell: AtomicParam::new(1.0),
            meta: ParamMeta::new("Gain", 0.0, 1.0, false, "x"),
            gain: 1.0,
            target: 1.0,
            start: 1.0,
            step: 0.0,
            samples_done: 0,
            total_samples: 0,
            ramp_pending: false,
            ramp_active: false,
        }
    }

    /// Switch to per-blocks mode (off-RT tuning).
    pub fn set_slew_blocks(&mut self, blocks: u8) {
        self.mode = SlewMode::PerBlocks(blocks.max(1));
    }

    /// Switch to fixed-ms mode (off-RT tuning).
    pub fn set_slew_ms(&mut self, ms: f32) {
        self.mode = SlewMode::FixedMs(ms.max(0.0));
    }
}

impl Default for GainSlew {
    fn default() -> Self {
        Self::new()
    }
}

impl Parameterized for GainSlew {
    fn param_count(&self) -> usize {
        Self::NUM_PARAMS
    }

    fn param(&self, index: usize) -> f32 {
        if index == Self::P_GAIN {
            self.cell.get()
        } else {
            0.0
        }
    }

    fn set_param(&self, index: usize, value: f32) {
        if index == Self::P_GAIN {
            self.cell.set(clamp01(value));
        }
    }

    fn param_meta(&self, index: usize) -> Option<&ParamMeta> {
        (index == Self::P_GAIN).then_some(&self.meta)
    }

    fn begin_block(&mut self) {
        let snapshot = self.cell.get();

        if snapshot != self.target {
            // New target: arm a fresh ramp starting from the current state.
            self.target = snapshot;
            self.start = self.gain;
            self.samples_done = 0;
            self.total_samples = 0;
            self.ramp_pending = self.start != self.target;
            self.ramp_active = self.ramp_pending;
        } else {
            // Same target: the ramp either continues or already finished.
            self.ramp_active = self.gain != self.target;
        }
    }
}

impl AudioModule for GainSlew {
    fn init(&mut self, sample_rate: f64, _max_frames: usize) {
        self.sample_rate = sample_rate;
        self.cell.set(1.0);
        self.gain = 1.0;
        self.target = 1.0;
        self.start = 1.0;
        self.step = 0.0;
        self.samples_done = 0;
        self.total_samples = 0;
        self.ramp_pending = false;
        self.ramp_active = false;
    }

    fn process(&mut self, ctx: &mut ProcessContext) {
        // Resolve ramp length lazily, once per ramp start.
        if self.ramp_pending {
            self.total_samples = match self.mode {
                SlewMode::PerBlocks(blocks) => {
                    ((blocks as u32).saturating_mul(ctx.frames as u32)).max(1)
                }
                SlewMode::FixedMs(ms) => {
                    ((ms as f64 / 1000.0 * self.sample_rate).ceil() as u32).max(1)
                }
            };
            self.step = (self.target - self.start) / self.total_samples as f32;
            self.samples_done = 0;
            self.ramp_pending = false;
            self.ramp_active = self.start != self.target;
        }

        for i in 0..ctx.frames {
            if self.ramp_active {
                let remaining = self.total_samples.saturating_sub(self.samples_done);
                if remaining <= 1 {
                    self.gain = self.target;
                    self.samples_done = self.total_samples;
                    self.ramp_active = false;
                    self.step = 0.0;
                } else {
                    self.gain += self.step;
                    self.samples_done += 1;
                }
            }

            let g = self.gain;
            for ch in 0..ctx.outputs.len() {
                let x = ctx
                    .inputs
                    .get(ch)
                    .or_else(|| ctx.inputs.first())
                    .map(|s| s[i])
                    .unwrap_or(0.0);
                ctx.outputs[ch][i] = x * g;
            }
        }
    }

    fn reset(&mut self) {
        // Snap to the current target; any in-flight ramp is discarded.
        self.target = self.cell.get();
        self.gain = self.target;
        self.start = self.target;
        self.step = 0.0;
        self.samples_done = 0;
        self.total_samples = 0;
        self.ramp_pending = false;
        self.ramp_active = false;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use lf_core::Sample;

    const SR: f64 = 48_000.0;
    const N: usize = 256;

    fn run_block(m: &mut GainSlew, input: &[Sample]) -> Vec<Sample> {
        let ins: [&[Sample]; 1] = [input];
        let mut out = vec![0.0; input.len()];
        {
            let mut outs: [&mut [Sample]; 1] = [&mut out];
            let mut ctx = ProcessContext::new(&ins, &mut outs, input.len());
            m.begin_block();
            m.process(&mut ctx);
        }
        out
    }

    #[test]
    fn test_pass_through_at_unity() {
        let mut m = GainSlew::new();
        m.init(SR, N);

        let input: Vec<Sample> = (0..N)
            .map(|i| (2.0 * std::f32::consts::PI * i as f32 / 32.0).sin())
            .collect();
        m.set_param(GainSlew::P_GAIN, 1.0);
        let out = run_block(&mut m, &input);

        for (o, i) in out.iter().zip(input.iter()) {
            assert!((o - i).abs() < 1e-6);
        }
    }

    #[test]
    fn test_silence_after_ramp_to_zero() {
        let mut m = GainSlew::new();
        m.init(SR, N);

        let input = vec![0.3; N];
        m.set_param(GainSlew::P_GAIN, 0.0);
        // Block 1 ramps 1 → 0; block 2 must be silent throughout.
        run_block(&mut m, &input);
        let out = run_block(&mut m, &input);
        for &s in &out {
            assert!(s.abs() < 1e-6);
        }
    }

    #[test]
    fn test_linear_ramp_over_one_block() {
        let mut m = GainSlew::with_mode(SlewMode::PerBlocks(1));
        m.init(SR, N);
        let input = vec![1.0; N];

        // Settle at 0 first.
        m.set_param(GainSlew::P_GAIN, 0.0);
        run_block(&mut m, &input);

        // Target 1: the ramp must complete within exactly one block.
        m.set_param(GainSlew::P_GAIN, 1.0);
        let out = run_block(&mut m, &input);

        assert!(out[0] >= 0.0);
        assert!((out[N - 1] - 1.0).abs() < 1e-6);
        for i in 1..N {
            assert!(out[i] >= out[i - 1]);
        }
    }

    #[test]
    fn test_two_block_ramp_hits_midpoint() {
        let mut m = GainSlew::with_mode(SlewMode::PerBlocks(2));
        m.init(SR, N);
        let input = vec![1.0; N];

        m.set_param(GainSlew::P_GAIN, 0.0);
        run_block(&mut m, &input);
        run_block(&mut m, &input);

        m.set_param(GainSlew::P_GAIN, 1.0);
        let first = run_block(&mut m, &input);
        assert!((first[N - 1] - 0.5).abs() < 1e-3);

        let second = run_block(&mut m, &input);
        assert!((second[N - 1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_mid_block_write_deferred_to_next_block() {
        let mut m = GainSlew::with_mode(SlewMode::PerBlocks(1));
        m.init(SR, N);
        let input = vec![1.0; N];

        m.set_param(GainSlew::P_GAIN, 1.0);
        let ins: [&[Sample]; 1] = [&input];
        let mut out = vec![0.0; N];
        {
            let mut outs: [&mut [Sample]; 1] = [&mut out];
            let mut ctx = ProcessContext::new(&ins, &mut outs, N);
            m.begin_block();
            // Write after the snapshot: must not affect this block.
            m.set_param(GainSlew::P_GAIN, 0.2);
            m.process(&mut ctx);
        }
        assert!((out[N - 1] - 1.0).abs() < 1e-6);

        // The deferred target lands on the following block.
        let next = run_block(&mut m, &input);
        assert!((next[N - 1] - 0.2).abs() < 1e-3);
    }

    #[test]
    fn test_fixed_ms_ramp_length() {
        let mut m = GainSlew::with_mode(SlewMode::FixedMs(1.0)); // 48 samples @ 48k
        m.init(SR, N);
        let input = vec![1.0; N];

        m.set_param(GainSlew::P_GAIN, 0.0);
        run_block(&mut m, &input);
        run_block(&mut m, &input);

        m.set_param(GainSlew::P_GAIN, 1.0);
        let out = run_block(&mut m, &input);

        // Ramp completes after ~48 samples, then holds the target.
        assert!(out[40] < 1.0);
        assert!((out[47] - 1.0).abs() < 1e-6);
        assert!((out[N - 1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_reset_snaps_to_target() {
        let mut m = GainSlew::with_mode(SlewMode::PerBlocks(4));
        m.init(SR, N);
        let input = vec![1.0; N];

        m.set_param(GainSlew::P_GAIN, 0.0);
        run_block(&mut m, &input); // ramp in flight

        m.reset();
        let out = run_block(&mut m, &input);
        // No residual ramp: flat at the target from the first sample.
        for &s in &out {
            assert!(s.abs() < 1e-6);
        }
    }

    #[test]
    fn test_stereo_gain_applied_to_both_channels() {
        let mut m = GainSlew::new();
        m.init(SR, 8);

        let left = [0.5; 8];
        let right = [-0.25; 8];
        let ins: [&[Sample]; 2] = [&left, &right];
        let mut out_l = [0.0; 8];
        let mut out_r = [0.0; 8];
        {
            let mut outs: [&mut [Sample]; 2] = [&mut out_l, &mut out_r];
            let mut ctx = ProcessContext::new(&ins, &mut outs, 8);
            m.begin_block();
            m.process(&mut ctx);
        }
        assert!(out_l.iter().all(|&s| (s - 0.5).abs() < 1e-6));
        assert!(out_r.iter().all(|&s| (s + 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_set_param_clamps() {
        let m = GainSlew::new();
        m.set_param(GainSlew::P_GAIN, 4.2);
        assert_eq!(m.param(GainSlew::P_GAIN), 1.0);
        m.set_param(GainSlew::P_GAIN, -1.0);
        assert_eq!(m.param(GainSlew::P_GAIN), 0.0);
    }
}
