//! Track: serial FX chain with RT-safe command dispatch
//!
//! A track owns its modules and runs them in order, feeding each module's
//! output forward through a pre-allocated scratch buffer. After `process`
//! returns, the context outputs hold the track's contribution for the
//! block.

use lf_core::{clamp01, CmdId, ProcessContext, RtCommand, Sample, MAX_FX_PER_TRACK,
    MAX_IO_CHANNELS};

use crate::module::AudioModule;

/// RT contract the engine drives. Concrete tracks own module chains;
/// test doubles record calls.
pub trait Track: Send {
    /// RT-safe; the context outputs hold the track's contribution on return.
    fn process(&mut self, ctx: &mut ProcessContext);

    /// Dispatch a command addressed to this track. RT-safe, no allocation.
    fn on_rt_command(&mut self, cmd: &RtCommand);

    /// Module in FX slot `slot`, if populated. Used by the engine's
    /// parameter resolver.
    fn module(&self, slot: usize) -> Option<&dyn AudioModule>;
}

/// Standard track: an ordered chain of up to [`MAX_FX_PER_TRACK`] modules.
pub struct AudioTrack {
    modules: Vec<Box<dyn AudioModule>>,
    /// Per-channel feed-forward buffer, sized in `prepare`.
    scratch: Vec<Vec<Sample>>,
    playing: bool,
    armed: bool,
    overdub: bool,
}

impl AudioTrack {
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
            scratch: Vec::new(),
            playing: false,
            armed: false,
            overdub: false,
        }
    }

    /// Append a module to the chain (off-RT, before `prepare`). Returns
    /// `false` when the chain is full.
    pub fn add_module(&mut self, module: Box<dyn AudioModule>) -> bool {
        if self.modules.len() >= MAX_FX_PER_TRACK {
            log::warn!("track FX chain full ({MAX_FX_PER_TRACK} slots), module dropped");
            return false;
        }
        self.modules.push(module);
        true
    }

    /// Initialize all modules and allocate the scratch buffer (off-RT).
    pub fn prepare(&mut self, sample_rate: f64, max_frames: usize, channels: usize) {
        for m in &mut self.modules {
            m.init(sample_rate, max_frames);
        }
        let channels = channels.min(MAX_IO_CHANNELS);
        self.scratch = (0..channels).map(|_| vec![0.0; max_frames]).collect();
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn is_overdubbing(&self) -> bool {
        self.overdub
    }
}

impl Default for AudioTrack {
    fn default() -> Self {
        Self::new()
    }
}

impl Track for AudioTrack {
    fn process(&mut self, ctx: &mut ProcessContext) {
        let frames = ctx.frames;
        let modules = &mut self.modules;
        let scratch = &mut self.scratch;

        for (i, m) in modules.iter_mut().enumerate() {
            m.begin_block();

            if i == 0 {
                m.process(ctx);
                continue;
            }

            // Feed the previous module's output forward: copy outputs into
            // scratch, then run this module scratch → outputs.
            let nch = ctx.outputs.len().min(scratch.len()).min(MAX_IO_CHANNELS);
            for (buf, out) in scratch.iter_mut().zip(ctx.outputs.iter()) {
                let n = frames.min(buf.len()).min(out.len());
                buf[..n].copy_from_slice(&out[..n]);
            }

            let mut ins: [&[Sample]; MAX_IO_CHANNELS] = [&[]; MAX_IO_CHANNELS];
            for (slot, buf) in ins.iter_mut().zip(scratch.iter()) {
                *slot = &buf[..frames.min(buf.len())];
            }

            let mut chained = ProcessContext::new(&ins[..nch], &mut *ctx.outputs, frames);
            m.process(&mut chained);
        }
    }

    fn on_rt_command(&mut self, cmd: &RtCommand) {
        match CmdId::from_raw(cmd.id) {
            CmdId::ParamSet => {
                if cmd.slot >= 0 {
                    if let Some(m) = self.modules.get(cmd.slot as usize) {
                        m.set_param(cmd.index as usize, clamp01(cmd.value));
                    }
                }
            }
            CmdId::Play | CmdId::Continue => self.playing = true,
            CmdId::Stop | CmdId::StopQuantized => self.playing = false,
            CmdId::RecArm => self.armed = true,
            CmdId::RecDisarm => self.armed = false,
            CmdId::Overdub => self.overdub = cmd.value >= 0.5,
            CmdId::Clear => {
                // reset() clears DSP state only; allocation-free by contract
                for m in &mut self.modules {
                    m.reset();
                }
            }
            // Note/clip events have no consumer in a plain FX chain.
            _ => {}
        }
    }

    fn module(&self, slot: usize) -> Option<&dyn AudioModule> {
        self.modules.get(slot).map(|m| m.as_ref())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Parameterized;
    use lf_core::{AtomicParam, ParamMeta};

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Adds a fixed offset to every sample; counts lifecycle calls through
    /// shared counters so tests can observe them behind the trait object.
    struct Offset {
        amount: Sample,
        cell: AtomicParam,
        meta: ParamMeta,
        begin_blocks: Arc<AtomicUsize>,
        resets: Arc<AtomicUsize>,
    }

    impl Offset {
        fn new(amount: Sample) -> Self {
            Self {
                amount,
                cell: AtomicParam::new(0.0),
                meta: ParamMeta::new("Offset", 0.0, 1.0, false, "x"),
                begin_blocks: Arc::new(AtomicUsize::new(0)),
                resets: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl Parameterized for Offset {
        fn param_count(&self) -> usize {
            1
        }
        fn param(&self, _index: usize) -> f32 {
            self.cell.get()
        }
        fn set_param(&self, index: usize, value: f32) {
            if index == 0 {
                self.cell.set(value);
            }
        }
        fn param_meta(&self, index: usize) -> Option<&ParamMeta> {
            (index == 0).then_some(&self.meta)
        }
        fn begin_block(&mut self) {
            self.begin_blocks.fetch_add(1, Ordering::Relaxed);
        }
    }

    impl AudioModule for Offset {
        fn init(&mut self, _sample_rate: f64, _max_frames: usize) {}
        fn process(&mut self, ctx: &mut ProcessContext) {
            for ch in 0..ctx.outputs.len() {
                let Some(input) = ctx.input_or_first(ch) else {
                    continue;
                };
                let out = &mut ctx.outputs[ch];
                for i in 0..ctx.frames {
                    out[i] = input[i] + self.amount;
                }
            }
        }
        fn reset(&mut self) {
            self.resets.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn run_block(track: &mut AudioTrack, input: &[Sample], frames: usize) -> Vec<Sample> {
        let ins: [&[Sample]; 1] = [input];
        let mut out = vec![0.0; frames];
        {
            let mut outs: [&mut [Sample]; 1] = [&mut out];
            let mut ctx = ProcessContext::new(&ins, &mut outs, frames);
            track.process(&mut ctx);
        }
        out
    }

    #[test]
    fn test_chain_feeds_outputs_forward() {
        let mut track = AudioTrack::new();
        assert!(track.add_module(Box::new(Offset::new(1.0))));
        assert!(track.add_module(Box::new(Offset::new(10.0))));
        track.prepare(48_000.0, 256, 1);

        let input = vec![0.5; 256];
        let out = run_block(&mut track, &input, 256);

        // 0.5 + 1.0 through the first module, + 10.0 through the second.
        assert!(out.iter().all(|&s| (s - 11.5).abs() < 1e-6));
    }

    #[test]
    fn test_chain_capacity() {
        let mut track = AudioTrack::new();
        for _ in 0..MAX_FX_PER_TRACK {
            assert!(track.add_module(Box::new(Offset::new(0.0))));
        }
        assert!(!track.add_module(Box::new(Offset::new(0.0))));
        assert_eq!(track.module_count(), MAX_FX_PER_TRACK);
    }

    #[test]
    fn test_param_set_routes_to_slot() {
        let mut track = AudioTrack::new();
        track.add_module(Box::new(Offset::new(0.0)));
        track.add_module(Box::new(Offset::new(0.0)));

        track.on_rt_command(&RtCommand::param_set(0, 1, 0, 0.75));
        assert_eq!(track.module(1).unwrap().param(0), 0.75);
        assert_eq!(track.module(0).unwrap().param(0), 0.0);

        // Out-of-range values clamp on dispatch.
        track.on_rt_command(&RtCommand::param_set(0, 0, 0, 7.0));
        assert_eq!(track.module(0).unwrap().param(0), 1.0);
    }

    #[test]
    fn test_param_set_ignores_bad_slot() {
        let mut track = AudioTrack::new();
        track.add_module(Box::new(Offset::new(0.0)));
        track.on_rt_command(&RtCommand::param_set(0, 5, 0, 0.5));
        track.on_rt_command(&RtCommand::param_set(0, -1, 0, 0.5));
        assert_eq!(track.module(0).unwrap().param(0), 0.0);
    }

    #[test]
    fn test_transport_flags() {
        let mut track = AudioTrack::new();
        track.on_rt_command(&RtCommand::new(CmdId::Play, 0, -1, 0, 0.0));
        assert!(track.is_playing());
        track.on_rt_command(&RtCommand::new(CmdId::RecArm, 0, -1, 0, 0.0));
        assert!(track.is_armed());
        track.on_rt_command(&RtCommand::new(CmdId::Stop, 0, -1, 0, 0.0));
        assert!(!track.is_playing());
        track.on_rt_command(&RtCommand::new(CmdId::RecDisarm, 0, -1, 0, 0.0));
        assert!(!track.is_armed());
        track.on_rt_command(&RtCommand::new(CmdId::Overdub, 0, -1, 0, 1.0));
        assert!(track.is_overdubbing());
    }

    #[test]
    fn test_begin_block_called_once_per_module_per_block() {
        let mut track = AudioTrack::new();
        let first = Offset::new(0.0);
        let second = Offset::new(0.0);
        let counters = [Arc::clone(&first.begin_blocks), Arc::clone(&second.begin_blocks)];
        track.add_module(Box::new(first));
        track.add_module(Box::new(second));
        track.prepare(48_000.0, 64, 1);

        let input = vec![0.0; 64];
        run_block(&mut track, &input, 64);
        run_block(&mut track, &input, 64);

        for counter in &counters {
            assert_eq!(counter.load(Ordering::Relaxed), 2);
        }
    }

    #[test]
    fn test_clear_resets_modules() {
        let mut track = AudioTrack::new();
        let m = Offset::new(0.0);
        let resets = Arc::clone(&m.resets);
        track.add_module(Box::new(m));

        track.on_rt_command(&RtCommand::new(CmdId::Clear, 0, -1, 0, 0.0));
        assert_eq!(resets.load(Ordering::Relaxed), 1);
    }
}
