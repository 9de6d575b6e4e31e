//! RT engine loop
//!
//! `process_block` is the sole RT entry point; its internal order is a
//! contract:
//!
//! 1. drain the command ring
//! 2. publish the parameter page (apply to modules)
//! 3. publish the transport snapshot and advance the sample clock
//! 4. extension pre-hooks, in registration order
//! 5. track chains, in registration order
//! 6. extension post-hooks, in registration order
//! 7. master capture into the record sink
//!
//! The whole body is allocation-free and lock-free; every failure surfaces
//! as a telemetry counter. All configuration happens off-RT before the
//! stream starts. Ownership of the ring, bridge, transport, extensions,
//! and sink lives in the enclosing application; the engine shares them and
//! owns only its track list.

use std::sync::Arc;

use lf_core::{
    CmdId, Command, ProcessContext, RtCommand, Sample, MAX_IO_CHANNELS, MAX_TRACKS,
    MAX_TRACKS_CAP,
};
use lf_rt::{CommandRing, ParamBridge, QuantizeMode, TransportBridge};

use crate::extension::{ExtensionSlots, RtExtension};
use crate::record::RtRecordSink;
use crate::telemetry::EngineTelemetry;
use crate::track::Track;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Registered-track cap; clamped to [`MAX_TRACKS_CAP`].
    pub max_tracks: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_tracks: MAX_TRACKS,
        }
    }
}

/// The RT core: drives tracks, applies cross-thread state, captures master.
pub struct AudioEngine {
    config: EngineConfig,
    tracks: Vec<Box<dyn Track>>,
    commands: Arc<CommandRing>,
    params: Arc<ParamBridge>,
    transport: Option<Arc<TransportBridge>>,
    extensions: ExtensionSlots,
    record_sink: Option<Arc<dyn RtRecordSink>>,
    telemetry: Arc<EngineTelemetry>,
    sample_rate: f64,
    /// Advisory master loop region in frames (start, end), set via
    /// `SetLoopRegion`. Consumed by loop-aware extensions.
    loop_region: (u64, u64),
}

impl AudioEngine {
    pub fn new(commands: Arc<CommandRing>, params: Arc<ParamBridge>) -> Self {
        Self::with_config(commands, params, EngineConfig::default())
    }

    pub fn with_config(
        commands: Arc<CommandRing>,
        params: Arc<ParamBridge>,
        mut config: EngineConfig,
    ) -> Self {
        config.max_tracks = config.max_tracks.min(MAX_TRACKS_CAP);
        Self {
            tracks: Vec::with_capacity(config.max_tracks),
            config,
            commands,
            params,
            transport: None,
            extensions: ExtensionSlots::new(),
            record_sink: None,
            telemetry: Arc::new(EngineTelemetry::new()),
            sample_rate: 48_000.0,
            loop_region: (0, 0),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // CONFIGURATION (off-RT, before stream start)
    // ═══════════════════════════════════════════════════════════════════════

    /// Register a track. Returns `false` when the configured cap is reached.
    pub fn register_track(&mut self, track: Box<dyn Track>) -> bool {
        if self.tracks.len() >= self.config.max_tracks {
            log::warn!(
                "track cap reached ({}), registration refused",
                self.config.max_tracks
            );
            return false;
        }
        self.tracks.push(track);
        true
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Register an RT extension (≤ 8; excess registrations are dropped).
    pub fn add_extension(&mut self, ext: Arc<dyn RtExtension>) -> bool {
        self.extensions.add(ext)
    }

    pub fn set_master_record_sink(&mut self, sink: Arc<dyn RtRecordSink>) {
        self.record_sink = Some(sink);
    }

    pub fn set_transport_bridge(&mut self, transport: Arc<TransportBridge>) {
        self.transport = Some(transport);
    }

    pub fn telemetry(&self) -> Arc<EngineTelemetry> {
        Arc::clone(&self.telemetry)
    }

    /// Advisory master loop region (frames), last value received on RT.
    pub fn loop_region(&self) -> (u64, u64) {
        self.loop_region
    }

    // ═══════════════════════════════════════════════════════════════════════
    // COMMAND INGRESS (off-RT)
    // ═══════════════════════════════════════════════════════════════════════

    /// Translate a textual command and enqueue it for the RT thread.
    /// Unknown names resolve to code 0 and are discarded on RT.
    pub fn on_command(&self, cmd: &Command) {
        let id = CmdId::parse(&cmd.name);
        self.push_command(RtCommand::new(id, cmd.target.track, cmd.target.slot, 0, cmd.value));
    }

    /// Enqueue an already-encoded command record (for callers that fill
    /// `index`/`aux`, e.g. note and region commands).
    pub fn push_command(&self, cmd: RtCommand) -> bool {
        let pushed = self.commands.push(cmd);
        if !pushed {
            self.telemetry.count_ring_overflow();
        }
        pushed
    }

    // ═══════════════════════════════════════════════════════════════════════
    // RT PATH (audio thread only)
    // ═══════════════════════════════════════════════════════════════════════

    /// Process one audio block. Sole RT entry point.
    pub fn process_block(&mut self, ctx: &mut ProcessContext) {
        // 1. Drain all pending RT commands.
        while let Some(cmd) = self.commands.pop() {
            self.handle_rt_command(&cmd);
        }

        // 2. Publish the parameter page and apply it to the modules.
        let tracks = &self.tracks;
        let report = self.params.swap_and_apply(|u| {
            if u.target.track < 0 || u.target.slot < 0 {
                // Track-level addressing has no parameter cell here; dropped.
                return;
            }
            if let Some(track) = tracks.get(u.target.track as usize) {
                if let Some(module) = track.module(u.target.slot as usize) {
                    module.set_param(u.index as usize, u.value);
                }
            }
        });
        if report.overflowed {
            self.telemetry.count_page_overflow();
        }

        // 3. Publish transport and advance the sample clock.
        if let Some(transport) = &self.transport {
            transport.swap_buffers();
            transport.advance_sample_time(ctx.frames as u64);
        }

        // 4. Pre-hooks.
        for ext in self.extensions.iter() {
            ext.on_block_begin(ctx);
        }

        // 5. Track chains.
        for track in &mut self.tracks {
            track.process(ctx);
        }

        // 6. Post-hooks.
        for ext in self.extensions.iter() {
            ext.on_block_end(ctx);
        }

        // 7. Master capture.
        if let Some(sink) = &self.record_sink {
            let mut channels: [&[Sample]; MAX_IO_CHANNELS] = [&[]; MAX_IO_CHANNELS];
            let n = ctx.outputs.len().min(MAX_IO_CHANNELS);
            for (slot, out) in channels.iter_mut().zip(ctx.outputs.iter()) {
                *slot = &out[..];
            }
            if !sink.write_block(&channels[..n], ctx.frames) {
                self.telemetry.count_sink_backpressure();
            }
        }
    }

    fn handle_rt_command(&mut self, cmd: &RtCommand) {
        let id = CmdId::from_raw(cmd.id);
        if id == CmdId::Unknown {
            self.telemetry.count_unknown_command();
            return;
        }

        if cmd.track >= 0 {
            match self.tracks.get_mut(cmd.track as usize) {
                Some(track) => track.on_rt_command(cmd),
                None => self.telemetry.count_bad_track_index(),
            }
            return;
        }

        // Master scope: transport/quantize codes route to the transport
        // bridge's non-blocking setters; the rest are advisory.
        match id {
            CmdId::Play | CmdId::Continue => {
                if let Some(t) = &self.transport {
                    t.set_playing(true);
                }
            }
            CmdId::Stop | CmdId::StopQuantized => {
                if let Some(t) = &self.transport {
                    t.set_playing(false);
                }
            }
            CmdId::SetTempoBpm => {
                if let Some(t) = &self.transport {
                    t.set_tempo(cmd.value);
                }
            }
            CmdId::SetTimeSig => {
                // index = denominator, value = numerator
                if let Some(t) = &self.transport {
                    t.set_time_signature(cmd.value as u16, cmd.index);
                }
            }
            CmdId::QuantizeMode => {
                if let Some(t) = &self.transport {
                    t.set_quantize(QuantizeMode::from_raw(cmd.value as u8));
                }
            }
            CmdId::SetLoopRegion => {
                self.loop_region = (cmd.aux as u64, cmd.value as u64);
            }
            _ => {}
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use lf_core::Target;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTrack {
        processed: Arc<AtomicUsize>,
        seen: Vec<RtCommand>,
    }

    impl CountingTrack {
        fn new() -> Self {
            Self {
                processed: Arc::new(AtomicUsize::new(0)),
                seen: Vec::new(),
            }
        }
    }

    impl Track for CountingTrack {
        fn process(&mut self, _ctx: &mut ProcessContext) {
            self.processed.fetch_add(1, Ordering::Relaxed);
        }
        fn on_rt_command(&mut self, cmd: &RtCommand) {
            self.seen.push(*cmd);
        }
        fn module(&self, _slot: usize) -> Option<&dyn crate::AudioModule> {
            None
        }
    }

    fn run_engine_block(engine: &mut AudioEngine, frames: usize) {
        let input = vec![0.0f32; frames];
        let ins: [&[Sample]; 1] = [&input];
        let mut out = vec![0.0f32; frames];
        let mut outs: [&mut [Sample]; 1] = [&mut out];
        let mut ctx = ProcessContext::new(&ins, &mut outs, frames);
        engine.process_block(&mut ctx);
    }

    #[test]
    fn test_single_track_single_block() {
        let ring = Arc::new(CommandRing::new(64));
        let bridge = Arc::new(ParamBridge::new(64));
        let mut engine = AudioEngine::new(ring, bridge);

        let track = CountingTrack::new();
        let processed = Arc::clone(&track.processed);
        assert!(engine.register_track(Box::new(track)));

        run_engine_block(&mut engine, 256);
        assert_eq!(processed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_track_cap() {
        let ring = Arc::new(CommandRing::new(8));
        let bridge = Arc::new(ParamBridge::new(8));
        let mut engine = AudioEngine::with_config(
            Arc::clone(&ring),
            Arc::clone(&bridge),
            EngineConfig { max_tracks: 2 },
        );

        assert!(engine.register_track(Box::new(CountingTrack::new())));
        assert!(engine.register_track(Box::new(CountingTrack::new())));
        assert!(!engine.register_track(Box::new(CountingTrack::new())));
        assert_eq!(engine.track_count(), 2);
    }

    #[test]
    fn test_command_routed_to_track() {
        let ring = Arc::new(CommandRing::new(64));
        let bridge = Arc::new(ParamBridge::new(64));
        let mut engine = AudioEngine::new(Arc::clone(&ring), bridge);
        engine.register_track(Box::new(CountingTrack::new()));

        engine.push_command(RtCommand::param_set(0, 0, 3, 0.75));
        run_engine_block(&mut engine, 64);

        // The command reached the track during the prologue.
        // (routing verified through the integration test's recording track;
        // here we assert it is gone from the ring)
        assert!(ring.is_empty());
    }

    #[test]
    fn test_unknown_and_out_of_range_counted() {
        let ring = Arc::new(CommandRing::new(64));
        let bridge = Arc::new(ParamBridge::new(64));
        let mut engine = AudioEngine::new(ring, bridge);
        engine.register_track(Box::new(CountingTrack::new()));
        let telemetry = engine.telemetry();

        engine.on_command(&Command::new("warp_drive", Target::MASTER, 0.0));
        engine.push_command(RtCommand::new(CmdId::Play, 7, -1, 0, 0.0));
        run_engine_block(&mut engine, 64);

        assert_eq!(telemetry.unknown_commands(), 1);
        assert_eq!(telemetry.bad_track_index(), 1);
    }

    #[test]
    fn test_ring_overflow_counted_on_ingress() {
        let ring = Arc::new(CommandRing::new(2)); // one usable slot
        let bridge = Arc::new(ParamBridge::new(8));
        let engine = AudioEngine::new(Arc::clone(&ring), bridge);
        let telemetry = engine.telemetry();

        assert!(engine.push_command(RtCommand::new(CmdId::Play, -1, -1, 0, 0.0)));
        assert!(!engine.push_command(RtCommand::new(CmdId::Play, -1, -1, 0, 0.0)));
        assert_eq!(telemetry.ring_overflows(), 1);
        assert!(ring.overflow_flag_and_reset());
    }

    #[test]
    fn test_master_commands_route_to_transport() {
        let ring = Arc::new(CommandRing::new(64));
        let bridge = Arc::new(ParamBridge::new(8));
        let transport = Arc::new(TransportBridge::new());
        let mut engine = AudioEngine::new(ring, bridge);
        engine.set_transport_bridge(Arc::clone(&transport));

        engine.on_command(&Command::new("set_tempo_bpm", Target::MASTER, 140.0));
        engine.on_command(&Command::new("play", Target::MASTER, 0.0));
        run_engine_block(&mut engine, 128);

        // Commands drain first, then the transport republish runs in the
        // same prologue, so the staged writes are already visible.
        let snap = transport.rt();
        assert!(snap.playing);
        assert_eq!(snap.bpm, 140.0);
        assert_eq!(snap.sample_time, 128);
    }

    #[test]
    fn test_loop_region_extended_record() {
        let ring = Arc::new(CommandRing::new(8));
        let bridge = Arc::new(ParamBridge::new(8));
        let mut engine = AudioEngine::new(ring, bridge);

        engine.push_command(RtCommand::loop_region(480, 96_000));
        run_engine_block(&mut engine, 32);
        assert_eq!(engine.loop_region(), (480, 96_000));
    }
}
