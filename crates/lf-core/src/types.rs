//! Core data records crossing the control/RT boundary
//!
//! Everything here is plain data: fixed-size, trivially copyable, and free
//! of heap pointers, so records can travel through lock-free rings and be
//! read from the audio thread without ownership questions.

use serde::{Deserialize, Serialize};

use crate::{CmdId, Sample};

// ═══════════════════════════════════════════════════════════════════════════════
// TARGET ADDRESSING
// ═══════════════════════════════════════════════════════════════════════════════

/// Address of a parameter or command destination: (track, FX slot).
///
/// `-1` in either field means master / track-level scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub track: i16,
    pub slot: i16,
}

impl Target {
    /// Master/global scope.
    pub const MASTER: Self = Self { track: -1, slot: -1 };

    pub fn new(track: i16, slot: i16) -> Self {
        Self { track, slot }
    }

    /// Track-level scope for a given track (slot = -1).
    pub fn track_level(track: i16) -> Self {
        Self { track, slot: -1 }
    }

    #[inline]
    pub fn is_master(&self) -> bool {
        self.track < 0
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RT COMMAND RECORD
// ═══════════════════════════════════════════════════════════════════════════════

/// Compact command record for the control → RT ring.
///
/// All commands fit this one shape; `id` is a [`crate::CmdId`] code point.
/// `track == -1` addresses the master scope, `slot == -1` the track level.
/// `aux` carries the secondary payload of region commands (`SetLoopRegion`:
/// `aux` = region start in frames, `value` = region end).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct RtCommand {
    pub id: u16,
    pub track: i16,
    pub slot: i16,
    pub index: u16,
    pub value: f32,
    pub aux: u32,
}

impl RtCommand {
    pub fn new(id: CmdId, track: i16, slot: i16, index: u16, value: f32) -> Self {
        Self {
            id: id as u16,
            track,
            slot,
            index,
            value,
            aux: 0,
        }
    }

    /// Parameter write addressed to (track, slot, index).
    pub fn param_set(track: i16, slot: i16, index: u16, value: f32) -> Self {
        Self::new(CmdId::ParamSet, track, slot, index, value)
    }

    /// Master loop region in frames; `start` rides in `aux`, `end` in `value`.
    pub fn loop_region(start: u32, end: u32) -> Self {
        Self {
            id: CmdId::SetLoopRegion as u16,
            track: -1,
            slot: -1,
            index: 0,
            value: end as f32,
            aux: start,
        }
    }
}

/// Rich command as issued by non-RT layers; translated to [`RtCommand`]
/// before it reaches the ring.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: String,
    pub target: Target,
    pub value: f32,
}

impl Command {
    pub fn new(name: impl Into<String>, target: Target, value: f32) -> Self {
        Self {
            name: name.into(),
            target,
            value,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROCESS CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// One audio block as handed to the engine by the platform callback.
///
/// Channel memory is owned by the host and valid only for the duration of
/// the block. Outputs are non-interleaved `[channel][frame]`.
pub struct ProcessContext<'a, 'b> {
    pub inputs: &'a [&'a [Sample]],
    pub outputs: &'a mut [&'b mut [Sample]],
    pub frames: usize,
}

impl<'a, 'b> ProcessContext<'a, 'b> {
    pub fn new(
        inputs: &'a [&'a [Sample]],
        outputs: &'a mut [&'b mut [Sample]],
        frames: usize,
    ) -> Self {
        Self {
            inputs,
            outputs,
            frames,
        }
    }

    /// Input channel `ch`, falling back to channel 0 for mono sources.
    ///
    /// Returns the host-owned slice directly, so the caller may keep it
    /// while writing `outputs`.
    #[inline]
    pub fn input_or_first(&self, ch: usize) -> Option<&'a [Sample]> {
        self.inputs.get(ch).or_else(|| self.inputs.first()).copied()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TIME SIGNATURE
// ═══════════════════════════════════════════════════════════════════════════════

/// Time signature (e.g., 4/4, 3/4, 6/8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSig {
    pub num: u16,
    pub den: u16,
}

impl Default for TimeSig {
    fn default() -> Self {
        Self { num: 4, den: 4 }
    }
}

impl TimeSig {
    pub fn new(num: u16, den: u16) -> Self {
        Self { num, den }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_scopes() {
        assert!(Target::MASTER.is_master());
        assert!(Target::new(-1, 3).is_master());
        assert!(!Target::new(0, -1).is_master());
        assert_eq!(Target::track_level(2), Target::new(2, -1));
    }

    #[test]
    fn test_loop_region_fields() {
        let cmd = RtCommand::loop_region(480, 96_000);
        assert_eq!(cmd.id, CmdId::SetLoopRegion as u16);
        assert_eq!(cmd.track, -1);
        assert_eq!(cmd.aux, 480);
        assert_eq!(cmd.value, 96_000.0);
    }

    #[test]
    fn test_context_mono_fallback() {
        let left = [0.5f32; 4];
        let ins: [&[Sample]; 1] = [&left];
        let mut out_l = [0.0f32; 4];
        let mut outs: [&mut [Sample]; 1] = [&mut out_l];
        let ctx = ProcessContext::new(&ins, &mut outs, 4);

        assert!(ctx.input_or_first(0).is_some());
        // Channel 1 falls back to channel 0.
        assert_eq!(ctx.input_or_first(1).unwrap()[0], 0.5);
    }
}
