//! Module contract
//!
//! The shape every DSP unit must obey so the engine can drive it safely.
//! Parameters are normalized [0, 1] on the wire; mapping to physical values
//! is the module's responsibility. `set_param` writes an internal
//! single-writer atomic cell, so the parameter bridge and direct RT command
//! dispatch can both call it without locking.

use lf_core::{ParamKv, ParamMeta, ProcessContext};

/// Uniform parameter access for modules. Values are normalized [0, 1].
pub trait Parameterized {
    fn param_count(&self) -> usize;

    /// Current (target) value of parameter `index`; O(1), RT-safe.
    fn param(&self, index: usize) -> f32;

    /// Write parameter `index` into the module's local cell. RT-safe; called
    /// by the parameter bridge or by a track dispatching `ParamSet`.
    fn set_param(&self, index: usize, value: f32);

    /// Metadata for UI and serialization; off-RT only.
    fn param_meta(&self, index: usize) -> Option<&ParamMeta>;

    /// Batch update; the default is a plain loop over `set_param`.
    fn set_params_batch(&self, kvs: &[ParamKv]) {
        for kv in kvs {
            self.set_param(kv.index as usize, kv.value);
        }
    }

    /// Called by the RT thread once before `process` each block; the module
    /// snapshots its target parameters here. Default: no-op.
    fn begin_block(&mut self) {}
}

/// Any FX/processor in a track chain. All preparation happens in `init`;
/// `process` is strictly RT-safe: no allocation, no blocking, no panics.
pub trait AudioModule: Parameterized + Send {
    /// Off-RT; may allocate. Must leave the module in a deterministic state.
    fn init(&mut self, sample_rate: f64, max_frames: usize);

    /// RT. Reads only the snapshot taken in `begin_block`.
    fn process(&mut self, ctx: &mut ProcessContext);

    /// Resets internal DSP state, preserving current parameter values.
    fn reset(&mut self);
}
