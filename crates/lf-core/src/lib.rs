//! lf-core: Shared types, traits, and utilities for LoopForge
//!
//! This crate provides the foundational types used across all LoopForge
//! crates: the RT command record and its closed code enumeration, target
//! addressing, the per-block process context, parameter metadata and
//! atomic cells, and the core error type.

mod error;
mod ids;
mod params;
mod types;

pub use error::*;
pub use ids::*;
pub use params::*;
pub use types::*;

/// Audio sample type used throughout the engine.
pub type Sample = f32;

/// Default number of tracks; the engine can be configured up to [`MAX_TRACKS_CAP`].
pub const MAX_TRACKS: usize = 4;

/// Hard upper bound on configurable track count (matches the graph node cap).
pub const MAX_TRACKS_CAP: usize = 64;

/// Maximum FX modules per track.
pub const MAX_FX_PER_TRACK: usize = 8;

/// Maximum registered RT extensions.
pub const MAX_EXTENSIONS: usize = 8;

/// Maximum I/O channels a block context can carry through the engine.
pub const MAX_IO_CHANNELS: usize = 8;

/// Default command ring capacity (power of two).
pub const DEFAULT_RING_CAPACITY: usize = 1024;

/// Default parameter bridge page capacity.
pub const DEFAULT_PAGE_CAPACITY: usize = 1024;

/// Pulses per quarter note used by the transport.
pub const DEFAULT_PPQ: u16 = 96;

/// Minimum tempo
pub const MIN_TEMPO: f32 = 20.0;

/// Maximum tempo
pub const MAX_TEMPO: f32 = 400.0;
