//! lf-graph: Off-RT DSP topology model
//!
//! The flat node/edge description of the mixer graph: declaration,
//! validation before stream start, and stable-id binding for tracks. The
//! RT engine never parses topology; it only registers resolved tracks.
//! Serialization is deterministic: nodes sorted by id, edges by (from, to).

mod codec;
mod topology;

pub use codec::*;
pub use topology::*;
