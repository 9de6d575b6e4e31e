//! lf-rt: Lock-Free Control/RT Hand-Off Primitives
//!
//! The three structures that let control threads mutate RT state without
//! locks, allocations, or priority inversion:
//! - [`CommandRing`]: SPSC ring of fixed-size command records
//! - [`ParamBridge`]: dual-page batched parameter publisher
//! - [`TransportBridge`]: generation-published musical-time snapshot
//!
//! CRITICAL: the audio thread must never block. Every RT-side operation
//! here is wait-free.

mod param_bridge;
mod ring;
mod transport;

pub use param_bridge::*;
pub use ring::*;
pub use transport::*;
