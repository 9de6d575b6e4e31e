//! lf-audio: Platform audio I/O for LoopForge (cpal)
//!
//! The host boundary the engine runs behind: device enumeration and
//! selection, and a stream wrapper that hands non-interleaved
//! [`lf_core::ProcessContext`] blocks to a render callback on the audio
//! thread. The render callback must never allocate, lock, or panic.

mod device;
mod error;
mod stream;

pub use device::*;
pub use error::*;
pub use stream::*;
