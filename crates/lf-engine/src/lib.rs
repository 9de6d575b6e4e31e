//! lf-engine: RT Engine Loop and Track/Module Contract
//!
//! The deterministic, allocation-free block loop that sequences all
//! block-scoped work:
//! - drain the command ring
//! - publish the parameter page
//! - publish the transport snapshot and advance the sample clock
//! - run extension pre-hooks, the track chains, extension post-hooks
//! - capture the master output into the record sink
//!
//! Control threads interact with the running engine only through the
//! lock-free primitives in `lf-rt`; the engine itself holds shared
//! references to its collaborators and owns only the track list.

mod engine;
mod extension;
mod module;
mod record;
mod telemetry;
mod track;

pub use engine::*;
pub use extension::*;
pub use module::*;
pub use record::*;
pub use telemetry::*;
pub use track::*;
