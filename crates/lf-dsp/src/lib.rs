//! lf-dsp: DSP modules for LoopForge track chains
//!
//! Two canonical module patterns live here:
//! - [`GainSlew`]: per-block parameter snapshot with a linear ramp toward
//!   the target (zipper-free gain changes)
//! - [`OnePoleHpf`]: coefficient recomputation cached behind a dirty flag,
//!   kept out of the inner sample loop

mod gain_slew;
mod one_pole;

pub use gain_slew::*;
pub use one_pole::*;
