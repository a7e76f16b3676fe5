//! Force-feedback effect engine.
//!
//! The host manages effects through the methods on [`EffectEngine`]
//! (define, set parameters, start, stop, free). Every control tick calls
//! [`EffectEngine::calc_forces`] with the live wheel angle and velocity and
//! gets back a two-channel [`ForceVector`].
//!
//! # Examples
//!
//! ```
//! use diywheel_ffb::{EffectDefinition, EffectEngine, EffectKind, WheelInput};
//!
//! # fn main() -> Result<(), diywheel_ffb::EffectError> {
//! let mut engine = EffectEngine::new();
//! let id = engine.define_effect(EffectDefinition::new(EffectKind::Constant).with_direction(90))?;
//! engine.set_constant_force(id, 5000)?;
//! engine.start_effect(id, 0)?;
//!
//! let forces = engine.calc_forces(10, WheelInput::default());
//! assert_eq!(forces.primary(), 16383);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod constants;
pub mod effects;
pub mod engine;
pub mod error;
pub mod waveform;

pub use constants::*;
pub use effects::*;
pub use engine::{Capabilities, EffectEngine, ForceVector, SharedEffectEngine, WheelInput};
pub use error::{EffectError, EffectResult};
