//! Bodies, effects and sessions for the Viscera simulation.
//!
//! A [`Body`] owns every fluid organ in arenas and resolves the ids outlets
//! and conduits use to refer to what they drain. Callers ask a body for a
//! capability (`fluid_source(FluidType::Milk)`) and get an `Option` back
//! rather than probing for attributes.
//!
//! Modifiers are [`Effect`] objects held in a list on the body, applied and
//! ticked through direct calls. A [`Session`] groups bodies and is always
//! constructed explicitly.

pub mod body;
pub mod effect;
pub mod session;

pub use body::{Body, FluidTarget, OutletStatus, VesselStatus};
pub use effect::{Chill, Duration, Effect, Fever, Inflate};
pub use session::Session;
