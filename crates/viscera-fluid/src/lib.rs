//! Fluid, pressure and capacity model for the Viscera simulation.
//!
//! Organs produce, store, transfer and expel typed fluids. Each organ owns a
//! [`FluidContainer`]; a [`PressureModel`] reads the container's fullness
//! into a pressure value and a discrete [`PressureTier`], which in turn
//! drives trauma damage and expulsion strength.
//!
//! # Design
//!
//! - [`ProducingOrgan`]s fill their own container each tick, leaving a 10%
//!   headroom buffer; external fills may overflow on purpose.
//! - An [`AggregateReservoir`] owns its organs and drains them
//!   proportionally.
//! - An [`ExpulsionOrgan`] and a [`TransportConduit`] never own what they
//!   draw from. They hold ids and are handed the resolved target per call;
//!   a missing target yields zero, never an error.
//! - Events fire only on *transitions*, not every tick.

pub mod conduit;
pub mod container;
pub mod event;
pub mod expulsion;
pub mod organ;
pub mod pressure;
pub mod reservoir;

pub use conduit::{ContainerArena, TransportConduit};
pub use container::{FillPolicy, FluidContainer};
pub use event::FluidEvent;
pub use expulsion::{
    ExpelFailure, ExpulsionOrgan, Expulsion, OrificeProfile, OutletGeometry, ProfileFactors,
};
pub use organ::ProducingOrgan;
pub use pressure::{PressureModel, PressureReading, PressureTier, pressure_multiplier};
pub use reservoir::AggregateReservoir;
